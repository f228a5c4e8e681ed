fn main() {
    if let Err(err) = monkmode_lib::run() {
        eprintln!("monkmode: {err:#}");
        std::process::exit(1);
    }
}
