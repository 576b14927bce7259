fn main() {
    xrant::logging::init();

    if let Err(e) = xrant::run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
