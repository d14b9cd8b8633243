fn main() {
    if let Err(error) = lantern::run() {
        log::error!("{error}");
        std::process::exit(1);
    }
}
