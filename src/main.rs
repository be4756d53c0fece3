fn main() {
    if let Err(e) = boxytube_lib::run() {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
