fn main() {
    if let Err(e) = classtags_cli::run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
