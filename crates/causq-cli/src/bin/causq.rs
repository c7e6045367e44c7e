fn main() {
    if let Err(err) = causq_cli::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
