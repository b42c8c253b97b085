fn main() {
    if let Err(e) = plausch::cli::main() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
