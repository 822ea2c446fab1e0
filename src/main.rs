fn main() {
    if let Err(err) = rd_atlas::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
