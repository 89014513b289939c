fn main() {
    if let Err(err) = datastory_prep::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
