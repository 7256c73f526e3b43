#![forbid(unsafe_code)]

fn main() {
    if let Err(error) = vimnav_harness::run_from_env() {
        eprintln!("vimnav-script: {error}");
        std::process::exit(error.exit_code());
    }
}
