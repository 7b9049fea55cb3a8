//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

fn main() {
    if let Err(err) = areafilter_cli::run() {
        eprintln!("areafilter: {err}");
        std::process::exit(1);
    }
}
