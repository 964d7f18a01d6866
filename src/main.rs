mod backup;
mod cli;
mod error;
mod google;
mod logger;
mod rclone;
mod remote;
mod target;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
