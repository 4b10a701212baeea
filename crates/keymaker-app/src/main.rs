//! Main application entry point (native).

#[cfg(feature = "native")]
use clap::Parser;

#[cfg(feature = "native")]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Starting Keymaker");

    let options = keymaker_app::Options::parse();
    match keymaker_app::execute(&options) {
        Ok(report) => println!("{report}"),
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    }
}

#[cfg(not(feature = "native"))]
fn main() {
    panic!("Native feature not enabled. Use `cargo run --features native`");
}
