#[cfg(feature = "gui")]
pub mod app;
pub mod backend;
pub mod cli;
pub mod config;
pub mod error;
pub mod form;
pub mod geometry;
pub mod inspect;
pub mod logging;
pub mod notification;
pub mod page;
pub mod preview;
pub mod run;
pub mod selector;
pub mod storage;
pub mod tour;
pub mod url_state;
pub mod video;
pub use error::{AppError, AppResult};

/// Entrypoint used by the binary: parses arguments and dispatches.
pub fn run() -> anyhow::Result<()> {
    use clap::Parser;

    logging::init();
    let args = cli::CliArgs::parse();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting scorecap");
    cli::run(args)
}
