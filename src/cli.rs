//! Command-line front-end.
//!
//! Every subcommand drives the same models the window uses: a share link is
//! restored through `SelectorPage`, runs go through `RunFlow`, and reviewed
//! sessions through `InspectFlow`.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::backend::{BugReport, BugReporter, HttpBackend, SheetBackend};
use crate::config::{load_app_config, AppConfig};
use crate::inspect::{resolve_session_id, InspectFlow, SelectionSet};
use crate::page::{FormEvent, SelectorPage};
use crate::preview::FrameImage;
use crate::run::{RunFlow, RunOutcome};
use crate::storage::{ArtifactKind, StorageService};
use crate::url_state::{query_from_link, share_link, FileHistory, History, MemoryHistory};

const STALE_ARTIFACT_HOURS: u64 = 24;

#[derive(Parser, Debug)]
#[command(
    name = "scorecap",
    version,
    about = "Extract sheet music from a video through a scorecap backend"
)]
pub struct CliArgs {
    /// Backend base URL; overrides `backend_url` from config.json.
    #[arg(long, global = true, value_name = "URL")]
    pub backend: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open the window (the default when no subcommand is given).
    #[cfg(feature = "gui")]
    Gui,

    /// Run an extraction from a share link or a bare query string.
    Run {
        /// Share link (`https://host/?url=...`) or query (`url=...&x_start=...`).
        link: String,
        /// Request an inspection session instead of a finished PDF.
        #[arg(long)]
        inspect: bool,
    },

    /// Fetch a single preview frame.
    Frame {
        /// Video link.
        url: String,
        #[arg(long, default_value = "0:00", value_name = "TIME")]
        start: String,
        /// Destination file; defaults to frame.jpg in the download directory.
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Build the final PDF from reviewed inspection images.
    Finalize {
        /// Session id or `/inspect/{session_id}` link.
        session: String,
        /// Image filenames to keep, in page order.
        #[arg(required = true, num_args = 1..)]
        images: Vec<String>,
    },

    /// Send an anonymous bug report.
    Report {
        message: String,
        /// Address for a reply.
        #[arg(long)]
        email: Option<String>,
    },

    /// Print the share link of the last window session.
    Link {
        /// Base URL of the page; defaults to the backend URL.
        #[arg(long, value_name = "URL")]
        base: Option<String>,
    },
}

impl CliArgs {
    fn config(&self) -> AppConfig {
        let mut config = load_app_config();
        if let Some(backend) = &self.backend {
            config.backend_url = backend.clone();
        }
        config
    }
}

pub fn run(args: CliArgs) -> anyhow::Result<()> {
    let config = args.config();
    tracing::debug!(backend = %config.backend_url, command = ?args.command, "cli start");

    match args.command {
        #[cfg(feature = "gui")]
        None | Some(Command::Gui) => Ok(crate::app::run(config)?),
        #[cfg(not(feature = "gui"))]
        None => {
            anyhow::bail!("this build has no window; use a subcommand (see --help)")
        }
        Some(Command::Run { link, inspect }) => run_extraction(&config, &link, inspect),
        Some(Command::Frame { url, start, output }) => fetch_frame(&config, &url, &start, output),
        Some(Command::Finalize { session, images }) => finalize(&config, &session, images),
        Some(Command::Report { message, email }) => report(&config, &message, email.as_deref()),
        Some(Command::Link { base }) => print_link(&config, base.as_deref()),
    }
}

fn storage(config: &AppConfig) -> anyhow::Result<StorageService> {
    let storage = StorageService::with_default_paths(config.resolved_download_dir())?;
    if let Err(err) = storage.prune_stale_temp_files(STALE_ARTIFACT_HOURS) {
        tracing::warn!(?err, "failed to prune stale artifacts");
    }
    Ok(storage)
}

fn run_extraction(config: &AppConfig, link: &str, inspect: bool) -> anyhow::Result<()> {
    let query = query_from_link(link)?;
    let mut page = SelectorPage::new(MemoryHistory::default());
    page.restore(&query);
    if inspect {
        page.handle(FormEvent::InspectionToggled(true));
    }
    anyhow::ensure!(
        !page.form().url.trim().is_empty(),
        "the link does not contain a video url"
    );
    println!("crop region: {}", page.overlay().describe());

    let backend = HttpBackend::from_config(config)?;
    let storage = storage(config)?;
    let mut flow = RunFlow::new();
    let result = flow.submit(page.form(), &backend, &storage);
    if let Some(status) = flow.status() {
        println!("{}", status.message);
    }

    match result? {
        RunOutcome::Saved(path) => {
            crate::notification::score_saved(&path);
            flow.release(&storage);
        }
        RunOutcome::Inspection { inspect_url, .. } => {
            println!("review the captured pages at {inspect_url}");
        }
    }
    Ok(())
}

fn fetch_frame(
    config: &AppConfig,
    url: &str,
    start: &str,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let backend = HttpBackend::from_config(config)?;
    let bytes = backend.get_frame(url, start)?;
    let frame = FrameImage::decode(bytes).context("backend returned an unreadable frame")?;

    let path = match output {
        Some(path) => {
            std::fs::write(&path, &frame.bytes)
                .with_context(|| format!("failed to write {}", path.display()))?;
            path
        }
        None => {
            let storage = storage(config)?;
            let artifact = storage.stage(ArtifactKind::Frame, &frame.bytes)?;
            let saved = storage.save(&artifact)?;
            storage.discard(&artifact)?;
            saved
        }
    };
    println!("{}x{} frame saved to {}", frame.width, frame.height, path.display());
    Ok(())
}

fn finalize(config: &AppConfig, session: &str, images: Vec<String>) -> anyhow::Result<()> {
    let path = match url::Url::parse(session) {
        Ok(link) => link.path().to_string(),
        Err(_) => session.to_string(),
    };
    let mut selection = SelectionSet::new(images);
    selection.set_all(true);
    let mut flow = InspectFlow::new(resolve_session_id(None, &path), selection)?;

    let backend = HttpBackend::from_config(config)?;
    let storage = storage(config)?;
    let saved = flow.finalize(&backend, &storage)?;
    crate::notification::score_saved(&saved);
    println!("final score saved to {}", saved.display());
    Ok(())
}

fn report(config: &AppConfig, message: &str, email: Option<&str>) -> anyhow::Result<()> {
    let client = reqwest::blocking::Client::builder()
        .timeout(config.request_timeout())
        .build()?;
    let reporter = BugReporter::new(client, config.bug_report_form_id.clone());
    reporter.submit(&BugReport::new(message, email))?;
    println!("thanks, the report was sent");
    Ok(())
}

fn print_link(config: &AppConfig, base: Option<&str>) -> anyhow::Result<()> {
    let history = FileHistory::with_default_path()?;
    let query = history
        .current_query()
        .context("no saved session; open the window first")?;
    let mut page = SelectorPage::new(MemoryHistory::default());
    page.restore(&query);
    println!(
        "{}",
        share_link(base.unwrap_or(&config.backend_url), page.form())?
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_with_global_backend_override() {
        let args = CliArgs::try_parse_from([
            "scorecap",
            "run",
            "url=https%3A%2F%2Fyoutu.be%2Fabc12345678",
            "--inspect",
            "--backend",
            "http://render.local",
        ])
        .expect("args should parse");

        assert_eq!(args.backend.as_deref(), Some("http://render.local"));
        assert!(matches!(
            args.command,
            Some(Command::Run { inspect: true, ref link }) if link.starts_with("url=")
        ));
    }

    #[test]
    fn finalize_requires_images() {
        assert!(CliArgs::try_parse_from(["scorecap", "finalize", "abc"]).is_err());
        let args = CliArgs::try_parse_from(["scorecap", "finalize", "abc", "p1.png", "p2.png"])
            .expect("args should parse");
        assert!(matches!(
            args.command,
            Some(Command::Finalize { ref images, .. }) if images.len() == 2
        ));
    }

    #[test]
    fn frame_defaults_start_time() {
        let args = CliArgs::try_parse_from(["scorecap", "frame", "https://youtu.be/abc12345678"])
            .expect("args should parse");
        assert!(matches!(
            args.command,
            Some(Command::Frame { ref start, output: None, .. }) if start == "0:00"
        ));
    }
}
