//! GTK4 window wiring the page, run and inspection models to widgets.

use std::rc::Rc;

use gtk4::prelude::*;
use gtk4::{
    Application, ApplicationWindow, Box as GtkBox, Button, CssProvider, HeaderBar, Orientation,
    ScrolledWindow, Widget,
};

use crate::backend::{BackendError, BugReporter, HttpBackend};
use crate::config::AppConfig;
use crate::error::AppResult;
use crate::page::SelectorPage;
use crate::storage::StorageService;
use crate::tour::TourAnchor;
use crate::url_state::FileHistory;

mod dialogs;
mod form_panel;
mod preview_canvas;
mod run_panel;
mod session;
mod worker;

use self::dialogs::{present_bug_report, TourPopover};
use self::form_panel::FormWidgets;
use self::preview_canvas::PreviewCanvas;
use self::run_panel::RunPanel;
use self::session::{connect_drag_selector, connect_form_signals, PageSession};

const APP_ID: &str = "io.github.scorecap.Scorecap";
const WINDOW_TITLE: &str = "Scorecap";
const STALE_ARTIFACT_HOURS: u64 = 24;
const STATE_FALLBACK_FILE: &str = "last_session";

const RUNTIME_CSS: &str = "
.status-processing { background: #fff3cd; color: #664d03; padding: 8px; border-radius: 6px; }
.status-success { background: #d4edda; color: #0f5132; padding: 8px; border-radius: 6px; }
.status-error { background: #f8d7da; color: #842029; padding: 8px; border-radius: 6px; }
";

#[derive(Clone)]
struct Services {
    backend: HttpBackend,
    storage: StorageService,
    reporter: BugReporter,
    history: FileHistory,
}

impl Services {
    fn from_config(config: &AppConfig) -> AppResult<Self> {
        let backend = HttpBackend::from_config(config)?;
        let storage = StorageService::with_default_paths(config.resolved_download_dir())?;
        match storage.prune_stale_temp_files(STALE_ARTIFACT_HOURS) {
            Ok(report) if report.removed_files > 0 => {
                tracing::info!(removed = report.removed_files, "pruned stale artifacts");
            }
            Ok(_) => {}
            Err(err) => tracing::warn!(?err, "failed to prune stale artifacts"),
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(BackendError::from)?;
        let reporter = BugReporter::new(client, config.bug_report_form_id.clone());

        let history = FileHistory::with_default_path().unwrap_or_else(|err| {
            tracing::warn!(%err, "session state path unavailable; keeping it with runtime files");
            FileHistory::new(storage.temp_dir().join(STATE_FALLBACK_FILE))
        });

        Ok(Self {
            backend,
            storage,
            reporter,
            history,
        })
    }
}

fn install_runtime_css() {
    let provider = CssProvider::new();
    provider.load_from_data(RUNTIME_CSS);
    if let Some(display) = gtk4::gdk::Display::default() {
        gtk4::style_context_add_provider_for_display(
            &display,
            &provider,
            gtk4::STYLE_PROVIDER_PRIORITY_APPLICATION,
        );
    }
}

fn build_window(application: &Application, services: &Services) {
    install_runtime_css();

    let (page, restored) = SelectorPage::load(services.history.clone());
    let canvas = PreviewCanvas::build(page.overlay());
    let form = FormWidgets::build();
    let session = PageSession::new(page, form, canvas, services.backend.clone());
    connect_form_signals(&session);
    connect_drag_selector(&session);
    session.show_restored(restored);

    let run_panel = RunPanel::build();
    run_panel.connect(&session, services.backend.clone(), services.storage.clone());

    let content = GtkBox::new(Orientation::Vertical, 12);
    content.set_margin_top(16);
    content.set_margin_bottom(16);
    content.set_margin_start(16);
    content.set_margin_end(16);
    content.append(&session.canvas.area);
    content.append(&session.form.root);
    content.append(&run_panel.root);

    let scroller = ScrolledWindow::new();
    scroller.set_child(Some(&content));

    let window = ApplicationWindow::builder()
        .application(application)
        .title(WINDOW_TITLE)
        .default_width(760)
        .default_height(900)
        .build();
    let header = HeaderBar::new();
    let help = Button::from_icon_name("help-about-symbolic");
    help.set_tooltip_text(Some("Show the tour"));
    header.pack_end(&help);
    let report = Button::with_label("Report a bug");
    report.set_visible(services.reporter.is_enabled());
    header.pack_start(&report);
    window.set_titlebar(Some(&header));
    window.set_child(Some(&scroller));

    let anchor_session = Rc::clone(&session);
    let tour = TourPopover::build(move |anchor| -> Widget {
        match anchor {
            TourAnchor::UrlEntry => anchor_session.form.url_entry.clone().upcast(),
            TourAnchor::TimeFields => anchor_session.form.time_box.clone().upcast(),
            TourAnchor::PreviewSurface => anchor_session.canvas.area.clone().upcast(),
            TourAnchor::AdvancedSettings => anchor_session.form.advanced_box.clone().upcast(),
        }
    });
    let tour_for_help = tour.clone();
    help.connect_clicked(move |_| tour_for_help.start());

    let reporter = services.reporter.clone();
    let report_parent = window.clone();
    report.connect_clicked(move |_| present_bug_report(&report_parent, reporter.clone()));

    let storage = services.storage.clone();
    window.connect_close_request(move |_| {
        run_panel.release(&storage);
        gtk4::glib::Propagation::Proceed
    });

    tracing::info!("presenting main window");
    window.present();
    gtk4::glib::idle_add_local_once(move || tour.start());
}

/// Runs the window until it is closed.
pub fn run(config: AppConfig) -> AppResult<()> {
    let services = Services::from_config(&config)?;
    let application = Application::builder().application_id(APP_ID).build();
    application.connect_activate(move |application| build_window(application, &services));

    // argv[0] only, so GTK does not try to parse our subcommands.
    let exit = application.run_with_args(&[env!("CARGO_PKG_NAME")]);
    tracing::info!(?exit, "window closed");
    Ok(())
}
