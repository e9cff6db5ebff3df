use std::cell::RefCell;
use std::rc::Rc;

use gtk4::prelude::*;
use gtk4::{Align, Box as GtkBox, Button, Label, Orientation};

use crate::backend::{HttpBackend, SheetBackend};
use crate::notification;
use crate::run::{RunError, RunFlow, RunOutcome, StatusKind};
use crate::storage::StorageService;

use super::session::PageSession;
use super::worker::spawn_worker;

const STATUS_CLASSES: [&str; 3] = ["status-processing", "status-success", "status-error"];

fn status_class(kind: StatusKind) -> &'static str {
    match kind {
        StatusKind::Processing => STATUS_CLASSES[0],
        StatusKind::Success => STATUS_CLASSES[1],
        StatusKind::Error => STATUS_CLASSES[2],
    }
}

#[derive(Clone)]
pub(super) struct RunPanel {
    pub(super) root: GtkBox,
    run_button: Button,
    download_button: Button,
    status: Label,
    flow: Rc<RefCell<RunFlow>>,
}

impl RunPanel {
    pub(super) fn build() -> Self {
        let run_button = Button::with_label(crate::run::RUN_LABEL);
        run_button.add_css_class("suggested-action");
        let download_button = Button::with_label("Download again");
        download_button.set_sensitive(false);

        let buttons = GtkBox::new(Orientation::Horizontal, 8);
        buttons.append(&run_button);
        buttons.append(&download_button);

        let status = Label::new(None);
        status.set_wrap(true);
        status.set_xalign(0.0);
        status.set_halign(Align::Fill);
        status.set_visible(false);

        let root = GtkBox::new(Orientation::Vertical, 8);
        root.append(&buttons);
        root.append(&status);

        Self {
            root,
            run_button,
            download_button,
            status,
            flow: Rc::new(RefCell::new(RunFlow::new())),
        }
    }

    fn render(&self) {
        let flow = self.flow.borrow();
        let control = flow.control();
        self.run_button.set_sensitive(control.enabled());
        self.run_button.set_label(control.label());
        self.download_button.set_sensitive(flow.download_enabled());

        match flow.status() {
            Some(banner) => {
                for class in STATUS_CLASSES {
                    self.status.remove_css_class(class);
                }
                self.status.add_css_class(status_class(banner.kind));
                self.status.set_text(&banner.message);
                self.status.set_visible(true);
            }
            None => self.status.set_visible(false),
        }
    }

    pub(super) fn release(&self, storage: &StorageService) {
        self.flow.borrow_mut().release(storage);
    }

    pub(super) fn connect(
        &self,
        session: &Rc<PageSession>,
        backend: HttpBackend,
        storage: StorageService,
    ) {
        let panel = self.clone();
        let session = session.clone();
        let run_storage = storage.clone();
        self.run_button.connect_clicked(move |_| {
            let form = session.page.borrow().form().clone();
            let begun = panel.flow.borrow_mut().begin(&form, &run_storage);
            panel.render();
            let ticket = match begun {
                Ok(ticket) => ticket,
                Err(RunError::Invalid(err)) => {
                    session.form.focus(err.field());
                    return;
                }
                Err(err) => {
                    tracing::debug!(%err, "run not started");
                    return;
                }
            };

            let backend = backend.clone();
            let panel = panel.clone();
            let storage = run_storage.clone();
            spawn_worker(
                "execute",
                move || backend.execute(&form),
                move |result| {
                    let Some(result) = result else {
                        panel.flow.borrow_mut().abort(ticket);
                        panel.render();
                        return;
                    };
                    let outcome = panel.flow.borrow_mut().complete(ticket, result, &storage);
                    panel.render();
                    match outcome {
                        Ok(RunOutcome::Saved(path)) => notification::score_saved(&path),
                        Ok(RunOutcome::Inspection { inspect_url, .. }) => open_in_browser(&inspect_url),
                        Err(_) => {}
                    }
                },
            );
        });

        let panel = self.clone();
        self.download_button.connect_clicked(move |_| {
            let saved = panel.flow.borrow().download_again(&storage);
            match saved {
                Ok(path) => notification::score_saved(&path),
                Err(err) => tracing::warn!(%err, "download failed"),
            }
        });
    }
}

pub(super) fn open_in_browser(uri: &str) {
    tracing::info!(%uri, "opening inspection page");
    if let Err(err) =
        gtk4::gio::AppInfo::launch_default_for_uri(uri, None::<&gtk4::gio::AppLaunchContext>)
    {
        tracing::warn!(%uri, ?err, "failed to open browser");
    }
}
