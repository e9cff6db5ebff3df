use std::path::Path;

const APP_NAME: &str = "scorecap";

pub fn send(summary: &str, body: impl Into<String>) {
    let body = body.into();
    if let Err(err) = notify_rust::Notification::new()
        .appname(APP_NAME)
        .summary(summary)
        .body(&body)
        .show()
    {
        tracing::warn!("system notification failed: {err}");
    }
}

pub fn score_saved(path: &Path) {
    send("Score ready", format!("Saved {}", path.display()));
}
