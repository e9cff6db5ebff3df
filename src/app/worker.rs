use std::sync::mpsc;
use std::time::{Duration, Instant};

pub(super) const WORKER_RESULT_POLL_INTERVAL: Duration = Duration::from_millis(24);

/// Runs blocking network work off the main loop and hands the result back on it.
///
/// `on_result` always runs exactly once; it receives `None` when the thread
/// could not be spawned or exited without sending a result.
pub(super) fn spawn_worker<T, W, H>(label: &'static str, work: W, on_result: H)
where
    T: Send + 'static,
    W: FnOnce() -> T + Send + 'static,
    H: FnOnce(Option<T>) + 'static,
{
    let (tx, rx) = mpsc::channel::<T>();
    let started = Instant::now();
    let spawned = std::thread::Builder::new()
        .name(format!("scorecap-{label}"))
        .spawn(move || {
            let _ = tx.send(work());
        });
    if let Err(err) = spawned {
        tracing::error!(label, ?err, "failed to spawn worker thread");
        gtk4::glib::idle_add_local_once(move || on_result(None));
        return;
    }

    let mut on_result = Some(on_result);
    gtk4::glib::timeout_add_local(WORKER_RESULT_POLL_INTERVAL, move || {
        let result = match rx.try_recv() {
            Ok(result) => {
                tracing::debug!(label, elapsed_ms = started.elapsed().as_millis() as u64, "worker finished");
                Some(result)
            }
            Err(mpsc::TryRecvError::Empty) => return gtk4::glib::ControlFlow::Continue,
            Err(mpsc::TryRecvError::Disconnected) => {
                tracing::warn!(label, "worker exited without a result");
                None
            }
        };
        if let Some(on_result) = on_result.take() {
            on_result(result);
        }
        gtk4::glib::ControlFlow::Break
    });
}
