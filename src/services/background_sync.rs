use crate::database;
use crate::error::AppError;
use crate::services::remote::RemoteDataService;
use crate::services::{reconcile, settings_service, AppSession};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};

pub const DEFAULT_POLL_INTERVAL_SECONDS: u64 = 10;

/// Control handle for the background reconcile loop.
///
/// The interval tick and realtime change notifications both funnel into the
/// same `reconcile_now` routine; a realtime transport calls
/// [`notify_change`](ReconcileHandle::notify_change) to skip the wait.
pub struct ReconcileHandle {
    running: Arc<AtomicBool>,
    trigger: mpsc::Sender<()>,
    shutdown: watch::Sender<bool>,
}

impl ReconcileHandle {
    /// Requests an immediate reconcile pass, e.g. from a table-change
    /// notification. Cheap and lossy: a full trigger queue means a pass is
    /// already pending.
    pub fn notify_change(&self) {
        if self.trigger.try_send(()).is_err() {
            log::debug!("Change notification dropped; reconcile already pending");
        }
    }

    pub fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            log::info!("Stopping background reconcile");
            let _ = self.shutdown.send(true);
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Starts the background reconcile loop on its own thread.
///
/// Each pass pulls the remote collections, overwrites the local store and
/// swaps the session's in-memory state. Errors are logged and never surfaced;
/// the next tick retries from scratch.
pub fn start<R>(
    remote: R,
    session: Arc<Mutex<AppSession>>,
    poll_interval: Duration,
) -> ReconcileHandle
where
    R: RemoteDataService + Send + 'static,
{
    start_at(remote, session, poll_interval, database::get_database_path())
}

fn start_at<R>(
    remote: R,
    session: Arc<Mutex<AppSession>>,
    poll_interval: Duration,
    db_path: PathBuf,
) -> ReconcileHandle
where
    R: RemoteDataService + Send + 'static,
{
    let running = Arc::new(AtomicBool::new(true));
    let (trigger_tx, trigger_rx) = mpsc::channel::<()>(8);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let loop_running = running.clone();
    std::thread::spawn(move || {
        run_loop(
            remote,
            session,
            poll_interval,
            db_path,
            loop_running,
            trigger_rx,
            shutdown_rx,
        );
    });

    ReconcileHandle {
        running,
        trigger: trigger_tx,
        shutdown: shutdown_tx,
    }
}

fn run_loop<R: RemoteDataService>(
    remote: R,
    session: Arc<Mutex<AppSession>>,
    poll_interval: Duration,
    db_path: PathBuf,
    running: Arc<AtomicBool>,
    mut trigger_rx: mpsc::Receiver<()>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            log::error!("Failed to create reconcile runtime: {}", e);
            running.store(false, Ordering::SeqCst);
            return;
        }
    };

    runtime.block_on(async move {
        let conn = match database::init_database_at(&db_path) {
            Ok(conn) => conn,
            Err(e) => {
                log::error!("Background reconcile cannot open the local store: {}", e);
                running.store(false, Ordering::SeqCst);
                return;
            }
        };

        log::info!(
            "Background reconcile started with {} second interval",
            poll_interval.as_secs()
        );

        while running.load(Ordering::SeqCst) {
            match reconcile_pass(&conn, &remote, &session).await {
                Ok((serves, clients)) => {
                    log::debug!(
                        "Reconcile pass complete: {} serve attempts, {} clients",
                        serves,
                        clients
                    );
                }
                // Background reconciliation never propagates errors to the UI
                Err(e) => log::error!("Background reconcile error: {}", e),
            }

            tokio::select! {
                _ = tokio::time::sleep(poll_interval) => {}
                changed = trigger_rx.recv() => {
                    if changed.is_none() {
                        break;
                    }
                    log::debug!("Change notification received; reconciling immediately");
                }
                _ = shutdown_rx.changed() => break,
            }
        }

        running.store(false, Ordering::SeqCst);
        log::info!("Background reconcile stopped");
    });
}

async fn reconcile_pass<R: RemoteDataService>(
    conn: &rusqlite::Connection,
    remote: &R,
    session: &Arc<Mutex<AppSession>>,
) -> Result<(usize, usize), AppError> {
    let outcome = reconcile::reconcile_now(conn, remote).await?;
    let stats = outcome.stats();
    let fresh = outcome.is_fresh();

    match session.lock() {
        Ok(mut state) => state.adopt(outcome.serves, outcome.clients),
        Err(_) => {
            return Err(AppError::Other(
                "Session lock poisoned; skipping adoption".to_string(),
            ))
        }
    }

    // A degraded pass served cached data; last_sync only records real pulls
    if fresh {
        if let Err(e) = settings_service::update_last_sync(conn) {
            log::debug!("last_sync update failed: {}", e);
        }
    } else {
        log::warn!("Reconcile pass used cached data; last_sync left unchanged");
    }

    Ok((stats.serves_pulled, stats.clients_pulled))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RemoteSettings;
    use crate::services::remote::testing::FakeRemote;
    use crate::services::remote::{
        CaseRow, ClientRow, DocumentRow, EmailPayload, EmailResponse, ServeAttemptPatch,
        ServeAttemptRow,
    };
    use rusqlite::Connection;
    use std::sync::atomic::AtomicUsize;

    /// Remote stub that counts serve fetches, so a test can observe each
    /// loop pass from outside the loop thread.
    #[derive(Clone, Default)]
    struct CountingRemote {
        fetches: Arc<AtomicUsize>,
    }

    impl RemoteDataService for CountingRemote {
        async fn fetch_serve_attempts(&self) -> Result<Vec<ServeAttemptRow>, AppError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }

        async fn fetch_serve_attempts_for_client(
            &self,
            _client_id: &str,
        ) -> Result<Vec<ServeAttemptRow>, AppError> {
            Ok(Vec::new())
        }

        async fn insert_serve_attempt(&self, _row: &ServeAttemptRow) -> Result<(), AppError> {
            Ok(())
        }

        async fn update_serve_attempt(
            &self,
            _id: &str,
            _patch: &ServeAttemptPatch,
        ) -> Result<(), AppError> {
            Ok(())
        }

        async fn delete_serve_attempt(&self, _id: &str) -> Result<(), AppError> {
            Ok(())
        }

        async fn fetch_clients(&self) -> Result<Vec<ClientRow>, AppError> {
            Ok(Vec::new())
        }

        async fn insert_client(&self, _row: &ClientRow) -> Result<(), AppError> {
            Ok(())
        }

        async fn update_client(&self, _row: &ClientRow) -> Result<(), AppError> {
            Ok(())
        }

        async fn delete_client(&self, _id: &str) -> Result<(), AppError> {
            Ok(())
        }

        async fn fetch_documents_for_client(
            &self,
            _client_id: &str,
        ) -> Result<Vec<DocumentRow>, AppError> {
            Ok(Vec::new())
        }

        async fn delete_document(&self, _id: &str) -> Result<(), AppError> {
            Ok(())
        }

        async fn remove_stored_file(&self, _path: &str) -> Result<(), AppError> {
            Ok(())
        }

        async fn fetch_cases_for_client(
            &self,
            _client_id: &str,
        ) -> Result<Vec<CaseRow>, AppError> {
            Ok(Vec::new())
        }

        async fn delete_cases_for_client(&self, _client_id: &str) -> Result<(), AppError> {
            Ok(())
        }

        async fn send_email(&self, payload: &EmailPayload) -> Result<EmailResponse, AppError> {
            Ok(EmailResponse {
                success: true,
                message: format!("Email sent to {}", payload.to),
                id: None,
            })
        }
    }

    fn temp_db_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("servetracker-{}-{}.db", tag, ulid::Ulid::new()))
    }

    fn wait_until(limit: Duration, mut check: impl FnMut() -> bool) -> bool {
        let start = std::time::Instant::now();
        while start.elapsed() < limit {
            if check() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        false
    }

    #[test]
    fn test_notify_change_skips_the_interval_wait() {
        let db_path = temp_db_path("trigger");
        let remote = CountingRemote::default();
        let fetches = remote.fetches.clone();
        let session = Arc::new(Mutex::new(AppSession::default()));

        // An interval far beyond the test horizon: any pass after the first
        // can only come from a change notification
        let handle = start_at(remote, session, Duration::from_secs(300), db_path.clone());

        assert!(wait_until(Duration::from_secs(5), || {
            fetches.load(Ordering::SeqCst) >= 1
        }));
        let before = fetches.load(Ordering::SeqCst);

        handle.notify_change();
        assert!(wait_until(Duration::from_secs(5), || {
            fetches.load(Ordering::SeqCst) > before
        }));

        handle.stop();
        let _ = std::fs::remove_file(&db_path);
    }

    #[test]
    fn test_stop_terminates_the_loop() {
        let db_path = temp_db_path("stop");
        let remote = CountingRemote::default();
        let fetches = remote.fetches.clone();
        let session = Arc::new(Mutex::new(AppSession::default()));

        let handle = start_at(remote, session, Duration::from_millis(20), db_path.clone());
        assert!(wait_until(Duration::from_secs(5), || {
            fetches.load(Ordering::SeqCst) >= 2
        }));
        assert!(handle.is_running());

        handle.stop();
        assert!(!handle.is_running());

        // Let any in-flight pass drain, then confirm the loop stays quiet
        std::thread::sleep(Duration::from_millis(100));
        let settled = fetches.load(Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(150));
        assert_eq!(fetches.load(Ordering::SeqCst), settled);

        let _ = std::fs::remove_file(&db_path);
    }

    #[tokio::test]
    async fn test_degraded_pass_leaves_last_sync_unset() {
        let conn = Connection::open_in_memory().unwrap();
        crate::database::schema::init_schema(&conn).unwrap();
        let settings = RemoteSettings::new("https://a.example".to_string(), "key".to_string());
        settings_service::save_remote_settings(&conn, &settings).unwrap();

        let remote = FakeRemote::new();
        remote.fail_serve_fetches.set(u32::MAX);
        let session = Arc::new(Mutex::new(AppSession::default()));

        reconcile_pass(&conn, &remote, &session).await.unwrap();
        let loaded = settings_service::load_remote_settings(&conn).unwrap().unwrap();
        assert!(loaded.last_sync.is_none());

        remote.fail_serve_fetches.set(0);
        reconcile_pass(&conn, &remote, &session).await.unwrap();
        let loaded = settings_service::load_remote_settings(&conn).unwrap().unwrap();
        assert!(loaded.last_sync.is_some());
    }
}
