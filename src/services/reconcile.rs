use crate::error::AppError;
use crate::models::{Client, ServeAttempt};
use crate::services::local_store;
use crate::services::remote::RemoteDataService;
use rusqlite::Connection;
use std::time::Duration;

/// Remote fetch retry policy: fixed delay, no jitter
const FETCH_ATTEMPTS: u32 = 3;
const FETCH_RETRY_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncStats {
    pub serves_pulled: usize,
    pub clients_pulled: usize,
}

/// What a reconciliation pass produced: the sets the session should adopt.
/// The `*_fresh` flags record whether a set came from the remote or is the
/// cached local copy left over after a failed pull.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileOutcome {
    pub serves: Vec<ServeAttempt>,
    pub clients: Vec<Client>,
    pub serves_fresh: bool,
    pub clients_fresh: bool,
}

impl ReconcileOutcome {
    /// True when both collections were actually pulled this pass
    pub fn is_fresh(&self) -> bool {
        self.serves_fresh && self.clients_fresh
    }

    pub fn stats(&self) -> SyncStats {
        SyncStats {
            serves_pulled: self.serves.len(),
            clients_pulled: self.clients.len(),
        }
    }
}

/// Pulls all serve attempts from the remote and overwrites the local cache
/// with exactly that set — including the empty set, so a deletion performed
/// anywhere is eventually reflected everywhere.
pub async fn pull_serve_attempts<R: RemoteDataService>(
    conn: &Connection,
    remote: &R,
) -> Result<Vec<ServeAttempt>, AppError> {
    let mut last_err = None;

    for attempt in 1..=FETCH_ATTEMPTS {
        match remote.fetch_serve_attempts().await {
            Ok(rows) => {
                let mut serves: Vec<ServeAttempt> =
                    rows.into_iter().map(ServeAttempt::from).collect();
                // Canonical order is newest-first, whatever the remote returned
                serves.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

                local_store::save_serves(conn, &serves)?;
                return Ok(serves);
            }
            Err(e) => {
                log::warn!(
                    "Serve attempt fetch failed (attempt {}/{}): {}",
                    attempt,
                    FETCH_ATTEMPTS,
                    e
                );
                last_err = Some(e);
                if attempt < FETCH_ATTEMPTS {
                    tokio::time::sleep(FETCH_RETRY_DELAY).await;
                }
            }
        }
    }

    Err(last_err.unwrap_or_else(|| AppError::Other("Serve attempt fetch failed".to_string())))
}

/// Pulls all clients from the remote and overwrites the local cache
pub async fn pull_clients<R: RemoteDataService>(
    conn: &Connection,
    remote: &R,
) -> Result<Vec<Client>, AppError> {
    let rows = remote.fetch_clients().await?;
    let clients: Vec<Client> = rows.into_iter().map(Client::from).collect();

    local_store::save_clients(conn, &clients)?;
    Ok(clients)
}

/// One reconciliation pass. Every trigger — startup, the poll interval and
/// change notifications — funnels into this routine, which is idempotent and
/// safe to invoke repeatedly.
///
/// A failed remote read degrades to whatever the local store currently
/// holds; errors here are the local store's own only. The outcome's
/// freshness flags tell the caller which case it got.
pub async fn reconcile_now<R: RemoteDataService>(
    conn: &Connection,
    remote: &R,
) -> Result<ReconcileOutcome, AppError> {
    let (serves, serves_fresh) = match pull_serve_attempts(conn, remote).await {
        Ok(serves) => (serves, true),
        Err(e) => {
            log::warn!("Serve attempt pull failed, keeping cached copies: {}", e);
            (local_store::load_serves(conn)?, false)
        }
    };

    let (clients, clients_fresh) = match pull_clients(conn, remote).await {
        Ok(clients) => (clients, true),
        Err(e) => {
            log::warn!("Client pull failed, keeping cached copies: {}", e);
            (local_store::load_clients(conn)?, false)
        }
    };

    Ok(ReconcileOutcome {
        serves,
        clients,
        serves_fresh,
        clients_fresh,
    })
}
