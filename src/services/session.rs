use crate::error::AppError;
use crate::models::{
    next_attempt_number, Case, Client, DocumentMeta, ServeAttempt, ServeAttemptUpdate,
};
use crate::services::local_store;
use crate::services::remote::{
    ClientRow, RemoteDataService, ServeAttemptPatch, ServeAttemptRow,
};
use rusqlite::Connection;

/// In-memory application state: the `clients` and `serves` collections the
/// UI works against. Hydrated from the local store, re-persisted on every
/// change. The remote is authoritative — every mutator writes remote-first
/// and only touches memory and the local store after the remote confirmed.
#[derive(Debug, Default)]
pub struct AppSession {
    pub clients: Vec<Client>,
    pub serves: Vec<ServeAttempt>,
}

/// Aggregate result of a client cascade delete. Steps are independent and
/// best-effort: a mid-sequence failure is recorded and later steps still run.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CascadeOutcome {
    pub serves_deleted: usize,
    pub documents_deleted: usize,
    pub cases_deleted: bool,
    pub client_deleted: bool,
    pub failures: Vec<String>,
}

impl CascadeOutcome {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

impl AppSession {
    /// Loads the session from the local store
    pub fn hydrate(conn: &Connection) -> Result<Self, AppError> {
        Ok(Self {
            clients: local_store::load_clients(conn)?,
            serves: local_store::load_serves(conn)?,
        })
    }

    /// Adopts the sets a reconciliation pull produced. The pull already
    /// rewrote the local store; this swaps the in-memory copies.
    pub fn adopt(&mut self, serves: Vec<ServeAttempt>, clients: Vec<Client>) {
        self.serves = serves;
        self.clients = clients;
    }

    pub fn client_by_id(&self, client_id: &str) -> Option<&Client> {
        self.clients.iter().find(|c| c.id == client_id)
    }

    pub fn serve_by_id(&self, serve_id: &str) -> Option<&ServeAttempt> {
        self.serves.iter().find(|s| s.id == serve_id)
    }

    fn persist_clients(&self, conn: &Connection) -> Result<(), AppError> {
        local_store::save_clients(conn, &self.clients)
    }

    fn persist_serves(&self, conn: &Connection) -> Result<(), AppError> {
        local_store::save_serves(conn, &self.serves)
    }

    pub async fn add_client<R: RemoteDataService>(
        &mut self,
        conn: &Connection,
        remote: &R,
        client: Client,
    ) -> Result<(), AppError> {
        client.validate()?;

        remote.insert_client(&ClientRow::from(&client)).await?;

        self.clients.push(client);
        self.persist_clients(conn)
    }

    pub async fn update_client<R: RemoteDataService>(
        &mut self,
        conn: &Connection,
        remote: &R,
        updated: Client,
    ) -> Result<(), AppError> {
        updated.validate()?;

        if !self.clients.iter().any(|c| c.id == updated.id) {
            return Err(AppError::NotFound("Client".to_string()));
        }

        remote.update_client(&ClientRow::from(&updated)).await?;

        for client in &mut self.clients {
            if client.id == updated.id {
                *client = updated.clone();
            }
        }
        self.persist_clients(conn)
    }

    /// Deletes a client and everything hanging off it: serve attempts, then
    /// documents (blob before metadata row), then cases, then the client row.
    /// No transaction spans the steps; each failure is logged, recorded in
    /// the outcome, and the sequence continues. Local state drops the client
    /// either way.
    pub async fn delete_client<R: RemoteDataService>(
        &mut self,
        conn: &Connection,
        remote: &R,
        client_id: &str,
    ) -> Result<CascadeOutcome, AppError> {
        let mut outcome = CascadeOutcome::default();

        // Step 1: serve attempts
        match remote.fetch_serve_attempts_for_client(client_id).await {
            Ok(rows) => {
                for row in rows {
                    match remote.delete_serve_attempt(&row.id).await {
                        Ok(()) => outcome.serves_deleted += 1,
                        Err(e) => {
                            log::error!("Cascade: serve attempt {} delete failed: {}", row.id, e);
                            outcome
                                .failures
                                .push(format!("serve attempt {}: {}", row.id, e));
                        }
                    }
                }
            }
            Err(e) => {
                log::error!("Cascade: serve attempt enumeration failed: {}", e);
                outcome.failures.push(format!("serve attempts: {}", e));
            }
        }

        // Step 2: documents, blob before metadata row
        match remote.fetch_documents_for_client(client_id).await {
            Ok(rows) => {
                for row in rows {
                    if let Err(e) = remote.remove_stored_file(&row.file_path).await {
                        log::error!("Cascade: blob {} delete failed: {}", row.file_path, e);
                        outcome
                            .failures
                            .push(format!("stored file {}: {}", row.file_path, e));
                    }
                    match remote.delete_document(&row.id).await {
                        Ok(()) => outcome.documents_deleted += 1,
                        Err(e) => {
                            log::error!("Cascade: document {} delete failed: {}", row.id, e);
                            outcome.failures.push(format!("document {}: {}", row.id, e));
                        }
                    }
                }
            }
            Err(e) => {
                log::error!("Cascade: document enumeration failed: {}", e);
                outcome.failures.push(format!("documents: {}", e));
            }
        }

        // Step 3: cases
        match remote.delete_cases_for_client(client_id).await {
            Ok(()) => outcome.cases_deleted = true,
            Err(e) => {
                log::error!("Cascade: case delete failed: {}", e);
                outcome.failures.push(format!("cases: {}", e));
            }
        }

        // Step 4: the client row itself
        match remote.delete_client(client_id).await {
            Ok(()) => outcome.client_deleted = true,
            Err(e) => {
                log::error!("Cascade: client {} delete failed: {}", client_id, e);
                outcome.failures.push(format!("client: {}", e));
            }
        }

        // Local state drops the client regardless; the next pull restores
        // anything the remote still holds.
        self.clients.retain(|c| c.id != client_id);
        self.serves.retain(|s| s.client_id != client_id);
        self.persist_clients(conn)?;
        self.persist_serves(conn)?;

        if !outcome.is_complete() {
            log::warn!(
                "Cascade delete of client {} left {} failed step(s)",
                client_id,
                outcome.failures.len()
            );
        }

        Ok(outcome)
    }

    /// Records a new serve attempt. Fills in the timestamp-derived id
    /// fallback and the attempt number when the caller left them unset, and
    /// prepends — newest first.
    pub async fn add_serve<R: RemoteDataService>(
        &mut self,
        conn: &Connection,
        remote: &R,
        mut serve: ServeAttempt,
    ) -> Result<ServeAttempt, AppError> {
        if serve.client_id.trim().is_empty() {
            return Err(AppError::Validation(
                "Serve attempt must reference a client".to_string(),
            ));
        }

        if serve.id.is_empty() {
            serve.id = format!("serve-{}", ulid::Ulid::new());
        }
        if serve.attempt_number == 0 {
            serve.attempt_number =
                next_attempt_number(&self.serves, &serve.client_id, &serve.case_number);
        }

        remote
            .insert_serve_attempt(&ServeAttemptRow::from(&serve))
            .await?;

        self.serves.insert(0, serve.clone());
        self.persist_serves(conn)?;
        Ok(serve)
    }

    /// Edits an existing attempt: status, case number and notes only.
    pub async fn update_serve<R: RemoteDataService>(
        &mut self,
        conn: &Connection,
        remote: &R,
        serve_id: &str,
        update: ServeAttemptUpdate,
    ) -> Result<(), AppError> {
        if !self.serves.iter().any(|s| s.id == serve_id) {
            return Err(AppError::NotFound("Serve attempt".to_string()));
        }

        let patch = ServeAttemptPatch {
            status: update.status.as_str().to_string(),
            case_number: update.case_number.clone(),
            notes: update.notes.clone(),
        };
        remote.update_serve_attempt(serve_id, &patch).await?;

        for serve in &mut self.serves {
            if serve.id == serve_id {
                serve.status = update.status.clone();
                serve.case_number = update.case_number.clone();
                serve.notes = update.notes.clone();
            }
        }
        self.persist_serves(conn)
    }

    /// Deletes one serve attempt, remote-first. On a failed remote delete the
    /// record stays visible everywhere and the error reaches the caller.
    pub async fn delete_serve<R: RemoteDataService>(
        &mut self,
        conn: &Connection,
        remote: &R,
        serve_id: &str,
    ) -> Result<(), AppError> {
        remote.delete_serve_attempt(serve_id).await?;

        self.serves.retain(|s| s.id != serve_id);
        self.persist_serves(conn)
    }

    /// Lists the cases on file for a client
    pub async fn cases_for_client<R: RemoteDataService>(
        &self,
        remote: &R,
        client_id: &str,
    ) -> Result<Vec<Case>, AppError> {
        let rows = remote.fetch_cases_for_client(client_id).await?;
        Ok(rows.into_iter().map(Case::from).collect())
    }

    /// Lists the documents on file for a client
    pub async fn documents_for_client<R: RemoteDataService>(
        &self,
        remote: &R,
        client_id: &str,
    ) -> Result<Vec<DocumentMeta>, AppError> {
        let rows = remote.fetch_documents_for_client(client_id).await?;
        Ok(rows.into_iter().map(DocumentMeta::from).collect())
    }

    /// Deletes a single document: blob from storage first, then the
    /// metadata row.
    pub async fn delete_document<R: RemoteDataService>(
        &self,
        remote: &R,
        document: &DocumentMeta,
    ) -> Result<(), AppError> {
        remote.remove_stored_file(&document.file_path).await?;
        remote.delete_document(&document.id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GeoPoint, ServeStatus};
    use crate::services::remote::testing::FakeRemote;
    use crate::services::remote::{CaseRow, DocumentRow};

    fn setup_test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        crate::database::schema::init_schema(&conn).unwrap();
        conn
    }

    fn new_serve(client_id: &str, case_number: &str) -> ServeAttempt {
        let mut serve = ServeAttempt::new(
            client_id.to_string(),
            case_number.to_string(),
            ServeStatus::Failed,
        );
        serve.coordinates = Some(GeoPoint {
            latitude: 36.15,
            longitude: -95.99,
            accuracy: Some(12.0),
        });
        serve
    }

    #[tokio::test]
    async fn test_add_client_writes_remote_then_local() {
        let conn = setup_test_db();
        let remote = FakeRemote::new();
        let mut session = AppSession::default();

        let client = Client::new("Jane Doe".to_string(), "jane@x.com".to_string());
        session
            .add_client(&conn, &remote, client.clone())
            .await
            .unwrap();

        assert_eq!(remote.clients.borrow().len(), 1);
        assert_eq!(session.clients.len(), 1);
        assert_eq!(local_store::load_clients(&conn).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_client_preserves_id() {
        let conn = setup_test_db();
        let remote = FakeRemote::new();
        let mut session = AppSession::default();

        let client = Client::new("Jane Doe".to_string(), "jane@x.com".to_string());
        let id = client.id.clone();
        session
            .add_client(&conn, &remote, client.clone())
            .await
            .unwrap();

        let mut updated = client;
        updated.email = "jane2@x.com".to_string();
        session.update_client(&conn, &remote, updated).await.unwrap();

        let row = remote.clients.borrow()[0].clone();
        assert_eq!(row.id, id);
        assert_eq!(row.email, "jane2@x.com");
        assert_eq!(session.client_by_id(&id).unwrap().email, "jane2@x.com");
    }

    #[tokio::test]
    async fn test_add_serve_assigns_id_and_attempt_number() {
        let conn = setup_test_db();
        let remote = FakeRemote::new();
        let mut session = AppSession::default();

        let first = session
            .add_serve(&conn, &remote, new_serve("client-1", "CASE-1"))
            .await
            .unwrap();
        assert!(first.id.starts_with("serve-"));
        assert_eq!(first.attempt_number, 1);

        let second = session
            .add_serve(&conn, &remote, new_serve("client-1", "CASE-1"))
            .await
            .unwrap();
        assert_eq!(second.attempt_number, 2);

        // A different case starts its own count
        let other = session
            .add_serve(&conn, &remote, new_serve("client-1", "CASE-2"))
            .await
            .unwrap();
        assert_eq!(other.attempt_number, 1);

        // Newest first in memory
        assert_eq!(session.serves[0].id, other.id);
        assert_eq!(remote.serves.borrow().len(), 3);
    }

    #[tokio::test]
    async fn test_update_serve_edits_allowed_fields_only() {
        let conn = setup_test_db();
        let remote = FakeRemote::new();
        let mut session = AppSession::default();

        let serve = session
            .add_serve(&conn, &remote, new_serve("client-1", "CASE-1"))
            .await
            .unwrap();
        let original_coords = serve.coordinates;

        session
            .update_serve(
                &conn,
                &remote,
                &serve.id,
                ServeAttemptUpdate {
                    status: ServeStatus::Completed,
                    case_number: "CASE-9".to_string(),
                    notes: "handed to defendant".to_string(),
                },
            )
            .await
            .unwrap();

        let updated = session.serve_by_id(&serve.id).unwrap();
        assert_eq!(updated.status, ServeStatus::Completed);
        assert_eq!(updated.case_number, "CASE-9");
        assert_eq!(updated.notes, "handed to defendant");
        // Coordinates are immutable after creation
        assert_eq!(updated.coordinates, original_coords);

        let row = remote.serves.borrow()[0].clone();
        assert_eq!(row.status, "completed");
        assert_eq!(row.case_number, "CASE-9");
    }

    #[tokio::test]
    async fn test_delete_serve_failure_leaves_record_everywhere() {
        let conn = setup_test_db();
        let remote = FakeRemote::new();
        let mut session = AppSession::default();

        let serve = session
            .add_serve(&conn, &remote, new_serve("client-1", "CASE-1"))
            .await
            .unwrap();

        remote.fail_delete_serve.set(true);
        let result = session.delete_serve(&conn, &remote, &serve.id).await;

        assert!(result.is_err());
        assert_eq!(remote.serves.borrow().len(), 1);
        assert_eq!(session.serves.len(), 1);
        assert_eq!(local_store::load_serves(&conn).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_serve_success_removes_everywhere() {
        let conn = setup_test_db();
        let remote = FakeRemote::new();
        let mut session = AppSession::default();

        let serve = session
            .add_serve(&conn, &remote, new_serve("client-1", "CASE-1"))
            .await
            .unwrap();

        session.delete_serve(&conn, &remote, &serve.id).await.unwrap();

        assert!(remote.serves.borrow().is_empty());
        assert!(session.serves.is_empty());
        assert!(local_store::load_serves(&conn).unwrap().is_empty());
    }

    fn seed_dependents(remote: &FakeRemote, client_id: &str) {
        for n in 0..3 {
            remote.serves.borrow_mut().push(ServeAttemptRow::from(&{
                let mut s = new_serve(client_id, "CASE-1");
                s.id = format!("serve-{}", n);
                s.attempt_number = n + 1;
                s
            }));
        }
        for n in 0..2 {
            let path = format!("{}/doc-{}.pdf", client_id, n);
            remote.stored_files.borrow_mut().push(path.clone());
            remote.documents.borrow_mut().push(DocumentRow {
                id: format!("doc-{}", n),
                client_id: client_id.to_string(),
                case_id: None,
                file_name: format!("doc-{}.pdf", n),
                file_path: path,
                description: None,
            });
        }
        remote.cases.borrow_mut().push(CaseRow {
            id: "case-1".to_string(),
            client_id: client_id.to_string(),
            case_number: "CASE-1".to_string(),
            case_name: None,
            defendant_name: None,
            service_address: None,
            status: "pending".to_string(),
        });
    }

    #[tokio::test]
    async fn test_cascade_delete_leaves_no_references() {
        let conn = setup_test_db();
        let remote = FakeRemote::new();
        let mut session = AppSession::default();

        let client = Client::new("Jane Doe".to_string(), "jane@x.com".to_string());
        let client_id = client.id.clone();
        session.add_client(&conn, &remote, client).await.unwrap();
        seed_dependents(&remote, &client_id);

        let outcome = session
            .delete_client(&conn, &remote, &client_id)
            .await
            .unwrap();

        assert!(outcome.is_complete());
        assert_eq!(outcome.serves_deleted, 3);
        assert_eq!(outcome.documents_deleted, 2);
        assert!(outcome.cases_deleted);
        assert!(outcome.client_deleted);

        assert!(remote.serves.borrow().is_empty());
        assert!(remote.documents.borrow().is_empty());
        assert!(remote.cases.borrow().is_empty());
        assert!(remote.clients.borrow().is_empty());
        assert!(remote.stored_files.borrow().is_empty());

        assert!(session.clients.is_empty());
        assert!(local_store::load_clients(&conn).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cascade_continues_past_failed_step() {
        let conn = setup_test_db();
        let remote = FakeRemote::new();
        let mut session = AppSession::default();

        let client = Client::new("Jane Doe".to_string(), "jane@x.com".to_string());
        let client_id = client.id.clone();
        session.add_client(&conn, &remote, client).await.unwrap();
        seed_dependents(&remote, &client_id);

        remote.fail_remove_stored_file.set(true);
        let outcome = session
            .delete_client(&conn, &remote, &client_id)
            .await
            .unwrap();

        // Blob removals failed but every later step still ran
        assert!(!outcome.is_complete());
        assert_eq!(outcome.failures.len(), 2);
        assert_eq!(outcome.documents_deleted, 2);
        assert!(outcome.cases_deleted);
        assert!(outcome.client_deleted);
        assert_eq!(remote.stored_files.borrow().len(), 2);
        assert!(remote.clients.borrow().is_empty());

        // Local state dropped the client regardless
        assert!(session.clients.is_empty());
    }

    #[tokio::test]
    async fn test_delete_document_removes_blob_then_row() {
        let remote = FakeRemote::new();
        let session = AppSession::default();

        remote.stored_files.borrow_mut().push("c1/a.pdf".to_string());
        remote.documents.borrow_mut().push(DocumentRow {
            id: "doc-1".to_string(),
            client_id: "c1".to_string(),
            case_id: None,
            file_name: "a.pdf".to_string(),
            file_path: "c1/a.pdf".to_string(),
            description: None,
        });

        let docs = session.documents_for_client(&remote, "c1").await.unwrap();
        session.delete_document(&remote, &docs[0]).await.unwrap();

        assert!(remote.stored_files.borrow().is_empty());
        assert!(remote.documents.borrow().is_empty());
    }
}
