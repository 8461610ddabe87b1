use crate::error::AppError;
use crate::models::{Client, ServeAttempt};
use rusqlite::{Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Fixed keys for the two cached collections. There is no schema versioning:
/// a shape change in a stored record requires a compatible reader.
pub const CLIENTS_KEY: &str = "serve-tracker-clients";
pub const SERVES_KEY: &str = "serve-tracker-serves";

fn read_collection<T: DeserializeOwned>(conn: &Connection, key: &str) -> Result<Vec<T>, AppError> {
    let value: Option<String> = conn
        .query_row(
            "SELECT value FROM local_store WHERE key = ?1",
            [key],
            |row| row.get(0),
        )
        .optional()?;

    match value {
        Some(text) => Ok(serde_json::from_str(&text)?),
        None => Ok(Vec::new()),
    }
}

fn write_collection<T: Serialize>(
    conn: &Connection,
    key: &str,
    items: &[T],
) -> Result<(), AppError> {
    let text = serde_json::to_string(items)?;
    conn.execute(
        "INSERT INTO local_store (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        rusqlite::params![key, text],
    )?;
    Ok(())
}

pub fn load_clients(conn: &Connection) -> Result<Vec<Client>, AppError> {
    read_collection(conn, CLIENTS_KEY)
}

pub fn save_clients(conn: &Connection, clients: &[Client]) -> Result<(), AppError> {
    write_collection(conn, CLIENTS_KEY, clients)
}

pub fn load_serves(conn: &Connection) -> Result<Vec<ServeAttempt>, AppError> {
    read_collection(conn, SERVES_KEY)
}

pub fn save_serves(conn: &Connection, serves: &[ServeAttempt]) -> Result<(), AppError> {
    write_collection(conn, SERVES_KEY, serves)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ServeAttempt, ServeStatus};

    fn setup_test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        crate::database::schema::init_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn test_missing_key_reads_empty() {
        let conn = setup_test_db();
        assert!(load_clients(&conn).unwrap().is_empty());
        assert!(load_serves(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let conn = setup_test_db();

        let client = Client::new("Jane Doe".to_string(), "jane@x.com".to_string());
        save_clients(&conn, &[client.clone()]).unwrap();

        let mut serve = ServeAttempt::new(
            client.id.clone(),
            "CASE-1".to_string(),
            ServeStatus::Completed,
        );
        serve.id = "serve-1".to_string();
        serve.attempt_number = 1;
        save_serves(&conn, &[serve.clone()]).unwrap();

        assert_eq!(load_clients(&conn).unwrap(), vec![client]);
        assert_eq!(load_serves(&conn).unwrap(), vec![serve]);
    }

    #[test]
    fn test_overwrite_replaces_previous_contents() {
        let conn = setup_test_db();

        let first = Client::new("First".to_string(), "first@x.com".to_string());
        let second = Client::new("Second".to_string(), "second@x.com".to_string());

        save_clients(&conn, &[first]).unwrap();
        save_clients(&conn, &[second.clone()]).unwrap();

        assert_eq!(load_clients(&conn).unwrap(), vec![second]);

        // Overwriting with the empty set clears the cache
        save_clients(&conn, &[]).unwrap();
        assert!(load_clients(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_entry_is_an_error() {
        let conn = setup_test_db();
        conn.execute(
            "INSERT INTO local_store (key, value) VALUES (?1, 'not-json')",
            [CLIENTS_KEY],
        )
        .unwrap();

        assert!(load_clients(&conn).is_err());
    }
}
