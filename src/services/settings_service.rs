use crate::error::AppError;
use crate::models::RemoteSettings;
use rusqlite::Connection;

/// Loads the remote backend settings from the local database
pub fn load_remote_settings(conn: &Connection) -> Result<Option<RemoteSettings>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT id, service_url, api_key, storage_bucket, enabled, poll_interval_secs, last_sync, created_at, updated_at
         FROM remote_settings
         ORDER BY id DESC
         LIMIT 1",
    )?;

    let result = stmt.query_row([], |row| {
        Ok(RemoteSettings {
            id: row.get(0)?,
            service_url: row.get(1)?,
            api_key: row.get(2)?,
            storage_bucket: row.get(3)?,
            enabled: row.get(4)?,
            poll_interval_secs: row.get(5)?,
            last_sync: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    });

    match result {
        Ok(settings) => Ok(Some(settings)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(AppError::Database(e)),
    }
}

/// Saves or updates the remote backend settings
pub fn save_remote_settings(conn: &Connection, settings: &RemoteSettings) -> Result<i64, AppError> {
    let existing = load_remote_settings(conn)?;

    if let Some(existing) = existing {
        conn.execute(
            "UPDATE remote_settings
             SET service_url = ?1, api_key = ?2, storage_bucket = ?3, enabled = ?4, poll_interval_secs = ?5
             WHERE id = ?6",
            (
                &settings.service_url,
                &settings.api_key,
                &settings.storage_bucket,
                settings.enabled,
                settings.poll_interval_secs,
                existing.id,
            ),
        )?;
        Ok(existing.id)
    } else {
        conn.execute(
            "INSERT INTO remote_settings (service_url, api_key, storage_bucket, enabled, poll_interval_secs)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            (
                &settings.service_url,
                &settings.api_key,
                &settings.storage_bucket,
                settings.enabled,
                settings.poll_interval_secs,
            ),
        )?;
        Ok(conn.last_insert_rowid())
    }
}

/// Updates the timestamp of the last completed reconciliation
pub fn update_last_sync(conn: &Connection) -> Result<(), AppError> {
    conn.execute(
        "UPDATE remote_settings SET last_sync = CURRENT_TIMESTAMP WHERE id = (SELECT MAX(id) FROM remote_settings)",
        [],
    )?;
    Ok(())
}

/// Enables or disables remote synchronization
pub fn set_remote_enabled(conn: &Connection, enabled: bool) -> Result<(), AppError> {
    conn.execute(
        "UPDATE remote_settings SET enabled = ?1 WHERE id = (SELECT MAX(id) FROM remote_settings)",
        [enabled],
    )?;
    Ok(())
}

/// Deletes all remote backend settings
pub fn delete_remote_settings(conn: &Connection) -> Result<(), AppError> {
    conn.execute("DELETE FROM remote_settings", [])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        crate::database::schema::init_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn test_load_without_settings() {
        let conn = setup_test_db();
        assert!(load_remote_settings(&conn).unwrap().is_none());
    }

    #[test]
    fn test_save_and_reload() {
        let conn = setup_test_db();

        let settings = RemoteSettings::new(
            "https://example.supabase.co".to_string(),
            "anon-key".to_string(),
        );
        save_remote_settings(&conn, &settings).unwrap();

        let loaded = load_remote_settings(&conn).unwrap().unwrap();
        assert_eq!(loaded.service_url, "https://example.supabase.co");
        assert_eq!(loaded.poll_interval_secs, 10);
        assert!(loaded.enabled);
        assert!(loaded.last_sync.is_none());
    }

    #[test]
    fn test_save_twice_updates_in_place() {
        let conn = setup_test_db();

        let mut settings =
            RemoteSettings::new("https://a.example".to_string(), "key-1".to_string());
        let first_id = save_remote_settings(&conn, &settings).unwrap();

        settings.api_key = "key-2".to_string();
        let second_id = save_remote_settings(&conn, &settings).unwrap();

        assert_eq!(first_id, second_id);
        let loaded = load_remote_settings(&conn).unwrap().unwrap();
        assert_eq!(loaded.api_key, "key-2");
    }

    #[test]
    fn test_update_last_sync() {
        let conn = setup_test_db();

        let settings = RemoteSettings::new("https://a.example".to_string(), "key".to_string());
        save_remote_settings(&conn, &settings).unwrap();

        update_last_sync(&conn).unwrap();
        let loaded = load_remote_settings(&conn).unwrap().unwrap();
        assert!(loaded.last_sync.is_some());
    }
}
