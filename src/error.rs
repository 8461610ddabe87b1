use std::fmt;

/// Central error types for the ServeTracker core
#[derive(Debug)]
pub enum AppError {
    /// Local store error (rusqlite)
    Database(rusqlite::Error),
    /// HTTP transport error (reqwest)
    Http(reqwest::Error),
    /// Remote backend rejected the request (non-success status, bad payload)
    Remote(String),
    /// Filesystem error (data directory, database file)
    Io(std::io::Error),
    /// JSON (de)serialization error
    Serialization(serde_json::Error),
    /// Validation error (e.g. invalid inputs)
    Validation(String),
    /// Resource not found
    NotFound(String),
    /// General error
    Other(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::Database(e) => write!(f, "Database error: {}", e),
            AppError::Http(e) => write!(f, "HTTP error: {}", e),
            AppError::Remote(msg) => write!(f, "Remote error: {}", msg),
            AppError::Io(e) => write!(f, "I/O error: {}", e),
            AppError::Serialization(e) => write!(f, "Serialization error: {}", e),
            AppError::Validation(msg) => write!(f, "Validation error: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for AppError {}

// Conversions from other error types
impl From<rusqlite::Error> for AppError {
    fn from(e: rusqlite::Error) -> Self {
        AppError::Database(e)
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::Http(e)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Serialization(e)
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Io(e)
    }
}

/// User-friendly error messages for the UI layer
impl AppError {
    #[allow(dead_code)]
    pub fn user_message(&self) -> String {
        match self {
            AppError::Database(_) => "A local storage error occurred. Please try again.".to_string(),
            AppError::Http(_) => {
                "Could not reach the server. Please check your connection.".to_string()
            }
            AppError::Remote(_) => "The server rejected the request.".to_string(),
            AppError::Io(_) => "A file system error occurred. Please try again.".to_string(),
            AppError::Serialization(_) => "Stored data could not be read.".to_string(),
            AppError::Validation(msg) => msg.clone(),
            AppError::NotFound(msg) => format!("{} was not found.", msg),
            AppError::Other(msg) => msg.clone(),
        }
    }
}
