use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One recorded, timestamped, geotagged, photographed attempt to deliver
/// legal documents.
///
/// Canonical ordering is newest-first by `timestamp`. Serialized camelCase —
/// the local-store JSON shape; the wire shape lives in the remote adapter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServeAttempt {
    pub id: String,
    pub client_id: String,
    pub case_number: String,
    pub status: ServeStatus,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub coordinates: Option<GeoPoint>,
    pub timestamp: DateTime<Utc>,
    /// Inline photo: a base64 data URL or a remote file view URL.
    /// Immutable after creation, like the coordinates.
    #[serde(default)]
    pub image_data: Option<String>,
    /// 1-based count of attempts for the same (client, case) pair
    pub attempt_number: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ServeStatus {
    Completed,
    Failed,
}

impl ServeStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ServeStatus::Completed => "completed",
            ServeStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "completed" => ServeStatus::Completed,
            _ => ServeStatus::Failed,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            ServeStatus::Completed => "Served",
            ServeStatus::Failed => "No Answer",
        }
    }
}

/// A GPS fix captured alongside the serve photo
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
}

/// The editable surface of an existing attempt. Photo and coordinates are
/// fixed once captured.
#[derive(Debug, Clone, PartialEq)]
pub struct ServeAttemptUpdate {
    pub status: ServeStatus,
    pub case_number: String,
    pub notes: String,
}

impl ServeAttempt {
    /// Creates a new attempt stamped with the current time. The caller fills
    /// in the id (or leaves it empty for the timestamp-derived fallback) and
    /// the attempt number (0 means "compute on insert").
    pub fn new(client_id: String, case_number: String, status: ServeStatus) -> Self {
        Self {
            id: String::new(),
            client_id,
            case_number,
            status,
            notes: String::new(),
            coordinates: None,
            timestamp: Utc::now(),
            image_data: None,
            attempt_number: 0,
        }
    }
}

/// Next attempt number for a (client, case) pair: the count of existing
/// attempts for that pair plus one.
pub fn next_attempt_number(serves: &[ServeAttempt], client_id: &str, case_number: &str) -> i64 {
    let existing = serves
        .iter()
        .filter(|s| s.client_id == client_id && s.case_number == case_number)
        .count() as i64;
    existing + 1
}
