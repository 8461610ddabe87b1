use serde::{Deserialize, Serialize};

/// Connection settings for the hosted backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteSettings {
    pub id: i64,
    pub service_url: String,
    pub api_key: String,
    pub storage_bucket: String,
    pub enabled: bool,
    pub poll_interval_secs: i64,
    pub last_sync: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl RemoteSettings {
    pub fn new(service_url: String, api_key: String) -> Self {
        Self {
            id: 0,
            service_url,
            api_key,
            storage_bucket: "client-documents".to_string(),
            enabled: true,
            poll_interval_secs: 10,
            last_sync: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }
}
