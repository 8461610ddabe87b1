use serde::{Deserialize, Serialize};

/// A legal matter associated with a client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Case {
    pub id: String,
    pub client_id: String,
    pub case_number: String,
    #[serde(default)]
    pub case_name: String,
    #[serde(default)]
    pub defendant_name: String,
    #[serde(default)]
    pub service_address: String,
    pub status: CaseStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CaseStatus {
    Pending,
    Attempted,
    Served,
    Canceled,
}

impl CaseStatus {
    pub fn as_str(&self) -> &str {
        match self {
            CaseStatus::Pending => "pending",
            CaseStatus::Attempted => "attempted",
            CaseStatus::Served => "served",
            CaseStatus::Canceled => "canceled",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "attempted" => CaseStatus::Attempted,
            "served" => CaseStatus::Served,
            "canceled" => CaseStatus::Canceled,
            _ => CaseStatus::Pending,
        }
    }
}
