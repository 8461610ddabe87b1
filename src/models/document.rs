use serde::{Deserialize, Serialize};

/// Metadata row for an uploaded document. The file itself lives in remote
/// blob storage under `file_path`; deleting removes the blob first, then
/// this row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMeta {
    pub id: String,
    pub client_id: String,
    #[serde(default)]
    pub case_id: Option<String>,
    pub file_name: String,
    pub file_path: String,
    #[serde(default)]
    pub description: String,
}
