use crate::error::AppError;
use crate::models::{Case, CaseStatus, Client, DocumentMeta, GeoPoint, RemoteSettings, ServeAttempt, ServeStatus};
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};

/// Row shapes as the backend stores them (snake_case on the wire). The
/// adapter owns the translation to the camelCase in-memory entities.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServeAttemptRow {
    pub id: String,
    pub client_id: String,
    pub case_number: String,
    pub status: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub coordinates: Option<GeoPoint>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub image_data: Option<String>,
    pub attempt_number: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientRow {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub additional_emails: Option<Vec<String>>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaseRow {
    pub id: String,
    pub client_id: String,
    pub case_number: String,
    #[serde(default)]
    pub case_name: Option<String>,
    #[serde(default)]
    pub defendant_name: Option<String>,
    #[serde(default)]
    pub service_address: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentRow {
    pub id: String,
    pub client_id: String,
    #[serde(default)]
    pub case_id: Option<String>,
    pub file_name: String,
    pub file_path: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// The editable columns of a serve attempt
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ServeAttemptPatch {
    pub status: String,
    pub case_number: String,
    pub notes: String,
}

/// Input for the remote email-sending function (camelCase on that wire)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmailPayload {
    pub to: String,
    pub subject: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<GeoPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmailResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub id: Option<String>,
}

impl From<ServeAttemptRow> for ServeAttempt {
    fn from(row: ServeAttemptRow) -> Self {
        ServeAttempt {
            id: row.id,
            client_id: row.client_id,
            case_number: row.case_number,
            status: ServeStatus::from_str(&row.status),
            notes: row.notes.unwrap_or_default(),
            coordinates: row.coordinates,
            timestamp: row.timestamp,
            image_data: row.image_data,
            attempt_number: row.attempt_number,
        }
    }
}

impl From<&ServeAttempt> for ServeAttemptRow {
    fn from(serve: &ServeAttempt) -> Self {
        ServeAttemptRow {
            id: serve.id.clone(),
            client_id: serve.client_id.clone(),
            case_number: serve.case_number.clone(),
            status: serve.status.as_str().to_string(),
            notes: Some(serve.notes.clone()),
            coordinates: serve.coordinates,
            timestamp: serve.timestamp,
            image_data: serve.image_data.clone(),
            attempt_number: serve.attempt_number,
        }
    }
}

impl From<ClientRow> for Client {
    fn from(row: ClientRow) -> Self {
        Client {
            id: row.id,
            name: row.name,
            email: row.email,
            additional_emails: row.additional_emails.unwrap_or_default(),
            phone: row.phone.unwrap_or_default(),
            address: row.address.unwrap_or_default(),
            notes: row.notes.unwrap_or_default(),
            created_at: row.created_at,
        }
    }
}

impl From<&Client> for ClientRow {
    fn from(client: &Client) -> Self {
        ClientRow {
            id: client.id.clone(),
            name: client.name.clone(),
            email: client.email.clone(),
            additional_emails: Some(client.additional_emails.clone()),
            phone: Some(client.phone.clone()),
            address: Some(client.address.clone()),
            notes: Some(client.notes.clone()),
            created_at: client.created_at,
        }
    }
}

impl From<CaseRow> for Case {
    fn from(row: CaseRow) -> Self {
        Case {
            id: row.id,
            client_id: row.client_id,
            case_number: row.case_number,
            case_name: row.case_name.unwrap_or_default(),
            defendant_name: row.defendant_name.unwrap_or_default(),
            service_address: row.service_address.unwrap_or_default(),
            status: CaseStatus::from_str(&row.status),
        }
    }
}

impl From<DocumentRow> for DocumentMeta {
    fn from(row: DocumentRow) -> Self {
        DocumentMeta {
            id: row.id,
            client_id: row.client_id,
            case_id: row.case_id,
            file_name: row.file_name,
            file_path: row.file_path,
            description: row.description.unwrap_or_default(),
        }
    }
}

/// The hosted backend: row CRUD on the four tables, blob storage and the
/// email function. Implementations are passed explicitly to the layers that
/// need them; there is no module-level client singleton.
#[allow(async_fn_in_trait)]
pub trait RemoteDataService {
    async fn fetch_serve_attempts(&self) -> Result<Vec<ServeAttemptRow>, AppError>;
    async fn fetch_serve_attempts_for_client(
        &self,
        client_id: &str,
    ) -> Result<Vec<ServeAttemptRow>, AppError>;
    async fn insert_serve_attempt(&self, row: &ServeAttemptRow) -> Result<(), AppError>;
    async fn update_serve_attempt(
        &self,
        id: &str,
        patch: &ServeAttemptPatch,
    ) -> Result<(), AppError>;
    async fn delete_serve_attempt(&self, id: &str) -> Result<(), AppError>;

    async fn fetch_clients(&self) -> Result<Vec<ClientRow>, AppError>;
    async fn insert_client(&self, row: &ClientRow) -> Result<(), AppError>;
    async fn update_client(&self, row: &ClientRow) -> Result<(), AppError>;
    async fn delete_client(&self, id: &str) -> Result<(), AppError>;

    async fn fetch_documents_for_client(
        &self,
        client_id: &str,
    ) -> Result<Vec<DocumentRow>, AppError>;
    async fn delete_document(&self, id: &str) -> Result<(), AppError>;
    async fn remove_stored_file(&self, path: &str) -> Result<(), AppError>;

    async fn fetch_cases_for_client(&self, client_id: &str) -> Result<Vec<CaseRow>, AppError>;
    async fn delete_cases_for_client(&self, client_id: &str) -> Result<(), AppError>;

    async fn send_email(&self, payload: &EmailPayload) -> Result<EmailResponse, AppError>;
}

/// PostgREST-style backend client (Supabase conventions): `/rest/v1` for
/// tables, `/storage/v1` for blobs, `/functions/v1` for the email function.
pub struct SupabaseRemote {
    base_url: String,
    storage_bucket: String,
    http: reqwest::Client,
}

impl SupabaseRemote {
    pub fn new(settings: &RemoteSettings) -> Result<Self, AppError> {
        let mut headers = HeaderMap::new();
        let api_key = HeaderValue::from_str(&settings.api_key)
            .map_err(|e| AppError::Other(format!("Invalid API key header: {}", e)))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", settings.api_key))
            .map_err(|e| AppError::Other(format!("Invalid API key header: {}", e)))?;
        headers.insert("apikey", api_key);
        headers.insert(AUTHORIZATION, bearer);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            base_url: settings.service_url.trim_end_matches('/').to_string(),
            storage_bucket: settings.storage_bucket.clone(),
            http,
        })
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    async fn expect_success(
        resp: reqwest::Response,
        context: &str,
    ) -> Result<reqwest::Response, AppError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(AppError::Remote(format!(
            "{} failed with {}: {}",
            context, status, body
        )))
    }
}

impl RemoteDataService for SupabaseRemote {
    async fn fetch_serve_attempts(&self) -> Result<Vec<ServeAttemptRow>, AppError> {
        let url = format!(
            "{}?select=*&order=timestamp.desc",
            self.rest_url("serve_attempts")
        );
        let resp = self.http.get(&url).send().await?;
        let resp = Self::expect_success(resp, "serve attempt fetch").await?;
        Ok(resp.json().await?)
    }

    async fn fetch_serve_attempts_for_client(
        &self,
        client_id: &str,
    ) -> Result<Vec<ServeAttemptRow>, AppError> {
        let url = format!(
            "{}?select=*&client_id=eq.{}&order=timestamp.desc",
            self.rest_url("serve_attempts"),
            client_id
        );
        let resp = self.http.get(&url).send().await?;
        let resp = Self::expect_success(resp, "serve attempt fetch").await?;
        Ok(resp.json().await?)
    }

    async fn insert_serve_attempt(&self, row: &ServeAttemptRow) -> Result<(), AppError> {
        let resp = self
            .http
            .post(self.rest_url("serve_attempts"))
            .header("Prefer", "return=minimal")
            .json(row)
            .send()
            .await?;
        Self::expect_success(resp, "serve attempt insert").await?;
        Ok(())
    }

    async fn update_serve_attempt(
        &self,
        id: &str,
        patch: &ServeAttemptPatch,
    ) -> Result<(), AppError> {
        let url = format!("{}?id=eq.{}", self.rest_url("serve_attempts"), id);
        let resp = self.http.patch(&url).json(patch).send().await?;
        Self::expect_success(resp, "serve attempt update").await?;
        Ok(())
    }

    async fn delete_serve_attempt(&self, id: &str) -> Result<(), AppError> {
        let url = format!("{}?id=eq.{}", self.rest_url("serve_attempts"), id);
        let resp = self.http.delete(&url).send().await?;
        Self::expect_success(resp, "serve attempt delete").await?;
        Ok(())
    }

    async fn fetch_clients(&self) -> Result<Vec<ClientRow>, AppError> {
        let url = format!("{}?select=*", self.rest_url("clients"));
        let resp = self.http.get(&url).send().await?;
        let resp = Self::expect_success(resp, "client fetch").await?;
        Ok(resp.json().await?)
    }

    async fn insert_client(&self, row: &ClientRow) -> Result<(), AppError> {
        let resp = self
            .http
            .post(self.rest_url("clients"))
            .header("Prefer", "return=minimal")
            .json(row)
            .send()
            .await?;
        Self::expect_success(resp, "client insert").await?;
        Ok(())
    }

    async fn update_client(&self, row: &ClientRow) -> Result<(), AppError> {
        let url = format!("{}?id=eq.{}", self.rest_url("clients"), row.id);
        let resp = self.http.patch(&url).json(row).send().await?;
        Self::expect_success(resp, "client update").await?;
        Ok(())
    }

    async fn delete_client(&self, id: &str) -> Result<(), AppError> {
        let url = format!("{}?id=eq.{}", self.rest_url("clients"), id);
        let resp = self.http.delete(&url).send().await?;
        Self::expect_success(resp, "client delete").await?;
        Ok(())
    }

    async fn fetch_documents_for_client(
        &self,
        client_id: &str,
    ) -> Result<Vec<DocumentRow>, AppError> {
        let url = format!(
            "{}?select=*&client_id=eq.{}",
            self.rest_url("client_documents"),
            client_id
        );
        let resp = self.http.get(&url).send().await?;
        let resp = Self::expect_success(resp, "document fetch").await?;
        Ok(resp.json().await?)
    }

    async fn delete_document(&self, id: &str) -> Result<(), AppError> {
        let url = format!("{}?id=eq.{}", self.rest_url("client_documents"), id);
        let resp = self.http.delete(&url).send().await?;
        Self::expect_success(resp, "document delete").await?;
        Ok(())
    }

    async fn remove_stored_file(&self, path: &str) -> Result<(), AppError> {
        let url = format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url, self.storage_bucket, path
        );
        let resp = self.http.delete(&url).send().await?;
        Self::expect_success(resp, "stored file delete").await?;
        Ok(())
    }

    async fn fetch_cases_for_client(&self, client_id: &str) -> Result<Vec<CaseRow>, AppError> {
        let url = format!(
            "{}?select=*&client_id=eq.{}",
            self.rest_url("client_cases"),
            client_id
        );
        let resp = self.http.get(&url).send().await?;
        let resp = Self::expect_success(resp, "case fetch").await?;
        Ok(resp.json().await?)
    }

    async fn delete_cases_for_client(&self, client_id: &str) -> Result<(), AppError> {
        let url = format!(
            "{}?client_id=eq.{}",
            self.rest_url("client_cases"),
            client_id
        );
        let resp = self.http.delete(&url).send().await?;
        Self::expect_success(resp, "case delete").await?;
        Ok(())
    }

    async fn send_email(&self, payload: &EmailPayload) -> Result<EmailResponse, AppError> {
        let url = format!("{}/functions/v1/send-email", self.base_url);
        let resp = self.http.post(&url).json(payload).send().await?;
        let resp = Self::expect_success(resp, "send-email function").await?;
        Ok(resp.json().await?)
    }
}
