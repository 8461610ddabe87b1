use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A customer of the process-serving business.
///
/// The remote backend owns the authoritative record; local copies are a
/// read cache. Serialized camelCase — the local-store JSON shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: String,
    pub name: String,
    /// Primary contact address
    pub email: String,
    /// Extra notification recipients, unique against the primary and each other
    #[serde(default)]
    pub additional_emails: Vec<String>,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

impl Client {
    /// Creates a new client with a generated id
    pub fn new(name: String, email: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            email,
            additional_emails: Vec::new(),
            phone: String::new(),
            address: String::new(),
            notes: String::new(),
            created_at: Utc::now(),
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::Validation("Name must not be empty".to_string()));
        }

        if !self.email.contains('@') {
            return Err(AppError::Validation(
                "Please enter a valid email address".to_string(),
            ));
        }

        Ok(())
    }

    /// Adds an extra notification recipient.
    ///
    /// Rejected when the address duplicates the primary email or an address
    /// already on the list; the list is left unchanged in that case.
    pub fn add_additional_email(&mut self, email: &str) -> Result<(), AppError> {
        let addr = email.trim();

        if addr.is_empty() || !addr.contains('@') {
            return Err(AppError::Validation(
                "Please enter a valid email address".to_string(),
            ));
        }

        if self.email == addr || self.additional_emails.iter().any(|e| e == addr) {
            return Err(AppError::Validation(
                "This email is already added".to_string(),
            ));
        }

        self.additional_emails.push(addr.to_string());
        Ok(())
    }

    pub fn remove_additional_email(&mut self, email: &str) {
        self.additional_emails.retain(|e| e != email);
    }

    /// All notification recipients: primary first, then the extras
    pub fn all_recipients(&self) -> Vec<String> {
        let mut recipients = Vec::with_capacity(1 + self.additional_emails.len());
        recipients.push(self.email.clone());
        recipients.extend(self.additional_emails.iter().cloned());
        recipients
    }
}
