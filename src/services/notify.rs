use crate::models::GeoPoint;
use crate::services::remote::{EmailPayload, RemoteDataService};
use base64::Engine;
use chrono::{DateTime, Utc};

/// A notification to one or more recipients. `image_data` may carry a
/// `data:image/...;base64,` prefix; it is stripped before transmission.
#[derive(Debug, Clone, PartialEq)]
pub struct EmailRequest {
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
    pub image_data: Option<String>,
    pub coordinates: Option<GeoPoint>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SendOutcome {
    pub recipient: String,
    pub success: bool,
    pub message: String,
}

/// Aggregate result of a dispatch. Never an `Err`: notification failures
/// must not block the mutation that triggered them, so callers get a value
/// to log or surface as a secondary warning.
#[derive(Debug, Clone, PartialEq)]
pub struct EmailResult {
    pub success: bool,
    pub message: String,
    pub outcomes: Vec<SendOutcome>,
}

impl EmailResult {
    fn failure(message: String) -> Self {
        Self {
            success: false,
            message,
            outcomes: Vec::new(),
        }
    }
}

/// Splits a possibly-prefixed base64 image into (payload, format)
fn split_image_data(raw: &str) -> (String, &'static str) {
    const PREFIXES: [(&str, &'static str); 3] = [
        ("data:image/png;base64,", "png"),
        ("data:image/jpeg;base64,", "jpeg"),
        ("data:image/jpg;base64,", "jpeg"),
    ];

    for (prefix, format) in PREFIXES {
        if let Some(rest) = raw.strip_prefix(prefix) {
            return (rest.to_string(), format);
        }
    }
    (raw.to_string(), "jpeg")
}

/// Sends one email per recipient via the remote email function, all
/// requests in flight together, and reports per-recipient outcomes.
///
/// Every address is validated up-front: one invalid recipient fails the
/// whole call before any send is attempted. Individual send failures do not
/// stop the others; the aggregate fails if any recipient failed. No retries.
pub async fn send_notification<R: RemoteDataService>(
    remote: &R,
    request: &EmailRequest,
) -> EmailResult {
    if request.to.is_empty() {
        return EmailResult::failure("No recipients provided".to_string());
    }

    for addr in &request.to {
        if !addr.contains('@') {
            return EmailResult::failure(format!("Invalid recipient email address: {}", addr));
        }
    }

    let attachment = request.image_data.as_deref().and_then(|raw| {
        let (data, format) = split_image_data(raw);
        match base64::engine::general_purpose::STANDARD.decode(&data) {
            Ok(_) => Some((data, format)),
            Err(e) => {
                log::warn!("Discarding undecodable image attachment: {}", e);
                None
            }
        }
    });

    let sends = request.to.iter().map(|recipient| {
        let payload = EmailPayload {
            to: recipient.clone(),
            subject: request.subject.clone(),
            body: request.body.clone(),
            image_data: attachment.as_ref().map(|(data, _)| data.clone()),
            image_format: attachment.as_ref().map(|(_, format)| format.to_string()),
            coordinates: request.coordinates,
        };
        async move {
            match remote.send_email(&payload).await {
                Ok(resp) => SendOutcome {
                    recipient: recipient.clone(),
                    success: resp.success,
                    message: resp.message,
                },
                Err(e) => SendOutcome {
                    recipient: recipient.clone(),
                    success: false,
                    message: e.to_string(),
                },
            }
        }
    });

    let outcomes = futures::future::join_all(sends).await;

    let failed: Vec<&SendOutcome> = outcomes.iter().filter(|o| !o.success).collect();
    if failed.is_empty() {
        EmailResult {
            success: true,
            message: format!("Email sent to {} recipient(s)", outcomes.len()),
            outcomes,
        }
    } else {
        let names: Vec<&str> = failed.iter().map(|o| o.recipient.as_str()).collect();
        let message = format!(
            "Failed to send email to {} recipient(s): {}",
            failed.len(),
            names.join(", ")
        );
        EmailResult {
            success: false,
            message,
            outcomes,
        }
    }
}

fn maps_link(coords: &GeoPoint) -> String {
    format!(
        "https://www.google.com/maps?q={},{}",
        coords.latitude, coords.longitude
    )
}

fn format_date(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M UTC").to_string()
}

/// Body for a new serve-attempt notification
pub fn serve_attempt_body(
    client_name: &str,
    address: &str,
    notes: &str,
    timestamp: &DateTime<Utc>,
    coords: &GeoPoint,
    attempt_number: i64,
) -> String {
    format!(
        "Process Serve Attempt #{attempt_number}\n\
         \n\
         Client: {client_name}\n\
         Address: {address}\n\
         Date: {date}\n\
         GPS Coordinates: {lat}, {lon}\n\
         Location Link: {link}\n\
         \n\
         Notes:\n\
         {notes}\n\
         \n\
         ---\n\
         This is an automated message from ServeTracker.\n",
        date = format_date(timestamp),
        lat = coords.latitude,
        lon = coords.longitude,
        link = maps_link(coords),
    )
}

/// Body for a serve-attempt deletion notification
pub fn deletion_notice_body(
    client_name: &str,
    case_number: &str,
    serve_date: &DateTime<Utc>,
    reason: Option<&str>,
) -> String {
    let reason_block = match reason {
        Some(reason) => format!("\nReason for deletion: {}\n", reason),
        None => String::new(),
    };
    format!(
        "Serve Attempt Deleted\n\
         \n\
         Client: {client_name}\n\
         Case: {case_number}\n\
         Original Serve Date: {date}\n\
         {reason_block}\n\
         This serve attempt has been permanently removed from the system.\n\
         \n\
         ---\n\
         This is an automated message from ServeTracker.\n",
        date = format_date(serve_date),
    )
}

/// Body for a status-change notification
pub fn update_notice_body(
    client_name: &str,
    case_number: &str,
    serve_date: &DateTime<Utc>,
    old_status: &str,
    new_status: &str,
    notes: Option<&str>,
) -> String {
    let notes_block = match notes {
        Some(notes) => format!("\nNotes: {}\n", notes),
        None => String::new(),
    };
    format!(
        "Serve Attempt Updated\n\
         \n\
         Client: {client_name}\n\
         Case: {case_number}\n\
         Serve Date: {date}\n\
         Status: Changed from \"{old_status}\" to \"{new_status}\"\n\
         {notes_block}\n\
         ---\n\
         This is an automated message from ServeTracker.\n",
        date = format_date(serve_date),
    )
}
