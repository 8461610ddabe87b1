pub mod case;
pub mod client;
pub mod document;
pub mod remote_settings;
pub mod serve_attempt;

pub use case::{Case, CaseStatus};
pub use client::Client;
pub use document::DocumentMeta;
pub use remote_settings::RemoteSettings;
pub use serve_attempt::{
    next_attempt_number, GeoPoint, ServeAttempt, ServeAttemptUpdate, ServeStatus,
};
