pub mod background_sync;
pub mod local_store;
pub mod notify;
pub mod reconcile;
pub mod remote;
pub mod session;
pub mod settings_service;

pub use session::AppSession;
pub use settings_service::*;
