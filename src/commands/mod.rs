pub mod browser;
pub mod chat;
pub mod files;
pub mod knowledge;
pub mod settings;

use crate::api::ApiClient;
use std::sync::Arc;

/// Managed handle to the backend client for commands that talk to it
/// directly (the remote file browser).
pub struct Backend(pub Arc<ApiClient>);
