use keysync_core::SnapshotStore;
use keysync_directory::{Directory, OauthClient};
use std::sync::Arc;

/// Shared application state handed to every request handler.
pub struct AppState {
    /// Current snapshot, refreshed by the background synchronizer
    pub store: Arc<SnapshotStore>,

    /// Directory client used for key submissions
    pub directory: Arc<dyn Directory>,

    /// OAuth client for the submission flow
    pub oauth: Arc<OauthClient>,
}
