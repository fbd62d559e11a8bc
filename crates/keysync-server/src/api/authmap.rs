use axum::extract::State;
use axum::response::Json;
use keysync_core::Snapshot;
use std::sync::Arc;

use crate::state::AppState;

/// Serve the current snapshot.
///
/// Reads only the in-memory store, so this never blocks on a rebuild in
/// progress.
pub async fn get_authmap(State(state): State<Arc<AppState>>) -> Json<Snapshot> {
    Json((*state.store.current()).clone())
}
