use axum::{
    Json,
    extract::{Path, State},
};
use tapcast_core::ProfileRecord;
use tracing::debug;

use crate::infra::{
    app_state::AppState,
    errors::{AppError, AppResult},
};

/// `GET /profile/{uid}`: the stored profile, or 404 with
/// `{"message": "Profile not found"}`.
pub async fn get_profile(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> AppResult<Json<ProfileRecord>> {
    match state.profiles.lookup(&uid) {
        Some(record) => Ok(Json(record.clone())),
        None => {
            debug!(uid = %uid, "profile lookup miss");
            Err(AppError::not_found("Profile not found"))
        }
    }
}
