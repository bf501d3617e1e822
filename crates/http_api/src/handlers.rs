use axum::{
    Extension,
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
};

use usagegraph_core::SubmissionPayload;

use crate::{errors::HttpError, middleware::BearerToken, state::HttpState};

pub async fn checksums(
    State(state): State<HttpState>,
    Extension(BearerToken(token)): Extension<BearerToken>,
) -> Result<impl IntoResponse, HttpError> {
    let reconcile = state.app.services.reconcile.clone();
    let table = tokio::task::spawn_blocking(move || reconcile.fingerprints(&token))
        .await
        .map_err(|err| HttpError::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string(), None))??;
    Ok(Json(table))
}

pub async fn submit(
    State(state): State<HttpState>,
    Extension(BearerToken(token)): Extension<BearerToken>,
    Json(payload): Json<SubmissionPayload>,
) -> Result<impl IntoResponse, HttpError> {
    let reconcile = state.app.services.reconcile.clone();
    let receipt = tokio::task::spawn_blocking(move || reconcile.submit(&token, &payload))
        .await
        .map_err(|err| HttpError::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string(), None))??;
    Ok(Json(receipt))
}
