use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::models::{AddDocumentsRequest, AddDocumentsResponse};
use crate::search::vector::VectorIndex;
use crate::state::AppState;

/// POST /api/documents - Embed and store listing documents.
///
/// Ids already in the store are skipped without re-embedding.
pub async fn add_documents(
    State(state): State<AppState>,
    Json(req): Json<AddDocumentsRequest>,
) -> Result<Json<AddDocumentsResponse>, (StatusCode, String)> {
    if req.documents.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "documents must not be empty".to_string()));
    }
    if let Some(bad) = req
        .documents
        .iter()
        .find(|d| d.id.trim().is_empty() || d.text.trim().is_empty())
    {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("document {:?} needs a non-empty id and text", bad.id),
        ));
    }

    let submitted = req.documents.len();
    let (fresh, known): (Vec<_>, Vec<_>) = req
        .documents
        .into_iter()
        .partition(|d| !state.store.contains(&d.id));

    let mut skipped = known.len();
    if !fresh.is_empty() {
        let texts: Vec<String> = fresh.iter().map(|d| d.text.clone()).collect();
        let embeddings = state.embedder.embed(&texts).await.map_err(|e| {
            tracing::warn!("Document embedding failed: {e}");
            (StatusCode::BAD_GATEWAY, e.to_string())
        })?;

        let outcome = state.store.add_documents(fresh, embeddings).map_err(|e| {
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;
        skipped += outcome.skipped;
    }

    let added = submitted - skipped;
    tracing::info!("Indexed {added} documents ({skipped} already present)");

    Ok(Json(AddDocumentsResponse {
        added,
        skipped,
        total: state.store.len(),
    }))
}
