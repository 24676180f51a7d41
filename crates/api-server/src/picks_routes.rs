use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use picks_core::{RankedResult, UniverseProfile};
use serde::Deserialize;

use crate::{AppError, AppState};

const MAX_PICKS: usize = 10;

#[derive(Debug, Deserialize)]
pub struct PicksQuery {
    #[serde(default = "default_size")]
    pub size: UniverseProfile,
    #[serde(default = "default_n")]
    pub n: usize,
}

fn default_size() -> UniverseProfile {
    UniverseProfile::Small
}

fn default_n() -> usize {
    3
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/picks", get(get_picks))
}

async fn get_picks(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PicksQuery>,
) -> Result<Json<RankedResult>, AppError> {
    validate_n(query.n)?;
    let result = state.engine.top_picks(query.size, query.n).await?;
    Ok(Json(result))
}

pub(crate) fn validate_n(n: usize) -> Result<(), AppError> {
    if n == 0 || n > MAX_PICKS {
        return Err(AppError::BadRequest(format!(
            "n must be between 1 and {}",
            MAX_PICKS
        )));
    }
    Ok(())
}
