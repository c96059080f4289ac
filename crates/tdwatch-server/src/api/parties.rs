use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct PartyItem {
    party: String,
    member_count: i32,
    overall: f64,
    transparency: f64,
    effectiveness: f64,
    integrity: f64,
    consistency: f64,
    constituency_service: f64,
    computed_at: DateTime<Utc>,
}

pub(super) async fn list_parties(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<PartyItem>>>, ApiError> {
    let rows = tdwatch_db::list_party_aggregates(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| PartyItem {
            party: row.party,
            member_count: row.member_count,
            overall: row.overall_elo,
            transparency: row.transparency_elo,
            effectiveness: row.effectiveness_elo,
            integrity: row.integrity_elo,
            consistency: row.consistency_elo,
            constituency_service: row.constituency_service_elo,
            computed_at: row.computed_at,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}
