use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tdwatch_core::IdeologyDimension;
use tdwatch_db::{DbError, PoliticianRow};
use tdwatch_scoring::IdeologyProfile;

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct PoliticiansQuery {
    pub party: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct HistoryQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct RatingsItem {
    overall: f64,
    transparency: f64,
    effectiveness: f64,
    integrity: f64,
    consistency: f64,
    constituency_service: f64,
}

#[derive(Debug, Serialize)]
pub(super) struct PoliticianItem {
    name: String,
    party: String,
    constituency: String,
    ratings: RatingsItem,
    total_stories: i32,
    positive_stories: i32,
    negative_stories: i32,
    neutral_stories: i32,
    national_rank: Option<i32>,
    party_rank: Option<i32>,
    constituency_rank: Option<i32>,
    last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub(super) struct PoliticianDetail {
    #[serde(flatten)]
    politician: PoliticianItem,
    aliases: Vec<String>,
    /// `null` for dimensions with no accumulated evidence.
    ideology: BTreeMap<&'static str, Option<f64>>,
}

#[derive(Debug, Serialize)]
pub(super) struct RatingHistoryItem {
    article_id: Option<i64>,
    dimension: String,
    old_value: f64,
    new_value: f64,
    delta: f64,
    created_at: DateTime<Utc>,
}

impl From<PoliticianRow> for PoliticianItem {
    fn from(row: PoliticianRow) -> Self {
        Self {
            name: row.name,
            party: row.party,
            constituency: row.constituency,
            ratings: RatingsItem {
                overall: row.overall_elo,
                transparency: row.transparency_elo,
                effectiveness: row.effectiveness_elo,
                integrity: row.integrity_elo,
                consistency: row.consistency_elo,
                constituency_service: row.constituency_service_elo,
            },
            total_stories: row.total_stories,
            positive_stories: row.positive_stories,
            negative_stories: row.negative_stories,
            neutral_stories: row.neutral_stories,
            national_rank: row.national_rank,
            party_rank: row.party_rank,
            constituency_rank: row.constituency_rank,
            last_updated: row.last_updated,
        }
    }
}

fn ideology_map(profile: &IdeologyProfile) -> BTreeMap<&'static str, Option<f64>> {
    IdeologyDimension::ALL
        .into_iter()
        .map(|dimension| (dimension.as_str(), profile.value(dimension)))
        .collect()
}

async fn find_politician(
    state: &AppState,
    request_id: &str,
    name: &str,
) -> Result<PoliticianRow, ApiError> {
    match tdwatch_db::get_politician_by_name(&state.pool, name).await {
        Ok(row) => Ok(row),
        Err(DbError::NotFound) => Err(ApiError::new(
            request_id,
            "not_found",
            format!("politician '{name}' not found"),
        )),
        Err(e) => Err(map_db_error(request_id.to_string(), &e)),
    }
}

pub(super) async fn list_politicians(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<PoliticiansQuery>,
) -> Result<Json<ApiResponse<Vec<PoliticianItem>>>, ApiError> {
    let party = query
        .party
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty());
    let rows = tdwatch_db::list_politicians(&state.pool, party, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(PoliticianItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn get_politician(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<PoliticianDetail>>, ApiError> {
    let row = find_politician(&state, &req_id.0, &name).await?;
    let scores = tdwatch_db::list_ideology_scores(&state.pool, row.id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    let profile = IdeologyProfile::from_rows(&scores);

    let aliases = row.aliases.clone();
    Ok(Json(ApiResponse {
        data: PoliticianDetail {
            politician: PoliticianItem::from(row),
            aliases,
            ideology: ideology_map(&profile),
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn list_rating_history(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(name): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<ApiResponse<Vec<RatingHistoryItem>>>, ApiError> {
    let politician = find_politician(&state, &req_id.0, &name).await?;
    let rows =
        tdwatch_db::list_rating_history(&state.pool, politician.id, normalize_limit(query.limit))
            .await
            .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| RatingHistoryItem {
            article_id: row.article_id,
            dimension: row.dimension,
            old_value: row.old_value,
            new_value: row.new_value,
            delta: row.delta,
            created_at: row.created_at,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}
