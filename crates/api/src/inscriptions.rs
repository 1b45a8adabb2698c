//! Inscription endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use ordbridge_db::Inscription;
use serde::{Deserialize, Serialize};

use crate::{ApiError, ApiState};

const DEFAULT_PAGE_LIMIT: u64 = 100;
const DEFAULT_LATEST_LIMIT: u64 = 20;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page_limit")]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
}

fn default_page_limit() -> u64 {
    DEFAULT_PAGE_LIMIT
}

#[derive(Debug, Deserialize)]
pub struct LatestQuery {
    #[serde(default = "default_latest_limit")]
    pub limit: u64,
}

fn default_latest_limit() -> u64 {
    DEFAULT_LATEST_LIMIT
}

/// Full inscription row; content is base64 so the JSON stays valid for
/// arbitrary bytes.
#[derive(Debug, Serialize)]
pub struct InscriptionResponse {
    pub id: String,
    pub content_type: String,
    pub content: String,
    pub content_size: usize,
    pub block_height: u64,
    pub block_hash: String,
    pub txid: String,
    pub vout: u32,
    pub owner: String,
    pub timestamp: u64,
    pub inscription_number: u64,
}

impl From<Inscription> for InscriptionResponse {
    fn from(inscription: Inscription) -> Self {
        Self {
            id: inscription.id,
            content_type: inscription.content_type,
            content: BASE64.encode(&inscription.content),
            content_size: inscription.content.len(),
            block_height: inscription.block_height,
            block_hash: inscription.block_hash,
            txid: inscription.txid,
            vout: inscription.vout,
            owner: inscription.owner,
            timestamp: inscription.timestamp,
            inscription_number: inscription.inscription_number,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total: u64,
    pub distinct_owners: u64,
    pub content_types: Vec<ContentTypeCount>,
}

#[derive(Debug, Serialize)]
pub struct ContentTypeCount {
    pub content_type: String,
    pub count: u64,
}

pub async fn get_inscription(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> Result<Json<InscriptionResponse>, ApiError> {
    let inscription = state
        .inscriptions
        .get(&id)?
        .ok_or_else(|| ApiError::NotFound(format!("inscription {id} not found")))?;
    Ok(Json(inscription.into()))
}

/// Raw content bytes. Inscriptions are immutable, so the cache policy says
/// forever.
pub async fn get_content(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let inscription = state
        .inscriptions
        .get(&id)?
        .ok_or_else(|| ApiError::NotFound(format!("inscription {id} not found")))?;

    let content_type = if inscription.content_type.is_empty() {
        "application/octet-stream".to_string()
    } else {
        inscription.content_type
    };

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (
                header::CACHE_CONTROL,
                "public, max-age=31536000, immutable".to_string(),
            ),
        ],
        inscription.content,
    )
        .into_response())
}

pub async fn list_by_owner(
    State(state): State<Arc<ApiState>>,
    Path(addr): Path<String>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<InscriptionResponse>>, ApiError> {
    let rows = state.inscriptions.by_owner(&addr, page.limit, page.offset)?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

pub async fn list_latest(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<LatestQuery>,
) -> Result<Json<Vec<InscriptionResponse>>, ApiError> {
    let rows = state.inscriptions.latest(query.limit)?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

pub async fn list_by_content_type(
    State(state): State<Arc<ApiState>>,
    Path(mime): Path<String>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<InscriptionResponse>>, ApiError> {
    let rows = state.inscriptions.by_content_type(&mime, page.limit)?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

pub async fn stats(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<StatsResponse>, ApiError> {
    let stats = state.inscriptions.stats()?;
    Ok(Json(StatsResponse {
        total: stats.total,
        distinct_owners: stats.distinct_owners,
        content_types: stats
            .by_content_type
            .into_iter()
            .map(|(content_type, count)| ContentTypeCount {
                content_type,
                count,
            })
            .collect(),
    }))
}
