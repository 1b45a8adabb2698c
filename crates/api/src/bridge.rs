//! Bridge endpoints: claim lookups, collection queries, stats, retry.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use ordbridge_db::{BurnClaim, ClaimStatus};
use serde::Serialize;

use crate::{inscriptions::PageQuery, ApiError, ApiState};

#[derive(Debug, Serialize)]
pub struct ClaimResponse {
    pub inscription_id: String,
    pub collection_name: String,
    pub token_id: u64,
    pub sender_address: String,
    pub burn_txid: String,
    pub burn_block_height: u64,
    pub burn_block_hash: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attest_txid: Option<String>,
    /// Present on underpaid claims: why this burn will not bridge.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub created_at: u64,
    pub updated_at: u64,
}

impl ClaimResponse {
    fn new(claim: BurnClaim, min_fee_sats: u64) -> Self {
        let message = (claim.status == ClaimStatus::Underpaid).then(|| {
            format!(
                "burn fee was below the required minimum of {min_fee_sats} sats; \
                 this claim will not be attested"
            )
        });
        Self {
            inscription_id: claim.inscription_id,
            collection_name: claim.collection_name,
            token_id: claim.token_id,
            sender_address: claim.sender_address,
            burn_txid: claim.burn_txid,
            burn_block_height: claim.burn_block_height,
            burn_block_hash: claim.burn_block_hash,
            status: claim.status.to_string(),
            attest_txid: claim.attest_txid,
            message,
            created_at: claim.created_at,
            updated_at: claim.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BridgeStatsResponse {
    pub total_claims: u64,
    pub by_status: Vec<StatusCount>,
    pub collection_size: usize,
    pub burn_address: String,
    pub required_confirmations: u64,
    pub min_fee_sats: u64,
}

#[derive(Debug, Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: u64,
}

#[derive(Debug, Serialize)]
pub struct CollectionInfoResponse {
    pub name: String,
    pub symbol: String,
    pub size: usize,
}

#[derive(Debug, Serialize)]
pub struct CollectionCheckResponse {
    pub inscription_id: String,
    pub in_collection: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_id: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct CollectionTokenResponse {
    pub token_id: u64,
    pub inscription_id: String,
    pub meta: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct RetryResponse {
    pub retried: u64,
}

pub async fn stats(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<BridgeStatsResponse>, ApiError> {
    let bridge = state.bridge()?;
    let stats = bridge.stats()?;
    Ok(Json(BridgeStatsResponse {
        total_claims: stats.total_claims,
        by_status: stats
            .by_status
            .into_iter()
            .map(|(status, count)| StatusCount {
                status: status.to_string(),
                count,
            })
            .collect(),
        collection_size: stats.collection_size,
        burn_address: stats.burn_address,
        required_confirmations: stats.required_confirmations,
        min_fee_sats: stats.min_fee_sats,
    }))
}

pub async fn get_claim(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> Result<Json<ClaimResponse>, ApiError> {
    let bridge = state.bridge()?;
    let claim = bridge
        .get(&id)?
        .ok_or_else(|| ApiError::NotFound(format!("no claim for inscription {id}")))?;
    Ok(Json(ClaimResponse::new(claim, bridge.config().min_fee_sats)))
}

pub async fn claims_by_sender(
    State(state): State<Arc<ApiState>>,
    Path(addr): Path<String>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<ClaimResponse>>, ApiError> {
    let bridge = state.bridge()?;
    let min_fee = bridge.config().min_fee_sats;
    let claims = bridge.by_sender(&addr, page.limit, page.offset)?;
    Ok(Json(
        claims
            .into_iter()
            .map(|claim| ClaimResponse::new(claim, min_fee))
            .collect(),
    ))
}

pub async fn collection_info(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<CollectionInfoResponse>, ApiError> {
    let bridge = state.bridge()?;
    Ok(Json(CollectionInfoResponse {
        name: bridge.config().collection_name.clone(),
        symbol: bridge.config().collection_symbol.clone(),
        size: bridge.collection().len(),
    }))
}

pub async fn collection_check(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> Result<Json<CollectionCheckResponse>, ApiError> {
    let bridge = state.bridge()?;
    let item = bridge.collection().by_inscription_id(&id);
    Ok(Json(CollectionCheckResponse {
        inscription_id: id,
        in_collection: item.is_some(),
        token_id: item.map(|item| item.token_id),
    }))
}

pub async fn collection_token(
    State(state): State<Arc<ApiState>>,
    Path(token_id): Path<u64>,
) -> Result<Json<CollectionTokenResponse>, ApiError> {
    let bridge = state.bridge()?;
    let item = bridge
        .collection()
        .by_token_id(token_id)
        .ok_or_else(|| ApiError::NotFound(format!("no token {token_id} in collection")))?;
    Ok(Json(CollectionTokenResponse {
        token_id: item.token_id,
        inscription_id: item.inscription_id.clone(),
        meta: item.meta.clone(),
    }))
}

pub async fn retry_failed(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<RetryResponse>, ApiError> {
    let bridge = state.bridge()?;
    let retried = bridge.retry_failed()?;
    Ok(Json(RetryResponse { retried }))
}
