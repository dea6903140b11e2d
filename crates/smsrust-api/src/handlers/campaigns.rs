//! Campaign handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smsrust_common::types::{PauseReason, SendWindow};
use smsrust_common::Error;
use smsrust_core::orchestrator::CampaignStatsSummary;
use smsrust_storage::{Campaign, CreateCampaign};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::{error_response, ErrorResponse};
use crate::state::AppState;

/// Campaign response
#[derive(Debug, Serialize)]
pub struct CampaignResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub message: String,
    pub status: String,
    pub pause_reason: Option<String>,
    pub contact_list_id: Uuid,
    pub device_id: Uuid,
    pub daily_message_limit: i32,
    pub sent_count: i32,
    pub delivered_count: i32,
    pub failed_count: i32,
    pub sent_today: i32,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Campaign> for CampaignResponse {
    fn from(c: Campaign) -> Self {
        Self {
            id: c.id,
            name: c.name,
            description: c.description,
            message: c.message,
            status: c.status,
            pause_reason: c.pause_reason,
            contact_list_id: c.contact_list_id,
            device_id: c.device_id,
            daily_message_limit: c.daily_message_limit,
            sent_count: c.sent_count,
            delivered_count: c.delivered_count,
            failed_count: c.failed_count,
            sent_today: c.sent_today,
            started_at: c.started_at,
            completed_at: c.completed_at,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

/// Request body for creating a campaign
#[derive(Debug, Deserialize)]
pub struct CreateCampaignRequest {
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub message: String,
    pub variant_pool: Option<Vec<String>>,
    pub ai_enabled: Option<bool>,
    pub ai_tone: Option<String>,
    pub contact_list_id: Uuid,
    pub device_id: Uuid,
    pub interval_min_secs: Option<i32>,
    pub interval_max_secs: Option<i32>,
    pub daily_message_limit: Option<i32>,
    pub send_window: Option<SendWindow>,
}

/// Create a campaign in `scheduled` status
///
/// POST /api/v1/campaigns
pub async fn create_campaign(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateCampaignRequest>,
) -> Result<(StatusCode, Json<CampaignResponse>), (StatusCode, Json<ErrorResponse>)> {
    if request.name.trim().is_empty() {
        return Err(error_response(Error::Validation(
            "Campaign name must not be empty".to_string(),
        )));
    }
    if request.message.trim().is_empty() {
        return Err(error_response(Error::Validation(
            "Campaign message must not be empty".to_string(),
        )));
    }
    if let (Some(min), Some(max)) = (request.interval_min_secs, request.interval_max_secs) {
        if min < 0 || min > max {
            return Err(error_response(Error::Validation(
                "Invalid pacing interval".to_string(),
            )));
        }
    }

    // Omitted pacing and cap fields fall back to the configured defaults
    let dispatch = &state.config.dispatch;
    let campaign = state
        .stores
        .campaigns
        .create(CreateCampaign {
            owner_id: request.owner_id,
            name: request.name,
            description: request.description,
            message: request.message,
            variant_pool: request.variant_pool,
            ai_enabled: request.ai_enabled,
            ai_tone: request.ai_tone,
            contact_list_id: request.contact_list_id,
            device_id: request.device_id,
            interval_min_secs: request
                .interval_min_secs
                .or(Some(dispatch.interval_min_secs as i32)),
            interval_max_secs: request
                .interval_max_secs
                .or(Some(dispatch.interval_max_secs as i32)),
            daily_message_limit: request
                .daily_message_limit
                .or(Some(dispatch.daily_message_limit)),
            send_window: request.send_window,
        })
        .await
        .map_err(error_response)?;

    info!(campaign = %campaign.id, "Campaign created");
    Ok((StatusCode::CREATED, Json(campaign.into())))
}

/// Get a campaign
///
/// GET /api/v1/campaigns/:campaign_id
pub async fn get_campaign(
    State(state): State<Arc<AppState>>,
    Path(campaign_id): Path<Uuid>,
) -> Result<Json<CampaignResponse>, (StatusCode, Json<ErrorResponse>)> {
    let campaign = state
        .stores
        .campaigns
        .get(campaign_id)
        .await
        .map_err(error_response)?
        .ok_or_else(|| error_response(Error::NotFound("Campaign not found".to_string())))?;

    Ok(Json(campaign.into()))
}

/// Start a scheduled campaign
///
/// POST /api/v1/campaigns/:campaign_id/start
pub async fn start_campaign(
    State(state): State<Arc<AppState>>,
    Path(campaign_id): Path<Uuid>,
) -> Result<Json<CampaignResponse>, (StatusCode, Json<ErrorResponse>)> {
    state
        .orchestrator
        .start(campaign_id)
        .await
        .map_err(|e| error_response(e.into()))?;

    loaded(&state, campaign_id).await
}

/// Pause an active campaign
///
/// POST /api/v1/campaigns/:campaign_id/pause
pub async fn pause_campaign(
    State(state): State<Arc<AppState>>,
    Path(campaign_id): Path<Uuid>,
) -> Result<Json<CampaignResponse>, (StatusCode, Json<ErrorResponse>)> {
    state
        .orchestrator
        .pause(campaign_id, PauseReason::Manual)
        .await
        .map_err(|e| error_response(e.into()))?;

    loaded(&state, campaign_id).await
}

/// Resume a paused campaign
///
/// POST /api/v1/campaigns/:campaign_id/resume
pub async fn resume_campaign(
    State(state): State<Arc<AppState>>,
    Path(campaign_id): Path<Uuid>,
) -> Result<Json<CampaignResponse>, (StatusCode, Json<ErrorResponse>)> {
    state
        .orchestrator
        .resume(campaign_id)
        .await
        .map_err(|e| error_response(e.into()))?;

    loaded(&state, campaign_id).await
}

/// Stop a campaign, discarding its queued jobs
///
/// POST /api/v1/campaigns/:campaign_id/stop
pub async fn stop_campaign(
    State(state): State<Arc<AppState>>,
    Path(campaign_id): Path<Uuid>,
) -> Result<Json<CampaignResponse>, (StatusCode, Json<ErrorResponse>)> {
    state
        .orchestrator
        .stop(campaign_id)
        .await
        .map_err(|e| error_response(e.into()))?;

    loaded(&state, campaign_id).await
}

/// Aggregated campaign statistics
///
/// GET /api/v1/campaigns/:campaign_id/stats
pub async fn get_campaign_stats(
    State(state): State<Arc<AppState>>,
    Path(campaign_id): Path<Uuid>,
) -> Result<Json<CampaignStatsSummary>, (StatusCode, Json<ErrorResponse>)> {
    let summary = state
        .orchestrator
        .stats(campaign_id)
        .await
        .map_err(|e| error_response(e.into()))?;

    Ok(Json(summary))
}

async fn loaded(
    state: &AppState,
    campaign_id: Uuid,
) -> Result<Json<CampaignResponse>, (StatusCode, Json<ErrorResponse>)> {
    let campaign = state
        .stores
        .campaigns
        .get(campaign_id)
        .await
        .map_err(error_response)?
        .ok_or_else(|| error_response(Error::NotFound("Campaign not found".to_string())))?;

    Ok(Json(campaign.into()))
}
