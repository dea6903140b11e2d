//! Inbound gateway delivery webhook

use axum::{extract::State, http::StatusCode, Json};
use smsrust_core::tracker::{DeliveryReport, ReportOutcome};
use std::sync::Arc;
use tracing::{info, warn};

use super::{error_response, ErrorResponse};
use crate::state::AppState;

/// Receive a delivery status report from the gateway.
///
/// POST /api/v1/reports/sms-status
///
/// Always answers 200 with `{processed, unmatched}` for a well-formed
/// payload, even when every entry is unmatched; the gateway drops reports it
/// cannot deliver, so an error here would lose data permanently.
pub async fn sms_status(
    State(state): State<Arc<AppState>>,
    Json(report): Json<DeliveryReport>,
) -> Result<Json<ReportOutcome>, (StatusCode, Json<ErrorResponse>)> {
    if report.kind != DeliveryReport::SMS_SENT_STATUS {
        warn!(kind = %report.kind, "Ignoring unknown report type");
        return Ok(Json(ReportOutcome::default()));
    }

    let outcome = state
        .tracker
        .process_report(&report)
        .await
        .map_err(error_response)?;

    info!(
        processed = outcome.processed,
        unmatched = outcome.unmatched,
        "Delivery report handled"
    );
    Ok(Json(outcome))
}
