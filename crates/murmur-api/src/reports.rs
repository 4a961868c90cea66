use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use tracing::info;

use murmur_db::{DbError, new_id};
use murmur_types::api::{CreateReportRequest, ReportResponse, ReportView, UpdateReportStatusRequest};
use murmur_types::models::{ReportStatus, ReportTarget};

use crate::error::{ApiError, ApiResult};
use crate::state::{AppState, blocking};
use crate::viewer::Viewer;
use crate::views::{present, report_view};

pub async fn create_report(
    State(state): State<AppState>,
    viewer: Viewer,
    Json(req): Json<CreateReportRequest>,
) -> ApiResult<(StatusCode, Json<ReportResponse>)> {
    let (Some(target_id), Some(target_type), Some(reason)) =
        (present(req.target_id), present(req.target_type), present(req.reason))
    else {
        return Err(ApiError::validation("targetId, targetType and reason are required"));
    };
    let target_type: ReportTarget = target_type
        .parse()
        .map_err(|e| ApiError::validation(format!("Invalid targetType: {e}")))?;
    let description = present(req.description);

    let report = blocking(&state, move |s| {
        let exists = match target_type {
            ReportTarget::User => s.db.user_exists(&target_id)?,
            ReportTarget::Post => s.db.get_post(&target_id)?.is_some(),
        };
        if !exists {
            return Err(ApiError::not_found(format!("{target_type} not found")));
        }

        s.db
            .create_report(
                &new_id(),
                &viewer.id,
                &target_id,
                target_type.as_str(),
                &reason,
                description.as_deref(),
            )
            .map_err(|e| match e {
                DbError::Conflict(_) => ApiError::Conflict(format!(
                    "You have already reported this {}",
                    target_type.as_str().to_lowercase()
                )),
                other => other.into(),
            })
    })
    .await?;

    info!("Report {} filed against {} {}", report.id, report.target_type, report.target_id);
    Ok((
        StatusCode::CREATED,
        Json(ReportResponse {
            message: "Report submitted successfully".into(),
            report: report_view(report),
        }),
    ))
}

/// Every report, newest first.
pub async fn list_reports(State(state): State<AppState>, _viewer: Viewer) -> ApiResult<Json<Vec<ReportView>>> {
    let rows = blocking(&state, |s| Ok(s.db.list_reports()?)).await?;
    Ok(Json(rows.into_iter().map(report_view).collect()))
}

pub async fn update_report_status(
    State(state): State<AppState>,
    _viewer: Viewer,
    Path(report_id): Path<String>,
    Json(req): Json<UpdateReportStatusRequest>,
) -> ApiResult<Json<ReportResponse>> {
    let status: ReportStatus = present(req.status)
        .ok_or_else(|| ApiError::validation("status is required"))?
        .parse()
        .map_err(|e| ApiError::validation(format!("Invalid status: {e}")))?;

    let report = blocking(&state, move |s| {
        s.db
            .update_report_status(&report_id, status.as_str())?
            .ok_or_else(|| ApiError::not_found("Report not found"))
    })
    .await?;

    info!("Report {} marked {}", report.id, status);
    Ok(Json(ReportResponse {
        message: "Report status updated".into(),
        report: report_view(report),
    }))
}
