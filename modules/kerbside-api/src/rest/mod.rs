use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use bytes::Bytes;
use tracing::{error, info, warn};

use kerbside_engine::VehicleQuery;

use crate::AppState;

/// Collected multipart fields for one search request.
#[derive(Debug, Default)]
pub struct SearchForm {
    pub make: Option<String>,
    pub model: Option<String>,
    pub color: Option<String>,
    pub media: Option<(String, Bytes)>,
}

impl SearchForm {
    /// Vehicle description with "unknown" standing in for absent fields.
    pub fn vehicle_query(&self) -> VehicleQuery {
        VehicleQuery {
            make: self.make.clone().unwrap_or_else(|| "unknown".to_string()),
            model: self.model.clone().unwrap_or_else(|| "unknown".to_string()),
            color: self.color.clone().unwrap_or_else(|| "unknown".to_string()),
        }
    }
}

pub async fn api_search(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let form = match read_form(&mut multipart).await {
        Ok(form) => form,
        Err(message) => return error_response(StatusCode::BAD_REQUEST, &message),
    };

    // Reject before any temp file or remote call exists.
    let Some((file_name, video)) = form.media.clone() else {
        return error_response(StatusCode::BAD_REQUEST, "No file uploaded");
    };

    let query = form.vehicle_query();
    info!(
        make = %query.make,
        model = %query.model,
        color = %query.color,
        bytes = video.len(),
        "Search request received"
    );

    match state.workflow.run(video, &file_name, &query).await {
        Ok(output) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "success",
                "analysis": output.analysis,
                "screenshot": output.screenshot,
                "timestamp": output.timestamp,
            })),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Search workflow failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
        }
    }
}

async fn read_form(multipart: &mut Multipart) -> Result<SearchForm, String> {
    let mut form = SearchForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("Malformed multipart body: {e}"))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "make" => form.make = Some(read_text(field, "make").await?),
            "model" => form.model = Some(read_text(field, "model").await?),
            "color" => form.color = Some(read_text(field, "color").await?),
            "media" => {
                let file_name = field
                    .file_name()
                    .filter(|n| !n.is_empty())
                    .unwrap_or("upload.mp4")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| format!("Could not read media field: {e}"))?;
                form.media = Some((file_name, data));
            }
            other => {
                warn!(field = %other, "Ignoring unknown form field");
            }
        }
    }
    Ok(form)
}

async fn read_text(field: axum::extract::multipart::Field<'_>, name: &str) -> Result<String, String> {
    field
        .text()
        .await
        .map_err(|e| format!("Could not read {name} field: {e}"))
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(serde_json::json!({
            "status": "error",
            "message": message,
        })),
    )
        .into_response()
}
