use super::error::{ApiError, ApiResult};
use super::AppState;
use crate::config::with_scheme;
use crate::download::{prepare_download, DownloadJob};
use crate::media::{extract_formats, lookup_info, ExtractedFormats};
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

const DEFAULT_REQUESTED_NAME: &str = "video";

#[derive(Debug, Deserialize)]
pub struct FormatsQuery {
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatsResponse {
    pub success: bool,
    pub video_title: String,
    pub thumbnail_url: String,
    pub duration: Option<f64>,
    pub uploader: String,
    pub view_count: Option<u64>,
    pub formats: ExtractedFormats,
}

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub url: Option<String>,
    pub format_id: Option<String>,
    pub filename: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Normalizes the URL and checks it against the allow-list.
fn validated_url(state: &AppState, raw: &str) -> ApiResult<String> {
    let url = with_scheme(raw);
    if !state.config.domains.is_supported_url(&url) {
        return Err(ApiError::bad_request("Invalid or unsupported URL."));
    }
    Ok(url)
}

/// `GET /api/get-formats`
pub async fn get_formats(
    State(state): State<AppState>,
    Query(query): Query<FormatsQuery>,
) -> ApiResult<Json<FormatsResponse>> {
    let raw_url =
        present(query.url).ok_or_else(|| ApiError::bad_request("Missing 'url' parameter"))?;
    let url = validated_url(&state, &raw_url)?;

    info!("Fetching formats for URL: {}", url);
    let (media, _) = lookup_info(state.backend.as_ref(), &url)
        .await
        .map_err(|e| ApiError::from_info_lookup(&url, e))?;

    let formats = extract_formats(&media.format_descriptors());
    if formats.is_empty() {
        let message = if media.is_live() {
            "Live streams cannot be downloaded until finished."
        } else {
            "No downloadable video or audio formats found."
        };
        return Err(ApiError::bad_request(message));
    }

    Ok(Json(FormatsResponse {
        success: true,
        video_title: media
            .title
            .clone()
            .unwrap_or_else(|| "Untitled Video".to_string()),
        thumbnail_url: media.best_thumbnail(),
        duration: media.duration,
        uploader: media
            .uploader
            .clone()
            .unwrap_or_else(|| "Unknown".to_string()),
        view_count: media.view_count,
        formats,
    }))
}

/// `GET /api/download`
pub async fn download(
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
) -> ApiResult<Response> {
    let (Some(raw_url), Some(format_id)) = (present(query.url), present(query.format_id)) else {
        return Err(ApiError::bad_request("Missing parameters"));
    };
    let url = validated_url(&state, &raw_url)?;
    let job = DownloadJob {
        url,
        format_id,
        requested_name: query
            .filename
            .unwrap_or_else(|| DEFAULT_REQUESTED_NAME.to_string()),
    };

    info!(
        "Server download request - URL: {}, Format: {}, Base Filename: '{}'",
        job.url, job.format_id, job.requested_name
    );

    let prepared = prepare_download(state.backend.as_ref(), &state.config.download, &job).await?;
    let filename = prepared.filename.clone();
    let content_type = content_type_for(&prepared.plan.extension);

    let (reader, len) = prepared.open().await?;
    debug!(
        "Streaming {} ({} bytes) from {}",
        filename,
        len,
        reader.scratch_path().display()
    );

    // The reader owns the scratch directory; it is removed when the body is
    // done with it.
    let body = Body::from_stream(ReaderStream::new(reader));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, len)
        .header(header::CONTENT_DISPOSITION, content_disposition(&filename))
        .header("X-Accel-Buffering", "no")
        .body(body)
        .map_err(|e| ApiError::internal(format!("Failed to build response: {}", e)))
}

/// `GET /api/health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy" })
}

fn content_type_for(extension: &str) -> &'static str {
    match extension.to_lowercase().as_str() {
        "mp4" => "video/mp4",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "3gp" => "video/3gpp",
        "m4a" => "audio/mp4",
        "mp3" => "audio/mpeg",
        "opus" | "ogg" => "audio/ogg",
        "wav" => "audio/wav",
        _ => "application/octet-stream",
    }
}

/// Attachment header with an ASCII fallback name and the exact UTF-8 name.
fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii() && !c.is_ascii_control() && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect();

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(filename)
    )
}
