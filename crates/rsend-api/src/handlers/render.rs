//! Derivative rendering and delivery.

use std::path::{Component, Path, PathBuf};

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use rsend_models::{CropSpec, MediaKind, TransformOptions};
use rsend_render::{RenderError, Resolution, Source, TransformRequest};
use serde::Deserialize;
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Query parameters of `GET /render`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderQuery {
    /// Source path relative to the source root.
    pub path: String,
    pub kind: Option<MediaKind>,
    pub format: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub size: Option<String>,
    /// `W,H,X,Y`. Values in (0, 1) are fractions of the source extent.
    pub crop: Option<String>,
    #[serde(default)]
    pub trim: bool,
    #[serde(default)]
    pub square: bool,
    pub background: Option<String>,
    #[serde(default)]
    pub minify: bool,
    pub bitrate: Option<u32>,
    pub framerate: Option<f64>,
    pub aspect_ratio: Option<String>,
    pub timestamp: Option<String>,
}

impl RenderQuery {
    /// Options carried by the query. Validation is left to the orchestrator.
    pub fn into_options(self) -> ApiResult<TransformOptions> {
        let crop = self.crop.as_deref().map(parse_crop).transpose()?;

        Ok(TransformOptions {
            media_kind: self.kind,
            format: self.format,
            width: self.width,
            height: self.height,
            size: self.size,
            crop,
            trim: self.trim,
            square: self.square,
            background: self.background,
            minify: self.minify,
            bitrate: self.bitrate,
            framerate: self.framerate,
            aspect_ratio: self.aspect_ratio,
            timestamp: self.timestamp,
        })
    }
}

fn parse_crop(raw: &str) -> ApiResult<CropSpec> {
    let values = raw
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| ApiError::bad_request(format!("crop must be W,H,X,Y, got '{}'", raw)))?;

    match values.as_slice() {
        [width, height, x, y] => {
            CropSpec::from_values(*width, *height, *x, *y).map_err(|e| RenderError::from(e).into())
        }
        _ => Err(ApiError::bad_request(format!(
            "crop must be W,H,X,Y, got '{}'",
            raw
        ))),
    }
}

/// Join `raw` onto `root`, refusing anything that could climb out of it.
pub fn confine_path(root: &Path, raw: &str) -> ApiResult<PathBuf> {
    let relative = Path::new(raw.trim_start_matches('/'));
    if relative.as_os_str().is_empty() {
        return Err(ApiError::bad_request("path is required"));
    }

    for component in relative.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => return Err(ApiError::forbidden(format!("{} is outside the source root", raw))),
        }
    }

    Ok(root.join(relative))
}

/// MIME type for an output format token.
pub fn content_type(format: &str) -> &'static str {
    match format {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "mp4" => "video/mp4",
        "m4v" => "video/x-m4v",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        _ => "application/octet-stream",
    }
}

/// `GET /render`: resolve the derivative, rendering it if absent, and stream it.
pub async fn render(
    State(state): State<AppState>,
    Query(query): Query<RenderQuery>,
) -> ApiResult<Response> {
    let path = confine_path(&state.source_root, &query.path)?;
    let options = query.into_options()?;
    let request = TransformRequest::new(Source::file(path), options);

    // Dropping the resolve future on timeout or disconnect aborts the render.
    let timeout = state.config.request_timeout;
    let resolution = tokio::time::timeout(timeout, state.orchestrator.resolve(request))
        .await
        .map_err(|_| ApiError::Timeout(timeout.as_secs()))??;

    artifact_response(&state, &resolution).await
}

async fn artifact_response(state: &AppState, resolution: &Resolution) -> ApiResult<Response> {
    let store = state.orchestrator.store();
    let length = tokio::fs::metadata(&resolution.location)
        .await
        .map_err(|e| ApiError::internal(format!("{}: {}", resolution.location.display(), e)))?
        .len();
    let reader = store
        .open(&resolution.location)
        .await
        .map_err(RenderError::from)?;

    debug!(
        cache_key = %resolution.key,
        rendered = resolution.was_rendered,
        bytes = length,
        "Streaming artifact"
    );

    Response::builder()
        .status(StatusCode::OK)
        .header(
            header::CONTENT_TYPE,
            content_type(resolution.key.format().unwrap_or_default()),
        )
        .header(header::CONTENT_LENGTH, length)
        .header(
            header::CACHE_CONTROL,
            format!("public, max-age={}", state.orchestrator.max_age().as_secs()),
        )
        .header("X-Cache", if resolution.was_rendered { "MISS" } else { "HIT" })
        .body(Body::from_stream(ReaderStream::new(reader)))
        .map_err(|e| ApiError::internal(e.to_string()))
}
