use crate::config::Config;
use crate::download::CleanupStream;
use axum::{
    body::Body,
    extract::{
        multipart::{Field, MultipartError},
        DefaultBodyLimit, Json, Multipart, State,
    },
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use pdfshrink::{
    CompressionJob, Ghostscript, NonPdfPolicy, ShrinkError, StagingArea, PDF_MEDIA_TYPE,
};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

/// Multipart field carrying the uploaded file
pub const UPLOAD_FIELD: &str = "pdf";

/// Default request body limit (100 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

const INDEX_HTML: &str = include_str!("../static/index.html");

/// Shared, read-only handler state
#[derive(Debug, Clone)]
pub struct AppState {
    /// Where uploads are staged, one folder per request
    pub staging: StagingArea,
    /// External compression tool
    pub ghostscript: Ghostscript,
    /// Handling of uploads not named `*.pdf`
    pub non_pdf_policy: NonPdfPolicy,
    /// Largest accepted request body in bytes
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(staging: StagingArea, ghostscript: Ghostscript) -> Self {
        Self {
            staging,
            ghostscript,
            non_pdf_policy: NonPdfPolicy::default(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    /// Build state from server settings. Creates the staging directory.
    pub fn from_config(config: &Config) -> pdfshrink::Result<Self> {
        let staging = StagingArea::init(&config.uploads_dir)?;
        let ghostscript = Ghostscript::new().timeout(config.timeout());
        Ok(Self {
            staging,
            ghostscript,
            non_pdf_policy: config.non_pdf_policy,
            max_upload_bytes: config.max_upload_bytes(),
        })
    }
}

/// Health check payload
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Application-specific error types for the API
#[derive(Debug)]
pub enum AppError {
    /// Staging, tool or validation failures
    Shrink(ShrinkError),
    /// Malformed or oversized multipart body
    Multipart(MultipartError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Shrink(ShrinkError::MissingFile) => StatusCode::BAD_REQUEST,
            AppError::Shrink(ShrinkError::UnsupportedType(_)) => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            AppError::Shrink(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Multipart(e) => e.status(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            AppError::Shrink(e) => e.to_string(),
            AppError::Multipart(e) => e.body_text(),
        };

        if status.is_server_error() {
            error!(%status, "{message}");
        } else {
            warn!(%status, "{message}");
        }

        // Plain text: the UI shows the body as-is.
        (status, message).into_response()
    }
}

impl From<ShrinkError> for AppError {
    fn from(err: ShrinkError) -> Self {
        AppError::Shrink(err)
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::Multipart(err)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Shrink(ShrinkError::Io(err))
    }
}

/// Build the application router with all routes configured
///
/// - `GET /` - browser UI
/// - `POST /compress` - compress the `pdf` field of a multipart upload
/// - `GET /api/health` - health check
pub fn app(state: AppState) -> Router {
    let body_limit = DefaultBodyLimit::max(state.max_upload_bytes);

    Router::new()
        .route("/", get(index))
        .route("/compress", post(compress_pdf))
        .route("/api/health", get(health_check))
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the upload page
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Health check endpoint for monitoring and load balancing
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "pdfshrink API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Compress the uploaded PDF and stream the result back
///
/// Responds `200` with the compressed file, `400` when no `pdf` file field is
/// present, `415` when the upload is refused by the non-PDF policy and `500`
/// for every failure after staging. All staged files are gone once the
/// response body has been sent or dropped.
pub async fn compress_pdf(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut job = None;

    while let Some(field) = multipart.next_field().await? {
        if job.is_some() || field.name() != Some(UPLOAD_FIELD) || field.file_name().is_none() {
            continue;
        }
        job = Some(stage_field(&state.staging, field).await?);
    }

    let job = job.ok_or(ShrinkError::MissingFile)?;
    let mut output = job.run(&state.ghostscript, state.non_pdf_policy).await?;

    let file = output.open().await?;
    let disposition = format!("attachment; filename=\"{}\"", output.download_name());
    let length = output.size().to_string();
    let body = Body::from_stream(CleanupStream::new(file, output));

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, PDF_MEDIA_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
            (header::CONTENT_LENGTH, length),
        ],
        body,
    )
        .into_response())
}

/// Write one file field into a fresh staging slot.
///
/// The slot is removed again if the body cannot be read to the end.
async fn stage_field(
    staging: &StagingArea,
    mut field: Field<'_>,
) -> Result<CompressionJob, AppError> {
    let original_name = field.file_name().unwrap_or_default().to_string();
    let content_type = field.content_type().map(str::to_string);

    let pending = staging.begin()?;
    let mut file = tokio::fs::File::create(pending.path()).await?;
    let mut size = 0u64;
    while let Some(chunk) = field.chunk().await? {
        file.write_all(&chunk).await?;
        size += chunk.len() as u64;
    }
    file.flush().await?;
    drop(file);

    Ok(pending.finish(original_name, content_type, size))
}
