//! # pdfshrink-api
//!
//! HTTP front end for pdfshrink: multipart upload in, compressed PDF out.
//!

mod api;
pub mod config;
pub mod download;

pub use api::{
    app, compress_pdf, health_check, index, AppError, AppState, HealthResponse,
    DEFAULT_MAX_UPLOAD_BYTES, UPLOAD_FIELD,
};
pub use config::Config;
pub use download::{CleanupStream, TransferError};
