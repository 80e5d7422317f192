//! Shared response envelope types for API handlers.
//!
//! API responses use a `{ "data": ... }` envelope. Use [`DataResponse`]
//! instead of ad-hoc `serde_json::json!({ "data": ... })`.

use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
///
/// ```ignore
/// Ok(Json(DataResponse { data: items }))
/// ```
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

pub const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const ZIP_CONTENT_TYPE: &str = "application/zip";
pub const OCTET_STREAM: &str = "application/octet-stream";

/// File bytes sent as an attachment.
pub struct Attachment {
    pub content_type: &'static str,
    /// Already-formatted `Content-Disposition` value.
    pub disposition: String,
    pub bytes: Vec<u8>,
}

impl IntoResponse for Attachment {
    fn into_response(self) -> Response {
        (
            StatusCode::OK,
            [
                (CONTENT_TYPE, self.content_type.to_string()),
                (CONTENT_DISPOSITION, self.disposition),
            ],
            self.bytes,
        )
            .into_response()
    }
}

/// Content type guessed from the file extension, for downloads.
pub fn content_type_for(filename: &str) -> &'static str {
    match auditdesk_core::uploads::file_extension(filename).as_deref() {
        Some("pdf") => "application/pdf",
        Some("docx") => DOCX_CONTENT_TYPE,
        Some("doc") => "application/msword",
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        Some("zip") => ZIP_CONTENT_TYPE,
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("txt") => "text/plain; charset=utf-8",
        _ => OCTET_STREAM,
    }
}
