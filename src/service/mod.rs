//service/mod.rs
pub mod audit_worker;
pub mod media_service;

use actix_multipart::Multipart;
use actix_web::http::header::{self, EntityTag, Header, IfNoneMatch};
use actix_web::{web, HttpMessage, HttpRequest, HttpResponse};
use bytes::BytesMut;
use futures::StreamExt;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;
use crate::error::MediaError;

/// Multipart field name the upload is expected under
pub const FILE_FIELD: &str = "file";

const IMMUTABLE_CACHE: &str = "public, max-age=31536000, immutable";

/// Body of a successful upload response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadResponse {
    pub key: String,
    pub url: String,
}

/// File part pulled out of a multipart body
#[derive(Debug)]
pub struct UploadedFile {
    pub declared_type: String,
    pub data: BytesMut,
}

/// Buffer the first file part of a multipart body.
///
/// A part is taken when it is named `file` or carries a filename. The whole
/// part is buffered before returning; if the client goes away mid-body the
/// read fails and the partial buffer is dropped.
pub async fn read_uploaded_file(mut payload: Multipart, limit: u64) -> Result<Option<UploadedFile>, MediaError> {
    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| {
            warn!("Multipart read error: {}", e);
            MediaError::InvalidInput
        })?;

        let disposition = field.content_disposition();
        let is_file = disposition.get_name() == Some(FILE_FIELD) || disposition.get_filename().is_some();
        if !is_file {
            debug!("Skipping multipart field {:?}", disposition.get_name());
            continue;
        }

        let declared_type = field
            .content_type()
            .map(|m| m.to_string())
            .unwrap_or_default();

        let mut data = BytesMut::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| {
                warn!("Upload aborted while reading file part: {}", e);
                MediaError::InvalidInput
            })?;
            if (data.len() + chunk.len()) as u64 > limit {
                warn!("Upload exceeds limit of {} bytes", limit);
                return Err(MediaError::PayloadTooLarge { limit });
            }
            data.extend_from_slice(&chunk);
        }

        info!("Received file part: {} bytes declared as '{}'", data.len(), declared_type);
        return Ok(Some(UploadedFile { declared_type, data }));
    }
    Ok(None)
}

/// Base URL retrieval locators are built from
fn public_base_url(req: &HttpRequest, app_state: &AppState) -> String {
    match &app_state.config.media.public_base_url {
        Some(base) => base.trim_end_matches('/').to_string(),
        None => {
            let info = req.connection_info();
            format!("{}://{}", info.scheme(), info.host())
        }
    }
}

/// Retrieval locator for a content key
pub fn media_url(base: &str, key: &str) -> String {
    format!("{}/media/{}", base, key)
}

pub async fn upload_service(payload: Multipart, req: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, MediaError> {
    debug!("Upload requested, content type: {:?}", req.mime_type().ok().flatten());

    let limit = app_state.config.server.max_payload_size;
    let file = match read_uploaded_file(payload, limit).await? {
        Some(file) => file,
        None => {
            warn!("Upload request carried no file part");
            return Err(MediaError::InvalidInput);
        }
    };

    let service = app_state.media_service.clone();
    let UploadedFile { declared_type, data } = file;
    let receipt = web::block(move || service.upload(&declared_type, &data))
        .await
        .map_err(|e| MediaError::BackendUnavailable(e.to_string()))??;

    let url = media_url(&public_base_url(&req, &app_state), &receipt.key);
    info!("Upload complete: key = {}, created = {}", receipt.key, receipt.created);

    Ok(HttpResponse::Created()
        .insert_header((header::LOCATION, url.clone()))
        .json(UploadResponse { key: receipt.key, url }))
}

/// True when `If-None-Match` names this key's entity tag
fn not_modified(req: &HttpRequest, etag: &EntityTag) -> bool {
    match IfNoneMatch::parse(req) {
        Ok(IfNoneMatch::Any) => true,
        Ok(IfNoneMatch::Items(tags)) => tags.iter().any(|t| t.weak_eq(etag)),
        Err(_) => false,
    }
}

pub async fn download_service(key: String, req: HttpRequest, app_state: web::Data<AppState>) -> HttpResponse {
    match serve_media(key, &req, &app_state).await {
        Ok(response) => response,
        Err(e) => e.download_response(),
    }
}

async fn serve_media(key: String, req: &HttpRequest, app_state: &AppState) -> Result<HttpResponse, MediaError> {
    let etag = EntityTag::new_strong(key.clone());
    let service = app_state.media_service.clone();

    if not_modified(req, &etag) {
        let lookup_key = key.clone();
        web::block(move || service.metadata(&lookup_key))
            .await
            .map_err(|e| MediaError::BackendUnavailable(e.to_string()))??;
        debug!("Not modified: {}", key);
        return Ok(HttpResponse::NotModified()
            .insert_header(header::ETag(etag))
            .insert_header((header::CACHE_CONTROL, IMMUTABLE_CACHE))
            .finish());
    }

    let content = web::block(move || service.download(&key))
        .await
        .map_err(|e| MediaError::BackendUnavailable(e.to_string()))??;

    Ok(HttpResponse::Ok()
        .content_type(content.content_type.as_str())
        .insert_header(header::ETag(etag))
        .insert_header((header::CACHE_CONTROL, IMMUTABLE_CACHE))
        .insert_header(header::LastModified(std::time::SystemTime::from(content.upload_time).into()))
        .body(content.data))
}
