//! HTTP routes

use actix_multipart::Multipart;
use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};

use crate::app_state::AppState;
use crate::error::MediaError;
use crate::service::{download_service, upload_service};

#[post("/media")]
pub async fn upload(payload: Multipart, req: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, MediaError> {
    upload_service(payload, req, app_state).await
}

#[get("/media/{key}")]
pub async fn download(key: web::Path<String>, req: HttpRequest, app_state: web::Data<AppState>) -> HttpResponse {
    download_service(key.into_inner(), req, app_state).await
}

#[get("/health")]
pub async fn health() -> impl Responder {
    HttpResponse::Ok().body("OK")
}

/// Register every route on an app or scope
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(upload).service(download).service(health);
}
