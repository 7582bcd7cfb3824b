use actix_web::http::{header, StatusCode};
use actix_web::{test, web, App};
use std::sync::Arc;

use media_vault::api;
use media_vault::app_state::AppState;
use media_vault::config::AppConfig;
use media_vault::media::content_key;
use media_vault::metadata::mock_store::MockMetadataStore;
use media_vault::metadata::{MediaRecord, MetadataStorage};
use media_vault::service::UploadResponse;
use media_vault::storage::mock_store::MockObjectStore;

const BOUNDARY: &str = "media-vault-test-boundary";
const JPEG: [u8; 4] = [0xFF, 0xD8, 0x01, 0x02];

struct Part<'a> {
    name: &'a str,
    filename: Option<&'a str>,
    content_type: Option<&'a str>,
    data: &'a [u8],
}

fn file_part<'a>(content_type: &'a str, data: &'a [u8]) -> Part<'a> {
    Part {
        name: "file",
        filename: Some("upload.bin"),
        content_type: Some(content_type),
        data,
    }
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        let mut disposition = format!("Content-Disposition: form-data; name=\"{}\"", part.name);
        if let Some(filename) = part.filename {
            disposition.push_str(&format!("; filename=\"{}\"", filename));
        }
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(b"\r\n");
        if let Some(content_type) = part.content_type {
            body.extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn upload_request(parts: &[Part<'_>]) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/media")
        .insert_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        ))
        .set_payload(multipart_body(parts))
}

struct Backends {
    objects: Arc<MockObjectStore>,
    metadata: Arc<MockMetadataStore>,
}

fn state_with(config: AppConfig) -> (AppState, Backends) {
    let objects = Arc::new(MockObjectStore::new());
    let metadata = Arc::new(MockMetadataStore::new());
    let state = AppState::with_backends(objects.clone(), metadata.clone(), config);
    (state, Backends { objects, metadata })
}

fn test_config() -> AppConfig {
    let mut config = AppConfig::for_testing();
    config.media.public_base_url = Some("http://media.test".to_string());
    config
}

macro_rules! test_app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state))
                .configure(api::configure),
        )
        .await
    };
}

#[actix_web::test]
async fn test_upload_then_download() {
    let (state, backends) = state_with(test_config());
    let app = test_app!(state);

    let req = upload_request(&[file_part("image/jpeg", &JPEG)]).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let location = resp
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body: UploadResponse = test::read_body_json(resp).await;

    let key = content_key(&JPEG);
    assert_eq!(body.key, key);
    assert_eq!(body.url, format!("http://media.test/media/{}", key));
    assert_eq!(location.as_deref(), Some(body.url.as_str()));
    assert_eq!(backends.objects.object_count(), 1);
    assert_eq!(backends.metadata.object_count(), 1);

    let req = test::TestRequest::get().uri(&format!("/media/{}", key)).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get(header::CONTENT_TYPE).unwrap(), "image/jpeg");
    assert_eq!(
        resp.headers().get(header::ETAG).unwrap().to_str().unwrap(),
        format!("\"{}\"", key)
    );
    assert!(resp
        .headers()
        .get(header::CACHE_CONTROL)
        .unwrap()
        .to_str()
        .unwrap()
        .contains("immutable"));

    let bytes = test::read_body(resp).await;
    assert_eq!(bytes.as_ref(), &JPEG);
}

#[actix_web::test]
async fn test_url_uses_request_host_without_public_base() {
    let (state, _) = state_with(AppConfig::for_testing());
    let app = test_app!(state);

    let req = upload_request(&[file_part("image/gif", b"GIF89a")])
        .insert_header((header::HOST, "uploads.example.org"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body: UploadResponse = test::read_body_json(resp).await;
    assert_eq!(
        body.url,
        format!("http://uploads.example.org/media/{}", content_key(b"GIF89a"))
    );
}

#[actix_web::test]
async fn test_duplicate_upload_returns_same_key_and_writes_once() {
    let (state, backends) = state_with(test_config());
    let app = test_app!(state);

    let mut keys = Vec::new();
    for _ in 0..2 {
        let req = upload_request(&[file_part("image/png", b"\x89PNG\r\n\x1a\n")]).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: UploadResponse = test::read_body_json(resp).await;
        keys.push(body.key);
    }

    assert_eq!(keys[0], keys[1]);
    assert_eq!(backends.objects.calls().put, 1);
    assert_eq!(backends.metadata.put_calls(), 1);
}

#[actix_web::test]
async fn test_signature_mismatch_rejected() {
    let (state, backends) = state_with(test_config());
    let app = test_app!(state);

    let req = upload_request(&[file_part("image/png", &[0x00, 0x01])]).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        test::read_body(resp).await.as_ref(),
        b"Invalid media type or corrupted file."
    );
    assert_eq!(backends.objects.object_count(), 0);
    assert_eq!(backends.metadata.object_count(), 0);
}

#[actix_web::test]
async fn test_unsupported_declared_type_rejected() {
    let (state, _) = state_with(test_config());
    let app = test_app!(state);

    let req = upload_request(&[file_part("image/tiff", b"II*\x00")]).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_missing_or_empty_file_rejected() {
    let (state, backends) = state_with(test_config());
    let app = test_app!(state);

    let text_only = Part {
        name: "caption",
        filename: None,
        content_type: None,
        data: b"just words",
    };
    let req = upload_request(&[text_only]).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(test::read_body(resp).await.as_ref(), b"No file uploaded.");

    let req = upload_request(&[file_part("image/jpeg", &[])]).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(test::read_body(resp).await.as_ref(), b"No file uploaded.");

    assert_eq!(backends.objects.calls().total(), 0);
}

#[actix_web::test]
async fn test_oversized_upload_rejected() {
    let mut config = test_config();
    config.server.max_payload_size = 16;
    let (state, backends) = state_with(config);
    let app = test_app!(state);

    let mut data = JPEG.to_vec();
    data.resize(64, 0xAB);
    let req = upload_request(&[file_part("image/jpeg", &data)]).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(backends.objects.object_count(), 0);
}

#[actix_web::test]
async fn test_download_unknown_and_malformed_keys() {
    let (state, _) = state_with(test_config());
    let app = test_app!(state);

    let unknown = content_key(b"nobody uploaded this");
    for uri in [format!("/media/{}", unknown), "/media/not-a-hash".to_string()] {
        let req = test::TestRequest::get().uri(&uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{}", uri);
        assert_eq!(test::read_body(resp).await.as_ref(), b"Media not found.");
    }
}

#[actix_web::test]
async fn test_metadata_without_content_is_not_found() {
    let (state, backends) = state_with(test_config());
    let app = test_app!(state);

    let key = content_key(b"lost content");
    backends
        .metadata
        .put_metadata_if_absent(&key, &MediaRecord::now("image/jpeg"))
        .unwrap();

    let req = test::TestRequest::get().uri(&format!("/media/{}", key)).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_backend_outage_is_server_error() {
    let (state, backends) = state_with(test_config());
    let app = test_app!(state);

    let req = upload_request(&[file_part("image/jpeg", &JPEG)]).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    backends.objects.set_unavailable(true);
    let req = test::TestRequest::get()
        .uri(&format!("/media/{}", content_key(&JPEG)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        test::read_body(resp).await.as_ref(),
        b"An error occurred while retrieving the media."
    );

    let req = upload_request(&[file_part("image/gif", b"GIF87a")]).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        test::read_body(resp).await.as_ref(),
        b"An error occurred while processing the media."
    );
}

#[actix_web::test]
async fn test_truncated_upload_is_discarded() {
    let (state, backends) = state_with(test_config());
    let app = test_app!(state);

    // Body ends in the middle of the file part, with no closing boundary
    let mut body = format!(
        "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"cut.jpg\"\r\nContent-Type: image/jpeg\r\n\r\n",
        BOUNDARY
    )
    .into_bytes();
    body.extend_from_slice(&JPEG);
    body.extend_from_slice(&[0x42; 32]);

    let req = test::TestRequest::post()
        .uri("/media")
        .insert_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        ))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(backends.objects.calls().total(), 0);
    assert_eq!(backends.metadata.put_calls(), 0);
}

#[actix_web::test]
async fn test_if_none_match_returns_not_modified() {
    let (state, _) = state_with(test_config());
    let app = test_app!(state);

    let req = upload_request(&[file_part("image/bmp", b"BM\x3a\x00")]).to_request();
    let body: UploadResponse = test::read_body_json(test::call_service(&app, req).await).await;

    let req = test::TestRequest::get()
        .uri(&format!("/media/{}", body.key))
        .insert_header((header::IF_NONE_MATCH, format!("\"{}\"", body.key)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_MODIFIED);

    // A stale tag still gets the content
    let req = test::TestRequest::get()
        .uri(&format!("/media/{}", body.key))
        .insert_header((header::IF_NONE_MATCH, "\"something-else\""))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get(header::CONTENT_TYPE).unwrap(), "image/bmp");
}

#[actix_web::test]
async fn test_concurrent_identical_uploads() {
    let (state, backends) = state_with(test_config());
    let app = test_app!(state);

    let first = test::call_service(&app, upload_request(&[file_part("image/webp", b"RIFF....WEBP")]).to_request());
    let second = test::call_service(&app, upload_request(&[file_part("image/webp", b"RIFF....WEBP")]).to_request());
    let (first, second) = futures::join!(first, second);

    assert_eq!(first.status(), StatusCode::CREATED);
    assert_eq!(second.status(), StatusCode::CREATED);
    let a: UploadResponse = test::read_body_json(first).await;
    let b: UploadResponse = test::read_body_json(second).await;
    assert_eq!(a.key, b.key);
    assert_eq!(backends.objects.object_count(), 1);
    assert_eq!(backends.metadata.list_objects().unwrap(), vec![a.key]);
}

#[actix_web::test]
async fn test_health() {
    let app = test_app!(AppState::new_for_testing());
    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}
