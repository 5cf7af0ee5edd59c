//! HTTP surface for the pipeline.
//!
//! Three endpoints mirror the three pipeline shapes:
//!
//! * `POST /api/extract-text` — multipart `images` fields; extract-only.
//! * `POST /api/analyze-text` — JSON body with (possibly user-edited)
//!   `extractedTexts` plus `userInstructions`; the second half of the
//!   two-step flow. The request is self-contained, so the server keeps no
//!   session between the two steps.
//! * `POST /api/process-image` — multipart `images` plus an `instructions`
//!   text field; one-shot.
//!
//! Plus `GET /api/health` for liveness probes.
//!
//! Error bodies are a single flat `{"error": message}`. User-correctable
//! failures map to 400, collaborator/internal failures to 500; provider
//! payload detail goes to the tracing log only.
//!
//! The request-body cap scales off the per-image budget (see [`router`]),
//! so raw uploads larger than the budget still reach the normaliser rather
//! than being cut off at the transport.

use crate::config::PipelineConfig;
use crate::error::{ErrorClass, NotelensError};
use crate::output::{AnalysisResult, ExtractedText, ProcessOutput};
use crate::pipeline::extract::UploadedImage;
use crate::process;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Shared state: one pipeline config for all requests. Requests share
/// nothing else — no cache, no session store.
#[derive(Clone)]
pub struct AppState {
    config: Arc<PipelineConfig>,
}

/// Request bodies carry the raw uploads, which run far past the per-image
/// budget: a phone photo is often 5-10 MiB before normalisation, and a batch
/// may hold several. The cap scales off the budget but never drops below a
/// floor that comfortably fits such a batch.
const BODY_LIMIT_FACTOR: usize = 64;
const BODY_LIMIT_FLOOR: usize = 128 * 1024 * 1024;

fn body_limit(config: &PipelineConfig) -> usize {
    config
        .max_image_size_bytes
        .saturating_mul(BODY_LIMIT_FACTOR)
        .max(BODY_LIMIT_FLOOR)
}

/// Build the application router.
pub fn router(config: PipelineConfig) -> Router {
    let limit = body_limit(&config);
    let state = AppState {
        config: Arc::new(config),
    };
    Router::new()
        .route("/api/extract-text", post(extract_text))
        .route("/api/analyze-text", post(analyze_text))
        .route("/api/process-image", post(process_image))
        .route("/api/health", get(health))
        .layer(DefaultBodyLimit::max(limit))
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(addr: SocketAddr, config: PipelineConfig) -> Result<(), NotelensError> {
    let app = router(config);
    info!("notelens HTTP server listening on {addr}");
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| NotelensError::Internal(format!("bind {addr}: {e}")))?;
    axum::serve(listener, app)
        .await
        .map_err(|e| NotelensError::Internal(format!("server: {e}")))
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExtractResponse {
    extracted_texts: Vec<ExtractedText>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeRequest {
    #[serde(default)]
    extracted_texts: Vec<ExtractedText>,
    #[serde(default)]
    user_instructions: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Error wrapper implementing the status-code mapping.
struct ApiError(NotelensError);

impl From<NotelensError> for ApiError {
    fn from(e: NotelensError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.class() {
            ErrorClass::UserInput => StatusCode::BAD_REQUEST,
            ErrorClass::Provider => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(error = %self.0, detail = ?self.0, "request failed");
        }
        (status, Json(ErrorBody {
            error: self.0.to_string(),
        }))
            .into_response()
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────

async fn health() -> &'static str {
    "OK"
}

async fn extract_text(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ExtractResponse>, ApiError> {
    let (images, _) = read_upload(multipart).await?;
    let extracted_texts = process::extract_images(images, &state.config).await?;
    Ok(Json(ExtractResponse { extracted_texts }))
}

async fn analyze_text(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalysisResult>, ApiError> {
    let analysis = process::analyze_extracted(
        &request.extracted_texts,
        &request.user_instructions,
        &state.config,
    )
    .await?;
    Ok(Json(analysis))
}

async fn process_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ProcessOutput>, ApiError> {
    let (images, instructions) = read_upload(multipart).await?;
    let output = process::process(images, &instructions, &state.config).await?;
    Ok(Json(output))
}

/// Pull repeated `images` fields and an optional `instructions` text field
/// out of a multipart body, preserving upload order.
async fn read_upload(
    mut multipart: Multipart,
) -> Result<(Vec<UploadedImage>, String), NotelensError> {
    let mut images = Vec::new();
    let mut instructions = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| NotelensError::Validation(format!("malformed multipart body: {e}")))?
    {
        match field.name() {
            Some("images") => {
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| NotelensError::Validation(format!("unreadable image field: {e}")))?
                    .to_vec();
                images.push(match content_type {
                    Some(ct) => UploadedImage::with_content_type(bytes, ct),
                    None => UploadedImage::new(bytes),
                });
            }
            Some("instructions") => {
                instructions = field.text().await.map_err(|e| {
                    NotelensError::Validation(format!("unreadable instructions field: {e}"))
                })?;
            }
            _ => {} // unknown fields are ignored
        }
    }

    Ok((images, instructions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_MAX_IMAGE_SIZE;
    use crate::pipeline::analyze::{ChatCompleter, CompletionRequest};
    use crate::pipeline::ocr::TextDetector;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::Mutex;
    use tower::ServiceExt;

    #[test]
    fn user_errors_map_to_400() {
        let resp = ApiError(NotelensError::NoTextFound).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = ApiError(NotelensError::Validation("No images provided".into()))
            .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn provider_errors_map_to_500() {
        let resp = ApiError(NotelensError::Analysis {
            detail: "HTTP 503".into(),
        })
        .into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn analyze_request_tolerates_missing_fields() {
        let req: AnalyzeRequest = serde_json::from_str("{}").unwrap();
        assert!(req.extracted_texts.is_empty());
        assert!(req.user_instructions.is_empty());

        let req: AnalyzeRequest = serde_json::from_str(
            r#"{"extractedTexts":[{"imageNumber":1,"text":"hi"}],"userInstructions":"summarise"}"#,
        )
        .unwrap();
        assert_eq!(req.extracted_texts[0].image_number, 1);
        assert_eq!(req.user_instructions, "summarise");
    }

    #[test]
    fn body_limit_scales_with_the_image_budget() {
        assert_eq!(body_limit(&PipelineConfig::default()), BODY_LIMIT_FLOOR);

        let big = PipelineConfig::builder()
            .max_image_size_bytes(8 * 1024 * 1024)
            .build()
            .unwrap();
        assert_eq!(body_limit(&big), 8 * 1024 * 1024 * BODY_LIMIT_FACTOR);
    }

    // ── Router-level tests ───────────────────────────────────────────────

    /// Returns fixed text for every image; records the byte lengths seen.
    struct RecordingDetector {
        sizes: Mutex<Vec<usize>>,
    }

    impl RecordingDetector {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                sizes: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl TextDetector for RecordingDetector {
        async fn detect_text(&self, image: &[u8]) -> Result<Option<String>, NotelensError> {
            self.sizes.lock().unwrap().push(image.len());
            Ok(Some("from the whiteboard".into()))
        }
    }

    struct CannedCompleter(String);

    #[async_trait]
    impl ChatCompleter for CannedCompleter {
        async fn chat_complete(
            &self,
            _system_prompt: &str,
            _user_prompt: &str,
            _request: &CompletionRequest,
        ) -> Result<String, NotelensError> {
            Ok(self.0.clone())
        }
    }

    fn stub_config(detector: Arc<RecordingDetector>) -> PipelineConfig {
        PipelineConfig::builder()
            .detector(detector as Arc<dyn TextDetector>)
            .completer(Arc::new(CannedCompleter(r#"{"summary":"noted"}"#.into())))
            .build()
            .unwrap()
    }

    const BOUNDARY: &str = "notelens-router-test";

    fn multipart_body(images: &[&[u8]], instructions: Option<&str>) -> Vec<u8> {
        let mut body = Vec::new();
        for image in images {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            body.extend_from_slice(
                b"Content-Disposition: form-data; name=\"images\"; filename=\"note.png\"\r\n",
            );
            body.extend_from_slice(b"Content-Type: image/png\r\n\r\n");
            body.extend_from_slice(image);
            body.extend_from_slice(b"\r\n");
        }
        if let Some(text) = instructions {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            body.extend_from_slice(b"Content-Disposition: form-data; name=\"instructions\"\r\n\r\n");
            body.extend_from_slice(text.as_bytes());
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn multipart_request(uri: &str, body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    /// A PNG several times the old default axum body cap, as a stand-in for
    /// a raw phone photo.
    fn phone_photo_png() -> Vec<u8> {
        use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
        let mut img = RgbImage::new(1024, 1024);
        let mut seed = 0x2545_f491_u32;
        for px in img.pixels_mut() {
            seed = seed.wrapping_mul(1664525).wrapping_add(1013904223);
            let [r, g, b, _] = seed.to_be_bytes();
            *px = Rgb([r, g, b]);
        }
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut std::io::Cursor::new(&mut buf), ImageFormat::Png)
            .expect("png encode");
        buf
    }

    #[tokio::test]
    async fn oversized_upload_reaches_the_normalizer() {
        let png = phone_photo_png();
        assert!(png.len() > 2 * 1024 * 1024, "fixture must be a large upload");

        let detector = RecordingDetector::new();
        let app = router(stub_config(Arc::clone(&detector)));

        let resp = app
            .oneshot(multipart_request(
                "/api/extract-text",
                multipart_body(&[png.as_slice()], None),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let parsed = json_body(resp).await;
        assert_eq!(parsed["extractedTexts"][0]["imageNumber"], 1);
        assert_eq!(parsed["extractedTexts"][0]["text"], "from the whiteboard");

        // The upload made it past the body cap and through normalisation.
        let sizes = detector.sizes.lock().unwrap();
        assert_eq!(sizes.len(), 1);
        assert!(sizes[0] <= DEFAULT_MAX_IMAGE_SIZE);
    }

    #[tokio::test]
    async fn empty_upload_is_rejected_with_400() {
        let app = router(stub_config(RecordingDetector::new()));

        let resp = app
            .oneshot(multipart_request(
                "/api/extract-text",
                multipart_body(&[], Some("summarise")),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let parsed = json_body(resp).await;
        assert_eq!(parsed["error"], "No images provided");
    }

    #[tokio::test]
    async fn analyze_text_runs_the_second_step() {
        let app = router(stub_config(RecordingDetector::new()));

        let req = Request::builder()
            .method("POST")
            .uri("/api/analyze-text")
            .header("content-type", "application/json")
            .body(Body::from(
                r#"{"extractedTexts":[{"imageNumber":1,"text":"Buy milk"}],"userInstructions":"summarise"}"#,
            ))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let parsed = json_body(resp).await;
        assert_eq!(parsed["summary"], "noted");
    }

    #[tokio::test]
    async fn process_image_runs_one_shot() {
        let detector = RecordingDetector::new();
        let app = router(stub_config(Arc::clone(&detector)));

        let resp = app
            .oneshot(multipart_request(
                "/api/process-image",
                multipart_body(&[b"tiny image".as_slice()], Some("summarise these notes")),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let parsed = json_body(resp).await;
        assert_eq!(parsed["extractedTexts"][0]["text"], "from the whiteboard");
        assert_eq!(parsed["summary"], "noted");
    }
}
