//! HTTP route handlers for the layout translator web application.
//!
//! All routes return either HTML (for htmx consumption), SSE, or page images.
//! HTML routes use Askama templates from the `templates` module.

mod export;
mod original;
mod pages;
mod session;
mod settings;
mod translate;
mod upload;

pub use export::export_document;
pub use original::{original_pane, preview_page};
pub use pages::{index, view_session};
pub use session::{dismiss_error, reset};
pub use settings::set_language;
pub use translate::{start_translation, translation_stream};
pub use upload::{upload_into, upload_new};

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, header};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, services::ServeDir,
    set_header::SetResponseHeaderLayer, trace::TraceLayer,
};

use crate::state::AppState;
use crate::templates::WorkspaceView;

/// Hard cap on request bodies; the advertised size limit is only guidance
const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Language change from the dropdown.
#[derive(Deserialize)]
pub struct LanguageForm {
    pub target_lang: String,
}

/// Render-ready snapshot of a session, taken under its lock.
pub async fn snapshot(state: &AppState, session_id: &str) -> Option<WorkspaceView> {
    let soft_limit = state.config.upload_soft_limit_bytes();
    state
        .get_session(session_id)
        .await?
        .with_session(|s| WorkspaceView::new(session_id, s.controller.state(), soft_limit))
        .await
}

pub fn router(state: Arc<AppState>, static_dir: PathBuf) -> Router {
    Router::new()
        // Pages
        .route("/", get(index))
        .route("/view/{session_id}", get(view_session))
        // API endpoints - HTML fragments (htmx)
        .route("/api/upload", post(upload_new))
        .route("/api/upload/{session_id}", post(upload_into))
        .route("/api/original/{session_id}", get(original_pane))
        .route("/api/language/{session_id}", post(set_language))
        .route("/api/translate/{session_id}", post(start_translation))
        .route("/api/translate/{session_id}/stream", get(translation_stream))
        .route("/api/reset/{session_id}", post(reset))
        .route("/api/dismiss-error/{session_id}", post(dismiss_error))
        .route("/api/export/{session_id}", get(export_document))
        // Preview images
        .route("/preview/{preview_id}/{page}", get(preview_page))
        // Static files with Cache-Control: no-cache (cache but always revalidate via ETag)
        .nest_service(
            "/static",
            ServiceBuilder::new()
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::CACHE_CONTROL,
                    HeaderValue::from_static("no-cache"),
                ))
                .service(ServeDir::new(static_dir)),
        )
        // Cache-Control for HTML fragments (images set their own)
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store, max-age=0"),
        ))
        .layer(CompressionLayer::new())
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use layout_translator_core::translator::{GenerationRequest, ModelInfo, TextStream};
    use layout_translator_core::{
        AppConfig, GenerativeModel, Result as CoreResult, TranslationClient, TranslationStatus,
        intake::REJECTION_MESSAGE,
    };
    use std::time::Duration;
    use tower::ServiceExt;

    const BOUNDARY: &str = "XBOUNDARYX";

    /// Replays fixed fragments, or never finishes when `hang` is set.
    struct ScriptedModel {
        fragments: Vec<&'static str>,
        hang: bool,
    }

    #[async_trait]
    impl GenerativeModel for ScriptedModel {
        fn info(&self) -> ModelInfo {
            ModelInfo {
                name: "scripted",
                model: "test".to_string(),
            }
        }

        async fn stream_generate(&self, _request: GenerationRequest) -> CoreResult<TextStream> {
            if self.hang {
                return Ok(Box::pin(futures::stream::pending()));
            }
            let items: Vec<CoreResult<String>> =
                self.fragments.iter().map(|f| Ok((*f).to_string())).collect();
            Ok(Box::pin(futures::stream::iter(items)))
        }
    }

    fn app_with(model: ScriptedModel) -> (Arc<AppState>, Router) {
        let client = TranslationClient::new(Arc::new(model));
        let state = Arc::new(AppState::with_client(AppConfig::default(), client).unwrap());
        let app = router(Arc::clone(&state), PathBuf::from("static"));
        (state, app)
    }

    fn app() -> (Arc<AppState>, Router) {
        app_with(ScriptedModel {
            fragments: vec!["```html<p>Hi</p>", "</p>```"],
            hang: false,
        })
    }

    fn multipart(filename: &str, media_type: &str, data: &[u8]) -> Body {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: {media_type}\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        Body::from(body)
    }

    fn upload_request(uri: &str, filename: &str, media_type: &str) -> Request<Body> {
        upload_bytes(uri, filename, media_type, b"%PDF-1.4 test")
    }

    fn upload_bytes(uri: &str, filename: &str, media_type: &str, data: &[u8]) -> Request<Body> {
        Request::post(uri)
            .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
            .header("HX-Request", "true")
            .body(multipart(filename, media_type, data))
            .unwrap()
    }

    /// A PDF with `pages` A4 pages, each holding one filled rectangle.
    fn generated_pdf(pages: usize) -> Vec<u8> {
        use lopdf::content::{Content, Operation};
        use lopdf::{Document, Object, Stream, dictionary};

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mut kids: Vec<Object> = Vec::new();
        for _ in 0..pages {
            let content = Content {
                operations: vec![
                    Operation::new("re", vec![72.into(), 700.into(), 200.into(), 50.into()]),
                    Operation::new("f", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => i64::try_from(pages).unwrap(),
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    async fn preview_id(state: &AppState, session_id: &str) -> String {
        state
            .get_session(session_id)
            .await
            .unwrap()
            .with_session(|s| s.controller.state().preview.clone())
            .await
            .unwrap()
            .unwrap()
            .id
    }

    /// Upload `data` into a new session and return its id.
    async fn upload_pdf(app: &Router, data: &[u8]) -> String {
        let response = app
            .clone()
            .oneshot(upload_bytes("/api/upload", "paper.pdf", "application/pdf", data))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let location = response.headers()["HX-Redirect"].to_str().unwrap().to_string();
        location.trim_start_matches("/view/").to_string()
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn post(app: &Router, uri: &str) -> axum::response::Response {
        app.clone()
            .oneshot(Request::post(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn get(app: &Router, uri: &str) -> axum::response::Response {
        app.clone()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    /// Upload a PDF into a new session and return its id.
    async fn upload(app: &Router) -> String {
        upload_pdf(app, b"%PDF-1.4 test").await
    }

    async fn wait_for_status(state: &AppState, session_id: &str, status: TranslationStatus) {
        for _ in 0..200 {
            let current = state
                .get_session(session_id)
                .await
                .unwrap()
                .with_session(|s| s.controller.state().status)
                .await;
            if current == Some(status) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("session never reached {status}");
    }

    #[tokio::test]
    async fn test_index_shows_upload_area() {
        let (_, app) = app();
        let response = get(&app, "/").await;
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("Drag &amp; Drop your document here"));
        assert!(html.contains("Maximum file size: 10MB"));
    }

    #[tokio::test]
    async fn test_upload_rejects_non_pdf() {
        let (state, app) = app();
        let response = app
            .clone()
            .oneshot(upload_request("/api/upload", "photo.png", "image/png"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(body_text(response).await, REJECTION_MESSAGE);
        assert_eq!(state.session_count().await, 0);
        assert_eq!(state.previews.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_upload_then_view() {
        let (state, app) = app();
        let session_id = upload(&app).await;
        assert_eq!(state.previews.outstanding(), 1);

        let html = body_text(get(&app, &format!("/view/{session_id}")).await).await;
        assert!(html.contains("paper.pdf"));
        assert!(html.contains("Translate Document"));
        assert!(html.contains("Translation will appear here"));
    }

    #[tokio::test]
    async fn test_rejected_upload_keeps_existing_file() {
        let (state, app) = app();
        let session_id = upload(&app).await;

        let response = app
            .clone()
            .oneshot(upload_request(&format!("/api/upload/{session_id}"), "notes.txt", "text/plain"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let view = snapshot(&state, &session_id).await.unwrap();
        assert_eq!(view.file_name, "paper.pdf");
        assert_eq!(state.previews.outstanding(), 1);
    }

    #[tokio::test]
    async fn test_translate_completes_and_exports() {
        let (state, app) = app();
        let session_id = upload(&app).await;

        let response = post(&app, &format!("/api/translate/{session_id}")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains(&format!("/api/translate/{session_id}/stream")));

        wait_for_status(&state, &session_id, TranslationStatus::Completed).await;

        let view = snapshot(&state, &session_id).await.unwrap();
        assert_eq!(view.translated_html.as_deref(), Some("<p>Hi</p>"));
        assert!(view.can_export);

        let export = get(&app, &format!("/api/export/{session_id}")).await;
        assert_eq!(export.status(), StatusCode::OK);
        let page = body_text(export).await;
        assert!(page.contains("<p>Hi</p>"));
        assert!(page.contains("window.print()"));
    }

    #[tokio::test]
    async fn test_stream_closes_after_completion() {
        let (state, app) = app();
        let session_id = upload(&app).await;
        post(&app, &format!("/api/translate/{session_id}")).await;
        wait_for_status(&state, &session_id, TranslationStatus::Completed).await;

        let response = get(&app, &format!("/api/translate/{session_id}/stream")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let events = body_text(response).await;
        assert!(events.contains("event: update"));
        assert!(events.contains("event: done"));
        assert!(events.contains("Download PDF"));
    }

    #[tokio::test]
    async fn test_language_locked_while_translating() {
        let (state, app) = app_with(ScriptedModel {
            fragments: Vec::new(),
            hang: true,
        });
        let session_id = upload(&app).await;

        let change = |lang: &str| {
            Request::post(format!("/api/language/{session_id}"))
                .header("content-type", "application/x-www-form-urlencoded")
                .body(Body::from(format!("target_lang={lang}")))
                .unwrap()
        };

        let response = app.clone().oneshot(change("ja")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("value=\"ja\" selected"));

        post(&app, &format!("/api/translate/{session_id}")).await;
        wait_for_status(&state, &session_id, TranslationStatus::Translating).await;

        let response = app.clone().oneshot(change("fr")).await.unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        // Reset abandons the hanging run and frees the preview
        let response = post(&app, &format!("/api/reset/{session_id}")).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let view = snapshot(&state, &session_id).await.unwrap();
        assert!(!view.has_file);
        assert_eq!(view.status, "idle");
        assert_eq!(view.selected.code, "en");
        assert_eq!(state.previews.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_translate_without_file_is_noop() {
        let (state, app) = app();
        let session_id = upload(&app).await;
        post(&app, &format!("/api/reset/{session_id}")).await;

        let response = post(&app, &format!("/api/translate/{session_id}")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!body_text(response).await.contains("sse-connect"));
        let view = snapshot(&state, &session_id).await.unwrap();
        assert_eq!(view.status, "idle");
    }

    #[tokio::test]
    async fn test_export_requires_translation() {
        let (_, app) = app();
        let session_id = upload(&app).await;
        let response = get(&app, &format!("/api/export/{session_id}")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_session_and_preview() {
        let (_, app) = app();
        assert_eq!(get(&app, "/view/nope").await.status(), StatusCode::NOT_FOUND);
        assert_eq!(get(&app, "/preview/nope/0").await.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_original_pane_serves_rendered_pages() {
        let (state, app) = app();
        let session_id = upload_pdf(&app, &generated_pdf(2)).await;
        let preview = preview_id(&state, &session_id).await;

        let response = get(&app, &format!("/api/original/{session_id}")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("2 Pages"));
        assert!(html.contains(&format!("/preview/{preview}/0")));
        assert!(html.contains(&format!("/preview/{preview}/1")));

        let page = get(&app, &format!("/preview/{preview}/0")).await;
        assert_eq!(page.status(), StatusCode::OK);
        assert_eq!(page.headers()["content-type"], "image/png");
        let bytes = axum::body::to_bytes(page.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.starts_with(b"\x89PNG"));

        assert_eq!(get(&app, &format!("/preview/{preview}/2")).await.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_original_pane_reports_unreadable_pdf() {
        let (_, app) = app();
        let session_id = upload_pdf(&app, b"not a pdf").await;
        let response = get(&app, &format!("/api/original/{session_id}")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Could not load PDF preview."));
    }

    #[tokio::test]
    async fn test_reset_revokes_served_pages() {
        let (state, app) = app();
        let session_id = upload_pdf(&app, &generated_pdf(1)).await;
        let preview = preview_id(&state, &session_id).await;
        let page_url = format!("/preview/{preview}/0");

        get(&app, &format!("/api/original/{session_id}")).await;
        assert_eq!(get(&app, &page_url).await.status(), StatusCode::OK);

        post(&app, &format!("/api/reset/{session_id}")).await;
        assert_eq!(get(&app, &page_url).await.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            get(&app, &format!("/api/original/{session_id}")).await.status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(state.previews.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_new_file_revokes_previous_pages() {
        let (state, app) = app();
        let pdf = generated_pdf(1);
        let session_id = upload_pdf(&app, &pdf).await;
        let old = preview_id(&state, &session_id).await;
        get(&app, &format!("/api/original/{session_id}")).await;
        assert_eq!(get(&app, &format!("/preview/{old}/0")).await.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(upload_bytes(
                &format!("/api/upload/{session_id}"),
                "second.pdf",
                "application/pdf",
                &pdf,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let new = preview_id(&state, &session_id).await;
        assert_ne!(new, old);
        assert_eq!(get(&app, &format!("/preview/{old}/0")).await.status(), StatusCode::NOT_FOUND);
        assert_eq!(state.previews.outstanding(), 1);

        let html = body_text(get(&app, &format!("/api/original/{session_id}")).await).await;
        assert!(html.contains(&format!("/preview/{new}/0")));
        assert_eq!(get(&app, &format!("/preview/{new}/0")).await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_oversized_upload_accepted_with_notice() {
        let client = TranslationClient::new(Arc::new(ScriptedModel {
            fragments: Vec::new(),
            hang: false,
        }));
        let config = AppConfig {
            upload_soft_limit_mb: 0,
            ..AppConfig::default()
        };
        let state = Arc::new(AppState::with_client(config, client).unwrap());
        let app = router(Arc::clone(&state), PathBuf::from("static"));

        let session_id = upload(&app).await;
        let view = snapshot(&state, &session_id).await.unwrap();
        assert!(view.has_file);
        assert!(view.oversized);

        let html = body_text(get(&app, &format!("/view/{session_id}")).await).await;
        assert!(html.contains("larger than recommended"));
    }
}
