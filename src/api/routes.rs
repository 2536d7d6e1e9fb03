use axum::{
    routing::{get, post},
    Router,
    extract::{DefaultBodyLimit, FromRequest, Json, Multipart, Request, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
};
use tower_http::cors::{CorsLayer, Any};
use tower_http::services::ServeFile;
use tower_http::trace::TraceLayer;
use chrono::Utc;
use tracing::{info, warn};

use crate::error::{Result, AppError};
use crate::api::models::{AnalyzeQuery, AnalyzeResponse};
use crate::critique::{build_system_prompt, extract_notes, ReadingStyle, USER_PROMPT};
use crate::llm::VisionPrompt;
use crate::page::{parse_page_url, PageImage};
use crate::AppState;

pub const ANALYZE_PAGE_PATH: &str = "/analyze-page";
/// Submit handler served next to the index page.
pub const SCRIPT_FILE: &str = "analyze.js";

pub fn create_router(app_state: AppState) -> Router {
    let index = ServeFile::new(&app_state.config.index_path);
    let script = ServeFile::new(app_state.config.index_path.with_file_name(SCRIPT_FILE));
    let body_limit = app_state.config.max_upload_bytes;

    Router::new()
        .route_service("/", index)
        .route_service("/analyze.js", script)
        .route("/health", get(health))
        .route(ANALYZE_PAGE_PATH, post(analyze_page_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(app_state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// What the caller sent, before any network work happens.
enum Submission {
    Upload { image: PageImage, style: ReadingStyle },
    Link(AnalyzeQuery),
}

async fn analyze_page_handler(State(state): State<AppState>, request: Request) -> Response {
    let start_time = std::time::Instant::now();

    // Body upload and analysis share one deadline
    let work = async {
        let submission = read_submission(&state, request).await?;
        process_submission(&state, submission).await
    };
    let result = tokio::time::timeout(state.config.analyze_timeout, work)
        .await
        .unwrap_or(Err(AppError::Timeout));

    let elapsed = start_time.elapsed();
    match result {
        Ok(response) => {
            info!(?elapsed, notes = response.notes.len(), "page analyzed");
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => {
            warn!(?elapsed, status = err.status().as_u16(), error = %err, "page analysis failed");
            err.into_response()
        }
    }
}

async fn read_submission(state: &AppState, request: Request) -> Result<Submission> {
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase();

    if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(request, state)
            .await
            .map_err(|r| AppError::BadRequest(r.body_text()))?;
        read_upload(multipart).await
    } else if content_type.starts_with("application/json") {
        let Json(query) = Json::<AnalyzeQuery>::from_request(request, state)
            .await
            .map_err(|r| AppError::BadRequest(r.body_text()))?;
        Ok(Submission::Link(query))
    } else {
        Err(AppError::UnsupportedMedia(
            "Send the page as multipart/form-data or a JSON body.".to_string(),
        ))
    }
}

async fn read_upload(mut multipart: Multipart) -> Result<Submission> {
    let mut upload: Option<(String, Vec<u8>)> = None;
    let mut style = ReadingStyle::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("image") => {
                let content_type = field.content_type().unwrap_or("").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                upload = Some((content_type, bytes.to_vec()));
            }
            Some("style") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                style = ReadingStyle::from_form(&text);
            }
            _ => {}
        }
    }

    let (content_type, bytes) =
        upload.ok_or_else(|| AppError::BadRequest("No image uploaded.".to_string()))?;
    let image = PageImage::new(&content_type, bytes)?;
    Ok(Submission::Upload { image, style })
}

async fn process_submission(state: &AppState, submission: Submission) -> Result<AnalyzeResponse> {
    let (image, style, goals) = match submission {
        Submission::Upload { image, style } => (image, style, None),
        Submission::Link(query) => {
            let url = parse_page_url(&query.url)?;
            info!(%url, "fetching page image");
            let image = state.pages.fetch_page_image(&url).await?;
            let style = query
                .style
                .as_deref()
                .map(ReadingStyle::from_form)
                .unwrap_or_default();
            (image, style, query.goals)
        }
    };
    info!(content_type = %image.content_type, bytes = image.bytes.len(), ?style, "analyzing page");

    let system = build_system_prompt(style, goals.as_deref());
    let content = state
        .llm
        .critique(VisionPrompt {
            system: &system,
            user: USER_PROMPT,
            image_data_url: image.data_url(),
        })
        .await?;

    Ok(AnalyzeResponse {
        notes: extract_notes(&content),
        model: state.llm.model().to_string(),
        analyzed_at: Utc::now(),
    })
}
