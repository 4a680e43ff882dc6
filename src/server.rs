//! HTTP and WebSocket transport.
//!
//! `POST /info` answers with the format catalog, `GET /ws` carries download
//! sessions, `GET /tools` reports the external binaries. Each socket is one
//! session with at most one download in flight.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use axum::{
    extract::{
        rejection::JsonRejection,
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tokio::sync::mpsc::{self, UnboundedSender};

use crate::downloader::models::{ClientMessage, InfoResponse};
use crate::downloader::tools::{ToolInfo, ToolManager};
use crate::downloader::{
    CatalogPolicy, DownloadError, Downloader, EventSink, ExtractionEngine, FormatSelector,
    SessionEvent,
};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone)]
pub struct AppState {
    pub extractor: Arc<dyn ExtractionEngine>,
    pub downloader: Arc<Downloader>,
    pub catalog: Arc<CatalogPolicy>,
    pub tools: Arc<ToolManager>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<DownloadError> for ApiError {
    fn from(err: DownloadError) -> Self {
        if err.is_client_error() {
            Self::bad_request(err.to_string())
        } else {
            Self::internal(err.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.message,
        });
        (self.status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/info", post(get_info))
        .route("/tools", get(get_tools))
        .route("/ws", get(ws_handler))
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
pub struct InfoRequest {
    #[serde(default)]
    pub url: Option<String>,
}

async fn get_info(
    State(state): State<AppState>,
    payload: Result<Json<InfoRequest>, JsonRejection>,
) -> ApiResult<Json<InfoResponse>> {
    let Json(payload) = payload.map_err(|rejection| {
        tracing::debug!("[Info] Rejected body: {}", rejection.body_text());
        ApiError::bad_request("URL is required")
    })?;
    let url = payload
        .url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::bad_request("URL is required"))?;

    tracing::info!("[Info] Extracting {} via {}", url, state.extractor.name());
    let metadata = state.extractor.extract(url).await.map_err(|e| {
        tracing::warn!("[Info] ✗ Extraction failed for {}: {}", url, e);
        ApiError::from(e)
    })?;

    let formats = FormatSelector::build_catalog(&metadata.formats, &state.catalog)?;
    tracing::info!(
        "[Info] ✓ {} streams -> {} options for {}",
        metadata.formats.len(),
        formats.len(),
        url
    );

    Ok(Json(InfoResponse {
        title: metadata.title,
        uploader: metadata.uploader,
        thumbnail: metadata.thumbnail,
        duration: metadata.duration,
        formats,
    }))
}

async fn get_tools(State(state): State<AppState>) -> ApiResult<Json<Vec<ToolInfo>>> {
    let tools = state.tools.clone();
    let infos = tokio::task::spawn_blocking(move || tools.get_all_tools())
        .await
        .map_err(|e| ApiError::internal(format!("tool probe failed: {}", e)))?;
    Ok(Json(infos))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Clears the session's busy flag when the download task ends, even by panic
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Session-scoped context: one subscriber, one in-flight download
struct Session {
    id: u64,
    events: UnboundedSender<SessionEvent>,
    busy: Arc<AtomicBool>,
}

impl Session {
    fn new(events: UnboundedSender<SessionEvent>) -> Self {
        Self {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            events,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    fn handle_message(&self, text: &str, downloader: &Arc<Downloader>) {
        let request = match serde_json::from_str::<ClientMessage>(text) {
            Ok(ClientMessage::StartDownload(request)) => request,
            Err(e) => {
                tracing::debug!("[Session {}] Bad message: {}", self.id, e);
                self.events.emit(SessionEvent::error(format!("Unrecognized message: {}", e)));
                return;
            }
        };

        if self.busy.swap(true, Ordering::SeqCst) {
            self.events
                .emit(SessionEvent::error("A download is already in progress"));
            return;
        }

        let id = self.id;
        let events = self.events.clone();
        let guard = BusyGuard(self.busy.clone());
        let downloader = downloader.clone();
        tokio::spawn(async move {
            let _guard = guard;
            // Failures were already reported to the client as an error event
            if let Err(e) = downloader.run_download(&request, &events).await {
                tracing::debug!("[Session {}] Download ended with error: {}", id, e);
            }
        });
    }
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let session = Session::new(tx);
    tracing::info!("[Session {}] Connected", session.id);

    loop {
        tokio::select! {
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    session.handle_message(text.as_str(), &state.downloader)
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!("[Session {}] Socket error: {}", session.id, e);
                    break;
                }
            },
            Some(event) = rx.recv() => {
                let payload = match serde_json::to_string(&event) {
                    Ok(payload) => payload,
                    Err(e) => {
                        tracing::error!("[Session {}] Failed to encode event: {}", session.id, e);
                        continue;
                    }
                };
                if socket.send(Message::Text(payload.into())).await.is_err() {
                    break;
                }
            }
        }
    }

    tracing::info!("[Session {}] Disconnected", session.id);
}
