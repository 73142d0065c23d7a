use axum::{
    Json, Router,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use log::{error, info};
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::{ServerConfig, WebPartProperties};
use crate::filter::FilterQuery;
use crate::platform::{ReqwestHttp, SiteHttp};
use crate::shell::{Export, ScoreDisplay};
use crate::strings;

/// Byte order mark so Excel opens the CSV as UTF-8.
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Serialize)]
struct StatusResponse {
    status: String,
    message: Option<String>,
}

impl StatusResponse {
    fn error(message: impl Into<String>) -> Json<Self> {
        Json(StatusResponse {
            status: "error".to_string(),
            message: Some(message.into()),
        })
    }

    fn ok() -> Json<Self> {
        Json(StatusResponse {
            status: "ok".to_string(),
            message: None,
        })
    }
}

/// Build the router around one component instance.
pub fn router<H: SiteHttp>(shell: Arc<ScoreDisplay<H>>) -> Router {
    Router::new()
        .route("/", get(serve_page::<H>))
        .route("/api/status", get(get_status::<H>))
        .route("/api/table", get(get_table::<H>))
        .route("/api/identity", get(get_identity::<H>))
        .route("/api/export/csv", get(export_csv::<H>))
        .route("/api/export/xlsx", get(export_xlsx::<H>))
        .route("/api/render", post(trigger_render::<H>))
        .route(
            "/api/properties",
            get(get_properties::<H>).put(put_properties::<H>),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(shell)
}

/// Start the component and serve it until the process exits.
pub async fn run(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let http = ReqwestHttp::new(config.access_token.clone())?;
    let shell = Arc::new(ScoreDisplay::new(
        http,
        config.context,
        config.properties,
        config.shell,
    ));
    shell.init()?;
    spawn_render(shell.clone());

    let app = router(shell);
    let listener = TcpListener::bind(&config.listen).await?;
    info!("Listening on http://{}", config.listen);
    axum::serve(listener, app).await?;

    Ok(())
}

fn spawn_render<H: SiteHttp>(shell: Arc<ScoreDisplay<H>>) {
    tokio::spawn(async move {
        let outcome = shell.render().await;
        info!("render finished: {:?}", outcome);
    });
}

async fn serve_page<H: SiteHttp>(State(shell): State<Arc<ScoreDisplay<H>>>) -> Response {
    match shell.page() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!("page render failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(format!("<h2>{}</h2>", strings::GENERIC_ERROR)),
            )
                .into_response()
        }
    }
}

async fn get_status<H: SiteHttp>(State(shell): State<Arc<ScoreDisplay<H>>>) -> impl IntoResponse {
    Json(shell.state())
}

async fn get_table<H: SiteHttp>(
    State(shell): State<Arc<ScoreDisplay<H>>>,
    Query(query): Query<FilterQuery>,
) -> Response {
    match shell.table(&query) {
        Some(table) => Json(table).into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            StatusResponse::error(strings::GENERIC_ERROR),
        )
            .into_response(),
    }
}

async fn get_identity<H: SiteHttp>(State(shell): State<Arc<ScoreDisplay<H>>>) -> impl IntoResponse {
    Json(shell.identity())
}

async fn export_csv<H: SiteHttp>(
    State(shell): State<Arc<ScoreDisplay<H>>>,
    Query(query): Query<FilterQuery>,
) -> Response {
    match shell.export_csv(&query) {
        Ok(mut export) => {
            let mut bytes = UTF8_BOM.to_vec();
            bytes.append(&mut export.bytes);
            export.bytes = bytes;
            attachment(export)
        }
        Err(e) => export_failed(e),
    }
}

async fn export_xlsx<H: SiteHttp>(
    State(shell): State<Arc<ScoreDisplay<H>>>,
    Query(query): Query<FilterQuery>,
) -> Response {
    match shell.export_xlsx(&query) {
        Ok(export) => attachment(export),
        Err(e) => export_failed(e),
    }
}

fn attachment(export: Export) -> Response {
    let headers = [
        (header::CONTENT_TYPE, export.content_type.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", export.filename),
        ),
    ];
    (StatusCode::OK, headers, export.bytes).into_response()
}

fn export_failed(e: crate::error::ScoreError) -> Response {
    error!("export failed: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        StatusResponse::error(strings::EXPORT_FAILED),
    )
        .into_response()
}

async fn trigger_render<H: SiteHttp>(State(shell): State<Arc<ScoreDisplay<H>>>) -> impl IntoResponse {
    spawn_render(shell);
    (StatusCode::ACCEPTED, StatusResponse::ok())
}

async fn get_properties<H: SiteHttp>(State(shell): State<Arc<ScoreDisplay<H>>>) -> impl IntoResponse {
    Json(shell.properties())
}

async fn put_properties<H: SiteHttp>(
    State(shell): State<Arc<ScoreDisplay<H>>>,
    Json(properties): Json<WebPartProperties>,
) -> Response {
    match shell.update_properties(properties) {
        Ok(()) => {
            spawn_render(shell);
            (StatusCode::ACCEPTED, StatusResponse::ok()).into_response()
        }
        Err(e) => (StatusCode::BAD_REQUEST, StatusResponse::error(e.to_string())).into_response(),
    }
}
