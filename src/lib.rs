pub mod backend;
pub mod controller;
pub mod error;
pub mod form;
pub mod handlers;
pub mod models;
pub mod openapi;
pub mod render;
pub mod settings;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use handlers::{
    add_course, delete_course, download_calendar, end_session, get_form, get_professors,
    get_schedule, get_validation, healthz_live, healthz_ready, index, submit,
};
use tower_http::LatencyUnit;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, info};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::backend::SchedulerBackend;
use crate::controller::Controller;
use crate::openapi::ApiDoc;
use crate::settings::Settings;

#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub controller: Arc<Controller>,
}

impl AppState {
    pub fn new(settings: Settings) -> Result<Self, backend::BackendError> {
        let backend = SchedulerBackend::new(&settings)?;
        let controller = Controller::new(backend, settings.default_end_time.clone());
        Ok(Self {
            settings,
            controller: Arc::new(controller),
        })
    }
}

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_env()?;

    let env_filter = if settings.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .without_time()
        .init();

    let state = AppState::new(settings)?;
    info!(
        backend = %state.settings.backend_base_url,
        mode = ?state.settings.submit_mode,
        "Scheduler backend configured"
    );

    let app = build_router(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], state.settings.port));
    info!("Starting course scheduler front-end on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(LatencyUnit::Millis),
        );

    let mut router = Router::new()
        .route("/", get(index))
        .route("/courses/add", post(add_course))
        .route("/courses/{id}/delete", post(delete_course))
        .route("/submit", post(submit))
        .route("/calendar.ics", get(download_calendar))
        .route("/session/end", post(end_session))
        .route("/api/form", get(get_form))
        .route("/api/schedule", get(get_schedule))
        .route("/api/professors", get(get_professors))
        .route("/api/validation", get(get_validation))
        .route("/healthz/live", get(healthz_live))
        .route("/healthz/ready", get(healthz_ready))
        .with_state(state.clone());

    if state.settings.enable_swagger {
        let openapi = ApiDoc::openapi();
        let swagger = SwaggerUi::new("/docs").url("/openapi.json", openapi);
        router = router.merge(swagger);
    }

    router.layer(trace_layer)
}
