use std::collections::HashMap;

use axum::extract::{Form, Path, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Json;
use axum_extra::extract::TypedHeader;
use axum_extra::headers::Cookie;
use serde::Serialize;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::controller::SubmitError;
use crate::error::ApiError;
use crate::form::{CourseRow, DayWindow, Weekday};
use crate::models::ValidationReport;
use crate::render::{self, ProfessorRow, ScheduleRow};
use crate::AppState;

pub const SESSION_COOKIE: &str = "hasLoaded";

type FormFields = Form<HashMap<String, String>>;

fn is_first_visit(cookie: Option<&Cookie>) -> bool {
    cookie.and_then(|c| c.get(SESSION_COOKIE)) != Some("true")
}

pub async fn index(
    State(state): State<AppState>,
    cookie: Option<TypedHeader<Cookie>>,
) -> Response {
    let first_visit = is_first_visit(cookie.as_ref().map(|TypedHeader(c)| c));
    let cleared = state.controller.load_page(first_visit).await;
    let snapshot = state.controller.snapshot().await;
    let mut response = Html(render::render_page(&snapshot, "/calendar.ics")).into_response();
    if cleared {
        response.headers_mut().insert(
            header::SET_COOKIE,
            HeaderValue::from_static("hasLoaded=true; Path=/; SameSite=Lax"),
        );
    }
    response
}

pub async fn add_course(State(state): State<AppState>, Form(fields): FormFields) -> Redirect {
    if let Ok(id) = state.controller.add_course(&fields).await {
        info!(id, "course row added");
    }
    Redirect::to("/")
}

pub async fn delete_course(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Form(fields): FormFields,
) -> Result<Redirect, ApiError> {
    state
        .controller
        .delete_course(id, &fields)
        .await
        .map_err(|err| ApiError::NotFound(err.to_string()))?;
    Ok(Redirect::to("/"))
}

pub async fn submit(State(state): State<AppState>, Form(fields): FormFields) -> Redirect {
    match state.controller.submit(&fields).await {
        Ok(()) => info!("schedule generated"),
        Err(SubmitError::InFlight) => {}
        Err(err) => warn!(error = %err, "submit finished with an error"),
    }
    Redirect::to("/")
}

pub async fn download_calendar(State(state): State<AppState>) -> Response {
    match state.controller.download_calendar().await {
        Ok(body) => {
            let disposition = format!(
                "attachment; filename={}",
                state.settings.calendar_filename
            );
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "text/calendar".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                body,
            )
                .into_response()
        }
        Err(_) => Redirect::to("/").into_response(),
    }
}

pub async fn end_session(State(state): State<AppState>) -> Redirect {
    if let Err(err) = state.controller.end_session().await {
        warn!(error = %err, "error clearing directories on session end");
    }
    Redirect::to("/")
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DayInputs {
    pub day: String,
    #[serde(flatten)]
    pub window: DayWindow,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FormView {
    pub courses: Vec<CourseRow>,
    pub times: Vec<DayInputs>,
    pub submitting: bool,
}

#[utoipa::path(get, path = "/healthz/live", tag = "scheduler")]
pub async fn healthz_live() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

#[utoipa::path(get, path = "/healthz/ready", tag = "scheduler")]
pub async fn healthz_ready() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

#[utoipa::path(
    get,
    path = "/api/form",
    responses((status = 200, description = "Current course rows and time inputs", body = FormView)),
    tag = "scheduler"
)]
pub async fn get_form(State(state): State<AppState>) -> Json<FormView> {
    let form = state.controller.form().await;
    let times = Weekday::ALL
        .iter()
        .map(|&day| DayInputs {
            day: day.label().to_string(),
            window: form.times.get(day).clone(),
        })
        .collect();
    Json(FormView {
        courses: form.courses.rows().to_vec(),
        times,
        submitting: state.controller.is_submitting(),
    })
}

#[utoipa::path(
    get,
    path = "/api/schedule",
    responses(
        (status = 200, description = "Rendered schedule rows", body = [ScheduleRow]),
        (status = 404, description = "No schedule loaded yet")
    ),
    tag = "scheduler"
)]
pub async fn get_schedule(
    State(state): State<AppState>,
) -> Result<Json<Vec<ScheduleRow>>, ApiError> {
    let view = state.controller.view().await;
    let doc = view
        .schedule
        .ok_or_else(|| ApiError::NotFound("No schedule data available".into()))?;
    Ok(Json(render::schedule_rows(&doc.parsed)?))
}

#[utoipa::path(
    get,
    path = "/api/professors",
    responses(
        (status = 200, description = "Rendered professor summary rows", body = [ProfessorRow]),
        (status = 404, description = "Professor data is not loaded")
    ),
    tag = "scheduler"
)]
pub async fn get_professors(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProfessorRow>>, ApiError> {
    let view = state.controller.view().await;
    Ok(Json(render::professor_rows(view.professors.as_ref())?))
}

#[utoipa::path(
    get,
    path = "/api/validation",
    responses(
        (status = 200, description = "Validation errors reported by the scheduler", body = ValidationReport),
        (status = 502, description = "Scheduling service request failed")
    ),
    tag = "scheduler"
)]
pub async fn get_validation(
    State(state): State<AppState>,
) -> Result<Json<ValidationReport>, ApiError> {
    Ok(Json(state.controller.refresh_validation().await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_first_visit() {
        assert!(is_first_visit(None));

        let mut headers = axum::http::HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("hasLoaded=true"));
        let cookie: Cookie = axum_extra::headers::HeaderMapExt::typed_get(&headers).unwrap();
        assert!(!is_first_visit(Some(&cookie)));
    }
}
