//! Schedule form controller: owns the form, the fetched results and the
//! submission state, and drives the backend for every user action.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::body::Bytes;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::backend::{BackendError, Document, SchedulerBackend};
use crate::form::{FormError, FormState, SchedulePayload};
use crate::models::{ProfessorSummaries, ValidationReport, WeeklySchedule};
use crate::render::{self, RenderError};
use crate::settings::SubmitMode;

pub const SCHEDULE_LOAD_FAILED: &str =
    "Failed to load course schedule. Please try generating a schedule first.";
pub const SUMMARIES_LOAD_FAILED: &str =
    "Failed to load professor summaries. Please try generating a schedule first.";
pub const CALENDAR_DOWNLOAD_FAILED: &str = "Failed to download calendar. Please try again.";

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("A schedule is already being generated.")]
    InFlight,
    #[error("Failed to save time restrictions")]
    Restrictions(#[source] BackendError),
    #[error("{message}")]
    Courses {
        message: String,
        #[source]
        source: BackendError,
    },
    #[error("{0}")]
    Rejected(String),
    #[error("The schedule was not ready in time. Please try again.")]
    NotReady(#[source] BackendError),
    #[error("{}", SCHEDULE_LOAD_FAILED)]
    Schedule(#[source] BackendError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("{}", SUMMARIES_LOAD_FAILED)]
    Summaries(#[source] BackendError),
}

impl SubmitError {
    fn courses(source: BackendError) -> Self {
        let message = source
            .server_message()
            .unwrap_or("Failed to process courses")
            .to_string();
        SubmitError::Courses { message, source }
    }

    fn schedule(source: BackendError) -> Self {
        match source {
            BackendError::PollTimeout { .. } => SubmitError::NotReady(source),
            other => SubmitError::Schedule(other),
        }
    }
}

/// Fetched results plus the messages waiting to be shown.
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    pub schedule: Option<Document<WeeklySchedule>>,
    pub professors: Option<ProfessorSummaries>,
    pub validation: ValidationReport,
    /// Failure of the latest table load, replaced on every load.
    pub load_error: Option<String>,
    /// Failure of the latest submit, shown by the next render only.
    pub submit_error: Option<String>,
    /// One-shot alert, cleared once rendered.
    pub alert: Option<String>,
    pub last_generated: Option<DateTime<Utc>>,
}

/// What one page render needs.
#[derive(Debug, Clone)]
pub struct PageSnapshot {
    pub form: FormState,
    pub view: ViewState,
    pub submitting: bool,
}

/// State for the single browser session the backend serves; the backend
/// itself keeps one set of working files.
pub struct Controller {
    backend: SchedulerBackend,
    default_end_time: String,
    form: RwLock<FormState>,
    view: RwLock<ViewState>,
    in_flight: AtomicBool,
}

/// Marks a submit as running; released on drop.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn claim(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Controller {
    pub fn new(backend: SchedulerBackend, default_end_time: impl Into<String>) -> Self {
        Self {
            backend,
            default_end_time: default_end_time.into(),
            form: RwLock::new(FormState::default()),
            view: RwLock::new(ViewState::default()),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub async fn form(&self) -> FormState {
        self.form.read().await.clone()
    }

    pub async fn view(&self) -> ViewState {
        self.view.read().await.clone()
    }

    /// Takes the pending alert and submit error with the rest of the state,
    /// so they show once.
    pub async fn snapshot(&self) -> PageSnapshot {
        let form = self.form.read().await.clone();
        let view = {
            let mut view = self.view.write().await;
            let snapshot = view.clone();
            view.alert = None;
            view.submit_error = None;
            snapshot
        };
        PageSnapshot {
            form,
            view,
            submitting: self.is_submitting(),
        }
    }

    async fn set_alert(&self, message: impl Into<String>) {
        self.view.write().await.alert = Some(message.into());
    }

    pub async fn add_course(&self, fields: &HashMap<String, String>) -> Result<u64, FormError> {
        let mut form = self.form.write().await;
        form.apply_fields(fields);
        let result = form.courses.add_course();
        drop(form);
        if let Err(err) = &result {
            self.set_alert(err.to_string()).await;
        }
        result
    }

    pub async fn delete_course(
        &self,
        id: u64,
        fields: &HashMap<String, String>,
    ) -> Result<(), FormError> {
        let mut form = self.form.write().await;
        form.apply_fields(fields);
        form.courses.delete_course(id)
    }

    /// Runs on every page load. `first_visit` clears the backend's working
    /// directories; returns whether that clear went through.
    pub async fn load_page(&self, first_visit: bool) -> bool {
        let cleared = if first_visit {
            match self.backend.clear_directories().await {
                Ok(()) => {
                    info!("backend directories cleared for new session");
                    true
                }
                Err(err) => {
                    error!(error = %err, "failed to clear backend directories");
                    false
                }
            }
        } else {
            false
        };

        let (validation, ()) = futures::join!(self.refresh_validation(), self.refresh_tables());
        if let Err(err) = validation {
            error!(error = %err, "failed to fetch validation errors");
        }
        cleared
    }

    /// Re-reads the backend's validation report and keeps it for the page.
    pub async fn refresh_validation(&self) -> Result<ValidationReport, BackendError> {
        let report = self.backend.fetch_validation_errors().await?;
        self.view.write().await.validation = report.clone();
        Ok(report)
    }

    /// Fetches both result tables concurrently. The outcome replaces the
    /// previous load error; the summaries failure wins when both fail.
    pub async fn refresh_tables(&self) {
        let (schedule, professors) = futures::join!(
            self.backend.fetch_schedule(),
            self.backend.fetch_professor_summaries()
        );
        let schedule_error = match schedule {
            Ok(doc) => self.store_schedule(doc).await.err().map(|err| err.to_string()),
            Err(err) => {
                error!(error = %err, "failed to load schedule");
                Some(SCHEDULE_LOAD_FAILED.to_string())
            }
        };
        let summaries_error = match professors {
            Ok(doc) => {
                self.view.write().await.professors = Some(doc.parsed);
                None
            }
            Err(err) => {
                error!(error = %err, "failed to load professor summaries");
                Some(SUMMARIES_LOAD_FAILED.to_string())
            }
        };
        self.view.write().await.load_error = summaries_error.or(schedule_error);
    }

    async fn store_schedule(&self, doc: Document<WeeklySchedule>) -> Result<(), RenderError> {
        let rows = render::schedule_rows(&doc.parsed);
        let mut view = self.view.write().await;
        match rows {
            Ok(_) => {
                view.schedule = Some(doc);
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "schedule document rejected");
                view.schedule = None;
                Err(err)
            }
        }
    }

    /// Saves the posted form, sends it to the backend and waits for the new
    /// schedule. A failure is kept for the next render.
    pub async fn submit(&self, fields: &HashMap<String, String>) -> Result<(), SubmitError> {
        let Some(_guard) = InFlightGuard::claim(&self.in_flight) else {
            warn!("submit rejected, another one is in flight");
            self.set_alert(SubmitError::InFlight.to_string()).await;
            return Err(SubmitError::InFlight);
        };

        let payload = {
            let mut form = self.form.write().await;
            form.apply_fields(fields);
            form.payload(&self.default_end_time)
        };
        {
            let mut view = self.view.write().await;
            view.submit_error = None;
            view.load_error = None;
        }
        info!(courses = payload.courses.len(), "submitting schedule request");

        let result = self.run_submit(&payload).await;
        if let Err(err) = &result {
            error!(error = %err, "schedule submission failed");
            self.view.write().await.submit_error = Some(err.to_string());
        }
        result
    }

    async fn run_submit(&self, payload: &SchedulePayload) -> Result<(), SubmitError> {
        let previous = self
            .view
            .read()
            .await
            .schedule
            .as_ref()
            .map(|doc| doc.raw.clone());

        if self.backend.submit_mode() == SubmitMode::Split {
            self.backend
                .save_restrictions(&payload.time_restrictions)
                .await
                .map_err(SubmitError::Restrictions)?;
        }

        let response = self
            .backend
            .submit_courses(payload)
            .await
            .map_err(SubmitError::courses)?;
        if !response.succeeded() {
            return Err(SubmitError::Rejected(
                response
                    .error
                    .unwrap_or_else(|| "No schedule data received".to_string()),
            ));
        }

        let schedule = self
            .backend
            .wait_for_new_schedule(previous.as_ref())
            .await
            .map_err(SubmitError::schedule)?;
        self.store_schedule(schedule).await?;
        self.view.write().await.last_generated = Some(Utc::now());

        let professors = self
            .backend
            .fetch_professor_summaries()
            .await
            .map_err(SubmitError::Summaries)?;
        self.view.write().await.professors = Some(professors.parsed);
        Ok(())
    }

    /// Asks the backend for the calendar file. A failure leaves the download alert.
    pub async fn download_calendar(&self) -> Result<Bytes, BackendError> {
        match self.backend.convert_calendar().await {
            Ok(body) => Ok(body),
            Err(err) => {
                error!(error = %err, "error downloading calendar");
                self.set_alert(CALENDAR_DOWNLOAD_FAILED).await;
                Err(err)
            }
        }
    }

    /// Clears the backend's working directories and forgets everything shown.
    pub async fn end_session(&self) -> Result<(), BackendError> {
        *self.form.write().await = FormState::default();
        *self.view.write().await = ViewState::default();
        self.backend.clear_directories().await
    }
}
