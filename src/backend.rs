use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use reqwest::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::form::{SchedulePayload, TimeRestrictions};
use crate::models::{CoursesResponse, ProfessorSummaries, ValidationReport, WeeklySchedule};
use crate::settings::{Settings, SubmitMode};

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{path} returned {status}")]
    Status {
        path: String,
        status: StatusCode,
        message: Option<String>,
    },
    #[error("{0} returned an empty document")]
    Empty(String),
    #[error("{path} returned an unreadable document: {source}")]
    Decode {
        path: String,
        source: serde_json::Error,
    },
    #[error("Invalid backend URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("Schedule was not updated after {attempts} checks")]
    PollTimeout { attempts: u32 },
}

impl BackendError {
    /// The backend's own `error` text, when it sent one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            BackendError::Status { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

/// A fetched JSON document, kept raw so later fetches can be compared against it.
#[derive(Debug, Clone, PartialEq)]
pub struct Document<T> {
    pub raw: serde_json::Value,
    pub parsed: T,
}

#[derive(Clone)]
pub struct SchedulerBackend {
    client: reqwest::Client,
    base_url: Arc<Url>,
    schedule_path: Arc<str>,
    summaries_path: Arc<str>,
    submit_mode: SubmitMode,
    poll_interval: Duration,
    poll_max_attempts: u32,
}

impl SchedulerBackend {
    pub fn new(settings: &Settings) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: Arc::new(settings.backend_base_url.clone()),
            schedule_path: settings.schedule_path.as_str().into(),
            summaries_path: settings.summaries_path.as_str().into(),
            submit_mode: settings.submit_mode,
            poll_interval: Duration::from_millis(settings.poll_interval_ms),
            poll_max_attempts: settings.poll_max_attempts,
        })
    }

    pub fn submit_mode(&self) -> SubmitMode {
        self.submit_mode
    }

    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        Ok(self.base_url.join(path)?)
    }

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response, BackendError> {
        let url = self.endpoint(path)?;
        let response = self.client.post(url).json(body).send().await?;
        ensure_success(path, response).await
    }

    async fn get_document<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Document<T>, BackendError> {
        let url = self.endpoint(path)?;
        let response = self.client.get(url).send().await?;
        let response = ensure_success(path, response).await?;
        let text = response.text().await?;
        let decode = |source| BackendError::Decode {
            path: path.to_string(),
            source,
        };
        let raw: serde_json::Value = serde_json::from_str(&text).map_err(decode)?;
        if raw.as_object().is_some_and(|o| o.is_empty()) || raw.is_null() {
            return Err(BackendError::Empty(path.to_string()));
        }
        // Parsed from the text, not from `raw`, which does not keep key order
        let parsed = serde_json::from_str(&text).map_err(decode)?;
        Ok(Document { raw, parsed })
    }

    pub async fn clear_directories(&self) -> Result<(), BackendError> {
        let url = self.endpoint("/clear-directories")?;
        let response = self.client.post(url).send().await?;
        ensure_success("/clear-directories", response).await?;
        debug!("backend directories cleared");
        Ok(())
    }

    pub async fn save_restrictions(
        &self,
        restrictions: &TimeRestrictions,
    ) -> Result<(), BackendError> {
        self.post_json("/restrictions", restrictions).await?;
        Ok(())
    }

    /// Sends the course list. In combined mode the restrictions ride along.
    pub async fn submit_courses(
        &self,
        payload: &SchedulePayload,
    ) -> Result<CoursesResponse, BackendError> {
        let response = match self.submit_mode {
            SubmitMode::Split => {
                self.post_json("/courses", &serde_json::json!({ "courses": payload.courses }))
                    .await?
            }
            SubmitMode::Combined => self.post_json("/courses", payload).await?,
        };
        Ok(response.json().await?)
    }

    pub async fn fetch_schedule(&self) -> Result<Document<WeeklySchedule>, BackendError> {
        self.get_document(&self.schedule_path).await
    }

    pub async fn fetch_professor_summaries(
        &self,
    ) -> Result<Document<ProfessorSummaries>, BackendError> {
        self.get_document(&self.summaries_path).await
    }

    /// A 404 means the backend has nothing to report.
    pub async fn fetch_validation_errors(&self) -> Result<ValidationReport, BackendError> {
        let url = self.endpoint("/get-validation")?;
        let response = self.client.get(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!("no validation errors found");
            return Ok(ValidationReport::default());
        }
        let response = ensure_success("/get-validation", response).await?;
        Ok(response.json().await?)
    }

    pub async fn convert_calendar(&self) -> Result<Bytes, BackendError> {
        let url = self.endpoint("/convert-calendar")?;
        let response = self.client.get(url).send().await?;
        let response = ensure_success("/convert-calendar", response).await?;
        Ok(response.bytes().await?)
    }

    /// Re-fetches the schedule until it differs from `previous`.
    ///
    /// Missing or empty documents count as "not ready yet".
    pub async fn wait_for_new_schedule(
        &self,
        previous: Option<&serde_json::Value>,
    ) -> Result<Document<WeeklySchedule>, BackendError> {
        for attempt in 1..=self.poll_max_attempts {
            match self.fetch_schedule().await {
                Ok(doc) if Some(&doc.raw) != previous => {
                    debug!(attempt, "new schedule available");
                    return Ok(doc);
                }
                Ok(_) => debug!(attempt, "schedule unchanged"),
                Err(
                    err @ (BackendError::Status { .. }
                    | BackendError::Empty(_)
                    | BackendError::Decode { .. }),
                ) => {
                    debug!(attempt, error = %err, "schedule not ready");
                }
                Err(err) => {
                    warn!(attempt, error = %err, "schedule poll failed");
                    return Err(err);
                }
            }
            tokio::time::sleep(self.poll_interval).await;
        }
        Err(BackendError::PollTimeout {
            attempts: self.poll_max_attempts,
        })
    }
}

async fn ensure_success(
    path: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .json::<serde_json::Value>()
        .await
        .ok()
        .and_then(|body| body.get("error").and_then(|e| e.as_str()).map(str::to_string));
    warn!(path, %status, "backend request failed");
    Err(BackendError::Status {
        path: path.to_string(),
        status,
        message,
    })
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;

    use super::*;
    use crate::form::FormState;

    fn backend_for(server: &MockServer) -> SchedulerBackend {
        let mut settings = Settings::for_backend(Url::parse(&server.base_url()).unwrap());
        settings.poll_interval_ms = 1;
        settings.poll_max_attempts = 3;
        SchedulerBackend::new(&settings).unwrap()
    }

    #[tokio::test]
    async fn test_validation_not_found_is_empty() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/get-validation");
            then.status(404);
        });
        let report = backend_for(&server).fetch_validation_errors().await.unwrap();
        assert!(report.validation_errors.is_empty());
    }

    #[tokio::test]
    async fn test_validation_server_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/get-validation");
            then.status(500);
        });
        let err = backend_for(&server)
            .fetch_validation_errors()
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Status { .. }));
    }

    #[tokio::test]
    async fn test_empty_schedule_document() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/get-schedule/generated_schedule.json");
            then.status(200).json_body(serde_json::json!({}));
        });
        let err = backend_for(&server).fetch_schedule().await.unwrap_err();
        assert!(matches!(err, BackendError::Empty(_)));
    }

    #[tokio::test]
    async fn test_submit_courses_reports_server_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/courses");
            then.status(400)
                .json_body(serde_json::json!({"error": "No courses provided"}));
        });
        let payload = FormState::default().payload("0000");
        let err = backend_for(&server)
            .submit_courses(&payload)
            .await
            .unwrap_err();
        assert_eq!(err.server_message(), Some("No courses provided"));
    }

    #[tokio::test]
    async fn test_wait_for_new_schedule_times_out_when_unchanged() {
        let server = MockServer::start();
        let body = serde_json::json!({"weekly_schedule": {"Monday": []}});
        let mock = server.mock(|when, then| {
            when.method(GET).path("/get-schedule/generated_schedule.json");
            then.status(200).json_body(body.clone());
        });
        let err = backend_for(&server)
            .wait_for_new_schedule(Some(&body))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::PollTimeout { attempts: 3 }));
        mock.assert_calls(3);
    }

    #[tokio::test]
    async fn test_wait_for_new_schedule_returns_changed_document() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/get-schedule/generated_schedule.json");
            then.status(200)
                .json_body(serde_json::json!({"weekly_schedule": {"Tuesday": []}}));
        });
        let old = serde_json::json!({"weekly_schedule": {"Monday": []}});
        let doc = backend_for(&server)
            .wait_for_new_schedule(Some(&old))
            .await
            .unwrap();
        assert_eq!(doc.parsed.weekly_schedule.unwrap()[0].0, "Tuesday");
    }
}
