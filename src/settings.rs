use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};
use url::Url;

/// How the form is delivered to the backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmitMode {
    /// `POST /restrictions` first, then `POST /courses` with the course list only.
    #[default]
    Split,
    /// One `POST /courses` carrying both courses and restrictions.
    Combined,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Settings {
    pub backend_base_url: Url,
    pub debug: bool,
    pub enable_swagger: bool,
    pub port: u16,
    pub submit_mode: SubmitMode,
    /// Used for a blank `{day}End` input.
    pub default_end_time: String,
    pub schedule_path: String,
    pub summaries_path: String,
    pub calendar_filename: String,
    pub poll_interval_ms: u64,
    pub poll_max_attempts: u32,
    pub request_timeout_secs: u64,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let config = Config::builder()
            // Load from environment variables with APP_ prefix
            .add_source(Environment::with_prefix("APP").prefix_separator("_"))
            .set_default("backend_base_url", "http://127.0.0.1:5000")?
            .set_default("debug", false)?
            .set_default("enable_swagger", true)?
            .set_default("port", 8080)?
            .set_default("submit_mode", "split")?
            .set_default("default_end_time", "0000")?
            .set_default("schedule_path", "/get-schedule/generated_schedule.json")?
            .set_default("summaries_path", "/get-schedule/professor_summaries.json")?
            .set_default("calendar_filename", "schedule.ics")?
            .set_default("poll_interval_ms", 250)?
            .set_default("poll_max_attempts", 40)?
            .set_default("request_timeout_secs", 30)?
            .build()?;

        config.try_deserialize()
    }

    /// Settings pointing at `backend_base_url` with every other value at its default.
    pub fn for_backend(backend_base_url: Url) -> Self {
        Self {
            backend_base_url,
            debug: false,
            enable_swagger: true,
            port: 8080,
            submit_mode: SubmitMode::Split,
            default_end_time: "0000".to_string(),
            schedule_path: "/get-schedule/generated_schedule.json".to_string(),
            summaries_path: "/get-schedule/professor_summaries.json".to_string(),
            calendar_filename: "schedule.ics".to_string(),
            poll_interval_ms: 250,
            poll_max_attempts: 40,
            request_timeout_secs: 30,
        }
    }
}
