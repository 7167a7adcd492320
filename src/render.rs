//! Table rows and the HTML page.

use maud::{DOCTYPE, Markup, PreEscaped, html};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::controller::PageSnapshot;
use crate::form::Weekday;
use crate::models::{ProfessorSummaries, Text, ValidationReport, WeeklySchedule};

const MISSING: &str = "N/A";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("Invalid schedule data format")]
    MissingWeeklySchedule,
    #[error("Professor data is not loaded")]
    ProfessorsNotLoaded,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ScheduleRow {
    pub course_code: String,
    pub crn: String,
    pub room: String,
    pub meeting_type: String,
    pub day: String,
    pub time: String,
    pub campus: String,
}

impl ScheduleRow {
    pub fn cells(&self) -> [&str; 7] {
        [
            &self.course_code,
            &self.crn,
            &self.room,
            &self.meeting_type,
            &self.day,
            &self.time,
            &self.campus,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ProfessorRow {
    pub courses: String,
    pub name: String,
    /// Present only when the backend sent a non-blank URL.
    pub url: Option<String>,
    pub summary: String,
}

fn or_missing(value: &Option<Text>) -> String {
    value
        .as_ref()
        .map(|t| t.0.clone())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| MISSING.to_string())
}

/// One row per meeting, days in document order.
pub fn schedule_rows(schedule: &WeeklySchedule) -> Result<Vec<ScheduleRow>, RenderError> {
    let days = schedule
        .weekly_schedule
        .as_ref()
        .ok_or(RenderError::MissingWeeklySchedule)?;

    Ok(days
        .iter()
        .flat_map(|(day, meetings)| {
            meetings.iter().map(move |meeting| ScheduleRow {
                course_code: or_missing(&meeting.course_code),
                crn: or_missing(&meeting.crn),
                room: or_missing(&meeting.room),
                meeting_type: or_missing(&meeting.meeting_type),
                day: day.clone(),
                time: format!(
                    "{} - {}",
                    or_missing(&meeting.start_time),
                    or_missing(&meeting.end_time)
                ),
                campus: or_missing(&meeting.campus),
            })
        })
        .collect())
}

pub fn professor_rows(
    professors: Option<&ProfessorSummaries>,
) -> Result<Vec<ProfessorRow>, RenderError> {
    let professors = professors.ok_or(RenderError::ProfessorsNotLoaded)?;

    Ok(professors
        .0
        .iter()
        .map(|(key, professor)| ProfessorRow {
            courses: professor
                .courses
                .as_ref()
                .map(|courses| courses.join(", "))
                .unwrap_or_else(|| MISSING.to_string()),
            name: professor
                .matched_name
                .clone()
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| key.clone()),
            url: professor
                .url
                .as_ref()
                .map(|url| url.trim())
                .filter(|url| !url.is_empty())
                .map(str::to_string),
            summary: professor
                .summary
                .clone()
                .filter(|summary| !summary.is_empty())
                .unwrap_or_else(|| "No summary available".to_string()),
        })
        .collect())
}

const CSS: &str = r#"
body { font-family: system-ui, sans-serif; margin: 0 auto; max-width: 960px; padding: 1rem; }
table { border-collapse: collapse; width: 100%; margin: 1rem 0; }
th, td { border: 1px solid #d1d5db; padding: 0.4rem 0.6rem; text-align: left; }
.course-item { margin-bottom: 0.5rem; }
.delete-course-button { margin-left: 10px; }
.error-message { color: #dc2626; background-color: #fee2e2; border: 1px solid #dc2626;
  padding: 1rem; margin: 1rem 0; border-radius: 0.375rem; }
#schedule-error { text-align: center; }
.alert { background-color: #fef3c7; border: 1px solid #d97706; padding: 0.75rem; }
.time-grid { display: grid; grid-template-columns: 8rem 6rem 6rem; gap: 0.4rem; }
"#;

fn course_form(snapshot: &PageSnapshot) -> Markup {
    let rows = snapshot.form.courses.rows();
    let full = snapshot.form.courses.is_full();
    html! {
        form # "schedule-form" method="post" action="/submit" {
            div # "course-container" {
                @for row in rows {
                    div.course-item {
                        input.course-input type="text" name={"course-" (row.id)}
                            value=(row.value) placeholder="Enter course (e.g., CSCI4040)";
                        button.delete-course-button type="submit"
                            formaction={"/courses/" (row.id) "/delete"} { "X" }
                    }
                }
            }
            button # "add-course" type="submit" formaction="/courses/add"
                title=[full.then_some("Course limit reached")] {
                "Add Course"
            }
            fieldset # "time-restrictions" {
                legend { "Available times (24h, e.g. 0930)" }
                div.time-grid {
                    @for day in Weekday::ALL {
                        @let window = snapshot.form.times.get(day);
                        label for=(day.start_field()) { (day.label()) }
                        input type="text" id=(day.start_field()) name=(day.start_field())
                            value=(window.start) placeholder="0000";
                        input type="text" id=(day.end_field()) name=(day.end_field())
                            value=(window.end) placeholder="0000";
                    }
                }
            }
            button #submit type="submit" disabled[snapshot.submitting] {
                @if snapshot.submitting { "Generating..." } @else { "Generate Schedule" }
            }
        }
    }
}

fn validation_panel(report: &ValidationReport) -> Markup {
    html! {
        div # "validation-errors" {
            @for error in &report.validation_errors {
                div.error-message {
                    strong { (error.course) } ": " (error.message)
                }
            }
        }
    }
}

fn schedule_section(snapshot: &PageSnapshot, calendar_path: &str) -> Markup {
    let schedule = snapshot.view.schedule.as_ref().map(|doc| &doc.parsed);
    let rows = schedule
        .map(schedule_rows)
        .transpose()
        .ok()
        .flatten()
        .unwrap_or_default();
    let info = schedule.and_then(|s| s.schedule_info.as_ref());
    // A submit failure outranks the load failure from the page load after it
    let error = snapshot
        .view
        .submit_error
        .as_ref()
        .or(snapshot.view.load_error.as_ref());
    html! {
        @if let Some(message) = error {
            div.error-message # "schedule-error" role="alert" { (message) }
        }
        section # "course-schedule" {
            h2 { "Your Schedule" }
            @if let Some(info) = info {
                p.schedule-info {
                    @if let Some(date) = &info.generated_date { "Generated " (date) }
                    @if let Some(total) = info.total_courses { " · " (total) " courses" }
                }
            }
            @if let Some(at) = snapshot.view.last_generated {
                p.schedule-updated { "Last generated " (at.format("%Y-%m-%d %H:%M:%S UTC")) }
            }
            table {
                thead {
                    tr {
                        th { "Course" } th { "CRN" } th { "Room" } th { "Type" }
                        th { "Day" } th { "Time" } th { "Campus" }
                    }
                }
                tbody {
                    @for row in &rows {
                        tr { @for cell in row.cells() { td { (cell) } } }
                    }
                }
            }
            form method="get" action=(calendar_path) {
                button.download-calendar-button # "download-calendar" type="submit" {
                    "Download Calendar"
                }
            }
        }
    }
}

fn summary_section(snapshot: &PageSnapshot) -> Markup {
    let rows = professor_rows(snapshot.view.professors.as_ref()).unwrap_or_default();
    html! {
        section #summary {
            h2 { "Professor Summaries" }
            table {
                thead { tr { th { "Courses" } th { "Professor" } th { "Summary" } } }
                tbody {
                    @for row in &rows {
                        tr {
                            td { (row.courses) }
                            td {
                                @if let Some(url) = &row.url {
                                    a href=(url) target="_blank" { (row.name) }
                                } @else {
                                    (row.name)
                                }
                            }
                            td { (row.summary) }
                        }
                    }
                }
            }
        }
    }
}

pub fn render_page(snapshot: &PageSnapshot, calendar_path: &str) -> String {
    let markup = html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { "Course Scheduler" }
                style { (PreEscaped(CSS)) }
            }
            body {
                header {
                    h1 { "Course Scheduler" }
                    a # "get-started" href="#about" { "Get Started" }
                }
                @if let Some(alert) = &snapshot.view.alert {
                    div.alert #alert role="alert" { (alert) }
                }
                section #about {
                    h2 { "Build your week" }
                    p { "Enter up to five courses and the times you are available." }
                    (course_form(snapshot))
                }
                (validation_panel(&snapshot.view.validation))
                (schedule_section(snapshot, calendar_path))
                (summary_section(snapshot))
                form method="post" action="/session/end" {
                    button # "end-session" type="submit" { "Start Over" }
                }
            }
        }
    };
    markup.into_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CourseMeeting, ProfessorSummary};

    fn text(value: &str) -> Option<Text> {
        Some(Text(value.to_string()))
    }

    #[test]
    fn test_schedule_rows_single_meeting() {
        let schedule = WeeklySchedule {
            schedule_info: None,
            weekly_schedule: Some(vec![(
                "Monday".to_string(),
                vec![CourseMeeting {
                    course_code: text("CSCI4040"),
                    crn: text("12345"),
                    room: text("101"),
                    meeting_type: text("LEC"),
                    start_time: text("0900"),
                    end_time: text("1000"),
                    campus: text("Main"),
                    ..Default::default()
                }],
            )]),
        };
        let rows = schedule_rows(&schedule).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0].cells(),
            ["CSCI4040", "12345", "101", "LEC", "Monday", "0900 - 1000", "Main"]
        );
    }

    #[test]
    fn test_schedule_rows_fill_missing_fields() {
        let schedule = WeeklySchedule {
            schedule_info: None,
            weekly_schedule: Some(vec![(
                "Friday".to_string(),
                vec![CourseMeeting {
                    course_code: text("MATH1010"),
                    start_time: text("1300"),
                    ..Default::default()
                }],
            )]),
        };
        let rows = schedule_rows(&schedule).unwrap();
        assert_eq!(
            rows[0].cells(),
            ["MATH1010", "N/A", "N/A", "N/A", "Friday", "1300 - N/A", "N/A"]
        );
    }

    #[test]
    fn test_schedule_rows_missing_weekly_schedule() {
        let err = schedule_rows(&WeeklySchedule::default()).unwrap_err();
        assert_eq!(err, RenderError::MissingWeeklySchedule);
    }

    #[test]
    fn test_professor_rows_blank_url_is_plain_text() {
        let professors = ProfessorSummaries(vec![(
            "Smith, J.".to_string(),
            ProfessorSummary {
                courses: Some(vec!["CSCI4040".to_string()]),
                matched_name: Some("Jane Smith".to_string()),
                url: Some(String::new()),
                summary: Some("...".to_string()),
                review_count: None,
            },
        )]);
        let rows = professor_rows(Some(&professors)).unwrap();
        assert_eq!(rows[0].name, "Jane Smith");
        assert_eq!(rows[0].url, None);
        assert_eq!(rows[0].courses, "CSCI4040");
    }

    #[test]
    fn test_professor_rows_fallbacks() {
        let professors = ProfessorSummaries(vec![(
            "Doe, R.".to_string(),
            ProfessorSummary {
                url: Some("https://example.com/prof/1".to_string()),
                ..Default::default()
            },
        )]);
        let rows = professor_rows(Some(&professors)).unwrap();
        assert_eq!(rows[0].name, "Doe, R.");
        assert_eq!(rows[0].courses, "N/A");
        assert_eq!(rows[0].summary, "No summary available");
        assert_eq!(rows[0].url.as_deref(), Some("https://example.com/prof/1"));
    }

    #[test]
    fn test_professor_rows_not_loaded() {
        assert_eq!(
            professor_rows(None).unwrap_err(),
            RenderError::ProfessorsNotLoaded
        );
    }
}
