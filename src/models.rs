use std::fmt;

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A scalar the backend may send as a string or a number (CRNs, rooms).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Text(pub String);

impl<'de> Deserialize<'de> for Text {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(s) => Ok(Text(s)),
            serde_json::Value::Number(n) => Ok(Text(n.to_string())),
            serde_json::Value::Bool(b) => Ok(Text(b.to_string())),
            other => Err(de::Error::custom(format!("expected a scalar, got {other}"))),
        }
    }
}

/// One class meeting on a given weekday.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CourseMeeting {
    #[serde(default)]
    pub course_code: Option<Text>,
    #[serde(default)]
    pub crn: Option<Text>,
    #[serde(default)]
    pub room: Option<Text>,
    #[serde(default, rename = "type")]
    pub meeting_type: Option<Text>,
    #[serde(default)]
    pub start_time: Option<Text>,
    #[serde(default)]
    pub end_time: Option<Text>,
    #[serde(default)]
    pub campus: Option<Text>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleInfo {
    #[serde(default)]
    pub generated_date: Option<String>,
    #[serde(default)]
    pub total_courses: Option<u32>,
}

/// Day name and its meetings, in the order the backend wrote them.
pub type DaySchedule = (String, Vec<CourseMeeting>);

/// Contents of `generated_schedule.json`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WeeklySchedule {
    #[serde(default)]
    pub schedule_info: Option<ScheduleInfo>,
    #[serde(default, deserialize_with = "ordered_map")]
    pub weekly_schedule: Option<Vec<DaySchedule>>,
}

/// Summary entry from `professor_summaries.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfessorSummary {
    #[serde(default)]
    pub courses: Option<Vec<String>>,
    #[serde(default)]
    pub matched_name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub review_count: Option<u32>,
}

/// Professor summaries keyed by the name used in the schedule, in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfessorSummaries(pub Vec<(String, ProfessorSummary)>);

impl<'de> Deserialize<'de> for ProfessorSummaries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer
            .deserialize_map(OrderedMapVisitor::default())
            .map(ProfessorSummaries)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ValidationError {
    pub course: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ValidationReport {
    #[serde(default)]
    pub validation_errors: Vec<ValidationError>,
}

/// Reply of `POST /courses`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CoursesResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl CoursesResponse {
    pub fn succeeded(&self) -> bool {
        self.success.unwrap_or(false) || self.status.as_deref() == Some("success")
    }
}

struct OrderedMapVisitor<V>(std::marker::PhantomData<V>);

impl<V> Default for OrderedMapVisitor<V> {
    fn default() -> Self {
        Self(std::marker::PhantomData)
    }
}

impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<V> {
    type Value = Vec<(String, V)>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, value)) = access.next_entry::<String, V>()? {
            entries.push((key, value));
        }
        Ok(entries)
    }
}

fn ordered_map<'de, D, V>(deserializer: D) -> Result<Option<Vec<(String, V)>>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    Option::<OrderedEntries<V>>::deserialize(deserializer).map(|o| o.map(|e| e.0))
}

struct OrderedEntries<V>(Vec<(String, V)>);

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedEntries<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer
            .deserialize_map(OrderedMapVisitor::default())
            .map(OrderedEntries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weekly_schedule_keeps_day_order() {
        let json = r#"{
            "weekly_schedule": {
                "Wednesday": [],
                "Monday": [{"course_code": "CSCI4040", "crn": 12345}]
            }
        }"#;
        let schedule: WeeklySchedule = serde_json::from_str(json).unwrap();
        let days = schedule.weekly_schedule.unwrap();
        assert_eq!(days[0].0, "Wednesday");
        assert_eq!(days[1].0, "Monday");
        assert_eq!(days[1].1[0].crn, Some(Text("12345".into())));
        assert_eq!(days[1].1[0].room, None);
    }

    #[test]
    fn test_weekly_schedule_missing_key() {
        let schedule: WeeklySchedule =
            serde_json::from_str(r#"{"schedule_info": {"total_courses": 2}}"#).unwrap();
        assert!(schedule.weekly_schedule.is_none());
        assert_eq!(schedule.schedule_info.unwrap().total_courses, Some(2));
    }

    #[test]
    fn test_professor_summaries_order() {
        let json = r#"{
            "Zed, A.": {"courses": ["MATH1010"], "matched_name": "Ann Zed"},
            "Smith, J.": {"courses": ["CSCI4040"], "url": ""}
        }"#;
        let summaries: ProfessorSummaries = serde_json::from_str(json).unwrap();
        assert_eq!(summaries.0[0].0, "Zed, A.");
        assert_eq!(summaries.0[1].0, "Smith, J.");
    }

    #[test]
    fn test_courses_response_success_flags() {
        let ok: CoursesResponse = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert!(ok.succeeded());
        let flask: CoursesResponse = serde_json::from_str(r#"{"status": "success"}"#).unwrap();
        assert!(flask.succeeded());
        let failed: CoursesResponse =
            serde_json::from_str(r#"{"success": false, "error": "bad"}"#).unwrap();
        assert!(!failed.succeeded());
    }
}
