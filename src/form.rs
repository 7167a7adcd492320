//! Course list and time restriction state behind the schedule form.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

pub const MAX_COURSES: usize = 5;

static NON_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\D").expect("regex compiles"));

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("You can only add up to {} courses.", MAX_COURSES)]
    CourseLimit,
    #[error("Course row {0} does not exist")]
    UnknownRow(u64),
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CourseRow {
    pub id: u64,
    pub value: String,
}

/// Up to [`MAX_COURSES`] free-text rows, kept in the order they were added.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseList {
    rows: Vec<CourseRow>,
    next_id: u64,
}

impl Default for CourseList {
    /// The page starts with one empty row.
    fn default() -> Self {
        let mut list = Self {
            rows: Vec::new(),
            next_id: 1,
        };
        list.push_row();
        list
    }
}

impl CourseList {
    pub fn empty() -> Self {
        Self {
            rows: Vec::new(),
            next_id: 1,
        }
    }

    pub fn rows(&self) -> &[CourseRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.rows.len() >= MAX_COURSES
    }

    /// Appends an empty row and returns its id.
    pub fn add_course(&mut self) -> Result<u64, FormError> {
        if self.is_full() {
            return Err(FormError::CourseLimit);
        }
        Ok(self.push_row())
    }

    pub fn delete_course(&mut self, id: u64) -> Result<(), FormError> {
        let index = self
            .rows
            .iter()
            .position(|row| row.id == id)
            .ok_or(FormError::UnknownRow(id))?;
        self.rows.remove(index);
        Ok(())
    }

    pub fn set_value(&mut self, id: u64, value: impl Into<String>) -> Result<(), FormError> {
        let row = self
            .rows
            .iter_mut()
            .find(|row| row.id == id)
            .ok_or(FormError::UnknownRow(id))?;
        row.value = value.into();
        Ok(())
    }

    /// Trimmed, non-blank course codes in row order.
    pub fn courses(&self) -> Vec<String> {
        self.rows
            .iter()
            .map(|row| row.value.trim())
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn push_row(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.rows.push(CourseRow {
            id,
            value: String::new(),
        });
        id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

impl Weekday {
    pub const ALL: [Weekday; 5] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
        }
    }

    pub fn start_field(self) -> String {
        format!("{}Start", self.label().to_lowercase())
    }

    pub fn end_field(self) -> String {
        format!("{}End", self.label().to_lowercase())
    }
}

/// Strips everything but digits and left-pads to four characters.
///
/// Longer inputs are kept whole: `"99999"` stays `"99999"`.
pub fn format_time_value(value: &str) -> String {
    let digits = NON_DIGIT.replace_all(value, "");
    format!("{digits:0>4}")
}

/// Raw time inputs as the user typed them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DayWindow {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeInputs {
    days: [DayWindow; 5],
}

impl TimeInputs {
    pub fn get(&self, day: Weekday) -> &DayWindow {
        &self.days[day as usize]
    }

    pub fn set(&mut self, day: Weekday, start: impl Into<String>, end: impl Into<String>) {
        self.days[day as usize] = DayWindow {
            start: start.into(),
            end: end.into(),
        };
    }

    /// Reads `{day}Start` / `{day}End` fields; absent fields count as blank.
    pub fn from_fields(fields: &HashMap<String, String>) -> Self {
        let mut inputs = Self::default();
        for day in Weekday::ALL {
            let start = fields.get(&day.start_field()).cloned().unwrap_or_default();
            let end = fields.get(&day.end_field()).cloned().unwrap_or_default();
            inputs.set(day, start, end);
        }
        inputs
    }

    /// Normalizes every input. A blank end takes `default_end`.
    pub fn collect(&self, default_end: &str) -> TimeRestrictions {
        let windows = Weekday::ALL.map(|day| {
            let raw = self.get(day);
            let end = if raw.end.trim().is_empty() {
                default_end.to_string()
            } else {
                format_time_value(&raw.end)
            };
            (day, format_time_value(&raw.start), end)
        });
        TimeRestrictions { windows }
    }
}

/// Normalized restrictions, serialized as `{"mondayStart": "0900", "mondayEnd": ...}`.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeRestrictions {
    windows: [(Weekday, String, String); 5],
}

impl TimeRestrictions {
    pub fn start(&self, day: Weekday) -> &str {
        &self.windows[day as usize].1
    }

    pub fn end(&self, day: Weekday) -> &str {
        &self.windows[day as usize].2
    }
}

impl Serialize for TimeRestrictions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.windows.len() * 2))?;
        for (day, start, end) in &self.windows {
            map.serialize_entry(&day.start_field(), start)?;
            map.serialize_entry(&day.end_field(), end)?;
        }
        map.end()
    }
}

/// Everything one submit sends to the backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchedulePayload {
    pub courses: Vec<String>,
    pub time_restrictions: TimeRestrictions,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormState {
    pub courses: CourseList,
    pub times: TimeInputs,
}

impl FormState {
    /// Writes back posted values: `course-{id}` fields for rows, `{day}Start`/`{day}End` for times.
    /// Fields for rows that no longer exist are ignored.
    pub fn apply_fields(&mut self, fields: &HashMap<String, String>) {
        for (key, value) in fields {
            let Some(id) = key
                .strip_prefix("course-")
                .and_then(|id| id.parse::<u64>().ok())
            else {
                continue;
            };
            let _ = self.courses.set_value(id, value.clone());
        }
        self.times = TimeInputs::from_fields(fields);
    }

    pub fn payload(&self, default_end: &str) -> SchedulePayload {
        SchedulePayload {
            courses: self.courses.courses(),
            time_restrictions: self.times.collect(default_end),
        }
    }
}
