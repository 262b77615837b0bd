//! Announcement events and the per-run extraction result.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// A single earnings announcement recovered from an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementEvent {
    /// Calendar date of the announcement, serialized as `YYYY-MM-DD`.
    #[serde(rename = "dateISO")]
    pub date: NaiveDate,
    /// Announcement time as `HH:MM`, when one was found on the same line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time24: Option<String>,
    /// Whether the announcement landed after the 15:15 market close.
    pub after_close: bool,
    /// The text line the date was read from.
    pub original_text: String,
}

impl AnnouncementEvent {
    /// The date as an ISO `YYYY-MM-DD` string.
    pub fn date_iso(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    /// Trading day whose price move is attributable to this announcement.
    ///
    /// Weekend announcements roll forward to Monday. A weekday announcement
    /// after the close rolls to the next weekday.
    pub fn reaction_date(&self) -> NaiveDate {
        if is_weekend(self.date) {
            next_weekday(self.date)
        } else if self.after_close {
            next_weekday(self.date + Days::new(1))
        } else {
            self.date
        }
    }
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

fn next_weekday(mut date: NaiveDate) -> NaiveDate {
    while is_weekend(date) {
        date = date + Days::new(1);
    }
    date
}

/// An image that was skipped during a best-effort run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageFailure {
    /// Position of the image in the submitted batch.
    pub index: usize,
    pub name: String,
    pub error: String,
}

/// Terminal output of one extraction run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    /// Recognized text of every processed image, newline-joined.
    pub raw_text: String,
    /// Deduplicated events in first-occurrence order.
    pub items: Vec<AnnouncementEvent>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<ImageFailure>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(date: &str, after_close: bool) -> AnnouncementEvent {
        AnnouncementEvent {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            time24: None,
            after_close,
            original_text: String::new(),
        }
    }

    #[test]
    fn test_serializes_with_dashboard_field_names() {
        let mut ev = event("2024-01-15", true);
        ev.time24 = Some("16:05".to_string());
        ev.original_text = "15 Jan 2024 16:05".to_string();

        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["dateISO"], "2024-01-15");
        assert_eq!(json["time24"], "16:05");
        assert_eq!(json["afterClose"], true);
        assert_eq!(json["originalText"], "15 Jan 2024 16:05");
    }

    #[test]
    fn test_missing_time_is_omitted() {
        let json = serde_json::to_value(event("2024-01-15", true)).unwrap();
        assert!(json.get("time24").is_none());
    }

    #[test]
    fn test_result_omits_empty_failures() {
        let result = ExtractionResult {
            raw_text: "text".to_string(),
            items: vec![event("2024-01-15", false)],
            failures: Vec::new(),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["rawText"], "text");
        assert!(json.get("failures").is_none());
    }

    #[test]
    fn test_reaction_date_before_close_is_same_day() {
        // 2024-01-15 is a Monday
        let ev = event("2024-01-15", false);
        assert_eq!(ev.reaction_date().to_string(), "2024-01-15");
    }

    #[test]
    fn test_reaction_date_after_close_is_next_day() {
        let ev = event("2024-01-15", true);
        assert_eq!(ev.reaction_date().to_string(), "2024-01-16");
    }

    #[test]
    fn test_reaction_date_friday_after_close_rolls_to_monday() {
        let ev = event("2024-01-19", true);
        assert_eq!(ev.reaction_date().to_string(), "2024-01-22");
    }

    #[test]
    fn test_reaction_date_weekend_rolls_to_monday() {
        // Saturday, time roll is not applied on top
        assert_eq!(event("2024-01-20", true).reaction_date().to_string(), "2024-01-22");
        // Sunday
        assert_eq!(event("2024-01-21", false).reaction_date().to_string(), "2024-01-22");
    }
}
