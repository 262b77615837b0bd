//! Date and time extraction from recognized calendar text.
//!
//! Each line is scanned for time tokens and for dates in four grammars:
//! - `15 Jan 2024` (day, month name, year)
//! - `Jan 15, 2024` (month name, day, year)
//! - `15/01/2024` or `15-01-2024` (numeric day first)
//! - `2024-01-15` or `2024/01/15` (numeric year first)
//!
//! Every date on a line is paired with every time on the same line. Dates
//! that do not resolve to a real calendar day are dropped without error.

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveTime};
use regex::{Captures, Regex};

/// `H:MM` or `H.MM`, optionally followed by AM/PM.
static TIME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d{1,2})[:.](\d{2})(?:\s*([ap]m))?\b").unwrap());

static DAY_MONTH_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})\s+([A-Za-z]{3,9})\.?,?\s+(\d{4})\b").unwrap()
});

static MONTH_NAME_DAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Za-z]{3,9})\.?\s+(\d{1,2}),?\s+(\d{4})\b").unwrap()
});

static DAY_MONTH_NUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})[/-](\d{1,2})[/-](\d{4})\b").unwrap());

static YEAR_MONTH_DAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})[-/](\d{1,2})[-/](\d{1,2})\b").unwrap());

/// The textual date format a candidate was read with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateGrammar {
    /// `DD MonthName YYYY`
    DayMonthName,
    /// `MonthName DD, YYYY`
    MonthNameDay,
    /// `DD/MM/YYYY` or `DD-MM-YYYY`
    DayMonthNumeric,
    /// `YYYY-MM-DD` or `YYYY/MM/DD`
    YearMonthDay,
}

impl DateGrammar {
    /// All grammars, in scan priority order.
    pub const ALL: [DateGrammar; 4] = [
        DateGrammar::DayMonthName,
        DateGrammar::MonthNameDay,
        DateGrammar::DayMonthNumeric,
        DateGrammar::YearMonthDay,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DateGrammar::DayMonthName => "dmy_name",
            DateGrammar::MonthNameDay => "mdy_name",
            DateGrammar::DayMonthNumeric => "dmy_numeric",
            DateGrammar::YearMonthDay => "ymd_numeric",
        }
    }

    fn pattern(&self) -> &'static Regex {
        match self {
            DateGrammar::DayMonthName => &DAY_MONTH_NAME,
            DateGrammar::MonthNameDay => &MONTH_NAME_DAY,
            DateGrammar::DayMonthNumeric => &DAY_MONTH_NUMERIC,
            DateGrammar::YearMonthDay => &YEAR_MONTH_DAY,
        }
    }
}

/// A date as read by one grammar, before calendar validation.
///
/// Each variant names its fields so day and month are never swapped by
/// capture position. A `None` month is a name missing from the month table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateMatch {
    DayMonthName { day: u32, month: Option<u32>, year: i32 },
    MonthNameDay { month: Option<u32>, day: u32, year: i32 },
    DayMonthNumeric { day: u32, month: u32, year: i32 },
    YearMonthDay { year: i32, month: u32, day: u32 },
}

impl DateMatch {
    fn from_captures(grammar: DateGrammar, caps: &Captures<'_>) -> Option<Self> {
        let num = |i: usize| caps.get(i)?.as_str().parse::<u32>().ok();
        let year = |i: usize| caps.get(i)?.as_str().parse::<i32>().ok();
        let name = |i: usize| caps.get(i).map(|m| month_from_name(m.as_str()));

        let matched = match grammar {
            DateGrammar::DayMonthName => DateMatch::DayMonthName {
                day: num(1)?,
                month: name(2)?,
                year: year(3)?,
            },
            DateGrammar::MonthNameDay => DateMatch::MonthNameDay {
                month: name(1)?,
                day: num(2)?,
                year: year(3)?,
            },
            DateGrammar::DayMonthNumeric => DateMatch::DayMonthNumeric {
                day: num(1)?,
                month: num(2)?,
                year: year(3)?,
            },
            DateGrammar::YearMonthDay => DateMatch::YearMonthDay {
                year: year(1)?,
                month: num(2)?,
                day: num(3)?,
            },
        };
        Some(matched)
    }

    /// Resolve to a calendar date, or `None` for unknown months and impossible days.
    fn to_date(self) -> Option<NaiveDate> {
        let (year, month, day) = match self {
            DateMatch::DayMonthName { day, month, year }
            | DateMatch::MonthNameDay { month, day, year } => (year, month?, day),
            DateMatch::DayMonthNumeric { day, month, year }
            | DateMatch::YearMonthDay { year, month, day } => (year, month, day),
        };
        if year == 0 || month == 0 || day == 0 {
            return None;
        }
        NaiveDate::from_ymd_opt(year, month, day)
    }
}

/// Look up an English month name or abbreviation, ignoring case and a trailing period.
pub fn month_from_name(name: &str) -> Option<u32> {
    let key = name.trim_end_matches(['.', ',']).to_ascii_lowercase();
    let month = match key.as_str() {
        "jan" | "january" => 1,
        "feb" | "february" => 2,
        "mar" | "march" => 3,
        "apr" | "april" => 4,
        "may" => 5,
        "jun" | "june" => 6,
        "jul" | "july" => 7,
        "aug" | "august" => 8,
        "sep" | "sept" | "september" => 9,
        "oct" | "october" => 10,
        "nov" | "november" => 11,
        "dec" | "december" => 12,
        _ => return None,
    };
    Some(month)
}

/// A date read from one line, with every time token found on that line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateTimeCandidate {
    pub date: NaiveDate,
    pub times: Vec<NaiveTime>,
    pub grammar: DateGrammar,
    /// The trimmed line the date was read from.
    pub line: String,
}

impl DateTimeCandidate {
    pub fn date_iso(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    /// The first time token on the line, if any.
    pub fn time(&self) -> Option<NaiveTime> {
        self.times.first().copied()
    }

    /// The first time token formatted as `HH:MM`.
    pub fn time24(&self) -> Option<String> {
        self.time().map(|t| t.format("%H:%M").to_string())
    }
}

/// Extract every valid time token from a line, converted to 24-hour form.
///
/// Tokens that do not form a real clock time (e.g. `25:99`) are dropped.
pub fn parse_times(line: &str) -> Vec<NaiveTime> {
    TIME_PATTERN
        .captures_iter(line)
        .filter_map(|caps| {
            let mut hour: u32 = caps.get(1)?.as_str().parse().ok()?;
            let minute: u32 = caps.get(2)?.as_str().parse().ok()?;

            match caps.get(3).map(|m| m.as_str().to_ascii_lowercase()).as_deref() {
                Some("pm") if hour < 12 => hour += 12,
                Some("am") if hour == 12 => hour = 0,
                _ => {}
            }

            let time = NaiveTime::from_hms_opt(hour, minute, 0);
            if time.is_none() {
                tracing::debug!("Dropping out-of-range time {:?}", &caps[0]);
            }
            time
        })
        .collect()
}

/// Extract candidates from a single line.
pub fn parse_line(line: &str) -> Vec<DateTimeCandidate> {
    let times = parse_times(line);
    let mut candidates = Vec::new();

    for grammar in DateGrammar::ALL {
        for caps in grammar.pattern().captures_iter(line) {
            let Some(date) = DateMatch::from_captures(grammar, &caps).and_then(DateMatch::to_date)
            else {
                tracing::debug!("Unresolvable {} date {:?}", grammar.as_str(), &caps[0]);
                continue;
            };

            candidates.push(DateTimeCandidate {
                date,
                times: times.clone(),
                grammar,
                line: line.to_string(),
            });
        }
    }

    candidates
}

/// Extract date/time candidates from recognized text, line by line.
pub fn parse_events(text: &str) -> Vec<DateTimeCandidate> {
    parse_lines(text.lines().map(str::trim).filter(|line| !line.is_empty()))
}

/// Extract candidates from lines that are already trimmed.
pub fn parse_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> Vec<DateTimeCandidate> {
    lines.into_iter().flat_map(parse_line).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dates(text: &str) -> Vec<String> {
        parse_events(text).iter().map(|c| c.date_iso()).collect()
    }

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_all_grammars_agree_on_same_day() {
        for text in ["15 Jan 2024", "Jan 15, 2024", "15/01/2024", "15-01-2024", "2024-01-15", "2024/01/15"] {
            assert_eq!(dates(text), vec!["2024-01-15"], "input {:?}", text);
        }
    }

    #[test]
    fn test_grammar_is_tagged() {
        let grammars: Vec<_> = ["15 Jan 2024", "Jan 15, 2024", "15/01/2024", "2024-01-15"]
            .iter()
            .map(|t| parse_events(t)[0].grammar)
            .collect();
        assert_eq!(grammars, DateGrammar::ALL.to_vec());
    }

    #[test]
    fn test_month_name_day_does_not_swap_fields() {
        let c = &parse_events("Results due March 4, 2025")[0];
        assert_eq!(c.grammar, DateGrammar::MonthNameDay);
        assert_eq!(c.date_iso(), "2025-03-04");
    }

    #[test]
    fn test_month_names_and_abbreviations() {
        assert_eq!(month_from_name("Sept."), Some(9));
        assert_eq!(month_from_name("SEPTEMBER"), Some(9));
        assert_eq!(month_from_name("may"), Some(5));
        assert_eq!(month_from_name("Dec"), Some(12));
        assert_eq!(month_from_name("Meeting"), None);
        assert_eq!(dates("12 Sept 2025"), vec!["2025-09-12"]);
        assert_eq!(dates("12 Aug. 2025"), vec!["2025-08-12"]);
    }

    #[test]
    fn test_unknown_month_is_dropped() {
        assert!(parse_events("Quarter 12 Results 2025").is_empty());
        assert!(parse_events("Date 15, 2024").is_empty());
    }

    #[test]
    fn test_impossible_dates_are_dropped() {
        assert!(parse_events("30 Feb 2024").is_empty());
        assert!(parse_events("15/13/2024").is_empty());
        assert!(parse_events("00/01/2024").is_empty());
        assert_eq!(dates("29 Feb 2024"), vec!["2024-02-29"]);
    }

    #[test]
    fn test_every_date_on_a_line_is_emitted() {
        let found = dates("Q1 15 Jan 2024 | Q2 2024-04-18");
        assert_eq!(found, vec!["2024-01-15", "2024-04-18"]);
    }

    #[test]
    fn test_times_pair_with_dates_on_same_line() {
        let c = &parse_events("18 Jul 2025 19:33")[0];
        assert_eq!(c.date_iso(), "2025-07-18");
        assert_eq!(c.time24().as_deref(), Some("19:33"));
    }

    #[test]
    fn test_all_times_are_kept() {
        let c = &parse_events("Board meeting 12 Aug 2025 from 10:00 to 15:30")[0];
        assert_eq!(c.times, vec![hm(10, 0), hm(15, 30)]);
        assert_eq!(c.time(), Some(hm(10, 0)));
    }

    #[test]
    fn test_time_on_other_line_is_not_paired() {
        let candidates = parse_events("Board Meeting 12 Aug 2025\nResult Time: 15:30");
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].date_iso(), "2025-08-12");
        assert!(candidates[0].times.is_empty());
    }

    #[test]
    fn test_meridiem_conversion() {
        assert_eq!(parse_times("3:45 PM"), vec![hm(15, 45)]);
        assert_eq!(parse_times("3:45pm"), vec![hm(15, 45)]);
        assert_eq!(parse_times("12:10 am"), vec![hm(0, 10)]);
        assert_eq!(parse_times("12:10 PM"), vec![hm(12, 10)]);
        assert_eq!(parse_times("09.30 AM"), vec![hm(9, 30)]);
        assert_eq!(parse_times("17:05"), vec![hm(17, 5)]);
    }

    #[test]
    fn test_out_of_range_time_is_dropped_but_date_kept() {
        assert!(parse_times("25:99").is_empty());
        let c = &parse_events("12 Aug 2025 25:99")[0];
        assert_eq!(c.date_iso(), "2025-08-12");
        assert!(c.times.is_empty());
    }

    #[test]
    fn test_parse_lines_keeps_line_boundaries() {
        let candidates = parse_lines(["Board Meeting 12 Aug 2025", "Result Time: 15:30"]);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].line, "Board Meeting 12 Aug 2025");
        assert!(candidates[0].times.is_empty());

        let joined = parse_lines(["Results 2024-01-15 14:00"]);
        assert_eq!(joined[0].times, vec![hm(14, 0)]);
    }

    #[test]
    fn test_blank_lines_and_whitespace() {
        let candidates = parse_events("\n\n   15 Jan 2024   \r\n\t\n");
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].line, "15 Jan 2024");
    }
}
