//! Fuzzy date search over free text.
//!
//! Recognizes month-name dates ("March 2024", "5 Mar 2024", "March 5th, 2024"),
//! ISO-style dates ("2024-03-15", "2024/03") and numeric dates ("03/15/2024",
//! month first unless that is impossible) and CJK dates ("2024年3月5日").
//! A month without a year is not a date. A missing day-of-month resolves to
//! the first, and so does an impossible one next to a month name ("Top 40
//! March 2024").

use std::cmp::Reverse;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::{Captures, Regex};

const MIN_YEAR: i32 = 1900;
const MAX_YEAR: i32 = 2100;

static MONTH_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:(?P<lead>\d{1,2})(?:st|nd|rd|th)?(?:\s+of)?\s+)?(?P<month>january|february|march|april|may|june|july|august|september|october|november|december|jan|feb|mar|apr|jun|jul|aug|sept|sep|oct|nov|dec)\b\.?(?:\s+(?P<trail>\d{1,2})(?:st|nd|rd|th)?)?,?\s+(?P<year>\d{4})\b",
    )
    .expect("valid regex")
});

static ISO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?P<year>\d{4})[-/.](?P<month>\d{1,2})(?:[-/.](?P<day>\d{1,2}))?\b")
        .expect("valid regex")
});

static NUMERIC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?P<a>\d{1,2})[-/.](?P<b>\d{1,2})[-/.](?P<year>\d{4})\b").expect("valid regex")
});

static CJK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?P<year>\d{4})\s*年\s*(?P<month>\d{1,2})\s*月(?:\s*(?P<day>\d{1,2})\s*[日号])?",
    )
    .expect("valid regex")
});

static MONTH_YEAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?P<month>\d{1,2})/(?P<year>\d{4})\b").expect("valid regex")
});

/// One recognized date and the byte range it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateMatch {
    pub start: usize,
    pub end: usize,
    pub date: NaiveDate,
}

/// Every date found in `text`, ordered by where it ends.
///
/// When two candidates end at the same byte the longer one sorts later, so
/// "01/02/2024" is read as a whole and not as "02/2024".
pub fn search_dates(text: &str) -> Vec<DateMatch> {
    let mut found = Vec::new();

    for caps in MONTH_NAME_RE.captures_iter(text) {
        let month = caps.name("month").and_then(|m| month_from_name(m.as_str()));
        let day = caps
            .name("lead")
            .or_else(|| caps.name("trail"))
            .map(|m| m.as_str());
        push_match(&mut found, &caps, year_of(&caps), month, day, DayRule::FallBack);
    }

    for caps in ISO_RE.captures_iter(text) {
        let month = caps.name("month").and_then(|m| m.as_str().parse().ok());
        let day = caps.name("day").map(|m| m.as_str());
        push_match(&mut found, &caps, year_of(&caps), month, day, DayRule::Strict);
    }

    for caps in CJK_RE.captures_iter(text) {
        let month = caps.name("month").and_then(|m| m.as_str().parse().ok());
        let day = caps.name("day").map(|m| m.as_str());
        push_match(&mut found, &caps, year_of(&caps), month, day, DayRule::Strict);
    }

    for caps in NUMERIC_RE.captures_iter(text) {
        let a: Option<u32> = caps.name("a").and_then(|m| m.as_str().parse().ok());
        let b: Option<u32> = caps.name("b").and_then(|m| m.as_str().parse().ok());
        let (month, day) = match (a, b) {
            (Some(a), Some(b)) if a > 12 => (Some(b), Some(a)),
            (a, b) => (a, b),
        };
        let day = day.map(|d| d.to_string());
        push_match(
            &mut found,
            &caps,
            year_of(&caps),
            month,
            day.as_deref(),
            DayRule::Strict,
        );
    }

    for caps in MONTH_YEAR_RE.captures_iter(text) {
        let month = caps.name("month").and_then(|m| m.as_str().parse().ok());
        push_match(&mut found, &caps, year_of(&caps), month, None, DayRule::Strict);
    }

    found.sort_by_key(|m| (m.end, Reverse(m.start)));
    found
}

/// The last date mentioned in `text`, if any.
pub fn last_date(text: &str) -> Option<NaiveDate> {
    search_dates(text).last().map(|m| m.date)
}

/// Normalize a date to its "Month Year" period, e.g. "March 2024".
pub fn format_period(date: NaiveDate) -> String {
    date.format("%B %Y").to_string()
}

/// Pick the period for an Object.
///
/// The last date in `content` wins; otherwise the last date in the file stem
/// (underscores read as spaces).
pub fn resolve_period(file_stem: &str, content: &str) -> Option<String> {
    last_date(content)
        .or_else(|| last_date(&file_stem.replace('_', " ")))
        .map(format_period)
}

fn year_of(caps: &Captures<'_>) -> Option<i32> {
    caps.name("year").and_then(|m| m.as_str().parse().ok())
}

/// What to do with a day that does not exist in its month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DayRule {
    /// Drop the match.
    Strict,
    /// Keep the month and use the first.
    FallBack,
}

fn push_match(
    found: &mut Vec<DateMatch>,
    caps: &Captures<'_>,
    year: Option<i32>,
    month: Option<u32>,
    day: Option<&str>,
    rule: DayRule,
) {
    let Some(whole) = caps.get(0) else { return };
    let (Some(year), Some(month)) = (year, month) else {
        return;
    };
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return;
    }
    let day = match day {
        Some(raw) => match raw.parse::<u32>() {
            Ok(day) => day,
            Err(_) => return,
        },
        None => 1,
    };
    let date = NaiveDate::from_ymd_opt(year, month, day).or_else(|| match rule {
        DayRule::FallBack => NaiveDate::from_ymd_opt(year, month, 1),
        DayRule::Strict => None,
    });
    if let Some(date) = date {
        found.push(DateMatch {
            start: whole.start(),
            end: whole.end(),
            date,
        });
    }
}

fn month_from_name(name: &str) -> Option<u32> {
    let prefix: String = name.chars().take(3).collect::<String>().to_ascii_lowercase();
    let month = match prefix.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}
