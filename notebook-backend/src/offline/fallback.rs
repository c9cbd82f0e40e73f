//! Rule-based note parser used when the reasoning service is unreachable.
//!
//! Deterministic and infallible: every input yields a note. Date patterns
//! are tried in order and the first one producing a valid date wins.

use chrono::{Datelike, Duration, NaiveDate};
use regex::{Captures, Regex};
use std::collections::BTreeSet;
use std::sync::LazyLock;

use crate::models::normalize_tag;
use crate::plan::PlanAction;

const MONTHS: &str = "jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec";

static NUMERIC_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})/(\d{1,2})\b").unwrap());
static MONTH_DAY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b({})[a-z]*\.?\s+(\d{{1,2}})(?:st|nd|rd|th)?\b",
        MONTHS
    ))
    .unwrap()
});
static DAY_MONTH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(\d{{1,2}})(?:st|nd|rd|th)?\s+(?:of\s+)?({})[a-z]*\b",
        MONTHS
    ))
    .unwrap()
});
static TOMORROW_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\btomorrow\b").unwrap());
static TODAY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\btoday\b").unwrap());
static HASHTAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)#([a-zA-Z0-9][a-zA-Z0-9_-]*)").unwrap());

/// (pattern, tag) pairs applied to the lower-cased text
static KEYWORD_TAGS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"\b(urgent|asap|important)\b", "urgent"),
        (r"\b(buy|grocery|groceries|shop)\b", "shopping"),
        (r"\b(call|email|meeting|meet)\b", "work"),
        (r"\b(idea|maybe)\b", "ideas"),
    ]
    .into_iter()
    .map(|(pattern, tag)| (Regex::new(pattern).unwrap(), tag))
    .collect()
});

#[derive(Debug, Clone, PartialEq)]
pub struct FallbackParse {
    pub content: String,
    pub date: Option<NaiveDate>,
    pub tags: BTreeSet<String>,
}

impl FallbackParse {
    /// A single `create_note` action targeting the given section
    pub fn into_action(self, page_name: &str, section_name: &str) -> PlanAction {
        PlanAction::CreateNote {
            content: self.content,
            section_id: None,
            section_name: Some(section_name.to_string()),
            page_name: Some(page_name.to_string()),
            tags: self.tags.into_iter().collect(),
            date: self.date,
        }
    }
}

pub fn parse_offline(text: &str, today: NaiveDate) -> FallbackParse {
    let date = extract_date(text, today);

    let mut tags: BTreeSet<String> = HASHTAG_RE
        .captures_iter(text)
        .filter_map(|c| normalize_tag(&c[1]))
        .collect();

    let lower = text.to_lowercase();
    for (pattern, tag) in KEYWORD_TAGS.iter() {
        if pattern.is_match(&lower) {
            tags.insert(tag.to_string());
        }
    }

    let without_tags = HASHTAG_RE.replace_all(text, " ");
    let mut content = without_tags.split_whitespace().collect::<Vec<_>>().join(" ");
    if content.is_empty() {
        content = text.trim().to_string();
    }

    FallbackParse { content, date, tags }
}

fn extract_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let year = today.year();

    first_valid(&NUMERIC_DATE_RE, text, |c| {
        NaiveDate::from_ymd_opt(year, c[1].parse().ok()?, c[2].parse().ok()?)
    })
    .or_else(|| {
        first_valid(&MONTH_DAY_RE, text, |c| {
            NaiveDate::from_ymd_opt(year, month_number(&c[1])?, c[2].parse().ok()?)
        })
    })
    .or_else(|| {
        first_valid(&DAY_MONTH_RE, text, |c| {
            NaiveDate::from_ymd_opt(year, month_number(&c[2])?, c[1].parse().ok()?)
        })
    })
        .or_else(|| TOMORROW_RE.is_match(text).then(|| today + Duration::days(1)))
        .or_else(|| TODAY_RE.is_match(text).then_some(today))
}

fn first_valid<F>(re: &Regex, text: &str, build: F) -> Option<NaiveDate>
where
    F: Fn(&Captures) -> Option<NaiveDate>,
{
    re.captures_iter(text).find_map(|c| build(&c))
}

fn month_number(name: &str) -> Option<u32> {
    let prefix: String = name.to_lowercase().chars().take(3).collect();
    MONTHS
        .split('|')
        .position(|m| m == prefix)
        .map(|i| i as u32 + 1)
}
