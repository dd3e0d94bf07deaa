use std::collections::HashSet;

use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::models::{CalendarEvent, SummaryEvent, WeeklySummary};

/// Placeholder time-of-day meaning "no specific time given" (00:01).
pub fn sentinel_time() -> NaiveTime {
    NaiveTime::from_hms_opt(0, 1, 0).unwrap_or_default()
}

/// How day-of-month ordinals are suffixed in date labels.
///
/// `Legacy` reproduces the historical output where only the 1st, 2nd and 3rd get
/// "st"/"nd"/"rd" and every other day (21, 22, 23 and 31 included) gets "th".
/// `English` uses the usual English rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrdinalStyle {
    #[default]
    Legacy,
    English,
}

pub fn ordinal_suffix(day: u32, style: OrdinalStyle) -> &'static str {
    match style {
        OrdinalStyle::Legacy => match day {
            1 => "st",
            2 => "nd",
            3 => "rd",
            _ => "th",
        },
        OrdinalStyle::English => match (day % 10, day % 100) {
            (_, 11..=13) => "th",
            (1, _) => "st",
            (2, _) => "nd",
            (3, _) => "rd",
            _ => "th",
        },
    }
}

/// `"Monday, January 20th"`
pub fn format_date(date: NaiveDate, style: OrdinalStyle) -> String {
    format!(
        "{}{}{}",
        date.format("%A, %B "),
        date.day(),
        ordinal_suffix(date.day(), style)
    )
}

/// `"Week of January 20, 2025"`
pub fn format_week_label(week: NaiveDate) -> String {
    format!("Week of {}", week.format("%B %-d, %Y"))
}

/// Parse a stored time-of-day. Missing or malformed values become the sentinel.
pub fn parse_time(raw: Option<&str>) -> NaiveTime {
    raw.map(str::trim)
        .and_then(|s| {
            NaiveTime::parse_from_str(s, "%H:%M:%S")
                .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S%.f"))
                .ok()
        })
        .unwrap_or_else(sentinel_time)
}

/// 12-hour clock text, or empty for the sentinel.
pub fn format_time(time: NaiveTime) -> String {
    if time == sentinel_time() {
        String::new()
    } else {
        time.format("%I:%M %p").to_string()
    }
}

/// Title-case word by word: a cased letter that follows another cased letter is
/// lower-cased, any other is upper-cased. Uncased letters (CJK, digits) start a new word.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_cased = false;
    for c in text.chars() {
        if c.is_uppercase() || c.is_lowercase() {
            if prev_cased {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_cased = true;
        } else {
            out.push(c);
            prev_cased = false;
        }
    }
    out
}

/// Display title: the segment before the first `" - "`, title-cased.
pub fn display_title(raw: &str) -> String {
    let head = raw.split(" - ").next().unwrap_or(raw);
    title_case(head)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bullet {
    pub topic: Option<String>,
    pub text: String,
}

/// Split a summary on `"- "` markers; each fragment may carry a `"topic: description"` pair.
pub fn parse_bullets(summary: &str) -> Vec<Bullet> {
    summary
        .split("- ")
        .filter(|fragment| !fragment.trim().is_empty())
        .map(|fragment| match fragment.split_once(": ") {
            Some((topic, description)) => Bullet {
                topic: Some(topic.trim().to_string()),
                text: description.trim().to_string(),
            },
            None => Bullet {
                topic: None,
                text: fragment.trim().to_string(),
            },
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarItem {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub time_formatted: String,
    pub details: String,
    pub transcript_url: Option<String>,
    pub video_url: Option<String>,
}

impl CalendarItem {
    /// `"<time>: <details>"`, or just the details when no time was given.
    pub fn line(&self) -> String {
        if self.time_formatted.is_empty() {
            self.details.clone()
        } else {
            format!("{}: {}", self.time_formatted, self.details)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayGroup {
    pub label: String,
    pub expanded: bool,
    pub events: Vec<CalendarItem>,
}

pub fn normalize_calendar_event(event: &CalendarEvent) -> CalendarItem {
    let time = parse_time(event.time.as_deref());
    CalendarItem {
        date: event.date,
        time,
        time_formatted: format_time(time),
        details: event.details.clone(),
        transcript_url: event.url.clone(),
        video_url: event.video_url.clone(),
    }
}

/// Most recent `days` distinct dates, newest first, events ascending by time within a day.
pub fn group_calendar(events: &[CalendarEvent], days: usize, style: OrdinalStyle) -> Vec<DayGroup> {
    let mut distinct: Vec<NaiveDate> = events
        .iter()
        .map(|e| e.date)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    distinct.sort_unstable_by(|a, b| b.cmp(a));
    distinct.truncate(days);
    let recent: HashSet<NaiveDate> = distinct.into_iter().collect();

    let mut items: Vec<CalendarItem> = events
        .iter()
        .filter(|e| recent.contains(&e.date))
        .map(normalize_calendar_event)
        .collect();
    items.sort_by(|a, b| b.date.cmp(&a.date).then(a.time.cmp(&b.time)));

    let mut groups: Vec<DayGroup> = Vec::new();
    for item in items {
        let label = format_date(item.date, style);
        match groups.iter().position(|g| g.label == label) {
            Some(idx) => groups[idx].events.push(item),
            None => {
                let expanded = groups.is_empty();
                groups.push(DayGroup {
                    label,
                    expanded,
                    events: vec![item],
                });
            }
        }
    }

    for group in &mut groups {
        group.events.sort_by(|a, b| a.time.cmp(&b.time));
    }

    groups
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekItem {
    pub heading: String,
    pub date: NaiveDate,
    pub date_label: String,
    pub transcript_url: Option<String>,
    pub video_url: Option<String>,
    pub bullets: Vec<Bullet>,
}

impl WeekItem {
    pub fn has_links(&self) -> bool {
        self.transcript_url.is_some() || self.video_url.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekGroup {
    pub week: NaiveDate,
    pub label: String,
    pub expanded: bool,
    pub tldr: String,
    pub events: Vec<WeekItem>,
}

pub fn summarize_event(event: &SummaryEvent, style: OrdinalStyle) -> WeekItem {
    let action = event.is_action();
    let prefix = if action { "Action: " } else { "" };
    WeekItem {
        heading: format!("{}{}", prefix, display_title(&event.title)),
        date: event.date,
        date_label: format_date(event.date, style),
        transcript_url: event.url.clone(),
        video_url: if action { None } else { event.video_url.clone() },
        bullets: parse_bullets(&event.summary),
    }
}

/// Weeks newest first; each week lists the summary events anchored to it in input order.
pub fn group_weeks(
    weekly: &[WeeklySummary],
    events: &[SummaryEvent],
    style: OrdinalStyle,
) -> Vec<WeekGroup> {
    let mut weeks: Vec<&WeeklySummary> = weekly.iter().collect();
    weeks.sort_by(|a, b| b.week.cmp(&a.week));

    weeks
        .into_iter()
        .enumerate()
        .map(|(idx, week)| WeekGroup {
            week: week.week,
            label: format_week_label(week.week),
            expanded: idx == 0,
            tldr: week.summary.clone(),
            events: events
                .iter()
                .filter(|e| e.calendar_week == week.week)
                .map(|e| summarize_event(e, style))
                .collect(),
        })
        .collect()
}
