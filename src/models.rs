use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Result set of one warehouse query: column names from the schema and raw cell text.
#[derive(Debug, Clone, Default)]
pub struct TableRows {
    pub table: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl TableRows {
    pub fn new(table: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            table: table.into(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = RowRef<'_>> {
        self.rows.iter().map(move |values| RowRef {
            table: &self.table,
            columns: &self.columns,
            values,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Decode every row, failing on the first one that does not fit.
    pub fn decode<T, F>(&self, decode_row: F) -> AppResult<Vec<T>>
    where
        F: Fn(&RowRef<'_>) -> AppResult<T>,
    {
        self.iter().map(|row| decode_row(&row)).collect()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RowRef<'a> {
    table: &'a str,
    columns: &'a [String],
    values: &'a [Option<String>],
}

impl<'a> RowRef<'a> {
    fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(column))
    }

    /// Raw cell text; `None` for SQL NULL or when the column is absent.
    pub fn get(&self, column: &str) -> Option<&'a str> {
        self.position(column)
            .and_then(|idx| self.values.get(idx))
            .and_then(|v| v.as_deref())
    }

    fn require_column(&self, column: &str) -> AppResult<()> {
        match self.position(column) {
            Some(_) => Ok(()),
            None => Err(AppError::invalid_row(
                self.table,
                format!("missing column `{}`", column),
            )),
        }
    }

    /// Text column that must exist; NULL reads as an empty string.
    pub fn text(&self, column: &str) -> AppResult<String> {
        self.require_column(column)?;
        Ok(self.get(column).unwrap_or_default().to_string())
    }

    /// Optional text; NULL and blank both read as `None`.
    pub fn optional_text(&self, column: &str) -> Option<String> {
        self.get(column)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    pub fn date(&self, column: &str) -> AppResult<NaiveDate> {
        self.require_column(column)?;
        let raw = self.get(column).ok_or_else(|| {
            AppError::invalid_row(self.table, format!("`{}` is null", column))
        })?;
        parse_date(raw).ok_or_else(|| {
            AppError::invalid_row(self.table, format!("`{}` is not a date: {}", column, raw))
        })
    }
}

/// Accepts `YYYY-MM-DD` and datetime strings that start with one.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let prefix = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub date: NaiveDate,
    /// Raw time-of-day text as stored; normalized later.
    pub time: Option<String>,
    pub details: String,
    pub url: Option<String>,
    pub video_url: Option<String>,
}

impl CalendarEvent {
    pub fn from_row(row: &RowRef<'_>) -> AppResult<Self> {
        Ok(Self {
            date: row.date("date")?,
            time: row.optional_text("time"),
            details: row.text("details")?,
            url: row.optional_text("url"),
            video_url: row.optional_text("video_url"),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryEvent {
    pub date: NaiveDate,
    pub calendar_week: NaiveDate,
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    pub title: String,
    pub summary: String,
    pub url: Option<String>,
    pub video_url: Option<String>,
}

impl SummaryEvent {
    pub fn from_row(row: &RowRef<'_>) -> AppResult<Self> {
        Ok(Self {
            date: row.date("date")?,
            calendar_week: row.date("calendar_week")?,
            event_type: row.optional_text("type"),
            title: row.text("title")?,
            summary: row.text("summary")?,
            url: row.optional_text("url"),
            video_url: row.optional_text("video_url"),
        })
    }

    pub fn is_action(&self) -> bool {
        self.event_type.as_deref() == Some("Action")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklySummary {
    pub week: NaiveDate,
    pub summary: String,
}

impl WeeklySummary {
    pub fn from_row(row: &RowRef<'_>) -> AppResult<Self> {
        Ok(Self {
            week: row.date("week")?,
            summary: row.text("summary")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(table: &str, columns: &[&str], data: Vec<Vec<Option<&str>>>) -> TableRows {
        let mut t = TableRows::new(table, columns.iter().map(|c| c.to_string()).collect());
        t.rows = data
            .into_iter()
            .map(|r| r.into_iter().map(|v| v.map(str::to_string)).collect())
            .collect();
        t
    }

    #[test]
    fn calendar_row_decodes_nulls_and_blanks() {
        let t = rows(
            "calendar",
            &["date", "time", "details", "url", "video_url"],
            vec![vec![Some("2025-02-03"), None, Some("Signs orders"), Some("  "), Some("https://v")]],
        );
        let events = t.decode(CalendarEvent::from_row).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].date, NaiveDate::from_ymd_opt(2025, 2, 3).unwrap());
        assert_eq!(events[0].time, None);
        assert_eq!(events[0].url, None);
        assert_eq!(events[0].video_url.as_deref(), Some("https://v"));
    }

    #[test]
    fn missing_column_is_an_invalid_row() {
        let t = rows("weekly", &["summary"], vec![vec![Some("tl;dr")]]);
        let err = t.decode(WeeklySummary::from_row).unwrap_err();
        assert!(matches!(err, AppError::InvalidRow { ref table, .. } if table == "weekly"));
    }

    #[test]
    fn dates_accept_datetime_prefix() {
        assert_eq!(
            parse_date("2025-01-20T00:00:00"),
            NaiveDate::from_ymd_opt(2025, 1, 20)
        );
        assert_eq!(parse_date("2025-01-20"), NaiveDate::from_ymd_opt(2025, 1, 20));
        assert_eq!(parse_date("Jan 20"), None);
    }

    #[test]
    fn summary_event_recognizes_action_type() {
        let t = rows(
            "consolidated",
            &["date", "calendar_week", "type", "title", "summary", "url", "video_url"],
            vec![vec![
                Some("2025-02-04"),
                Some("2025-02-03"),
                Some("Action"),
                Some("executive order - details"),
                Some("- Tariffs: raised"),
                None,
                None,
            ]],
        );
        let events = t.decode(SummaryEvent::from_row).unwrap();
        assert!(events[0].is_action());
    }
}
