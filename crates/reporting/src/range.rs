//! Report date range and query parameters.

use chrono::{Datelike, NaiveDate};
use common::PageId;
use serde::{Deserialize, Serialize};

use crate::{ReportError, Result};

/// Number of articles in the top-articles report when no limit is given.
pub const DEFAULT_TOP_LIMIT: usize = 10;

/// Inclusive range of order dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
}

impl DateRange {
    /// Fills missing bounds with the first day of the current month and today.
    pub fn resolve(
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<Self> {
        let date_from = date_from.unwrap_or_else(|| today.with_day(1).unwrap_or(today));
        let date_to = date_to.unwrap_or(today);
        if date_from > date_to {
            return Err(ReportError::InvalidRange {
                from: date_from,
                to: date_to,
            });
        }
        Ok(Self { date_from, date_to })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.date_from <= date && date <= self.date_to
    }
}

/// Query parameters shared by every report.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportQuery {
    #[serde(default)]
    pub date_from: Option<NaiveDate>,
    #[serde(default)]
    pub date_to: Option<NaiveDate>,
    /// Sales channel.
    #[serde(default, alias = "channel")]
    pub page: Option<PageId>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl ReportQuery {
    pub fn range(&self, today: NaiveDate) -> Result<DateRange> {
        DateRange::resolve(self.date_from, self.date_to, today)
    }

    pub fn top_limit(&self) -> usize {
        self.limit.filter(|l| *l > 0).unwrap_or(DEFAULT_TOP_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn defaults_to_month_to_date() {
        let range = DateRange::resolve(None, None, day(2025, 5, 20)).unwrap();
        assert_eq!(range.date_from, day(2025, 5, 1));
        assert_eq!(range.date_to, day(2025, 5, 20));
        assert!(range.contains(day(2025, 5, 1)));
        assert!(!range.contains(day(2025, 4, 30)));
    }

    #[test]
    fn reversed_range_is_rejected() {
        let err = DateRange::resolve(Some(day(2025, 6, 1)), Some(day(2025, 5, 1)), day(2025, 6, 2))
            .unwrap_err();
        assert_eq!(err.code(), "validation_error");
    }

    #[test]
    fn top_limit_defaults_to_ten() {
        assert_eq!(ReportQuery::default().top_limit(), 10);
        let query = ReportQuery {
            limit: Some(3),
            ..Default::default()
        };
        assert_eq!(query.top_limit(), 3);
    }
}
