//! Date-range resolution
//!
//! Turns a free-text date phrase into a concrete inclusive range. Fast
//! deterministic patterns cover the overwhelming majority of financial
//! phrasing (fiscal years, quarters, calendar years); genuinely
//! unstructured phrasing falls back to an optional natural-language
//! collaborator, and failing that to year-to-date. Every returned range
//! satisfies start <= end; parse failures never escape this module.

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use analyst_data::request::DateRange;

/// Fallback collaborator for phrases the cascade cannot handle
/// ("the fortnight before Thanksgiving"). LLM-backed in production.
#[async_trait]
pub trait NaturalDateParser: Send + Sync {
    async fn parse_range(&self, text: &str, today: NaiveDate) -> anyhow::Result<DateRange>;
}

static FISCAL_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"fy'?(\d{2,4})").expect("static regex"));
static QUARTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:q|qtr)\s?([1-4])\s?'?(\d{2,4})").expect("static regex"));
static BARE_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(20\d{2})\s*$").expect("static regex"));
static MONTH_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|jun(?:e)?|jul(?:y)?|aug(?:ust)?|sep(?:tember)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\D*(\d{4})",
    )
    .expect("static regex")
});
static ISO_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4})-(\d{2})-(\d{2})").expect("static regex"));

/// Resolves natural-language date descriptions.
#[derive(Default)]
pub struct DateRangeResolver {
    fallback: Option<std::sync::Arc<dyn NaturalDateParser>>,
}

impl DateRangeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fallback(mut self, fallback: std::sync::Arc<dyn NaturalDateParser>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Resolve against today's date.
    pub async fn resolve(&self, text: &str) -> DateRange {
        self.resolve_on(text, Utc::now().date_naive()).await
    }

    /// Resolve against an explicit "today", for determinism in tests.
    pub async fn resolve_on(&self, text: &str, today: NaiveDate) -> DateRange {
        if let Some(range) = deterministic(text, today) {
            return range;
        }

        if let Some(fallback) = &self.fallback {
            debug!(text = %text, "date cascade exhausted, delegating to fallback parser");
            match fallback.parse_range(text, today).await {
                Ok(range) => return range,
                Err(e) => {
                    warn!(text = %text, error = %e, "fallback date parsing failed, using default");
                }
            }
        } else {
            warn!(text = %text, "could not parse date description, using default");
        }

        default_range(today)
    }
}

/// The deterministic pattern cascade, in precedence order.
fn deterministic(text: &str, today: NaiveDate) -> Option<DateRange> {
    let clean = text.trim().to_lowercase();

    // 1. Fiscal year: FY Y runs Oct 1 (Y-1) through Sep 30 Y.
    if let Some(caps) = FISCAL_YEAR.captures(&clean) {
        let year = expand_year(caps[1].parse().ok()?);
        return range(ymd(year - 1, 10, 1)?, ymd(year, 9, 30)?);
    }

    // 2. Quarter N: months [3N-2, 3N].
    if let Some(caps) = QUARTER.captures(&clean) {
        let quarter: u32 = caps[1].parse().ok()?;
        let year = expand_year(caps[2].parse().ok()?);
        let start_month = (quarter - 1) * 3 + 1;
        let end_month = start_month + 2;
        return range(
            ymd(year, start_month, 1)?,
            last_day_of_month(year, end_month)?,
        );
    }

    // 3. Bare calendar year.
    if let Some(caps) = BARE_YEAR.captures(&clean) {
        let year: i32 = caps[1].parse().ok()?;
        return range(ymd(year, 1, 1)?, ymd(year, 12, 31)?);
    }

    // 4. Relative terms re-enter the cascade with a literal year.
    if clean.contains("last year") {
        return deterministic(&(today.year() - 1).to_string(), today);
    }
    if clean.contains("this year") {
        return deterministic(&today.year().to_string(), today);
    }

    // 5. A single concrete date widens to its whole month.
    if let Some(caps) = MONTH_YEAR.captures(&clean) {
        let month = month_number(&caps[1])?;
        let year: i32 = caps[2].parse().ok()?;
        return range(ymd(year, month, 1)?, last_day_of_month(year, month)?);
    }
    if let Some(caps) = ISO_DATE.captures(&clean) {
        let year: i32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        return range(ymd(year, month, 1)?, last_day_of_month(year, month)?);
    }

    None
}

/// Two-digit years are assumed to be in the 2000s.
fn expand_year(y: i32) -> i32 {
    if y < 100 {
        2000 + y
    } else {
        y
    }
}

fn month_number(name: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ];
    MONTHS
        .iter()
        .position(|m| name.starts_with(m))
        .map(|i| i as u32 + 1)
}

fn ymd(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let next = if month == 12 {
        ymd(year + 1, 1, 1)?
    } else {
        ymd(year, month + 1, 1)?
    };
    next.pred_opt()
}

fn range(start: NaiveDate, end: NaiveDate) -> Option<DateRange> {
    DateRange::new(start, end).ok()
}

/// January 1 of the current year through today.
fn default_range(today: NaiveDate) -> DateRange {
    let start = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today);
    DateRange::new(start, today).unwrap_or_else(|_| {
        // Unreachable: Jan 1 never follows today within the same year.
        DateRange::new(today, today).expect("equal dates are a valid range")
    })
}
