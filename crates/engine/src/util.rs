//! Internal helpers for date and time normalization.
//!
//! These utilities are **not** part of the public API. Callers hand the
//! engine dates and times in whatever textual shape their UI produced; the
//! engine normalizes them once, here, into canonical storage strings that
//! sort lexically in chronological order.

use chrono::{Local, NaiveDate, NaiveTime};

use crate::{EngineError, ResultEngine};

/// Input formats accepted for dates, tried in order. Month-first wins over
/// day-first for ambiguous values like `3/1/2024`.
const DATE_INPUT_FORMATS: &[&str] = &["%m/%d/%Y", "%d/%m/%Y", "%Y-%m-%d"];

/// Input formats accepted for times, tried in order.
const TIME_INPUT_FORMATS: &[&str] = &["%I:%M:%S %p", "%H:%M:%S"];

/// Canonical on-disk date format.
pub(crate) const DATE_STORAGE_FORMAT: &str = "%Y-%m-%d";

/// Canonical on-disk time format (24-hour).
pub(crate) const TIME_STORAGE_FORMAT: &str = "%H:%M:%S";

/// Lower bound substituted when a report window has no usable start date.
pub(crate) const WINDOW_FLOOR: &str = "2001-01-01";

pub(crate) fn parse_date(value: &str) -> ResultEngine<NaiveDate> {
    let value = value.trim();
    DATE_INPUT_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
        .ok_or_else(|| EngineError::Validation(format!("invalid date: {value}")))
}

pub(crate) fn parse_time(value: &str) -> ResultEngine<NaiveTime> {
    let value = value.trim();
    TIME_INPUT_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(value, format).ok())
        .ok_or_else(|| EngineError::Validation(format!("invalid time: {value}")))
}

/// Parse a date already in canonical storage form.
pub(crate) fn parse_stored_date(value: &str) -> ResultEngine<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_STORAGE_FORMAT)
        .map_err(|_| EngineError::Validation(format!("invalid stored date: {value}")))
}

/// Parse a time already in canonical storage form.
pub(crate) fn parse_stored_time(value: &str) -> ResultEngine<NaiveTime> {
    NaiveTime::parse_from_str(value, TIME_STORAGE_FORMAT)
        .map_err(|_| EngineError::Validation(format!("invalid stored time: {value}")))
}

pub(crate) fn storage_date(date: NaiveDate) -> String {
    date.format(DATE_STORAGE_FORMAT).to_string()
}

pub(crate) fn storage_time(time: NaiveTime) -> String {
    time.format(TIME_STORAGE_FORMAT).to_string()
}

/// Today's calendar date in storage form, used as the default report window
/// upper bound.
pub(crate) fn today() -> String {
    storage_date(Local::now().date_naive())
}
