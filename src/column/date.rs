//! Date and time payload codecs.
//!
//! Numeric wire representations:
//!
//! | Type | Storage | Meaning |
//! |------|---------|---------|
//! | `Date` | `u16` | days since the Unix epoch |
//! | `Date32` | `i32` | days since the Unix epoch |
//! | `DateTime` | `u32` | seconds since the Unix epoch |
//! | `DateTime64(p)` | `i64` | count of 10^-p seconds |
//!
//! On read, `DateTime64` is clamped to the server's displayable range
//! (1900-01-01 through 2299-12-31 23:59:59.9) so out-of-range encodings
//! produce the endpoint timestamps instead of nonsense dates.

use crate::column::numeric;
use crate::wire::DecodeResult;
use bytes::BytesMut;
use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};

/// Lower clamp bound in seconds: 1900-01-01 00:00:00.
const MIN_SECONDS: i128 = -2_208_988_800;
/// Upper clamp bound in tenths of a second: 2299-12-31 23:59:59.9.
const MAX_DECISECONDS: i128 = 104_137_919_999;

fn epoch() -> NaiveDate {
    // NaiveDate::default() is the Unix epoch.
    NaiveDate::default()
}

fn date_from_days(days: i64) -> NaiveDate {
    let epoch = epoch();
    if days >= 0 {
        epoch
            .checked_add_days(Days::new(days as u64))
            .unwrap_or(NaiveDate::MAX)
    } else {
        epoch
            .checked_sub_days(Days::new(days.unsigned_abs()))
            .unwrap_or(NaiveDate::MIN)
    }
}

fn days_since_epoch(date: &NaiveDate) -> i64 {
    date.signed_duration_since(epoch()).num_days()
}

fn seconds_to_datetime(seconds: i64, nanos: u32) -> DateTime<Utc> {
    Utc.timestamp_opt(seconds, nanos)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Append `Date` values as u16 day counts.
pub fn save_dates(values: &[NaiveDate], buffer: &mut BytesMut) {
    let days: Vec<u16> = values
        .iter()
        .map(|d| days_since_epoch(d).clamp(0, u16::MAX as i64) as u16)
        .collect();
    numeric::save_slice(&days, buffer);
}

/// Read `rows` `Date` values.
pub fn load_dates(buffer: &mut &[u8], rows: usize) -> DecodeResult<Vec<NaiveDate>> {
    let days = numeric::load_vec::<u16>(buffer, rows)?;
    Ok(days.into_iter().map(|d| date_from_days(d as i64)).collect())
}

/// Append `Date32` values as i32 day counts.
pub fn save_date32s(values: &[NaiveDate], buffer: &mut BytesMut) {
    let days: Vec<i32> = values
        .iter()
        .map(|d| days_since_epoch(d).clamp(i32::MIN as i64, i32::MAX as i64) as i32)
        .collect();
    numeric::save_slice(&days, buffer);
}

/// Read `rows` `Date32` values.
pub fn load_date32s(buffer: &mut &[u8], rows: usize) -> DecodeResult<Vec<NaiveDate>> {
    let days = numeric::load_vec::<i32>(buffer, rows)?;
    Ok(days.into_iter().map(|d| date_from_days(d as i64)).collect())
}

/// Append `DateTime` values as u32 Unix timestamps.
pub fn save_datetimes(values: &[DateTime<Utc>], buffer: &mut BytesMut) {
    let seconds: Vec<u32> = values
        .iter()
        .map(|ts| ts.timestamp().clamp(0, u32::MAX as i64) as u32)
        .collect();
    numeric::save_slice(&seconds, buffer);
}

/// Read `rows` `DateTime` values.
pub fn load_datetimes(buffer: &mut &[u8], rows: usize) -> DecodeResult<Vec<DateTime<Utc>>> {
    let seconds = numeric::load_vec::<u32>(buffer, rows)?;
    Ok(seconds
        .into_iter()
        .map(|s| seconds_to_datetime(s as i64, 0))
        .collect())
}

fn to_ticks(ts: &DateTime<Utc>, precision: u32) -> i64 {
    let scale = 10i128.pow(precision);
    let subsecond_scale = 10i128.pow(9 - precision);
    let ticks = ts.timestamp() as i128 * scale
        + ts.timestamp_subsec_nanos() as i128 / subsecond_scale;
    ticks.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

fn clamp_ticks(ticks: i64, precision: u32) -> i64 {
    let scale = 10i128.pow(precision);
    let min = MIN_SECONDS * scale;
    let max = MAX_DECISECONDS * scale / 10;
    // Both endpoints that can actually be hit fit in i64: the value being
    // clamped is itself an i64.
    (ticks as i128).clamp(min, max) as i64
}

fn from_ticks(ticks: i64, precision: u32) -> DateTime<Utc> {
    let ticks = clamp_ticks(ticks, precision);
    let scale = 10i64.pow(precision);
    let seconds = ticks.div_euclid(scale);
    let fraction = ticks.rem_euclid(scale);
    let nanos = fraction as u32 as u64 * 10u64.pow(9 - precision);
    seconds_to_datetime(seconds, nanos as u32)
}

/// Append `DateTime64(precision)` values as i64 tick counts.
pub fn save_datetime64s(values: &[DateTime<Utc>], precision: u32, buffer: &mut BytesMut) {
    let ticks: Vec<i64> = values.iter().map(|ts| to_ticks(ts, precision)).collect();
    numeric::save_slice(&ticks, buffer);
}

/// Read `rows` `DateTime64(precision)` values, clamping out-of-range ticks
/// to the displayable endpoints.
pub fn load_datetime64s(
    buffer: &mut &[u8],
    precision: u32,
    rows: usize,
) -> DecodeResult<Vec<DateTime<Utc>>> {
    let ticks = numeric::load_vec::<i64>(buffer, rows)?;
    Ok(ticks
        .into_iter()
        .map(|t| from_ticks(t, precision))
        .collect())
}
