//! Date/time calculator the model uses instead of doing calendar math itself

use async_trait::async_trait;
use chrono::{
    DateTime, Datelike, Days, Months, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat,
    TimeDelta, TimeZone, Timelike, Weekday,
};
use chrono_tz::Tz;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt::Write;

use super::{Tool, ToolContext, parameters_schema};

pub const NAME: &str = "datetimeCalculator";

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const ZONED_FORMAT: &str = "%Y-%m-%d %H:%M:%S %Z";

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const NAIVE_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d", "%B %d, %Y", "%b %d, %Y", "%d %B %Y", "%d %b %Y",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum DatetimeOperation {
    GetCurrentDate,
    GetCurrentTime,
    GetCurrentDateTime,
    ParseDate,
    FormatDate,
    AddTime,
    SubtractTime,
    DiffTime,
    IsAfter,
    IsBefore,
    IsSame,
    GetTimezone,
    ConvertTimezone,
    GetWeekday,
    IsWeekend,
    GetDaysInMonth,
    GetStartOfWeek,
    GetEndOfWeek,
    GetRelativeTime,
}

impl DatetimeOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GetCurrentDate => "getCurrentDate",
            Self::GetCurrentTime => "getCurrentTime",
            Self::GetCurrentDateTime => "getCurrentDateTime",
            Self::ParseDate => "parseDate",
            Self::FormatDate => "formatDate",
            Self::AddTime => "addTime",
            Self::SubtractTime => "subtractTime",
            Self::DiffTime => "diffTime",
            Self::IsAfter => "isAfter",
            Self::IsBefore => "isBefore",
            Self::IsSame => "isSame",
            Self::GetTimezone => "getTimezone",
            Self::ConvertTimezone => "convertTimezone",
            Self::GetWeekday => "getWeekday",
            Self::IsWeekend => "isWeekend",
            Self::GetDaysInMonth => "getDaysInMonth",
            Self::GetStartOfWeek => "getStartOfWeek",
            Self::GetEndOfWeek => "getEndOfWeek",
            Self::GetRelativeTime => "getRelativeTime",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Year,
    Month,
    Week,
    Day,
    Hour,
    Minute,
    Second,
    Millisecond,
}

impl TimeUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Year => "year",
            Self::Month => "month",
            Self::Week => "week",
            Self::Day => "day",
            Self::Hour => "hour",
            Self::Minute => "minute",
            Self::Second => "second",
            Self::Millisecond => "millisecond",
        }
    }

    /// Length in milliseconds; None for calendar units of varying length
    fn fixed_millis(self) -> Option<i64> {
        match self {
            Self::Year | Self::Month => None,
            Self::Week => Some(604_800_000),
            Self::Day => Some(86_400_000),
            Self::Hour => Some(3_600_000),
            Self::Minute => Some(60_000),
            Self::Second => Some(1_000),
            Self::Millisecond => Some(1),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DatetimeInput {
    /// The type of date/time operation to perform
    pub operation: DatetimeOperation,
    /// Input date string (YYYY-MM-DD, MM/DD/YYYY, "March 5, 2026", ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_date: Option<String>,
    /// Input time string (HH:MM or HH:MM:SS), combined with inputDate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_time: Option<String>,
    /// Input datetime string (ISO 8601 preferred)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_date_time: Option<String>,
    /// Format of the input string (strftime, e.g. %d/%m/%Y)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_format: Option<String>,
    /// Desired output format (strftime). Default: %Y-%m-%d for dates, %H:%M:%S for times, %Y-%m-%d %H:%M:%S for datetimes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_format: Option<String>,
    /// Amount to add/subtract
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    /// Time unit for calculations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<TimeUnit>,
    /// Date to compare with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compare_date: Option<String>,
    /// Format of the comparison date (strftime)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compare_date_format: Option<String>,
    /// Target timezone (e.g., Asia/Shanghai, America/New_York, UTC)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    /// Source timezone for conversion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_timezone: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl DatetimeInput {
    fn output_or<'a>(&'a self, default: &'a str) -> &'a str {
        non_empty(&self.output_format).unwrap_or(default)
    }

    /// inputDate (plus inputTime when no explicit format is given), else inputDateTime
    fn subject_text(&self) -> Option<String> {
        match (non_empty(&self.input_date), non_empty(&self.input_time)) {
            (Some(date), Some(time)) if self.input_format.is_none() => {
                Some(format!("{date} {time}"))
            }
            (Some(date), _) => Some(date.to_string()),
            (None, _) => non_empty(&self.input_date_time).map(str::to_string),
        }
    }

    /// The date the operation applies to; "now" when none was given
    fn subject(&self, tz: Tz, now: DateTime<Tz>) -> Result<DateTime<Tz>, String> {
        match self.subject_text() {
            Some(text) => parse_in(&text, non_empty(&self.input_format), tz),
            None => Ok(now),
        }
    }

    fn compare(&self, tz: Tz) -> Result<DateTime<Tz>, String> {
        let raw = non_empty(&self.compare_date).ok_or_else(|| {
            format!(
                "compareDate is required for {} operation",
                self.operation.as_str()
            )
        })?;
        parse_in(raw, non_empty(&self.compare_date_format), tz)
    }
}

fn localize(tz: Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    tz.from_local_datetime(&naive).earliest()
}

fn parse_naive(value: &str, format: Option<&str>) -> Option<NaiveDateTime> {
    let at_midnight = |d: NaiveDate| d.and_time(NaiveTime::MIN);
    match format {
        Some(fmt) => NaiveDateTime::parse_from_str(value, fmt)
            .ok()
            .or_else(|| NaiveDate::parse_from_str(value, fmt).ok().map(at_midnight)),
        None => NAIVE_DATETIME_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
            .or_else(|| {
                NAIVE_DATE_FORMATS
                    .iter()
                    .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
                    .map(at_midnight)
            }),
    }
}

/// Offset-carrying input keeps its instant; naive input is read as wall time in `tz`
fn parse_in(value: &str, format: Option<&str>, tz: Tz) -> Result<DateTime<Tz>, String> {
    let value = value.trim();
    if format.is_none() {
        if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
            return Ok(dt.with_timezone(&tz));
        }
    }
    parse_naive(value, format)
        .and_then(|naive| localize(tz, naive))
        .ok_or_else(|| format!("Invalid date: {value}"))
}

fn parse_timezone(name: &str) -> Result<Tz, String> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| format!("Invalid timezone: {name}"))
}

/// chrono's Display fails on unknown specifiers; surface that instead of panicking
fn format_dt(dt: &DateTime<Tz>, fmt: &str) -> Result<String, String> {
    let mut out = String::new();
    write!(out, "{}", dt.format(fmt)).map_err(|_| format!("Invalid format string: {fmt}"))?;
    Ok(out)
}

fn add_months(dt: DateTime<Tz>, months: i64) -> Option<DateTime<Tz>> {
    let magnitude = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
    if months >= 0 {
        dt.checked_add_months(magnitude)
    } else {
        dt.checked_sub_months(magnitude)
    }
}

/// Whole calendar units scaled by `factor`, or None once the count leaves i64
fn whole_units(amount: f64, factor: i64) -> Option<i64> {
    let whole = amount.trunc();
    if !whole.is_finite() || whole.abs() >= i64::MAX as f64 {
        return None;
    }
    (whole as i64).checked_mul(factor)
}

/// Calendar units move the wall clock (clamping month ends); fixed units move the instant
fn shift(dt: DateTime<Tz>, amount: f64, unit: TimeUnit) -> Result<DateTime<Tz>, String> {
    let shifted = match unit {
        TimeUnit::Year => whole_units(amount, 12).and_then(|months| add_months(dt, months)),
        TimeUnit::Month => whole_units(amount, 1).and_then(|months| add_months(dt, months)),
        TimeUnit::Week | TimeUnit::Day => {
            let factor = if unit == TimeUnit::Week { 7 } else { 1 };
            let Some(days) = whole_units(amount, factor) else {
                return Err(out_of_range(amount, unit));
            };
            let magnitude = Days::new(days.unsigned_abs());
            if days >= 0 {
                dt.checked_add_days(magnitude)
            } else {
                dt.checked_sub_days(magnitude)
            }
        }
        _ => unit
            .fixed_millis()
            .and_then(|ms| TimeDelta::try_milliseconds((amount * ms as f64).round() as i64))
            .and_then(|delta| dt.checked_add_signed(delta)),
    };
    shifted.ok_or_else(|| out_of_range(amount, unit))
}

fn out_of_range(amount: f64, unit: TimeUnit) -> String {
    format!("Date out of range after adding {amount} {}", unit.as_str())
}

/// Fractional months from `b` to `a`, measured against the surrounding month lengths
fn month_diff(a: DateTime<Tz>, b: DateTime<Tz>) -> f64 {
    if a.day() < b.day() {
        return -month_diff(b, a);
    }
    let wheel = i64::from(b.year() - a.year()) * 12 + i64::from(b.month()) - i64::from(a.month());
    let Some(anchor) = add_months(a, wheel) else {
        return 0.0;
    };
    let before = b < anchor;
    let Some(anchor2) = add_months(a, wheel + if before { -1 } else { 1 }) else {
        return 0.0;
    };
    let span = if before { anchor - anchor2 } else { anchor2 - anchor };
    let span_ms = span.num_milliseconds();
    if span_ms == 0 {
        return 0.0;
    }
    let fraction = (b - anchor).num_milliseconds() as f64 / span_ms as f64;
    -(wheel as f64 + fraction) + 0.0
}

/// `a - b` in `unit`, fractional
fn diff_float(a: &DateTime<Tz>, b: &DateTime<Tz>, unit: TimeUnit) -> f64 {
    match unit {
        TimeUnit::Year => month_diff(*a, *b) / 12.0,
        TimeUnit::Month => month_diff(*a, *b),
        // Day-based units compare wall clocks so DST days count as whole days
        TimeUnit::Week | TimeUnit::Day => {
            let ms = (a.naive_local() - b.naive_local()).num_milliseconds() as f64;
            ms / unit.fixed_millis().unwrap_or(86_400_000) as f64
        }
        _ => {
            let ms = (*a - *b).num_milliseconds() as f64;
            ms / unit.fixed_millis().unwrap_or(1) as f64
        }
    }
}

/// Beginning of the `unit` containing `dt`; weeks start on Sunday
fn start_of(dt: DateTime<Tz>, unit: TimeUnit) -> Result<DateTime<Tz>, String> {
    let local = dt.naive_local();
    let date = local.date();
    let midnight = |d: NaiveDate| d.and_time(NaiveTime::MIN);
    let naive = match unit {
        TimeUnit::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1).map(midnight),
        TimeUnit::Month => date.with_day(1).map(midnight),
        TimeUnit::Week => date
            .checked_sub_days(Days::new(date.weekday().num_days_from_sunday().into()))
            .map(midnight),
        TimeUnit::Day => Some(midnight(date)),
        TimeUnit::Hour => local
            .with_minute(0)
            .and_then(|t| t.with_second(0))
            .and_then(|t| t.with_nanosecond(0)),
        TimeUnit::Minute => local.with_second(0).and_then(|t| t.with_nanosecond(0)),
        TimeUnit::Second => local.with_nanosecond(0),
        TimeUnit::Millisecond => {
            local.with_nanosecond(local.nanosecond() / 1_000_000 * 1_000_000)
        }
    };
    naive
        .and_then(|n| localize(dt.timezone(), n))
        .ok_or_else(|| format!("Cannot compute start of {} for {dt}", unit.as_str()))
}

fn end_of_week(dt: DateTime<Tz>) -> Result<DateTime<Tz>, String> {
    start_of(dt, TimeUnit::Week)?
        .checked_add_days(Days::new(7))
        .and_then(|next| next.checked_sub_signed(TimeDelta::milliseconds(1)))
        .ok_or_else(|| format!("Cannot compute end of week for {dt}"))
}

fn days_in_month(date: NaiveDate) -> u32 {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(31)
}

/// (label, upper bound after rounding, unit to re-measure in)
type Threshold = (&'static str, Option<f64>, Option<TimeUnit>);

const RELATIVE_THRESHOLDS: &[Threshold] = &[
    ("a few seconds", Some(44.0), Some(TimeUnit::Second)),
    ("a minute", Some(89.0), None),
    ("%d minutes", Some(44.0), Some(TimeUnit::Minute)),
    ("an hour", Some(89.0), None),
    ("%d hours", Some(21.0), Some(TimeUnit::Hour)),
    ("a day", Some(35.0), None),
    ("%d days", Some(25.0), Some(TimeUnit::Day)),
    ("a month", Some(45.0), None),
    ("%d months", Some(10.0), Some(TimeUnit::Month)),
    ("a year", Some(17.0), None),
    ("%d years", None, Some(TimeUnit::Year)),
];

/// "in 3 days", "2 hours ago", "a few seconds ago"
fn relative_time(subject: &DateTime<Tz>, reference: &DateTime<Tz>) -> String {
    let mut result = 0.0;
    let mut picked = None;
    for (i, (label, limit, unit)) in RELATIVE_THRESHOLDS.iter().enumerate() {
        if let Some(unit) = unit {
            result = diff_float(subject, reference, *unit);
        }
        let abs = result.abs().round();
        if limit.is_none_or(|limit| abs <= limit) {
            let label = if abs <= 1.0 && i > 0 {
                RELATIVE_THRESHOLDS[i - 1].0
            } else {
                *label
            };
            picked = Some(label.replace("%d", &format!("{abs:.0}")));
            break;
        }
    }
    let text = picked.unwrap_or_else(|| "a few seconds".to_string());
    if result > 0.0 {
        format!("in {text}")
    } else {
        format!("{text} ago")
    }
}

pub fn calculate(input: &DatetimeInput, ctx: &ToolContext) -> Result<String, String> {
    use DatetimeOperation as Op;

    let tz = ctx.timezone;
    let now = ctx.now.with_timezone(&tz);

    match input.operation {
        Op::GetCurrentDate => format_dt(&now, input.output_or(DATE_FORMAT)),
        Op::GetCurrentTime => format_dt(&now, input.output_or(TIME_FORMAT)),
        Op::GetCurrentDateTime => format_dt(&now, input.output_or(DATETIME_FORMAT)),
        Op::ParseDate => {
            let raw = non_empty(&input.input_date)
                .ok_or("inputDate is required for parseDate operation")?;
            let parsed = parse_in(raw, non_empty(&input.input_format), tz)?;
            format_dt(&parsed, input.output_or(DATE_FORMAT))
        }
        Op::FormatDate => {
            if input.subject_text().is_none() {
                return Err("inputDate or inputDateTime is required for formatDate operation".into());
            }
            format_dt(&input.subject(tz, now)?, input.output_or(DATETIME_FORMAT))
        }
        Op::AddTime | Op::SubtractTime => {
            let (amount, unit) = match (input.amount, input.unit) {
                (Some(amount), Some(unit)) if amount != 0.0 => (amount, unit),
                _ => {
                    return Err(format!(
                        "amount and unit are required for {} operation",
                        input.operation.as_str()
                    ));
                }
            };
            let base = input.subject(tz, now)?;
            let signed = if input.operation == Op::AddTime { amount } else { -amount };
            format_dt(&shift(base, signed, unit)?, input.output_or(DATETIME_FORMAT))
        }
        Op::DiffTime => {
            let other = input.compare(tz)?;
            let base = input.subject(tz, now)?;
            let unit = input.unit.unwrap_or(TimeUnit::Day);
            let diff = diff_float(&base, &other, unit).trunc() as i64;
            Ok(format!("{diff} {}(s)", unit.as_str()))
        }
        Op::IsAfter | Op::IsBefore | Op::IsSame => {
            if non_empty(&input.compare_date).is_none() {
                return Err(format!(
                    "compareDate is required for {} operation",
                    input.operation.as_str()
                ));
            }
            let (base, other) = match (input.subject(tz, now), input.compare(tz)) {
                (Ok(base), Ok(other)) => (base, other),
                _ => return Err("Invalid dates for comparison".into()),
            };
            let unit = input.unit.unwrap_or(TimeUnit::Millisecond);
            let (a, b) = (start_of(base, unit)?, start_of(other, unit)?);
            let answer = match input.operation {
                Op::IsAfter => a > b,
                Op::IsBefore => a < b,
                _ => a == b,
            };
            Ok(answer.to_string())
        }
        Op::GetTimezone => Ok(tz.name().to_string()),
        Op::ConvertTimezone => {
            let target = non_empty(&input.timezone)
                .ok_or("timezone is required for convertTimezone operation")?;
            let target = parse_timezone(target)?;
            let source = match non_empty(&input.from_timezone) {
                Some(name) => parse_timezone(name)?,
                None => tz,
            };
            let base = input.subject(source, now.with_timezone(&source))?;
            format_dt(&base.with_timezone(&target), input.output_or(ZONED_FORMAT))
        }
        Op::GetWeekday => format_dt(&input.subject(tz, now)?, "%A"),
        Op::IsWeekend => {
            let day = input.subject(tz, now)?.weekday();
            Ok(matches!(day, Weekday::Sat | Weekday::Sun).to_string())
        }
        Op::GetDaysInMonth => Ok(days_in_month(input.subject(tz, now)?.date_naive()).to_string()),
        Op::GetStartOfWeek => format_dt(
            &start_of(input.subject(tz, now)?, TimeUnit::Week)?,
            input.output_or(DATE_FORMAT),
        ),
        Op::GetEndOfWeek => format_dt(
            &end_of_week(input.subject(tz, now)?)?,
            input.output_or(DATE_FORMAT),
        ),
        Op::GetRelativeTime => {
            let subject = input.subject(tz, now)?;
            let reference = match non_empty(&input.compare_date) {
                Some(_) => input.compare(tz)?,
                None => now,
            };
            Ok(relative_time(&subject, &reference))
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DatetimeTool;

#[async_trait]
impl Tool for DatetimeTool {
    fn name(&self) -> &'static str {
        NAME
    }

    fn description(&self) -> &'static str {
        "Perform complex date and time calculations that require precision. Use this tool ONLY for advanced operations like timezone conversion, exact duration calculations, or complex date formatting - NOT for simple date parsing or basic relative dates."
    }

    fn parameters(&self) -> Value {
        parameters_schema::<DatetimeInput>()
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Value {
        let operation = args
            .get("operation")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        let timestamp = ctx.now.to_rfc3339_opts(SecondsFormat::Millis, true);
        tracing::debug!(operation = %operation, args = %args, "Executing datetime tool");

        let outcome = serde_json::from_value::<DatetimeInput>(args)
            .map_err(|e| format!("Invalid arguments: {e}"))
            .and_then(|input| calculate(&input, ctx));

        match outcome {
            Ok(result) => json!({
                "success": true,
                "result": result,
                "operation": operation,
                "timestamp": timestamp,
            }),
            Err(error) => {
                tracing::warn!(operation = %operation, "Datetime calculation failed: {}", error);
                json!({
                    "success": false,
                    "error": error,
                    "operation": operation,
                    "timestamp": timestamp,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    // Monday 2026-06-15 14:00 UTC
    fn ctx(tz: Tz) -> ToolContext {
        ToolContext {
            timezone: tz,
            now: DateTime::parse_from_rfc3339("2026-06-15T14:00:00Z")
                .expect("valid")
                .with_timezone(&Utc),
        }
    }

    async fn run(args: Value, tz: Tz) -> Value {
        DatetimeTool.execute(args, &ctx(tz)).await
    }

    async fn result(args: Value) -> String {
        let out = run(args, chrono_tz::UTC).await;
        assert_eq!(out["success"], true, "{out}");
        out["result"].as_str().unwrap_or_default().to_string()
    }

    #[tokio::test]
    async fn current_date_uses_request_timezone() {
        let tokyo = run(json!({"operation": "getCurrentDateTime"}), chrono_tz::Asia::Tokyo).await;
        assert_eq!(tokyo["result"], "2026-06-15 23:00:00");
        assert_eq!(tokyo["timestamp"], "2026-06-15T14:00:00.000Z");
        assert_eq!(tokyo["operation"], "getCurrentDateTime");

        let auckland = run(json!({"operation": "getCurrentDate"}), chrono_tz::Pacific::Auckland).await;
        assert_eq!(auckland["result"], "2026-06-16");

        let zone = run(json!({"operation": "getTimezone"}), chrono_tz::Asia::Tokyo).await;
        assert_eq!(zone["result"], "Asia/Tokyo");
    }

    #[tokio::test]
    async fn huge_amounts_fail_instead_of_overflowing() {
        for unit in ["year", "month", "week", "day", "hour", "millisecond"] {
            for amount in [1e19, -1e19, 9.2e18] {
                let out = run(
                    json!({"operation": "addTime", "amount": amount, "unit": unit, "inputDate": "2026-01-01"}),
                    chrono_tz::UTC,
                )
                .await;
                assert_eq!(out["success"], false, "{unit} {amount}");
                assert!(
                    out["error"]
                        .as_str()
                        .unwrap_or_default()
                        .starts_with("Date out of range"),
                    "{out}"
                );
            }
        }
    }

    #[tokio::test]
    async fn add_and_subtract() {
        assert_eq!(
            result(json!({"operation": "addTime", "inputDate": "2026-01-31", "amount": 1, "unit": "month", "outputFormat": "%Y-%m-%d"})).await,
            "2026-02-28"
        );
        assert_eq!(
            result(json!({"operation": "subtractTime", "inputDate": "2026-06-15", "amount": 2, "unit": "week"})).await,
            "2026-06-01 00:00:00"
        );
        assert_eq!(
            result(json!({"operation": "addTime", "inputDate": "2026-06-15", "inputTime": "22:30", "amount": 90, "unit": "minute"})).await,
            "2026-06-16 00:00:00"
        );
    }

    #[tokio::test]
    async fn zero_amount_is_rejected() {
        let out = run(
            json!({"operation": "addTime", "inputDate": "2026-06-15", "amount": 0, "unit": "day"}),
            chrono_tz::UTC,
        )
        .await;
        assert_eq!(out["success"], false);
        assert_eq!(out["error"], "amount and unit are required for addTime operation");
    }

    #[tokio::test]
    async fn differences() {
        assert_eq!(
            result(json!({"operation": "diffTime", "inputDate": "2026-12-25", "compareDate": "2026-06-15"})).await,
            "193 day(s)"
        );
        assert_eq!(
            result(json!({"operation": "diffTime", "inputDate": "2026-12-25", "compareDate": "2026-06-15", "unit": "month"})).await,
            "6 month(s)"
        );
        assert_eq!(
            result(json!({"operation": "diffTime", "inputDate": "06/15/2026", "compareDate": "2026-12-25", "unit": "week"})).await,
            "-27 week(s)"
        );
    }

    #[tokio::test]
    async fn comparisons_respect_granularity() {
        assert_eq!(
            result(json!({"operation": "isSame", "inputDate": "2026-06-01", "compareDate": "2026-06-30", "unit": "month"})).await,
            "true"
        );
        assert_eq!(
            result(json!({"operation": "isBefore", "inputDate": "2026-06-01", "compareDate": "2026-06-30"})).await,
            "true"
        );
        assert_eq!(
            result(json!({"operation": "isAfter", "inputDateTime": "2026-06-30T18:00:00", "compareDate": "2026-06-30", "unit": "day"})).await,
            "false"
        );
        let missing = run(json!({"operation": "isAfter", "inputDate": "2026-06-30"}), chrono_tz::UTC).await;
        assert_eq!(missing["error"], "compareDate is required for isAfter operation");
    }

    #[tokio::test]
    async fn converts_between_zones() {
        assert_eq!(
            result(json!({
                "operation": "convertTimezone",
                "inputDateTime": "2026-06-15 09:00:00",
                "fromTimezone": "America/New_York",
                "timezone": "Asia/Shanghai",
                "outputFormat": "%Y-%m-%d %H:%M"
            }))
            .await,
            "2026-06-15 21:00"
        );
        let bad = run(
            json!({"operation": "convertTimezone", "timezone": "Mars/Olympus_Mons"}),
            chrono_tz::UTC,
        )
        .await;
        assert_eq!(bad["error"], "Invalid timezone: Mars/Olympus_Mons");
    }

    #[tokio::test]
    async fn calendar_queries() {
        assert_eq!(
            result(json!({"operation": "getWeekday", "inputDate": "2026-06-15"})).await,
            "Monday"
        );
        assert_eq!(
            result(json!({"operation": "isWeekend", "inputDate": "2026-06-20"})).await,
            "true"
        );
        assert_eq!(
            result(json!({"operation": "getDaysInMonth", "inputDate": "2028-02-10"})).await,
            "29"
        );
        assert_eq!(
            result(json!({"operation": "getStartOfWeek", "inputDate": "2026-06-17"})).await,
            "2026-06-14"
        );
        assert_eq!(
            result(json!({"operation": "getEndOfWeek", "inputDate": "2026-06-17"})).await,
            "2026-06-20"
        );
        assert_eq!(
            result(json!({"operation": "parseDate", "inputDate": "17/06/2026", "inputFormat": "%d/%m/%Y", "outputFormat": "%B %-d, %Y"})).await,
            "June 17, 2026"
        );
    }

    #[tokio::test]
    async fn relative_time_thresholds() {
        assert_eq!(
            result(json!({"operation": "getRelativeTime", "inputDateTime": "2026-06-18T14:00:00Z"})).await,
            "in 3 days"
        );
        assert_eq!(
            result(json!({"operation": "getRelativeTime", "inputDateTime": "2026-06-15T12:00:00Z"})).await,
            "2 hours ago"
        );
        assert_eq!(
            result(json!({"operation": "getRelativeTime", "inputDateTime": "2026-06-15T13:59:15Z"})).await,
            "a minute ago"
        );
        assert_eq!(
            result(json!({"operation": "getRelativeTime", "inputDateTime": "2026-06-15T13:59:50Z"})).await,
            "a few seconds ago"
        );
        assert_eq!(
            result(json!({"operation": "getRelativeTime", "inputDate": "2026-01-01", "compareDate": "2024-01-01"})).await,
            "in 2 years"
        );
    }

    #[tokio::test]
    async fn bad_input_is_reported_not_raised() {
        let invalid = run(json!({"operation": "parseDate", "inputDate": "not-a-date"}), chrono_tz::UTC).await;
        assert_eq!(invalid["success"], false);
        assert_eq!(invalid["error"], "Invalid date: not-a-date");

        let format = run(json!({"operation": "getCurrentDate", "outputFormat": "%Q"}), chrono_tz::UTC).await;
        assert_eq!(format["error"], "Invalid format string: %Q");

        let unknown = run(json!({"operation": "teleport"}), chrono_tz::UTC).await;
        assert_eq!(unknown["success"], false);
        assert_eq!(unknown["operation"], "teleport");
    }
}
