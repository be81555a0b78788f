use crate::form::FormData;
use time::{Date, OffsetDateTime};
use tracing::debug;

/// Today's calendar date in the local timezone, or UTC when the offset is unknown.
pub fn today_local() -> Date {
    OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .date()
}

pub fn format_iso_date(d: Date) -> String {
    format!("{:04}-{:02}-{:02}", d.year(), u8::from(d.month()), d.day())
}

/// Fills `field` with `today` when it is missing or empty. Returns true if the form changed.
pub fn apply_default_date(form: &mut FormData, field: &str, today: Date) -> bool {
    if form.get(field).is_some_and(|v| !v.is_empty()) {
        return false;
    }
    let value = format_iso_date(today);
    debug!("defaulting {field} to {value}");
    form.push(field, value);
    true
}
