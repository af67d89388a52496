use time::OffsetDateTime;

/// Current instant in UTC, truncated to microseconds.
///
/// PostgreSQL `TIMESTAMPTZ` keeps microsecond precision, so values produced
/// here compare equal after a round trip through the database.
pub fn now_utc() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    let micros = now.microsecond();
    now.replace_microsecond(micros).unwrap_or(now)
}

/// Current calendar year in UTC.
pub fn current_year() -> i32 {
    OffsetDateTime::now_utc().year()
}
