use chrono::{DateTime, NaiveDate, NaiveTime};

/// Date layouts tried in order; month-first wins for ambiguous slash/dash forms.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%m-%d-%Y", "%d.%m.%Y"];
const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M"];

/// Lenient parse of a calendar date, optionally followed by a time of day.
/// Returns `None` for anything unrecognised; never errors.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    if let Some(d) = parse_date_only(s) {
        return Some(d);
    }

    // "<date>T<time>" or "<date> <time>"
    let (date_part, time_part) = s.split_once(|c: char| c == 'T' || c == ' ')?;
    let time_part = time_part.trim();
    if !TIME_FORMATS
        .iter()
        .any(|f| NaiveTime::parse_from_str(time_part, f).is_ok())
    {
        return None;
    }
    parse_date_only(date_part)
}

fn parse_date_only(s: &str) -> Option<NaiveDate> {
    // compact YYYYMMDD
    if s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit()) {
        let year: i32 = s[0..4].parse().ok()?;
        let month: u32 = s[4..6].parse().ok()?;
        let day: u32 = s[6..8].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
}
