use chrono::{Days, NaiveDate};

/// Fast parse of an invoice date.
///
/// Accepts `YYYY-MM-DD` / `YYYY/MM/DD` (optionally followed by a time part
/// after a space or `T`, which is ignored) and US-style `MM/DD/YYYY`.
pub fn parse_invoice_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    let b = s.as_bytes();
    if b.len() >= 10 && (b[4] == b'-' || b[4] == b'/') && b[7] == b[4] {
        if b.len() > 10 && b[10] != b' ' && b[10] != b'T' {
            return None;
        }
        let year: i32 = s.get(0..4)?.parse().ok()?;
        let month: u32 = s.get(5..7)?.parse().ok()?;
        let day: u32 = s.get(8..10)?.parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    NaiveDate::parse_from_str(s, "%m/%d/%Y").ok()
}

/// Excel serial day number → calendar date (1900 date system).
///
/// Serial 1 is 1900-01-01; the fictitious 1900-02-29 is not representable,
/// so serials are counted from 1899-12-30 as spreadsheet tools do for every
/// date after February 1900.
pub fn from_excel_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_days(Days::new(serial.floor() as u64))
}
