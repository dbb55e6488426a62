use chrono::{Local, NaiveDate};

/// The clinic's current calendar date, in the server's local time zone.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}
