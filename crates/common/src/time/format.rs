//! Timezone resolution and the date layouts the ERP expects.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use thiserror::Error;

/// Layout of the `X-Api-Timestamp` header (`dd/mm/yyyy HH:MM:SS`, 24-hour).
pub const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// Layout of transaction and filter dates (`dd/mm/yyyy`).
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// Errors raised while resolving time settings
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeError {
    /// The IANA zone name is not in the tz database
    #[error("unknown timezone '{0}'")]
    UnknownTimezone(String),
}

/// Resolve an IANA timezone name such as `Asia/Jakarta`.
pub fn parse_timezone(name: &str) -> Result<Tz, TimeError> {
    name.trim().parse::<Tz>().map_err(|_| TimeError::UnknownTimezone(name.to_string()))
}

/// Render `instant` as the request timestamp in `tz`.
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use chrono_tz::Asia::Jakarta;
/// use storefront_common::time::request_timestamp;
///
/// let late = Utc.with_ymd_and_hms(2024, 12, 31, 18, 30, 0).unwrap();
/// assert_eq!(request_timestamp(late, Jakarta), "01/01/2025 01:30:00");
/// ```
pub fn request_timestamp(instant: DateTime<Utc>, tz: Tz) -> String {
    instant.with_timezone(&tz).format(TIMESTAMP_FORMAT).to_string()
}

/// Render the civil date of `instant` in `tz`.
pub fn transaction_date(instant: DateTime<Utc>, tz: Tz) -> String {
    instant.with_timezone(&tz).format(DATE_FORMAT).to_string()
}
