//! Time utilities and abstractions
//!
//! - **[`clock`]**: wall-clock abstraction with real and mock implementations
//! - **[`format`]**: timezone resolution and the ERP date/timestamp layouts
//!
//! ## Usage
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use storefront_common::time::{parse_timezone, request_timestamp};
//!
//! let tz = parse_timezone("Asia/Jakarta").unwrap();
//! let instant = Utc.with_ymd_and_hms(2024, 1, 15, 3, 4, 5).unwrap();
//! assert_eq!(request_timestamp(instant, tz), "15/01/2024 10:04:05");
//! ```

pub mod clock;
pub mod format;

pub use clock::{Clock, MockClock, SystemClock};
pub use format::{
    parse_timezone, request_timestamp, transaction_date, TimeError, DATE_FORMAT, TIMESTAMP_FORMAT,
};
