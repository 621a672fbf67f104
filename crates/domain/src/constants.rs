//! Application constants
//!
//! Centralized location for protocol and configuration constants shared by
//! every crate in the workspace.

// Upstream ERP authentication headers
pub const HEADER_AUTHORIZATION: &str = "Authorization";
pub const HEADER_API_TIMESTAMP: &str = "X-Api-Timestamp";
pub const HEADER_API_SIGNATURE: &str = "X-Api-Signature";

/// Headers the fetch facade always owns. Caller-supplied values for these
/// names are discarded.
pub const PROTECTED_HEADERS: [&str; 3] =
    [HEADER_AUTHORIZATION, HEADER_API_TIMESTAMP, HEADER_API_SIGNATURE];

// Token verification
pub const DEFAULT_TOKEN_URL: &str = "https://account.accurate.id/api/api-token.do";
/// Primary key of the tenant database block in the token verification payload.
pub const TOKEN_DATABASE_KEY: &str = "database";
/// Localized fallback key some upstream responses use instead.
pub const TOKEN_DATABASE_KEY_LEGACY: &str = "data usaha";

// Request timestamps are rendered in this zone (UTC+7, no DST)
pub const DEFAULT_TIMEZONE: &str = "Asia/Jakarta";

// Scheduler defaults
pub const DEFAULT_MAX_PARALLEL: usize = 6;
pub const DEFAULT_MIN_INTERVAL_MS: u64 = 150;

// HTTP defaults
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_BASE_BACKOFF_MS: u64 = 200;

// Logging
pub const DEFAULT_LOG_FILTER: &str = "info";

// Secrets, read lazily at first use
pub const ENV_API_TOKEN: &str = "ACCURATE_API_TOKEN";
pub const ENV_SIGNATURE_SECRET: &str = "ACCURATE_SIGNATURE_SECRET";

// Upstream endpoints
pub const ITEM_LIST_PATH: &str = "/accurate/api/item/list.do";
pub const ITEM_DETAIL_PATH: &str = "/accurate/api/item/detail.do";
pub const CUSTOMER_DETAIL_PATH: &str = "/accurate/api/customer/detail.do";
pub const CUSTOMER_SAVE_PATH: &str = "/accurate/api/customer/save.do";
pub const SALES_ORDER_LIST_PATH: &str = "/accurate/api/sales-order/list.do";
pub const SALES_ORDER_DETAIL_PATH: &str = "/accurate/api/sales-order/detail.do";
pub const SALES_ORDER_SAVE_PATH: &str = "/accurate/api/sales-order/save.do";

pub const ITEM_LIST_FIELDS: &str =
    "id,name,no,itemType,unitPrice,unit1Name,category,image,imageUrlThumb";
pub const SALES_ORDER_LIST_FIELDS: &str = "id,number,transDate,customer,total,status";
pub const DEFAULT_PAGE_SIZE: u32 = 20;
