/// Documents fetched per page by the initial load and each "load more"
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Capacity of the in-process change feed per collection
pub const CHANGE_FEED_CAPACITY: usize = 256;

/// Capacity of the view event broadcast channel
pub const VIEW_EVENT_CAPACITY: usize = 128;

/// Blob store prefix for order attachments
pub const ATTACHMENT_PREFIX: &str = "tickets";

/// Maximum attachment size in bytes (10 MiB)
pub const MAX_ATTACHMENT_SIZE: usize = 10 * 1024 * 1024;

/// Order date format as entered in the order form (local time, minutes)
pub const ORDER_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Rows shown by the products list before it is truncated
pub const PRODUCT_LIST_LIMIT: usize = 100;

/// Document field names used outside the typed models
pub const FIELD_CUSTOMER_ID: &str = "customerId";
pub const FIELD_STATUS: &str = "status";
pub const FIELD_DATE: &str = "date";
pub const FIELD_COMMENTS: &str = "comments";
pub const FIELD_ATTACHMENT: &str = "ticketPhoto";
