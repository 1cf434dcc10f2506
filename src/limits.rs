//! Hard input limits. Anything beyond these is rejected with `LimitExceeded`.

/// Longest series a single create request may expand into (`repeat_days`).
pub const MAX_REPEAT_DAYS: u32 = 366;

pub const MAX_NOTES_LEN: usize = 4096;

/// Names and free-text descriptor fields (client room/editor names, phone, email).
pub const MAX_NAME_LEN: usize = 256;

pub const MAX_TENANT_NAME_LEN: usize = 64;

pub const MAX_BREAK_HOURS: u32 = 24;

/// Longest accepted request line on the wire, in bytes.
pub const MAX_LINE_LEN: usize = 64 * 1024;
