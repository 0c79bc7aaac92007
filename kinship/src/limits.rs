// Centralized ingestion limits to harden against untrusted documents

// Document size caps
pub const MAX_PERSONS: usize = 10_000;
pub const MAX_RELATIONSHIPS: usize = 40_000;

// Name parts
pub const MAX_NAME_LEN: usize = 200;

// Grid
pub const MAX_SLOTS_PER_ROW: u32 = 4_096;

// Document versions this build understands
pub const DOC_VERSION: u32 = 1;

#[inline]
pub fn valid_name(s: &str) -> bool { s.chars().count() <= MAX_NAME_LEN && !s.chars().any(char::is_control) }

#[inline]
pub fn valid_optional_name(s: &Option<String>) -> bool { s.as_deref().map_or(true, valid_name) }
