use chrono::NaiveDate;

/// Injected "today" provider (§6, §10.6). Never read from the OS inside
/// this crate; callers that need wall-clock dates pass one in, and tests
/// pass a fixed date for determinism.
pub type Clock = fn() -> NaiveDate;
