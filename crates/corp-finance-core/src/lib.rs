pub mod error;
pub mod types;

#[cfg(feature = "credit_card")]
pub mod credit_card;

pub use error::CorpFinanceError;
pub use types::*;

/// Standard result type for all corp-finance operations
pub type CorpFinanceResult<T> = Result<T, CorpFinanceError>;
