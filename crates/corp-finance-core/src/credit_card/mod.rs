//! Revolving-credit payment allocator and interest accrual engine.
//!
//! Two independent numeric kernels share the same bucket/date primitives:
//! an **allocator** (greedy priority-rule and dynamic-programming variants,
//! orchestrated by [`allocation_service::AllocationService`]) and an
//! **interest engine** (sweep-line fast path cross-checked against a
//! brute-force reference, orchestrated by
//! [`sweep_service::SweepLineService`]).

pub mod allocation;
pub mod allocation_service;
pub mod brute_force;
pub mod bucket;
pub mod clock;
pub mod dp_allocator;
pub mod error;
pub mod greedy_allocator;
pub mod interest;
pub mod money;
pub mod sweep;
pub mod sweep_service;

pub use allocation::{AllocationMetrics, AllocationStrategy, PaymentAllocation};
pub use allocation_service::{AllocationRequest, AllocationService, AllocationStrategyKind, StrategyComparison};
pub use brute_force::brute_force_interest;
pub use bucket::{BalanceBucket, BucketType, DebtBucket};
pub use clock::Clock;
pub use dp_allocator::{allocate_dp, ALLOWED_GRANULARITIES, DEFAULT_GRANULARITY};
pub use error::CreditCardError;
pub use greedy_allocator::allocate_greedy;
pub use interest::{DailyInterestEntry, InterestCalculator, InterestResult, WarnSink};
pub use money::{round_average, round_money, DateRange, DP_TOLERANCE, T_MATCH};
pub use sweep::{BalanceChange, DailyBalance, SweepLineEngine, SweepStatistics};
pub use sweep_service::{InterestBenchmark, SweepLineService};
