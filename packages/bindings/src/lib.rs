use std::collections::BTreeMap;

use napi::Result as NapiResult;
use napi_derive::napi;
use serde::Deserialize;

use corp_finance_core::credit_card::{
    AllocationRequest, AllocationService, BalanceBucket, BalanceChange, DateRange, DebtBucket,
    SweepLineService, DEFAULT_GRANULARITY,
};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Payment allocation
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct AllocatePaymentInput {
    account_id: String,
    buckets: Vec<DebtBucket>,
    payment_amount: rust_decimal::Decimal,
    #[serde(default = "default_strategy")]
    strategy: String,
    granularity: Option<i64>,
}

fn default_strategy() -> String {
    "bank_rule".to_string()
}

#[napi]
pub fn allocate_payment(input_json: String) -> NapiResult<String> {
    let input: AllocatePaymentInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;

    let service = AllocationService::new();
    service.set_account_buckets(&input.account_id, input.buckets);

    let request = match input.strategy.as_str() {
        "dp_optimal" => AllocationRequest::DpOptimal {
            granularity: input.granularity.unwrap_or(DEFAULT_GRANULARITY),
        },
        "bank_rule" => AllocationRequest::BankRule,
        other => return Err(to_napi_error(format!("unknown strategy '{other}'"))),
    };

    let result = service
        .allocate_payment(&input.account_id, input.payment_amount, request)
        .map_err(to_napi_error)?;
    serde_json::to_string(&result).map_err(to_napi_error)
}

#[derive(Deserialize)]
struct CompareStrategiesInput {
    account_id: String,
    buckets: Vec<DebtBucket>,
    payment_amount: rust_decimal::Decimal,
}

#[napi]
pub fn compare_all_strategies(input_json: String) -> NapiResult<String> {
    let input: CompareStrategiesInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;

    let service = AllocationService::new();
    service.set_account_buckets(&input.account_id, input.buckets);

    let comparison = service
        .compare_all_strategies(&input.account_id, input.payment_amount)
        .map_err(to_napi_error)?;
    serde_json::to_string(&comparison).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Interest accrual
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct StatementInterestInput {
    account_id: String,
    rates: BTreeMap<BalanceBucket, rust_decimal::Decimal>,
    balance_changes: Vec<BalanceChange>,
    range: DateRange,
}

#[napi]
pub fn calculate_statement_interest(input_json: String) -> NapiResult<String> {
    let input: StatementInterestInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;

    let service = SweepLineService::new();
    service
        .register_account(&input.account_id, input.rates)
        .map_err(to_napi_error)?;
    for change in input.balance_changes {
        service
            .record_balance_change(&input.account_id, change.bucket, change.date, change.amount)
            .map_err(to_napi_error)?;
    }

    let result = service
        .calculate_statement_interest(&input.account_id, input.range)
        .map_err(to_napi_error)?;
    serde_json::to_string(&result).map_err(to_napi_error)
}

#[napi]
pub fn benchmark_statement_interest(input_json: String) -> NapiResult<String> {
    let input: StatementInterestInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;

    let service = SweepLineService::new();
    service
        .register_account(&input.account_id, input.rates)
        .map_err(to_napi_error)?;
    for change in input.balance_changes {
        service
            .record_balance_change(&input.account_id, change.bucket, change.date, change.amount)
            .map_err(to_napi_error)?;
    }

    let result = service
        .benchmark_statement_interest(&input.account_id, input.range)
        .map_err(to_napi_error)?;
    serde_json::to_string(&result).map_err(to_napi_error)
}
