use std::collections::BTreeMap;

use clap::Args;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use corp_finance_core::credit_card::{
    AllocationRequest, AllocationService, BalanceBucket, BalanceChange, DateRange, DebtBucket,
    SweepLineService, DEFAULT_GRANULARITY,
};

use crate::input;

fn read_input<T: serde::de::DeserializeOwned>(
    input_path: &Option<String>,
) -> Result<T, Box<dyn std::error::Error>> {
    if let Some(path) = input_path {
        input::file::read_json(path)
    } else if let Some(data) = input::stdin::read_stdin()? {
        Ok(serde_json::from_value(data)?)
    } else {
        Err("provide --input <file> or pipe JSON on stdin".into())
    }
}

/// Arguments shared by all credit-card subcommands: everything comes from a
/// JSON document, either a file or stdin, matching the teacher's
/// JSON-in/JSON-out commands.
#[derive(Args)]
pub struct CreditCardArgs {
    /// Path to JSON input file (otherwise read from stdin)
    #[arg(long)]
    pub input: Option<String>,
}

#[derive(Deserialize)]
struct AllocatePaymentInput {
    account_id: String,
    buckets: Vec<DebtBucket>,
    payment_amount: Decimal,
    #[serde(default = "default_strategy")]
    strategy: String,
    granularity: Option<i64>,
}

fn default_strategy() -> String {
    "bank_rule".to_string()
}

pub fn run_allocate_payment(args: CreditCardArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let input: AllocatePaymentInput = read_input(&args.input)?;

    let service = AllocationService::new();
    service.set_account_buckets(&input.account_id, input.buckets);

    let request = match input.strategy.as_str() {
        "dp_optimal" => AllocationRequest::DpOptimal {
            granularity: input.granularity.unwrap_or(DEFAULT_GRANULARITY),
        },
        "bank_rule" => AllocationRequest::BankRule,
        other => return Err(format!("unknown strategy '{other}'; expected bank_rule or dp_optimal").into()),
    };

    let result = service.allocate_payment(&input.account_id, input.payment_amount, request)?;
    Ok(serde_json::to_value(result)?)
}

#[derive(Deserialize)]
struct CompareStrategiesInput {
    account_id: String,
    buckets: Vec<DebtBucket>,
    payment_amount: Decimal,
}

pub fn run_compare_all_strategies(
    args: CreditCardArgs,
) -> Result<Value, Box<dyn std::error::Error>> {
    let input: CompareStrategiesInput = read_input(&args.input)?;

    let service = AllocationService::new();
    service.set_account_buckets(&input.account_id, input.buckets);

    let comparison = service.compare_all_strategies(&input.account_id, input.payment_amount)?;
    Ok(serde_json::to_value(comparison)?)
}

#[derive(Deserialize)]
struct StatementInterestInput {
    account_id: String,
    rates: BTreeMap<BalanceBucket, Decimal>,
    balance_changes: Vec<BalanceChange>,
    range: DateRange,
}

pub fn run_calculate_statement_interest(
    args: CreditCardArgs,
) -> Result<Value, Box<dyn std::error::Error>> {
    let input: StatementInterestInput = read_input(&args.input)?;

    let service = SweepLineService::new();
    service.register_account(&input.account_id, input.rates)?;
    for change in input.balance_changes {
        service.record_balance_change(&input.account_id, change.bucket, change.date, change.amount)?;
    }

    let result = service.calculate_statement_interest(&input.account_id, input.range)?;
    Ok(serde_json::to_value(result)?)
}
