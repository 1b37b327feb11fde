mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::credit_card::CreditCardArgs;

/// Revolving-credit payment allocation and interest accrual calculations
#[derive(Parser)]
#[command(
    name = "cfa",
    version,
    about = "Revolving-credit payment allocation and interest accrual calculations",
    long_about = "A CLI for credit-card / revolving-account analytics: payment allocation \
                  (greedy priority rule and dynamic-programming optimal split) and interest \
                  accrual (sweep-line balances cross-checked against a brute-force reference)."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Allocate a payment across an account's debt buckets
    AllocatePayment(CreditCardArgs),
    /// Run bank-rule and DP-optimal allocation side by side
    CompareAllStrategies(CreditCardArgs),
    /// Compute statement interest, cross-checked against the brute-force reference
    CalculateStatementInterest(CreditCardArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::AllocatePayment(args) => commands::credit_card::run_allocate_payment(args),
        Commands::CompareAllStrategies(args) => {
            commands::credit_card::run_compare_all_strategies(args)
        }
        Commands::CalculateStatementInterest(args) => {
            commands::credit_card::run_calculate_statement_interest(args)
        }
        Commands::Version => {
            println!("cfa {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
