//! loan-runner: headless driver for the lending core.
//!
//! Usage:
//!   loan-runner --db lending.db create-user --name Alice
//!   loan-runner --db lending.db create --owner 1 --amount 5000 --currency VND --terms 3 --processed-at 2024-01-15
//!   loan-runner --db lending.db repay --loan 1 --amount 2000 --currency VND --received-at 2024-02-15
//!   loan-runner --db lending.db show --loan 1
//!   loan-runner --db lending.db --ipc-mode

use anyhow::{Context, Result};
use chrono::NaiveDate;
use lending_core::{
    config::LendingConfig,
    loan::{LoanWithSchedule, NewLoan, Repayment},
    service::LoanService,
    store::LoanStore,
    types::LoanId,
};
use std::env;
use std::io::{self, BufRead, Write};
use std::str::FromStr;

const COMMANDS: [&str; 4] = ["create-user", "create", "repay", "show"];

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    CreateUser { name: String },
    CreateLoan(NewLoan),
    RepayLoan(Repayment),
    GetLoan { loan_id: LoanId },
    Quit,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let mut config = match arg_str(&args, "--config") {
        Some(path) => LendingConfig::load(path)?,
        None => LendingConfig::default(),
    };
    if let Some(db) = arg_str(&args, "--db") {
        config.database_path = db.to_string();
    }

    let store = LoanStore::from_config(&config)
        .with_context(|| format!("Cannot open {}", config.database_path))?;
    store.migrate()?;
    let service = LoanService::new(store);

    if args.iter().any(|a| a == "--ipc-mode") {
        return run_ipc_loop(&service);
    }

    let command = args
        .iter()
        .skip(1)
        .find(|a| COMMANDS.contains(&a.as_str()))
        .map(String::as_str);

    match command {
        Some("create-user") => {
            let name = arg_str(&args, "--name").unwrap_or("borrower");
            let user_id = service.create_user(name)?;
            println!("user {user_id} created ({name})");
        }
        Some("create") => {
            let request = NewLoan {
                owner_id: required_arg(&args, "--owner")?,
                amount: required_arg(&args, "--amount")?,
                currency_code: currency(&args, &config),
                terms: required_arg(&args, "--terms")?,
                processed_at: required_arg::<NaiveDate>(&args, "--processed-at")?,
            };
            let created = service.create_loan(&request)?;
            print_loan(&created);
        }
        Some("repay") => {
            let request = Repayment {
                loan_id: required_arg(&args, "--loan")?,
                amount: required_arg(&args, "--amount")?,
                currency_code: currency(&args, &config),
                received_at: required_arg::<NaiveDate>(&args, "--received-at")?,
            };
            let repaid = service.repay_loan(&request)?;
            print_loan(&repaid);
        }
        Some("show") => {
            let loan_id: LoanId = required_arg(&args, "--loan")?;
            print_loan(&service.loan(loan_id)?);
            for receipt in service.received_repayments(loan_id)? {
                println!(
                    "  received {} {} on {}",
                    receipt.amount, receipt.currency_code, receipt.received_at
                );
            }
        }
        _ => {
            eprintln!("usage: loan-runner [--db PATH] [--config PATH] <{}> [flags] | --ipc-mode", COMMANDS.join("|"));
            std::process::exit(2);
        }
    }

    Ok(())
}

fn run_ipc_loop(service: &LoanService) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                writeln!(stdout, "{}", serde_json::json!({ "error": e.to_string() }))?;
                stdout.flush()?;
                continue;
            }
        };

        let reply = match cmd {
            IpcCommand::Quit => break,
            IpcCommand::CreateUser { name } => service
                .create_user(&name)
                .map(|user_id| serde_json::json!({ "user_id": user_id })),
            IpcCommand::CreateLoan(request) => service
                .create_loan(&request)
                .and_then(|loan| Ok(serde_json::to_value(loan)?)),
            IpcCommand::RepayLoan(request) => service
                .repay_loan(&request)
                .and_then(|loan| Ok(serde_json::to_value(loan)?)),
            IpcCommand::GetLoan { loan_id } => service
                .loan(loan_id)
                .and_then(|loan| Ok(serde_json::to_value(loan)?)),
        };

        let line = reply.unwrap_or_else(|e| {
            log::warn!("ipc command failed: {e}");
            serde_json::json!({ "error": e.to_string() })
        });
        writeln!(stdout, "{line}")?;
        stdout.flush()?;
    }
    Ok(())
}

fn print_loan(loaded: &LoanWithSchedule) {
    let loan = &loaded.loan;
    println!("=== LOAN {} ===", loan.id);
    println!("  owner:        {}", loan.user_id);
    println!("  principal:    {} {}", loan.amount, loan.currency_code);
    println!("  terms:        {}", loan.terms);
    println!("  processed at: {}", loan.processed_at);
    println!("  outstanding:  {}", loan.outstanding_amount());
    println!("  status:       {}", loan.status().as_str());
    println!();
    println!("  #  due date     amount  outstanding  status");
    for (i, s) in loaded.scheduled_repayments.iter().enumerate() {
        println!(
            "  {:<2} {}  {:>7}  {:>11}  {}",
            i + 1,
            s.due_date,
            s.amount,
            s.outstanding_amount(),
            s.status().as_str()
        );
    }
}

fn currency(args: &[String], config: &LendingConfig) -> String {
    arg_str(args, "--currency")
        .map(str::to_string)
        .unwrap_or_else(|| config.default_currency.clone())
}

fn arg_str<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn required_arg<T>(args: &[String], flag: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = arg_str(args, flag).with_context(|| format!("missing required flag {flag}"))?;
    raw.parse()
        .map_err(|e| anyhow::anyhow!("invalid value for {flag} ({raw}): {e}"))
}
