use std::{error::Error, io::Write, path::PathBuf};

use clap::{Args, Parser, Subcommand};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    style::Print,
    terminal,
    terminal::ClearType,
};
use engine::{Engine, PaymentKind, PersonKind, Snapshot};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(name = "khata")]
#[command(about = "Personal bookkeeping: running balances per customer/supplier")]
struct Cli {
    /// Database connection string (also read from `KHATA_DATABASE_URL`).
    #[arg(
        long,
        env = "KHATA_DATABASE_URL",
        default_value = "sqlite:./khata.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage accounts
    User(User),
    /// Manage counterparties
    Person(Person),
    /// Record and edit transactions
    Tx(Tx),
    /// One person's transactions and window totals
    Statement(StatementArgs),
    /// Lifetime credit/debit rollup for one kind of counterparty
    Summary(SummaryArgs),
    /// The whole-ledger balance sheet
    Sheet(SheetArgs),
    /// Write the structured backup document
    Export(ExportArgs),
    /// Write the raw whole-table dump
    ExportTables(ExportTablesArgs),
    /// Restore a structured backup document
    Import(ImportArgs),
}

#[derive(Args, Debug)]
struct User {
    #[command(subcommand)]
    command: UserCommand,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    Create(UserArgs),
    Login(UserArgs),
}

#[derive(Args, Debug)]
struct UserArgs {
    #[arg(long)]
    email: String,
}

#[derive(Args, Debug)]
struct Person {
    #[command(subcommand)]
    command: PersonCommand,
}

#[derive(Subcommand, Debug)]
enum PersonCommand {
    Add(PersonAddArgs),
    List(PersonListArgs),
    Update(PersonUpdateArgs),
    Remove(PersonRemoveArgs),
}

#[derive(Args, Debug)]
struct PersonAddArgs {
    #[arg(long)]
    user_id: i32,
    #[arg(long)]
    name: String,
    #[arg(long, value_parser = parse_person_kind)]
    kind: PersonKind,
    #[arg(long)]
    mobile: Option<String>,
}

#[derive(Args, Debug)]
struct PersonListArgs {
    #[arg(long)]
    user_id: i32,
    #[arg(long, value_parser = parse_person_kind)]
    kind: PersonKind,
}

#[derive(Args, Debug)]
struct PersonUpdateArgs {
    #[arg(long)]
    id: i32,
    #[arg(long)]
    name: String,
    #[arg(long)]
    mobile: Option<String>,
}

#[derive(Args, Debug)]
struct PersonRemoveArgs {
    #[arg(long)]
    id: i32,
}

#[derive(Args, Debug)]
struct Tx {
    #[command(subcommand)]
    command: TxCommand,
}

#[derive(Subcommand, Debug)]
enum TxCommand {
    Add(TxAddArgs),
    Update(TxUpdateArgs),
    Remove(TxRemoveArgs),
}

#[derive(Args, Debug)]
struct TxAddArgs {
    #[arg(long)]
    person_id: i32,
    #[arg(long)]
    amount: f64,
    #[arg(long, value_parser = parse_payment_kind)]
    kind: PaymentKind,
    #[arg(long, default_value = "")]
    description: String,
    /// Transaction date; defaults to today.
    #[arg(long)]
    date: Option<String>,
    /// Transaction time; defaults to now.
    #[arg(long)]
    time: Option<String>,
}

#[derive(Args, Debug)]
struct TxUpdateArgs {
    #[arg(long)]
    id: i32,
    #[arg(long)]
    person_id: i32,
    #[arg(long)]
    amount: f64,
    #[arg(long, default_value = "")]
    description: String,
}

#[derive(Args, Debug)]
struct TxRemoveArgs {
    #[arg(long)]
    id: i32,
}

#[derive(Args, Debug)]
struct StatementArgs {
    #[arg(long)]
    person_id: i32,
    #[arg(long)]
    from: Option<String>,
    #[arg(long)]
    to: Option<String>,
    /// Write the rows as CSV instead of printing them.
    #[arg(long)]
    csv: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct SummaryArgs {
    #[arg(long)]
    user_id: i32,
    #[arg(long, value_parser = parse_person_kind)]
    kind: PersonKind,
}

#[derive(Args, Debug)]
struct SheetArgs {
    #[arg(long)]
    user_id: i32,
}

#[derive(Args, Debug)]
struct ExportArgs {
    #[arg(long)]
    user_id: i32,
    #[arg(long)]
    out: PathBuf,
}

#[derive(Args, Debug)]
struct ExportTablesArgs {
    #[arg(long)]
    out: PathBuf,
}

#[derive(Args, Debug)]
struct ImportArgs {
    #[arg(long)]
    user_id: i32,
    #[arg(long)]
    file: PathBuf,
}

fn parse_person_kind(raw: &str) -> Result<PersonKind, String> {
    PersonKind::try_from(raw).map_err(|err| err.to_string())
}

fn parse_payment_kind(raw: &str) -> Result<PaymentKind, String> {
    PaymentKind::try_from(raw).map_err(|err| err.to_string())
}

struct RawModeGuard;

impl RawModeGuard {
    fn enter() -> Result<Self, Box<dyn Error + Send + Sync>> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

fn prompt_password(prompt: &str) -> Result<String, Box<dyn Error + Send + Sync>> {
    let _raw = RawModeGuard::enter()?;

    let mut out = std::io::stderr();
    execute!(
        out,
        cursor::MoveToColumn(0),
        terminal::Clear(ClearType::CurrentLine),
        Print(prompt)
    )?;
    out.flush()?;

    let mut buf = String::new();
    loop {
        let Event::Key(KeyEvent {
            code, modifiers, ..
        }) = event::read()?
        else {
            continue;
        };

        match code {
            KeyCode::Enter => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                break;
            }
            KeyCode::Backspace => {
                if buf.pop().is_some() {
                    execute!(out, cursor::MoveLeft(1), Print(" "), cursor::MoveLeft(1))?;
                    out.flush()?;
                }
            }
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                return Err("interrupted".into());
            }
            KeyCode::Char(ch) if !modifiers.contains(KeyModifiers::CONTROL) => {
                buf.push(ch);
                execute!(out, Print("*"))?;
                out.flush()?;
            }
            _ => {}
        }
    }

    Ok(buf)
}

fn prompt_password_twice() -> Result<String, Box<dyn Error + Send + Sync>> {
    for _ in 0..3 {
        let first = prompt_password("Password: ")?;
        if first.is_empty() {
            eprintln!("Password must not be empty.");
            continue;
        }

        let second = prompt_password("Confirm password: ")?;
        if first == second {
            return Ok(first);
        }
        eprintln!("Passwords do not match. Try again.");
    }

    Err("too many attempts".into())
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    tracing::debug!("database ready at {database_url}");
    Ok(db)
}

fn format_amount(value: f64) -> String {
    format!("{value:.2}")
}

#[derive(Serialize)]
struct StatementRow {
    date: String,
    time: String,
    payment_type: &'static str,
    amount: f64,
    description: String,
    balance: Option<f64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("KHATA_LOG").unwrap_or_else(|_| "khata=info,engine=info".to_string()),
        )
        .with_writer(std::io::stderr)
        .init();

    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder().database(db).build().await?;

    match cli.command {
        Command::User(User {
            command: UserCommand::Create(args),
        }) => {
            let password = prompt_password_twice()?;
            let user_id = engine.register_user(&args.email, &password).await?;
            println!("created user {} (id {user_id})", args.email);
        }
        Command::User(User {
            command: UserCommand::Login(args),
        }) => {
            let password = prompt_password("Password: ")?;
            let user_id = engine.authenticate_user(&args.email, &password).await?;
            println!("user id {user_id}");
        }
        Command::Person(Person {
            command: PersonCommand::Add(args),
        }) => {
            let person_id = engine
                .add_person(args.user_id, &args.name, args.kind, args.mobile.as_deref())
                .await?;
            println!("added {} {} (id {person_id})", args.kind, args.name);
        }
        Command::Person(Person {
            command: PersonCommand::List(args),
        }) => {
            let people = engine.list_people(args.user_id, args.kind).await?;
            if people.is_empty() {
                println!("no {}s yet", args.kind);
            }
            for person in people {
                println!(
                    "{:>5}  {:<24} {:<16} {:>12}",
                    person.id,
                    person.name,
                    person.mobile_number.as_deref().unwrap_or("-"),
                    format_amount(person.balance),
                );
            }
        }
        Command::Person(Person {
            command: PersonCommand::Update(args),
        }) => {
            engine
                .update_person(args.id, &args.name, args.mobile.as_deref())
                .await?;
            println!("updated person {}", args.id);
        }
        Command::Person(Person {
            command: PersonCommand::Remove(args),
        }) => {
            engine.delete_person(args.id).await?;
            println!("removed person {} and their transactions", args.id);
        }
        Command::Tx(Tx {
            command: TxCommand::Add(args),
        }) => {
            let now = chrono::Local::now();
            let date = args
                .date
                .unwrap_or_else(|| now.format("%Y-%m-%d").to_string());
            let time = args
                .time
                .unwrap_or_else(|| now.format("%H:%M:%S").to_string());
            let tx_id = engine
                .add_transaction(
                    args.person_id,
                    args.amount,
                    &args.description,
                    &date,
                    &time,
                    args.kind,
                )
                .await?;
            println!("recorded {} of {} (id {tx_id})", args.kind.as_str(), format_amount(args.amount));
        }
        Command::Tx(Tx {
            command: TxCommand::Update(args),
        }) => {
            engine
                .update_transaction(args.id, args.person_id, args.amount, &args.description)
                .await?;
            println!("updated transaction {}", args.id);
        }
        Command::Tx(Tx {
            command: TxCommand::Remove(args),
        }) => {
            engine.delete_transaction(args.id).await?;
            println!("removed transaction {}", args.id);
        }
        Command::Statement(args) => {
            let person = engine.person(args.person_id).await?;
            let statement = engine
                .statement(args.person_id, args.from.as_deref(), args.to.as_deref())
                .await?;

            if let Some(path) = args.csv {
                let mut writer = csv::Writer::from_path(&path)?;
                for tx in &statement.transactions {
                    writer.serialize(StatementRow {
                        date: tx.date.to_string(),
                        time: tx.time.to_string(),
                        payment_type: tx.kind.as_str(),
                        amount: tx.amount,
                        description: tx.description.clone(),
                        balance: tx.balance,
                    })?;
                }
                writer.flush()?;
                println!(
                    "wrote {} rows for {} to {}",
                    statement.transactions.len(),
                    person.name,
                    path.display()
                );
            } else {
                println!("statement for {}", person.name);
                for tx in &statement.transactions {
                    println!(
                        "{:>5}  {} {}  {:<6} {:>12}  {:>12}  {}",
                        tx.id,
                        tx.date,
                        tx.time,
                        tx.kind.as_str(),
                        format_amount(tx.amount),
                        tx.balance.map(format_amount).unwrap_or_else(|| "-".into()),
                        tx.description,
                    );
                }
                println!(
                    "credit {}  debit {}  balance {}",
                    format_amount(statement.total_credit),
                    format_amount(statement.total_debit),
                    format_amount(statement.total_balance),
                );
            }
        }
        Command::Summary(args) => {
            let totals = engine.credits_and_debits(args.user_id, args.kind).await?;
            println!(
                "{}s: credit {}  debit {}  remaining {}",
                args.kind,
                format_amount(totals.total_credit),
                format_amount(totals.total_debit),
                format_amount(totals.remaining_debit),
            );
        }
        Command::Sheet(args) => {
            let sheet = engine.balance_sheet(args.user_id, None, None).await?;
            for entry in &sheet.entries {
                println!(
                    "{:<24} {:<8} credit {:>12}  debit {:>12}  balance {:>12}  [{}]",
                    entry.person_name,
                    entry.kind,
                    format_amount(entry.total_credit),
                    format_amount(entry.total_debit),
                    entry.balance.map(format_amount).unwrap_or_else(|| "-".into()),
                    entry.status.as_str(),
                );
            }
            println!(
                "received: customers {} suppliers {}",
                format_amount(sheet.total_received.customer),
                format_amount(sheet.total_received.supplier),
            );
            println!(
                "spent:    customers {} suppliers {}",
                format_amount(sheet.total_spent.customer),
                format_amount(sheet.total_spent.supplier),
            );
            println!("net balance: {}", format_amount(sheet.net_balance));
        }
        Command::Export(args) => {
            let snapshot = engine.export_snapshot(args.user_id).await?;
            std::fs::write(&args.out, serde_json::to_string_pretty(&snapshot)?)?;
            println!(
                "exported {} customers, {} suppliers, {} transactions to {}",
                snapshot.customers.len(),
                snapshot.suppliers.len(),
                snapshot.transactions.len(),
                args.out.display()
            );
        }
        Command::ExportTables(args) => {
            let dump = engine.export_tables().await?;
            std::fs::write(&args.out, serde_json::to_string_pretty(&dump)?)?;
            println!(
                "dumped {} users, {} people, {} transactions to {}",
                dump.user.len(),
                dump.people.len(),
                dump.transactions.len(),
                args.out.display()
            );
        }
        Command::Import(args) => {
            let raw = std::fs::read_to_string(&args.file)?;
            let snapshot = Snapshot::from_json(&raw)?;
            let summary = engine.import_snapshot(args.user_id, &snapshot).await?;
            println!(
                "imported {} customers, {} suppliers, {} transactions ({} skipped)",
                summary.customers, summary.suppliers, summary.transactions, summary.skipped
            );
        }
    }

    Ok(())
}
