use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::application::BankService;
use crate::domain::{AccountCategory, AccountStatus, format_money, parse_money};
use crate::io::Exporter;

/// Amanah - Sharia Banking Ledger
#[derive(Parser)]
#[command(name = "amanah")]
#[command(about = "A banking ledger for accounts, deposits and atomic transfers")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, default_value = "amanah.db")]
    pub database: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// User registry commands
    #[command(subcommand)]
    User(UserCommands),

    /// Account registry commands
    #[command(subcommand)]
    Account(AccountCommands),

    /// Deposit into an account
    Deposit {
        /// Account number
        number: String,

        /// Amount to deposit (e.g., "50.00" or "50")
        amount: String,
    },

    /// Withdraw from an account
    Withdraw {
        /// Account number
        number: String,

        /// Amount to withdraw (e.g., "50.00" or "50")
        amount: String,
    },

    /// Transfer between two accounts
    Transfer {
        /// Amount to transfer (e.g., "50.00" or "50")
        amount: String,

        /// Source account number
        #[arg(long)]
        from: String,

        /// Target account number
        #[arg(long)]
        to: String,

        /// Description of the transfer
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Charge an administration fee
    Fee {
        /// Account number
        number: String,

        /// Fee amount (e.g., "2.50")
        amount: String,

        /// Description of the fee
        #[arg(short, long)]
        description: Option<String>,
    },

    /// List transaction history
    History {
        /// Account number (omit for the whole ledger)
        number: Option<String>,

        /// Maximum number of records to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show one transaction record
    #[command(name = "show")]
    ShowTransaction {
        /// Transaction ID
        id: String,
    },

    /// Cross-check stored balances against the transaction log
    Audit,

    /// Export data to CSV or JSON
    Export {
        /// What to export: statement, balances, full
        export_type: String,

        /// Account number (required for statement export)
        #[arg(long)]
        account: Option<String>,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Register a new user
    Register {
        /// Full name
        name: String,

        /// Email address (must be unique)
        #[arg(short, long)]
        email: String,
    },

    /// List all users
    List,

    /// Deactivate a user
    Deactivate {
        /// Email address
        email: String,
    },
}

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Open a new account
    Open {
        /// Owner email address
        #[arg(long)]
        owner: String,

        /// Account category: wadiah, mudharabah, musyarakah
        #[arg(short, long)]
        category: String,

        /// Minimum balance floor (e.g., "0" or "100.00")
        #[arg(short, long, default_value = "0")]
        minimum_balance: String,
    },

    /// List accounts
    List {
        /// Include closed accounts
        #[arg(long)]
        all: bool,

        /// Only accounts owned by this email
        #[arg(long)]
        owner: Option<String>,
    },

    /// Show detailed account information
    Show {
        /// Account number
        number: String,
    },

    /// Block an account (refuses all movement)
    Block {
        /// Account number
        number: String,
    },

    /// Unblock an account
    Unblock {
        /// Account number
        number: String,
    },

    /// Close an account (soft delete)
    Close {
        /// Account number
        number: String,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Init => {
                BankService::init(&self.database).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::User(user_cmd) => {
                let service = BankService::connect(&self.database).await?;
                run_user_command(&service, user_cmd).await?;
            }

            Commands::Account(account_cmd) => {
                let service = BankService::connect(&self.database).await?;
                run_account_command(&service, account_cmd).await?;
            }

            Commands::Deposit { number, amount } => {
                let service = BankService::connect(&self.database).await?;
                let amount =
                    parse_money(&amount).context("Invalid amount format. Use '50.00' or '50'")?;

                let record = service.deposit(&number, amount).await?;
                println!(
                    "Deposited {} into {} (balance {}, id {})",
                    format_money(record.amount),
                    record.source_account,
                    format_money(record.balance_after),
                    record.id
                );
            }

            Commands::Withdraw { number, amount } => {
                let service = BankService::connect(&self.database).await?;
                let amount =
                    parse_money(&amount).context("Invalid amount format. Use '50.00' or '50'")?;

                let record = service.withdraw(&number, amount).await?;
                println!(
                    "Withdrew {} from {} (balance {}, id {})",
                    format_money(record.amount),
                    record.source_account,
                    format_money(record.balance_after),
                    record.id
                );
            }

            Commands::Transfer {
                amount,
                from,
                to,
                description,
            } => {
                let service = BankService::connect(&self.database).await?;
                let amount =
                    parse_money(&amount).context("Invalid amount format. Use '50.00' or '50'")?;

                let record = service.transfer(&from, &to, amount, description).await?;
                println!(
                    "Transferred {} {} -> {} (source balance {}, id {})",
                    format_money(record.amount),
                    record.source_account,
                    record.target_account.as_deref().unwrap_or("-"),
                    format_money(record.balance_after),
                    record.id
                );
            }

            Commands::Fee {
                number,
                amount,
                description,
            } => {
                let service = BankService::connect(&self.database).await?;
                let amount =
                    parse_money(&amount).context("Invalid amount format. Use '2.50'")?;

                let record = service.charge_fee(&number, amount, description).await?;
                println!(
                    "Charged fee {} on {} (balance {}, id {})",
                    format_money(record.amount),
                    record.source_account,
                    format_money(record.balance_after),
                    record.id
                );
            }

            Commands::History { number, limit } => {
                let service = BankService::connect(&self.database).await?;
                run_history_command(&service, number.as_deref(), limit).await?;
            }

            Commands::ShowTransaction { id } => {
                let service = BankService::connect(&self.database).await?;
                let transaction_id = Uuid::parse_str(&id)
                    .context("Invalid transaction ID format (expected UUID)")?;

                let record = service.get_transaction(transaction_id).await?;
                println!("Transaction: {}", record.id);
                println!("  Sequence:      {}", record.sequence);
                println!("  Type:          {}", record.tx_type);
                println!("  Status:        {}", record.status);
                println!("  Amount:        {}", format_money(record.amount));
                println!("  Source:        {}", record.source_account);
                if let Some(target) = &record.target_account {
                    println!("  Target:        {}", target);
                }
                println!("  Balance after: {}", format_money(record.balance_after));
                if let Some(desc) = &record.description {
                    println!("  Description:   {}", desc);
                }
                println!(
                    "  Recorded:      {}",
                    record.created_at.format("%Y-%m-%d %H:%M:%S")
                );
            }

            Commands::Audit => {
                let service = BankService::connect(&self.database).await?;
                run_audit_command(&service).await?;
            }

            Commands::Export {
                export_type,
                account,
                output,
            } => {
                let service = BankService::connect(&self.database).await?;
                run_export_command(&service, &export_type, account.as_deref(), output.as_deref())
                    .await?;
            }
        }

        Ok(())
    }
}

async fn run_user_command(service: &BankService, cmd: UserCommands) -> Result<()> {
    match cmd {
        UserCommands::Register { name, email } => {
            let user = service.register_user(name, email).await?;
            println!("Registered user: {} <{}>", user.full_name, user.email);
        }

        UserCommands::List => {
            let users = service.list_users().await?;
            if users.is_empty() {
                println!("No users registered.");
            } else {
                println!("{:<30} {:<30} {:<8}", "EMAIL", "NAME", "ACTIVE");
                println!("{}", "-".repeat(70));
                for user in users {
                    println!(
                        "{:<30} {:<30} {:<8}",
                        user.email,
                        user.full_name,
                        if user.active { "yes" } else { "no" }
                    );
                }
            }
        }

        UserCommands::Deactivate { email } => {
            let user = service.deactivate_user(&email).await?;
            println!("Deactivated user: {}", user.email);
        }
    }
    Ok(())
}

async fn run_account_command(service: &BankService, cmd: AccountCommands) -> Result<()> {
    match cmd {
        AccountCommands::Open {
            owner,
            category,
            minimum_balance,
        } => {
            let category = AccountCategory::from_str(&category).ok_or_else(|| {
                anyhow::anyhow!(
                    "Invalid category '{}'. Valid categories: wadiah, mudharabah, musyarakah",
                    category
                )
            })?;
            let minimum_balance = parse_money(&minimum_balance)
                .context("Invalid minimum balance format. Use '100.00' or '0'")?;

            let account = service
                .open_account(&owner, category, minimum_balance)
                .await?;
            println!("Opened {} account {}", account.category, account.number);
        }

        AccountCommands::List { all, owner } => {
            let accounts = match owner {
                Some(email) => service.list_accounts_for_owner(&email).await?,
                None => service.list_accounts(all).await?,
            };

            if accounts.is_empty() {
                println!("No accounts found.");
            } else {
                println!(
                    "{:<14} {:<12} {:<10} {:>14} {:>14}",
                    "NUMBER", "CATEGORY", "STATUS", "BALANCE", "MINIMUM"
                );
                println!("{}", "-".repeat(68));
                for account in accounts {
                    println!(
                        "{:<14} {:<12} {:<10} {:>14} {:>14}",
                        account.number,
                        account.category.to_string(),
                        account.status.to_string(),
                        format_money(account.balance),
                        format_money(account.minimum_balance)
                    );
                }
            }
        }

        AccountCommands::Show { number } => {
            let info = service.account_info(&number).await?;
            let account = &info.account;

            println!("Account: {}", account.number);
            println!("  Owner:          {} <{}>", info.owner.full_name, info.owner.email);
            println!("  Category:       {}", account.category);
            println!("  Status:         {}", account.status);
            println!("  Balance:        {}", format_money(account.balance));
            println!("  Minimum:        {}", format_money(account.minimum_balance));
            println!(
                "  Created:        {}",
                account.created_at.format("%Y-%m-%d %H:%M:%S")
            );
            println!(
                "  Movements:      {} ({} in, {} out)",
                info.incoming_count + info.outgoing_count,
                info.incoming_count,
                info.outgoing_count
            );
            if let Some(last) = info.last_activity {
                println!("  Last activity:  {}", last.format("%Y-%m-%d %H:%M:%S"));
            }
        }

        AccountCommands::Block { number } => {
            service
                .set_account_status(&number, AccountStatus::Blocked)
                .await?;
            println!("Blocked account: {}", number);
        }

        AccountCommands::Unblock { number } => {
            service
                .set_account_status(&number, AccountStatus::Active)
                .await?;
            println!("Unblocked account: {}", number);
        }

        AccountCommands::Close { number } => {
            service.close_account(&number).await?;
            println!("Closed account: {}", number);
        }
    }
    Ok(())
}

async fn run_history_command(
    service: &BankService,
    number: Option<&str>,
    limit: Option<usize>,
) -> Result<()> {
    let transactions = service.list_transactions(number, limit).await?;

    if transactions.is_empty() {
        println!("No transactions found.");
        return Ok(());
    }

    println!(
        "{:<6} {:<20} {:<11} {:<9} {:>14} {:<14} {:<14} {:>14}",
        "SEQ", "DATE", "TYPE", "STATUS", "AMOUNT", "SOURCE", "TARGET", "BALANCE"
    );
    println!("{}", "-".repeat(108));
    for tx in transactions {
        println!(
            "{:<6} {:<20} {:<11} {:<9} {:>14} {:<14} {:<14} {:>14}",
            tx.sequence,
            tx.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            tx.tx_type.to_string(),
            tx.status.to_string(),
            format_money(tx.amount),
            tx.source_account,
            tx.target_account.as_deref().unwrap_or("-"),
            format_money(tx.balance_after)
        );
    }
    Ok(())
}

async fn run_audit_command(service: &BankService) -> Result<()> {
    let report = service.audit().await?;

    println!("Ledger audit");
    println!("  Accounts:       {}", report.account_count);
    println!("  Transactions:   {}", report.transaction_count);

    if report.is_clean() {
        println!("  Result:         OK");
        return Ok(());
    }

    println!("  Result:         PROBLEMS FOUND");
    for mismatch in &report.mismatches {
        println!(
            "  - balance mismatch on {}: stored {}, replayed {}",
            mismatch.account_number,
            format_money(mismatch.stored),
            format_money(mismatch.replayed)
        );
    }
    for number in &report.floor_violations {
        println!("  - account {} sits below its floor", number);
    }
    if report.has_sequence_gaps {
        println!("  - transaction sequence has gaps");
    }
    if report.orphan_account_refs > 0 {
        println!(
            "  - {} transaction(s) reference unknown accounts",
            report.orphan_account_refs
        );
    }
    if report.non_positive_amounts > 0 {
        println!(
            "  - {} transaction(s) carry non-positive amounts",
            report.non_positive_amounts
        );
    }
    Ok(())
}

async fn run_export_command(
    service: &BankService,
    export_type: &str,
    account: Option<&str>,
    output: Option<&str>,
) -> Result<()> {
    use std::fs::File;
    use std::io::{Write, stdout};

    let exporter = Exporter::new(service);

    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    match export_type {
        "statement" => {
            let number =
                account.context("Statement export needs --account <number>")?;
            let count = exporter.export_statement_csv(number, writer).await?;
            eprintln!("Exported {} record(s)", count);
        }
        "balances" => {
            let count = exporter.export_balances_csv(writer).await?;
            eprintln!("Exported {} account(s)", count);
        }
        "full" => {
            let snapshot = exporter.export_full_json(writer).await?;
            eprintln!(
                "Exported {} user(s), {} account(s), {} transaction(s)",
                snapshot.users.len(),
                snapshot.accounts.len(),
                snapshot.transactions.len()
            );
        }
        other => {
            anyhow::bail!(
                "Unknown export type '{}'. Valid types: statement, balances, full",
                other
            );
        }
    }
    Ok(())
}
