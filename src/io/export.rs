use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::BankService;
use crate::domain::{Account, Transaction, User, format_money};

/// Database snapshot for full export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub users: Vec<User>,
    pub accounts: Vec<Account>,
    pub transactions: Vec<Transaction>,
}

/// Exporter for converting ledger data to statements and snapshots
pub struct Exporter<'a> {
    service: &'a BankService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a BankService) -> Self {
        Self { service }
    }

    /// Export one account's statement to CSV format.
    pub async fn export_statement_csv<W: Write>(&self, number: &str, writer: W) -> Result<usize> {
        let transactions = self.service.list_transactions(Some(number), None).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "sequence",
            "timestamp",
            "type",
            "status",
            "amount",
            "source_account",
            "target_account",
            "balance_after",
            "description",
        ])?;

        let mut count = 0;
        for tx in &transactions {
            csv_writer.write_record([
                tx.sequence.to_string(),
                tx.created_at.to_rfc3339(),
                tx.tx_type.to_string(),
                tx.status.to_string(),
                format_money(tx.amount),
                tx.source_account.clone(),
                tx.target_account.clone().unwrap_or_default(),
                format_money(tx.balance_after),
                tx.description.clone().unwrap_or_default(),
            ])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export all open account balances to CSV format.
    pub async fn export_balances_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let accounts = self.service.list_accounts(false).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["number", "category", "status", "balance", "minimum_balance"])?;

        let mut count = 0;
        for account in &accounts {
            csv_writer.write_record([
                account.number.clone(),
                account.category.to_string(),
                account.status.to_string(),
                format_money(account.balance),
                format_money(account.minimum_balance),
            ])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export the full database as a JSON snapshot.
    pub async fn export_full_json<W: Write>(&self, mut writer: W) -> Result<DatabaseSnapshot> {
        let users = self.service.list_users().await?;
        let accounts = self.service.list_accounts(true).await?;
        let transactions = self.service.list_transactions(None, None).await?;

        let snapshot = DatabaseSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            users,
            accounts,
            transactions,
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(snapshot)
    }
}
