use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::{
    Account, AccountCategory, AccountStatus, Money, Transaction, TransactionId, TransactionStatus,
    TransactionType, User, UserId,
};

use super::MIGRATION_001_INITIAL;

/// One ambient store transaction. Every money-movement operation runs its
/// reads, balance updates and record append inside a single one of these.
pub type StoreTx = sqlx::Transaction<'static, sqlx::Sqlite>;

/// Statistics backing the ledger audit.
#[derive(Debug, Clone)]
pub struct AuditStats {
    pub user_count: i64,
    pub account_count: i64,
    pub transaction_count: i64,
    pub has_sequence_gaps: bool,
    pub orphan_account_refs: i64,
    pub non_positive_amounts: i64,
}

/// Repository for persisting and querying users, accounts and the
/// transaction log.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given path.
    ///
    /// The pool is capped at a single connection: SQLite allows one writer
    /// at a time, and a second connection mid-write would surface as
    /// SQLITE_BUSY instead of queueing.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    /// Begin a store transaction.
    pub async fn begin(&self) -> Result<StoreTx> {
        self.pool
            .begin()
            .await
            .context("Failed to begin store transaction")
    }

    /// Commit a store transaction.
    pub async fn commit(&self, tx: StoreTx) -> Result<()> {
        tx.commit().await.context("Failed to commit store transaction")
    }

    /// Roll a store transaction back explicitly.
    pub async fn rollback(&self, tx: StoreTx) -> Result<()> {
        tx.rollback()
            .await
            .context("Failed to roll back store transaction")
    }

    // ========================
    // User operations
    // ========================

    /// Save a new user to the database.
    pub async fn save_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, full_name, email, active, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(user.id.to_string())
        .bind(&user.full_name)
        .bind(&user.email)
        .bind(user.active)
        .bind(user.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save user")?;
        Ok(())
    }

    /// Get a user by ID.
    pub async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, full_name, email, active, created_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch user")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_user(&row)?)),
            None => Ok(None),
        }
    }

    /// Get a user by email.
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, full_name, email, active, created_at
            FROM users
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch user by email")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_user(&row)?)),
            None => Ok(None),
        }
    }

    /// List all users.
    pub async fn list_users(&self) -> Result<Vec<User>> {
        let rows = sqlx::query(
            "SELECT id, full_name, email, active, created_at FROM users ORDER BY email",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list users")?;

        rows.iter().map(Self::row_to_user).collect()
    }

    /// Flip a user's active flag.
    pub async fn set_user_active(&self, id: UserId, active: bool) -> Result<()> {
        sqlx::query("UPDATE users SET active = ? WHERE id = ?")
            .bind(active)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to update user active flag")?;
        Ok(())
    }

    fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
        let id_str: String = row.get("id");
        let created_at_str: String = row.get("created_at");

        Ok(User {
            id: Uuid::parse_str(&id_str).context("Invalid user ID")?,
            full_name: row.get("full_name"),
            email: row.get("email"),
            active: row.get::<i32, _>("active") != 0,
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .context("Invalid created_at timestamp")?
                .with_timezone(&Utc),
        })
    }

    // ========================
    // Account operations
    // ========================

    /// Save a new account to the database.
    pub async fn save_account(&self, account: &Account) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO accounts (id, number, owner_id, category, balance, minimum_balance, status, created_at, closed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(account.id.to_string())
        .bind(&account.number)
        .bind(account.owner_id.to_string())
        .bind(account.category.as_str())
        .bind(account.balance)
        .bind(account.minimum_balance)
        .bind(account.status.as_str())
        .bind(account.created_at.to_rfc3339())
        .bind(account.closed_at.map(|dt| dt.to_rfc3339()))
        .execute(&self.pool)
        .await
        .context("Failed to save account")?;
        Ok(())
    }

    /// Check whether an account number is taken, closed rows included.
    pub async fn account_number_exists(&self, number: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM accounts WHERE number = ?")
            .bind(number)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to check account number")?;
        Ok(row.is_some())
    }

    /// Get an account by number, regardless of status.
    pub async fn get_account(&self, number: &str) -> Result<Option<Account>> {
        let row = sqlx::query(
            r#"
            SELECT id, number, owner_id, category, balance, minimum_balance, status, created_at, closed_at
            FROM accounts
            WHERE number = ?
            "#,
        )
        .bind(number)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch account")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_account(&row)?)),
            None => Ok(None),
        }
    }

    /// Get an account by number inside an ambient store transaction, so the
    /// balance read and the later update see the same row version.
    pub async fn get_account_in(&self, tx: &mut StoreTx, number: &str) -> Result<Option<Account>> {
        let row = sqlx::query(
            r#"
            SELECT id, number, owner_id, category, balance, minimum_balance, status, created_at, closed_at
            FROM accounts
            WHERE number = ?
            "#,
        )
        .bind(number)
        .fetch_optional(&mut **tx)
        .await
        .context("Failed to fetch account")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_account(&row)?)),
            None => Ok(None),
        }
    }

    /// List accounts (optionally including closed ones).
    pub async fn list_accounts(&self, include_closed: bool) -> Result<Vec<Account>> {
        let query = if include_closed {
            "SELECT id, number, owner_id, category, balance, minimum_balance, status, created_at, closed_at FROM accounts ORDER BY number"
        } else {
            "SELECT id, number, owner_id, category, balance, minimum_balance, status, created_at, closed_at FROM accounts WHERE closed_at IS NULL ORDER BY number"
        };

        let rows = sqlx::query(query)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list accounts")?;

        rows.iter().map(Self::row_to_account).collect()
    }

    /// List the open accounts owned by one user.
    pub async fn list_accounts_for_owner(&self, owner_id: UserId) -> Result<Vec<Account>> {
        let rows = sqlx::query(
            r#"
            SELECT id, number, owner_id, category, balance, minimum_balance, status, created_at, closed_at
            FROM accounts
            WHERE owner_id = ? AND closed_at IS NULL
            ORDER BY number
            "#,
        )
        .bind(owner_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list accounts for owner")?;

        rows.iter().map(Self::row_to_account).collect()
    }

    /// Overwrite an account's balance inside an ambient store transaction.
    /// Only the money-movement operations call this.
    pub async fn set_balance_in(
        &self,
        tx: &mut StoreTx,
        number: &str,
        balance: Money,
    ) -> Result<()> {
        sqlx::query("UPDATE accounts SET balance = ? WHERE number = ?")
            .bind(balance)
            .bind(number)
            .execute(&mut **tx)
            .await
            .context("Failed to update balance")?;
        Ok(())
    }

    /// Update an account's status (and soft-delete stamp).
    pub async fn set_account_status(
        &self,
        number: &str,
        status: AccountStatus,
        closed_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        sqlx::query("UPDATE accounts SET status = ?, closed_at = ? WHERE number = ?")
            .bind(status.as_str())
            .bind(closed_at.map(|dt| dt.to_rfc3339()))
            .bind(number)
            .execute(&self.pool)
            .await
            .context("Failed to update account status")?;
        Ok(())
    }

    fn row_to_account(row: &sqlx::sqlite::SqliteRow) -> Result<Account> {
        let id_str: String = row.get("id");
        let owner_id_str: String = row.get("owner_id");
        let category_str: String = row.get("category");
        let status_str: String = row.get("status");
        let created_at_str: String = row.get("created_at");
        let closed_at_str: Option<String> = row.get("closed_at");

        Ok(Account {
            id: Uuid::parse_str(&id_str).context("Invalid account ID")?,
            number: row.get("number"),
            owner_id: Uuid::parse_str(&owner_id_str).context("Invalid owner ID")?,
            category: AccountCategory::from_str(&category_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid account category: {}", category_str))?,
            balance: row.get("balance"),
            minimum_balance: row.get("minimum_balance"),
            status: AccountStatus::from_str(&status_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid account status: {}", status_str))?,
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .context("Invalid created_at timestamp")?
                .with_timezone(&Utc),
            closed_at: closed_at_str
                .map(|s| DateTime::parse_from_rfc3339(&s))
                .transpose()
                .context("Invalid closed_at timestamp")?
                .map(|dt| dt.with_timezone(&Utc)),
        })
    }

    // ========================
    // Transaction log
    // ========================

    /// Append a transaction record in its own store transaction.
    /// Automatically assigns the next sequence number.
    pub async fn append_transaction(&self, record: &mut Transaction) -> Result<()> {
        let mut tx = self.begin().await?;
        self.append_transaction_in(&mut tx, record).await?;
        self.commit(tx).await
    }

    /// Append a transaction record inside an ambient store transaction.
    /// The record is inserted, never updated: settled rows are immutable.
    pub async fn append_transaction_in(
        &self,
        tx: &mut StoreTx,
        record: &mut Transaction,
    ) -> Result<()> {
        record.sequence = self.next_sequence_in(tx).await?;

        sqlx::query(
            r#"
            INSERT INTO transactions (id, sequence, tx_type, status, amount, source_account, target_account, balance_after, description, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id.to_string())
        .bind(record.sequence)
        .bind(record.tx_type.as_str())
        .bind(record.status.as_str())
        .bind(record.amount)
        .bind(&record.source_account)
        .bind(&record.target_account)
        .bind(record.balance_after)
        .bind(&record.description)
        .bind(record.created_at.to_rfc3339())
        .execute(&mut **tx)
        .await
        .context("Failed to append transaction")?;

        Ok(())
    }

    /// Claim the next sequence number from the counter row.
    async fn next_sequence_in(&self, tx: &mut StoreTx) -> Result<i64> {
        let row = sqlx::query(
            r#"
            UPDATE sequence_counter
            SET value = value + 1
            WHERE name = 'transaction_sequence'
            RETURNING value
            "#,
        )
        .fetch_one(&mut **tx)
        .await
        .context("Failed to claim next sequence number")?;

        Ok(row.get("value"))
    }

    /// Get a transaction record by ID.
    pub async fn get_transaction(&self, id: TransactionId) -> Result<Option<Transaction>> {
        let row = sqlx::query(
            r#"
            SELECT id, sequence, tx_type, status, amount, source_account, target_account, balance_after, description, created_at
            FROM transactions
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch transaction")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_transaction(&row)?)),
            None => Ok(None),
        }
    }

    /// List transactions in sequence order.
    pub async fn list_transactions(&self, limit: Option<usize>) -> Result<Vec<Transaction>> {
        let mut query = String::from(
            "SELECT id, sequence, tx_type, status, amount, source_account, target_account, balance_after, description, created_at FROM transactions ORDER BY sequence",
        );
        if let Some(lim) = limit {
            query.push_str(&format!(" LIMIT {}", lim));
        }

        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list transactions")?;

        rows.iter().map(Self::row_to_transaction).collect()
    }

    /// List the transactions touching one account (as source or target).
    pub async fn list_transactions_for_account(
        &self,
        number: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Transaction>> {
        let mut query = String::from(
            "SELECT id, sequence, tx_type, status, amount, source_account, target_account, balance_after, description, created_at FROM transactions WHERE source_account = ? OR target_account = ? ORDER BY sequence",
        );
        if let Some(lim) = limit {
            query.push_str(&format!(" LIMIT {}", lim));
        }

        let rows = sqlx::query(&query)
            .bind(number)
            .bind(number)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list transactions for account")?;

        rows.iter().map(Self::row_to_transaction).collect()
    }

    /// Count settled incoming/outgoing movements for an account. Deposits
    /// count as incoming even though the account sits in the source column.
    pub async fn count_transactions_for_account(&self, number: &str) -> Result<(i64, i64)> {
        let row = sqlx::query(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN target_account = ? OR (source_account = ? AND tx_type = 'deposit') THEN 1 ELSE 0 END), 0) as incoming,
                COALESCE(SUM(CASE WHEN source_account = ? AND tx_type != 'deposit' THEN 1 ELSE 0 END), 0) as outgoing
            FROM transactions
            WHERE status = 'success' AND (source_account = ? OR target_account = ?)
            "#,
        )
        .bind(number)
        .bind(number)
        .bind(number)
        .bind(number)
        .bind(number)
        .fetch_one(&self.pool)
        .await
        .context("Failed to count transactions")?;

        Ok((row.get("incoming"), row.get("outgoing")))
    }

    /// Get the last movement timestamp for an account.
    pub async fn get_last_activity(&self, number: &str) -> Result<Option<DateTime<Utc>>> {
        let row = sqlx::query(
            r#"
            SELECT MAX(created_at) as last_activity
            FROM transactions
            WHERE source_account = ? OR target_account = ?
            "#,
        )
        .bind(number)
        .bind(number)
        .fetch_one(&self.pool)
        .await
        .context("Failed to get last activity")?;

        let last_activity_str: Option<String> = row.get("last_activity");
        match last_activity_str {
            Some(s) => Ok(Some(
                DateTime::parse_from_rfc3339(&s)
                    .context("Invalid timestamp")?
                    .with_timezone(&Utc),
            )),
            None => Ok(None),
        }
    }

    fn row_to_transaction(row: &sqlx::sqlite::SqliteRow) -> Result<Transaction> {
        let id_str: String = row.get("id");
        let tx_type_str: String = row.get("tx_type");
        let status_str: String = row.get("status");
        let created_at_str: String = row.get("created_at");

        Ok(Transaction {
            id: Uuid::parse_str(&id_str).context("Invalid transaction ID")?,
            sequence: row.get("sequence"),
            tx_type: TransactionType::from_str(&tx_type_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid transaction type: {}", tx_type_str))?,
            status: TransactionStatus::from_str(&status_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid transaction status: {}", status_str))?,
            amount: row.get("amount"),
            source_account: row.get("source_account"),
            target_account: row.get("target_account"),
            balance_after: row.get("balance_after"),
            description: row.get("description"),
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .context("Invalid created_at timestamp")?
                .with_timezone(&Utc),
        })
    }

    // ========================
    // Audit
    // ========================

    /// Gather the statistics backing the ledger audit.
    pub async fn get_audit_stats(&self) -> Result<AuditStats> {
        let user_count: i64 = sqlx::query("SELECT COUNT(*) as count FROM users")
            .fetch_one(&self.pool)
            .await?
            .get("count");

        let account_count: i64 = sqlx::query("SELECT COUNT(*) as count FROM accounts")
            .fetch_one(&self.pool)
            .await?
            .get("count");

        let transaction_count: i64 = sqlx::query("SELECT COUNT(*) as count FROM transactions")
            .fetch_one(&self.pool)
            .await?
            .get("count");

        // A dense sequence means no record was ever lost or skipped.
        let sequence_check = sqlx::query(
            r#"
            SELECT
                MIN(sequence) as min_seq,
                MAX(sequence) as max_seq,
                COUNT(*) as count
            FROM transactions
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let min_seq: Option<i64> = sequence_check.get("min_seq");
        let max_seq: Option<i64> = sequence_check.get("max_seq");
        let count: i64 = sequence_check.get("count");

        let has_sequence_gaps = match (min_seq, max_seq) {
            (Some(min), Some(max)) => (max - min + 1) != count,
            _ => false,
        };

        let orphan_account_refs: i64 = sqlx::query(
            r#"
            SELECT COUNT(*) as count
            FROM transactions t
            WHERE NOT EXISTS (SELECT 1 FROM accounts a WHERE a.number = t.source_account)
               OR (t.target_account IS NOT NULL
                   AND NOT EXISTS (SELECT 1 FROM accounts a WHERE a.number = t.target_account))
            "#,
        )
        .fetch_one(&self.pool)
        .await?
        .get("count");

        let non_positive_amounts: i64 = sqlx::query(
            r#"
            SELECT COUNT(*) as count
            FROM transactions
            WHERE amount <= 0
            "#,
        )
        .fetch_one(&self.pool)
        .await?
        .get("count");

        Ok(AuditStats {
            user_count,
            account_count,
            transaction_count,
            has_sequence_gaps,
            orphan_account_refs,
            non_positive_amounts,
        })
    }
}
