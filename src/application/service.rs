use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::domain::{
    Account, AccountCategory, AccountStatus, AuditReport, Money, Transaction, TransactionId,
    TransactionType, User, build_audit_report, generate_account_number,
};
use crate::storage::Repository;

use super::{LedgerError, policy};

/// How many times a colliding account number is regenerated before the
/// conflict surfaces to the caller.
const ACCOUNT_NUMBER_ATTEMPTS: u32 = 5;

/// Application service providing the banking operations: user registry,
/// account registry, deposits/withdrawals/fees and the transfer engine.
/// This is the primary interface for any client (CLI, API, TUI, etc.).
pub struct BankService {
    repo: Repository,
}

/// Detailed account information
pub struct AccountInfo {
    pub account: Account,
    pub owner: User,
    pub incoming_count: i64,
    pub outgoing_count: i64,
    pub last_activity: Option<DateTime<Utc>>,
}

impl BankService {
    /// Create a new service with the given repository.
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, LedgerError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, LedgerError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo))
    }

    // ========================
    // User registry
    // ========================

    /// Register a new account owner.
    pub async fn register_user(
        &self,
        full_name: String,
        email: String,
    ) -> Result<User, LedgerError> {
        if self.repo.get_user_by_email(&email).await?.is_some() {
            return Err(LedgerError::EmailAlreadyRegistered(email));
        }

        let user = User::new(full_name, email);
        self.repo.save_user(&user).await?;
        info!(user = %user.id, email = %user.email, "user registered");
        Ok(user)
    }

    /// Get a user by email.
    pub async fn get_user(&self, email: &str) -> Result<User, LedgerError> {
        self.repo
            .get_user_by_email(email)
            .await?
            .ok_or_else(|| LedgerError::UserNotFound(email.to_string()))
    }

    /// List all registered users.
    pub async fn list_users(&self) -> Result<Vec<User>, LedgerError> {
        Ok(self.repo.list_users().await?)
    }

    /// Deactivate a user. Existing accounts keep working; the user may not
    /// open new ones.
    pub async fn deactivate_user(&self, email: &str) -> Result<User, LedgerError> {
        let mut user = self.get_user(email).await?;
        self.repo.set_user_active(user.id, false).await?;
        user.active = false;
        Ok(user)
    }

    // ========================
    // Account registry
    // ========================

    /// Open a new account for an existing, active owner. The account starts
    /// with a zero balance; a unique number is generated with bounded retry.
    pub async fn open_account(
        &self,
        owner_email: &str,
        category: AccountCategory,
        minimum_balance: Money,
    ) -> Result<Account, LedgerError> {
        let owner = self.get_user(owner_email).await?;
        policy::require_eligible_owner(&owner)?;

        if minimum_balance < 0 {
            return Err(LedgerError::InvalidAmount(format!(
                "minimum balance must not be negative, got {minimum_balance}"
            )));
        }

        for _ in 0..ACCOUNT_NUMBER_ATTEMPTS {
            let number = generate_account_number();
            if self.repo.account_number_exists(&number).await? {
                continue;
            }

            let account = Account::open(number, owner.id, category, minimum_balance);
            self.repo.save_account(&account).await?;
            info!(account = %account.number, owner = %owner.email, %category, "account opened");
            return Ok(account);
        }

        Err(LedgerError::AccountNumberConflict {
            attempts: ACCOUNT_NUMBER_ATTEMPTS,
        })
    }

    /// Get an account by number. Closed accounts read as absent.
    pub async fn get_account(&self, number: &str) -> Result<Account, LedgerError> {
        let account = self
            .repo
            .get_account(number)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(number.to_string()))?;

        if account.is_closed() {
            return Err(LedgerError::AccountNotFound(number.to_string()));
        }
        Ok(account)
    }

    /// Get detailed account information.
    pub async fn account_info(&self, number: &str) -> Result<AccountInfo, LedgerError> {
        let account = self.get_account(number).await?;
        let owner = self
            .repo
            .get_user(account.owner_id)
            .await?
            .ok_or_else(|| LedgerError::UserNotFound(account.owner_id.to_string()))?;
        let (incoming_count, outgoing_count) =
            self.repo.count_transactions_for_account(number).await?;
        let last_activity = self.repo.get_last_activity(number).await?;

        Ok(AccountInfo {
            account,
            owner,
            incoming_count,
            outgoing_count,
            last_activity,
        })
    }

    /// List accounts (optionally including closed ones).
    pub async fn list_accounts(&self, include_closed: bool) -> Result<Vec<Account>, LedgerError> {
        Ok(self.repo.list_accounts(include_closed).await?)
    }

    /// List the open accounts belonging to one owner.
    pub async fn list_accounts_for_owner(
        &self,
        owner_email: &str,
    ) -> Result<Vec<Account>, LedgerError> {
        let owner = self.get_user(owner_email).await?;
        Ok(self.repo.list_accounts_for_owner(owner.id).await?)
    }

    /// Change an account's status (block, unblock, retire). Setting `Closed`
    /// stamps the soft-delete timestamp; closed accounts cannot come back.
    pub async fn set_account_status(
        &self,
        number: &str,
        status: AccountStatus,
    ) -> Result<Account, LedgerError> {
        let mut account = self.get_account(number).await?;

        let closed_at = match status {
            AccountStatus::Closed => Some(Utc::now()),
            _ => None,
        };
        self.repo
            .set_account_status(number, status, closed_at)
            .await?;

        account.status = status;
        account.closed_at = closed_at;
        info!(account = %number, %status, "account status changed");
        Ok(account)
    }

    /// Close an account (soft delete). The row and its history remain.
    pub async fn close_account(&self, number: &str) -> Result<Account, LedgerError> {
        self.set_account_status(number, AccountStatus::Closed).await
    }

    // ========================
    // Deposits, withdrawals, fees
    // ========================

    /// Deposit into an account. The balance update and the ledger record
    /// commit as one unit.
    pub async fn deposit(&self, number: &str, amount: Money) -> Result<Transaction, LedgerError> {
        policy::require_positive_amount(amount)?;

        let mut tx = self.repo.begin().await?;
        let account = self
            .repo
            .get_account_in(&mut tx, number)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(number.to_string()))?;
        policy::require_open_for_movement(&account)?;

        let balance_after = account
            .balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::InvalidAmount("balance overflow".to_string()))?;

        self.repo
            .set_balance_in(&mut tx, &account.number, balance_after)
            .await?;
        let mut record = Transaction::deposit(&account.number, amount, balance_after);
        self.repo.append_transaction_in(&mut tx, &mut record).await?;
        self.repo.commit(tx).await?;

        info!(account = %record.source_account, amount, balance_after, "deposit settled");
        Ok(record)
    }

    /// Withdraw from an account. All-or-nothing: a refused withdrawal leaves
    /// the balance untouched.
    pub async fn withdraw(&self, number: &str, amount: Money) -> Result<Transaction, LedgerError> {
        self.debit(number, amount, TransactionType::Withdrawal, None)
            .await
    }

    /// Charge an administration fee. Same floor rules as a withdrawal.
    pub async fn charge_fee(
        &self,
        number: &str,
        amount: Money,
        description: Option<String>,
    ) -> Result<Transaction, LedgerError> {
        self.debit(number, amount, TransactionType::Fee, description)
            .await
    }

    /// Shared debit path for withdrawals and fees.
    async fn debit(
        &self,
        number: &str,
        amount: Money,
        tx_type: TransactionType,
        description: Option<String>,
    ) -> Result<Transaction, LedgerError> {
        policy::require_positive_amount(amount)?;

        let mut tx = self.repo.begin().await?;
        let account = self
            .repo
            .get_account_in(&mut tx, number)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(number.to_string()))?;
        policy::require_open_for_movement(&account)?;

        if let Err(refusal) = policy::require_funds_above_floor(&account, amount) {
            self.repo.rollback(tx).await?;
            self.append_refused(tx_type, &account, None, amount, description)
                .await?;
            warn!(account = %account.number, amount, balance = account.balance, %tx_type, "debit refused");
            return Err(refusal);
        }

        let balance_after = account.balance - amount;
        self.repo
            .set_balance_in(&mut tx, &account.number, balance_after)
            .await?;

        let mut record = match tx_type {
            TransactionType::Fee => Transaction::fee(&account.number, amount, balance_after),
            _ => Transaction::withdrawal(&account.number, amount, balance_after),
        };
        if let Some(desc) = description {
            record = record.with_description(desc);
        }
        self.repo.append_transaction_in(&mut tx, &mut record).await?;
        self.repo.commit(tx).await?;

        info!(account = %record.source_account, amount, balance_after, %tx_type, "debit settled");
        Ok(record)
    }

    // ========================
    // Transfer engine
    // ========================

    /// Move funds between two accounts. Debit, credit and the single ledger
    /// record commit together; a reader never observes one side applied
    /// without the other.
    pub async fn transfer(
        &self,
        source_number: &str,
        target_number: &str,
        amount: Money,
        description: Option<String>,
    ) -> Result<Transaction, LedgerError> {
        policy::require_distinct_accounts(source_number, target_number)?;
        policy::require_positive_amount(amount)?;

        let mut tx = self.repo.begin().await?;
        let source = self
            .repo
            .get_account_in(&mut tx, source_number)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(source_number.to_string()))?;
        let target = self
            .repo
            .get_account_in(&mut tx, target_number)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(target_number.to_string()))?;
        policy::require_open_for_movement(&source)?;
        policy::require_open_for_movement(&target)?;

        if let Err(refusal) = policy::require_funds_above_floor(&source, amount) {
            self.repo.rollback(tx).await?;
            self.append_refused(
                TransactionType::Transfer,
                &source,
                Some(&target),
                amount,
                description,
            )
            .await?;
            warn!(
                source = %source.number,
                target = %target.number,
                amount,
                balance = source.balance,
                "transfer refused"
            );
            return Err(refusal);
        }

        let source_after = source.balance - amount;
        let target_after = target
            .balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::InvalidAmount("balance overflow".to_string()))?;

        // Apply the two updates in ascending account-number order, so
        // concurrent transfers over the same pair never take the rows in
        // opposite order.
        let mut updates = [
            (source.number.as_str(), source_after),
            (target.number.as_str(), target_after),
        ];
        updates.sort_by(|a, b| a.0.cmp(b.0));
        for (number, balance) in updates {
            self.repo.set_balance_in(&mut tx, number, balance).await?;
        }

        let mut record =
            Transaction::transfer(&source.number, &target.number, amount, source_after);
        if let Some(desc) = description {
            record = record.with_description(desc);
        }
        self.repo.append_transaction_in(&mut tx, &mut record).await?;
        self.repo.commit(tx).await?;

        info!(
            source = %record.source_account,
            target = %target.number,
            amount,
            balance_after = source_after,
            "transfer settled"
        );
        Ok(record)
    }

    /// Append a `failed` record after a refused movement, so refusals show
    /// up in the audit trail. Runs outside the rolled-back money
    /// transaction.
    async fn append_refused(
        &self,
        tx_type: TransactionType,
        source: &Account,
        target: Option<&Account>,
        amount: Money,
        description: Option<String>,
    ) -> Result<(), LedgerError> {
        let mut record = match (tx_type, target) {
            (TransactionType::Transfer, Some(target)) => {
                Transaction::transfer(&source.number, &target.number, amount, source.balance)
            }
            (TransactionType::Fee, _) => Transaction::fee(&source.number, amount, source.balance),
            _ => Transaction::withdrawal(&source.number, amount, source.balance),
        }
        .refused();
        if let Some(desc) = description {
            record = record.with_description(desc);
        }
        self.repo.append_transaction(&mut record).await?;
        Ok(())
    }

    // ========================
    // Transaction queries
    // ========================

    /// Get a single transaction record.
    pub async fn get_transaction(&self, id: TransactionId) -> Result<Transaction, LedgerError> {
        self.repo
            .get_transaction(id)
            .await?
            .ok_or_else(|| LedgerError::TransactionNotFound(id.to_string()))
    }

    /// List transactions, optionally restricted to one account.
    pub async fn list_transactions(
        &self,
        account_number: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<Transaction>, LedgerError> {
        match account_number {
            Some(number) => {
                // Resolve first so an unknown account errors instead of
                // returning an empty history.
                let account = self.get_account(number).await?;
                Ok(self
                    .repo
                    .list_transactions_for_account(&account.number, limit)
                    .await?)
            }
            None => Ok(self.repo.list_transactions(limit).await?),
        }
    }

    // ========================
    // Audit
    // ========================

    /// Cross-check stored balances against a replay of the transaction log.
    pub async fn audit(&self) -> Result<AuditReport, LedgerError> {
        let stats = self.repo.get_audit_stats().await?;
        let accounts = self.repo.list_accounts(true).await?;
        let transactions = self.repo.list_transactions(None).await?;

        Ok(build_audit_report(
            &accounts,
            &transactions,
            stats.has_sequence_gaps,
            stats.orphan_account_refs,
            stats.non_positive_amounts,
        ))
    }
}
