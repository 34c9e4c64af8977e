use std::collections::HashMap;

use secrecy::ExposeSecret;
use tokio::sync::RwLock;

use super::*;

/// Process-local stand-in for the external service.
/// Accounts are fixed at construction, rows are kept per table in insertion order.
#[derive(Default)]
pub struct MemoryService {
    accounts: HashMap<String, String>,
    tables: RwLock<HashMap<String, Vec<Record>>>,
}

impl MemoryService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(mut self, email: impl Into<String>, password: impl Into<String>) -> Self {
        self.accounts.insert(email.into(), password.into());
        self
    }

    /// Parses `email:password` pairs separated by commas.
    /// Entries without a colon are skipped.
    pub fn from_accounts(accounts: &str) -> Self {
        accounts
            .split(',')
            .filter_map(|pair| pair.trim().split_once(':'))
            .fold(Self::new(), |service, (email, password)| {
                service.with_account(email.trim(), password)
            })
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Number of rows currently stored in `table`.
    #[cfg(test)]
    pub async fn row_count(&self, table: &str) -> usize {
        self.tables.read().await.get(table).map_or(0, Vec::len)
    }
}

#[rocket::async_trait]
impl AccountService for MemoryService {
    async fn authenticate(&self, credentials: &Credentials) -> ServiceResult<Option<Identity>> {
        let identity = self
            .accounts
            .get(&credentials.email)
            .filter(|password| password.as_str() == credentials.password.expose_secret())
            .map(|_| Identity {
                id: format!("memory:{}", credentials.email),
                email: Some(credentials.email.clone()),
            });
        Ok(identity)
    }

    async fn insert_row(&self, table: &str, record: &Record) -> ServiceResult<()> {
        let table = check_table_name(table)?;
        self.tables
            .write()
            .await
            .entry(table.to_owned())
            .or_default()
            .push(record.clone());
        Ok(())
    }

    async fn select_all(&self, table: &str) -> ServiceResult<Vec<Record>> {
        let table = check_table_name(table)?;
        let rows = self
            .tables
            .read()
            .await
            .get(table)
            .cloned()
            .unwrap_or_default();
        Ok(rows)
    }
}
