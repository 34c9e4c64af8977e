//! The account/database service every request is delegated to.
//!
//! Identity verification and row storage both live outside this process.
//! Handlers only see the [`AccountService`] trait; the concrete client is
//! chosen at startup from the configuration.

use std::sync::Arc;

use rocket::serde::json::serde_json::Map;
use rocket::serde::json::Value;
use rocket::serde::{Deserialize, Serialize};
use secrecy::SecretString;
use thiserror::Error;

mod memory;
mod supabase;

pub use memory::MemoryService;
pub use supabase::SupabaseClient;

/// A single row as the external store represents it.
pub type Record = Map<String, Value>;

pub type ServiceResult<T> = Result<T, ServiceError>;

pub type SharedService = Arc<dyn AccountService>;

/// Email and password for one login attempt. Never stored.
pub struct Credentials {
    pub email: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: SecretString::from(password.into()),
        }
    }
}

/// The identity the external service hands back for accepted credentials.
#[derive(Clone, Serialize, Deserialize, PartialEq, Debug)]
#[serde(crate = "rocket::serde")]
pub struct Identity {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("request to the external service failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("external service responded with {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected response from the external service: {0}")]
    Decode(String),
    #[error("invalid table name: {0:?}")]
    InvalidTable(String),
}

#[rocket::async_trait]
pub trait AccountService: Send + Sync {
    /// Checks the credentials. Rejected credentials are `Ok(None)`,
    /// only a failure to get an answer is an error.
    async fn authenticate(&self, credentials: &Credentials) -> ServiceResult<Option<Identity>>;

    async fn insert_row(&self, table: &str, record: &Record) -> ServiceResult<()>;

    async fn select_all(&self, table: &str) -> ServiceResult<Vec<Record>>;
}

/// Table names end up in request paths, so only plain identifiers are allowed.
pub fn check_table_name(table: &str) -> ServiceResult<&str> {
    let valid = !table.is_empty()
        && table
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(table)
    } else {
        Err(ServiceError::InvalidTable(table.to_owned()))
    }
}
