use std::time::Duration;

use reqwest::{header, StatusCode};
use rocket::serde::json::{json, Value};
use secrecy::ExposeSecret;

use super::*;

/// Client for a Supabase project: GoTrue for logins, PostgREST for rows.
///
/// The API key is kept as a [`SecretString`] and only exposed when the
/// request headers are built.
pub struct SupabaseClient {
    client: reqwest::Client,
    base_url: String,
    api_key: SecretString,
}

impl SupabaseClient {
    pub fn new(base_url: &str, api_key: SecretString, timeout: Duration) -> ServiceResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key,
        })
    }

    fn rest_url(&self, table: &str) -> ServiceResult<String> {
        let table = check_table_name(table)?;
        Ok(format!("{}/rest/v1/{}", self.base_url, table))
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let key = self.api_key.expose_secret();
        request
            .header("apikey", key)
            .header(header::AUTHORIZATION, format!("Bearer {}", key))
    }
}

/// Turns a non-success response into [`ServiceError::Status`].
async fn check_status(response: reqwest::Response) -> ServiceResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ServiceError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Pulls the identity out of a password-grant token response.
fn identity_from_token(body: &Value) -> ServiceResult<Identity> {
    let user = body
        .get("user")
        .ok_or_else(|| ServiceError::Decode("token response has no user".to_owned()))?;
    let id = user
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| ServiceError::Decode("user has no id".to_owned()))?;
    let email = user.get("email").and_then(Value::as_str).map(str::to_owned);
    Ok(Identity {
        id: id.to_owned(),
        email,
    })
}

#[rocket::async_trait]
impl AccountService for SupabaseClient {
    async fn authenticate(&self, credentials: &Credentials) -> ServiceResult<Option<Identity>> {
        let response = self
            .client
            .post(format!("{}/auth/v1/token", self.base_url))
            .query(&[("grant_type", "password")])
            .header("apikey", self.api_key.expose_secret())
            .json(&json!({
                "email": credentials.email,
                "password": credentials.password.expose_secret(),
            }))
            .send()
            .await?;

        match response.status() {
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Ok(None);
            }
            _ => {}
        }

        let body: Value = check_status(response).await?.json().await?;
        identity_from_token(&body).map(Some)
    }

    async fn insert_row(&self, table: &str, record: &Record) -> ServiceResult<()> {
        let url = self.rest_url(table)?;
        let response = self
            .authorized(self.client.post(url))
            .header("Prefer", "return=minimal")
            .json(&[record])
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    async fn select_all(&self, table: &str) -> ServiceResult<Vec<Record>> {
        let url = self.rest_url(table)?;
        let response = self
            .authorized(self.client.get(url))
            .query(&[("select", "*")])
            .send()
            .await?;
        let rows = check_status(response).await?.json().await?;
        Ok(rows)
    }
}
