use rocket::serde::json::{self, Json};
use rocket::serde::{Deserialize, Serialize};
use rocket::*;

use crate::external::Credentials;

mod catchers;
mod handlers;
mod request_error;

pub use catchers::json_catchers;
pub use handlers::*;
pub use request_error::*;

/// The fixed `{"message": ...}` body every endpoint answers with.
#[derive(Clone, Serialize, Deserialize, PartialEq, Debug)]
#[serde(crate = "rocket::serde")]
pub struct Message {
    pub message: String,
}

impl Message {
    pub const LOGIN_SUCCESSFUL: &'static str = "Login successful";
    pub const LOGIN_FAILED: &'static str = "Login failed";
    pub const LOGOUT_SUCCESSFUL: &'static str = "Logout successful";
    pub const SCORE_SUBMITTED: &'static str = "Score submitted";
    pub const UNAUTHORIZED: &'static str = "Unauthorized";
    pub const UPSTREAM_FAILURE: &'static str = "External service error";

    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Body of `POST /login`. Deliberately not `Debug`: it holds a password.
#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn into_credentials(self) -> RequestResult<Credentials> {
        let email = self.email.trim();
        if email.is_empty() {
            return Err(ApiError::BadRequest("email must not be empty".to_owned()));
        }
        if self.password.is_empty() {
            return Err(ApiError::BadRequest("password must not be empty".to_owned()));
        }
        Ok(Credentials::new(email, self.password))
    }
}

/// Name of the table scores are written to and read from.
pub struct ScoresTable(pub String);

/// A JSON body that failed to parse is reported as a 400 instead of
/// being left to the default catchers.
type JsonBody<'r, T> = Result<Json<T>, json::Error<'r>>;

fn parse_body<T>(body: JsonBody<'_, T>) -> RequestResult<T> {
    match body {
        Ok(body) => Ok(body.into_inner()),
        Err(json::Error::Parse(_, err)) => Err(ApiError::BadRequest(err.to_string())),
        Err(json::Error::Io(err)) => Err(ApiError::BadRequest(format!(
            "could not read body: {}",
            err
        ))),
    }
}
