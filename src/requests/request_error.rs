use rocket::{
    http::Status,
    response::{self, Responder},
    serde::json::Json,
    Request,
};
use thiserror::Error;

use crate::external::ServiceError;

use super::Message;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Holds the reason; the client sees it behind a `Malformed request:` prefix.
    #[error("Malformed request: {0}")]
    BadRequest(String),
    #[error("login failed")]
    LoginFailed,
    #[error("external service failure: {0}")]
    Upstream(#[from] ServiceError),
}

impl ApiError {
    pub fn status(&self) -> Status {
        match self {
            Self::BadRequest(_) => Status::BadRequest,
            Self::LoginFailed => Status::Unauthorized,
            Self::Upstream(_) => Status::BadGateway,
        }
    }

    /// The message sent to the client. Upstream details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            Self::BadRequest(_) => self.to_string(),
            Self::LoginFailed => Message::LOGIN_FAILED.to_owned(),
            Self::Upstream(_) => Message::UPSTREAM_FAILURE.to_owned(),
        }
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, request: &'r Request<'_>) -> response::Result<'static> {
        if let Self::Upstream(err) = &self {
            tracing::error!(error = %err, uri = %request.uri(), "external service call failed");
        }
        let status = self.status();
        (status, Json(Message::new(self.public_message()))).respond_to(request)
    }
}

pub type RequestResult<T, E = ApiError> = std::result::Result<T, E>;
