use rocket::{
    http::{Cookie, Status},
    request::{FromRequest, Outcome},
    Request,
};

use super::*;

/// A request carrying a live session.
pub struct AuthenticatedUser(pub Session);

#[derive(Debug)]
pub enum SessionError {
    Missing,
    Unknown,
    Unmanaged,
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::Missing => write!(f, "no session cookie"),
            SessionError::Unknown => write!(f, "the session is unknown or expired"),
            SessionError::Unmanaged => write!(f, "no session store is managed"),
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthenticatedUser {
    type Error = SessionError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let sessions = match request.rocket().state::<SharedSessions>() {
            Some(sessions) => sessions,
            None => return Outcome::Error((Status::InternalServerError, SessionError::Unmanaged)),
        };

        let cookies = request.cookies();
        let id = match cookies.get_private(SESSION_COOKIE) {
            Some(cookie) => SessionId::from(cookie.value().to_owned()),
            None => return Outcome::Error((Status::Unauthorized, SessionError::Missing)),
        };

        match sessions.get(&id).await {
            Some(session) => Outcome::Success(AuthenticatedUser(session)),
            None => {
                cookies.remove_private(Cookie::from(SESSION_COOKIE));
                Outcome::Error((Status::Unauthorized, SessionError::Unknown))
            }
        }
    }
}

/// Whether reading the score list needs a session.
#[derive(Clone, Copy, Default, Debug)]
pub struct ReadPolicy {
    pub scores_require_auth: bool,
}

/// Access to the score list, gated by the managed [`ReadPolicy`].
pub struct ScoreReader(pub Option<AuthenticatedUser>);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ScoreReader {
    type Error = SessionError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let gated = request
            .rocket()
            .state::<ReadPolicy>()
            .map_or(false, |policy| policy.scores_require_auth);

        if !gated {
            return Outcome::Success(ScoreReader(None));
        }

        request
            .guard::<AuthenticatedUser>()
            .await
            .map(|user| ScoreReader(Some(user)))
    }
}
