use rocket::http::{Cookie, CookieJar, SameSite};

use crate::external::{Record, SharedService};
use crate::score::ScoreEntry;
use crate::session::{
    AuthenticatedUser, ScoreReader, Session, SessionId, SessionPolicy, SharedSessions,
    SESSION_COOKIE,
};

use super::*;

#[get("/")]
pub fn index() -> &'static str {
    "Welcome to the Golf Tournament API"
}

fn session_cookie(session: &Session, policy: SessionPolicy) -> Cookie<'static> {
    let secs = i64::try_from(policy.ttl.as_secs()).unwrap_or(i64::MAX);
    Cookie::build((SESSION_COOKIE, session.id.as_str().to_owned()))
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(rocket::time::Duration::seconds(secs))
        .build()
}

/// Checks the credentials with the external service and, if they are
/// accepted, starts a session for the returned identity.
/// A session the client already had is replaced.
#[post("/login", data = "<body>")]
pub async fn login(
    body: JsonBody<'_, LoginRequest>,
    cookies: &CookieJar<'_>,
    service: &State<SharedService>,
    sessions: &State<SharedSessions>,
) -> RequestResult<Json<Message>> {
    let credentials = parse_body(body)?.into_credentials()?;

    let identity = match service.authenticate(&credentials).await? {
        Some(identity) => identity,
        None => {
            tracing::info!(email = %credentials.email, "login rejected");
            return Err(ApiError::LoginFailed);
        }
    };

    let purged = sessions.purge_expired().await;
    if purged > 0 {
        tracing::debug!(purged, "dropped expired sessions");
    }

    if let Some(previous) = cookies.get_private(SESSION_COOKIE) {
        sessions
            .invalidate(&SessionId::from(previous.value().to_owned()))
            .await;
    }

    let session = sessions.create(identity).await;
    cookies.add_private(session_cookie(&session, sessions.policy()));

    tracing::info!(
        user_id = %session.user.id,
        user_email = ?session.user.email,
        "login successful"
    );
    Ok(Json(Message::new(Message::LOGIN_SUCCESSFUL)))
}

/// Ends the caller's session and clears its cookie.
#[post("/logout")]
pub async fn logout(
    user: AuthenticatedUser,
    cookies: &CookieJar<'_>,
    sessions: &State<SharedSessions>,
) -> Json<Message> {
    let AuthenticatedUser(session) = user;
    sessions.invalidate(&session.id).await;
    cookies.remove_private(Cookie::from(SESSION_COOKIE));

    tracing::info!(
        user_id = %session.user.id,
        session_secs = session.created_at.elapsed().as_secs(),
        "logout"
    );
    Json(Message::new(Message::LOGOUT_SUCCESSFUL))
}

/// Writes one score row. Requires a session; the body is only read once
/// the session has been checked.
/// Submitting the same entry twice stores two rows.
#[post("/submit_score", data = "<body>")]
pub async fn submit_score(
    user: AuthenticatedUser,
    body: JsonBody<'_, ScoreEntry>,
    service: &State<SharedService>,
    table: &State<ScoresTable>,
) -> RequestResult<Json<Message>> {
    let entry = parse_body(body)?;

    service.insert_row(&table.0, &entry.clone().into_record()).await?;

    tracing::info!(
        user_id = %user.0.user.id,
        player1_id = %entry.player1_id,
        player2_id = %entry.player2_id,
        score1 = %entry.score1,
        score2 = %entry.score2,
        "score submitted"
    );
    Ok(Json(Message::new(Message::SCORE_SUBMITTED)))
}

/// Returns every row of the scores table in the order the store gives them.
#[get("/scores")]
pub async fn get_scores(
    reader: ScoreReader,
    service: &State<SharedService>,
    table: &State<ScoresTable>,
) -> RequestResult<Json<Vec<Record>>> {
    let rows = service.select_all(&table.0).await?;
    tracing::debug!(
        rows = rows.len(),
        user_id = ?reader.0.as_ref().map(|user| &user.0.user.id),
        "fetched scores"
    );
    Ok(Json(rows))
}
