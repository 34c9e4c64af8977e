use super::*;

#[catch(400)]
fn bad_request() -> Json<Message> {
    Json(Message::new("Malformed request"))
}

#[catch(401)]
fn unauthorized() -> Json<Message> {
    Json(Message::new(Message::UNAUTHORIZED))
}

#[catch(404)]
fn not_found() -> Json<Message> {
    Json(Message::new("Not found"))
}

#[catch(422)]
fn unprocessable() -> Json<Message> {
    Json(Message::new("Malformed request"))
}

#[catch(default)]
fn any_status(status: http::Status, request: &Request<'_>) -> (http::Status, Json<Message>) {
    if status.code < 500 {
        return (status, Json(Message::new(status.reason_lossy())));
    }
    tracing::error!(%status, uri = %request.uri(), "request failed");
    (status, Json(Message::new("Internal server error")))
}

/// Catchers rendering every error status as a `{"message": ...}` body.
pub fn json_catchers() -> Vec<Catcher> {
    catchers![bad_request, unauthorized, not_found, unprocessable, any_status]
}
