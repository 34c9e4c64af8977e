use rocket::{
    fairing::{Fairing, Info, Kind},
    http::{Header, Status},
    options, Request, Response,
};

/// Allow-all CORS: every response carries the configured origin.
pub struct Cors {
    allow_origin: String,
}

impl Cors {
    pub const ALLOW_METHODS: &'static str = "GET, POST, OPTIONS";
    pub const ALLOW_HEADERS: &'static str = "Content-Type";

    pub fn new(allow_origin: impl Into<String>) -> Self {
        Self {
            allow_origin: allow_origin.into(),
        }
    }
}

#[rocket::async_trait]
impl Fairing for Cors {
    fn info(&self) -> Info {
        Info {
            name: "CORS headers",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, _request: &'r Request<'_>, response: &mut Response<'r>) {
        response.set_header(Header::new(
            "Access-Control-Allow-Origin",
            self.allow_origin.clone(),
        ));
        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            Self::ALLOW_METHODS,
        ));
        response.set_header(Header::new(
            "Access-Control-Allow-Headers",
            Self::ALLOW_HEADERS,
        ));
    }
}

/// Answers preflight requests for any path; the fairing adds the headers.
#[options("/<_..>")]
pub fn preflight() -> Status {
    Status::NoContent
}
