//! # actix-web Integration
//!
//! Turns actix requests into validator input and validation failures into
//! `400 Bad Request` responses:
//!
//! ```ignore
//! pub async fn POST(req: HttpRequest, body: Bytes) -> Result<HttpResponse, ValidationError> {
//!     let input = Inbound::from_actix(&req, &body);
//!     let valid = validate(input, &_POST_SCHEMA)?;
//!     Ok(HttpResponse::Ok().json(valid.data))
//! }
//! ```

use crate::validate::{Inbound, InboundRequest, ValidationError};
use actix_web::http::{header, StatusCode};
use actix_web::{HttpRequest, HttpResponse, ResponseError};
use serde_json::json;
use url::Url;

impl Inbound {
    /// Validator input for an actix request and its raw body.
    ///
    /// The full URL is rebuilt from the connection info so that query parameters
    /// reach the validator; if that fails only the request is used.
    pub fn from_actix(req: &HttpRequest, body: &[u8]) -> Self {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok());
        let request = InboundRequest::new(content_type, body);

        match request_url(req) {
            Some(url) => Inbound::Event { request, url },
            None => Inbound::Request(request),
        }
    }
}

fn request_url(req: &HttpRequest) -> Option<Url> {
    let info = req.connection_info();
    let path = req
        .uri()
        .path_and_query()
        .map_or("/", |p| p.as_str());
    Url::parse(&format!("{}://{}{}", info.scheme(), info.host(), path)).ok()
}

impl ResponseError for ValidationError {
    fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "message": self.to_string(),
            "issues": self.issues,
            "missingUrlHint": self.missing_url_hint,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_from_actix_keeps_body_and_query() {
        let req = TestRequest::post()
            .uri("/posts?archived")
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .to_http_request();

        match Inbound::from_actix(&req, br#"{"title":"x"}"#) {
            Inbound::Event { request, url } => {
                assert_eq!(request.content_type.as_deref(), Some("application/json"));
                assert_eq!(request.body, br#"{"title":"x"}"#.to_vec());
                assert_eq!(url.path(), "/posts");
                assert_eq!(url.query(), Some("archived"));
            }
            other => panic!("expected an event, got {:?}", other),
        }
    }

    #[test]
    fn test_validation_error_is_a_bad_request() {
        let err = ValidationError::new(Vec::new());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_response().status(), StatusCode::BAD_REQUEST);
    }
}
