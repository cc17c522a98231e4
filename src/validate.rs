//! # Request Validation
//!
//! Checks live traffic against the same object schema the endpoint file declares.
//! The JSON body and the `searchParams` taken from the URL are merged into one
//! object and parsed as a whole, so every failing field is reported at once.

use crate::client::ApiClient;
use crate::transport::Transport;
use routegen_core::schema::{Issue, Schema};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use tracing::{debug, error};
use url::Url;

/// Name of the merged field holding query parameters.
pub const SEARCH_PARAMS: &str = "searchParams";

/// A request as seen by the validator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboundRequest {
    /// The `Content-Type` header, if any.
    pub content_type: Option<String>,
    /// The raw body.
    pub body: Vec<u8>,
}

impl InboundRequest {
    /// A request with an explicit content type.
    pub fn new(content_type: Option<&str>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            content_type: content_type.map(str::to_owned),
            body: body.into(),
        }
    }

    /// A request carrying a JSON body.
    pub fn json(body: impl Into<Vec<u8>>) -> Self {
        Self::new(Some("application/json"), body)
    }

    /// The body as a JSON object. Anything else counts as no body.
    fn body_fields(&self) -> Map<String, Value> {
        let is_json = self
            .content_type
            .as_deref()
            .is_some_and(|ct| ct.contains("application/json"));
        if !is_json {
            return Map::new();
        }
        match serde_json::from_slice::<Value>(&self.body) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                debug!("JSON body is not an object, treating it as absent");
                Map::new()
            }
            Err(err) => {
                debug!(%err, "JSON body does not parse, treating it as absent");
                Map::new()
            }
        }
    }
}

/// Input accepted by [`validate_with`].
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// A request without its URL.
    Request(InboundRequest),
    /// Only the URL.
    Url(Url),
    /// A request together with its URL.
    Event {
        /// The request.
        request: InboundRequest,
        /// The full request URL.
        url: Url,
    },
    /// Already-assembled data, validated as is.
    Data(Value),
}

impl From<InboundRequest> for Inbound {
    fn from(request: InboundRequest) -> Self {
        Inbound::Request(request)
    }
}

impl From<Url> for Inbound {
    fn from(url: Url) -> Self {
        Inbound::Url(url)
    }
}

impl From<Value> for Inbound {
    fn from(data: Value) -> Self {
        Inbound::Data(data)
    }
}

/// Successful validation: the parsed data and a client for follow-up calls.
#[derive(Debug, Clone)]
pub struct Validated<T> {
    /// Parsed data: unknown keys stripped, defaults applied, coercions performed.
    pub data: Value,
    /// Client bound to the transport the validation was given.
    pub api: ApiClient<T>,
}

impl<T> Validated<T> {
    /// Deserializes the parsed data into a concrete type.
    pub fn parse<D: DeserializeOwned>(&self) -> Result<D, serde_json::Error> {
        serde_json::from_value(self.data.clone())
    }
}

/// Failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    /// Every failing field.
    pub issues: Vec<Issue>,
    /// Every failure is the missing `searchParams` object itself, which usually
    /// means the URL was not passed alongside the request.
    pub missing_url_hint: bool,
}

impl ValidationError {
    /// Wraps the issues reported by a schema.
    pub fn new(issues: Vec<Issue>) -> Self {
        let missing_url_hint =
            !issues.is_empty() && issues.iter().all(|issue| issue.is_at(SEARCH_PARAMS));
        Self {
            issues,
            missing_url_hint,
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let issues: Vec<String> = self.issues.iter().map(ToString::to_string).collect();
        write!(f, "Invalid data: {}.", issues.join(", "))
    }
}

impl std::error::Error for ValidationError {}

/// Validates `input` against `schema` and binds a client to `transport`.
pub fn validate_with<T: Transport>(
    input: impl Into<Inbound>,
    schema: &Schema,
    transport: T,
) -> Result<Validated<T>, ValidationError> {
    let data = assemble(input.into(), schema);

    match schema.safe_parse(&data) {
        Ok(data) => Ok(Validated {
            data,
            api: ApiClient::new(transport),
        }),
        Err(issues) => {
            let err = ValidationError::new(issues);
            if err.missing_url_hint {
                error!("validation failed on `searchParams` only; was the request URL passed to validate?");
            }
            debug!(%err, "request rejected");
            Err(err)
        }
    }
}

/// Validates `input` against `schema` with the default HTTP transport.
#[cfg(feature = "client")]
pub fn validate(
    input: impl Into<Inbound>,
    schema: &Schema,
) -> Result<Validated<crate::transport::UreqTransport>, ValidationError> {
    validate_with(input, schema, crate::transport::UreqTransport::default())
}

/// Builds the object handed to the schema.
fn assemble(input: Inbound, schema: &Schema) -> Value {
    let (request, url) = match input {
        Inbound::Data(data) => return data,
        Inbound::Request(request) => (Some(request), None),
        Inbound::Url(url) => (None, Some(url)),
        Inbound::Event { request, url } => (Some(request), Some(url)),
    };

    let mut fields = request.map(|r| r.body_fields()).unwrap_or_default();
    if fields.remove(SEARCH_PARAMS).is_some() {
        debug!("dropping `searchParams` sent in the body");
    }
    if let Some(search) = url.and_then(|url| search_params_from_url(&url, schema)) {
        fields.insert(SEARCH_PARAMS.to_string(), Value::Object(search));
    }
    Value::Object(fields)
}

/// Reads the declared `searchParams` fields from the query string.
///
/// Array fields collect every value, boolean fields are `true` when the key is
/// present, everything else takes the first value. Keys missing from the query are
/// left out. Returns `None` when the schema declares no `searchParams` object.
fn search_params_from_url(url: &Url, schema: &Schema) -> Option<Map<String, Value>> {
    let declared = schema.named_fields()?.get(SEARCH_PARAMS)?.named_fields()?;
    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();

    let mut search = Map::new();
    for (name, field) in declared {
        let mut values = pairs.iter().filter(|(k, _)| k == name).map(|(_, v)| v.clone());
        let value = if field.is_array() {
            let all: Vec<Value> = values.map(Value::String).collect();
            if all.is_empty() {
                continue;
            }
            Value::Array(all)
        } else if field.is_boolean() {
            if values.next().is_none() {
                continue;
            }
            Value::Bool(true)
        } else {
            match values.next() {
                Some(value) => Value::String(value),
                None => continue,
            }
        };
        search.insert(name.clone(), value);
    }
    Some(search)
}

#[cfg(test)]
mod tests {
    use super::*;
    use routegen_core::schema::{self, boolean, number, object, string};
    use serde_json::json;

    #[derive(Debug)]
    struct NullTransport;

    impl Transport for NullTransport {
        type Response = ();
        type Error = std::io::Error;

        fn send(&self, _: crate::client::OutgoingRequest) -> Result<(), std::io::Error> {
            Ok(())
        }
    }

    fn url(query: &str) -> Url {
        Url::parse(&format!("http://localhost/posts{}", query)).unwrap()
    }

    #[test]
    fn test_search_params_coercion() {
        let schema = object([(
            "searchParams",
            object([
                ("tags", schema::array(string())),
                ("draft", boolean()),
                ("page", number().coerce().optional()),
                ("missing", string().optional()),
            ]),
        )]);
        let search =
            search_params_from_url(&url("?tags=a&page=3&tags=b&draft&other=1"), &schema).unwrap();
        assert_eq!(
            Value::Object(search),
            json!({ "tags": ["a", "b"], "draft": true, "page": "3" })
        );
    }

    #[test]
    fn test_undeclared_search_params_are_not_read() {
        let schema = object([("title", string())]);
        assert_eq!(search_params_from_url(&url("?a=1"), &schema), None);
    }

    #[test]
    fn test_bad_json_is_an_absent_body() {
        let request = InboundRequest::json("{ not json");
        assert!(request.body_fields().is_empty());
        let request = InboundRequest::json("[1, 2]");
        assert!(request.body_fields().is_empty());
        let request = InboundRequest::new(Some("text/plain"), r#"{"a":1}"#);
        assert!(request.body_fields().is_empty());
    }

    #[test]
    fn test_error_display_joins_issues() {
        let schema = object([("name", string()), ("age", number())]);
        let err = ValidationError::new(schema.safe_parse(&json!({ "age": "x" })).unwrap_err());
        assert_eq!(
            err.to_string(),
            "Invalid data: at 'name': 'Required', at 'age': 'Expected number, received string'."
        );
        assert!(!err.missing_url_hint);
    }

    #[test]
    fn test_missing_url_hint() {
        let schema = object([
            ("title", string()),
            ("searchParams", object([("archived", boolean())])),
        ]);
        let request = InboundRequest::json(r#"{"title":"x"}"#);
        let err = validate_with(request, &schema, NullTransport).unwrap_err();
        assert!(err.missing_url_hint);
        assert_eq!(err.issues.len(), 1);
    }

    #[test]
    fn test_body_cannot_supply_search_params() {
        let schema = object([
            ("title", string()),
            ("searchParams", object([("admin", boolean())])),
        ]);
        let body = r#"{"title":"x","searchParams":{"admin":true}}"#;

        let err = validate_with(InboundRequest::json(body), &schema, NullTransport).unwrap_err();
        assert!(err.missing_url_hint);

        let event = Inbound::Event {
            request: InboundRequest::json(body),
            url: url(""),
        };
        let err = validate_with(event, &schema, NullTransport).unwrap_err();
        assert_eq!(err.issues[0].to_string(), "at 'searchParams.admin': 'Required'");
    }
}
