//! # Typed Dispatch Client
//!
//! Builds requests for endpoints known to the generated artifact. The artifact
//! implements [`Endpoint`] for every `(method, pattern)` pair, so a call names the
//! endpoint type and the compiler checks the body and parameter shapes:
//!
//! ```ignore
//! let response = client.send::<api::post::Posts>(
//!     RequestInit::new()
//!         .body(api::post::PostsBody { title: "x".into() })
//!         .search_params(api::post::PostsSearchParams { archived: true }),
//! )?;
//! ```

use crate::error::ClientError;
use crate::transport::Transport;
use regex::Regex;
use routegen_core::method::Method;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, warn};
use url::form_urlencoded;

/// A `(method, pattern)` pair with its request shapes. Implemented by generated code.
pub trait Endpoint {
    /// The HTTP method.
    const METHOD: Method;
    /// The URL pattern, placeholders included (`/users/[id]`).
    const PATTERN: &'static str;
    /// JSON body; [`NoData`] when the endpoint takes none.
    type Body: Serialize;
    /// Placeholder values; [`NoData`] when the pattern has none.
    type RouteParams: Serialize;
    /// Query parameters; [`NoData`] when none are declared.
    type SearchParams: Serialize;
}

/// Uninhabited stand-in for an absent request piece. No value of it exists, so a
/// body can never be passed to an endpoint that declares none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NoData {}

/// Per-call options for a typed request.
pub struct RequestInit<E: Endpoint> {
    /// The JSON body.
    pub body: Option<E::Body>,
    /// Placeholder values.
    pub route_params: Option<E::RouteParams>,
    /// Query parameters.
    pub search_params: Option<E::SearchParams>,
    /// Extra headers. These override the defaults, compared case-insensitively.
    pub headers: Vec<(String, String)>,
    /// Forwarded to the transport.
    pub timeout: Option<Duration>,
}

impl<E: Endpoint> Default for RequestInit<E> {
    fn default() -> Self {
        Self {
            body: None,
            route_params: None,
            search_params: None,
            headers: Vec::new(),
            timeout: None,
        }
    }
}

impl<E: Endpoint> RequestInit<E> {
    /// Empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the body.
    pub fn body(mut self, body: E::Body) -> Self {
        self.body = Some(body);
        self
    }

    /// Sets the route parameters.
    pub fn route_params(mut self, params: E::RouteParams) -> Self {
        self.route_params = Some(params);
        self
    }

    /// Sets the search parameters.
    pub fn search_params(mut self, params: E::SearchParams) -> Self {
        self.search_params = Some(params);
        self
    }

    /// Adds a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn into_raw(self) -> Result<RawInit, ClientError> {
        Ok(RawInit {
            body: self.body.map(|b| serde_json::to_value(b)).transpose()?,
            route_params: self.route_params.map(|p| serde_json::to_value(p)).transpose()?,
            search_params: self.search_params.map(|p| serde_json::to_value(p)).transpose()?,
            headers: self.headers,
            timeout: self.timeout,
        })
    }
}

/// Per-call options for an untyped request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawInit {
    /// The JSON body.
    pub body: Option<Value>,
    /// Placeholder values, an object of scalars.
    pub route_params: Option<Value>,
    /// Query parameters, an object of scalars or arrays of scalars.
    pub search_params: Option<Value>,
    /// Extra headers.
    pub headers: Vec<(String, String)>,
    /// Forwarded to the transport.
    pub timeout: Option<Duration>,
}

/// A fully prepared request, ready for a [`Transport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingRequest {
    /// The method.
    pub method: Method,
    /// Base URL, path and query.
    pub url: String,
    /// Headers in send order.
    pub headers: Vec<(String, String)>,
    /// Serialized JSON body.
    pub body: Option<String>,
    /// Forwarded timeout.
    pub timeout: Option<Duration>,
}

impl OutgoingRequest {
    /// The value of header `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Sends requests for registry endpoints through a transport.
///
/// Stateless apart from its configuration; safe to share between threads when the
/// transport is.
#[derive(Debug, Clone)]
pub struct ApiClient<T> {
    transport: T,
    base_url: String,
}

impl<T: Transport> ApiClient<T> {
    /// A client sending paths as-is (relative to whatever the transport expects).
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            base_url: String::new(),
        }
    }

    /// Prefixes every path with `base_url` (`http://localhost:8080`).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// The transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Sends a request to endpoint `E`.
    pub fn send<E: Endpoint>(&self, init: RequestInit<E>) -> Result<T::Response, ClientError> {
        let request = self.prepare(init)?;
        self.dispatch(request)
    }

    /// Sends a request to an arbitrary `(method, pattern)` pair.
    pub fn send_raw(
        &self,
        method: Method,
        pattern: &str,
        init: RawInit,
    ) -> Result<T::Response, ClientError> {
        let request = self.prepare_raw(method, pattern, init)?;
        self.dispatch(request)
    }

    /// Builds the request [`send`](Self::send) would hand to the transport.
    pub fn prepare<E: Endpoint>(&self, init: RequestInit<E>) -> Result<OutgoingRequest, ClientError> {
        self.prepare_raw(E::METHOD, E::PATTERN, init.into_raw()?)
    }

    /// Builds the request [`send_raw`](Self::send_raw) would hand to the transport.
    pub fn prepare_raw(
        &self,
        method: Method,
        pattern: &str,
        init: RawInit,
    ) -> Result<OutgoingRequest, ClientError> {
        let path = build_path(pattern, init.route_params.as_ref())?;
        let query = serialize_search_params(init.search_params.as_ref())?;

        let mut body = match init.body {
            Some(Value::Null) | None => None,
            Some(value) => Some(serde_json::to_string(&value)?),
        };
        if body.is_some() && !method.carries_body() {
            warn!(%method, pattern, "dropping body, the method carries none");
            body = None;
        }

        let mut headers = vec![("Accept".to_string(), "application/json".to_string())];
        if body.is_some() {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }
        for (name, value) in init.headers {
            headers.retain(|(k, _)| !k.eq_ignore_ascii_case(&name));
            headers.push((name, value));
        }

        let mut url = format!("{}{}", self.base_url, path);
        if let Some(query) = query {
            url.push('?');
            url.push_str(&query);
        }

        Ok(OutgoingRequest {
            method,
            url,
            headers,
            body,
            timeout: init.timeout,
        })
    }

    fn dispatch(&self, request: OutgoingRequest) -> Result<T::Response, ClientError> {
        debug!(method = %request.method, url = %request.url, "dispatching request");
        self.transport
            .send(request)
            .map_err(|e| ClientError::Transport(Box::new(e)))
    }
}

/// Substitutes `[name]`, `[...name]` and `[[name]]` placeholders in `pattern`.
///
/// Optional `[[name]]` segments without a value are dropped. A trailing slash is
/// trimmed, except for the root path.
pub fn build_path(pattern: &str, params: Option<&Value>) -> Result<String, ClientError> {
    static PLACEHOLDER_RE: OnceLock<Regex> = OnceLock::new();
    let re = PLACEHOLDER_RE.get_or_init(|| {
        Regex::new(r"\[\[([^\[\]]+)\]\]|\[(?:\.\.\.)?([^\[\]]+)\]").expect("Invalid regex")
    });

    let params = match params {
        Some(Value::Object(map)) => Some(map),
        Some(Value::Null) | None => None,
        Some(_) => return Err(ClientError::InvalidRouteParam("routeParams".into())),
    };

    let mut segments = Vec::new();
    for segment in pattern.split('/') {
        let mut rendered = String::new();
        let mut last = 0;
        let mut dropped = false;

        for caps in re.captures_iter(segment) {
            let Some(whole) = caps.get(0) else { continue };
            rendered.push_str(&segment[last..whole.start()]);
            last = whole.end();

            if let Some(name) = caps.get(1) {
                match param_value(params, name.as_str())? {
                    Some(value) => rendered.push_str(&value),
                    None => dropped = true,
                }
            } else if let Some(name) = caps.get(2) {
                let value = param_value(params, name.as_str())?
                    .ok_or_else(|| ClientError::InvalidRouteParam(name.as_str().to_string()))?;
                rendered.push_str(&value);
            }
        }
        rendered.push_str(&segment[last..]);

        if dropped && rendered.is_empty() {
            continue;
        }
        segments.push(rendered);
    }

    let path = segments.join("/");
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        Ok("/".to_string())
    } else {
        Ok(trimmed.to_string())
    }
}

fn param_value(params: Option<&Map<String, Value>>, name: &str) -> Result<Option<String>, ClientError> {
    match params.and_then(|p| p.get(name)) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => scalar_text(value)
            .map(Some)
            .ok_or_else(|| ClientError::InvalidRouteParam(name.to_string())),
    }
}

/// Encodes search parameters as `application/x-www-form-urlencoded`, in field order.
///
/// Scalars are stringified, arrays become one entry per element, nulls are omitted
/// and objects are rejected. Returns `None` when nothing is left to encode.
pub fn serialize_search_params(params: Option<&Value>) -> Result<Option<String>, ClientError> {
    let map = match params {
        Some(Value::Object(map)) => map,
        Some(Value::Null) | None => return Ok(None),
        Some(_) => return Err(ClientError::UnsupportedSearchParam("searchParams".into())),
    };

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    let mut count = 0;
    for (name, value) in map {
        match value {
            Value::Null => {}
            Value::Array(items) => {
                for item in items {
                    match item {
                        Value::Null => {}
                        Value::Array(_) | Value::Object(_) => {
                            return Err(ClientError::UnsupportedSearchParam(name.clone()))
                        }
                        scalar => {
                            if let Some(text) = scalar_text(scalar) {
                                serializer.append_pair(name, &text);
                                count += 1;
                            }
                        }
                    }
                }
            }
            Value::Object(_) => return Err(ClientError::UnsupportedSearchParam(name.clone())),
            scalar => {
                if let Some(text) = scalar_text(scalar) {
                    serializer.append_pair(name, &text);
                    count += 1;
                }
            }
        }
    }

    if count == 0 {
        return Ok(None);
    }
    Ok(Some(serializer.finish()))
}

/// Text form of a scalar. Integral floats print without a fraction (`2.0` → `2`).
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
            (Some(i), _, _) => Some(i.to_string()),
            (_, Some(u), _) => Some(u.to_string()),
            (_, _, Some(f)) if f.fract() == 0.0 && f.abs() < 9_007_199_254_740_992.0 => {
                Some(format!("{}", f as i64))
            }
            _ => Some(n.to_string()),
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_build_path_fills_placeholders() {
        let params = json!({ "id": "7", "rest": "42" });
        assert_eq!(
            build_path("/users/[id]/posts/[...rest]", Some(&params)).unwrap(),
            "/users/7/posts/42"
        );
    }

    #[test]
    fn test_build_path_rest_keeps_slashes() {
        let params = json!({ "path": "a/b/c" });
        assert_eq!(
            build_path("/files/[...path]", Some(&params)).unwrap(),
            "/files/a/b/c"
        );
    }

    #[test]
    fn test_build_path_optional_segments() {
        assert_eq!(
            build_path("/[[lang]]/about", Some(&json!({ "lang": "de" }))).unwrap(),
            "/de/about"
        );
        assert_eq!(build_path("/[[lang]]/about", None).unwrap(), "/about");
        assert_eq!(build_path("/docs/[[page]]", None).unwrap(), "/docs");
    }

    #[test]
    fn test_build_path_root_and_trailing_slash() {
        assert_eq!(build_path("/", None).unwrap(), "/");
        assert_eq!(build_path("/posts/", None).unwrap(), "/posts");
    }

    #[test]
    fn test_build_path_missing_required() {
        assert!(matches!(
            build_path("/users/[id]", Some(&json!({}))),
            Err(ClientError::InvalidRouteParam(name)) if name == "id"
        ));
        assert!(matches!(
            build_path("/users/[id]", Some(&json!({ "id": { "x": 1 } }))),
            Err(ClientError::InvalidRouteParam(_))
        ));
    }

    #[test]
    fn test_search_params_encoding() {
        let params = json!({ "tags": ["a", "b"], "active": true, "page": null });
        assert_eq!(
            serialize_search_params(Some(&params)).unwrap().as_deref(),
            Some("tags=a&tags=b&active=true")
        );
    }

    #[test]
    fn test_search_params_numbers_and_escaping() {
        let params = json!({ "page": 2.0, "ratio": 0.5, "q": "a b&c" });
        assert_eq!(
            serialize_search_params(Some(&params)).unwrap().as_deref(),
            Some("page=2&ratio=0.5&q=a+b%26c")
        );
    }

    #[test]
    fn test_search_params_reject_objects() {
        let params = json!({ "q": "x", "filter": { "a": 1 } });
        assert!(matches!(
            serialize_search_params(Some(&params)),
            Err(ClientError::UnsupportedSearchParam(name)) if name == "filter"
        ));
    }

    #[test]
    fn test_search_params_empty() {
        assert_eq!(serialize_search_params(None).unwrap(), None);
        assert_eq!(
            serialize_search_params(Some(&json!({ "page": null }))).unwrap(),
            None
        );
    }
}
