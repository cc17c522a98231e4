#![deny(missing_docs)]

//! # HTTP Methods
//!
//! The closed set of methods an endpoint file may export.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An HTTP method an endpoint can declare.
///
/// Variant order is the order methods appear in the generated artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PATCH`
    Patch,
    /// `PUT`
    Put,
    /// `DELETE`
    Delete,
    /// `OPTIONS`
    Options,
}

impl Method {
    /// Every method, in artifact order.
    pub const ALL: [Method; 6] = [
        Method::Get,
        Method::Post,
        Method::Patch,
        Method::Put,
        Method::Delete,
        Method::Options,
    ];

    /// Parses an exact, upper-case method token (`"POST"`).
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == token)
    }

    /// The upper-case wire token.
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
        }
    }

    /// Whether requests with this method may carry a body.
    pub fn carries_body(self) -> bool {
        !matches!(self, Method::Get | Method::Options)
    }

    /// Name of the generated module holding this method's endpoints.
    pub(crate) fn module_name(self) -> &'static str {
        match self {
            Method::Get => "get",
            Method::Post => "post",
            Method::Patch => "patch",
            Method::Put => "put",
            Method::Delete => "delete",
            Method::Options => "options",
        }
    }

    /// Name of the variant, as written in generated code.
    pub(crate) fn variant_name(self) -> &'static str {
        match self {
            Method::Get => "Get",
            Method::Post => "Post",
            Method::Patch => "Patch",
            Method::Put => "Put",
            Method::Delete => "Delete",
            Method::Options => "Options",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_token_is_exact() {
        assert_eq!(Method::from_token("POST"), Some(Method::Post));
        assert_eq!(Method::from_token("post"), None);
        assert_eq!(Method::from_token("HEAD"), None);
    }

    #[test]
    fn test_body_carrying_methods() {
        let with_body: Vec<_> = Method::ALL.into_iter().filter(|m| m.carries_body()).collect();
        assert_eq!(
            with_body,
            vec![Method::Post, Method::Patch, Method::Put, Method::Delete]
        );
    }
}
