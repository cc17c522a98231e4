#![deny(missing_docs)]

//! # Companion Route Types
//!
//! The host framework writes a type file next to each route (mirrored under the
//! types directory) naming the route and its parameters:
//!
//! ```text
//! pub const ROUTE_ID: &str = "/users/[id]";
//!
//! pub struct RouteParams {
//!     pub id: String,
//!     pub lang: Option<String>,
//! }
//! ```
//!
//! The file is read with the rust-analyzer syntax library, which tolerates the
//! partially written files a dev server can produce.

use crate::descriptor::{ObjectDescriptor, PrimitiveKind, SchemaDescriptor};
use crate::error::{AppError, AppResult};
use ra_ap_edition::Edition;
use ra_ap_syntax::ast::{self, HasName};
use ra_ap_syntax::{AstNode, SourceFile};
use regex::Regex;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::OnceLock;
use tracing::warn;

/// Name of the route-identifier constant.
pub const ROUTE_ID_CONST: &str = "ROUTE_ID";

/// Name of the route-parameters struct.
pub const ROUTE_PARAMS_STRUCT: &str = "RouteParams";

/// A single route parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteParam {
    /// Placeholder name.
    pub name: String,
    /// Whether the placeholder may be omitted (`[[name]]`).
    pub optional: bool,
}

/// Contents of a companion type file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RouteTypes {
    /// The route identifier the framework assigned.
    pub route_id: Option<String>,
    /// The route parameters, in declaration order.
    pub params: Vec<RouteParam>,
}

impl RouteTypes {
    /// The route parameters as an object of string fields, or `None` if the route
    /// has no parameters.
    pub fn descriptor(&self) -> Option<SchemaDescriptor> {
        if self.params.is_empty() {
            return None;
        }
        let mut object = ObjectDescriptor::default();
        for param in &self.params {
            object.fields.insert(
                param.name.clone(),
                SchemaDescriptor::primitive(PrimitiveKind::String),
            );
            if param.optional {
                object.optional.insert(param.name.clone());
            }
        }
        Some(SchemaDescriptor::Object(object))
    }
}

/// Reads the companion type file at `path`. A missing file yields `Ok(None)`.
pub fn read_route_types(path: &Path) -> AppResult<Option<RouteTypes>> {
    match fs::read_to_string(path) {
        Ok(code) => Ok(Some(parse_route_types(&code, path))),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(AppError::Io(e)),
    }
}

/// Extracts the route identifier and parameters from companion source text.
///
/// `path` is only used for diagnostics.
pub fn parse_route_types(code: &str, path: &Path) -> RouteTypes {
    let parse = SourceFile::parse(code, Edition::Edition2021);
    let file = parse.tree();
    let mut types = RouteTypes::default();

    for node in file.syntax().descendants() {
        if let Some(konst) = ast::Const::cast(node.clone()) {
            if konst.name().is_some_and(|n| n.text() == ROUTE_ID_CONST) {
                types.route_id = string_value(&konst.syntax().text().to_string());
            }
        } else if let Some(struct_def) = ast::Struct::cast(node) {
            if struct_def
                .name()
                .is_some_and(|n| n.text() == ROUTE_PARAMS_STRUCT)
            {
                types.params = extract_params(&struct_def, path);
            }
        }
    }

    types
}

fn extract_params(struct_def: &ast::Struct, path: &Path) -> Vec<RouteParam> {
    let mut params = Vec::new();

    if let Some(ast::FieldList::RecordFieldList(list)) = struct_def.field_list() {
        for field in list.fields() {
            if let (Some(name), Some(ty)) = (field.name(), field.ty()) {
                let name = name.text().to_string();
                let ty: String = ty
                    .syntax()
                    .text()
                    .to_string()
                    .chars()
                    .filter(|c| !c.is_whitespace())
                    .collect();
                let optional = match ty.as_str() {
                    "String" | "&str" | "&'staticstr" => false,
                    "Option<String>" | "Option<&str>" | "Option<&'staticstr>" => true,
                    other => {
                        warn!(
                            file = %path.display(),
                            param = %name,
                            ty = %other,
                            "route parameter is not a string, treating it as one"
                        );
                        other.starts_with("Option<")
                    }
                };
                params.push(RouteParam { name, optional });
            }
        }
    }

    params
}

/// Pulls the first string literal out of a `const` item's text.
fn string_value(text: &str) -> Option<String> {
    static STRING_RE: OnceLock<Regex> = OnceLock::new();
    let re = STRING_RE.get_or_init(|| Regex::new(r#""((?:[^"\\]|\\.)*)""#).expect("Invalid regex"));
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().replace("\\\"", "\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parses_id_and_params() {
        let code = r#"
            // generated
            pub const ROUTE_ID: &str = "/users/[id]/[[lang]]";

            pub struct RouteParams {
                pub id: String,
                pub lang: Option<String>,
            }
        "#;
        let types = parse_route_types(code, Path::new("types.rs"));
        assert_eq!(types.route_id.as_deref(), Some("/users/[id]/[[lang]]"));
        assert_eq!(
            types.params,
            vec![
                RouteParam {
                    name: "id".into(),
                    optional: false
                },
                RouteParam {
                    name: "lang".into(),
                    optional: true
                },
            ]
        );

        let descriptor = types.descriptor().unwrap();
        let object = descriptor.as_object().unwrap();
        assert!(object.is_optional("lang"));
        assert!(!object.is_optional("id"));
    }

    #[test]
    fn test_no_params_means_no_descriptor() {
        let code = r#"
            pub const ROUTE_ID: &str = "/";
            pub struct RouteParams {}
        "#;
        let types = parse_route_types(code, Path::new("types.rs"));
        assert!(types.params.is_empty());
        assert_eq!(types.descriptor(), None);
    }

    #[test]
    fn test_non_string_params_are_kept() {
        let code = "pub struct RouteParams { pub page: u32 }";
        let types = parse_route_types(code, Path::new("types.rs"));
        assert_eq!(types.params.len(), 1);
        assert!(!types.params[0].optional);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(read_route_types(&dir.path().join("types.rs")).unwrap(), None);
    }
}
