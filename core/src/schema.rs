#![deny(missing_docs)]

//! # Schema
//!
//! A small structural schema library. Endpoint files declare their contracts with
//! these builders, the validation layer runs `safe_parse` against them at request time,
//! and the analyzer reconstructs the same trees statically from source.
//!
//! ```
//! use routegen_core::schema::{self, Schema};
//! use serde_json::json;
//!
//! let post: Schema = schema::object([
//!     ("title", schema::string()),
//!     ("draft", schema::boolean().optional()),
//! ]);
//! assert!(post.safe_parse(&json!({ "title": "x" })).is_ok());
//! assert!(post.safe_parse(&json!({})).is_err());
//! ```

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Number, Value};
use std::fmt;
use std::sync::Arc;

/// Predicate run by a refinement layer on an already-validated value.
pub type Predicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// A named refinement attached to a schema (`.refine(..)`, `.min(..)`, ...).
///
/// Refinements rebuilt from source carry no predicate and always hold.
#[derive(Clone)]
pub struct Refinement {
    name: String,
    message: String,
    check: Option<Predicate>,
}

impl Refinement {
    /// A refinement whose predicate is unknown (reconstructed statically).
    pub fn opaque(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            message: format!("Failed `{}` check", name),
            name,
            check: None,
        }
    }

    /// The combinator name this refinement came from.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn holds(&self, value: &Value) -> bool {
        self.check.as_ref().map_or(true, |check| check(value))
    }
}

impl fmt::Debug for Refinement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Refinement")
            .field("name", &self.name)
            .field("message", &self.message)
            .field("opaque", &self.check.is_none())
            .finish()
    }
}

/// A schema node.
///
/// `Default`, `Catch`, `Effects` and `Coerce` are wrapper layers with no
/// structural meaning of their own.
#[derive(Debug, Clone)]
pub enum Schema {
    /// Any JSON string.
    String,
    /// Any JSON number.
    Number,
    /// `true` or `false`.
    Boolean,
    /// JSON `null`.
    Null,
    /// An absent value.
    Undefined,
    /// Anything, including absence.
    Any,
    /// Exactly this value.
    Literal(Value),
    /// One of these strings.
    Enum(Vec<String>),
    /// An object with ordered, named fields. Unknown keys are stripped.
    Object(IndexMap<String, Schema>),
    /// A homogeneous array.
    Array(Box<Schema>),
    /// The inner schema, or absence.
    Optional(Box<Schema>),
    /// The inner schema, or `null`.
    Nullable(Box<Schema>),
    /// The inner schema; absence is replaced by the value.
    Default(Box<Schema>, Value),
    /// The inner schema; any failure is replaced by the value.
    Catch(Box<Schema>, Value),
    /// The inner schema followed by a refinement.
    Effects(Box<Schema>, Refinement),
    /// The inner primitive, converting strings first.
    Coerce(Box<Schema>),
}

/// `string()`
pub fn string() -> Schema {
    Schema::String
}

/// `number()`
pub fn number() -> Schema {
    Schema::Number
}

/// `boolean()`
pub fn boolean() -> Schema {
    Schema::Boolean
}

/// `null()`
pub fn null() -> Schema {
    Schema::Null
}

/// `undefined()`
pub fn undefined() -> Schema {
    Schema::Undefined
}

/// `any()`
pub fn any() -> Schema {
    Schema::Any
}

/// A schema accepting exactly `value`.
pub fn literal(value: impl Into<Value>) -> Schema {
    Schema::Literal(value.into())
}

/// A schema accepting one of `values`.
pub fn enumeration<I, S>(values: I) -> Schema
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Schema::Enum(values.into_iter().map(Into::into).collect())
}

/// An object schema from `(name, schema)` pairs, in declaration order.
pub fn object<I, K>(fields: I) -> Schema
where
    I: IntoIterator<Item = (K, Schema)>,
    K: Into<String>,
{
    Schema::Object(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
}

/// An array of `element`.
pub fn array(element: Schema) -> Schema {
    Schema::Array(Box::new(element))
}

impl Schema {
    /// Allows the value to be absent.
    pub fn optional(self) -> Self {
        Schema::Optional(Box::new(self))
    }

    /// Allows the value to be `null`.
    pub fn nullable(self) -> Self {
        Schema::Nullable(Box::new(self))
    }

    /// Allows the value to be absent or `null`.
    pub fn nullish(self) -> Self {
        self.nullable().optional()
    }

    /// Substitutes `value` when the input is absent.
    pub fn default(self, value: impl Into<Value>) -> Self {
        Schema::Default(Box::new(self), value.into())
    }

    /// Substitutes `value` when validation fails.
    pub fn catch(self, value: impl Into<Value>) -> Self {
        Schema::Catch(Box::new(self), value.into())
    }

    /// Adds a predicate checked after the inner schema succeeds.
    pub fn refine<F>(self, message: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Schema::Effects(
            Box::new(self),
            Refinement {
                name: "refine".to_string(),
                message: message.into(),
                check: Some(Arc::new(check)),
            },
        )
    }

    /// Converts string input into this primitive before validating.
    pub fn coerce(self) -> Self {
        Schema::Coerce(Box::new(self))
    }

    /// Peels exactly one wrapper layer, if this node is one.
    pub fn unwrap_layer(&self) -> Option<&Schema> {
        match self {
            Schema::Optional(inner)
            | Schema::Nullable(inner)
            | Schema::Default(inner, _)
            | Schema::Catch(inner, _)
            | Schema::Effects(inner, _)
            | Schema::Coerce(inner) => Some(inner),
            _ => None,
        }
    }

    /// The first node below every wrapper layer.
    pub fn base(&self) -> &Schema {
        let mut node = self;
        while let Some(inner) = node.unwrap_layer() {
            node = inner;
        }
        node
    }

    /// Whether the base node is an array.
    pub fn is_array(&self) -> bool {
        matches!(self.base(), Schema::Array(_))
    }

    /// Whether the base node is a boolean.
    pub fn is_boolean(&self) -> bool {
        matches!(self.base(), Schema::Boolean)
    }

    /// Whether an absent value passes this schema.
    pub fn is_optional(&self) -> bool {
        match self {
            Schema::Optional(_)
            | Schema::Default(..)
            | Schema::Catch(..)
            | Schema::Any
            | Schema::Undefined => true,
            Schema::Nullable(inner) | Schema::Effects(inner, _) | Schema::Coerce(inner) => {
                inner.is_optional()
            }
            _ => false,
        }
    }

    /// The fields of the base node, when it is an object.
    pub fn named_fields(&self) -> Option<&IndexMap<String, Schema>> {
        match self.base() {
            Schema::Object(fields) => Some(fields),
            _ => None,
        }
    }

    /// Validates `value`, collecting every issue.
    ///
    /// On success, returns the parsed output: unknown object keys stripped,
    /// defaults and fallbacks applied, coercions performed.
    pub fn safe_parse(&self, value: &Value) -> Result<Value, Vec<Issue>> {
        let mut issues = Vec::new();
        let mut path = Vec::new();
        let output = self.check(Some(value), &mut path, &mut issues);

        if issues.is_empty() {
            Ok(output.unwrap_or(Value::Null))
        } else {
            Err(issues)
        }
    }

    fn check(
        &self,
        value: Option<&Value>,
        path: &mut Vec<PathSegment>,
        issues: &mut Vec<Issue>,
    ) -> Option<Value> {
        match self {
            Schema::Optional(inner) => value.and_then(|v| inner.check(Some(v), path, issues)),
            Schema::Nullable(inner) => match value {
                Some(Value::Null) => Some(Value::Null),
                _ => inner.check(value, path, issues),
            },
            Schema::Default(inner, default) => inner.check(value.or(Some(default)), path, issues),
            Schema::Catch(inner, fallback) => {
                let mut scratch = Vec::new();
                let output = inner.check(value, path, &mut scratch);
                if scratch.is_empty() {
                    output
                } else {
                    Some(fallback.clone())
                }
            }
            Schema::Effects(inner, refinement) => {
                let before = issues.len();
                let output = inner.check(value, path, issues);
                if issues.len() == before {
                    if let Some(v) = &output {
                        if !refinement.holds(v) {
                            issues.push(Issue::new(path, refinement.message.clone()));
                        }
                    }
                }
                output
            }
            Schema::Coerce(inner) => {
                let coerced = value.map(|v| coerce_value(inner.base(), v));
                inner.check(coerced.as_ref(), path, issues)
            }
            Schema::Any => value.cloned(),
            Schema::Undefined => match value {
                None => None,
                Some(v) => {
                    issues.push(Issue::new(
                        path,
                        format!("Expected undefined, received {}", kind_of(v)),
                    ));
                    None
                }
            },
            Schema::String => expect(value, Value::is_string, "string", path, issues),
            Schema::Number => expect(value, Value::is_number, "number", path, issues),
            Schema::Boolean => expect(value, Value::is_boolean, "boolean", path, issues),
            Schema::Null => expect(value, Value::is_null, "null", path, issues),
            Schema::Literal(expected) => match value {
                Some(v) if v == expected => Some(v.clone()),
                Some(_) => {
                    issues.push(Issue::new(
                        path,
                        format!("Invalid literal value, expected {}", expected),
                    ));
                    None
                }
                None => required(path, issues),
            },
            Schema::Enum(options) => match value {
                Some(Value::String(s)) if options.iter().any(|o| o == s) => Some(Value::String(s.clone())),
                Some(v) => {
                    let expected = options
                        .iter()
                        .map(|o| format!("'{}'", o))
                        .collect::<Vec<_>>()
                        .join(" | ");
                    let received = match v {
                        Value::String(s) => format!("'{}'", s),
                        other => kind_of(other).to_string(),
                    };
                    issues.push(Issue::new(
                        path,
                        format!("Invalid enum value. Expected {}, received {}", expected, received),
                    ));
                    None
                }
                None => required(path, issues),
            },
            Schema::Object(fields) => match value {
                Some(Value::Object(map)) => {
                    let mut output = Map::new();
                    for (name, field) in fields {
                        path.push(PathSegment::Key(name.clone()));
                        if let Some(v) = field.check(map.get(name), path, issues) {
                            output.insert(name.clone(), v);
                        }
                        path.pop();
                    }
                    Some(Value::Object(output))
                }
                Some(other) => mismatch("object", other, path, issues),
                None => required(path, issues),
            },
            Schema::Array(element) => match value {
                Some(Value::Array(items)) => {
                    let mut output = Vec::with_capacity(items.len());
                    for (i, item) in items.iter().enumerate() {
                        path.push(PathSegment::Index(i));
                        output.push(element.check(Some(item), path, issues).unwrap_or(Value::Null));
                        path.pop();
                    }
                    Some(Value::Array(output))
                }
                Some(other) => mismatch("array", other, path, issues),
                None => required(path, issues),
            },
        }
    }
}

fn expect(
    value: Option<&Value>,
    accepts: fn(&Value) -> bool,
    kind: &str,
    path: &[PathSegment],
    issues: &mut Vec<Issue>,
) -> Option<Value> {
    match value {
        Some(v) if accepts(v) => Some(v.clone()),
        Some(v) => mismatch(kind, v, path, issues),
        None => required(path, issues),
    }
}

fn required(path: &[PathSegment], issues: &mut Vec<Issue>) -> Option<Value> {
    issues.push(Issue::new(path, "Required"));
    None
}

fn mismatch(
    expected: &str,
    received: &Value,
    path: &[PathSegment],
    issues: &mut Vec<Issue>,
) -> Option<Value> {
    issues.push(Issue::new(
        path,
        format!("Expected {}, received {}", expected, kind_of(received)),
    ));
    None
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn coerce_value(target: &Schema, value: &Value) -> Value {
    match (target, value) {
        (Schema::Number, Value::String(s)) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                Value::Number(i.into())
            } else {
                s.parse::<f64>()
                    .ok()
                    .and_then(Number::from_f64)
                    .map_or_else(|| value.clone(), Value::Number)
            }
        }
        (Schema::Boolean, Value::String(s)) => match s.as_str() {
            "true" | "1" => Value::Bool(true),
            "false" | "0" | "" => Value::Bool(false),
            _ => value.clone(),
        },
        (Schema::String, Value::Number(n)) => Value::String(n.to_string()),
        (Schema::String, Value::Bool(b)) => Value::String(b.to_string()),
        _ => value.clone(),
    }
}

/// One step of an issue path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// An object key.
    Key(String),
    /// An array index.
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(k) => f.write_str(k),
            PathSegment::Index(i) => write!(f, "{}", i),
        }
    }
}

/// A single validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    /// Where the failure occurred, outermost first.
    pub path: Vec<PathSegment>,
    /// Human readable reason.
    pub message: String,
}

impl Issue {
    fn new(path: &[PathSegment], message: impl Into<String>) -> Self {
        Self {
            path: path.to_vec(),
            message: message.into(),
        }
    }

    /// The path joined with dots (`author.tags.0`).
    pub fn dotted_path(&self) -> String {
        self.path
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Whether the path is exactly the single key `key`.
    pub fn is_at(&self, key: &str) -> bool {
        matches!(self.path.as_slice(), [PathSegment::Key(k)] if k == key)
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "at '{}': '{}'", self.dotted_path(), self.message)
    }
}
