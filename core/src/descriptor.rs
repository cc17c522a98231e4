#![deny(missing_docs)]

//! # Schema Descriptors
//!
//! Normalizes a [`Schema`] into a structural type tree that no longer knows about
//! refinements, defaults or fallbacks. Descriptors are what the registry stores and
//! what the artifact generator turns into Rust types.

use crate::schema::Schema;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// Leaf kinds a descriptor can resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    /// A string.
    String,
    /// A number.
    Number,
    /// A boolean.
    Boolean,
    /// `null`.
    Null,
    /// Unknown or absent; the catch-all for anything unresolved.
    Undefined,
}

/// Fields of an object descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ObjectDescriptor {
    /// Field descriptors in declaration order. Optional fields are stored unwrapped.
    pub fields: IndexMap<String, SchemaDescriptor>,
    /// Names of fields that may be absent.
    pub optional: BTreeSet<String>,
}

impl ObjectDescriptor {
    /// Whether `name` may be absent.
    pub fn is_optional(&self, name: &str) -> bool {
        self.optional.contains(name)
    }

    /// Whether the object declares no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A structural type tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SchemaDescriptor {
    /// A leaf.
    Primitive {
        /// The leaf kind.
        of: PrimitiveKind,
    },
    /// An object.
    Object(ObjectDescriptor),
    /// An array.
    Array {
        /// Element descriptor.
        element: Box<SchemaDescriptor>,
    },
    /// May be absent.
    Optional {
        /// Wrapped descriptor.
        inner: Box<SchemaDescriptor>,
    },
    /// May be `null`.
    Nullable {
        /// Wrapped descriptor.
        inner: Box<SchemaDescriptor>,
    },
}

impl SchemaDescriptor {
    /// Shorthand for a primitive descriptor.
    pub fn primitive(of: PrimitiveKind) -> Self {
        SchemaDescriptor::Primitive { of }
    }

    /// The node below any Optional/Nullable flags.
    pub fn base(&self) -> &SchemaDescriptor {
        match self {
            SchemaDescriptor::Optional { inner } | SchemaDescriptor::Nullable { inner } => {
                inner.base()
            }
            other => other,
        }
    }

    /// Whether the base node is an array.
    pub fn is_array(&self) -> bool {
        matches!(self.base(), SchemaDescriptor::Array { .. })
    }

    /// Whether the base node is a boolean.
    pub fn is_boolean(&self) -> bool {
        matches!(
            self.base(),
            SchemaDescriptor::Primitive {
                of: PrimitiveKind::Boolean
            }
        )
    }

    /// The object fields of the base node, if it is an object.
    pub fn as_object(&self) -> Option<&ObjectDescriptor> {
        match self.base() {
            SchemaDescriptor::Object(object) => Some(object),
            _ => None,
        }
    }
}

/// Converts a schema into its structural descriptor.
///
/// Never fails: nodes the adapter does not recognize become `Primitive(undefined)`.
pub fn to_descriptor(schema: &Schema) -> SchemaDescriptor {
    match schema {
        Schema::Effects(inner, _) | Schema::Coerce(inner) => to_descriptor(inner),
        Schema::Optional(inner) | Schema::Default(inner, _) | Schema::Catch(inner, _) => {
            SchemaDescriptor::Optional {
                inner: Box::new(to_descriptor(inner)),
            }
        }
        Schema::Nullable(inner) => SchemaDescriptor::Nullable {
            inner: Box::new(to_descriptor(inner)),
        },
        Schema::String => SchemaDescriptor::primitive(PrimitiveKind::String),
        Schema::Number => SchemaDescriptor::primitive(PrimitiveKind::Number),
        Schema::Boolean => SchemaDescriptor::primitive(PrimitiveKind::Boolean),
        Schema::Null => SchemaDescriptor::primitive(PrimitiveKind::Null),
        Schema::Undefined => SchemaDescriptor::primitive(PrimitiveKind::Undefined),
        Schema::Array(element) => SchemaDescriptor::Array {
            element: Box::new(to_descriptor(element)),
        },
        Schema::Object(fields) => {
            let mut object = ObjectDescriptor::default();
            for (name, field) in fields {
                let descriptor = match to_descriptor(field) {
                    SchemaDescriptor::Optional { inner } => {
                        object.optional.insert(name.clone());
                        *inner
                    }
                    SchemaDescriptor::Nullable { inner } => match *inner {
                        SchemaDescriptor::Optional { inner } => {
                            object.optional.insert(name.clone());
                            SchemaDescriptor::Nullable { inner }
                        }
                        inner => SchemaDescriptor::Nullable {
                            inner: Box::new(inner),
                        },
                    },
                    other => other,
                };
                object.fields.insert(name.clone(), descriptor);
            }
            SchemaDescriptor::Object(object)
        }
        Schema::Any | Schema::Literal(_) | Schema::Enum(_) => {
            debug!(node = ?schema, "unrecognized schema node, treating as undefined");
            SchemaDescriptor::primitive(PrimitiveKind::Undefined)
        }
    }
}

/// Names of fields whose leaf is not string-compatible.
///
/// Query strings can only carry strings, booleans (as presence), numbers (as text),
/// and repetitions of those.
pub fn search_param_violations(object: &ObjectDescriptor) -> Vec<String> {
    object
        .fields
        .iter()
        .filter(|(_, field)| !is_query_compatible(field))
        .map(|(name, _)| name.clone())
        .collect()
}

fn is_query_compatible(field: &SchemaDescriptor) -> bool {
    match field.base() {
        SchemaDescriptor::Array { element } => is_query_leaf(element),
        leaf => is_query_leaf(leaf),
    }
}

fn is_query_leaf(node: &SchemaDescriptor) -> bool {
    matches!(
        node.base(),
        SchemaDescriptor::Primitive {
            of: PrimitiveKind::String | PrimitiveKind::Number | PrimitiveKind::Boolean
        }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{self, Refinement};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample() -> Schema {
        schema::object([
            ("title", schema::string()),
            ("tags", schema::array(schema::string()).optional()),
            (
                "author",
                schema::object([("id", schema::number()), ("bio", schema::string().nullable())]),
            ),
        ])
    }

    #[test]
    fn test_object_fields_and_optional_set() {
        let descriptor = to_descriptor(&sample());
        let object = descriptor.as_object().unwrap();

        assert_eq!(
            object.fields.keys().collect::<Vec<_>>(),
            vec!["title", "tags", "author"]
        );
        assert!(object.is_optional("tags"));
        assert!(!object.is_optional("title"));
        assert!(object.fields["tags"].is_array());

        let author = object.fields["author"].as_object().unwrap();
        assert_eq!(
            author.fields["bio"],
            SchemaDescriptor::Nullable {
                inner: Box::new(SchemaDescriptor::primitive(PrimitiveKind::String))
            }
        );
    }

    #[test]
    fn test_refinement_layers_are_transparent() {
        let base = sample();
        let wrapped = Schema::Effects(
            Box::new(Schema::Effects(Box::new(base.clone()), Refinement::opaque("min"))),
            Refinement::opaque("refine"),
        );
        assert_eq!(to_descriptor(&wrapped), to_descriptor(&base));
    }

    #[test]
    fn test_rewrapping_only_changes_flags() {
        let base = sample();
        let expected = to_descriptor(&base);

        let wrapped = base
            .clone()
            .refine("x", |_| true)
            .nullable()
            .coerce()
            .optional();
        let descriptor = to_descriptor(&wrapped);

        match &descriptor {
            SchemaDescriptor::Optional { inner } => match inner.as_ref() {
                SchemaDescriptor::Nullable { inner } => assert_eq!(inner.as_ref(), &expected),
                other => panic!("expected nullable, got {:?}", other),
            },
            other => panic!("expected optional, got {:?}", other),
        }
        assert_eq!(descriptor.base(), &expected);
    }

    #[test]
    fn test_default_and_catch_make_fields_optional() {
        let schema = schema::object([
            ("page", schema::number().default(1)),
            ("sort", schema::string().catch("asc")),
        ]);
        let descriptor = to_descriptor(&schema);
        let object = descriptor.as_object().unwrap();
        assert!(object.is_optional("page"));
        assert!(object.is_optional("sort"));
    }

    #[test]
    fn test_optional_under_nullable_is_optional() {
        let schema = schema::object([("maybe", schema::string().optional().nullable())]);
        let descriptor = to_descriptor(&schema);
        let object = descriptor.as_object().unwrap();
        assert!(object.is_optional("maybe"));
        assert_eq!(
            object.fields["maybe"],
            SchemaDescriptor::Nullable {
                inner: Box::new(SchemaDescriptor::primitive(PrimitiveKind::String)),
            }
        );
    }

    #[test]
    fn test_unrecognized_nodes_degrade_to_undefined() {
        let undefined = SchemaDescriptor::primitive(PrimitiveKind::Undefined);
        assert_eq!(to_descriptor(&schema::any()), undefined);
        assert_eq!(to_descriptor(&schema::literal(json!("x"))), undefined);
        assert_eq!(to_descriptor(&schema::enumeration(["a", "b"])), undefined);
    }

    #[test]
    fn test_search_param_violations() {
        let schema = schema::object([
            ("q", schema::string()),
            ("page", schema::number().coerce().optional()),
            ("archived", schema::boolean()),
            ("tags", schema::array(schema::string())),
            ("filter", schema::object([("a", schema::string())])),
            ("matrix", schema::array(schema::array(schema::number()))),
        ]);
        let descriptor = to_descriptor(&schema);
        let violations = search_param_violations(descriptor.as_object().unwrap());
        assert_eq!(violations, vec!["filter".to_string(), "matrix".to_string()]);
    }
}
