#![deny(missing_docs)]

//! # Type Resolver
//!
//! Resolves the field types of an object-schema construction found in an endpoint
//! file, without compiling the file.
//!
//! The analyzer only depends on the [`TypeResolver`] trait. The default
//! [`BuilderExprResolver`] interprets calls to the `schema` builders directly from
//! the syntax tree, e.g.
//!
//! ```text
//! static _POST_SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
//!     object([
//!         ("title", string().min(1)),
//!         ("tags", array(string()).optional()),
//!     ])
//! });
//! ```

use crate::error::{AppError, AppResult};
use crate::schema::{self, Refinement, Schema};
use indexmap::IndexMap;
use quote::ToTokens;
use serde_json::{Number, Value};
use syn::punctuated::Punctuated;
use syn::{Expr, Lit, Stmt, Token};
use tracing::warn;

/// Resolves `(field name, type)` pairs of an object-schema construction.
pub trait TypeResolver: Send + Sync {
    /// Returns the ordered fields declared by `node`.
    ///
    /// Fails when `node` does not describe an object schema.
    fn resolve_field_types(&self, node: &Expr) -> AppResult<Vec<(String, Schema)>>;
}

/// Evaluates `schema` builder expressions syntactically.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuilderExprResolver;

impl TypeResolver for BuilderExprResolver {
    fn resolve_field_types(&self, node: &Expr) -> AppResult<Vec<(String, Schema)>> {
        let schema = self.evaluate(node)?;
        let fields = schema.named_fields().ok_or_else(|| {
            AppError::UnsupportedSchema(format!(
                "`{}` is not an object schema",
                node.to_token_stream()
            ))
        })?;
        Ok(fields
            .iter()
            .map(|(name, field)| (name.clone(), field.clone()))
            .collect())
    }
}

impl BuilderExprResolver {
    /// Rebuilds the schema an expression would construct at runtime.
    ///
    /// Refinements are kept as opaque layers; literal arguments of `default`/`catch`
    /// are kept when they are plain literals and replaced by `null` otherwise.
    pub fn evaluate(&self, expr: &Expr) -> AppResult<Schema> {
        match expr {
            Expr::Paren(p) => self.evaluate(&p.expr),
            Expr::Group(g) => self.evaluate(&g.expr),
            Expr::Reference(r) => self.evaluate(&r.expr),
            Expr::Closure(c) => self.evaluate(&c.body),
            Expr::Block(b) => match block_tail(&b.block) {
                Some(tail) => self.evaluate(tail),
                None => Err(unsupported(expr)),
            },
            Expr::Call(call) => self.evaluate_call(call),
            Expr::MethodCall(call) => self.evaluate_method(call),
            _ => Err(unsupported(expr)),
        }
    }

    fn evaluate_call(&self, call: &syn::ExprCall) -> AppResult<Schema> {
        let name = callee_name(&call.func).ok_or_else(|| unsupported(&call.func))?;
        let first = || {
            call.args
                .first()
                .ok_or_else(|| AppError::UnsupportedSchema(format!("`{}()` needs an argument", name)))
        };

        let schema = match name.as_str() {
            "string" => schema::string(),
            "number" => schema::number(),
            "boolean" | "bool" => schema::boolean(),
            "null" => schema::null(),
            "undefined" => schema::undefined(),
            "any" | "unknown" => schema::any(),
            "literal" => Schema::Literal(call.args.first().map_or(Value::Null, literal_value)),
            "enumeration" => Schema::Enum(string_list(first()?)?),
            "array" => schema::array(self.evaluate(first()?)?),
            "object" => Schema::Object(self.object_fields(first()?)?),
            "optional" => self.evaluate(first()?)?.optional(),
            "nullable" => self.evaluate(first()?)?.nullable(),
            // LazyLock::new(|| ..), Lazy::new(|| ..)
            "new" => self.evaluate(first()?)?,
            _ => return Err(unsupported(&call.func)),
        };
        Ok(schema)
    }

    fn evaluate_method(&self, call: &syn::ExprMethodCall) -> AppResult<Schema> {
        let inner = self.evaluate(&call.receiver)?;
        let argument = || call.args.first().map_or(Value::Null, literal_value);

        let schema = match call.method.to_string().as_str() {
            "optional" => inner.optional(),
            "nullable" => inner.nullable(),
            "nullish" => inner.nullish(),
            "default" => inner.default(argument()),
            "catch" => inner.catch(argument()),
            "coerce" => inner.coerce(),
            "clone" | "into" | "to_owned" => inner,
            other => Schema::Effects(Box::new(inner), Refinement::opaque(other)),
        };
        Ok(schema)
    }

    fn object_fields(&self, expr: &Expr) -> AppResult<IndexMap<String, Schema>> {
        let elements: Vec<Expr> = match expr {
            Expr::Array(array) => array.elems.iter().cloned().collect(),
            Expr::Reference(r) => return self.object_fields(&r.expr),
            Expr::Paren(p) => return self.object_fields(&p.expr),
            Expr::Macro(m) if m.mac.path.is_ident("vec") => m
                .mac
                .parse_body_with(Punctuated::<Expr, Token![,]>::parse_terminated)
                .map_err(|e| AppError::UnsupportedSchema(e.to_string()))?
                .into_iter()
                .collect(),
            _ => return Err(unsupported(expr)),
        };

        let mut fields = IndexMap::new();
        for element in &elements {
            let Expr::Tuple(tuple) = element else {
                return Err(unsupported(element));
            };
            if tuple.elems.len() != 2 {
                return Err(unsupported(element));
            }
            let name = string_literal(&tuple.elems[0]).ok_or_else(|| unsupported(&tuple.elems[0]))?;
            let field = match self.evaluate(&tuple.elems[1]) {
                Ok(field) => field,
                Err(err) => {
                    warn!(field = %name, %err, "unresolved field type, treating as any");
                    schema::any()
                }
            };
            fields.insert(name, field);
        }
        Ok(fields)
    }
}

/// Whether `expr` is recognizably an `object(..)` construction, possibly behind lazy
/// initializers and combinator chains.
pub fn is_object_construction(expr: &Expr) -> bool {
    match expr {
        Expr::Paren(p) => is_object_construction(&p.expr),
        Expr::Group(g) => is_object_construction(&g.expr),
        Expr::Reference(r) => is_object_construction(&r.expr),
        Expr::Closure(c) => is_object_construction(&c.body),
        Expr::Block(b) => block_tail(&b.block).is_some_and(is_object_construction),
        Expr::MethodCall(call) => is_object_construction(&call.receiver),
        Expr::Call(call) => match callee_name(&call.func).as_deref() {
            Some("object") => true,
            Some("new") => call.args.first().is_some_and(is_object_construction),
            _ => false,
        },
        _ => false,
    }
}

fn block_tail(block: &syn::Block) -> Option<&Expr> {
    match block.stmts.last() {
        Some(Stmt::Expr(expr, None)) => Some(expr),
        _ => None,
    }
}

fn callee_name(func: &Expr) -> Option<String> {
    match func {
        Expr::Path(path) => path.path.segments.last().map(|s| s.ident.to_string()),
        _ => None,
    }
}

fn string_literal(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Lit(syn::ExprLit {
            lit: Lit::Str(s), ..
        }) => Some(s.value()),
        _ => None,
    }
}

fn string_list(expr: &Expr) -> AppResult<Vec<String>> {
    let elements = match expr {
        Expr::Array(array) => &array.elems,
        Expr::Reference(r) => return string_list(&r.expr),
        _ => return Err(unsupported(expr)),
    };
    elements
        .iter()
        .map(|e| string_literal(e).ok_or_else(|| unsupported(e)))
        .collect()
}

fn literal_value(expr: &Expr) -> Value {
    let Expr::Lit(lit) = expr else {
        return Value::Null;
    };
    match &lit.lit {
        Lit::Str(s) => Value::String(s.value()),
        Lit::Bool(b) => Value::Bool(b.value),
        Lit::Int(i) => i
            .base10_parse::<i64>()
            .map_or(Value::Null, |n| Value::Number(n.into())),
        Lit::Float(f) => f
            .base10_parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map_or(Value::Null, Value::Number),
        _ => Value::Null,
    }
}

fn unsupported(expr: &Expr) -> AppError {
    AppError::UnsupportedSchema(expr.to_token_stream().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{to_descriptor, PrimitiveKind, SchemaDescriptor};
    use serde_json::json;

    fn expr(code: &str) -> Expr {
        syn::parse_str(code).unwrap()
    }

    #[test]
    fn test_resolves_ordered_fields() {
        let node = expr(
            r#"object([
                ("title", string().min(1)),
                ("count", schema::number().optional()),
                ("tags", array(string())),
            ])"#,
        );
        let fields = BuilderExprResolver.resolve_field_types(&node).unwrap();
        let names: Vec<_> = fields.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["title", "count", "tags"]);
        assert!(fields[1].1.is_optional());
        assert!(fields[2].1.is_array());
        assert!(matches!(fields[0].1, Schema::Effects(_, ref r) if r.name() == "min"));
    }

    #[test]
    fn test_peels_lazy_initializers() {
        let node = expr(
            r#"LazyLock::new(|| {
                schema::object(vec![("q", schema::string())]).refine("x", |_| true)
            })"#,
        );
        assert!(is_object_construction(&node));
        let fields = BuilderExprResolver.resolve_field_types(&node).unwrap();
        assert_eq!(fields.len(), 1);
    }

    #[test]
    fn test_non_object_constructions_are_rejected() {
        assert!(!is_object_construction(&expr("string()")));
        assert!(!is_object_construction(&expr("build_schema()")));
        assert!(!is_object_construction(&expr("OTHER_SCHEMA.clone()")));
        assert!(BuilderExprResolver
            .resolve_field_types(&expr("array(string())"))
            .is_err());
    }

    #[test]
    fn test_rejection_names_the_expression() {
        let err = BuilderExprResolver
            .resolve_field_types(&expr("array(string())"))
            .unwrap_err();
        assert!(matches!(err, AppError::UnsupportedSchema(ref msg) if msg.contains("array") && msg.contains("not an object schema")));
    }

    #[test]
    fn test_unresolved_fields_degrade_to_any() {
        let node = expr(r#"object([("custom", my_helper()), ("ok", boolean())])"#);
        let fields = BuilderExprResolver.resolve_field_types(&node).unwrap();
        assert!(matches!(fields[0].1, Schema::Any));
        assert_eq!(
            to_descriptor(&fields[0].1),
            SchemaDescriptor::primitive(PrimitiveKind::Undefined)
        );
        assert!(fields[1].1.is_boolean());
    }

    #[test]
    fn test_default_literals_are_kept() {
        let schema = BuilderExprResolver
            .evaluate(&expr(r#"number().coerce().default(20)"#))
            .unwrap();
        match schema {
            Schema::Default(_, value) => assert_eq!(value, json!(20)),
            other => panic!("expected default, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_objects_and_enums() {
        let schema = BuilderExprResolver
            .evaluate(&expr(
                r#"object(&[
                    ("author", object([("name", string())]).nullable()),
                    ("sort", enumeration(["asc", "desc"])),
                ])"#,
            ))
            .unwrap();
        let fields = schema.named_fields().unwrap();
        assert_eq!(fields["author"].named_fields().map(|f| f.len()), Some(1));
        assert!(matches!(&fields["sort"], Schema::Enum(v) if v.len() == 2));
    }
}
