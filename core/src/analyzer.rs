#![deny(missing_docs)]

//! # Endpoint File Analyzer
//!
//! Reads one endpoint file and reports which methods it serves and the contract
//! declared for each.
//!
//! Two kinds of top-level items are recognized:
//!
//! * a `pub` function, constant or static named after a method (`GET`, `POST`, ...)
//!   declares that the route serves that method;
//! * a constant or static named `_<METHOD>_SCHEMA` (or `_<Method>Schema`) whose
//!   initializer builds an `object(..)` schema declares the contract for that method.
//!
//! ```text
//! static _POST_SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
//!     object([
//!         ("title", string()),
//!         ("searchParams", object([("draft", boolean())])),
//!     ])
//! });
//!
//! pub async fn POST(req: HttpRequest, body: Bytes) -> impl Responder { .. }
//! ```
//!
//! The `searchParams` field is split off into the query contract. Route parameters
//! come from the companion type file, never from the endpoint itself.

use crate::config::GeneratorConfig;
use crate::descriptor::{search_param_violations, to_descriptor, SchemaDescriptor};
use crate::error::{AppError, AppResult};
use crate::method::Method;
use crate::registry::ContractDescriptor;
use crate::resolver::{is_object_construction, BuilderExprResolver, TypeResolver};
use crate::route_types::{read_route_types, RouteTypes};
use crate::routes::RouteLayout;
use crate::schema::{self, Schema};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use syn::visit::Visit;
use syn::{Expr, Ident, Visibility};
use tracing::{debug, warn};

/// Name of the schema field carrying query parameters.
pub const SEARCH_PARAMS_FIELD: &str = "searchParams";

/// What one endpoint file declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisResult {
    /// URL pattern derived from the file location.
    pub route_id: String,
    /// The analyzed file.
    pub source: PathBuf,
    /// Served methods and their contracts.
    pub methods: BTreeMap<Method, ContractDescriptor>,
}

/// Analyzes endpoint files. Cheap to clone; safe to share across tasks.
#[derive(Clone)]
pub struct Analyzer {
    layout: RouteLayout,
    resolver: Arc<dyn TypeResolver>,
}

impl Analyzer {
    /// An analyzer using the builder-expression resolver.
    pub fn new(config: &GeneratorConfig) -> Self {
        Self::with_resolver(config, Arc::new(BuilderExprResolver))
    }

    /// An analyzer using a custom type resolver.
    pub fn with_resolver(config: &GeneratorConfig, resolver: Arc<dyn TypeResolver>) -> Self {
        Self {
            layout: RouteLayout::new(config),
            resolver,
        }
    }

    /// The routing convention in use.
    pub fn layout(&self) -> &RouteLayout {
        &self.layout
    }

    /// Reads and analyzes the endpoint file at `path`, along with its companion
    /// type file when one exists.
    pub fn analyze_file(&self, path: &Path) -> AppResult<AnalysisResult> {
        let route_id = self.layout.route_id(path).ok_or_else(|| {
            AppError::General(format!("{:?} is not an endpoint file", path))
        })?;
        let code = fs::read_to_string(path)?;

        let route_types = match self.layout.companion_types_path(path) {
            Some(companion) => read_route_types(&companion)?,
            None => None,
        };
        if let Some(declared) = route_types.as_ref().and_then(|t| t.route_id.as_deref()) {
            if declared != route_id {
                warn!(
                    file = %path.display(),
                    declared,
                    derived = %route_id,
                    "companion ROUTE_ID disagrees with the file location"
                );
            }
        }

        self.analyze_source(&route_id, path, &code, route_types.as_ref())
    }

    /// Analyzes endpoint source text already in memory.
    pub fn analyze_source(
        &self,
        route_id: &str,
        path: &Path,
        code: &str,
        route_types: Option<&RouteTypes>,
    ) -> AppResult<AnalysisResult> {
        let file = syn::parse_file(code).map_err(|e| AppError::parse(path, e))?;
        let mut visitor = EndpointVisitor::default();
        visitor.visit_file(&file);

        let route_params = route_types.and_then(RouteTypes::descriptor);

        for method in visitor.schemas.keys() {
            if !visitor.exported.contains(method) {
                warn!(
                    file = %path.display(),
                    %method,
                    "schema declared for a method the file does not export"
                );
            }
        }

        let mut methods = BTreeMap::new();
        for method in &visitor.exported {
            let mut contract = ContractDescriptor {
                route_params: route_params.clone(),
                ..ContractDescriptor::default()
            };
            if let Some(expr) = visitor.schemas.get(method) {
                self.apply_schema(*method, expr, &mut contract, path);
            }
            methods.insert(*method, contract);
        }

        Ok(AnalysisResult {
            route_id: route_id.to_string(),
            source: path.to_path_buf(),
            methods,
        })
    }

    fn apply_schema(
        &self,
        method: Method,
        expr: &Expr,
        contract: &mut ContractDescriptor,
        path: &Path,
    ) {
        let fields = match self.resolver.resolve_field_types(expr) {
            Ok(fields) => fields,
            Err(err) => {
                warn!(file = %path.display(), %method, %err, "schema could not be resolved");
                return;
            }
        };

        let mut body: Vec<(String, Schema)> = Vec::new();
        for (name, field) in fields {
            if name == SEARCH_PARAMS_FIELD {
                contract.search_params = search_params_descriptor(&field, method, path);
            } else {
                body.push((name, field));
            }
        }

        if body.is_empty() {
            return;
        }
        if method.carries_body() {
            contract.body = Some(to_descriptor(&schema::object(body)));
        } else {
            debug!(
                file = %path.display(),
                %method,
                "ignoring body fields, this method carries no body"
            );
        }
    }
}

fn search_params_descriptor(
    field: &Schema,
    method: Method,
    path: &Path,
) -> Option<SchemaDescriptor> {
    let descriptor = to_descriptor(field);
    let Some(object) = descriptor.as_object() else {
        warn!(
            file = %path.display(),
            %method,
            "the field `searchParams` has to be an object schema"
        );
        return None;
    };

    let violations = search_param_violations(object);
    if !violations.is_empty() {
        warn!(
            file = %path.display(),
            %method,
            fields = ?violations,
            "some `searchParams` fields are not string-compatible, validation may fail"
        );
    }
    Some(SchemaDescriptor::Object(object.clone()))
}

/// Method whose schema a declaration named `name` holds, per the
/// `_<METHOD>_SCHEMA` / `_<Method>Schema` convention.
fn schema_method(name: &str) -> Option<Method> {
    static SCHEMA_NAME_RE: OnceLock<Regex> = OnceLock::new();
    let re = SCHEMA_NAME_RE.get_or_init(|| {
        Regex::new(r"^_([A-Za-z]+?)_?(?:SCHEMA|Schema|schema)$").expect("Invalid regex")
    });
    let caps = re.captures(name)?;
    Method::from_token(&caps[1].to_uppercase())
}

/// Collects method exports and schema declarations from top-level items only.
#[derive(Default)]
struct EndpointVisitor {
    exported: BTreeSet<Method>,
    schemas: BTreeMap<Method, Expr>,
}

impl EndpointVisitor {
    fn declaration(&mut self, vis: &Visibility, ident: &Ident, expr: &Expr) {
        let name = ident.to_string();
        if let Some(method) = Method::from_token(&name) {
            if matches!(vis, Visibility::Public(_)) {
                self.exported.insert(method);
            }
        } else if let Some(method) = schema_method(&name) {
            if is_object_construction(expr) {
                self.schemas.insert(method, expr.clone());
            } else {
                debug!(%name, "schema declaration is not an object construction, ignoring");
            }
        }
    }
}

impl<'ast> Visit<'ast> for EndpointVisitor {
    fn visit_item_fn(&mut self, item: &'ast syn::ItemFn) {
        if matches!(item.vis, Visibility::Public(_)) {
            if let Some(method) = Method::from_token(&item.sig.ident.to_string()) {
                self.exported.insert(method);
            }
        }
    }

    fn visit_item_const(&mut self, item: &'ast syn::ItemConst) {
        self.declaration(&item.vis, &item.ident, &item.expr);
    }

    fn visit_item_static(&mut self, item: &'ast syn::ItemStatic) {
        self.declaration(&item.vis, &item.ident, &item.expr);
    }

    // Nested modules, impls and traits are not part of the endpoint's surface.
    fn visit_item_mod(&mut self, _: &'ast syn::ItemMod) {}

    fn visit_item_impl(&mut self, _: &'ast syn::ItemImpl) {}

    fn visit_item_trait(&mut self, _: &'ast syn::ItemTrait) {}
}
