#![deny(missing_docs)]

//! # Artifact Generation
//!
//! Renders a [`Registry`] as a Rust module that consumer code compiles against.
//!
//! The module groups endpoints by method:
//!
//! ```text
//! pub mod post {
//!     use super::*;
//!
//!     pub struct Posts;
//!
//!     impl Endpoint for Posts {
//!         const METHOD: Method = Method::Post;
//!         const PATTERN: &'static str = "/posts";
//!         type Body = PostsBody;
//!         type RouteParams = NoData;
//!         type SearchParams = PostsSearchParams;
//!     }
//!     ...
//! }
//! ```
//!
//! Source text is built as strings, re-parsed with `syn` to catch generator bugs,
//! and normalized with `prettyplease` so that an unchanged registry always produces
//! byte-identical output.

use crate::config::GeneratorConfig;
use crate::descriptor::{ObjectDescriptor, PrimitiveKind, SchemaDescriptor};
use crate::error::{AppError, AppResult};
use crate::method::Method;
use crate::registry::{ContractDescriptor, Registry};
use heck::{ToSnakeCase, ToUpperCamelCase};
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Warning placed at the top of every artifact.
pub const BANNER: &str = "\
// @generated by routegen from the endpoint files under the routes directory.
// Do not edit by hand: this file is rewritten whenever an endpoint changes.

";

const RESERVED: &[&str] = &[
    "as", "async", "await", "box", "break", "const", "continue", "do", "dyn", "else", "enum",
    "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in", "let", "loop", "macro",
    "match", "mod", "move", "mut", "override", "priv", "pub", "ref", "return", "static", "struct",
    "trait", "true", "try", "type", "typeof", "unsafe", "unsized", "use", "virtual", "where",
    "while", "yield", "abstract", "become",
];

/// Keywords that cannot be written as raw identifiers.
const NON_RAW: &[&str] = &["self", "Self", "super", "crate"];

/// Generator settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodegenOptions {
    /// Path of the crate providing `Endpoint`, `Method`, `NoData`, `serde` and
    /// `serde_json` to the generated module.
    pub runtime_crate: String,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            runtime_crate: "routegen".to_string(),
        }
    }
}

impl From<&GeneratorConfig> for CodegenOptions {
    fn from(config: &GeneratorConfig) -> Self {
        Self {
            runtime_crate: config.runtime_crate.clone(),
        }
    }
}

/// Renders the registry as formatted Rust source, banner included.
///
/// Output is ordered by method (declaration order) then URL pattern.
pub fn serialize(registry: &Registry, options: &CodegenOptions) -> AppResult<String> {
    let rt = options.runtime_crate.as_str();
    let mut code = String::new();

    code.push_str("#[allow(unused_imports)]\n");
    code.push_str(&format!("use {}::{{Endpoint, Method, NoData}};\n\n", rt));

    let mut table = Vec::new();
    for method in Method::ALL {
        let contracts = registry.contracts_for(method);
        if contracts.is_empty() {
            continue;
        }
        let mut module = ModuleWriter::new(rt, method);
        for (pattern, contract) in &contracts {
            module.endpoint(pattern, contract);
            table.push(format!("(Method::{}, {:?})", method.variant_name(), pattern));
        }
        code.push_str(&module.finish());
    }

    code.push_str("/// Every `(method, pattern)` pair served by the application.\n");
    code.push_str(&format!(
        "pub const ROUTES: &[(Method, &str)] = &[{}];\n",
        table.join(", ")
    ));

    let file = syn::parse_file(&code)
        .map_err(|e| AppError::Codegen(format!("generated code does not parse: {}", e)))?;
    Ok(format!("{}{}", BANNER, prettyplease::unparse(&file)))
}

/// Serializes the registry and atomically replaces the artifact at `path`.
///
/// The text goes to a temporary file in the artifact's directory which is then
/// persisted over the target, so readers never observe a partial artifact. An
/// artifact that already holds the same text is left untouched.
pub fn emit(registry: &Registry, path: &Path, options: &CodegenOptions) -> AppResult<()> {
    let code = serialize(registry, options)?;

    if fs::read_to_string(path).is_ok_and(|existing| existing == code) {
        debug!(artifact = %path.display(), "artifact already up to date");
        return Ok(());
    }

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(code.as_bytes())?;
    file.flush()?;
    file.persist(path).map_err(|e| AppError::Io(e.error))?;

    info!(
        artifact = %path.display(),
        routes = registry.len(),
        generation = registry.generation(),
        "artifact written"
    );
    Ok(())
}

/// Hands out unique identifiers within one namespace.
#[derive(Default)]
struct Namer {
    taken: HashSet<String>,
}

impl Namer {
    fn claim(&mut self, base: &str) -> String {
        if self.taken.insert(base.to_string()) {
            return base.to_string();
        }
        let mut n = 2;
        loop {
            let candidate = format!("{}{}", base, n);
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Builds one `pub mod <method> { .. }` block.
struct ModuleWriter<'a> {
    rt: &'a str,
    method: Method,
    names: Namer,
    items: Vec<String>,
}

impl<'a> ModuleWriter<'a> {
    fn new(rt: &'a str, method: Method) -> Self {
        Self {
            rt,
            method,
            names: Namer::default(),
            items: Vec::new(),
        }
    }

    fn endpoint(&mut self, pattern: &str, contract: &ContractDescriptor) {
        let name = self.names.claim(&endpoint_name(pattern));

        let body = self.piece(contract.body.as_ref(), &format!("{}Body", name));
        let route_params =
            self.piece(contract.route_params.as_ref(), &format!("{}RouteParams", name));
        let search_params =
            self.piece(contract.search_params.as_ref(), &format!("{}SearchParams", name));

        let mut code = String::new();
        code.push_str(&format!("/// `{} {}`\n", self.method, pattern));
        code.push_str(&format!("pub struct {};\n\n", name));
        code.push_str(&format!("impl Endpoint for {} {{\n", name));
        code.push_str(&format!(
            "    const METHOD: Method = Method::{};\n",
            self.method.variant_name()
        ));
        code.push_str(&format!("    const PATTERN: &'static str = {:?};\n", pattern));
        code.push_str(&format!("    type Body = {};\n", body));
        code.push_str(&format!("    type RouteParams = {};\n", route_params));
        code.push_str(&format!("    type SearchParams = {};\n", search_params));
        code.push_str("}\n");

        // Follows the shapes it references.
        self.items.push(code);
    }

    fn piece(&mut self, descriptor: Option<&SchemaDescriptor>, hint: &str) -> String {
        match descriptor {
            Some(descriptor) => self.rust_type(descriptor, hint),
            None => "NoData".to_string(),
        }
    }

    fn rust_type(&mut self, descriptor: &SchemaDescriptor, hint: &str) -> String {
        match descriptor {
            SchemaDescriptor::Primitive { of } => match of {
                PrimitiveKind::String => "String".to_string(),
                PrimitiveKind::Number => "f64".to_string(),
                PrimitiveKind::Boolean => "bool".to_string(),
                PrimitiveKind::Null => "()".to_string(),
                PrimitiveKind::Undefined => format!("{}::serde_json::Value", self.rt),
            },
            SchemaDescriptor::Object(object) => {
                let name = self.names.claim(hint);
                self.record(&name, object);
                name
            }
            SchemaDescriptor::Array { element } => {
                format!("Vec<{}>", self.rust_type(element, &format!("{}Item", hint)))
            }
            SchemaDescriptor::Optional { inner } | SchemaDescriptor::Nullable { inner } => {
                option_of(self.rust_type(inner, hint))
            }
        }
    }

    fn record(&mut self, name: &str, object: &ObjectDescriptor) {
        let mut fields = String::new();
        let mut idents = Namer::default();

        for (field, descriptor) in &object.fields {
            let hint = format!("{}{}", name, field.to_upper_camel_case());
            let mut ty = self.rust_type(descriptor, &hint);
            let ident = idents.claim(&field_ident(field));

            let mut attrs = Vec::new();
            if ident.trim_start_matches("r#") != field {
                attrs.push(format!("rename = {:?}", field));
            }
            if object.is_optional(field) {
                ty = option_of(ty);
                attrs.push("default".to_string());
                attrs.push("skip_serializing_if = \"Option::is_none\"".to_string());
            }
            if !attrs.is_empty() {
                fields.push_str(&format!("    #[serde({})]\n", attrs.join(", ")));
            }
            fields.push_str(&format!("    pub {}: {},\n", ident, ty));
        }

        let mut code = String::new();
        code.push_str(&format!(
            "#[derive(Debug, Clone, PartialEq, {rt}::serde::Serialize, {rt}::serde::Deserialize)]\n",
            rt = self.rt
        ));
        code.push_str(&format!("#[serde(crate = \"{}::serde\")]\n", self.rt));
        code.push_str(&format!("pub struct {} {{\n{}}}\n", name, fields));
        self.items.push(code);
    }

    fn finish(self) -> String {
        let mut code = format!("pub mod {} {{\n", self.method.module_name());
        code.push_str("    use super::*;\n\n");
        for item in &self.items {
            code.push_str(item);
            code.push('\n');
        }
        code.push_str("}\n\n");
        code
    }
}

fn option_of(ty: String) -> String {
    if ty.starts_with("Option<") {
        ty
    } else {
        format!("Option<{}>", ty)
    }
}

/// Type name for a URL pattern: `/users/[id]` → `UsersId`, `/` → `Index`.
fn endpoint_name(pattern: &str) -> String {
    let name = pattern.to_upper_camel_case();
    if name.is_empty() {
        "Index".to_string()
    } else if name.starts_with(|c: char| c.is_ascii_digit()) {
        format!("Route{}", name)
    } else {
        name
    }
}

/// Field identifier for a JSON key: `createdAt` → `created_at`, `type` → `r#type`.
fn field_ident(key: &str) -> String {
    let snake = key.to_snake_case();
    if snake.is_empty() || snake.starts_with(|c: char| c.is_ascii_digit()) {
        format!("field_{}", snake)
    } else if NON_RAW.contains(&snake.as_str()) {
        format!("{}_", snake)
    } else if RESERVED.contains(&snake.as_str()) {
        format!("r#{}", snake)
    } else {
        snake
    }
}
