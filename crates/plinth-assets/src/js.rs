//! Script bundler.
//!
//! Resolves the relative-import graph of a single entry module, splices the
//! modules into one shared scope, and prints a UMD bundle (global name
//! `app`) with a source map. Early-rollup assumptions apply: modules share
//! one scope, so top-level names must not collide across modules, and
//! imports must be relative (`./x`, `../x`) with bare specifiers rejected.
//! The source map resolves positions against the assembled bundle text,
//! not the individual source modules.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    BindingPatternKind, Declaration, ExportDefaultDeclarationKind, ImportDeclarationSpecifier,
    Statement,
};
use oxc_codegen::{Codegen, CodegenOptions};
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType, Span};

/// Global the UMD wrapper registers the entry's exports under.
const UMD_GLOBAL: &str = "app";

/// Configuration for one bundling run.
#[derive(Debug, Clone)]
pub struct BundleOptions {
    /// Entry module.
    pub entry: PathBuf,

    /// Bundle output path; the map lands next to it as `<out_file>.map`.
    pub out_file: PathBuf,

    /// Apply the compact printing pass.
    pub minify: bool,
}

/// What a bundling run produced.
#[derive(Debug)]
pub struct BundleOutput {
    pub out_file: PathBuf,
    pub map_file: PathBuf,

    /// Number of modules inlined into the bundle.
    pub modules: usize,
}

/// Errors from the script bundler.
#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error("Failed to read {0}: {1}")]
    Read(String, String),

    #[error("Failed to parse {0}: {1}")]
    Parse(String, String),

    #[error("Bare import \"{0}\" in {1}: only relative imports are bundled")]
    BareImport(String, String),

    #[error("Circular import involving {0}")]
    CircularImport(String),

    #[error("\"{0}\" has no export named {1} (imported by {2})")]
    MissingExport(String, String, String),

    #[error("Unsupported syntax in {0}: {1}")]
    Unsupported(String, String),

    #[error("Failed to write {0}: {1}")]
    Write(String, String),
}

/// Bundle the entry module and everything it reaches.
pub fn bundle_js(options: &BundleOptions) -> Result<BundleOutput, BundleError> {
    let entry = options
        .entry
        .canonicalize()
        .map_err(|e| BundleError::Read(options.entry.display().to_string(), e.to_string()))?;

    let mut walker = GraphWalker::default();
    walker.visit(&entry)?;

    let entry_exports = walker.exports.get(&entry).cloned().unwrap_or_default();
    let wrapped = umd_wrap(&walker.ordered, &entry_exports);

    let (mut code, map_json) = print_bundle(&wrapped, options.minify, &options.out_file)?;

    let map_file = {
        let mut name = options.out_file.as_os_str().to_os_string();
        name.push(".map");
        PathBuf::from(name)
    };
    let map_name = map_file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("bundle.js.map");
    code.push_str(&format!("\n//# sourceMappingURL={}\n", map_name));

    if let Some(parent) = options.out_file.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| BundleError::Write(parent.display().to_string(), e.to_string()))?;
    }
    fs::write(&options.out_file, code)
        .map_err(|e| BundleError::Write(options.out_file.display().to_string(), e.to_string()))?;
    fs::write(&map_file, map_json)
        .map_err(|e| BundleError::Write(map_file.display().to_string(), e.to_string()))?;

    tracing::info!(
        "Bundled {} module(s) into {}",
        walker.ordered.len(),
        options.out_file.display()
    );

    Ok(BundleOutput {
        out_file: options.out_file.clone(),
        map_file,
        modules: walker.ordered.len(),
    })
}

/// One module's contribution to the bundle, after splicing.
#[derive(Debug)]
struct Module {
    code: String,
}

/// Exported surface of a module: `(exported name, local binding)` pairs
/// plus the local binding of the default export.
#[derive(Debug, Clone, Default)]
struct ModuleExports {
    named: Vec<(String, String)>,
    default: Option<String>,
}

impl ModuleExports {
    fn local_of(&self, exported: &str) -> Option<&str> {
        self.named
            .iter()
            .find(|(name, _)| name == exported)
            .map(|(_, local)| local.as_str())
    }
}

#[derive(Debug)]
enum ImportBinding {
    Default { local: String },
    Named { imported: String, local: String },
    Namespace { local: String },
}

/// An import statement lifted out of the AST as owned data, so dependency
/// modules can be processed before the splice is computed.
#[derive(Debug)]
struct RawImport {
    span: Span,
    specifier: String,
    bindings: Vec<ImportBinding>,
}

#[derive(Debug)]
struct ParsedModule {
    imports: Vec<RawImport>,
    export_edits: Vec<(Span, String)>,
    exports: ModuleExports,
}

/// Post-order walk over the module graph: dependencies land in the bundle
/// before their importers.
#[derive(Debug, Default)]
struct GraphWalker {
    exports: HashMap<PathBuf, ModuleExports>,
    in_progress: HashSet<PathBuf>,
    ordered: Vec<Module>,
}

impl GraphWalker {
    fn visit(&mut self, path: &Path) -> Result<(), BundleError> {
        if self.exports.contains_key(path) {
            return Ok(());
        }
        self.in_progress.insert(path.to_path_buf());

        let source = fs::read_to_string(path)
            .map_err(|e| BundleError::Read(path.display().to_string(), e.to_string()))?;
        let parsed = parse_module(path, &source)?;

        let mut resolved = Vec::with_capacity(parsed.imports.len());
        for import in &parsed.imports {
            let dep = resolve_import(path, &import.specifier)?;
            if self.in_progress.contains(&dep) {
                return Err(BundleError::CircularImport(dep.display().to_string()));
            }
            self.visit(&dep)?;
            resolved.push(dep);
        }

        let mut edits = parsed.export_edits;
        for (import, dep) in parsed.imports.iter().zip(&resolved) {
            let dep_exports = &self.exports[dep];
            let replacement = rebind_import(import, dep_exports, path)?;
            edits.push((import.span, replacement));
        }

        let code = apply_edits(&source, edits);

        self.in_progress.remove(path);
        self.exports.insert(path.to_path_buf(), parsed.exports);
        self.ordered.push(Module { code });
        Ok(())
    }
}

/// Resolve a relative specifier against the importing file, defaulting the
/// `.js` extension.
fn resolve_import(from: &Path, specifier: &str) -> Result<PathBuf, BundleError> {
    if !(specifier.starts_with("./") || specifier.starts_with("../")) {
        return Err(BundleError::BareImport(
            specifier.to_string(),
            from.display().to_string(),
        ));
    }

    let dir = from.parent().unwrap_or_else(|| Path::new("."));
    let mut candidate = dir.join(specifier);
    if candidate.extension().is_none() {
        candidate.set_extension("js");
    }

    candidate
        .canonicalize()
        .map_err(|e| BundleError::Read(candidate.display().to_string(), e.to_string()))
}

fn parse_module(path: &Path, source: &str) -> Result<ParsedModule, BundleError> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, SourceType::mjs()).parse();
    if let Some(error) = ret.errors.first() {
        return Err(BundleError::Parse(
            path.display().to_string(),
            error.to_string(),
        ));
    }

    let mut imports = Vec::new();
    let mut export_edits = Vec::new();
    let mut exports = ModuleExports::default();

    for stmt in &ret.program.body {
        match stmt {
            Statement::ImportDeclaration(decl) => {
                let mut bindings = Vec::new();
                if let Some(specifiers) = &decl.specifiers {
                    for spec in specifiers {
                        match spec {
                            ImportDeclarationSpecifier::ImportSpecifier(s) => {
                                bindings.push(ImportBinding::Named {
                                    imported: s.imported.name().to_string(),
                                    local: s.local.name.to_string(),
                                });
                            }
                            ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => {
                                bindings.push(ImportBinding::Default {
                                    local: s.local.name.to_string(),
                                });
                            }
                            ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => {
                                bindings.push(ImportBinding::Namespace {
                                    local: s.local.name.to_string(),
                                });
                            }
                        }
                    }
                }
                imports.push(RawImport {
                    span: decl.span,
                    specifier: decl.source.value.to_string(),
                    bindings,
                });
            }

            Statement::ExportNamedDeclaration(decl) => {
                if decl.source.is_some() {
                    return Err(BundleError::Unsupported(
                        path.display().to_string(),
                        "re-export from another module".to_string(),
                    ));
                }
                if let Some(inner) = &decl.declaration {
                    for name in declared_names(inner) {
                        exports.named.push((name.clone(), name));
                    }
                    // `export const x = ...` keeps only the declaration.
                    export_edits.push((decl.span, span_text(source, inner.span()).to_string()));
                } else {
                    for spec in &decl.specifiers {
                        exports
                            .named
                            .push((spec.exported.name().to_string(), spec.local.name().to_string()));
                    }
                    export_edits.push((decl.span, String::new()));
                }
            }

            Statement::ExportDefaultDeclaration(decl) => {
                let (binding, replacement) = match &decl.declaration {
                    ExportDefaultDeclarationKind::FunctionDeclaration(f) if f.id.is_some() => {
                        let name = f.id.as_ref().map(|id| id.name.to_string()).unwrap_or_default();
                        (name, span_text(source, decl.declaration.span()).to_string())
                    }
                    ExportDefaultDeclarationKind::ClassDeclaration(c) if c.id.is_some() => {
                        let name = c.id.as_ref().map(|id| id.name.to_string()).unwrap_or_default();
                        (name, span_text(source, decl.declaration.span()).to_string())
                    }
                    _ => {
                        let name = default_binding_name(path);
                        let text = span_text(source, decl.declaration.span());
                        (name.clone(), format!("const {} = {};", name, text))
                    }
                };
                exports.default = Some(binding);
                export_edits.push((decl.span, replacement));
            }

            Statement::ExportAllDeclaration(_) => {
                return Err(BundleError::Unsupported(
                    path.display().to_string(),
                    "`export *` is not supported".to_string(),
                ));
            }

            _ => {}
        }
    }

    Ok(ParsedModule {
        imports,
        export_edits,
        exports,
    })
}

/// Top-level names introduced by an exported declaration. Destructuring
/// patterns are skipped; modules here export plain bindings.
fn declared_names(decl: &Declaration) -> Vec<String> {
    match decl {
        Declaration::VariableDeclaration(var) => var
            .declarations
            .iter()
            .filter_map(|d| match &d.id.kind {
                BindingPatternKind::BindingIdentifier(id) => Some(id.name.to_string()),
                _ => None,
            })
            .collect(),
        Declaration::FunctionDeclaration(f) => {
            f.id.iter().map(|id| id.name.to_string()).collect()
        }
        Declaration::ClassDeclaration(c) => c.id.iter().map(|id| id.name.to_string()).collect(),
        _ => Vec::new(),
    }
}

/// Replace an import statement with the aliases its bindings need, now that
/// the dependency's top-level names are in scope.
fn rebind_import(
    import: &RawImport,
    dep: &ModuleExports,
    importer: &Path,
) -> Result<String, BundleError> {
    let mut lines = Vec::new();

    for binding in &import.bindings {
        match binding {
            ImportBinding::Default { local } => {
                let default = dep.default.as_ref().ok_or_else(|| {
                    BundleError::MissingExport(
                        import.specifier.clone(),
                        "default".to_string(),
                        importer.display().to_string(),
                    )
                })?;
                if default != local {
                    lines.push(format!("const {} = {};", local, default));
                }
            }
            ImportBinding::Named { imported, local } => {
                let source_local = dep.local_of(imported).ok_or_else(|| {
                    BundleError::MissingExport(
                        import.specifier.clone(),
                        imported.clone(),
                        importer.display().to_string(),
                    )
                })?;
                if source_local != local {
                    lines.push(format!("const {} = {};", local, source_local));
                }
            }
            ImportBinding::Namespace { local } => {
                let mut fields: Vec<String> = dep
                    .named
                    .iter()
                    .map(|(exported, source_local)| format!("{}: {}", exported, source_local))
                    .collect();
                if let Some(default) = &dep.default {
                    fields.push(format!("default: {}", default));
                }
                lines.push(format!(
                    "const {} = Object.freeze({{ {} }});",
                    local,
                    fields.join(", ")
                ));
            }
        }
    }

    Ok(lines.join("\n"))
}

fn span_text(source: &str, span: Span) -> &str {
    &source[span.start as usize..span.end as usize]
}

/// Apply non-overlapping span replacements to a module source.
fn apply_edits(source: &str, mut edits: Vec<(Span, String)>) -> String {
    edits.sort_by_key(|(span, _)| span.start);

    let mut out = String::with_capacity(source.len());
    let mut cursor = 0usize;
    for (span, replacement) in edits {
        out.push_str(&source[cursor..span.start as usize]);
        out.push_str(&replacement);
        cursor = span.end as usize;
    }
    out.push_str(&source[cursor..]);
    out
}

/// Binding name for an anonymous default export, derived from the file stem.
fn default_binding_name(path: &Path) -> String {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("module");
    let mut name: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if name.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    format!("{}_default", name)
}

/// Wrap the spliced modules in a UMD shell exposing the entry's exports.
fn umd_wrap(modules: &[Module], entry_exports: &ModuleExports) -> String {
    let mut body = String::new();
    for module in modules {
        let code = module.code.trim();
        if !code.is_empty() {
            body.push_str(code);
            body.push_str("\n\n");
        }
    }

    for (exported, local) in &entry_exports.named {
        body.push_str(&format!("exports.{} = {};\n", exported, local));
    }
    if let Some(default) = &entry_exports.default {
        body.push_str(&format!("exports.default = {};\n", default));
    }

    format!(
        "(function (global, factory) {{\n\
         typeof exports === 'object' && typeof module !== 'undefined' ? factory(exports) :\n\
         typeof define === 'function' && define.amd ? define(['exports'], factory) :\n\
         (global = typeof globalThis !== 'undefined' ? globalThis : global || self, \
         factory(global.{name} = {{}}));\n\
         }})(this, (function (exports) {{ 'use strict';\n\n{body}}}));\n",
        name = UMD_GLOBAL,
        body = body
    )
}

/// Print the assembled bundle, compact or not, with a source map.
fn print_bundle(
    source: &str,
    minify: bool,
    out_file: &Path,
) -> Result<(String, String), BundleError> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, SourceType::cjs()).parse();
    if let Some(error) = ret.errors.first() {
        return Err(BundleError::Parse(
            "assembled bundle".to_string(),
            error.to_string(),
        ));
    }

    let output = Codegen::new()
        .with_options(CodegenOptions {
            minify,
            source_map_path: Some(out_file.to_path_buf()),
            ..CodegenOptions::default()
        })
        .build(&ret.program);

    let map_json = output
        .map
        .map(|map| map.to_json_string())
        .unwrap_or_else(|| r#"{"version":3,"sources":[],"names":[],"mappings":""}"#.to_string());

    Ok((output.code, map_json))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn bundle(entry: PathBuf, out_file: PathBuf, minify: bool) -> Result<BundleOutput, BundleError> {
        bundle_js(&BundleOptions {
            entry,
            out_file,
            minify,
        })
    }

    #[test]
    fn umd_output_with_named_and_default_exports() {
        let temp = tempdir().unwrap();
        let entry = write(
            temp.path(),
            "app.js",
            "export function greet(name) { return 'hi ' + name; }\nexport default class App {}\n",
        );

        let out = temp.path().join("dist/app.js");
        let result = bundle(entry, out.clone(), false).unwrap();

        let code = fs::read_to_string(&out).unwrap();
        assert!(code.contains("global.app"));
        assert!(code.contains("exports.greet = greet"));
        assert!(code.contains("exports.default = App"));
        assert!(code.contains("//# sourceMappingURL=app.js.map"));

        let map = fs::read_to_string(&result.map_file).unwrap();
        assert!(map.contains("\"version\""));
        assert_eq!(result.map_file, temp.path().join("dist/app.js.map"));
    }

    #[test]
    fn shared_dependencies_are_inlined_once() {
        let temp = tempdir().unwrap();
        write(
            temp.path(),
            "util.js",
            "export function add(a, b) { return a + b; }\n",
        );
        write(
            temp.path(),
            "two.js",
            "import { add } from \"./util.js\";\nexport const two = add(1, 1);\n",
        );
        let entry = write(
            temp.path(),
            "app.js",
            "import { add } from \"./util.js\";\nimport { two } from \"./two.js\";\nexport const three = add(two, 1);\n",
        );

        let out = temp.path().join("app.bundle.js");
        let result = bundle(entry, out.clone(), false).unwrap();
        assert_eq!(result.modules, 3);

        let code = fs::read_to_string(&out).unwrap();
        assert_eq!(code.matches("function add").count(), 1);

        // Dependencies precede their importers.
        assert!(code.find("function add").unwrap() < code.find("const two").unwrap());
        assert!(code.find("const two").unwrap() < code.find("const three").unwrap());
    }

    #[test]
    fn renamed_imports_get_aliases() {
        let temp = tempdir().unwrap();
        write(temp.path(), "util.js", "export const base = 1;\n");
        let entry = write(
            temp.path(),
            "app.js",
            "import { base as start } from \"./util.js\";\nexport const next = start + 1;\n",
        );

        let out = temp.path().join("app.bundle.js");
        bundle(entry, out.clone(), false).unwrap();

        let code = fs::read_to_string(&out).unwrap();
        assert!(code.contains("const start = base;"));
    }

    #[test]
    fn namespace_imports_become_frozen_objects() {
        let temp = tempdir().unwrap();
        write(
            temp.path(),
            "util.js",
            "export const base = 1;\nexport default function make() { return base; }\n",
        );
        let entry = write(
            temp.path(),
            "app.js",
            "import * as util from \"./util.js\";\nexport const next = util.base;\n",
        );

        let out = temp.path().join("app.bundle.js");
        bundle(entry, out.clone(), false).unwrap();

        let code = fs::read_to_string(&out).unwrap();
        assert!(code.contains("Object.freeze"));
        assert!(code.contains("default: make"));
    }

    #[test]
    fn extensionless_imports_default_to_js() {
        let temp = tempdir().unwrap();
        write(temp.path(), "util.js", "export const base = 1;\n");
        let entry = write(
            temp.path(),
            "app.js",
            "import { base } from \"./util\";\nexport const next = base;\n",
        );

        let result = bundle(entry, temp.path().join("out.js"), false).unwrap();
        assert_eq!(result.modules, 2);
    }

    #[test]
    fn bare_imports_are_rejected() {
        let temp = tempdir().unwrap();
        let entry = write(temp.path(), "app.js", "import fs from \"fs\";\n");

        let result = bundle(entry, temp.path().join("out.js"), false);
        assert!(matches!(result, Err(BundleError::BareImport(_, _))));
    }

    #[test]
    fn import_cycles_are_rejected() {
        let temp = tempdir().unwrap();
        write(
            temp.path(),
            "a.js",
            "import { b } from \"./b.js\";\nexport const a = 1;\n",
        );
        write(
            temp.path(),
            "b.js",
            "import { a } from \"./a.js\";\nexport const b = 2;\n",
        );

        let result = bundle(temp.path().join("a.js"), temp.path().join("out.js"), false);
        assert!(matches!(result, Err(BundleError::CircularImport(_))));
    }

    #[test]
    fn missing_named_export_is_an_error() {
        let temp = tempdir().unwrap();
        write(temp.path(), "util.js", "export const base = 1;\n");
        let entry = write(
            temp.path(),
            "app.js",
            "import { nope } from \"./util.js\";\nexport const next = nope;\n",
        );

        let result = bundle(entry, temp.path().join("out.js"), false);
        match result {
            Err(BundleError::MissingExport(_, name, _)) => assert_eq!(name, "nope"),
            other => panic!("expected MissingExport, got {:?}", other),
        }
    }

    #[test]
    fn minified_output_is_compact_and_still_mapped() {
        let temp = tempdir().unwrap();
        let source =
            "export function greet(name) {\n    return 'hi ' + name;\n}\nexport const x = greet('world');\n";
        let entry = write(temp.path(), "app.js", source);

        let plain_out = temp.path().join("plain/app.js");
        bundle(entry.clone(), plain_out.clone(), false).unwrap();
        let min_out = temp.path().join("min/app.js");
        let result = bundle(entry, min_out.clone(), true).unwrap();

        let plain = fs::read_to_string(&plain_out).unwrap();
        let minified = fs::read_to_string(&min_out).unwrap();
        assert!(minified.len() < plain.len());
        assert!(minified.contains("sourceMappingURL=app.js.map"));
        assert!(result.map_file.exists());
    }

    #[test]
    fn anonymous_default_gets_a_stable_binding() {
        let temp = tempdir().unwrap();
        let entry = write(temp.path(), "app.js", "export default { version: 1 };\n");

        let out = temp.path().join("out.js");
        bundle(entry, out.clone(), false).unwrap();

        let code = fs::read_to_string(&out).unwrap();
        assert!(code.contains("app_default"));
        assert!(code.contains("exports.default = app_default"));
    }
}
