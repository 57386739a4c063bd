//! Rust source front-end built on `syn`.
//!
//! Extracts declarations (free functions, inherent and trait-impl methods,
//! trait default methods, inline modules), their `use` scopes, and every
//! call expression in their bodies. Calls inside closures, async blocks and
//! nested items are attributed to the enclosing declaration.

use crate::config::AnalysisSettings;
use crate::domain::error::FrontendError;
use crate::domain::function::FunctionTag;
use crate::domain::source::{ParsedFunction, ParsedUnit, RawCallSite, SourceUnit};
use crate::domain::symbol::{CallTarget, ImportScope, SourceLocation};
use crate::infrastructure::markers::MarkerComments;
use crate::ports::SourceFrontend;
use proc_macro2::Span;
use std::collections::BTreeSet;
use std::sync::Arc;
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::visit::{self, Visit};
use syn::{
    Attribute, Block, Expr, ExprCall, ExprMethodCall, FnArg, ImplItem, Item, Macro, Signature,
    Stmt, Token, TraitItem, Type, UseTree,
};

pub struct SynFrontend {
    settings: AnalysisSettings,
}

impl SynFrontend {
    pub fn new(settings: AnalysisSettings) -> Self {
        Self { settings }
    }
}

impl Default for SynFrontend {
    fn default() -> Self {
        Self::new(AnalysisSettings::default())
    }
}

impl SourceFrontend for SynFrontend {
    fn parse(&self, unit: &SourceUnit) -> Result<ParsedUnit, FrontendError> {
        let file = syn::parse_file(&unit.code).map_err(|e| FrontendError::Malformed {
            file: unit.file_path.clone(),
            message: format!("{} (line {})", e, e.span().start().line),
        })?;

        let unit_ctx = UnitContext {
            file: &unit.file_path,
            markers: MarkerComments::parse(&unit.code, &self.settings.marker_comment),
            settings: &self.settings,
        };

        let mut parsed = ParsedUnit {
            crate_name: unit.crate_name.clone(),
            file_path: unit.file_path.clone(),
            ..ParsedUnit::default()
        };
        unit_ctx.collect_items(&file.items, unit.full_module_path(), &mut parsed);
        Ok(parsed)
    }
}

struct UnitContext<'a> {
    file: &'a str,
    markers: MarkerComments,
    settings: &'a AnalysisSettings,
}

/// One declaration to extract, independent of where it was declared.
struct FnItem<'i> {
    attrs: &'i [Attribute],
    sig: &'i Signature,
    block: &'i Block,
    start: Span,
    /// Marker inherited from the surrounding `impl` or `trait`.
    inherited_mark: bool,
}

impl<'a> UnitContext<'a> {
    fn collect_items(&self, items: &[Item], module: Vec<String>, out: &mut ParsedUnit) {
        let imports = Arc::new(import_scope(items.iter()));
        out.modules.push((module.clone(), imports.clone()));

        for item in items {
            match item {
                Item::Fn(func) => {
                    let decl = FnItem {
                        attrs: &func.attrs,
                        sig: &func.sig,
                        block: &func.block,
                        start: item.span(),
                        inherited_mark: false,
                    };
                    out.functions
                        .push(self.parse_function(&decl, &module, None, &imports));
                }
                Item::Impl(imp) => {
                    let Some(type_name) = type_name(&imp.self_ty) else {
                        continue;
                    };
                    out.types.push(with_segment(&module, &type_name));
                    let inherited_mark = self.is_marked(&imp.attrs, item.span());
                    for impl_item in &imp.items {
                        if let ImplItem::Fn(method) = impl_item {
                            let decl = FnItem {
                                attrs: &method.attrs,
                                sig: &method.sig,
                                block: &method.block,
                                start: impl_item.span(),
                                inherited_mark,
                            };
                            out.functions.push(self.parse_function(
                                &decl,
                                &module,
                                Some(&type_name),
                                &imports,
                            ));
                        }
                    }
                }
                Item::Trait(tr) => {
                    let trait_name = tr.ident.to_string();
                    out.types.push(with_segment(&module, &trait_name));
                    let inherited_mark = self.is_marked(&tr.attrs, item.span());
                    for trait_item in &tr.items {
                        if let TraitItem::Fn(method) = trait_item {
                            let Some(block) = &method.default else {
                                continue;
                            };
                            let decl = FnItem {
                                attrs: &method.attrs,
                                sig: &method.sig,
                                block,
                                start: trait_item.span(),
                                inherited_mark,
                            };
                            out.functions.push(self.parse_function(
                                &decl,
                                &module,
                                Some(&trait_name),
                                &imports,
                            ));
                        }
                    }
                }
                Item::Struct(s) => out.types.push(with_segment(&module, &s.ident.to_string())),
                Item::Enum(e) => out.types.push(with_segment(&module, &e.ident.to_string())),
                Item::Mod(m) => {
                    let child = with_segment(&module, &m.ident.to_string());
                    match &m.content {
                        Some((_, content)) => self.collect_items(content, child, out),
                        None => out.declared_modules.push(child),
                    }
                }
                _ => {}
            }
        }
    }

    fn parse_function(
        &self,
        decl: &FnItem<'_>,
        module: &[String],
        self_type: Option<&str>,
        imports: &Arc<ImportScope>,
    ) -> ParsedFunction {
        let name = decl.sig.ident.to_string();
        let mut qualified = module.to_vec();
        if let Some(ty) = self_type {
            qualified.push(ty.to_string());
        }
        qualified.push(name);

        let mut tags = BTreeSet::new();
        if self.is_entry(decl.attrs, decl.sig) {
            tags.insert(FunctionTag::OrchestrationEntry);
        }
        if decl.inherited_mark
            || self.is_marked(decl.attrs, decl.start)
            || self.markers.covers(decl.sig.fn_token.span.start().line)
        {
            tags.insert(FunctionTag::DeterministicMarked);
        }

        let local: Vec<&Item> = decl
            .block
            .stmts
            .iter()
            .filter_map(|stmt| match stmt {
                Stmt::Item(item @ (Item::Use(_) | Item::ExternCrate(_))) => Some(item),
                _ => None,
            })
            .collect();
        let imports = if local.is_empty() {
            imports.clone()
        } else {
            Arc::new(imports.with_local(import_scope(local)))
        };

        let mut collector = CallCollector {
            unit: self,
            calls: Vec::new(),
            marked_depth: 0,
        };
        collector.visit_block(decl.block);

        ParsedFunction {
            qualified_name: qualified.join("::"),
            module: module.to_vec(),
            self_type: self_type.map(str::to_string),
            tags,
            location: self.location(decl.sig.ident.span()),
            imports,
            calls: collector.calls,
        }
    }

    /// Entry attribute on the function or one of its parameters, or a
    /// parameter of a configured context type.
    fn is_entry(&self, attrs: &[Attribute], sig: &Signature) -> bool {
        let entry_attrs = &self.settings.entry_attributes;
        if has_attribute(attrs, entry_attrs) {
            return true;
        }
        sig.inputs.iter().any(|arg| match arg {
            FnArg::Typed(pat) => {
                has_attribute(&pat.attrs, entry_attrs)
                    || type_name(&pat.ty)
                        .map_or(false, |ty| self.settings.entry_context_types.contains(&ty))
            }
            FnArg::Receiver(_) => false,
        })
    }

    fn is_marked(&self, attrs: &[Attribute], start: Span) -> bool {
        has_attribute(attrs, &self.settings.marker_attributes)
            || self.markers.covers(start.start().line)
    }

    fn location(&self, span: Span) -> SourceLocation {
        let start = span.start();
        SourceLocation::new(self.file, start.line, start.column + 1)
    }
}

struct CallCollector<'u, 'a> {
    unit: &'u UnitContext<'a>,
    calls: Vec<RawCallSite>,
    /// Number of enclosing statements carrying a marker.
    marked_depth: usize,
}

impl CallCollector<'_, '_> {
    fn record(&mut self, target: CallTarget, span: Span) {
        let location = self.unit.location(span);
        let statement_marked = self.marked_depth > 0 || self.unit.markers.covers(location.line);
        self.calls.push(RawCallSite {
            target,
            location,
            statement_marked,
        });
    }
}

impl<'ast> Visit<'ast> for CallCollector<'_, '_> {
    fn visit_stmt(&mut self, stmt: &'ast Stmt) {
        let marked = self.unit.is_marked(stmt_attrs(stmt), stmt.span());
        if marked {
            self.marked_depth += 1;
        }
        visit::visit_stmt(self, stmt);
        if marked {
            self.marked_depth -= 1;
        }
    }

    fn visit_expr_call(&mut self, call: &'ast ExprCall) {
        if let Expr::Path(callee) = &*call.func {
            // `<T as Trait>::f` is not resolvable syntactically.
            if callee.qself.is_none() {
                let segments = callee
                    .path
                    .segments
                    .iter()
                    .map(|s| s.ident.to_string())
                    .collect();
                let absolute = callee.path.leading_colon.is_some();
                self.record(CallTarget::Path { segments, absolute }, call.span());
            }
        }
        visit::visit_expr_call(self, call);
    }

    fn visit_expr_method_call(&mut self, call: &'ast ExprMethodCall) {
        let receiver_is_self =
            matches!(&*call.receiver, Expr::Path(p) if p.qself.is_none() && p.path.is_ident("self"));
        self.record(
            CallTarget::Method {
                receiver_is_self,
                method: call.method.to_string(),
            },
            call.method.span(),
        );
        visit::visit_expr_method_call(self, call);
    }

    /// Macro bodies that parse as comma-separated expressions (`println!`,
    /// `join!`, `assert_eq!`, ...) are scanned like ordinary code.
    fn visit_macro(&mut self, mac: &'ast Macro) {
        if let Ok(args) = mac.parse_body_with(Punctuated::<Expr, Token![,]>::parse_terminated) {
            for arg in &args {
                self.visit_expr(arg);
            }
        }
    }
}

fn stmt_attrs(stmt: &Stmt) -> &[Attribute] {
    match stmt {
        Stmt::Local(local) => &local.attrs,
        Stmt::Macro(mac) => &mac.attrs,
        Stmt::Expr(expr, _) => expr_attrs(expr),
        Stmt::Item(_) => &[],
    }
}

fn expr_attrs(expr: &Expr) -> &[Attribute] {
    match expr {
        Expr::Call(e) => &e.attrs,
        Expr::MethodCall(e) => &e.attrs,
        Expr::Await(e) => &e.attrs,
        Expr::Try(e) => &e.attrs,
        Expr::Macro(e) => &e.attrs,
        Expr::Block(e) => &e.attrs,
        Expr::Assign(e) => &e.attrs,
        Expr::If(e) => &e.attrs,
        Expr::Match(e) => &e.attrs,
        Expr::Unsafe(e) => &e.attrs,
        _ => &[],
    }
}

fn has_attribute(attrs: &[Attribute], names: &[String]) -> bool {
    attrs.iter().any(|attr| {
        attr.path()
            .segments
            .last()
            .map_or(false, |seg| names.iter().any(|n| seg.ident == n))
    })
}

/// Last path segment of a (possibly referenced) type: `&mut DurableContext`
/// gives `DurableContext`.
fn type_name(ty: &Type) -> Option<String> {
    match ty {
        Type::Path(tp) => tp.path.segments.last().map(|s| s.ident.to_string()),
        Type::Reference(r) => type_name(&r.elem),
        Type::Paren(p) => type_name(&p.elem),
        Type::Group(g) => type_name(&g.elem),
        _ => None,
    }
}

fn with_segment(module: &[String], name: &str) -> Vec<String> {
    let mut path = module.to_vec();
    path.push(name.to_string());
    path
}

fn import_scope<'i>(items: impl IntoIterator<Item = &'i Item>) -> ImportScope {
    let mut scope = ImportScope::new();
    for item in items {
        match item {
            Item::Use(u) => flatten_use(&u.tree, Vec::new(), &mut scope),
            Item::ExternCrate(ext) => {
                let name = ext.ident.to_string();
                let local = match &ext.rename {
                    Some((_, rename)) => rename.to_string(),
                    None => name.clone(),
                };
                if local != "_" {
                    scope.aliases.insert(local, vec![name]);
                }
            }
            _ => {}
        }
    }
    scope
}

fn flatten_use(tree: &UseTree, prefix: Vec<String>, scope: &mut ImportScope) {
    match tree {
        UseTree::Path(p) => flatten_use(&p.tree, with_segment(&prefix, &p.ident.to_string()), scope),
        UseTree::Name(n) => {
            let name = n.ident.to_string();
            if name == "self" {
                if let Some(last) = prefix.last() {
                    scope.aliases.insert(last.clone(), prefix.clone());
                }
            } else {
                scope.aliases.insert(name.clone(), with_segment(&prefix, &name));
            }
        }
        UseTree::Rename(r) => {
            let rename = r.rename.to_string();
            if rename == "_" {
                return;
            }
            let name = r.ident.to_string();
            let target = if name == "self" {
                prefix
            } else {
                with_segment(&prefix, &name)
            };
            scope.aliases.insert(rename, target);
        }
        UseTree::Glob(_) => scope.globs.push(prefix),
        UseTree::Group(g) => {
            for tree in &g.items {
                flatten_use(tree, prefix.clone(), scope);
            }
        }
    }
}
