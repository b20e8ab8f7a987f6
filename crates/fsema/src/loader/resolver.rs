//! Name resolution: build a symbol table from a parsed description
//!
//! Units are resolved in source order. Inside a body, USE statements are
//! processed first and the remaining items in order. Names that may refer
//! to something declared later (procedure interfaces, binding targets,
//! generic specifics and final subroutines) are recorded as fix-ups and
//! resolved once every unit has been seen.

use std::collections::HashSet;
use std::mem;

use super::ast::*;
use crate::common::{SemaError, SemaResult};
use crate::evaluate::{DataRef, DynamicType, Expr, TypeCategory};
use crate::symbols::{
    ArraySpec, AssocEntityDetails, Attrs, DeclTypeSpec, DerivedCategory, DerivedTypeDetails, DerivedTypeSpec,
    Details, EquivalenceObject, GenericDetails, ModuleDetails, Name, ObjectDetails, ProcBindingDetails,
    ProcEntityDetails, ScopeId, ScopeKind, SubprogramDetails, SymbolFlags, SymbolId, SymbolTable, TypeParamAttr,
    TypeParamDetails,
};
use crate::tools::{find_or_instantiate_derived_type, order_parameter_names};

/// How a unit is being declared
#[derive(Debug, Clone, Copy, Default)]
struct UnitContext {
    in_interface: bool,
    is_abstract: bool,
}

/// A reference resolved after all units are declared
#[derive(Debug)]
enum Fixup {
    Interface { entity: SymbolId, scope: ScopeId, name: Ident },
    Binding { binding: SymbolId, scope: ScopeId, target: Ident },
    Generic { generic: SymbolId, scope: ScopeId, type_scope: Option<ScopeId>, specifics: Vec<Ident> },
    Final { type_symbol: SymbolId, scope: ScopeId, names: Vec<Ident> },
}

pub struct Resolver {
    table: SymbolTable,
    intrinsic_modules: Option<ScopeId>,
    /// Symbols created by a mention before any declaration
    placeholders: HashSet<SymbolId>,
    fixups: Vec<Fixup>,
}

impl Resolver {
    pub fn new() -> Self {
        Self {
            table: SymbolTable::new(),
            intrinsic_modules: None,
            placeholders: HashSet::new(),
            fixups: Vec::new(),
        }
    }

    /// Resolve every unit of `file` into a fresh table
    pub fn resolve(mut self, file: &SourceFile) -> SemaResult<SymbolTable> {
        let global = self.table.global();
        for unit in &file.units {
            self.declare_unit(global, unit, UnitContext::default())?;
        }
        self.apply_fixups()?;
        self.link_module_interfaces();
        self.mark_implicit();
        tracing::debug!(
            scopes = self.table.scope_ids().count(),
            symbols = self.table.symbol_ids().count(),
            "symbol table resolved"
        );
        Ok(self.table)
    }

    // ==================== Units ====================

    fn declare_unit(&mut self, parent: ScopeId, unit: &Unit, context: UnitContext) -> SemaResult<SymbolId> {
        let name = unit.name.text.as_str();
        let span = unit.name.span;
        let (symbol, scope) = match &unit.kind {
            UnitKind::Module { module_file, intrinsic } => {
                let host = if *intrinsic { self.intrinsic_modules_scope() } else { parent };
                let details = Details::Module(ModuleDetails::default());
                let symbol = self.table.add_symbol(host, name, Attrs::empty(), details, span)?;
                let scope = self.table.add_scope(host, ScopeKind::Module, Some(symbol));
                self.table.scope_mut(scope).is_module_file = *module_file;
                (symbol, scope)
            }
            UnitKind::Submodule { ancestor, parent: direct_parent } => {
                let ancestor_scope = self.find_module(ancestor)?;
                let parent_scope = match direct_parent {
                    Some(direct_parent) => self.find_submodule(ancestor_scope, direct_parent)?,
                    None => ancestor_scope,
                };
                let details = Details::Module(ModuleDetails {
                    is_submodule: true,
                    ancestor: Some(ancestor_scope),
                    parent: Some(parent_scope),
                });
                let symbol = self.table.add_symbol(parent_scope, name, Attrs::empty(), details, span)?;
                let scope = self.table.add_scope(parent_scope, ScopeKind::Module, Some(symbol));
                (symbol, scope)
            }
            UnitKind::Program => {
                let symbol = self.table.add_symbol(parent, name, Attrs::empty(), Details::MainProgram, span)?;
                (symbol, self.table.add_scope(parent, ScopeKind::MainProgram, Some(symbol)))
            }
            UnitKind::BlockData => {
                let symbol = self.table.add_symbol(parent, name, Attrs::empty(), Details::BlockData, span)?;
                (symbol, self.table.add_scope(parent, ScopeKind::BlockData, Some(symbol)))
            }
            UnitKind::Subprogram(header) => self.declare_subprogram(parent, unit, header, context)?,
        };
        self.table.scope_mut(scope).span = unit.span;
        tracing::trace!(name, kind = ?self.table.scope(scope).kind, "declared unit");
        self.resolve_body(scope, &unit.body)?;
        Ok(symbol)
    }

    fn declare_subprogram(
        &mut self,
        parent: ScopeId,
        unit: &Unit,
        header: &SubprogramHeader,
        context: UnitContext,
    ) -> SemaResult<(SymbolId, ScopeId)> {
        let mut attrs = unit.prefix.attrs;
        if context.is_abstract {
            attrs |= Attrs::ABSTRACT;
        }
        let details = Details::Subprogram(SubprogramDetails {
            is_interface: context.in_interface,
            cuda_attrs: unit.prefix.cuda,
            ..SubprogramDetails::default()
        });
        let symbol = self.table.add_symbol(parent, &unit.name.text, attrs, details, unit.name.span)?;
        self.table.symbol_mut(symbol).set_flag(if header.is_function {
            SymbolFlags::FUNCTION
        } else {
            SymbolFlags::SUBROUTINE
        });
        if attrs.contains(Attrs::BIND_C) {
            let label = unit.prefix.bind.as_ref().and_then(|bind| bind.name.clone());
            let label = label.unwrap_or_else(|| self.table.symbol_name(symbol).to_string());
            self.table.symbol_mut(symbol).bind_name = Some(label);
        }

        let scope = self.table.add_scope(parent, ScopeKind::Subprogram, Some(symbol));
        let mut dummy_args = Vec::with_capacity(header.dummies.len());
        for dummy in &header.dummies {
            dummy_args.push(match dummy {
                Some(dummy) => Some(self.dummy_placeholder(scope, dummy)?),
                None => None,
            });
        }
        let result = if header.is_function {
            let result_name = header.result.as_ref().unwrap_or(&unit.name);
            let result = self.placeholder(scope, result_name)?;
            let ty = match &unit.prefix.ty {
                Some(ty) => Some(self.resolve_type_spec(scope, ty)?),
                None => None,
            };
            if let Some(object) = self.object_mut(result) {
                object.is_func_result = true;
                object.ty = ty;
            }
            Some(result)
        } else {
            None
        };
        if let Details::Subprogram(details) = &mut self.table.symbol_mut(symbol).details {
            details.dummy_args = dummy_args;
            details.result = result;
        }
        Ok((symbol, scope))
    }

    // ==================== Bodies ====================

    fn resolve_body(&mut self, scope: ScopeId, items: &[Item]) -> SemaResult<()> {
        // imported names are visible to every declaration of the body
        for item in items {
            if let Item::Use(stmt) = item {
                self.resolve_use(scope, stmt)?;
            }
        }

        let mut default_private = false;
        for item in items {
            match item {
                Item::Use(_) => {}
                Item::Unit(unit) => {
                    self.declare_unit(scope, unit, UnitContext::default())?;
                }
                Item::Decl(decl) => self.resolve_decl(scope, decl)?,
                Item::Procedure(decl) => self.resolve_procedure_decl(scope, decl)?,
                Item::AttrStmt { attrs, names, .. } if names.is_empty() => {
                    default_private = attrs.contains(Attrs::PRIVATE);
                }
                Item::AttrStmt { attrs, names, .. } => self.resolve_attr_stmt(scope, *attrs, names)?,
                Item::Common(blocks) => self.resolve_common(scope, blocks)?,
                Item::Equivalence(sets) => self.resolve_equivalence(scope, sets)?,
                Item::CrayPointer(pairs) => self.resolve_cray_pointers(scope, pairs)?,
                Item::StmtFunction { name, dummies } => self.resolve_stmt_function(scope, name, dummies)?,
                Item::Entry { name, dummies, result } => self.resolve_entry(scope, name, dummies, result.as_ref())?,
                Item::TypeDef(def) => self.resolve_type_def(scope, def)?,
                Item::Interface(block) => self.resolve_interface(scope, block)?,
                Item::Generic(stmt) => {
                    let generic = self.declare_generic(scope, &stmt.spec, stmt.access)?;
                    let type_scope = self.table.scope(scope).is_derived_type().then_some(scope);
                    self.fixups.push(Fixup::Generic {
                        generic,
                        scope,
                        type_scope,
                        specifics: stmt.specifics.clone(),
                    });
                }
                Item::Final(names) => {
                    let Some(type_symbol) = self.enclosing_type(scope) else {
                        let span = names.first().map(|name| name.span).unwrap_or_default();
                        return Err(SemaError::resolve("FINAL is allowed only in a derived type", span));
                    };
                    self.fixups.push(Fixup::Final {
                        type_symbol,
                        scope: self.table.parent(scope),
                        names: names.clone(),
                    });
                }
                Item::Sequence => {
                    if let Some(type_symbol) = self.enclosing_type(scope)
                        && let Details::DerivedType(details) = &mut self.table.symbol_mut(type_symbol).details
                    {
                        details.sequence = true;
                    }
                }
                Item::Construct(construct) => self.resolve_construct(scope, construct)?,
            }
        }

        if default_private {
            for symbol in self.table.scope(scope).symbols().to_vec() {
                let symbol = self.table.symbol_mut(symbol);
                if !symbol.has(Attrs::PUBLIC) {
                    symbol.attrs |= Attrs::PRIVATE;
                }
            }
        }
        Ok(())
    }

    fn resolve_use(&mut self, scope: ScopeId, stmt: &UseStmt) -> SemaResult<()> {
        let module_scope = self.find_module(&stmt.module)?;
        let location = stmt.module.span;
        let mut renamed = HashSet::new();
        for (local, remote) in &stmt.renames {
            let target = self.find_public(module_scope, &stmt.module, remote)?;
            renamed.insert(self.table.symbol(target).name);
            self.table.add_use(scope, &local.text, target, location)?;
        }
        if !stmt.only {
            for symbol in self.table.scope(module_scope).symbols().to_vec() {
                let entity = self.table.symbol(symbol);
                if entity.has(Attrs::PRIVATE)
                    || matches!(entity.details, Details::Module(_))
                    || renamed.contains(&entity.name)
                {
                    continue;
                }
                let local = self.table.symbol_name(symbol).to_string();
                self.table.add_use(scope, &local, symbol, location)?;
            }
        }
        tracing::trace!(module = %stmt.module.text, only = stmt.only, "use association");
        Ok(())
    }

    fn resolve_decl(&mut self, scope: ScopeId, decl: &TypeDecl) -> SemaResult<()> {
        let ty = self.resolve_type_spec(scope, &decl.ty)?;
        let attrs = &decl.attrs;
        if let Some(param_attr) = attrs.type_param {
            return self.resolve_type_param_decl(scope, &ty, param_attr, &decl.entities);
        }
        for entity in &decl.entities {
            let shape = entity
                .shape
                .as_ref()
                .or(attrs.shape.as_ref())
                .map_or(ArraySpec::Scalar, |shape| array_spec(shape, attrs.attrs));
            let object = ObjectDetails {
                ty: Some(ty.clone()),
                shape,
                corank: entity.corank.or(attrs.corank).unwrap_or(0),
                has_init: entity.init.is_some(),
                cuda_data_attr: attrs.cuda,
                ..ObjectDetails::default()
            };
            let symbol = self.declare(scope, &entity.name, attrs.attrs, Details::Object(object))?;
            let symbol = self.table.symbol_mut(symbol);
            if attrs.attrs.contains(Attrs::BIND_C) {
                let label = attrs.bind.as_ref().and_then(|bind| bind.name.clone());
                symbol.bind_name = Some(label.unwrap_or_else(|| entity.name.text.to_ascii_lowercase()));
            }
            if let Some((offset, size)) = entity.storage {
                symbol.offset = offset;
                symbol.size = size;
            }
        }
        Ok(())
    }

    /// `integer, kind :: k = 4` inside a parameterized type
    fn resolve_type_param_decl(
        &mut self,
        scope: ScopeId,
        ty: &DeclTypeSpec,
        attr: TypeParamAttr,
        entities: &[EntityDecl],
    ) -> SemaResult<()> {
        let Some(type_symbol) = self.enclosing_type(scope) else {
            let span = entities.first().map(|entity| entity.name.span).unwrap_or_default();
            return Err(SemaError::resolve("KIND and LEN parameters are allowed only in a derived type", span));
        };
        for entity in entities {
            let name = self.table.intern(&entity.name.text);
            let param = self
                .table
                .scope(scope)
                .find(name)
                .filter(|&param| matches!(self.table.symbol(param).details, Details::TypeParam(_)));
            let Some(param) = param else {
                return Err(SemaError::resolve(
                    format!(
                        "'{}' is not a type parameter of '{}'",
                        entity.name.text,
                        self.table.symbol_name(type_symbol)
                    ),
                    entity.name.span,
                ));
            };
            let init = match entity.init {
                Some(Initializer::Value(value)) => value,
                _ => None,
            };
            let symbol = self.table.symbol_mut(param);
            symbol.details = Details::TypeParam(TypeParamDetails { attr, ty: Some(ty.clone()), init });
            symbol.span = entity.name.span;
            if let Details::DerivedType(details) = &mut self.table.symbol_mut(type_symbol).details {
                details.param_decl_order.push(param);
            }
        }
        Ok(())
    }

    fn resolve_procedure_decl(&mut self, scope: ScopeId, decl: &ProcedureDecl) -> SemaResult<()> {
        let in_type = self.table.scope(scope).is_derived_type();
        if in_type && !decl.attrs.contains(Attrs::POINTER) {
            return self.resolve_bindings(scope, decl);
        }

        let ty = match &decl.interface {
            Some(ProcInterface::Type(ty)) => Some(self.resolve_type_spec(scope, ty)?),
            _ => None,
        };
        for entity in &decl.entities {
            let details = ProcEntityDetails {
                ty: ty.clone(),
                has_init: entity.target.is_some(),
                ..ProcEntityDetails::default()
            };
            let symbol = self.declare(scope, &entity.name, decl.attrs, Details::ProcEntity(details))?;
            if let Some(ProcInterface::Name(interface)) = &decl.interface {
                self.fixups.push(Fixup::Interface { entity: symbol, scope, name: interface.clone() });
            }
        }
        Ok(())
    }

    /// Type-bound procedures; the bound procedure is found after all units
    /// are declared
    fn resolve_bindings(&mut self, type_scope: ScopeId, decl: &ProcedureDecl) -> SemaResult<()> {
        let host = self.table.parent(type_scope);
        let pass_name = decl.pass_name.as_ref().map(|name| self.table.intern(&name.text));
        for entity in &decl.entities {
            let target = if decl.attrs.contains(Attrs::DEFERRED) {
                match &decl.interface {
                    Some(ProcInterface::Name(interface)) => interface.clone(),
                    _ => {
                        return Err(SemaError::resolve(
                            format!("DEFERRED binding '{}' must name an interface", entity.name.text),
                            entity.name.span,
                        ));
                    }
                }
            } else {
                entity.target.clone().unwrap_or_else(|| entity.name.clone())
            };
            // bound to itself until the fix-up runs
            let placeholder = SymbolId::new(0);
            let details = Details::ProcBinding(ProcBindingDetails { symbol: placeholder, pass_name });
            let binding = self.table.add_symbol(type_scope, &entity.name.text, decl.attrs, details, entity.name.span)?;
            self.fixups.push(Fixup::Binding { binding, scope: host, target });
        }
        Ok(())
    }

    fn resolve_attr_stmt(&mut self, scope: ScopeId, attrs: Attrs, names: &[Ident]) -> SemaResult<()> {
        let procedure_attrs = attrs.intersects(Attrs::EXTERNAL | Attrs::INTRINSIC);
        for name in names {
            if procedure_attrs {
                let details = Details::ProcEntity(ProcEntityDetails::default());
                self.declare(scope, name, attrs, details)?;
            } else {
                let symbol = self.placeholder(scope, name)?;
                self.table.symbol_mut(symbol).attrs |= attrs;
            }
        }
        Ok(())
    }

    fn resolve_common(&mut self, scope: ScopeId, blocks: &[(Ident, Vec<Ident>)]) -> SemaResult<()> {
        for (block, objects) in blocks {
            let common = self.table.add_common_block(scope, &block.text, block.span);
            for object in objects {
                let symbol = self.placeholder(scope, object)?;
                self.table.add_to_common_block(common, symbol);
            }
        }
        Ok(())
    }

    fn resolve_equivalence(&mut self, scope: ScopeId, sets: &[Vec<EquivalenceRef>]) -> SemaResult<()> {
        for set in sets {
            let mut objects = Vec::with_capacity(set.len());
            for reference in set {
                let symbol = self.placeholder(scope, &reference.name)?;
                let mut object = EquivalenceObject::new(symbol, reference.span);
                object.subscripts = reference.subscripts.clone();
                object.substring_start = reference.substring_start;
                objects.push(object);
            }
            self.table.add_equivalence_set(scope, objects);
        }
        Ok(())
    }

    fn resolve_cray_pointers(&mut self, scope: ScopeId, pairs: &[(Ident, Ident)]) -> SemaResult<()> {
        for (pointer, pointee) in pairs {
            let pointer = self.placeholder(scope, pointer)?;
            let pointee = self.placeholder(scope, pointee)?;
            self.table.symbol_mut(pointee).set_flag(SymbolFlags::CRAY_POINTEE);
            let pointee_name = self.table.symbol(pointee).name;
            self.table.add_cray_pointer(scope, pointee_name, pointer);
        }
        Ok(())
    }

    fn resolve_stmt_function(&mut self, scope: ScopeId, name: &Ident, dummies: &[Ident]) -> SemaResult<()> {
        let details = Details::Subprogram(SubprogramDetails { stmt_function: true, ..SubprogramDetails::default() });
        // a type declared for the function name becomes the type of its result
        let result_type = self.local(scope, name).and_then(|existing| self.table.symbol_type(existing).cloned());
        let symbol = match self.local(scope, name) {
            Some(existing) if matches!(self.table.symbol(existing).details, Details::Object(_)) => {
                self.placeholders.remove(&existing);
                self.table.symbol_mut(existing).details = details;
                existing
            }
            _ => self.table.add_symbol(scope, &name.text, Attrs::empty(), details, name.span)?,
        };
        self.table.symbol_mut(symbol).set_flag(SymbolFlags::FUNCTION);

        let function_scope = self.table.add_scope(scope, ScopeKind::Subprogram, Some(symbol));
        let mut dummy_args = Vec::with_capacity(dummies.len());
        for dummy in dummies {
            let details = Details::Object(ObjectDetails::new(None).dummy());
            dummy_args.push(Some(self.table.add_symbol(function_scope, &dummy.text, Attrs::empty(), details, dummy.span)?));
        }
        let result = ObjectDetails { ty: result_type, is_func_result: true, ..ObjectDetails::default() };
        let result = self.table.add_symbol(function_scope, &name.text, Attrs::empty(), Details::Object(result), name.span)?;
        if let Details::Subprogram(details) = &mut self.table.symbol_mut(symbol).details {
            details.dummy_args = dummy_args;
            details.result = Some(result);
        }
        Ok(())
    }

    fn resolve_entry(
        &mut self,
        scope: ScopeId,
        name: &Ident,
        dummies: &[Option<Ident>],
        result: Option<&Ident>,
    ) -> SemaResult<()> {
        let host = self.table.scope(scope);
        let Some(host_symbol) = host.symbol.filter(|_| host.kind == ScopeKind::Subprogram) else {
            return Err(SemaError::resolve("ENTRY is allowed only in a subprogram", name.span));
        };
        let is_function = self.table.symbol(host_symbol).test(SymbolFlags::FUNCTION);
        let outer = self.table.parent(scope);
        let details = Details::Subprogram(SubprogramDetails { entry_scope: Some(scope), ..SubprogramDetails::default() });
        let entry = self.table.add_symbol(outer, &name.text, Attrs::empty(), details, name.span)?;
        self.table.symbol_mut(entry).set_flag(if is_function {
            SymbolFlags::FUNCTION
        } else {
            SymbolFlags::SUBROUTINE
        });

        let mut dummy_args = Vec::with_capacity(dummies.len());
        for dummy in dummies {
            dummy_args.push(match dummy {
                Some(dummy) => Some(self.dummy_placeholder(scope, dummy)?),
                None => None,
            });
        }
        let result = if is_function {
            let result = self.placeholder(scope, result.unwrap_or(name))?;
            if let Some(object) = self.object_mut(result) {
                object.is_func_result = true;
            }
            Some(result)
        } else {
            None
        };
        if let Details::Subprogram(details) = &mut self.table.symbol_mut(entry).details {
            details.dummy_args = dummy_args;
            details.result = result;
        }
        Ok(())
    }

    fn resolve_type_def(&mut self, scope: ScopeId, def: &TypeDef) -> SemaResult<()> {
        let details = Details::DerivedType(DerivedTypeDetails::default());
        let symbol = self.table.add_symbol(scope, &def.name.text, def.attrs, details, def.name.span)?;
        if def.bind.is_some() {
            let label = self.table.symbol_name(symbol).to_string();
            self.table.symbol_mut(symbol).bind_name = Some(label);
        }
        let type_scope = self.table.add_scope(scope, ScopeKind::DerivedType, Some(symbol));

        for param in &def.params {
            let details = Details::TypeParam(TypeParamDetails { attr: TypeParamAttr::Kind, ty: None, init: None });
            let param = self.table.add_symbol(type_scope, &param.text, Attrs::empty(), details, param.span)?;
            if let Details::DerivedType(details) = &mut self.table.symbol_mut(symbol).details {
                details.param_name_order.push(param);
            }
        }

        if let Some(base) = &def.extends {
            let base_symbol = self.find_derived_type(scope, base)?;
            let base_owner = self.table.symbol(base_symbol).owner;
            let spec = DerivedTypeSpec::new(base_symbol);
            let base_type = find_or_instantiate_derived_type(&mut self.table, base_owner, spec, DerivedCategory::Type);
            let component_name = self.table.symbol_name(base_symbol).to_string();
            let details = Details::Object(ObjectDetails::new(Some(base_type)));
            let component = self.table.add_component(type_scope, &component_name, Attrs::empty(), details, base.span)?;
            self.table.symbol_mut(component).set_flag(SymbolFlags::PARENT_COMP);
        }

        self.resolve_body(type_scope, &def.body)?;
        tracing::trace!(name = %def.name.text, "declared derived type");
        Ok(())
    }

    fn resolve_interface(&mut self, scope: ScopeId, block: &InterfaceBlock) -> SemaResult<()> {
        let context = UnitContext { in_interface: true, is_abstract: block.is_abstract };
        let mut bodies = Vec::with_capacity(block.bodies.len());
        for body in &block.bodies {
            bodies.push(self.declare_unit(scope, body, context)?);
        }
        if let Some(spec) = &block.generic {
            let generic = self.declare_generic(scope, spec, Attrs::empty())?;
            let name = self.table.symbol(generic).name;
            let same_name = bodies.iter().copied().find(|&body| self.table.symbol(body).name == name);
            if let Details::Generic(details) = &mut self.table.symbol_mut(generic).details {
                details.specific_procs.extend(bodies);
                details.specific = details.specific.or(same_name);
            }
            if !block.procedures.is_empty() {
                self.fixups.push(Fixup::Generic {
                    generic,
                    scope,
                    type_scope: None,
                    specifics: block.procedures.clone(),
                });
            }
        }
        Ok(())
    }

    /// Find or create the generic declared by `spec`
    fn declare_generic(&mut self, scope: ScopeId, spec: &GenericSpec, access: Attrs) -> SemaResult<SymbolId> {
        let name = self.table.intern(&spec.name);
        if let Some(existing) = self.table.scope(scope).find(name)
            && matches!(self.table.symbol(existing).details, Details::Generic(_))
        {
            self.table.symbol_mut(existing).attrs |= access;
            return Ok(existing);
        }
        let details = Details::Generic(GenericDetails::new(spec.kind));
        self.table.add_symbol(scope, &spec.name, access, details, spec.span)
    }

    fn resolve_construct(&mut self, scope: ScopeId, construct: &ConstructBlock) -> SemaResult<()> {
        let construct_scope = self.table.add_scope(scope, construct.kind, None);
        self.table.scope_mut(construct_scope).span = construct.span;
        for association in &construct.associations {
            self.resolve_association(scope, construct_scope, association)?;
        }
        self.resolve_body(construct_scope, &construct.body)
    }

    /// Associate name of an ASSOCIATE construct, typed from its selector
    fn resolve_association(&mut self, host: ScopeId, scope: ScopeId, association: &Association) -> SemaResult<()> {
        let selector = &association.selector;
        let base = self.lookup(host, &selector.base)?;
        let mut data_ref = DataRef::Symbol(base);
        let mut ty = self.table.symbol_type(base).cloned();
        let mut shape = self.table.shape(base).cloned().unwrap_or_default();
        if selector.subscripts > 0 {
            let subscript = Expr::Constant(DynamicType::intrinsic(TypeCategory::Integer, 4));
            data_ref = DataRef::ArrayElement { base: Box::new(data_ref), subscripts: vec![subscript; selector.subscripts] };
            shape = ArraySpec::Scalar;
        }
        for component in &selector.components {
            let type_scope = ty
                .as_ref()
                .and_then(DeclTypeSpec::as_derived)
                .and_then(|derived| self.table.derived_scope(derived));
            let name = self.table.intern(&component.text);
            let Some(found) = type_scope.and_then(|type_scope| self.table.find_component(type_scope, name)) else {
                return Err(SemaError::resolve(
                    format!("'{}' is not a component of the selector", component.text),
                    component.span,
                ));
            };
            data_ref = DataRef::component(data_ref, found);
            ty = self.table.symbol_type(found).cloned();
            shape = self.table.shape(found).cloned().unwrap_or_default();
        }
        let details = AssocEntityDetails {
            selector: Some(Expr::Designator(data_ref)),
            ty,
            shape,
            ..AssocEntityDetails::default()
        };
        self.table.add_symbol(
            scope,
            &association.name.text,
            Attrs::empty(),
            Details::AssocEntity(details),
            association.name.span,
        )?;
        Ok(())
    }

    // ==================== Types ====================

    fn resolve_type_spec(&mut self, scope: ScopeId, spec: &TypeSpec) -> SemaResult<DeclTypeSpec> {
        let (category, name, params) = match spec {
            TypeSpec::Decl(ty) => return Ok(ty.clone()),
            TypeSpec::Derived { category, name, params } => (category, name, params),
        };
        let type_symbol = self.find_derived_type(scope, name)?;
        let order = order_parameter_names(&self.table, type_symbol);
        let mut instance = DerivedTypeSpec::new(type_symbol);
        for (position, (keyword, value)) in params.iter().enumerate() {
            let param = match keyword {
                Some(keyword) => {
                    let wanted = self.table.intern(&keyword.text);
                    order.iter().copied().find(|&param| self.table.symbol(param).name == wanted)
                }
                None => order.get(position).copied(),
            };
            let Some(param) = param else {
                let at = keyword.as_ref().map_or(name.span, |keyword| keyword.span);
                return Err(SemaError::resolve(
                    format!("too many or unknown type parameters for '{}'", name.text),
                    at,
                ));
            };
            instance = instance.with_parameter(self.table.symbol(param).name, *value);
        }
        let owner = self.table.symbol(type_symbol).owner;
        Ok(find_or_instantiate_derived_type(&mut self.table, owner, instance, *category))
    }

    fn find_derived_type(&mut self, scope: ScopeId, name: &Ident) -> SemaResult<SymbolId> {
        let symbol = self.lookup(scope, name)?;
        let symbol = self.table.ultimate(symbol);
        if matches!(self.table.symbol(symbol).details, Details::DerivedType(_)) {
            Ok(symbol)
        } else {
            Err(SemaError::resolve(format!("'{}' is not a derived type", name.text), name.span))
        }
    }

    // ==================== Fix-ups ====================

    fn apply_fixups(&mut self) -> SemaResult<()> {
        for fixup in mem::take(&mut self.fixups) {
            match fixup {
                Fixup::Interface { entity, scope, name } => {
                    let interface = self.lookup(scope, &name)?;
                    if let Details::ProcEntity(details) = &mut self.table.symbol_mut(entity).details {
                        details.interface = Some(interface);
                    }
                }
                Fixup::Binding { binding, scope, target } => {
                    let target = self.lookup(scope, &target)?;
                    if let Details::ProcBinding(details) = &mut self.table.symbol_mut(binding).details {
                        details.symbol = target;
                    }
                }
                Fixup::Generic { generic, scope, type_scope, specifics } => {
                    let mut procs = Vec::with_capacity(specifics.len());
                    for specific in &specifics {
                        let found = match type_scope {
                            Some(type_scope) => {
                                let name = self.table.intern(&specific.text);
                                self.table.find_component(type_scope, name).ok_or_else(|| {
                                    SemaError::resolve(
                                        format!("'{}' is not a binding of this type", specific.text),
                                        specific.span,
                                    )
                                })?
                            }
                            None => self.lookup(scope, specific)?,
                        };
                        procs.push(found);
                    }
                    let name = self.table.symbol(generic).name;
                    let same_name = procs.iter().copied().find(|&proc| self.table.symbol(proc).name == name);
                    if let Details::Generic(details) = &mut self.table.symbol_mut(generic).details {
                        details.specific_procs.extend(procs);
                        details.specific = details.specific.or(same_name);
                    }
                }
                Fixup::Final { type_symbol, scope, names } => {
                    let mut finals = Vec::with_capacity(names.len());
                    for name in &names {
                        finals.push(self.lookup(scope, name)?);
                    }
                    if let Details::DerivedType(details) = &mut self.table.symbol_mut(type_symbol).details {
                        details.finals.extend(finals);
                    }
                }
            }
        }
        Ok(())
    }

    /// Connect separate module procedures to their interface bodies
    fn link_module_interfaces(&mut self) {
        let procedures: Vec<SymbolId> = self
            .table
            .symbol_ids()
            .filter(|&id| {
                let symbol = self.table.symbol(id);
                symbol.has(Attrs::MODULE)
                    && symbol.details.as_subprogram().is_some_and(|details| !details.is_interface)
            })
            .collect();
        for procedure in procedures {
            let symbol = self.table.symbol(procedure);
            let Some(host) = self.table.try_parent(symbol.owner) else {
                continue;
            };
            let interface = self.table.find_symbol(host, symbol.name).filter(|&candidate| {
                let candidate = self.table.symbol(candidate);
                candidate.has(Attrs::MODULE)
                    && candidate.details.as_subprogram().is_some_and(|details| details.is_interface)
            });
            if let Some(interface) = interface
                && let Details::Subprogram(details) = &mut self.table.symbol_mut(procedure).details
            {
                details.module_interface = Some(interface);
            }
        }
    }

    /// Names that were mentioned but never typed are implicitly typed
    fn mark_implicit(&mut self) {
        for symbol in mem::take(&mut self.placeholders) {
            let untyped = self.table.symbol(symbol).details.as_object().is_some_and(|object| object.ty.is_none());
            if untyped {
                self.table.symbol_mut(symbol).set_flag(SymbolFlags::IMPLICIT);
            }
        }
    }

    // ==================== Helpers ====================

    /// Declare `name` in `scope`, completing a symbol created by an earlier
    /// mention
    fn declare(&mut self, scope: ScopeId, name: &Ident, attrs: Attrs, details: Details) -> SemaResult<SymbolId> {
        if let Some(existing) = self.local(scope, name) {
            if self.placeholders.remove(&existing) {
                let symbol = self.table.symbol_mut(existing);
                symbol.attrs |= attrs;
                symbol.span = name.span;
                symbol.details = merge_details(&symbol.details, details);
                return Ok(existing);
            }
            // a type declaration for a name declared EXTERNAL, or the reverse
            let current = &self.table.symbol(existing).details;
            let merged = match (current, details) {
                (Details::ProcEntity(entity), Details::Object(object)) if object.shape == ArraySpec::Scalar => {
                    let mut entity = entity.clone();
                    entity.ty = entity.ty.or(object.ty);
                    Ok(Details::ProcEntity(entity))
                }
                (Details::Object(_), details @ Details::ProcEntity(_)) => Ok(merge_details(current, details)),
                (_, details) => Err(details),
            };
            return match merged {
                Ok(details) => {
                    let symbol = self.table.symbol_mut(existing);
                    symbol.details = details;
                    symbol.attrs |= attrs;
                    Ok(existing)
                }
                Err(details) => self.table.add_symbol(scope, &name.text, attrs, details, name.span),
            };
        }
        if self.table.scope(scope).is_derived_type() {
            self.table.add_component(scope, &name.text, attrs, details, name.span)
        } else {
            self.table.add_symbol(scope, &name.text, attrs, details, name.span)
        }
    }

    /// The local symbol `name`, creating an untyped object for it when the
    /// name has not been seen yet
    fn placeholder(&mut self, scope: ScopeId, name: &Ident) -> SemaResult<SymbolId> {
        if let Some(existing) = self.local(scope, name) {
            return Ok(existing);
        }
        let details = Details::Object(ObjectDetails::new(None));
        let symbol = if self.table.scope(scope).is_derived_type() {
            self.table.add_component(scope, &name.text, Attrs::empty(), details, name.span)?
        } else {
            self.table.add_symbol(scope, &name.text, Attrs::empty(), details, name.span)?
        };
        self.placeholders.insert(symbol);
        Ok(symbol)
    }

    fn dummy_placeholder(&mut self, scope: ScopeId, name: &Ident) -> SemaResult<SymbolId> {
        let symbol = self.placeholder(scope, name)?;
        if let Some(object) = self.object_mut(symbol) {
            object.is_dummy = true;
        }
        Ok(symbol)
    }

    fn object_mut(&mut self, symbol: SymbolId) -> Option<&mut ObjectDetails> {
        match &mut self.table.symbol_mut(symbol).details {
            Details::Object(object) => Some(object),
            _ => None,
        }
    }

    fn local(&mut self, scope: ScopeId, name: &Ident) -> Option<SymbolId> {
        let name = self.table.intern(&name.text);
        self.table.scope(scope).find(name)
    }

    /// Look `name` up from `scope` outwards
    fn lookup(&mut self, scope: ScopeId, name: &Ident) -> SemaResult<SymbolId> {
        let interned = self.table.intern(&name.text);
        self.table
            .find_symbol(scope, interned)
            .ok_or_else(|| SemaError::resolve(format!("'{}' is not declared", name.text), name.span))
    }

    fn enclosing_type(&self, scope: ScopeId) -> Option<SymbolId> {
        let scope = self.table.scope(scope);
        scope.symbol.filter(|_| scope.is_derived_type())
    }

    fn intrinsic_modules_scope(&mut self) -> ScopeId {
        match self.intrinsic_modules {
            Some(scope) => scope,
            None => {
                let global = self.table.global();
                let scope = self.table.add_scope(global, ScopeKind::IntrinsicModules, None);
                self.intrinsic_modules = Some(scope);
                scope
            }
        }
    }

    fn find_module(&mut self, name: &Ident) -> SemaResult<ScopeId> {
        let wanted = self.table.intern(&name.text);
        let containers = [Some(self.table.global()), self.intrinsic_modules];
        for container in containers.into_iter().flatten() {
            if let Some(symbol) = self.table.scope(container).find(wanted)
                && let Some(details) = self.table.symbol(symbol).details.as_module()
                && !details.is_submodule
                && let Some(scope) = self.table.symbol(symbol).scope
            {
                return Ok(scope);
            }
        }
        Err(SemaError::resolve(format!("module '{}' is not declared", name.text), name.span))
    }

    /// Submodule `name` among the descendants of `ancestor`
    fn find_submodule(&mut self, ancestor: ScopeId, name: &Ident) -> SemaResult<ScopeId> {
        let wanted = self.table.intern(&name.text);
        let mut pending = vec![ancestor];
        while let Some(scope) = pending.pop() {
            for &child in self.table.scope(scope).children() {
                let child_scope = self.table.scope(child);
                if child_scope.kind != ScopeKind::Module {
                    continue;
                }
                if child_scope.symbol.is_some_and(|symbol| self.table.symbol(symbol).name == wanted) {
                    return Ok(child);
                }
                pending.push(child);
            }
        }
        Err(SemaError::resolve(format!("submodule '{}' is not declared", name.text), name.span))
    }

    /// Entity `name` of a module, if it may be use-associated
    fn find_public(&mut self, module_scope: ScopeId, module: &Ident, name: &Ident) -> SemaResult<SymbolId> {
        let wanted: Name = self.table.intern(&name.text);
        match self.table.scope(module_scope).find(wanted) {
            Some(symbol) if !self.table.symbol(symbol).has(Attrs::PRIVATE) => Ok(symbol),
            Some(_) => Err(SemaError::resolve(
                format!("'{}' is PRIVATE in module '{}'", name.text, module.text),
                name.span,
            )),
            None => Err(SemaError::resolve(
                format!("'{}' is not found in module '{}'", name.text, module.text),
                name.span,
            )),
        }
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Shape of a declared entity; `(:)` is deferred for allocatables and
/// pointers and assumed otherwise
fn array_spec(shape: &ShapeSpec, attrs: Attrs) -> ArraySpec {
    match shape {
        ShapeSpec::Colons(rank) if attrs.intersects(Attrs::ALLOCATABLE | Attrs::POINTER) => ArraySpec::Deferred(*rank),
        ShapeSpec::Colons(rank) => ArraySpec::AssumedShape(*rank),
        ShapeSpec::AssumedRank => ArraySpec::AssumedRank,
        ShapeSpec::AssumedSize(rank) => ArraySpec::AssumedSize(*rank),
        ShapeSpec::Explicit(extents) => ArraySpec::Explicit(extents.clone()),
    }
}

/// Details of a placeholder completed by its declaration. Dummy, result and
/// COMMON membership come from the placeholder.
fn merge_details(previous: &Details, details: Details) -> Details {
    match (previous, details) {
        (Details::Object(old), Details::Object(mut new)) => {
            new.is_dummy = old.is_dummy;
            new.is_func_result = old.is_func_result;
            new.common_block = old.common_block;
            if new.ty.is_none() {
                new.ty.clone_from(&old.ty);
            }
            Details::Object(new)
        }
        (Details::Object(old), Details::ProcEntity(mut new)) => {
            new.is_dummy = old.is_dummy;
            new.is_func_result = old.is_func_result;
            if new.ty.is_none() {
                new.ty.clone_from(&old.ty);
            }
            Details::ProcEntity(new)
        }
        (_, details) => details,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::loader::load_str;
    use crate::symbols::{GenericKind, ParamValue};
    use crate::tools::testing::{scope_named, symbol_named};

    #[test]
    fn test_units_and_scopes() {
        let table = load_str(
            "module m { integer :: x }
             submodule(m) s { }
             submodule(m:s) t { }
             program main { }
             blockdata init { }
             intrinsic module iso_c_binding { }",
        )
        .unwrap();
        let m = scope_named(&table, "m");
        let s = scope_named(&table, "s");
        let t = scope_named(&table, "t");
        assert_eq!(table.parent(m), table.global());
        assert_eq!(table.parent(s), m);
        assert_eq!(table.parent(t), s);
        let t_details = table.symbol(symbol_named(&table, "t")).details.as_module().unwrap();
        assert_eq!(t_details.ancestor, Some(m));
        assert_eq!(t_details.parent, Some(s));
        assert_eq!(table.scope(scope_named(&table, "init")).kind, ScopeKind::BlockData);
        let iso = scope_named(&table, "iso_c_binding");
        assert_eq!(table.scope(table.parent(iso)).kind, ScopeKind::IntrinsicModules);
    }

    #[test]
    fn test_dummies_and_results() {
        let table = load_str(
            "module m {
               integer function f(a, b) result(r) { real :: a; real, allocatable :: b(:, :) }
               subroutine s(c, *) { integer :: c(:) }
             }",
        )
        .unwrap();
        let f = table.symbol(symbol_named(&table, "f"));
        assert!(f.test(SymbolFlags::FUNCTION));
        let details = f.details.as_subprogram().unwrap();
        assert_eq!(details.dummy_args.len(), 2);
        let r = table.symbol(details.result.unwrap());
        assert_eq!(table.name_str(r.name), "r");
        let r_object = r.details.as_object().unwrap();
        assert!(r_object.is_func_result);
        assert_eq!(r_object.ty, Some(DeclTypeSpec::intrinsic(TypeCategory::Integer, 4)));

        let b = table.symbol(symbol_named(&table, "b")).details.as_object().unwrap();
        assert!(b.is_dummy);
        assert_eq!(b.shape, ArraySpec::Deferred(2));
        let c = table.symbol(symbol_named(&table, "c")).details.as_object().unwrap();
        assert_eq!(c.shape, ArraySpec::AssumedShape(1));
        let s = table.symbol(symbol_named(&table, "s")).details.as_subprogram().unwrap();
        assert_eq!(s.dummy_args[1], None);
    }

    #[test]
    fn test_use_only_and_rename() {
        let table = load_str(
            "module m { integer :: a; integer :: c; integer, private :: hidden }
             program p { use m, only: local => a }
             program q { use m, b => a }",
        )
        .unwrap();
        let p = scope_named(&table, "p");
        let q = scope_named(&table, "q");
        let a = symbol_named(&table, "a");
        let local = table.scope(p).find(table.lookup_name("local").unwrap()).unwrap();
        assert_eq!(table.ultimate(local), a);
        assert!(table.scope(p).find(table.lookup_name("c").unwrap()).is_none());

        // the renamed entity is only visible under its local name
        let b = table.scope(q).find(table.lookup_name("b").unwrap()).unwrap();
        assert_eq!(table.ultimate(b), a);
        assert!(table.scope(q).find(table.lookup_name("a").unwrap()).is_none());
        assert!(table.scope(q).find(table.lookup_name("c").unwrap()).is_some());
        assert!(table.scope(q).find(table.lookup_name("hidden").unwrap()).is_none());
    }

    #[test]
    fn test_derived_type_structure() {
        let table = load_str(
            "module m {
               type :: base(k) { integer, kind :: k = 4; integer :: i = 0 }
               type, extends(base) :: child { real :: r; procedure, pass(this) :: run => impl; final :: done }
               type(child(8)) :: c
               subroutine impl(this) { class(child) :: this }
               subroutine done(x) { type(child) :: x }
             }",
        )
        .unwrap();
        let base = symbol_named(&table, "base");
        let child = symbol_named(&table, "child");
        let base_details = table.symbol(base).details.as_derived_type().unwrap();
        assert_eq!(base_details.param_name_order, base_details.param_decl_order);
        let k = table.symbol(base_details.param_name_order[0]);
        assert!(matches!(
            &k.details,
            Details::TypeParam(TypeParamDetails { attr: TypeParamAttr::Kind, init: Some(4), .. })
        ));

        let child_details = table.symbol(child).details.as_derived_type().unwrap();
        let components: Vec<&str> = child_details.component_names.iter().map(|&name| table.name_str(name)).collect();
        assert_eq!(components, vec!["base", "r"]);
        assert_eq!(child_details.finals, vec![symbol_named(&table, "done")]);

        let run = table.symbol(symbol_named(&table, "run")).details.as_proc_binding().unwrap();
        assert_eq!(run.symbol, symbol_named(&table, "impl"));
        assert_eq!(run.pass_name, table.lookup_name("this"));

        let c_type = table.symbol_derived_type(symbol_named(&table, "c")).unwrap();
        assert_eq!(table.derived(c_type).type_symbol, child);
        assert_eq!(table.derived(c_type).parameters, vec![(table.lookup_name("k").unwrap(), ParamValue::Explicit(8))]);
    }

    #[test]
    fn test_generics_and_interfaces() {
        let table = load_str(
            "module m {
               interface swap {
                 subroutine swap_int(a) { integer :: a }
                 procedure :: swap_real
               }
               subroutine swap_real(a) { real :: a }
               generic, private :: operator(.cross.) => swap_real
               abstract interface { subroutine callback() { } }
             }",
        )
        .unwrap();
        let module = scope_named(&table, "m");
        let generic = table.scope(module).find(table.lookup_name("swap").unwrap()).unwrap();
        let details = table.symbol(generic).details.as_generic().unwrap();
        assert_eq!(details.specific_procs.len(), 2);
        let specifics: Vec<&str> = details.specific_procs.iter().map(|&s| table.symbol_name(s)).collect();
        assert_eq!(specifics, vec!["swap_int", "swap_real"]);
        assert_eq!(details.specific, None);

        let cross = table.scope(module).find(table.lookup_name("operator(.cross.)").unwrap()).unwrap();
        assert!(table.symbol(cross).has(Attrs::PRIVATE));
        assert_eq!(table.symbol(cross).details.as_generic().unwrap().kind, GenericKind::DefinedOperator);
        assert!(table.symbol(symbol_named(&table, "callback")).has(Attrs::ABSTRACT));
    }

    #[test]
    fn test_storage_statements() {
        let table = load_str(
            "subroutine s() {
               common /blk/ a, b
               real :: a
               integer :: p; pointer (p, target_obj)
               equivalence (a, b)
               save :: later
             }",
        )
        .unwrap();
        let a = table.symbol(symbol_named(&table, "a"));
        let a_object = a.details.as_object().unwrap();
        assert!(a_object.common_block.is_some());
        assert!(a_object.ty.is_some());
        assert!(!a.test(SymbolFlags::IMPLICIT));
        assert!(table.symbol(symbol_named(&table, "b")).test(SymbolFlags::IMPLICIT));
        assert!(table.symbol(symbol_named(&table, "p")).test(SymbolFlags::CRAY_POINTER));
        assert!(table.symbol(symbol_named(&table, "target_obj")).test(SymbolFlags::CRAY_POINTEE));
        assert!(table.symbol(symbol_named(&table, "later")).has(Attrs::SAVE));
        assert_eq!(table.scope(scope_named(&table, "s")).equivalence_sets.len(), 1);
    }

    #[test]
    fn test_associate_selectors() {
        let table = load_str(
            "module m {
               type :: t { real :: field(3) }
               subroutine s() {
                 type(t) :: obj(4)
                 associate (whole => obj, one => obj(2), part => obj(1)%field) { }
               }
             }",
        )
        .unwrap();
        let whole = table.symbol(symbol_named(&table, "whole"));
        let Details::AssocEntity(whole) = &whole.details else {
            panic!("expected an associate name");
        };
        assert_eq!(whole.shape, ArraySpec::Explicit(vec![Some(4)]));
        let one = table.shape(symbol_named(&table, "one")).unwrap();
        assert_eq!(*one, ArraySpec::Scalar);
        let part = table.symbol(symbol_named(&table, "part"));
        let Details::AssocEntity(part) = &part.details else {
            panic!("expected an associate name");
        };
        assert_eq!(part.ty, Some(DeclTypeSpec::intrinsic(TypeCategory::Real, 4)));
        assert!(matches!(part.selector, Some(Expr::Designator(DataRef::Component { .. }))));
    }

    #[test]
    fn test_separate_module_procedure() {
        let table = load_str(
            "module m { interface { module subroutine sep(x) { integer :: x } } }
             submodule(m) impl { module subroutine sep(x) { integer :: x } }",
        )
        .unwrap();
        let interface = symbol_named(&table, "sep");
        let implementation = table
            .symbol_ids()
            .filter(|&id| table.symbol_name(id) == "sep")
            .nth(1)
            .unwrap();
        let details = table.symbol(implementation).details.as_subprogram().unwrap();
        assert_eq!(details.module_interface, Some(interface));
    }

    #[test]
    fn test_default_private() {
        let table = load_str("module m { private; integer :: hidden; integer, public :: shown }").unwrap();
        assert!(table.symbol(symbol_named(&table, "hidden")).has(Attrs::PRIVATE));
        assert!(!table.symbol(symbol_named(&table, "shown")).has(Attrs::PRIVATE));
    }

    #[test]
    fn test_resolution_errors() {
        let err = load_str("program p { type(missing) :: x }").unwrap_err();
        assert!(err.to_string().contains("'missing' is not declared"));
        let err = load_str("program p { integer :: x; real :: x }").unwrap_err();
        assert!(err.to_string().contains("'x' is already declared in this scope"));
        let err = load_str("program p { use nowhere }").unwrap_err();
        assert!(err.to_string().contains("module 'nowhere' is not declared"));
        let err = load_str("module m { integer, private :: h } program p { use m, only: h }").unwrap_err();
        assert!(err.to_string().contains("'h' is PRIVATE in module 'm'"));
        let err = load_str("module m { procedure(nothing), pointer :: p }").unwrap_err();
        assert!(err.to_string().contains("'nothing' is not declared"));
    }
}
