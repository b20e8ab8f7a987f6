//! The symbol table arena

use string_interner::DefaultStringInterner;

use crate::common::{SemaError, SemaResult, Span, die};

use super::{
    ArraySpec, Attrs, CommonBlockDetails, DeclTypeSpec, DerivedTypeId, DerivedTypeSpec, Details,
    EquivalenceSet, HostAssocDetails, Name, Scope, ScopeId, ScopeKind, Symbol, SymbolFlags,
    SymbolId, UseDetails, UseErrorDetails,
};

/// Owner of every scope, symbol and derived-type instantiation of a program
#[derive(Debug)]
pub struct SymbolTable {
    interner: DefaultStringInterner,
    scopes: Vec<Scope>,
    symbols: Vec<Symbol>,
    derived: Vec<DerivedTypeSpec>,
}

impl SymbolTable {
    /// Create a table holding only the global scope
    pub fn new() -> Self {
        Self {
            interner: DefaultStringInterner::new(),
            scopes: vec![Scope::new(ScopeKind::Global, None, None)],
            symbols: Vec::new(),
            derived: Vec::new(),
        }
    }

    // Names

    pub fn intern(&mut self, name: &str) -> Name {
        self.interner.get_or_intern(name.to_ascii_lowercase())
    }

    /// Look up a name without interning it
    pub fn lookup_name(&self, name: &str) -> Option<Name> {
        self.interner.get(name.to_ascii_lowercase())
    }

    pub fn name_str(&self, name: Name) -> &str {
        match self.interner.resolve(name) {
            Some(text) => text,
            None => die("name interned by another table"),
        }
    }

    /// Name of a symbol as text
    pub fn symbol_name(&self, symbol: SymbolId) -> &str {
        self.name_str(self.symbol(symbol).name)
    }

    // Arena access

    pub fn global(&self) -> ScopeId {
        ScopeId::new(0)
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    pub fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.index()]
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.index()]
    }

    pub fn derived(&self, id: DerivedTypeId) -> &DerivedTypeSpec {
        &self.derived[id.index()]
    }

    pub fn scope_ids(&self) -> impl Iterator<Item = ScopeId> {
        (0..self.scopes.len()).map(ScopeId::new)
    }

    pub fn symbol_ids(&self) -> impl Iterator<Item = SymbolId> {
        (0..self.symbols.len()).map(SymbolId::new)
    }

    /// Symbols of `scope` ordered by name
    pub fn symbols_by_name(&self, scope: ScopeId) -> Vec<SymbolId> {
        let mut symbols = self.scope(scope).symbols().to_vec();
        symbols.sort_by(|&a, &b| self.symbol_name(a).cmp(self.symbol_name(b)));
        symbols
    }

    // Building

    /// Add a scope nested in `parent`, optionally defined by `symbol`
    pub fn add_scope(&mut self, parent: ScopeId, kind: ScopeKind, symbol: Option<SymbolId>) -> ScopeId {
        let id = ScopeId::new(self.scopes.len());
        self.scopes.push(Scope::new(kind, Some(parent), symbol));
        self.scopes[parent.index()].children.push(id);
        if let Some(symbol) = symbol {
            self.symbols[symbol.index()].scope = Some(id);
        }
        id
    }

    /// Declare a new symbol in `scope`; a name may be declared only once per scope
    pub fn add_symbol(
        &mut self,
        scope: ScopeId,
        name: &str,
        attrs: Attrs,
        details: Details,
        span: Span,
    ) -> SemaResult<SymbolId> {
        let name = self.intern(name);
        if self.scopes[scope.index()].names.contains_key(&name) {
            return Err(SemaError::resolve(
                format!("'{}' is already declared in this scope", self.name_str(name)),
                span,
            ));
        }
        Ok(self.insert_symbol(scope, name, attrs, details, span))
    }

    /// Declare a component of the derived type whose scope is `type_scope`,
    /// recording it in the type's component order
    pub fn add_component(
        &mut self,
        type_scope: ScopeId,
        name: &str,
        attrs: Attrs,
        details: Details,
        span: Span,
    ) -> SemaResult<SymbolId> {
        let id = self.add_symbol(type_scope, name, attrs, details, span)?;
        let component_name = self.symbols[id.index()].name;
        if let Some(type_symbol) = self.scopes[type_scope.index()].symbol
            && let Details::DerivedType(details) = &mut self.symbols[type_symbol.index()].details
        {
            details.component_names.push(component_name);
        }
        Ok(id)
    }

    /// Make `symbol` the defining symbol of `scope`
    pub fn bind_scope(&mut self, symbol: SymbolId, scope: ScopeId) {
        self.symbols[symbol.index()].scope = Some(scope);
        self.scopes[scope.index()].symbol = Some(symbol);
    }

    /// Register a derived-type instantiation; without an explicit scope it
    /// uses the scope of the type's declaration
    pub fn new_derived_type_spec(&mut self, mut spec: DerivedTypeSpec) -> DerivedTypeId {
        if spec.scope.is_none() {
            spec.scope = self.symbols[spec.type_symbol.index()].scope;
        }
        let id = DerivedTypeId::new(self.derived.len());
        self.derived.push(spec);
        id
    }

    /// Record `spec` as an instantiation cached in `scope`
    pub fn add_instantiation(&mut self, scope: ScopeId, spec: DerivedTypeId) {
        self.scopes[scope.index()].instantiations.push(spec);
    }

    /// Make `local` in `scope` a use-association of `target`.
    ///
    /// A second association of the same name with a different entity turns
    /// the local symbol into a use error rather than failing.
    pub fn add_use(&mut self, scope: ScopeId, local: &str, target: SymbolId, location: Span) -> SemaResult<SymbolId> {
        let name = self.intern(local);
        let Some(existing) = self.scopes[scope.index()].find(name) else {
            let details = Details::Use(UseDetails { location, symbol: target });
            return Ok(self.insert_symbol(scope, name, Attrs::empty(), details, location));
        };
        if self.ultimate(existing) == self.ultimate(target) {
            return Ok(existing);
        }
        let symbol = &mut self.symbols[existing.index()];
        match &mut symbol.details {
            Details::Use(previous) => {
                let occurrences = vec![(previous.location, previous.symbol), (location, target)];
                symbol.details = Details::UseError(UseErrorDetails { occurrences });
            }
            Details::UseError(error) => error.occurrences.push((location, target)),
            _ => {
                return Err(SemaError::resolve(
                    format!("'{}' is already declared in this scope", self.name_str(name)),
                    location,
                ));
            }
        }
        Ok(existing)
    }

    /// Make the entity `target` visible in `scope` by host association
    pub fn add_host_assoc(&mut self, scope: ScopeId, target: SymbolId) -> SemaResult<SymbolId> {
        let target_symbol = &self.symbols[target.index()];
        let (name, span) = (target_symbol.name, target_symbol.span);
        if self.scopes[scope.index()].names.contains_key(&name) {
            return Err(SemaError::resolve(
                format!("'{}' is already declared in this scope", self.name_str(name)),
                span,
            ));
        }
        let details = Details::HostAssoc(HostAssocDetails { symbol: target });
        Ok(self.insert_symbol(scope, name, Attrs::empty(), details, span))
    }

    /// Find or create the common block `name` of `scope`; the blank common
    /// block has the empty name
    pub fn add_common_block(&mut self, scope: ScopeId, name: &str, span: Span) -> SymbolId {
        let name = self.intern(name);
        if let Some(existing) = self.scopes[scope.index()].find_common_block(name) {
            return existing;
        }
        let id = SymbolId::new(self.symbols.len());
        let details = Details::CommonBlock(CommonBlockDetails::default());
        self.symbols.push(Symbol::new(name, scope, Attrs::empty(), details, span));
        self.scopes[scope.index()].common_blocks.insert(name, id);
        id
    }

    pub fn add_to_common_block(&mut self, block: SymbolId, object: SymbolId) {
        if let Details::CommonBlock(details) = &mut self.symbols[block.index()].details {
            details.objects.push(object);
        }
        if let Details::Object(details) = &mut self.symbols[object.index()].details {
            details.common_block = Some(block);
        }
    }

    pub fn add_equivalence_set(&mut self, scope: ScopeId, set: EquivalenceSet) {
        self.scopes[scope.index()].equivalence_sets.push(set);
    }

    /// Associate the Cray pointee `pointee` with `pointer` in `scope`
    pub fn add_cray_pointer(&mut self, scope: ScopeId, pointee: Name, pointer: SymbolId) {
        self.scopes[scope.index()].cray_pointers.push((pointee, pointer));
        self.symbols[pointer.index()].set_flag(SymbolFlags::CRAY_POINTER);
    }

    fn insert_symbol(&mut self, scope: ScopeId, name: Name, attrs: Attrs, details: Details, span: Span) -> SymbolId {
        let id = SymbolId::new(self.symbols.len());
        self.symbols.push(Symbol::new(name, scope, attrs, details, span));
        let scope = &mut self.scopes[scope.index()];
        scope.names.insert(name, id);
        scope.symbols.push(id);
        id
    }

    // Scope graph

    /// Enclosing scope; the global scope has none
    pub fn parent(&self, scope: ScopeId) -> ScopeId {
        match self.scopes[scope.index()].parent {
            Some(parent) => parent,
            None => die("parent() of the global scope"),
        }
    }

    pub fn try_parent(&self, scope: ScopeId) -> Option<ScopeId> {
        self.scopes[scope.index()].parent
    }

    pub fn is_top_level(&self, scope: ScopeId) -> bool {
        self.scopes[scope.index()].kind == ScopeKind::Global
    }

    /// Whether `scope` is `other` or one of its ancestors
    pub fn contains(&self, scope: ScopeId, other: ScopeId) -> bool {
        let mut current = other;
        loop {
            if current == scope {
                return true;
            }
            match self.scopes[current.index()].parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Look `name` up in `scope` and then in its hosts
    pub fn find_symbol(&self, scope: ScopeId, name: Name) -> Option<SymbolId> {
        let mut current = scope;
        loop {
            let found = self.scopes[current.index()].find(name);
            if found.is_some() {
                return found;
            }
            current = self.scopes[current.index()].parent?;
        }
    }

    /// Look up a component of the derived type with scope `type_scope`,
    /// including those inherited from its parent type
    pub fn find_component(&self, type_scope: ScopeId, name: Name) -> Option<SymbolId> {
        let mut current = type_scope;
        loop {
            if let Some(found) = self.scopes[current.index()].find(name) {
                return Some(found);
            }
            current = self.derived_type_parent(current)?;
        }
    }

    /// Scope of the parent type of the derived type with scope `type_scope`
    pub fn derived_type_parent(&self, type_scope: ScopeId) -> Option<ScopeId> {
        let scope = &self.scopes[type_scope.index()];
        if scope.kind != ScopeKind::DerivedType {
            return None;
        }
        let parent_component = scope
            .symbols
            .iter()
            .copied()
            .find(|&id| self.symbols[id.index()].test(SymbolFlags::PARENT_COMP))?;
        let parent_spec = self.symbol_type(parent_component)?.as_derived()?;
        self.derived_scope(parent_spec)
    }

    /// Scope holding the components of an instantiation
    pub fn derived_scope(&self, spec: DerivedTypeId) -> Option<ScopeId> {
        let spec = &self.derived[spec.index()];
        spec.scope.or(self.symbols[spec.type_symbol.index()].scope)
    }

    // Symbols

    /// Follow use and host association to the defining symbol
    pub fn ultimate(&self, symbol: SymbolId) -> SymbolId {
        let mut current = symbol;
        loop {
            match &self.symbols[current.index()].details {
                Details::Use(details) => current = details.symbol,
                Details::HostAssoc(details) => current = details.symbol,
                _ => return current,
            }
        }
    }

    pub fn ultimate_symbol(&self, symbol: SymbolId) -> &Symbol {
        self.symbol(self.ultimate(symbol))
    }

    /// Declared type of an entity, looking through associations and into
    /// function results and bindings
    pub fn symbol_type(&self, symbol: SymbolId) -> Option<&DeclTypeSpec> {
        match &self.ultimate_symbol(symbol).details {
            Details::Object(details) => details.ty.as_ref(),
            Details::ProcEntity(details) => details.ty.as_ref(),
            Details::AssocEntity(details) => details.ty.as_ref(),
            Details::TypeParam(details) => details.ty.as_ref(),
            Details::Subprogram(details) => details.result.and_then(|result| self.symbol_type(result)),
            Details::ProcBinding(details) => self.symbol_type(details.symbol),
            _ => None,
        }
    }

    /// Derived type of an entity, if it has one
    pub fn symbol_derived_type(&self, symbol: SymbolId) -> Option<DerivedTypeId> {
        self.symbol_type(symbol).and_then(DeclTypeSpec::as_derived)
    }

    pub fn shape(&self, symbol: SymbolId) -> Option<&ArraySpec> {
        match &self.ultimate_symbol(symbol).details {
            Details::Object(details) => Some(&details.shape),
            Details::AssocEntity(details) => Some(&details.shape),
            _ => None,
        }
    }

    pub fn rank(&self, symbol: SymbolId) -> usize {
        self.shape(symbol).map_or(0, ArraySpec::rank)
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::{DerivedTypeDetails, ObjectDetails};

    #[test]
    fn test_names_are_case_insensitive() {
        let mut table = SymbolTable::new();
        let upper = table.intern("Alpha");
        let lower = table.intern("alpha");
        assert_eq!(upper, lower);
        assert_eq!(table.name_str(upper), "alpha");
        assert_eq!(table.lookup_name("ALPHA"), Some(lower));
        assert_eq!(table.lookup_name("beta"), None);
    }

    #[test]
    fn test_duplicate_declaration_is_rejected() {
        let mut table = SymbolTable::new();
        let global = table.global();
        let details = || Details::Object(ObjectDetails::default());
        table.add_symbol(global, "x", Attrs::empty(), details(), Span::default()).unwrap();
        let err = table.add_symbol(global, "X", Attrs::empty(), details(), Span::new(4, 5)).unwrap_err();
        assert!(err.to_string().contains("'x' is already declared"));
    }

    #[test]
    fn test_symbols_by_name() {
        let mut table = SymbolTable::new();
        let global = table.global();
        let details = || Details::Object(ObjectDetails::default());
        let z = table.add_symbol(global, "z", Attrs::empty(), details(), Span::default()).unwrap();
        let a = table.add_symbol(global, "a", Attrs::empty(), details(), Span::default()).unwrap();
        let m = table.add_symbol(global, "m", Attrs::empty(), details(), Span::default()).unwrap();
        assert_eq!(table.scope(global).symbols(), &[z, a, m]);
        assert_eq!(table.symbols_by_name(global), vec![a, m, z]);
    }

    #[test]
    fn test_containment_and_lookup() {
        let mut table = SymbolTable::new();
        let global = table.global();
        let module = table
            .add_symbol(global, "m", Attrs::empty(), Details::Module(Default::default()), Span::default())
            .unwrap();
        let module_scope = table.add_scope(global, ScopeKind::Module, Some(module));
        let block = table.add_scope(module_scope, ScopeKind::BlockConstruct, None);
        let x = table
            .add_symbol(module_scope, "x", Attrs::empty(), Details::Object(ObjectDetails::default()), Span::default())
            .unwrap();

        assert!(table.contains(global, block));
        assert!(table.contains(block, block));
        assert!(!table.contains(block, module_scope));
        assert_eq!(table.parent(block), module_scope);
        assert_eq!(table.symbol(module).scope, Some(module_scope));
        let name = table.intern("x");
        assert_eq!(table.find_symbol(block, name), Some(x));
        assert_eq!(table.find_symbol(global, name), None);
    }

    #[test]
    #[should_panic(expected = "parent() of the global scope")]
    fn test_parent_of_global_dies() {
        let table = SymbolTable::new();
        table.parent(table.global());
    }

    #[test]
    fn test_conflicting_uses_become_use_error() {
        let mut table = SymbolTable::new();
        let global = table.global();
        let object = || Details::Object(ObjectDetails::default());
        let a = table.add_symbol(global, "a", Attrs::empty(), object(), Span::new(0, 1)).unwrap();
        let b = table.add_symbol(global, "b", Attrs::empty(), object(), Span::new(2, 3)).unwrap();
        let program = table.add_scope(global, ScopeKind::MainProgram, None);

        let local = table.add_use(program, "x", a, Span::new(10, 11)).unwrap();
        assert_eq!(table.ultimate(local), a);
        assert_eq!(table.add_use(program, "x", a, Span::new(12, 13)).unwrap(), local);
        table.add_use(program, "x", b, Span::new(14, 15)).unwrap();
        let error = table.symbol(local).details.as_use_error().unwrap();
        assert_eq!(error.occurrences.len(), 2);
        assert_eq!(error.occurrences[1], (Span::new(14, 15), b));
    }

    #[test]
    fn test_components_are_recorded_in_order() {
        let mut table = SymbolTable::new();
        let global = table.global();
        let t = table
            .add_symbol(global, "t", Attrs::empty(), Details::DerivedType(DerivedTypeDetails::default()), Span::default())
            .unwrap();
        let type_scope = table.add_scope(global, ScopeKind::DerivedType, Some(t));
        for name in ["b", "a"] {
            table
                .add_component(type_scope, name, Attrs::empty(), Details::Object(ObjectDetails::default()), Span::default())
                .unwrap();
        }
        let names: Vec<&str> = table.symbol(t).details.as_derived_type().unwrap().component_names.iter()
            .map(|&name| table.name_str(name))
            .collect();
        assert_eq!(names, vec!["b", "a"]);
    }
}
