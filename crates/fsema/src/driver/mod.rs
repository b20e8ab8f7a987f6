//! Analysis driver: load a program description and report on it

use std::fmt::Write as _;

use crate::common::{Messages, SemaResult, Span};
use crate::evaluate::Expr;
use crate::loader;
use crate::semantics::{LanguageFeatures, SemanticsContext};
use crate::symbols::{
    Attrs, DerivedCategory, DerivedTypeId, DerivedTypeSpec, Details, ScopeId, ScopeKind, SymbolId, SymbolTable,
};
use crate::tools::{
    ComponentIterator, ComponentKind, Direct, Ordered, Potential, PotentialAndPointer, ProcedureDefinitionClass,
    ScopeOrder, TraversalKind, Ultimate, can_cuda_symbol_be_global, check_accessible_symbol, classify_procedure,
    finals_for_derived_type_instantiation, find_or_instantiate_derived_type, get_all_names, get_cuda_data_attr,
    get_storage_associations, is_finalizable, warn_on_deferred_length_character_scalar,
};

/// A textual report over the loaded table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Report {
    /// Scope tree with the symbols of each scope
    Scopes,
    /// Definition class of every procedure
    Classify,
    /// Components of every derived type, in one traversal order
    Components(ComponentKind),
    /// Final subroutines of every derived type
    Finals,
    /// Storage association groups of every scope with EQUIVALENCE
    Storage,
    /// References from program units to PRIVATE module entities
    Access,
    /// Every name each generic may be declared under
    Generics,
    /// CUDA data placement of main program variables
    Placement,
    /// Variables whose reallocation on assignment changed in Fortran 202X
    Reallocation,
}

/// Driver configuration
#[derive(Debug, Clone, Default)]
pub struct DriverConfig {
    pub features: LanguageFeatures,
    pub reports: Vec<Report>,
}

/// Result of analysing one description
#[derive(Debug)]
pub struct Analysis {
    pub context: SemanticsContext,
    /// Rendered reports, in the order requested
    pub output: String,
}

impl Analysis {
    pub fn messages(&self) -> &Messages {
        self.context.messages()
    }
}

pub struct Driver {
    config: DriverConfig,
}

impl Driver {
    pub fn new(config: DriverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Load `source` and run the configured reports
    pub fn analyze(&self, source: &str) -> SemaResult<Analysis> {
        let table = loader::load_str(source)?;
        let mut context = SemanticsContext::new(table, self.config.features);
        let mut output = String::new();
        for &report in &self.config.reports {
            let _span = tracing::info_span!("report", ?report).entered();
            output.push_str(&self.render(&mut context, report));
        }
        Ok(Analysis { context, output })
    }

    pub fn render(&self, context: &mut SemanticsContext, report: Report) -> String {
        match report {
            Report::Scopes => scopes_report(context.table()),
            Report::Classify => classify_report(context.table()),
            Report::Components(kind) => components_report(context, kind),
            Report::Finals => finals_report(context),
            Report::Storage => storage_report(context.table()),
            Report::Access => access_report(context),
            Report::Generics => generics_report(context),
            Report::Placement => placement_report(context),
            Report::Reallocation => reallocation_report(context),
        }
    }
}

impl Default for Driver {
    fn default() -> Self {
        Self::new(DriverConfig::default())
    }
}

fn scopes_report(table: &SymbolTable) -> String {
    let mut out = String::from("== scopes ==\n");
    write_scope(table, table.global(), 0, &mut out);
    out
}

fn write_scope(table: &SymbolTable, scope: ScopeId, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    let info = table.scope(scope);
    let name = info.symbol.map_or("", |symbol| table.symbol_name(symbol));
    let _ = writeln!(out, "{indent}{:?} {name}", info.kind);
    for &symbol in info.symbols() {
        let entity = table.symbol(symbol);
        let _ = writeln!(out, "{indent}  {}: {}", table.name_str(entity.name), entity.details.kind_name());
    }
    for &child in info.children() {
        write_scope(table, child, depth + 1, out);
    }
}

fn classify_report(table: &SymbolTable) -> String {
    let mut out = String::from("== procedures ==\n");
    for symbol in table.symbol_ids() {
        let class = classify_procedure(table, symbol);
        if class != ProcedureDefinitionClass::None {
            let _ = writeln!(out, "{}: {class}", qualified_name(table, symbol));
        }
    }
    out
}

/// Unparameterized instantiation of every derived type, in declaration order
fn derived_types(context: &mut SemanticsContext) -> Vec<(SymbolId, DerivedTypeId)> {
    let table = context.table_mut();
    let types: Vec<SymbolId> = table
        .symbol_ids()
        .filter(|&id| matches!(table.symbol(id).details, Details::DerivedType(_)))
        .collect();
    types
        .into_iter()
        .filter_map(|symbol| {
            let owner = table.symbol(symbol).owner;
            let spec = DerivedTypeSpec::new(symbol);
            let ty = find_or_instantiate_derived_type(table, owner, spec, DerivedCategory::Type);
            ty.as_derived().map(|derived| (symbol, derived))
        })
        .collect()
}

fn component_names<K: TraversalKind>(table: &SymbolTable, derived: DerivedTypeId) -> Vec<&str> {
    ComponentIterator::<K>::new(table, derived)
        .into_iter()
        .map(|component| table.symbol_name(component))
        .collect()
}

fn components_report(context: &mut SemanticsContext, kind: ComponentKind) -> String {
    let types = derived_types(context);
    let table = context.table();
    let mut out = format!("== {kind:?} components ==\n").to_lowercase();
    for (symbol, derived) in types {
        let names = match kind {
            ComponentKind::Ordered => component_names::<Ordered>(table, derived),
            ComponentKind::Direct => component_names::<Direct>(table, derived),
            ComponentKind::Ultimate => component_names::<Ultimate>(table, derived),
            ComponentKind::Potential => component_names::<Potential>(table, derived),
            ComponentKind::Scope => component_names::<ScopeOrder>(table, derived),
            ComponentKind::PotentialAndPointer => component_names::<PotentialAndPointer>(table, derived),
        };
        let _ = writeln!(out, "{}: {}", table.symbol_name(symbol), names.join(", "));
    }
    out
}

fn finals_report(context: &mut SemanticsContext) -> String {
    let types = derived_types(context);
    let table = context.table();
    let mut out = String::from("== finalization ==\n");
    for (symbol, derived) in types {
        let finals: Vec<&str> = finals_for_derived_type_instantiation(table, derived)
            .into_iter()
            .map(|final_sub| table.symbol_name(final_sub))
            .collect();
        let scalar = is_finalizable(table, derived, Some(0)).map_or("-", |final_sub| table.symbol_name(final_sub));
        let _ = writeln!(
            out,
            "{}: [{}] scalar={scalar}",
            table.symbol_name(symbol),
            finals.join(", ")
        );
    }
    out
}

fn storage_report(table: &SymbolTable) -> String {
    let mut out = String::from("== storage ==\n");
    for scope in table.scope_ids() {
        if table.scope(scope).equivalence_sets.is_empty() {
            continue;
        }
        let groups: Vec<String> = get_storage_associations(table, scope)
            .into_iter()
            .map(|group| {
                let names: Vec<&str> = group.into_iter().map(|symbol| table.symbol_name(symbol)).collect();
                format!("[{}]", names.join(", "))
            })
            .collect();
        let name = table.scope(scope).symbol.map_or("", |symbol| table.symbol_name(symbol));
        let _ = writeln!(out, "{name}: {}", groups.join(" "));
    }
    out
}

/// Report every PRIVATE module entity as if referenced from each program
/// unit outside its module
fn access_report(context: &mut SemanticsContext) -> String {
    let table = context.table();
    let units: Vec<ScopeId> = table
        .scope(table.global())
        .children()
        .iter()
        .copied()
        .filter(|&scope| matches!(table.scope(scope).kind, ScopeKind::MainProgram | ScopeKind::Subprogram))
        .collect();
    let private: Vec<SymbolId> = table
        .symbol_ids()
        .filter(|&id| {
            let symbol = table.symbol(id);
            symbol.has(Attrs::PRIVATE) && table.scope(symbol.owner).kind == ScopeKind::Module
        })
        .collect();

    let mut out = String::from("== access ==\n");
    let mut found = Vec::new();
    for &unit in &units {
        for &symbol in &private {
            if let Some(text) = check_accessible_symbol(table, unit, symbol) {
                let unit_name = table.scope(unit).symbol.map_or("", |unit| table.symbol_name(unit));
                let _ = writeln!(out, "{unit_name}: {text}");
                found.push((table.scope(unit).span, text));
            }
        }
    }
    for (at, text) in found {
        context.say(at, text);
    }
    out
}

/// Generic names with their operator aliases under the enabled extensions
fn generics_report(context: &SemanticsContext) -> String {
    let table = context.table();
    let mut out = String::from("== generics ==\n");
    for symbol in table.symbol_ids() {
        if !matches!(table.symbol(symbol).details, Details::Generic(_)) {
            continue;
        }
        let names = get_all_names(context.features(), table.symbol_name(symbol));
        let _ = writeln!(out, "{}: {}", qualified_name(table, symbol), names.join(", "));
    }
    out
}

fn placement_report(context: &SemanticsContext) -> String {
    let table = context.table();
    let mut out = String::from("== placement ==\n");
    for symbol in table.symbol_ids() {
        let entity = table.symbol(symbol);
        if !matches!(entity.details, Details::Object(_)) || table.scope(entity.owner).kind != ScopeKind::MainProgram {
            continue;
        }
        let placement = if can_cuda_symbol_be_global(context, symbol) { "global" } else { "local" };
        let data = get_cuda_data_attr(table, Some(symbol)).map_or_else(|| "-".to_string(), |attr| format!("{attr:?}"));
        let _ = writeln!(out, "{}: {placement} data={}", qualified_name(table, symbol), data.to_lowercase());
    }
    out
}

/// Warn about every variable an intrinsic assignment may reallocate to a
/// different length
fn reallocation_report(context: &mut SemanticsContext) -> String {
    let table = context.table();
    let objects: Vec<(SymbolId, Span)> = table
        .symbol_ids()
        .filter(|&id| matches!(table.symbol(id).details, Details::Object(_)))
        .map(|id| (id, table.symbol(id).span))
        .collect();
    let before = context.messages().len();
    for (symbol, at) in objects {
        let expr = Expr::symbol(symbol);
        warn_on_deferred_length_character_scalar(context, Some(&expr), at, "intrinsic assignment");
    }
    let mut out = String::from("== reallocation ==\n");
    for message in context.messages().iter().skip(before) {
        let _ = writeln!(out, "{}", message.text);
    }
    out
}

/// `scope%name` for symbols below the global scope
fn qualified_name(table: &SymbolTable, symbol: SymbolId) -> String {
    let owner = table.scope(table.symbol(symbol).owner);
    match owner.symbol {
        Some(host) => format!("{}%{}", table.symbol_name(host), table.symbol_name(symbol)),
        None => table.symbol_name(symbol).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const SOURCE: &str = "
        module shapes {
          type :: point { real :: x; real :: y }
          type :: shape { type(point), allocatable :: center; integer, private :: id; final :: cleanup }
          integer, private :: counter
          subroutine cleanup(s) { type(shape) :: s }
        }
        program main {
          use shapes
          real :: a @ 0:4; real :: b @ 0:4
          equivalence (a, b)
          external :: helper
        }";

    fn run(reports: Vec<Report>) -> Analysis {
        let config = DriverConfig { reports, ..DriverConfig::default() };
        Driver::new(config).analyze(SOURCE).unwrap()
    }

    #[test]
    fn test_scopes_report_nests_children() {
        let analysis = run(vec![Report::Scopes]);
        let lines: Vec<&str> = analysis.output.lines().take(4).collect();
        assert_eq!(lines, vec!["== scopes ==", "Global ", "  shapes: module", "  main: main program"]);
        assert!(analysis.output.contains("\n  Module shapes\n"));
        assert!(analysis.output.contains("    DerivedType point\n      x: object\n      y: object\n"));
    }

    #[test]
    fn test_classify_report() {
        let analysis = run(vec![Report::Classify]);
        assert!(analysis.output.contains("shapes%cleanup: module\n"));
        assert!(analysis.output.contains("main%helper: external\n"));
    }

    #[test]
    fn test_components_and_finals_reports() {
        let analysis = run(vec![Report::Components(ComponentKind::Ultimate), Report::Finals]);
        assert!(analysis.output.contains("== ultimate components ==\n"));
        assert!(analysis.output.contains("shape: center, id\n"));
        assert!(analysis.output.contains("shape: [cleanup] scalar=cleanup\n"));
        assert!(analysis.output.contains("point: [] scalar=-\n"));
    }

    #[test]
    fn test_storage_report() {
        let analysis = run(vec![Report::Storage]);
        assert_eq!(analysis.output, "== storage ==\nmain: [a, b]\n");
    }

    #[test]
    fn test_access_report_records_messages() {
        let analysis = run(vec![Report::Access]);
        assert!(
            analysis
                .output
                .contains("main: PRIVATE name 'counter' is accessible only within module 'shapes'")
        );
        assert_eq!(analysis.messages().len(), 1);
    }

    const EXTENSIONS: &str = "
        module ops {
          subroutine either(a, b) { logical :: a; logical :: b }
          generic :: operator(.neqv.) => either
          generic :: operator(.and.) => either
        }
        program main {
          real, device :: x
          real :: r
          character(len=:), allocatable :: s
        }";

    fn run_with(features: LanguageFeatures, reports: Vec<Report>) -> Analysis {
        Driver::new(DriverConfig { features, reports }).analyze(EXTENSIONS).unwrap()
    }

    #[test]
    fn test_generics_report_follows_operator_extensions() {
        let plain = run_with(LanguageFeatures::default(), vec![Report::Generics]);
        let lines: Vec<&str> = plain.output.lines().collect();
        assert_eq!(
            lines,
            vec!["== generics ==", "ops%operator(.neqv.): operator(.neqv.)", "ops%operator(.and.): operator(.and.)"]
        );

        let features = LanguageFeatures {
            logical_abbreviations: true,
            xor_operator: true,
            ..LanguageFeatures::default()
        };
        let extended = run_with(features, vec![Report::Generics]);
        let lines: Vec<&str> = extended.output.lines().collect();
        assert_eq!(
            lines,
            vec![
                "== generics ==",
                "ops%operator(.neqv.): operator(.neqv.), operator(.xor.), operator(.x.)",
                "ops%operator(.and.): operator(.and.), operator(.a.)",
            ]
        );
    }

    #[test]
    fn test_placement_report_needs_cuda() {
        let plain = run_with(LanguageFeatures::default(), vec![Report::Placement]);
        assert!(plain.output.contains("main%x: global data=device\n"));

        let cuda = run_with(LanguageFeatures { cuda: true, ..LanguageFeatures::default() }, vec![Report::Placement]);
        assert!(cuda.output.contains("main%x: local data=device\n"));
        assert!(cuda.output.contains("main%r: global data=-\n"));
        assert!(!cuda.output.contains("main%s: local"));
    }

    #[test]
    fn test_reallocation_report_is_gated() {
        let plain = run_with(LanguageFeatures::default(), vec![Report::Reallocation]);
        assert_eq!(plain.output, "== reallocation ==\n");
        assert!(plain.messages().is_empty());

        let features = LanguageFeatures { warn_f202x_allocatable: true, ..LanguageFeatures::default() };
        let warned = run_with(features, vec![Report::Reallocation]);
        assert!(warned.output.contains("variable 's' may be reallocated"));
        assert!(warned.output.ends_with("semantics for intrinsic assignment\n"));
        assert_eq!(warned.messages().len(), 1);
        assert!(!warned.context.any_fatal_error());
    }

    #[test]
    fn test_load_errors_propagate() {
        let err = Driver::default().analyze("program p { type(nothing) :: x }").unwrap_err();
        assert!(err.to_string().contains("'nothing' is not declared"));
    }
}
