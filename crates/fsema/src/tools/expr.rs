//! Access to analyzed expressions and the messages tied to them

use std::fmt::Debug;

use crate::common::{MessageText, Span, die};
use crate::evaluate::{self, Assignment, TypeCategory};
use crate::parse_tree::{Analyzable, AssignmentStmt, PointerAssignmentStmt};
use crate::semantics::SemanticsContext;
use crate::symbols::{ParamValue, ScopeKind, SymbolId};

use super::association::resolve_associations;
use super::predicates::is_allocatable;

/// Fetches the typed expression of a parse-tree node.
///
/// With `crash_if_no_expr`, a node that expression analysis never visited
/// is an internal error, unless a fatal error has already been reported
/// (analysis stops early in that case).
#[derive(Clone, Copy)]
pub struct GetExprHelper<'c> {
    context: Option<&'c SemanticsContext>,
    crash_if_no_expr: bool,
}

impl<'c> GetExprHelper<'c> {
    pub fn new(context: Option<&'c SemanticsContext>) -> Self {
        Self { context, crash_if_no_expr: true }
    }

    /// Helper that never dies on unanalyzed nodes
    pub fn lenient() -> Self {
        Self { context: None, crash_if_no_expr: false }
    }

    pub fn get<'n, T: Analyzable>(&self, node: &'n T) -> Option<&'n evaluate::Expr> {
        check_missing_analysis(self.crash_if_no_expr && node.typed_expr().is_none(), self.context, node);
        node.typed_expr().and_then(|typed| typed.0.as_ref())
    }
}

/// Typed expression of `node`; dies if it was never analyzed
pub fn get_expr<'n, T: Analyzable>(context: Option<&SemanticsContext>, node: &'n T) -> Option<&'n evaluate::Expr> {
    GetExprHelper::new(context).get(node)
}

pub fn check_missing_analysis(crash: bool, context: Option<&SemanticsContext>, node: &impl Debug) {
    if crash && !context.is_some_and(SemanticsContext::any_fatal_error) {
        die(format_args!("node has not been analyzed:\n{node:#?}"));
    }
}

pub fn get_assignment(stmt: &AssignmentStmt) -> Option<&Assignment> {
    stmt.typed_assignment.as_ref().and_then(|typed| typed.0.as_ref())
}

pub fn get_pointer_assignment(stmt: &PointerAssignmentStmt) -> Option<&Assignment> {
    stmt.typed_assignment.as_ref().and_then(|typed| typed.0.as_ref())
}

/// Portability warning for an allocatable deferred-length character scalar
/// whose reallocation on assignment (`what`) behaves differently under
/// Fortran 202X
pub fn warn_on_deferred_length_character_scalar(
    context: &mut SemanticsContext,
    expr: Option<&evaluate::Expr>,
    at: Span,
    what: &str,
) {
    if !context.features().warn_f202x_allocatable {
        return;
    }
    let Some(symbol) = expr.and_then(evaluate::Expr::unwrap_whole_symbol_or_component) else {
        return;
    };
    let table = context.table();
    let ultimate = resolve_associations(table, symbol, false);
    let deferred_character = table.symbol_type(ultimate).is_some_and(|ty| {
        ty.category() == Some(TypeCategory::Character) && ty.character_length() == Some(ParamValue::Deferred)
    });
    if deferred_character && is_allocatable(table, ultimate) && table.rank(ultimate) == 0 {
        let name = table.symbol_name(symbol).to_string();
        context.say(
            at,
            MessageText::portability(format!(
                "The deferred length allocatable character scalar variable '{name}' may be reallocated to a different length under the new Fortran 202X standard semantics for {what}"
            )),
        );
    }
}

/// Report a reference to an ambiguous use-associated name.
///
/// Returns whether `symbol` was such a name; it is then marked erroneous.
pub fn had_use_error(context: &mut SemanticsContext, at: Span, symbol: Option<SymbolId>) -> bool {
    let Some(symbol) = symbol else {
        return false;
    };
    let table = context.table();
    let Some(details) = table.symbol(symbol).details.as_use_error() else {
        return false;
    };
    let name = table.symbol_name(symbol).to_string();

    let mut notes = Vec::new();
    for &(location, occurrence) in &details.occurrences {
        let owner = table.scope(table.symbol(occurrence).owner);
        let ultimate = table.ultimate(occurrence);
        if owner.kind == ScopeKind::Module {
            let module = owner.symbol.map_or("", |module| table.symbol_name(module));
            let origin = (occurrence != ultimate).then(|| {
                let ultimate_symbol = table.symbol(ultimate);
                let ultimate_module = table
                    .scope(ultimate_symbol.owner)
                    .symbol
                    .map_or("", |module| table.symbol_name(module));
                (
                    ultimate_symbol.span,
                    format!("ultimately from '{}' in module '{ultimate_module}'", table.symbol_name(ultimate)),
                )
            });
            notes.push((location, format!("'{name}' was use-associated from module '{module}'"), origin));
        } else {
            notes.push((table.symbol(occurrence).span, "declared here".to_string(), None));
        }
    }

    tracing::debug!(name = %name, occurrences = notes.len(), "ambiguous use-associated reference");
    let message = context.say(at, MessageText::error(format!("Reference to '{name}' is ambiguous")));
    for (location, text, origin) in notes {
        let attachment = message.attach(location, MessageText::note(text));
        if let Some((span, text)) = origin {
            attachment.attach(span, MessageText::note(text));
        }
    }
    context.set_error(symbol);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Severity;
    use crate::evaluate::DynamicType;
    use crate::parse_tree::{Expr, TypedAssignment, TypedExpr, Variable};
    use crate::semantics::LanguageFeatures;
    use crate::tools::testing::{context_for, scope_named, symbol_named};

    fn variable(expr: Option<evaluate::Expr>) -> Variable {
        Variable { source: Span::new(3, 4), typed_expr: Some(TypedExpr(expr)) }
    }

    #[test]
    fn test_analyzed_and_failed_nodes() {
        let constant = evaluate::Expr::Constant(DynamicType::intrinsic(TypeCategory::Integer, 4));
        let analyzed = Expr::analyzed(Span::new(0, 1), constant.clone());
        assert_eq!(get_expr(None, &analyzed), Some(&constant));
        assert_eq!(get_expr(None, &variable(None)), None);
    }

    #[test]
    #[should_panic(expected = "node has not been analyzed")]
    fn test_unanalyzed_node_dies() {
        let node = Expr { source: Span::new(0, 1), typed_expr: None };
        get_expr(None, &node);
    }

    #[test]
    fn test_unanalyzed_node_after_fatal_error() {
        let mut context = context_for("program main { }", LanguageFeatures::default());
        context.say(Span::default(), MessageText::error("earlier failure"));
        let node = Expr { source: Span::new(0, 1), typed_expr: None };
        assert_eq!(get_expr(Some(&context), &node), None);
        assert_eq!(GetExprHelper::lenient().get(&node), None);
    }

    #[test]
    fn test_assignments() {
        let context = context_for("program main { integer :: i, j }", LanguageFeatures::default());
        let table = context.table();
        let (i, j) = (symbol_named(table, "i"), symbol_named(table, "j"));
        let assignment = Assignment::intrinsic(evaluate::Expr::symbol(i), evaluate::Expr::symbol(j));
        let stmt = AssignmentStmt {
            variable: variable(Some(evaluate::Expr::symbol(i))),
            expr: Expr::analyzed(Span::new(5, 6), evaluate::Expr::symbol(j)),
            typed_assignment: Some(TypedAssignment(Some(assignment.clone()))),
        };
        assert_eq!(get_assignment(&stmt), Some(&assignment));

        let pointer = PointerAssignmentStmt {
            pointer: variable(Some(evaluate::Expr::symbol(i))),
            target: Expr::analyzed(Span::new(5, 6), evaluate::Expr::symbol(j)),
            typed_assignment: None,
        };
        assert_eq!(get_pointer_assignment(&pointer), None);
    }

    const STRINGS: &str = "program main {
        character(len=:), allocatable :: s
        character(len=:), allocatable :: v(:)
        character(len=10), allocatable :: fixed
      }";

    #[test]
    fn test_deferred_length_warning() {
        let features = LanguageFeatures { warn_f202x_allocatable: true, ..LanguageFeatures::default() };
        let mut context = context_for(STRINGS, features);
        let table = context.table();
        let exprs: Vec<_> = ["s", "v", "fixed"]
            .into_iter()
            .map(|name| evaluate::Expr::symbol(symbol_named(table, name)))
            .collect();
        for expr in &exprs {
            warn_on_deferred_length_character_scalar(&mut context, Some(expr), Span::new(1, 2), "assignment");
        }
        warn_on_deferred_length_character_scalar(&mut context, None, Span::new(1, 2), "assignment");

        let messages: Vec<_> = context.messages().iter().collect();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].severity, Severity::Portability);
        assert_eq!(
            messages[0].text,
            "The deferred length allocatable character scalar variable 's' may be reallocated to a different length under the new Fortran 202X standard semantics for assignment"
        );
    }

    #[test]
    fn test_deferred_length_warning_is_gated() {
        let mut context = context_for(STRINGS, LanguageFeatures::default());
        let s = evaluate::Expr::symbol(symbol_named(context.table(), "s"));
        warn_on_deferred_length_character_scalar(&mut context, Some(&s), Span::default(), "assignment");
        assert!(context.messages().is_empty());
    }

    #[test]
    fn test_ambiguous_reference() {
        let mut context = context_for(
            "module m1 { integer :: x }
             module m2 { real :: x }
             module m3 { use m1 }
             program main {
               use m3
               use m2
             }",
            LanguageFeatures::default(),
        );
        let table = context.table();
        let main = scope_named(table, "main");
        let x = table.scope(main).find(table.lookup_name("x").unwrap()).unwrap();
        let m1_x = symbol_named(table, "x");

        assert!(had_use_error(&mut context, Span::new(100, 101), Some(x)));
        assert!(context.has_error(x));
        let messages: Vec<_> = context.messages().iter().collect();
        let message = messages[0];
        assert_eq!(message.text, "Reference to 'x' is ambiguous");
        let notes: Vec<&str> = message.attachments.iter().map(|note| note.text.as_str()).collect();
        assert_eq!(
            notes,
            vec!["'x' was use-associated from module 'm3'", "'x' was use-associated from module 'm2'"]
        );
        let origin = &message.attachments[0].attachments[0];
        assert_eq!(origin.text, "ultimately from 'x' in module 'm1'");
        assert_eq!(origin.at, context.table().symbol(m1_x).span);
        assert!(message.attachments[1].attachments.is_empty());
    }

    #[test]
    fn test_unambiguous_reference() {
        let mut context = context_for("program main { integer :: y }", LanguageFeatures::default());
        let y = symbol_named(context.table(), "y");
        assert!(!had_use_error(&mut context, Span::default(), Some(y)));
        assert!(!had_use_error(&mut context, Span::default(), None));
        assert!(context.messages().is_empty());
    }
}
