//! Image control statements
//!
//! Statements that order the execution segments of images: the SYNC
//! family, EVENT and LOCK statements, CRITICAL and CHANGE TEAM, STOP, and
//! the allocation of coarrays.

use crate::common::Span;
use crate::parse_tree::{self, ActionStmt, ActualArg, AllocateObject, ConstructKind, ExecutableConstruct};
use crate::symbols::SymbolTable;

use super::expr::GetExprHelper;
use super::predicates::is_coarray;

pub fn is_image_control_stmt(table: &SymbolTable, construct: &ExecutableConstruct) -> bool {
    match construct {
        ExecutableConstruct::Construct(construct) => {
            matches!(construct.kind, ConstructKind::ChangeTeam | ConstructKind::Critical)
        }
        ExecutableConstruct::Action(statement) => is_image_control_action(table, &statement.statement),
    }
}

fn is_image_control_action(table: &SymbolTable, action: &ActionStmt) -> bool {
    match action {
        ActionStmt::SyncAll
        | ActionStmt::SyncImages
        | ActionStmt::SyncMemory
        | ActionStmt::SyncTeam
        | ActionStmt::EventPost
        | ActionStmt::EventWait
        | ActionStmt::FormTeam
        | ActionStmt::Lock
        | ActionStmt::Unlock => true,
        ActionStmt::Allocate(objects) | ActionStmt::Deallocate(objects) => {
            objects.iter().any(|object| is_coarray_object(table, object))
        }
        ActionStmt::Call(call) => {
            call.procedure.text.eq_ignore_ascii_case("move_alloc")
                && matches!(call.args.first(), Some(ActualArg::Expr(expr)) if has_coarray(table, expr))
        }
        ActionStmt::Stop { error } => !error,
        ActionStmt::If { action, .. } => is_image_control_action(table, action),
        _ => false,
    }
}

fn is_coarray_object(table: &SymbolTable, object: &AllocateObject) -> bool {
    object.name.symbol.is_some_and(|symbol| is_coarray(table, symbol))
}

/// Message for the statements that are image control statements only
/// because they involve a coarray
pub fn get_image_control_stmt_coarray_msg(construct: &ExecutableConstruct) -> Option<&'static str> {
    let ExecutableConstruct::Action(statement) = construct else {
        return None;
    };
    match statement.statement {
        ActionStmt::Allocate(_) => Some("ALLOCATE of a coarray is an image control statement"),
        ActionStmt::Deallocate(_) => Some("DEALLOCATE of a coarray is an image control statement"),
        ActionStmt::Call(_) => Some("MOVE_ALLOC of a coarray is an image control statement"),
        _ => None,
    }
}

/// Where an image control statement is reported
pub fn get_image_control_stmt_location(construct: &ExecutableConstruct) -> Span {
    match construct {
        ExecutableConstruct::Construct(construct)
            if matches!(construct.kind, ConstructKind::ChangeTeam | ConstructKind::Critical) =>
        {
            construct.statement.source
        }
        ExecutableConstruct::Action(statement) => statement.source,
        ExecutableConstruct::Construct(_) => Span::default(),
    }
}

/// Whether an analyzed expression references a coarray
pub fn has_coarray(table: &SymbolTable, expr: &parse_tree::Expr) -> bool {
    GetExprHelper::new(None)
        .get(expr)
        .is_some_and(|expr| expr.collect_symbols().into_iter().any(|symbol| is_coarray(table, symbol)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluate;
    use crate::parse_tree::{CallStmt, Construct, Name, Statement};
    use crate::loader::load_str;
    use crate::tools::testing::symbol_named;

    const COARRAYS: &str = "program main {
        real, allocatable :: co(:)[:]
        real, allocatable :: plain(:)
      }";

    fn action(stmt: ActionStmt) -> ExecutableConstruct {
        ExecutableConstruct::action(Span::new(7, 9), stmt)
    }

    fn allocate(table: &SymbolTable, name: &str) -> Vec<AllocateObject> {
        vec![AllocateObject::new(Name::new(Span::default(), name, Some(symbol_named(table, name))))]
    }

    fn move_alloc(table: &SymbolTable, from: &str) -> ActionStmt {
        let arg = parse_tree::Expr::analyzed(Span::default(), evaluate::Expr::symbol(symbol_named(table, from)));
        ActionStmt::Call(CallStmt {
            procedure: Name::new(Span::default(), "MOVE_ALLOC", None),
            args: vec![ActualArg::Expr(arg)],
        })
    }

    fn construct(kind: ConstructKind) -> ExecutableConstruct {
        ExecutableConstruct::Construct(Box::new(Construct {
            kind,
            name: None,
            statement: Statement::new(Span::new(1, 5), ()),
            body: Vec::new(),
        }))
    }

    #[test]
    fn test_always_image_control() {
        let table = load_str(COARRAYS).unwrap();
        for stmt in [ActionStmt::SyncAll, ActionStmt::SyncMemory, ActionStmt::EventPost, ActionStmt::Lock] {
            assert!(is_image_control_stmt(&table, &action(stmt)));
        }
        assert!(is_image_control_stmt(&table, &action(ActionStmt::Stop { error: false })));
        assert!(!is_image_control_stmt(&table, &action(ActionStmt::Stop { error: true })));
        assert!(is_image_control_stmt(&table, &construct(ConstructKind::Critical)));
        assert!(!is_image_control_stmt(&table, &construct(ConstructKind::Do)));
        assert!(!is_image_control_stmt(&table, &action(ActionStmt::Continue)));
    }

    #[test]
    fn test_coarray_allocation() {
        let table = load_str(COARRAYS).unwrap();
        let co = action(ActionStmt::Allocate(allocate(&table, "co")));
        assert!(is_image_control_stmt(&table, &co));
        assert_eq!(get_image_control_stmt_coarray_msg(&co), Some("ALLOCATE of a coarray is an image control statement"));
        assert!(!is_image_control_stmt(&table, &action(ActionStmt::Allocate(allocate(&table, "plain")))));
        assert!(is_image_control_stmt(&table, &action(ActionStmt::Deallocate(allocate(&table, "co")))));

        let guarded = ActionStmt::If {
            condition: parse_tree::Expr { source: Span::default(), typed_expr: None },
            action: Box::new(ActionStmt::Deallocate(allocate(&table, "co"))),
        };
        assert!(is_image_control_stmt(&table, &action(guarded)));
    }

    #[test]
    fn test_move_alloc() {
        let table = load_str(COARRAYS).unwrap();
        let moved = action(move_alloc(&table, "co"));
        assert!(is_image_control_stmt(&table, &moved));
        assert_eq!(get_image_control_stmt_coarray_msg(&moved), Some("MOVE_ALLOC of a coarray is an image control statement"));
        assert!(!is_image_control_stmt(&table, &action(move_alloc(&table, "plain"))));
    }

    #[test]
    fn test_locations() {
        assert_eq!(get_image_control_stmt_location(&construct(ConstructKind::ChangeTeam)), Span::new(1, 5));
        assert_eq!(get_image_control_stmt_location(&action(ActionStmt::SyncAll)), Span::new(7, 9));
        assert_eq!(get_image_control_stmt_location(&construct(ConstructKind::Block)), Span::default());
        assert_eq!(get_image_control_stmt_coarray_msg(&construct(ConstructKind::Critical)), None);
        assert_eq!(get_image_control_stmt_coarray_msg(&action(ActionStmt::SyncAll)), None);
    }
}
