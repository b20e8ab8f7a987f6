//! Parse-tree nodes consumed by the semantic queries
//!
//! Only the statements and expression holders that the queries inspect are
//! modeled. Nodes that carry an analyzed expression hold it in
//! `typed_expr`: `None` means expression analysis never ran on the node,
//! `Some(TypedExpr(None))` means it ran and failed.

use std::fmt;

use crate::common::Span;
use crate::evaluate;
use crate::symbols::SymbolId;

/// Statement label
pub type Label = u64;

/// A statement with its source position and optional label
#[derive(Debug, Clone, PartialEq)]
pub struct Statement<T> {
    pub source: Span,
    pub label: Option<Label>,
    pub statement: T,
}

impl<T> Statement<T> {
    pub fn new(source: Span, statement: T) -> Self {
        Self { source, label: None, statement }
    }

    pub fn labeled(source: Span, label: Label, statement: T) -> Self {
        Self { source, label: Some(label), statement }
    }
}

/// A name occurrence and the symbol it was resolved to
#[derive(Debug, Clone, PartialEq)]
pub struct Name {
    pub source: Span,
    pub text: String,
    pub symbol: Option<SymbolId>,
}

impl Name {
    pub fn new(source: Span, text: impl Into<String>, symbol: Option<SymbolId>) -> Self {
        Self { source, text: text.into(), symbol }
    }
}

/// Result of expression analysis attached to a node
#[derive(Debug, Clone, PartialEq)]
pub struct TypedExpr(pub Option<evaluate::Expr>);

/// Result of assignment analysis attached to a statement
#[derive(Debug, Clone, PartialEq)]
pub struct TypedAssignment(pub Option<evaluate::Assignment>);

/// A node that expression analysis annotates
pub trait Analyzable: fmt::Debug {
    fn typed_expr(&self) -> Option<&TypedExpr>;
}

macro_rules! analyzable_node {
    ($(#[$meta:meta])* $name:ident { $($field:ident : $ty:ty),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        pub struct $name {
            pub source: Span,
            $(pub $field: $ty,)*
            pub typed_expr: Option<TypedExpr>,
        }

        impl Analyzable for $name {
            fn typed_expr(&self) -> Option<&TypedExpr> {
                self.typed_expr.as_ref()
            }
        }
    };
}

analyzable_node!(
    /// Expression
    Expr {}
);
analyzable_node!(
    /// Variable designator
    Variable {}
);
analyzable_node!(
    /// Constant in a DATA statement value list
    DataStmtConstant {}
);
analyzable_node!(
    /// Object of an ALLOCATE or DEALLOCATE statement
    AllocateObject { name: Name }
);
analyzable_node!(
    /// Object of a NULLIFY statement
    PointerObject { name: Name }
);

impl Expr {
    pub fn analyzed(source: Span, expr: evaluate::Expr) -> Self {
        Self { source, typed_expr: Some(TypedExpr(Some(expr))) }
    }
}

impl AllocateObject {
    pub fn new(name: Name) -> Self {
        Self { source: name.source, name, typed_expr: None }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentStmt {
    pub variable: Variable,
    pub expr: Expr,
    pub typed_assignment: Option<TypedAssignment>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointerAssignmentStmt {
    pub pointer: Variable,
    pub target: Expr,
    pub typed_assignment: Option<TypedAssignment>,
}

/// Actual argument of a CALL
#[derive(Debug, Clone, PartialEq)]
pub enum ActualArg {
    Expr(Expr),
    /// `*label`
    AltReturn(Label),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallStmt {
    pub procedure: Name,
    pub args: Vec<ActualArg>,
}

/// Action statements
#[derive(Debug, Clone, PartialEq)]
pub enum ActionStmt {
    Continue,
    Assignment(AssignmentStmt),
    PointerAssignment(PointerAssignmentStmt),
    Goto(Label),
    ComputedGoto(Vec<Label>),
    ArithmeticIf { expr: Expr, labels: [Label; 3] },
    Assign { label: Label, variable: Name },
    AssignedGoto { variable: Name, labels: Vec<Label> },
    Call(CallStmt),
    /// Data transfer or file positioning statement with its branch specifiers
    Io { err: Option<Label>, end: Option<Label>, eor: Option<Label> },
    /// Logical IF with its controlled statement
    If { condition: Expr, action: Box<ActionStmt> },
    Allocate(Vec<AllocateObject>),
    Deallocate(Vec<AllocateObject>),
    Nullify(Vec<PointerObject>),
    /// STOP, or ERROR STOP when `error` is set
    Stop { error: bool },
    SyncAll,
    SyncImages,
    SyncMemory,
    SyncTeam,
    EventPost,
    EventWait,
    FormTeam,
    Lock,
    Unlock,
    Return,
}

/// Kind of a construct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstructKind {
    Associate,
    Block,
    ChangeTeam,
    Critical,
    Do,
    If,
    SelectCase,
    SelectRank,
    SelectType,
    Where,
    Forall,
}

impl ConstructKind {
    /// Keyword of the construct statement
    pub fn keyword(self) -> &'static str {
        match self {
            ConstructKind::Associate => "ASSOCIATE",
            ConstructKind::Block => "BLOCK",
            ConstructKind::ChangeTeam => "CHANGE TEAM",
            ConstructKind::Critical => "CRITICAL",
            ConstructKind::Do => "DO",
            ConstructKind::If => "IF",
            ConstructKind::SelectCase => "SELECT CASE",
            ConstructKind::SelectRank => "SELECT RANK",
            ConstructKind::SelectType => "SELECT TYPE",
            ConstructKind::Where => "WHERE",
            ConstructKind::Forall => "FORALL",
        }
    }
}

/// A construct: its opening statement, optional name and body
#[derive(Debug, Clone, PartialEq)]
pub struct Construct {
    pub kind: ConstructKind,
    pub name: Option<Name>,
    pub statement: Statement<()>,
    pub body: Vec<ExecutableConstruct>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExecutableConstruct {
    Action(Statement<ActionStmt>),
    Construct(Box<Construct>),
}

impl ExecutableConstruct {
    pub fn action(source: Span, stmt: ActionStmt) -> Self {
        ExecutableConstruct::Action(Statement::new(source, stmt))
    }
}

impl fmt::Display for ConstructKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}
