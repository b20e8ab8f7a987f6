//! Typed expressions

use crate::symbols::{SymbolId, SymbolTable};

use super::DynamicType;

/// Reference to data: a whole object, a component, or an array element
#[derive(Debug, Clone, PartialEq)]
pub enum DataRef {
    Symbol(SymbolId),
    Component { base: Box<DataRef>, component: SymbolId },
    ArrayElement { base: Box<DataRef>, subscripts: Vec<Expr> },
}

impl DataRef {
    pub fn component(base: DataRef, component: SymbolId) -> Self {
        DataRef::Component { base: Box::new(base), component }
    }

    /// Symbol of the first part, `a` in `a%b(1)%c`
    pub fn first_symbol(&self) -> SymbolId {
        match self {
            DataRef::Symbol(symbol) => *symbol,
            DataRef::Component { base, .. } | DataRef::ArrayElement { base, .. } => base.first_symbol(),
        }
    }

    /// Symbol of the last part, `c` in `a%b(1)%c`
    pub fn last_symbol(&self) -> SymbolId {
        match self {
            DataRef::Symbol(symbol) => *symbol,
            DataRef::Component { component, .. } => *component,
            DataRef::ArrayElement { base, .. } => base.last_symbol(),
        }
    }

    pub fn rank(&self, table: &SymbolTable) -> usize {
        match self {
            DataRef::Symbol(symbol) => table.rank(*symbol),
            DataRef::Component { base, component } => match table.rank(*component) {
                0 => base.rank(table),
                rank => rank,
            },
            DataRef::ArrayElement { .. } => 0,
        }
    }

    fn collect_symbols(&self, symbols: &mut Vec<SymbolId>) {
        match self {
            DataRef::Symbol(symbol) => symbols.push(*symbol),
            DataRef::Component { base, component } => {
                base.collect_symbols(symbols);
                symbols.push(*component);
            }
            DataRef::ArrayElement { base, subscripts } => {
                base.collect_symbols(symbols);
                for subscript in subscripts {
                    subscript.collect_symbols_into(symbols);
                }
            }
        }
    }
}

/// An analyzed expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Constant(DynamicType),
    Designator(DataRef),
    FunctionRef { procedure: SymbolId, args: Vec<Expr> },
    /// Intrinsic operation with its result type
    Operation { result: DynamicType, operands: Vec<Expr> },
}

impl Expr {
    pub fn symbol(symbol: SymbolId) -> Self {
        Expr::Designator(DataRef::Symbol(symbol))
    }

    pub fn get_type(&self, table: &SymbolTable) -> Option<DynamicType> {
        match self {
            Expr::Constant(ty) | Expr::Operation { result: ty, .. } => Some(*ty),
            Expr::Designator(data_ref) => table.symbol_type(data_ref.last_symbol()).map(DynamicType::from_decl),
            Expr::FunctionRef { procedure, .. } => table.symbol_type(*procedure).map(DynamicType::from_decl),
        }
    }

    pub fn rank(&self, table: &SymbolTable) -> usize {
        match self {
            Expr::Constant(_) => 0,
            Expr::Designator(data_ref) => data_ref.rank(table),
            Expr::FunctionRef { procedure, .. } => {
                let result = table
                    .ultimate_symbol(*procedure)
                    .details
                    .as_subprogram()
                    .and_then(|details| details.result);
                result.map_or(0, |result| table.rank(result))
            }
            Expr::Operation { operands, .. } => operands.iter().map(|operand| operand.rank(table)).max().unwrap_or(0),
        }
    }

    /// Every symbol referenced by the expression, in order of appearance
    pub fn collect_symbols(&self) -> Vec<SymbolId> {
        let mut symbols = Vec::new();
        self.collect_symbols_into(&mut symbols);
        symbols
    }

    fn collect_symbols_into(&self, symbols: &mut Vec<SymbolId>) {
        match self {
            Expr::Constant(_) => {}
            Expr::Designator(data_ref) => data_ref.collect_symbols(symbols),
            Expr::FunctionRef { procedure, args } => {
                symbols.push(*procedure);
                for arg in args {
                    arg.collect_symbols_into(symbols);
                }
            }
            Expr::Operation { operands, .. } => {
                for operand in operands {
                    operand.collect_symbols_into(symbols);
                }
            }
        }
    }

    /// Symbol of a reference to a whole object
    pub fn unwrap_whole_symbol(&self) -> Option<SymbolId> {
        match self {
            Expr::Designator(DataRef::Symbol(symbol)) => Some(*symbol),
            _ => None,
        }
    }

    /// First symbol of a designator, `a` in `a%b(1)%c`
    pub fn first_symbol(&self) -> Option<SymbolId> {
        match self {
            Expr::Designator(data_ref) => Some(data_ref.first_symbol()),
            _ => None,
        }
    }

    /// Symbol designated by a whole-object or component reference without
    /// subscripts
    pub fn unwrap_whole_symbol_or_component(&self) -> Option<SymbolId> {
        match self {
            Expr::Designator(DataRef::Symbol(symbol)) => Some(*symbol),
            Expr::Designator(DataRef::Component { component, .. }) => Some(*component),
            _ => None,
        }
    }
}

/// How an assignment is carried out
#[derive(Debug, Clone, PartialEq)]
pub enum AssignmentKind {
    Intrinsic,
    /// Defined assignment through this subroutine
    Defined(SymbolId),
    /// Pointer assignment with lower bounds of the given rank
    BoundsSpec(usize),
    /// Pointer assignment with bounds remapping of the given rank
    BoundsRemapping(usize),
}

/// An analyzed assignment or pointer assignment
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub lhs: Expr,
    pub rhs: Expr,
    pub kind: AssignmentKind,
}

impl Assignment {
    pub fn intrinsic(lhs: Expr, rhs: Expr) -> Self {
        Self { lhs, rhs, kind: AssignmentKind::Intrinsic }
    }

    pub fn is_pointer_assignment(&self) -> bool {
        matches!(self.kind, AssignmentKind::BoundsSpec(_) | AssignmentKind::BoundsRemapping(_))
    }
}
