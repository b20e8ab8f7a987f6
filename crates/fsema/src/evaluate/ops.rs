//! Intrinsic operators and three-valued logic

use std::fmt;

/// Relational operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationalOperator {
    Lt,
    Le,
    Eq,
    Ne,
    Ge,
    Gt,
}

impl RelationalOperator {
    pub const ALL: [RelationalOperator; 6] = [
        RelationalOperator::Lt,
        RelationalOperator::Le,
        RelationalOperator::Eq,
        RelationalOperator::Ne,
        RelationalOperator::Ge,
        RelationalOperator::Gt,
    ];

    /// `==` and `/=` are defined for complex operands, the orderings are not
    pub fn is_equality(self) -> bool {
        matches!(self, RelationalOperator::Eq | RelationalOperator::Ne)
    }

    pub fn as_symbol(self) -> &'static str {
        match self {
            RelationalOperator::Lt => "<",
            RelationalOperator::Le => "<=",
            RelationalOperator::Eq => "==",
            RelationalOperator::Ne => "/=",
            RelationalOperator::Ge => ">=",
            RelationalOperator::Gt => ">",
        }
    }

    pub fn as_dotted(self) -> &'static str {
        match self {
            RelationalOperator::Lt => ".lt.",
            RelationalOperator::Le => ".le.",
            RelationalOperator::Eq => ".eq.",
            RelationalOperator::Ne => ".ne.",
            RelationalOperator::Ge => ".ge.",
            RelationalOperator::Gt => ".gt.",
        }
    }

    /// Parse either spelling
    pub fn from_source(text: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_symbol() == text || op.as_dotted() == text)
    }
}

impl fmt::Display for RelationalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_symbol())
    }
}

/// Logical operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOperator {
    And,
    Or,
    Eqv,
    Neqv,
    Not,
}

impl LogicalOperator {
    pub const ALL: [LogicalOperator; 5] = [
        LogicalOperator::And,
        LogicalOperator::Or,
        LogicalOperator::Eqv,
        LogicalOperator::Neqv,
        LogicalOperator::Not,
    ];

    pub fn as_dotted(self) -> &'static str {
        match self {
            LogicalOperator::And => ".and.",
            LogicalOperator::Or => ".or.",
            LogicalOperator::Eqv => ".eqv.",
            LogicalOperator::Neqv => ".neqv.",
            LogicalOperator::Not => ".not.",
        }
    }

    pub fn from_source(text: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_dotted() == text)
    }
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_dotted())
    }
}

/// Three-valued answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tristate {
    No,
    Maybe,
    Yes,
}

impl From<bool> for Tristate {
    fn from(value: bool) -> Self {
        if value { Tristate::Yes } else { Tristate::No }
    }
}

impl fmt::Display for Tristate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Tristate::No => "no",
            Tristate::Maybe => "maybe",
            Tristate::Yes => "yes",
        };
        f.write_str(s)
    }
}
