//! Branches that leave a construct
//!
//! Some constructs (CRITICAL, CHANGE TEAM, DO CONCURRENT) may not be left
//! by a branch. [`LabelEnforce`] walks the body of such a construct and
//! reports every branch whose target label is not defined inside it.

use std::collections::HashSet;

use crate::common::{MessageText, Span};
use crate::parse_tree::{ActionStmt, ActualArg, Construct, ExecutableConstruct, Label};
use crate::semantics::SemanticsContext;

/// Checks the branch targets of a construct body against the labels
/// defined inside it
pub struct LabelEnforce<'c> {
    context: &'c mut SemanticsContext,
    labels: HashSet<Label>,
    construct_source: Span,
    construct: String,
    current_statement: Span,
}

impl<'c> LabelEnforce<'c> {
    pub fn new(
        context: &'c mut SemanticsContext,
        labels: HashSet<Label>,
        construct_source: Span,
        construct: impl Into<String>,
    ) -> Self {
        Self {
            context,
            labels,
            construct_source,
            construct: construct.into(),
            current_statement: construct_source,
        }
    }

    pub fn walk(&mut self, body: &[ExecutableConstruct]) {
        for item in body {
            match item {
                ExecutableConstruct::Action(statement) => {
                    self.current_statement = statement.source;
                    self.check_action(&statement.statement);
                }
                ExecutableConstruct::Construct(construct) => {
                    self.current_statement = construct.statement.source;
                    self.walk(&construct.body);
                }
            }
        }
    }

    fn check_action(&mut self, action: &ActionStmt) {
        match action {
            ActionStmt::Goto(label) => self.check_label_use(*label),
            ActionStmt::ComputedGoto(labels) | ActionStmt::AssignedGoto { labels, .. } => {
                for &label in labels {
                    self.check_label_use(label);
                }
            }
            ActionStmt::ArithmeticIf { labels, .. } => {
                for &label in labels {
                    self.check_label_use(label);
                }
            }
            ActionStmt::Assign { label, .. } => self.check_label_use(*label),
            ActionStmt::Call(call) => {
                for arg in &call.args {
                    if let ActualArg::AltReturn(label) = arg {
                        self.check_label_use(*label);
                    }
                }
            }
            ActionStmt::Io { err, end, eor } => {
                for label in [err, end, eor].into_iter().flatten() {
                    self.check_label_use(*label);
                }
            }
            ActionStmt::If { action, .. } => self.check_action(action),
            _ => {}
        }
    }

    fn check_label_use(&mut self, label: Label) {
        if self.labels.contains(&label) {
            return;
        }
        tracing::debug!(label, construct = %self.construct, "branch leaves construct");
        let construct = &self.construct;
        self.context
            .say(
                self.current_statement,
                MessageText::error(format!("Control flow escapes from {construct}")),
            )
            .attach(
                self.construct_source,
                MessageText::note(format!("Enclosing {construct} statement")),
            );
    }
}

/// Labels of the statements inside a construct body, nested ones included
pub fn collect_labels(body: &[ExecutableConstruct], labels: &mut HashSet<Label>) {
    for item in body {
        match item {
            ExecutableConstruct::Action(statement) => labels.extend(statement.label),
            ExecutableConstruct::Construct(construct) => {
                labels.extend(construct.statement.label);
                collect_labels(&construct.body, labels);
            }
        }
    }
}

/// Report every branch out of `construct`
pub fn check_construct(context: &mut SemanticsContext, construct: &Construct) {
    let mut labels = HashSet::new();
    collect_labels(&construct.body, &mut labels);
    LabelEnforce::new(context, labels, construct.statement.source, construct.kind.keyword()).walk(&construct.body);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Severity;
    use crate::parse_tree::{CallStmt, ConstructKind, Expr, Name, Statement};
    use crate::semantics::LanguageFeatures;
    use crate::symbols::SymbolTable;

    fn context() -> SemanticsContext {
        SemanticsContext::new(SymbolTable::new(), LanguageFeatures::default())
    }

    fn construct(kind: ConstructKind, body: Vec<ExecutableConstruct>) -> Construct {
        Construct {
            kind,
            name: None,
            statement: Statement::new(Span::new(0, 8), ()),
            body,
        }
    }

    fn labeled(source: Span, label: Label, stmt: ActionStmt) -> ExecutableConstruct {
        ExecutableConstruct::Action(Statement::labeled(source, label, stmt))
    }

    #[test]
    fn test_branch_out_of_critical() {
        let mut context = context();
        let critical = construct(
            ConstructKind::Critical,
            vec![
                labeled(Span::new(10, 20), 10, ActionStmt::Continue),
                ExecutableConstruct::action(Span::new(21, 30), ActionStmt::Goto(10)),
                ExecutableConstruct::action(Span::new(31, 40), ActionStmt::Goto(99)),
            ],
        );
        check_construct(&mut context, &critical);

        let messages: Vec<_> = context.messages().iter().collect();
        assert_eq!(messages.len(), 1);
        let message = messages[0];
        assert_eq!(message.severity, Severity::Error);
        assert_eq!(message.text, "Control flow escapes from CRITICAL");
        assert_eq!(message.at, Span::new(31, 40));
        assert_eq!(message.attachments.len(), 1);
        assert_eq!(message.attachments[0].text, "Enclosing CRITICAL statement");
        assert_eq!(message.attachments[0].at, Span::new(0, 8));
        assert_eq!(message.attachments[0].severity, Severity::Note);
    }

    #[test]
    fn test_every_branching_form_is_checked() {
        let mut context = context();
        let condition = Expr { source: Span::default(), typed_expr: None };
        let body = vec![
            labeled(Span::new(10, 11), 5, ActionStmt::Continue),
            ExecutableConstruct::action(Span::new(12, 13), ActionStmt::ComputedGoto(vec![5, 1])),
            ExecutableConstruct::action(
                Span::new(14, 15),
                ActionStmt::ArithmeticIf { expr: condition.clone(), labels: [5, 5, 2] },
            ),
            ExecutableConstruct::action(
                Span::new(16, 17),
                ActionStmt::Assign { label: 3, variable: Name::new(Span::default(), "ivar", None) },
            ),
            ExecutableConstruct::action(
                Span::new(18, 19),
                ActionStmt::Call(CallStmt {
                    procedure: Name::new(Span::default(), "sub", None),
                    args: vec![ActualArg::AltReturn(4), ActualArg::AltReturn(5)],
                }),
            ),
            ExecutableConstruct::action(Span::new(20, 21), ActionStmt::Io { err: Some(6), end: Some(5), eor: None }),
            ExecutableConstruct::action(
                Span::new(22, 23),
                ActionStmt::If { condition, action: Box::new(ActionStmt::Goto(7)) },
            ),
        ];
        check_construct(&mut context, &construct(ConstructKind::ChangeTeam, body));

        let locations: Vec<Span> = context.messages().iter().map(|message| message.at).collect();
        assert_eq!(
            locations,
            vec![Span::new(12, 13), Span::new(14, 15), Span::new(16, 17), Span::new(18, 19), Span::new(20, 21), Span::new(22, 23)]
        );
        assert!(context.messages().iter().all(|message| message.text == "Control flow escapes from CHANGE TEAM"));
    }

    #[test]
    fn test_labels_in_nested_constructs_are_inside() {
        let mut context = context();
        let inner = construct(
            ConstructKind::Do,
            vec![
                labeled(Span::new(10, 11), 20, ActionStmt::Continue),
                ExecutableConstruct::action(Span::new(12, 13), ActionStmt::Goto(30)),
            ],
        );
        let outer = construct(
            ConstructKind::Critical,
            vec![
                ExecutableConstruct::Construct(Box::new(inner)),
                labeled(Span::new(14, 15), 30, ActionStmt::Goto(20)),
            ],
        );
        check_construct(&mut context, &outer);
        assert!(context.messages().is_empty());
    }
}
