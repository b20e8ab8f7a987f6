//! Located semantic messages
//!
//! Queries produce message *values*; collecting and rendering them is up to
//! the caller (see [`DiagnosticReporter`](super::DiagnosticReporter)).

use codespan_reporting::diagnostic::{Diagnostic, Label};
use std::fmt;

use super::Span;

/// How serious a message is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
    /// Portability concern (standard conformance, future semantics)
    Portability,
    /// Explanatory text, usually attached to another message
    Note,
}

impl Severity {
    pub fn is_fatal(self) -> bool {
        matches!(self, Severity::Error)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Portability => "portability",
            Severity::Note => "note",
        };
        f.write_str(s)
    }
}

/// Formatted message text that does not yet have a location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageText {
    pub severity: Severity,
    pub text: String,
}

impl MessageText {
    pub fn new(severity: Severity, text: impl Into<String>) -> Self {
        Self { severity, text: text.into() }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(Severity::Error, text)
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self::new(Severity::Warning, text)
    }

    pub fn portability(text: impl Into<String>) -> Self {
        Self::new(Severity::Portability, text)
    }

    pub fn note(text: impl Into<String>) -> Self {
        Self::new(Severity::Note, text)
    }
}

impl fmt::Display for MessageText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// A located message with optional attached notes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub at: Span,
    pub severity: Severity,
    pub text: String,
    pub attachments: Vec<Message>,
}

impl Message {
    pub fn new(at: Span, text: MessageText) -> Self {
        Self {
            at,
            severity: text.severity,
            text: text.text,
            attachments: Vec::new(),
        }
    }

    /// Attach a note at another location and return it so that it can
    /// receive attachments of its own.
    pub fn attach(&mut self, at: Span, text: MessageText) -> &mut Message {
        self.attachments.push(Message::new(at, text));
        let last = self.attachments.len() - 1;
        &mut self.attachments[last]
    }

    pub fn is_fatal(&self) -> bool {
        self.severity.is_fatal()
    }

    /// Convert to a codespan diagnostic; attachments become secondary labels.
    pub fn to_diagnostic(&self, file_id: usize) -> Diagnostic<usize> {
        let diagnostic = match self.severity {
            Severity::Error => Diagnostic::error(),
            Severity::Warning | Severity::Portability => Diagnostic::warning(),
            Severity::Note => Diagnostic::note(),
        };
        let mut labels = vec![Label::primary(file_id, self.at.range()).with_message(&self.text)];
        self.collect_labels(file_id, &mut labels);
        diagnostic.with_message(&self.text).with_labels(labels)
    }

    fn collect_labels(&self, file_id: usize, labels: &mut Vec<Label<usize>>) {
        for attachment in &self.attachments {
            labels.push(Label::secondary(file_id, attachment.at.range()).with_message(&attachment.text));
            attachment.collect_labels(file_id, labels);
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} [{}]", self.severity, self.text, self.at)
    }
}

/// Messages collected during analysis
#[derive(Debug, Default, Clone)]
pub struct Messages {
    list: Vec<Message>,
}

impl Messages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn say(&mut self, at: Span, text: MessageText) -> &mut Message {
        self.list.push(Message::new(at, text));
        let last = self.list.len() - 1;
        &mut self.list[last]
    }

    pub fn any_fatal_error(&self) -> bool {
        self.list.iter().any(Message::is_fatal)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.list.iter()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn take(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.list)
    }
}

impl<'a> IntoIterator for &'a Messages {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.list.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_attachments_become_secondary_labels() {
        let mut message = Message::new(Span::new(10, 20), MessageText::error("outer"));
        message
            .attach(Span::new(0, 5), MessageText::note("first"))
            .attach(Span::new(30, 35), MessageText::note("nested"));

        let diagnostic = message.to_diagnostic(0);
        assert_eq!(diagnostic.labels.len(), 3);
        assert_eq!(diagnostic.labels[2].message, "nested");
        assert_eq!(diagnostic.labels[2].range, 30..35);
    }

    #[test]
    fn test_only_errors_are_fatal() {
        let mut messages = Messages::new();
        messages.say(Span::default(), MessageText::portability("later"));
        assert!(!messages.any_fatal_error());
        messages.say(Span::default(), MessageText::error("now"));
        assert!(messages.any_fatal_error());
        assert_eq!(messages.len(), 2);
    }
}
