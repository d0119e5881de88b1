use crate::api::{Diagnostic, Severity};
use crate::parser::{Rule, Span, syntax::line_col};

/// Parser error with position context.
///
/// A malformed script is a diagnostic for the submitter, not a system fault.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub source: String,
    pub span: Span,
    pub line: usize,
    pub column: usize,
}

/// Specific kinds of parse errors
#[derive(Debug, Clone, PartialEq)]
pub enum ParseErrorKind {
    /// Unexpected token
    UnexpectedToken { expected: String, found: String },
    /// Integer literal does not fit in 64 bits, or float is malformed
    InvalidNumber { text: String },
    /// `f(a=1, 2)`
    PositionalAfterKeyword,
    /// `f(a=1, a=2)`
    DuplicateKeyword { name: String },
    /// `a.b.c = 1`; only `parent.child = value` is supported
    NestedAttributeAssignment { target: String },
    /// Maximum nesting depth exceeded
    MaxDepthExceeded { max_depth: usize },
}

impl ParseError {
    /// Create a new ParseError, computing the line and column from the span.
    pub fn new(kind: ParseErrorKind, source: &str, span: Span) -> Self {
        let (line, column) = line_col(source, span.0.start);
        Self {
            kind,
            source: source.to_string(),
            span,
            line,
            column,
        }
    }

    /// Convert to a Diagnostic for API boundary
    pub fn to_diagnostic(&self) -> Diagnostic {
        let (message, code, help) = match &self.kind {
            ParseErrorKind::UnexpectedToken { expected, found } => (
                format!("Expected {}, found {}", expected, found),
                "P001",
                vec![],
            ),
            ParseErrorKind::InvalidNumber { text } => (
                format!("Invalid number literal '{}'", text),
                "P002",
                vec!["Integers must fit in 64 bits".to_string()],
            ),
            ParseErrorKind::PositionalAfterKeyword => (
                "Positional argument follows keyword argument".to_string(),
                "P003",
                vec!["Move positional arguments before keyword arguments".to_string()],
            ),
            ParseErrorKind::DuplicateKeyword { name } => (
                format!("Keyword argument '{}' repeated", name),
                "P004",
                vec![],
            ),
            ParseErrorKind::NestedAttributeAssignment { target } => (
                format!("Cannot assign to '{}'", target),
                "P005",
                vec!["Only single-level attribute assignment (a.b = ...) is supported".to_string()],
            ),
            ParseErrorKind::MaxDepthExceeded { max_depth } => (
                format!("Nesting depth exceeds maximum of {} levels", max_depth),
                "P006",
                vec!["Reduce nesting or split long expressions into several assignments".to_string()],
            ),
        };

        Diagnostic {
            severity: Severity::Error,
            message,
            span: self.span.clone(),
            help,
            code: Some(code.to_string()),
        }
    }
}

impl core::fmt::Display for ParseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let diagnostic = self.to_diagnostic();
        write!(
            f,
            "{}: {} at line {}, column {}",
            diagnostic.severity, diagnostic.message, self.line, self.column
        )?;

        if let Some(ref code) = diagnostic.code {
            write!(f, " [{}]", code)?;
        }

        for help_msg in &diagnostic.help {
            write!(f, "\nhelp: {}", help_msg)?;
        }

        Ok(())
    }
}

impl std::error::Error for ParseError {}

/// Convert Pest error to human-readable ParseError
pub fn convert_pest_error(err: pest::error::Error<Rule>, source: &str) -> ParseError {
    use pest::error::ErrorVariant;

    let span = match err.location {
        pest::error::InputLocation::Pos(pos) => Span(pos..pos),
        pest::error::InputLocation::Span((start, end)) => Span(start..end),
    };

    let kind = match err.variant {
        ErrorVariant::ParsingError {
            positives,
            negatives,
        } => {
            let expected = format_expected_rules(&positives);
            let found = if negatives.is_empty() {
                describe_input_at(source, span.0.start)
            } else {
                format_found_rules(&negatives)
            };
            ParseErrorKind::UnexpectedToken { expected, found }
        }
        ErrorVariant::CustomError { message } => ParseErrorKind::UnexpectedToken {
            expected: "valid syntax".to_string(),
            found: message,
        },
    };

    ParseError::new(kind, source, span)
}

/// Format expected rules in a human-readable way
fn format_expected_rules(rules: &[Rule]) -> String {
    let mut concepts: Vec<&str> = Vec::new();

    for rule in rules {
        let concept = match rule {
            Rule::integer | Rule::float | Rule::string => "literal",
            Rule::ident | Rule::var | Rule::attr | Rule::byindex | Rule::callee => "identifier",
            Rule::cmp_op | Rule::add_op | Rule::mul_op => "operator",
            Rule::compound => "block",
            Rule::kw_else => "'else'",
            Rule::kw_if => "'if'",
            Rule::EOI => "end of input",
            _ => "expression",
        };
        if !concepts.contains(&concept) {
            concepts.push(concept);
        }
    }

    match concepts.split_last() {
        None => "something else".to_string(),
        Some((only, [])) => only.to_string(),
        Some((last, rest)) => format!("{} or {}", rest.join(", "), last),
    }
}

/// Format found rules in a human-readable way
fn format_found_rules(rules: &[Rule]) -> String {
    match rules[0] {
        Rule::ident => "identifier".to_string(),
        Rule::integer => "integer".to_string(),
        Rule::float => "floating-point number".to_string(),
        Rule::string => "string".to_string(),
        Rule::keyword => "keyword".to_string(),
        Rule::EOI => "end of input".to_string(),
        other => format!("{:?}", other),
    }
}

/// Describe the text at the error position, e.g. `'}'` or "end of input".
fn describe_input_at(source: &str, offset: usize) -> String {
    match source.get(offset..).and_then(|rest| rest.chars().next()) {
        Some(c) => format!("'{}'", c),
        None => "end of input".to_string(),
    }
}
