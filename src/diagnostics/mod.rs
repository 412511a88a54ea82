use crate::span::Span;
use thiserror::Error;

/// Errors raised while building, compiling or evaluating function values.
///
/// Every variant carries its W3C error code in the message so that hosts and
/// tests can match on the rendered text as well as on the variant.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    #[error("[XPTY0004] {name}: {actual} argument(s) supplied, {expected} expected")]
    Arity { name: String, expected: usize, actual: usize, span: Span },

    #[error("[XPST0017] Unknown function: {name}#{arity}{}", .suggestion.as_ref().map(|s| format!("; did you mean '{s}'?")).unwrap_or_default())]
    Resolution { name: String, arity: usize, suggestion: Option<String>, span: Span },

    #[error("[{code}] {msg}")]
    Updating { code: &'static str, msg: String, span: Span },

    #[error("[XQST0034] Duplicate declaration of function {name}#{arity}")]
    Duplicate { name: String, arity: usize, span: Span },

    #[error("[XPST0008] Undeclared variable: ${name}")]
    UnknownVar { name: String, span: Span },

    #[error("[XPTY0004] {msg}")]
    Type { msg: String, span: Span },

    #[error("[{code}] {msg}")]
    Dynamic { code: &'static str, msg: String, span: Span },

    #[error("[FOER0000] {msg}")]
    User { msg: String, span: Span },

    #[error("Query was interrupted")]
    Cancelled,

    #[error("Stack overflow: more than {depth} nested function calls")]
    StackOverflow { depth: usize },

    #[error("Configuration error: {msg}")]
    Config { msg: String },
}

impl QueryError {
    pub fn arity(name: impl Into<String>, expected: usize, actual: usize, span: Span) -> Self {
        Self::Arity { name: name.into(), expected, actual, span }
    }

    pub fn resolution(name: impl Into<String>, arity: usize, suggestion: Option<String>, span: Span) -> Self {
        Self::Resolution { name: name.into(), arity, suggestion, span }
    }

    /// A non-updating function or expression performs updates.
    pub fn not_updating(msg: impl Into<String>, span: Span) -> Self {
        Self::Updating { code: "XUST0001", msg: msg.into(), span }
    }

    /// An updating function or call does not perform updates.
    pub fn updating_expected(msg: impl Into<String>, span: Span) -> Self {
        Self::Updating { code: "XUST0002", msg: msg.into(), span }
    }

    pub fn type_err(msg: impl Into<String>, span: Span) -> Self {
        Self::Type { msg: msg.into(), span }
    }

    pub fn dynamic(code: &'static str, msg: impl Into<String>, span: Span) -> Self {
        Self::Dynamic { code, msg: msg.into(), span }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config { msg: msg.into() }
    }

    /// The W3C (or engine) error code of this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Arity { .. } | Self::Type { .. } => "XPTY0004",
            Self::Resolution { .. } => "XPST0017",
            Self::Updating { code, .. } | Self::Dynamic { code, .. } => code,
            Self::Duplicate { .. } => "XQST0034",
            Self::UnknownVar { .. } => "XPST0008",
            Self::User { .. } => "FOER0000",
            Self::Cancelled => "BASX0003",
            Self::StackOverflow { .. } => "BASX0005",
            Self::Config { .. } => "BASX0001",
        }
    }

    /// Source position of the error, if it has one.
    pub fn span(&self) -> Option<Span> {
        match self {
            Self::Arity { span, .. }
            | Self::Resolution { span, .. }
            | Self::Updating { span, .. }
            | Self::Duplicate { span, .. }
            | Self::UnknownVar { span, .. }
            | Self::Type { span, .. }
            | Self::Dynamic { span, .. }
            | Self::User { span, .. } => Some(*span),
            Self::Cancelled | Self::StackOverflow { .. } | Self::Config { .. } => None,
        }
    }

    /// Errors that describe a property of the whole query, not of a single
    /// closure body. These are never turned into deferred errors.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Resolution { .. } | Self::Duplicate { .. } | Self::Updating { .. } | Self::Cancelled | Self::Config { .. }
        )
    }
}

fn build_report<'a>(err: &QueryError, color: bool) -> Option<ariadne::Report<'a, std::ops::Range<usize>>> {
    use ariadne::{Config, Label, Report, ReportKind};

    let span = err.span().filter(|s| !s.is_dummy())?;
    let kind = match err {
        QueryError::Arity { .. } => "arity error",
        QueryError::Resolution { .. } | QueryError::UnknownVar { .. } => "resolution error",
        QueryError::Updating { .. } => "updating error",
        QueryError::Duplicate { .. } => "declaration error",
        QueryError::Type { .. } => "type error",
        _ => "error",
    };
    let mut builder = Report::build(ReportKind::Error, (), span.start)
        .with_config(Config::default().with_color(color))
        .with_code(err.code())
        .with_message(kind)
        .with_label(Label::new(span.start..span.end).with_message(err.to_string()));
    if let QueryError::Resolution { suggestion: Some(s), .. } = err {
        builder = builder.with_help(format!("a function named '{s}' exists"));
    }
    Some(builder.finish())
}

/// Write the report for `err` to `out`. With a `filename`, the report is
/// preceded by a `--> file:line:col` header pointing at the error position.
pub fn write_error(
    out: &mut impl std::io::Write,
    source: &str,
    filename: Option<&str>,
    err: &QueryError,
    color: bool,
) -> std::io::Result<()> {
    use ariadne::Source;

    let Some(report) = build_report(err, color) else {
        return match filename {
            Some(name) => writeln!(out, "{name}: error: {err}"),
            None => writeln!(out, "error: {err}"),
        };
    };
    if let (Some(name), Some(span)) = (filename, err.span()) {
        let (line, col) = span.line_col(source);
        writeln!(out, "--> {name}:{line}:{col}")?;
    }
    report.write(Source::from(source), out)
}

/// Render a QueryError with ariadne for terminal output.
pub fn render_error(source: &str, filename: &str, err: &QueryError) {
    let mut stderr = std::io::stderr().lock();
    if write_error(&mut stderr, source, Some(filename), err, true).is_err() {
        eprintln!("error: {err}");
    }
}

/// Render a QueryError without colors into a string.
pub fn render_to_string(source: &str, err: &QueryError) -> String {
    let mut buf = Vec::new();
    if write_error(&mut buf, source, None, err, false).is_err() {
        return format!("error: {err}\n");
    }
    String::from_utf8_lossy(&buf).into_owned()
}
