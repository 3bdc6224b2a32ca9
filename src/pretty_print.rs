use crate::ParseError;
use ariadne::{Config, Label, Report, ReportKind, Source};
use std::io;
use std::ops::Range;

const SOURCE_ID: &str = "REPL";

impl ParseError {
    fn report(&self, config: Config) -> Report<'static, (&'static str, Range<usize>)> {
        let span = self.span();
        // Zero-width spans (end of input) still need a column to point at
        let range = span.start..span.end.max(span.start + 1);
        let note = match self {
            ParseError::UnexpectedToken { expected, .. } => format!("expected `{}` here", expected),
            ParseError::NoPrefixRule { .. } => "this token cannot start an expression".to_string(),
            ParseError::IllegalToken { .. } => {
                "this character is not part of the language".to_string()
            }
            ParseError::InvalidInteger { .. } => "does not fit in a 64-bit integer".to_string(),
            ParseError::InvalidAssignmentTarget { .. } => {
                "only identifiers can be assigned to".to_string()
            }
        };
        Report::build(ReportKind::Error, (SOURCE_ID, range.clone()))
            .with_config(config)
            .with_message(self.to_string())
            .with_label(Label::new((SOURCE_ID, range)).with_message(note))
            .finish()
    }

    /// Prints a labelled report pointing into `input` to stderr.
    pub fn pretty_print(&self, input: &str) -> io::Result<()> {
        self.report(Config::default())
            .eprint((SOURCE_ID, Source::from(input)))
    }

    /// Renders the report as plain text, without colors.
    pub fn render(&self, input: &str) -> String {
        let mut buffer = Vec::new();
        match self
            .report(Config::default().with_color(false))
            .write((SOURCE_ID, Source::from(input)), &mut buffer)
        {
            Ok(()) => String::from_utf8_lossy(&buffer).into_owned(),
            Err(_) => self.to_string(),
        }
    }
}
