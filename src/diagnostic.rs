use std::fmt;

use crate::device::RestrictKind;
use crate::span::Span;

/// A compiler diagnostic.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub severity: Severity,
    pub category: Category,
    pub message: String,
    pub span: Span,
    pub notes: Vec<Note>,
    pub help: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Error,
}

/// What kind of fault a diagnostic reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Category {
    /// Non-standard-layout capture or rejected pointer address space.
    Layout,
    Restriction(RestrictKind),
    Recursion,
    AttributeConflict,
    /// A type that cannot be used in device code at all.
    DeviceType,
    Naming,
}

/// A secondary message, optionally anchored at its own location.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Note {
    pub message: String,
    pub span: Option<Span>,
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl Diagnostic {
    pub fn error(category: Category, message: String, span: Span) -> Self {
        Self {
            severity: Severity::Error,
            category,
            message,
            span,
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn with_note(mut self, note: String) -> Self {
        self.notes.push(Note {
            message: note,
            span: None,
        });
        self
    }

    /// Attach a note that points at a second location.
    pub fn with_note_at(mut self, note: String, span: Span) -> Self {
        self.notes.push(Note {
            message: note,
            span: (!span.is_dummy()).then_some(span),
        });
        self
    }

    pub fn with_help(mut self, help: String) -> Self {
        self.help = Some(help);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Render the diagnostic to stderr using ariadne.
    pub fn render(&self, filename: &str, source: &str) -> std::io::Result<()> {
        use ariadne::{Color, Label, Report, ReportKind, Source};

        let kind = match self.severity {
            Severity::Error => ReportKind::Error,
        };

        let color = match self.severity {
            Severity::Error => Color::Red,
        };

        let mut report = Report::build(kind, filename, self.span.start as usize)
            .with_message(&self.message)
            .with_label(
                Label::new((filename, self.span.start as usize..self.span.end as usize))
                    .with_message(&self.message)
                    .with_color(color),
            );

        for note in &self.notes {
            match note.span {
                Some(span) => {
                    report = report.with_label(
                        Label::new((filename, span.start as usize..span.end as usize))
                            .with_message(&note.message)
                            .with_color(Color::Blue),
                    );
                }
                None => report = report.with_note(&note.message),
            }
        }

        if let Some(help) = &self.help {
            report = report.with_help(help);
        }

        report.finish().eprint((filename, Source::from(source)))
    }
}

/// Render a list of diagnostics.
pub fn render_diagnostics(
    diagnostics: &[Diagnostic],
    filename: &str,
    source: &str,
) -> std::io::Result<()> {
    for diag in diagnostics {
        diag.render(filename, source)?;
    }
    Ok(())
}

/// True when any diagnostic in the list is an error.
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}
