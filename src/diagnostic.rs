use crate::span::Span;

/// A compiler diagnostic. Every error in the pipeline is one of these;
/// the first diagnostic aborts the run.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub span: Option<Span>,
    pub notes: Vec<String>,
}

/// Which stage produced the diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// Illegal character, unterminated string.
    Lexical,
    /// Current token outside the predicted set at a final parser state.
    Syntax,
    /// Grammar/lexer mismatch or unbound action tag. A configuration
    /// bug in the compiler itself, not a user error.
    InternalGrammar,
    /// Undeclared names, redeclarations, type and arity mismatches.
    Semantic,
    /// The IR verifier rejected a function, or object emission failed.
    Backend,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::Lexical => "lexical error",
            DiagnosticKind::Syntax => "syntax error",
            DiagnosticKind::InternalGrammar => "internal grammar error",
            DiagnosticKind::Semantic => "semantic error",
            DiagnosticKind::Backend => "backend error",
        }
    }
}

impl Diagnostic {
    pub fn lexical(message: String, span: Span) -> Self {
        Self {
            kind: DiagnosticKind::Lexical,
            message,
            span: Some(span),
            notes: Vec::new(),
        }
    }

    pub fn syntax(message: String, span: Span) -> Self {
        Self {
            kind: DiagnosticKind::Syntax,
            message,
            span: Some(span),
            notes: Vec::new(),
        }
    }

    pub fn internal(message: String) -> Self {
        Self {
            kind: DiagnosticKind::InternalGrammar,
            message,
            span: None,
            notes: Vec::new(),
        }
    }

    pub fn semantic(message: String) -> Self {
        Self {
            kind: DiagnosticKind::Semantic,
            message,
            span: None,
            notes: Vec::new(),
        }
    }

    pub fn backend(message: String) -> Self {
        Self {
            kind: DiagnosticKind::Backend,
            message,
            span: None,
            notes: Vec::new(),
        }
    }

    pub fn with_note(mut self, note: String) -> Self {
        self.notes.push(note);
        self
    }

    /// Render the diagnostic to stderr. Spanned diagnostics go through
    /// ariadne; spanless ones fall back to a plain line.
    pub fn render(&self, filename: &str, source: &str) {
        use ariadne::{Color, Label, Report, ReportKind, Source};

        let Some(span) = self.span else {
            eprintln!("{}: {}", self.kind.as_str(), self.message);
            for note in &self.notes {
                eprintln!("  note: {}", note);
            }
            return;
        };

        let mut report = Report::build(ReportKind::Error, filename, span.start as usize)
            .with_message(&self.message)
            .with_label(
                Label::new((filename, span.start as usize..span.end as usize))
                    .with_message(self.kind.as_str())
                    .with_color(Color::Red),
            );

        for note in &self.notes {
            report = report.with_note(note);
        }

        let _ = report.finish().eprint((filename, Source::from(source)));
    }
}
