use std::error::Error as StdError;
use std::path::PathBuf;

use thiserror::Error;
use wiki::parser::ParseError;
use wiki::reference::ResolveError;

/// Failure to fetch a document from the store.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("document [{0}] does not exist")]
    NotFound(String),
    #[error("cannot read '{}'", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure to turn a document into a block tree.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to parse document [{reference}]: {}", join_messages(errors))]
    Parse {
        reference: String,
        errors: Vec<ParseError>,
    },
    #[error("Cannot find section [{section}] in document [{reference}]")]
    SectionNotFound { section: String, reference: String },
    #[error("no macro transformation is attached to the renderer")]
    TransformationUnavailable,
}

/// Why a document could not be displayed.
#[derive(Debug, Error)]
pub enum InclusionError {
    #[error("Failed to resolve reference [{reference}]")]
    Reference {
        reference: String,
        #[source]
        source: ResolveError,
    },
    #[error("Found recursive display of document [{0}]")]
    Recursion(String),
    #[error("Failed to load Document [{reference}]")]
    Load {
        reference: String,
        #[source]
        source: LoadError,
    },
    #[error("Current user [{user}] doesn't have view rights on document [{reference}]")]
    Permission { user: String, reference: String },
    #[error("{source}")]
    Render {
        #[source]
        source: RenderError,
    },
}

/// The single error type a macro reports to the transformation.
#[derive(Debug, Error)]
pub enum MacroExecutionError {
    #[error("{message}")]
    Inclusion {
        message: String,
        #[source]
        cause: InclusionError,
    },
    #[error("{0}")]
    InvalidParameters(String),
    #[error("Unknown macro [{0}]")]
    UnknownMacro(String),
}

impl MacroExecutionError {
    /// The inclusion failure behind this error, if any.
    pub fn inclusion(&self) -> Option<&InclusionError> {
        match self {
            MacroExecutionError::Inclusion { cause, .. } => Some(cause),
            _ => None,
        }
    }
}

impl From<InclusionError> for MacroExecutionError {
    fn from(cause: InclusionError) -> Self {
        MacroExecutionError::Inclusion {
            message: cause.to_string(),
            cause,
        }
    }
}

/// Render an error and its causes, one per line, skipping causes whose
/// message repeats the previous one.
pub fn error_chain(error: &dyn StdError) -> String {
    let mut lines = vec![error.to_string()];
    let mut current = error.source();
    while let Some(cause) = current {
        let message = cause.to_string();
        if lines.last() != Some(&message) {
            lines.push(format!("Caused by: {}", message));
        }
        current = cause.source();
    }
    lines.join("\n")
}

fn join_messages(errors: &[ParseError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}
