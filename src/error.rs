use thiserror::Error;

use crate::{frontend::lexer::Span, middle::ty::StaticType};

/// Any failure that aborts the compilation of a unit. No output is produced for the unit.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error(transparent)]
    Lowering(#[from] LoweringError),
}

impl CompileError {
    pub fn span(&self) -> Option<Span> {
        match self {
            CompileError::Syntax(error) => Some(error.span),
            CompileError::Analysis(error) => Some(error.span()),
            CompileError::Lowering(error) => error.span(),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct SyntaxError {
    pub message: String,
    pub span: Span,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

/// A malformed scope reference found while classifying variables.
#[derive(Debug, Clone, Error)]
pub enum AnalysisError {
    #[error("cannot find `{name}` in this scope (in `{function}`)")]
    UnresolvedName {
        name: String,
        function: String,
        span: Span,
    },
    #[error("`{name}` is already declared in this scope (in `{function}`)")]
    DuplicateBinding {
        name: String,
        function: String,
        span: Span,
    },
    #[error("cannot assign to `{name}`, it is not mutable (in `{function}`)")]
    ImmutableAssignment {
        name: String,
        function: String,
        span: Span,
    },
}

impl AnalysisError {
    pub fn span(&self) -> Span {
        match self {
            AnalysisError::UnresolvedName { span, .. }
            | AnalysisError::DuplicateBinding { span, .. }
            | AnalysisError::ImmutableAssignment { span, .. } => *span,
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum LoweringError {
    #[error("no `main` function to compile")]
    MissingEntryPoint,
    #[error("top-level function `{name}` is not supported, only `main` is compiled")]
    UnsupportedItem { name: String, span: Span },
    #[error("`main` must not declare parameters")]
    EntryPointParameters { span: Span },
    #[error("cannot interpolate a value of type `{ty}` into a string (in `{function}`)")]
    UnsupportedInterpolation {
        ty: StaticType,
        function: String,
        span: Span,
    },
    #[error("`print` takes exactly one argument but {found} were supplied (in `{function}`)")]
    PrintArity {
        found: usize,
        function: String,
        span: Span,
    },
    #[error("`print` can only be called directly (in `{function}`)")]
    UnsupportedBuiltinUse { function: String, span: Span },
}

impl LoweringError {
    pub fn span(&self) -> Option<Span> {
        match self {
            LoweringError::MissingEntryPoint => None,
            LoweringError::UnsupportedItem { span, .. }
            | LoweringError::EntryPointParameters { span }
            | LoweringError::UnsupportedInterpolation { span, .. }
            | LoweringError::PrintArity { span, .. }
            | LoweringError::UnsupportedBuiltinUse { span, .. } => Some(*span),
        }
    }
}
