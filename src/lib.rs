//! Egg - a tiny expression language
//!
//! This crate implements a minimal programming language whose entire syntax is
//! three kinds of atoms and one kind of compound form, the call:
//!
//! ```text
//! do(define(total, 0),
//!    define(count, 1),
//!    while(<(count, 11),
//!          do(set(total, +(total, count)),
//!             set(count, +(count, 1)))),
//!    print(total))          # prints 55
//! ```
//!
//! Source text is turned into a [`Node`] tree by a recursive-descent parser and
//! executed by a tree-walking evaluator against a chain of lexical
//! [`Environment`]s. Functions built with `fun` close over the environment they
//! were defined in.
//!
//! ## Language summary
//!
//! - Atoms: `"strings"` (no escapes), digit-run numbers, and bare words
//! - Calls: `op(arg, arg, ...)`, chainable as `f(1)(2)`
//! - Comments: `#` to end of line
//! - Special forms: `if`, `while`, `do`, `define`, `set`, `fun`
//! - Only the boolean `false` is falsy
//!
//! Everything else (`true`, `false`, arithmetic, `print`, arrays) is an
//! ordinary binding installed by the host into the global environment; see
//! [`evaluator::create_global_env`].
//!
//! ## Modules
//!
//! - `parser`: source text to [`Node`]
//! - `ast`: the [`Node`] and [`Value`] data model
//! - `evaluator`: [`Environment`], evaluation and the special-form rules
//! - `builtinops`: special-form registry and the default global bindings
//! - `intooperation`: adapters turning typed Rust functions into builtins
//! - `json`: JSON interchange format for syntax trees

/// Default maximum nesting depth accepted by the parser.
pub const MAX_PARSE_DEPTH: usize = 256;

/// Categorizes the different kinds of syntax errors.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SyntaxErrorKind {
    /// No atom matches at the current position
    UnexpectedSyntax,
    /// Something other than `,` or `)` follows a call argument
    ExpectedSeparator,
    /// Input ended inside an argument list
    Incomplete,
    /// Extra input found after a complete top-level expression
    TrailingContent,
    /// Expression nesting exceeded the configured parse depth
    TooDeeplyNested,
    /// A special form was used with the wrong number or shape of arguments
    MalformedForm,
}

/// A structured error describing malformed source or a malformed special form.
#[derive(Debug, PartialEq, Clone, thiserror::Error)]
#[error("{message}{}{}", found_line(.found), context_line(.context))]
pub struct SyntaxError {
    pub kind: SyntaxErrorKind,
    pub message: String,
    /// Context snippet from the input showing where the error occurred (max 60 chars)
    pub context: Option<String>,
    /// The problematic character encountered, if identifiable
    pub found: Option<String>,
}

impl SyntaxError {
    pub fn new(
        kind: SyntaxErrorKind,
        message: impl Into<String>,
        context: Option<String>,
        found: Option<String>,
    ) -> Self {
        SyntaxError {
            kind,
            message: message.into(),
            context,
            found,
        }
    }

    /// Create a SyntaxError with a kind and message but no source context
    pub fn from_message(kind: SyntaxErrorKind, message: impl Into<String>) -> Self {
        Self::new(kind, message, None, None)
    }

    /// Create a SyntaxError pointing at `rest`, the unconsumed tail of `input`.
    ///
    /// The offending character is taken from the head of `rest`.
    pub fn at(kind: SyntaxErrorKind, message: impl Into<String>, input: &str, rest: &str) -> Self {
        const MAX_CONTEXT: usize = 60;

        let offset = input.len().saturating_sub(rest.len());
        let found = rest.chars().next().map(String::from);

        let context_start = input[..offset]
            .char_indices()
            .rev()
            .nth(19)
            .map_or(0, |(i, _)| i);

        let context_str: String = input[context_start..].chars().take(MAX_CONTEXT).collect();

        let mut display_context = String::new();
        if context_start > 0 {
            display_context.push_str("[...]");
        }
        display_context.push_str(&context_str);
        if context_start + context_str.len() < input.len() {
            display_context.push_str("[...]");
        }

        let display_context = display_context.replace('\n', "\\n").replace('\r', "");

        Self::new(kind, message, Some(display_context), found)
    }
}

fn found_line(found: &Option<String>) -> String {
    found
        .as_ref()
        .map(|found| format!("\nFound: {found:?}"))
        .unwrap_or_default()
}

fn context_line(context: &Option<String>) -> String {
    context
        .as_ref()
        .map(|context| format!("\nContext: {context}"))
        .unwrap_or_default()
}

/// Error types for the interpreter
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("SyntaxError: {0}")]
    Syntax(SyntaxError),
    #[error("Undefined binding: {0}")]
    UndefinedBinding(String),
    #[error("Applying a non-function: {0}")]
    NotCallable(String),
    #[error("WrongArity: expected {expected} arguments, got {got}")]
    WrongArity { expected: usize, got: usize },
    #[error("Type error: {0}")]
    TypeError(String),
    #[error("EvaluationError: {0}")]
    EvalError(String),
}

impl Error {
    pub fn arity_error(expected: usize, got: usize) -> Self {
        Error::WrongArity { expected, got }
    }

    /// Shorthand for a malformed special form
    pub fn malformed(message: impl Into<String>) -> Self {
        Error::Syntax(SyntaxError::from_message(
            SyntaxErrorKind::MalformedForm,
            message,
        ))
    }
}

impl From<SyntaxError> for Error {
    fn from(err: SyntaxError) -> Self {
        Error::Syntax(err)
    }
}

pub mod ast;
pub mod builtinops;
pub mod evaluator;
pub mod intooperation;
pub mod parser;

#[cfg(feature = "json")]
pub mod json;

pub use ast::{Literal, Node, Value};
pub use evaluator::{Environment, eval, run};
pub use parser::parse;
