//! This module defines the syntax tree produced by the parser ([`Node`]) and the
//! runtime values produced by the evaluator ([`Value`]). The two are kept apart:
//! a program is only ever a `Node`, and evaluation only ever yields a `Value`.
//! Ergonomic helper functions such as [`num`], [`string`], [`word`] and
//! [`apply`] build trees in code and tests. `Node` displays as canonical
//! source text, so `parse(&node.to_string())` gives the node back.

use std::fmt;
use std::rc::Rc;

use crate::Error;
use crate::evaluator::Environment;
use crate::intooperation::OperationFn;

/// Type alias for number values in the interpreter
pub type NumberType = f64;

/// A constant appearing literally in source text
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(NumberType),
    String(String),
}

/// Syntax tree node
///
/// `Apply` covers every compound form, including special forms: whether
/// `if(a, b, c)` is a call or a special form is decided by the evaluator.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// A string or number constant
    Literal(Literal),
    /// A reference to a binding by name
    Word(String),
    /// `operator(args...)`; the operator may itself be any node
    Apply { operator: Box<Node>, args: Vec<Node> },
}

impl Node {
    /// The name of this node if it is a word
    pub fn as_word(&self) -> Option<&str> {
        match self {
            Node::Word(name) => Some(name),
            _ => None,
        }
    }
}

/// Number literal node
pub fn num(n: impl Into<NumberType>) -> Node {
    Node::Literal(Literal::Number(n.into()))
}

/// String literal node
pub fn string<S: AsRef<str>>(s: S) -> Node {
    Node::Literal(Literal::String(s.as_ref().to_owned()))
}

/// Word (variable reference) node
pub fn word<S: AsRef<str>>(name: S) -> Node {
    Node::Word(name.as_ref().to_owned())
}

/// Application node
pub fn apply(operator: Node, args: Vec<Node>) -> Node {
    Node::Apply {
        operator: Box::new(operator),
        args,
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Number(n) => write!(f, "{n}"),
            Literal::String(s) => write!(f, "\"{s}\""),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Literal(literal) => write!(f, "{literal}"),
            Node::Word(name) => write!(f, "{name}"),
            Node::Apply { operator, args } => {
                write!(f, "{operator}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// A user-defined function: parameter names, body, and the environment that
/// was active when `fun` ran.
pub struct Closure {
    pub params: Vec<String>,
    pub body: Node,
    pub env: Environment,
}

/// Runtime value
#[derive(Clone)]
pub enum Value {
    Number(NumberType),
    String(String),
    Bool(bool),
    /// Arrays are immutable once built, so they are shared rather than copied
    Array(Rc<Vec<Value>>),
    /// Foreign function installed by the host
    /// Uses id string for equality comparison instead of function pointer
    Builtin { id: String, func: Rc<OperationFn> },
    /// Function created by `fun`
    Function(Rc<Closure>),
}

impl Value {
    /// Name of this value's type, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Bool(_) => "boolean",
            Value::Array(_) => "array",
            Value::Builtin { .. } | Value::Function(_) => "function",
        }
    }

    /// Only the boolean `false` is falsy; `0` and `""` are not.
    pub fn is_false(&self) -> bool {
        matches!(self, Value::Bool(false))
    }

    pub fn array(items: Vec<Value>) -> Value {
        Value::Array(Rc::new(items))
    }
}

impl From<&Literal> for Value {
    fn from(literal: &Literal) -> Self {
        match literal {
            Literal::Number(n) => Value::Number(*n),
            Literal::String(s) => Value::String(s.clone()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

macro_rules! impl_from_number {
    ($num_type:ty) => {
        impl From<$num_type> for Value {
            fn from(n: $num_type) -> Self {
                Value::Number(n as NumberType)
            }
        }
    };
}

impl_from_number!(i32);
impl_from_number!(i64);
impl_from_number!(u32);
impl_from_number!(usize);
impl_from_number!(NumberType);

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::array(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(arr: [T; N]) -> Self {
        Value::array(arr.into_iter().map(Into::into).collect())
    }
}

// Fallible conversions from `Value` back into primitive Rust types, used by the
// typed builtin adapters.

impl std::convert::TryInto<NumberType> for Value {
    type Error = Error;

    fn try_into(self) -> Result<NumberType, Error> {
        match self {
            Value::Number(n) => Ok(n),
            other => Err(Error::TypeError(format!(
                "expected number, got {}",
                other.type_name()
            ))),
        }
    }
}

impl std::convert::TryInto<bool> for Value {
    type Error = Error;

    fn try_into(self) -> Result<bool, Error> {
        match self {
            Value::Bool(b) => Ok(b),
            other => Err(Error::TypeError(format!(
                "expected boolean, got {}",
                other.type_name()
            ))),
        }
    }
}

impl std::convert::TryInto<String> for Value {
    type Error = Error;

    fn try_into(self) -> Result<String, Error> {
        match self {
            Value::String(s) => Ok(s),
            other => Err(Error::TypeError(format!(
                "expected string, got {}",
                other.type_name()
            ))),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "Number({n})"),
            Value::String(s) => write!(f, "String({s:?})"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Array(items) => f.debug_tuple("Array").field(&**items).finish(),
            Value::Builtin { id, .. } => write!(f, "Builtin({id})"),
            Value::Function(closure) => {
                write!(f, "Function(params={:?}, body={})", closure.params, closure.body)
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "{s}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match item {
                        Value::String(s) => write!(f, "\"{s}\"")?,
                        other => write!(f, "{other}")?,
                    }
                }
                write!(f, "]")
            }
            Value::Builtin { id, .. } => write!(f, "#<builtin:{id}>"),
            Value::Function(_) => write!(f, "#<function>"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Builtin { id: id1, .. }, Value::Builtin { id: id2, .. }) => id1 == id2,
            // Closures are only equal to themselves
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}
