//! Adapters from typed Rust functions to the erased builtin signature.
//!
//! A host writes `fn hypot(a: f64, b: f64) -> f64` and registers it with
//! [`Environment::register_builtin_operation`](crate::Environment::register_builtin_operation);
//! the adapter checks the argument count, converts each argument, and turns
//! the return value back into a [`Value`].

use crate::Error;
use crate::ast::{NumberType, Value};
use std::rc::Rc;

/// Erased builtin function stored in `Value::Builtin`.
///
/// Builtins own their argument vector and may consume it.
pub type OperationFn = dyn Fn(Vec<Value>) -> Result<Value, Error>;

/// Borrowed view of an Egg array, or of the whole argument list of a
/// variadic builtin.
#[derive(Debug, Clone, Copy)]
pub struct Elements<'a>(&'a [Value]);

impl<'a> Elements<'a> {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&'a Value> {
        self.0.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'a, Value> {
        self.0.iter()
    }

    pub fn to_vec(&self) -> Vec<Value> {
        self.0.to_vec()
    }

    /// All elements as numbers; the first non-number is a `TypeError`
    pub fn numbers(&self) -> Result<Vec<NumberType>, Error> {
        self.iter()
            .map(|value| match value {
                Value::Number(n) => Ok(*n),
                other => Err(Error::TypeError(format!(
                    "expected array of numbers, found {}",
                    other.type_name()
                ))),
            })
            .collect()
    }
}

/// Conversion of one argument slot into a builtin parameter.
///
/// `Param<'a>` may borrow the slot (as [`Elements`] does) or take the value
/// out of it.
pub trait FromParam {
    type Param<'a>;

    fn from_arg<'a>(slot: &'a mut Value) -> Result<Self::Param<'a>, Error>;
}

impl FromParam for Value {
    type Param<'a> = Value;

    fn from_arg<'a>(slot: &'a mut Value) -> Result<Value, Error> {
        Ok(std::mem::replace(slot, Value::Bool(false)))
    }
}

// `f64`, `bool` and `String`, through the `TryInto` impls in `ast.rs`
impl<T> FromParam for T
where
    Value: TryInto<T, Error = Error>,
{
    type Param<'a> = T;

    fn from_arg<'a>(slot: &'a mut Value) -> Result<T, Error> {
        std::mem::replace(slot, Value::Bool(false)).try_into()
    }
}

impl<'b> FromParam for Elements<'b> {
    type Param<'a> = Elements<'a>;

    fn from_arg<'a>(slot: &'a mut Value) -> Result<Elements<'a>, Error> {
        match slot {
            Value::Array(items) => Ok(Elements(items.as_slice())),
            other => Err(Error::TypeError(format!(
                "expected array, got {}",
                other.type_name()
            ))),
        }
    }
}

/// Builtin return types: any `Into<Value>`, or a `Result` of one.
pub trait IntoValueResult {
    fn into_value_result(self) -> Result<Value, Error>;
}

impl<T: Into<Value>> IntoValueResult for Result<T, Error> {
    fn into_value_result(self) -> Result<Value, Error> {
        self.map(Into::into)
    }
}

impl<T: Into<Value>> IntoValueResult for T {
    fn into_value_result(self) -> Result<Value, Error> {
        Ok(self.into())
    }
}

/// A typed function of one or two parameters usable as a builtin. `Args`
/// is the tuple of parameter types, e.g. `(f64, f64)`.
pub trait IntoOperation<Args> {
    fn into_operation(self) -> Rc<OperationFn>;
}

impl<F, A, R> IntoOperation<(A,)> for F
where
    A: FromParam,
    F: for<'a> Fn(A::Param<'a>) -> R + 'static,
    R: IntoValueResult,
{
    fn into_operation(self) -> Rc<OperationFn> {
        Rc::new(move |mut args: Vec<Value>| {
            let got = args.len();
            match args.as_mut_slice() {
                [a] => (self)(A::from_arg(a)?).into_value_result(),
                _ => Err(Error::arity_error(1, got)),
            }
        })
    }
}

impl<F, A, B, R> IntoOperation<(A, B)> for F
where
    A: FromParam,
    B: FromParam,
    F: for<'a> Fn(A::Param<'a>, B::Param<'a>) -> R + 'static,
    R: IntoValueResult,
{
    fn into_operation(self) -> Rc<OperationFn> {
        Rc::new(move |mut args: Vec<Value>| {
            let got = args.len();
            match args.as_mut_slice() {
                [a, b] => {
                    let a = A::from_arg(a)?;
                    let b = B::from_arg(b)?;
                    (self)(a, b).into_value_result()
                }
                _ => Err(Error::arity_error(2, got)),
            }
        })
    }
}

/// A typed function receiving the whole argument list as [`Elements`].
pub trait IntoVariadicOperation {
    fn into_variadic_operation(self) -> Rc<OperationFn>;
}

impl<F, R> IntoVariadicOperation for F
where
    F: for<'a> Fn(Elements<'a>) -> R + 'static,
    R: IntoValueResult,
{
    fn into_variadic_operation(self) -> Rc<OperationFn> {
        Rc::new(move |args: Vec<Value>| (self)(Elements(&args)).into_value_result())
    }
}
