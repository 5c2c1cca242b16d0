//! Special-form registry and the default global bindings.
//!
//! ## Special Forms vs Functions
//!
//! - **Special forms** (`if`, `while`, `do`, `define`, `set`, `fun`) receive
//!   their argument *nodes* and decide what to evaluate. They are looked up
//!   by name in [`SPECIAL_FORMS`] before any variable lookup, so they cannot
//!   be shadowed, passed around or redefined.
//! - **Functions** (`+`, `print`, `array`, ...) are ordinary values bound in
//!   the global environment. They receive evaluated arguments, can be stored
//!   in variables, and a program may shadow them with `define`.
//!
//! ## Error Handling
//!
//! The default functions do no coercion: `+(1, "a")` and `==(1, "1")` are
//! type errors rather than `"1a"` and `false`, and each operator takes
//! exactly two arguments.
//!
//! ## Adding New Operations
//!
//! Hosts add functions with [`Environment::register_builtin_operation`] and
//! friends after [`create_global_env`](crate::evaluator::create_global_env).
//! New special forms need an evaluation rule in `evaluator.rs` and an entry
//! in [`SPECIAL_FORMS`].

use crate::Error;
use crate::ast::{Node, NumberType, Value};
use crate::evaluator::{
    Environment, eval_define, eval_do, eval_fun, eval_if, eval_set, eval_while,
};
use crate::intooperation::Elements;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::LazyLock;

/// Accepted argument counts for a special form or variadic builtin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
    Any,
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exact(n) => count == n,
            Arity::AtLeast(n) => count >= n,
            Arity::Any => true,
        }
    }

    /// `WrongArity` carrying the smallest acceptable count when `count`
    /// is not accepted
    pub fn validate(self, count: usize) -> Result<(), Error> {
        if self.accepts(count) {
            return Ok(());
        }
        let expected = match self {
            Arity::Exact(n) | Arity::AtLeast(n) => n,
            Arity::Any => 0,
        };
        Err(Error::arity_error(expected, count))
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "{n}"),
            Arity::AtLeast(n) => write!(f, "at least {n}"),
            Arity::Any => write!(f, "any number of"),
        }
    }
}

/// Evaluation rule of a special form: unevaluated argument nodes plus the
/// environment of the call site.
pub type SpecialFormRule = fn(&[Node], &Environment) -> Result<Value, Error>;

/// Definition of a special form
#[derive(Clone, Copy)]
pub struct SpecialForm {
    pub name: &'static str,
    pub arity: Arity,
    /// Message of the `MalformedForm` error raised when the argument count
    /// is not accepted
    pub usage: &'static str,
    pub rule: SpecialFormRule,
}

impl fmt::Debug for SpecialForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpecialForm")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

impl SpecialForm {
    pub(crate) fn apply(&self, args: &[Node], env: &Environment) -> Result<Value, Error> {
        if !self.arity.accepts(args.len()) {
            return Err(Error::malformed(self.usage));
        }
        (self.rule)(args, env)
    }
}

/// All special forms, keyed by name.
///
/// Built once on first use and never modified afterwards.
pub static SPECIAL_FORMS: LazyLock<HashMap<&'static str, SpecialForm>> = LazyLock::new(|| {
    let forms = [
        SpecialForm {
            name: "if",
            arity: Arity::Exact(3),
            usage: "Wrong number of args to if",
            rule: eval_if,
        },
        SpecialForm {
            name: "while",
            arity: Arity::Exact(2),
            usage: "Wrong number of args to while",
            rule: eval_while,
        },
        SpecialForm {
            name: "do",
            arity: Arity::Any,
            usage: "",
            rule: eval_do,
        },
        SpecialForm {
            name: "define",
            arity: Arity::Exact(2),
            usage: "Incorrect use of define",
            rule: eval_define,
        },
        SpecialForm {
            name: "set",
            arity: Arity::Exact(2),
            usage: "Set requires two arguments: a word and value",
            rule: eval_set,
        },
        SpecialForm {
            name: "fun",
            arity: Arity::AtLeast(1),
            usage: "Functions need a body",
            rule: eval_fun,
        },
    ];

    forms.into_iter().map(|form| (form.name, form)).collect()
});

pub fn find_special_form(name: &str) -> Option<&'static SpecialForm> {
    SPECIAL_FORMS.get(name)
}

//
// Default Function Implementations
//

fn type_mismatch(op: &str, a: &Value, b: &Value) -> Error {
    Error::TypeError(format!(
        "{op} cannot combine {} and {}",
        a.type_name(),
        b.type_name()
    ))
}

fn builtin_add(a: Value, b: Value) -> Result<Value, Error> {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
        (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
        (a, b) => Err(type_mismatch("+", &a, &b)),
    }
}

fn builtin_sub(a: NumberType, b: NumberType) -> NumberType {
    a - b
}

fn builtin_mul(a: NumberType, b: NumberType) -> NumberType {
    a * b
}

// IEEE semantics: `/(1, 0)` is infinity, not an error
fn builtin_div(a: NumberType, b: NumberType) -> NumberType {
    a / b
}

// Macro to generate ordering comparisons over numbers or strings
macro_rules! ordering_comparison {
    ($name:ident, $op:tt) => {
        fn $name(a: Value, b: Value) -> Result<bool, Error> {
            match (&a, &b) {
                (Value::Number(x), Value::Number(y)) => Ok(x $op y),
                (Value::String(x), Value::String(y)) => Ok(x $op y),
                _ => Err(type_mismatch(stringify!($op), &a, &b)),
            }
        }
    };
}

ordering_comparison!(builtin_less, <);
ordering_comparison!(builtin_greater, >);

fn builtin_equal(a: Value, b: Value) -> Result<bool, Error> {
    if a.type_name() != b.type_name() {
        return Err(type_mismatch("==", &a, &b));
    }
    Ok(a == b)
}

fn builtin_array(items: Elements<'_>) -> Value {
    Value::array(items.to_vec())
}

fn builtin_length(items: Elements<'_>) -> usize {
    items.len()
}

fn builtin_element(items: Elements<'_>, index: NumberType) -> Result<Value, Error> {
    if index.fract() != 0.0 || index < 0.0 {
        return Err(Error::EvalError(format!(
            "element index must be a non-negative integer, got {index}"
        )));
    }

    items.get(index as usize).cloned().ok_or_else(|| {
        Error::EvalError(format!(
            "element index {index} out of range for array of length {}",
            items.len()
        ))
    })
}

/// Callback receiving every value passed to `print`
pub type OutputSink = Rc<dyn Fn(&Value)>;

/// Install `true`, `false` and the default functions into `env`
pub(crate) fn install_prelude(env: &Environment, sink: OutputSink) {
    env.define("true", Value::Bool(true));
    env.define("false", Value::Bool(false));

    env.register_builtin_operation::<_, (Value, Value)>("+", builtin_add);
    env.register_builtin_operation::<_, (NumberType, NumberType)>("-", builtin_sub);
    env.register_builtin_operation::<_, (NumberType, NumberType)>("*", builtin_mul);
    env.register_builtin_operation::<_, (NumberType, NumberType)>("/", builtin_div);
    env.register_builtin_operation::<_, (Value, Value)>("<", builtin_less);
    env.register_builtin_operation::<_, (Value, Value)>(">", builtin_greater);
    env.register_builtin_operation::<_, (Value, Value)>("==", builtin_equal);

    env.register_builtin_operation::<_, (Value,)>("print", move |value: Value| {
        sink(&value);
        value
    });

    env.register_variadic_builtin_operation("array", Arity::Any, builtin_array);
    env.register_builtin_operation::<_, (Elements<'static>,)>("length", builtin_length);
    env.register_builtin_operation::<_, (Elements<'static>, NumberType)>("element", builtin_element);
}
