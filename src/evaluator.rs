use crate::Error;
use crate::ast::{Closure, Node, Value};
use crate::builtinops::{Arity, find_special_form, install_prelude};
use crate::intooperation::{IntoOperation, IntoVariadicOperation, OperationFn};
use crate::parser::parse;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, trace};

#[derive(Default)]
struct Scope {
    bindings: HashMap<String, Value>,
    parent: Option<Environment>,
}

/// Environment for variable bindings
///
/// An `Environment` is a shared handle: cloning it yields another handle to
/// the same scope, which is how closures capture their defining scope by
/// reference. A scope never modifies its parent through `define`; only
/// [`Environment::set`] writes into an ancestor.
///
/// A closure stored in the scope it captured forms a reference cycle, so
/// such scopes live until the process exits.
#[derive(Clone, Default)]
pub struct Environment(Rc<RefCell<Scope>>);

impl Environment {
    /// Create a root environment with no parent
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty child scope of `parent`
    pub fn with_parent(parent: &Environment) -> Self {
        Environment(Rc::new(RefCell::new(Scope {
            bindings: HashMap::new(),
            parent: Some(parent.clone()),
        })))
    }

    pub fn parent(&self) -> Option<Environment> {
        self.0.borrow().parent.clone()
    }

    /// Bind `name` in this scope, shadowing any binding in an ancestor
    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.0.borrow_mut().bindings.insert(name.into(), value);
    }

    /// Look `name` up in this scope, then in each ancestor in turn
    pub fn get(&self, name: &str) -> Option<Value> {
        let mut current = self.clone();
        loop {
            let next = {
                let scope = current.0.borrow();
                if let Some(value) = scope.bindings.get(name) {
                    return Some(value.clone());
                }
                scope.parent.clone()
            };
            current = next?;
        }
    }

    /// Whether this scope itself (not an ancestor) binds `name`
    pub fn owns(&self, name: &str) -> bool {
        self.0.borrow().bindings.contains_key(name)
    }

    /// Replace the value of the nearest existing binding of `name`.
    ///
    /// Never creates a binding: if no scope in the chain owns `name` the
    /// result is `UndefinedBinding`.
    pub fn set(&self, name: &str, value: Value) -> Result<(), Error> {
        let mut current = self.clone();
        loop {
            let next = {
                let mut scope = current.0.borrow_mut();
                if let Some(slot) = scope.bindings.get_mut(name) {
                    *slot = value;
                    return Ok(());
                }
                scope.parent.clone()
            };
            match next {
                Some(parent) => current = parent,
                None => return Err(Error::UndefinedBinding(name.to_owned())),
            }
        }
    }

    /// Whether two handles refer to the same scope
    pub fn ptr_eq(&self, other: &Environment) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Register a builtin that works directly on the argument slice.
    ///
    /// # Example
    /// ```
    /// use egglang::evaluator::{create_global_env, run};
    /// use egglang::{Error, Value};
    ///
    /// fn count(args: &[Value]) -> Result<Value, Error> {
    ///     Ok(Value::from(args.len()))
    /// }
    ///
    /// let env = create_global_env();
    /// env.register_builtin_function("count", count);
    /// assert_eq!(run("count(1, 2, 3)", &env), Ok(Value::from(3)));
    /// ```
    pub fn register_builtin_function(&self, name: &str, func: fn(&[Value]) -> Result<Value, Error>) {
        let wrapped: Rc<OperationFn> = Rc::new(move |args: Vec<Value>| func(&args));
        self.define_builtin(name, wrapped);
    }

    /// Register a strongly-typed Rust function or closure as a builtin.
    ///
    /// ```rust,ignore
    /// fn hypot(a: f64, b: f64) -> f64 { (a * a + b * b).sqrt() }
    /// env.register_builtin_operation::<_, (f64, f64)>("hypot", hypot);
    /// ```
    ///
    /// Functions of one or two parameters are supported. Parameter types:
    /// `f64`, `bool`, `String`, `Value`, and
    /// [`Elements`](crate::intooperation::Elements) for an array.
    /// The return type may be anything convertible into a [`Value`], or a
    /// `Result<T, Error>` of such a type. Arity is enforced automatically and
    /// argument conversion failures become `TypeError`.
    pub fn register_builtin_operation<F, Args>(&self, name: &str, func: F)
    where
        F: IntoOperation<Args> + 'static,
    {
        self.define_builtin(name, func.into_operation());
    }

    /// Register a builtin that receives all of its arguments as one
    /// [`Elements`](crate::intooperation::Elements) view. `arity` bounds the
    /// argument count.
    pub fn register_variadic_builtin_operation<F>(&self, name: &str, arity: Arity, func: F)
    where
        F: IntoVariadicOperation + 'static,
    {
        let inner = func.into_variadic_operation();
        let wrapped: Rc<OperationFn> = Rc::new(move |args: Vec<Value>| {
            arity.validate(args.len())?;
            inner(args)
        });
        self.define_builtin(name, wrapped);
    }

    fn define_builtin(&self, name: &str, func: Rc<OperationFn>) {
        self.define(
            name,
            Value::Builtin {
                id: name.to_owned(),
                func,
            },
        );
    }

    /// Get all bindings visible from this environment, innermost winning.
    /// Returns a Vec of (name, value) pairs sorted by name
    pub fn get_all_bindings(&self) -> Vec<(String, Value)> {
        let mut bindings = match self.parent() {
            Some(parent) => parent.get_all_bindings().into_iter().collect(),
            None => HashMap::new(),
        };

        for (name, value) in &self.0.borrow().bindings {
            bindings.insert(name.clone(), value.clone());
        }

        let mut result: Vec<_> = bindings.into_iter().collect();
        result.sort_by(|a, b| a.0.cmp(&b.0));
        result
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scope = self.0.borrow();
        let mut names: Vec<&String> = scope.bindings.keys().collect();
        names.sort();
        f.debug_struct("Environment")
            .field("bindings", &names)
            .field("has_parent", &scope.parent.is_some())
            .finish()
    }
}

/// Evaluate a syntax tree in `env`
///
/// There is no depth guard: a program that recurses without bound exhausts
/// the host stack.
pub fn eval(node: &Node, env: &Environment) -> Result<Value, Error> {
    match node {
        Node::Literal(literal) => Ok(Value::from(literal)),

        Node::Word(name) => env
            .get(name)
            .ok_or_else(|| Error::UndefinedBinding(name.clone())),

        Node::Apply { operator, args } => {
            // Special forms get their argument nodes unevaluated, and the
            // operator word is never looked up as a variable.
            if let Some(form) = operator.as_word().and_then(find_special_form) {
                return form.apply(args, env);
            }

            let func = eval(operator, env)?;
            let args = eval_args(args, env)?;
            apply_function(&func, args)
        }
    }
}

/// Evaluate argument nodes left to right
fn eval_args(args: &[Node], env: &Environment) -> Result<Vec<Value>, Error> {
    args.iter().map(|arg| eval(arg, env)).collect()
}

/// Call a function value with already-evaluated arguments
pub fn apply_function(func: &Value, args: Vec<Value>) -> Result<Value, Error> {
    match func {
        Value::Builtin { id, func } => {
            trace!(builtin = %id, argc = args.len(), "apply");
            func(args)
        }
        Value::Function(closure) => {
            if closure.params.len() != args.len() {
                return Err(Error::arity_error(closure.params.len(), args.len()));
            }
            trace!(params = ?closure.params, "apply");

            // The call scope hangs off the captured scope, not the caller's
            let local = Environment::with_parent(&closure.env);
            for (param, arg) in closure.params.iter().zip(args) {
                local.define(param.clone(), arg);
            }

            eval(&closure.body, &local)
        }
        other => Err(Error::NotCallable(format!(
            "{other} ({})",
            other.type_name()
        ))),
    }
}

/// Evaluate if special form
pub(crate) fn eval_if(args: &[Node], env: &Environment) -> Result<Value, Error> {
    match args {
        [condition, then_branch, else_branch] => {
            if eval(condition, env)?.is_false() {
                eval(else_branch, env)
            } else {
                eval(then_branch, env)
            }
        }
        _ => Err(Error::malformed("Wrong number of args to if")),
    }
}

/// Evaluate while special form
pub(crate) fn eval_while(args: &[Node], env: &Environment) -> Result<Value, Error> {
    let [condition, body] = args else {
        return Err(Error::malformed("Wrong number of args to while"));
    };

    while !eval(condition, env)?.is_false() {
        eval(body, env)?;
    }

    // The language has no "nothing" value
    Ok(Value::Bool(false))
}

/// Evaluate do special form
pub(crate) fn eval_do(args: &[Node], env: &Environment) -> Result<Value, Error> {
    let mut value = Value::Bool(false);
    for arg in args {
        value = eval(arg, env)?;
    }
    Ok(value)
}

/// Evaluate define special form
pub(crate) fn eval_define(args: &[Node], env: &Environment) -> Result<Value, Error> {
    match args {
        [Node::Word(name), value_expr] => {
            let value = eval(value_expr, env)?;
            trace!(%name, "define");
            env.define(name.clone(), value.clone());
            Ok(value)
        }
        _ => Err(Error::malformed("Incorrect use of define")),
    }
}

/// Evaluate set special form
pub(crate) fn eval_set(args: &[Node], env: &Environment) -> Result<Value, Error> {
    match args {
        [Node::Word(name), value_expr] => {
            let value = eval(value_expr, env)?;
            trace!(%name, "set");
            env.set(name, value.clone())?;
            Ok(value)
        }
        _ => Err(Error::malformed(
            "Set requires two arguments: a word and value",
        )),
    }
}

/// Evaluate fun special form
pub(crate) fn eval_fun(args: &[Node], env: &Environment) -> Result<Value, Error> {
    let Some((body, param_nodes)) = args.split_last() else {
        return Err(Error::malformed("Functions need a body"));
    };

    let params = param_nodes
        .iter()
        .map(|param| match param {
            Node::Word(name) => Ok(name.clone()),
            _ => Err(Error::malformed("Parameter names must be words")),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Value::Function(Rc::new(Closure {
        params,
        body: body.clone(),
        env: env.clone(),
    })))
}

/// Parse `program` and evaluate it in a fresh child scope of `global`
pub fn run(program: &str, global: &Environment) -> Result<Value, Error> {
    let node = parse(program)?;
    debug!(program = %node, "run");
    eval(&node, &Environment::with_parent(global))
}

/// Create a global environment with the default bindings; `print` writes to
/// standard output.
pub fn create_global_env() -> Environment {
    create_global_env_with_output(|value: &Value| println!("{value}"))
}

/// Create a global environment whose `print` hands each value to `sink`
pub fn create_global_env_with_output(sink: impl Fn(&Value) + 'static) -> Environment {
    let env = Environment::new();
    install_prelude(&env, Rc::new(sink));
    env
}
