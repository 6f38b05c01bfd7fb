//! This module defines the value model of the interpreter. The main enum,
//! [`Value`], covers every runtime datum: errors, numbers, booleans, symbols,
//! strings, native and user-defined functions, and the two list flavours
//! (evaluable s-expressions and quoted q-expressions). Values form a tree with
//! a single owner per node; `Clone` is a deep copy, including the environment
//! captured by a closure.
//!
//! Ergonomic helpers such as [`val`], [`sym`], [`sexpr`] and [`qexpr`] make it
//! easy to build values in code and tests. Equality follows the language's
//! `==`: structural, order-sensitive for lists, by registration for builtins.

use std::rc::Rc;

use crate::evaluator::Environment;
use crate::Error;

/// Type alias for number values in interpreter
pub type NumberType = i64;

/// Signature of a native operation: the caller's environment and the
/// already-evaluated argument list.
pub type NativeFn = dyn Fn(&mut Environment, Vec<Value>) -> Result<Value, Error>;

/// Core value type in interpreter
#[derive(Clone)]
pub enum Value {
    /// Evaluation failure; short-circuits any expression it appears in
    Error(Error),
    /// Numbers (integers only)
    Number(NumberType),
    /// Boolean values, never coerced from numbers implicitly
    Bool(bool),
    /// Symbols (identifiers), resolved against an environment
    Symbol(String),
    /// String literals
    String(String),
    /// Native functions. Two builtins are equal only when they come from the
    /// same registration.
    Builtin { name: String, func: Rc<NativeFn> },
    /// User-defined functions (formals, body, captured bindings)
    Lambda {
        formals: Vec<String>,
        body: Vec<Value>,
        env: Box<Environment>,
    },
    /// Evaluable list
    Sexpr(Vec<Value>),
    /// Quoted list, inert under evaluation
    Qexpr(Vec<Value>),
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Error(e) => write!(f, "Error({e:?})"),
            Value::Number(n) => write!(f, "Number({n})"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Symbol(s) => write!(f, "Symbol({s})"),
            Value::String(s) => write!(f, "String({s:?})"),
            Value::Builtin { name, .. } => write!(f, "Builtin({name})"),
            Value::Lambda { formals, body, .. } => {
                write!(f, "Lambda(formals={formals:?}, body={body:?})")
            }
            Value::Sexpr(cells) => write!(f, "Sexpr({cells:?})"),
            Value::Qexpr(cells) => write!(f, "Qexpr({cells:?})"),
        }
    }
}

impl Value {
    /// Empty s-expression, the "no value" result of `def`, `print` and friends
    pub fn unit() -> Self {
        Value::Sexpr(Vec::new())
    }

    /// Human-readable type name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Error(_) => "Error",
            Value::Number(_) => "Number",
            Value::Bool(_) => "Bool",
            Value::Symbol(_) => "Symbol",
            Value::String(_) => "String",
            Value::Builtin { .. } | Value::Lambda { .. } => "Function",
            Value::Sexpr(_) => "S-Expression",
            Value::Qexpr(_) => "Q-Expression",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }
}

impl From<Error> for Value {
    fn from(e: Error) -> Self {
        Value::Error(e)
    }
}

impl From<Result<Value, Error>> for Value {
    fn from(result: Result<Value, Error>) -> Self {
        result.unwrap_or_else(Value::Error)
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

macro_rules! impl_from_integer {
    ($int_type:ty) => {
        impl From<$int_type> for Value {
            fn from(n: $int_type) -> Self {
                Value::Number(NumberType::from(n))
            }
        }
    };
}

impl_from_integer!(i8);
impl_from_integer!(i16);
impl_from_integer!(i32);
impl_from_integer!(NumberType);
impl_from_integer!(u8);
impl_from_integer!(u16);
impl_from_integer!(u32);

/// Helper for creating symbols
pub fn sym<S: AsRef<str>>(name: S) -> Value {
    Value::Symbol(name.as_ref().to_owned())
}

/// Helper for creating values from Rust literals
pub fn val<T: Into<Value>>(value: T) -> Value {
    value.into()
}

/// Helper for creating s-expressions from anything convertible to values
pub fn sexpr<T: Into<Value>>(cells: impl IntoIterator<Item = T>) -> Value {
    Value::Sexpr(cells.into_iter().map(Into::into).collect())
}

/// Helper for creating q-expressions from anything convertible to values
pub fn qexpr<T: Into<Value>>(cells: impl IntoIterator<Item = T>) -> Value {
    Value::Qexpr(cells.into_iter().map(Into::into).collect())
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Error(a), Value::Error(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            // Same registration, not merely the same name
            (Value::Builtin { func: a, .. }, Value::Builtin { func: b, .. }) => Rc::ptr_eq(a, b),
            (
                Value::Lambda {
                    formals: formals1,
                    body: body1,
                    ..
                },
                Value::Lambda {
                    formals: formals2,
                    body: body2,
                    ..
                },
            ) => formals1 == formals2 && body1 == body2,
            // Slice equality walks corresponding pairs after checking the length
            (Value::Sexpr(a), Value::Sexpr(b)) | (Value::Qexpr(a), Value::Qexpr(b)) => a == b,
            _ => false,
        }
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::builtinops::Arity;

    fn lambda(formals: &[&str], body: Vec<Value>, env: Environment) -> Value {
        Value::Lambda {
            formals: formals.iter().map(|s| (*s).to_owned()).collect(),
            body,
            env: Box::new(env),
        }
    }

    #[test]
    fn test_list_equality_is_pairwise_and_ordered() {
        let test_cases = vec![
            (qexpr([1, 2, 3]), qexpr([1, 2, 3]), true),
            (qexpr([1, 2]), qexpr([2, 1]), false),
            (qexpr([1, 2, 3]), qexpr([1, 2, 4]), false),
            (qexpr([1, 9, 3]), qexpr([1, 2, 3]), false),
            (qexpr([1, 2]), qexpr([1, 2, 3]), false),
            (qexpr(Vec::<Value>::new()), qexpr(Vec::<Value>::new()), true),
            // Same contents, different list flavour
            (qexpr([1, 2]), sexpr([1, 2]), false),
            (
                qexpr([val(1), qexpr([val("a"), sym("b")])]),
                qexpr([val(1), qexpr([val("a"), sym("b")])]),
                true,
            ),
            (
                qexpr([val(1), qexpr([val("a"), sym("b")])]),
                qexpr([val(1), qexpr([val("a"), sym("c")])]),
                false,
            ),
        ];

        for (i, (left, right, expected)) in test_cases.into_iter().enumerate() {
            assert_eq!(left == right, expected, "case #{}: {left:?} vs {right:?}", i + 1);
        }
    }

    #[test]
    fn test_scalar_equality_never_crosses_types() {
        assert_eq!(val(1), val(1));
        assert_ne!(val(1), val(true));
        assert_ne!(val("x"), sym("x"));
        assert_eq!(val(Error::DivisionByZero), val(Error::DivisionByZero));
        assert_ne!(
            val(Error::UserError("a".into())),
            val(Error::UserError("b".into()))
        );
    }

    #[test]
    fn test_lambda_equality_ignores_environment() {
        let mut env = Environment::new();
        env.put("x", val(5));

        let plain = lambda(&["y"], vec![sym("+"), sym("x"), sym("y")], Environment::new());
        let captured = lambda(&["y"], vec![sym("+"), sym("x"), sym("y")], env);
        let other_body = lambda(&["y"], vec![sym("-"), sym("x"), sym("y")], Environment::new());

        assert_eq!(plain, captured);
        assert_ne!(plain, other_body);
    }

    #[test]
    fn test_builtin_equality_follows_registration() {
        let mut env = Environment::new();
        env.register_builtin("wrap", Arity::Any, |_env, args| Ok(Value::Qexpr(args)));
        let first = env.get("wrap").unwrap();

        // Re-registering the same name yields a different operation
        env.register_builtin("wrap", Arity::Any, |_env, args| Ok(Value::Qexpr(args)));
        let second = env.get("wrap").unwrap();

        assert_eq!(first, first.clone());
        assert_eq!(second, env.get("wrap").unwrap());
        assert_ne!(first, second);
    }

    #[test]
    fn test_clone_is_deep() {
        let mut env = Environment::new();
        env.put("x", qexpr([1, 2]));
        let original = lambda(&["y"], vec![sym("x")], env);

        let mut copy = original.clone();
        if let Value::Lambda { env, .. } = &mut copy {
            env.put("x", val(0));
        }

        match &original {
            Value::Lambda { env, .. } => assert_eq!(env.get("x"), Ok(qexpr([1, 2]))),
            other => panic!("expected lambda, got {other:?}"),
        }
    }

    #[test]
    fn test_type_names() {
        let test_cases = vec![
            (val(Error::DivisionByZero), "Error"),
            (val(3), "Number"),
            (val(false), "Bool"),
            (sym("x"), "Symbol"),
            (val("x"), "String"),
            (lambda(&[], vec![], Environment::new()), "Function"),
            (Value::unit(), "S-Expression"),
            (qexpr([1]), "Q-Expression"),
        ];

        for (value, expected) in test_cases {
            assert_eq!(value.type_name(), expected);
        }
    }
}
