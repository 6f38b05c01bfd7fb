use std::rc::Rc;

use indexmap::IndexMap;

use crate::ast::Value;
use crate::builtinops::Arity;
use crate::{Error, MAX_EVAL_DEPTH};

/// Environment for variable bindings.
///
/// Bindings keep their insertion order. A parent is only attached while a
/// closure body runs: the caller's environment is moved in for the duration
/// of the call and handed back afterwards (see [`Environment::call_with_parent`]),
/// so an environment stored inside a closure value never has one.
///
/// The environment also counts how deeply evaluation is nested beneath it,
/// carried over from the caller while a closure body runs.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    bindings: IndexMap<String, Value>,
    parent: Option<Box<Environment>>,
    depth: usize,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            bindings: IndexMap::new(),
            parent: None,
            depth: 0,
        }
    }

    /// Current evaluation nesting depth
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Run `f` one evaluation level deeper, refusing past [`MAX_EVAL_DEPTH`]
    pub(crate) fn nested<R>(&mut self, f: impl FnOnce(&mut Environment) -> R) -> Result<R, Error> {
        if self.depth >= MAX_EVAL_DEPTH {
            return Err(Error::RecursionLimit(MAX_EVAL_DEPTH));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        Ok(result)
    }

    /// Look a name up here, then in each ancestor. The result is a copy;
    /// changing it never affects the stored binding.
    pub fn get(&self, name: &str) -> Result<Value, Error> {
        let mut env = self;
        loop {
            if let Some(value) = env.bindings.get(name) {
                return Ok(value.clone());
            }
            match &env.parent {
                Some(parent) => env = parent,
                None => return Err(Error::UnboundSymbol(name.to_owned())),
            }
        }
    }

    /// Bind in this environment only, replacing an existing local binding in place.
    pub fn put(&mut self, name: &str, value: Value) {
        match self.bindings.get_mut(name) {
            Some(slot) => *slot = value,
            None => {
                self.bindings.insert(name.to_owned(), value);
            }
        }
    }

    /// Bind in the root environment, whatever the current depth.
    pub fn define(&mut self, name: &str, value: Value) {
        if let Some(parent) = self.parent.as_mut() {
            parent.define(name, value);
        } else {
            self.put(name, value);
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Local bindings in insertion order
    pub fn bindings(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.bindings.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Get all bindings visible from this environment.
    /// Returns (name, value) pairs sorted by name, inner bindings shadowing outer ones.
    pub fn all_bindings(&self) -> Vec<(String, Value)> {
        let mut visible: IndexMap<String, Value> = IndexMap::new();
        let mut env = Some(self);
        while let Some(current) = env {
            for (name, value) in &current.bindings {
                visible
                    .entry(name.clone())
                    .or_insert_with(|| value.clone());
            }
            env = current.parent.as_deref();
        }

        let mut result: Vec<_> = visible.into_iter().collect();
        result.sort_by(|a, b| a.0.cmp(&b.0));
        result
    }

    /// Register a native operation under `name`.
    ///
    /// The arity is checked before `func` runs, so implementations can index
    /// their fixed arguments directly. Type checks are up to `func`.
    ///
    /// # Example
    /// ```
    /// use quipu::builtinops::Arity;
    /// use quipu::{Error, Interpreter, Value};
    ///
    /// let mut interp = Interpreter::new();
    /// interp.environment_mut().register_builtin("double", Arity::Exact(1), |_env, args| {
    ///     match args.as_slice() {
    ///         [Value::Number(n)] => Ok(Value::Number(n * 2)),
    ///         _ => Err(Error::UserError("double wants a number".into())),
    ///     }
    /// });
    /// assert_eq!(interp.eval_source("<doc>", "(double 21)"), Ok(Value::Number(42)));
    /// ```
    pub fn register_builtin<F>(&mut self, name: &'static str, arity: Arity, func: F)
    where
        F: Fn(&mut Environment, Vec<Value>) -> Result<Value, Error> + 'static,
    {
        let wrapped = move |env: &mut Environment, args: Vec<Value>| {
            arity.validate(name, args.len())?;
            func(env, args)
        };

        self.put(
            name,
            Value::Builtin {
                name: name.to_owned(),
                func: Rc::new(wrapped),
            },
        );
    }

    /// Run `f` with `caller` attached as this environment's parent.
    ///
    /// The caller is moved into the parent slot and restored when `f`
    /// returns, so `define` from inside `f` reaches the caller's root.
    /// The caller's evaluation depth carries over.
    pub(crate) fn call_with_parent<R>(
        &mut self,
        caller: &mut Environment,
        f: impl FnOnce(&mut Environment) -> R,
    ) -> R {
        self.depth = caller.depth;
        self.parent = Some(Box::new(std::mem::take(caller)));
        let result = f(self);
        if let Some(parent) = self.parent.take() {
            *caller = *parent;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{qexpr, val};

    #[test]
    fn test_put_replaces_in_place() {
        let mut env = Environment::new();
        env.put("a", val(1));
        env.put("b", val(2));
        env.put("a", val(3));

        let names: Vec<&str> = env.bindings().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(env.get("a"), Ok(val(3)));
    }

    #[test]
    fn test_get_walks_parents_and_reports_unbound() {
        let mut root = Environment::new();
        root.put("x", val(1));
        let mut child = Environment::new();
        child.put("y", val(2));

        child.call_with_parent(&mut root, |env| {
            assert_eq!(env.get("x"), Ok(val(1)));
            assert_eq!(env.get("y"), Ok(val(2)));
            assert_eq!(env.get("z"), Err(Error::UnboundSymbol("z".into())));
            assert!(!env.is_root());
        });

        assert!(child.is_root());
        assert_eq!(child.get("x"), Err(Error::UnboundSymbol("x".into())));
        assert_eq!(root.get("x"), Ok(val(1)));
    }

    #[test]
    fn test_put_never_touches_ancestors() {
        let mut root = Environment::new();
        root.put("x", val(1));
        let mut child = Environment::new();

        child.call_with_parent(&mut root, |env| {
            env.put("x", val(2));
            assert_eq!(env.get("x"), Ok(val(2)));
        });

        assert_eq!(root.get("x"), Ok(val(1)));
        assert_eq!(child.get("x"), Ok(val(2)));
    }

    #[test]
    fn test_define_targets_root() {
        let mut root = Environment::new();
        let mut middle = Environment::new();
        let mut inner = Environment::new();

        middle.call_with_parent(&mut root, |middle| {
            inner.call_with_parent(middle, |inner| {
                inner.define("g", val(7));
            });
        });

        assert_eq!(root.get("g"), Ok(val(7)));
        assert!(middle.bindings().next().is_none());
        assert!(inner.bindings().next().is_none());
    }

    #[test]
    fn test_lookup_returns_independent_copy() {
        let mut env = Environment::new();
        env.put("xs", qexpr([1, 2, 3]));

        let mut copy = env.get("xs");
        if let Ok(Value::Qexpr(cells)) = &mut copy {
            cells.clear();
        }

        assert_eq!(env.get("xs"), Ok(qexpr([1, 2, 3])));
    }

    #[test]
    fn test_nested_depth_limit_and_carry_over() {
        let mut root = Environment::new();

        let inner_depth = root.nested(|env| env.nested(|env| env.depth()));
        assert_eq!(inner_depth, Ok(Ok(2)));
        assert_eq!(root.depth(), 0);

        let mut closure = Environment::new();
        let carried = root.nested(|root| closure.call_with_parent(root, |env| env.depth()));
        assert_eq!(carried, Ok(1));

        fn descend(env: &mut Environment) -> Result<usize, Error> {
            env.nested(descend).and_then(|r| r)
        }
        assert_eq!(descend(&mut root), Err(Error::RecursionLimit(MAX_EVAL_DEPTH)));
        assert_eq!(root.depth(), 0);
    }

    #[test]
    fn test_all_bindings_shadowing_and_order() {
        let mut root = Environment::new();
        root.put("b", val(1));
        root.put("a", val(1));
        let mut child = Environment::new();
        child.put("b", val(2));

        child.call_with_parent(&mut root, |env| {
            let all = env.all_bindings();
            assert_eq!(
                all,
                vec![("a".to_owned(), val(1)), ("b".to_owned(), val(2))]
            );
        });
    }
}
