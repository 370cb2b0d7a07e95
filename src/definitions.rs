//! Named definitions and parameter environments.
//!
//! A [`DefinitionTable`] maps names to either a user function created by
//! `define` or a native operator (builtins and host-registered functions). It is
//! owned by a single evaluation run, seeded with the builtin library and only
//! ever grows: existing entries are never replaced.
//!
//! An [`Environment`] holds the positional parameter bindings of one user
//! function call. Environments are flat; a function body sees only its own
//! parameters.

use crate::Diagnostic;
use crate::ast::{Node, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Canonical signature of a native operator: evaluated arguments in, value out
pub type OperationFn = dyn Fn(Vec<Value>) -> Result<Value, Diagnostic> + Send + Sync;

/// What a name in the table refers to
#[derive(Clone)]
pub enum Definition {
    UserFunction {
        params: Vec<String>,
        body: Arc<Node>,
    },
    NativeOperator(Arc<OperationFn>),
}

impl std::fmt::Debug for Definition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Definition::UserFunction { params, body } => {
                write!(f, "UserFunction(params={params:?}, body={body})")
            }
            Definition::NativeOperator(_) => write!(f, "NativeOperator(<fn>)"),
        }
    }
}

/// Name to definition map for one evaluation run
#[derive(Debug, Clone, Default)]
pub struct DefinitionTable {
    definitions: HashMap<String, Definition>,
}

impl DefinitionTable {
    /// An empty table without builtins
    pub fn new() -> Self {
        DefinitionTable {
            definitions: HashMap::new(),
        }
    }

    /// A table seeded with the builtin operator library
    pub fn with_builtins() -> Self {
        let mut table = DefinitionTable::new();
        crate::builtinops::install(&mut table);
        table
    }

    pub fn get(&self, name: &str) -> Option<&Definition> {
        self.definitions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    /// Add a definition under a new name. Returns `false` and leaves the table
    /// unchanged if the name is already taken.
    pub fn define(&mut self, name: impl Into<String>, definition: Definition) -> bool {
        use std::collections::hash_map::Entry;
        match self.definitions.entry(name.into()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(definition);
                true
            }
        }
    }

    /// Register a native operator under a new name, see [`DefinitionTable::define`]
    pub fn register_native(&mut self, name: impl Into<String>, func: Arc<OperationFn>) -> bool {
        self.define(name, Definition::NativeOperator(func))
    }

    /// All defined names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.definitions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// Parameter bindings for a single user function call
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Environment {
    bindings: HashMap<String, Value>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            bindings: HashMap::new(),
        }
    }

    /// Bind parameters to arguments by position
    pub(crate) fn bind(params: &[String], args: Vec<Value>) -> Self {
        let mut env = Environment::new();
        for (param, arg) in params.iter().zip(args) {
            env.define(param.clone(), arg);
        }
        env
    }

    /// Bind a name, shadowing an earlier binding of the same name
    pub fn define(&mut self, name: String, value: Value) {
        self.bindings.insert(name, value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::ast::val;
    use crate::token::{Token, TokenKind};

    fn body(text: &str) -> Arc<Node> {
        Arc::new(Node::Leaf(Token::new(TokenKind::Number, text, 1)))
    }

    #[test]
    fn test_define_never_overwrites() {
        let mut table = DefinitionTable::new();
        assert!(table.is_empty());

        let first = Definition::UserFunction {
            params: vec![],
            body: body("1"),
        };
        let second = Definition::UserFunction {
            params: vec!["x".into()],
            body: body("2"),
        };

        assert!(table.define("a", first));
        assert!(!table.define("a", second));
        assert_eq!(table.len(), 1);

        match table.get("a").unwrap() {
            Definition::UserFunction { params, body } => {
                assert!(params.is_empty());
                assert_eq!(body.to_string(), "1");
            }
            Definition::NativeOperator(_) => panic!("expected user function"),
        }
    }

    #[test]
    fn test_builtins_seeded() {
        let table = DefinitionTable::with_builtins();
        for name in ["+", "add", "<", "smaller", "!", "not", "zero", "square", "print"] {
            assert!(
                matches!(table.get(name), Some(Definition::NativeOperator(_))),
                "missing builtin {name}"
            );
        }
        assert!(!table.contains("define"));
        assert!(!table.contains("if"));
    }

    #[test]
    fn test_register_native_respects_existing_names() {
        let mut table = DefinitionTable::with_builtins();
        let answer: Arc<OperationFn> = Arc::new(|_args| Ok(val(42)));

        assert!(!table.register_native("+", answer.clone()));
        assert!(table.register_native("answer", answer));

        let Some(Definition::NativeOperator(func)) = table.get("answer") else {
            panic!("expected native operator");
        };
        assert_eq!(func(vec![]).unwrap(), val(42));
        assert!(table.names().contains(&"answer"));
    }

    #[test]
    fn test_environment_binds_by_position() {
        let params = vec!["a".to_owned(), "b".to_owned()];
        let env = Environment::bind(&params, vec![val(1), val("two")]);
        assert_eq!(env.get("a"), Some(&val(1)));
        assert_eq!(env.get("b"), Some(&val("two")));
        assert_eq!(env.get("c"), None);

        let mut env = Environment::new();
        env.define("x".into(), val(1));
        env.define("x".into(), val(2));
        assert_eq!(env.get("x"), Some(&val(2)));
    }
}
