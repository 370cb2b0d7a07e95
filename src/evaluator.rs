use crate::ast::{Node, Value, unescape};
use crate::definitions::{Definition, DefinitionTable, Environment, OperationFn};
use crate::lexer::Lexer;
use crate::opcodes::{Opcode, Opcodes, SymbolTable};
use crate::parser::parse_program;
use crate::token::{Scanner, Token, TokenKind};
use crate::{Diagnostic, MAX_EVAL_DEPTH, MAX_PARSE_DEPTH};
use std::sync::Arc;

/// Which reduction the engine performs
///
/// Both modes share one control flow. Compiling mode additionally resolves
/// identifiers against a table of compile-time constants.
#[derive(Debug, Clone, Copy)]
pub enum Mode<'a> {
    Interpret,
    Compile(&'a SymbolTable),
}

/// What `define` does with a name that already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Redefinition {
    /// Keep the existing definition and evaluate to unspecified
    #[default]
    Ignore,
    /// Fail with a syntax diagnostic
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub max_eval_depth: usize,
    pub max_parse_depth: usize,
    pub redefinition: Redefinition,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_eval_depth: MAX_EVAL_DEPTH,
            max_parse_depth: MAX_PARSE_DEPTH,
            redefinition: Redefinition::default(),
        }
    }
}

/// State threaded through one evaluation run
struct Evaluation<'a> {
    table: &'a mut DefinitionTable,
    mode: Mode<'a>,
    config: &'a EngineConfig,
}

/// Evaluate a node against a definition table and parameter environment
/// using the default configuration (public API)
pub fn evaluate(
    node: &Node,
    table: &mut DefinitionTable,
    env: &Environment,
    mode: Mode<'_>,
) -> Result<Value, Diagnostic> {
    let config = EngineConfig::default();
    let mut ev = Evaluation {
        table,
        mode,
        config: &config,
    };
    eval_with_depth_tracking(node, &mut ev, env, 0)
}

/// Evaluate a node with call-depth tracking to prevent stack overflow.
///
/// `depth` counts nested user function calls only; the nesting of forms inside
/// one body is already bounded by the parser.
fn eval_with_depth_tracking(
    node: &Node,
    ev: &mut Evaluation<'_>,
    env: &Environment,
    depth: usize,
) -> Result<Value, Diagnostic> {
    match node {
        Node::Leaf(token) => eval_leaf(token, ev.mode, env),
        Node::Group { children, line } => {
            eval_group(children, *line, ev, env, depth).map_err(|err| err.after(*line))
        }
    }
}

/// Evaluate a child node, attributing failures to the child's line
fn eval_child(
    node: &Node,
    ev: &mut Evaluation<'_>,
    env: &Environment,
    depth: usize,
) -> Result<Value, Diagnostic> {
    eval_with_depth_tracking(node, ev, env, depth).map_err(|err| err.after(node.line()))
}

fn eval_leaf(token: &Token, mode: Mode<'_>, env: &Environment) -> Result<Value, Diagnostic> {
    match token.kind {
        TokenKind::String => Ok(Value::String(unescape(&token.data))),
        TokenKind::Number => token.data.parse().map(Value::Number).map_err(|_| {
            Diagnostic::syntax(format!("Invalid number literal: {}", token.data)).at(token.line)
        }),
        TokenKind::Id => Ok(resolve_identifier(&token.data, mode, env)),
        TokenKind::Open | TokenKind::Close | TokenKind::Space | TokenKind::Comment => Err(
            Diagnostic::syntax(format!("Unexpected token: {}", token.data)).at(token.line),
        ),
    }
}

/// Parameters first, then compile-time constants, otherwise the identifier's own text
fn resolve_identifier(name: &str, mode: Mode<'_>, env: &Environment) -> Value {
    if let Some(value) = env.get(name) {
        return value.clone();
    }
    if let Mode::Compile(symbols) = mode
        && let Some(value) = symbols.constant(name)
    {
        return value.clone();
    }
    Value::Symbol(name.to_owned())
}

fn eval_group(
    children: &[Node],
    line: usize,
    ev: &mut Evaluation<'_>,
    env: &Environment,
    depth: usize,
) -> Result<Value, Diagnostic> {
    let head = children
        .first()
        .and_then(Node::token)
        .filter(|token| token.kind == TokenKind::Id)
        .map(|token| token.data.as_str());

    match head {
        Some("define") => eval_define(children, line, ev, env, depth),
        Some("if") => eval_if(children, ev, env, depth),
        // Reserved forms: nothing is evaluated
        Some("lambda" | "memoize") => Ok(Value::Unspecified),
        _ => eval_application(children, line, ev, env, depth),
    }
}

/// Parameter names from an evaluated parameter list
fn parameter_names(value: Value) -> Vec<String> {
    match value {
        Value::List(items) => items.iter().map(Value::plain_text).collect(),
        Value::Unspecified => Vec::new(),
        scalar => vec![scalar.plain_text()],
    }
}

/// Evaluate define special form
fn eval_define(
    children: &[Node],
    line: usize,
    ev: &mut Evaluation<'_>,
    env: &Environment,
    depth: usize,
) -> Result<Value, Diagnostic> {
    let [_, name_node, third, tail @ ..] = children else {
        return Err(Diagnostic::syntax("Define clause needs at least 3 parameters"));
    };

    let name = match eval_child(name_node, ev, env, depth)? {
        Value::Symbol(name) | Value::String(name) => name,
        _ => {
            return Err(
                Diagnostic::syntax("Definition name must be an identifier").at(name_node.line())
            );
        }
    };

    if ev.table.contains(&name) {
        return match ev.config.redefinition {
            Redefinition::Ignore => {
                log::debug!(
                    target: "foldlisp::eval",
                    "line {line}: definition {name} already exists, ignored"
                );
                Ok(Value::Unspecified)
            }
            Redefinition::Reject => {
                Err(Diagnostic::syntax(format!("The definition {name} already exists.")).at(line))
            }
        };
    }

    // (define name body) or (define name params body ...); extra forms are ignored
    let (params, body) = match tail.first() {
        None => (Vec::new(), third),
        Some(body) => (parameter_names(eval_child(third, ev, env, depth)?), body),
    };

    log::debug!(target: "foldlisp::eval", "line {line}: define {name} {params:?}");
    ev.table.define(
        name,
        Definition::UserFunction {
            params,
            body: Arc::new(body.clone()),
        },
    );

    Ok(Value::Unspecified)
}

/// Evaluate if special form; the untaken branch is never evaluated
fn eval_if(
    children: &[Node],
    ev: &mut Evaluation<'_>,
    env: &Environment,
    depth: usize,
) -> Result<Value, Diagnostic> {
    let [_, condition, consequent, rest @ ..] = children else {
        return Err(Diagnostic::syntax("If clause needs at least 3 parameters"));
    };

    if eval_child(condition, ev, env, depth)?.is_truthy() {
        eval_child(consequent, ev, env, depth)
    } else if let Some(alternative) = rest.first() {
        eval_child(alternative, ev, env, depth)
    } else {
        Ok(Value::Unspecified)
    }
}

/// Evaluate every child, then call the definition the head names or build a list
fn eval_application(
    children: &[Node],
    line: usize,
    ev: &mut Evaluation<'_>,
    env: &Environment,
    depth: usize,
) -> Result<Value, Diagnostic> {
    let Some((head_node, arg_nodes)) = children.split_first() else {
        return Ok(Value::List(Vec::new()));
    };

    let head = eval_child(head_node, ev, env, depth)?;
    let mut args = Vec::with_capacity(arg_nodes.len());
    for node in arg_nodes {
        let value = eval_child(node, ev, env, depth)?;
        if !value.is_unspecified() {
            args.push(value);
        }
    }

    let definition = head.text().and_then(|name| ev.table.get(name)).cloned();
    match definition {
        Some(Definition::UserFunction { params, body }) => {
            if args.len() != params.len() {
                return Err(Diagnostic::syntax(format!(
                    "Definition {} needs {} parameters",
                    head.plain_text(),
                    params.len()
                ))
                .at(line));
            }
            let max = ev.config.max_eval_depth;
            if depth >= max {
                return Err(Diagnostic::limit(format!(
                    "Evaluation depth limit exceeded (max: {max})"
                ))
                .at(line));
            }
            let name = head.plain_text();
            log::trace!(target: "foldlisp::eval", "line {line}: call {name} at depth {depth}");
            let call_env = Environment::bind(&params, args);
            eval_with_depth_tracking(&body, ev, &call_env, depth + 1)
        }
        Some(Definition::NativeOperator(func)) => {
            let name = head.plain_text();
            log::trace!(target: "foldlisp::eval", "line {line}: native {name}");
            func(args)
        }
        None => {
            let mut list = Vec::with_capacity(args.len() + 1);
            if !head.is_unspecified() {
                list.push(head);
            }
            list.extend(args);
            Ok(Value::List(list).pill())
        }
    }
}

/// Entry point tying a scanner, the parser and the evaluation engine together
///
/// An engine holds configuration only: host functions and compile-time
/// constants are copied into fresh tables for every run, so no state crosses
/// calls to [`Engine::evaluate_text`] or [`Engine::compile`].
pub struct Engine {
    config: EngineConfig,
    scanner: Box<dyn Scanner + Send + Sync>,
    natives: Vec<(String, Arc<OperationFn>)>,
    constants: SymbolTable,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let natives: Vec<&str> = self.natives.iter().map(|(name, _)| name.as_str()).collect();
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("natives", &natives)
            .field("constants", &self.constants)
            .finish_non_exhaustive()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Engine {
            config,
            scanner: Box::new(Lexer),
            natives: Vec::new(),
            constants: SymbolTable::new(),
        }
    }

    /// Replace the scanner used to turn source text into tokens
    pub fn with_scanner(mut self, scanner: impl Scanner + Send + Sync + 'static) -> Self {
        self.scanner = Box::new(scanner);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Register a host function callable from evaluated programs.
    ///
    /// The function receives the evaluated arguments with unspecified values
    /// already removed. Builtins cannot be shadowed, and a name can only be
    /// registered once.
    ///
    /// # Example
    /// ```
    /// use foldlisp::{Diagnostic, Engine};
    /// use foldlisp::ast::Value;
    ///
    /// fn count(args: &[Value]) -> Result<Value, Diagnostic> {
    ///     Ok(Value::Number(args.len() as f64))
    /// }
    ///
    /// let mut engine = Engine::new();
    /// engine.register_builtin_function("count", count).unwrap();
    /// assert_eq!(engine.evaluate_text("(count 1 2 3)").unwrap(), Value::Number(3.0));
    /// ```
    pub fn register_builtin_function<F>(&mut self, name: &str, func: F) -> Result<(), Diagnostic>
    where
        F: Fn(&[Value]) -> Result<Value, Diagnostic> + Send + Sync + 'static,
    {
        let taken = crate::builtinops::find_builtin_op(name).is_some()
            || self.natives.iter().any(|(existing, _)| existing == name);
        if taken {
            return Err(Diagnostic::syntax(format!(
                "The definition {name} already exists."
            )));
        }

        let wrapped: Arc<OperationFn> = Arc::new(move |args: Vec<Value>| func(&args));
        self.natives.push((name.to_owned(), wrapped));
        Ok(())
    }

    /// Declare a constant that identifiers resolve to in compiling mode
    pub fn declare_constant(&mut self, name: &str, value: Value) {
        self.constants.declare_constant(name, value);
    }

    /// A definition table holding the builtins and the registered host functions
    pub fn new_table(&self) -> DefinitionTable {
        let mut table = DefinitionTable::with_builtins();
        for (name, func) in &self.natives {
            table.register_native(name.clone(), Arc::clone(func));
        }
        table
    }

    /// Scan and parse source text into its top-level forms
    pub fn parse(&self, source: &str) -> Result<Vec<Node>, Diagnostic> {
        let tokens = self.scanner.scan(source)?;
        parse_program(&tokens, self.config.max_parse_depth)
    }

    /// Interpret a program and return its value
    pub fn evaluate_text(&self, source: &str) -> Result<Value, Diagnostic> {
        let mut table = self.new_table();
        self.evaluate_with_table(source, &mut table)
    }

    /// Interpret a program against a caller-owned table, keeping the
    /// definitions it makes. Used by interactive sessions.
    pub fn evaluate_with_table(
        &self,
        source: &str,
        table: &mut DefinitionTable,
    ) -> Result<Value, Diagnostic> {
        let root = Node::program(self.parse(source)?);
        let mut ev = Evaluation {
            table,
            mode: Mode::Interpret,
            config: &self.config,
        };
        eval_with_depth_tracking(&root, &mut ev, &Environment::new(), 0)
    }

    /// Constant-fold every top-level form into one `PUSH` each
    pub fn compile(&self, source: &str) -> Result<Opcodes, Diagnostic> {
        let forms = self.parse(source)?;
        let mut table = self.new_table();
        let mut ev = Evaluation {
            table: &mut table,
            mode: Mode::Compile(&self.constants),
            config: &self.config,
        };

        let mut opcodes = Opcodes::new();
        let env = Environment::new();
        for form in &forms {
            let value = eval_with_depth_tracking(form, &mut ev, &env, 0)?;
            if value.is_unspecified() {
                continue;
            }
            log::debug!(target: "foldlisp::compile", "line {}: PUSH {value}", form.line());
            opcodes.push(Opcode::Push(value));
        }

        Ok(opcodes)
    }

    /// [`Engine::compile`] rendered as text, one `PUSH <value>` per line
    pub fn compile_text(&self, source: &str) -> Result<String, Diagnostic> {
        self.compile(source).map(|opcodes| opcodes.to_string())
    }
}

/// Interpret a program with a default engine
pub fn evaluate_text(source: &str) -> Result<Value, Diagnostic> {
    Engine::new().evaluate_text(source)
}

/// Compile a program with a default engine
pub fn compile_text(source: &str) -> Result<String, Diagnostic> {
    Engine::new().compile_text(source)
}
