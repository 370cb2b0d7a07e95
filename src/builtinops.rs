//! Built-in operator library.
//!
//! Every builtin is a native operator over already evaluated arguments. The
//! registry checks the argument count against the entry's [`Arity`] before the
//! operation runs. Most operations are built from one of two combinators:
//!
//! - [`cumulative`]: left-folds a binary step over the arguments starting from
//!   the first one (`+ - * / % & | ^ << >>`)
//! - [`decisive`]: checks a binary relation over each consecutive pair and
//!   answers `false` at the first pair that fails (`= != < > <= >= && ||`)
//!
//! ```text
//! (+ 1 2 3)          ; 6
//! (+ "a" 1)          ; "a1" - addition concatenates when text is involved
//! (< 1 2 3)          ; true
//! (< 1 3 2 "x")      ; false, the pair (2, "x") is never compared
//! (smaller 1 2)      ; verbose alias of <
//! ```
//!
//! ## Operand rules
//!
//! - Arithmetic operates on `f64`; division by zero follows IEEE 754
//! - Bitwise operators truncate operands to 32-bit two's-complement integers and
//!   mask shift counts to 0-31
//! - Equality is loose: a number equals numeric text with the same value
//! - Ordering compares numbers numerically and text lexicographically
//! - Anything else is rejected with a [`crate::DiagnosticKind::Type`] diagnostic
//!
//! ## Adding New Operations
//!
//! 1. **Implement the step or relation** as a plain `fn`
//! 2. **Add an entry to BUILTIN_OPS** with its symbol, optional alias and arity
//! 3. **Add test cases** to the data-driven table below

use crate::Diagnostic;
use crate::ast::Value;
use crate::definitions::{DefinitionTable, OperationFn};
use crate::token::is_numeric_word;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

/// Upper bound on the argument count of the variadic builtins
pub const MAX_OPERANDS: usize = 10000;

/// Accepted argument counts of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly n arguments
    Exact(usize),
    /// Between min and max arguments (inclusive)
    Range(usize, usize),
    /// Not checked
    Any,
}

impl Arity {
    pub fn validate(&self, count: usize) -> Result<(), Diagnostic> {
        let (min, max) = match *self {
            Arity::Exact(n) => (n, n),
            Arity::Range(min, max) => (min, max),
            Arity::Any => return Ok(()),
        };

        if count < min {
            Err(Diagnostic::syntax(format!(
                "At least {min} parameters are required"
            )))
        } else if count > max {
            Err(Diagnostic::syntax(format!(
                "Number of function parameters must be under {max}"
            )))
        } else {
            Ok(())
        }
    }
}

/// A registered builtin
#[derive(Clone)]
pub struct BuiltinOp {
    /// Operator symbol, e.g. `+`
    pub symbol: &'static str,
    /// Verbose alias bound to the same function, e.g. `add`
    pub alias: Option<&'static str>,
    pub arity: Arity,
    /// The operation, with the argument count already checked against `arity`
    pub func: Arc<OperationFn>,
}

impl std::fmt::Debug for BuiltinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltinOp")
            .field("symbol", &self.symbol)
            .field("alias", &self.alias)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

type Step = fn(&'static str, Value, &Value) -> Result<Value, Diagnostic>;
type Relation = fn(&'static str, &Value, &Value) -> Result<bool, Diagnostic>;

/// Left fold of `step` over the arguments
pub fn cumulative(symbol: &'static str, step: Step) -> Arc<OperationFn> {
    Arc::new(move |args: Vec<Value>| {
        let mut args = args.into_iter();
        let Some(first) = args.next() else {
            return Ok(Value::Unspecified);
        };
        args.try_fold(first, |acc, next| step(symbol, acc, &next))
    })
}

/// Chained relation over consecutive argument pairs
pub fn decisive(symbol: &'static str, relation: Relation) -> Arc<OperationFn> {
    Arc::new(move |args: Vec<Value>| {
        for pair in args.windows(2) {
            if let [left, right] = pair
                && !relation(symbol, left, right)?
            {
                return Ok(Value::Bool(false));
            }
        }
        Ok(Value::Bool(true))
    })
}

//
// Operand helpers
//

fn type_error(symbol: &str, left: &Value, right: &Value) -> Diagnostic {
    Diagnostic::type_error(format!(
        "'{symbol}' cannot operate on {left} and {right}"
    ))
}

fn number(symbol: &str, value: &Value) -> Result<f64, Diagnostic> {
    match value {
        Value::Number(n) => Ok(*n),
        other => Err(Diagnostic::type_error(format!(
            "'{symbol}' requires numbers, got {other}"
        ))),
    }
}

/// Numeric value of a number or of text that reads as one.
///
/// Text follows the scanner's number rule, so `inf` and `NaN` are not numeric.
/// Blank text reads as zero.
fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => Some(*n),
        Value::String(s) | Value::Symbol(s) => match s.trim() {
            "" => Some(0.0),
            text if is_numeric_word(text) => text.parse().ok(),
            _ => None,
        },
        _ => None,
    }
}

/// Truncate to a 32-bit two's-complement integer, wrapping out-of-range values
fn to_int32(n: f64) -> i32 {
    if !n.is_finite() {
        return 0;
    }
    // rem_euclid leaves a value in [0, 2^32), which fits u32 exactly
    n.trunc().rem_euclid(4_294_967_296.0) as u32 as i32
}

//
// Cumulative steps
//

fn step_add(symbol: &'static str, left: Value, right: &Value) -> Result<Value, Diagnostic> {
    match (&left, right) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
        (Value::String(_) | Value::Symbol(_), _) | (_, Value::String(_) | Value::Symbol(_)) => {
            let mut text = left.plain_text();
            text.push_str(&right.plain_text());
            Ok(Value::String(text))
        }
        _ => Err(type_error(symbol, &left, right)),
    }
}

macro_rules! arithmetic_step {
    ($name:ident, $op:tt) => {
        fn $name(symbol: &'static str, left: Value, right: &Value) -> Result<Value, Diagnostic> {
            Ok(Value::Number(number(symbol, &left)? $op number(symbol, right)?))
        }
    };
}

arithmetic_step!(step_sub, -);
arithmetic_step!(step_mul, *);
arithmetic_step!(step_div, /);
arithmetic_step!(step_rem, %);

macro_rules! bitwise_step {
    ($name:ident, |$a:ident, $b:ident| $body:expr) => {
        fn $name(symbol: &'static str, left: Value, right: &Value) -> Result<Value, Diagnostic> {
            let $a = to_int32(number(symbol, &left)?);
            let $b = to_int32(number(symbol, right)?);
            Ok(Value::Number(f64::from($body)))
        }
    };
}

bitwise_step!(step_and, |a, b| a & b);
bitwise_step!(step_or, |a, b| a | b);
bitwise_step!(step_xor, |a, b| a ^ b);
bitwise_step!(step_shl, |a, b| a.wrapping_shl(b as u32 & 31));
bitwise_step!(step_shr, |a, b| a.wrapping_shr(b as u32 & 31));

//
// Relations
//

/// Loose equality: numbers against numeric text compare by value
pub(crate) fn loose_equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a == b,
        (Value::String(a) | Value::Symbol(a), Value::String(b) | Value::Symbol(b)) => a == b,
        (Value::Number(n), text @ (Value::String(_) | Value::Symbol(_)))
        | (text @ (Value::String(_) | Value::Symbol(_)), Value::Number(n)) => {
            numeric(text) == Some(*n)
        }
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::List(a), Value::List(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| loose_equals(x, y))
        }
        _ => false,
    }
}

fn relation_eq(_symbol: &'static str, left: &Value, right: &Value) -> Result<bool, Diagnostic> {
    Ok(loose_equals(left, right))
}

fn relation_ne(_symbol: &'static str, left: &Value, right: &Value) -> Result<bool, Diagnostic> {
    Ok(!loose_equals(left, right))
}

/// Order two operands; `None` when the comparison is undefined (NaN)
fn compare(symbol: &str, left: &Value, right: &Value) -> Result<Option<Ordering>, Diagnostic> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok(a.partial_cmp(b)),
        (Value::String(a) | Value::Symbol(a), Value::String(b) | Value::Symbol(b)) => {
            Ok(Some(a.cmp(b)))
        }
        (Value::Number(_), Value::String(_) | Value::Symbol(_))
        | (Value::String(_) | Value::Symbol(_), Value::Number(_)) => {
            match (numeric(left), numeric(right)) {
                (Some(a), Some(b)) => Ok(a.partial_cmp(&b)),
                _ => Err(type_error(symbol, left, right)),
            }
        }
        _ => Err(type_error(symbol, left, right)),
    }
}

macro_rules! ordering_relation {
    ($name:ident, $accept:pat) => {
        fn $name(symbol: &'static str, left: &Value, right: &Value) -> Result<bool, Diagnostic> {
            Ok(matches!(compare(symbol, left, right)?, Some($accept)))
        }
    };
}

ordering_relation!(relation_lt, Ordering::Less);
ordering_relation!(relation_gt, Ordering::Greater);
ordering_relation!(relation_le, Ordering::Less | Ordering::Equal);
ordering_relation!(relation_ge, Ordering::Greater | Ordering::Equal);

fn relation_and(_symbol: &'static str, left: &Value, right: &Value) -> Result<bool, Diagnostic> {
    Ok(left.is_truthy() && right.is_truthy())
}

fn relation_or(_symbol: &'static str, left: &Value, right: &Value) -> Result<bool, Diagnostic> {
    Ok(left.is_truthy() || right.is_truthy())
}

//
// Unary builtins (first argument only, no arity check)
//

fn first(args: Vec<Value>) -> Value {
    args.into_iter().next().unwrap_or(Value::Unspecified)
}

fn builtin_bit_not(args: Vec<Value>) -> Result<Value, Diagnostic> {
    let n = number("~", &first(args))?;
    Ok(Value::Number(f64::from(!to_int32(n))))
}

fn builtin_not(args: Vec<Value>) -> Result<Value, Diagnostic> {
    Ok(Value::Bool(!first(args).is_truthy()))
}

fn builtin_zero(args: Vec<Value>) -> Result<Value, Diagnostic> {
    let is_zero = loose_equals(&first(args), &Value::Number(0.0));
    Ok(Value::Number(if is_zero { 1.0 } else { 0.0 }))
}

fn builtin_square(args: Vec<Value>) -> Result<Value, Diagnostic> {
    Ok(Value::Number(number("square", &first(args))?.sqrt()))
}

fn builtin_print(args: Vec<Value>) -> Result<Value, Diagnostic> {
    let value = first(args);
    println!("{}", value.plain_text());
    Ok(value)
}

/// Global registry of all built-in operations, built once at first use
static BUILTIN_OPS: LazyLock<Vec<BuiltinOp>> = LazyLock::new(|| {
    const VARIADIC: Arity = Arity::Range(2, MAX_OPERANDS);

    fn op(
        symbol: &'static str,
        alias: Option<&'static str>,
        arity: Arity,
        func: Arc<OperationFn>,
    ) -> BuiltinOp {
        let checked: Arc<OperationFn> = Arc::new(move |args: Vec<Value>| {
            arity.validate(args.len())?;
            func(args)
        });
        BuiltinOp {
            symbol,
            alias,
            arity,
            func: checked,
        }
    }

    fn unary(
        symbol: &'static str,
        alias: Option<&'static str>,
        func: fn(Vec<Value>) -> Result<Value, Diagnostic>,
    ) -> BuiltinOp {
        op(symbol, alias, Arity::Any, Arc::new(func))
    }

    vec![
        // Arithmetic
        op("+", Some("add"), VARIADIC, cumulative("+", step_add)),
        op("-", Some("subtract"), VARIADIC, cumulative("-", step_sub)),
        op("*", Some("multiply"), VARIADIC, cumulative("*", step_mul)),
        op("/", Some("divide"), VARIADIC, cumulative("/", step_div)),
        op("%", Some("modular"), Arity::Exact(2), cumulative("%", step_rem)),
        // Bitwise
        op("&", None, VARIADIC, cumulative("&", step_and)),
        op("|", None, VARIADIC, cumulative("|", step_or)),
        op("^", None, VARIADIC, cumulative("^", step_xor)),
        op("<<", None, VARIADIC, cumulative("<<", step_shl)),
        op(">>", None, VARIADIC, cumulative(">>", step_shr)),
        unary("~", None, builtin_bit_not),
        // Relations
        op("=", Some("equals"), VARIADIC, decisive("=", relation_eq)),
        op("!=", Some("differs"), VARIADIC, decisive("!=", relation_ne)),
        op("<", Some("smaller"), VARIADIC, decisive("<", relation_lt)),
        op(">", Some("bigger"), VARIADIC, decisive(">", relation_gt)),
        op("<=", Some("below"), VARIADIC, decisive("<=", relation_le)),
        op(">=", Some("above"), VARIADIC, decisive(">=", relation_ge)),
        // Logic
        op("&&", Some("and"), VARIADIC, decisive("&&", relation_and)),
        op("||", Some("or"), VARIADIC, decisive("||", relation_or)),
        unary("!", Some("not"), builtin_not),
        // Misc
        unary("zero", None, builtin_zero),
        unary("square", None, builtin_square),
        unary("print", None, builtin_print),
    ]
});

/// Lazy static map from symbol and alias to BuiltinOp
static BUILTIN_BY_NAME: LazyLock<HashMap<&'static str, &'static BuiltinOp>> = LazyLock::new(|| {
    let ops: &'static [BuiltinOp] = BUILTIN_OPS.as_slice();
    ops.iter()
        .flat_map(|op| std::iter::once(op.symbol).chain(op.alias).map(move |name| (name, op)))
        .collect()
});

/// Get all builtin operations
pub fn get_builtin_ops() -> &'static [BuiltinOp] {
    BUILTIN_OPS.as_slice()
}

/// Find a builtin by operator symbol or alias
pub fn find_builtin_op(name: &str) -> Option<&'static BuiltinOp> {
    BUILTIN_BY_NAME.get(name).copied()
}

/// Bind every builtin and alias in a definition table
pub(crate) fn install(table: &mut DefinitionTable) {
    for op in get_builtin_ops() {
        for name in std::iter::once(op.symbol).chain(op.alias) {
            table.register_native(name, Arc::clone(&op.func));
        }
    }
}
