//! Tree-walking evaluator over a single global environment.

use std::collections::{HashMap, HashSet};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::ast::{Arg, BinaryOp, Expr, Stmt, UnaryOp};
use crate::builtins;
use crate::callbacks::{Callbacks, StdConsole};
use crate::error::{EngineError, Result};
use crate::parser;
use crate::value::Value;

/// Call-nesting ceiling. Crossing it is the engine's unrecoverable
/// condition: the fatal callback fires and the evaluation fails.
pub(crate) const MAX_DEPTH: usize = 64;

/// Feature packages `library()` knows about.
const PACKAGES: &[&str] = &["json"];

/// One interpreter instance: a global environment, a loaded-package set,
/// the driver callbacks, and a seeded PRNG for the sampling builtins.
pub struct Interpreter {
    pub(crate) globals: HashMap<String, Value>,
    pub(crate) packages: HashSet<String>,
    pub(crate) callbacks: Box<dyn Callbacks>,
    pub(crate) rng: ChaCha8Rng,
    depth: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self {
            globals: HashMap::new(),
            packages: HashSet::new(),
            callbacks: Box::new(StdConsole),
            // Fixed default seed; `set.seed` reseeds.
            rng: ChaCha8Rng::seed_from_u64(0x5354_4c4b),
            depth: 0,
        }
    }

    /// Replace the driver callbacks for this instance.
    pub fn set_callbacks(&mut self, callbacks: Box<dyn Callbacks>) {
        self.callbacks = callbacks;
    }

    /// Evaluate source text and return the value of its last statement.
    pub fn eval(&mut self, source: &str) -> Result<Value> {
        let program = parser::parse(source)?;
        self.depth = 0;
        let mut last = Value::Null;
        for stmt in &program {
            last = self.exec_stmt(stmt)?;
        }
        Ok(last)
    }

    /// Bind a value directly, without going through the parser.
    pub fn set_global(&mut self, name: &str, value: Value) {
        self.globals.insert(name.to_string(), value);
    }

    pub fn get_global(&self, name: &str) -> Option<&Value> {
        self.globals.get(name)
    }

    /// Unbind a global. Returns whether it was bound.
    pub fn remove_global(&mut self, name: &str) -> bool {
        self.globals.remove(name).is_some()
    }

    pub fn is_loaded(&self, package: &str) -> bool {
        self.packages.contains(package)
    }

    fn exec_stmt(&mut self, stmt: &Stmt) -> Result<Value> {
        match stmt {
            Stmt::Assign { name, value } => {
                let value = self.eval_expr(value)?;
                self.globals.insert(name.clone(), value.clone());
                Ok(value)
            }
            Stmt::Expr(expr) => self.eval_expr(expr),
        }
    }

    pub(crate) fn eval_expr(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Null => Ok(Value::Null),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Int(i) => Ok(Value::Int(*i)),
            Expr::Real(r) => Ok(Value::Real(*r)),
            Expr::Str(s) => Ok(Value::Str(s.clone())),
            Expr::Ident(name) => self
                .globals
                .get(name)
                .cloned()
                .ok_or_else(|| EngineError::Eval(format!("object '{}' not found", name))),
            Expr::Unary { op, operand } => {
                let value = self.eval_expr(operand)?;
                eval_unary(*op, value)
            }
            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.eval_expr(lhs)?;
                let rhs = self.eval_expr(rhs)?;
                eval_binary(*op, lhs, rhs)
            }
            Expr::Field { target, name } => match self.eval_expr(target)? {
                Value::List(entries) => {
                    Ok(entries.get(name).cloned().unwrap_or(Value::Null))
                }
                Value::Null => Ok(Value::Null),
                _ => Err(EngineError::Eval(
                    "$ operator is invalid for atomic vectors".to_string(),
                )),
            },
            Expr::Call { callee, args } => {
                if self.depth >= MAX_DEPTH {
                    let text = "evaluation nested too deeply: expression limit reached";
                    self.callbacks.fatal(text);
                    return Err(EngineError::Limit(text.to_string()));
                }
                self.depth += 1;
                let result = self.eval_call(callee, args);
                self.depth -= 1;
                result
            }
        }
    }

    fn eval_call(&mut self, callee: &str, args: &[Arg]) -> Result<Value> {
        // `rm` and `library` see their arguments as bare symbols.
        match callee {
            "rm" => self.builtin_rm(args),
            "library" => self.builtin_library(args),
            _ => {
                let mut evaluated = Vec::with_capacity(args.len());
                for arg in args {
                    evaluated.push((arg.name.clone(), self.eval_expr(&arg.value)?));
                }
                builtins::dispatch(self, callee, evaluated)
            }
        }
    }

    fn builtin_rm(&mut self, args: &[Arg]) -> Result<Value> {
        for arg in args {
            match &arg.value {
                Expr::Ident(name) => {
                    // Removing an unbound name is not an error.
                    self.globals.remove(name);
                }
                _ => {
                    return Err(EngineError::Eval(
                        "arguments to rm must contain names or character strings"
                            .to_string(),
                    ))
                }
            }
        }
        Ok(Value::Null)
    }

    fn builtin_library(&mut self, args: &[Arg]) -> Result<Value> {
        let mut package = None;
        let mut quietly = false;
        for arg in args {
            match arg.name.as_deref() {
                None if package.is_none() => {
                    package = match &arg.value {
                        Expr::Ident(name) => Some(name.clone()),
                        Expr::Str(name) => Some(name.clone()),
                        _ => {
                            return Err(EngineError::Eval(
                                "invalid package name argument to library".to_string(),
                            ))
                        }
                    };
                }
                Some("quietly") => {
                    quietly = matches!(self.eval_expr(&arg.value)?, Value::Bool(true));
                }
                _ => {}
            }
        }
        let package = package.ok_or_else(|| {
            EngineError::Eval("library requires a package name".to_string())
        })?;

        if !PACKAGES.contains(&package.as_str()) {
            return Err(EngineError::Eval(format!(
                "there is no package called '{}'",
                package
            )));
        }
        if self.packages.insert(package.clone()) {
            tracing::debug!("loaded package '{}'", package);
            if !quietly {
                self.callbacks
                    .show_message(&format!("Loading package: {}", package));
            }
        }
        Ok(Value::Null)
    }
}

fn eval_unary(op: UnaryOp, value: Value) -> Result<Value> {
    match (op, value) {
        (UnaryOp::Neg, Value::Int(i)) => Ok(i
            .checked_neg()
            .map(Value::Int)
            .unwrap_or(Value::Real(-(i as f64)))),
        (UnaryOp::Neg, Value::Real(r)) => Ok(Value::Real(-r)),
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (op, value) => Err(EngineError::Eval(format!(
            "invalid argument of type {} to unary operator {:?}",
            value.type_name(),
            op
        ))),
    }
}

fn eval_binary(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value> {
    use BinaryOp::*;
    match op {
        Add | Sub | Mul | Div => arith(op, lhs, rhs),
        Eq => Ok(Value::Bool(values_equal(&lhs, &rhs))),
        Ne => Ok(Value::Bool(!values_equal(&lhs, &rhs))),
        Lt | Le | Gt | Ge => compare(op, lhs, rhs),
    }
}

fn arith(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value> {
    use BinaryOp::*;
    if let (Value::Int(a), Value::Int(b)) = (&lhs, &rhs) {
        // Integer arithmetic promotes to double on overflow; division is
        // always double.
        let exact = match op {
            Add => a.checked_add(*b),
            Sub => a.checked_sub(*b),
            Mul => a.checked_mul(*b),
            _ => None,
        };
        if let Some(i) = exact {
            return Ok(Value::Int(i));
        }
    }
    let (a, b) = match (lhs.as_real(), rhs.as_real()) {
        (Some(a), Some(b)) => (a, b),
        _ => {
            return Err(EngineError::Eval(
                "non-numeric argument to binary operator".to_string(),
            ))
        }
    };
    let result = match op {
        Add => a + b,
        Sub => a - b,
        Mul => a * b,
        Div => a / b,
        _ => unreachable!("arith called with a comparison operator"),
    };
    Ok(Value::Real(result))
}

fn compare(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value> {
    use BinaryOp::*;
    let ordering_holds = match (lhs.as_real(), rhs.as_real()) {
        (Some(a), Some(b)) => match op {
            Lt => a < b,
            Le => a <= b,
            Gt => a > b,
            Ge => a >= b,
            _ => unreachable!(),
        },
        _ => match (&lhs, &rhs) {
            (Value::Str(a), Value::Str(b)) => match op {
                Lt => a < b,
                Le => a <= b,
                Gt => a > b,
                Ge => a >= b,
                _ => unreachable!(),
            },
            _ => {
                return Err(EngineError::Eval(
                    "comparison of these types is not implemented".to_string(),
                ))
            }
        },
    };
    Ok(Value::Bool(ordering_holds))
}

/// Equality with numeric coercion: `2 == 2.0` holds.
fn values_equal(lhs: &Value, rhs: &Value) -> bool {
    match (lhs.as_real(), rhs.as_real()) {
        (Some(a), Some(b)) => a == b,
        _ => lhs == rhs,
    }
}
