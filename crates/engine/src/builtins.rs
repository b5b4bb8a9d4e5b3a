//! Builtin functions available to every interpreter instance.
//!
//! `rm` and `library` are special forms handled by the evaluator; everything
//! here receives its arguments already evaluated.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde_json::Value as JsonValue;

use crate::callbacks::ConsoleStream;
use crate::error::{EngineError, Result};
use crate::evaluator::Interpreter;
use crate::value::Value;

type Args = Vec<(Option<String>, Value)>;

pub(crate) fn dispatch(interp: &mut Interpreter, callee: &str, args: Args) -> Result<Value> {
    match callee {
        "c" => builtin_c(args),
        "list" => builtin_list(args),
        "sum" => builtin_sum(args),
        "mean" => builtin_mean(args),
        "length" => builtin_length(args),
        "identity" => builtin_identity(args),
        "paste" => builtin_paste(args),
        "print" => builtin_print(interp, args),
        "cat" => builtin_cat(interp, args),
        "message" => builtin_message(interp, args),
        "stop" => builtin_stop(args),
        "exists" => builtin_exists(interp, args),
        "toJSON" => builtin_to_json(interp, args),
        "fromJSON" => builtin_from_json(interp, args),
        "rnorm" => builtin_rnorm(interp, args),
        "set.seed" => builtin_set_seed(interp, args),
        _ => Err(EngineError::Eval(format!(
            "could not find function \"{}\"",
            callee
        ))),
    }
}

fn positional(args: &Args) -> impl Iterator<Item = &Value> {
    args.iter()
        .filter(|(name, _)| name.is_none())
        .map(|(_, value)| value)
}

fn named<'a>(args: &'a Args, wanted: &str) -> Option<&'a Value> {
    args.iter()
        .find(|(name, _)| name.as_deref() == Some(wanted))
        .map(|(_, value)| value)
}

fn single(mut args: Args, callee: &str) -> Result<Value> {
    if args.len() != 1 || args[0].0.is_some() {
        return Err(EngineError::Eval(format!(
            "{} expects exactly one argument",
            callee
        )));
    }
    Ok(args.remove(0).1)
}

/// Numeric elements of a scalar or vector, tracking whether every element
/// was an integer.
fn numeric_items(value: &Value, callee: &str) -> Result<(Vec<f64>, bool)> {
    let mut items = Vec::new();
    let mut all_int = true;
    let mut push = |v: &Value| -> Result<()> {
        match v {
            Value::Int(i) => items.push(*i as f64),
            Value::Real(r) => {
                all_int = false;
                items.push(*r);
            }
            other => {
                return Err(EngineError::Eval(format!(
                    "invalid 'type' ({}) of argument to {}",
                    other.type_name(),
                    callee
                )))
            }
        }
        Ok(())
    };
    match value {
        Value::Null => {}
        Value::Vector(elements) => {
            for element in elements {
                push(element)?;
            }
        }
        scalar => push(scalar)?,
    }
    Ok((items, all_int))
}

fn builtin_c(args: Args) -> Result<Value> {
    fn flatten(value: Value, out: &mut Vec<Value>) {
        match value {
            Value::Null => {}
            Value::Vector(items) => {
                for item in items {
                    flatten(item, out);
                }
            }
            other => out.push(other),
        }
    }

    let mut items = Vec::new();
    for (_, value) in args {
        flatten(value, &mut items);
    }
    if items.is_empty() {
        Ok(Value::Null)
    } else {
        Ok(Value::Vector(items))
    }
}

fn builtin_list(args: Args) -> Result<Value> {
    let mut entries = indexmap::IndexMap::new();
    for (name, value) in args {
        match name {
            Some(name) => {
                entries.insert(name, value);
            }
            None => {
                return Err(EngineError::Eval(
                    "all elements of a list constructor must be named".to_string(),
                ))
            }
        }
    }
    Ok(Value::List(entries))
}

fn builtin_sum(args: Args) -> Result<Value> {
    let mut total = 0.0;
    let mut all_int = true;
    for value in positional(&args) {
        let (items, ints) = numeric_items(value, "sum")?;
        all_int = all_int && ints;
        total += items.iter().sum::<f64>();
    }
    if all_int && total.fract() == 0.0 && total.abs() <= i64::MAX as f64 {
        Ok(Value::Int(total as i64))
    } else {
        Ok(Value::Real(total))
    }
}

fn builtin_mean(args: Args) -> Result<Value> {
    let value = single(args, "mean")?;
    let (items, _) = numeric_items(&value, "mean")?;
    if items.is_empty() {
        return Ok(Value::Real(f64::NAN));
    }
    Ok(Value::Real(items.iter().sum::<f64>() / items.len() as f64))
}

fn builtin_length(args: Args) -> Result<Value> {
    let value = single(args, "length")?;
    let len = match value {
        Value::Null => 0,
        Value::Vector(items) => items.len(),
        Value::List(entries) => entries.len(),
        _ => 1,
    };
    Ok(Value::Int(len as i64))
}

fn builtin_identity(args: Args) -> Result<Value> {
    single(args, "identity")
}

fn builtin_paste(args: Args) -> Result<Value> {
    let sep = match named(&args, "sep") {
        Some(value) => value.to_string(),
        None => " ".to_string(),
    };
    let mut pieces = Vec::new();
    for value in positional(&args) {
        match value {
            Value::Null => {}
            Value::Vector(items) => {
                for item in items {
                    pieces.push(item.to_string());
                }
            }
            scalar => pieces.push(scalar.to_string()),
        }
    }
    Ok(Value::Str(pieces.join(&sep)))
}

fn builtin_print(interp: &mut Interpreter, args: Args) -> Result<Value> {
    let value = single(args, "print")?;
    let text = render(&value);
    interp.callbacks.write_console(&text, ConsoleStream::Stdout);
    Ok(value)
}

fn builtin_cat(interp: &mut Interpreter, args: Args) -> Result<Value> {
    let mut pieces = Vec::new();
    for value in positional(&args) {
        match value {
            Value::Null => {}
            Value::Vector(items) => {
                for item in items {
                    pieces.push(item.to_string());
                }
            }
            scalar => pieces.push(scalar.to_string()),
        }
    }
    interp
        .callbacks
        .write_console(&pieces.join(" "), ConsoleStream::Stdout);
    Ok(Value::Null)
}

fn builtin_message(interp: &mut Interpreter, args: Args) -> Result<Value> {
    let value = single(args, "message")?;
    interp.callbacks.show_message(&value.to_string());
    Ok(Value::Null)
}

fn builtin_stop(args: Args) -> Result<Value> {
    let text: Vec<String> = positional(&args).map(|v| v.to_string()).collect();
    if text.is_empty() {
        return Err(EngineError::Eval("error".to_string()));
    }
    Err(EngineError::Eval(text.join("")))
}

fn builtin_exists(interp: &mut Interpreter, args: Args) -> Result<Value> {
    match single(args, "exists")? {
        Value::Str(name) => Ok(Value::Bool(interp.get_global(&name).is_some())),
        _ => Err(EngineError::Eval(
            "invalid first argument to exists".to_string(),
        )),
    }
}

fn require_json(interp: &Interpreter, callee: &str) -> Result<()> {
    if interp.is_loaded("json") {
        Ok(())
    } else {
        // Unloaded package functions look exactly like unknown functions.
        Err(EngineError::Eval(format!(
            "could not find function \"{}\"",
            callee
        )))
    }
}

fn builtin_to_json(interp: &mut Interpreter, args: Args) -> Result<Value> {
    require_json(interp, "toJSON")?;
    let value = positional(&args).next().ok_or_else(|| {
        EngineError::Eval("toJSON expects a value argument".to_string())
    })?;
    let force = matches!(named(&args, "force"), Some(Value::Bool(true)));
    let doc = value.to_json(force)?;
    serde_json::to_string(&doc)
        .map(Value::Str)
        .map_err(|e| EngineError::Eval(format!("JSON serialization failed: {}", e)))
}

fn builtin_from_json(interp: &mut Interpreter, args: Args) -> Result<Value> {
    require_json(interp, "fromJSON")?;
    match single(args, "fromJSON")? {
        Value::Str(text) => {
            let doc: JsonValue = serde_json::from_str(&text)
                .map_err(|e| EngineError::Eval(format!("invalid JSON text: {}", e)))?;
            Ok(Value::from_json(&doc))
        }
        other => Err(EngineError::Eval(format!(
            "fromJSON expects character input, got {}",
            other.type_name()
        ))),
    }
}

fn builtin_rnorm(interp: &mut Interpreter, args: Args) -> Result<Value> {
    let mut unnamed = positional(&args);
    let n = match unnamed.next() {
        Some(Value::Int(n)) if *n >= 0 => *n as usize,
        _ => {
            return Err(EngineError::Eval(
                "invalid arguments to rnorm".to_string(),
            ))
        }
    };
    let mean = resolve_numeric(unnamed.next(), named(&args, "mean"), 0.0)?;
    let sd = resolve_numeric(unnamed.next(), named(&args, "sd"), 1.0)?;

    let mut samples = Vec::with_capacity(n);
    while samples.len() < n {
        // Box-Muller transform over the seeded uniform stream.
        let u1: f64 = interp.rng.gen::<f64>().max(f64::MIN_POSITIVE);
        let u2: f64 = interp.rng.gen();
        let radius = (-2.0 * u1.ln()).sqrt();
        let angle = 2.0 * std::f64::consts::PI * u2;
        samples.push(Value::Real(mean + sd * radius * angle.cos()));
        if samples.len() < n {
            samples.push(Value::Real(mean + sd * radius * angle.sin()));
        }
    }
    if samples.len() == 1 {
        Ok(samples.remove(0))
    } else {
        Ok(Value::Vector(samples))
    }
}

fn resolve_numeric(
    positional: Option<&Value>,
    named: Option<&Value>,
    default: f64,
) -> Result<f64> {
    let chosen = named.or(positional);
    match chosen {
        None => Ok(default),
        Some(value) => value.as_real().ok_or_else(|| {
            EngineError::Eval("invalid arguments to rnorm".to_string())
        }),
    }
}

fn builtin_set_seed(interp: &mut Interpreter, args: Args) -> Result<Value> {
    match single(args, "set.seed")? {
        Value::Int(seed) => {
            interp.rng = ChaCha8Rng::seed_from_u64(seed as u64);
            Ok(Value::Null)
        }
        _ => Err(EngineError::Eval(
            "supplied seed is not a valid integer".to_string(),
        )),
    }
}

/// Console rendering used by `print`.
fn render(value: &Value) -> String {
    fn atom(value: &Value) -> String {
        match value {
            Value::Str(s) => format!("\"{}\"", s),
            other => other.to_string(),
        }
    }

    match value {
        Value::Null => "NULL\n".to_string(),
        Value::Vector(items) => {
            let rendered: Vec<String> = items.iter().map(atom).collect();
            format!("[1] {}\n", rendered.join(" "))
        }
        Value::List(entries) => {
            let mut out = String::new();
            for (key, value) in entries {
                out.push_str(&format!("${}\n{}\n", key, render(value)));
            }
            out
        }
        scalar => format!("[1] {}\n", atom(scalar)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(source: &str) -> Result<Value> {
        Interpreter::new().eval(source)
    }

    #[test]
    fn c_flattens_nested_vectors() {
        assert_eq!(
            eval("c(1, c(2, 3))").unwrap(),
            Value::Vector(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        );
        assert_eq!(eval("c()").unwrap(), Value::Null);
        assert_eq!(eval("c(NULL, 1)").unwrap(), Value::Vector(vec![Value::Int(1)]));
    }

    #[test]
    fn sum_keeps_integer_sums_integral() {
        assert_eq!(eval("sum(c(1, 2, 3))").unwrap(), Value::Int(6));
        assert_eq!(eval("sum(c(1, 2), 3)").unwrap(), Value::Int(6));
        assert_eq!(eval("sum(c(1.5, 2.5))").unwrap(), Value::Real(4.0));
    }

    #[test]
    fn sum_rejects_character_input() {
        let err = eval("sum('a')").unwrap_err();
        assert!(err.to_string().contains("invalid 'type'"));
    }

    #[test]
    fn mean_is_always_real() {
        assert_eq!(eval("mean(c(1, 2))").unwrap(), Value::Real(1.5));
    }

    #[test]
    fn length_counts_elements() {
        assert_eq!(eval("length(c(1, 2, 3))").unwrap(), Value::Int(3));
        assert_eq!(eval("length('one')").unwrap(), Value::Int(1));
        assert_eq!(eval("length(NULL)").unwrap(), Value::Int(0));
        assert_eq!(
            eval("length(list(a = 1, b = 2))").unwrap(),
            Value::Int(2)
        );
    }

    #[test]
    fn paste_joins_with_separator() {
        assert_eq!(
            eval("paste('My', 'name', 'is', 'Ann')").unwrap(),
            Value::Str("My name is Ann".to_string())
        );
        assert_eq!(
            eval("paste('a', 'b', sep = '')").unwrap(),
            Value::Str("ab".to_string())
        );
        assert_eq!(
            eval("paste(c(1, 2), 3)").unwrap(),
            Value::Str("1 2 3".to_string())
        );
    }

    #[test]
    fn list_requires_names() {
        assert!(eval("list(1)").is_err());
        let value = eval("list(a = 1, b = 'x')").unwrap();
        match value {
            Value::List(entries) => {
                assert_eq!(entries.get("a"), Some(&Value::Int(1)));
                assert_eq!(entries.get("b"), Some(&Value::Str("x".to_string())));
            }
            other => panic!("expected a list, got {:?}", other),
        }
    }

    #[test]
    fn json_directives_round_trip() {
        let mut interp = Interpreter::new();
        interp.eval("library(json, quietly = TRUE)").unwrap();
        interp
            .eval("p <- fromJSON('{\"name\":\"Ann\",\"age\":30}')")
            .unwrap();
        assert_eq!(
            interp.eval("toJSON(p, force = TRUE)").unwrap(),
            Value::Str("{\"name\":\"Ann\",\"age\":30}".to_string())
        );
    }

    #[test]
    fn from_json_rejects_malformed_text() {
        let mut interp = Interpreter::new();
        interp.eval("library(json, quietly = TRUE)").unwrap();
        let err = interp.eval("fromJSON('{not json')").unwrap_err();
        assert!(err.to_string().contains("invalid JSON text"));
    }

    #[test]
    fn to_json_without_force_rejects_non_finite() {
        let mut interp = Interpreter::new();
        interp.eval("library(json, quietly = TRUE)").unwrap();
        interp.set_global("bad", Value::Real(f64::NAN));
        assert!(interp.eval("toJSON(bad)").is_err());
        assert_eq!(
            interp.eval("toJSON(bad, force = TRUE)").unwrap(),
            Value::Str("null".to_string())
        );
    }

    #[test]
    fn rnorm_respects_length_and_seed() {
        let mut interp = Interpreter::new();
        interp.eval("set.seed(1); x <- rnorm(5)").unwrap();
        match interp.get_global("x") {
            Some(Value::Vector(items)) => assert_eq!(items.len(), 5),
            other => panic!("expected a vector, got {:?}", other),
        }
        assert!(matches!(
            interp.eval("rnorm(1)").unwrap(),
            Value::Real(_)
        ));
    }

    #[test]
    fn print_renders_vectors_on_one_line() {
        assert_eq!(render(&Value::Vector(vec![Value::Int(3349), Value::Int(211)])), "[1] 3349 211\n");
        assert_eq!(render(&Value::Str("John Doe".to_string())), "[1] \"John Doe\"\n");
        assert_eq!(render(&Value::Null), "NULL\n");
    }
}
