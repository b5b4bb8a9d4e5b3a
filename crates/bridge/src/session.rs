//! One interpreter instance per session: evaluation with JSON marshalling
//! in both directions, and interpreter events routed to host callbacks.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use statlink_engine::{Interpreter, Value};

use crate::error::{Error, Result};
use crate::events::{EventSink, SinkSlots};

/// Interpreter-side scratch name used while binding composite values.
/// Never left bound after `assign` returns, success or failure.
const CONTAINER: &str = ".statlink_container";

/// A stateful bridge session owning exactly one interpreter instance.
///
/// The interpreter and the event sink live and die with the session; no
/// state is shared between two sessions. A session is single-threaded:
/// callers running it from multiple threads must serialize access
/// themselves, and event callbacks fire on the calling thread, during the
/// evaluation that raised them.
pub struct Session {
    id: Uuid,
    created_at: DateTime<Utc>,
    interp: Interpreter,
    slots: Arc<SinkSlots>,
}

impl Session {
    /// Create a session with a fresh interpreter and the serialization
    /// support pre-loaded into it.
    ///
    /// Initialization failure aborts creation; no partially-built session
    /// escapes.
    pub fn new() -> Result<Self> {
        let slots = Arc::new(SinkSlots::default());
        let mut interp = Interpreter::new();
        interp.set_callbacks(Box::new(EventSink {
            slots: Arc::clone(&slots),
        }));

        let mut session = Session {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            interp,
            slots,
        };
        session.run("library(json, quietly = TRUE);")?;
        tracing::info!("session {} created", session.id);
        Ok(session)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Evaluate `expression` and return its decoded result.
    ///
    /// The expression is wrapped in the interpreter's serialize directive;
    /// the resulting interchange text is decoded on the host side. The
    /// session stays usable after a failure.
    pub fn evaluate(&mut self, expression: &str) -> Result<JsonValue> {
        let command = format!("toJSON({}, force = TRUE);", expression);
        let text = self.run_for_text(&command)?;
        serde_json::from_str(&text).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Evaluate `expression` for its side effects, discarding the result.
    pub fn evaluate_silent(&mut self, expression: &str) -> Result<()> {
        self.run(expression).map(|_| ())
    }

    /// Evaluate `expression` for its side effects and swallow any failure.
    ///
    /// Interpreter faults are logged at debug level and never reach the
    /// caller; use this only when a failure would be non-actionable.
    /// Fatal conditions still reach the registered fatal callback.
    pub fn evaluate_unchecked(&mut self, expression: &str) {
        if let Err(e) = self.run(expression) {
            tracing::debug!("session {}: unchecked evaluation failed: {}", self.id, e);
        }
    }

    /// Bind `value` into interpreter storage under `name`.
    ///
    /// Numeric and text scalars bind directly. Everything else crosses the
    /// boundary as interchange text: the serialized document is bound under
    /// a reserved container name, decoded interpreter-side into `name`, and
    /// the container is removed again. Removal is unconditional: it also
    /// happens when the decode step fails.
    pub fn assign(&mut self, name: &str, value: JsonValue) -> Result<()> {
        if name == CONTAINER {
            return Err(Error::InvalidName(format!(
                "'{}' is reserved by the bridge",
                name
            )));
        }
        match value {
            JsonValue::Number(n) => {
                let bound = if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(f) = n.as_f64() {
                    Value::Real(f)
                } else {
                    return Err(Error::Serialization(format!(
                        "number {} has no host representation",
                        n
                    )));
                };
                self.interp.set_global(name, bound);
                Ok(())
            }
            JsonValue::String(s) => {
                self.interp.set_global(name, Value::Str(s));
                Ok(())
            }
            composite => self.assign_composite(name, &composite),
        }
    }

    fn assign_composite(&mut self, name: &str, value: &JsonValue) -> Result<()> {
        let text =
            serde_json::to_string(value).map_err(|e| Error::Serialization(e.to_string()))?;
        self.interp.set_global(CONTAINER, Value::Str(text));
        let command = format!("{} = fromJSON({}); rm({});", name, CONTAINER, CONTAINER);
        let result = self.run(&command).map(|_| ());
        // The command removes the container itself on success; this covers
        // every failure path.
        self.interp.remove_global(CONTAINER);
        result
    }

    /// Read the value bound under `name`, decoded into a host value.
    ///
    /// Every failure (unbound name, serialize fault, decode fault)
    /// collapses into [`Error::Retrieval`].
    pub fn get(&mut self, name: &str) -> Result<JsonValue> {
        let command = format!("toJSON({}, force = TRUE);", name);
        let text = self.run_for_text(&command).map_err(|_| Error::Retrieval)?;
        serde_json::from_str(&text).map_err(|_| Error::Retrieval)
    }

    /// Register the console-output callback, replacing any previous one.
    pub fn on_console_output(&mut self, callback: impl FnMut(&str) + Send + 'static) {
        *self.slots.console.lock().unwrap() = Some(Box::new(callback));
    }

    /// Register the message callback, replacing any previous one.
    pub fn on_message(&mut self, callback: impl FnMut(&str) + Send + 'static) {
        *self.slots.message.lock().unwrap() = Some(Box::new(callback));
    }

    /// Register the fatal-signal callback, replacing any previous one.
    ///
    /// Receiving this signal means the session's interpreter may be in an
    /// unrecoverable state; the bridge itself takes no action beyond
    /// forwarding.
    pub fn on_fatal(&mut self, callback: impl FnMut(&str) + Send + 'static) {
        *self.slots.fatal.lock().unwrap() = Some(Box::new(callback));
    }

    /// Run raw source in the interpreter, keeping faults on this side of
    /// the boundary: engine errors become [`Error::Evaluation`], engine
    /// panics are contained and become [`Error::Unknown`].
    fn run(&mut self, source: &str) -> Result<Value> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.interp.eval(source)));
        match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(Error::Evaluation(e.to_string())),
            Err(_) => Err(Error::Unknown),
        }
    }

    fn run_for_text(&mut self, source: &str) -> Result<String> {
        match self.run(source)? {
            Value::Str(text) => Ok(text),
            other => Err(Error::Serialization(format!(
                "expected interchange text, got {}",
                other.type_name()
            ))),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // Interpreter and sink go down with the handle, exactly once.
        tracing::debug!("session {} destroyed", self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn container_name_is_rejected() {
        let mut session = Session::new().unwrap();
        let err = session.assign(CONTAINER, json!(1)).unwrap_err();
        assert!(matches!(err, Error::InvalidName(_)));
    }

    #[test]
    fn scalar_numbers_bind_without_the_codec() {
        let mut session = Session::new().unwrap();
        session.assign("n", json!(2483)).unwrap();
        session.assign("r", json!(0.25)).unwrap();
        assert_eq!(session.evaluate("n + r").unwrap(), json!(2483.25));
    }

    #[test]
    fn strings_bind_verbatim() {
        let mut session = Session::new().unwrap();
        // Quotes survive because direct binding bypasses the parser.
        session.assign("s", json!("it's a \"test\"")).unwrap();
        assert_eq!(session.get("s").unwrap(), json!("it's a \"test\""));
    }
}
