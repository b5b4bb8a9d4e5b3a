//! Contract tests for the session bridge: round-tripping, isolation,
//! error surfacing, and event delivery.

use std::sync::{Arc, Mutex};

use serde_json::json;
use statlink_bridge::{Error, Session};

fn recorder() -> (Arc<Mutex<Vec<String>>>, impl FnMut(&str) + Send + 'static) {
    let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    (seen, move |text: &str| {
        sink.lock().unwrap().push(text.to_string())
    })
}

#[test]
fn round_trips_scalars() {
    let mut session = Session::new().unwrap();

    session.assign("i", json!(30)).unwrap();
    assert_eq!(session.get("i").unwrap(), json!(30));

    session.assign("r", json!(4.2)).unwrap();
    assert_eq!(session.get("r").unwrap(), json!(4.2));

    session.assign("s", json!("hello")).unwrap();
    assert_eq!(session.get("s").unwrap(), json!("hello"));

    session.assign("b", json!(true)).unwrap();
    assert_eq!(session.get("b").unwrap(), json!(true));

    session.assign("nothing", json!(null)).unwrap();
    assert_eq!(session.get("nothing").unwrap(), json!(null));
}

#[test]
fn round_trips_composites() {
    let mut session = Session::new().unwrap();

    let nested = json!([1, [2, 3], {"k": "v"}, null]);
    session.assign("x", nested.clone()).unwrap();
    assert_eq!(session.get("x").unwrap(), nested);

    let person = json!({"name": "Ann", "age": 30, "tags": ["a", "b"]});
    session.assign("person", person.clone()).unwrap();
    assert_eq!(session.get("person").unwrap(), person);
}

#[test]
fn bound_vectors_feed_interpreter_builtins() {
    let mut session = Session::new().unwrap();
    session.assign("nums", json!([1, 2, 3])).unwrap();
    assert_eq!(session.evaluate("sum(nums)").unwrap(), json!(6));
    assert_eq!(session.evaluate("length(nums)").unwrap(), json!(3));
}

#[test]
fn sessions_are_isolated() {
    let mut a = Session::new().unwrap();
    let mut b = Session::new().unwrap();

    a.assign("x", json!(1)).unwrap();
    assert_eq!(a.get("x").unwrap(), json!(1));
    assert!(matches!(b.get("x"), Err(Error::Retrieval)));
}

#[test]
fn retrieval_failure_is_uninformative() {
    let mut session = Session::new().unwrap();
    let err = session.get("never_bound").unwrap_err();
    assert!(matches!(err, Error::Retrieval));
    assert_eq!(
        err.to_string(),
        "The requested variable could not be retrieved"
    );
}

#[test]
fn container_is_cleaned_up_on_success() {
    let mut session = Session::new().unwrap();
    session.assign("x", json!([1, 2, 3])).unwrap();
    assert_eq!(
        session.evaluate("exists('.statlink_container')").unwrap(),
        json!(false)
    );
}

#[test]
fn container_is_cleaned_up_on_failure() {
    let mut session = Session::new().unwrap();
    // The target name cannot be parsed as an assignment, so the
    // interpreter-side decode step fails after the container is bound.
    let err = session.assign("not a name", json!([1, 2, 3])).unwrap_err();
    assert!(matches!(err, Error::Evaluation(_)));
    assert_eq!(
        session.evaluate("exists('.statlink_container')").unwrap(),
        json!(false)
    );
}

#[test]
fn evaluation_errors_carry_a_message() {
    let mut session = Session::new().unwrap();
    let err = session.evaluate("this is not valid syntax").unwrap_err();
    match err {
        Error::Evaluation(message) => assert!(!message.is_empty()),
        other => panic!("expected an evaluation error, got {:?}", other),
    }

    let err = session.evaluate_silent("stop('deliberate')").unwrap_err();
    match err {
        Error::Evaluation(message) => assert_eq!(message, "deliberate"),
        other => panic!("expected an evaluation error, got {:?}", other),
    }
}

#[test]
fn session_survives_failures() {
    let mut session = Session::new().unwrap();
    assert!(session.evaluate("this is not valid syntax").is_err());
    assert!(session.evaluate("missing_object").is_err());
    assert_eq!(session.evaluate("1 + 1").unwrap(), json!(2));
}

#[test]
fn unchecked_evaluation_swallows_failures() {
    let mut session = Session::new().unwrap();
    session.evaluate_unchecked("this is not valid syntax");
    session.evaluate_unchecked("stop('ignored')");
    assert_eq!(session.evaluate("1 + 1").unwrap(), json!(2));
}

#[test]
fn console_events_arrive_before_evaluate_returns() {
    let mut session = Session::new().unwrap();
    let (seen, callback) = recorder();
    session.on_console_output(callback);

    let result = session.evaluate("print(42)").unwrap();

    // The callback fired during the evaluate call; by the time the result
    // is decoded the output is already there.
    assert_eq!(result, json!(42));
    assert_eq!(seen.lock().unwrap().as_slice(), ["[1] 42\n"]);
}

#[test]
fn console_registration_last_wins() {
    let mut session = Session::new().unwrap();
    let (first_seen, first) = recorder();
    let (second_seen, second) = recorder();

    session.on_console_output(first);
    session.on_console_output(second);
    session.evaluate_silent("cat('once')").unwrap();

    assert!(first_seen.lock().unwrap().is_empty());
    assert_eq!(second_seen.lock().unwrap().as_slice(), ["once"]);
}

#[test]
fn unregistered_events_are_dropped_silently() {
    let mut session = Session::new().unwrap();
    // No callbacks registered at all: output and messages just vanish.
    session.evaluate_silent("print(1)").unwrap();
    session.evaluate_silent("message('nobody listening')").unwrap();
}

#[test]
fn messages_route_to_the_message_callback() {
    let mut session = Session::new().unwrap();
    let (seen, callback) = recorder();
    session.on_message(callback);

    session.evaluate_silent("message('watch out')").unwrap();
    assert_eq!(seen.lock().unwrap().as_slice(), ["watch out"]);
}

#[test]
fn fatal_conditions_reach_the_fatal_callback() {
    let mut session = Session::new().unwrap();
    let (seen, callback) = recorder();
    session.on_fatal(callback);

    let mut source = String::from("1");
    for _ in 0..80 {
        source = format!("identity({})", source);
    }
    assert!(session.evaluate_silent(&source).is_err());

    let fatals = seen.lock().unwrap();
    assert_eq!(fatals.len(), 1);
    assert!(!fatals[0].is_empty());
}

#[test]
fn fatal_from_unchecked_evaluation_still_fires() {
    let mut session = Session::new().unwrap();
    let (seen, callback) = recorder();
    session.on_fatal(callback);

    let mut source = String::from("1");
    for _ in 0..80 {
        source = format!("identity({})", source);
    }
    session.evaluate_unchecked(&source);
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[test]
fn serialization_support_is_preloaded() {
    let mut session = Session::new().unwrap();
    // fromJSON is only available because construction ran library(json).
    assert_eq!(
        session.evaluate("fromJSON('[1,2]')").unwrap(),
        json!([1, 2])
    );
}

#[test]
fn interpreter_expressions_compose_with_bound_values() {
    let mut session = Session::new().unwrap();
    session
        .assign("person", json!({"firstName": "John", "lastName": "Doe"}))
        .unwrap();
    assert_eq!(
        session
            .evaluate("paste(person$firstName, person$lastName, sep = ' ')")
            .unwrap(),
        json!("John Doe")
    );
}
