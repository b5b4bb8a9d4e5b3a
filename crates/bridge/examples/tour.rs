//! A short tour of the bridge: bind values, evaluate expressions, watch
//! the interpreter's console.

use serde_json::json;
use statlink_bridge::Session;

fn main() -> statlink_bridge::Result<()> {
    let mut session = Session::new()?;
    session.on_console_output(|text| print!("{}", text));
    session.on_message(|text| eprintln!("message: {}", text));
    session.on_fatal(|text| eprintln!("fatal: {}", text));

    session.evaluate_silent("cat('\\n Hello World \\n')")?;

    session.assign("X", json!(2483))?;
    session.assign("X", json!([3349, 211]))?;
    session.evaluate_silent("print(X)")?;

    session.assign(
        "Y",
        json!({"firstName": "John", "lastName": "Doe", "age": 50, "eyeColor": "blue"}),
    )?;
    session.evaluate_silent("print(paste(Y$firstName, Y$lastName, sep = ' '))")?;
    println!("Y = {}", session.get("Y")?);

    session.evaluate_silent("vec = c(3, 2, 4.2)")?;
    println!("vec = {}", session.get("vec")?);
    println!("sum(vec) = {}", session.evaluate("sum(vec)")?);

    Ok(())
}
