//! Host-side bridge to an embedded statlink interpreter.
//!
//! A [`Session`] owns one interpreter instance for its whole lifetime and
//! is the sole entry and exit point for the host: evaluate expressions,
//! move JSON-shaped values in and out, and receive the interpreter's
//! console/message/fatal notifications through registered callbacks.
//!
//! ```no_run
//! use serde_json::json;
//! use statlink_bridge::Session;
//!
//! # fn main() -> statlink_bridge::Result<()> {
//! let mut session = Session::new()?;
//! session.assign("nums", json!([1, 2, 3]))?;
//! assert_eq!(session.evaluate("sum(nums)")?, json!(6));
//! # Ok(())
//! # }
//! ```

pub mod error;
mod events;
pub mod session;

pub use error::{Error, Result};
pub use session::Session;
