//! Driver callbacks raised by the interpreter during evaluation.

/// Output stream a console chunk belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleStream {
    Stdout,
    Stderr,
}

/// Hooks an embedding driver installs to observe interpreter activity.
///
/// All methods default to no-ops. Delivery is synchronous: the interpreter
/// calls into the hook from inside `eval`, before `eval` returns.
pub trait Callbacks: Send {
    /// Console output produced by `print` and `cat`.
    fn write_console(&self, _text: &str, _stream: ConsoleStream) {}

    /// Diagnostic text produced by `message` and non-quiet package loads.
    fn show_message(&self, _text: &str) {}

    /// The interpreter judged its own state unrecoverable. The evaluation
    /// that tripped this also fails; the hook fires first.
    fn fatal(&self, _text: &str) {}
}

/// Default hook set: console text goes to the process streams.
pub struct StdConsole;

impl Callbacks for StdConsole {
    fn write_console(&self, text: &str, stream: ConsoleStream) {
        match stream {
            ConsoleStream::Stdout => print!("{}", text),
            ConsoleStream::Stderr => eprint!("{}", text),
        }
    }

    fn show_message(&self, text: &str) {
        eprintln!("{}", text);
    }
}
