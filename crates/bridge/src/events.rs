//! Routing of interpreter notifications to host-registered callbacks.

use std::sync::{Arc, Mutex};

use statlink_engine::{Callbacks, ConsoleStream};

/// A registered host callback: one positional text argument, no return.
pub(crate) type EventCallback = Box<dyn FnMut(&str) + Send>;

/// The three callback slots of a session.
///
/// Slots start unset; delivery to an unset slot drops the event silently.
/// The session holds one side of the `Arc` (registration), the sink
/// installed into the interpreter holds the other (delivery).
#[derive(Default)]
pub(crate) struct SinkSlots {
    pub(crate) console: Mutex<Option<EventCallback>>,
    pub(crate) message: Mutex<Option<EventCallback>>,
    pub(crate) fatal: Mutex<Option<EventCallback>>,
}

impl SinkSlots {
    fn deliver(slot: &Mutex<Option<EventCallback>>, text: &str) {
        if let Some(callback) = slot.lock().unwrap().as_mut() {
            callback(text);
        }
    }
}

/// Installed into the interpreter as its callback set; forwards each
/// notification to the matching host slot, synchronously, during the
/// evaluation that raised it.
pub(crate) struct EventSink {
    pub(crate) slots: Arc<SinkSlots>,
}

impl Callbacks for EventSink {
    fn write_console(&self, text: &str, _stream: ConsoleStream) {
        // The stream tag stops here: host callbacks receive text only.
        SinkSlots::deliver(&self.slots.console, text);
    }

    fn show_message(&self, text: &str) {
        SinkSlots::deliver(&self.slots.message, text);
    }

    fn fatal(&self, text: &str) {
        SinkSlots::deliver(&self.slots.fatal, text);
    }
}
