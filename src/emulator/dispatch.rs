use crate::debugger::error::Error;
use crate::emulator::framer::Tokens;
use std::collections::HashMap;

/// Handler of an unsolicited event.
pub type EventHandler<C> = Box<dyn Fn(&C, Tokens) -> Result<(), Error> + Send + Sync>;

/// Routes unsolicited events to handlers by event type name.
pub struct EventDispatcher<C> {
    handlers: HashMap<String, EventHandler<C>>,
}

impl<C> Default for EventDispatcher<C> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }
}

impl<C> EventDispatcher<C> {
    /// Register handler for an event type, previous handler for the same type is replaced.
    pub fn register(
        &mut self,
        kind: impl Into<String>,
        handler: impl Fn(&C, Tokens) -> Result<(), Error> + Send + Sync + 'static,
    ) {
        self.handlers.insert(kind.into(), Box::new(handler));
    }

    /// Call handler registered for event type.
    /// Return `Ok(false)` if there is no such handler, the event is dropped in this case.
    pub fn dispatch(&self, ctx: &C, kind: &str, args: Tokens) -> Result<bool, Error> {
        match self.handlers.get(kind) {
            None => Ok(false),
            Some(handler) => handler(ctx, args).map(|_| true),
        }
    }
}
