//! A simple handler that accumulates records in memory for test assertions.
//!
//! Clones share storage, so a test keeps one clone while the logger owns
//! the other.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::handler::{Handler, HandlerError};
use crate::log_record::LogRecord;

/// What the handler does after storing a record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Reaction {
    #[default]
    Pass,
    StopPropagation,
    Fail,
}

/// Handler that stores every record it receives for later inspection.
#[derive(Clone, Default)]
pub struct CollectingHandler {
    name: &'static str,
    reaction: Reaction,
    records: Arc<Mutex<Vec<LogRecord>>>,
    order: Option<Arc<Mutex<Vec<&'static str>>>>,
}

impl CollectingHandler {
    /// Create a new empty handler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `name` into the shared `order` log on every call.
    pub fn named(name: &'static str, order: &Arc<Mutex<Vec<&'static str>>>) -> Self {
        Self {
            name,
            order: Some(Arc::clone(order)),
            ..Self::default()
        }
    }

    pub fn reacting(mut self, reaction: Reaction) -> Self {
        self.reaction = reaction;
        self
    }

    /// Return a snapshot of all records received so far.
    pub fn collected(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }
}

impl Handler for CollectingHandler {
    fn handle(&mut self, record: &mut LogRecord) -> Result<(), HandlerError> {
        self.records.lock().push(record.clone());
        if let Some(order) = &self.order {
            order.lock().push(self.name);
        }
        match self.reaction {
            Reaction::Pass => Ok(()),
            Reaction::StopPropagation => {
                record.stop_propagation();
                Ok(())
            }
            Reaction::Fail => Err(HandlerError::Io(std::io::Error::other("scripted failure"))),
        }
    }
}
