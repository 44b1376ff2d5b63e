//! Blocking dispatch loop

use anyhow::{Context, Result};
use log::{debug, trace};

/// Something that can block for and dispatch one batch of events
pub trait Dispatcher {
    /// Block until at least one event arrives and dispatch the batch.
    /// Returns the number of events dispatched.
    fn dispatch_batch(&mut self) -> Result<usize>;

    /// Whether a close request has been observed
    fn is_closed(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The window was closed; proceed with teardown
    Closed,
}

/// Dispatch until the dispatcher reports a close.
///
/// The closed flag is checked after every batch, so a close request ends the
/// loop once the batch it arrived in has been fully dispatched. Dispatch
/// errors are returned as-is.
pub fn run<D: Dispatcher>(dispatcher: &mut D) -> Result<LoopExit> {
    let mut batches: u64 = 0;

    while !dispatcher.is_closed() {
        let events = dispatcher
            .dispatch_batch()
            .context("Failed to dispatch display events")?;
        batches += 1;
        trace!("Batch {}: {} events", batches, events);
    }

    debug!("Event loop finished after {} batches", batches);
    Ok(LoopExit::Closed)
}
