//! Ordered background writer
//!
//! One writer thread per persistent manager. Snapshots are serialized on the
//! caller's thread (so they capture the record exactly as of each `set`) and
//! then sealed and stored here, strictly in submission order. PBKDF2 runs on
//! this thread, keeping `set` itself cheap.

use crate::persistence::{PersistError, Persistence};
use crossbeam_channel::{Receiver, Sender, bounded};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use zeroize::Zeroizing;

/// Pending saves a manager may queue before `set` waits for the writer
const QUEUE_CAPACITY: usize = 64;

enum WriteCommand {
    /// Seal and store this serialized record
    Save(Zeroizing<String>),
    /// Reply with what failed since the previous flush
    Flush {
        response_tx: Sender<Failures>,
    },
}

/// Failed saves since the last flush: the first error and how many there were
#[derive(Debug, Default)]
pub(crate) struct Failures {
    first: Option<PersistError>,
    count: usize,
}

impl Failures {
    fn record(&mut self, error: PersistError) {
        if self.first.is_none() {
            self.first = Some(error);
        }
        self.count += 1;
    }
}

/// Why a flush could not report back
#[derive(Debug)]
pub(crate) enum FlushError {
    /// At least one save failed since the previous flush
    Failed { first: PersistError, count: usize },
    /// The writer thread is gone
    Stopped,
}

pub(crate) struct WriteQueue {
    sender: Option<Sender<WriteCommand>>,
    handle: Option<JoinHandle<()>>,
}

impl WriteQueue {
    pub(crate) fn spawn(persistence: Arc<Persistence>) -> std::io::Result<Self> {
        let (sender, receiver) = bounded(QUEUE_CAPACITY);

        let handle = thread::Builder::new()
            .name(format!("statekit-writer:{}", persistence.storage_key()))
            .spawn(move || run(&persistence, receiver))?;

        Ok(WriteQueue {
            sender: Some(sender),
            handle: Some(handle),
        })
    }

    /// Queue a save, waiting for room when the queue is full.
    /// Returns `false` if the writer has stopped.
    pub(crate) fn submit(&self, serialized: String) -> bool {
        match &self.sender {
            Some(sender) => sender
                .send(WriteCommand::Save(Zeroizing::new(serialized)))
                .is_ok(),
            None => false,
        }
    }

    /// Block until every save queued so far has been attempted
    pub(crate) fn flush(&self) -> Result<(), FlushError> {
        let sender = self.sender.as_ref().ok_or(FlushError::Stopped)?;
        let (response_tx, response_rx) = bounded(1);

        sender
            .send(WriteCommand::Flush { response_tx })
            .map_err(|_| FlushError::Stopped)?;

        let failures = response_rx.recv().map_err(|_| FlushError::Stopped)?;
        match failures.first {
            Some(first) => Err(FlushError::Failed {
                first,
                count: failures.count,
            }),
            None => Ok(()),
        }
    }
}

impl Drop for WriteQueue {
    fn drop(&mut self) {
        // Closing the channel lets the writer drain what is queued, then exit
        drop(self.sender.take());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("state writer thread panicked");
            }
        }
    }
}

fn run(persistence: &Persistence, receiver: Receiver<WriteCommand>) {
    let mut failures = Failures::default();

    for command in receiver {
        match command {
            WriteCommand::Save(serialized) => {
                if let Err(e) = persistence.save(&serialized) {
                    tracing::warn!(
                        storage_key = %persistence.storage_key(),
                        error = %e,
                        "failed to persist state"
                    );
                    failures.record(e);
                }
            }
            WriteCommand::Flush { response_tx } => {
                // The flusher may have given up waiting; nothing to do then
                let _ = response_tx.send(std::mem::take(&mut failures));
            }
        }
    }
}
