//! Profile persistence, inline or on a background thread
//!
//! Background mode queues full snapshots over a channel. The worker keeps
//! only the newest queued snapshot, since it already contains every earlier
//! update, so writes for a word can never land out of order.

use chrono::Utc;
use std::io;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

use crate::embedding::EmbeddingModel;
use crate::error::{Error, Result};
use crate::ledger::PerformanceLedger;
use crate::storage::{self, ProfilePaths};

/// How a profile persists after each recorded outcome
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PersistMode {
    /// Write both stores synchronously inside the mark call
    #[default]
    WriteThrough,
    /// Hand snapshots to a dedicated writer thread
    Background,
}

/// Owned copy of both stores at one point in time
pub(crate) struct Snapshot {
    pub ledger: PerformanceLedger,
    pub embeddings: EmbeddingModel,
}

enum Command {
    Write(Snapshot),
    Save(Snapshot, Sender<Result<()>>),
    Flush(Sender<()>),
}

/// Write both stores, returning the first error
pub(crate) fn save_stores(
    paths: &ProfilePaths,
    ledger: &PerformanceLedger,
    embeddings: &EmbeddingModel,
) -> Result<()> {
    storage::save_ledger(&paths.history, ledger)?;
    storage::save_embeddings(&paths.embeddings, embeddings, Utc::now())
}

/// Write both stores, logging failures. Returns true if both succeeded.
pub(crate) fn write_stores(
    paths: &ProfilePaths,
    ledger: &PerformanceLedger,
    embeddings: &EmbeddingModel,
) -> bool {
    let mut ok = true;

    if let Err(e) = storage::save_ledger(&paths.history, ledger) {
        warn!(
            "Could not save user profile to {}: {}",
            paths.history.display(),
            e
        );
        ok = false;
    }

    if let Err(e) = storage::save_embeddings(&paths.embeddings, embeddings, Utc::now()) {
        warn!(
            "Could not save model to {}: {}",
            paths.embeddings.display(),
            e
        );
        ok = false;
    }

    ok
}

fn writer_gone() -> Error {
    Error::Io(io::Error::other("profile writer thread is gone"))
}

/// Dedicated persistence thread for one profile
pub(crate) struct BackgroundWriter {
    sender: Option<Sender<Command>>,
    handle: Option<JoinHandle<()>>,
}

impl BackgroundWriter {
    pub fn spawn(paths: ProfilePaths) -> Result<Self> {
        let (sender, receiver) = channel();

        let handle = thread::Builder::new()
            .name("vocab-profile-writer".to_string())
            .spawn(move || Self::process(receiver, paths))?;

        Ok(Self {
            sender: Some(sender),
            handle: Some(handle),
        })
    }

    /// Queue a snapshot for writing
    pub fn submit(&self, snapshot: Snapshot) {
        if let Some(sender) = &self.sender
            && let Err(e) = sender.send(Command::Write(snapshot))
        {
            warn!("Failed to queue profile snapshot: {}", e);
        }
    }

    /// Write `snapshot` after everything queued before it and report the result
    pub fn save(&self, snapshot: Snapshot) -> Result<()> {
        let Some(sender) = &self.sender else {
            return Err(writer_gone());
        };

        let (reply_tx, reply_rx) = channel();
        sender
            .send(Command::Save(snapshot, reply_tx))
            .map_err(|_| writer_gone())?;
        reply_rx.recv().map_err(|_| writer_gone())?
    }

    /// Block until every snapshot queued so far has been written
    pub fn flush(&self) {
        let Some(sender) = &self.sender else {
            return;
        };

        let (ack_tx, ack_rx) = channel();
        if sender.send(Command::Flush(ack_tx)).is_err() {
            warn!("Profile writer is gone; nothing to flush");
            return;
        }
        let _ = ack_rx.recv();
    }

    fn process(receiver: Receiver<Command>, paths: ProfilePaths) {
        let mut written = 0usize;

        while let Ok(first) = receiver.recv() {
            let mut latest = None;
            let mut acks = Vec::new();
            let mut replies = Vec::new();

            // drain whatever queued up behind the first command
            let mut next = Some(first);
            while let Some(command) = next {
                match command {
                    Command::Write(snapshot) => latest = Some(snapshot),
                    Command::Save(snapshot, reply) => {
                        latest = Some(snapshot);
                        replies.push(reply);
                    }
                    Command::Flush(ack) => acks.push(ack),
                }
                next = receiver.try_recv().ok();
            }

            if let Some(snapshot) = latest {
                let result = if replies.is_empty() {
                    write_stores(&paths, &snapshot.ledger, &snapshot.embeddings);
                    Ok(())
                } else {
                    save_stores(&paths, &snapshot.ledger, &snapshot.embeddings)
                };
                written += 1;
                debug!("Wrote profile snapshot #{}", written);

                match result {
                    Ok(()) => {
                        for reply in replies {
                            let _ = reply.send(Ok(()));
                        }
                    }
                    Err(e) => {
                        warn!("Could not save profile: {}", e);
                        let message = e.to_string();
                        for reply in replies {
                            let _ = reply.send(Err(Error::Io(io::Error::other(message.clone()))));
                        }
                    }
                }
            }

            for ack in acks {
                let _ = ack.send(());
            }
        }

        info!("Profile writer shutting down after {} writes", written);
    }
}

impl Drop for BackgroundWriter {
    fn drop(&mut self) {
        // closing the channel lets the worker drain and exit
        self.sender.take();
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            warn!("Profile writer thread panicked");
        }
    }
}
