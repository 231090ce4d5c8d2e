// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process emitter/response pair.
//!
//! Values cross on a capacity-1 channel carrying a per-value acknowledgment:
//! `emit` returns only once the reader has actually accepted the value,
//! which gives rendezvous back-pressure. A watch flag is the metadata gate —
//! `head`/`length`/`error` block on it until the first emit or any terminal
//! close. Dropping the sender is the closed signal the reader drains past.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot, watch};

use crate::emitter::{
    warn_error_value, EmitterKind, Head, Item, Payload, Response, ResponseEmitter,
};
use crate::error::Error;
use crate::request::Request;

type Slot = (Payload, oneshot::Sender<()>);

struct State {
    length: u64,
    emitted: bool,
    closed: bool,
    error: Option<Error>,
}

struct Shared {
    state: Mutex<State>,
    meta: watch::Sender<bool>,
}

impl Shared {
    fn open_meta_gate(&self) {
        let _ = self.meta.send(true);
    }
}

/// Create a connected emitter/response pair for `req`.
pub fn channel_pair(req: Arc<Request>) -> (ChannelEmitter, ChannelResponse) {
    let (meta, meta_rx) = watch::channel(false);
    let (tx, rx) = mpsc::channel(1);
    let shared = Arc::new(Shared {
        state: Mutex::new(State { length: 0, emitted: false, closed: false, error: None }),
        meta,
    });
    let emitter = ChannelEmitter { shared: shared.clone(), tx: Some(tx), req: req.clone() };
    let response = ChannelResponse { shared, rx, meta_rx, req, done: None };
    (emitter, response)
}

/// Write side of an in-process pair.
pub struct ChannelEmitter {
    shared: Arc<Shared>,
    tx: Option<mpsc::Sender<Slot>>,
    req: Arc<Request>,
}

impl ChannelEmitter {
    /// One-shot terminal transition. The first close wins; later closes get
    /// the closing-closed-emitter error.
    fn finish(&mut self, error: Option<Error>) -> Result<(), Error> {
        {
            let mut state = self.shared.state.lock();
            if state.closed {
                return Err(Error::closing_closed_emitter());
            }
            state.closed = true;
            state.error = error;
        }
        // Dropping the sender is what unblocks a reader parked in recv.
        self.tx = None;
        self.shared.open_meta_gate();
        Ok(())
    }

    fn record_cancelled(&mut self) -> Error {
        let err = Error::cancelled();
        let _ = self.finish(Some(err.clone()));
        err
    }
}

#[async_trait]
impl ResponseEmitter for ChannelEmitter {
    fn kind(&self) -> EmitterKind {
        EmitterKind::Channel
    }

    fn set_length(&mut self, length: u64) {
        let mut state = self.shared.state.lock();
        if !state.emitted {
            state.length = length;
        }
    }

    async fn emit(&mut self, value: Payload) -> Result<(), Error> {
        let value = match value {
            Payload::Sequence(mut rx) => {
                while let Some(inner) = rx.recv().await {
                    self.emit(inner).await?;
                }
                return Ok(());
            }
            other => other,
        };
        if let Payload::Value(v) | Payload::Single(v) = &value {
            warn_error_value(v);
        }

        let single = matches!(value, Payload::Single(_));
        {
            let mut state = self.shared.state.lock();
            if state.closed {
                return Err(Error::closed_emitter());
            }
            state.emitted = true;
        }
        // Unblock head/length/error before the handoff can park us.
        self.shared.open_meta_gate();

        let Some(tx) = self.tx.clone() else {
            return Err(Error::closed_emitter());
        };
        let (ack_tx, ack_rx) = oneshot::channel();
        tokio::select! {
            sent = tx.send((value, ack_tx)) => {
                if sent.is_err() {
                    return Err(Error::closed_emitter());
                }
            }
            _ = self.req.token.cancelled() => return Err(self.record_cancelled()),
        }
        tokio::select! {
            accepted = ack_rx => {
                if accepted.is_err() {
                    return Err(Error::closed_emitter());
                }
            }
            _ = self.req.token.cancelled() => return Err(self.record_cancelled()),
        }

        if single {
            // Single implies a normal close as part of the same emit.
            let _ = self.finish(None);
        }
        Ok(())
    }

    async fn close_with_error(&mut self, error: Option<Error>) -> Result<(), Error> {
        self.finish(error)
    }
}

impl Drop for ChannelEmitter {
    // Safety net for writers that never close; the executor's close-last
    // rule makes this a no-op in normal operation.
    fn drop(&mut self) {
        let _ = self.finish(None);
    }
}

/// Read side of an in-process pair.
pub struct ChannelResponse {
    shared: Arc<Shared>,
    rx: mpsc::Receiver<Slot>,
    meta_rx: watch::Receiver<bool>,
    req: Arc<Request>,
    /// Terminal signal once observed; replayed by every later `next`.
    done: Option<Option<Error>>,
}

#[async_trait]
impl Response for ChannelResponse {
    fn request(&self) -> &Arc<Request> {
        &self.req
    }

    async fn head(&mut self) -> Head {
        let _ = self.meta_rx.wait_for(|open| *open).await;
        let state = self.shared.state.lock();
        Head { length: state.length, error: state.error.clone() }
    }

    async fn error(&mut self) -> Option<Error> {
        if let Some(done) = &self.done {
            return done.clone();
        }
        self.head().await.error
    }

    async fn next(&mut self) -> Result<Option<Item>, Error> {
        if let Some(done) = &self.done {
            return match done {
                Some(err) => Err(err.clone()),
                None => Ok(None),
            };
        }
        tokio::select! {
            slot = self.rx.recv() => match slot {
                Some((value, ack)) => {
                    let _ = ack.send(());
                    match value {
                        Payload::Value(v) | Payload::Single(v) => Ok(Some(Item::Value(v))),
                        Payload::Stream(source) => Ok(Some(Item::Bytes(source))),
                        // The emitter drains sequences before the handoff.
                        Payload::Sequence(_) => {
                            Err(Error::implementation("sequence crossed the channel"))
                        }
                    }
                }
                None => {
                    let error = self.shared.state.lock().error.clone();
                    self.done = Some(error.clone());
                    match error {
                        Some(err) => Err(err),
                        None => Ok(None),
                    }
                }
            },
            _ = self.req.token.cancelled() => {
                let err = Error::cancelled();
                self.done = Some(Some(err.clone()));
                Err(err)
            }
        }
    }
}

#[cfg(test)]
#[path = "chan_tests.rs"]
mod tests;
