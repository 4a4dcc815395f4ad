use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::landmark::Delivery;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("camera access denied")]
    PermissionDenied,

    #[error("landmark source failed to initialize: {0}")]
    InitFailed(String),

    #[error("landmark source already has a subscriber")]
    AlreadySubscribed,
}

pub type FrameHandler = Box<dyn FnMut(Delivery)>;

/// A producer of landmark deliveries.
///
/// Consumers only see the frame shape; the detection backend behind it is
/// opaque. Deliveries from one source reach the handler in FIFO order.
pub trait LandmarkSource {
    fn subscribe(&mut self, handler: FrameHandler) -> Result<(), SourceError>;

    /// Hands every delivery that is due at `now` to the subscriber and
    /// returns how many were delivered.
    fn pump(&mut self, now: Duration) -> usize;
}

/// Single-slot mailbox that keeps only the most recent value.
///
/// Publishing over an unread value drops the older one; nothing queues up
/// behind a slow consumer.
#[derive(Debug)]
pub struct FrameSlot<T> {
    inner: Rc<RefCell<SlotState<T>>>,
}

#[derive(Debug)]
struct SlotState<T> {
    latest: Option<T>,
    published: u64,
    dropped: u64,
}

impl<T> Clone for FrameSlot<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Default for FrameSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FrameSlot<T> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(SlotState {
                latest: None,
                published: 0,
                dropped: 0,
            })),
        }
    }

    pub fn publish(&self, value: T) {
        let mut state = self.inner.borrow_mut();
        if state.latest.replace(value).is_some() {
            state.dropped += 1;
        }
        state.published += 1;
    }

    pub fn take(&self) -> Option<T> {
        self.inner.borrow_mut().latest.take()
    }

    pub fn published(&self) -> u64 {
        self.inner.borrow().published
    }

    pub fn dropped(&self) -> u64 {
        self.inner.borrow().dropped
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptedDelivery {
    pub at_ms: u64,
    pub delivery: Delivery,
}

/// Replays a fixed list of timestamped deliveries.
///
/// Used wherever a real detector is unavailable: tests, demos and recorded
/// sessions loaded from JSON.
pub struct ScriptedSource {
    pending: VecDeque<ScriptedDelivery>,
    handler: Option<FrameHandler>,
    failure: Option<SourceError>,
}

impl std::fmt::Debug for ScriptedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedSource")
            .field("pending", &self.pending.len())
            .field("subscribed", &self.handler.is_some())
            .field("failure", &self.failure)
            .finish()
    }
}

impl ScriptedSource {
    pub fn new(mut script: Vec<ScriptedDelivery>) -> Self {
        script.sort_by_key(|d| d.at_ms);
        Self {
            pending: script.into(),
            handler: None,
            failure: None,
        }
    }

    /// A source whose initialization always fails with `error`.
    pub fn failing(error: SourceError) -> Self {
        Self {
            pending: VecDeque::new(),
            handler: None,
            failure: Some(error),
        }
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        let script: Vec<ScriptedDelivery> = serde_json::from_str(text)?;
        Ok(Self::new(script))
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    pub fn is_exhausted(&self) -> bool {
        self.pending.is_empty()
    }
}

impl LandmarkSource for ScriptedSource {
    fn subscribe(&mut self, handler: FrameHandler) -> Result<(), SourceError> {
        if let Some(err) = &self.failure {
            warn!(%err, "scripted source refused subscription");
            return Err(err.clone());
        }
        if self.handler.is_some() {
            warn!("scripted source already has a subscriber");
            return Err(SourceError::AlreadySubscribed);
        }
        self.handler = Some(handler);
        debug!(pending = self.pending.len(), "scripted source subscribed");
        Ok(())
    }

    fn pump(&mut self, now: Duration) -> usize {
        let Some(handler) = self.handler.as_mut() else {
            return 0;
        };
        let now_ms = now.as_millis().min(u64::MAX as u128) as u64;
        let mut delivered = 0;
        while self.pending.front().is_some_and(|d| d.at_ms <= now_ms) {
            if let Some(next) = self.pending.pop_front() {
                handler(next.delivery);
                delivered += 1;
            }
        }
        delivered
    }
}
