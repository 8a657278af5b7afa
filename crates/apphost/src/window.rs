//! In-process model of browser windows and `postMessage`.
//!
//! Each window owns a broadcast channel of incoming [`MessageEvent`]s. A
//! listener is a [`Subscription`]; dropping it detaches the listener. Messages
//! are deep-copied through their JSON text on every post, so no value is ever
//! shared between two windows.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

const MESSAGE_CAPACITY: usize = 64;

static NEXT_WINDOW_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowId(u64);

#[derive(Debug, Clone)]
pub struct MessageEvent {
    pub data: Value,
    /// Origin of the sending window, empty when the sender is anonymous.
    pub origin: String,
    pub source: Option<WindowHandle>,
}

#[derive(Debug, Error)]
pub enum PostMessageError {
    #[error("target origin {target} does not match window origin {actual}")]
    OriginMismatch { target: String, actual: String },
    #[error("message could not be cloned: {0}")]
    Clone(#[from] serde_json::Error),
}

/// A reference to a window that can receive messages.
#[derive(Clone)]
pub struct WindowHandle {
    id: WindowId,
    origin: Arc<str>,
    sender: broadcast::Sender<MessageEvent>,
}

impl fmt::Debug for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowHandle")
            .field("id", &self.id)
            .field("origin", &self.origin)
            .finish()
    }
}

impl WindowHandle {
    pub fn id(&self) -> WindowId {
        self.id
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Delivers a copy of `data` to this window's listeners.
    ///
    /// `target_origin` is either `*` or must equal the receiving origin.
    /// Posting to a window with no listeners succeeds and drops the message.
    pub fn post_message(
        &self,
        data: &Value,
        target_origin: &str,
        source: Option<&Window>,
    ) -> Result<(), PostMessageError> {
        if target_origin != "*" && target_origin != &*self.origin {
            return Err(PostMessageError::OriginMismatch {
                target: target_origin.to_string(),
                actual: self.origin.to_string(),
            });
        }

        let data: Value = serde_json::from_str(&serde_json::to_string(data)?)?;
        let event = MessageEvent {
            data,
            origin: source
                .map(|window| window.origin().to_string())
                .unwrap_or_default(),
            source: source.map(Window::handle),
        };
        let _ = self.sender.send(event);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Window {
    handle: WindowHandle,
    parent: Option<WindowHandle>,
    query: Arc<HashMap<String, String>>,
}

impl Window {
    /// A window that is its own top (not embedded in another window).
    pub fn top_level(origin: impl Into<String>) -> Self {
        Self::build(origin.into(), None, HashMap::new())
    }

    /// Opens a window embedded in this one, e.g. a dialog iframe.
    pub fn embed(&self, origin: impl Into<String>, query: HashMap<String, String>) -> Self {
        Self::build(origin.into(), Some(self.handle.clone()), query)
    }

    fn build(origin: String, parent: Option<WindowHandle>, query: HashMap<String, String>) -> Self {
        let (sender, _) = broadcast::channel(MESSAGE_CAPACITY);
        Self {
            handle: WindowHandle {
                id: WindowId(NEXT_WINDOW_ID.fetch_add(1, Ordering::Relaxed)),
                origin: Arc::from(origin),
                sender,
            },
            parent,
            query: Arc::new(query),
        }
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.query).insert(name.into(), value.into());
        self
    }

    pub fn id(&self) -> WindowId {
        self.handle.id
    }

    pub fn origin(&self) -> &str {
        self.handle.origin()
    }

    pub fn handle(&self) -> WindowHandle {
        self.handle.clone()
    }

    pub fn parent(&self) -> Option<&WindowHandle> {
        self.parent.as_ref()
    }

    pub fn is_top_level(&self) -> bool {
        self.parent.is_none()
    }

    /// Already-decoded value of a query parameter, as `URLSearchParams.get` returns it.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// Attaches a message listener.
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            receiver: self.handle.sender.subscribe(),
        }
    }

    /// Number of attached listeners.
    pub fn listener_count(&self) -> usize {
        self.handle.sender.receiver_count()
    }
}

/// An attached message listener; dropping it detaches.
pub struct Subscription {
    receiver: broadcast::Receiver<MessageEvent>,
}

impl Subscription {
    pub async fn recv(&mut self) -> Option<MessageEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "message listener lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Resolves with the first event `matcher` accepts, then detaches.
    pub async fn first_match<T, F>(mut self, mut matcher: F) -> Option<T>
    where
        F: FnMut(&MessageEvent) -> Option<T>,
    {
        while let Some(event) = self.recv().await {
            if let Some(value) = matcher(&event) {
                return Some(value);
            }
        }
        None
    }
}
