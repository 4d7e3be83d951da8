//! Cancellation signal shared by walkers, reader tasks and consumers.
//!
//! A [`Cancellation`] is a cheap, cloneable handle over a
//! `tokio::sync::watch` flag. Once raised it stays raised. A child handle
//! observes its own flag and every ancestor's, so the locator can stop its
//! losing searches without touching the caller's handle.

use futures_util::future::BoxFuture;
use std::sync::Arc;
use tokio::sync::watch;

/// Cloneable cancellation handle.
#[derive(Debug, Clone)]
pub struct Cancellation {
    flag: Arc<watch::Sender<bool>>,
    parent: Option<Box<Cancellation>>,
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::new()
    }
}

impl Cancellation {
    /// Create a handle that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        let (flag, _) = watch::channel(false);
        Self {
            flag: Arc::new(flag),
            parent: None,
        }
    }

    /// Create a handle cancelled by either itself or `self`.
    #[must_use]
    pub fn child(&self) -> Self {
        let mut child = Self::new();
        child.parent = Some(Box::new(self.clone()));
        child
    }

    /// Raise the signal. Idempotent.
    pub fn cancel(&self) {
        self.flag.send_replace(true);
    }

    /// Returns true once this handle or any ancestor was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.flag.borrow() || self.parent.as_ref().is_some_and(|p| p.is_cancelled())
    }

    /// Resolves once this handle or any ancestor is cancelled.
    pub fn cancelled(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            let mut own = self.flag.subscribe();
            match &self.parent {
                Some(parent) => {
                    tokio::select! {
                        () = raised(&mut own) => {}
                        () = parent.cancelled() => {}
                    }
                }
                None => raised(&mut own).await,
            }
        })
    }
}

async fn raised(rx: &mut watch::Receiver<bool>) {
    // The sender lives as long as the handle, so an error cannot occur while
    // anyone is waiting.
    let _ = rx.wait_for(|cancelled| *cancelled).await;
}
