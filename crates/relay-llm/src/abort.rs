//! Deferred cancellation for in-flight requests

use std::fmt;

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

/// Cancels one request
///
/// Cloning is cheap and every clone cancels the same request. Aborting is
/// idempotent and a no-op once the request has finished.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle {
    token: CancellationToken,
}

impl AbortHandle {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Stop the request
    ///
    /// If the transport is not established yet, the cancellation is held and
    /// applied as soon as it is.
    pub fn abort(&self) {
        self.token.cancel();
    }

    /// Whether [`abort`](Self::abort) has been called
    pub fn is_aborted(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the request is aborted
    pub(crate) async fn aborted(&self) {
        self.token.cancelled().await;
    }
}

type Setter = Box<dyn FnOnce(AbortHandle) + Send + Sync>;

/// Caller-supplied receiver for a request's [`AbortHandle`]
///
/// The adapter invokes it exactly once per request, before the first network
/// call is issued.
pub struct AbortRegistration(Setter);

impl AbortRegistration {
    pub fn new(setter: impl FnOnce(AbortHandle) + Send + Sync + 'static) -> Self {
        Self(Box::new(setter))
    }

    /// Registration paired with a receiver that yields the handle
    pub fn channel() -> (Self, oneshot::Receiver<AbortHandle>) {
        let (tx, rx) = oneshot::channel();
        let registration = Self::new(move |handle| {
            // The caller may have dropped the receiver; the request still runs
            let _ = tx.send(handle);
        });
        (registration, rx)
    }

    pub(crate) fn register(self, handle: AbortHandle) {
        (self.0)(handle);
    }
}

impl fmt::Debug for AbortRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbortRegistration").finish_non_exhaustive()
    }
}

/// Create the handle for a new request and hand it to the caller, if they asked for one
pub(crate) fn install(registration: Option<AbortRegistration>) -> AbortHandle {
    let handle = AbortHandle::new();
    if let Some(registration) = registration {
        registration.register(handle.clone());
    }
    handle
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn channel_receives_the_installed_handle() {
        let (registration, rx) = AbortRegistration::channel();
        let handle = install(Some(registration));

        let remote = rx.await.unwrap();
        assert!(!handle.is_aborted());
        remote.abort();
        assert!(handle.is_aborted());
    }

    #[tokio::test]
    async fn early_abort_is_observed_later() {
        let handle = install(None);
        handle.abort();
        handle.abort();
        // Resolves immediately because the cancellation was held
        handle.aborted().await;
        assert!(handle.is_aborted());
    }
}
