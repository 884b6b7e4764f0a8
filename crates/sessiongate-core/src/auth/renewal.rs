//! Single-flight renewal of the access credential.
//!
//! A renewal trades the refresh cookie for a new access credential via
//! `POST /auth/refresh`. While one exchange is outstanding every further
//! `renew()` call gets a clone of the same shared future, so the network
//! exchange happens once no matter how many callers are waiting. The exchange
//! runs on its own task, so it settles even when every caller has stopped
//! waiting. The slot is freed as soon as it settles, before any waiter sees
//! the result.

use std::sync::{Arc, Weak};

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tracing::{debug, warn};

use super::{AccessCredential, AuthTransport, RenewalError};

/// Handle on an outstanding renewal. Clone it freely; all clones resolve to the
/// same result.
pub type RenewalAttempt = Shared<BoxFuture<'static, Result<AccessCredential, RenewalError>>>;

struct InFlight {
    id: u64,
    attempt: RenewalAttempt,
}

#[derive(Default)]
struct AttemptSlot {
    current: Option<InFlight>,
    next_id: u64,
}

/// Frees the attempt slot when the exchange finishes, on every exit path.
struct SlotRelease {
    slot: Weak<Mutex<AttemptSlot>>,
    id: u64,
}

impl Drop for SlotRelease {
    fn drop(&mut self) {
        // Gone when the coordinator itself was dropped mid-attempt.
        let Some(slot) = self.slot.upgrade() else {
            return;
        };
        let mut slot = slot.lock();
        if slot.current.as_ref().is_some_and(|f| f.id == self.id) {
            slot.current = None;
        }
    }
}

/// Deduplicates concurrent renewal requests into one exchange.
///
/// Never writes the credential store: callers decide what to do with the
/// result. Never retries.
pub struct RenewalCoordinator<T> {
    transport: Arc<T>,
    cookie: Option<String>,
    slot: Arc<Mutex<AttemptSlot>>,
}

// Manual Clone: avoid derive adding a `T: Clone` bound.
impl<T> Clone for RenewalCoordinator<T> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            cookie: self.cookie.clone(),
            slot: self.slot.clone(),
        }
    }
}

impl<T: AuthTransport> RenewalCoordinator<T> {
    /// `cookie` is forwarded verbatim with every exchange; pass the inbound
    /// `Cookie` header on the server-rendering path and `None` on the client.
    pub fn new(transport: Arc<T>, cookie: Option<String>) -> Self {
        Self {
            transport,
            cookie,
            slot: Arc::new(Mutex::new(AttemptSlot::default())),
        }
    }

    /// Join the outstanding renewal, or start one if none is outstanding.
    ///
    /// The exchange is spawned immediately and runs to completion whether or
    /// not the returned future is awaited. Must be called within a Tokio runtime.
    pub fn renew(&self) -> RenewalAttempt {
        let mut slot = self.slot.lock();
        if let Some(in_flight) = slot.current.as_ref() {
            debug!(attempt = in_flight.id, "Joining outstanding renewal");
            return in_flight.attempt.clone();
        }

        slot.next_id += 1;
        let id = slot.next_id;
        let release = SlotRelease {
            slot: Arc::downgrade(&self.slot),
            id,
        };
        let transport = Arc::clone(&self.transport);
        let cookie = self.cookie.clone();

        let exchange = tokio::spawn(async move {
            debug!(attempt = id, forwarded_cookie = cookie.is_some(), "Renewal exchange started");
            let result = transport
                .refresh(cookie.as_deref())
                .await
                .map(AccessCredential::from)
                .map_err(RenewalError::from);
            drop(release);

            match &result {
                Ok(credential) => {
                    debug!(attempt = id, expires_in = credential.expires_in(), "Renewal succeeded")
                }
                Err(e) => warn!(attempt = id, error = %e, "Renewal failed"),
            }
            result
        });

        let attempt = async move {
            exchange.await.unwrap_or_else(|e| {
                Err(RenewalError::Transport(format!("Renewal task failed: {}", e)))
            })
        }
        .boxed()
        .shared();

        slot.current = Some(InFlight {
            id,
            attempt: attempt.clone(),
        });
        attempt
    }

    /// Whether a renewal attempt currently holds the slot.
    pub fn is_outstanding(&self) -> bool {
        self.slot.lock().current.is_some()
    }
}
