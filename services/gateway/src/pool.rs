//! Request envelope pool.
//!
//! Building a wire payload needs a request struct, a form builder, and an
//! XML writer; pooling them keeps the per-call allocation count flat under
//! load. The pool's only correctness obligation is that no sensitive field
//! survives across acquisitions: the RAII guard scrubs on release, and
//! acquisition re-scrubs defensively so a poisoned entry can never leak.

use epx_wire::{FormBuilder, RequestWriter};
use parking_lot::Mutex;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use crate::request::TransactionRequest;

/// One reusable unit of request-building state.
#[derive(Debug, Default)]
pub struct Envelope {
    /// The request being built or sent.
    pub request: TransactionRequest,
    /// Form body builder for the HTTPS channels.
    pub form: FormBuilder,
    /// XML writer for the BRIC and socket channels.
    pub xml: RequestWriter,
}

impl Envelope {
    /// Zeroize every sensitive field across all three members.
    pub fn scrub(&mut self) {
        self.request.scrub();
        self.form.clear();
        self.xml.clear();
    }
}

/// Statistics for pool monitoring.
#[derive(Debug, Clone, Copy, Default)]
pub struct PoolStats {
    /// Envelopes currently idle in the pool.
    pub idle: usize,
    /// Total acquisitions served.
    pub total_acquired: u64,
    /// Acquisitions that allocated a fresh envelope.
    pub total_created: u64,
}

/// Bounded pool of request envelopes.
pub struct RequestPool {
    idle: Mutex<Vec<Box<Envelope>>>,
    max_idle: usize,
    stats: Mutex<PoolStats>,
}

impl RequestPool {
    /// Create a pool retaining at most `max_idle` idle envelopes.
    pub fn new(max_idle: usize) -> Arc<Self> {
        Arc::new(Self {
            idle: Mutex::new(Vec::with_capacity(max_idle)),
            max_idle,
            stats: Mutex::new(PoolStats::default()),
        })
    }

    /// Acquire a scrubbed envelope, reusing an idle one when available.
    pub fn acquire(self: &Arc<Self>) -> PooledEnvelope {
        let reused = self.idle.lock().pop();
        let mut envelope = match reused {
            Some(envelope) => envelope,
            None => {
                self.stats.lock().total_created += 1;
                Box::default()
            }
        };
        // Entries are scrubbed on release; scrub again so a future bug in a
        // release path cannot hand one caller another caller's PAN.
        envelope.scrub();
        self.stats.lock().total_acquired += 1;
        PooledEnvelope {
            envelope: Some(envelope),
            pool: Arc::clone(self),
        }
    }

    /// Current pool statistics.
    pub fn stats(&self) -> PoolStats {
        let mut stats = *self.stats.lock();
        stats.idle = self.idle.lock().len();
        stats
    }

    fn release(&self, mut envelope: Box<Envelope>) {
        envelope.scrub();
        let mut idle = self.idle.lock();
        if idle.len() < self.max_idle {
            idle.push(envelope);
        }
    }
}

/// RAII guard that scrubs and returns its envelope to the pool on drop.
pub struct PooledEnvelope {
    envelope: Option<Box<Envelope>>,
    pool: Arc<RequestPool>,
}

impl Deref for PooledEnvelope {
    type Target = Envelope;

    fn deref(&self) -> &Self::Target {
        self.envelope.as_ref().expect("envelope taken before drop")
    }
}

impl DerefMut for PooledEnvelope {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.envelope.as_mut().expect("envelope taken before drop")
    }
}

impl Drop for PooledEnvelope {
    fn drop(&mut self) {
        if let Some(envelope) = self.envelope.take() {
            self.pool.release(envelope);
        }
    }
}
