//! Per-key ordering of runtime cache writes.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use offline_cache::{CacheHandle, CacheResult, RequestKey};
use offline_core::{Request, Response};

/// Last committed ticket for one key. Held across the put.
type Slot = Arc<tokio::sync::Mutex<Option<u64>>>;

#[derive(Debug, Default)]
struct Issued {
    next: u64,
    outstanding: BTreeSet<u64>,
}

/// Position of a fetch in issue order.
///
/// A ticket stays outstanding until it is written or dropped.
#[derive(Debug)]
pub struct WriteTicket {
    seq: u64,
    issued: Arc<Mutex<Issued>>,
}

impl Drop for WriteTicket {
    fn drop(&mut self) {
        lock(&self.issued).outstanding.remove(&self.seq);
    }
}

/// Orders writes to the same key by when their fetch was issued.
///
/// A write carrying a ticket older than the last committed ticket for its key
/// is dropped, so once all writes settle the entry holds the response of the
/// most recently issued fetch. Writes to different keys never wait on each
/// other.
#[derive(Debug, Default)]
pub struct WriteSequencer {
    issued: Arc<Mutex<Issued>>,
    slots: Mutex<HashMap<RequestKey, Slot>>,
}

impl WriteSequencer {
    /// Create a sequencer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a ticket. Call this when the fetch is issued.
    pub fn ticket(&self) -> WriteTicket {
        let mut issued = lock(&self.issued);
        let seq = issued.next;
        issued.next += 1;
        issued.outstanding.insert(seq);
        WriteTicket {
            seq,
            issued: Arc::clone(&self.issued),
        }
    }

    /// Store `response` unless a newer write for the same key already landed.
    ///
    /// Returns whether the write was applied.
    pub async fn write(
        &self,
        cache: &dyn CacheHandle,
        request: &Request,
        response: &Response,
        ticket: WriteTicket,
    ) -> CacheResult<bool> {
        let key = RequestKey::from_request(request);
        let slot = Arc::clone(lock(&self.slots).entry(key.clone()).or_default());

        let result = {
            let mut committed = slot.lock().await;
            if committed.is_some_and(|last| last > ticket.seq) {
                tracing::debug!(key = %key, "dropping superseded cache write");
                Ok(false)
            } else {
                cache.put(request, response).await.map(|()| {
                    *committed = Some(ticket.seq);
                    true
                })
            }
        };

        drop(ticket);
        drop(slot);
        self.prune();
        result
    }

    /// Forget idle keys that no outstanding ticket could still lose to.
    fn prune(&self) {
        let oldest = lock(&self.issued).outstanding.first().copied();
        lock(&self.slots).retain(|_, slot| !removable(slot, oldest));
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        lock(&self.slots).len()
    }
}

fn removable(slot: &Slot, oldest: Option<u64>) -> bool {
    if Arc::strong_count(slot) > 1 {
        return false;
    }
    match slot.try_lock() {
        Ok(committed) => match (*committed, oldest) {
            (Some(last), Some(oldest)) => last < oldest,
            _ => true,
        },
        Err(_) => false,
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
