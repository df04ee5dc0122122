use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use tracing::debug;

use diffhub_types::{ComparisonRequest, ComparisonStatus, DiffResult, RequestId, TypeError};

use crate::error::{StoreError, StoreResult};
use crate::traits::{ClaimOutcome, ComparisonRequestStore, DiffResultStore};

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

type Slot = Arc<Mutex<ComparisonRequest>>;

/// In-memory, HashMap-based request store.
///
/// Each record sits behind its own mutex. The map lock is taken for writing
/// only to add or remove records; status changes hold the map's read lock and
/// the record's mutex, so a claim is atomic per id without serializing
/// unrelated requests.
pub struct InMemoryRequestStore {
    requests: RwLock<HashMap<RequestId, Slot>>,
}

impl InMemoryRequestStore {
    pub fn new() -> Self {
        Self {
            requests: RwLock::new(HashMap::new()),
        }
    }

    /// Number of requests currently stored.
    pub fn len(&self) -> usize {
        read(&self.requests).len()
    }

    pub fn is_empty(&self) -> bool {
        read(&self.requests).is_empty()
    }

    fn slot(&self, id: &RequestId) -> StoreResult<Slot> {
        read(&self.requests)
            .get(id)
            .cloned()
            .ok_or(StoreError::NotFound(*id))
    }

    /// Apply a terminal transition to a stored request.
    fn finish(
        &self,
        id: &RequestId,
        apply: impl FnOnce(&mut ComparisonRequest) -> Result<(), TypeError>,
    ) -> StoreResult<ComparisonRequest> {
        let slot = self.slot(id)?;
        let mut request = lock(&slot);
        apply(&mut *request).map_err(|source| StoreError::InvalidTransition { id: *id, source })?;
        debug!(request_id = %id, status = %request.status, "request finished");
        Ok(request.clone())
    }
}

impl Default for InMemoryRequestStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ComparisonRequestStore for InMemoryRequestStore {
    fn insert(&self, request: ComparisonRequest) -> StoreResult<()> {
        let mut map = write(&self.requests);
        match map.entry(request.request_id) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists(request.request_id)),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(Mutex::new(request)));
                Ok(())
            }
        }
    }

    fn get(&self, id: &RequestId) -> StoreResult<Option<ComparisonRequest>> {
        let Some(slot) = read(&self.requests).get(id).cloned() else {
            return Ok(None);
        };
        let request = lock(&slot).clone();
        Ok(Some(request))
    }

    fn claim(&self, id: &RequestId) -> StoreResult<ClaimOutcome> {
        let slot = self.slot(id)?;
        let mut request = lock(&slot);
        let outcome = match request.status {
            ComparisonStatus::Pending => {
                request
                    .begin_processing()
                    .map_err(|source| StoreError::InvalidTransition { id: *id, source })?;
                ClaimOutcome::Claimed(request.clone())
            }
            ComparisonStatus::Processing => ClaimOutcome::AlreadyClaimed,
            terminal => ClaimOutcome::Terminal(terminal),
        };
        Ok(outcome)
    }

    fn complete(&self, id: &RequestId, at: DateTime<Utc>) -> StoreResult<ComparisonRequest> {
        self.finish(id, |request| request.complete(at))
    }

    fn fail(&self, id: &RequestId, message: &str, at: DateTime<Utc>) -> StoreResult<ComparisonRequest> {
        self.finish(id, |request| request.fail(message, at))
    }

    fn discard(&self, id: &RequestId) -> StoreResult<bool> {
        let mut map = write(&self.requests);
        let pending = match map.get(id) {
            Some(slot) => lock(slot).status == ComparisonStatus::Pending,
            None => return Ok(false),
        };
        if pending {
            map.remove(id);
            debug!(request_id = %id, "pending request discarded");
        }
        Ok(pending)
    }

    fn list_requests(&self, requester: Option<&str>) -> StoreResult<Vec<ComparisonRequest>> {
        let slots: Vec<Slot> = read(&self.requests).values().cloned().collect();
        let mut requests: Vec<ComparisonRequest> = slots
            .iter()
            .map(|slot| lock(slot).clone())
            .filter(|r| requester.is_none() || r.requester_id.as_deref() == requester)
            .collect();
        requests.sort_by(|a, b| {
            b.requested_at
                .cmp(&a.requested_at)
                .then_with(|| b.request_id.cmp(&a.request_id))
        });
        Ok(requests)
    }
}

impl std::fmt::Debug for InMemoryRequestStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryRequestStore")
            .field("request_count", &self.len())
            .finish()
    }
}

/// In-memory, HashMap-based result store. Results are write-once.
pub struct InMemoryResultStore {
    results: RwLock<HashMap<RequestId, DiffResult>>,
}

impl InMemoryResultStore {
    pub fn new() -> Self {
        Self {
            results: RwLock::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        read(&self.results).len()
    }

    pub fn is_empty(&self) -> bool {
        read(&self.results).is_empty()
    }
}

impl Default for InMemoryResultStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DiffResultStore for InMemoryResultStore {
    fn put(&self, result: DiffResult) -> StoreResult<()> {
        let mut map = write(&self.results);
        match map.entry(result.request_id) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists(result.request_id)),
            Entry::Vacant(slot) => {
                slot.insert(result);
                Ok(())
            }
        }
    }

    fn get(&self, id: &RequestId) -> StoreResult<Option<DiffResult>> {
        Ok(read(&self.results).get(id).cloned())
    }

    fn exists(&self, id: &RequestId) -> StoreResult<bool> {
        Ok(read(&self.results).contains_key(id))
    }
}

impl std::fmt::Debug for InMemoryResultStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryResultStore")
            .field("result_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn pending(requester: Option<&str>) -> ComparisonRequest {
        ComparisonRequest::new("/repo", "main", "feature/x", requester.map(str::to_string))
    }

    #[test]
    fn insert_and_get() {
        let store = InMemoryRequestStore::new();
        let request = pending(None);
        let id = request.request_id;
        store.insert(request.clone()).unwrap();

        assert_eq!(store.get(&id).unwrap(), Some(request));
        assert_eq!(store.len(), 1);
        assert!(store.get(&RequestId::new()).unwrap().is_none());
    }

    #[test]
    fn duplicate_insert_rejected() {
        let store = InMemoryRequestStore::new();
        let request = pending(None);
        store.insert(request.clone()).unwrap();
        assert!(matches!(
            store.insert(request),
            Err(StoreError::AlreadyExists(_))
        ));
    }

    #[test]
    fn claim_then_complete() {
        let store = InMemoryRequestStore::new();
        let request = pending(None);
        let id = request.request_id;
        store.insert(request).unwrap();

        let outcome = store.claim(&id).unwrap();
        match &outcome {
            ClaimOutcome::Claimed(r) => assert_eq!(r.status, ComparisonStatus::Processing),
            other => panic!("expected claim, got {other:?}"),
        }
        assert_eq!(store.claim(&id).unwrap(), ClaimOutcome::AlreadyClaimed);

        let now = Utc::now();
        let done = store.complete(&id, now).unwrap();
        assert_eq!(done.status, ComparisonStatus::Completed);
        assert_eq!(done.completed_at, Some(now));
        assert!(done.error_message.is_none());

        assert_eq!(
            store.claim(&id).unwrap(),
            ClaimOutcome::Terminal(ComparisonStatus::Completed)
        );
    }

    #[test]
    fn fail_records_message() {
        let store = InMemoryRequestStore::new();
        let request = pending(None);
        let id = request.request_id;
        store.insert(request).unwrap();
        store.claim(&id).unwrap();

        let failed = store.fail(&id, "branch not found", Utc::now()).unwrap();
        assert_eq!(failed.status, ComparisonStatus::Failed);
        assert_eq!(failed.error_message.as_deref(), Some("branch not found"));
        assert!(failed.completed_at.is_some());
    }

    #[test]
    fn terminal_transitions_require_processing() {
        let store = InMemoryRequestStore::new();
        let request = pending(None);
        let id = request.request_id;
        store.insert(request).unwrap();

        let err = store.complete(&id, Utc::now()).unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition { .. }));

        store.claim(&id).unwrap();
        store.fail(&id, "boom", Utc::now()).unwrap();
        let err = store.complete(&id, Utc::now()).unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition { .. }));
        assert_eq!(store.get(&id).unwrap().unwrap().status, ComparisonStatus::Failed);
    }

    #[test]
    fn discard_removes_only_pending_requests() {
        let store = InMemoryRequestStore::new();
        let queued = pending(None);
        let queued_id = queued.request_id;
        store.insert(queued).unwrap();
        assert!(store.discard(&queued_id).unwrap());
        assert!(store.get(&queued_id).unwrap().is_none());
        assert!(!store.discard(&queued_id).unwrap());

        let claimed = pending(None);
        let claimed_id = claimed.request_id;
        store.insert(claimed).unwrap();
        store.claim(&claimed_id).unwrap();
        assert!(!store.discard(&claimed_id).unwrap());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn claim_does_not_wait_on_other_requests() {
        let store = InMemoryRequestStore::new();
        let busy = pending(None);
        let busy_id = busy.request_id;
        let other = pending(None);
        let other_id = other.request_id;
        store.insert(busy).unwrap();
        store.insert(other).unwrap();

        let slot = store.slot(&busy_id).unwrap();
        let _held = lock(&slot);
        assert!(store.claim(&other_id).unwrap().is_claimed());
    }

    #[test]
    fn unknown_id_not_found() {
        let store = InMemoryRequestStore::new();
        assert!(matches!(
            store.claim(&RequestId::new()),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn concurrent_claims_have_one_winner() {
        for _ in 0..20 {
            let store = Arc::new(InMemoryRequestStore::new());
            let request = pending(None);
            let id = request.request_id;
            store.insert(request).unwrap();

            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let store = Arc::clone(&store);
                    thread::spawn(move || store.claim(&id).unwrap().is_claimed())
                })
                .collect();
            let winners = handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|won| *won)
                .count();
            assert_eq!(winners, 1);
        }
    }

    #[test]
    fn list_requests_by_requester_newest_first() {
        let store = InMemoryRequestStore::new();
        let mut first = pending(Some("alice"));
        first.requested_at = Utc::now() - chrono::Duration::seconds(10);
        let second = pending(Some("alice"));
        let other = pending(Some("bob"));
        store.insert(first.clone()).unwrap();
        store.insert(second.clone()).unwrap();
        store.insert(other).unwrap();

        let alice: Vec<RequestId> = store
            .list_requests(Some("alice"))
            .unwrap()
            .iter()
            .map(|r| r.request_id)
            .collect();
        assert_eq!(alice, vec![second.request_id, first.request_id]);
        assert_eq!(store.list_requests(None).unwrap().len(), 3);
        assert!(store.list_requests(Some("carol")).unwrap().is_empty());
    }

    #[test]
    fn results_are_write_once() {
        let store = InMemoryResultStore::new();
        let id = RequestId::new();
        store.put(DiffResult::new(id, Vec::new())).unwrap();
        assert!(store.exists(&id).unwrap());
        assert!(matches!(
            store.put(DiffResult::new(id, Vec::new())),
            Err(StoreError::AlreadyExists(_))
        ));
        assert!(store.get(&RequestId::new()).unwrap().is_none());
    }
}
