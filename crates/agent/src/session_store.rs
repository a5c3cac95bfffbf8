//! Process-wide session store.
//!
//! Each session lives in its own slot. A slot pairs a `tokio::sync::Mutex`
//! held by a request from loading the history until the new turn is
//! recorded, with a snapshot of the last committed state. Requests on one
//! session run one at a time; readers (`get`, `list`) only look at
//! snapshots and never wait on an in-flight request. The outer map and the
//! snapshots sit behind plain `std::sync::Mutex`es that are only held for
//! lookups, never across `.await`.
//!
//! A request on an unknown id creates an empty placeholder slot. The
//! placeholder only becomes a session when the request commits its first
//! turn; if the request fails, dropping the guard removes it again.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use ikms_core::{Session, SessionId, SessionSummary, Turn};
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info};

/// State owned by whichever request holds the slot.
#[derive(Default)]
struct Slot {
    session: Option<Session>,
    /// Set when the slot is unlinked from the map. Whoever acquires a
    /// retired slot must look the id up again.
    retired: bool,
}

#[derive(Default)]
struct SlotCell {
    request: Arc<tokio::sync::Mutex<Slot>>,
    /// Last committed session; `None` for placeholders and removed slots.
    committed: Mutex<Option<Session>>,
}

impl SlotCell {
    fn committed(&self) -> MutexGuard<'_, Option<Session>> {
        self.committed.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn publish(&self, session: Option<Session>) {
        *self.committed() = session;
    }
}

type SlotRef = Arc<SlotCell>;

struct Inner {
    slots: Mutex<HashMap<SessionId, SlotRef>>,
    max_sessions: Option<usize>,
}

impl Inner {
    fn slots(&self) -> MutexGuard<'_, HashMap<SessionId, SlotRef>> {
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Remove `id` from the map if it still points at `slot`.
    fn unlink(&self, id: &SessionId, slot: &SlotRef) {
        let mut slots = self.slots();
        if slots.get(id).is_some_and(|s| Arc::ptr_eq(s, slot)) {
            slots.remove(id);
        }
    }

    /// Evict least recently active idle sessions while over capacity.
    /// Sessions locked by a request are never evicted.
    fn enforce_capacity(&self, keep: &SessionId) {
        let Some(max) = self.max_sessions else {
            return;
        };

        let mut slots = self.slots();
        while slots.len() > max {
            let oldest = slots
                .iter()
                .filter(|(id, _)| *id != keep)
                .filter_map(|(id, slot)| {
                    let guard = slot.request.try_lock().ok()?;
                    let updated_at = guard.session.as_ref()?.updated_at;
                    Some((id.clone(), updated_at))
                })
                .min_by_key(|(_, updated_at)| *updated_at);

            let Some((victim, _)) = oldest else {
                break;
            };
            let Some(slot) = slots.remove(&victim) else {
                break;
            };
            let Ok(mut guard) = slot.request.clone().try_lock_owned() else {
                // Picked up by a request in the meantime; keep it.
                slots.insert(victim, slot);
                break;
            };
            guard.session = None;
            guard.retired = true;
            slot.publish(None);
            info!(session_id = %victim, max_sessions = max, "Evicted least recently active session");
        }
    }
}

/// Everything recorded for one completed question.
#[derive(Debug, Clone)]
pub struct TurnRecord {
    pub question: String,
    pub answer: String,
    pub context_used: String,
    pub used_history: bool,
}

#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

impl SessionStore {
    /// An unbounded store.
    pub fn new() -> Self {
        Self::with_capacity(None)
    }

    /// A store that evicts the least recently active idle session once more
    /// than `max_sessions` sessions exist.
    pub fn with_capacity(max_sessions: Option<usize>) -> Self {
        Self {
            inner: Arc::new(Inner {
                slots: Mutex::new(HashMap::new()),
                max_sessions,
            }),
        }
    }

    fn slot(&self, id: &SessionId) -> Option<SlotRef> {
        self.inner.slots().get(id).cloned()
    }

    /// Acquire exclusive access to a session, creating a placeholder for an
    /// unknown id. Waits while another request holds the session.
    pub async fn lock(&self, id: SessionId) -> SessionGuard {
        loop {
            let slot = self
                .inner
                .slots()
                .entry(id.clone())
                .or_default()
                .clone();

            let guard = slot.request.clone().lock_owned().await;
            if guard.retired {
                debug!(session_id = %id, "Session slot retired while waiting, retrying");
                continue;
            }

            return SessionGuard {
                id,
                slot,
                guard,
                store: self.inner.clone(),
            };
        }
    }

    /// The last committed state of a session. Does not wait for an
    /// in-flight request on it.
    pub async fn get(&self, id: &SessionId) -> Option<Session> {
        self.slot(id)?.committed().clone()
    }

    /// Summaries of all committed sessions, most recently active first.
    pub async fn list(&self) -> Vec<SessionSummary> {
        let slots: Vec<SlotRef> = self.inner.slots().values().cloned().collect();

        let mut summaries: Vec<SessionSummary> = slots
            .iter()
            .filter_map(|slot| slot.committed().as_ref().map(Session::summary_view))
            .collect();

        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        summaries
    }

    /// Number of sessions with at least one turn.
    pub async fn len(&self) -> usize {
        self.list().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Delete a session. Returns `false` if it does not exist, in which case
    /// nothing changes. Waits for an in-flight request on the session.
    pub async fn delete(&self, id: &SessionId) -> bool {
        let Some(slot) = self.slot(id) else {
            return false;
        };

        let mut guard = slot.request.lock().await;
        if guard.retired {
            return false;
        }
        let existed = guard.session.take().is_some();
        guard.retired = true;
        slot.publish(None);
        self.inner.unlink(id, &slot);
        drop(guard);

        if existed {
            info!(session_id = %id, "Deleted session");
        }
        existed
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive access to one session for the duration of a request.
pub struct SessionGuard {
    id: SessionId,
    slot: SlotRef,
    guard: OwnedMutexGuard<Slot>,
    store: Arc<Inner>,
}

impl SessionGuard {
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// `true` until the first turn is committed.
    pub fn is_new(&self) -> bool {
        self.guard.session.is_none()
    }

    /// Turns recorded so far, in ordinal order.
    pub fn history(&self) -> &[Turn] {
        self.guard
            .session
            .as_ref()
            .map(|s| s.turns.as_slice())
            .unwrap_or_default()
    }

    pub fn summary(&self) -> Option<&str> {
        self.guard.session.as_ref()?.summary.as_deref()
    }

    /// Record a completed turn and publish it to readers.
    ///
    /// Creates the session on its first turn, assigns `title` only if none
    /// is set yet and replaces the summary only when one is given.
    pub fn commit(&mut self, turn: TurnRecord, title: Option<String>, summary: Option<String>) -> Session {
        let created = self.guard.session.is_none();
        let id = self.id.clone();
        let session = self.guard.session.get_or_insert_with(|| Session::new(id));

        let index = session
            .push_turn(turn.question, turn.answer, turn.context_used, turn.used_history)
            .index;
        if let Some(title) = title {
            session.assign_title(title);
        }
        session.replace_summary(summary);
        let snapshot = session.clone();
        self.slot.publish(Some(snapshot.clone()));

        info!(session_id = %self.id, turn = index, created, "Recorded turn");

        if created {
            self.store.enforce_capacity(&self.id);
        }
        snapshot
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if self.guard.session.is_none() && !self.guard.retired {
            self.guard.retired = true;
            self.store.unlink(&self.id, &self.slot);
            debug!(session_id = %self.id, "Discarded uncommitted session placeholder");
        }
    }
}
