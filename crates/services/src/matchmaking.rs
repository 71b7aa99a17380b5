use std::collections::{HashMap, VecDeque};

use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::model::QueueEntry;

/// What happened to a find-match request.
#[derive(Debug)]
pub enum MatchAttempt {
    /// A compatible peer was waiting; the caller should pair with it.
    Matched(QueueEntry),
    /// Nobody compatible was queued; the caller was enqueued instead.
    Queued,
}

/// Per-language FIFO queues of users waiting for a random pairing.
///
/// One mutex guards the whole queue table: pop-or-push is a single critical
/// section, so two concurrent find-match calls can neither pop the same entry
/// nor check each other's still-empty queues and both end up waiting.
pub struct MatchmakingQueue {
    queues: Mutex<HashMap<String, VecDeque<QueueEntry>>>,
    /// Pending timeout timers, keyed by user id. Aborted on match/cancel.
    timers: DashMap<String, tokio::task::AbortHandle>,
    /// Fixed complementary-language table (a bijection, e.g. en ⇄ hi).
    complementary: HashMap<String, String>,
}

impl MatchmakingQueue {
    pub fn new(complementary: HashMap<String, String>) -> Self {
        Self {
            queues: Mutex::new(HashMap::new()),
            timers: DashMap::new(),
            complementary,
        }
    }

    /// The language this caller wants to hear, when no explicit preference is
    /// supplied. `None` means the table has no entry and the caller must pass
    /// `preferred_language` itself.
    pub fn default_preference(&self, language: &str) -> Option<&str> {
        self.complementary.get(language).map(String::as_str)
    }

    /// Pops the oldest entry waiting on `preferred`, FIFO over queue wait
    /// time. Does not search other language queues.
    pub fn find_match(&self, preferred: &str) -> Option<QueueEntry> {
        let mut queues = self.queues.lock();
        queues.get_mut(preferred).and_then(VecDeque::pop_front)
    }

    /// Appends to the queue for the entry's own language. Re-enqueuing the
    /// same user replaces the previous entry rather than duplicating it.
    pub fn enqueue(&self, entry: QueueEntry) {
        let mut queues = self.queues.lock();
        let queue = queues.entry(entry.language.clone()).or_default();
        queue.retain(|e| e.user_id != entry.user_id);
        queue.push_back(entry);
    }

    /// Atomic pop-or-push: matches against the `preferred` queue, or enqueues
    /// the caller under its own language, in one critical section.
    pub fn match_or_enqueue(&self, entry: QueueEntry, preferred: &str) -> MatchAttempt {
        let mut queues = self.queues.lock();

        if let Some(peer) = queues.get_mut(preferred).and_then(VecDeque::pop_front) {
            debug!(user_id = %entry.user_id, peer = %peer.user_id, "Matchmaking pairing");
            return MatchAttempt::Matched(peer);
        }

        let queue = queues.entry(entry.language.clone()).or_default();
        queue.retain(|e| e.user_id != entry.user_id);
        queue.push_back(entry);
        MatchAttempt::Queued
    }

    /// Removes a specific user's entry if present. Idempotent.
    pub fn dequeue(&self, user_id: &str, language: &str) -> bool {
        let mut queues = self.queues.lock();
        match queues.get_mut(language) {
            Some(queue) => {
                let before = queue.len();
                queue.retain(|e| e.user_id != user_id);
                queue.len() < before
            }
            None => false,
        }
    }

    /// Removes a user from whichever queue holds them (disconnect path,
    /// where the language is not in the intent). Idempotent.
    pub fn dequeue_user(&self, user_id: &str) -> bool {
        let mut queues = self.queues.lock();
        let mut removed = false;
        for queue in queues.values_mut() {
            let before = queue.len();
            queue.retain(|e| e.user_id != user_id);
            removed |= queue.len() < before;
        }
        removed
    }

    pub fn size(&self, language: &str) -> usize {
        self.queues
            .lock()
            .get(language)
            .map(VecDeque::len)
            .unwrap_or(0)
    }

    pub fn total_queued(&self) -> usize {
        self.queues.lock().values().map(VecDeque::len).sum()
    }

    /// Registers the timeout timer for a queued user, replacing (and
    /// aborting) any previous one.
    pub fn register_timer(&self, user_id: &str, handle: tokio::task::AbortHandle) {
        if let Some(old) = self.timers.insert(user_id.to_string(), handle) {
            old.abort();
        }
    }

    /// Cancels a user's pending timeout timer, if any.
    pub fn cancel_timer(&self, user_id: &str) {
        if let Some((_, handle)) = self.timers.remove(user_id) {
            handle.abort();
        }
    }
}

/// Convenience constructor for a fresh entry.
pub fn entry(user_id: &str, connection_id: Uuid, language: &str) -> QueueEntry {
    QueueEntry {
        user_id: user_id.to_string(),
        connection_id,
        language: language.to_string(),
        enqueued_at: Utc::now(),
    }
}
