use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::debug;

use crate::translator::{TranslateError, Translator};

/// Cache key: `(source_lang, target_lang, normalized_text)`.
type Key = (String, String, String);

struct CacheState {
    map: HashMap<Key, String>,
    /// Insertion order for FIFO eviction.
    order: VecDeque<Key>,
    /// Outstanding requests: later identical calls share the same result
    /// instead of issuing duplicate translation calls.
    inflight: HashMap<Key, broadcast::Sender<Result<String, TranslateError>>>,
}

enum Role {
    Hit(String),
    Leader,
    Follower(broadcast::Receiver<Result<String, TranslateError>>),
}

/// Bounded memoization plus in-flight request coalescing in front of the
/// translation collaborator. Not shared across pipeline instances.
pub struct TranslationCache {
    translator: Arc<dyn Translator>,
    capacity: usize,
    state: Mutex<CacheState>,
}

impl TranslationCache {
    pub fn new(translator: Arc<dyn Translator>, capacity: usize) -> Self {
        Self {
            translator,
            capacity: capacity.max(1),
            state: Mutex::new(CacheState {
                map: HashMap::new(),
                order: VecDeque::new(),
                inflight: HashMap::new(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Translates `text`, serving repeats from the cache and coalescing
    /// concurrent identical requests onto one outbound call. Failures
    /// propagate and are never cached.
    pub async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, TranslateError> {
        let normalized = normalize(text);
        if normalized.is_empty() {
            return Ok(String::new());
        }

        let key: Key = (
            source_lang.to_string(),
            target_lang.to_string(),
            normalized.clone(),
        );

        let role = {
            let mut state = self.state.lock();
            if let Some(hit) = state.map.get(&key) {
                Role::Hit(hit.clone())
            } else if let Some(pending) = state.inflight.get(&key) {
                Role::Follower(pending.subscribe())
            } else {
                let (tx, _) = broadcast::channel(1);
                state.inflight.insert(key.clone(), tx);
                Role::Leader
            }
        };

        match role {
            Role::Hit(translated) => Ok(translated),
            Role::Follower(mut rx) => {
                debug!(source_lang, target_lang, "Coalescing onto in-flight translation");
                rx.recv()
                    .await
                    .map_err(|_| TranslateError::Transport("in-flight request dropped".into()))?
            }
            Role::Leader => {
                let result = self
                    .translator
                    .translate(&normalized, source_lang, target_lang)
                    .await;

                let waiters = {
                    let mut state = self.state.lock();
                    if let Ok(translated) = &result {
                        Self::insert_bounded(&mut state, self.capacity, key.clone(), translated);
                    }
                    state.inflight.remove(&key)
                };
                if let Some(tx) = waiters {
                    let _ = tx.send(result.clone());
                }
                result
            }
        }
    }

    fn insert_bounded(state: &mut CacheState, capacity: usize, key: Key, value: &str) {
        if state.map.insert(key.clone(), value.to_string()).is_none() {
            state.order.push_back(key);
        }
        while state.map.len() > capacity {
            match state.order.pop_front() {
                Some(oldest) => {
                    state.map.remove(&oldest);
                }
                None => break,
            }
        }
    }
}

/// Collapses runs of whitespace, the same normalization the translation
/// service applies before inference.
fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
