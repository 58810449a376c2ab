//! TTL cache for chat and embedding responses

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};

const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Expired entries are swept on every this many inserts
const PURGE_INTERVAL: usize = 256;

struct Entry {
    value: String,
    expires_at: Instant,
}

/// In-memory response cache shared by one client
pub struct LLMCache {
    entries: RwLock<HashMap<String, Entry>>,
    ttl: Duration,
    inserts: AtomicUsize,
}

impl LLMCache {
    /// One hour TTL
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            inserts: AtomicUsize::new(0),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.read().ok()?;
        entries
            .get(key)
            .filter(|e| Instant::now() < e.expires_at)
            .map(|e| e.value.clone())
    }

    pub fn insert(&self, key: String, value: String) {
        let now = Instant::now();
        let entry = Entry {
            value,
            expires_at: now + self.ttl,
        };
        let sweep = (self.inserts.fetch_add(1, Ordering::Relaxed) + 1) % PURGE_INTERVAL == 0;
        if let Ok(mut entries) = self.entries.write() {
            if sweep {
                entries.retain(|_, e| now < e.expires_at);
            }
            entries.insert(key, entry);
        }
    }

    /// Drop expired entries, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let Ok(mut entries) = self.entries.write() else {
            return 0;
        };
        let before = entries.len();
        let now = Instant::now();
        entries.retain(|_, e| now < e.expires_at);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for LLMCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache key for a chat request: model, temperature and serialized messages
pub fn chat_key(model: &str, temperature: f32, messages: &str) -> String {
    let mut hasher = DefaultHasher::new();
    model.hash(&mut hasher);
    temperature.to_bits().hash(&mut hasher);
    messages.hash(&mut hasher);
    format!("chat:{}:{:x}", model, hasher.finish())
}

pub fn embedding_key(model: &str, text: &str) -> String {
    let mut hasher = DefaultHasher::new();
    model.hash(&mut hasher);
    text.hash(&mut hasher);
    format!("embed:{}:{:x}", model, hasher.finish())
}
