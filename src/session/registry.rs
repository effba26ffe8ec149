//! Live sessions of the server
//!
//! Each session sits behind its own async mutex. A turn holds the lock from
//! the user append to the assistant append, so two tabs on one session queue
//! up instead of interleaving.
//!
//! Sessions untouched for longer than the TTL are evicted by a background
//! sweep, which drops their transcript.

use super::ChatSession;
use crate::llm::LlmService;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub type SharedSession = Arc<Mutex<ChatSession>>;

const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

struct Entry {
    session: SharedSession,
    last_active: Instant,
}

pub struct SessionRegistry {
    llm: Arc<dyn LlmService>,
    ttl: Duration,
    sessions: RwLock<HashMap<String, Entry>>,
}

impl SessionRegistry {
    pub fn new(llm: Arc<dyn LlmService>, ttl: Duration) -> Self {
        Self {
            llm,
            ttl,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Start a session with an empty transcript and return its id
    pub async fn create(&self) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let session = ChatSession::new(id.clone(), self.llm.clone());
        let active = {
            let mut sessions = self.sessions.write().await;
            sessions.insert(
                id.clone(),
                Entry {
                    session: Arc::new(Mutex::new(session)),
                    last_active: Instant::now(),
                },
            );
            sessions.len()
        };
        tracing::info!(session_id = %id, active, "Session started");
        id
    }

    /// Look up a session and mark it as active
    pub async fn get(&self, id: &str) -> Option<SharedSession> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(id)?;
        entry.last_active = Instant::now();
        Some(entry.session.clone())
    }

    /// End a session; its transcript is dropped once no turn holds it
    pub async fn remove(&self, id: &str) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            tracing::info!(session_id = %id, "Session ended");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drop every session idle for at least the TTL as of `now`.
    ///
    /// A session with a turn in flight holds its lock and is kept.
    pub async fn evict_idle(&self, now: Instant) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, entry| {
            let idle = now.saturating_duration_since(entry.last_active);
            if idle < self.ttl || entry.session.try_lock().is_err() {
                return true;
            }
            tracing::info!(session_id = %id, idle_secs = idle.as_secs(), "Session expired");
            false
        });
        before - sessions.len()
    }

    /// Periodically evict idle sessions until the registry is dropped
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let registry = Arc::downgrade(self);
        let period = (self.ttl / 2).clamp(MIN_SWEEP_INTERVAL, MAX_SWEEP_INTERVAL);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(registry) = registry.upgrade() else {
                    tracing::debug!("SessionRegistry dropped, sweeper exiting");
                    break;
                };
                let evicted = registry.evict_idle(Instant::now()).await;
                if evicted > 0 {
                    let active = registry.len().await;
                    tracing::debug!(evicted, active, "Idle sessions swept");
                }
            }
        })
    }
}
