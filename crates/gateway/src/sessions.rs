//! Session store: one canvas per session id.
//!
//! Sessions live in process memory with two lifecycle rules: an entry idle
//! for longer than the TTL is purged on the next access, and at capacity the
//! least recently used entry is evicted. Sessions with a run in flight are
//! never dropped.
//!
//! Each session carries a run lock; a chat request holds it for the whole
//! loop so requests on the same id run one after another.

use plancanvas_canvas::InMemoryCanvas;
use plancanvas_config::SessionsConfig;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::debug;

/// What a request needs from its session.
#[derive(Clone)]
pub struct SessionHandle {
    pub canvas: Arc<InMemoryCanvas>,
    pub run_lock: Arc<Mutex<()>>,
}

struct Session {
    canvas: Arc<InMemoryCanvas>,
    run_lock: Arc<Mutex<()>>,
    last_used: Instant,
}

impl Session {
    fn new(now: Instant) -> Self {
        Self {
            canvas: Arc::new(InMemoryCanvas::new()),
            run_lock: Arc::new(Mutex::new(())),
            last_used: now,
        }
    }

    /// A handle held outside the store means a request is using it.
    fn in_use(&self) -> bool {
        Arc::strong_count(&self.run_lock) > 1
    }

    fn handle(&self) -> SessionHandle {
        SessionHandle {
            canvas: self.canvas.clone(),
            run_lock: self.run_lock.clone(),
        }
    }
}

pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    ttl: Duration,
    max_sessions: usize,
}

impl SessionStore {
    pub fn new(ttl: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
            max_sessions: max_sessions.max(1),
        }
    }

    pub fn from_config(config: &SessionsConfig) -> Self {
        Self::new(Duration::from_secs(config.ttl_secs), config.max_sessions)
    }

    /// Fetch the session for `id`, creating it if needed, and mark it used.
    pub async fn get_or_create(&self, id: &str) -> SessionHandle {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        self.purge_expired(&mut sessions, now);

        if let Some(session) = sessions.get_mut(id) {
            session.last_used = now;
            return session.handle();
        }

        if sessions.len() >= self.max_sessions
            && let Some(oldest) = sessions
                .iter()
                .filter(|(_, s)| !s.in_use())
                .min_by_key(|(_, s)| s.last_used)
                .map(|(k, _)| k.clone())
        {
            debug!(session = %oldest, "evicting least recently used session");
            sessions.remove(&oldest);
        }

        let session = Session::new(now);
        let handle = session.handle();
        sessions.insert(id.to_string(), session);
        debug!(session = %id, total = sessions.len(), "session created");
        handle
    }

    /// The canvas of an existing session, without creating one.
    pub async fn canvas(&self, id: &str) -> Option<Arc<InMemoryCanvas>> {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        self.purge_expired(&mut sessions, now);
        sessions.get_mut(id).map(|session| {
            session.last_used = now;
            session.canvas.clone()
        })
    }

    /// Mark a session as used now. A run calls this when it finishes so the
    /// idle clock starts from the end of the run, not its start.
    pub async fn touch(&self, id: &str) {
        if let Some(session) = self.sessions.write().await.get_mut(id) {
            session.last_used = Instant::now();
        }
    }

    /// Drop a session. Returns whether it existed.
    pub async fn remove(&self, id: &str) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn purge_expired(&self, sessions: &mut HashMap<String, Session>, now: Instant) {
        let before = sessions.len();
        sessions.retain(|_, s| s.in_use() || now.duration_since(s.last_used) < self.ttl);
        if sessions.len() < before {
            debug!(purged = before - sessions.len(), "expired sessions purged");
        }
    }
}
