//! Presence for remote participants in one room.
//!
//! ```text
//! user_joined* ─────► joined()      ┐
//! user_left*   ─────► left()        │
//! *typing*     ─────► set_typing()  ├─► PresenceRoom ──► active users,
//! cursor_*     ─────► move_cursor() │                    typing names,
//! user_presence ────► replace_roster┘                    cursors
//! ```
//!
//! Peers are keyed by user id. Several server events carry only a username,
//! so lookups fall back to matching on username. Events about the local
//! user are ignored.
//!
//! Typing flags decay after a TTL: a peer that drops off the network never
//! sends its typing-stop.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::{sleep_until, Instant};

use syncspace_core::{ActiveUser, CursorPosition, Identity};

/// State tracked for one remote participant.
#[derive(Debug, Clone)]
pub struct RemotePeer {
    pub user_id: String,
    pub username: String,
    pub cursor: Option<CursorPosition>,
    typing_until: Option<Instant>,
    last_seen: Instant,
}

impl RemotePeer {
    fn new(user_id: &str, username: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            username: username.to_string(),
            cursor: None,
            typing_until: None,
            last_seen: Instant::now(),
        }
    }

    pub fn is_typing(&self) -> bool {
        self.typing_until.is_some_and(|until| until > Instant::now())
    }

    pub fn is_idle(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }

    fn touch(&mut self, user_id: &str, username: &str) {
        if self.user_id.is_empty() && !user_id.is_empty() {
            self.user_id = user_id.to_string();
        }
        if !username.is_empty() {
            self.username = username.to_string();
        }
        self.last_seen = Instant::now();
    }

    pub fn display_name(&self) -> &str {
        if self.username.is_empty() {
            &self.user_id
        } else {
            &self.username
        }
    }
}

pub struct PresenceRoom {
    local: Identity,
    peers: HashMap<String, RemotePeer>,
    typing_ttl: Duration,
    idle_timeout: Duration,
}

impl PresenceRoom {
    pub fn new(local: Identity, typing_ttl: Duration) -> Self {
        Self {
            local,
            peers: HashMap::new(),
            typing_ttl,
            idle_timeout: Duration::from_secs(300),
        }
    }

    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    fn is_local(&self, user_id: &str, username: &str) -> bool {
        if !user_id.is_empty() {
            return user_id == self.local.id;
        }
        !username.is_empty() && username == self.local.name
    }

    fn find_key(&self, user_id: &str, username: &str) -> Option<String> {
        if !user_id.is_empty() && self.peers.contains_key(user_id) {
            return Some(user_id.to_string());
        }
        if username.is_empty() {
            return None;
        }
        self.peers
            .iter()
            .find(|(_, peer)| peer.username == username)
            .map(|(key, _)| key.clone())
    }

    /// Look up or insert; `None` for the local user or an anonymous event.
    fn entry(&mut self, user_id: &str, username: &str) -> Option<(&mut RemotePeer, bool)> {
        if self.is_local(user_id, username) || (user_id.is_empty() && username.is_empty()) {
            return None;
        }
        let (key, inserted) = match self.find_key(user_id, username) {
            Some(key) => (key, false),
            None => {
                let key = if user_id.is_empty() { username } else { user_id };
                let key = key.to_string();
                self.peers.insert(key.clone(), RemotePeer::new(user_id, username));
                (key, true)
            }
        };
        let peer = self.peers.get_mut(&key)?;
        peer.touch(user_id, username);
        Some((peer, inserted))
    }

    /// Returns `true` if the peer was not present before.
    pub fn joined(&mut self, user_id: &str, username: &str) -> bool {
        self.entry(user_id, username).is_some_and(|(_, inserted)| inserted)
    }

    pub fn left(&mut self, user_id: &str, username: &str) -> Option<RemotePeer> {
        let key = self.find_key(user_id, username)?;
        self.peers.remove(&key)
    }

    /// Returns `true` if the visible typing state changed.
    pub fn set_typing(&mut self, user_id: &str, username: &str, typing: bool) -> bool {
        let ttl = self.typing_ttl;
        let Some((peer, _)) = self.entry(user_id, username) else {
            return false;
        };
        let was = peer.is_typing();
        peer.typing_until = typing.then(|| Instant::now() + ttl);
        was != typing
    }

    pub fn move_cursor(&mut self, user_id: &str, username: &str, position: CursorPosition) -> bool {
        match self.entry(user_id, username) {
            Some((peer, _)) => {
                peer.cursor = Some(position);
                true
            }
            None => false,
        }
    }

    /// Replace the roster wholesale, keeping cursors of peers that remain.
    pub fn replace_roster(&mut self, users: &[ActiveUser]) {
        let mut next = HashMap::with_capacity(users.len());
        for user in users {
            if self.is_local(&user.user_id, &user.username) {
                continue;
            }
            let peer = match self.find_key(&user.user_id, &user.username) {
                Some(key) => self.peers.remove(&key),
                None => None,
            };
            let mut peer = peer.unwrap_or_else(|| RemotePeer::new(&user.user_id, &user.username));
            peer.touch(&user.user_id, &user.username);
            let key = if user.user_id.is_empty() {
                user.username.clone()
            } else {
                user.user_id.clone()
            };
            next.insert(key, peer);
        }
        self.peers = next;
    }

    /// Clear typing flags whose TTL has passed; returns the affected names.
    pub fn expire_typing(&mut self) -> Vec<String> {
        let now = Instant::now();
        let mut expired = Vec::new();
        for peer in self.peers.values_mut() {
            if peer.typing_until.is_some_and(|until| until <= now) {
                peer.typing_until = None;
                expired.push(peer.display_name().to_string());
            }
        }
        expired.sort();
        expired
    }

    /// Earliest pending typing expiry.
    pub fn next_typing_expiry(&self) -> Option<Instant> {
        self.peers.values().filter_map(|p| p.typing_until).min()
    }

    /// Wait for the next typing flag to lapse. Cancel-safe.
    pub async fn typing_expired(&mut self) -> Vec<String> {
        loop {
            let Some(deadline) = self.next_typing_expiry() else {
                return std::future::pending().await;
            };
            sleep_until(deadline).await;
            let expired = self.expire_typing();
            if !expired.is_empty() {
                return expired;
            }
        }
    }

    /// Remove peers with no activity within the idle timeout.
    pub fn cleanup_idle(&mut self) -> Vec<RemotePeer> {
        let timeout = self.idle_timeout;
        let idle: Vec<String> = self
            .peers
            .iter()
            .filter(|(_, peer)| peer.is_idle(timeout))
            .map(|(key, _)| key.clone())
            .collect();
        idle.iter().filter_map(|key| self.peers.remove(key)).collect()
    }

    pub fn peer(&self, user_id: &str, username: &str) -> Option<&RemotePeer> {
        let key = self.find_key(user_id, username)?;
        self.peers.get(&key)
    }

    /// Peers ordered by display name.
    pub fn peers(&self) -> Vec<&RemotePeer> {
        let mut peers: Vec<&RemotePeer> = self.peers.values().collect();
        peers.sort_by(|a, b| a.display_name().cmp(b.display_name()));
        peers
    }

    pub fn active_users(&self) -> Vec<ActiveUser> {
        self.peers()
            .into_iter()
            .map(|peer| ActiveUser {
                user_id: peer.user_id.clone(),
                username: peer.username.clone(),
            })
            .collect()
    }

    pub fn typing_users(&self) -> Vec<&str> {
        self.peers()
            .into_iter()
            .filter(|peer| peer.is_typing())
            .map(RemotePeer::display_name)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
