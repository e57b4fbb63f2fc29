//! Scoped event routing.
//!
//! Every inbound envelope is delivered to the handlers registered for its
//! exact `(event, scope)` pair, in registration order. A handler belongs to
//! a [`Subscription`]; dropping the subscription removes exactly the
//! handlers it registered and nothing else, so a closed document view can
//! never leak listeners into the next one.
//!
//! Subscriptions may also carry a *rejoin* envelope (e.g. `join_document`)
//! which the connection re-emits after every reconnect.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;

use crate::protocol::{Envelope, Scope};

/// Identity of one registered handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

struct Route {
    id: HandlerId,
    tx: mpsc::UnboundedSender<Envelope>,
}

#[derive(Default)]
struct RouterInner {
    next_id: u64,
    routes: HashMap<(String, Scope), Vec<Route>>,
    /// Rejoin envelopes keyed by the owning subscription's first handler id.
    rejoin: Vec<(HandlerId, Envelope)>,
}

impl RouterInner {
    fn allocate(&mut self) -> HandlerId {
        self.next_id += 1;
        HandlerId(self.next_id)
    }
}

/// Shared routing table. Cheap to clone.
#[derive(Clone, Default)]
pub struct EventRouter {
    inner: Arc<Mutex<RouterInner>>,
}

impl EventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one handler per event name, all feeding the returned
    /// subscription.
    pub fn subscribe(&self, scope: Scope, events: &[&str]) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let key = inner.allocate();
        let mut routes = Vec::with_capacity(events.len());
        for event in events {
            let id = inner.allocate();
            inner
                .routes
                .entry((event.to_string(), scope.clone()))
                .or_default()
                .push(Route { id, tx: tx.clone() });
            routes.push((event.to_string(), id));
        }
        drop(inner);

        log::debug!("Subscribed to {:?} on {}", events, scope);
        Subscription {
            key,
            scope,
            routes,
            rx,
            router: self.clone(),
        }
    }

    /// Deliver an envelope to every handler for its `(event, scope)`.
    ///
    /// Returns the number of handlers reached. Handlers whose subscription
    /// has gone away are pruned.
    pub fn dispatch(&self, envelope: &Envelope) -> usize {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let key = (envelope.event.clone(), envelope.scope.clone());
        let Some(routes) = inner.routes.get_mut(&key) else {
            log::trace!("No handler for '{}' on {}", envelope.event, envelope.scope);
            return 0;
        };

        let mut delivered = 0;
        routes.retain(|route| match route.tx.send(envelope.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(_) => false,
        });
        if routes.is_empty() {
            inner.routes.remove(&key);
        }
        delivered
    }

    /// Number of handlers registered for a pair.
    pub fn handler_count(&self, event: &str, scope: &Scope) -> usize {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner
            .routes
            .get(&(event.to_string(), scope.clone()))
            .map_or(0, Vec::len)
    }

    /// Total handlers across all pairs.
    pub fn total_handlers(&self) -> usize {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.routes.values().map(Vec::len).sum()
    }

    /// Envelopes to re-emit after a reconnect, in registration order.
    pub fn rejoin_envelopes(&self) -> Vec<Envelope> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.rejoin.iter().map(|(_, env)| env.clone()).collect()
    }

    fn set_rejoin(&self, key: HandlerId, envelope: Envelope) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        match inner.rejoin.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = envelope,
            None => inner.rejoin.push((key, envelope)),
        }
    }

    fn release(&self, key: HandlerId, scope: &Scope, routes: &[(String, HandlerId)]) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        for (event, id) in routes {
            let route_key = (event.clone(), scope.clone());
            if let Some(list) = inner.routes.get_mut(&route_key) {
                list.retain(|route| route.id != *id);
                if list.is_empty() {
                    inner.routes.remove(&route_key);
                }
            }
        }
        inner.rejoin.retain(|(k, _)| *k != key);
    }
}

/// Handlers registered by one view manager.
///
/// Deregisters on drop.
pub struct Subscription {
    key: HandlerId,
    scope: Scope,
    routes: Vec<(String, HandlerId)>,
    rx: mpsc::UnboundedReceiver<Envelope>,
    router: EventRouter,
}

impl Subscription {
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Next routed envelope. Cancel-safe.
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Envelope> {
        self.rx.try_recv().ok()
    }

    /// Envelope to re-emit whenever the connection is re-established.
    pub fn set_rejoin(&self, envelope: Envelope) {
        self.router.set_rejoin(self.key, envelope);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.router.release(self.key, &self.scope, &self.routes);
        log::debug!("Released {} handlers on {}", self.routes.len(), self.scope);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::events;
    use syncspace_core::Identity;

    fn doc(id: &str) -> Scope {
        Scope::Document(id.into())
    }

    fn update(doc_id: &str) -> Envelope {
        Envelope::new(
            events::DOCUMENT_UPDATED,
            doc(doc_id),
            Some("u-bob"),
            &serde_json::json!({"content": doc_id}),
        )
    }

    #[tokio::test]
    async fn test_dispatch_respects_scope() {
        let router = EventRouter::new();
        let mut a = router.subscribe(doc("a"), &[events::DOCUMENT_UPDATED]);
        let mut b = router.subscribe(doc("b"), &[events::DOCUMENT_UPDATED]);

        assert_eq!(router.dispatch(&update("a")), 1);
        assert_eq!(a.try_recv().unwrap().scope, doc("a"));
        assert!(b.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_unmatched_event_reaches_nobody() {
        let router = EventRouter::new();
        let mut sub = router.subscribe(doc("a"), &[events::DOCUMENT_UPDATED]);
        let other = Envelope::new(events::CURSOR_POSITION_UPDATE, doc("a"), None, &());
        assert_eq!(router.dispatch(&other), 0);
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_drop_removes_only_own_handlers() {
        let router = EventRouter::new();
        let first = router.subscribe(doc("a"), &[events::DOCUMENT_UPDATED, events::USER_JOINED_DOCUMENT]);
        let mut second = router.subscribe(doc("a"), &[events::DOCUMENT_UPDATED]);
        assert_eq!(router.handler_count(events::DOCUMENT_UPDATED, &doc("a")), 2);
        assert_eq!(router.total_handlers(), 3);

        drop(first);
        assert_eq!(router.handler_count(events::DOCUMENT_UPDATED, &doc("a")), 1);
        assert_eq!(router.handler_count(events::USER_JOINED_DOCUMENT, &doc("a")), 0);

        assert_eq!(router.dispatch(&update("a")), 1);
        assert!(second.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_open_close_cycles_do_not_leak() {
        let router = EventRouter::new();
        for _ in 0..100 {
            let sub = router.subscribe(doc("a"), &[events::DOCUMENT_UPDATED, events::CURSOR_POSITION_UPDATE]);
            drop(sub);
        }
        assert_eq!(router.total_handlers(), 0);
        assert_eq!(router.dispatch(&update("a")), 0);
    }

    #[tokio::test]
    async fn test_registration_order_is_preserved() {
        let router = EventRouter::new();
        let mut subs: Vec<_> = (0..3)
            .map(|_| router.subscribe(doc("a"), &[events::DOCUMENT_UPDATED]))
            .collect();
        assert_eq!(router.dispatch(&update("a")), 3);
        for sub in subs.iter_mut() {
            assert!(sub.try_recv().is_some());
        }
    }

    #[tokio::test]
    async fn test_rejoin_envelopes_follow_subscription_lifetime() {
        let router = EventRouter::new();
        let user = Identity::new("u1", "Ann");
        let ws = router.subscribe(Scope::Workspace("w".into()), &[events::USER_JOINED]);
        ws.set_rejoin(Envelope::join_workspace(&user, "w"));
        let doc_sub = router.subscribe(doc("d"), &[events::DOCUMENT_UPDATED]);
        doc_sub.set_rejoin(Envelope::join_document(&user, "d"));

        let rejoin: Vec<_> = router.rejoin_envelopes().into_iter().map(|e| e.event).collect();
        assert_eq!(rejoin, vec![events::JOIN_WORKSPACE, events::JOIN_DOCUMENT]);

        drop(ws);
        let rejoin = router.rejoin_envelopes();
        assert_eq!(rejoin.len(), 1);
        assert_eq!(rejoin[0].event, events::JOIN_DOCUMENT);
    }
}
