//! Personal notification feed.

use std::time::Duration;

use syncspace_core::{Debounce, Notification, NotificationFeed};

use crate::context::SessionContext;
use crate::protocol::{events, Envelope, Scope};
use crate::router::Subscription;
use crate::ui::{ToastLevel, UiEvent};

pub const NOTIFICATION_EVENTS: &[&str] = &[events::LIVE_NOTIFICATION];

/// Opening the feed marks it read after this delay.
pub const MARK_READ_DELAY: Duration = Duration::from_millis(1000);

pub struct NotificationCenter {
    ctx: SessionContext,
    feed: NotificationFeed,
    mark_read: Debounce<()>,
    /// The mark-read delay elapsed and the request has not completed yet.
    read_due: bool,
    sub: Subscription,
}

impl NotificationCenter {
    pub async fn open(ctx: SessionContext) -> Self {
        let sub = ctx.subscribe(Scope::User(ctx.identity().id.clone()), NOTIFICATION_EVENTS);
        let mut center = Self {
            ctx,
            feed: NotificationFeed::default(),
            mark_read: Debounce::new(MARK_READ_DELAY),
            read_due: false,
            sub,
        };
        center.load().await;
        center
    }

    pub async fn load(&mut self) {
        match self.ctx.api.notifications().await {
            Ok(feed) => {
                self.feed = feed;
                self.publish(None);
            }
            Err(e) => log::error!("Error loading notifications: {e}"),
        }
    }

    pub fn feed(&self) -> &NotificationFeed {
        &self.feed
    }

    pub fn unread(&self) -> u32 {
        self.feed.unread_count
    }

    pub fn badge(&self) -> Option<String> {
        self.feed.badge()
    }

    fn publish(&self, latest: Option<Notification>) {
        self.ctx.ui.send(UiEvent::NotificationsChanged {
            unread: self.feed.unread_count,
            badge: self.feed.badge(),
            latest,
        });
    }

    /// The user opened the feed; schedule marking it read.
    pub fn opened(&mut self) {
        if self.feed.unread_count > 0 {
            self.mark_read.schedule(());
        }
    }

    pub async fn mark_all_read(&mut self) {
        self.mark_read.cancel();
        let result = self.ctx.api.mark_notifications_read().await;
        self.read_due = false;
        if let Err(e) = result {
            log::error!("Error marking notifications as read: {e}");
            return;
        }
        self.feed.mark_all_read();
        self.publish(None);
    }

    pub async fn clear(&mut self) {
        match self.ctx.api.clear_notifications().await {
            Ok(()) => {
                self.feed.clear();
                self.publish(None);
                self.ctx.ui.toast(ToastLevel::Success, "Notifications cleared");
            }
            Err(e) => {
                log::error!("Error clearing notifications: {e}");
                self.ctx
                    .ui
                    .toast(ToastLevel::Error, e.user_message("Failed to clear notifications"));
            }
        }
    }

    pub fn handle(&mut self, envelope: Envelope) {
        if envelope.event != events::LIVE_NOTIFICATION {
            return;
        }
        let notification: Notification = envelope.payload_or_default();
        log::info!("Live notification: {}", notification.message);
        self.ctx.ui.toast(ToastLevel::Info, notification.message.clone());
        self.feed.push_live(notification);
        let latest = self.feed.notifications.first().cloned();
        self.publish(latest);
    }

    /// Returns `false` once the subscription has closed. Cancel-safe: a
    /// mark-read that was interrupted is retried on the next call.
    pub async fn step(&mut self) -> bool {
        if self.read_due {
            self.mark_all_read().await;
            return true;
        }
        tokio::select! {
            envelope = self.sub.recv() => match envelope {
                Some(envelope) => {
                    self.handle(envelope);
                    true
                }
                None => false,
            },
            () = self.mark_read.fired() => {
                self.read_due = true;
                self.mark_all_read().await;
                true
            }
        }
    }
}
