//! Workspace room membership and roster.

use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use crate::context::SessionContext;
use crate::presence::PresenceRoom;
use crate::protocol::{events, Envelope, MemberPayload, PresencePayload, Scope};
use crate::router::Subscription;
use crate::ui::{ToastLevel, UiEvent};

pub const WORKSPACE_EVENTS: &[&str] = &[events::USER_JOINED, events::USER_LEFT, events::USER_PRESENCE];

pub struct WorkspacePresence {
    ctx: SessionContext,
    workspace_id: String,
    scope: Scope,
    room: PresenceRoom,
    online_count: usize,
    idle_sweep: Interval,
    sub: Subscription,
}

impl WorkspacePresence {
    /// Join the workspace room. The join is replayed after reconnects.
    pub async fn join(ctx: SessionContext, workspace_id: &str) -> Self {
        let scope = Scope::Workspace(workspace_id.to_string());
        let sub = ctx.subscribe(scope.clone(), WORKSPACE_EVENTS);
        let join = Envelope::join_workspace(ctx.identity(), workspace_id);
        sub.set_rejoin(join.clone());
        ctx.emit(join).await;

        let timing = &ctx.timing;
        let room = PresenceRoom::new(ctx.identity().clone(), timing.remote_typing_ttl)
            .with_idle_timeout(timing.peer_idle_timeout);
        let mut idle_sweep = interval_at(Instant::now() + timing.idle_sweep, timing.idle_sweep);
        idle_sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            ctx,
            workspace_id: workspace_id.to_string(),
            scope,
            room,
            online_count: 0,
            idle_sweep,
            sub,
        }
    }

    pub fn workspace_id(&self) -> &str {
        &self.workspace_id
    }

    /// Online count as last reported by the server, self included.
    pub fn online_count(&self) -> usize {
        self.online_count
    }

    pub fn room(&self) -> &PresenceRoom {
        &self.room
    }

    pub fn handle(&mut self, envelope: Envelope) {
        match envelope.event.as_str() {
            events::USER_JOINED => {
                let member: MemberPayload = envelope.payload_or_default();
                if self.room.joined(&member.user_id, &member.username) {
                    let message = member
                        .message
                        .unwrap_or_else(|| format!("{} joined the workspace", member.username));
                    self.ctx.ui.toast(ToastLevel::Info, message);
                }
            }
            events::USER_LEFT => {
                let member: MemberPayload = envelope.payload_or_default();
                if self.room.left(&member.user_id, &member.username).is_some() {
                    self.ctx
                        .ui
                        .toast(ToastLevel::Info, format!("{} left the workspace", member.username));
                }
            }
            events::USER_PRESENCE => {
                let presence: PresencePayload = envelope.payload_or_default();
                self.room.replace_roster(&presence.users);
                self.online_count = presence.online_count;
                self.ctx.ui.send(UiEvent::ActiveUsers {
                    scope: self.scope.clone(),
                    online_count: presence.online_count,
                    users: presence.users,
                });
            }
            other => log::debug!("Workspace ignoring '{other}'"),
        }
    }

    /// Drop members that went quiet without a `user_left` and publish the
    /// shrunken roster.
    pub fn sweep_idle(&mut self) -> usize {
        let idle = self.room.cleanup_idle();
        if idle.is_empty() {
            return 0;
        }
        for peer in &idle {
            log::info!("{} idle in {}, dropping", peer.display_name(), self.workspace_id);
        }
        self.online_count = self.online_count.saturating_sub(idle.len());
        self.ctx.ui.send(UiEvent::ActiveUsers {
            scope: self.scope.clone(),
            online_count: self.online_count,
            users: self.room.active_users(),
        });
        idle.len()
    }

    /// Returns `false` once the subscription has closed.
    pub async fn step(&mut self) -> bool {
        tokio::select! {
            envelope = self.sub.recv() => match envelope {
                Some(envelope) => {
                    self.handle(envelope);
                    true
                }
                None => false,
            },
            _ = self.idle_sweep.tick() => {
                self.sweep_idle();
                true
            }
        }
    }

    pub async fn leave(self) {
        let leave = Envelope::leave_workspace(self.ctx.identity(), &self.workspace_id);
        self.ctx.emit(leave).await;
        log::info!("Left workspace {}", self.workspace_id);
    }
}
