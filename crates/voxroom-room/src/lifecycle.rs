//! Lifecycle: reacting to membership transition events.
//!
//! ```text
//! into spawn room        → create a room for the user, move them in
//! into a tracked room    → Joined (or Evicted if blacklisted)
//! out of a tracked room  → Deleted if now empty, Left otherwise
//! ```
//!
//! Handling is split in two so that a caller consuming an event stream
//! can keep per-room order without waiting on any single room:
//! [`RoomManager::dispatch_event`] updates presence and puts the event in
//! the affected rooms' mailboxes, in order; the returned [`EventTicket`]
//! then waits for the answers and can be settled on another task.

use std::time::Duration;

use tokio::task::JoinHandle;
use voxroom_backend::ChannelBackend;
use voxroom_protocol::{Notice, TransitionEvent, UserId};

use crate::room::PendingReply;
use crate::{CreateRequest, RoomError, RoomManager};

enum Pending {
    /// An answer from a room actor.
    Room(PendingReply<Result<Notice, RoomError>>),
    /// A room being created for a user who entered the spawn room.
    Spawn(JoinHandle<Result<Notice, RoomError>>),
}

/// The outstanding work for one dispatched event.
#[must_use = "an event ticket does nothing until settled"]
pub struct EventTicket<B: ChannelBackend> {
    manager: RoomManager<B>,
    pending: Vec<Pending>,
}

impl<B: ChannelBackend> EventTicket<B> {
    /// Returns `true` if the event touched no tracked room.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Waits for every room the event reached and collects the notices,
    /// join side first.
    ///
    /// A room that was destroyed before it got to the event contributes
    /// nothing. If any room reports an error the first one is returned,
    /// after the others have been waited for; notices produced meanwhile
    /// are still published.
    pub async fn settle(self) -> Result<Vec<Notice>, RoomError> {
        let mut notices = Vec::with_capacity(self.pending.len());
        let mut first_error = None;

        for pending in self.pending {
            let result = match pending {
                Pending::Room(reply) => match reply.wait().await {
                    Ok(result) => result,
                    Err(RoomError::Unavailable(room_id)) => {
                        tracing::debug!(%room_id, "room gone before event was handled");
                        continue;
                    }
                    Err(err) => Err(err),
                },
                Pending::Spawn(task) => match task.await {
                    Ok(result) => result,
                    Err(join_err) => {
                        tracing::error!(error = %join_err, "room creation task failed");
                        continue;
                    }
                },
            };

            match result {
                Ok(notice) => {
                    self.manager.conclude(&notice).await;
                    notices.push(notice);
                }
                Err(err) => {
                    tracing::warn!(%err, "event handling failed");
                    first_error.get_or_insert(err);
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(notices),
        }
    }
}

impl<B: ChannelBackend> RoomManager<B> {
    /// Handles one transition event to completion.
    ///
    /// Equivalent to [`dispatch_event`](Self::dispatch_event) followed by
    /// [`EventTicket::settle`].
    pub async fn handle_event(&self, event: TransitionEvent) -> Result<Vec<Notice>, RoomError> {
        self.dispatch_event(event).await.settle().await
    }

    /// Applies `event` to presence and delivers it to the rooms it
    /// concerns, without waiting for them.
    ///
    /// Events that do not change membership are ignored. Two events for
    /// the same room dispatched one after the other are handled by that
    /// room in the same order.
    pub async fn dispatch_event(&self, event: TransitionEvent) -> EventTicket<B> {
        let mut ticket = EventTicket {
            manager: self.clone(),
            pending: Vec::new(),
        };

        let transition = self.presence.lock().await.apply(&event);
        let Some(transition) = transition else {
            return ticket;
        };
        let user = transition.user;

        if let Some(to) = transition.joined {
            if self.is_spawn(to) {
                let manager = self.clone();
                ticket
                    .pending
                    .push(Pending::Spawn(tokio::spawn(async move {
                        manager.create_from_spawn(user).await
                    })));
            } else if let Some(handle) = self.registry.get(to).await {
                match handle.enqueue_joined(user) {
                    Ok(reply) => ticket.pending.push(Pending::Room(reply)),
                    Err(err) => tracing::debug!(room_id = %to, %err, "join not delivered"),
                }
            }
        }

        if let Some(from) = transition.left {
            if let Some(handle) = self.registry.get(from).await {
                match handle.enqueue_left(user) {
                    Ok(reply) => ticket.pending.push(Pending::Room(reply)),
                    Err(err) => tracing::debug!(room_id = %from, %err, "leave not delivered"),
                }
            }
        }

        ticket
    }

    /// Publishes a lifecycle notice. A deleted room's channel is also
    /// dropped from presence, so no stale location can point at it.
    async fn conclude(&self, notice: &Notice) {
        if let Notice::Deleted { channel, .. } = notice {
            self.presence.lock().await.forget_channel(*channel);
        }
        self.publish(notice);
    }

    async fn create_from_spawn(&self, owner: UserId) -> Result<Notice, RoomError> {
        let snapshot = self
            .create_unpublished(owner, CreateRequest::default())
            .await?;
        Ok(Notice::Created {
            channel: snapshot.id,
            owner,
            name: snapshot.name,
        })
    }

    /// Destroys every room older than `grace` that has nobody in it.
    ///
    /// Catches rooms that were created but never entered, which no leave
    /// event will ever clean up. Returns the deletion notices.
    pub async fn reap_idle(&self, grace: Duration) -> Vec<Notice> {
        let mut notices = Vec::new();
        for handle in self.registry.handles().await {
            let room_id = handle.room_id();
            match handle.reap(grace).await {
                Ok(Some(notice)) => {
                    self.conclude(&notice).await;
                    notices.push(notice);
                }
                Ok(None) | Err(RoomError::Unavailable(_)) => {}
                Err(err) => tracing::warn!(%room_id, %err, "reaping room failed"),
            }
        }
        notices
    }
}
