//! Room actor: an isolated Tokio task that owns one room.
//!
//! Everything that reads or changes a room goes through its mailbox, so
//! commands, membership events and reaper checks for the same room are
//! applied one at a time and in arrival order. Different rooms run in
//! different tasks and never wait on each other.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use voxroom_backend::{BackendError, ChannelBackend};
use voxroom_protocol::{ChannelId, Command, Notice, UserId};

use crate::access::{self, Decision};
use crate::plan::{self, PlanContext};
use crate::{Effect, EffectFailure, Room, RoomConfig, RoomError, RoomRegistry, RoomSnapshot};

/// What a successful command returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandOutcome {
    /// The room after the command.
    pub snapshot: RoomSnapshot,
    /// The effects that were carried out, in order.
    pub effects: Vec<Effect>,
}

/// Messages sent to a room actor through its mailbox.
pub(crate) enum RoomCommand {
    /// Run an admin command.
    Execute {
        actor: UserId,
        command: Command,
        reply: oneshot::Sender<Result<CommandOutcome, RoomError>>,
    },

    /// A user entered the room's channel.
    Joined {
        user: UserId,
        reply: oneshot::Sender<Result<Notice, RoomError>>,
    },

    /// A user left the room's channel.
    Left {
        user: UserId,
        reply: oneshot::Sender<Result<Notice, RoomError>>,
    },

    /// Destroy the room if it is older than `grace` and empty.
    Reap {
        grace: Duration,
        reply: oneshot::Sender<Result<Option<Notice>, RoomError>>,
    },

    Snapshot {
        reply: oneshot::Sender<RoomSnapshot>,
    },

    /// Replace the room state wholesale (rollback).
    Restore {
        room: Box<Room>,
        reply: oneshot::Sender<RoomSnapshot>,
    },

    /// Run effects without changing state (retry).
    Apply {
        effects: Vec<Effect>,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// Stop the actor without touching the backend.
    Shutdown,
}

/// A reply the actor has not sent yet.
///
/// Returned by the `enqueue_*` methods of [`RoomHandle`] so a caller can
/// put several messages in several mailboxes, in order, and only then
/// wait for the answers.
#[derive(Debug)]
pub struct PendingReply<T> {
    room_id: ChannelId,
    receiver: oneshot::Receiver<T>,
}

impl<T> PendingReply<T> {
    pub fn room_id(&self) -> ChannelId {
        self.room_id
    }

    /// Waits for the actor's answer. Fails with
    /// [`RoomError::Unavailable`] if the actor stopped first.
    pub async fn wait(self) -> Result<T, RoomError> {
        self.receiver
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id))
    }
}

/// Handle to a running room actor.
///
/// Cheap to clone: it is just an `mpsc::UnboundedSender` wrapper. The
/// [`RoomRegistry`] holds one per tracked room.
///
/// Queueing never waits, so a busy room cannot hold up whoever is
/// feeding events to the other rooms.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    room_id: ChannelId,
    sender: mpsc::UnboundedSender<RoomCommand>,
}

impl RoomHandle {
    /// Returns the room's id (its channel id).
    pub fn room_id(&self) -> ChannelId {
        self.room_id
    }

    fn enqueue<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> RoomCommand,
    ) -> Result<PendingReply<T>, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(make(reply_tx))
            .map_err(|_| RoomError::Unavailable(self.room_id))?;
        Ok(PendingReply {
            room_id: self.room_id,
            receiver: reply_rx,
        })
    }

    /// Runs an admin command and waits for the outcome.
    pub async fn execute(
        &self,
        actor: UserId,
        command: Command,
    ) -> Result<CommandOutcome, RoomError> {
        self.enqueue(|reply| RoomCommand::Execute {
            actor,
            command,
            reply,
        })?
        .wait()
        .await?
    }

    /// Queues a join without waiting for it to be handled.
    pub fn enqueue_joined(
        &self,
        user: UserId,
    ) -> Result<PendingReply<Result<Notice, RoomError>>, RoomError> {
        self.enqueue(|reply| RoomCommand::Joined { user, reply })
    }

    /// Queues a leave without waiting for it to be handled.
    pub fn enqueue_left(
        &self,
        user: UserId,
    ) -> Result<PendingReply<Result<Notice, RoomError>>, RoomError> {
        self.enqueue(|reply| RoomCommand::Left { user, reply })
    }

    /// Destroys the room if it is older than `grace` and empty. Returns
    /// the deletion notice if it did.
    pub async fn reap(&self, grace: Duration) -> Result<Option<Notice>, RoomError> {
        self.enqueue(|reply| RoomCommand::Reap { grace, reply })?
            .wait()
            .await?
    }

    pub async fn snapshot(&self) -> Result<RoomSnapshot, RoomError> {
        self.enqueue(|reply| RoomCommand::Snapshot { reply })?
            .wait()
            .await
    }

    /// Puts `room` back as the room's state.
    pub async fn restore(&self, room: Room) -> Result<RoomSnapshot, RoomError> {
        self.enqueue(|reply| RoomCommand::Restore {
            room: Box::new(room),
            reply,
        })?
        .wait()
        .await
    }

    /// Runs `effects` in order against the room's channel.
    pub async fn apply(&self, effects: Vec<Effect>) -> Result<(), RoomError> {
        self.enqueue(|reply| RoomCommand::Apply { effects, reply })?
            .wait()
            .await?
    }

    /// Tells the actor to stop. The channel resource is left alone.
    pub fn shutdown(&self) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Shutdown)
            .map_err(|_| RoomError::Unavailable(self.room_id))
    }
}

/// Whether the actor keeps running after a message.
enum Flow {
    Continue,
    Stop,
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor<B: ChannelBackend> {
    room: Room,
    backend: Arc<B>,
    registry: RoomRegistry,
    config: Arc<RoomConfig>,
    receiver: mpsc::UnboundedReceiver<RoomCommand>,
}

impl<B: ChannelBackend> RoomActor<B> {
    /// Runs the actor loop, processing messages until the room is
    /// destroyed or shut down.
    async fn run(mut self) {
        let room_id = self.room.id;
        tracing::info!(%room_id, owner = %self.room.owner, "room actor started");

        while let Some(msg) = self.receiver.recv().await {
            let flow = match msg {
                RoomCommand::Execute {
                    actor,
                    command,
                    reply,
                } => {
                    let result = self.handle_execute(actor, command).await;
                    let _ = reply.send(result);
                    Flow::Continue
                }
                RoomCommand::Joined { user, reply } => {
                    let result = self.handle_joined(user).await;
                    let _ = reply.send(result);
                    Flow::Continue
                }
                RoomCommand::Left { user, reply } => {
                    let (result, flow) = self.handle_left(user).await;
                    let _ = reply.send(result);
                    flow
                }
                RoomCommand::Reap { grace, reply } => {
                    let (result, flow) = self.handle_reap(grace).await;
                    let _ = reply.send(result);
                    flow
                }
                RoomCommand::Snapshot { reply } => {
                    let _ = reply.send(self.room.snapshot());
                    Flow::Continue
                }
                RoomCommand::Restore { room, reply } => {
                    tracing::info!(%room_id, "room state restored");
                    self.room = *room;
                    let _ = reply.send(self.room.snapshot());
                    Flow::Continue
                }
                RoomCommand::Apply { effects, reply } => {
                    let current = self.room.clone();
                    let result = self.run_effects(&effects, current).await;
                    let _ = reply.send(result);
                    Flow::Continue
                }
                RoomCommand::Shutdown => {
                    tracing::info!(%room_id, "room shutting down");
                    Flow::Stop
                }
            };
            if matches!(flow, Flow::Stop) {
                break;
            }
        }

        tracing::info!(%room_id, "room actor stopped");
    }

    async fn handle_execute(
        &mut self,
        actor: UserId,
        command: Command,
    ) -> Result<CommandOutcome, RoomError> {
        let room_id = self.room.id;
        let action = command.action();
        tracing::trace!(%room_id, %actor, %action, target = ?command.target(), "command received");

        let mut ctx = PlanContext::default();
        if PlanContext::needs_occupants(&command) {
            ctx.occupants = self
                .backend
                .current_occupants(room_id)
                .await
                .map_err(RoomError::Lookup)?;
        }

        let plan = match plan::plan(&self.room, actor, &command, &ctx, &self.config) {
            Ok(plan) => plan,
            Err(err) => {
                tracing::debug!(%room_id, %actor, %action, %err, "command refused");
                return Err(err);
            }
        };

        let previous = std::mem::replace(&mut self.room, plan.next);
        if !action.is_read_only() {
            tracing::info!(
                %room_id,
                %actor,
                %action,
                effects = plan.effects.len(),
                "command applied"
            );
        }

        self.run_effects(&plan.effects, previous).await?;

        Ok(CommandOutcome {
            snapshot: self.room.snapshot(),
            effects: plan.effects,
        })
    }

    /// Runs effects in order, stopping at the first failure.
    async fn run_effects(&self, effects: &[Effect], previous: Room) -> Result<(), RoomError> {
        let room_id = self.room.id;
        for (i, effect) in effects.iter().enumerate() {
            if let Err(source) = effect.execute(self.backend.as_ref(), room_id).await {
                tracing::warn!(
                    %room_id,
                    ?effect,
                    error = %source,
                    pending = effects.len() - i - 1,
                    "effect failed after state change"
                );
                return Err(RoomError::ExternalEffectFailed(Box::new(EffectFailure {
                    room: room_id,
                    previous,
                    failed: effect.clone(),
                    pending: effects[i + 1..].to_vec(),
                    source,
                })));
            }
        }
        Ok(())
    }

    async fn handle_joined(&mut self, user: UserId) -> Result<Notice, RoomError> {
        let channel = self.room.id;
        if access::connect_eligibility(&self.room, user) == Decision::Denied {
            // The event may be stale: only disconnect the user if they are
            // still in this channel.
            let present = match self.backend.current_occupants(channel).await {
                Ok(occupants) => occupants.contains(&user),
                Err(BackendError::UnknownChannel(_)) => false,
                Err(err) => return Err(err.into()),
            };
            if present {
                tracing::info!(room_id = %channel, %user, "blacklisted user entered, evicting");
                self.backend.move_user(user, None).await?;
                return Ok(Notice::Evicted { channel, user });
            }
            tracing::debug!(room_id = %channel, %user, "blacklisted user already gone");
        }
        tracing::debug!(room_id = %channel, %user, "user joined");
        Ok(Notice::Joined { channel, user })
    }

    async fn handle_left(&mut self, user: UserId) -> (Result<Notice, RoomError>, Flow) {
        let channel = self.room.id;
        match self.destroy_if_empty().await {
            Ok(Some(notice)) => (Ok(notice), Flow::Stop),
            Ok(None) => {
                tracing::debug!(room_id = %channel, %user, "user left");
                (Ok(Notice::Left { channel, user }), Flow::Continue)
            }
            Err(err) => (Err(err), Flow::Continue),
        }
    }

    async fn handle_reap(&mut self, grace: Duration) -> (Result<Option<Notice>, RoomError>, Flow) {
        if self.room.age() < grace {
            return (Ok(None), Flow::Continue);
        }
        match self.destroy_if_empty().await {
            Ok(Some(notice)) => {
                tracing::info!(room_id = %self.room.id, "idle room reaped");
                (Ok(Some(notice)), Flow::Stop)
            }
            Ok(None) => (Ok(None), Flow::Continue),
            Err(err) => (Err(err), Flow::Continue),
        }
    }

    /// Deletes the channel and drops the registry entry if nobody is
    /// connected. A channel that is already gone counts as deleted.
    async fn destroy_if_empty(&mut self) -> Result<Option<Notice>, RoomError> {
        let channel = self.room.id;
        match self.backend.current_occupants(channel).await {
            Ok(occupants) if !occupants.is_empty() => return Ok(None),
            Ok(_) | Err(BackendError::UnknownChannel(_)) => {}
            Err(err) => return Err(err.into()),
        }

        match self.backend.delete_channel(channel).await {
            Ok(()) | Err(BackendError::UnknownChannel(_)) => {}
            Err(err) => {
                tracing::error!(room_id = %channel, error = %err, "failed to delete empty room");
                return Err(err.into());
            }
        }
        self.registry.remove(channel).await;

        tracing::info!(room_id = %channel, name = %self.room.name, "room destroyed");
        Ok(Some(Notice::Deleted {
            channel,
            name: self.room.name.clone(),
        }))
    }
}

/// Spawns a room actor task and returns a handle to it.
pub(crate) fn spawn_room<B: ChannelBackend>(
    room: Room,
    backend: Arc<B>,
    registry: RoomRegistry,
    config: Arc<RoomConfig>,
) -> RoomHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    let room_id = room.id;

    let actor = RoomActor {
        room,
        backend,
        registry,
        config,
        receiver: rx,
    };

    tokio::spawn(actor.run());

    RoomHandle {
        room_id,
        sender: tx,
    }
}
