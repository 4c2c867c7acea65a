//! In-process backend.
//!
//! Models just enough of a voice platform to drive the room core end to
//! end: channels with permission overrides and limits, where each user is
//! connected, who is muted, and display names. Every move it performs is
//! recorded as a [`TransitionEvent`] so a harness can feed it back in the
//! same way a real gateway would.
//!
//! Failures can be injected per operation with [`MemoryBackend::fail_next`].

use std::collections::{HashMap, HashSet, VecDeque};

use tokio::sync::Mutex;
use voxroom_protocol::{ChannelId, GroupId, TransitionEvent, UserId};

use crate::{
    BackendError, ChannelBackend, ChannelEdit, ChannelSpec, PermissionOverride, PermissionTarget,
    UserLimit, VoiceState,
};

/// Bitrate a channel gets when the creator does not ask for one.
const PLATFORM_DEFAULT_BITRATE_KBPS: u32 = 64;

/// One backend operation, for failure injection and call counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendOp {
    CreateChannel,
    DeleteChannel,
    EditChannel,
    SetPermission,
    MoveUser,
    SetVoiceState,
    CurrentOccupants,
    DisplayName,
    EnsureGroup,
    FindChannel,
}

/// A channel as the memory backend stores it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRecord {
    pub name: String,
    pub parent: Option<GroupId>,
    pub limit: UserLimit,
    pub bitrate_kbps: u32,
    pub overrides: HashMap<PermissionTarget, PermissionOverride>,
}

impl ChannelRecord {
    /// The override set for `target`, if any.
    pub fn override_for(&self, target: PermissionTarget) -> Option<PermissionOverride> {
        self.overrides.get(&target).copied()
    }

    /// Resolves the connect bit for `user`: a user override wins over the
    /// `Everyone` override, and no override at all means allowed.
    pub fn allows_connect(&self, user: UserId) -> bool {
        let user_bit = self
            .override_for(PermissionTarget::User(user))
            .and_then(|o| o.connect);
        let everyone_bit = self
            .override_for(PermissionTarget::Everyone)
            .and_then(|o| o.connect);
        user_bit.or(everyone_bit).unwrap_or(true)
    }

    /// Returns `true` if `user` holds an explicit manage grant.
    pub fn allows_manage(&self, user: UserId) -> bool {
        self.override_for(PermissionTarget::User(user))
            .and_then(|o| o.manage)
            .unwrap_or(false)
    }
}

#[derive(Debug, Default)]
struct State {
    channels: HashMap<ChannelId, ChannelRecord>,
    locations: HashMap<UserId, ChannelId>,
    muted: HashSet<UserId>,
    names: HashMap<UserId, String>,
    groups: HashMap<String, GroupId>,
    next_id: u64,
    failures: HashMap<BackendOp, VecDeque<BackendError>>,
    calls: HashMap<BackendOp, usize>,
    events: Vec<TransitionEvent>,
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Counts the call and pops an injected failure, if one is queued.
    fn begin(&mut self, op: BackendOp) -> Result<(), BackendError> {
        *self.calls.entry(op).or_default() += 1;
        match self.failures.get_mut(&op).and_then(VecDeque::pop_front) {
            Some(err) => {
                tracing::debug!(?op, %err, "injected backend failure");
                Err(err)
            }
            None => Ok(()),
        }
    }

    fn occupants(&self, channel: ChannelId) -> HashSet<UserId> {
        self.locations
            .iter()
            .filter(|(_, c)| **c == channel)
            .map(|(u, _)| *u)
            .collect()
    }

    /// Moves `user` and records the resulting event. No event for a no-op.
    fn relocate(&mut self, user: UserId, to: Option<ChannelId>) -> TransitionEvent {
        let from = match to {
            Some(channel) => self.locations.insert(user, channel),
            None => self.locations.remove(&user),
        };
        let event = TransitionEvent::new(user, from, to);
        if !event.is_noop() {
            self.events.push(event);
        }
        event
    }
}

/// A [`ChannelBackend`] that keeps everything in memory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes a user known to the platform under a display name.
    pub async fn register_user(&self, user: UserId, name: impl Into<String>) {
        self.state.lock().await.names.insert(user, name.into());
    }

    /// A user-initiated connect (or disconnect, with `None`).
    ///
    /// Unlike [`ChannelBackend::move_user`], which is a privileged move,
    /// this honours the target channel's connect permission and user
    /// limit, the way a client joining on its own would be checked. The
    /// resulting event is returned and also recorded for
    /// [`take_events`](Self::take_events).
    pub async fn connect(
        &self,
        user: UserId,
        to: Option<ChannelId>,
    ) -> Result<TransitionEvent, BackendError> {
        let mut state = self.state.lock().await;
        if let Some(channel) = to {
            let record = state
                .channels
                .get(&channel)
                .ok_or(BackendError::UnknownChannel(channel))?;
            if !record.allows_connect(user) {
                return Err(BackendError::Rejected(format!(
                    "{user} may not connect to {channel}"
                )));
            }
            if let UserLimit::Max(max) = record.limit {
                let inside = state.occupants(channel);
                if !inside.contains(&user) && inside.len() >= max as usize {
                    return Err(BackendError::Rejected(format!("{channel} is full")));
                }
            }
        }
        Ok(state.relocate(user, to))
    }

    /// Drains the transition events produced since the last call.
    pub async fn take_events(&self) -> Vec<TransitionEvent> {
        std::mem::take(&mut self.state.lock().await.events)
    }

    /// Makes the next call of `op` fail with [`BackendError::Unavailable`].
    pub async fn fail_next(&self, op: BackendOp) {
        self.fail_next_with(op, BackendError::Unavailable(format!("{op:?} timed out")))
            .await;
    }

    /// Makes the next call of `op` fail with `err`. Calls queue up.
    pub async fn fail_next_with(&self, op: BackendOp, err: BackendError) {
        self.state
            .lock()
            .await
            .failures
            .entry(op)
            .or_default()
            .push_back(err);
    }

    /// How many times `op` has been called, failed calls included.
    pub async fn calls(&self, op: BackendOp) -> usize {
        self.state
            .lock()
            .await
            .calls
            .get(&op)
            .copied()
            .unwrap_or(0)
    }

    /// A copy of a channel's current record.
    pub async fn channel(&self, channel: ChannelId) -> Option<ChannelRecord> {
        self.state.lock().await.channels.get(&channel).cloned()
    }

    pub async fn channel_count(&self) -> usize {
        self.state.lock().await.channels.len()
    }

    /// Where a user is connected, if anywhere.
    pub async fn location(&self, user: UserId) -> Option<ChannelId> {
        self.state.lock().await.locations.get(&user).copied()
    }

    pub async fn is_muted(&self, user: UserId) -> bool {
        self.state.lock().await.muted.contains(&user)
    }
}

impl ChannelBackend for MemoryBackend {
    async fn create_channel(&self, spec: ChannelSpec) -> Result<ChannelId, BackendError> {
        let mut state = self.state.lock().await;
        state.begin(BackendOp::CreateChannel)?;

        let id = ChannelId(state.next_id());
        let overrides = spec
            .permissions
            .into_iter()
            .filter(|(_, o)| !o.is_inherit())
            .collect();
        let record = ChannelRecord {
            name: spec.name,
            parent: spec.parent,
            limit: spec.limit,
            bitrate_kbps: spec.bitrate_kbps.unwrap_or(PLATFORM_DEFAULT_BITRATE_KBPS),
            overrides,
        };
        tracing::debug!(channel = %id, name = %record.name, "channel created");
        state.channels.insert(id, record);
        Ok(id)
    }

    async fn delete_channel(&self, channel: ChannelId) -> Result<(), BackendError> {
        let mut state = self.state.lock().await;
        state.begin(BackendOp::DeleteChannel)?;

        if state.channels.remove(&channel).is_none() {
            return Err(BackendError::UnknownChannel(channel));
        }
        for user in state.occupants(channel) {
            state.relocate(user, None);
        }
        tracing::debug!(%channel, "channel deleted");
        Ok(())
    }

    async fn edit_channel(&self, channel: ChannelId, edit: ChannelEdit) -> Result<(), BackendError> {
        let mut state = self.state.lock().await;
        state.begin(BackendOp::EditChannel)?;

        let record = state
            .channels
            .get_mut(&channel)
            .ok_or(BackendError::UnknownChannel(channel))?;
        if let Some(name) = edit.name {
            record.name = name;
        }
        if let Some(limit) = edit.limit {
            record.limit = limit;
        }
        if let Some(kbps) = edit.bitrate_kbps {
            record.bitrate_kbps = kbps;
        }
        Ok(())
    }

    async fn set_permission(
        &self,
        channel: ChannelId,
        target: PermissionTarget,
        permissions: PermissionOverride,
    ) -> Result<(), BackendError> {
        let mut state = self.state.lock().await;
        state.begin(BackendOp::SetPermission)?;

        let record = state
            .channels
            .get_mut(&channel)
            .ok_or(BackendError::UnknownChannel(channel))?;
        if permissions.is_inherit() {
            record.overrides.remove(&target);
        } else {
            record.overrides.insert(target, permissions);
        }
        Ok(())
    }

    async fn move_user(&self, user: UserId, to: Option<ChannelId>) -> Result<(), BackendError> {
        let mut state = self.state.lock().await;
        state.begin(BackendOp::MoveUser)?;

        if !state.locations.contains_key(&user) {
            return Err(BackendError::Rejected(format!(
                "{user} is not connected to voice"
            )));
        }
        if let Some(channel) = to {
            if !state.channels.contains_key(&channel) {
                return Err(BackendError::UnknownChannel(channel));
            }
        }
        state.relocate(user, to);
        Ok(())
    }

    async fn set_voice_state(&self, user: UserId, voice: VoiceState) -> Result<(), BackendError> {
        let mut state = self.state.lock().await;
        state.begin(BackendOp::SetVoiceState)?;

        if !state.locations.contains_key(&user) {
            return Err(BackendError::Rejected(format!(
                "{user} is not connected to voice"
            )));
        }
        match voice.muted {
            Some(true) => {
                state.muted.insert(user);
            }
            Some(false) => {
                state.muted.remove(&user);
            }
            None => {}
        }
        Ok(())
    }

    async fn current_occupants(&self, channel: ChannelId) -> Result<HashSet<UserId>, BackendError> {
        let mut state = self.state.lock().await;
        state.begin(BackendOp::CurrentOccupants)?;

        if !state.channels.contains_key(&channel) {
            return Err(BackendError::UnknownChannel(channel));
        }
        Ok(state.occupants(channel))
    }

    async fn display_name(&self, user: UserId) -> Result<String, BackendError> {
        let mut state = self.state.lock().await;
        state.begin(BackendOp::DisplayName)?;

        state
            .names
            .get(&user)
            .cloned()
            .ok_or(BackendError::UnknownUser(user))
    }

    async fn ensure_group(&self, name: &str) -> Result<GroupId, BackendError> {
        let mut state = self.state.lock().await;
        state.begin(BackendOp::EnsureGroup)?;

        if let Some(group) = state.groups.get(name) {
            return Ok(*group);
        }
        let group = GroupId(state.next_id());
        state.groups.insert(name.to_string(), group);
        tracing::debug!(%group, name, "group created");
        Ok(group)
    }

    async fn find_channel(
        &self,
        name: &str,
        parent: Option<GroupId>,
    ) -> Result<Option<ChannelId>, BackendError> {
        let mut state = self.state.lock().await;
        state.begin(BackendOp::FindChannel)?;

        Ok(state
            .channels
            .iter()
            .filter(|(_, r)| r.name == name && r.parent == parent)
            .map(|(id, _)| *id)
            .min())
    }
}
