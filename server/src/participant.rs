//! Membership records kept by a game for each joined player.

use crate::rules::ParticipantExt;
use crate::state::ParticipantState;
use crate::utils::lock;
use host::{EntityHandle, Player, Tx};
use log::warn;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// One player's membership in one game.
///
/// Name and XUID are copied when the player joins and never change. The
/// entity handle and the rules extension are released by [`close`], which
/// runs its cleanup exactly once.
///
/// [`close`]: Participant::close
pub struct Participant {
    name: String,
    xuid: String,
    handle: Mutex<Option<EntityHandle>>,
    state: Mutex<ParticipantState>,
    vote: Mutex<Option<usize>>,
    ext: Mutex<Option<Box<dyn ParticipantExt>>>,
    closed: AtomicBool,
}

impl Participant {
    pub(crate) fn new(name: impl Into<String>, xuid: impl Into<String>, handle: EntityHandle) -> Self {
        Self {
            name: name.into(),
            xuid: xuid.into(),
            handle: Mutex::new(Some(handle)),
            state: Mutex::new(ParticipantState::Playing),
            vote: Mutex::new(None),
            ext: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn xuid(&self) -> &str {
        &self.xuid
    }

    pub fn state(&self) -> ParticipantState {
        *lock(&self.state)
    }

    pub(crate) fn set_state(&self, state: ParticipantState) {
        *lock(&self.state) = state;
    }

    /// Handle of the participant's entity; `None` once closed.
    pub fn handle(&self) -> Option<EntityHandle> {
        lock(&self.handle).clone()
    }

    /// The participant's player entity, if it is inside `tx`'s world.
    pub fn player<'t>(&self, tx: &'t Tx<'_>) -> Option<&'t Player> {
        let handle = self.handle()?;
        tx.player(&handle)
    }

    pub fn player_mut<'t>(&self, tx: &'t mut Tx<'_>) -> Option<&'t mut Player> {
        let handle = self.handle()?;
        tx.player_mut(&handle)
    }

    pub fn vote(&self) -> Option<usize> {
        *lock(&self.vote)
    }

    pub(crate) fn set_vote(&self, index: usize) {
        *lock(&self.vote) = Some(index);
    }

    /// Removes the vote so that it is counted at most once.
    pub(crate) fn take_vote(&self) -> Option<usize> {
        lock(&self.vote).take()
    }

    pub(crate) fn set_ext(&self, ext: Box<dyn ParticipantExt>) {
        *lock(&self.ext) = Some(ext);
    }

    /// Runs `f` on the rules extension if it is of type `T`.
    pub fn with_ext<T: 'static, R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let mut ext = lock(&self.ext);
        let ext = ext.as_mut()?;
        ext.as_any_mut().downcast_mut::<T>().map(f)
    }

    pub fn closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Releases the extension and the entity handle. Only the first call
    /// does anything.
    pub(crate) fn close(&self) {
        if self
            .closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        if let Some(mut ext) = lock(&self.ext).take() {
            if let Err(err) = ext.close() {
                warn!("Closing participant {} failed: {}", self.name, err);
            }
        }
        *lock(&self.handle) = None;
    }
}

impl fmt::Debug for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Participant")
            .field("name", &self.name)
            .field("xuid", &self.xuid)
            .field("state", &self.state())
            .field("closed", &self.closed())
            .finish_non_exhaustive()
    }
}
