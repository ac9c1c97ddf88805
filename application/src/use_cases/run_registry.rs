//! Per-chat run state
//!
//! Each conversation owns its last-known [`WavePlan`] and at most one
//! in-flight run. Starting a run cancels the previous one for the same
//! chat; switching the active chat cancels whatever the previous chat had
//! in flight and swaps in the new chat's plan.

use council_domain::WavePlan;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Chat used when the caller never selects one
pub const DEFAULT_CHAT: &str = "default";

#[derive(Debug, Default)]
struct ChatRunState {
    plan: Option<WavePlan>,
    token: Option<CancellationToken>,
    run_id: u64,
}

#[derive(Debug)]
struct Inner {
    active_chat: String,
    chats: HashMap<String, ChatRunState>,
    next_run: u64,
}

/// Plans and abort handles keyed by chat id
#[derive(Debug)]
pub struct RunRegistry {
    inner: Mutex<Inner>,
}

impl Default for RunRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RunRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                active_chat: DEFAULT_CHAT.to_string(),
                chats: HashMap::new(),
                next_run: 1,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn active_chat(&self) -> String {
        self.lock().active_chat.clone()
    }

    /// Register a new run for `chat`, cancelling the one it replaces
    pub fn begin(&self, chat: &str) -> (u64, CancellationToken) {
        let mut inner = self.lock();
        let run_id = inner.next_run;
        inner.next_run += 1;

        let state = inner.chats.entry(chat.to_string()).or_default();
        if let Some(previous) = state.token.take() {
            debug!(chat, previous_run = state.run_id, "Cancelling superseded run");
            previous.cancel();
        }

        let token = CancellationToken::new();
        state.token = Some(token.clone());
        state.run_id = run_id;
        state.plan = None;
        (run_id, token)
    }

    /// Store `plan` as the chat's current plan.
    ///
    /// Ignored (returns false) once the run has been cancelled or superseded,
    /// so nothing a cancelled run does becomes visible.
    pub fn publish(&self, chat: &str, run_id: u64, plan: &WavePlan) -> bool {
        let mut inner = self.lock();
        let Some(state) = inner.chats.get_mut(chat) else {
            return false;
        };
        let live = state.run_id == run_id && state.token.as_ref().is_some_and(|t| !t.is_cancelled());
        if live {
            state.plan = Some(plan.clone());
        }
        live
    }

    /// Last-known plan for `chat`
    pub fn plan(&self, chat: &str) -> Option<WavePlan> {
        self.lock().chats.get(chat).and_then(|s| s.plan.clone())
    }

    /// Cancel the in-flight run of `chat`, if any. The plan stays as last
    /// published.
    pub fn abort(&self, chat: &str) -> bool {
        let mut inner = self.lock();
        match inner.chats.get_mut(chat).and_then(|s| s.token.take()) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Switch the active chat, cancelling the previous chat's run.
    /// Returns the new chat's last-known plan.
    pub fn set_active_chat(&self, chat: &str) -> Option<WavePlan> {
        let mut inner = self.lock();
        if inner.active_chat != chat {
            let previous = std::mem::replace(&mut inner.active_chat, chat.to_string());
            if let Some(token) = inner.chats.get_mut(&previous).and_then(|s| s.token.take()) {
                debug!(chat = previous.as_str(), "Cancelling run of inactive chat");
                token.cancel();
            }
        }
        inner.chats.get(chat).and_then(|s| s.plan.clone())
    }

    /// Drop the abort handle once `run_id` has ended
    pub fn finish(&self, chat: &str, run_id: u64) {
        let mut inner = self.lock();
        if let Some(state) = inner.chats.get_mut(chat)
            && state.run_id == run_id
        {
            state.token = None;
        }
    }
}
