//! Explicit load-state machine: `Idle → Loading → Loaded | Error`.
//!
//! Loads are gated on the current state, so a second trigger while one is
//! running (or after one succeeded) is refused instead of duplicating data.

use crate::error::{AuraError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Mutex;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Loaded { at: DateTime<Utc> },
    Error { message: String },
}

impl LoadState {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadState::Loaded { .. })
    }
}

#[derive(Debug, Default)]
pub struct Loader {
    state: Mutex<LoadState>,
}

impl Loader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LoadState {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LoadState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Move to `Loading`. Errors while a load runs. Returns `false` without
    /// changing state when data is already loaded and `force` is unset.
    pub fn begin(&self, force: bool) -> Result<bool> {
        let mut state = self.lock();
        match &*state {
            LoadState::Loading => return Err(AuraError::LoadInProgress),
            LoadState::Loaded { .. } if !force => return Ok(false),
            _ => {}
        }
        *state = LoadState::Loading;
        Ok(true)
    }

    pub fn finish_ok(&self) {
        *self.lock() = LoadState::Loaded { at: Utc::now() };
    }

    pub fn finish_err(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(error = %message, "load failed");
        *self.lock() = LoadState::Error { message };
    }

    /// Run `load` under the state machine. Returns `Ok(None)` when skipped.
    pub fn run<T>(&self, force: bool, load: impl FnOnce() -> Result<T>) -> Result<Option<T>> {
        if !self.begin(force)? {
            return Ok(None);
        }
        match load() {
            Ok(v) => {
                self.finish_ok();
                Ok(Some(v))
            }
            Err(e) => {
                self.finish_err(e.to_string());
                Err(e)
            }
        }
    }
}
