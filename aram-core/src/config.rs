//! Runtime configuration.
//!
//! Configuration is per thread, like the rest of the runtime. It is read on
//! every scheduled update, so changes take effect immediately.

use std::cell::RefCell;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default cap on scheduled updates within one animation frame.
pub const DEFAULT_MAX_UPDATES_PER_FRAME: usize = 100;

/// Tunables for the reactive runtime.
///
/// Every field has a default, so a partial JSON document is accepted:
///
/// ```rust
/// use aram_core::config::RuntimeConfig;
///
/// let config = RuntimeConfig::from_json(r#"{ "frame_guard": true }"#).unwrap();
/// assert!(config.frame_guard);
/// assert_eq!(config.max_updates_per_frame, 100);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Emit diagnostics for dropped updates and duplicate list keys.
    pub dev_mode: bool,

    /// Cap applied by the frame guard.
    pub max_updates_per_frame: usize,

    /// Route every cell notification through the frame guard, not just
    /// explicit [`crate::reactive::safe_schedule_update`] calls.
    pub frame_guard: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            dev_mode: true,
            max_updates_per_frame: DEFAULT_MAX_UPDATES_PER_FRAME,
            frame_guard: false,
        }
    }
}

impl RuntimeConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

thread_local! {
    static CONFIG: RefCell<RuntimeConfig> = RefCell::new(RuntimeConfig::default());
}

/// Install a configuration for the current thread.
pub fn configure(config: RuntimeConfig) {
    CONFIG.with(|current| *current.borrow_mut() = config);
}

/// The configuration currently in effect.
pub fn config() -> RuntimeConfig {
    CONFIG.with(|current| current.borrow().clone())
}

/// Toggle development diagnostics.
pub fn set_dev_mode(dev_mode: bool) {
    CONFIG.with(|current| current.borrow_mut().dev_mode = dev_mode);
}

pub(crate) fn is_dev_mode() -> bool {
    CONFIG.with(|current| current.borrow().dev_mode)
}
