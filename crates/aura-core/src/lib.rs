pub mod badges;
pub mod config;
pub mod error;
pub mod generation;
pub mod handoff;
pub mod hierarchy;
pub mod inflight;
pub mod io;
pub mod loader;
pub mod paths;
pub mod preview;
pub mod progress;
pub mod store;
pub mod types;
pub mod view_state;
pub mod work_item;

pub use error::{AuraError, Result};
