pub mod events;
pub mod generate;
pub mod handoff;
pub mod hierarchy;
pub mod items;
pub mod preview;
pub mod reverse;
pub mod state;
pub mod workflow;
