pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod message;
pub mod messenger;
pub mod notifier;
pub mod orchestrator;
pub mod pacing;
pub mod sources;
pub mod state;
