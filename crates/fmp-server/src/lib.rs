//! Mission planner worker: HTTP surface over the mission compiler, grid
//! builder, and region provider.

pub mod api;
pub mod artifacts;
pub mod config;
pub mod state;
