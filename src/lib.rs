#![warn(clippy::all)]

pub mod constants;
pub mod features;
pub mod game_loop;
pub mod logging;
pub mod machine_tick;
pub mod military;
pub mod missions;
pub mod stats;
pub mod transfer;
pub mod world;

#[cfg(test)]
mod testing;

pub use features::Features;
pub use game_loop::TacticsEngine;
pub use stats::TickStats;
pub use world::{AgentFlags, AgentId, AgentInfo, Order, OrderKind, OrderSink, OrderTarget, PlayerId, PlayerInfo, Position, Tile, WorldView};
