use bitflags::*;
use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

//
// Boundary with the world engine. Everything the core knows about units,
// players and the map is pulled through `WorldView` each tick; everything it
// wants done is pushed through `OrderSink`.
//

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub u32);

/// Continuous map position, measured in tiles.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub const fn new(x: f32, y: f32) -> Position {
        Position { x, y }
    }

    pub fn distance_to(&self, other: Position) -> f32 {
        self.distance_squared_to(other).sqrt()
    }

    pub fn distance_squared_to(&self, other: Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;

        dx * dx + dy * dy
    }

    pub fn tile(&self) -> Tile {
        Tile::new(self.x.floor() as i32, self.y.floor() as i32)
    }
}

impl Add for Position {
    type Output = Position;

    fn add(self, other: Position) -> Position {
        Position::new(self.x + other.x, self.y + other.y)
    }
}

impl Sub for Position {
    type Output = Position;

    fn sub(self, other: Position) -> Position {
        Position::new(self.x - other.x, self.y - other.y)
    }
}

impl Mul<f32> for Position {
    type Output = Position;

    fn mul(self, scale: f32) -> Position {
        Position::new(self.x * scale, self.y * scale)
    }
}

/// Discrete map cell.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tile {
    pub x: i32,
    pub y: i32,
}

impl Tile {
    pub const fn new(x: i32, y: i32) -> Tile {
        Tile { x, y }
    }

    /// Position of the tile origin, the point cohesion and distance math works on.
    pub fn position(&self) -> Position {
        Position::new(self.x as f32, self.y as f32)
    }

    pub fn distance_to(&self, other: Tile) -> f32 {
        self.position().distance_to(other.position())
    }
}

bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct AgentFlags: u32 {
        const MOBILE      = 1;
        const GROUND      = 1 << 1;
        const AIR         = 1 << 2;
        const COMBATANT   = 1 << 3;
        const STRUCTURE   = 1 << 4;
        const SELECTABLE  = 1 << 5;
        /// Has a secondary weapon that only fires while deployed.
        const DEPLOYABLE  = 1 << 6;
        const DEPLOYED    = 1 << 7;
        const DISGUISED   = 1 << 8;
        const TRANSPORT   = 1 << 9;
        /// Currently carried inside a transport.
        const EMBARKED    = 1 << 10;
        const TARGETS_GROUND = 1 << 11;
        const TARGETS_AIR    = 1 << 12;
        /// Weapon discharged during the previous tick.
        const JUST_FIRED  = 1 << 13;
    }
}

/// Snapshot of one unit as reported by the world engine for the current tick.
#[derive(Clone, Debug)]
pub struct AgentInfo {
    pub id: AgentId,
    pub owner: PlayerId,
    pub kind: String,
    pub position: Position,
    pub flags: AgentFlags,
    pub weapon_range: f32,
    /// Range of the weapon available while deployed, if the unit has one.
    pub deployed_weapon_range: Option<f32>,
    /// Damage output scalar used for threat accounting and target weighting.
    pub firepower: f32,
    pub passenger_size: u32,
    pub passenger_capacity: u32,
    pub cargo_used: u32,
}

impl AgentInfo {
    pub fn tile(&self) -> Tile {
        self.position.tile()
    }

    pub fn has(&self, flags: AgentFlags) -> bool {
        self.flags.contains(flags)
    }

    /// Movable ground unit that is not sitting inside a transport.
    pub fn is_movable_ground(&self) -> bool {
        self.has(AgentFlags::MOBILE | AgentFlags::GROUND) && !self.has(AgentFlags::EMBARKED)
    }

    pub fn is_ground_combatant(&self) -> bool {
        self.is_movable_ground() && self.has(AgentFlags::COMBATANT)
    }

    /// Targets that require a tighter engagement range before committing.
    pub fn requires_close_engagement(&self) -> bool {
        self.flags.intersects(AgentFlags::STRUCTURE | AgentFlags::DISGUISED)
    }

    pub fn remaining_capacity(&self) -> u32 {
        self.passenger_capacity.saturating_sub(self.cargo_used)
    }
}

#[derive(Clone, Debug)]
pub struct PlayerInfo {
    pub id: PlayerId,
    /// Non-combatant players (neutral, spectators) never count as hostile.
    pub combatant: bool,
    pub start_location: Option<Position>,
}

/// Read-only view of the simulated world for the current tick.
pub trait WorldView {
    fn tick(&self) -> u32;

    /// Ticks per simulated second.
    fn tick_rate(&self) -> u32;

    fn self_player(&self) -> PlayerId;

    fn players(&self) -> Vec<PlayerInfo>;

    fn is_allied(&self, a: PlayerId, b: PlayerId) -> bool;

    /// Resolve a unit by id. `None` once the unit is destroyed.
    fn agent(&self, id: AgentId) -> Option<AgentInfo>;

    /// Every unit currently visible to the bot, any owner.
    fn visible_agents(&self) -> Result<Vec<AgentInfo>, String>;

    /// Every unit owned by the given player, visible or not.
    fn owned_agents(&self, owner: PlayerId) -> Vec<AgentInfo>;

    /// Map dimensions in tiles.
    fn map_size(&self) -> (i32, i32);

    fn tile_exists(&self, tile: Tile) -> bool;

    fn is_tile_visible(&self, tile: Tile) -> bool;

    fn start_location(&self, player: PlayerId) -> Option<Position> {
        self.players()
            .into_iter()
            .find(|p| p.id == player)
            .and_then(|p| p.start_location)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderKind {
    Move,
    Attack,
    Deploy,
    Undeploy,
    Load,
    Unload,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum OrderTarget {
    None,
    Point(Position),
    Agent(AgentId),
}

/// A batched order as submitted to the world engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub agents: Vec<AgentId>,
    pub kind: OrderKind,
    pub target: OrderTarget,
}

pub trait OrderSink {
    fn submit(&mut self, order: Order);
}

impl OrderSink for Vec<Order> {
    fn submit(&mut self, order: Order) {
        self.push(order);
    }
}
