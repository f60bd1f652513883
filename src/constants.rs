//
// Awareness
//

/// Ticks between threat snapshot recomputes (and attack/defend re-evaluation).
pub const THREAT_INTERVAL: u32 = 25;
/// Ticks between rally point recomputes.
pub const RALLY_INTERVAL: u32 = 250;
/// Distance the rally point keeps from the enemy start location, in tiles.
pub const RALLY_MARGIN: f32 = 24.0;

/// Edge length of a visibility sector, in tiles.
pub const SECTOR_SIZE: i32 = 16;
/// Sectors rescanned per tick.
pub const SECTOR_SCAN_BUDGET: usize = 4;
/// Trailing window (ticks) within which a sector counts as recently scanned.
pub const SECTOR_UPDATE_WINDOW: u32 = 250;
/// Lowest visibility fraction used when extrapolating unseen enemy strength.
pub const VISIBILITY_FLOOR: f32 = 0.25;

/// Match length (seconds) over which the bot becomes increasingly willing to attack.
pub const GAME_LENGTH_HORIZON_SECONDS: u32 = 7200;

pub const DEFEND_MODE_THREAT_FACTOR: f32 = 1.25;
pub const ATTACK_MODE_THREAT_FACTOR: f32 = 0.75;
pub const POWER_EXPONENT: f32 = 1.025;
pub const THREAT_SAFETY_MARGIN: f32 = 1.1;

//
// Combat
//

/// Ticks between target/command re-evaluations for a squad.
pub const TARGET_INTERVAL: u32 = 15;
/// Ticks between reinforcement requests for a squad.
pub const GRAB_INTERVAL: u32 = 50;
pub const MIN_GATHER_RADIUS: f32 = 5.0;
pub const MAX_GATHER_RADIUS: f32 = 15.0;
pub const GATHER_RATIO: f32 = 10.0;
/// Radius around the squad anchor in which unassigned combatants are grabbed.
pub const REINFORCE_RADIUS: f32 = 20.0;
/// Extra range beyond weapon range tolerated before committing to structures or disguised units.
pub const STRUCTURE_ENGAGE_MARGIN: f32 = 1.0;

//
// Expansion
//

pub const EXPANSION_DEPLOY_RANGE: f32 = 2.0;

//
// Transport
//

/// Ticks a load step may spend waiting for passengers before moving on.
pub const TRANSPORT_LOAD_TIMEOUT: u32 = 150;
