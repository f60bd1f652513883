use crate::constants::*;
use crate::world::*;
use serde::{Deserialize, Serialize};

/// Aggregated firepower picture for one side of the match.
///
/// Replaced wholesale on every recompute. Between recomputes the previous
/// snapshot stays valid input for every consumer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreatSnapshot {
    /// Tick the snapshot was computed on.
    pub tick: u32,
    /// Visibility fraction the snapshot was computed under.
    pub visibility: f32,

    pub self_offensive_power: f32,
    pub self_defensive_power: f32,
    /// Mobile firepower able to engage ground targets.
    pub self_anti_ground_power: f32,
    /// Mobile firepower able to engage air targets.
    pub self_anti_air_power: f32,
    /// Firepower carried by our own aircraft.
    pub self_air_power: f32,

    pub enemy_offensive_land_threat: f32,
    pub enemy_offensive_air_threat: f32,
    /// Static defences (armed structures).
    pub enemy_defensive_threat: f32,
    pub enemy_anti_ground_power: f32,
    pub enemy_anti_air_power: f32,
}

/// Per-unit contribution to the side totals.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ForceContribution {
    pub offensive_land: f32,
    pub offensive_air: f32,
    pub defensive: f32,
    pub anti_ground: f32,
    pub anti_air: f32,
}

impl ForceContribution {
    fn accumulate(&mut self, other: ForceContribution) {
        self.offensive_land += other.offensive_land;
        self.offensive_air += other.offensive_air;
        self.defensive += other.defensive;
        self.anti_ground += other.anti_ground;
        self.anti_air += other.anti_air;
    }

    fn scaled(self, scale: f32) -> ForceContribution {
        ForceContribution {
            offensive_land: self.offensive_land * scale,
            offensive_air: self.offensive_air * scale,
            defensive: self.defensive * scale,
            anti_ground: self.anti_ground * scale,
            anti_air: self.anti_air * scale,
        }
    }
}

/// Classify a unit's firepower into the threat categories.
pub fn analyze_agent(agent: &AgentInfo) -> ForceContribution {
    let mut contribution = ForceContribution::default();

    if !agent.has(AgentFlags::COMBATANT) || agent.firepower <= 0.0 || agent.has(AgentFlags::EMBARKED) {
        return contribution;
    }

    let firepower = agent.firepower;

    if agent.has(AgentFlags::STRUCTURE) {
        contribution.defensive = firepower;
        return contribution;
    }

    if !agent.has(AgentFlags::MOBILE) {
        return contribution;
    }

    if agent.has(AgentFlags::AIR) {
        contribution.offensive_air = firepower;
    } else {
        contribution.offensive_land = firepower;
    }

    if agent.has(AgentFlags::TARGETS_GROUND) {
        contribution.anti_ground = firepower;
    }

    if agent.has(AgentFlags::TARGETS_AIR) {
        contribution.anti_air = firepower;
    }

    contribution
}

fn sum_contributions(agents: &[AgentInfo]) -> ForceContribution {
    // Fixed summation order keeps float results reproducible regardless of enumeration order.
    let mut sorted: Vec<&AgentInfo> = agents.iter().collect();
    sorted.sort_by_key(|a| a.id);

    let mut total = ForceContribution::default();

    for agent in sorted {
        total.accumulate(analyze_agent(agent));
    }

    total
}

/// Scale applied to what we can see of the enemy to account for what we cannot.
pub fn inferred_scale(visibility: f32, visibility_floor: f32) -> f32 {
    let floor = visibility_floor.clamp(f32::EPSILON, 1.0);

    1.0 / visibility.clamp(floor, 1.0)
}

/// Pure aggregation of both sides' firepower.
///
/// `own` is every unit we own; `hostiles` is what is currently visible of the
/// enemy. Enemy totals are extrapolated by the visibility fraction.
pub fn calculate_threat(own: &[AgentInfo], hostiles: &[AgentInfo], tick: u32, visibility: f32, visibility_floor: f32) -> ThreatSnapshot {
    let own_force = sum_contributions(own);
    let enemy_force = sum_contributions(hostiles).scaled(inferred_scale(visibility, visibility_floor));

    ThreatSnapshot {
        tick,
        visibility,

        self_offensive_power: own_force.offensive_land + own_force.offensive_air,
        self_defensive_power: own_force.defensive,
        self_anti_ground_power: own_force.anti_ground,
        self_anti_air_power: own_force.anti_air,
        self_air_power: own_force.offensive_air,

        enemy_offensive_land_threat: enemy_force.offensive_land,
        enemy_offensive_air_threat: enemy_force.offensive_air,
        enemy_defensive_threat: enemy_force.defensive,
        enemy_anti_ground_power: enemy_force.anti_ground,
        enemy_anti_air_power: enemy_force.anti_air,
    }
}

/// Decays from 1 toward 0 over the match horizon, making the bot more attack prone over time.
pub fn game_length_factor(tick: u32, tick_rate: u32) -> f32 {
    let horizon = tick_rate.max(1) as f32 * GAME_LENGTH_HORIZON_SECONDS as f32;

    (1.0 - tick as f32 / horizon).max(0.0)
}

/// Attack/defend decision with asymmetric thresholds: switching into attack
/// requires more margin than staying in it.
pub fn evaluate_attack(snapshot: &ThreatSnapshot, currently_attacking: bool, game_length_factor: f32) -> bool {
    let factor = if currently_attacking {
        ATTACK_MODE_THREAT_FACTOR * game_length_factor
    } else {
        DEFEND_MODE_THREAT_FACTOR * game_length_factor
    };

    let scaled_ground_power = snapshot.self_anti_ground_power.powf(POWER_EXPONENT);
    let scaled_ground_threat = (factor * snapshot.enemy_offensive_land_threat + snapshot.enemy_defensive_threat) * THREAT_SAFETY_MARGIN;

    let scaled_air_power = snapshot.self_air_power.powf(POWER_EXPONENT);
    let scaled_air_threat = (factor * snapshot.enemy_offensive_air_threat + snapshot.enemy_defensive_threat) * THREAT_SAFETY_MARGIN;

    scaled_ground_power > scaled_ground_threat || scaled_air_power > scaled_air_threat
}
