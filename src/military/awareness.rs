use super::sectors::*;
use super::spatial::*;
use super::threatmap::*;
use crate::features::*;
use crate::world::*;
use lerp::Lerp;
use log::*;
use specs::prelude::*;

/// Shared battlefield picture, re-derived once per tick before any squad runs.
///
/// Everything downstream gets `&Awareness`; only `update` mutates it.
pub struct Awareness {
    index: Option<SpatialIndex>,
    sectors: Option<SectorCache>,
    hostile_players: Vec<PlayerId>,
    hostile_agents: Vec<AgentInfo>,
    snapshot: Option<ThreatSnapshot>,
    rally_point: Option<Position>,
    enemy_start: Option<Position>,
    attacking: bool,
    last_update: Option<u32>,
}

impl Default for Awareness {
    fn default() -> Self {
        Awareness::new()
    }
}

impl Awareness {
    pub fn new() -> Awareness {
        Awareness {
            index: None,
            sectors: None,
            hostile_players: Vec::new(),
            hostile_agents: Vec::new(),
            snapshot: None,
            rally_point: None,
            enemy_start: None,
            attacking: false,
            last_update: None,
        }
    }

    pub fn update(&mut self, world: &dyn WorldView, features: &AwarenessFeatures) {
        let tick = world.tick();

        //
        // Budgeted visibility rescan.
        //

        let sectors = self
            .sectors
            .get_or_insert_with(|| SectorCache::from_world(world, features.sector_size));

        sectors.update(world, features.sector_scan_budget);

        //
        // Hostile sides and hostile index.
        //

        self.hostile_players = Self::find_hostile_players(world);

        match Self::collect_hostiles(world, &self.hostile_players) {
            Ok(hostiles) => {
                let index = self.index.get_or_insert_with(|| {
                    let (width, height) = world.map_size();

                    SpatialIndex::new(width as f32, height as f32)
                });

                index.rebuild(hostiles.iter().map(|agent| (agent.position, agent.id)));

                self.hostile_agents = hostiles;
            }
            Err(err) => {
                warn!("Skipping hostile index rebuild for tick {}, keeping previous index. Error: {}", tick, err);
            }
        }

        //
        // Threat snapshot and attack/defend decision.
        //

        let visibility = self.visibility_fraction();

        if tick % features.threat_interval.max(1) == 0 && visibility > 0.0 {
            let own = world.owned_agents(world.self_player());
            let snapshot = calculate_threat(&own, &self.hostile_agents, tick, visibility, features.visibility_floor);

            let attacking = evaluate_attack(&snapshot, self.attacking, game_length_factor(tick, world.tick_rate()));

            if attacking != self.attacking {
                info!(
                    "Switching to {} posture - Tick: {} - Ground: {:.1} vs {:.1} - Air: {:.1} vs {:.1}",
                    if attacking { "attack" } else { "defend" },
                    tick,
                    snapshot.self_anti_ground_power,
                    snapshot.enemy_offensive_land_threat,
                    snapshot.self_air_power,
                    snapshot.enemy_offensive_air_threat
                );
            }

            self.attacking = attacking;
            self.snapshot = Some(snapshot);
        }

        //
        // Rally point.
        //

        if tick % features.rally_interval.max(1) == 0 || self.rally_point.is_none() {
            self.update_rally_point(world, features.rally_margin);
        }

        self.last_update = Some(tick);
    }

    fn find_hostile_players(world: &dyn WorldView) -> Vec<PlayerId> {
        let me = world.self_player();

        world
            .players()
            .into_iter()
            .filter(|p| p.id != me && p.combatant && !world.is_allied(me, p.id))
            .map(|p| p.id)
            .collect()
    }

    fn collect_hostiles(world: &dyn WorldView, hostile_players: &[PlayerId]) -> Result<Vec<AgentInfo>, String> {
        let visible = world.visible_agents()?;

        Ok(visible
            .into_iter()
            .filter(|agent| hostile_players.contains(&agent.owner))
            .filter(|agent| agent.flags.intersects(AgentFlags::COMBATANT | AgentFlags::STRUCTURE | AgentFlags::SELECTABLE))
            .filter(|agent| !agent.has(AgentFlags::EMBARKED))
            .collect())
    }

    fn update_rally_point(&mut self, world: &dyn WorldView, margin: f32) {
        let own_start = world.start_location(world.self_player());
        let enemy_start = self.hostile_players.iter().find_map(|player| world.start_location(*player));

        self.enemy_start = enemy_start;

        self.rally_point = match (own_start, enemy_start) {
            (Some(own_start), Some(enemy_start)) => {
                let distance = own_start.distance_to(enemy_start);

                let t = if distance > margin { 1.0 - margin / distance } else { 0.5 };

                Some(own_start.lerp_bounded(enemy_start, t))
            }
            (Some(own_start), None) => Some(own_start),
            _ => None,
        };
    }

    //
    // Queries.
    //

    /// Hostile units within `radius` of `center`, exact Euclidean distance.
    pub fn hostiles_within(&self, center: Position, radius: f32) -> Vec<(Position, AgentId)> {
        self.index
            .as_ref()
            .map(|index| index.query_radius(center, radius))
            .unwrap_or_default()
    }

    pub fn hostile_count(&self) -> usize {
        self.index.as_ref().map(|index| index.len()).unwrap_or(0)
    }

    pub fn hostile_players(&self) -> &[PlayerId] {
        &self.hostile_players
    }

    pub fn threat_snapshot(&self) -> Option<&ThreatSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn rally_point(&self) -> Option<Position> {
        self.rally_point
    }

    pub fn enemy_start(&self) -> Option<Position> {
        self.enemy_start
    }

    pub fn is_attacking(&self) -> bool {
        self.attacking
    }

    pub fn visibility_fraction(&self) -> f32 {
        self.sectors.as_ref().map(|s| s.visibility_fraction()).unwrap_or(0.0)
    }

    pub fn sector_update_ratio(&self, current_tick: u32, window: u32) -> f32 {
        self.sectors.as_ref().map(|s| s.update_ratio(current_tick, window)).unwrap_or(0.0)
    }

    pub fn sectors(&self) -> Option<&SectorCache> {
        self.sectors.as_ref()
    }

    pub fn last_update(&self) -> Option<u32> {
        self.last_update
    }
}

#[derive(SystemData)]
pub struct AwarenessSystemData<'a> {
    awareness: WriteExpect<'a, Awareness>,
    features: Read<'a, Features>,
}

/// Settles awareness for the tick. Must run before any mission reads it.
pub struct AwarenessUpdateSystem<'w> {
    pub view: &'w dyn WorldView,
}

impl<'a, 'w> System<'a> for AwarenessUpdateSystem<'w> {
    type SystemData = AwarenessSystemData<'a>;

    fn run(&mut self, mut data: Self::SystemData) {
        let features = &data.features.awareness;

        data.awareness.update(self.view, features);
    }
}
