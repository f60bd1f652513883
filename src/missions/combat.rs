use super::data::*;
use super::missionsystem::*;
use crate::machine_tick::*;
use crate::military::micro::*;
use crate::military::squad::*;
use crate::world::*;
use log::*;
use screeps_machine::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Spread a squad of `combatants` ground fighters may have while counting as together.
pub fn required_gather_radius(combatants: usize, base_radius: f32, gather_ratio: f32) -> f32 {
    (combatants as f32).sqrt() * gather_ratio + base_radius
}

fn combat_member(agent: &AgentInfo) -> bool {
    agent.has(AgentFlags::COMBATANT | AgentFlags::MOBILE) && !agent.has(AgentFlags::EMBARKED)
}

fn is_due(last: Option<u32>, tick: u32, interval: u32) -> bool {
    last.map(|last| tick.saturating_sub(last) >= interval).unwrap_or(true)
}

pub struct CombatMissionContext {
    target_area: Option<Position>,
    chosen_targets: HashMap<AgentId, AgentId>,
}

/// Squad snapshot shared by every state stepped during one evaluation.
struct CombatTickContext {
    squad: SquadId,
    cohesion: Cohesion,
    combatants: Vec<AgentInfo>,
    ground_combatants: usize,
}

machine!(
    #[derive(Clone, Serialize, Deserialize)]
    enum CombatState {
        Gathering { regrouping: bool },
        Attacking
    }

    impl {
        _ => fn status_description(&self) -> String;

        _ => fn tick(&mut self, system_data: &mut MissionExecutionSystemData, state_context: &mut CombatMissionContext, tick_context: &CombatTickContext) -> Result<Option<CombatState>, String>;
    }
);

impl Gathering {
    fn status_description(&self) -> String {
        "Gathering".to_owned()
    }

    fn tick(
        &mut self,
        system_data: &mut MissionExecutionSystemData,
        _state_context: &mut CombatMissionContext,
        tick_context: &CombatTickContext,
    ) -> Result<Option<CombatState>, String> {
        // Just fell back from attacking, hold until the next evaluation.
        if std::mem::take(&mut self.regrouping) {
            return Ok(None);
        }

        let features = &system_data.features.combat;
        let cohesion = tick_context.cohesion;
        let required = required_gather_radius(tick_context.ground_combatants, features.min_gather_radius, features.gather_ratio);

        if cohesion.spread <= required {
            debug!("Squad {:?} gathered (spread {:.1} <= {:.1}), attacking", tick_context.squad, cohesion.spread, required);

            return Ok(Some(CombatState::attacking()));
        }

        let center = OrderTarget::Point(cohesion.center.position());

        for agent in &tick_context.combatants {
            system_data.coalescer.issue(agent.id, OrderKind::Move, center);
        }

        Ok(None)
    }
}

impl Attacking {
    fn status_description(&self) -> String {
        "Attacking".to_owned()
    }

    fn tick(
        &mut self,
        system_data: &mut MissionExecutionSystemData,
        state_context: &mut CombatMissionContext,
        tick_context: &CombatTickContext,
    ) -> Result<Option<CombatState>, String> {
        let features = &system_data.features.combat;
        let cohesion = tick_context.cohesion;
        let required = required_gather_radius(tick_context.ground_combatants, features.max_gather_radius, features.gather_ratio);

        if cohesion.spread > required {
            debug!("Squad {:?} scattered (spread {:.1} > {:.1}), regrouping", tick_context.squad, cohesion.spread, required);

            return Ok(Some(CombatState::gathering(true)));
        }

        state_context.issue_attack_orders(system_data, &tick_context.combatants);

        Ok(None)
    }
}

impl CombatMissionContext {
    fn objective(&self, system_data: &MissionExecutionSystemData) -> Option<Position> {
        let awareness = system_data.awareness;

        let objective = if awareness.is_attacking() {
            self.target_area.or_else(|| awareness.enemy_start()).or_else(|| awareness.rally_point())
        } else {
            awareness.rally_point()
        };

        objective.or_else(|| system_data.world.start_location(system_data.world.self_player()))
    }

    fn issue_attack_orders(&mut self, system_data: &mut MissionExecutionSystemData, combatants: &[AgentInfo]) {
        let world = system_data.world;
        let objective = self.objective(system_data);
        let engage_margin = system_data.features.combat.structure_engage_margin;

        self.chosen_targets.clear();

        for attacker in combatants {
            let search_radius = 2.0 * engagement_range(attacker);

            let candidates: Vec<AgentInfo> = system_data
                .awareness
                .hostiles_within(attacker.position, search_radius)
                .into_iter()
                .filter_map(|(_, id)| world.agent(id))
                .collect();

            match select_target(attacker, &candidates, system_data.weighting) {
                Some(target) => {
                    let order = micro_order(attacker, target, engage_margin);

                    system_data.coalescer.issue(attacker.id, order.kind, order.target);

                    self.chosen_targets.insert(attacker.id, target.id);
                }
                None => {
                    if let Some(objective) = objective {
                        system_data.coalescer.issue(attacker.id, OrderKind::Move, OrderTarget::Point(objective));
                    }
                }
            }
        }
    }
}

pub struct CombatBehaviour {
    state: CombatState,
    context: CombatMissionContext,
    last_evaluation: Option<u32>,
    last_grab: Option<u32>,
}

impl CombatBehaviour {
    pub fn new(target_area: Option<Position>) -> CombatBehaviour {
        CombatBehaviour {
            state: CombatState::gathering(false),
            context: CombatMissionContext {
                target_area,
                chosen_targets: HashMap::new(),
            },
            last_evaluation: None,
            last_grab: None,
        }
    }

    pub fn is_attacking(&self) -> bool {
        matches!(self.state, CombatState::Attacking(_))
    }

    pub fn status_description(&self) -> String {
        self.state.status_description()
    }

    pub fn target_area(&self) -> Option<Position> {
        self.context.target_area
    }

    pub fn set_target_area(&mut self, target_area: Option<Position>) {
        self.context.target_area = target_area;
    }

    /// Targets picked on the last attack evaluation, by attacker.
    pub fn chosen_targets(&self) -> &HashMap<AgentId, AgentId> {
        &self.context.chosen_targets
    }

    fn request_reinforcements(&self, system_data: &mut MissionExecutionSystemData, mission_id: MissionId, squad: &Squad) {
        let anchor = squad
            .center()
            .map(|center| center.position())
            .or_else(|| system_data.awareness.rally_point());

        if let Some(anchor) = anchor {
            system_data.reinforcements.request(ReinforcementRequest {
                mission: mission_id,
                squad: squad.id(),
                anchor,
                radius: system_data.features.combat.reinforce_radius,
            });
        }
    }

    fn evaluate(&mut self, system_data: &mut MissionExecutionSystemData, squad: &Squad) -> Result<(), String> {
        let world = system_data.world;

        let cohesion = match squad.cohesion() {
            Some(cohesion) if world.tile_exists(cohesion.center) => cohesion,
            _ => return Ok(()),
        };

        let combatants = squad.members_matching(world, combat_member);

        let tick_context = CombatTickContext {
            squad: squad.id(),
            cohesion,
            ground_combatants: combatants.iter().filter(|agent| agent.is_ground_combatant()).count(),
            combatants,
        };

        let state_context = &mut self.context;

        run_state_machine(&mut self.state, "CombatBehaviour", |state| {
            state.tick(system_data, state_context, &tick_context)
        })?;

        Ok(())
    }
}

impl SquadBehaviour for CombatBehaviour {
    fn kind(&self) -> BehaviourKind {
        BehaviourKind::Combat
    }

    fn describe_state(&self) -> String {
        format!("{} - Targets: {}", self.state.status_description(), self.context.chosen_targets.len())
    }

    fn update(&mut self, system_data: &mut MissionExecutionSystemData, mission_id: MissionId, squad: &Squad) -> Result<BehaviourResult, String> {
        let tick = system_data.world.tick();
        let features = &system_data.features.combat;
        let (grab_interval, target_interval) = (features.grab_interval, features.target_interval);

        if is_due(self.last_grab, tick, grab_interval) {
            self.last_grab = Some(tick);

            self.request_reinforcements(system_data, mission_id, squad);
        }

        if is_due(self.last_evaluation, tick, target_interval) {
            self.last_evaluation = Some(tick);

            self.evaluate(system_data, squad)?;
        }

        Ok(BehaviourResult::Running)
    }
}
