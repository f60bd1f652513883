use super::data::*;
use super::missionsystem::*;
use crate::features::*;
use crate::machine_tick::*;
use crate::military::squad::*;
use crate::transfer::ordersystem::*;
use crate::world::*;
use log::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One instruction of a scripted mission program.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ScriptStep {
    /// Embark every passenger that fits into the squad's transports.
    LoadTransports,
    /// Move every mobile member until all are within `radius` of `point`.
    MoveTo { point: Position, radius: f32 },
    /// Unload every loaded transport at its current position.
    Unload,
    /// Idle for exactly the given number of ticks, then advance. `Wait(0)` falls through.
    Wait(u32),
    /// Order combatants to fight their way to `point`, then continue immediately.
    AttackMove(Position),
    Jump(usize),
    Disband,
}

/// Result of running one step for one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// Run the same step again next tick.
    Repeat,
    Advance,
    Jump(usize),
    Disband,
}

/// Where a mission is in its program.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptState {
    pub line: usize,
    /// Tick the current line was entered.
    pub entered: u32,
    /// Past this tick the current line is forced to advance.
    pub deadline: Option<u32>,
}

impl ScriptState {
    fn enter(line: usize, tick: u32, program: &[ScriptStep], features: &Features) -> ScriptState {
        let deadline = match program.get(line) {
            Some(ScriptStep::LoadTransports) => Some(tick.saturating_add(features.transport.load_timeout)),
            _ => None,
        };

        ScriptState {
            line,
            entered: tick,
            deadline,
        }
    }

    pub fn is_expired(&self, tick: u32) -> bool {
        self.deadline.map(|deadline| tick > deadline).unwrap_or(false)
    }
}

/// Step state of every scripted mission, keyed by mission.
#[derive(Default)]
pub struct ScriptTable {
    states: HashMap<MissionId, ScriptState>,
}

impl ScriptTable {
    pub fn get(&self, mission: MissionId) -> Option<&ScriptState> {
        self.states.get(&mission)
    }

    pub fn insert(&mut self, mission: MissionId, state: ScriptState) {
        self.states.insert(mission, state);
    }

    pub fn remove(&mut self, mission: MissionId) -> Option<ScriptState> {
        self.states.remove(&mission)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

//
// Transport loading.
//

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadAssignment {
    pub passenger: AgentId,
    pub transport: AgentId,
}

/// Greedy passenger assignment. Passengers are placed in order; each goes to the
/// last of the transports it fits into when those are ordered by remaining
/// capacity (ascending) and then by their position in `transports`.
pub fn assign_passengers(transports: &[AgentInfo], passengers: &[AgentInfo]) -> Vec<LoadAssignment> {
    let mut remaining: Vec<(usize, AgentId, u32)> = transports
        .iter()
        .enumerate()
        .map(|(index, transport)| (index, transport.id, transport.remaining_capacity()))
        .collect();

    let mut assignments = Vec::new();

    for passenger in passengers {
        let size = passenger.passenger_size;

        let mut candidates: Vec<&mut (usize, AgentId, u32)> = remaining.iter_mut().filter(|(_, _, capacity)| *capacity >= size).collect();

        candidates.sort_by_key(|(index, _, capacity)| (*capacity, *index));

        if let Some((_, transport, capacity)) = candidates.pop() {
            *capacity -= size;

            assignments.push(LoadAssignment {
                passenger: passenger.id,
                transport: *transport,
            });
        }
    }

    assignments
}

fn load_transports(world: &dyn WorldView, squad: &Squad, coalescer: &mut ActionCoalescer) -> StepOutcome {
    let transports = squad.members_matching(world, |agent| agent.has(AgentFlags::TRANSPORT) && !agent.has(AgentFlags::EMBARKED));

    let passengers = squad.members_matching(world, |agent| agent.is_movable_ground() && !agent.has(AgentFlags::TRANSPORT));

    if passengers.is_empty() {
        return StepOutcome::Advance;
    }

    let assignments = assign_passengers(&transports, &passengers);

    if assignments.is_empty() {
        return StepOutcome::Advance;
    }

    for assignment in assignments {
        coalescer.issue(assignment.passenger, OrderKind::Load, OrderTarget::Agent(assignment.transport));
    }

    StepOutcome::Repeat
}

//
// Stepper.
//

struct StepContext<'a> {
    world: &'a dyn WorldView,
    squad: &'a Squad,
    coalescer: &'a mut ActionCoalescer,
}

pub struct ScriptRunner;

impl ScriptRunner {
    fn execute(step: &ScriptStep, state: &ScriptState, program_len: usize, context: &mut StepContext) -> Result<StepOutcome, String> {
        let world = context.world;
        let squad = context.squad;

        let outcome = match step {
            ScriptStep::LoadTransports => load_transports(world, squad, context.coalescer),
            ScriptStep::MoveTo { point, radius } => {
                let movers = squad.members_matching(world, |agent| agent.has(AgentFlags::MOBILE) && !agent.has(AgentFlags::EMBARKED));
                let outside: Vec<&AgentInfo> = movers.iter().filter(|agent| agent.position.distance_to(*point) > *radius).collect();

                if outside.is_empty() {
                    StepOutcome::Advance
                } else {
                    for agent in outside {
                        context.coalescer.issue(agent.id, OrderKind::Move, OrderTarget::Point(*point));
                    }

                    StepOutcome::Repeat
                }
            }
            ScriptStep::Unload => {
                let loaded = squad.members_matching(world, |agent| agent.has(AgentFlags::TRANSPORT) && agent.cargo_used > 0);

                if loaded.is_empty() {
                    StepOutcome::Advance
                } else {
                    for transport in loaded {
                        context.coalescer.issue(transport.id, OrderKind::Unload, OrderTarget::None);
                    }

                    StepOutcome::Repeat
                }
            }
            ScriptStep::Wait(ticks) => {
                if world.tick().saturating_sub(state.entered) >= *ticks {
                    StepOutcome::Advance
                } else {
                    StepOutcome::Repeat
                }
            }
            ScriptStep::AttackMove(point) => {
                let fighters = squad.members_matching(world, |agent| agent.has(AgentFlags::COMBATANT | AgentFlags::MOBILE) && !agent.has(AgentFlags::EMBARKED));

                for agent in fighters {
                    context.coalescer.issue(agent.id, OrderKind::Attack, OrderTarget::Point(*point));
                }

                StepOutcome::Advance
            }
            ScriptStep::Jump(line) => {
                if *line >= program_len {
                    return Err(format!("Script jump target {} is outside program of {} steps", line, program_len));
                }

                StepOutcome::Jump(*line)
            }
            ScriptStep::Disband => StepOutcome::Disband,
        };

        Ok(outcome)
    }

    /// Re-enter the mission's current step, chaining through every step that
    /// completes immediately. Running past the last step disbands the mission.
    pub fn run(program: &[ScriptStep], system_data: &mut MissionExecutionSystemData, mission_id: MissionId, squad: &Squad) -> Result<BehaviourResult, String> {
        let world = system_data.world;
        let features = system_data.features;
        let tick = world.tick();

        let mut state = system_data
            .scripts
            .get(mission_id)
            .copied()
            .unwrap_or_else(|| ScriptState::enter(0, tick, program, features));

        let mut context = StepContext {
            world,
            squad,
            coalescer: &mut *system_data.coalescer,
        };

        let mut disband = false;

        let result = run_state_machine(&mut state, "script", |state| {
            let step = match program.get(state.line) {
                Some(step) => step,
                None => {
                    disband = true;
                    return Ok(None);
                }
            };

            let outcome = if state.is_expired(tick) {
                debug!("Script step {} ({:?}) for mission {:?} timed out, advancing", state.line, step, mission_id);

                StepOutcome::Advance
            } else {
                Self::execute(step, state, program.len(), &mut context)?
            };

            match outcome {
                StepOutcome::Repeat => Ok(None),
                StepOutcome::Advance => Ok(Some(ScriptState::enter(state.line + 1, tick, program, features))),
                StepOutcome::Jump(line) => Ok(Some(ScriptState::enter(line, tick, program, features))),
                StepOutcome::Disband => {
                    disband = true;
                    Ok(None)
                }
            }
        });

        system_data.scripts.insert(mission_id, state);

        result?;

        Ok(if disband { BehaviourResult::Disband } else { BehaviourResult::Running })
    }
}

/// Behaviour that runs a fixed step program.
pub struct ScriptedBehaviour {
    program: Vec<ScriptStep>,
}

impl ScriptedBehaviour {
    pub fn new(program: Vec<ScriptStep>) -> ScriptedBehaviour {
        ScriptedBehaviour { program }
    }

    pub fn program(&self) -> &[ScriptStep] {
        &self.program
    }
}

impl SquadBehaviour for ScriptedBehaviour {
    fn kind(&self) -> BehaviourKind {
        BehaviourKind::Scripted
    }

    fn describe_state(&self) -> String {
        format!("Steps: {}", self.program.len())
    }

    fn update(&mut self, system_data: &mut MissionExecutionSystemData, mission_id: MissionId, squad: &Squad) -> Result<BehaviourResult, String> {
        ScriptRunner::run(&self.program, system_data, mission_id, squad)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::TRANSPORT_LOAD_TIMEOUT;
    use crate::military::awareness::*;
    use crate::military::micro::*;
    use crate::testing::*;
    use proptest::prelude::*;

    struct Fixture {
        world: MockWorld,
        awareness: Awareness,
        features: Features,
        coalescer: ActionCoalescer,
        reinforcements: ReinforcementQueue,
        scripts: ScriptTable,
        mission: MissionId,
    }

    impl Fixture {
        fn new() -> Fixture {
            Fixture {
                mission: mission_entity(),
                world: MockWorld::new(64, 64),
                awareness: Awareness::new(),
                features: Features::default(),
                coalescer: ActionCoalescer::new(),
                reinforcements: ReinforcementQueue::default(),
                scripts: ScriptTable::default(),
            }
        }

        fn run(&mut self, program: &[ScriptStep], squad: &mut Squad) -> Result<BehaviourResult, String> {
            squad.update(&self.world);
            self.coalescer.clear();

            let mut system_data = MissionExecutionSystemData {
                world: &self.world,
                awareness: &self.awareness,
                features: &self.features,
                weighting: &DefaultTargetWeighting,
                coalescer: &mut self.coalescer,
                reinforcements: &mut self.reinforcements,
                scripts: &mut self.scripts,
            };

            ScriptRunner::run(program, &mut system_data, self.mission, squad)
        }

        fn line(&self) -> Option<usize> {
            self.scripts.get(self.mission).map(|s| s.line)
        }
    }

    #[test]
    fn greedy_assignment_prefers_roomiest_transport() {
        let transports = vec![apc(1, SELF, 0.0, 0.0, 4), apc(2, SELF, 0.0, 0.0, 2), apc(3, SELF, 0.0, 0.0, 4)];
        let passengers = vec![infantry(10, SELF, 0.0, 0.0, 3), infantry(11, SELF, 0.0, 0.0, 2), infantry(12, SELF, 0.0, 0.0, 2)];

        let assignments = assign_passengers(&transports, &passengers);

        // Size 3: apcs 1 and 3 tie at 4, the later one wins. Left [4, 2, 1].
        // Size 2: apc 1 is roomiest. Left [2, 2, 1].
        // Size 2: apcs 1 and 2 tie at 2, the later one wins.
        assert_eq!(
            assignments,
            vec![
                LoadAssignment {
                    passenger: AgentId(10),
                    transport: AgentId(3)
                },
                LoadAssignment {
                    passenger: AgentId(11),
                    transport: AgentId(1)
                },
                LoadAssignment {
                    passenger: AgentId(12),
                    transport: AgentId(2)
                },
            ]
        );
    }

    #[test]
    fn oversized_passengers_are_skipped() {
        let transports = vec![apc(1, SELF, 0.0, 0.0, 2)];
        let passengers = vec![infantry(10, SELF, 0.0, 0.0, 5), infantry(11, SELF, 0.0, 0.0, 1)];

        let assignments = assign_passengers(&transports, &passengers);

        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].passenger, AgentId(11));
    }

    #[test]
    fn load_step_times_out() {
        let mut fixture = Fixture::new();
        fixture.world.add(apc(1, SELF, 5.0, 5.0, 4));
        fixture.world.add(infantry(2, SELF, 6.0, 5.0, 1));

        let program = vec![ScriptStep::LoadTransports, ScriptStep::Wait(1000)];
        let mut squad = Squad::with_members(SquadId(1), true, vec![AgentId(1), AgentId(2)]);

        assert_eq!(fixture.run(&program, &mut squad), Ok(BehaviourResult::Running));
        assert_eq!(fixture.line(), Some(0));
        assert_eq!(
            fixture.coalescer.pending(AgentId(2)).map(|p| (p.kind, p.target)),
            Some((OrderKind::Load, OrderTarget::Agent(AgentId(1))))
        );

        // The world never embarks the passenger.
        fixture.world.tick = TRANSPORT_LOAD_TIMEOUT;
        fixture.run(&program, &mut squad).unwrap();
        assert_eq!(fixture.line(), Some(0));

        fixture.world.tick = TRANSPORT_LOAD_TIMEOUT + 1;
        fixture.run(&program, &mut squad).unwrap();
        assert_eq!(fixture.line(), Some(1));
        assert_eq!(
            fixture.scripts.get(fixture.mission).map(|s| (s.entered, s.deadline)),
            Some((TRANSPORT_LOAD_TIMEOUT + 1, None))
        );
    }

    #[test]
    fn load_step_advances_once_embarked() {
        let mut fixture = Fixture::new();
        fixture.world.add(apc(1, SELF, 5.0, 5.0, 4));
        fixture.world.add(infantry(2, SELF, 6.0, 5.0, 1));

        let program = vec![ScriptStep::LoadTransports, ScriptStep::Unload, ScriptStep::Disband];
        let mut squad = Squad::with_members(SquadId(1), true, vec![AgentId(1), AgentId(2)]);

        fixture.run(&program, &mut squad).unwrap();
        assert_eq!(fixture.line(), Some(0));

        fixture.world.tick = 1;
        fixture.world.modify(AgentId(2), |a| a.flags |= AgentFlags::EMBARKED);
        fixture.world.modify(AgentId(1), |a| a.cargo_used = 1);

        // Load completes, unload starts in the same tick.
        assert_eq!(fixture.run(&program, &mut squad), Ok(BehaviourResult::Running));
        assert_eq!(fixture.line(), Some(1));
        assert_eq!(fixture.coalescer.pending(AgentId(1)).map(|p| p.kind), Some(OrderKind::Unload));

        fixture.world.tick = 2;
        fixture.world.modify(AgentId(2), |a| a.flags.remove(AgentFlags::EMBARKED));
        fixture.world.modify(AgentId(1), |a| a.cargo_used = 0);

        assert_eq!(fixture.run(&program, &mut squad), Ok(BehaviourResult::Disband));
    }

    #[test]
    fn load_step_advances_when_nothing_fits() {
        let mut fixture = Fixture::new();
        fixture.world.add(apc(1, SELF, 5.0, 5.0, 1));
        fixture.world.add(infantry(2, SELF, 6.0, 5.0, 3));

        let program = vec![ScriptStep::LoadTransports, ScriptStep::Wait(10)];
        let mut squad = Squad::with_members(SquadId(1), true, vec![AgentId(1), AgentId(2)]);

        fixture.run(&program, &mut squad).unwrap();

        assert_eq!(fixture.line(), Some(1));
        assert!(fixture.coalescer.is_empty());
    }

    #[test]
    fn move_then_attack_move_then_loop() {
        let mut fixture = Fixture::new();
        fixture.world.add(tank(1, SELF, 5.0, 5.0));

        let waypoint = Position::new(20.0, 20.0);
        let program = vec![
            ScriptStep::MoveTo { point: waypoint, radius: 2.0 },
            ScriptStep::AttackMove(Position::new(50.0, 50.0)),
            ScriptStep::Wait(5),
            ScriptStep::Jump(0),
        ];
        let mut squad = Squad::with_members(SquadId(1), true, vec![AgentId(1)]);

        fixture.run(&program, &mut squad).unwrap();
        assert_eq!(fixture.line(), Some(0));
        assert_eq!(fixture.coalescer.pending(AgentId(1)).map(|p| p.target), Some(OrderTarget::Point(waypoint)));

        fixture.world.tick = 10;
        fixture.world.modify(AgentId(1), |a| a.position = Position::new(19.0, 20.0));
        fixture.run(&program, &mut squad).unwrap();
        assert_eq!(fixture.line(), Some(2));
        assert_eq!(
            fixture.coalescer.pending(AgentId(1)).map(|p| (p.kind, p.target)),
            Some((OrderKind::Attack, OrderTarget::Point(Position::new(50.0, 50.0))))
        );

        // Wait expires, jump back to the start, and the squad is already in place.
        fixture.world.tick = 16;
        fixture.run(&program, &mut squad).unwrap();
        assert_eq!(fixture.line(), Some(2));
        assert_eq!(fixture.scripts.get(fixture.mission).map(|s| s.entered), Some(16));
    }

    #[test]
    fn wait_idles_exactly_its_tick_count() {
        let mut fixture = Fixture::new();
        let program = vec![ScriptStep::Wait(2), ScriptStep::Disband];
        let mut squad = Squad::new(SquadId(1), false);

        fixture.world.tick = 0;
        assert_eq!(fixture.run(&program, &mut squad), Ok(BehaviourResult::Running));
        fixture.world.tick = 1;
        assert_eq!(fixture.run(&program, &mut squad), Ok(BehaviourResult::Running));
        fixture.world.tick = 2;
        assert_eq!(fixture.run(&program, &mut squad), Ok(BehaviourResult::Disband));
    }

    #[test]
    fn zero_wait_falls_through() {
        let mut fixture = Fixture::new();
        let program = vec![ScriptStep::Wait(0), ScriptStep::Disband];
        let mut squad = Squad::new(SquadId(1), false);

        assert_eq!(fixture.run(&program, &mut squad), Ok(BehaviourResult::Disband));
    }

    #[test]
    fn running_off_the_end_disbands() {
        let mut fixture = Fixture::new();
        let program = vec![ScriptStep::AttackMove(Position::new(1.0, 1.0))];
        let mut squad = Squad::new(SquadId(1), false);

        assert_eq!(fixture.run(&program, &mut squad), Ok(BehaviourResult::Disband));
    }

    #[test]
    fn bad_jump_fails() {
        let mut fixture = Fixture::new();
        let program = vec![ScriptStep::Jump(3)];
        let mut squad = Squad::new(SquadId(1), false);

        assert!(fixture.run(&program, &mut squad).is_err());
    }

    #[test]
    fn tight_jump_loop_is_capped() {
        let mut fixture = Fixture::new();
        let program = vec![ScriptStep::Jump(1), ScriptStep::Jump(0)];
        let mut squad = Squad::new(SquadId(1), false);

        assert_eq!(fixture.run(&program, &mut squad), Ok(BehaviourResult::Running));
    }

    proptest! {
        #[test]
        fn assignments_never_exceed_capacity(
            capacities in proptest::collection::vec(0u32..8, 0..6),
            sizes in proptest::collection::vec(1u32..5, 0..20),
        ) {
            let transports: Vec<AgentInfo> = capacities
                .iter()
                .enumerate()
                .map(|(i, capacity)| apc(i as u32, SELF, 0.0, 0.0, *capacity))
                .collect();
            let passengers: Vec<AgentInfo> = sizes
                .iter()
                .enumerate()
                .map(|(i, size)| infantry(100 + i as u32, SELF, 0.0, 0.0, *size))
                .collect();

            let assignments = assign_passengers(&transports, &passengers);

            for transport in &transports {
                let load: u32 = assignments
                    .iter()
                    .filter(|a| a.transport == transport.id)
                    .map(|a| passengers.iter().find(|p| p.id == a.passenger).map(|p| p.passenger_size).unwrap_or(0))
                    .sum();

                prop_assert!(load <= transport.passenger_capacity);
            }

            let mut assigned: Vec<AgentId> = assignments.iter().map(|a| a.passenger).collect();
            assigned.sort();
            assigned.dedup();
            prop_assert_eq!(assigned.len(), assignments.len());
        }
    }
}
