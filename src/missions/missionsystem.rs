use super::data::*;
use super::script::*;
use crate::features::*;
use crate::military::awareness::*;
use crate::military::micro::*;
use crate::military::squad::*;
use crate::transfer::ordersystem::*;
use crate::world::*;
use log::*;
use specs::prelude::*;
use specs::Component;
use std::collections::BTreeSet;

/// Missions live on their own entity, alongside the squad they drive.
pub type MissionId = Entity;

//
// Reinforcement requests.
//

/// Ask the allocator for unassigned combatants near `anchor`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReinforcementRequest {
    pub mission: MissionId,
    pub squad: SquadId,
    pub anchor: Position,
    pub radius: f32,
}

#[derive(Default)]
pub struct ReinforcementQueue {
    requests: Vec<ReinforcementRequest>,
}

impl ReinforcementQueue {
    pub fn request(&mut self, request: ReinforcementRequest) {
        self.requests.push(request);
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    fn take(&mut self) -> Vec<ReinforcementRequest> {
        std::mem::take(&mut self.requests)
    }

    pub fn clear(&mut self) {
        self.requests.clear();
    }
}

/// Owner of every agent not currently in a squad.
pub trait AgentAllocator: Send + Sync {
    /// Hand over eligible unassigned agents matching the request. Returned agents
    /// are no longer considered unassigned.
    fn grab_unassigned(&mut self, world: &dyn WorldView, request: &ReinforcementRequest) -> Vec<AgentId>;

    /// Return agents to the unassigned pool.
    fn release(&mut self, agents: &[AgentId]);
}

/// Plain set of unassigned agent ids, handed out to whichever squad asks first.
#[derive(Default)]
pub struct UnassignedPool {
    agents: BTreeSet<AgentId>,
}

impl UnassignedPool {
    pub fn new() -> UnassignedPool {
        UnassignedPool::default()
    }

    pub fn contains(&self, agent: AgentId) -> bool {
        self.agents.contains(&agent)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

impl AgentAllocator for UnassignedPool {
    fn grab_unassigned(&mut self, world: &dyn WorldView, request: &ReinforcementRequest) -> Vec<AgentId> {
        let me = world.self_player();
        let radius_squared = request.radius * request.radius;

        // Destroyed agents never come back.
        self.agents.retain(|id| world.agent(*id).is_some());

        let grabbed: Vec<AgentId> = self
            .agents
            .iter()
            .filter_map(|id| world.agent(*id))
            .filter(|agent| agent.owner == me && agent.is_ground_combatant())
            .filter(|agent| agent.position.distance_squared_to(request.anchor) <= radius_squared)
            .map(|agent| agent.id)
            .collect();

        for id in &grabbed {
            self.agents.remove(id);
        }

        grabbed
    }

    fn release(&mut self, agents: &[AgentId]) {
        self.agents.extend(agents.iter().copied());
    }
}

//
// Mission execution.
//

/// Everything a behaviour may touch while it runs. Built fresh per mission update.
pub struct MissionExecutionSystemData<'a> {
    pub world: &'a dyn WorldView,
    pub awareness: &'a Awareness,
    pub features: &'a Features,
    pub weighting: &'a dyn TargetWeighting,
    pub coalescer: &'a mut ActionCoalescer,
    pub reinforcements: &'a mut ReinforcementQueue,
    pub scripts: &'a mut ScriptTable,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BehaviourResult {
    Running,
    Disband,
}

pub trait SquadBehaviour {
    fn kind(&self) -> BehaviourKind;

    fn describe_state(&self) -> String;

    fn update(&mut self, system_data: &mut MissionExecutionSystemData, mission_id: MissionId, squad: &Squad) -> Result<BehaviourResult, String>;
}

/// Binds the squad on the same entity to one behaviour.
#[derive(Component)]
#[storage(DenseVecStorage)]
pub struct Mission {
    behaviour: MissionData,
    priority: i32,
    active: bool,
}

impl Mission {
    pub fn new(behaviour: MissionData, priority: i32) -> Mission {
        Mission {
            behaviour,
            priority,
            active: true,
        }
    }

    pub fn behaviour(&self) -> &MissionData {
        &self.behaviour
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Clear the active flag. The mission releases its squad and is dropped on the next run.
    pub fn terminate(&mut self) {
        self.active = false;
    }

    pub fn describe(&self, squad: Option<&Squad>) -> String {
        let behaviour = self.behaviour.as_behaviour();

        format!(
            "{} - {} - Members: {}",
            behaviour.kind().name(),
            behaviour.describe_state(),
            squad.map(|s| s.len()).unwrap_or(0)
        )
    }
}

struct MissionRequests {
    abort: Vec<MissionId>,
}

impl MissionRequests {
    fn new() -> MissionRequests {
        MissionRequests { abort: Vec::new() }
    }

    fn abort(&mut self, mission: MissionId) {
        self.abort.push(mission);
    }

    fn is_aborting(&self, mission: MissionId) -> bool {
        self.abort.contains(&mission)
    }
}

pub type MissionFailedCallback = Box<dyn FnMut(MissionId, &str) + Send + Sync>;

/// Listeners told about every mission whose behaviour fails.
#[derive(Default)]
pub struct MissionFailureHooks {
    callbacks: Vec<MissionFailedCallback>,
}

impl MissionFailureHooks {
    pub fn push(&mut self, callback: MissionFailedCallback) {
        self.callbacks.push(callback);
    }

    fn notify(&mut self, mission: MissionId, reason: &str) {
        for callback in self.callbacks.iter_mut() {
            callback(mission, reason);
        }
    }
}

/// Host-supplied policies the mission run consults.
pub struct MissionCollaborators {
    pub allocator: Box<dyn AgentAllocator>,
    pub weighting: Box<dyn TargetWeighting>,
}

impl Default for MissionCollaborators {
    fn default() -> MissionCollaborators {
        MissionCollaborators {
            allocator: Box::new(UnassignedPool::new()),
            weighting: Box::new(DefaultTargetWeighting),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MissionRunStats {
    pub updated: usize,
    pub disbanded: usize,
    pub failed: usize,
    pub reinforced: usize,
}

/// Register the mission storages and the resources `RunMissionSystem` reads.
pub fn register_missions(world: &mut World, collaborators: MissionCollaborators) {
    world.register::<Mission>();
    world.register::<Squad>();

    world.insert(collaborators);
    world.insert(MissionFailureHooks::default());
    world.insert(ScriptTable::default());
    world.insert(MissionRunStats::default());
}

/// Mission controller operations on the world that owns the missions.
pub trait MissionControllerExt {
    fn add_mission(&mut self, squad: Squad, mission: Mission) -> MissionId;

    fn terminate_mission(&mut self, mission: MissionId) -> bool;

    fn on_mission_failed(&mut self, callback: MissionFailedCallback);

    fn mission_count(&self) -> usize;

    fn squads_alive(&self) -> usize;

    fn describe_mission(&self, mission: MissionId) -> Option<String>;

    fn squad_members(&self, mission: MissionId) -> Option<Vec<AgentId>>;
}

impl MissionControllerExt for World {
    fn add_mission(&mut self, squad: Squad, mission: Mission) -> MissionId {
        self.create_entity().with(squad).with(mission).build()
    }

    fn terminate_mission(&mut self, mission: MissionId) -> bool {
        match self.write_storage::<Mission>().get_mut(mission) {
            Some(mission) => {
                mission.terminate();
                true
            }
            None => false,
        }
    }

    fn on_mission_failed(&mut self, callback: MissionFailedCallback) {
        self.write_resource::<MissionFailureHooks>().push(callback);
    }

    fn mission_count(&self) -> usize {
        (&self.read_storage::<Mission>()).join().count()
    }

    fn squads_alive(&self) -> usize {
        (&self.read_storage::<Mission>(), &self.read_storage::<Squad>())
            .join()
            .filter(|(_, squad)| !squad.is_dead())
            .count()
    }

    fn describe_mission(&self, mission: MissionId) -> Option<String> {
        let squads = self.read_storage::<Squad>();

        self.read_storage::<Mission>().get(mission).map(|m| m.describe(squads.get(mission)))
    }

    fn squad_members(&self, mission: MissionId) -> Option<Vec<AgentId>> {
        self.read_storage::<Squad>().get(mission).map(|squad| squad.members().to_vec())
    }
}

#[derive(SystemData)]
pub struct MissionSystemData<'a> {
    entities: Entities<'a>,
    missions: WriteStorage<'a, Mission>,
    squads: WriteStorage<'a, Squad>,
    awareness: ReadExpect<'a, Awareness>,
    features: Read<'a, Features>,
    collaborators: WriteExpect<'a, MissionCollaborators>,
    coalescer: Write<'a, ActionCoalescer>,
    scripts: Write<'a, ScriptTable>,
    failure_hooks: Write<'a, MissionFailureHooks>,
    run_stats: Write<'a, MissionRunStats>,
}

/// Drives every mission once per tick, lowest priority first so higher
/// priority intents are issued last.
pub struct RunMissionSystem<'w> {
    pub view: &'w dyn WorldView,
}

impl<'w> RunMissionSystem<'w> {
    fn run_order(data: &MissionSystemData) -> Vec<MissionId> {
        let mut order: Vec<(i32, MissionId)> = (&data.entities, &data.missions)
            .join()
            .map(|(entity, mission)| (mission.priority, entity))
            .collect();

        order.sort();

        order.into_iter().map(|(_, entity)| entity).collect()
    }

    fn process_requests(data: &mut MissionSystemData, mut requests: MissionRequests) -> usize {
        let mut removed = 0;

        while let Some(mission_entity) = requests.abort.pop() {
            if data.missions.remove(mission_entity).is_some() {
                if let Some(mut squad) = data.squads.remove(mission_entity) {
                    data.collaborators.allocator.release(&squad.release_members());
                }

                data.scripts.remove(mission_entity);

                if let Err(err) = data.entities.delete(mission_entity) {
                    warn!("Trying to clean up mission entity that no longer exists. Error: {}", err);
                }

                removed += 1;
            }
        }

        removed
    }
}

impl<'a, 'w> System<'a> for RunMissionSystem<'w> {
    type SystemData = MissionSystemData<'a>;

    fn run(&mut self, mut data: Self::SystemData) {
        let world = self.view;

        let mut stats = MissionRunStats::default();
        let mut reinforcements = ReinforcementQueue::default();

        for mission_entity in Self::run_order(&data) {
            let mut mission_requests = MissionRequests::new();

            if let Some(mission) = data.missions.get_mut(mission_entity) {
                match data.squads.get_mut(mission_entity) {
                    _ if !mission.active => {
                        info!("Mission {:?} is no longer active, disbanding.", mission_entity);
                        mission_requests.abort(mission_entity);
                    }
                    None => {
                        info!("Mission {:?} has no squad, disbanding.", mission_entity);
                        mission_requests.abort(mission_entity);
                    }
                    Some(squad) => {
                        squad.update(world);

                        if squad.is_dead() {
                            info!("Mission {:?} squad is dead, disbanding.", mission_entity);
                            mission_requests.abort(mission_entity);
                        } else {
                            let mut system_data = MissionExecutionSystemData {
                                world,
                                awareness: &data.awareness,
                                features: &data.features,
                                weighting: data.collaborators.weighting.as_ref(),
                                coalescer: &mut data.coalescer,
                                reinforcements: &mut reinforcements,
                                scripts: &mut data.scripts,
                            };

                            stats.updated += 1;

                            match mission.behaviour.as_behaviour_mut().update(&mut system_data, mission_entity, squad) {
                                Ok(BehaviourResult::Running) => {}
                                Ok(BehaviourResult::Disband) => {
                                    info!("Mission {:?} complete, disbanding.", mission_entity);
                                    mission_requests.abort(mission_entity);
                                }
                                Err(error) => {
                                    info!("Mission {:?} run failed, cleaning up. Error: {}", mission_entity, error);

                                    data.failure_hooks.notify(mission_entity, &error);

                                    stats.failed += 1;
                                    mission_requests.abort(mission_entity);
                                }
                            }

                            if !mission_requests.is_aborting(mission_entity) {
                                for request in reinforcements.take() {
                                    for agent in data.collaborators.allocator.grab_unassigned(world, &request) {
                                        if squad.add_member(agent) {
                                            stats.reinforced += 1;
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }

            reinforcements.clear();

            stats.disbanded += Self::process_requests(&mut data, mission_requests);
        }

        *data.run_stats = stats;
    }
}
