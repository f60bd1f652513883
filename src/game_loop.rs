use crate::features::*;
use crate::military::awareness::*;
use crate::military::micro::*;
use crate::military::squad::*;
use crate::missions::missionsystem::*;
use crate::stats::*;
use crate::transfer::ordersystem::*;
use crate::world::*;
use log::*;
use specs::prelude::*;
use std::ops::Deref;

/// The whole decision pipeline. The host calls `tick` once per simulation step.
pub struct TacticsEngine {
    world: World,
}

impl TacticsEngine {
    pub fn new(features: Features) -> TacticsEngine {
        TacticsEngine::with_collaborators(features, Box::new(UnassignedPool::new()), Box::new(DefaultTargetWeighting))
    }

    pub fn with_collaborators(features: Features, allocator: Box<dyn AgentAllocator>, weighting: Box<dyn TargetWeighting>) -> TacticsEngine {
        let mut world = World::new();

        world.insert(features);
        world.insert(Awareness::new());
        world.insert(ActionCoalescer::new());
        world.insert(FlushStats::default());

        register_missions(&mut world, MissionCollaborators { allocator, weighting });

        TacticsEngine { world }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn features(&self) -> impl Deref<Target = Features> + '_ {
        self.world.read_resource::<Features>()
    }

    pub fn awareness(&self) -> impl Deref<Target = Awareness> + '_ {
        self.world.read_resource::<Awareness>()
    }

    pub fn add_mission(&mut self, squad: Squad, mission: Mission) -> MissionId {
        self.world.add_mission(squad, mission)
    }

    pub fn terminate_mission(&mut self, mission: MissionId) -> bool {
        self.world.terminate_mission(mission)
    }

    pub fn on_mission_failed(&mut self, callback: MissionFailedCallback) {
        self.world.on_mission_failed(callback);
    }

    /// Hand agents to the unassigned pool so squads can grab them.
    pub fn release_agents(&mut self, agents: &[AgentId]) {
        self.world.write_resource::<MissionCollaborators>().allocator.release(agents);
    }

    pub fn tick(&mut self, view: &dyn WorldView, sink: &mut dyn OrderSink) -> TickStats {
        let tick = view.tick();

        //
        // Awareness is settled before any mission reads it, and orders are
        // flushed only after every mission has issued its intents.
        //

        let mut dispatcher = DispatcherBuilder::new()
            .with_thread_local(AwarenessUpdateSystem { view })
            .with_thread_local(RunMissionSystem { view })
            .with_thread_local(OrderFlushSystem { sink })
            .build();

        dispatcher.dispatch(&self.world);
        self.world.maintain();

        let stats = {
            let awareness = self.world.read_resource::<Awareness>();
            let features = self.world.read_resource::<Features>();
            let run_stats = *self.world.read_resource::<MissionRunStats>();
            let flush_stats = *self.world.read_resource::<FlushStats>();

            TickStats {
                tick,
                attacking: awareness.is_attacking(),
                hostiles_indexed: awareness.hostile_count(),
                visibility: awareness.visibility_fraction(),
                sector_update_ratio: awareness.sector_update_ratio(tick, features.awareness.sector_update_window),
                missions: self.world.mission_count(),
                squads_alive: self.world.squads_alive(),
                missions_disbanded: run_stats.disbanded,
                missions_failed: run_stats.failed,
                orders_submitted: flush_stats.orders,
                agents_ordered: flush_stats.agents,
            }
        };

        match stats.to_json() {
            Ok(json) => debug!("Tick stats: {}", json),
            Err(err) => warn!("{}", err),
        }

        stats
    }
}
