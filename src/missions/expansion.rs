use super::data::*;
use super::missionsystem::*;
use crate::military::squad::*;
use crate::world::*;
use log::*;

/// Escorts deployable units to an expansion site and deploys them there.
pub struct ExpansionBehaviour {
    expansion_point: Option<Position>,
    last_orders: Option<u32>,
    deployed: usize,
}

impl ExpansionBehaviour {
    pub fn new(expansion_point: Option<Position>) -> ExpansionBehaviour {
        ExpansionBehaviour {
            expansion_point,
            last_orders: None,
            deployed: 0,
        }
    }

    fn destination(&self, system_data: &MissionExecutionSystemData) -> Result<Position, String> {
        let world = system_data.world;

        let destination = self
            .expansion_point
            .or_else(|| system_data.awareness.rally_point())
            .or_else(|| world.start_location(world.self_player()))
            .ok_or("No expansion point, rally point or start location available")?;

        Ok(destination)
    }
}

impl SquadBehaviour for ExpansionBehaviour {
    fn kind(&self) -> BehaviourKind {
        BehaviourKind::Expansion
    }

    fn describe_state(&self) -> String {
        match self.expansion_point {
            Some(point) => format!("Expanding to ({:.0}, {:.0}) - Deployed: {}", point.x, point.y, self.deployed),
            None => format!("Expanding - Deployed: {}", self.deployed),
        }
    }

    fn update(&mut self, system_data: &mut MissionExecutionSystemData, _mission_id: MissionId, squad: &Squad) -> Result<BehaviourResult, String> {
        let world = system_data.world;
        let tick = world.tick();

        let deployers = squad.members_matching(world, |agent| {
            agent.has(AgentFlags::DEPLOYABLE | AgentFlags::MOBILE) && !agent.has(AgentFlags::DEPLOYED) && !agent.has(AgentFlags::EMBARKED)
        });

        self.deployed = squad.members_matching(world, |agent| agent.has(AgentFlags::DEPLOYABLE | AgentFlags::DEPLOYED)).len();

        if deployers.is_empty() {
            debug!("Expansion squad {:?} has nothing left to deploy", squad.id());

            return Ok(BehaviourResult::Disband);
        }

        let interval = system_data.features.combat.target_interval;

        if let Some(last) = self.last_orders {
            if tick.saturating_sub(last) < interval {
                return Ok(BehaviourResult::Running);
            }
        }

        self.last_orders = Some(tick);

        let destination = self.destination(system_data)?;
        let deploy_range = system_data.features.expansion.deploy_range;

        for agent in &deployers {
            if agent.position.distance_to(destination) <= deploy_range {
                system_data.coalescer.issue(agent.id, OrderKind::Deploy, OrderTarget::None);
            } else {
                system_data.coalescer.issue(agent.id, OrderKind::Move, OrderTarget::Point(destination));
            }
        }

        let escorts = squad.members_matching(world, |agent| {
            agent.has(AgentFlags::COMBATANT | AgentFlags::MOBILE) && !agent.has(AgentFlags::DEPLOYABLE) && !agent.has(AgentFlags::EMBARKED)
        });

        for agent in &escorts {
            system_data.coalescer.issue(agent.id, OrderKind::Move, OrderTarget::Point(destination));
        }

        Ok(BehaviourResult::Running)
    }
}
