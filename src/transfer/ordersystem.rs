use crate::world::*;
use itertools::Itertools;
use log::*;
use shrinkwraprs::*;
use specs::prelude::*;
use std::collections::HashMap;

/// The most recent intent issued for one agent this tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PendingAction {
    pub kind: OrderKind,
    pub target: OrderTarget,
    /// Issue sequence number, used only to report overwrites.
    sequence: u32,
}

#[derive(Shrinkwrap, Default)]
#[shrinkwrap(mutable)]
struct PendingActions(HashMap<AgentId, PendingAction>);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FlushStats {
    /// Batched orders handed to the sink.
    pub orders: usize,
    /// Distinct agents covered by those orders.
    pub agents: usize,
    /// Intents discarded because a later intent for the same agent replaced them.
    pub overwritten: usize,
}

/// Collects per-agent intents from every behaviour during a tick and submits
/// one order per agent at the end of it. Last write wins.
#[derive(Default)]
pub struct ActionCoalescer {
    pending: PendingActions,
    sequence: u32,
    overwritten: usize,
}

impl ActionCoalescer {
    pub fn new() -> ActionCoalescer {
        ActionCoalescer::default()
    }

    pub fn issue(&mut self, agent: AgentId, kind: OrderKind, target: OrderTarget) {
        let sequence = self.sequence;
        self.sequence += 1;

        let previous = self.pending.insert(agent, PendingAction { kind, target, sequence });

        if let Some(previous) = previous {
            trace!(
                "Replacing pending {:?} for agent {:?} with {:?} (issued #{})",
                previous.kind,
                agent,
                kind,
                previous.sequence
            );

            self.overwritten += 1;
        }
    }

    pub fn pending(&self, agent: AgentId) -> Option<&PendingAction> {
        self.pending.get(&agent)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.sequence = 0;
        self.overwritten = 0;
    }

    /// Submit one batched order per distinct `(kind, target)`, agents sorted by
    /// id, then clear for the next tick.
    pub fn flush(&mut self, sink: &mut dyn OrderSink) -> FlushStats {
        let mut stats = FlushStats {
            overwritten: self.overwritten,
            ..Default::default()
        };

        let sorted = self.pending.drain().sorted_by_key(|(agent, _)| *agent).collect_vec();

        let mut batches: Vec<Order> = Vec::new();

        for (agent, action) in sorted {
            match batches.iter_mut().find(|order| order.kind == action.kind && order.target == action.target) {
                Some(order) => order.agents.push(agent),
                None => batches.push(Order {
                    agents: vec![agent],
                    kind: action.kind,
                    target: action.target,
                }),
            }

            stats.agents += 1;
        }

        stats.orders = batches.len();

        for order in batches {
            sink.submit(order);
        }

        self.clear();

        stats
    }
}

#[derive(SystemData)]
pub struct OrderFlushSystemData<'a> {
    coalescer: Write<'a, ActionCoalescer>,
    flush_stats: Write<'a, FlushStats>,
}

/// Hands the tick's coalesced intents to the host. Runs after every mission.
pub struct OrderFlushSystem<'s> {
    pub sink: &'s mut dyn OrderSink,
}

impl<'a, 's> System<'a> for OrderFlushSystem<'s> {
    type SystemData = OrderFlushSystemData<'a>;

    fn run(&mut self, mut data: Self::SystemData) {
        *data.flush_stats = data.coalescer.flush(&mut *self.sink);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::Position;

    #[test]
    fn last_write_wins_per_agent() {
        let mut coalescer = ActionCoalescer::new();

        coalescer.issue(AgentId(1), OrderKind::Move, OrderTarget::Point(Position::new(1.0, 1.0)));
        coalescer.issue(AgentId(1), OrderKind::Attack, OrderTarget::Agent(AgentId(9)));

        let mut sink: Vec<Order> = Vec::new();
        let stats = coalescer.flush(&mut sink);

        assert_eq!(
            sink,
            vec![Order {
                agents: vec![AgentId(1)],
                kind: OrderKind::Attack,
                target: OrderTarget::Agent(AgentId(9)),
            }]
        );
        assert_eq!(stats, FlushStats { orders: 1, agents: 1, overwritten: 1 });
    }

    #[test]
    fn identical_intents_are_batched() {
        let mut coalescer = ActionCoalescer::new();
        let rally = OrderTarget::Point(Position::new(5.0, 5.0));

        coalescer.issue(AgentId(3), OrderKind::Move, rally);
        coalescer.issue(AgentId(1), OrderKind::Move, rally);
        coalescer.issue(AgentId(2), OrderKind::Deploy, OrderTarget::None);

        let mut sink: Vec<Order> = Vec::new();
        let stats = coalescer.flush(&mut sink);

        assert_eq!(stats.orders, 2);
        assert_eq!(stats.agents, 3);
        assert_eq!(sink[0].agents, vec![AgentId(1), AgentId(3)]);
        assert_eq!(sink[0].kind, OrderKind::Move);
        assert_eq!(sink[1].agents, vec![AgentId(2)]);
    }

    #[test]
    fn flush_clears_pending() {
        let mut coalescer = ActionCoalescer::new();
        coalescer.issue(AgentId(1), OrderKind::Move, OrderTarget::None);

        let mut sink: Vec<Order> = Vec::new();
        coalescer.flush(&mut sink);
        assert!(coalescer.is_empty());

        let mut second: Vec<Order> = Vec::new();
        let stats = coalescer.flush(&mut second);

        assert!(second.is_empty());
        assert_eq!(stats, FlushStats::default());
    }

    #[test]
    fn every_agent_appears_once() {
        let mut coalescer = ActionCoalescer::new();

        for round in 0..3 {
            for agent in 0..10 {
                let kind = if (agent + round) % 2 == 0 { OrderKind::Move } else { OrderKind::Attack };
                coalescer.issue(AgentId(agent), kind, OrderTarget::None);
            }
        }

        let mut sink: Vec<Order> = Vec::new();
        coalescer.flush(&mut sink);

        let mut seen: Vec<AgentId> = sink.iter().flat_map(|o| o.agents.iter().copied()).collect();
        seen.sort();
        seen.dedup();

        assert_eq!(seen.len(), 10);
        assert_eq!(sink.iter().map(|o| o.agents.len()).sum::<usize>(), 10);
    }

    #[test]
    fn flush_system_records_stats() {
        let mut world = World::new();
        world.insert(ActionCoalescer::new());
        world.insert(FlushStats::default());

        world.write_resource::<ActionCoalescer>().issue(AgentId(4), OrderKind::Attack, OrderTarget::Agent(AgentId(8)));
        world.write_resource::<ActionCoalescer>().issue(AgentId(5), OrderKind::Attack, OrderTarget::Agent(AgentId(8)));

        let mut sink: Vec<Order> = Vec::new();
        OrderFlushSystem { sink: &mut sink }.run_now(&world);

        assert_eq!(sink.len(), 1);
        assert_eq!(sink[0].agents, vec![AgentId(4), AgentId(5)]);
        assert_eq!(*world.read_resource::<FlushStats>(), FlushStats { orders: 1, agents: 2, overwritten: 0 });
        assert!(world.read_resource::<ActionCoalescer>().is_empty());
    }
}
