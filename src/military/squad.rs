use crate::world::*;
use log::*;
use serde::{Deserialize, Serialize};
use shrinkwraprs::*;
use specs::prelude::*;
use specs::Component;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SquadId(pub u32);

/// Squad lifecycle. `Dead` is terminal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SquadLiveness {
    #[default]
    Active,
    Dead,
}

/// Center of mass and maximum spread of the squad's movable ground members.
///
/// Derived from current membership every tick; cached only for reads within
/// the same tick.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cohesion {
    pub center: Tile,
    pub spread: f32,
    /// Number of members the cohesion was computed from.
    pub member_count: usize,
}

/// Rounded component-wise mean of the tiles, and the max distance from any tile
/// to it. `None` for an empty set.
pub fn compute_cohesion(tiles: &[Tile]) -> Option<Cohesion> {
    if tiles.is_empty() {
        return None;
    }

    let count = tiles.len() as f64;
    let sum_x: f64 = tiles.iter().map(|t| t.x as f64).sum();
    let sum_y: f64 = tiles.iter().map(|t| t.y as f64).sum();

    let center = Tile::new((sum_x / count).round() as i32, (sum_y / count).round() as i32);

    let spread = tiles.iter().map(|t| t.distance_to(center)).fold(0.0f32, f32::max);

    Some(Cohesion {
        center,
        spread,
        member_count: tiles.len(),
    })
}

/// Unique, unordered set of member ids.
#[derive(Shrinkwrap, Clone, Debug, Default)]
pub struct SquadMembers(Vec<AgentId>);

impl SquadMembers {
    fn insert(&mut self, id: AgentId) -> bool {
        if self.0.contains(&id) {
            false
        } else {
            self.0.push(id);
            true
        }
    }

    fn remove(&mut self, id: AgentId) -> bool {
        let before = self.0.len();
        self.0.retain(|m| *m != id);
        self.0.len() != before
    }

    fn retain<F: FnMut(&AgentId) -> bool>(&mut self, f: F) {
        self.0.retain(f);
    }
}

/// A group of agents moving and fighting together.
///
/// Membership is owned here; the allocator that feeds agents into squads is
/// responsible for an agent being in at most one squad.
#[derive(Clone, Debug, Component)]
#[storage(DenseVecStorage)]
pub struct Squad {
    id: SquadId,
    members: SquadMembers,
    killable: bool,
    liveness: SquadLiveness,
    cohesion: Option<Cohesion>,
}

impl Squad {
    pub fn new(id: SquadId, killable: bool) -> Squad {
        Squad {
            id,
            members: SquadMembers::default(),
            killable,
            liveness: SquadLiveness::Active,
            cohesion: None,
        }
    }

    pub fn with_members<I: IntoIterator<Item = AgentId>>(id: SquadId, killable: bool, members: I) -> Squad {
        let mut squad = Squad::new(id, killable);

        for member in members {
            squad.add_member(member);
        }

        squad
    }

    pub fn id(&self) -> SquadId {
        self.id
    }

    pub fn is_killable(&self) -> bool {
        self.killable
    }

    pub fn liveness(&self) -> SquadLiveness {
        self.liveness
    }

    pub fn is_dead(&self) -> bool {
        self.liveness == SquadLiveness::Dead
    }

    pub fn members(&self) -> &[AgentId] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, id: AgentId) -> bool {
        self.members.contains(&id)
    }

    /// Returns false if the agent was already a member or the squad is dead.
    pub fn add_member(&mut self, id: AgentId) -> bool {
        if self.is_dead() {
            return false;
        }

        self.members.insert(id)
    }

    pub fn remove_member(&mut self, id: AgentId) -> bool {
        let removed = self.members.remove(id);

        if removed {
            self.check_liveness();
        }

        removed
    }

    /// Remove and return every member.
    pub fn release_members(&mut self) -> Vec<AgentId> {
        let released = std::mem::take(&mut self.members).0;

        self.cohesion = None;
        self.check_liveness();

        released
    }

    fn check_liveness(&mut self) {
        if self.killable && self.members.is_empty() && self.liveness == SquadLiveness::Active {
            debug!("Squad {:?} has no members left, marking dead", self.id);

            self.liveness = SquadLiveness::Dead;
        }
    }

    /// Prune members that no longer resolve to one of our units, update liveness,
    /// and recompute cohesion.
    pub fn update(&mut self, world: &dyn WorldView) {
        let me = world.self_player();

        self.members
            .retain(|id| world.agent(*id).map(|agent| agent.owner == me).unwrap_or(false));

        self.check_liveness();

        let tiles: Vec<Tile> = self
            .members
            .iter()
            .filter_map(|id| world.agent(*id))
            .filter(|agent| agent.is_movable_ground())
            .map(|agent| agent.tile())
            .collect();

        self.cohesion = compute_cohesion(&tiles);
    }

    pub fn cohesion(&self) -> Option<Cohesion> {
        self.cohesion
    }

    pub fn center(&self) -> Option<Tile> {
        self.cohesion.map(|c| c.center)
    }

    pub fn spread(&self) -> Option<f32> {
        self.cohesion.map(|c| c.spread)
    }

    /// Resolved members matching the predicate.
    pub fn members_matching<F>(&self, world: &dyn WorldView, predicate: F) -> Vec<AgentInfo>
    where
        F: Fn(&AgentInfo) -> bool,
    {
        self.members
            .iter()
            .filter_map(|id| world.agent(*id))
            .filter(|agent| predicate(agent))
            .collect()
    }

    pub fn members_of_kind(&self, world: &dyn WorldView, kind: &str) -> Vec<AgentInfo> {
        self.members_matching(world, |agent| agent.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use proptest::prelude::*;

    #[test]
    fn cohesion_of_a_line() {
        let cohesion = compute_cohesion(&[Tile::new(0, 0), Tile::new(2, 0), Tile::new(4, 0)]).unwrap();

        assert_eq!(cohesion.center, Tile::new(2, 0));
        assert!((cohesion.spread - 2.0).abs() < 1e-6);
        assert_eq!(cohesion.member_count, 3);
    }

    #[test]
    fn cohesion_of_nothing_is_undefined() {
        assert!(compute_cohesion(&[]).is_none());
    }

    #[test]
    fn cohesion_center_is_rounded() {
        let cohesion = compute_cohesion(&[Tile::new(0, 0), Tile::new(1, 0), Tile::new(1, 1)]).unwrap();

        assert_eq!(cohesion.center, Tile::new(1, 0));
        assert!((cohesion.spread - 1.0).abs() < 1e-6);
    }

    #[test]
    fn killable_squad_dies_once_empty() {
        let mut world = MockWorld::new(32, 32);
        world.add(tank(1, SELF, 1.0, 1.0));
        world.add(tank(2, SELF, 2.0, 1.0));

        let mut squad = Squad::with_members(SquadId(1), true, vec![AgentId(1), AgentId(2)]);

        squad.update(&world);
        assert_eq!(squad.liveness(), SquadLiveness::Active);

        world.remove(AgentId(1));
        squad.update(&world);
        assert_eq!(squad.members(), &[AgentId(2)]);
        assert_eq!(squad.liveness(), SquadLiveness::Active);

        world.remove(AgentId(2));
        squad.update(&world);
        assert_eq!(squad.liveness(), SquadLiveness::Dead);

        world.add(tank(2, SELF, 2.0, 1.0));
        assert!(!squad.add_member(AgentId(2)));
        squad.update(&world);
        assert_eq!(squad.liveness(), SquadLiveness::Dead);
    }

    #[test]
    fn non_killable_squad_persists_empty() {
        let world = MockWorld::new(32, 32);
        let mut squad = Squad::with_members(SquadId(1), false, vec![AgentId(9)]);

        squad.update(&world);
        squad.update(&world);

        assert!(squad.is_empty());
        assert_eq!(squad.liveness(), SquadLiveness::Active);
        assert!(squad.cohesion().is_none());

        assert!(squad.add_member(AgentId(9)));
    }

    #[test]
    fn transferred_units_are_pruned() {
        let mut world = MockWorld::new(32, 32);
        world.add(tank(1, SELF, 1.0, 1.0));
        world.add(tank(2, SELF, 2.0, 1.0));

        let mut squad = Squad::with_members(SquadId(1), true, vec![AgentId(1), AgentId(2)]);

        world.modify(AgentId(2), |a| a.owner = ENEMY);
        squad.update(&world);

        assert_eq!(squad.members(), &[AgentId(1)]);
    }

    #[test]
    fn cohesion_ignores_air_static_and_embarked_members() {
        let mut world = MockWorld::new(64, 64);
        world.add(tank(1, SELF, 0.5, 0.5));
        world.add(tank(2, SELF, 4.5, 0.5));
        world.add(aircraft(3, SELF, 40.0, 40.0));
        world.add(turret(4, SELF, 40.0, 0.0));
        let mut embarked = infantry(5, SELF, 30.0, 30.0, 1);
        embarked.flags |= AgentFlags::EMBARKED;
        world.add(embarked);

        let mut squad = Squad::with_members(SquadId(1), true, (1..=5).map(AgentId));
        squad.update(&world);

        let cohesion = squad.cohesion().unwrap();
        assert_eq!(cohesion.center, Tile::new(2, 0));
        assert_eq!(cohesion.member_count, 2);
        assert_eq!(squad.len(), 5);
    }

    #[test]
    fn membership_is_unique() {
        let mut squad = Squad::new(SquadId(3), true);

        assert!(squad.add_member(AgentId(1)));
        assert!(!squad.add_member(AgentId(1)));
        assert_eq!(squad.len(), 1);

        assert!(squad.remove_member(AgentId(1)));
        assert!(squad.is_dead());
    }

    #[test]
    fn filtered_member_queries() {
        let mut world = MockWorld::new(32, 32);
        world.add(tank(1, SELF, 1.0, 1.0));
        world.add(artillery(2, SELF, 2.0, 1.0));

        let squad = Squad::with_members(SquadId(1), true, vec![AgentId(1), AgentId(2), AgentId(3)]);

        assert_eq!(squad.members_of_kind(&world, "artillery").len(), 1);
        assert_eq!(squad.members_matching(&world, |a| a.has(AgentFlags::COMBATANT)).len(), 2);
    }

    proptest! {
        #[test]
        fn cohesion_matches_definition(tiles in proptest::collection::vec((-100i32..100, -100i32..100), 1..50)) {
            let tiles: Vec<Tile> = tiles.into_iter().map(|(x, y)| Tile::new(x, y)).collect();
            let cohesion = compute_cohesion(&tiles).unwrap();

            let mean_x = tiles.iter().map(|t| t.x as f64).sum::<f64>() / tiles.len() as f64;
            let mean_y = tiles.iter().map(|t| t.y as f64).sum::<f64>() / tiles.len() as f64;

            prop_assert_eq!(cohesion.center, Tile::new(mean_x.round() as i32, mean_y.round() as i32));

            let max = tiles.iter().map(|t| t.distance_to(cohesion.center)).fold(0.0f32, f32::max);
            prop_assert!((cohesion.spread - max).abs() < 1e-4);
            prop_assert!(tiles.iter().all(|t| t.distance_to(cohesion.center) <= cohesion.spread + 1e-4));
        }
    }
}
