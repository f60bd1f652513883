use crate::world::*;
use specs::prelude::*;
use std::collections::{BTreeMap, HashSet};

pub const SELF: PlayerId = PlayerId(1);
pub const ENEMY: PlayerId = PlayerId(2);
pub const ALLY: PlayerId = PlayerId(3);
pub const NEUTRAL: PlayerId = PlayerId(4);

/// An entity to key mission state by in tests that run behaviours directly.
pub fn mission_entity() -> Entity {
    World::new().create_entity().build()
}

pub struct MockWorld {
    pub tick: u32,
    pub tick_rate: u32,
    pub width: i32,
    pub height: i32,
    pub players: Vec<PlayerInfo>,
    pub alliances: HashSet<(PlayerId, PlayerId)>,
    pub agents: BTreeMap<AgentId, AgentInfo>,
    pub hidden: HashSet<AgentId>,
    pub visible_tiles: HashSet<Tile>,
    pub fail_enumeration: bool,
}

impl MockWorld {
    pub fn new(width: i32, height: i32) -> MockWorld {
        let mut alliances = HashSet::new();
        alliances.insert((SELF, ALLY));

        MockWorld {
            tick: 0,
            tick_rate: 25,
            width,
            height,
            players: vec![
                PlayerInfo {
                    id: SELF,
                    combatant: true,
                    start_location: Some(Position::new(4.0, 4.0)),
                },
                PlayerInfo {
                    id: ENEMY,
                    combatant: true,
                    start_location: Some(Position::new((width - 4) as f32, (height - 4) as f32)),
                },
                PlayerInfo {
                    id: ALLY,
                    combatant: true,
                    start_location: None,
                },
                PlayerInfo {
                    id: NEUTRAL,
                    combatant: false,
                    start_location: None,
                },
            ],
            alliances,
            agents: BTreeMap::new(),
            hidden: HashSet::new(),
            visible_tiles: HashSet::new(),
            fail_enumeration: false,
        }
    }

    pub fn visible_rect(&mut self, min: Tile, max: Tile) {
        for y in min.y..max.y {
            for x in min.x..max.x {
                self.visible_tiles.insert(Tile::new(x, y));
            }
        }
    }

    pub fn add(&mut self, agent: AgentInfo) -> AgentId {
        let id = agent.id;
        self.agents.insert(id, agent);
        id
    }

    pub fn remove(&mut self, id: AgentId) {
        self.agents.remove(&id);
    }

    pub fn modify<F: FnOnce(&mut AgentInfo)>(&mut self, id: AgentId, f: F) {
        if let Some(agent) = self.agents.get_mut(&id) {
            f(agent);
        }
    }
}

impl WorldView for MockWorld {
    fn tick(&self) -> u32 {
        self.tick
    }

    fn tick_rate(&self) -> u32 {
        self.tick_rate
    }

    fn self_player(&self) -> PlayerId {
        SELF
    }

    fn players(&self) -> Vec<PlayerInfo> {
        self.players.clone()
    }

    fn is_allied(&self, a: PlayerId, b: PlayerId) -> bool {
        a == b || self.alliances.contains(&(a, b)) || self.alliances.contains(&(b, a))
    }

    fn agent(&self, id: AgentId) -> Option<AgentInfo> {
        self.agents.get(&id).cloned()
    }

    fn visible_agents(&self) -> Result<Vec<AgentInfo>, String> {
        if self.fail_enumeration {
            return Err("enumeration failed".to_owned());
        }

        Ok(self
            .agents
            .values()
            .filter(|a| !self.hidden.contains(&a.id) && !a.has(AgentFlags::EMBARKED))
            .cloned()
            .collect())
    }

    fn owned_agents(&self, owner: PlayerId) -> Vec<AgentInfo> {
        self.agents.values().filter(|a| a.owner == owner).cloned().collect()
    }

    fn map_size(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    fn tile_exists(&self, tile: Tile) -> bool {
        tile.x >= 0 && tile.y >= 0 && tile.x < self.width && tile.y < self.height
    }

    fn is_tile_visible(&self, tile: Tile) -> bool {
        self.visible_tiles.contains(&tile)
    }
}

pub fn agent(id: u32, owner: PlayerId, x: f32, y: f32, flags: AgentFlags) -> AgentInfo {
    AgentInfo {
        id: AgentId(id),
        owner,
        kind: "unit".to_owned(),
        position: Position::new(x, y),
        flags,
        weapon_range: 5.0,
        deployed_weapon_range: None,
        firepower: 10.0,
        passenger_size: 1,
        passenger_capacity: 0,
        cargo_used: 0,
    }
}

pub fn tank(id: u32, owner: PlayerId, x: f32, y: f32) -> AgentInfo {
    let mut info = agent(
        id,
        owner,
        x,
        y,
        AgentFlags::MOBILE | AgentFlags::GROUND | AgentFlags::COMBATANT | AgentFlags::SELECTABLE | AgentFlags::TARGETS_GROUND,
    );
    info.kind = "tank".to_owned();
    info
}

pub fn aircraft(id: u32, owner: PlayerId, x: f32, y: f32) -> AgentInfo {
    let mut info = agent(
        id,
        owner,
        x,
        y,
        AgentFlags::MOBILE
            | AgentFlags::AIR
            | AgentFlags::COMBATANT
            | AgentFlags::SELECTABLE
            | AgentFlags::TARGETS_GROUND
            | AgentFlags::TARGETS_AIR,
    );
    info.kind = "aircraft".to_owned();
    info
}

pub fn turret(id: u32, owner: PlayerId, x: f32, y: f32) -> AgentInfo {
    let mut info = agent(
        id,
        owner,
        x,
        y,
        AgentFlags::STRUCTURE | AgentFlags::COMBATANT | AgentFlags::TARGETS_GROUND | AgentFlags::TARGETS_AIR,
    );
    info.kind = "turret".to_owned();
    info
}

pub fn building(id: u32, owner: PlayerId, x: f32, y: f32) -> AgentInfo {
    let mut info = agent(id, owner, x, y, AgentFlags::STRUCTURE | AgentFlags::SELECTABLE);
    info.kind = "building".to_owned();
    info.firepower = 0.0;
    info
}

pub fn artillery(id: u32, owner: PlayerId, x: f32, y: f32) -> AgentInfo {
    let mut info = tank(id, owner, x, y);
    info.kind = "artillery".to_owned();
    info.flags |= AgentFlags::DEPLOYABLE;
    info.weapon_range = 3.0;
    info.deployed_weapon_range = Some(9.0);
    info
}

pub fn apc(id: u32, owner: PlayerId, x: f32, y: f32, capacity: u32) -> AgentInfo {
    let mut info = agent(
        id,
        owner,
        x,
        y,
        AgentFlags::MOBILE | AgentFlags::GROUND | AgentFlags::TRANSPORT | AgentFlags::SELECTABLE,
    );
    info.kind = "apc".to_owned();
    info.passenger_capacity = capacity;
    info.firepower = 0.0;
    info
}

pub fn infantry(id: u32, owner: PlayerId, x: f32, y: f32, size: u32) -> AgentInfo {
    let mut info = tank(id, owner, x, y);
    info.kind = "infantry".to_owned();
    info.passenger_size = size;
    info
}
