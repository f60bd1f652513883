use super::combat::*;
use super::expansion::*;
use super::missionsystem::*;
use super::script::*;
use crate::world::*;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BehaviourKind {
    Combat,
    Expansion,
    Scripted,
}

impl BehaviourKind {
    pub fn name(&self) -> &'static str {
        BEHAVIOURS
            .iter()
            .find(|registration| registration.kind == *self)
            .map(|registration| registration.name)
            .unwrap_or("unknown")
    }

    pub fn from_name(name: &str) -> Option<BehaviourKind> {
        BEHAVIOURS
            .iter()
            .find(|registration| registration.name == name)
            .map(|registration| registration.kind)
    }
}

/// Construction parameters shared by every behaviour. Each behaviour reads the
/// fields it cares about.
#[derive(Clone, Debug, Default)]
pub struct BehaviourParams {
    /// Combat objective while attacking, or the expansion site.
    pub target: Option<Position>,
    pub program: Vec<ScriptStep>,
}

struct BehaviourRegistration {
    kind: BehaviourKind,
    name: &'static str,
    build: fn(BehaviourParams) -> MissionData,
}

fn build_combat(params: BehaviourParams) -> MissionData {
    MissionData::Combat(CombatBehaviour::new(params.target))
}

fn build_expansion(params: BehaviourParams) -> MissionData {
    MissionData::Expansion(ExpansionBehaviour::new(params.target))
}

fn build_scripted(params: BehaviourParams) -> MissionData {
    MissionData::Scripted(ScriptedBehaviour::new(params.program))
}

static BEHAVIOURS: &[BehaviourRegistration] = &[
    BehaviourRegistration {
        kind: BehaviourKind::Combat,
        name: "combat",
        build: build_combat,
    },
    BehaviourRegistration {
        kind: BehaviourKind::Expansion,
        name: "expansion",
        build: build_expansion,
    },
    BehaviourRegistration {
        kind: BehaviourKind::Scripted,
        name: "scripted",
        build: build_scripted,
    },
];

pub enum MissionData {
    Combat(CombatBehaviour),
    Expansion(ExpansionBehaviour),
    Scripted(ScriptedBehaviour),
}

impl MissionData {
    pub fn build(kind: BehaviourKind, params: BehaviourParams) -> Result<MissionData, String> {
        let registration = BEHAVIOURS
            .iter()
            .find(|registration| registration.kind == kind)
            .ok_or("Behaviour kind is not registered")?;

        Ok((registration.build)(params))
    }

    pub fn build_named(name: &str, params: BehaviourParams) -> Result<MissionData, String> {
        let kind = BehaviourKind::from_name(name).ok_or_else(|| format!("Unknown behaviour: {}", name))?;

        Self::build(kind, params)
    }

    pub fn as_behaviour(&self) -> &dyn SquadBehaviour {
        match self {
            MissionData::Combat(data) => data,
            MissionData::Expansion(data) => data,
            MissionData::Scripted(data) => data,
        }
    }

    pub fn as_behaviour_mut(&mut self) -> &mut dyn SquadBehaviour {
        match self {
            MissionData::Combat(data) => data,
            MissionData::Expansion(data) => data,
            MissionData::Scripted(data) => data,
        }
    }

    pub fn kind(&self) -> BehaviourKind {
        self.as_behaviour().kind()
    }
}
