use crate::constants::*;
use serde::{Deserialize, Serialize};

//
// Runtime tunables. The host hands in JSON; every section and key is optional
// and falls back to the defaults in `constants`.
//

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Features {
    pub awareness: AwarenessFeatures,
    pub combat: CombatFeatures,
    pub expansion: ExpansionFeatures,
    pub transport: TransportFeatures,
}

impl Features {
    pub fn from_json(data: &str) -> Result<Features, String> {
        serde_json::from_str(data).map_err(|err| format!("Failed to parse features: {}", err))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AwarenessFeatures {
    pub threat_interval: u32,
    pub rally_interval: u32,
    pub rally_margin: f32,
    pub sector_size: i32,
    pub sector_scan_budget: usize,
    pub sector_update_window: u32,
    pub visibility_floor: f32,
}

impl Default for AwarenessFeatures {
    fn default() -> Self {
        AwarenessFeatures {
            threat_interval: THREAT_INTERVAL,
            rally_interval: RALLY_INTERVAL,
            rally_margin: RALLY_MARGIN,
            sector_size: SECTOR_SIZE,
            sector_scan_budget: SECTOR_SCAN_BUDGET,
            sector_update_window: SECTOR_UPDATE_WINDOW,
            visibility_floor: VISIBILITY_FLOOR,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatFeatures {
    pub target_interval: u32,
    pub grab_interval: u32,
    pub min_gather_radius: f32,
    pub max_gather_radius: f32,
    pub gather_ratio: f32,
    pub reinforce_radius: f32,
    pub structure_engage_margin: f32,
}

impl Default for CombatFeatures {
    fn default() -> Self {
        CombatFeatures {
            target_interval: TARGET_INTERVAL,
            grab_interval: GRAB_INTERVAL,
            min_gather_radius: MIN_GATHER_RADIUS,
            max_gather_radius: MAX_GATHER_RADIUS,
            gather_ratio: GATHER_RATIO,
            reinforce_radius: REINFORCE_RADIUS,
            structure_engage_margin: STRUCTURE_ENGAGE_MARGIN,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpansionFeatures {
    pub deploy_range: f32,
}

impl Default for ExpansionFeatures {
    fn default() -> Self {
        ExpansionFeatures {
            deploy_range: EXPANSION_DEPLOY_RANGE,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportFeatures {
    pub load_timeout: u32,
}

impl Default for TransportFeatures {
    fn default() -> Self {
        TransportFeatures {
            load_timeout: TRANSPORT_LOAD_TIMEOUT,
        }
    }
}
