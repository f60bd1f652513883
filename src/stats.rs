use serde::Serialize;

/// Summary of one engine tick, for the host's diagnostics.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TickStats {
    pub tick: u32,
    pub attacking: bool,
    pub hostiles_indexed: usize,
    pub visibility: f32,
    pub sector_update_ratio: f32,
    pub missions: usize,
    pub squads_alive: usize,
    pub missions_disbanded: usize,
    pub missions_failed: usize,
    pub orders_submitted: usize,
    pub agents_ordered: usize,
}

impl TickStats {
    pub fn to_json(&self) -> Result<String, String> {
        serde_json::to_string(self).map_err(|err| format!("Failed to serialize tick stats: {}", err))
    }
}
