use crate::world::*;

/// Fixed-size map partition with the result of its most recent visibility scan.
#[derive(Clone, Debug)]
pub struct Sector {
    pub origin: Tile,
    pub size: i32,
    /// Tick the sector was last scanned. `None` until the first scan.
    pub last_scanned: Option<u32>,
    /// Fraction of the sector's existing tiles that were visible at the last scan.
    pub visibility: f32,
}

impl Sector {
    pub fn contains(&self, tile: Tile) -> bool {
        tile.x >= self.origin.x && tile.x < self.origin.x + self.size && tile.y >= self.origin.y && tile.y < self.origin.y + self.size
    }

    fn scan(&mut self, world: &dyn WorldView, tick: u32) {
        let mut existing = 0u32;
        let mut visible = 0u32;

        for y in self.origin.y..self.origin.y + self.size {
            for x in self.origin.x..self.origin.x + self.size {
                let tile = Tile::new(x, y);

                if !world.tile_exists(tile) {
                    continue;
                }

                existing += 1;

                if world.is_tile_visible(tile) {
                    visible += 1;
                }
            }
        }

        self.visibility = if existing > 0 { visible as f32 / existing as f32 } else { 0.0 };
        self.last_scanned = Some(tick);
    }
}

/// Visibility accounting over the static sector grid. Only a bounded number of
/// sectors are rescanned per tick, cycling through the grid from where the last
/// tick stopped, so cost is independent of map size.
pub struct SectorCache {
    sector_size: i32,
    columns: i32,
    sectors: Vec<Sector>,
    /// Next sector to rescan. The sector under the cursor is always the stalest.
    cursor: usize,
    visibility_sum: f32,
}

impl SectorCache {
    pub fn new(map_width: i32, map_height: i32, sector_size: i32) -> SectorCache {
        let sector_size = sector_size.max(1);
        let columns = (map_width.max(0) + sector_size - 1) / sector_size;
        let rows = (map_height.max(0) + sector_size - 1) / sector_size;

        let sectors = (0..rows)
            .flat_map(|row| (0..columns).map(move |column| (row, column)))
            .map(|(row, column)| Sector {
                origin: Tile::new(column * sector_size, row * sector_size),
                size: sector_size,
                last_scanned: None,
                visibility: 0.0,
            })
            .collect();

        SectorCache {
            sector_size,
            columns,
            sectors,
            cursor: 0,
            visibility_sum: 0.0,
        }
    }

    pub fn from_world(world: &dyn WorldView, sector_size: i32) -> SectorCache {
        let (width, height) = world.map_size();

        SectorCache::new(width, height, sector_size)
    }

    /// Rescan up to `budget` sectors, least recently scanned first (never-scanned before all others).
    pub fn update(&mut self, world: &dyn WorldView, budget: usize) -> usize {
        let tick = world.tick();
        let count = budget.min(self.sectors.len());

        for _ in 0..count {
            let sector = &mut self.sectors[self.cursor];
            let previous = sector.visibility;

            sector.scan(world, tick);

            self.visibility_sum += sector.visibility - previous;
            self.cursor = (self.cursor + 1) % self.sectors.len();
        }

        count
    }

    pub fn sectors(&self) -> &[Sector] {
        &self.sectors
    }

    pub fn sector_at(&self, tile: Tile) -> Option<&Sector> {
        if tile.x < 0 || tile.y < 0 {
            return None;
        }

        let column = tile.x / self.sector_size;
        let row = tile.y / self.sector_size;

        if column >= self.columns {
            return None;
        }

        self.sectors.get((row * self.columns + column) as usize)
    }

    /// Mean visibility across every sector. Zero for an empty map.
    pub fn visibility_fraction(&self) -> f32 {
        if self.sectors.is_empty() {
            return 0.0;
        }

        (self.visibility_sum / self.sectors.len() as f32).clamp(0.0, 1.0)
    }

    /// Fraction of sectors scanned within the trailing `window` ticks.
    pub fn update_ratio(&self, current_tick: u32, window: u32) -> f32 {
        if self.sectors.is_empty() {
            return 0.0;
        }

        let recent = self
            .sectors
            .iter()
            .filter(|s| s.last_scanned.map(|t| current_tick.saturating_sub(t) <= window).unwrap_or(false))
            .count();

        recent as f32 / self.sectors.len() as f32
    }
}
