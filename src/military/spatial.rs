use crate::world::*;

const NODE_CAPACITY: usize = 8;
const MAX_DEPTH: u32 = 8;

#[derive(Copy, Clone, Debug, PartialEq)]
struct Bounds {
    min: Position,
    max: Position,
}

impl Bounds {
    fn contains(&self, point: Position) -> bool {
        point.x >= self.min.x && point.x < self.max.x && point.y >= self.min.y && point.y < self.max.y
    }

    fn intersects_square(&self, center: Position, half_extent: f32) -> bool {
        center.x + half_extent >= self.min.x
            && center.x - half_extent <= self.max.x
            && center.y + half_extent >= self.min.y
            && center.y - half_extent <= self.max.y
    }

    fn quadrants(&self) -> [Bounds; 4] {
        let mid = Position::new((self.min.x + self.max.x) * 0.5, (self.min.y + self.max.y) * 0.5);

        [
            Bounds { min: self.min, max: mid },
            Bounds {
                min: Position::new(mid.x, self.min.y),
                max: Position::new(self.max.x, mid.y),
            },
            Bounds {
                min: Position::new(self.min.x, mid.y),
                max: Position::new(mid.x, self.max.y),
            },
            Bounds { min: mid, max: self.max },
        ]
    }
}

struct QuadNode {
    bounds: Bounds,
    depth: u32,
    entries: Vec<(Position, AgentId)>,
    children: Option<Box<[QuadNode; 4]>>,
}

impl QuadNode {
    fn new(bounds: Bounds, depth: u32) -> QuadNode {
        QuadNode {
            bounds,
            depth,
            entries: Vec::new(),
            children: None,
        }
    }

    fn insert(&mut self, point: Position, id: AgentId) {
        if let Some(children) = self.children.as_mut() {
            if let Some(child) = children.iter_mut().find(|c| c.bounds.contains(point)) {
                child.insert(point, id);
                return;
            }
        }

        self.entries.push((point, id));

        if self.children.is_none() && self.entries.len() > NODE_CAPACITY && self.depth < MAX_DEPTH {
            self.split();
        }
    }

    fn split(&mut self) {
        let [a, b, c, d] = self.bounds.quadrants();
        let depth = self.depth + 1;

        let mut children = Box::new([
            QuadNode::new(a, depth),
            QuadNode::new(b, depth),
            QuadNode::new(c, depth),
            QuadNode::new(d, depth),
        ]);

        let mut retained = Vec::new();

        for (point, id) in self.entries.drain(..) {
            match children.iter_mut().find(|c| c.bounds.contains(point)) {
                Some(child) => child.insert(point, id),
                None => retained.push((point, id)),
            }
        }

        self.entries = retained;
        self.children = Some(children);
    }

    fn collect_candidates(&self, center: Position, radius: f32, output: &mut Vec<(Position, AgentId)>) {
        if !self.bounds.intersects_square(center, radius) {
            return;
        }

        output.extend(
            self.entries
                .iter()
                .filter(|(point, _)| (point.x - center.x).abs() <= radius && (point.y - center.y).abs() <= radius)
                .copied(),
        );

        if let Some(children) = self.children.as_ref() {
            for child in children.iter() {
                child.collect_candidates(center, radius, output);
            }
        }
    }
}

/// Quadtree over hostile positions, rebuilt wholesale every tick.
///
/// Node pruning works on axis-aligned squares, so `query_candidates` may return
/// points outside the query circle. `query_radius` applies the exact distance
/// filter and is what consumers should use.
pub struct SpatialIndex {
    root: QuadNode,
    /// Points inserted outside the map bounds.
    outside: Vec<(Position, AgentId)>,
    len: usize,
}

impl SpatialIndex {
    pub fn new(width: f32, height: f32) -> SpatialIndex {
        let bounds = Bounds {
            min: Position::new(0.0, 0.0),
            max: Position::new(width.max(1.0), height.max(1.0)),
        };

        SpatialIndex {
            root: QuadNode::new(bounds, 0),
            outside: Vec::new(),
            len: 0,
        }
    }

    pub fn clear(&mut self) {
        self.root = QuadNode::new(self.root.bounds, 0);
        self.outside.clear();
        self.len = 0;
    }

    pub fn insert(&mut self, point: Position, id: AgentId) {
        if self.root.bounds.contains(point) {
            self.root.insert(point, id);
        } else {
            self.outside.push((point, id));
        }

        self.len += 1;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bounding-square candidate superset for a radius query.
    pub fn query_candidates(&self, center: Position, radius: f32) -> Vec<(Position, AgentId)> {
        let mut output = Vec::new();

        if radius < 0.0 || !radius.is_finite() {
            return output;
        }

        self.root.collect_candidates(center, radius, &mut output);

        output.extend(
            self.outside
                .iter()
                .filter(|(point, _)| (point.x - center.x).abs() <= radius && (point.y - center.y).abs() <= radius)
                .copied(),
        );

        output
    }

    /// Entries whose Euclidean distance to `center` is at most `radius`.
    pub fn query_radius(&self, center: Position, radius: f32) -> Vec<(Position, AgentId)> {
        let radius_sq = radius * radius;

        self.query_candidates(center, radius)
            .into_iter()
            .filter(|(point, _)| point.distance_squared_to(center) <= radius_sq)
            .collect()
    }

    pub fn rebuild<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (Position, AgentId)>,
    {
        self.clear();

        for (point, id) in entries {
            self.insert(point, id);
        }
    }
}
