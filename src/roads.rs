use serde::{Deserialize, Serialize};

use crate::world::Vec2;

/// How far from a segment's centerline an agent still counts as "on the
/// road".
const ROAD_SNAP_DISTANCE: f32 = 1.5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoadSegment {
    pub a: Vec2,
    pub b: Vec2,
    /// 0 = dirt track, 1 = paved highway.
    pub quality: f32,
}

impl RoadSegment {
    fn distance_to(&self, point: Vec2) -> f32 {
        let abx = self.b.x - self.a.x;
        let aby = self.b.y - self.a.y;
        let length_sq = abx * abx + aby * aby;
        if length_sq == 0.0 {
            return self.a.distance(point);
        }
        let t = ((point.x - self.a.x) * abx + (point.y - self.a.y) * aby) / length_sq;
        let t = t.clamp(0.0, 1.0);
        let closest = Vec2::new(self.a.x + abx * t, self.a.y + aby * t);
        closest.distance(point)
    }
}

/// Mapped roads between settlements. Travel off the network is always
/// possible at base speed; a nearby road scales speed by its quality.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoadNetwork {
    segments: Vec<RoadSegment>,
}

impl RoadNetwork {
    pub fn add_segment(&mut self, a: Vec2, b: Vec2, quality: f32) {
        self.segments.push(RoadSegment {
            a,
            b,
            quality: quality.clamp(0.0, 1.0),
        });
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Speed multiplier at a position: 1.0 off-road, up to 1.5 on a
    /// top-quality road. Best nearby segment wins.
    pub fn speed_multiplier(&self, position: Vec2) -> f32 {
        let mut best = 1.0f32;
        for segment in &self.segments {
            if segment.distance_to(position) <= ROAD_SNAP_DISTANCE {
                best = best.max(1.0 + segment.quality * 0.5);
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn off_road_is_base_speed() {
        let roads = RoadNetwork::default();
        assert_eq!(roads.speed_multiplier(Vec2::new(10.0, 10.0)), 1.0);
    }

    #[test]
    fn road_boosts_speed_near_segment() {
        let mut roads = RoadNetwork::default();
        roads.add_segment(Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0), 1.0);
        assert_eq!(roads.speed_multiplier(Vec2::new(5.0, 0.5)), 1.5);
        assert_eq!(roads.speed_multiplier(Vec2::new(5.0, 8.0)), 1.0);
    }

    #[test]
    fn best_of_overlapping_segments_wins() {
        let mut roads = RoadNetwork::default();
        roads.add_segment(Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0), 0.2);
        roads.add_segment(Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0), 0.8);
        let boost = roads.speed_multiplier(Vec2::new(5.0, 0.0));
        assert!((boost - 1.4).abs() < 1e-6);
    }
}
