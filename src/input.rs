//! Pointer geometry: hit regions and mapping playground points into sprite space.

use glam::Vec2;

use crate::activity::InputKind;
use crate::motion::Facing;

/// A pointer event in playground coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down(Vec2),
    Move(Vec2),
    Up(Vec2),
    /// The gesture was interrupted by the platform; treated exactly like a release.
    Cancel,
}

impl PointerEvent {
    /// The activity counter this event feeds, if any.
    pub fn input_kind(&self) -> Option<InputKind> {
        match self {
            PointerEvent::Down(_) => Some(InputKind::MouseDown),
            PointerEvent::Move(_) => Some(InputKind::MouseMove),
            PointerEvent::Up(_) | PointerEvent::Cancel => None,
        }
    }
}

/// An axis-aligned rectangle in playground coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub origin: Vec2,
    pub size: Vec2,
}

impl Region {
    pub fn new(origin: Vec2, size: Vec2) -> Self {
        Self {
            origin,
            size: size.max(Vec2::ZERO),
        }
    }

    pub fn square(origin: Vec2, edge: f32) -> Self {
        Self::new(origin, Vec2::splat(edge))
    }

    /// Half-open containment: the far edges are outside.
    pub fn contains(&self, point: Vec2) -> bool {
        let local = point - self.origin;
        local.x >= 0.0 && local.y >= 0.0 && local.x < self.size.x && local.y < self.size.y
    }

    /// Normalized `(u, v)` of `point` inside the region, mirrored horizontally when the sprite
    /// faces left. `None` when the point is outside or the region is empty.
    pub fn sprite_uv(&self, point: Vec2, facing: Facing) -> Option<Vec2> {
        if self.size.x <= 0.0 || self.size.y <= 0.0 || !self.contains(point) {
            return None;
        }
        let local = point - self.origin;
        let x = match facing {
            Facing::Left => self.size.x - local.x,
            Facing::Right => local.x,
        };
        Some(Vec2::new(x / self.size.x, local.y / self.size.y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uv_mirrors_when_facing_left() {
        let region = Region::square(Vec2::new(100.0, 100.0), 100.0);
        let point = Vec2::new(125.0, 150.0);
        assert_eq!(region.sprite_uv(point, Facing::Right), Some(Vec2::new(0.25, 0.5)));
        assert_eq!(region.sprite_uv(point, Facing::Left), Some(Vec2::new(0.75, 0.5)));
        assert_eq!(region.sprite_uv(Vec2::new(200.0, 150.0), Facing::Right), None);
    }
}
