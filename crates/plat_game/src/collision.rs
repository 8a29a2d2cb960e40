//! AABB primitives: the overlap test every check shares, and the
//! penetration-depth resolver used for anything that blocks movement.
//!
//! Resolution is **minimum-penetration**: the four overlap depths are compared
//! and the player is pushed out along the shallowest one. Vertical resolution
//! carries a velocity guard so a fast-moving player is never snapped the wrong
//! way (landing requires `vy > 0`, head bumps require `vy < 0`).
//!
//! Tie-break when depths are equal is evaluation order: top, bottom, left,
//! right. Authored levels depend on this order at block corners, so it is kept
//! exactly even though near-45° corner hits can prefer a vertical snap.

use crate::player::Player;

/// Axis-aligned rectangle in world units, y growing downward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

impl Bounds {
    pub fn from_rect(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            left: x,
            right: x + width,
            top: y,
            bottom: y + height,
        }
    }

    pub fn center_x(&self) -> f32 {
        (self.left + self.right) / 2.0
    }

    pub fn center_y(&self) -> f32 {
        (self.top + self.bottom) / 2.0
    }

    pub fn center(&self) -> glam::Vec2 {
        glam::Vec2::new(self.center_x(), self.center_y())
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    /// Closed-interval point test, for mouse picking.
    pub fn contains_point(&self, point: glam::Vec2) -> bool {
        point.x >= self.left
            && point.x <= self.right
            && point.y >= self.top
            && point.y <= self.bottom
    }

    /// Shrink every side by `amount`. Used for forgiving hazard/pickup hitboxes.
    pub fn inset(&self, amount: f32) -> Self {
        Self {
            left: self.left + amount,
            right: self.right - amount,
            top: self.top + amount,
            bottom: self.bottom - amount,
        }
    }
}

/// Open-interval overlap: touching edges do not collide.
pub fn overlaps(a: &Bounds, b: &Bounds) -> bool {
    a.left < b.right && a.right > b.left && a.top < b.bottom && a.bottom > b.top
}

/// Which side of the block the player was pushed out of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedSide {
    Top,
    Bottom,
    Left,
    Right,
}

/// Push `player` out of `block`. Returns the side used, or `None` when the
/// boxes do not overlap or the guarded vertical axis declined to act.
pub fn resolve_solid(player: &mut Player, block: &Bounds) -> Option<ResolvedSide> {
    let p = player.bounds();
    if !overlaps(&p, block) {
        return None;
    }

    let overlap_left = p.right - block.left;
    let overlap_right = block.right - p.left;
    let overlap_top = p.bottom - block.top;
    let overlap_bottom = block.bottom - p.top;
    let min_overlap = overlap_left
        .min(overlap_right)
        .min(overlap_top)
        .min(overlap_bottom);

    if min_overlap == overlap_top && player.vy > 0.0 {
        player.y = block.top - player.height;
        player.set_grounded();
        Some(ResolvedSide::Top)
    } else if min_overlap == overlap_bottom && player.vy < 0.0 {
        player.y = block.bottom;
        player.vy = 0.0;
        Some(ResolvedSide::Bottom)
    } else if min_overlap == overlap_left {
        player.x = block.left - player.width;
        player.vx = 0.0;
        Some(ResolvedSide::Left)
    } else if min_overlap == overlap_right {
        player.x = block.right;
        player.vx = 0.0;
        Some(ResolvedSide::Right)
    } else {
        None
    }
}

/// Hazard overlap on an inset hitbox.
pub fn touches_inset(player: &Bounds, target: &Bounds, inset: f32) -> bool {
    overlaps(player, &target.inset(inset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::PhysicsConfig;

    fn player_at(x: f32, y: f32, vx: f32, vy: f32) -> Player {
        let mut player = Player::new(x, y, None, PhysicsConfig::default());
        player.vx = vx;
        player.vy = vy;
        player
    }

    fn cell(x: f32, y: f32) -> Bounds {
        Bounds::from_rect(x, y, 40.0, 40.0)
    }

    #[test]
    fn touching_edges_do_not_overlap() {
        let a = cell(0.0, 0.0);
        let b = cell(40.0, 0.0);
        assert!(!overlaps(&a, &b));
        let c = cell(0.0, 40.0);
        assert!(!overlaps(&a, &c));
        assert!(overlaps(&a, &cell(39.0, 39.0)));
    }

    #[test]
    fn inset_shrinks_each_side() {
        let hit = cell(100.0, 100.0).inset(5.0);
        assert_eq!(hit, Bounds::from_rect(105.0, 105.0, 30.0, 30.0));
    }

    #[test]
    fn no_overlap_is_no_op() {
        let mut player = player_at(0.0, 0.0, 3.0, 4.0);
        assert_eq!(resolve_solid(&mut player, &cell(100.0, 100.0)), None);
        assert_eq!((player.x, player.y, player.vx, player.vy), (0.0, 0.0, 3.0, 4.0));
    }

    #[test]
    fn landing_from_above_grounds_player() {
        // Player bottom at 443, block top at 440: top penetration 3 is smallest.
        let mut player = player_at(100.0, 403.0, 0.0, 6.0);
        player.has_double_jumped = true;
        let block = cell(100.0, 440.0);
        assert_eq!(resolve_solid(&mut player, &block), Some(ResolvedSide::Top));
        assert_eq!(player.y, 400.0);
        assert_eq!(player.vy, 0.0);
        assert!(player.grounded);
        assert!(!player.has_double_jumped);
        assert!(!overlaps(&player.bounds(), &block));
    }

    #[test]
    fn head_bump_zeroes_upward_velocity() {
        let mut player = player_at(100.0, 78.0, 0.0, -8.0);
        let block = cell(100.0, 40.0);
        assert_eq!(resolve_solid(&mut player, &block), Some(ResolvedSide::Bottom));
        assert_eq!(player.y, 80.0);
        assert_eq!(player.vy, 0.0);
        assert!(!overlaps(&player.bounds(), &block));
    }

    #[test]
    fn side_hits_push_horizontally() {
        let mut from_left = player_at(62.0, 200.0, 5.0, 0.0);
        let wall = cell(100.0, 200.0);
        assert_eq!(resolve_solid(&mut from_left, &wall), Some(ResolvedSide::Left));
        assert_eq!(from_left.x, 60.0);
        assert_eq!(from_left.vx, 0.0);

        let mut from_right = player_at(138.0, 200.0, -5.0, 0.0);
        assert_eq!(resolve_solid(&mut from_right, &wall), Some(ResolvedSide::Right));
        assert_eq!(from_right.x, 140.0);
        assert!(!overlaps(&from_right.bounds(), &wall));
    }

    #[test]
    fn top_penetration_without_downward_velocity_falls_through_to_sides() {
        // Top is shallowest but the player is rising: guard skips the snap,
        // next candidate in order is evaluated against its own depth.
        let mut player = player_at(95.0, 403.0, 0.0, -2.0);
        let block = cell(100.0, 440.0);
        let side = resolve_solid(&mut player, &block);
        assert_eq!(side, None);
        assert_eq!(player.y, 403.0);
    }

    #[test]
    fn equal_depths_prefer_top_over_left() {
        // Corner overlap of 4 on both the top and left axes.
        let mut player = player_at(64.0, 404.0, 3.0, 3.0);
        let block = cell(100.0, 440.0);
        assert_eq!(resolve_solid(&mut player, &block), Some(ResolvedSide::Top));
        assert_eq!(player.y, 400.0);
        assert_eq!(player.x, 64.0);
    }

    #[test]
    fn resolution_never_leaves_overlap_when_an_axis_applies() {
        let block = cell(200.0, 200.0);
        for dx in [-30.0_f32, -10.0, 0.0, 10.0, 30.0] {
            for dy in [-30.0_f32, -10.0, 10.0, 30.0] {
                let mut player = player_at(200.0 + dx, 200.0 + dy, dx.signum(), dy.signum());
                if resolve_solid(&mut player, &block).is_some() {
                    assert!(
                        !overlaps(&player.bounds(), &block),
                        "still overlapping for offset ({dx}, {dy})"
                    );
                }
            }
        }
    }
}
