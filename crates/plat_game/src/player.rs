//! Player controller: per-frame velocity integration and the jump state machine.
//!
//! Horizontal motion is not accelerated: `set_velocity_x` assigns the target
//! speed directly each frame. Vertical motion accumulates gravity per frame
//! (not per second) and is clamped symmetrically. `grounded` is cleared by
//! every `update` and only re-asserted by a solid landing in the same frame.

use crate::characters::CharacterStats;
use crate::collision::Bounds;

/// Tunables shared by the player and the interaction rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsConfig {
    pub gravity: f32,
    pub max_vertical_speed: f32,
    pub move_speed: f32,
    pub jump_force: f32,
    pub friction: f32,
    pub water_jump_scale: f32,
    pub player_size: f32,
    pub nearby_range: i32,
    pub hazard_inset: f32,
    pub pickup_inset: f32,
    pub falling_block_delay_ms: u64,
    pub falling_block_speed: f32,
    pub enemy_speed: f32,
    pub orb_radius: f32,
    pub water_damping_x: f32,
    pub water_damping_y: f32,
    pub water_max_sink_speed: f32,
    pub water_surface_band: f32,
    pub water_bob_speed: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: 0.8,
            max_vertical_speed: 20.0,
            move_speed: 5.0,
            jump_force: -15.0,
            friction: 0.85,
            water_jump_scale: 0.7,
            player_size: 40.0,
            nearby_range: 3,
            hazard_inset: 5.0,
            pickup_inset: 10.0,
            falling_block_delay_ms: 1500,
            falling_block_speed: 10.0,
            enemy_speed: 2.0,
            orb_radius: 60.0,
            water_damping_x: 0.8,
            water_damping_y: 0.9,
            water_max_sink_speed: 3.0,
            water_surface_band: 12.0,
            water_bob_speed: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facing {
    Left,
    Right,
}

#[derive(Debug, Clone)]
pub struct Player {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub vx: f32,
    pub vy: f32,
    pub gravity: f32,
    pub max_vertical_speed: f32,
    pub jump_force: f32,
    pub move_speed: f32,
    /// Kept for tuning parity; the direct-assignment horizontal model ignores it.
    pub friction: f32,
    pub water_jump_scale: f32,
    pub alive: bool,
    pub grounded: bool,
    pub facing: Facing,
    pub in_water: bool,
    pub can_double_jump: bool,
    pub has_double_jumped: bool,
    pub stats: Option<CharacterStats>,
    base_move_speed: f32,
    base_jump_force: f32,
}

impl Player {
    pub fn new(x: f32, y: f32, stats: Option<CharacterStats>, config: PhysicsConfig) -> Self {
        let mut player = Self {
            x,
            y,
            width: config.player_size,
            height: config.player_size,
            vx: 0.0,
            vy: 0.0,
            gravity: config.gravity,
            max_vertical_speed: config.max_vertical_speed,
            jump_force: config.jump_force,
            move_speed: config.move_speed,
            friction: config.friction,
            water_jump_scale: config.water_jump_scale,
            alive: true,
            grounded: false,
            facing: Facing::Right,
            in_water: false,
            can_double_jump: false,
            has_double_jumped: false,
            stats: None,
            base_move_speed: config.move_speed,
            base_jump_force: config.jump_force,
        };
        player.set_stats(stats);
        player
    }

    /// Swap character stats mid-level. Position and velocity are untouched.
    pub fn set_stats(&mut self, stats: Option<CharacterStats>) {
        self.stats = stats;
        match stats {
            Some(stats) => {
                self.move_speed = 4.0 + stats.speed * 0.5;
                self.jump_force = -13.0 - stats.jump * 0.5;
            }
            None => {
                self.move_speed = self.base_move_speed;
                self.jump_force = self.base_jump_force;
            }
        }
    }

    pub fn update(&mut self) {
        if !self.alive {
            return;
        }

        self.vy += self.gravity;
        self.vy = self
            .vy
            .clamp(-self.max_vertical_speed, self.max_vertical_speed);

        self.x += self.vx;
        self.y += self.vy;

        self.grounded = false;
    }

    pub fn set_velocity_x(&mut self, vx: f32) {
        if !self.alive {
            return;
        }
        self.vx = vx;
        if vx < 0.0 {
            self.facing = Facing::Left;
        } else if vx > 0.0 {
            self.facing = Facing::Right;
        }
    }

    pub fn try_jump(&mut self) -> bool {
        if !self.alive {
            return false;
        }
        if self.grounded {
            self.vy = self.jump_impulse();
            self.grounded = false;
            self.has_double_jumped = false;
            return true;
        }
        if self.can_double_jump && !self.has_double_jumped {
            self.vy = self.jump_impulse();
            self.has_double_jumped = true;
            return true;
        }
        false
    }

    fn jump_impulse(&self) -> f32 {
        if self.in_water {
            self.jump_force * self.water_jump_scale
        } else {
            self.jump_force
        }
    }

    pub fn set_grounded(&mut self) {
        self.grounded = true;
        self.vy = 0.0;
        self.has_double_jumped = false;
    }

    pub fn die(&mut self) {
        self.alive = false;
        self.vx = 0.0;
        self.vy = 0.0;
    }

    /// Respawn at `(x, y)` keeping the current character stats.
    pub fn reset(&mut self, x: f32, y: f32) {
        self.x = x;
        self.y = y;
        self.vx = 0.0;
        self.vy = 0.0;
        self.alive = true;
        self.grounded = false;
        self.in_water = false;
        self.can_double_jump = false;
        self.has_double_jumped = false;
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::from_rect(self.x, self.y, self.width, self.height)
    }

}
