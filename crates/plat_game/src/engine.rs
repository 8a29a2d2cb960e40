//! Play-mode simulation loop.
//!
//! `Engine` owns everything play mode needs and is driven by one external
//! tick: `handle_input` → `update` → `draw`, in that order, once per frame.
//! The per-frame physics and interaction rules live in the free function
//! `step`, which only touches an explicit `SimContext` (level, player, game
//! state); the engine adds input, the character selector, timing and the
//! render hand-off around it.
//!
//! Game states run `Ready → Playing → {Won | Lost}`. `Won`/`Lost` are
//! terminal until `reset_attempt`, which returns straight to `Playing`.

use std::time::Duration;

use plat_core::input::InputState;
use plat_core::time::Clock;

use crate::characters::{Character, CharacterRoster};
use crate::collision::{overlaps, resolve_solid, touches_inset, Bounds};
use crate::controls::{ControlState, FrameActions};
use crate::draw::{
    draw_level, overlay_visual, player_visual, selector_hit_index, selector_layout,
    selector_visual, DrawCommand, DrawSink, HudVisual,
};
use crate::entity::{Entity, EntityKind};
use crate::level::Level;
use crate::player::{PhysicsConfig, Player};
use crate::spatial::NearbyFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameState {
    Ready,
    Playing,
    Won,
    Lost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeathCause {
    FellOffWorld,
    Spike,
    Lava,
    Flame,
    Enemy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Continue,
    Died(DeathCause),
    Won,
}

/// The mutable state one simulation step reads and writes.
#[derive(Debug, Clone)]
pub struct SimContext {
    pub level: Level,
    pub player: Player,
    pub state: GameState,
    pub config: PhysicsConfig,
    /// Id the character gates test against.
    pub character_id: String,
    pub on_switch_platform: bool,
}

impl SimContext {
    pub fn new(level: Level, player: Player, config: PhysicsConfig, character_id: &str) -> Self {
        Self {
            level,
            player,
            state: GameState::Playing,
            config,
            character_id: character_id.to_string(),
            on_switch_platform: false,
        }
    }

    fn kill(&mut self, cause: DeathCause) -> StepOutcome {
        self.player.die();
        self.state = GameState::Lost;
        StepOutcome::Died(cause)
    }
}

/// One frame of physics and interaction. No-op unless `Playing`.
pub fn step(ctx: &mut SimContext, now: Duration) -> StepOutcome {
    if ctx.state != GameState::Playing || !ctx.player.alive {
        return StepOutcome::Continue;
    }
    let config = ctx.config;

    ctx.player.update();
    if ctx.player.y > ctx.level.height() {
        return ctx.kill(DeathCause::FellOffWorld);
    }

    ctx.level.update_mechanisms(now, &config);

    resolve_solids(ctx, now);

    if let Some(cause) = hazard_hit(ctx) {
        return ctx.kill(cause);
    }

    apply_water(ctx);
    collect_pickups(ctx);
    resolve_gates(ctx);
    update_trigger_zones(ctx);

    if let Some(door) = &ctx.level.door {
        if overlaps(&ctx.player.bounds(), &door.bounds()) {
            ctx.state = GameState::Won;
            return StepOutcome::Won;
        }
    }
    StepOutcome::Continue
}

fn is_standing_on(player: &Bounds, block: &Bounds) -> bool {
    player.bottom <= block.top + 5.0
        && player.bottom > block.top - 5.0
        && player.right > block.left
        && player.left < block.right
}

/// Blocks and not-yet-falling falling blocks near the player. A falling block
/// the player stands on starts its countdown.
fn resolve_solids(ctx: &mut SimContext, now: Duration) {
    let filter = NearbyFilter::around(
        &ctx.player.bounds(),
        ctx.level.grid_size,
        ctx.config.nearby_range,
    );
    for index in filter.indices(&ctx.level.objects, |e| (e.x, e.y)) {
        let block = &mut ctx.level.objects[index];
        let bounds = block.bounds();
        match &mut block.kind {
            EntityKind::Block => {
                resolve_solid(&mut ctx.player, &bounds);
            }
            EntityKind::FallingBlock(falling) if !falling.falling => {
                resolve_solid(&mut ctx.player, &bounds);
                if is_standing_on(&ctx.player.bounds(), &bounds) && falling.trigger(now) {
                    log::debug!("Falling block at ({}, {}) triggered", bounds.left, bounds.top);
                }
            }
            _ => {}
        }
    }
}

fn hazard_hit(ctx: &SimContext) -> Option<DeathCause> {
    let player = ctx.player.bounds();
    let config = &ctx.config;
    let filter = NearbyFilter::around(&player, ctx.level.grid_size, config.nearby_range);

    for index in filter.indices(&ctx.level.objects, |e| (e.x, e.y)) {
        let entity = &ctx.level.objects[index];
        if matches!(entity.kind, EntityKind::Spike)
            && touches_inset(&player, &entity.bounds(), config.hazard_inset)
        {
            return Some(DeathCause::Spike);
        }
    }
    for entity in &ctx.level.objects {
        match &entity.kind {
            EntityKind::Lava if touches_inset(&player, &entity.bounds(), config.pickup_inset) => {
                return Some(DeathCause::Lava);
            }
            EntityKind::Flamethrower(_) => {
                let burned = entity.active_flames().is_some_and(|flames| {
                    flames
                        .iter()
                        .any(|flame| touches_inset(&player, flame, config.hazard_inset))
                });
                if burned {
                    return Some(DeathCause::Flame);
                }
            }
            _ => {}
        }
    }
    ctx.level
        .enemies
        .iter()
        .any(|enemy| touches_inset(&player, &enemy.bounds(), config.pickup_inset))
        .then_some(DeathCause::Enemy)
}

/// Dampen, clamp sinking, then bob at the surface. Sets `in_water` for the
/// next frame's jump.
fn apply_water(ctx: &mut SimContext) {
    let config = ctx.config;
    let player_bounds = ctx.player.bounds();
    let water = ctx.level.objects.iter().find(|e| {
        matches!(e.kind, EntityKind::Water)
            && touches_inset(&player_bounds, &e.bounds(), config.pickup_inset)
    });
    let Some(water) = water else {
        ctx.player.in_water = false;
        return;
    };

    let surface = water_surface(&ctx.level, water);
    let player = &mut ctx.player;
    player.in_water = true;
    player.vx *= config.water_damping_x;
    player.vy *= config.water_damping_y;
    player.vy = player.vy.min(config.water_max_sink_speed);
    let near_surface = (player_bounds.center_y() - surface).abs() <= config.water_surface_band;
    if near_surface && player.vy >= 0.0 {
        player.vy = -config.water_bob_speed;
    }
}

/// Top of the water column containing `water`.
fn water_surface(level: &Level, water: &Entity) -> f32 {
    let mut top = water.y;
    while level
        .objects
        .iter()
        .any(|e| matches!(e.kind, EntityKind::Water) && e.x == water.x && e.y == top - e.height)
    {
        top -= water.height;
    }
    top
}

fn collect_pickups(ctx: &mut SimContext) {
    let player = ctx.player.bounds();
    let inset = ctx.config.pickup_inset;
    for index in 0..ctx.level.coins.len() {
        if touches_inset(&player, &ctx.level.coins[index].bounds(), inset) {
            ctx.level.collect_coin(index);
        }
    }
    for index in 0..ctx.level.keys.len() {
        if touches_inset(&player, &ctx.level.keys[index].bounds(), inset) {
            ctx.level.collect_key(index);
        }
    }
}

/// Locked doors block unless a key opens them on this touch; character gates
/// block everyone but the required character.
fn resolve_gates(ctx: &mut SimContext) {
    for index in 0..ctx.level.locked_doors.len() {
        let door = &ctx.level.locked_doors[index];
        let bounds = door.bounds();
        let locked = matches!(&door.kind, EntityKind::LockedDoor(d) if d.locked);
        if locked && overlaps(&ctx.player.bounds(), &bounds) && !ctx.level.unlock_door(index) {
            resolve_solid(&mut ctx.player, &bounds);
        }
    }
    for gate in &ctx.level.objects {
        let EntityKind::CharacterGate(rule) = &gate.kind else {
            continue;
        };
        let bounds = gate.bounds();
        if !rule.can_pass(&ctx.character_id) && overlaps(&ctx.player.bounds(), &bounds) {
            resolve_solid(&mut ctx.player, &bounds);
        }
    }
}

/// Switch platforms (full box) and double-jump orbs (centre distance).
fn update_trigger_zones(ctx: &mut SimContext) {
    let player = ctx.player.bounds();
    let center = player.center();
    let mut on_switch = false;
    let mut near_orb = false;
    for entity in &ctx.level.objects {
        match entity.kind {
            EntityKind::SwitchPlatform => on_switch |= overlaps(&player, &entity.bounds()),
            EntityKind::DoubleJumpOrb => {
                near_orb |= center.distance(entity.bounds().center()) <= ctx.config.orb_radius
            }
            _ => {}
        }
    }
    ctx.on_switch_platform = on_switch;
    ctx.player.can_double_jump = near_orb;
}

pub struct Engine {
    ctx: SimContext,
    roster: CharacterRoster,
    character_index: usize,
    controls: ControlState,
    clock: Box<dyn Clock>,
    selector_open: bool,
    start_time: Option<Duration>,
    end_time: Option<Duration>,
    exit_requested: bool,
    spawn: (f32, f32),
}

impl Engine {
    /// Enter play mode. An invalid level or an empty roster never starts.
    pub fn new(
        level: Level,
        roster: CharacterRoster,
        initial_character: &str,
        clock: Box<dyn Clock>,
    ) -> Result<Self, String> {
        level.validate().into_result()?;
        let spawn = level
            .spawn
            .as_ref()
            .map(|s| (s.x, s.y))
            .ok_or_else(|| "Level validation failed: missing spawn point".to_string())?;
        if roster.is_empty() {
            return Err("Cannot start play mode with an empty character roster".to_string());
        }
        let character_index = roster.index_of(initial_character).unwrap_or_else(|| {
            log::warn!("Unknown character '{initial_character}', using the first roster entry");
            0
        });
        let character = &roster.characters[character_index];
        let config = PhysicsConfig::default();
        let player = Player::new(spawn.0, spawn.1, Some(character.stats), config);
        let ctx = SimContext {
            state: GameState::Ready,
            ..SimContext::new(level, player, config, &character.id)
        };
        log::info!(
            "Play mode ready: '{}' as {} ({} entities)",
            ctx.level.name,
            character.name,
            ctx.level.entity_count()
        );
        Ok(Self {
            ctx,
            roster,
            character_index,
            controls: ControlState::default(),
            clock,
            selector_open: false,
            start_time: None,
            end_time: None,
            exit_requested: false,
            spawn,
        })
    }

    /// One frame: input, simulation, then render hand-off.
    pub fn tick(&mut self, input: &InputState, sink: &mut dyn DrawSink) {
        let actions = self.controls.poll(input);
        self.handle_input(&actions);
        self.update();
        self.draw(sink);
    }

    pub fn handle_input(&mut self, actions: &FrameActions) {
        let now = self.clock.now();
        if actions.exit.just_pressed {
            self.exit_requested = true;
        }
        if actions.restart.just_pressed && self.ctx.state != GameState::Ready {
            self.reset_attempt();
            return;
        }

        match self.ctx.state {
            GameState::Ready => {
                if actions.jump.pressed {
                    self.ctx.state = GameState::Playing;
                    self.start_time = Some(now);
                    log::info!("Attempt started");
                }
            }
            GameState::Playing if self.ctx.player.alive => self.handle_play_input(actions),
            _ => {}
        }
    }

    fn handle_play_input(&mut self, actions: &FrameActions) {
        let player = &mut self.ctx.player;
        if self.selector_open {
            player.set_velocity_x(0.0);
        } else {
            player.set_velocity_x(actions.move_x * player.move_speed);
            if actions.jump.just_pressed {
                player.try_jump();
            }
        }

        if actions.interact.just_pressed && self.ctx.on_switch_platform {
            self.selector_open = !self.selector_open;
        }
        if !self.selector_open {
            return;
        }

        if let Some(index) = actions.choose {
            self.set_character(index);
        } else if actions.select.just_pressed {
            let layout = selector_layout(&self.ctx.player.bounds(), self.roster.len());
            if let Some(index) = selector_hit_index(&layout, actions.mouse_position) {
                self.set_character(index);
            }
        }
    }

    /// Swap stats mid-level; position and velocity are kept. Closes the selector.
    pub fn set_character(&mut self, index: usize) -> bool {
        let Some(character) = self.roster.get(index) else {
            return false;
        };
        self.character_index = index;
        self.ctx.player.set_stats(Some(character.stats));
        self.ctx.character_id = character.id.clone();
        self.selector_open = false;
        log::info!("Switched character to {}", character.name);
        true
    }

    pub fn update(&mut self) {
        let now = self.clock.now();
        match step(&mut self.ctx, now) {
            StepOutcome::Continue => {}
            StepOutcome::Died(cause) => {
                self.end_time = Some(now);
                log::info!("Attempt lost: {cause:?} after {:.2}s", self.elapsed().as_secs_f32());
            }
            StepOutcome::Won => {
                self.end_time = Some(now);
                log::info!(
                    "Level complete in {:.2}s, score {}",
                    self.elapsed().as_secs_f32(),
                    self.ctx.level.score
                );
            }
        }
        if !self.ctx.on_switch_platform {
            self.selector_open = false;
        }
        log::trace!(
            "frame state={:?} pos=({:.1}, {:.1}) vel=({:.1}, {:.1})",
            self.ctx.state,
            self.ctx.player.x,
            self.ctx.player.y,
            self.ctx.player.vx,
            self.ctx.player.vy
        );
    }

    /// Pure read of the current state, in fixed layer order.
    pub fn draw(&self, sink: &mut dyn DrawSink) {
        let now = self.clock.now();
        draw_level(&self.ctx.level, now, &self.ctx.config, sink);
        sink.submit(DrawCommand::Player(player_visual(
            &self.ctx.player,
            &self.roster,
            Some(self.character_index),
        )));
        sink.submit(DrawCommand::Hud(HudVisual {
            score: self.ctx.level.score,
            key_counts: self
                .ctx
                .level
                .key_counts()
                .map(|(shape, count)| (shape.to_string(), count))
                .collect(),
            elapsed: self.elapsed(),
            character: self.active_character().map(|c| c.name.clone()),
            can_switch_character: self.ctx.on_switch_platform,
        }));
        if self.selector_open {
            sink.submit(DrawCommand::CharacterSelector(selector_visual(
                &self.ctx.player.bounds(),
                &self.roster,
                Some(self.character_index),
            )));
        }
        if let Some(overlay) = overlay_visual(self.ctx.state, self.completion_time()) {
            sink.submit(DrawCommand::Overlay(overlay));
        }
    }

    /// Restart from spawn in one step: player, level runtime state and
    /// selector all reset before the next frame runs. Input edge history is
    /// kept, so keys held through the reset do not fire again.
    pub fn reset_attempt(&mut self) {
        let (x, y) = self.spawn;
        self.ctx.player.reset(x, y);
        self.ctx.level.reset_attempt();
        self.ctx.on_switch_platform = false;
        self.ctx.state = GameState::Playing;
        self.selector_open = false;
        self.start_time = Some(self.clock.now());
        self.end_time = None;
        log::info!("Attempt reset");
    }

    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }

    /// Leave play mode, handing the level back with all runtime state reset.
    pub fn into_level(self) -> Level {
        let mut level = self.ctx.level;
        level.reset_attempt();
        level
    }

    pub fn state(&self) -> GameState {
        self.ctx.state
    }

    pub fn player(&self) -> &Player {
        &self.ctx.player
    }

    pub fn level(&self) -> &Level {
        &self.ctx.level
    }

    pub fn active_character(&self) -> Option<&Character> {
        self.roster.get(self.character_index)
    }

    pub fn selector_open(&self) -> bool {
        self.selector_open
    }

    pub fn on_switch_platform(&self) -> bool {
        self.ctx.on_switch_platform
    }

    /// Time since the attempt started, frozen once won or lost.
    pub fn elapsed(&self) -> Duration {
        match self.start_time {
            Some(start) => self
                .end_time
                .unwrap_or_else(|| self.clock.now())
                .saturating_sub(start),
            None => Duration::ZERO,
        }
    }

    pub fn completion_time(&self) -> Option<Duration> {
        match (self.ctx.state, self.start_time, self.end_time) {
            (GameState::Won, Some(start), Some(end)) => Some(end.saturating_sub(start)),
            _ => None,
        }
    }
}
