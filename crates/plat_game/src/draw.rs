//! Render hand-off.
//!
//! The engine never draws. Each frame it emits `DrawCommand`s with
//! already-computed positions and states into a `DrawSink`, in a fixed layer
//! order: background, static objects, collectibles, locked doors, enemies,
//! spawn and door, player, HUD, character selector, overlay text. Building the
//! commands only reads the level and player.

use std::time::Duration;

use glam::Vec2;

use crate::characters::{CharacterRoster, CharacterShape};
use crate::collision::Bounds;
use crate::engine::GameState;
use crate::entity::{Entity, EntityKind, EntityType};
use crate::level::{BackgroundTheme, Level};
use crate::player::{Facing, PhysicsConfig, Player};

pub const SELECTOR_WIDTH: f32 = 210.0;
pub const SELECTOR_HEIGHT: f32 = 44.0;
pub const SELECTOR_GAP: f32 = 48.0;
pub const SELECTOR_OPTION_WIDTH: f32 = 60.0;
pub const SELECTOR_OPTION_HEIGHT: f32 = 28.0;
pub const SELECTOR_OPTION_PITCH: f32 = 70.0;
pub const SELECTOR_PADDING_X: f32 = 10.0;
pub const SELECTOR_PADDING_Y: f32 = 8.0;

pub trait DrawSink {
    fn submit(&mut self, command: DrawCommand);
}

impl DrawSink for Vec<DrawCommand> {
    fn submit(&mut self, command: DrawCommand) {
        self.push(command);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Background(BackgroundVisual),
    Entity(EntityVisual),
    Player(PlayerVisual),
    Hud(HudVisual),
    CharacterSelector(SelectorVisual),
    Overlay(OverlayVisual),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackgroundVisual {
    pub theme: BackgroundTheme,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityVisual {
    pub entity_type: EntityType,
    pub position: Vec2,
    pub size: Vec2,
    pub rotation: i32,
    pub subtype: String,
    /// Locked for locked doors, firing for flamethrowers, true otherwise.
    pub active: bool,
    /// Horizontal jitter of a falling block about to drop.
    pub shake: f32,
    /// Flame cells of a firing flamethrower.
    pub flames: Vec<Bounds>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerVisual {
    pub position: Vec2,
    pub size: Vec2,
    pub facing: Facing,
    pub alive: bool,
    pub in_water: bool,
    pub double_jump_ready: bool,
    pub shape: Option<CharacterShape>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HudVisual {
    pub score: u32,
    pub key_counts: Vec<(String, u32)>,
    pub elapsed: Duration,
    pub character: Option<String>,
    /// Standing on a switch platform: show the "open selector" hint.
    pub can_switch_character: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectorOption {
    pub id: String,
    pub name: String,
    pub rect: Bounds,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectorVisual {
    pub frame: Bounds,
    pub options: Vec<SelectorOption>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverlayVisual {
    pub state: GameState,
    pub title: String,
    pub subtitle: String,
}

/// Selector box geometry above the player, shared by drawing and mouse picking.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectorLayout {
    pub frame: Bounds,
    pub options: Vec<Bounds>,
}

/// Box centred on the player's centre x, its bottom `SELECTOR_GAP` above the
/// player's top edge. Widens past the default only for rosters longer than three.
pub fn selector_layout(player: &Bounds, option_count: usize) -> SelectorLayout {
    let width = SELECTOR_WIDTH.max(option_count as f32 * SELECTOR_OPTION_PITCH);
    let x0 = player.center_x() - width / 2.0;
    let y0 = player.top - SELECTOR_GAP - SELECTOR_HEIGHT;
    let options = (0..option_count)
        .map(|i| {
            Bounds::from_rect(
                x0 + SELECTOR_PADDING_X + i as f32 * SELECTOR_OPTION_PITCH,
                y0 + SELECTOR_PADDING_Y,
                SELECTOR_OPTION_WIDTH,
                SELECTOR_OPTION_HEIGHT,
            )
        })
        .collect();
    SelectorLayout {
        frame: Bounds::from_rect(x0, y0, width, SELECTOR_HEIGHT),
        options,
    }
}

pub fn selector_hit_index(layout: &SelectorLayout, point: Vec2) -> Option<usize> {
    layout
        .options
        .iter()
        .position(|rect| rect.contains_point(point))
}

fn entity_visual(entity: &Entity, now: Duration, config: &PhysicsConfig) -> EntityVisual {
    let mut visual = EntityVisual {
        entity_type: entity.entity_type(),
        position: Vec2::new(entity.x, entity.y),
        size: Vec2::new(entity.width, entity.height),
        rotation: entity.rotation.degrees(),
        subtype: entity.subtype.clone(),
        active: true,
        shake: 0.0,
        flames: Vec::new(),
    };
    match &entity.kind {
        EntityKind::LockedDoor(door) => visual.active = door.locked,
        EntityKind::Flamethrower(flamethrower) => {
            visual.active = flamethrower.on;
            if let Some(flames) = entity.active_flames() {
                visual.flames = flames.to_vec();
            }
        }
        EntityKind::FallingBlock(block) => {
            if block.is_triggered() && !block.falling {
                // Alternate sides each 50 ms, amplitude grows toward the drop.
                let phase = (now.as_millis() / 50) % 2;
                let sign = if phase == 0 { 1.0 } else { -1.0 };
                visual.shake = sign * block.shake;
            }
            visual.active = block.warning_intensity(now, config.falling_block_delay_ms) < 1.0;
        }
        _ => {}
    }
    visual
}

/// Background plus every entity, layered; collected pickups are skipped.
pub fn draw_level(level: &Level, now: Duration, config: &PhysicsConfig, sink: &mut dyn DrawSink) {
    let (width, height) = level.size.dimensions();
    sink.submit(DrawCommand::Background(BackgroundVisual {
        theme: level.background,
        width,
        height,
    }));

    let pending = |entity: &&Entity| match &entity.kind {
        EntityKind::Coin(coin) => !coin.collected,
        EntityKind::Key(key) => !key.collected,
        _ => true,
    };
    let layers = level
        .objects
        .iter()
        .chain(level.coins.iter().filter(pending))
        .chain(level.keys.iter().filter(pending))
        .chain(&level.locked_doors)
        .chain(&level.enemies)
        .chain(level.spawn.iter())
        .chain(level.door.iter());
    for entity in layers {
        sink.submit(DrawCommand::Entity(entity_visual(entity, now, config)));
    }
}

pub fn player_visual(
    player: &Player,
    roster: &CharacterRoster,
    character: Option<usize>,
) -> PlayerVisual {
    let character = character.and_then(|index| roster.get(index));
    PlayerVisual {
        position: Vec2::new(player.x, player.y),
        size: Vec2::new(player.width, player.height),
        facing: player.facing,
        alive: player.alive,
        in_water: player.in_water,
        double_jump_ready: player.can_double_jump && !player.has_double_jumped,
        shape: character.map(|c| c.shape),
        color: character.map(|c| c.color.clone()),
    }
}

pub fn selector_visual(
    player: &Bounds,
    roster: &CharacterRoster,
    active: Option<usize>,
) -> SelectorVisual {
    let layout = selector_layout(player, roster.len());
    let options = roster
        .characters
        .iter()
        .zip(layout.options)
        .enumerate()
        .map(|(index, (character, rect))| SelectorOption {
            id: character.id.clone(),
            name: character.name.clone(),
            rect,
            active: active == Some(index),
        })
        .collect();
    SelectorVisual {
        frame: layout.frame,
        options,
    }
}

/// Banner for the non-playing states; `None` while playing.
pub fn overlay_visual(state: GameState, completion: Option<Duration>) -> Option<OverlayVisual> {
    let (title, subtitle) = match state {
        GameState::Playing => return None,
        GameState::Ready => ("Ready".to_string(), "Press jump to start".to_string()),
        GameState::Won => (
            "Level complete!".to_string(),
            match completion {
                Some(time) => format!("Time: {:.2}s  (R to retry)", time.as_secs_f32()),
                None => "R to retry".to_string(),
            },
        ),
        GameState::Lost => ("Game over".to_string(), "Press R to retry".to_string()),
    };
    Some(OverlayVisual {
        state,
        title,
        subtitle,
    })
}
