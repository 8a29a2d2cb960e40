//! Level entities as one tagged union.
//!
//! Every entity shares placement data (`x`, `y`, `rotation`, `subtype`) and
//! carries a variant payload in `EntityKind`. Per-variant behaviour is a single
//! `match` on the kind instead of a class hierarchy. Construction from
//! persisted records goes through `EntityRegistry`, a factory table keyed by
//! the `type` tag, so new variants can be registered without touching the
//! loader.
//!
//! Runtime-only state (collected, unlocked, triggered, flame phase) lives in the
//! payloads and is restored by `reset_runtime`.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use crate::collision::Bounds;
use crate::player::PhysicsConfig;
use crate::snapshot::EntityRecord;

/// Every entity occupies exactly one grid cell.
pub const CELL_SIZE: f32 = 40.0;

pub const DEFAULT_SUBTYPE: &str = "default";
pub const DEFAULT_COIN_VALUE: u32 = 100;
pub const DEFAULT_FLAME_INTERVAL_SECONDS: f32 = 5.0;
pub const DEFAULT_GATE_CHARACTER: &str = "boxy";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Normalizes any multiple of 90; anything else falls back to 0.
    pub fn from_degrees(degrees: i32) -> Self {
        match degrees.rem_euclid(360) {
            90 => Self::Deg90,
            180 => Self::Deg180,
            270 => Self::Deg270,
            _ => Self::Deg0,
        }
    }

    pub fn degrees(self) -> i32 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }

    /// Next quarter turn clockwise.
    pub fn rotated(self) -> Self {
        Self::from_degrees(self.degrees() + 90)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityType {
    Block,
    Spike,
    Door,
    Spawn,
    Coin,
    Water,
    Lava,
    FallingBlock,
    Key,
    LockedDoor,
    Enemy,
    CharacterGate,
    SwitchPlatform,
    DoubleJump,
    Flamethrower,
}

impl EntityType {
    pub const ALL: [EntityType; 15] = [
        EntityType::Block,
        EntityType::Spike,
        EntityType::Door,
        EntityType::Spawn,
        EntityType::Coin,
        EntityType::Water,
        EntityType::Lava,
        EntityType::FallingBlock,
        EntityType::Key,
        EntityType::LockedDoor,
        EntityType::Enemy,
        EntityType::CharacterGate,
        EntityType::SwitchPlatform,
        EntityType::DoubleJump,
        EntityType::Flamethrower,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            Self::Block => "block",
            Self::Spike => "spike",
            Self::Door => "door",
            Self::Spawn => "spawn",
            Self::Coin => "coin",
            Self::Water => "water",
            Self::Lava => "lava",
            Self::FallingBlock => "falling_block",
            Self::Key => "key",
            Self::LockedDoor => "locked_door",
            Self::Enemy => "enemy",
            Self::CharacterGate => "character_gate",
            Self::SwitchPlatform => "switch_platform",
            Self::DoubleJump => "double_jump",
            Self::Flamethrower => "flamethrower",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.tag() == tag)
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Shape tag shared by keys and the locked doors they open.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Shape {
    Circle,
    Square,
    Triangle,
    Other(String),
}

impl Shape {
    /// Shapes that always appear in the key counter, even at zero.
    pub const STANDARD: [Shape; 3] = [Shape::Circle, Shape::Square, Shape::Triangle];

    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "circle" => Self::Circle,
            "square" => Self::Square,
            "triangle" => Self::Triangle,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Circle => "circle",
            Self::Square => "square",
            Self::Triangle => "triangle",
            Self::Other(tag) => tag,
        }
    }
}

impl Default for Shape {
    fn default() -> Self {
        Self::Circle
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Coin {
    pub value: u32,
    pub collected: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyItem {
    pub shape: Shape,
    pub collected: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LockedDoor {
    pub shape: Shape,
    pub locked: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Enemy {
    /// +1 right, -1 left.
    pub direction: i32,
    home: (f32, f32),
    home_direction: i32,
}

impl Enemy {
    pub fn new(x: f32, y: f32, direction: i32) -> Self {
        let direction = if direction < 0 { -1 } else { 1 };
        Self {
            direction,
            home: (x, y),
            home_direction: direction,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CharacterGate {
    pub required: String,
}

impl CharacterGate {
    pub fn can_pass(&self, character_id: &str) -> bool {
        character_id.eq_ignore_ascii_case(&self.required)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FallingBlock {
    home: (f32, f32),
    pub triggered_at: Option<Duration>,
    pub falling: bool,
    /// 0..=3, grows while the fall delay runs down.
    pub shake: f32,
}

impl FallingBlock {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            home: (x, y),
            triggered_at: None,
            falling: false,
            shake: 0.0,
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered_at.is_some()
    }

    /// Start the fall countdown. Only the first call has any effect.
    pub fn trigger(&mut self, now: Duration) -> bool {
        if self.triggered_at.is_some() {
            return false;
        }
        self.triggered_at = Some(now);
        true
    }

    /// Fraction of the fall delay already elapsed, for the warning tint.
    pub fn warning_intensity(&self, now: Duration, delay_ms: u64) -> f32 {
        match self.triggered_at {
            Some(at) if delay_ms > 0 => {
                let elapsed = now.saturating_sub(at).as_millis() as f32;
                (elapsed / delay_ms as f32).min(1.0)
            }
            Some(_) => 1.0,
            None => 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Flamethrower {
    pub interval_seconds: f32,
    anchor: Option<Duration>,
    pub on: bool,
}

impl Flamethrower {
    pub fn new(interval_seconds: f32) -> Self {
        Self {
            interval_seconds,
            anchor: None,
            on: false,
        }
    }

    /// On for the first half of every period, phase anchored at the first update.
    pub fn update(&mut self, now: Duration) {
        let anchor = *self.anchor.get_or_insert(now);
        let period = self.interval_seconds as f64;
        if period <= 0.0 {
            self.on = true;
            return;
        }
        let t = now.saturating_sub(anchor).as_secs_f64() % period;
        self.on = t < period / 2.0;
    }

    fn reset(&mut self) {
        self.anchor = None;
        self.on = false;
    }
}

/// Flame cells for a flamethrower at `(x, y)`: three cells in the facing
/// direction (0 right, 90 down, 180 left, 270 up).
pub fn flame_rects(x: f32, y: f32, rotation: Rotation) -> [Bounds; 3] {
    let size = CELL_SIZE;
    let rect = |i: f32| match rotation {
        Rotation::Deg0 => Bounds::from_rect(x + i * size, y, size, size),
        Rotation::Deg90 => Bounds::from_rect(x, y + i * size, size, size),
        Rotation::Deg180 => Bounds::from_rect(x - i * size, y, size, size),
        Rotation::Deg270 => Bounds::from_rect(x, y - i * size, size, size),
    };
    [rect(1.0), rect(2.0), rect(3.0)]
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntityKind {
    Block,
    Spike,
    Lava,
    Water,
    Door,
    Spawn,
    SwitchPlatform,
    DoubleJumpOrb,
    Coin(Coin),
    Key(KeyItem),
    LockedDoor(LockedDoor),
    Enemy(Enemy),
    CharacterGate(CharacterGate),
    FallingBlock(FallingBlock),
    Flamethrower(Flamethrower),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub rotation: Rotation,
    pub subtype: String,
    pub kind: EntityKind,
}

impl Entity {
    pub fn new(kind: EntityKind, x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            width: CELL_SIZE,
            height: CELL_SIZE,
            rotation: Rotation::default(),
            subtype: DEFAULT_SUBTYPE.to_string(),
            kind,
        }
    }

    pub fn with_subtype(mut self, subtype: impl Into<String>) -> Self {
        self.subtype = subtype.into();
        self
    }

    pub fn block(x: f32, y: f32) -> Self {
        Self::new(EntityKind::Block, x, y)
    }

    pub fn spike(x: f32, y: f32) -> Self {
        Self::new(EntityKind::Spike, x, y)
    }

    pub fn coin(x: f32, y: f32, value: u32) -> Self {
        Self::new(
            EntityKind::Coin(Coin {
                value,
                collected: false,
            }),
            x,
            y,
        )
    }

    pub fn key(x: f32, y: f32, shape: Shape) -> Self {
        let subtype = shape.as_str().to_string();
        Self::new(
            EntityKind::Key(KeyItem {
                shape,
                collected: false,
            }),
            x,
            y,
        )
        .with_subtype(subtype)
    }

    pub fn locked_door(x: f32, y: f32, shape: Shape) -> Self {
        let subtype = shape.as_str().to_string();
        Self::new(EntityKind::LockedDoor(LockedDoor { shape, locked: true }), x, y)
            .with_subtype(subtype)
    }

    pub fn enemy(x: f32, y: f32, direction: i32) -> Self {
        Self::new(EntityKind::Enemy(Enemy::new(x, y, direction)), x, y)
    }

    pub fn character_gate(x: f32, y: f32, required: impl Into<String>) -> Self {
        Self::new(
            EntityKind::CharacterGate(CharacterGate {
                required: required.into(),
            }),
            x,
            y,
        )
    }

    pub fn falling_block(x: f32, y: f32) -> Self {
        Self::new(EntityKind::FallingBlock(FallingBlock::new(x, y)), x, y)
    }

    pub fn flamethrower(x: f32, y: f32, interval_seconds: f32) -> Self {
        Self::new(
            EntityKind::Flamethrower(Flamethrower::new(interval_seconds)),
            x,
            y,
        )
    }

    pub fn entity_type(&self) -> EntityType {
        match &self.kind {
            EntityKind::Block => EntityType::Block,
            EntityKind::Spike => EntityType::Spike,
            EntityKind::Lava => EntityType::Lava,
            EntityKind::Water => EntityType::Water,
            EntityKind::Door => EntityType::Door,
            EntityKind::Spawn => EntityType::Spawn,
            EntityKind::SwitchPlatform => EntityType::SwitchPlatform,
            EntityKind::DoubleJumpOrb => EntityType::DoubleJump,
            EntityKind::Coin(_) => EntityType::Coin,
            EntityKind::Key(_) => EntityType::Key,
            EntityKind::LockedDoor(_) => EntityType::LockedDoor,
            EntityKind::Enemy(_) => EntityType::Enemy,
            EntityKind::CharacterGate(_) => EntityType::CharacterGate,
            EntityKind::FallingBlock(_) => EntityType::FallingBlock,
            EntityKind::Flamethrower(_) => EntityType::Flamethrower,
        }
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::from_rect(self.x, self.y, self.width, self.height)
    }

    pub fn rotate(&mut self) {
        self.rotation = self.rotation.rotated();
    }

    /// True when the entity sits in the cell whose top-left is `(x, y)`.
    pub fn occupies(&self, x: f32, y: f32) -> bool {
        self.x == x && self.y == y
    }

    /// Advance time-driven mechanisms. Enemies are stepped by the level,
    /// since their patrol probes neighbouring cells.
    pub fn update(&mut self, now: Duration, config: &PhysicsConfig) {
        match &mut self.kind {
            EntityKind::FallingBlock(block) => {
                if let (Some(at), false) = (block.triggered_at, block.falling) {
                    let elapsed = now.saturating_sub(at);
                    let delay = Duration::from_millis(config.falling_block_delay_ms);
                    if elapsed >= delay {
                        block.falling = true;
                        log::debug!("Falling block at ({}, {}) released", self.x, self.y);
                    } else {
                        block.shake = (block.warning_intensity(now, config.falling_block_delay_ms)
                            * 3.0)
                            .min(3.0);
                    }
                }
                if block.falling {
                    self.y += config.falling_block_speed;
                }
            }
            EntityKind::Flamethrower(flamethrower) => flamethrower.update(now),
            _ => {}
        }
    }

    /// Restore attempt-start state: pickups back, doors relocked, mechanisms home.
    pub fn reset_runtime(&mut self) {
        match &mut self.kind {
            EntityKind::Coin(coin) => coin.collected = false,
            EntityKind::Key(key) => key.collected = false,
            EntityKind::LockedDoor(door) => door.locked = true,
            EntityKind::FallingBlock(block) => {
                self.x = block.home.0;
                self.y = block.home.1;
                block.triggered_at = None;
                block.falling = false;
                block.shake = 0.0;
            }
            EntityKind::Enemy(enemy) => {
                self.x = enemy.home.0;
                self.y = enemy.home.1;
                enemy.direction = enemy.home_direction;
            }
            EntityKind::Flamethrower(flamethrower) => flamethrower.reset(),
            _ => {}
        }
    }

    /// Flame cells while the flamethrower is firing; empty otherwise.
    pub fn active_flames(&self) -> Option<[Bounds; 3]> {
        match &self.kind {
            EntityKind::Flamethrower(flamethrower) if flamethrower.on => {
                Some(flame_rects(self.x, self.y, self.rotation))
            }
            _ => None,
        }
    }

    pub fn to_record(&self) -> EntityRecord {
        let mut record = EntityRecord::placed(self.entity_type().tag(), self.x, self.y);
        record.subtype = Some(self.subtype.clone());
        record.rotation = Some(self.rotation.degrees());
        match &self.kind {
            EntityKind::Coin(coin) => {
                record.value = Some(coin.value);
                record.collected = Some(coin.collected);
            }
            EntityKind::Key(key) => {
                record.shape = Some(key.shape.to_string());
                record.collected = Some(key.collected);
            }
            EntityKind::LockedDoor(door) => {
                record.shape = Some(door.shape.to_string());
                record.locked = Some(door.locked);
            }
            EntityKind::Enemy(enemy) => record.direction = Some(enemy.direction),
            EntityKind::CharacterGate(gate) => {
                record.required_character = Some(gate.required.clone())
            }
            EntityKind::FallingBlock(_) => {
                record.triggered = Some(false);
                record.falling = Some(false);
            }
            EntityKind::Flamethrower(flamethrower) => {
                record.interval_seconds = Some(flamethrower.interval_seconds)
            }
            _ => {}
        }
        record
    }
}

pub type EntityFactory = fn(&EntityRecord) -> Option<Entity>;

/// Factory table keyed by `type` tag.
pub struct EntityRegistry {
    factories: HashMap<String, EntityFactory>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(EntityType::Block.tag(), |r| {
            Some(Entity::block(r.x, r.y).with_subtype(r.subtype_or_default()))
        });
        registry.register(EntityType::Spike.tag(), |r| Some(Entity::spike(r.x, r.y)));
        registry.register(EntityType::Door.tag(), |r| {
            Some(Entity::new(EntityKind::Door, r.x, r.y))
        });
        registry.register(EntityType::Spawn.tag(), |r| {
            Some(Entity::new(EntityKind::Spawn, r.x, r.y))
        });
        registry.register(EntityType::Coin.tag(), |r| {
            let value = r.value.filter(|v| *v > 0).unwrap_or(DEFAULT_COIN_VALUE);
            Some(Entity::coin(r.x, r.y, value))
        });
        registry.register(EntityType::Water.tag(), |r| {
            Some(Entity::new(EntityKind::Water, r.x, r.y))
        });
        registry.register(EntityType::Lava.tag(), |r| {
            Some(Entity::new(EntityKind::Lava, r.x, r.y))
        });
        registry.register(EntityType::FallingBlock.tag(), |r| {
            Some(Entity::falling_block(r.x, r.y))
        });
        registry.register(EntityType::Key.tag(), |r| {
            Some(Entity::key(r.x, r.y, r.shape_or_default()))
        });
        registry.register(EntityType::LockedDoor.tag(), |r| {
            Some(Entity::locked_door(r.x, r.y, r.shape_or_default()))
        });
        registry.register(EntityType::Enemy.tag(), |r| {
            Some(Entity::enemy(r.x, r.y, r.direction.unwrap_or(1)))
        });
        registry.register(EntityType::CharacterGate.tag(), |r| {
            let required = r
                .required_character
                .clone()
                .filter(|s| !s.is_empty())
                .or_else(|| r.subtype.clone().filter(|s| s != DEFAULT_SUBTYPE && !s.is_empty()))
                .unwrap_or_else(|| DEFAULT_GATE_CHARACTER.to_string());
            Some(Entity::character_gate(r.x, r.y, required))
        });
        registry.register(EntityType::SwitchPlatform.tag(), |r| {
            Some(Entity::new(EntityKind::SwitchPlatform, r.x, r.y))
        });
        registry.register(EntityType::DoubleJump.tag(), |r| {
            Some(Entity::new(EntityKind::DoubleJumpOrb, r.x, r.y))
        });
        registry.register(EntityType::Flamethrower.tag(), |r| {
            let interval = r
                .interval_seconds
                .filter(|s| *s > 0.0)
                .or_else(|| parse_interval(r.subtype.as_deref()))
                .unwrap_or(DEFAULT_FLAME_INTERVAL_SECONDS);
            Some(Entity::flamethrower(r.x, r.y, interval).with_subtype(r.subtype_or_default()))
        });
        registry
    }

    pub fn register(&mut self, tag: &str, factory: EntityFactory) {
        self.factories.insert(tag.to_string(), factory);
    }

    /// Build an entity from a record; `None` for unknown tags.
    pub fn create(&self, record: &EntityRecord) -> Option<Entity> {
        let factory = self.factories.get(record.type_tag.as_str())?;
        let mut entity = factory(record)?;
        if let Some(degrees) = record.rotation {
            entity.rotation = Rotation::from_degrees(degrees);
        }
        Some(entity)
    }
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Flamethrower subtypes double as the interval in seconds ("3", "5", ...).
pub fn parse_interval(subtype: Option<&str>) -> Option<f32> {
    subtype
        .and_then(|s| s.trim().parse::<f32>().ok())
        .filter(|s| *s > 0.0)
}
