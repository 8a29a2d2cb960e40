//! Serializable level snapshot and the JSON load/save helpers.
//!
//! Runtime-only flags (`collected`, `locked`, `triggered`, `falling`) are
//! written for compatibility but ignored on load: a loaded level always
//! starts a fresh attempt.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::entity::{Entity, EntityKind, EntityRegistry, Shape, DEFAULT_SUBTYPE};
use crate::level::{
    BackgroundTheme, Level, WorldSize, DEFAULT_AUTHOR, DEFAULT_GRID_SIZE, DEFAULT_LEVEL_NAME,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointRecord {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackgroundRecord {
    #[serde(rename = "type")]
    pub theme: String,
}

impl Default for BackgroundRecord {
    fn default() -> Self {
        Self {
            theme: BackgroundTheme::Default.tag().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRecord {
    #[serde(rename = "type")]
    pub type_tag: String,
    pub x: f32,
    pub y: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collected: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_character: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_seconds: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggered: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub falling: Option<bool>,
}

impl EntityRecord {
    /// Record with only the tag and position set.
    pub fn placed(type_tag: &str, x: f32, y: f32) -> Self {
        Self {
            type_tag: type_tag.to_string(),
            x,
            y,
            subtype: None,
            rotation: None,
            value: None,
            collected: None,
            shape: None,
            locked: None,
            direction: None,
            required_character: None,
            interval_seconds: None,
            triggered: None,
            falling: None,
        }
    }

    pub fn subtype_or_default(&self) -> String {
        self.subtype
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SUBTYPE.to_string())
    }

    /// Missing or empty shape means circle.
    pub fn shape_or_default(&self) -> Shape {
        self.shape
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(Shape::from_tag)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelSnapshot {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_author")]
    pub author: String,
    #[serde(default = "default_grid_size")]
    pub grid_size: f32,
    #[serde(default = "default_size")]
    pub size: String,
    #[serde(default)]
    pub background: BackgroundRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spawn: Option<PointRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub door: Option<PointRecord>,
    #[serde(default)]
    pub objects: Vec<EntityRecord>,
    #[serde(default)]
    pub coins: Vec<EntityRecord>,
    #[serde(default)]
    pub keys: Vec<EntityRecord>,
    #[serde(default)]
    pub locked_doors: Vec<EntityRecord>,
    #[serde(default)]
    pub enemies: Vec<EntityRecord>,
}

fn default_name() -> String {
    DEFAULT_LEVEL_NAME.to_string()
}

fn default_author() -> String {
    DEFAULT_AUTHOR.to_string()
}

fn default_grid_size() -> f32 {
    DEFAULT_GRID_SIZE
}

fn default_size() -> String {
    WorldSize::default().tag().to_string()
}

fn point_of(entity: &Entity) -> PointRecord {
    PointRecord {
        x: entity.x,
        y: entity.y,
    }
}

fn records(entities: &[Entity]) -> Vec<EntityRecord> {
    entities.iter().map(Entity::to_record).collect()
}

impl Level {
    pub fn to_snapshot(&self) -> LevelSnapshot {
        LevelSnapshot {
            name: self.name.clone(),
            author: self.author.clone(),
            grid_size: self.grid_size,
            size: self.size.tag().to_string(),
            background: BackgroundRecord {
                theme: self.background.tag().to_string(),
            },
            spawn: self.spawn.as_ref().map(point_of),
            door: self.door.as_ref().map(point_of),
            objects: records(&self.objects),
            coins: records(&self.coins),
            keys: records(&self.keys),
            locked_doors: records(&self.locked_doors),
            enemies: records(&self.enemies),
        }
    }

    /// Rebuild a level. Records with an unregistered tag are skipped.
    pub fn from_snapshot(snapshot: &LevelSnapshot, registry: &EntityRegistry) -> Self {
        let mut level = Level::new();
        level.name = snapshot.name.clone();
        level.author = snapshot.author.clone();
        level.grid_size = if snapshot.grid_size > 0.0 {
            snapshot.grid_size
        } else {
            DEFAULT_GRID_SIZE
        };
        level.size = WorldSize::from_tag(&snapshot.size);
        level.background = BackgroundTheme::from_tag(&snapshot.background.theme);
        level.spawn = snapshot
            .spawn
            .map(|p| Entity::new(EntityKind::Spawn, p.x, p.y));
        level.door = snapshot
            .door
            .map(|p| Entity::new(EntityKind::Door, p.x, p.y));

        let build = |bucket: &[EntityRecord]| -> Vec<Entity> {
            bucket
                .iter()
                .filter_map(|record| {
                    let entity = registry.create(record);
                    if entity.is_none() {
                        log::warn!(
                            "Skipping unknown entity type '{}' at ({}, {})",
                            record.type_tag,
                            record.x,
                            record.y
                        );
                    }
                    entity
                })
                .collect()
        };
        level.objects = build(&snapshot.objects);
        level.coins = build(&snapshot.coins);
        level.keys = build(&snapshot.keys);
        level.locked_doors = build(&snapshot.locked_doors);
        level.enemies = build(&snapshot.enemies);
        level
    }
}

pub fn export_json(level: &Level) -> Result<String, String> {
    serde_json::to_string_pretty(&level.to_snapshot())
        .map_err(|e| format!("Failed to serialize level: {e}"))
}

pub fn import_json(raw: &str) -> Result<Level, String> {
    let snapshot: LevelSnapshot =
        serde_json::from_str(raw).map_err(|e| format!("Failed to parse level JSON: {e}"))?;
    Ok(Level::from_snapshot(
        &snapshot,
        &EntityRegistry::with_builtins(),
    ))
}

pub fn load_level_from_path(path: &Path) -> Result<Level, String> {
    let raw =
        fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    let snapshot: LevelSnapshot = serde_json::from_str(&raw)
        .map_err(|e| format!("Failed to parse level JSON {}: {e}", path.display()))?;
    let level = Level::from_snapshot(&snapshot, &EntityRegistry::with_builtins());
    log::info!(
        "Loaded level '{}' by {} ({} entities) from {}",
        level.name,
        level.author,
        level.entity_count(),
        path.display()
    );
    Ok(level)
}

pub fn save_level_to_path(level: &Level, path: &Path) -> Result<(), String> {
    let json = export_json(level)?;
    fs::write(path, json).map_err(|e| format!("Failed to write {}: {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityType, Rotation};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    fn temp_file_path(name_hint: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "plat_level_test_{}_{}_{}.json",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    fn placements(entities: &[Entity]) -> Vec<(EntityType, f32, f32, String, i32)> {
        entities
            .iter()
            .map(|e| {
                (
                    e.entity_type(),
                    e.x,
                    e.y,
                    e.subtype.clone(),
                    e.rotation.degrees(),
                )
            })
            .collect()
    }

    #[test]
    fn round_trip_keeps_layout_and_resets_runtime_flags() {
        let mut level = Level::default_layout();
        level.name = "Caves".to_string();
        level.set_size(WorldSize::Large);
        level.set_background(BackgroundTheme::Cave);
        level.add_entity(EntityType::Coin, 120.0, 440.0, DEFAULT_SUBTYPE);
        level.add_entity(EntityType::Key, 160.0, 440.0, "square");
        level.add_entity(EntityType::LockedDoor, 600.0, 440.0, "square");
        level.add_entity(EntityType::CharacterGate, 560.0, 440.0, "gordo");
        level.add_entity(EntityType::Flamethrower, 520.0, 200.0, "2");
        level.add_entity(EntityType::FallingBlock, 280.0, 320.0, DEFAULT_SUBTYPE);
        level.rotate_at(320.0, 440.0);
        level.collect_coin(0);
        level.collect_key(0);
        level.unlock_door(0);
        if let EntityKind::FallingBlock(block) = &mut level.objects.last_mut().unwrap().kind {
            block.trigger(Duration::from_secs(1));
        }

        let json = export_json(&level).expect("export");
        let restored = import_json(&json).expect("import");

        assert_eq!(restored.name, "Caves");
        assert_eq!(restored.size, WorldSize::Large);
        assert_eq!(restored.background, BackgroundTheme::Cave);
        assert_eq!(
            restored.spawn.as_ref().map(|s| (s.x, s.y)),
            level.spawn.as_ref().map(|s| (s.x, s.y))
        );
        assert_eq!(
            restored.door.as_ref().map(|s| (s.x, s.y)),
            level.door.as_ref().map(|s| (s.x, s.y))
        );
        assert_eq!(placements(&restored.objects), placements(&level.objects));
        assert_eq!(placements(&restored.coins), placements(&level.coins));
        assert_eq!(
            placements(&restored.locked_doors),
            placements(&level.locked_doors)
        );

        assert_eq!(restored.score, 0);
        assert!(matches!(&restored.coins[0].kind, EntityKind::Coin(c) if !c.collected));
        assert!(matches!(&restored.keys[0].kind, EntityKind::Key(k) if !k.collected));
        assert!(matches!(&restored.locked_doors[0].kind, EntityKind::LockedDoor(d) if d.locked));
        let falling = restored
            .objects
            .iter()
            .find(|e| e.entity_type() == EntityType::FallingBlock)
            .expect("falling block survives");
        assert!(matches!(&falling.kind, EntityKind::FallingBlock(b) if !b.is_triggered()));
        let gate = restored
            .objects
            .iter()
            .find_map(|e| match &e.kind {
                EntityKind::CharacterGate(g) => Some(g.required.clone()),
                _ => None,
            })
            .expect("gate survives");
        assert_eq!(gate, "gordo");
    }

    #[test]
    fn export_uses_camel_case_keys() {
        let mut level = Level::new();
        level.add_entity(EntityType::LockedDoor, 0.0, 0.0, "circle");
        level.add_entity(EntityType::Flamethrower, 40.0, 0.0, "4");
        let json = export_json(&level).expect("export");
        assert!(json.contains("\"gridSize\""));
        assert!(json.contains("\"lockedDoors\""));
        assert!(json.contains("\"intervalSeconds\""));
        assert!(json.contains("\"type\": \"locked_door\""));
        assert!(!json.contains("\"spawn\""), "absent singletons are omitted");
    }

    #[test]
    fn import_fills_defaults_and_skips_unknown_types() {
        let raw = r#"{
            "spawn": {"x": 80, "y": 400},
            "objects": [
                {"type": "block", "x": 0, "y": 480},
                {"type": "teleporter", "x": 40, "y": 480},
                {"type": "spike", "x": 80, "y": 480, "rotation": 270}
            ],
            "coins": [{"type": "coin", "x": 120, "y": 440}],
            "keys": [{"type": "key", "x": 160, "y": 440}]
        }"#;
        let level = import_json(raw).expect("import");
        assert_eq!(level.name, DEFAULT_LEVEL_NAME);
        assert_eq!(level.author, DEFAULT_AUTHOR);
        assert_eq!(level.grid_size, 40.0);
        assert_eq!(level.size, WorldSize::Medium);
        assert_eq!(level.objects.len(), 2);
        assert_eq!(level.objects[1].rotation, Rotation::Deg270);
        assert!(matches!(&level.coins[0].kind, EntityKind::Coin(c) if c.value == 100));
        assert!(matches!(&level.keys[0].kind, EntityKind::Key(k) if k.shape == Shape::Circle));
        assert!(level.door.is_none());
        assert!(!level.validate().valid);
    }

    #[test]
    fn import_rejects_malformed_json() {
        let err = import_json("{ not json").expect_err("malformed");
        assert!(err.starts_with("Failed to parse level JSON"));
    }

    #[test]
    fn save_then_load_from_disk() {
        let path = temp_file_path("disk");
        let level = Level::default_layout();
        save_level_to_path(&level, &path).expect("save");
        let loaded = load_level_from_path(&path).expect("load");
        assert_eq!(loaded.entity_count(), level.entity_count());
        let _ = fs::remove_file(path);
    }

    #[test]
    fn bundled_level_loads_and_validates() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("levels/first_steps.json");
        let level = load_level_from_path(&path).expect("bundled level");
        assert!(level.validate().valid);
        assert_eq!(level.size, WorldSize::Small);
        assert_eq!(level.background, BackgroundTheme::Sunset);
        assert_eq!(level.locked_doors.len(), 1);
        assert_eq!(level.enemies.len(), 1);
    }

    #[test]
    fn load_reports_missing_file() {
        let err = load_level_from_path(Path::new("/nonexistent/plat/level.json"))
            .expect_err("missing file");
        assert!(err.starts_with("Failed to read"));
    }
}
