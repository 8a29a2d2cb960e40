//! Tile-grid platformer simulation: level model, physics, collision and the
//! play-mode engine. Rendering and raw input polling stay with the host; the
//! engine consumes `plat_core::input::InputState` and emits `draw::DrawCommand`s.

pub mod characters;
pub mod collision;
pub mod controls;
pub mod draw;
pub mod engine;
pub mod entity;
pub mod level;
pub mod player;
pub mod replay;
pub mod snapshot;
pub mod spatial;
