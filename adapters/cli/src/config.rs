//! Session configuration loaded from TOML.

use std::{collections::HashSet, fs, path::Path};

use anyhow::{bail, Context, Result};
use glam::{Mat4, Quat, Vec3};
use serde::Deserialize;
use tactica_core::{Easing, OnScreenLog};
use tactica_system_movement::{MoveTiming, DEFAULT_BACK_AMPLITUDE, DEFAULT_MOVE_FRAMES};

/// Complete description of a scripted session.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct SessionConfig {
    pub(crate) grid: GridConfig,
    pub(crate) animation: AnimationConfig,
    pub(crate) diagnostics: DiagnosticsConfig,
    pub(crate) units: Vec<UnitConfig>,
    pub(crate) script: Vec<ScriptStep>,
}

/// Grid plane placement and resolution.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct GridConfig {
    pub(crate) size: f32,
    pub(crate) subdivisions: u32,
    pub(crate) origin: [f32; 3],
    pub(crate) yaw_degrees: f32,
}

/// Playback settings for move commands.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct AnimationConfig {
    pub(crate) frame_rate: u32,
    pub(crate) frames: u32,
    pub(crate) back_amplitude: f32,
}

/// On-screen log settings.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct DiagnosticsConfig {
    pub(crate) on_screen_lines: usize,
}

/// Unit placed on the grid when the session starts.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct UnitConfig {
    pub(crate) name: String,
    pub(crate) position: [f32; 3],
}

/// Scripted player input. Pointers are world `(x, z)` coordinates seen from
/// above.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub(crate) enum ScriptStep {
    Click { pointer: [f32; 2] },
    Hover { pointer: [f32; 2] },
    EndTurn,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            size: 12.0,
            subdivisions: 4,
            origin: [0.0; 3],
            yaw_degrees: 0.0,
        }
    }
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            frame_rate: tactica_core::animation::DEFAULT_FRAME_RATE,
            frames: DEFAULT_MOVE_FRAMES,
            back_amplitude: DEFAULT_BACK_AMPLITUDE,
        }
    }
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            on_screen_lines: OnScreenLog::DEFAULT_CAPACITY,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            animation: AnimationConfig::default(),
            diagnostics: DiagnosticsConfig::default(),
            units: vec![UnitConfig {
                name: "Pawn".to_owned(),
                position: [0.0, 1.0, 0.0],
            }],
            script: vec![
                ScriptStep::Click {
                    pointer: [0.0, 0.0],
                },
                ScriptStep::Hover {
                    pointer: [4.5, -4.5],
                },
                ScriptStep::Click {
                    pointer: [4.5, -4.5],
                },
                ScriptStep::Click {
                    pointer: [4.5, 4.5],
                },
                ScriptStep::EndTurn,
            ],
        }
    }
}

impl SessionConfig {
    /// Reads and parses a configuration file.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read session config at {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("invalid session config at {}", path.display()))
    }

    pub(crate) fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("failed to parse session config toml contents")
    }

    /// Rejects configurations the session cannot run.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.grid.subdivisions == 0 {
            bail!("grid subdivisions must be positive");
        }
        if !self.grid.size.is_finite() || self.grid.size <= 0.0 {
            bail!(
                "grid size must be positive and finite (received {})",
                self.grid.size
            );
        }
        if self.animation.frames == 0 {
            bail!("animation frames must be positive");
        }
        if self.animation.frame_rate == 0 {
            bail!("animation frame rate must be positive");
        }

        let mut names = HashSet::with_capacity(self.units.len());
        for unit in &self.units {
            if !names.insert(unit.name.as_str()) {
                bail!("duplicate unit name `{}`", unit.name);
            }
        }
        Ok(())
    }

    /// World transform of the grid plane.
    pub(crate) fn grid_transform(&self) -> Mat4 {
        Mat4::from_rotation_translation(
            Quat::from_rotation_y(self.grid.yaw_degrees.to_radians()),
            Vec3::from(self.grid.origin),
        )
    }

    pub(crate) fn move_timing(&self) -> MoveTiming {
        MoveTiming {
            frame_rate: self.animation.frame_rate,
            frames: self.animation.frames,
            easing: Easing::BackInOut {
                amplitude: self.animation.back_amplitude,
            },
        }
    }
}
