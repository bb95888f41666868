//! Game settings and preferences
//!
//! Stored as JSON. Missing fields fall back to their defaults so older files
//! keep loading.

use serde::{Deserialize, Serialize};

use crate::sim::particles::MAX_SPARK_PARTICLES;

/// Quality preset levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QualityPreset {
    Low,
    Medium,
    #[default]
    High,
}

impl QualityPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityPreset::Low => "Low",
            QualityPreset::Medium => "Medium",
            QualityPreset::High => "High",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(QualityPreset::Low),
            "medium" | "med" => Some(QualityPreset::Medium),
            "high" => Some(QualityPreset::High),
            _ => None,
        }
    }

    /// Live spark cap for this preset
    pub fn max_particles(&self) -> usize {
        match self {
            QualityPreset::Low => 120,
            QualityPreset::Medium => 260,
            QualityPreset::High => MAX_SPARK_PARTICLES,
        }
    }
}

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Graphics quality preset
    pub quality: QualityPreset,

    // === Visual Effects ===
    /// Crash sparks and smoke
    pub particles: bool,
    /// Camera shake on damage
    pub camera_shake: bool,
    /// Red flash on damage
    pub damage_flash: bool,

    // === Audio ===
    /// Master volume (0.0 - 1.0)
    pub master_volume: f32,
    /// Engine loop volume (0.0 - 1.0)
    pub engine_volume: f32,

    // === Accessibility ===
    /// Reduced motion (minimize shake, flashes)
    pub reduced_motion: bool,

    // === Debug ===
    /// Log collider contacts and traffic recycles
    pub debug_physics: bool,
    /// Fixed run seed; random when unset
    pub seed: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quality: QualityPreset::High,

            particles: true,
            camera_shake: true,
            damage_flash: true,

            master_volume: 0.8,
            engine_volume: 0.6,

            reduced_motion: false,

            debug_physics: false,
            seed: None,
        }
    }
}

impl Settings {
    /// Create settings from a quality preset
    pub fn from_preset(preset: QualityPreset) -> Self {
        Self {
            quality: preset,
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let mut settings: Self = serde_json::from_str(json)?;
        settings.clamp_volumes();
        Ok(settings)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    fn clamp_volumes(&mut self) {
        self.master_volume = self.master_volume.clamp(0.0, 1.0);
        self.engine_volume = self.engine_volume.clamp(0.0, 1.0);
    }

    /// Effective camera shake (respects reduced_motion)
    pub fn effective_camera_shake(&self) -> bool {
        self.camera_shake && !self.reduced_motion
    }

    /// Effective damage flash (respects reduced_motion)
    pub fn effective_damage_flash(&self) -> bool {
        self.damage_flash && !self.reduced_motion
    }

    /// Engine gain after the master volume
    pub fn effective_engine_volume(&self) -> f32 {
        self.master_volume * self.engine_volume
    }

    /// Effective particle count cap
    pub fn max_particles(&self) -> usize {
        if !self.particles {
            0
        } else {
            self.quality.max_particles()
        }
    }
}
