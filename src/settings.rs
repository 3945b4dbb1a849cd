//! Calibration settings persisted as JSON.

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::calibration::{Calibration, LeverId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub reverser: Calibration,
    pub throttle: Calibration,
    pub train_brake: Calibration,
    pub independent_brake: Calibration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            reverser: LeverId::Reverser.default_calibration(),
            throttle: LeverId::Throttle.default_calibration(),
            train_brake: LeverId::TrainBrake.default_calibration(),
            independent_brake: LeverId::IndependentBrake.default_calibration(),
        }
    }
}

impl Settings {
    pub fn calibration(&self, lever: LeverId) -> &Calibration {
        match lever {
            LeverId::Reverser => &self.reverser,
            LeverId::Throttle => &self.throttle,
            LeverId::TrainBrake => &self.train_brake,
            LeverId::IndependentBrake => &self.independent_brake,
        }
    }

    /// Whether the lever has a centre detent comes from the lever itself.
    pub fn set_calibration(&mut self, lever: LeverId, mut calibration: Calibration) {
        calibration.has_middle = lever.default_calibration().has_middle;
        match lever {
            LeverId::Reverser => self.reverser = calibration,
            LeverId::Throttle => self.throttle = calibration,
            LeverId::TrainBrake => self.train_brake = calibration,
            LeverId::IndependentBrake => self.independent_brake = calibration,
        }
    }

    /// Load settings. A missing file gives defaults; an unreadable or
    /// malformed one is an error, so the caller can avoid saving over it.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            info!("[CAL] No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let data =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let mut settings: Self =
            serde_json::from_str(&data).with_context(|| format!("parsing {}", path.display()))?;
        for lever in LeverId::ALL {
            let calibration = *settings.calibration(lever);
            settings.set_calibration(lever, calibration);
        }
        info!("[CAL] Loaded calibration from {}", path.display());
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).ok();
        }
        let data = serde_json::to_string_pretty(self)?;
        fs::write(path, data).with_context(|| format!("writing {}", path.display()))?;
        info!("[CAL] Saved calibration to {}", path.display());
        Ok(())
    }
}
