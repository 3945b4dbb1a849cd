//! Stand-in host locos that log what the desk asks of them.
//!
//! Used when no simulation is linked in, and to check a freshly calibrated
//! desk drives every control the way the operator expects.

use serde::Serialize;
use tracing::info;

use crate::dispatch::{ControlSink, EngineControl};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LocoKind {
    /// Diesel shunter: has an engine the power button can start.
    Shunter,
    /// Steam loco: no engine start.
    Steam,
}

/// Last value the desk set on each control.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LocoControls {
    pub sand: bool,
    pub horn: i8,
    pub reverser: f32,
    pub throttle: f32,
    pub train_brake: f32,
    pub independent_brake: f32,
    /// None when the loco has no engine control.
    pub engine_running: Option<bool>,
}

pub struct LoggingLoco {
    kind: LocoKind,
    controls: LocoControls,
}

impl LoggingLoco {
    pub fn new(kind: LocoKind) -> Self {
        let engine_running = match kind {
            LocoKind::Shunter => Some(false),
            LocoKind::Steam => None,
        };
        Self {
            kind,
            controls: LocoControls {
                engine_running,
                ..LocoControls::default()
            },
        }
    }

    pub fn kind(&self) -> LocoKind {
        self.kind
    }

    pub fn controls(&self) -> &LocoControls {
        &self.controls
    }
}

impl ControlSink for LoggingLoco {
    fn sand_on(&self) -> bool {
        self.controls.sand
    }

    fn set_sand(&mut self, on: bool) {
        info!("[LOCO] Sand {}", if on { "on" } else { "off" });
        self.controls.sand = on;
    }

    fn set_horn(&mut self, position: i8) {
        info!("[LOCO] Horn {position}");
        self.controls.horn = position;
    }

    fn set_reverser(&mut self, direction: f32) {
        info!("[LOCO] Reverser {direction}");
        self.controls.reverser = direction;
    }

    fn set_throttle(&mut self, value: f32) {
        info!("[LOCO] Throttle {value:.3}");
        self.controls.throttle = value;
    }

    fn set_train_brake(&mut self, value: f32) {
        info!("[LOCO] Train brake {value:.3}");
        self.controls.train_brake = value;
    }

    fn set_independent_brake(&mut self, value: f32) {
        info!("[LOCO] Independent brake {value:.3}");
        self.controls.independent_brake = value;
    }

    fn engine(&mut self) -> Option<&mut dyn EngineControl> {
        match self.kind {
            LocoKind::Shunter => Some(self as &mut dyn EngineControl),
            LocoKind::Steam => None,
        }
    }
}

impl EngineControl for LoggingLoco {
    fn is_engine_running(&self) -> bool {
        self.controls.engine_running == Some(true)
    }

    fn set_engine_running(&mut self, running: bool) {
        info!("[LOCO] Engine {}", if running { "started" } else { "stopped" });
        self.controls.engine_running = Some(running);
    }
}
