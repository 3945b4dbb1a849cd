//! Shared bridge state and control-surface command types.

use std::sync::Mutex;

use serde::Serialize;

use crate::calibration::{CalibrationPoint, LeverId};
use crate::loco::{LocoControls, LocoKind};
use crate::settings::Settings;
use crate::state::{format_bytes, RailDriverState};

/// Commands the control surface can send to the poll loop. Applied between
/// polls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebCommand {
    Enable,
    Disable,
    Capture(LeverId, CalibrationPoint),
    Reset(LeverId),
    SaveSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeverSnapshot {
    pub lever: LeverId,
    pub position: u8,
    pub raw: u8,
    pub normalized: f32,
    pub at_middle: bool,
}

/// Decoded desk controls as of the last poll.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlsSnapshot {
    pub sand: bool,
    pub power: bool,
    pub horn: i8,
    pub levers: Vec<LeverSnapshot>,
    pub frame: String,
}

impl ControlsSnapshot {
    pub fn from_state(state: &RailDriverState) -> Self {
        let levers = LeverId::ALL
            .into_iter()
            .map(|id| {
                let lever = state.lever(id);
                LeverSnapshot {
                    lever: id,
                    position: lever.position(),
                    raw: lever.uncalibrated_position(),
                    normalized: lever.normalized_position(),
                    at_middle: lever.is_at_middle(),
                }
            })
            .collect();
        Self {
            sand: state.sand.is_down(),
            power: state.power.is_down(),
            horn: state.horn.position(),
            levers,
            frame: format_bytes(state.last_frame()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateSnapshot {
    pub enabled: bool,
    pub product: Option<String>,
    pub controls: Option<ControlsSnapshot>,
    pub calibration: Settings,
    pub loco: Option<LocoKind>,
    pub loco_controls: Option<LocoControls>,
}

pub struct BridgeState {
    inner: Mutex<StateSnapshot>,
}

impl BridgeState {
    pub fn new(settings: &Settings) -> Self {
        Self {
            inner: Mutex::new(StateSnapshot {
                enabled: false,
                product: None,
                controls: None,
                calibration: settings.clone(),
                loco: None,
                loco_controls: None,
            }),
        }
    }

    pub fn update(&self, snapshot: StateSnapshot) {
        *self.inner.lock().unwrap() = snapshot;
    }

    pub fn snapshot(&self) -> StateSnapshot {
        self.inner.lock().unwrap().clone()
    }

    pub fn snapshot_json(&self) -> serde_json::Value {
        serde_json::to_value(self.snapshot()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::FRAME_LEN;

    #[test]
    fn test_controls_snapshot_from_state() {
        let mut state = RailDriverState::new(&Settings::default());
        let mut frame = [0u8; FRAME_LEN];
        frame[1] = 5;
        frame[2] = 255;
        frame[13] = 0x08;
        state.update_from(&frame);

        let snap = ControlsSnapshot::from_state(&state);
        assert!(!snap.sand);
        assert_eq!(snap.horn, -1);
        assert_eq!(snap.levers.len(), 4);
        assert_eq!(snap.levers[0].lever, LeverId::Reverser);
        assert_eq!(snap.levers[0].raw, 5);
        assert_eq!(snap.levers[1].normalized, 1.0);
        assert!(snap.frame.starts_with("00 05 FF"));
    }

    #[test]
    fn test_snapshot_json_shape() {
        let state = BridgeState::new(&Settings::default());
        let json = state.snapshot_json();
        assert_eq!(json["enabled"], false);
        assert!(json["controls"].is_null());
        assert_eq!(json["calibration"]["reverser"]["middle"], 0);
        assert!(json["calibration"]["reverser"].get("has_middle").is_none());
        assert_eq!(json["calibration"]["throttle"]["max"], 255);
    }

    #[test]
    fn test_update_replaces_snapshot() {
        let state = BridgeState::new(&Settings::default());
        let mut snap = state.snapshot();
        snap.enabled = true;
        snap.product = Some("RailDriver".into());
        snap.loco = Some(LocoKind::Shunter);
        state.update(snap.clone());
        assert_eq!(state.snapshot(), snap);
        assert_eq!(state.snapshot_json()["loco"], "shunter");
    }
}
