//! Lever calibration model.
//!
//! A calibration maps a lever's raw byte travel onto its logical range. The
//! breakpoints are captured by the operator from the lever's raw position, so
//! nothing orders them: `min > max` is a valid reverse-wired lever.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Raw-byte breakpoints for one lever.
///
/// Only the breakpoints are persisted; missing ones take their defaults.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Calibration {
    pub min: u8,
    pub max: u8,
    pub middle: u8,
    /// Set from the lever, never from a settings file.
    #[serde(skip)]
    pub has_middle: bool,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            min: u8::MIN,
            max: u8::MAX,
            middle: u8::MIN,
            has_middle: false,
        }
    }
}

impl Calibration {
    pub fn new(min: u8, max: u8) -> Self {
        Self {
            min,
            max,
            ..Self::default()
        }
    }

    /// Uncalibrated range with a centre detent.
    pub fn with_middle_detent() -> Self {
        Self {
            has_middle: true,
            ..Self::default()
        }
    }

    pub fn with_middle(mut self, middle: u8) -> Self {
        self.middle = middle;
        self.has_middle = true;
        self
    }

    /// Store `raw` as the given breakpoint.
    ///
    /// Panics when capturing a middle on a lever without a centre detent.
    pub fn capture(&mut self, point: CalibrationPoint, raw: u8) {
        match point {
            CalibrationPoint::Min => self.min = raw,
            CalibrationPoint::Max => self.max = raw,
            CalibrationPoint::Middle => {
                assert!(self.has_middle, "lever has no middle breakpoint");
                self.middle = raw;
            }
        }
    }

    /// Back to the full byte range. Whether the lever has a detent is a
    /// property of the hardware and survives the reset.
    pub fn reset(&mut self) {
        self.min = u8::MIN;
        self.max = u8::MAX;
        self.middle = u8::MIN;
    }
}

impl fmt::Display for Calibration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_middle {
            write!(f, "{{min: {}, middle: {}, max: {}}}", self.min, self.middle, self.max)
        } else {
            write!(f, "{{min: {}, max: {}}}", self.min, self.max)
        }
    }
}

/// The calibrated levers on the desk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeverId {
    Reverser,
    Throttle,
    TrainBrake,
    IndependentBrake,
}

impl LeverId {
    pub const ALL: [LeverId; 4] = [
        LeverId::Reverser,
        LeverId::Throttle,
        LeverId::TrainBrake,
        LeverId::IndependentBrake,
    ];

    pub fn name(self) -> &'static str {
        match self {
            LeverId::Reverser => "Reverser",
            LeverId::Throttle => "Throttle",
            LeverId::TrainBrake => "Train Brake",
            LeverId::IndependentBrake => "Independent Brake",
        }
    }

    /// Byte offset of this lever in a frame.
    pub fn byte_index(self) -> usize {
        match self {
            LeverId::Reverser => 1,
            LeverId::Throttle => 2,
            LeverId::TrainBrake => 3,
            LeverId::IndependentBrake => 4,
        }
    }

    /// Factory calibration for this lever.
    pub fn default_calibration(self) -> Calibration {
        match self {
            LeverId::Reverser => Calibration::with_middle_detent(),
            _ => Calibration::default(),
        }
    }

    /// Operator-facing label for a breakpoint, e.g. "Full Brake".
    pub fn point_label(self, point: CalibrationPoint) -> Option<&'static str> {
        match (self, point) {
            (LeverId::Reverser, CalibrationPoint::Min) => Some("Forward"),
            (LeverId::Reverser, CalibrationPoint::Middle) => Some("Neutral"),
            (LeverId::Reverser, CalibrationPoint::Max) => Some("Reverse"),
            (LeverId::Throttle, CalibrationPoint::Min) => Some("Zero Throttle"),
            (LeverId::Throttle, CalibrationPoint::Max) => Some("Full Throttle"),
            (LeverId::TrainBrake | LeverId::IndependentBrake, CalibrationPoint::Min) => {
                Some("Full Brake")
            }
            (LeverId::TrainBrake | LeverId::IndependentBrake, CalibrationPoint::Max) => {
                Some("Released")
            }
            (_, CalibrationPoint::Middle) => None,
        }
    }

    /// Parse the snake_case name used on the control surface.
    pub fn from_path(s: &str) -> Option<Self> {
        match s {
            "reverser" => Some(LeverId::Reverser),
            "throttle" => Some(LeverId::Throttle),
            "train_brake" => Some(LeverId::TrainBrake),
            "independent_brake" => Some(LeverId::IndependentBrake),
            _ => None,
        }
    }
}

/// Which breakpoint a capture writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationPoint {
    Min,
    Middle,
    Max,
}

impl CalibrationPoint {
    pub fn from_path(s: &str) -> Option<Self> {
        match s {
            "min" => Some(CalibrationPoint::Min),
            "middle" => Some(CalibrationPoint::Middle),
            "max" => Some(CalibrationPoint::Max),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_full_range() {
        let cal = Calibration::default();
        assert_eq!(cal.min, 0);
        assert_eq!(cal.max, 255);
        assert_eq!(cal.middle, 0);
        assert!(!cal.has_middle);
    }

    #[test]
    fn test_only_reverser_has_detent() {
        for lever in LeverId::ALL {
            let has_middle = lever.default_calibration().has_middle;
            assert_eq!(has_middle, lever == LeverId::Reverser, "{lever:?}");
            assert_eq!(
                lever.point_label(CalibrationPoint::Middle).is_some(),
                has_middle
            );
        }
    }

    #[test]
    fn test_capture_each_point() {
        let mut cal = Calibration::with_middle_detent();
        cal.capture(CalibrationPoint::Min, 40);
        cal.capture(CalibrationPoint::Middle, 120);
        cal.capture(CalibrationPoint::Max, 210);
        assert_eq!(cal, Calibration::new(40, 210).with_middle(120));
    }

    #[test]
    fn test_capture_allows_inverted_range() {
        let mut cal = Calibration::default();
        cal.capture(CalibrationPoint::Min, 200);
        cal.capture(CalibrationPoint::Max, 50);
        assert_eq!((cal.min, cal.max), (200, 50));
    }

    #[test]
    #[should_panic(expected = "no middle")]
    fn test_capture_middle_without_detent_panics() {
        let mut cal = Calibration::default();
        cal.capture(CalibrationPoint::Middle, 100);
    }

    #[test]
    fn test_reset_keeps_detent() {
        let mut cal = Calibration::new(10, 20).with_middle(15);
        cal.reset();
        assert_eq!(cal, Calibration::with_middle_detent());
    }

    #[test]
    fn test_serialized_form_has_only_breakpoints() {
        let json = serde_json::to_value(Calibration::new(5, 250).with_middle(128)).unwrap();
        assert_eq!(json, serde_json::json!({"min": 5, "max": 250, "middle": 128}));

        let cal: Calibration = serde_json::from_str(r#"{"max": 200, "has_middle": true}"#).unwrap();
        assert_eq!(cal, Calibration::new(0, 200));
    }

    #[test]
    fn test_path_names() {
        for lever in LeverId::ALL {
            let json = serde_json::to_string(&lever).unwrap();
            let path = json.trim_matches('"');
            assert_eq!(LeverId::from_path(path), Some(lever));
        }
        assert_eq!(LeverId::from_path("bell"), None);
        assert_eq!(CalibrationPoint::from_path("middle"), Some(CalibrationPoint::Middle));
        assert_eq!(CalibrationPoint::from_path("centre"), None);
    }
}
