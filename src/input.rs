//! Edge-detecting decoders for the individual desk controls.
//!
//! RailDriver input report (15 bytes, index 0 is the report id):
//!   [1]     = Reverser lever
//!   [2]     = Throttle lever
//!   [3]     = Train (automatic) brake lever
//!   [4]     = Independent brake lever
//!   [5..12] = Bail-off, wiper, lights and keypad bytes (not decoded)
//!   [12]    = Sand (0x80), Power (0x40)
//!   [13]    = Horn up (0x04) / down (0x08)
//!
//! Every decoder keeps the value from the previous poll so callers can react
//! to edges instead of levels.

use std::fmt;

use crate::calibration::Calibration;

/// Raw distance to a calibrated end-stop that still counts as the end-stop.
pub const SNAP_BAND: i32 = 3;

/// Raw distance to the middle breakpoint that counts as centred.
pub const MIDDLE_BAND: i32 = 15;

/// A single bit in the frame.
#[derive(Clone, Debug)]
pub struct ButtonState {
    name: &'static str,
    byte_index: usize,
    mask: u8,
    current: bool,
    previous: bool,
}

impl ButtonState {
    pub fn new(name: &'static str, byte_index: usize, mask: u8) -> Self {
        Self {
            name,
            byte_index,
            mask,
            current: false,
            previous: false,
        }
    }

    pub fn update_from(&mut self, frame: &[u8]) {
        self.previous = self.current;
        self.current = frame[self.byte_index] & self.mask != 0;
    }

    pub fn is_changed(&self) -> bool {
        self.current != self.previous
    }

    pub fn is_down(&self) -> bool {
        self.current
    }

    /// Rising edge: went down on this poll.
    pub fn is_pressed(&self) -> bool {
        self.current && !self.previous
    }
}

impl fmt::Display for ButtonState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, if self.current { "down" } else { "up" })
    }
}

/// A three-position rocker driven by two bits of the same byte.
#[derive(Clone, Debug)]
pub struct SwitchState {
    name: &'static str,
    byte_index: usize,
    up_mask: u8,
    down_mask: u8,
    current: i8,
    previous: i8,
}

impl SwitchState {
    pub fn new(name: &'static str, byte_index: usize, up_mask: u8, down_mask: u8) -> Self {
        Self {
            name,
            byte_index,
            up_mask,
            down_mask,
            current: 0,
            previous: 0,
        }
    }

    /// Up is tested first, so it wins if the hardware ever reports both.
    pub fn update_from(&mut self, frame: &[u8]) {
        self.previous = self.current;
        let byte = frame[self.byte_index];
        self.current = if byte & self.up_mask != 0 {
            1
        } else if byte & self.down_mask != 0 {
            -1
        } else {
            0
        };
    }

    pub fn is_changed(&self) -> bool {
        self.current != self.previous
    }

    /// -1 (down), 0 (centre) or 1 (up).
    pub fn position(&self) -> i8 {
        self.current
    }
}

impl fmt::Display for SwitchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.current)
    }
}

/// An analogue lever read as one byte and clamped to its calibration.
#[derive(Clone, Debug)]
pub struct LeverState {
    name: &'static str,
    byte_index: usize,
    calibration: Calibration,
    current: u8,
    unclamped: u8,
    previous: u8,
}

impl LeverState {
    pub fn new(name: &'static str, byte_index: usize, calibration: Calibration) -> Self {
        Self {
            name,
            byte_index,
            calibration,
            current: 0,
            unclamped: 0,
            previous: 0,
        }
    }

    /// Clamp is two ordered branches, not `clamp(min, max)`: with an
    /// inverted calibration (`min > max`) every byte above `max` lands on
    /// `max` and everything else lands on `min`.
    pub fn update_from(&mut self, frame: &[u8]) {
        self.previous = self.current;
        self.unclamped = frame[self.byte_index];

        let Calibration { min, max, .. } = self.calibration;
        self.current = if self.unclamped > max {
            max
        } else if self.unclamped < min {
            min
        } else {
            self.unclamped
        };
    }

    pub fn is_changed(&self) -> bool {
        self.current != self.previous
    }

    /// Clamped position.
    pub fn position(&self) -> u8 {
        self.current
    }

    /// Raw byte from the last frame, used when capturing a calibration.
    pub fn uncalibrated_position(&self) -> u8 {
        self.unclamped
    }

    /// Position mapped onto [0, 1], snapping to the ends within [`SNAP_BAND`].
    pub fn normalized_position(&self) -> f32 {
        let position = self.current as i32;
        let min = self.calibration.min as i32;
        let max = self.calibration.max as i32;

        if (max - position).abs() < SNAP_BAND {
            return 1.0;
        }
        if (min - position).abs() < SNAP_BAND {
            return 0.0;
        }

        (position - min) as f32 / (max - min) as f32
    }

    /// Always false for levers without a centre detent.
    pub fn is_at_middle(&self) -> bool {
        self.calibration.has_middle
            && (self.current as i32 - self.calibration.middle as i32).abs() < MIDDLE_BAND
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    /// Only call between polls; the next `update_from` clamps against it.
    pub fn calibration_mut(&mut self) -> &mut Calibration {
        &mut self.calibration
    }
}

impl fmt::Display for LeverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} (raw {}, normalized {:.3}, calibration {})",
            self.name,
            self.current,
            self.unclamped,
            self.normalized_position(),
            self.calibration
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a frame with a single byte set.
    fn frame_with(index: usize, value: u8) -> [u8; 15] {
        let mut f = [0u8; 15];
        f[index] = value;
        f
    }

    fn lever_at(calibration: Calibration, raw: u8) -> LeverState {
        let mut lever = LeverState::new("Test", 2, calibration);
        lever.update_from(&frame_with(2, raw));
        lever
    }

    #[test]
    fn test_button_tracks_mask_for_every_byte() {
        for mask in [0x01u8, 0x40, 0x80] {
            for b in 0..=u8::MAX {
                let mut button = ButtonState::new("Sand", 12, mask);
                button.update_from(&frame_with(12, b));
                assert_eq!(button.is_down(), b & mask != 0, "byte {b:#04x} mask {mask:#04x}");
            }
        }
    }

    #[test]
    fn test_button_change_detection() {
        let mut button = ButtonState::new("Sand", 12, 0x80);
        button.update_from(&frame_with(12, 0x80));
        assert!(button.is_changed());
        assert!(button.is_pressed());

        button.update_from(&frame_with(12, 0x80));
        assert!(!button.is_changed());
        assert!(!button.is_pressed());
        assert!(button.is_down());

        // Other bits in the byte do not matter
        button.update_from(&frame_with(12, 0x7F));
        assert!(button.is_changed());
        assert!(!button.is_down());
        assert!(!button.is_pressed());
    }

    #[test]
    fn test_switch_positions() {
        let mut horn = SwitchState::new("Horn", 13, 0x04, 0x08);
        let cases = [(0x00u8, 0i8), (0x04, 1), (0x08, -1), (0x0C, 1), (0xF3, 0)];
        for (byte, expected) in cases {
            horn.update_from(&frame_with(13, byte));
            assert_eq!(horn.position(), expected, "byte {byte:#04x}");
        }
    }

    #[test]
    fn test_switch_up_wins_over_down() {
        let mut horn = SwitchState::new("Horn", 13, 0x04, 0x08);
        horn.update_from(&frame_with(13, 0x08));
        assert_eq!(horn.position(), -1);
        horn.update_from(&frame_with(13, 0x0C));
        assert_eq!(horn.position(), 1);
        assert!(horn.is_changed());
    }

    #[test]
    fn test_switch_change_detection() {
        let mut horn = SwitchState::new("Horn", 13, 0x04, 0x08);
        horn.update_from(&frame_with(13, 0x00));
        assert!(!horn.is_changed());
        horn.update_from(&frame_with(13, 0x04));
        assert!(horn.is_changed());
        horn.update_from(&frame_with(13, 0x04));
        assert!(!horn.is_changed());
    }

    #[test]
    fn test_lever_clamp() {
        let cal = Calibration::new(50, 200);
        assert_eq!(lever_at(cal, 30).position(), 50);
        assert_eq!(lever_at(cal, 220).position(), 200);
        assert_eq!(lever_at(cal, 120).position(), 120);
        assert_eq!(lever_at(cal, 30).uncalibrated_position(), 30);
        assert_eq!(lever_at(cal, 220).uncalibrated_position(), 220);
    }

    #[test]
    fn test_lever_inverted_clamp_is_asymmetric() {
        // Above max goes to max, everything else fails the first branch and
        // is below min, so it goes to min.
        let cal = Calibration::new(200, 50);
        assert_eq!(lever_at(cal, 30).position(), 200);
        assert_eq!(lever_at(cal, 50).position(), 200);
        assert_eq!(lever_at(cal, 51).position(), 50);
        assert_eq!(lever_at(cal, 120).position(), 50);
        assert_eq!(lever_at(cal, 220).position(), 50);

        assert_eq!(lever_at(cal, 120).normalized_position(), 1.0);
        assert_eq!(lever_at(cal, 30).normalized_position(), 0.0);
    }

    #[test]
    fn test_normalized_snap_band() {
        let cal = Calibration::new(50, 200);
        assert_eq!(lever_at(cal, 198).normalized_position(), 1.0);
        assert_eq!(lever_at(cal, 200).normalized_position(), 1.0);
        assert_eq!(lever_at(cal, 52).normalized_position(), 0.0);
        assert_eq!(lever_at(cal, 10).normalized_position(), 0.0);

        let mid = lever_at(cal, 125).normalized_position();
        assert!((mid - 0.5).abs() < 1e-6, "got {mid}");

        // Just outside the band is interpolated
        let near_max = lever_at(cal, 197).normalized_position();
        assert!(near_max < 1.0 && near_max > 0.97, "got {near_max}");
        let near_min = lever_at(cal, 53).normalized_position();
        assert!(near_min > 0.0 && near_min < 0.03, "got {near_min}");
    }

    #[test]
    fn test_uncalibrated_lever_spans_byte_range() {
        let cal = Calibration::default();
        assert_eq!(lever_at(cal, 0).normalized_position(), 0.0);
        assert_eq!(lever_at(cal, 255).normalized_position(), 1.0);
        let v = lever_at(cal, 51).normalized_position();
        assert!((v - 0.2).abs() < 1e-6, "got {v}");
    }

    #[test]
    fn test_degenerate_calibration_does_not_divide_by_zero() {
        let cal = Calibration::new(90, 90);
        for raw in [0u8, 90, 255] {
            let v = lever_at(cal, raw).normalized_position();
            assert_eq!(v, 1.0);
        }
    }

    #[test]
    fn test_middle_detection() {
        let cal = Calibration::default().with_middle(100);
        assert!(lever_at(cal, 90).is_at_middle());
        assert!(lever_at(cal, 114).is_at_middle());
        assert!(!lever_at(cal, 80).is_at_middle());
        assert!(!lever_at(cal, 85).is_at_middle());
        assert!(!lever_at(cal, 115).is_at_middle());
    }

    #[test]
    fn test_middle_needs_detent() {
        let mut cal = Calibration::default();
        cal.middle = 100;
        assert!(!lever_at(cal, 100).is_at_middle());
    }

    #[test]
    fn test_lever_change_detection_uses_clamped_value() {
        let mut lever = LeverState::new("Throttle", 2, Calibration::new(50, 200));
        lever.update_from(&frame_with(2, 10));
        assert!(lever.is_changed());
        // Different raw byte, same clamped position
        lever.update_from(&frame_with(2, 20));
        assert!(!lever.is_changed());
        assert_eq!(lever.uncalibrated_position(), 20);
    }

    #[test]
    fn test_recalibration_applies_on_next_update() {
        let mut lever = LeverState::new("Throttle", 2, Calibration::default());
        lever.update_from(&frame_with(2, 30));
        assert_eq!(lever.position(), 30);
        lever.calibration_mut().min = 40;
        assert_eq!(lever.position(), 30);
        lever.update_from(&frame_with(2, 30));
        assert_eq!(lever.position(), 40);
    }

    #[test]
    #[should_panic]
    fn test_short_frame_panics() {
        let mut button = ButtonState::new("Sand", 12, 0x80);
        button.update_from(&[0u8; 4]);
    }
}
