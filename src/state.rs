//! Decoded state of the whole desk.

use std::fmt::Write as _;

use crate::calibration::LeverId;
use crate::input::{ButtonState, LeverState, SwitchState};
use crate::settings::Settings;

/// Length of one input report, report id included.
pub const FRAME_LEN: usize = 15;

pub const SAND_BYTE: usize = 12;
pub const SAND_MASK: u8 = 0x80;
pub const POWER_BYTE: usize = 12;
pub const POWER_MASK: u8 = 0x40;
pub const HORN_BYTE: usize = 13;
pub const HORN_UP_MASK: u8 = 0x04;
pub const HORN_DOWN_MASK: u8 = 0x08;

/// Every decoded control, updated in place once per poll.
#[derive(Clone, Debug)]
pub struct RailDriverState {
    pub sand: ButtonState,
    pub power: ButtonState,
    pub horn: SwitchState,
    pub reverser: LeverState,
    pub throttle: LeverState,
    pub train_brake: LeverState,
    pub independent_brake: LeverState,
    last_frame: Vec<u8>,
}

impl RailDriverState {
    /// Levers take a copy of their calibration from `settings`.
    pub fn new(settings: &Settings) -> Self {
        let lever = |id: LeverId| LeverState::new(id.name(), id.byte_index(), *settings.calibration(id));
        Self {
            sand: ButtonState::new("Sand", SAND_BYTE, SAND_MASK),
            power: ButtonState::new("Power", POWER_BYTE, POWER_MASK),
            horn: SwitchState::new("Horn", HORN_BYTE, HORN_UP_MASK, HORN_DOWN_MASK),
            reverser: lever(LeverId::Reverser),
            throttle: lever(LeverId::Throttle),
            train_brake: lever(LeverId::TrainBrake),
            independent_brake: lever(LeverId::IndependentBrake),
            last_frame: Vec::with_capacity(FRAME_LEN),
        }
    }

    /// Decode one frame: buttons, then switches, then levers.
    ///
    /// Panics if the frame is shorter than [`FRAME_LEN`]; that is a wiring
    /// bug between the frame source and the decoder.
    pub fn update_from(&mut self, frame: &[u8]) {
        assert!(
            frame.len() >= FRAME_LEN,
            "frame is {} bytes, decoder needs {FRAME_LEN}",
            frame.len()
        );

        for button in self.buttons_mut() {
            button.update_from(frame);
        }
        self.horn.update_from(frame);
        for lever in self.levers_mut() {
            lever.update_from(frame);
        }

        self.last_frame.clear();
        self.last_frame.extend_from_slice(frame);
    }

    pub fn has_any_change(&self) -> bool {
        self.buttons().iter().any(|b| b.is_changed())
            || self.horn.is_changed()
            || self.levers().iter().any(|l| l.is_changed())
    }

    pub fn lever(&self, id: LeverId) -> &LeverState {
        match id {
            LeverId::Reverser => &self.reverser,
            LeverId::Throttle => &self.throttle,
            LeverId::TrainBrake => &self.train_brake,
            LeverId::IndependentBrake => &self.independent_brake,
        }
    }

    pub fn lever_mut(&mut self, id: LeverId) -> &mut LeverState {
        match id {
            LeverId::Reverser => &mut self.reverser,
            LeverId::Throttle => &mut self.throttle,
            LeverId::TrainBrake => &mut self.train_brake,
            LeverId::IndependentBrake => &mut self.independent_brake,
        }
    }

    pub fn last_frame(&self) -> &[u8] {
        &self.last_frame
    }

    /// Multi-line dump for the log. Not a stable format.
    pub fn describe_all(&self) -> String {
        let mut out = String::from("{\n");
        for button in self.buttons() {
            let _ = writeln!(out, "  {button},");
        }
        let _ = writeln!(out, "  {},", self.horn);
        for lever in self.levers() {
            let _ = writeln!(out, "  {lever},");
        }
        out.push('}');
        let _ = write!(out, "\nframe: {}", format_bytes(&self.last_frame));
        out
    }

    fn buttons(&self) -> [&ButtonState; 2] {
        [&self.sand, &self.power]
    }

    fn buttons_mut(&mut self) -> [&mut ButtonState; 2] {
        [&mut self.sand, &mut self.power]
    }

    fn levers(&self) -> [&LeverState; 4] {
        [&self.reverser, &self.throttle, &self.train_brake, &self.independent_brake]
    }

    fn levers_mut(&mut self) -> [&mut LeverState; 4] {
        [
            &mut self.reverser,
            &mut self.throttle,
            &mut self.train_brake,
            &mut self.independent_brake,
        ]
    }
}

/// Space-separated upper-case hex, e.g. `00 7F 80`.
pub fn format_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}
