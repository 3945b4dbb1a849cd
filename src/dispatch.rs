//! Turns the edges of one poll into host control calls.
//!
//! Every control is handled independently and only when it changed on this
//! poll, so holding a lever still costs nothing.

use crate::state::RailDriverState;

/// Controls every drivable host loco exposes.
pub trait ControlSink {
    fn sand_on(&self) -> bool;
    fn set_sand(&mut self, on: bool);
    /// -1, 0 or 1; the position is the deflection.
    fn set_horn(&mut self, position: i8);
    /// 1.0 forward, 0.0 neutral, -1.0 reverse.
    fn set_reverser(&mut self, direction: f32);
    fn set_throttle(&mut self, value: f32);
    /// Applied fraction, 0.0 released.
    fn set_train_brake(&mut self, value: f32);
    fn set_independent_brake(&mut self, value: f32);

    /// Engine start/stop, for locos that have one.
    fn engine(&mut self) -> Option<&mut dyn EngineControl> {
        None
    }
}

pub trait EngineControl {
    fn is_engine_running(&self) -> bool;
    fn set_engine_running(&mut self, running: bool);
}

/// Reverser direction for the current lever position.
///
/// The side is decided on the raw clamped byte against `middle`, so an
/// inverted calibration swaps forward and reverse along with the wiring.
pub fn reverser_direction(state: &RailDriverState) -> f32 {
    let reverser = &state.reverser;
    if reverser.is_at_middle() {
        0.0
    } else if reverser.position() < reverser.calibration().middle {
        1.0
    } else {
        -1.0
    }
}

/// Forward this poll's changes to `host`. No host attached means nothing to
/// do this tick; the session holds the changes until one attaches.
pub fn apply(state: &RailDriverState, host: Option<&mut dyn ControlSink>) {
    let Some(host) = host else { return };

    if state.sand.is_pressed() {
        let on = !host.sand_on();
        host.set_sand(on);
    }

    if state.horn.is_changed() {
        host.set_horn(state.horn.position());
    }

    if state.reverser.is_changed() {
        host.set_reverser(reverser_direction(state));
    }

    if state.throttle.is_changed() {
        host.set_throttle(state.throttle.normalized_position());
    }

    // Max raw is "released", so invert to get the applied fraction.
    if state.train_brake.is_changed() {
        host.set_train_brake(1.0 - state.train_brake.normalized_position());
    }

    if state.independent_brake.is_changed() {
        host.set_independent_brake(1.0 - state.independent_brake.normalized_position());
    }

    if state.power.is_pressed() {
        if let Some(engine) = host.engine() {
            if !engine.is_engine_running() {
                engine.set_engine_running(true);
            }
        }
    }
}
