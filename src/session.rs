//! One open desk: its frame source and decoded state.

use tracing::{debug, info};

use crate::calibration::{Calibration, CalibrationPoint, LeverId};
use crate::dispatch::{self, ControlSink};
use crate::settings::Settings;
use crate::state::{RailDriverState, FRAME_LEN};

/// Supplies one fixed-length frame per poll.
pub trait FrameSource {
    /// Constant for the lifetime of the source.
    fn frame_len(&self) -> usize;

    /// Latest frame, or `None` until the device has sent its first report.
    /// Repeats the previous frame when nothing new arrived since the last
    /// call.
    fn read_frame(&mut self) -> anyhow::Result<Option<&[u8]>>;

    fn product(&self) -> String;
}

/// An explicitly owned open device. Dropping it closes the device.
pub struct DeviceSession {
    source: Box<dyn FrameSource>,
    state: RailDriverState,
    /// State as of the last poll that had a host. Edges decoded since are
    /// measured against it once a host attaches.
    undelivered: Option<RailDriverState>,
}

impl DeviceSession {
    /// Panics if the source's frames are too short for the decoder.
    pub fn new(source: Box<dyn FrameSource>, settings: &Settings) -> Self {
        assert!(
            source.frame_len() >= FRAME_LEN,
            "frame source delivers {} bytes, decoder needs {FRAME_LEN}",
            source.frame_len()
        );
        Self {
            source,
            state: RailDriverState::new(settings),
            undelivered: None,
        }
    }

    /// Open the first RailDriver on the bus.
    pub fn open(settings: &Settings) -> anyhow::Result<Self> {
        let source = crate::usb::hid::HidFrameSource::open()?;
        let session = Self::new(Box::new(source), settings);
        info!("[HID] Opened {}", session.product());
        Ok(session)
    }

    pub fn product(&self) -> String {
        self.source.product()
    }

    pub fn state(&self) -> &RailDriverState {
        &self.state
    }

    /// Read, decode and dispatch one frame. Returns whether any control
    /// changed.
    ///
    /// Without a host the frame is still decoded, but the changes are held
    /// back and delivered on the first poll that has one.
    pub fn poll(&mut self, host: Option<&mut dyn ControlSink>) -> anyhow::Result<bool> {
        match (&host, self.undelivered.take()) {
            (None, baseline) => {
                self.undelivered = Some(baseline.unwrap_or_else(|| self.state.clone()));
            }
            (Some(_), Some(baseline)) => self.rewind_to(baseline),
            (Some(_), None) => {}
        }

        let Some(frame) = self.source.read_frame()? else {
            return Ok(false);
        };
        self.state.update_from(frame);

        let changed = self.state.has_any_change();
        if changed {
            debug!("[HID] State changed:\n{}", self.state.describe_all());
        }

        dispatch::apply(&self.state, host);
        Ok(changed)
    }

    /// Go back to `baseline`, keeping calibrations captured since.
    fn rewind_to(&mut self, mut baseline: RailDriverState) {
        for lever in LeverId::ALL {
            *baseline.lever_mut(lever).calibration_mut() = *self.state.lever(lever).calibration();
        }
        self.state = baseline;
    }

    /// Store the lever's current raw position as `point`, in both the live
    /// lever and `settings`.
    pub fn capture(
        &mut self,
        lever: LeverId,
        point: CalibrationPoint,
        settings: &mut Settings,
    ) -> Calibration {
        let state = self.state.lever_mut(lever);
        let raw = state.uncalibrated_position();
        state.calibration_mut().capture(point, raw);
        let calibration = *state.calibration();
        settings.set_calibration(lever, calibration);
        info!(
            "[CAL] {} {} = {raw} -> {calibration}",
            lever.name(),
            lever.point_label(point).unwrap_or("?")
        );
        calibration
    }

    pub fn reset(&mut self, lever: LeverId, settings: &mut Settings) -> Calibration {
        let state = self.state.lever_mut(lever);
        state.calibration_mut().reset();
        let calibration = *state.calibration();
        settings.set_calibration(lever, calibration);
        info!("[CAL] {} reset", lever.name());
        calibration
    }

    pub fn close(self) {
        info!("[HID] Closing {}", self.product());
    }
}
