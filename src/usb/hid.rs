//! RailDriver frame source over hidapi.
//!
//! Reads are non-blocking: each poll drains whatever reports the device has
//! queued and keeps the newest, so a slow tick never works through a backlog
//! of stale lever positions.

use anyhow::Context;
use hidapi::{HidApi, HidDevice};
use tracing::{info, warn};

use crate::session::FrameSource;
use crate::state::FRAME_LEN;

/// P.I. Engineering.
pub const VENDOR_ID: u16 = 0x05F3;
/// RailDriver Modern Desktop.
pub const PRODUCT_ID: u16 = 0x00D2;
/// Consumer page; the RailDriver's input interface.
pub const USAGE_PAGE: u16 = 0x0C;

/// Upper bound on reports drained per poll.
const MAX_DRAIN: usize = 64;

pub struct HidFrameSource {
    device: HidDevice,
    product: String,
    frame: [u8; FRAME_LEN],
    /// False until the desk has sent a full report.
    received: bool,
    buf: [u8; 64],
}

impl HidFrameSource {
    /// Open the first matching device.
    ///
    /// Backends that cannot report usage pages give 0 for every interface, so
    /// a vendor/product match is accepted when no interface claims the
    /// consumer page.
    pub fn open() -> anyhow::Result<Self> {
        info!(
            "[HID] Looking for RailDriver {:04X}:{:04X}...",
            VENDOR_ID, PRODUCT_ID
        );
        let api = HidApi::new()?;

        let candidates: Vec<_> = api
            .device_list()
            .filter(|d| d.vendor_id() == VENDOR_ID && d.product_id() == PRODUCT_ID)
            .collect();
        let info = candidates
            .iter()
            .find(|d| d.usage_page() == USAGE_PAGE)
            .or_else(|| candidates.first())
            .with_context(|| {
                format!("no RailDriver found ({VENDOR_ID:04X}:{PRODUCT_ID:04X})")
            })?;

        let device = info.open_device(&api).context("opening RailDriver")?;
        device.set_blocking_mode(false)?;

        let product = device
            .get_product_string()
            .ok()
            .flatten()
            .unwrap_or_else(|| "RailDriver".to_string());

        Ok(Self {
            device,
            product,
            frame: [0u8; FRAME_LEN],
            received: false,
            buf: [0u8; 64],
        })
    }
}

impl FrameSource for HidFrameSource {
    fn frame_len(&self) -> usize {
        FRAME_LEN
    }

    /// hidapi strips the report id for unnumbered reports, so the payload is
    /// stored from index 1 to keep the desk's byte offsets.
    fn read_frame(&mut self) -> anyhow::Result<Option<&[u8]>> {
        for _ in 0..MAX_DRAIN {
            let n = self
                .device
                .read_timeout(&mut self.buf, 0)
                .context("RailDriver read failed")?;
            if n == 0 {
                break;
            }
            if n < FRAME_LEN - 1 {
                warn!("[HID] Short read: {n} bytes");
                continue;
            }
            self.frame[1..].copy_from_slice(&self.buf[..FRAME_LEN - 1]);
            self.received = true;
        }
        Ok(self.received.then_some(&self.frame[..]))
    }

    fn product(&self) -> String {
        self.product.clone()
    }
}
