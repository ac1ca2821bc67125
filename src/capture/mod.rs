mod webcam;

pub use webcam::WebcamCapture;

use crate::error::Result;
use image::RgbImage;

/// Highest device index (exclusive) tried by [`show_all_cameras`].
pub const PROBE_LIMIT: u32 = 10;

/// Trait for camera capture sources
pub trait CaptureSource {
    /// Capture a single frame
    fn capture_frame(&mut self) -> Result<RgbImage>;

    /// Resolution the device reports, which may differ from the one requested
    fn resolution(&self) -> (u32, u32);
}

impl<S: CaptureSource + ?Sized> CaptureSource for Box<S> {
    fn capture_frame(&mut self) -> Result<RgbImage> {
        (**self).capture_frame()
    }

    fn resolution(&self) -> (u32, u32) {
        (**self).resolution()
    }
}

/// Probe device indices `0..limit` in order, keeping those that deliver a
/// frame. Stops at the first index that fails to open or read, so only a
/// contiguous prefix is ever reported.
pub fn probe_cameras<S, F>(limit: u32, mut open: F) -> Vec<u32>
where
    S: CaptureSource,
    F: FnMut(u32) -> Result<S>,
{
    let mut found = Vec::new();
    for index in 0..limit {
        let mut source = match open(index) {
            Ok(source) => source,
            Err(e) => {
                tracing::debug!("camera {} failed to open: {}", index, e);
                break;
            }
        };
        match source.capture_frame() {
            Ok(_) => found.push(index),
            Err(e) => {
                tracing::debug!("camera {} failed to read: {}", index, e);
                break;
            }
        }
        // dropping the source releases the device
    }
    found
}

/// Working webcam indices, probed linearly from 0.
pub fn show_all_cameras() -> Vec<u32> {
    probe_cameras(PROBE_LIMIT, WebcamCapture::probe)
}
