mod window;

pub use window::PreviewWindow;

use crate::error::Result;
use image::RgbImage;

/// Trait for frame display targets
pub trait OutputSink {
    /// Show a frame
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()>;
}

/// Sink for headless runs.
pub struct NoPreview;

impl OutputSink for NoPreview {
    fn write_frame(&mut self, _frame: &RgbImage) -> Result<()> {
        Ok(())
    }
}

impl<O: OutputSink + ?Sized> OutputSink for Box<O> {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        (**self).write_frame(frame)
    }
}
