use super::OutputSink;
use crate::error::Result;
use image::RgbImage;
use minifb::{Window, WindowOptions};

pub const PREVIEW_TITLE: &str = "Image";

/// Live preview of captured frames.
///
/// Closing the window only stops the preview; capture carries on.
pub struct PreviewWindow {
    window: Window,
    buffer: Vec<u32>,
    closed: bool,
}

impl PreviewWindow {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        tracing::info!("Opening preview window ({}x{})", width, height);

        let window = Window::new(
            PREVIEW_TITLE,
            width as usize,
            height as usize,
            WindowOptions::default(),
        )?;

        Ok(Self {
            window,
            buffer: Vec::new(),
            closed: false,
        })
    }
}

/// Pack RGB pixels into minifb's 0RGB layout
fn pack_rgb(frame: &RgbImage, buffer: &mut Vec<u32>) {
    buffer.clear();
    buffer.extend(frame.pixels().map(|p| {
        let [r, g, b] = p.0;
        ((r as u32) << 16) | ((g as u32) << 8) | b as u32
    }));
}

impl OutputSink for PreviewWindow {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        if !self.window.is_open() {
            tracing::info!("Preview window closed, capture continues");
            self.closed = true;
            return Ok(());
        }

        pack_rgb(frame, &mut self.buffer);
        let (width, height) = frame.dimensions();
        self.window
            .update_with_buffer(&self.buffer, width as usize, height as usize)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn packs_pixels_row_major() {
        let mut frame = RgbImage::new(2, 1);
        frame.put_pixel(0, 0, Rgb([0x12, 0x34, 0x56]));
        frame.put_pixel(1, 0, Rgb([0xff, 0x00, 0x01]));

        let mut buffer = vec![7; 10];
        pack_rgb(&frame, &mut buffer);

        assert_eq!(buffer, vec![0x0012_3456, 0x00ff_0001]);
    }
}
