use super::CaptureSource;
use crate::config::SessionConfig;
use crate::error::{CollectError, Result};
use image::RgbImage;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution};
use nokhwa::Camera;

pub struct WebcamCapture {
    /// `None` when the device could not be opened; reads then always fail.
    camera: Option<Camera>,
    index: u32,
    width: u32,
    height: u32,
}

impl WebcamCapture {
    /// Open the device and request MJPEG at the configured resolution.
    ///
    /// The device may ignore the request. Whatever it reports afterwards is
    /// what [`CaptureSource::resolution`] returns. A device that fails to
    /// open still yields a capture whose every read fails, so a session on
    /// it ends at its first frame.
    pub fn open(config: &SessionConfig) -> Self {
        tracing::info!(
            "Initializing webcam {} at {}x{}",
            config.device_index,
            config.width,
            config.height
        );

        match Self::configure(config) {
            Ok((camera, reported)) => {
                tracing::info!("Is camera open? {}", camera.is_stream_open());
                Self {
                    camera: Some(camera),
                    index: config.device_index,
                    width: reported.width(),
                    height: reported.height(),
                }
            }
            Err(e) => {
                tracing::warn!("Failed to open camera {}: {}", config.device_index, e);
                tracing::info!("Is camera open? false");
                Self::closed(config)
            }
        }
    }

    fn closed(config: &SessionConfig) -> Self {
        Self {
            camera: None,
            index: config.device_index,
            width: config.width,
            height: config.height,
        }
    }

    fn configure(config: &SessionConfig) -> Result<(Camera, Resolution)> {
        let index = CameraIndex::Index(config.device_index);
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::None);
        let mut camera = Camera::new(index, requested)?;

        let before = camera.resolution();
        tracing::info!("FRAME_WIDTH = {}", before.width());
        tracing::info!("FRAME_HEIGHT = {}", before.height());

        if let Err(e) = camera.set_frame_format(FrameFormat::MJPEG) {
            tracing::warn!("Device refused MJPEG: {}", e);
        }
        if let Err(e) = camera.set_resolution(Resolution::new(config.width, config.height)) {
            tracing::warn!(
                "Device refused {}x{}: {}",
                config.width,
                config.height,
                e
            );
        }

        let after = camera.resolution();
        tracing::info!("FRAME_WIDTH = {}", after.width());
        tracing::info!("FRAME_HEIGHT = {}", after.height());
        if (after.width(), after.height()) != (config.width, config.height) {
            tracing::warn!(
                "Requested {}x{} but device reports {}x{}",
                config.width,
                config.height,
                after.width(),
                after.height()
            );
        }

        camera.open_stream()?;
        Ok((camera, after))
    }

    /// Open the device at `index` with default settings, for enumeration.
    pub fn probe(index: u32) -> Result<Self> {
        let config = SessionConfig {
            device_index: index,
            ..SessionConfig::default()
        };
        Ok(Self::open(&config))
    }
}

impl CaptureSource for WebcamCapture {
    fn capture_frame(&mut self) -> Result<RgbImage> {
        let camera = self
            .camera
            .as_mut()
            .ok_or(CollectError::DeviceClosed(self.index))?;
        let frame = camera.frame()?;
        let decoded = frame.decode_image::<RgbFormat>()?;
        Ok(decoded)
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_device_never_delivers() {
        let config = SessionConfig {
            device_index: 2,
            ..SessionConfig::default()
        };
        let mut capture = WebcamCapture::closed(&config);

        assert_eq!(capture.resolution(), (640, 480));
        assert!(matches!(
            capture.capture_frame(),
            Err(CollectError::DeviceClosed(2))
        ));
        assert!(capture.capture_frame().is_err());
    }
}
