use crate::error::{CollectError, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Image id ceiling used when wrap-around is enabled.
pub const WRAP_CEILING: u64 = 1_000_000;

/// Width of the batch sequence line.
pub const BATCH_INDEX_WIDTH: usize = 6;

/// Settings fixed for the lifetime of a capture session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub device_index: u32,
    pub fps: f64,
    pub width: u32,
    pub height: u32,
    pub cmdfile: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            device_index: 0,
            fps: 5.0,
            width: 640,
            height: 480,
            cmdfile: PathBuf::from("cmd.txt"),
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.fps.is_finite() || self.fps <= 0.0 {
            return Err(CollectError::Config(format!(
                "fps must be a positive number, got {}",
                self.fps
            )));
        }
        if self.width == 0 || self.height == 0 {
            return Err(CollectError::Config(format!(
                "resolution must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }

    /// Delay between capture attempts, `round(1000 / fps)` milliseconds.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis((1000.0 / self.fps).round() as u64)
    }
}

/// Layout of the batch file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchLayout {
    /// Newline-joined image paths only.
    Plain,
    /// A zero-padded batch index line, then the paths.
    Sequenced,
}

/// Where and how `collect` writes its output.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectOptions {
    pub outdir: PathBuf,
    pub batchfile: PathBuf,
    /// `None` increments image ids without bound.
    pub id_ceiling: Option<u64>,
    pub batch_layout: BatchLayout,
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self {
            outdir: PathBuf::from("collect_pics"),
            batchfile: PathBuf::from("batch.txt"),
            id_ceiling: None,
            batch_layout: BatchLayout::Sequenced,
        }
    }
}

impl CollectOptions {
    pub fn validate(&self) -> Result<()> {
        if self.id_ceiling == Some(0) {
            return Err(CollectError::Config("image id ceiling must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = SessionConfig::default();
        assert_eq!(config.device_index, 0);
        assert_eq!(config.fps, 5.0);
        assert_eq!((config.width, config.height), (640, 480));
        assert_eq!(config.cmdfile, PathBuf::from("cmd.txt"));

        let options = CollectOptions::default();
        assert_eq!(options.outdir, PathBuf::from("collect_pics"));
        assert_eq!(options.batchfile, PathBuf::from("batch.txt"));
        assert_eq!(options.id_ceiling, None);
    }

    #[test]
    fn frame_interval_rounds_to_millis() {
        let mut config = SessionConfig::default();
        assert_eq!(config.frame_interval(), Duration::from_millis(200));
        config.fps = 3.0;
        assert_eq!(config.frame_interval(), Duration::from_millis(333));
        config.fps = 1.5;
        assert_eq!(config.frame_interval(), Duration::from_millis(667));
    }

    #[test]
    fn rejects_bad_fps() {
        for fps in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let config = SessionConfig {
                fps,
                ..SessionConfig::default()
            };
            assert!(config.validate().is_err(), "fps {} should be rejected", fps);
        }
        assert!(SessionConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_zero_ceiling() {
        let options = CollectOptions {
            id_ceiling: Some(0),
            ..CollectOptions::default()
        };
        assert!(options.validate().is_err());
        let options = CollectOptions {
            id_ceiling: Some(WRAP_CEILING),
            ..CollectOptions::default()
        };
        assert!(options.validate().is_ok());
    }
}
