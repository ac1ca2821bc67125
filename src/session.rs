use crate::batch::BatchFile;
use crate::capture::CaptureSource;
use crate::command::{Command, CommandChannel};
use crate::config::{CollectOptions, SessionConfig};
use crate::error::{CollectError, Result};
use crate::output::OutputSink;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::Span;

/// Minimum digits in an image file name when ids are unbounded.
const DEFAULT_ID_WIDTH: usize = 6;

/// Why `collect` returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// `stop` or `end` was read from the command file.
    Command(Command),
    /// The device stopped delivering frames.
    SourceExhausted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectSummary {
    pub frames: u64,
    pub batches: u64,
    pub stop: StopReason,
}

/// Sequential image ids rendered as zero-padded file names.
#[derive(Debug)]
pub struct ImageIds {
    next: u64,
    ceiling: Option<u64>,
    width: usize,
}

impl ImageIds {
    pub fn new(ceiling: Option<u64>) -> Self {
        let width = match ceiling {
            Some(ceiling) => digits(ceiling.saturating_sub(1)),
            None => DEFAULT_ID_WIDTH,
        };
        Self {
            next: 0,
            ceiling,
            width,
        }
    }

    /// File name for the current id, then advance.
    pub fn next_name(&mut self) -> String {
        let name = format!("{:0width$}.jpg", self.next, width = self.width);
        self.next = match self.ceiling {
            Some(ceiling) => (self.next + 1) % ceiling,
            None => self.next + 1,
        };
        name
    }
}

fn digits(mut n: u64) -> usize {
    let mut count = 1;
    while n >= 10 {
        n /= 10;
        count += 1;
    }
    count
}

/// Per-run state of the capture loop.
pub struct Collector {
    outdir: PathBuf,
    ids: ImageIds,
    frames: Vec<PathBuf>,
    batch: BatchFile,
    batches: u64,
    written: u64,
}

impl Collector {
    /// Create the output directory and start with an empty frame record.
    pub fn prepare(options: &CollectOptions) -> Result<Self> {
        options.validate()?;
        fs::create_dir_all(&options.outdir).map_err(|e| CollectError::io(&options.outdir, e))?;
        let outdir =
            fs::canonicalize(&options.outdir).map_err(|e| CollectError::io(&options.outdir, e))?;

        Ok(Self {
            outdir,
            ids: ImageIds::new(options.id_ceiling),
            frames: Vec::new(),
            batch: BatchFile::new(&options.batchfile, options.batch_layout),
            batches: 0,
            written: 0,
        })
    }

    pub fn outdir(&self) -> &Path {
        &self.outdir
    }

    /// Paths collected since the last batch flush.
    #[cfg(test)]
    pub fn frames(&self) -> &[PathBuf] {
        &self.frames
    }

    fn next_path(&mut self) -> PathBuf {
        self.outdir.join(self.ids.next_name())
    }

    fn flush_batch(&mut self) -> Result<()> {
        let report = self.batch.flush(&self.frames)?;
        match report.index {
            Some(index) => tracing::info!(
                "save batch {} ({} images, {} purged)",
                index,
                report.written,
                report.purged
            ),
            None => tracing::info!(
                "save batch ({} images, {} purged)",
                report.written,
                report.purged
            ),
        }
        self.frames.clear();
        self.batches += 1;
        Ok(())
    }
}

/// A webcam, its preview, and the command file that steers them.
pub struct CaptureSession<C, O> {
    config: SessionConfig,
    source: C,
    preview: O,
    /// Cleared after the preview fails; capture carries on without it.
    preview_enabled: bool,
    commands: CommandChannel,
    span: Span,
}

impl<C, O> CaptureSession<C, O>
where
    C: CaptureSource,
    O: OutputSink,
{
    pub fn new(config: SessionConfig, source: C, preview: O) -> Result<Self> {
        config.validate()?;

        let (width, height) = source.resolution();
        let span = tracing::info_span!("session", device = config.device_index);
        span.in_scope(|| {
            tracing::info!(
                "Session ready: {}x{} @ {} fps, cmdfile {}",
                width,
                height,
                config.fps,
                config.cmdfile.display()
            );
        });

        let commands = CommandChannel::new(&config.cmdfile);
        Ok(Self {
            config,
            source,
            preview,
            preview_enabled: true,
            commands,
            span,
        })
    }

    pub fn get_command(&self) -> Result<Option<Command>> {
        self.commands.get_command()
    }

    pub fn set_command(&self, cmd: &str) -> Result<bool> {
        self.commands.set_command(cmd)
    }

    /// Capture until `stop`/`end` is posted or the device stops delivering.
    pub fn collect(&mut self, options: &CollectOptions) -> Result<CollectSummary> {
        let mut collector = Collector::prepare(options)?;
        self.run(&mut collector)
    }

    pub fn run(&mut self, collector: &mut Collector) -> Result<CollectSummary> {
        let span = self.span.clone();
        let _enter = span.enter();

        tracing::info!("Collecting into {}", collector.outdir().display());
        let interval = self.config.frame_interval();

        let stop = loop {
            match self.commands.get_command()? {
                Some(cmd) if cmd.is_stop() => {
                    tracing::info!("Received {:?}, stopping", cmd);
                    self.set_command("")?;
                    break StopReason::Command(cmd);
                }
                Some(Command::Batch) => {
                    collector.flush_batch()?;
                    self.set_command("")?;
                }
                _ => {}
            }

            let frame = match self.source.capture_frame() {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::info!("Frame read failed, ending capture: {}", e);
                    break StopReason::SourceExhausted;
                }
            };

            if self.preview_enabled {
                if let Err(e) = self.preview.write_frame(&frame) {
                    tracing::warn!("Preview failed, disabling it: {}", e);
                    self.preview_enabled = false;
                }
            }

            let path = collector.next_path();
            tracing::info!("collect image {}", path.display());
            match frame.save(&path) {
                Ok(()) => {
                    collector.frames.push(path);
                    collector.written += 1;
                }
                Err(e) => tracing::warn!("Failed to write {}: {}", path.display(), e),
            }

            std::thread::sleep(interval);
        };

        Ok(CollectSummary {
            frames: collector.written,
            batches: collector.batches,
            stop,
        })
    }
}
