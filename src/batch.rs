use crate::config::{BatchLayout, BATCH_INDEX_WIDTH};
use crate::error::{CollectError, Result};
use std::fs;
use std::ffi::OsStr;
use std::io::ErrorKind;
use std::os::unix::ffi::OsStrExt;
use std::path::PathBuf;

/// Outcome of a single batch flush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushReport {
    /// Index written into the sequence line, if the layout has one.
    pub index: Option<u64>,
    pub written: usize,
    pub purged: usize,
}

/// The batch file and its sequence counter.
///
/// Retention is one generation: each flush deletes the images listed by
/// the previous batch before overwriting it.
#[derive(Debug)]
pub struct BatchFile {
    path: PathBuf,
    layout: BatchLayout,
    next_index: u64,
}

impl BatchFile {
    pub fn new(path: impl Into<PathBuf>, layout: BatchLayout) -> Self {
        Self {
            path: path.into(),
            layout,
            next_index: 0,
        }
    }

    #[cfg(test)]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Purge the previous batch, then persist `images` as the new one.
    pub fn flush(&mut self, images: &[PathBuf]) -> Result<FlushReport> {
        let purged = self.purge_previous()?;

        // Paths are written as raw bytes so non-UTF-8 names purge correctly later
        let mut contents: Vec<u8> = Vec::new();
        let index = match self.layout {
            BatchLayout::Plain => None,
            BatchLayout::Sequenced => {
                let index = self.next_index;
                let line = format!("{:0width$}\n", index, width = BATCH_INDEX_WIDTH);
                contents.extend_from_slice(line.as_bytes());
                self.next_index += 1;
                Some(index)
            }
        };
        for (i, image) in images.iter().enumerate() {
            if i > 0 {
                contents.push(b'\n');
            }
            contents.extend_from_slice(image.as_os_str().as_bytes());
        }

        fs::write(&self.path, contents).map_err(|e| CollectError::io(&self.path, e))?;
        tracing::debug!("batch {} contents: {:?}", self.path.display(), images);

        Ok(FlushReport {
            index,
            written: images.len(),
            purged,
        })
    }

    /// Paths listed by the batch file currently on disk.
    pub fn listed_paths(&self) -> Result<Vec<PathBuf>> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CollectError::io(&self.path, e)),
        };

        let skip = match self.layout {
            BatchLayout::Plain => 0,
            BatchLayout::Sequenced => 1,
        };
        Ok(raw
            .split(|&b| b == b'\n')
            .skip(skip)
            .map(|line| line.trim_ascii())
            .filter(|line| !line.is_empty())
            .map(|line| PathBuf::from(OsStr::from_bytes(line)))
            .collect())
    }

    fn purge_previous(&self) -> Result<usize> {
        let mut purged = 0;
        for path in self.listed_paths()? {
            match fs::remove_file(&path) {
                Ok(()) => purged += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(CollectError::io(&path, e)),
            }
        }
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn touch(path: &Path) {
        fs::write(path, b"jpeg").unwrap();
    }

    #[test]
    fn plain_flush_without_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.jpg");
        let b = dir.path().join("b.jpg");
        let mut batch = BatchFile::new(dir.path().join("batch.txt"), BatchLayout::Plain);

        let report = batch.flush(&[a.clone(), b.clone()]).unwrap();

        assert_eq!(report.index, None);
        assert_eq!(report.written, 2);
        assert_eq!(report.purged, 0);
        let contents = fs::read_to_string(batch.path()).unwrap();
        assert_eq!(contents, format!("{}\n{}", a.display(), b.display()));
    }

    #[test]
    fn flush_purges_previous_generation() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.jpg");
        let b = dir.path().join("b.jpg");
        let gone = dir.path().join("gone.jpg");
        touch(&a);
        touch(&b);
        let batchfile = dir.path().join("batch.txt");
        fs::write(&batchfile, format!("{}\n{}\n", a.display(), gone.display())).unwrap();

        let mut batch = BatchFile::new(&batchfile, BatchLayout::Plain);
        let report = batch.flush(&[a.clone(), b.clone()]).unwrap();

        assert_eq!(report.purged, 1);
        assert!(!a.exists());
        assert!(b.exists());
        assert_eq!(
            fs::read_to_string(&batchfile).unwrap(),
            format!("{}\n{}", a.display(), b.display())
        );
    }

    #[test]
    fn sequenced_layout_numbers_batches() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("000000.jpg");
        let second = dir.path().join("000001.jpg");
        touch(&first);
        touch(&second);
        let mut batch = BatchFile::new(dir.path().join("batch.txt"), BatchLayout::Sequenced);

        let report = batch.flush(&[first.clone()]).unwrap();
        assert_eq!(report.index, Some(0));
        assert_eq!(
            fs::read_to_string(batch.path()).unwrap(),
            format!("000000\n{}", first.display())
        );
        assert_eq!(batch.listed_paths().unwrap(), vec![first.clone()]);

        let report = batch.flush(&[second.clone()]).unwrap();
        assert_eq!(report.index, Some(1));
        assert_eq!(report.purged, 1);
        assert!(!first.exists());
        assert!(second.exists());
        assert_eq!(
            fs::read_to_string(batch.path()).unwrap(),
            format!("000001\n{}", second.display())
        );
    }

    #[test]
    fn empty_batch_still_advances_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let mut batch = BatchFile::new(dir.path().join("batch.txt"), BatchLayout::Sequenced);

        batch.flush(&[]).unwrap();
        let report = batch.flush(&[]).unwrap();

        assert_eq!(report.index, Some(1));
        assert_eq!(fs::read_to_string(batch.path()).unwrap(), "000001\n");
        assert!(batch.listed_paths().unwrap().is_empty());
    }

    #[test]
    fn non_utf8_paths_survive_a_generation() {
        use std::ffi::OsString;
        use std::os::unix::ffi::OsStringExt;

        let dir = tempfile::tempdir().unwrap();
        let odd = dir.path().join(OsString::from_vec(b"frame-\xff.jpg".to_vec()));
        // some filesystems reject non-UTF-8 names
        if fs::write(&odd, b"jpeg").is_err() {
            return;
        }
        let mut batch = BatchFile::new(dir.path().join("batch.txt"), BatchLayout::Sequenced);

        batch.flush(&[odd.clone()]).unwrap();
        assert_eq!(batch.listed_paths().unwrap(), vec![odd.clone()]);

        let report = batch.flush(&[]).unwrap();
        assert_eq!(report.purged, 1);
        assert!(!odd.exists());
    }
}
