use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::dataset::{canonical_header, format_row};
use crate::core::{Dataset, DatasetError, LabeledSample};

/// Append-only table of user-supplied labeled samples.
#[derive(Debug, Clone)]
pub struct IncrementalStore {
    path: PathBuf,
}

impl IncrementalStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one row, writing the canonical header first if the file is new.
    ///
    /// The row is flushed to disk before this returns.
    pub fn append(&self, sample: &LabeledSample) -> Result<(), DatasetError> {
        let io_err = |source: io::Error| DatasetError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(io_err)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .map_err(io_err)?;
        let fresh = file.metadata().map_err(io_err)?.len() == 0;

        let mut buf = String::new();
        if fresh {
            buf.push_str(&canonical_header());
            buf.push('\n');
        } else if !ends_with_newline(&mut file).map_err(io_err)? {
            buf.push('\n');
        }
        buf.push_str(&format_row(
            &sample.sample.to_array(),
            sample.label.class_index(),
        ));
        buf.push('\n');

        file.write_all(buf.as_bytes()).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        debug!(path = %self.path.display(), fresh, "appended incremental sample");
        Ok(())
    }

    /// Every accumulated sample; an absent file is an empty table.
    pub fn load(&self) -> Result<Dataset, DatasetError> {
        if !self.path.exists() {
            return Ok(Dataset::new());
        }
        Dataset::read_csv(&self.path)
    }

    pub fn count(&self) -> Result<usize, DatasetError> {
        self.load().map(|d| d.len())
    }
}

/// A torn or hand-edited table may lack its final newline.
fn ends_with_newline(file: &mut File) -> io::Result<bool> {
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Potability, WaterSample};
    use std::fs;
    use tempfile::TempDir;

    fn sample(ph: f64, label: Potability) -> LabeledSample {
        LabeledSample::new(
            WaterSample::from_array([ph, 200.0, 20000.0, 7.5, 350.0, 400.0, 14.0, 70.0, 4.0]),
            label,
        )
    }

    #[test]
    fn missing_table_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = IncrementalStore::new(dir.path().join("inc.csv"));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn first_append_writes_canonical_header() {
        let dir = TempDir::new().unwrap();
        let store = IncrementalStore::new(dir.path().join("versions").join("inc.csv"));
        store.append(&sample(7.0, Potability::Potable)).unwrap();

        let text = fs::read_to_string(store.path()).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), canonical_header());
        assert_eq!(lines.next().unwrap(), "7,200,20000,7.5,350,400,14,70,4,1");
        assert!(lines.next().is_none());
    }

    #[test]
    fn appends_accumulate_in_order() {
        let dir = TempDir::new().unwrap();
        let store = IncrementalStore::new(dir.path().join("inc.csv"));
        store.append(&sample(7.0, Potability::Potable)).unwrap();
        store.append(&sample(6.5, Potability::NotPotable)).unwrap();

        let data = store.load().unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data.labels(), &[1, 0]);
        assert_eq!(data.features()[1][0], 6.5);
    }

    #[test]
    fn append_after_unterminated_row_starts_a_new_line() {
        let dir = TempDir::new().unwrap();
        let store = IncrementalStore::new(dir.path().join("inc.csv"));
        fs::write(
            store.path(),
            format!("{}\n7,200,20000,7.5,350,400,14,70,4,1", canonical_header()),
        )
        .unwrap();

        store.append(&sample(6.5, Potability::NotPotable)).unwrap();

        let data = store.load().unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data.labels(), &[1, 0]);
        assert_eq!(data.features()[1][0], 6.5);
    }
}
