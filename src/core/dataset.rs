use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::schema::{FEATURE_COUNT, FEATURE_NAMES, LABEL_COLUMN, LabeledSample, WaterSample};
use crate::utils::file_parsing::{parse_binary_label, parse_number, split_csv_record};

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{path} does not match the expected schema: {detail}")]
    Schema { path: PathBuf, detail: String },

    #[error("{path}:{line}: {detail}")]
    Parse {
        path: PathBuf,
        line: usize,
        detail: String,
    },

    #[error("features and labels disagree in length ({features} vs {labels})")]
    LengthMismatch { features: usize, labels: usize },
}

impl DatasetError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// In-memory labeled table: one feature row per sample plus its class index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    features: Vec<Vec<f64>>,
    labels: Vec<usize>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(features: Vec<Vec<f64>>, labels: Vec<usize>) -> Result<Self, DatasetError> {
        if features.len() != labels.len() {
            return Err(DatasetError::LengthMismatch {
                features: features.len(),
                labels: labels.len(),
            });
        }
        Ok(Self { features, labels })
    }

    pub fn push(&mut self, row: Vec<f64>, label: usize) {
        self.features.push(row);
        self.labels.push(label);
    }

    pub fn push_sample(&mut self, sample: &LabeledSample) {
        self.push(sample.sample.to_vec(), sample.label.class_index());
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn features(&self) -> &[Vec<f64>] {
        &self.features
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Appends every row of `other` after the rows already held.
    pub fn extend_from(&mut self, other: &Dataset) {
        self.features.extend(other.features.iter().cloned());
        self.labels.extend_from_slice(&other.labels);
    }

    pub fn subset(&self, indices: &[usize]) -> Dataset {
        Dataset {
            features: indices.iter().map(|&i| self.features[i].clone()).collect(),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        }
    }

    /// Number of samples per class, indexed by class.
    pub fn class_counts(&self) -> Vec<usize> {
        let k = self.labels.iter().copied().max().map_or(0, |m| m + 1);
        let mut counts = vec![0; k];
        for &y in &self.labels {
            counts[y] += 1;
        }
        counts
    }

    /// Reads a labeled table. Columns are matched by name, so their order is free,
    /// and extra columns are ignored.
    pub fn read_csv(path: &Path) -> Result<Self, DatasetError> {
        let table = CsvTable::open(path, true)?;
        let mut data = Dataset::new();
        for (line, cells) in table.rows {
            let row = table.columns.feature_row(path, line, &cells)?;
            let label = table.columns.label(path, line, &cells)?;
            data.push(row, label);
        }
        Ok(data)
    }

    /// Writes the canonical header followed by every row.
    pub fn write_csv(&self, path: &Path) -> Result<(), DatasetError> {
        let file = File::create(path).map_err(|e| DatasetError::io(path, e))?;
        let mut w = BufWriter::new(file);
        let write = |w: &mut BufWriter<File>| -> io::Result<()> {
            writeln!(w, "{}", canonical_header())?;
            for (row, label) in self.features.iter().zip(&self.labels) {
                writeln!(w, "{}", format_row(row, *label))?;
            }
            w.flush()
        };
        write(&mut w).map_err(|e| DatasetError::io(path, e))
    }
}

/// Reads a table of measurements without labels (a label column is tolerated and ignored).
pub fn read_samples_csv(path: &Path) -> Result<Vec<WaterSample>, DatasetError> {
    let table = CsvTable::open(path, false)?;
    let mut out = Vec::with_capacity(table.rows.len());
    for (line, cells) in table.rows {
        let row = table.columns.feature_row(path, line, &cells)?;
        let mut arr = [0.0; FEATURE_COUNT];
        arr.copy_from_slice(&row);
        out.push(WaterSample::from_array(arr));
    }
    Ok(out)
}

pub fn canonical_header() -> String {
    let mut cols: Vec<&str> = FEATURE_NAMES.to_vec();
    cols.push(LABEL_COLUMN);
    cols.join(",")
}

pub fn format_row(row: &[f64], label: usize) -> String {
    let mut cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
    cells.push(label.to_string());
    cells.join(",")
}

struct ColumnMap {
    features: [usize; FEATURE_COUNT],
    label: Option<usize>,
    width: usize,
}

impl ColumnMap {
    fn from_header(path: &Path, header: &[String], need_label: bool) -> Result<Self, DatasetError> {
        let find = |name: &str| header.iter().position(|h| h == name);
        let mut features = [0usize; FEATURE_COUNT];
        for (slot, name) in features.iter_mut().zip(FEATURE_NAMES) {
            *slot = find(name).ok_or_else(|| DatasetError::Schema {
                path: path.to_path_buf(),
                detail: format!("missing column `{name}`"),
            })?;
        }
        let label = find(LABEL_COLUMN);
        if need_label && label.is_none() {
            return Err(DatasetError::Schema {
                path: path.to_path_buf(),
                detail: format!("missing column `{LABEL_COLUMN}`"),
            });
        }
        Ok(Self {
            features,
            label,
            width: header.len(),
        })
    }

    fn check_width(&self, path: &Path, line: usize, cells: &[String]) -> Result<(), DatasetError> {
        if cells.len() != self.width {
            return Err(DatasetError::Parse {
                path: path.to_path_buf(),
                line,
                detail: format!("expected {} cells, found {}", self.width, cells.len()),
            });
        }
        Ok(())
    }

    fn feature_row(&self, path: &Path, line: usize, cells: &[String]) -> Result<Vec<f64>, DatasetError> {
        self.check_width(path, line, cells)?;
        self.features
            .iter()
            .zip(FEATURE_NAMES)
            .map(|(&idx, name)| {
                parse_number(&cells[idx]).ok_or_else(|| DatasetError::Parse {
                    path: path.to_path_buf(),
                    line,
                    detail: format!("`{name}` is not a number: {:?}", cells[idx]),
                })
            })
            .collect()
    }

    fn label(&self, path: &Path, line: usize, cells: &[String]) -> Result<usize, DatasetError> {
        let Some(idx) = self.label else {
            return Err(DatasetError::Schema {
                path: path.to_path_buf(),
                detail: format!("missing column `{LABEL_COLUMN}`"),
            });
        };
        parse_binary_label(&cells[idx]).ok_or_else(|| DatasetError::Parse {
            path: path.to_path_buf(),
            line,
            detail: format!("`{LABEL_COLUMN}` must be 0 or 1: {:?}", cells[idx]),
        })
    }
}

struct CsvTable {
    columns: ColumnMap,
    rows: Vec<(usize, Vec<String>)>,
}

impl CsvTable {
    fn open(path: &Path, need_label: bool) -> Result<Self, DatasetError> {
        let file = File::open(path).map_err(|e| DatasetError::io(path, e))?;
        let mut lines = BufReader::new(file).lines().enumerate();

        let header = loop {
            match lines.next() {
                Some((_, line)) => {
                    let line = line.map_err(|e| DatasetError::io(path, e))?;
                    if !line.trim().is_empty() {
                        break split_csv_record(&line);
                    }
                }
                None => {
                    return Err(DatasetError::Schema {
                        path: path.to_path_buf(),
                        detail: "file has no header".into(),
                    });
                }
            }
        };
        let columns = ColumnMap::from_header(path, &header, need_label)?;

        let mut rows = Vec::new();
        for (idx, line) in lines {
            let line = line.map_err(|e| DatasetError::io(path, e))?;
            if line.trim().is_empty() {
                continue;
            }
            rows.push((idx + 1, split_csv_record(&line)));
        }
        Ok(Self { columns, rows })
    }
}
