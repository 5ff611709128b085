//! Dataset loader - fiber table from CSV
//!
//! Loading is all-or-nothing: any unreadable source, missing column or bad
//! cell fails the whole load.

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::palette::{GroupId, GroupPalette};

pub const COL_FIBER_ID: &str = "Fiber ID";
pub const COL_X: &str = "X location in mm";
pub const COL_Y: &str = "Y location in mm";
pub const COL_GROUP: &str = "Group";
pub const COL_TELE: &str = "Non-telecentricity in degree";

const REQUIRED_COLUMNS: [&str; 5] = [COL_FIBER_ID, COL_X, COL_Y, COL_GROUP, COL_TELE];

#[derive(Error, Debug)]
pub enum DataError {
    #[error("Cannot read dataset {path:?}: {source}")]
    Access {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed dataset: {0}")]
    Format(String),
    #[error("Row {row}: column '{column}' has invalid value '{value}'")]
    Value {
        row: usize,
        column: &'static str,
        value: String,
    },
}

/// One fiber
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub fiber_id: f64,
    pub x: f64,
    pub y: f64,
    pub group: GroupId,
    pub non_telecentricity: f64,
}

impl Record {
    /// Fiber id as displayed on the plots
    pub fn label(&self) -> String {
        format!("{:.0}", self.fiber_id)
    }
}

/// Ordered, immutable set of fibers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    records: Vec<Record>,
}

impl Dataset {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    /// Load a CSV file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DataError> {
        let path = path.as_ref();
        tracing::debug!("Opening dataset {:?}", path);

        let file = std::fs::File::open(path).map_err(|source| DataError::Access {
            path: path.to_path_buf(),
            source,
        })?;

        let dataset = Self::from_reader(file).map_err(|e| match e {
            DataError::Access { source, .. } => DataError::Access {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;

        tracing::info!("Loaded {} fibers from {:?}", dataset.len(), path);
        Ok(dataset)
    }

    /// Parse CSV from any reader
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DataError> {
        let mut csv = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv.headers().map_err(csv_error)?.clone();
        let col_idx: HashMap<&str, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h, i))
            .collect();

        let mut idx = [0usize; 5];
        for (slot, name) in idx.iter_mut().zip(REQUIRED_COLUMNS) {
            *slot = *col_idx
                .get(name)
                .ok_or_else(|| DataError::Format(format!("missing required column '{}'", name)))?;
        }
        let [fiber_i, x_i, y_i, group_i, tele_i] = idx;

        let mut records = Vec::new();
        for (i, row) in csv.records().enumerate() {
            let row = row.map_err(csv_error)?;
            // Data rows start on line 2, after the header
            let line = i + 2;
            let cell = |col: usize| row.get(col).unwrap_or("");

            let group = parse_number(cell(group_i), line, COL_GROUP)?;
            if group.fract() != 0.0 {
                return Err(DataError::Value {
                    row: line,
                    column: COL_GROUP,
                    value: cell(group_i).to_string(),
                });
            }

            records.push(Record {
                fiber_id: parse_number(cell(fiber_i), line, COL_FIBER_ID)?,
                x: parse_number(cell(x_i), line, COL_X)?,
                y: parse_number(cell(y_i), line, COL_Y)?,
                group: group as GroupId,
                non_telecentricity: parse_number(cell(tele_i), line, COL_TELE)?,
            });
        }

        Ok(Self::new(records))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn count_group(&self, group: GroupId) -> usize {
        self.records.iter().filter(|r| r.group == group).count()
    }

    /// Record count for every registered group, in registry order
    pub fn group_counts(&self, palette: &GroupPalette) -> Vec<(GroupId, usize)> {
        palette.ids().map(|id| (id, self.count_group(id))).collect()
    }

    /// Records whose group has no registered color
    pub fn unlisted_count(&self, palette: &GroupPalette) -> usize {
        self.records.iter().filter(|r| !palette.contains(r.group)).count()
    }

    pub fn x_range(&self) -> Option<(f64, f64)> {
        min_max(self.records.iter().map(|r| r.x))
    }

    pub fn y_range(&self) -> Option<(f64, f64)> {
        min_max(self.records.iter().map(|r| r.y))
    }

    pub fn tele_range(&self) -> Option<(f64, f64)> {
        min_max(self.records.iter().map(|r| r.non_telecentricity))
    }

    /// Non-telecentricity values of one group
    pub fn tele_values(&self, group: GroupId) -> Vec<f64> {
        self.records
            .iter()
            .filter(|r| r.group == group)
            .map(|r| r.non_telecentricity)
            .collect()
    }

    pub fn all_tele_values(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.non_telecentricity).collect()
    }
}

fn min_max(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

fn parse_number(text: &str, row: usize, column: &'static str) -> Result<f64, DataError> {
    text.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| DataError::Value {
            row,
            column,
            value: text.to_string(),
        })
}

fn csv_error(err: csv::Error) -> DataError {
    if err.is_io_error() {
        if let csv::ErrorKind::Io(source) = err.into_kind() {
            return DataError::Access {
                path: PathBuf::new(),
                source,
            };
        }
        return DataError::Format("I/O error while reading CSV".to_string());
    }
    DataError::Format(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "Fiber ID,X location in mm,Y location in mm,Group,Non-telecentricity in degree";

    fn parse(body: &str) -> Result<Dataset, DataError> {
        Dataset::from_reader(format!("{}\n{}", HEADER, body).as_bytes())
    }

    #[test]
    fn test_load_rows() {
        let data = parse("1,0.0,0.0,1,0.1\n2,1.5,-2.25,9,0.2\n").unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(
            *data.iter().nth(1).unwrap(),
            Record {
                fiber_id: 2.0,
                x: 1.5,
                y: -2.25,
                group: 9,
                non_telecentricity: 0.2,
            }
        );
    }

    #[test]
    fn test_extra_columns_and_order() {
        let csv = "Group, Notes ,Non-telecentricity in degree,\
                   Y location in mm,X location in mm,Fiber ID\n\
                   3,edge,0.05,2.0,1.0,17\n";
        let data = Dataset::from_reader(csv.as_bytes()).unwrap();
        let r = data.iter().next().unwrap();
        assert_eq!((r.fiber_id, r.x, r.y, r.group), (17.0, 1.0, 2.0, 3));
    }

    #[test]
    fn test_header_only_is_empty() {
        let data = Dataset::from_reader(HEADER.as_bytes()).unwrap();
        assert!(data.is_empty());
        assert_eq!(data.x_range(), None);
    }

    #[test]
    fn test_missing_column() {
        let csv = "Fiber ID,X location in mm,Y location in mm,Group\n1,0,0,1\n";
        match Dataset::from_reader(csv.as_bytes()) {
            Err(DataError::Format(msg)) => assert!(msg.contains(COL_TELE)),
            other => panic!("expected Format error, got {:?}", other),
        }
    }

    #[test]
    fn test_non_numeric_value() {
        match parse("1,abc,0.0,1,0.1\n") {
            Err(DataError::Value { row, column, value }) => {
                assert_eq!(row, 2);
                assert_eq!(column, COL_X);
                assert_eq!(value, "abc");
            }
            other => panic!("expected Value error, got {:?}", other),
        }
    }

    #[test]
    fn test_non_finite_rejected() {
        assert!(matches!(parse("1,0.0,inf,1,0.1\n"), Err(DataError::Value { .. })));
        assert!(matches!(parse("1,0.0,0.0,1,NaN\n"), Err(DataError::Value { .. })));
    }

    #[test]
    fn test_fractional_group_rejected() {
        assert!(matches!(
            parse("1,0.0,0.0,1.5,0.1\n"),
            Err(DataError::Value { column: COL_GROUP, .. })
        ));
        assert_eq!(parse("1,0.0,0.0,2.0,0.1\n").unwrap().iter().next().unwrap().group, 2);
    }

    #[test]
    fn test_ragged_row_is_format_error() {
        assert!(matches!(parse("1,0.0,0.0\n"), Err(DataError::Format(_))));
    }

    #[test]
    fn test_missing_file() {
        let err = Dataset::load("/nonexistent/fibers.csv").unwrap_err();
        assert!(matches!(err, DataError::Access { .. }));
    }

    #[test]
    fn test_group_counts_in_registry_order() {
        let data = parse("1,0,0,2,0.1\n2,0,0,2,0.1\n3,0,0,8,0.1\n4,0,0,11,0.1\n").unwrap();
        let palette = GroupPalette::default();
        let counts = data.group_counts(&palette);
        assert_eq!(counts.len(), 8);
        assert_eq!(counts[1], (2, 2));
        assert_eq!(counts[7], (8, 1));
        assert_eq!(counts[0], (1, 0));
        assert_eq!(data.unlisted_count(&palette), 1);
    }

    #[test]
    fn test_demo_dataset() {
        let csv = include_str!("../data/demo_fibers.csv");
        let data = Dataset::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(data.len(), 37);
        assert_eq!(data.unlisted_count(&GroupPalette::default()), 0);
        let (lo, hi) = data.tele_range().unwrap();
        assert!(lo >= 0.0 && hi <= 0.4);
    }

    #[test]
    fn test_label_rounds() {
        let data = parse("12.0,0,0,1,0.1\n7.6,0,0,1,0.1\n").unwrap();
        assert_eq!(data.iter().next().unwrap().label(), "12");
        assert_eq!(data.iter().nth(1).unwrap().label(), "8");
    }
}
