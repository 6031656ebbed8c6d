use crate::error::{DashError, Result};
use crate::types::RawTable;
use csv::ReaderBuilder;
use std::path::PathBuf;
use tracing::debug;

/// Anything that can hand back a header row plus text rows on demand.
///
/// Fetching is blocking; a failure aborts the current render cycle.
pub trait DataSource {
    fn fetch(&self) -> Result<RawTable>;

    fn describe(&self) -> String {
        "data source".to_string()
    }
}

/// A CSV export of the response sheet.
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CsvSource { path: path.into() }
    }
}

impl DataSource for CsvSource {
    fn fetch(&self) -> Result<RawTable> {
        let unavailable =
            |e: csv::Error| DashError::SourceUnavailable(format!("{}: {}", self.path.display(), e));

        // Headers are read as a plain record so repeated names survive.
        let mut rdr = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&self.path)
            .map_err(unavailable)?;

        let mut records = rdr.records();
        let headers: Vec<String> = match records.next() {
            Some(rec) => rec.map_err(unavailable)?.iter().map(str::to_string).collect(),
            None => return Err(DashError::EmptySource),
        };

        let mut rows = Vec::new();
        for rec in records {
            let rec = rec.map_err(unavailable)?;
            rows.push(rec.iter().map(str::to_string).collect());
        }
        debug!(path = %self.path.display(), rows = rows.len(), "fetched csv source");
        Ok(RawTable { headers, rows })
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-memory tables act as their own source.
impl DataSource for RawTable {
    fn fetch(&self) -> Result<RawTable> {
        Ok(self.clone())
    }

    fn describe(&self) -> String {
        "in-memory table".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn csv_source_keeps_duplicate_headers() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "District,Action,Action").unwrap();
        writeln!(file, "X,,Warning").unwrap();
        writeln!(file, "Y,Explanation").unwrap();
        let table = CsvSource::new(file.path()).fetch().unwrap();
        assert_eq!(table.headers, vec!["District", "Action", "Action"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1], vec!["Y", "Explanation"]);
    }

    #[test]
    fn missing_file_is_source_unavailable() {
        let err = CsvSource::new("/definitely/not/here.csv").fetch().unwrap_err();
        assert!(matches!(err, DashError::SourceUnavailable(_)));
    }

    #[test]
    fn empty_file_is_empty_source() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = CsvSource::new(file.path()).fetch().unwrap_err();
        assert!(matches!(err, DashError::EmptySource));
    }
}
