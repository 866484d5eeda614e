use std::env;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use polars::prelude::*;
use tracing::{debug, info};

use crate::error::Result;

/// Root that default data paths hang off: `$PROJECT_ROOT`, else the working
/// directory.
pub fn project_root() -> PathBuf {
    env::var_os("PROJECT_ROOT")
        .map(PathBuf::from)
        .or_else(|| env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Reads a tab-delimited file with a header row.
///
/// Every column is read as a string; numeric columns are cast by the caller so
/// that a stray non-numeric cell becomes a null instead of a parse failure.
pub fn read_tsv(file_path: &Path) -> PolarsResult<DataFrame> {
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .map_parse_options(|opts| opts.with_separator(b'\t'))
        .try_into_reader_with_file_path(Some(file_path.to_path_buf()))?
        .finish()
}

pub fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        debug!("Creating output directory {}", dir.display());
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

/// Writes `df` with a header row using `separator` (b'\t' or b',').
pub fn write_table(df: &mut DataFrame, path: &Path, separator: u8) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(separator)
        .finish(df)?;
    info!("Saved {} rows to {}", df.height(), path.display());
    Ok(())
}

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| c.as_str() == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;
    use std::io::Write;

    #[test]
    fn project_root_follows_environment_or_working_dir() {
        let expected = match env::var_os("PROJECT_ROOT") {
            Some(root) => PathBuf::from(root),
            None => env::current_dir().unwrap(),
        };
        assert_eq!(project_root(), expected);
    }

    #[test]
    fn reads_tab_separated_values_as_strings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.tsv");
        let mut f = File::create(&path).unwrap();
        writeln!(f, "ENSP_core\tddg").unwrap();
        writeln!(f, "ENSP1\t1.5").unwrap();
        writeln!(f, "ENSP2\tnot_a_number").unwrap();
        drop(f);

        let df = read_tsv(&path).unwrap();
        assert_eq!(df.shape(), (2, 2));
        assert!(has_column(&df, "ddg"));
        assert_eq!(df.column("ddg").unwrap().dtype(), &DataType::String);
    }

    #[test]
    fn write_table_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out/table.tsv");
        let mut df = df!["a" => &[1, 2], "b" => &["x", "y"]].unwrap();

        write_table(&mut df, &path, b'\t').unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().next(), Some("a\tb"));
        assert_eq!(text.lines().count(), 3);
    }
}
