//! Table Loader Module
//! Handles delimited file loading and column discovery using Polars.

use polars::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to load table: {0}")]
    CsvError(#[from] PolarsError),
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    #[error("{0} contains no rows")]
    Empty(PathBuf),
}

/// Where the current table came from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DataSource {
    #[default]
    Example,
    Uploaded(PathBuf),
}

impl DataSource {
    pub fn display_name(&self) -> String {
        match self {
            DataSource::Example => "Built-in example".to_string(),
            DataSource::Uploaded(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.to_string_lossy().to_string()),
        }
    }
}

/// Holds the loaded table and where it came from.
pub struct DataLoader {
    df: Option<DataFrame>,
    source: DataSource,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    pub fn new() -> Self {
        Self {
            df: None,
            source: DataSource::Example,
        }
    }

    /// Field separator for a file, chosen by extension.
    pub fn separator_for(path: &Path) -> u8 {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("tsv") | Some("tab") | Some("txt") => b'\t',
            _ => b',',
        }
    }

    /// Read a delimited text file with a header row.
    pub fn read_table(path: &Path) -> Result<DataFrame, LoaderError> {
        if !path.exists() {
            return Err(LoaderError::NotFound(path.to_path_buf()));
        }

        let df = LazyCsvReader::new(path)
            .with_has_header(true)
            .with_separator(Self::separator_for(path))
            .with_infer_schema_length(Some(10000))
            .with_ignore_errors(true)
            .finish()?
            .collect()?;

        if df.height() == 0 {
            return Err(LoaderError::Empty(path.to_path_buf()));
        }

        log::info!(
            "Read {} rows x {} columns from {}",
            df.height(),
            df.width(),
            path.display()
        );
        Ok(df)
    }

    /// The built-in gene table with precomputed fold changes and p-values.
    pub fn example_dataframe() -> Result<DataFrame, LoaderError> {
        let df = df!(
            "gene" => ["GeneA", "GeneB", "GeneC", "GeneD", "GeneE"],
            "log2FoldChange" => [1.5, -2.0, 0.5, 3.0, -1.2],
            "pvalue" => [0.001, 0.05, 0.02, 0.001, 0.03]
        )?;
        Ok(df)
    }

    /// Get list of numeric column names.
    pub fn get_numeric_columns(&self) -> Vec<String> {
        self.df.as_ref().map(numeric_columns).unwrap_or_default()
    }

    /// Get the number of rows in the DataFrame.
    pub fn get_row_count(&self) -> usize {
        self.df.as_ref().map(|df| df.height()).unwrap_or(0)
    }

    /// Get a reference to the loaded DataFrame.
    pub fn get_dataframe(&self) -> Option<&DataFrame> {
        self.df.as_ref()
    }

    pub fn source(&self) -> &DataSource {
        &self.source
    }

    /// Set DataFrame directly (used for async loading)
    pub fn set_dataframe(&mut self, df: DataFrame, source: DataSource) {
        self.df = Some(df);
        self.source = source;
    }
}

/// Names of numeric columns, in table order.
pub fn numeric_columns(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|col| is_numeric(col.dtype()))
        .map(|col| col.name().to_string())
        .collect()
}

/// First string column, used for row labels.
pub fn label_column(df: &DataFrame) -> Option<String> {
    df.get_columns()
        .iter()
        .find(|col| matches!(col.dtype(), DataType::String))
        .map(|col| col.name().to_string())
}

fn is_numeric(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Float32
            | DataType::Float64
            | DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn example_table_has_five_genes() {
        let mut loader = DataLoader::new();
        loader.set_dataframe(DataLoader::example_dataframe().unwrap(), DataSource::Example);
        assert_eq!(loader.get_row_count(), 5);
        assert_eq!(
            loader.get_numeric_columns(),
            vec!["log2FoldChange".to_string(), "pvalue".to_string()]
        );
        assert_eq!(loader.source(), &DataSource::Example);
    }

    #[test]
    fn loads_comma_separated_file() {
        let file = write_temp(".csv", "control,treated\n1.0,2.0\n2.0,8.0\n4.0,4.0\n");
        let df = DataLoader::read_table(file.path()).unwrap();
        let mut loader = DataLoader::new();
        loader.set_dataframe(df, DataSource::Uploaded(file.path().to_path_buf()));

        assert_eq!(loader.get_row_count(), 3);
        assert_eq!(loader.get_numeric_columns(), vec!["control", "treated"]);
        assert!(matches!(loader.source(), DataSource::Uploaded(_)));
    }

    #[test]
    fn loads_tab_separated_file_with_labels() {
        let file = write_temp(".tsv", "gene\ta\tb\nTP53\t1\t2\nMYC\t3\t4\n");
        let df = DataLoader::read_table(file.path()).unwrap();

        assert_eq!(df.width(), 3);
        assert_eq!(label_column(&df).as_deref(), Some("gene"));
        assert_eq!(numeric_columns(&df), vec!["a", "b"]);
    }

    #[test]
    fn missing_file_is_reported() {
        let err = DataLoader::read_table(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, LoaderError::NotFound(_)));
    }

    #[test]
    fn header_only_file_is_rejected() {
        // Depending on the reader, no data rows is either a parse error or an empty frame
        let file = write_temp(".csv", "a,b\n");
        let err = DataLoader::read_table(file.path()).unwrap_err();
        assert!(matches!(
            err,
            LoaderError::Empty(_) | LoaderError::CsvError(_)
        ));
    }

    #[test]
    fn separator_follows_extension() {
        assert_eq!(DataLoader::separator_for(Path::new("x.csv")), b',');
        assert_eq!(DataLoader::separator_for(Path::new("x.TSV")), b'\t');
        assert_eq!(DataLoader::separator_for(Path::new("x.txt")), b'\t');
        assert_eq!(DataLoader::separator_for(Path::new("noext")), b',');
    }
}
