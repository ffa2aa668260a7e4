//! Reading delimited files into a table and writing cleaned tables back out.
//!
//! Input bytes are decoded with `encoding_rs` before parsing, so any encoding
//! label from the WHATWG Encoding Standard works; the CSV reader only ever
//! sees UTF-8. Output is written through a temporary file in the destination
//! directory and renamed into place, so a failed write leaves nothing behind.

use crate::config::LoadOptions;
use crate::error::{CleaningError, Result};
use encoding_rs::Encoding;
use polars::prelude::*;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info};

/// Load a delimited file into a DataFrame.
///
/// # Errors
///
/// [`CleaningError::Load`] if the file does not exist or cannot be read, the
/// encoding label is unknown, the bytes are not valid in that encoding, or
/// the content is not parseable as delimited text.
/// [`CleaningError::InvalidConfig`] for an unusable separator/decimal pair.
pub fn load_table(path: impl AsRef<Path>, options: &LoadOptions) -> Result<DataFrame> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(CleaningError::load(path, "file does not exist"));
    }

    let separator = options.separator_byte()?;
    let decimal_comma = options.decimal_comma()?;

    let encoding = Encoding::for_label(options.encoding.trim().as_bytes()).ok_or_else(|| {
        CleaningError::load(path, format!("unknown encoding '{}'", options.encoding))
    })?;

    let bytes = std::fs::read(path).map_err(|e| CleaningError::load(path, e))?;
    debug!("Read {} bytes from {}", bytes.len(), path.display());

    let (text, _, had_errors) = encoding.decode(&bytes);
    if had_errors {
        return Err(CleaningError::load(
            path,
            format!("content is not valid {}", encoding.name()),
        ));
    }

    let null_values = NullValues::AllColumns(
        options
            .null_markers
            .iter()
            .map(|marker| marker.as_str().into())
            .collect(),
    );

    let parse_options = CsvParseOptions::default()
        .with_separator(separator)
        .with_quote_char(Some(b'"'))
        .with_decimal_comma(decimal_comma)
        .with_missing_is_null(true)
        .with_null_values(Some(null_values));

    let cursor = Cursor::new(text.into_owned().into_bytes());

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .with_parse_options(parse_options)
        .into_reader_with_file_handle(cursor)
        .finish()
        .map_err(|e| CleaningError::load(path, e))?;

    info!(
        "Loaded {} rows x {} columns from {}",
        df.height(),
        df.width(),
        path.display()
    );

    Ok(df)
}

/// Write a table as comma-separated text with a header row and no index column.
///
/// The destination is only replaced once the whole table has been written.
pub fn write_table(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| CleaningError::write(path, e))?;

    CsvWriter::new(tmp.as_file_mut())
        .include_header(true)
        .with_separator(b',')
        .finish(df)
        .map_err(|e| CleaningError::write(path, e))?;

    tmp.persist(path)
        .map_err(|e| CleaningError::write(path, e.error))?;

    info!(
        "Wrote {} rows x {} columns to {}",
        df.height(),
        df.width(),
        path.display()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_fixture(dir: &TempDir, name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(bytes).unwrap();
        path
    }

    #[test]
    fn test_load_basic_csv() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir, "basic.csv", b"Age ,name\n25,A\n,B\n25,A\n");

        let df = load_table(&path, &LoadOptions::default()).unwrap();

        assert_eq!(df.shape(), (3, 2));
        assert_eq!(df.get_column_names()[0].as_str(), "Age ");
        assert_eq!(df.column("Age ").unwrap().null_count(), 1);
    }

    #[test]
    fn test_load_missing_file_is_load_error() {
        let err = load_table("does/not/exist.csv", &LoadOptions::default()).unwrap_err();
        assert_eq!(err.error_code(), "LOAD_ERROR");
        assert!(err.to_string().contains("does/not/exist.csv"));
    }

    #[test]
    fn test_load_unknown_encoding() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir, "data.csv", b"a\n1\n");

        let options = LoadOptions::default().with_encoding("klingon-8");
        let err = load_table(&path, &options).unwrap_err();
        assert_eq!(err.error_code(), "LOAD_ERROR");
        assert!(err.to_string().contains("klingon-8"));
    }

    #[test]
    fn test_load_latin1() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir, "latin1.csv", b"name,city\nJos\xe9,M\xe1laga\n");

        let utf8_err = load_table(&path, &LoadOptions::default()).unwrap_err();
        assert_eq!(utf8_err.error_code(), "LOAD_ERROR");

        let df = load_table(&path, &LoadOptions::default().with_encoding("latin1")).unwrap();
        let names = df
            .column("name")
            .unwrap()
            .as_materialized_series()
            .str()
            .unwrap()
            .get(0)
            .map(str::to_string);
        assert_eq!(names, Some("José".to_string()));
    }

    #[test]
    fn test_load_semicolon_decimal_comma() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir, "eu.csv", b"price;qty\n1,5;2\n2,25;3\n");

        let options = LoadOptions::default().with_separator(';').with_decimal(',');
        let df = load_table(&path, &options).unwrap();

        let price = df.column("price").unwrap();
        assert_eq!(price.dtype(), &DataType::Float64);
        assert_eq!(price.get(1).unwrap().try_extract::<f64>().unwrap(), 2.25);
    }

    #[test]
    fn test_load_null_markers() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir, "nulls.csv", b"x,y\n1,NA\nnull,b\n3,N/A\n");

        let df = load_table(&path, &LoadOptions::default()).unwrap();
        assert_eq!(df.column("x").unwrap().null_count(), 1);
        assert_eq!(df.column("y").unwrap().null_count(), 2);
        assert_eq!(df.column("x").unwrap().dtype(), &DataType::Int64);
    }

    #[test]
    fn test_write_then_reload() {
        let dir = TempDir::new().unwrap();
        let mut df = df![
            "age" => [Some(25i64), None, Some(30)],
            "name" => ["a", "b", "c"],
        ]
        .unwrap();

        let out = dir.path().join("out.csv");
        write_table(&mut df, &out).unwrap();

        let content = std::fs::read_to_string(&out).unwrap();
        assert!(content.starts_with("age,name\n"));

        let reloaded = load_table(&out, &LoadOptions::default()).unwrap();
        assert!(reloaded.equals_missing(&df));
    }

    #[test]
    fn test_write_into_missing_directory_fails_cleanly() {
        let dir = TempDir::new().unwrap();
        let mut df = df!["a" => [1, 2]].unwrap();
        let out = dir.path().join("missing").join("out.csv");

        let err = write_table(&mut df, &out).unwrap_err();
        assert_eq!(err.error_code(), "WRITE_ERROR");
        assert!(!out.exists());
    }
}
