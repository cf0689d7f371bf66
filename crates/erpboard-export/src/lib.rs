//! CSV and XLSX export of dashboard views

pub mod datasets;
pub mod delimited;
pub mod error;
pub mod format;
pub mod table;
pub mod workbook;

use chrono::NaiveDate;
use erpboard_config::ExportFormat;
use std::path::{Path, PathBuf};

pub use datasets::{tyc_table, Dataset};
pub use error::{ExportError, ExportResult};
pub use format::{format_decimal, format_money, format_pct};
pub use table::{Cell, ExportTable};

/// `<dataset>_<YYYY-MM-DD>.<ext>`
pub fn export_filename(dataset: &str, format: ExportFormat, date: NaiveDate) -> String {
    format!(
        "{}_{}.{}",
        dataset,
        date.format("%Y-%m-%d"),
        format.extension()
    )
}

/// Encode `table` in `format`
pub fn render(table: &ExportTable, format: ExportFormat) -> ExportResult<Vec<u8>> {
    match format {
        ExportFormat::Csv => delimited::to_csv_bytes(table),
        ExportFormat::Xlsx => workbook::to_xlsx_bytes(table),
    }
}

/// Write `table` into `dir` under its dated file name
pub fn write_to_dir(
    table: &ExportTable,
    dataset: &str,
    format: ExportFormat,
    dir: &Path,
    date: NaiveDate,
) -> ExportResult<PathBuf> {
    let bytes = render(table, format)?;
    let path = dir.join(export_filename(dataset, format, date));

    let io_error = |e: std::io::Error| ExportError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    };
    std::fs::create_dir_all(dir).map_err(io_error)?;
    std::fs::write(&path, &bytes).map_err(io_error)?;

    log::info!(
        target: "erpboard::export",
        "Exported {} ({} row(s), {} bytes) to {}",
        dataset,
        table.len(),
        bytes.len(),
        path.display()
    );
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
    }

    #[test]
    fn test_export_filename() {
        assert_eq!(export_filename("vendors", ExportFormat::Csv, date()), "vendors_2024-03-09.csv");
        assert_eq!(export_filename("tyc", ExportFormat::Xlsx, date()), "tyc_2024-03-09.xlsx");
    }

    #[test]
    fn test_write_to_dir() {
        let dir = std::env::temp_dir().join(format!("erpboard-export-{}", std::process::id()));
        let mut table = ExportTable::new("Clients", ["Name", "Total"]);
        table.push(vec![Cell::text("Bazar"), Cell::Integer(3)]);

        let path = write_to_dir(&table, "clients", ExportFormat::Csv, &dir, date()).unwrap();
        assert!(path.ends_with("clients_2024-03-09.csv"));
        let content = std::fs::read(&path).unwrap();
        assert!(content.starts_with(delimited::BOM));
        assert!(String::from_utf8_lossy(&content).contains("\"Bazar\";\"3\""));

        std::fs::remove_dir_all(&dir).ok();
    }
}
