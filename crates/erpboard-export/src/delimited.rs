//! Semicolon-separated CSV for spreadsheet tools
//!
//! Output starts with a UTF-8 byte order mark and quotes every field.

use csv::{QuoteStyle, Terminator, WriterBuilder};
use std::io::Write;

use crate::error::{ExportError, ExportResult};
use crate::table::ExportTable;

pub const BOM: &[u8] = b"\xEF\xBB\xBF";
pub const DELIMITER: u8 = b';';

/// Write `table` as CSV into `out`
pub fn write_csv<W: Write>(table: &ExportTable, mut out: W) -> ExportResult<W> {
    out.write_all(BOM).map_err(|e| ExportError::Csv {
        message: e.to_string(),
    })?;

    let mut writer = WriterBuilder::new()
        .delimiter(DELIMITER)
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::CRLF)
        .from_writer(out);

    writer.write_record(&table.headers)?;
    for row in &table.rows {
        writer.write_record(row.iter().map(|cell| cell.render()))?;
    }

    writer.into_inner().map_err(|e| ExportError::Csv {
        message: e.error().to_string(),
    })
}

/// CSV bytes for `table`
pub fn to_csv_bytes(table: &ExportTable) -> ExportResult<Vec<u8>> {
    write_csv(table, Vec::new())
}
