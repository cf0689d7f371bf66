//! Single-sheet XLSX workbooks

use rust_xlsxwriter::{Format, Workbook};

use crate::error::{ExportError, ExportResult};
use crate::table::{Cell, ExportTable};

/// Longest sheet name Excel accepts
const MAX_SHEET_NAME: usize = 31;

/// Sheet name with the characters Excel rejects removed
pub fn sheet_name(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
        .take(MAX_SHEET_NAME)
        .collect();
    let cleaned = cleaned.trim().trim_matches('\'').to_string();
    if cleaned.is_empty() {
        "Sheet1".to_string()
    } else {
        cleaned
    }
}

/// XLSX bytes for `table`: bold frozen header row, numeric cells as
/// numbers, columns auto-fitted
pub fn to_xlsx_bytes(table: &ExportTable) -> ExportResult<Vec<u8>> {
    let header = Format::new().set_bold();
    let money = Format::new().set_num_format("#,##0.00");
    let ratio = Format::new().set_num_format("0.00");

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name(sheet_name(&table.title))?;

        for (col, title) in table.headers.iter().enumerate() {
            sheet.write_string_with_format(0, column(col)?, title, &header)?;
        }
        for (r, row) in table.rows.iter().enumerate() {
            let r = (r + 1) as u32;
            for (c, cell) in row.iter().enumerate() {
                let c = column(c)?;
                match cell {
                    Cell::Text(text) => {
                        sheet.write_string(r, c, text)?;
                    }
                    Cell::Integer(value) => {
                        sheet.write_number(r, c, *value as f64)?;
                    }
                    Cell::Money(_) => {
                        if let Some(value) = cell.as_f64() {
                            sheet.write_number_with_format(r, c, value, &money)?;
                        }
                    }
                    Cell::Number(value) => {
                        sheet.write_number_with_format(r, c, *value, &ratio)?;
                    }
                    Cell::Empty => {}
                }
            }
        }

        sheet.set_freeze_panes(1, 0)?;
        sheet.autofit();
    }

    Ok(workbook.save_to_buffer()?)
}

fn column(index: usize) -> ExportResult<u16> {
    u16::try_from(index).map_err(|_| ExportError::Xlsx {
        message: format!("too many columns ({})", index + 1),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_sheet_name_is_sanitized() {
        assert_eq!(sheet_name("Sales [2024/03]"), "Sales 202403");
        assert_eq!(sheet_name("???"), "Sheet1");
        assert_eq!(sheet_name(&"x".repeat(40)).len(), 31);
    }

    #[test]
    fn test_workbook_is_a_zip() {
        let mut table = ExportTable::new("Vendors", ["Name", "Total", "Count", "Share %"]);
        table.push(vec![
            Cell::text("Ana"),
            Cell::Money(Decimal::new(15000, 2)),
            Cell::Integer(2),
            Cell::Number(42.5),
        ]);
        table.push(vec![Cell::text("Luis")]);

        let bytes = to_xlsx_bytes(&table).unwrap();
        assert!(bytes.starts_with(b"PK"));
        assert!(bytes.len() > 1000);
    }
}
