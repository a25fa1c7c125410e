//! Reading job sheets from CSV and XLSX files

use anyhow::{Context, Result, anyhow, bail};
use calamine::{Reader, Xlsx, open_workbook};
use csv::{ReaderBuilder, StringRecord, Trim};
use log::{debug, info};
use std::io::Read;
use std::path::Path;

use super::row::JobRow;

/// Header row of a spreadsheet; data starts at row 2
const FIRST_DATA_ROW: usize = 2;

/// A loaded sheet: parsed rows plus the raw cells they came from
#[derive(Debug, Clone, Default)]
pub struct JobSheet {
    pub headers: Vec<String>,
    /// Raw cells per row, aligned with `rows`
    pub records: Vec<Vec<String>>,
    pub rows: Vec<JobRow>,
}

impl JobSheet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn from_records(headers: StringRecord, records: Vec<(usize, StringRecord)>) -> Result<Self> {
        let mut sheet = JobSheet {
            headers: headers.iter().map(str::to_string).collect(),
            ..Default::default()
        };

        for (row_number, record) in records {
            let mut row: JobRow = record
                .deserialize(Some(&headers))
                .with_context(|| format!("Failed to read row {}", row_number))?;
            row.row_number = row_number;

            sheet.records.push(record.iter().map(str::to_string).collect());
            sheet.rows.push(row);
        }

        Ok(sheet)
    }
}

/// Load a job sheet, picking the parser from the file extension
pub fn load_rows<P: AsRef<Path>>(path: P, sheet: Option<&str>) -> Result<JobSheet> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let loaded = match extension.as_str() {
        "csv" => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            parse_csv(file)?
        }
        "xlsx" | "xlsm" => load_xlsx(path, sheet)?,
        other => bail!("Unsupported file type '.{}' (expected .csv or .xlsx)", other),
    };

    info!("Loaded {} row(s) from {}", loaded.len(), path.display());
    Ok(loaded)
}

/// Parse CSV text. Headers and cells are trimmed; unknown columns are ignored.
pub fn parse_csv<R: Read>(reader: R) -> Result<JobSheet> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = reader.headers().context("Failed to read CSV header")?.clone();
    if headers.is_empty() {
        bail!("CSV file has no header row");
    }

    let mut records = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Failed to read CSV row {}", idx + FIRST_DATA_ROW))?;
        records.push((idx + FIRST_DATA_ROW, record));
    }

    JobSheet::from_records(headers, records)
}

fn load_xlsx(path: &Path, sheet: Option<&str>) -> Result<JobSheet> {
    let mut workbook: Xlsx<_> =
        open_workbook(path).with_context(|| format!("Failed to open workbook {}", path.display()))?;

    let sheet_name = match sheet {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| anyhow!("Excel file contains no sheets"))?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| anyhow!("Error reading sheet '{}': {}", sheet_name, e))?;

    let mut rows = range.rows();
    let Some(header_cells) = rows.next() else {
        bail!("Sheet '{}' is empty", sheet_name);
    };
    let headers: StringRecord = header_cells.iter().map(|c| c.to_string().trim().to_string()).collect();

    let mut records = Vec::new();
    for (idx, cells) in rows.enumerate() {
        let values: Vec<String> = cells.iter().map(|c| c.to_string().trim().to_string()).collect();
        if values.iter().all(|v| v.is_empty()) {
            debug!("Skipping empty sheet row {}", idx + FIRST_DATA_ROW);
            continue;
        }
        records.push((idx + FIRST_DATA_ROW, StringRecord::from(values)));
    }

    JobSheet::from_records(headers, records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = "\
title_en, site_name ,owner_email,date_start,date_end,hour_start,minute_start,hour_end,minute_end,notes
Clean lobby,Main Office,a@x.com,2025-03-01,2025-03-01,9,0,17,0,ignored
Empty cells,,,,,,,,,
";

    #[test]
    fn test_parse_csv_rows_and_numbers() {
        let sheet = parse_csv(SAMPLE.as_bytes()).unwrap();

        assert_eq!(sheet.len(), 2);
        assert_eq!(sheet.headers[1], "site_name");

        let first = &sheet.rows[0];
        assert_eq!(first.row_number, 2);
        assert_eq!(first.title_en.as_deref(), Some("Clean lobby"));
        assert_eq!(first.site_name.as_deref(), Some("Main Office"));
        assert_eq!(first.hour_end.as_deref(), Some("17"));

        let second = &sheet.rows[1];
        assert_eq!(second.row_number, 3);
        assert_eq!(second.field("site_name"), None);
        assert_eq!(sheet.records[1][0], "Empty cells");
    }

    #[test]
    fn test_load_rows_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.csv");
        std::fs::File::create(&path).unwrap().write_all(SAMPLE.as_bytes()).unwrap();

        let sheet = load_rows(&path, None).unwrap();
        assert_eq!(sheet.len(), 2);

        let other = dir.path().join("jobs.txt");
        std::fs::write(&other, SAMPLE).unwrap();
        assert!(load_rows(&other, None).is_err());
    }
}
