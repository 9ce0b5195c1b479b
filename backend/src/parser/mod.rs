//! CSV reader with encoding and delimiter auto-detection.
//!
//! Produces a [`DataTable`]: the header row plus raw data rows. Cells are kept
//! as text; interpreting them is the row processor's job.

use serde::Serialize;
use std::path::Path;

/// CSV parsing error with context
#[derive(Debug, Clone)]
pub struct CsvError {
    pub line: usize,
    pub column: Option<String>,
    pub value: Option<String>,
    pub message: String,
}

impl std::fmt::Display for CsvError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.column, &self.value) {
            (Some(col), Some(val)) => {
                write!(f, "Line {}, column '{}' (value '{}'): {}", self.line, col, val, self.message)
            }
            (Some(col), None) => {
                write!(f, "Line {}, column '{}': {}", self.line, col, self.message)
            }
            _ => write!(f, "Line {}: {}", self.line, self.message),
        }
    }
}

impl std::error::Error for CsvError {}

impl CsvError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            column: None,
            value: None,
            message: message.into(),
        }
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// Parsed file: header row and data rows, with the settings used.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataTable {
    /// Header cells, trimmed
    pub headers: Vec<String>,
    /// Data rows, each padded to the header width
    pub rows: Vec<Vec<String>>,
    /// Detected or used encoding
    pub encoding: String,
    /// Detected or used delimiter
    pub delimiter: char,
}

impl DataTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let charset = chardet::detect(bytes).0;

    match charset.to_lowercase().as_str() {
        "" | "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to a string using the given encoding.
///
/// Unknown encodings fall back to lossy UTF-8.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    let decoded = match encoding.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::ISO_8859_15.decode(bytes).0.into_owned(),
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    };
    decoded.trim_start_matches('\u{feff}').to_string()
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [';', ',', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse CSV text with an explicit delimiter.
///
/// Standard CSV quoting applies. Blank rows are skipped and short rows are
/// padded with empty cells; extra cells beyond the header are kept.
pub fn parse_str(content: &str, delimiter: char) -> Result<DataTable, CsvError> {
    if !delimiter.is_ascii() {
        return Err(CsvError::new(0, "Delimiter must be a single ASCII character")
            .with_value(delimiter.to_string()));
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut records = reader.records();

    let headers: Vec<String> = match records.next() {
        Some(Ok(record)) => record.iter().map(|h| h.trim().to_string()).collect(),
        Some(Err(e)) => return Err(CsvError::new(1, format!("Cannot read header: {}", e))),
        None => return Err(CsvError::new(1, "Empty CSV file")),
    };

    if headers.iter().all(|h| h.is_empty()) {
        return Err(CsvError::new(1, "No headers found"));
    }

    let mut rows = Vec::new();
    for record in records {
        let record = record.map_err(|e| {
            let line = e.position().map(|p| p.line() as usize).unwrap_or(0);
            CsvError::new(line, format!("Cannot read line: {}", e))
        })?;

        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        let mut row: Vec<String> = record.iter().map(str::to_string).collect();
        if row.len() < headers.len() {
            row.resize(headers.len(), String::new());
        }
        rows.push(row);
    }

    Ok(DataTable {
        headers,
        rows,
        encoding: "utf-8".to_string(),
        delimiter,
    })
}

/// Parse CSV bytes with auto-detection of encoding and delimiter.
pub fn parse_bytes_auto(bytes: &[u8]) -> Result<DataTable, CsvError> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let delimiter = detect_delimiter(&content);

    let mut table = parse_str(&content, delimiter)?;
    table.encoding = encoding;
    Ok(table)
}

/// Parse a CSV file with auto-detection of encoding and delimiter.
pub fn parse_file_auto<P: AsRef<Path>>(path: P) -> Result<DataTable, CsvError> {
    let bytes = read_file(path.as_ref())?;
    parse_bytes_auto(&bytes)
}

/// Parse a CSV file with an explicit delimiter (encoding still detected).
pub fn parse_file<P: AsRef<Path>>(path: P, delimiter: char) -> Result<DataTable, CsvError> {
    let bytes = read_file(path.as_ref())?;
    let encoding = detect_encoding(&bytes);
    let content = decode_content(&bytes, &encoding);

    let mut table = parse_str(&content, delimiter)?;
    table.encoding = encoding;
    Ok(table)
}

fn read_file(path: &Path) -> Result<Vec<u8>, CsvError> {
    std::fs::read(path)
        .map_err(|e| CsvError::new(0, format!("Cannot read file '{}': {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_simple_csv() {
        let table = parse_str("Name,SKU\nMug,MUG1\nCap,CAP1", ',').unwrap();

        assert_eq!(table.headers, vec!["Name", "SKU"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0], vec!["Mug", "MUG1"]);
        assert_eq!(table.rows[1], vec!["Cap", "CAP1"]);
    }

    #[test]
    fn test_quoted_cells_keep_delimiters() {
        let csv = "Name,Variants\n\"Mug\",\"size:S,M,L\"";
        let table = parse_str(csv, ',').unwrap();

        assert_eq!(table.rows[0][1], "size:S,M,L");
    }

    #[test]
    fn test_blank_rows_skipped() {
        let table = parse_str("a;b\n1;2\n\n;\n3;4\n", ';').unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_short_rows_padded() {
        let table = parse_str("a;b;c\n1", ';').unwrap();
        assert_eq!(table.rows[0], vec!["1", "", ""]);
    }

    #[test]
    fn test_error_message_format() {
        let err = CsvError::new(5, "Invalid value")
            .with_column("price")
            .with_value("abc");

        let msg = err.to_string();
        assert!(msg.contains("Line 5"));
        assert!(msg.contains("column 'price'"));
        assert!(msg.contains("value 'abc'"));
    }

    #[test]
    fn test_empty_csv_error() {
        let err = parse_str("", ',').unwrap_err();
        assert!(err.message.contains("Empty"));
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), ',');
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3"), '\t');
        assert_eq!(detect_delimiter("a|b|c\n1|2|3"), '|');
        assert_eq!(detect_delimiter("name"), ',');
    }

    #[test]
    fn test_auto_parse() {
        let result = parse_bytes_auto("Name;Price\nMug;9.99\nCap;4.50".as_bytes()).unwrap();

        assert_eq!(result.delimiter, ';');
        assert_eq!(result.encoding, "utf-8");
        assert_eq!(result.len(), 2);
        assert_eq!(result.headers, vec!["Name", "Price"]);
    }

    #[test]
    fn test_bom_stripped() {
        let result = parse_bytes_auto("\u{feff}Name,SKU\nMug,M1".as_bytes()).unwrap();
        assert_eq!(result.headers[0], "Name");
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        let decoded = decode_content(bytes, "iso-8859-1");
        assert_eq!(decoded, "Société");
    }

    #[test]
    fn test_parse_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Name|SKU").unwrap();
        writeln!(file, "Mug|M1").unwrap();

        let table = parse_file_auto(file.path()).unwrap();
        assert_eq!(table.delimiter, '|');
        assert_eq!(table.rows[0], vec!["Mug", "M1"]);

        let table = parse_file(file.path(), '|').unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_missing_file() {
        let err = parse_file_auto("/nonexistent/products.csv").unwrap_err();
        assert!(err.message.contains("Cannot read file"));
    }
}
