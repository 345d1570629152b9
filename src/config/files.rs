//! Reading initial states and parameter tables from `.csv` / `.json` files.

use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::error::ConfigError;

/// One named per-agent column loaded from a parameter file.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Column {
    pub name: String,
    /// Shape of a single agent's value (`[]` for scalars).
    pub shape: Vec<usize>,
    /// One flattened value per agent.
    pub rows: Vec<Vec<f64>>,
}

enum FileKind {
    Csv,
    Json,
}

fn file_kind(path: &Path) -> Result<FileKind, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.to_path_buf()));
    }
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    match extension.as_str() {
        "csv" => Ok(FileKind::Csv),
        "json" => Ok(FileKind::Json),
        _ => Err(ConfigError::UnsupportedFile {
            path: path.to_path_buf(),
            extension,
        }),
    }
}

fn read_text(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|e| parse_error(path, e))
}

fn parse_error(path: &Path, reason: impl ToString) -> ConfigError {
    ConfigError::Parse {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn parse_csv_row(path: &Path, line_no: usize, line: &str) -> Result<Vec<f64>, ConfigError> {
    line.split(',')
        .map(|cell| {
            cell.trim()
                .parse::<f64>()
                .map_err(|e| parse_error(path, format!("line {}: {}", line_no + 1, e)))
        })
        .collect()
}

fn data_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(i, l)| (i, l.trim()))
        .filter(|(_, l)| !l.is_empty())
}

/// Reads an `N × D` state matrix.
///
/// `.csv` files have no header, one agent per line. `.json` files hold an
/// object with a `"states"` array of rows.
pub(crate) fn read_states(path: &Path) -> Result<Vec<Vec<f64>>, ConfigError> {
    let rows = match file_kind(path)? {
        FileKind::Csv => {
            let text = read_text(path)?;
            data_lines(&text)
                .map(|(i, line)| parse_csv_row(path, i, line))
                .collect::<Result<Vec<_>, _>>()?
        }
        FileKind::Json => {
            let text = read_text(path)?;
            let value: Value = serde_json::from_str(&text).map_err(|e| parse_error(path, e))?;
            let states = value
                .get("states")
                .ok_or_else(|| parse_error(path, "missing 'states' array"))?;
            serde_json::from_value::<Vec<Vec<f64>>>(states.clone())
                .map_err(|e| parse_error(path, e))?
        }
    };

    if let Some(first) = rows.first() {
        if rows.iter().any(|r| r.len() != first.len()) {
            return Err(parse_error(path, "rows have different lengths"));
        }
    }
    Ok(rows)
}

/// Reads named per-agent columns.
///
/// `.csv` files carry a header line with one scalar parameter per column.
/// `.json` files hold an object mapping each name to an array with one
/// entry per agent (number, vector or matrix).
pub(crate) fn read_columns(path: &Path) -> Result<Vec<Column>, ConfigError> {
    match file_kind(path)? {
        FileKind::Csv => {
            let text = read_text(path)?;
            let mut lines = data_lines(&text);
            let (_, header) = lines
                .next()
                .ok_or_else(|| parse_error(path, "empty file"))?;
            let names: Vec<String> = header.split(',').map(|s| s.trim().to_string()).collect();
            let mut columns: Vec<Column> = names
                .into_iter()
                .map(|name| Column {
                    name,
                    shape: Vec::new(),
                    rows: Vec::new(),
                })
                .collect();
            for (i, line) in lines {
                let row = parse_csv_row(path, i, line)?;
                if row.len() != columns.len() {
                    return Err(parse_error(
                        path,
                        format!("line {} has {} cells, header has {}", i + 1, row.len(), columns.len()),
                    ));
                }
                for (column, value) in columns.iter_mut().zip(row) {
                    column.rows.push(vec![value]);
                }
            }
            Ok(columns)
        }
        FileKind::Json => {
            let text = read_text(path)?;
            let value: Value = serde_json::from_str(&text).map_err(|e| parse_error(path, e))?;
            let object = value
                .as_object()
                .ok_or_else(|| parse_error(path, "expected a JSON object of arrays"))?;
            object
                .iter()
                .map(|(name, entries)| json_column(path, name, entries))
                .collect()
        }
    }
}

fn json_column(path: &Path, name: &str, entries: &Value) -> Result<Column, ConfigError> {
    let entries = entries
        .as_array()
        .ok_or_else(|| parse_error(path, format!("'{}' is not an array", name)))?;

    let mut shape: Option<Vec<usize>> = None;
    let mut rows = Vec::with_capacity(entries.len());
    for entry in entries {
        let (entry_shape, flat) = flatten_json(entry)
            .ok_or_else(|| parse_error(path, format!("'{}' holds a non-numeric entry", name)))?;
        match &shape {
            Some(s) if *s != entry_shape => {
                return Err(parse_error(path, format!("'{}' entries differ in shape", name)));
            }
            Some(_) => {}
            None => shape = Some(entry_shape),
        }
        rows.push(flat);
    }

    Ok(Column {
        name: name.to_string(),
        shape: shape.unwrap_or_default(),
        rows,
    })
}

/// Flattens a number, vector or rectangular matrix.
fn flatten_json(value: &Value) -> Option<(Vec<usize>, Vec<f64>)> {
    if let Some(x) = value.as_f64() {
        return Some((Vec::new(), vec![x]));
    }
    let items = value.as_array()?;
    if items.iter().all(Value::is_number) {
        let flat: Vec<f64> = items.iter().filter_map(Value::as_f64).collect();
        return Some((vec![flat.len()], flat));
    }
    let mut flat = Vec::new();
    let mut cols = None;
    for row in items {
        let row = row.as_array()?;
        if *cols.get_or_insert(row.len()) != row.len() {
            return None;
        }
        for x in row {
            flat.push(x.as_f64()?);
        }
    }
    Some((vec![items.len(), cols.unwrap_or(0)], flat))
}
