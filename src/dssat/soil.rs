//! Read-only access to soil profiles in DSSAT `*.SOL` files.

use crate::utils::error::{DssatError, Result};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SoilValue {
    Number(f64),
    Text(String),
}

impl SoilValue {
    fn from_token(token: &str) -> Self {
        match token.parse::<f64>() {
            Ok(value) => SoilValue::Number(value),
            Err(_) => SoilValue::Text(token.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SoilValue::Number(value) => Some(*value),
            SoilValue::Text(_) => None,
        }
    }
}

impl fmt::Display for SoilValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SoilValue::Number(value) => write!(f, "{}", value),
            SoilValue::Text(text) => f.write_str(text),
        }
    }
}

pub type SoilRow = Vec<(String, SoilValue)>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SoilLayer {
    /// Depth to the bottom of the layer, cm (`SLB`).
    pub depth: f64,
    pub values: SoilRow,
}

impl SoilLayer {
    pub fn get(&self, column: &str) -> Option<&SoilValue> {
        self.values.iter().find(|(c, _)| c == column).map(|(_, v)| v)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SoilProfile {
    pub id: String,
    /// Rest of the `*ID` line: source, texture, depth and name.
    pub description: String,
    pub site: String,
    pub surface: SoilRow,
    pub layers: Vec<SoilLayer>,
    /// The profile block as it appears in the file, comments included.
    pub text: String,
}

impl SoilProfile {
    pub fn surface_value(&self, column: &str) -> Option<&SoilValue> {
        self.surface.iter().find(|(c, _)| c == column).map(|(_, v)| v)
    }

    /// Column names across all layer tables, in first-seen order.
    pub fn layer_columns(&self) -> Vec<&str> {
        let mut columns: Vec<&str> = Vec::new();
        for layer in &self.layers {
            for (column, _) in &layer.values {
                if !columns.contains(&column.as_str()) {
                    columns.push(column);
                }
            }
        }
        columns
    }
}

struct Section {
    header: Vec<String>,
    header_line: usize,
    rows: Vec<(usize, String)>,
}

/// Finds the profile `soil_id` (with or without its leading `*`) in `text`.
pub fn read_soil_profile(name: &str, text: &str, soil_id: &str) -> Result<SoilProfile> {
    let id = soil_id.trim().trim_start_matches('*');
    let marker = format!("*{}", id);

    let mut block = String::new();
    let mut description = String::new();
    let mut sections: Vec<Section> = Vec::new();
    let mut found = false;

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim_end_matches('\r');

        if !found {
            if line.starts_with(&marker)
                && line[marker.len()..]
                    .chars()
                    .next()
                    .map_or(true, char::is_whitespace)
            {
                found = true;
                description = line[marker.len()..].trim().to_string();
                block.push_str(line);
                block.push('\n');
            }
            continue;
        }

        if line.starts_with('*') {
            break;
        }
        block.push_str(line);
        block.push('\n');

        if line.trim().is_empty() || line.starts_with('!') {
            continue;
        }
        if let Some(header) = line.strip_prefix('@') {
            sections.push(Section {
                header: header.split_whitespace().map(str::to_string).collect(),
                header_line: line_no,
                rows: Vec::new(),
            });
            continue;
        }
        match sections.last_mut() {
            Some(section) => section.rows.push((line_no, line.to_string())),
            None => return Err(DssatError::parse(name, line_no, "soil data before any '@' header")),
        }
    }

    if !found {
        return Err(DssatError::ProfileNotFoundError {
            file: name.to_string(),
            soil_id: id.to_string(),
        });
    }

    let mut sections = sections.into_iter();
    let site = sections
        .next()
        .and_then(|s| s.rows.into_iter().next())
        .map(|(_, row)| row.trim().to_string())
        .unwrap_or_default();

    let surface = match sections.next() {
        Some(section) => {
            let rows = table_rows(name, &section)?;
            rows.into_iter().next().unwrap_or_default()
        }
        None => Vec::new(),
    };

    let mut layers: Vec<SoilLayer> = Vec::new();
    for section in sections {
        for row in table_rows(name, &section)? {
            let depth = row
                .iter()
                .find(|(c, _)| c == "SLB")
                .and_then(|(_, v)| v.as_f64())
                .ok_or_else(|| DssatError::missing_column(name, "SLB"))?;
            let extra = row.into_iter().filter(|(c, _)| c != "SLB");
            match layers.iter_mut().find(|l| l.depth == depth) {
                Some(layer) => layer.values.extend(extra),
                None => {
                    let mut values = vec![("SLB".to_string(), SoilValue::Number(depth))];
                    values.extend(extra);
                    layers.push(SoilLayer { depth, values });
                }
            }
        }
    }

    tracing::debug!("Soil profile {} has {} layer(s)", id, layers.len());

    Ok(SoilProfile {
        id: id.to_string(),
        description,
        site,
        surface,
        layers,
        text: block,
    })
}

fn table_rows(name: &str, section: &Section) -> Result<Vec<SoilRow>> {
    if section.header.is_empty() {
        return Err(DssatError::parse(name, section.header_line, "empty table header"));
    }
    section
        .rows
        .iter()
        .map(|(line_no, line)| {
            let cells: Vec<&str> = line.split_whitespace().collect();
            if cells.len() != section.header.len() {
                return Err(DssatError::parse(
                    name,
                    *line_no,
                    format!(
                        "expected {} columns, found {}",
                        section.header.len(),
                        cells.len()
                    ),
                ));
            }
            Ok(section
                .header
                .iter()
                .zip(cells)
                .map(|(column, cell)| (column.clone(), SoilValue::from_token(cell)))
                .collect())
        })
        .collect()
}
