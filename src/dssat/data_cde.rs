//! `DATA.CDE`: DSSAT's dictionary of variable codes.

use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeEntry {
    pub code: String,
    pub label: String,
    pub description: String,
}

/// Returns `line[start..end]` by character position, clamped to the line.
fn fixed_field(line: &str, start: usize, end: usize) -> &str {
    let byte_at = |pos: usize| {
        line.char_indices()
            .nth(pos)
            .map(|(i, _)| i)
            .unwrap_or(line.len())
    };
    let from = byte_at(start);
    let to = byte_at(end).max(from);
    line[from..to].trim()
}

pub fn parse_data_cde(text: &str) -> Vec<CodeEntry> {
    text.lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| {
            !line.trim().is_empty()
                && !line.starts_with('@')
                && !line.starts_with('!')
                && !line.starts_with('*')
        })
        .map(|line| CodeEntry {
            code: fixed_field(line, 0, 7).to_string(),
            label: fixed_field(line, 7, 23).to_string(),
            description: fixed_field(line, 23, 80).to_string(),
        })
        .filter(|entry| !entry.code.is_empty())
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct CodeBook {
    entries: Vec<CodeEntry>,
    by_code: HashMap<String, usize>,
}

impl CodeBook {
    pub fn from_text(text: &str) -> Self {
        Self::from_entries(parse_data_cde(text))
    }

    /// Later duplicates win, as DATA.CDE sections are appended over time.
    pub fn from_entries(entries: Vec<CodeEntry>) -> Self {
        let by_code = entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (entry.code.clone(), i))
            .collect();
        Self { entries, by_code }
    }

    pub fn get(&self, code: &str) -> Option<&CodeEntry> {
        self.by_code.get(code.trim()).map(|&i| &self.entries[i])
    }

    pub fn entries(&self) -> &[CodeEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATA_CDE: &str = "\
*Simulation Output Codes
@CDE   LABEL           DESCRIPTION..........................................
LAID   LAI             Leaf area index (m2/m2)
CWAD   Tops wt         Tops weight (kg dm/ha)
! comment line
IR#C   Irrig #         Number of irrigation applications
";

    #[test]
    fn test_parse_fixed_columns() {
        let entries = parse_data_cde(DATA_CDE);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].code, "LAID");
        assert_eq!(entries[0].label, "LAI");
        assert_eq!(entries[0].description, "Leaf area index (m2/m2)");
        assert_eq!(entries[2].code, "IR#C");
    }

    #[test]
    fn test_code_book_lookup() {
        let book = CodeBook::from_text(DATA_CDE);
        assert_eq!(book.len(), 3);
        assert_eq!(book.get("CWAD").unwrap().label, "Tops wt");
        assert!(book.get("HWAM").is_none());
    }

    #[test]
    fn test_short_line_does_not_panic() {
        let entries = parse_data_cde("XYZ\n");
        assert_eq!(entries[0].code, "XYZ");
        assert_eq!(entries[0].label, "");
    }
}
