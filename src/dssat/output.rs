//! Reader for DSSAT columnar output files (`PlantGro.OUT`, `SoilWat.OUT`, ...).
//!
//! An output file is a sequence of run blocks. Each block opens with a
//! `*RUN` line, carries a few `key : value` description lines (one of which
//! is the ` MODEL` line naming the crop), and then one or more tables whose
//! header line starts with `@`. A table runs until the next blank line.

use crate::utils::error::{DssatError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct OutputTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl OutputTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name)
    }

    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &str> + '_> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| row[idx].as_str()))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunBlock {
    /// `0` for tables that appear before any `*RUN` line.
    pub run: u32,
    pub label: String,
    pub crop: Option<String>,
    pub tables: Vec<OutputTable>,
}

impl RunBlock {
    /// The label minus its trailing `<model> <experiment> <trno>` tokens.
    pub fn treatment_name(&self) -> String {
        let tokens: Vec<&str> = self.label.split_whitespace().collect();
        let keep = tokens.len().saturating_sub(3);
        tokens[..keep].join(" ")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputFile {
    pub name: String,
    pub runs: Vec<RunBlock>,
}

impl OutputFile {
    pub fn tables(&self) -> impl Iterator<Item = &OutputTable> {
        self.runs.iter().flat_map(|run| run.tables.iter())
    }

    /// Crops in file order, one per run that has a ` MODEL` line.
    pub fn crops(&self) -> Vec<&str> {
        self.runs.iter().filter_map(|run| run.crop.as_deref()).collect()
    }
}

pub fn parse_output(name: &str, text: &str) -> Result<OutputFile> {
    let mut runs: Vec<RunBlock> = Vec::new();
    let mut in_table = false;

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim_end_matches('\r');

        if line.trim().is_empty() {
            in_table = false;
            continue;
        }

        if line.starts_with("*RUN") {
            in_table = false;
            runs.push(parse_run_line(name, line_no, line)?);
            continue;
        }

        if line.starts_with('*') {
            in_table = false;
            continue;
        }

        if line.starts_with(" MODEL") {
            if let Some(crop) = line.trim().rsplit(" - ").next() {
                current_run(&mut runs).crop = Some(crop.trim().to_string());
            }
            continue;
        }

        if let Some(header) = line.strip_prefix('@') {
            let header: Vec<String> = header
                .replace('.', "")
                .split_whitespace()
                .map(str::to_string)
                .collect();
            if header.is_empty() {
                return Err(DssatError::parse(name, line_no, "empty table header"));
            }
            current_run(&mut runs).tables.push(OutputTable {
                header,
                rows: Vec::new(),
            });
            in_table = true;
            continue;
        }

        if !in_table || line.starts_with('!') {
            continue;
        }

        let table = current_run(&mut runs)
            .tables
            .last_mut()
            .ok_or_else(|| DssatError::parse(name, line_no, "row outside of a table"))?;
        let cells: Vec<String> = line.split_whitespace().map(str::to_string).collect();
        if cells.len() != table.header.len() {
            return Err(DssatError::parse(
                name,
                line_no,
                format!(
                    "expected {} columns, found {}",
                    table.header.len(),
                    cells.len()
                ),
            ));
        }
        table.rows.push(cells);
    }

    tracing::debug!(
        "Parsed {} with {} run(s), {} table(s)",
        name,
        runs.len(),
        runs.iter().map(|r| r.tables.len()).sum::<usize>()
    );

    Ok(OutputFile {
        name: name.to_string(),
        runs,
    })
}

fn current_run(runs: &mut Vec<RunBlock>) -> &mut RunBlock {
    if runs.is_empty() {
        runs.push(RunBlock {
            run: 0,
            label: String::new(),
            crop: None,
            tables: Vec::new(),
        });
    }
    let last = runs.len() - 1;
    &mut runs[last]
}

pub(crate) fn parse_run_line(name: &str, line_no: usize, line: &str) -> Result<RunBlock> {
    let (head, label) = match line.split_once(':') {
        Some((head, label)) => (head, label.trim()),
        None => (line, ""),
    };
    let run = head
        .split_whitespace()
        .nth(1)
        .and_then(|tok| tok.parse::<u32>().ok())
        .ok_or_else(|| DssatError::parse(name, line_no, "missing run number after *RUN"))?;

    Ok(RunBlock {
        run,
        label: label.to_string(),
        crop: None,
        tables: Vec::new(),
    })
}

#[cfg(test)]
pub(crate) mod fixtures {
    pub const PLANT_GRO: &str = "\
$GROWTH ASPECTS OUTPUT FILE

*DSSAT Cropping System Model Ver. 4.7.5.001 -dev        JAN 01, 2020 12:00:00

*RUN   1        : Rainfed low N          MZCER047 UFGA8201   1
 MODEL          : MZCER047 - Maize
 EXPERIMENT     : UFGA8201 MZ NITROGEN X IRRIGATION, GAINESVILLE
 TREATMENT  1   : Rainfed low N          MZCER047

!IDETG=Y  Plant growth output
@YEAR DOY   DAS   DAP   LAID  CWAD  SNW0C
 1982  57     0     0   0.00     0    0.0
 1982  58     1     1   0.10    12    1.5
 1982  59     2     2   0.25    30    4.0

*RUN   2        : Irrigated high N       MZCER047 UFGA8201   2
 MODEL          : MZCER047 - Maize
 EXPERIMENT     : UFGA8201 MZ NITROGEN X IRRIGATION, GAINESVILLE
 TREATMENT  2   : Irrigated high N       MZCER047

@YEAR DOY   DAS   DAP   LAID  CWAD  SNW0C
 1982  57     0     0   0.00     0    0.0
 1982  58     1     1   0.20    15    2.0
";
}
