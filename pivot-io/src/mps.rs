//! Free-format MPS reader.
//!
//! Sections `NAME, OBJSENSE, ROWS, COLUMNS, RHS, RANGES, BOUNDS, QSECTION,
//! QMATRIX, QUADOBJ, ENDATA` are parsed; `QCMATRIX, CSECTION, SETS, SOS` are
//! recognized but outside the linear core and rejected explicitly, as are
//! the extension sections (`DELAYEDROWS`, `MODELCUTS`, …). Keywords match
//! case-insensitively. Lines starting with `*` and blank lines are comments.
//!
//! The first `N` row is the objective; later `N` rows are free and dropped
//! (references to them are ignored). Duplicate row or column names warn,
//! references resolve to the first occurrence, and the name tables are
//! cleared when duplicates survive. Numeric fields accept Fortran `D`
//! exponents. Files ending in `.gz` (or starting with the gzip magic) are
//! decompressed transparently.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::time::Instant;

use flate2::read::GzDecoder;
use log::warn;
use thiserror::Error;

use pivot_core::{Hessian, Lp, ObjSense, VarKind};

/// Reader errors.
#[derive(Error, Debug)]
pub enum MpsError {
    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("file appears to be fixed-format MPS")]
    FixedFormat,

    #[error("section {0} is not supported")]
    UnsupportedSection(String),

    #[error("reader time limit exceeded")]
    Timeout,
}

/// Result alias for the reader.
pub type MpsResult<T> = Result<T, MpsError>;

/// Aggregated reader warnings. Individual occurrences are logged with
/// doubling frequency (1st, 2nd, 4th, 8th, …) to keep logs bounded.
#[derive(Debug, Clone, Default)]
pub struct MpsWarnings {
    pub duplicate_row_names: usize,
    pub duplicate_col_names: usize,
    pub ignored_duplicate_entries: usize,
    pub negative_upper_bounds: usize,
    pub fractional_integer_bounds: usize,
}

impl MpsWarnings {
    pub fn any(&self) -> bool {
        self.duplicate_row_names > 0
            || self.duplicate_col_names > 0
            || self.ignored_duplicate_entries > 0
            || self.negative_upper_bounds > 0
            || self.fractional_integer_bounds > 0
    }
}

/// Occurrence counter that logs on powers of two.
#[derive(Debug, Clone, Default)]
struct DoublingReporter {
    count: usize,
}

impl DoublingReporter {
    fn report(&mut self, what: &str, detail: &str) {
        self.count += 1;
        if self.count.is_power_of_two() {
            warn!("{} ({}): occurrence {}", what, detail, self.count);
        }
    }
}

/// A parsed model: the LP, an optional Hessian, and the warning summary.
#[derive(Debug, Clone)]
pub struct MpsModel {
    pub lp: Lp,
    pub hessian: Option<Hessian>,
    pub warnings: MpsWarnings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Objsense,
    Rows,
    Columns,
    Rhs,
    Ranges,
    Bounds,
    QuadObj,
    QMatrix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowRef {
    Objective,
    Free,
    Index(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowType {
    Eq,
    Le,
    Ge,
}

const REJECTED_SECTIONS: [&str; 8] = [
    "DELAYEDROWS",
    "MODELCUTS",
    "USERCUTS",
    "INDICATORS",
    "GENCONS",
    "PWLOBJ",
    "PWLNAM",
    "PWLCON",
];

const UNSUPPORTED_SECTIONS: [&str; 4] = ["QCMATRIX", "CSECTION", "SETS", "SOS"];

/// Read an MPS model from a file path. `.gz` files (by suffix or magic) are
/// decompressed transparently.
pub fn read_mps<P: AsRef<Path>>(path: P, time_limit: Option<f64>) -> MpsResult<MpsModel> {
    let path = path.as_ref();
    let mut file = File::open(path)
        .map_err(|_| MpsError::FileNotFound(path.display().to_string()))?;

    let mut magic = [0u8; 2];
    let got = file.read(&mut magic)?;
    let gzipped = (got == 2 && magic == [0x1f, 0x8b])
        || path.extension().map(|e| e == "gz").unwrap_or(false);

    let file = File::open(path)?;
    if gzipped {
        read_mps_from(BufReader::new(GzDecoder::new(file)), time_limit)
    } else {
        read_mps_from(BufReader::new(file), time_limit)
    }
}

/// Read an MPS model from any buffered reader.
pub fn read_mps_from<R: BufRead>(reader: R, time_limit: Option<f64>) -> MpsResult<MpsModel> {
    let start = Instant::now();
    let mut section = Section::None;
    let mut model_name = String::new();
    let mut objective_name = String::from("Objective");
    let mut obj_sense = ObjSense::Minimize;

    let mut row_lookup: HashMap<String, RowRef> = HashMap::new();
    let mut row_names: Vec<String> = Vec::new();
    let mut row_types: Vec<RowType> = Vec::new();
    let mut has_duplicate_rows = false;
    let mut dup_row_reporter = DoublingReporter::default();

    let mut col_lookup: HashMap<String, usize> = HashMap::new();
    let mut col_names: Vec<String> = Vec::new();
    let mut has_duplicate_cols = false;
    let mut dup_col_reporter = DoublingReporter::default();
    let mut dup_entry_reporter = DoublingReporter::default();

    let mut col_cost: Vec<f64> = Vec::new();
    let mut col_entries: Vec<Vec<(usize, f64)>> = Vec::new(); // per column (row, value)
    let mut integrality: Vec<VarKind> = Vec::new();
    let mut integral_section = false;
    let mut last_col: Option<usize> = None;
    let mut offset = 0.0f64;

    let mut rhs: HashMap<usize, f64> = HashMap::new();
    let mut ranges: HashMap<usize, f64> = HashMap::new();

    // Bound state per column: explicit lower/upper plus the defaulting rules.
    let mut bound_lower: HashMap<usize, f64> = HashMap::new();
    let mut bound_upper: HashMap<usize, f64> = HashMap::new();
    let mut warnings = MpsWarnings::default();
    let mut neg_upper_reporter = DoublingReporter::default();
    let mut frac_reporter = DoublingReporter::default();

    let mut q_entries: Vec<(usize, usize, f64)> = Vec::new();

    let mut saw_endata = false;
    let mut line_number = 0usize;

    for line_result in reader.lines() {
        line_number += 1;
        if line_number % 1024 == 0 {
            if let Some(limit) = time_limit {
                if start.elapsed().as_secs_f64() > limit {
                    return Err(MpsError::Timeout);
                }
            }
        }
        let line = line_result?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('*') {
            continue;
        }

        // Section keywords start in column one; indented lines are data, so
        // a column named RHS or BOUNDS cannot be mistaken for a section.
        let unindented = !line.starts_with(' ') && !line.starts_with('\t');
        let first_word = trimmed.split_whitespace().next().unwrap_or("");
        let keyword = if unindented {
            first_word.to_ascii_uppercase()
        } else {
            String::new()
        };

        if keyword == "ENDATA" {
            saw_endata = true;
            break;
        }
        if REJECTED_SECTIONS.contains(&keyword.as_str()) {
            return Err(MpsError::UnsupportedSection(keyword));
        }
        if UNSUPPORTED_SECTIONS.contains(&keyword.as_str()) {
            return Err(MpsError::UnsupportedSection(keyword));
        }
        let new_section = match keyword.as_str() {
            "NAME" => {
                model_name = trimmed
                    .split_whitespace()
                    .nth(1)
                    .unwrap_or("")
                    .to_string();
                section = Section::None;
                continue;
            }
            "OBJSENSE" => {
                // Sense may follow on the same line.
                if let Some(word) = trimmed.split_whitespace().nth(1) {
                    obj_sense = parse_objsense(word);
                    section = Section::None;
                } else {
                    section = Section::Objsense;
                }
                continue;
            }
            "ROWS" => Some(Section::Rows),
            "COLUMNS" => Some(Section::Columns),
            "RHS" => Some(Section::Rhs),
            "RANGES" => Some(Section::Ranges),
            "BOUNDS" => Some(Section::Bounds),
            "QUADOBJ" | "QSECTION" => Some(Section::QuadObj),
            "QMATRIX" => Some(Section::QMatrix),
            _ => None,
        };
        if let Some(s) = new_section {
            section = s;
            continue;
        }

        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        match section {
            Section::None => {
                return Err(MpsError::Parse {
                    line: line_number,
                    message: format!("unexpected content outside any section: {}", trimmed),
                });
            }
            Section::Objsense => {
                obj_sense = parse_objsense(fields[0]);
            }
            Section::Rows => {
                if fields.len() < 2 {
                    return Err(MpsError::Parse {
                        line: line_number,
                        message: "ROWS entry needs a type and a name".to_string(),
                    });
                }
                if fields.len() > 2 {
                    // Extra words after the row name: fixed-format files put
                    // data in fixed character fields with embedded spaces.
                    let name: String = fields[1..].join(" ");
                    if name.len() > 8 {
                        return Err(MpsError::Parse {
                            line: line_number,
                            message: format!("unparsable ROWS entry: {}", trimmed),
                        });
                    }
                    return Err(MpsError::FixedFormat);
                }
                let row_type = fields[0].to_ascii_uppercase();
                let name = fields[1].to_string();
                let reference = match row_type.as_str() {
                    "N" => {
                        if row_lookup.values().any(|&r| r == RowRef::Objective) {
                            RowRef::Free
                        } else {
                            objective_name = name.clone();
                            RowRef::Objective
                        }
                    }
                    "G" => {
                        row_types.push(RowType::Ge);
                        row_names.push(name.clone());
                        RowRef::Index(row_types.len() - 1)
                    }
                    "L" => {
                        row_types.push(RowType::Le);
                        row_names.push(name.clone());
                        RowRef::Index(row_types.len() - 1)
                    }
                    "E" => {
                        row_types.push(RowType::Eq);
                        row_names.push(name.clone());
                        RowRef::Index(row_types.len() - 1)
                    }
                    other => {
                        return Err(MpsError::Parse {
                            line: line_number,
                            message: format!("unknown row type {}", other),
                        });
                    }
                };
                if row_lookup.contains_key(&name) {
                    // First occurrence keeps the name; this row stays in the
                    // model but is only reachable by index.
                    has_duplicate_rows = true;
                    warnings.duplicate_row_names += 1;
                    dup_row_reporter.report("duplicate row name", &name);
                } else {
                    row_lookup.insert(name, reference);
                }
            }
            Section::Columns => {
                // Integer marker pairs toggle integrality.
                if fields.len() >= 2 && fields[1].contains("MARKER") {
                    let is_org = fields.iter().any(|f| f.contains("INTORG"));
                    let is_end = fields.iter().any(|f| f.contains("INTEND"));
                    if is_org == is_end {
                        return Err(MpsError::Parse {
                            line: line_number,
                            message: "marker line is neither INTORG nor INTEND".to_string(),
                        });
                    }
                    integral_section = is_org;
                    continue;
                }
                if fields.len() < 3 {
                    return Err(MpsError::Parse {
                        line: line_number,
                        message: "COLUMNS entry needs name, row, value".to_string(),
                    });
                }
                let col_name = fields[0];
                let continues_previous = last_col
                    .map(|j| col_names[j] == col_name)
                    .unwrap_or(false);
                let col = if continues_previous {
                    last_col.unwrap_or(0)
                } else {
                    match col_lookup.get(col_name) {
                        Some(_) => {
                            // The name reappears after another column
                            // started: a duplicate. It becomes a distinct
                            // column; references keep hitting the first.
                            has_duplicate_cols = true;
                            warnings.duplicate_col_names += 1;
                            dup_col_reporter.report("duplicate column name", col_name);
                            let j2 = col_names.len();
                            col_names.push(col_name.to_string());
                            col_cost.push(0.0);
                            col_entries.push(Vec::new());
                            integrality.push(if integral_section {
                                VarKind::Integer
                            } else {
                                VarKind::Continuous
                            });
                            j2
                        }
                        None => {
                            let j = col_names.len();
                            col_lookup.insert(col_name.to_string(), j);
                            col_names.push(col_name.to_string());
                            col_cost.push(0.0);
                            col_entries.push(Vec::new());
                            integrality.push(if integral_section {
                                VarKind::Integer
                            } else {
                                VarKind::Continuous
                            });
                            j
                        }
                    }
                };
                last_col = Some(col);
                let mut k = 1;
                while k < fields.len() {
                    let row_name = fields[k];
                    let Some(value_text) = fields.get(k + 1) else {
                        return Err(MpsError::Parse {
                            line: line_number,
                            message: format!("row {} has no value", row_name),
                        });
                    };
                    let value = parse_number(value_text, line_number)?;
                    match row_lookup.get(row_name) {
                        Some(RowRef::Objective) => {
                            if col_cost[col] != 0.0 {
                                warnings.ignored_duplicate_entries += 1;
                                dup_entry_reporter
                                    .report("duplicate objective entry", col_name);
                            }
                            col_cost[col] = value;
                        }
                        Some(RowRef::Free) => {}
                        Some(RowRef::Index(i)) => {
                            let i = *i;
                            if col_entries[col].iter().any(|&(r, _)| r == i) {
                                warnings.ignored_duplicate_entries += 1;
                                dup_entry_reporter
                                    .report("duplicate matrix entry", col_name);
                            } else {
                                col_entries[col].push((i, value));
                            }
                        }
                        None => {
                            return Err(MpsError::Parse {
                                line: line_number,
                                message: format!("unknown row {}", row_name),
                            });
                        }
                    }
                    k += 2;
                }
            }
            Section::Rhs => {
                parse_value_pairs(&fields, line_number, |row_name, value| {
                    match row_lookup.get(row_name) {
                        Some(RowRef::Objective) => {
                            // Objective RHS sets the constant: c'x − value.
                            offset = -value;
                            Ok(())
                        }
                        Some(RowRef::Free) => Ok(()),
                        Some(RowRef::Index(i)) => {
                            rhs.insert(*i, value);
                            Ok(())
                        }
                        None => Err(MpsError::Parse {
                            line: line_number,
                            message: format!("RHS for unknown row {}", row_name),
                        }),
                    }
                })?;
            }
            Section::Ranges => {
                parse_value_pairs(&fields, line_number, |row_name, value| {
                    match row_lookup.get(row_name) {
                        Some(RowRef::Index(i)) => {
                            ranges.insert(*i, value);
                            Ok(())
                        }
                        Some(_) => Ok(()),
                        None => Err(MpsError::Parse {
                            line: line_number,
                            message: format!("RANGES for unknown row {}", row_name),
                        }),
                    }
                })?;
            }
            Section::Bounds => {
                if fields.len() < 3 {
                    return Err(MpsError::Parse {
                        line: line_number,
                        message: "BOUNDS entry needs type, set name, column".to_string(),
                    });
                }
                let btype = fields[0].to_ascii_uppercase();
                let col_name = fields[2];
                let Some(&col) = col_lookup.get(col_name) else {
                    return Err(MpsError::Parse {
                        line: line_number,
                        message: format!("bound on unknown column {}", col_name),
                    });
                };
                let needs_value = matches!(
                    btype.as_str(),
                    "UP" | "LO" | "FX" | "LI" | "UI" | "SI" | "SC"
                );
                let value = if needs_value {
                    let Some(text) = fields.get(3) else {
                        return Err(MpsError::Parse {
                            line: line_number,
                            message: format!("bound {} needs a value", btype),
                        });
                    };
                    parse_number(text, line_number)?
                } else {
                    0.0
                };
                let integer_bound = matches!(btype.as_str(), "LI" | "UI" | "BV" | "SI");
                if integer_bound && value.fract() != 0.0 {
                    warnings.fractional_integer_bounds += 1;
                    frac_reporter.report("fractional integer bound", col_name);
                }
                match btype.as_str() {
                    "UP" => {
                        bound_upper.insert(col, value);
                        if value < 0.0 && !bound_lower.contains_key(&col) {
                            // Classic convention: a negative upper bound with
                            // no explicit lower frees the lower bound.
                            warnings.negative_upper_bounds += 1;
                            neg_upper_reporter
                                .report("negative upper bound frees lower", col_name);
                            bound_lower.insert(col, f64::NEG_INFINITY);
                        }
                    }
                    "LO" => {
                        bound_lower.insert(col, value);
                    }
                    "FX" => {
                        bound_lower.insert(col, value);
                        bound_upper.insert(col, value);
                    }
                    "FR" => {
                        bound_lower.insert(col, f64::NEG_INFINITY);
                        bound_upper.insert(col, f64::INFINITY);
                    }
                    "MI" => {
                        bound_lower.insert(col, f64::NEG_INFINITY);
                    }
                    "PL" => {
                        bound_upper.insert(col, f64::INFINITY);
                    }
                    "BV" => {
                        bound_lower.insert(col, 0.0);
                        bound_upper.insert(col, 1.0);
                        integrality[col] = VarKind::Integer;
                    }
                    "LI" => {
                        bound_lower.insert(col, value);
                        integrality[col] = VarKind::Integer;
                    }
                    "UI" => {
                        bound_upper.insert(col, value);
                        integrality[col] = VarKind::Integer;
                    }
                    "SC" => {
                        bound_upper.insert(col, value);
                        integrality[col] = VarKind::SemiContinuous;
                    }
                    "SI" => {
                        bound_upper.insert(col, value);
                        integrality[col] = VarKind::SemiInteger;
                    }
                    other => {
                        return Err(MpsError::Parse {
                            line: line_number,
                            message: format!("unknown bound type {}", other),
                        });
                    }
                }
            }
            Section::QuadObj | Section::QMatrix => {
                if fields.len() < 3 {
                    return Err(MpsError::Parse {
                        line: line_number,
                        message: "quadratic entry needs two columns and a value".to_string(),
                    });
                }
                let (Some(&c1), Some(&c2)) =
                    (col_lookup.get(fields[0]), col_lookup.get(fields[1]))
                else {
                    return Err(MpsError::Parse {
                        line: line_number,
                        message: format!(
                            "quadratic entry on unknown columns {} {}",
                            fields[0], fields[1]
                        ),
                    });
                };
                let value = parse_number(fields[2], line_number)?;
                if section == Section::QMatrix {
                    // The full matrix is listed; keep one triangle.
                    if c1 >= c2 {
                        q_entries.push((c1, c2, value));
                    }
                } else {
                    let (i, j) = if c1 >= c2 { (c1, c2) } else { (c2, c1) };
                    q_entries.push((i, j, value));
                }
            }
        }
    }

    if !saw_endata {
        return Err(MpsError::Parse {
            line: line_number,
            message: "missing ENDATA".to_string(),
        });
    }

    // Assemble the LP.
    let num_col = col_names.len();
    let num_row = row_types.len();
    let mut lp = Lp::new(num_row, num_col);
    lp.model_name = model_name;
    lp.objective_name = objective_name;
    lp.sense = obj_sense;
    lp.offset = offset;
    lp.col_cost = col_cost;

    // Row bounds from type, RHS, and RANGES.
    for i in 0..num_row {
        let r = rhs.get(&i).copied().unwrap_or(0.0);
        let (mut lower, mut upper) = match row_types[i] {
            RowType::Eq => (r, r),
            RowType::Le => (f64::NEG_INFINITY, r),
            RowType::Ge => (r, f64::INFINITY),
        };
        if let Some(&range) = ranges.get(&i) {
            match row_types[i] {
                RowType::Ge => upper = r + range.abs(),
                RowType::Le => lower = r - range.abs(),
                RowType::Eq => {
                    if range >= 0.0 {
                        upper = r + range;
                    } else {
                        lower = r + range;
                    }
                }
            }
        }
        lp.row_lower[i] = lower;
        lp.row_upper[i] = upper;
    }

    // Column bounds with MPS defaulting: lower 0, upper +∞; semi-continuous
    // defaults its lower to zero unless given.
    for j in 0..num_col {
        let lower = bound_lower.get(&j).copied().unwrap_or(0.0);
        let upper = bound_upper.get(&j).copied().unwrap_or(f64::INFINITY);
        lp.col_lower[j] = lower;
        lp.col_upper[j] = upper;
    }

    // Matrix, column-wise.
    let mut start = Vec::with_capacity(num_col + 1);
    let mut index = Vec::new();
    let mut value = Vec::new();
    start.push(0);
    for entries in &col_entries {
        for &(i, v) in entries {
            index.push(i);
            value.push(v);
        }
        start.push(index.len());
    }
    lp.a_matrix = pivot_core::linalg::SparseMatrix::from_colwise(
        num_row, num_col, start, index, value,
    )
    .map_err(|e| MpsError::Parse {
        line: line_number,
        message: format!("matrix assembly failed: {}", e),
    })?;

    if integrality.iter().any(|&k| k != VarKind::Continuous) {
        lp.integrality = integrality;
    }

    // Duplicate names survive as distinct rows/columns, but the name table
    // is no longer a function, so it is cleared.
    if has_duplicate_rows {
        lp.row_names.clear();
    } else {
        lp.row_names = row_names;
    }
    if has_duplicate_cols {
        lp.col_names.clear();
    } else {
        lp.col_names = col_names;
    }

    let hessian = if q_entries.is_empty() {
        None
    } else {
        Some(build_hessian(num_col, &mut q_entries, line_number)?)
    };

    if warnings.any() {
        warn!(
            "reader warnings: {} duplicate row names, {} duplicate column names, \
             {} ignored duplicate entries, {} negative upper bounds, \
             {} fractional integer bounds",
            warnings.duplicate_row_names,
            warnings.duplicate_col_names,
            warnings.ignored_duplicate_entries,
            warnings.negative_upper_bounds,
            warnings.fractional_integer_bounds,
        );
    }

    Ok(MpsModel {
        lp,
        hessian,
        warnings,
    })
}

fn parse_objsense(word: &str) -> ObjSense {
    let upper = word.to_ascii_uppercase();
    if upper.starts_with("MAX") {
        ObjSense::Maximize
    } else {
        ObjSense::Minimize
    }
}

/// Parse `name value name value …` pairs after a leading set name.
fn parse_value_pairs<F>(fields: &[&str], line: usize, mut apply: F) -> MpsResult<()>
where
    F: FnMut(&str, f64) -> MpsResult<()>,
{
    if fields.len() < 3 {
        return Err(MpsError::Parse {
            line,
            message: "entry needs a set name and name/value pairs".to_string(),
        });
    }
    let mut k = 1;
    while k < fields.len() {
        let name = fields[k];
        let Some(text) = fields.get(k + 1) else {
            return Err(MpsError::Parse {
                line,
                message: format!("{} has no value", name),
            });
        };
        let value = parse_number(text, line)?;
        apply(name, value)?;
        k += 2;
    }
    Ok(())
}

/// Parse a numeric token, accepting Fortran `D`/`d` exponents.
fn parse_number(text: &str, line: usize) -> MpsResult<f64> {
    let normalized: String = if text.contains('D') || text.contains('d') {
        text.chars()
            .map(|c| match c {
                'D' => 'E',
                'd' => 'e',
                other => other,
            })
            .collect()
    } else {
        text.to_string()
    };
    normalized.parse::<f64>().map_err(|_| MpsError::Parse {
        line,
        message: format!("unparsable number {}", text),
    })
}

/// Sort triangular entries into a column-wise Hessian.
fn build_hessian(
    dim: usize,
    entries: &mut Vec<(usize, usize, f64)>,
    line: usize,
) -> MpsResult<Hessian> {
    entries.sort_by_key(|&(i, j, _)| (j, i));
    let mut h = Hessian::new(dim);
    let mut last: Option<(usize, usize)> = None;
    for &(i, j, v) in entries.iter() {
        if last == Some((i, j)) {
            return Err(MpsError::Parse {
                line,
                message: format!("duplicate quadratic entry ({}, {})", i, j),
            });
        }
        last = Some((i, j));
        h.index.push(i);
        h.value.push(v);
    }
    let mut start = vec![0usize; dim + 1];
    for &(_, j, _) in entries.iter() {
        start[j + 1] += 1;
    }
    for j in 0..dim {
        start[j + 1] += start[j];
    }
    h.start = start;
    h.check_consistent().map_err(|e| MpsError::Parse {
        line,
        message: format!("hessian assembly failed: {}", e),
    })?;
    Ok(h)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn read(text: &str) -> MpsResult<MpsModel> {
        read_mps_from(Cursor::new(text.as_bytes()), None)
    }

    const SIMPLE: &str = "\
NAME          test
ROWS
 N  COST
 L  C1
 G  C2
COLUMNS
    X1  COST  1.0  C1  1.0
    X1  C2    2.0
    X2  COST  1.0  C1  1.0
    X2  C2    1.0
RHS
    RHS  C1  4.0  C2  3.0
BOUNDS
 UP BND X1 3.0
ENDATA
";

    #[test]
    fn test_simple_lp() {
        let model = read(SIMPLE).unwrap();
        let lp = &model.lp;
        assert_eq!(lp.model_name, "test");
        assert_eq!(lp.objective_name, "COST");
        assert_eq!(lp.num_col, 2);
        assert_eq!(lp.num_row, 2);
        assert_eq!(lp.col_cost, vec![1.0, 1.0]);
        assert_eq!(lp.row_upper[0], 4.0);
        assert_eq!(lp.row_lower[0], f64::NEG_INFINITY);
        assert_eq!(lp.row_lower[1], 3.0);
        assert_eq!(lp.col_upper, vec![3.0, f64::INFINITY]);
        assert_eq!(lp.a_matrix.num_nz(), 4);
        assert_eq!(lp.col_names, vec!["X1", "X2"]);
        assert_eq!(lp.row_names, vec!["C1", "C2"]);
        assert!(model.hessian.is_none());
        assert!(!model.warnings.any());
    }

    #[test]
    fn test_fortran_exponents() {
        let text = "\
NAME
ROWS
 N obj
 G r1
COLUMNS
    x obj 2.5D-1 r1 1.0d2
RHS
    rhs r1 1D1
ENDATA
";
        let model = read(text).unwrap();
        assert_eq!(model.lp.col_cost, vec![0.25]);
        assert_eq!(model.lp.a_matrix.get_coefficient(0, 0), 100.0);
        assert_eq!(model.lp.row_lower[0], 10.0);
    }

    #[test]
    fn test_integer_markers() {
        let text = "\
NAME
ROWS
 N obj
 G r1
COLUMNS
    x1 obj 1.0 r1 1.0
    MARKER1 'MARKER' 'INTORG'
    y1 obj 1.0 r1 1.0
    MARKER2 'MARKER' 'INTEND'
    x2 obj 1.0 r1 1.0
RHS
ENDATA
";
        let model = read(text).unwrap();
        assert_eq!(
            model.lp.integrality,
            vec![VarKind::Continuous, VarKind::Integer, VarKind::Continuous]
        );
        assert!(model.lp.is_mip());
    }

    #[test]
    fn test_later_n_rows_are_free() {
        let text = "\
NAME
ROWS
 N obj
 N freerow
 G r1
COLUMNS
    x obj 1.0 freerow 5.0
    x r1 1.0
RHS
ENDATA
";
        let model = read(text).unwrap();
        // The free row never becomes a constraint and its entries vanish.
        assert_eq!(model.lp.num_row, 1);
        assert_eq!(model.lp.a_matrix.num_nz(), 1);
    }

    #[test]
    fn test_objsense_and_offset() {
        let text = "\
NAME
OBJSENSE
    MAXIMIZE
ROWS
 N obj
 L r1
COLUMNS
    x obj 2.0 r1 1.0
RHS
    rhs r1 10.0 obj 5.0
ENDATA
";
        let model = read(text).unwrap();
        assert_eq!(model.lp.sense, ObjSense::Maximize);
        assert_eq!(model.lp.offset, -5.0);
    }

    #[test]
    fn test_bound_types() {
        let text = "\
NAME
ROWS
 N obj
 G r1
COLUMNS
    a obj 1.0 r1 1.0
    b obj 1.0 r1 1.0
    c obj 1.0 r1 1.0
    d obj 1.0 r1 1.0
    e obj 1.0 r1 1.0
BOUNDS
 FX BND a 2.0
 FR BND b
 MI BND c
 BV BND d
 SC BND e 8.0
ENDATA
";
        let model = read(text).unwrap();
        let lp = &model.lp;
        assert_eq!((lp.col_lower[0], lp.col_upper[0]), (2.0, 2.0));
        assert_eq!(lp.col_lower[1], f64::NEG_INFINITY);
        assert_eq!(lp.col_upper[1], f64::INFINITY);
        assert_eq!(lp.col_lower[2], f64::NEG_INFINITY);
        assert_eq!((lp.col_lower[3], lp.col_upper[3]), (0.0, 1.0));
        assert_eq!(lp.integrality[3], VarKind::Integer);
        assert_eq!(lp.integrality[4], VarKind::SemiContinuous);
        assert_eq!(lp.col_upper[4], 8.0);
    }

    #[test]
    fn test_negative_upper_frees_lower() {
        let text = "\
NAME
ROWS
 N obj
 G r1
COLUMNS
    x obj 1.0 r1 1.0
BOUNDS
 UP BND x -2.0
ENDATA
";
        let model = read(text).unwrap();
        assert_eq!(model.lp.col_lower[0], f64::NEG_INFINITY);
        assert_eq!(model.lp.col_upper[0], -2.0);
        assert_eq!(model.warnings.negative_upper_bounds, 1);
    }

    #[test]
    fn test_ranges() {
        let text = "\
NAME
ROWS
 N obj
 G g1
 L l1
 E e1
COLUMNS
    x obj 1.0 g1 1.0
    x l1 1.0 e1 1.0
RHS
    rhs g1 1.0 l1 5.0
    rhs e1 2.0
RANGES
    rng g1 2.0 l1 3.0
    rng e1 -1.5
ENDATA
";
        let model = read(text).unwrap();
        let lp = &model.lp;
        assert_eq!((lp.row_lower[0], lp.row_upper[0]), (1.0, 3.0));
        assert_eq!((lp.row_lower[1], lp.row_upper[1]), (2.0, 5.0));
        assert_eq!((lp.row_lower[2], lp.row_upper[2]), (0.5, 2.0));
    }

    #[test]
    fn test_quadobj() {
        let text = "\
NAME
ROWS
 N obj
 E r1
COLUMNS
    x obj 1.0 r1 1.0
    y obj 1.0 r1 1.0
QUADOBJ
    x x 2.0
    x y 0.5
    y y 4.0
ENDATA
";
        let model = read(text).unwrap();
        let h = model.hessian.unwrap();
        assert_eq!(h.dim, 2);
        assert_eq!(h.num_nz(), 3);
        h.check_consistent().unwrap();
        // 0.5 x^T Q x at (1, 1): 0.5·2 + 0.5 + 0.5·4 = 3.5
        assert!((h.quadratic_value(&[1.0, 1.0]) - 3.5).abs() < 1e-12);
    }

    #[test]
    fn test_rejected_section() {
        let text = "\
NAME
ROWS
 N obj
INDICATORS
 IF r1 x 1
ENDATA
";
        let err = read(text);
        assert!(matches!(err, Err(MpsError::UnsupportedSection(s)) if s == "INDICATORS"));
    }

    #[test]
    fn test_duplicate_row_names_warn_and_clear_table() {
        let text = "\
NAME
ROWS
 N obj
 G r1
 L r1
COLUMNS
    x obj 1.0 r1 1.0
RHS
    rhs r1 2.0
ENDATA
";
        let model = read(text).unwrap();
        // Both rows exist; references went to the first; names cleared.
        assert_eq!(model.lp.num_row, 2);
        assert_eq!(model.warnings.duplicate_row_names, 1);
        assert!(model.lp.row_names.is_empty());
        assert_eq!(model.lp.row_lower[0], 2.0);
        assert_eq!(model.lp.a_matrix.num_nz(), 1);
    }

    #[test]
    fn test_missing_endata() {
        let err = read("NAME\nROWS\n N obj\n");
        assert!(matches!(err, Err(MpsError::Parse { .. })));
    }

    #[test]
    fn test_fixed_format_detected() {
        // A short row name with spaces in it means fixed-format fields.
        let text = "\
NAME
ROWS
 N ob j
ENDATA
";
        let err = read(text);
        assert!(matches!(err, Err(MpsError::FixedFormat)));
    }

    #[test]
    fn test_comments_and_blanks_skipped() {
        let text = "\
* leading comment
NAME test

ROWS
* inner comment
 N obj
 G r1
COLUMNS
    x obj 1.0 r1 1.0
RHS
ENDATA
";
        let model = read(text).unwrap();
        assert_eq!(model.lp.num_row, 1);
    }
}
