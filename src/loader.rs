// 📂 Data Loader - regime CSVs, combined raw export and department boundaries
//
// Everything here runs once at startup. Any failure is fatal: the server
// never starts with partial data.

use crate::regime::Regime;
use geojson::{FeatureCollection, GeoJson, Geometry, JsonValue};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Municipality value that marks department-level rows with no municipality
pub const NOT_APPLICABLE: &str = "NO APLICA";

/// Boundary property holding the department name
pub const NAME_PROPERTY: &str = "DPTO_CNMBR";

// ============================================================================
// ERRORS
// ============================================================================

/// A person count that could not be normalized to an integer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid person count {value:?}")]
pub struct ParseError {
    pub value: String,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("input file not found: {}", .path.display())]
    Missing { path: PathBuf },

    #[error("cannot read {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed {}: {message}", .path.display())]
    Malformed { path: PathBuf, message: String },

    #[error("{}, line {line}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        line: u64,
        #[source]
        source: ParseError,
    },
}

impl LoadError {
    /// Path of the input file that failed
    pub fn path(&self) -> &Path {
        match self {
            LoadError::Missing { path }
            | LoadError::Unreadable { path, .. }
            | LoadError::Malformed { path, .. }
            | LoadError::Parse { path, .. } => path,
        }
    }
}

// ============================================================================
// RECORDS
// ============================================================================

/// One row of the combined raw export (municipality level)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffiliationRecord {
    pub code: String,
    pub department: String,
    pub municipality: String,
    pub regime: Regime,
    pub persons: u64,
}

/// One department total for one regime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartmentAffiliation {
    pub code: String,
    pub department: String,
    pub regime: Regime,
    pub persons: u64,
}

/// Department boundary keyed by its code
#[derive(Debug, Clone)]
pub struct DepartmentGeometry {
    pub code: String,
    pub name: Option<String>,
    pub geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct RegimeRow {
    #[serde(rename = "CodDepto")]
    code: String,
    #[serde(rename = "Departamento")]
    department: String,
    #[serde(rename = "NumPersonas")]
    persons: String,
}

#[derive(Debug, Deserialize)]
struct RawRow {
    #[serde(rename = "CodDepto")]
    code: String,
    #[serde(rename = "Departamento")]
    department: String,
    #[serde(rename = "Municipio")]
    municipality: String,
    #[serde(rename = "Regimen", alias = "Régimen")]
    regime: String,
    #[serde(rename = "NumPersonas")]
    persons: String,
}

// ============================================================================
// NORMALIZATION
// ============================================================================

/// Normalize a locale-formatted count ("1.200", "1,200", "1 200") to an integer
pub fn parse_person_count(raw: &str) -> Result<u64, ParseError> {
    let digits: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, '.' | ',' | ' ' | '\u{a0}' | '\'' | '_'))
        .collect();

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ParseError {
            value: raw.to_string(),
        });
    }

    digits.parse::<u64>().map_err(|_| ParseError {
        value: raw.to_string(),
    })
}

/// Department codes stay strings; single-digit codes get their leading zero back
pub fn normalize_code(raw: &str) -> String {
    let code = raw.trim();
    if !code.is_empty() && code.len() < 2 && code.chars().all(|c| c.is_ascii_digit()) {
        format!("{:0>2}", code)
    } else {
        code.to_string()
    }
}

// ============================================================================
// CSV LOADING
// ============================================================================

fn open_csv(path: &Path) -> Result<csv::Reader<File>, LoadError> {
    if !path.exists() {
        return Err(LoadError::Missing {
            path: path.to_path_buf(),
        });
    }

    let file = File::open(path).map_err(|source| LoadError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(file))
}

fn malformed(path: &Path, err: csv::Error) -> LoadError {
    LoadError::Malformed {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

/// Load one regime file (already aggregated per department)
pub fn load_regime(path: &Path, regime: Regime) -> Result<Vec<DepartmentAffiliation>, LoadError> {
    let mut reader = open_csv(path)?;
    let mut rows = Vec::new();

    for (idx, result) in reader.deserialize::<RegimeRow>().enumerate() {
        let row = result.map_err(|e| malformed(path, e))?;
        let persons = parse_person_count(&row.persons).map_err(|source| LoadError::Parse {
            path: path.to_path_buf(),
            line: idx as u64 + 2,
            source,
        })?;

        rows.push(DepartmentAffiliation {
            code: normalize_code(&row.code),
            department: row.department,
            regime,
            persons,
        });
    }

    info!(path = %path.display(), regime = %regime, rows = rows.len(), "loaded regime file");
    Ok(rows)
}

/// Load the combined municipality-level export
pub fn load_raw_affiliations(path: &Path) -> Result<Vec<AffiliationRecord>, LoadError> {
    let mut reader = open_csv(path)?;
    let mut records = Vec::new();

    for (idx, result) in reader.deserialize::<RawRow>().enumerate() {
        let line = idx as u64 + 2;
        let row = result.map_err(|e| malformed(path, e))?;

        let regime = row
            .regime
            .parse::<Regime>()
            .map_err(|message| LoadError::Malformed {
                path: path.to_path_buf(),
                message: format!("line {}: {}", line, message),
            })?;
        let persons = parse_person_count(&row.persons).map_err(|source| LoadError::Parse {
            path: path.to_path_buf(),
            line,
            source,
        })?;

        records.push(AffiliationRecord {
            code: normalize_code(&row.code),
            department: row.department,
            municipality: row.municipality,
            regime,
            persons,
        });
    }

    info!(path = %path.display(), rows = records.len(), "loaded raw affiliation export");
    Ok(records)
}

/// Drop the "NO APLICA" municipality rows and nothing else
pub fn exclude_not_applicable(records: Vec<AffiliationRecord>) -> Vec<AffiliationRecord> {
    let before = records.len();
    let kept: Vec<AffiliationRecord> = records
        .into_iter()
        .filter(|r| r.municipality.trim() != NOT_APPLICABLE)
        .collect();

    debug!(excluded = before - kept.len(), "excluded {} rows", NOT_APPLICABLE);
    kept
}

/// Sum municipality rows into one row per department for the given regime.
/// Output keeps first-appearance order and the first department name seen.
/// `path` names the source file in the error when a total overflows.
pub fn aggregate_by_department(
    path: &Path,
    records: &[AffiliationRecord],
    regime: Regime,
) -> Result<Vec<DepartmentAffiliation>, LoadError> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut totals: Vec<DepartmentAffiliation> = Vec::new();

    for record in records.iter().filter(|r| r.regime == regime) {
        match index.get(record.code.as_str()) {
            Some(&pos) => {
                let total = &mut totals[pos];
                total.persons = total.persons.checked_add(record.persons).ok_or_else(|| {
                    LoadError::Malformed {
                        path: path.to_path_buf(),
                        message: format!(
                            "person count total for department {} ({}) overflows",
                            record.code, regime
                        ),
                    }
                })?;
            }
            None => {
                index.insert(&record.code, totals.len());
                totals.push(DepartmentAffiliation {
                    code: record.code.clone(),
                    department: record.department.clone(),
                    regime,
                    persons: record.persons,
                });
            }
        }
    }

    Ok(totals)
}

// ============================================================================
// BOUNDARIES
// ============================================================================

fn code_from_property(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(normalize_code(s)),
        JsonValue::Number(n) => Some(normalize_code(&n.to_string())),
        _ => None,
    }
}

/// Load department boundaries from a GeoJSON FeatureCollection
pub fn load_boundaries(path: &Path, code_property: &str) -> Result<Vec<DepartmentGeometry>, LoadError> {
    if !path.exists() {
        return Err(LoadError::Missing {
            path: path.to_path_buf(),
        });
    }

    let file = File::open(path).map_err(|source| LoadError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;

    let geojson = GeoJson::from_reader(BufReader::new(file)).map_err(|e| LoadError::Malformed {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        GeoJson::Feature(feature) => FeatureCollection {
            bbox: None,
            features: vec![feature],
            foreign_members: None,
        },
        GeoJson::Geometry(_) => {
            return Err(LoadError::Malformed {
                path: path.to_path_buf(),
                message: "expected a FeatureCollection, found a bare geometry".to_string(),
            })
        }
    };

    let mut boundaries = Vec::with_capacity(collection.features.len());
    for (idx, feature) in collection.features.into_iter().enumerate() {
        let code = feature
            .property(code_property)
            .and_then(code_from_property)
            .ok_or_else(|| LoadError::Malformed {
                path: path.to_path_buf(),
                message: format!("feature {} has no usable {} property", idx, code_property),
            })?;
        let name = feature
            .property(NAME_PROPERTY)
            .and_then(|v| v.as_str())
            .map(str::to_string);

        match feature.geometry {
            Some(geometry) => boundaries.push(DepartmentGeometry { code, name, geometry }),
            None => debug!(code = %code, "skipping boundary feature without geometry"),
        }
    }

    info!(path = %path.display(), features = boundaries.len(), "loaded department boundaries");
    Ok(boundaries)
}

// ============================================================================
// STARTUP LOAD
// ============================================================================

/// Resolved input file locations
#[derive(Debug, Clone)]
pub struct DataPaths {
    pub contributivo: PathBuf,
    pub subsidiado: PathBuf,
    pub especial: PathBuf,
    pub boundaries: PathBuf,
    /// Combined municipality export; when set, the regime files are not read
    pub raw: Option<PathBuf>,
    pub code_property: String,
}

impl DataPaths {
    pub fn regime_path(&self, regime: Regime) -> &Path {
        match regime {
            Regime::Contributivo => &self.contributivo,
            Regime::Subsidiado => &self.subsidiado,
            Regime::Especial => &self.especial,
        }
    }
}

/// Everything the dashboard needs, loaded once
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub affiliations: HashMap<Regime, Vec<DepartmentAffiliation>>,
    pub boundaries: Vec<DepartmentGeometry>,
}

/// Load all inputs or fail on the first missing/broken file
pub fn load_all(paths: &DataPaths) -> Result<LoadedData, LoadError> {
    let mut affiliations = HashMap::new();

    match &paths.raw {
        Some(raw_path) => {
            let records = exclude_not_applicable(load_raw_affiliations(raw_path)?);
            for regime in Regime::ALL {
                affiliations.insert(regime, aggregate_by_department(raw_path, &records, regime)?);
            }
        }
        None => {
            for regime in Regime::ALL {
                affiliations.insert(regime, load_regime(paths.regime_path(regime), regime)?);
            }
        }
    }

    let boundaries = load_boundaries(&paths.boundaries, &paths.code_property)?;

    Ok(LoadedData {
        affiliations,
        boundaries,
    })
}
