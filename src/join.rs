// 🔗 Join Engine - regime totals ⋈ department boundaries on department code
//
// Inner join: departments missing on either side are dropped. The dropped
// codes are reported back in JoinDiagnostics so the caller can log them.

use crate::loader::{DepartmentAffiliation, DepartmentGeometry};
use crate::regime::Regime;
use geojson::Geometry;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// One department of one regime with its boundary attached
#[derive(Debug, Clone)]
pub struct GeoRow {
    pub code: String,
    pub department: String,
    pub persons: u64,
    pub geometry: Geometry,
}

/// Geometry-enriched table for a single regime
#[derive(Debug, Clone)]
pub struct RegimeGeoTable {
    pub regime: Regime,
    pub rows: Vec<GeoRow>,
}

impl RegimeGeoTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Person-count column in row order
    pub fn persons(&self) -> Vec<u64> {
        self.rows.iter().map(|r| r.persons).collect()
    }

    /// Rows whose department name equals `department` exactly (case-sensitive)
    pub fn filter_department(&self, department: &str) -> RegimeGeoTable {
        RegimeGeoTable {
            regime: self.regime,
            rows: self
                .rows
                .iter()
                .filter(|r| r.department == department)
                .cloned()
                .collect(),
        }
    }
}

/// Codes that did not survive the inner join
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JoinDiagnostics {
    pub regime: Option<Regime>,
    /// Departments with affiliation data but no boundary (invisible on the map)
    pub missing_geometry: Vec<String>,
    /// Boundaries with no affiliation row for this regime
    pub missing_affiliation: Vec<String>,
}

impl JoinDiagnostics {
    pub fn is_clean(&self) -> bool {
        self.missing_geometry.is_empty() && self.missing_affiliation.is_empty()
    }
}

/// Inner join on exact code equality. Output follows boundary order, the way
/// the boundary dataset drives the join.
pub fn join_regime(
    regime: Regime,
    affiliations: &[DepartmentAffiliation],
    boundaries: &[DepartmentGeometry],
) -> (RegimeGeoTable, JoinDiagnostics) {
    let mut by_code: HashMap<&str, Vec<&DepartmentAffiliation>> = HashMap::new();
    for affiliation in affiliations {
        by_code.entry(affiliation.code.as_str()).or_default().push(affiliation);
    }

    let mut rows = Vec::new();
    let mut matched: HashSet<&str> = HashSet::new();
    let mut diagnostics = JoinDiagnostics {
        regime: Some(regime),
        ..Default::default()
    };

    for boundary in boundaries {
        match by_code.get(boundary.code.as_str()) {
            Some(matches) => {
                matched.insert(boundary.code.as_str());
                for affiliation in matches {
                    rows.push(GeoRow {
                        code: boundary.code.clone(),
                        department: affiliation.department.clone(),
                        persons: affiliation.persons,
                        geometry: boundary.geometry.clone(),
                    });
                }
            }
            None => diagnostics.missing_affiliation.push(boundary.code.clone()),
        }
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for affiliation in affiliations {
        let code = affiliation.code.as_str();
        if !matched.contains(code) && seen.insert(code) {
            diagnostics.missing_geometry.push(affiliation.code.clone());
        }
    }

    (RegimeGeoTable { regime, rows }, diagnostics)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use geojson::Value;

    pub(crate) fn square(x: f64, y: f64) -> Geometry {
        Geometry::new(Value::Polygon(vec![vec![
            vec![x, y],
            vec![x + 1.0, y],
            vec![x + 1.0, y + 1.0],
            vec![x, y],
        ]]))
    }

    pub(crate) fn boundary(code: &str) -> DepartmentGeometry {
        DepartmentGeometry {
            code: code.to_string(),
            name: None,
            geometry: square(code.len() as f64, 0.0),
        }
    }

    pub(crate) fn affiliation(code: &str, department: &str, regime: Regime, persons: u64) -> DepartmentAffiliation {
        DepartmentAffiliation {
            code: code.to_string(),
            department: department.to_string(),
            regime,
            persons,
        }
    }

    #[test]
    fn test_join_matches_on_code() {
        let affiliations = vec![
            affiliation("05", "Antioquia", Regime::Contributivo, 1200),
            affiliation("11", "Bogotá", Regime::Contributivo, 900),
        ];
        let boundaries = vec![boundary("05"), boundary("11")];

        let (table, diagnostics) = join_regime(Regime::Contributivo, &affiliations, &boundaries);
        assert_eq!(table.len(), 2);
        assert_eq!(table.persons(), vec![1200, 900]);
        assert!(diagnostics.is_clean());
    }

    #[test]
    fn test_join_drops_unmatched_both_sides() {
        let affiliations = vec![
            affiliation("05", "Antioquia", Regime::Subsidiado, 10),
            affiliation("88", "San Andrés", Regime::Subsidiado, 3),
        ];
        let boundaries = vec![boundary("05"), boundary("91")];

        let (table, diagnostics) = join_regime(Regime::Subsidiado, &affiliations, &boundaries);
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows[0].department, "Antioquia");
        assert_eq!(diagnostics.missing_geometry, vec!["88".to_string()]);
        assert_eq!(diagnostics.missing_affiliation, vec!["91".to_string()]);
    }

    #[test]
    fn test_join_code_is_exact_string_match() {
        // "5" and "05" are different keys once normalized upstream
        let affiliations = vec![affiliation("5", "Antioquia", Regime::Especial, 10)];
        let boundaries = vec![boundary("05")];

        let (table, diagnostics) = join_regime(Regime::Especial, &affiliations, &boundaries);
        assert!(table.is_empty());
        assert_eq!(diagnostics.missing_geometry, vec!["5".to_string()]);
    }

    #[test]
    fn test_join_row_count_bounded_by_inputs() {
        let affiliations: Vec<_> = ["05", "08", "11", "13", "15"]
            .iter()
            .map(|c| affiliation(c, c, Regime::Contributivo, 1))
            .collect();
        let boundaries: Vec<_> = ["05", "11", "15", "17"].iter().map(|c| boundary(c)).collect();

        for regime in Regime::ALL {
            let (table, _) = join_regime(regime, &affiliations, &boundaries);
            assert!(table.len() <= affiliations.len().min(boundaries.len()));
        }
    }

    #[test]
    fn test_join_empty_inputs() {
        let (table, diagnostics) = join_regime(Regime::Especial, &[], &[boundary("05")]);
        assert!(table.is_empty());
        assert_eq!(diagnostics.missing_affiliation, vec!["05".to_string()]);
    }

    #[test]
    fn test_filter_department_is_case_sensitive() {
        let affiliations = vec![
            affiliation("05", "Antioquia", Regime::Contributivo, 1200),
            affiliation("11", "Bogotá", Regime::Contributivo, 900),
        ];
        let boundaries = vec![boundary("05"), boundary("11")];
        let (table, _) = join_regime(Regime::Contributivo, &affiliations, &boundaries);

        assert_eq!(table.filter_department("Antioquia").len(), 1);
        assert!(table.filter_department("ANTIOQUIA").is_empty());
        assert!(table.filter_department("Cundinamarca").is_empty());
    }
}
