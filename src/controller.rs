// 🎛️ Interactive Filter Controller - (regime, department, scale) → map
//
// Dashboard holds the joined tables for the lifetime of the process. It is
// never mutated after construction; handlers share it behind an Arc.

use crate::charts::{box_summary, build_boxplot, build_choropleth, BoxSummary, ChartSpec, ColorScale};
use crate::join::{join_regime, JoinDiagnostics, RegimeGeoTable};
use crate::loader::LoadedData;
use crate::regime::Regime;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, warn};

// ============================================================================
// SELECTION
// ============================================================================

/// Current value of the three selectors
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterSelection {
    pub regime: Regime,
    /// None = show every department
    pub department: Option<String>,
    pub scale: ColorScale,
}

impl FilterSelection {
    /// Build a selection; an empty or "none" department means no filter.
    /// Any other value is kept verbatim and matched exactly.
    pub fn new(regime: Regime, department: Option<&str>, scale: ColorScale) -> Self {
        let department = department
            .filter(|d| {
                let d = d.trim();
                !d.is_empty() && !d.eq_ignore_ascii_case("none")
            })
            .map(str::to_string);

        FilterSelection {
            regime,
            department,
            scale,
        }
    }
}

impl Default for FilterSelection {
    fn default() -> Self {
        FilterSelection::new(Regime::Contributivo, None, ColorScale::default())
    }
}

// ============================================================================
// DASHBOARD
// ============================================================================

pub struct Dashboard {
    /// One table per regime, in Regime::ALL order
    tables: Vec<RegimeGeoTable>,
    diagnostics: Vec<JoinDiagnostics>,
    departments: Vec<String>,
}

impl Dashboard {
    /// Join every regime against the boundaries and index department names
    pub fn from_data(data: &LoadedData) -> Self {
        let mut tables = Vec::with_capacity(Regime::ALL.len());
        let mut diagnostics = Vec::with_capacity(Regime::ALL.len());
        let mut departments = BTreeSet::new();

        for regime in Regime::ALL {
            let affiliations = data
                .affiliations
                .get(&regime)
                .map(Vec::as_slice)
                .unwrap_or_default();
            departments.extend(affiliations.iter().map(|a| a.department.clone()));

            let (table, report) = join_regime(regime, affiliations, &data.boundaries);
            for code in &report.missing_geometry {
                warn!(regime = %regime, code = %code, "department has no boundary; it will not appear on the map");
            }
            if table.is_empty() {
                warn!(regime = %regime, "join produced no rows; maps for this regime will be empty");
            }
            debug!(regime = %regime, rows = table.len(), "joined regime table");

            tables.push(table);
            diagnostics.push(report);
        }

        Dashboard {
            tables,
            diagnostics,
            departments: departments.into_iter().collect(),
        }
    }

    pub fn table(&self, regime: Regime) -> &RegimeGeoTable {
        let idx = match regime {
            Regime::Contributivo => 0,
            Regime::Subsidiado => 1,
            Regime::Especial => 2,
        };
        &self.tables[idx]
    }

    pub fn tables(&self) -> &[RegimeGeoTable] {
        &self.tables
    }

    /// Known department names, sorted, across all regimes
    pub fn departments(&self) -> &[String] {
        &self.departments
    }

    pub fn diagnostics(&self) -> &[JoinDiagnostics] {
        &self.diagnostics
    }

    pub fn boxplot(&self) -> ChartSpec {
        build_boxplot(&self.tables)
    }

    pub fn box_summaries(&self) -> Vec<BoxSummary> {
        self.tables.iter().map(box_summary).collect()
    }

    /// Full map of one regime with the default palette
    pub fn regime_map(&self, regime: Regime) -> ChartSpec {
        build_choropleth(self.table(regime), regime.name(), None)
    }

    /// Recompute the interactive map from scratch for the given selectors
    pub fn render_map(&self, selection: &FilterSelection) -> ChartSpec {
        let table = self.table(selection.regime);

        match &selection.department {
            Some(department) => {
                let filtered = table.filter_department(department);
                if filtered.is_empty() {
                    debug!(regime = %selection.regime, department = %department, "department not in joined table; rendering empty map");
                }
                build_choropleth(&filtered, selection.regime.name(), Some(selection.scale))
            }
            None => build_choropleth(table, selection.regime.name(), Some(selection.scale)),
        }
    }
}
