// 📊 Chart Builders - Plotly figure specs for the boxplot and the choropleths
//
// Pure functions: same tables in, same figure out. The browser renders the
// JSON with plotly.js, so everything here is just data.

use crate::join::RegimeGeoTable;
use crate::regime::Regime;
use geojson::feature::Id;
use geojson::{Feature, FeatureCollection, JsonObject, JsonValue};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

pub const BOXPLOT_TITLE: &str = "Distribución por Régimen";
pub const REGIME_AXIS: &str = "Régimen";
pub const PERSONS_AXIS: &str = "NumPersonas";

// ============================================================================
// COLOR SCALES
// ============================================================================

/// Continuous color scales built into plotly.js
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ColorScale {
    #[default]
    Viridis,
    Cividis,
    Blues,
    Greens,
    Reds,
    YlOrRd,
    YlGnBu,
    Hot,
    Electric,
    Portland,
}

impl ColorScale {
    pub const ALL: [ColorScale; 10] = [
        ColorScale::Viridis,
        ColorScale::Cividis,
        ColorScale::Blues,
        ColorScale::Greens,
        ColorScale::Reds,
        ColorScale::YlOrRd,
        ColorScale::YlGnBu,
        ColorScale::Hot,
        ColorScale::Electric,
        ColorScale::Portland,
    ];

    /// Name as plotly.js expects it
    pub fn name(&self) -> &'static str {
        match self {
            ColorScale::Viridis => "Viridis",
            ColorScale::Cividis => "Cividis",
            ColorScale::Blues => "Blues",
            ColorScale::Greens => "Greens",
            ColorScale::Reds => "Reds",
            ColorScale::YlOrRd => "YlOrRd",
            ColorScale::YlGnBu => "YlGnBu",
            ColorScale::Hot => "Hot",
            ColorScale::Electric => "Electric",
            ColorScale::Portland => "Portland",
        }
    }
}

impl fmt::Display for ColorScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ColorScale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        ColorScale::ALL
            .into_iter()
            .find(|c| value.eq_ignore_ascii_case(c.name()))
            .ok_or_else(|| format!("unknown color scale: {}", value))
    }
}

// ============================================================================
// FIGURE TYPES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Title {
    pub text: String,
}

impl Title {
    fn new(text: &str) -> Self {
        Title {
            text: text.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Axis {
    pub title: Title,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorBar {
    pub title: Title,
}

/// Map viewport: fit to the drawn shapes, hide the base map
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoLayout {
    pub fitbounds: String,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub title: Title,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xaxis: Option<Axis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yaxis: Option<Axis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo: Option<GeoLayout>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Trace {
    #[serde(rename = "box")]
    BoxPlot {
        x: Vec<String>,
        y: Vec<u64>,
        boxpoints: String,
    },
    #[serde(rename = "choropleth")]
    Choropleth {
        geojson: FeatureCollection,
        locations: Vec<String>,
        z: Vec<u64>,
        hovertext: Vec<String>,
        hovertemplate: String,
        colorscale: String,
        colorbar: ColorBar,
    },
}

/// A complete Plotly figure (`{"data": [...], "layout": {...}}`)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub data: Vec<Trace>,
    pub layout: Layout,
}

impl ChartSpec {
    /// Number of department shapes the map will draw
    pub fn shape_count(&self) -> usize {
        self.data
            .iter()
            .map(|t| match t {
                Trace::Choropleth { locations, .. } => locations.len(),
                Trace::BoxPlot { .. } => 0,
            })
            .sum()
    }

    /// Number of boxplot observations
    pub fn observation_count(&self) -> usize {
        self.data
            .iter()
            .map(|t| match t {
                Trace::BoxPlot { y, .. } => y.len(),
                Trace::Choropleth { .. } => 0,
            })
            .sum()
    }
}

// ============================================================================
// BOXPLOT
// ============================================================================

/// Long-format row: one observation tagged with its regime
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LongRow {
    #[serde(rename = "Régimen")]
    pub regime: Regime,
    #[serde(rename = "NumPersonas")]
    pub persons: u64,
}

/// Melt the person-count column of each table into one long table
pub fn long_rows(tables: &[RegimeGeoTable]) -> Vec<LongRow> {
    tables
        .iter()
        .flat_map(|table| {
            table.rows.iter().map(move |row| LongRow {
                regime: table.regime,
                persons: row.persons,
            })
        })
        .collect()
}

/// Box-and-whisker chart of department counts grouped by regime
pub fn build_boxplot(tables: &[RegimeGeoTable]) -> ChartSpec {
    let rows = long_rows(tables);
    let (x, y): (Vec<String>, Vec<u64>) = rows
        .iter()
        .map(|r| (r.regime.name().to_string(), r.persons))
        .unzip();

    ChartSpec {
        data: vec![Trace::BoxPlot {
            x,
            y,
            boxpoints: "outliers".to_string(),
        }],
        layout: Layout {
            title: Title::new(BOXPLOT_TITLE),
            xaxis: Some(Axis {
                title: Title::new(REGIME_AXIS),
            }),
            yaxis: Some(Axis {
                title: Title::new(PERSONS_AXIS),
            }),
            geo: None,
        },
    }
}

/// Five-number summary shown next to the boxplot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxSummary {
    pub regime: Regime,
    pub count: usize,
    pub min: Option<f64>,
    pub q1: Option<f64>,
    pub median: Option<f64>,
    pub q3: Option<f64>,
    pub max: Option<f64>,
}

/// Linear-interpolated percentile over sorted values, `p` in [0, 1]
fn percentile(sorted: &[u64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = p * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let weight = pos - lower as f64;
    Some(sorted[lower] as f64 + (sorted[upper] as f64 - sorted[lower] as f64) * weight)
}

pub fn box_summary(table: &RegimeGeoTable) -> BoxSummary {
    let mut values = table.persons();
    values.sort_unstable();

    BoxSummary {
        regime: table.regime,
        count: values.len(),
        min: percentile(&values, 0.0),
        q1: percentile(&values, 0.25),
        median: percentile(&values, 0.5),
        q3: percentile(&values, 0.75),
        max: percentile(&values, 1.0),
    }
}

// ============================================================================
// CHOROPLETH
// ============================================================================

fn feature_collection(table: &RegimeGeoTable) -> FeatureCollection {
    let features = table
        .rows
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            let mut properties = JsonObject::new();
            properties.insert("code".to_string(), JsonValue::from(row.code.clone()));
            properties.insert("department".to_string(), JsonValue::from(row.department.clone()));

            Feature {
                bbox: None,
                geometry: Some(row.geometry.clone()),
                id: Some(Id::String(idx.to_string())),
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Map coloring each department by its person count.
/// An empty table still yields a valid figure with no shapes.
pub fn build_choropleth(table: &RegimeGeoTable, name: &str, scale: Option<ColorScale>) -> ChartSpec {
    let scale = scale.unwrap_or_default();

    ChartSpec {
        data: vec![Trace::Choropleth {
            geojson: feature_collection(table),
            locations: (0..table.rows.len()).map(|i| i.to_string()).collect(),
            z: table.persons(),
            hovertext: table.rows.iter().map(|r| r.department.clone()).collect(),
            hovertemplate: format!("<b>%{{hovertext}}</b><br>{}=%{{z}}<extra></extra>", PERSONS_AXIS),
            colorscale: scale.name().to_string(),
            colorbar: ColorBar {
                title: Title::new(PERSONS_AXIS),
            },
        }],
        layout: Layout {
            title: Title {
                text: format!("Afiliados Régimen {}", name),
            },
            xaxis: None,
            yaxis: None,
            geo: Some(GeoLayout {
                fitbounds: "locations".to_string(),
                visible: false,
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::join::tests::{affiliation, boundary};
    use crate::join::join_regime;

    fn table(regime: Regime, counts: &[(&str, &str, u64)]) -> RegimeGeoTable {
        let affiliations: Vec<_> = counts
            .iter()
            .map(|(code, name, n)| affiliation(code, name, regime, *n))
            .collect();
        let boundaries: Vec<_> = counts.iter().map(|(code, _, _)| boundary(code)).collect();
        join_regime(regime, &affiliations, &boundaries).0
    }

    fn three_tables() -> Vec<RegimeGeoTable> {
        vec![
            table(
                Regime::Contributivo,
                &[("05", "Antioquia", 1200), ("11", "Bogotá", 900), ("13", "Bolívar", 300)],
            ),
            table(Regime::Subsidiado, &[("05", "Antioquia", 700), ("11", "Bogotá", 400)]),
            table(Regime::Especial, &[("05", "Antioquia", 20)]),
        ]
    }

    #[test]
    fn test_color_scale_parse() {
        assert_eq!("viridis".parse::<ColorScale>().unwrap(), ColorScale::Viridis);
        assert_eq!("ylorrd".parse::<ColorScale>().unwrap(), ColorScale::YlOrRd);
        assert!("Rainbowish".parse::<ColorScale>().is_err());
        assert_eq!(ColorScale::default(), ColorScale::Viridis);
    }

    #[test]
    fn test_long_rows_cover_every_entry() {
        let tables = three_tables();
        let rows = long_rows(&tables);

        assert_eq!(rows.len(), 6);
        assert_eq!(rows.iter().filter(|r| r.regime == Regime::Contributivo).count(), 3);
        assert_eq!(rows.iter().filter(|r| r.regime == Regime::Especial).count(), 1);
        assert_eq!(rows[0], LongRow { regime: Regime::Contributivo, persons: 1200 });
    }

    #[test]
    fn test_boxplot_figure() {
        let tables = three_tables();
        let chart = build_boxplot(&tables);

        assert_eq!(chart.observation_count(), 6);
        assert_eq!(chart.shape_count(), 0);
        assert_eq!(chart.layout.title.text, BOXPLOT_TITLE);

        let json = serde_json::to_value(&chart).unwrap();
        assert_eq!(json["data"][0]["type"], "box");
        assert_eq!(json["data"][0]["x"][3], "Subsidiado");
        assert_eq!(json["data"][0]["y"][3], 700);
        assert_eq!(json["layout"]["xaxis"]["title"]["text"], REGIME_AXIS);
    }

    #[test]
    fn test_boxplot_is_deterministic() {
        let tables = three_tables();
        assert_eq!(build_boxplot(&tables), build_boxplot(&tables));
    }

    #[test]
    fn test_box_summary() {
        let tables = three_tables();

        let summary = box_summary(&tables[0]);
        assert_eq!(summary.count, 3);
        assert_eq!(summary.min, Some(300.0));
        assert_eq!(summary.median, Some(900.0));
        assert_eq!(summary.q1, Some(600.0));
        assert_eq!(summary.q3, Some(1050.0));
        assert_eq!(summary.max, Some(1200.0));

        let empty = box_summary(&RegimeGeoTable { regime: Regime::Especial, rows: vec![] });
        assert_eq!(empty.count, 0);
        assert!(empty.median.is_none());
    }

    #[test]
    fn test_choropleth_figure() {
        let tables = three_tables();
        let chart = build_choropleth(&tables[0], "Contributivo", None);

        assert_eq!(chart.shape_count(), 3);
        assert_eq!(chart.layout.title.text, "Afiliados Régimen Contributivo");

        let json = serde_json::to_value(&chart).unwrap();
        let trace = &json["data"][0];
        assert_eq!(trace["type"], "choropleth");
        assert_eq!(trace["colorscale"], "Viridis");
        assert_eq!(trace["hovertext"][1], "Bogotá");
        assert_eq!(trace["z"][0], 1200);
        assert_eq!(trace["geojson"]["type"], "FeatureCollection");
        assert_eq!(trace["geojson"]["features"][2]["id"], trace["locations"][2]);
        assert_eq!(json["layout"]["geo"]["fitbounds"], "locations");
        assert_eq!(json["layout"]["geo"]["visible"], false);
    }

    #[test]
    fn test_choropleth_custom_scale() {
        let tables = three_tables();
        let chart = build_choropleth(&tables[1], "Subsidiado", Some(ColorScale::Reds));

        match &chart.data[0] {
            Trace::Choropleth { colorscale, .. } => assert_eq!(colorscale, "Reds"),
            other => panic!("expected choropleth, got {:?}", other),
        }
    }

    #[test]
    fn test_choropleth_empty_table() {
        let empty = RegimeGeoTable {
            regime: Regime::Especial,
            rows: vec![],
        };
        let chart = build_choropleth(&empty, "Especial", None);

        assert_eq!(chart.shape_count(), 0);
        let json = serde_json::to_value(&chart).unwrap();
        assert_eq!(json["data"][0]["geojson"]["features"], serde_json::json!([]));
    }
}
