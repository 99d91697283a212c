// Afiliados Dashboard - Core Library
// Health-insurance affiliates per Colombian department, split by regime.
// Exposes all modules for use in the web server and tests

pub mod regime;
pub mod loader;     // Data Loader: regime CSVs, raw export, boundaries
pub mod join;       // Join Engine: affiliation ⋈ geometry on department code
pub mod charts;     // Chart Builders: Plotly boxplot + choropleth figures
pub mod controller; // Interactive Filter Controller

#[cfg(feature = "server")]
pub mod config;
#[cfg(feature = "server")]
pub mod server;

// Re-export commonly used types
pub use regime::Regime;
pub use loader::{
    AffiliationRecord, DepartmentAffiliation, DepartmentGeometry,
    DataPaths, LoadedData, LoadError, ParseError,
    load_all, load_regime, load_raw_affiliations, load_boundaries,
    exclude_not_applicable, aggregate_by_department,
    parse_person_count, normalize_code, NOT_APPLICABLE,
};
pub use join::{GeoRow, JoinDiagnostics, RegimeGeoTable, join_regime};
pub use charts::{
    BoxSummary, ChartSpec, ColorScale, LongRow, Trace,
    box_summary, build_boxplot, build_choropleth, long_rows,
};
pub use controller::{Dashboard, FilterSelection};

#[cfg(feature = "server")]
pub use config::ServerConfig;
#[cfg(feature = "server")]
pub use server::{router, ApiError, ApiResponse, AppState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
