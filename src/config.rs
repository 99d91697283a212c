// ⚙️ Server configuration - CLI flags with environment fallbacks

use crate::loader::DataPaths;
use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Dashboard de afiliados por departamento y régimen.
///
/// Loads the regime files and the department boundaries once, then serves
/// the tabbed dashboard over HTTP.
#[derive(Parser, Debug, Clone)]
#[command(name = "afiliados-server", version, about)]
pub struct ServerConfig {
    /// Address to bind
    #[arg(long, env = "DASHBOARD_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to bind
    #[arg(long, env = "DASHBOARD_PORT", default_value_t = 8050)]
    pub port: u16,

    /// Verbose logging (ignored when RUST_LOG is set)
    #[arg(long, env = "DASHBOARD_DEBUG")]
    pub debug: bool,

    /// Base directory for relative input paths
    #[arg(long, env = "DASHBOARD_DATA_DIR", default_value = ".")]
    pub data_dir: PathBuf,

    #[arg(long, default_value = "datos_contributivo.csv")]
    pub contributivo: PathBuf,

    #[arg(long, default_value = "datos_subsidiado.csv")]
    pub subsidiado: PathBuf,

    #[arg(long, default_value = "datos_especial.csv")]
    pub especial: PathBuf,

    /// Department boundaries (GeoJSON FeatureCollection)
    #[arg(long, default_value = "coordenadas/COLOMBIA/COLOMBIA.geojson")]
    pub boundaries: PathBuf,

    /// Combined municipality-level export; replaces the three regime files
    #[arg(long)]
    pub raw: Option<PathBuf>,

    /// Boundary property holding the department code
    #[arg(long, default_value = "DPTO_CCDGO")]
    pub code_property: String,
}

impl ServerConfig {
    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir.join(path)
        }
    }

    /// Input locations with `data_dir` applied
    pub fn data_paths(&self) -> DataPaths {
        DataPaths {
            contributivo: self.resolve(&self.contributivo),
            subsidiado: self.resolve(&self.subsidiado),
            especial: self.resolve(&self.especial),
            boundaries: self.resolve(&self.boundaries),
            raw: self.raw.as_deref().map(|p| self.resolve(p)),
            code_property: self.code_property.clone(),
        }
    }

    /// Resolve `host:port`; host may be an IP literal or a name like `localhost`
    pub async fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        let target = format!("{}:{}", self.host, self.port);
        tokio::net::lookup_host((self.host.as_str(), self.port))
            .await
            .with_context(|| format!("invalid listen address {}", target))?
            .next()
            .ok_or_else(|| anyhow::anyhow!("listen address {} resolved to nothing", target))
    }

    /// Default log filter when RUST_LOG is not set
    pub fn log_filter(&self) -> &'static str {
        if self.debug {
            "afiliados_dashboard=debug,afiliados_server=debug,tower_http=debug,info"
        } else {
            "info"
        }
    }
}
