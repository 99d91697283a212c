// Régimen de afiliación - the three insurance regimes shown in the dashboard

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Regime - Identifica el régimen de afiliación de un registro
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Regime {
    Contributivo,
    Subsidiado,
    Especial,
}

impl Regime {
    /// All regimes in display order (boxplot groups, tabs, selectors)
    pub const ALL: [Regime; 3] = [Regime::Contributivo, Regime::Subsidiado, Regime::Especial];

    /// Human-readable name for display
    pub fn name(&self) -> &'static str {
        match self {
            Regime::Contributivo => "Contributivo",
            Regime::Subsidiado => "Subsidiado",
            Regime::Especial => "Especial",
        }
    }

    /// Short code used by the raw affiliation export
    pub fn code(&self) -> &'static str {
        match self {
            Regime::Contributivo => "C",
            Regime::Subsidiado => "S",
            Regime::Especial => "E",
        }
    }

    /// Lower-case slug used in URLs
    pub fn slug(&self) -> &'static str {
        match self {
            Regime::Contributivo => "contributivo",
            Regime::Subsidiado => "subsidiado",
            Regime::Especial => "especial",
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Regime {
    type Err = String;

    /// Accepts the full name or the one-letter code, case-insensitive
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        Regime::ALL
            .into_iter()
            .find(|r| value.eq_ignore_ascii_case(r.name()) || value.eq_ignore_ascii_case(r.code()))
            .ok_or_else(|| format!("unknown regime: {}", value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regime_names() {
        assert_eq!(Regime::Contributivo.name(), "Contributivo");
        assert_eq!(Regime::Subsidiado.name(), "Subsidiado");
        assert_eq!(Regime::Especial.name(), "Especial");
    }

    #[test]
    fn test_parse_full_name_any_case() {
        assert_eq!("contributivo".parse::<Regime>().unwrap(), Regime::Contributivo);
        assert_eq!(" SUBSIDIADO ".parse::<Regime>().unwrap(), Regime::Subsidiado);
        assert_eq!("Especial".parse::<Regime>().unwrap(), Regime::Especial);
    }

    #[test]
    fn test_parse_short_code() {
        assert_eq!("c".parse::<Regime>().unwrap(), Regime::Contributivo);
        assert_eq!("S".parse::<Regime>().unwrap(), Regime::Subsidiado);
        assert_eq!("e".parse::<Regime>().unwrap(), Regime::Especial);
    }

    #[test]
    fn test_parse_unknown() {
        assert!("Excepcion".parse::<Regime>().is_err());
        assert!("".parse::<Regime>().is_err());
    }
}
