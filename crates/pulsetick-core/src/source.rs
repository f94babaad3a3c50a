use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Upstream data providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Yahoo,
    Fred,
}

impl ProviderId {
    pub const ALL: [Self; 2] = [Self::Yahoo, Self::Fred];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Yahoo => "yahoo",
            Self::Fred => "fred",
        }
    }

    /// Human-readable provider name used in stored `source` strings.
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Yahoo => "Yahoo Finance",
            Self::Fred => "FRED",
        }
    }

    /// Provenance string for a sample fetched with `identifier`,
    /// e.g. `Yahoo Finance (NQ=F)`.
    pub fn provenance(self, identifier: &str) -> String {
        format!("{} ({identifier})", self.display_name())
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "yahoo" => Ok(Self::Yahoo),
            "fred" => Ok(Self::Fred),
            other => Err(ValidationError::InvalidSource {
                value: other.to_owned(),
            }),
        }
    }
}
