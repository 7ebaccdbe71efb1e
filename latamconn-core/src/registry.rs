//! The set of accepted country names and token validation against it.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

const BUILTIN_COUNTRIES: &str = include_str!("../data/iso3166.json");

/// One entry from a country authority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpha_2: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub official_name: Option<String>,
}

/// Source of authoritative country entries.
pub trait CountryAuthority {
    fn countries(&self) -> Vec<CountryRecord>;
}

/// ISO 3166-1 entries loaded from JSON (bundled by default).
#[derive(Debug, Clone)]
pub struct Iso3166 {
    records: Vec<CountryRecord>,
}

impl Iso3166 {
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_COUNTRIES)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let records: Vec<CountryRecord> = serde_json::from_str(json)?;
        if records.is_empty() {
            return Err(CoreError::Registry("no country entries".to_string()));
        }
        Ok(Self { records })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    pub fn builtin_json() -> &'static str {
        BUILTIN_COUNTRIES
    }
}

impl CountryAuthority for Iso3166 {
    fn countries(&self) -> Vec<CountryRecord> {
        self.records.clone()
    }
}

/// Accepted country names: every common name plus any official name.
///
/// Built once per run and shared read-only by every stage.
#[derive(Debug, Clone, Default)]
pub struct CountryRegistry {
    names: HashSet<String>,
}

impl CountryRegistry {
    pub fn from_authority(authority: &dyn CountryAuthority) -> Self {
        let mut names = HashSet::new();
        for country in authority.countries() {
            names.insert(country.name.trim().to_string());
            if let Some(official) = country.official_name {
                names.insert(official.trim().to_string());
            }
        }
        Self { names }
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            names: names
                .into_iter()
                .map(|n| n.as_ref().trim().to_string())
                .collect(),
        }
    }

    pub fn builtin() -> Result<Self> {
        Ok(Self::from_authority(&Iso3166::builtin()?))
    }

    /// Canonical name for `token` if its trimmed form is accepted verbatim.
    ///
    /// Matching is exact and case-sensitive; anything else is absent.
    pub fn validate(&self, token: &str) -> Option<String> {
        let trimmed = token.trim();
        self.names.get(trimmed).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
