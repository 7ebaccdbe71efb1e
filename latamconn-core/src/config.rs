use crate::error::{CoreError, Result};
use crate::matrix::default_latam_countries;
use latamconn_geo::{AliasTable, ArcStyle};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Run configuration. Every field has a default, so a config file only
/// needs the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Name of the input column holding the affiliation addresses.
    pub address_field: String,
    /// Matrix rows, in output order.
    pub latam_countries: Vec<String>,
    /// Drop rows without any valid country from the deduplicated table.
    pub drop_empty_rows: bool,
    pub arc_style: ArcStyle,
    /// Extra centroid aliases (alias -> map name) on top of the fixed table.
    pub aliases: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address_field: "addresses".to_string(),
            latam_countries: default_latam_countries(),
            drop_empty_rows: false,
            arc_style: ArcStyle::default(),
            aliases: BTreeMap::new(),
        }
    }
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.address_field.trim().is_empty() {
            return Err(CoreError::Config("address_field must not be empty".to_string()));
        }
        if self.latam_countries.is_empty() {
            return Err(CoreError::Config(
                "latam_countries must list at least one country".to_string(),
            ));
        }
        self.arc_style.validate()?;
        Ok(())
    }

    pub fn alias_table(&self) -> AliasTable {
        AliasTable::default().with_extra(self.aliases.iter().map(|(k, v)| (k, v.clone())))
    }
}
