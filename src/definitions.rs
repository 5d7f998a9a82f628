//! YAML files declaring extra extractors, groups and figures.
//!
//! ```yaml
//! extractors:
//!   latency:
//!     match_include: [mysrc.c, "latency is"]
//!     source_token: -4
//!     fields:
//!       latency: { description: Latency, parse: { kind: clock_time, token: -1 } }
//! groups:
//!   mysrc:
//!     chain: { ... }
//! figures:
//!   - name: Latency
//!     signals: [latency.latency, latency.latency.running_average(5)]
//!     split: true
//! ```

use crate::catalog::Catalog;
use crate::error::ConfigError;
use crate::extractor::{CompositeExtractor, ExtractorDefinition, LineExtractor};
use crate::figure::Figure;
use crate::record::SOURCE;
use crate::signal::parse_signal;
use indexmap::IndexMap;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GraphDefinitions {
    /// Standalone extractors keyed by name
    #[serde(default)]
    pub extractors: IndexMap<String, ExtractorDefinition>,
    /// Groups keyed by name, each a map of sub-extractors
    #[serde(default)]
    pub groups: IndexMap<String, IndexMap<String, ExtractorDefinition>>,
    #[serde(default)]
    pub figures: Vec<FigureDefinition>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FigureDefinition {
    pub name: String,
    /// Signal expressions, see [`crate::signal::expr`]
    pub signals: Vec<String>,
    #[serde(default = "default_split_key")]
    pub split_key: String,
    #[serde(default)]
    pub split: bool,
}

fn default_split_key() -> String {
    SOURCE.to_string()
}

impl GraphDefinitions {
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    /// Instantiate the standalone extractors, each with a fresh store
    pub fn extractors(&self) -> Result<Vec<LineExtractor>, ConfigError> {
        self.extractors
            .iter()
            .map(|(name, definition)| Ok(LineExtractor::new(named(definition, name))?))
            .collect()
    }

    /// Instantiate the groups; members are named `group.sub`
    pub fn groups(&self) -> Result<Vec<CompositeExtractor>, ConfigError> {
        let mut groups = Vec::with_capacity(self.groups.len());
        for (group, members) in &self.groups {
            let children = members
                .iter()
                .map(|(sub, definition)| {
                    let definition = named(definition, &format!("{}.{}", group, sub));
                    LineExtractor::new(definition).map(|extractor| (sub.clone(), extractor))
                })
                .collect::<Result<Vec<_>, _>>()?;
            groups.push(CompositeExtractor::new(group.clone(), children)?);
        }
        Ok(groups)
    }

    /// Build the declared figures against a catalog that already holds
    /// every extractor they reference
    pub fn figures(&self, catalog: &Catalog) -> Result<Vec<Figure>, ConfigError> {
        self.figures
            .iter()
            .map(|figure| {
                let signals = figure
                    .signals
                    .iter()
                    .map(|expr| parse_signal(expr, catalog))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|source| ConfigError::Signal {
                        figure: figure.name.clone(),
                        source,
                    })?;
                Ok(Figure::new(figure.name.clone(), signals)
                    .split_key(figure.split_key.clone())
                    .split(figure.split))
            })
            .collect()
    }
}

fn named(definition: &ExtractorDefinition, name: &str) -> ExtractorDefinition {
    let mut definition = definition.clone();
    definition.name = name.to_string();
    definition
}
