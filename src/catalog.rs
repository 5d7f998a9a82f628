//! Registry of named extractors and groups that signal paths resolve against.

mod builtin;

use crate::definitions::GraphDefinitions;
use crate::error::{ConfigError, ExtractError};
use crate::extractor::{CompositeExtractor, LineExtractor};
use crate::signal::Signal;
use indexmap::IndexMap;

#[derive(Debug, Clone)]
pub enum CatalogEntry {
    Extractor(LineExtractor),
    Group(CompositeExtractor),
}

/// One field reachable through [`Catalog::resolve`]
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogField {
    pub path: String,
    pub description: String,
    pub unit: Option<String>,
}

#[derive(Debug, Default)]
pub struct Catalog {
    entries: IndexMap<String, CatalogEntry>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog holding fresh instances of the GStreamer element groups
    pub fn builtin() -> Result<Self, ExtractError> {
        let mut catalog = Catalog::new();
        for group in builtin::groups()? {
            catalog
                .entries
                .insert(group.name().to_string(), CatalogEntry::Group(group));
        }
        Ok(catalog)
    }

    pub fn add_extractor(&mut self, extractor: LineExtractor) -> Result<(), ConfigError> {
        let name = extractor.name().to_string();
        self.insert(name, CatalogEntry::Extractor(extractor))
    }

    pub fn add_group(&mut self, group: CompositeExtractor) -> Result<(), ConfigError> {
        let name = group.name().to_string();
        self.insert(name, CatalogEntry::Group(group))
    }

    fn insert(&mut self, name: String, entry: CatalogEntry) -> Result<(), ConfigError> {
        if self.entries.contains_key(&name) {
            return Err(ConfigError::Duplicate(name));
        }
        self.entries.insert(name, entry);
        Ok(())
    }

    /// Register the extractors and groups of a definitions file
    pub fn extend_from(&mut self, definitions: &GraphDefinitions) -> Result<(), ConfigError> {
        for extractor in definitions.extractors()? {
            self.add_extractor(extractor)?;
        }
        for group in definitions.groups()? {
            self.add_group(group)?;
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.get(name)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &CatalogEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Resolve `extractor.field` or `group.sub.field` to a field signal
    pub fn resolve(&self, path: &str) -> Result<Signal, ExtractError> {
        let parts: Vec<&str> = path.split('.').collect();
        let unknown = || ExtractError::UnknownExtractor(path.to_string());
        let entry = self.entries.get(parts[0]).ok_or_else(unknown)?;

        match (entry, parts.as_slice()) {
            (CatalogEntry::Extractor(extractor), [_, field]) => extractor.field(field),
            (CatalogEntry::Group(group), [_, sub, field]) => group.field(sub, field),
            (CatalogEntry::Group(group), [_, sub]) => {
                // name the group member so the message says what is missing
                group.sub(sub)?;
                Err(unknown())
            }
            _ => Err(unknown()),
        }
    }

    /// Every resolvable field path, in registration order
    pub fn fields(&self) -> Vec<CatalogField> {
        let mut fields = Vec::new();
        let mut push = |prefix: &str, extractor: &LineExtractor| {
            for (name, spec) in &extractor.definition().fields {
                fields.push(CatalogField {
                    path: format!("{}.{}", prefix, name),
                    description: spec.description.clone(),
                    unit: spec.unit.clone(),
                });
            }
        };
        for (name, entry) in &self.entries {
            match entry {
                CatalogEntry::Extractor(extractor) => push(name, extractor),
                CatalogEntry::Group(group) => {
                    for (sub, extractor) in group.children() {
                        push(&format!("{}.{}", name, sub), extractor);
                    }
                }
            }
        }
        fields
    }
}
