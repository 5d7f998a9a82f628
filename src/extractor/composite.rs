use crate::error::ExtractError;
use crate::extractor::line::LineExtractor;
use crate::signal::Signal;
use indexmap::IndexMap;

/// Several extractors of one pipeline stage grouped under sub-keys.
///
/// Lines are offered to the children in registration order and the first
/// child that matches wins.
#[derive(Debug, Clone)]
pub struct CompositeExtractor {
    name: String,
    children: IndexMap<String, LineExtractor>,
}

impl CompositeExtractor {
    pub fn new<I, K>(name: impl Into<String>, children: I) -> Result<Self, ExtractError>
    where
        I: IntoIterator<Item = (K, LineExtractor)>,
        K: Into<String>,
    {
        let name = name.into();
        let mut map = IndexMap::new();
        for (key, child) in children {
            let key = key.into();
            if map.contains_key(&key) {
                return Err(ExtractError::ExtractorMisconfigured {
                    extractor: name,
                    reason: format!("duplicate sub-extractor '{}'", key),
                });
            }
            map.insert(key, child);
        }
        if map.is_empty() {
            return Err(ExtractError::ExtractorMisconfigured {
                extractor: name,
                reason: "group has no sub-extractors".to_string(),
            });
        }
        Ok(CompositeExtractor {
            name,
            children: map,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sub(&self, key: &str) -> Result<&LineExtractor, ExtractError> {
        self.children
            .get(key)
            .ok_or_else(|| ExtractError::UnknownSubExtractor {
                group: self.name.clone(),
                name: key.to_string(),
            })
    }

    /// Shorthand for `sub(key)?.field(field)`
    pub fn field(&self, key: &str, field: &str) -> Result<Signal, ExtractError> {
        self.sub(key)?.field(field)
    }

    pub fn children(&self) -> impl Iterator<Item = (&str, &LineExtractor)> {
        self.children.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn extractors(&self) -> impl Iterator<Item = &LineExtractor> {
        self.children.values()
    }

    pub fn matches(&self, line: &str) -> bool {
        self.children.values().any(|c| c.matches(line))
    }

    /// Offer the line to each child in order, stopping at the first match
    pub fn analyze_line(&self, line: &str) -> Result<bool, ExtractError> {
        for child in self.children.values() {
            if child.analyze_line(line)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn has_updates(&self) -> bool {
        self.children.values().any(LineExtractor::has_updates)
    }

    pub fn reset_updates(&self) {
        for child in self.children.values() {
            child.reset_updates();
        }
    }
}
