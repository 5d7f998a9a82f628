use crate::clocktime;
use crate::error::{ClockTimeError, ExtractError};
use crate::extractor::definition::{
    ExtractorDefinition, FieldParse, FieldSpec, TimestampRole, TokenRef, UnknownTime,
};
use crate::record::{EventRecord, Value, SOURCE, WALLTIME};
use crate::signal::Signal;
use crate::store::{EventStore, StoreHandle};
use std::rc::Rc;

/// Named matcher and parser for one category of log line.
///
/// Cloning is cheap and yields a handle onto the same definition and store.
#[derive(Debug, Clone)]
pub struct LineExtractor {
    definition: Rc<ExtractorDefinition>,
    store: StoreHandle,
}

// Outcome of parsing one field
enum Parsed {
    Value(Value),
    SkipLine,
}

impl LineExtractor {
    pub fn new(definition: ExtractorDefinition) -> Result<Self, ExtractError> {
        validate(&definition)?;
        Ok(LineExtractor {
            definition: Rc::new(definition),
            store: EventStore::shared(),
        })
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn definition(&self) -> &ExtractorDefinition {
        &self.definition
    }

    pub fn store(&self) -> &StoreHandle {
        &self.store
    }

    pub fn field_spec(&self, name: &str) -> Result<&FieldSpec, ExtractError> {
        self.definition
            .fields
            .get(name)
            .ok_or_else(|| ExtractError::UnknownField {
                extractor: self.name().to_string(),
                field: name.to_string(),
            })
    }

    /// Accessor for one field as a signal
    pub fn field(&self, name: &str) -> Result<Signal, ExtractError> {
        self.field_spec(name)?;
        Ok(Signal::field(self.clone(), name))
    }

    /// True when both handles share the same store
    pub fn same_as(&self, other: &LineExtractor) -> bool {
        Rc::ptr_eq(&self.store, &other.store)
    }

    pub fn len(&self) -> usize {
        self.store.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.borrow().is_empty()
    }

    pub fn has_updates(&self) -> bool {
        self.store.borrow().has_updates()
    }

    pub fn reset_updates(&self) {
        self.store.borrow_mut().reset_updates();
    }

    pub fn matches(&self, line: &str) -> bool {
        self.definition
            .match_include
            .iter()
            .all(|s| line.contains(s.as_str()))
            && !self
                .definition
                .match_exclude
                .iter()
                .any(|s| line.contains(s.as_str()))
    }

    /// Match, tokenize and process one line.
    ///
    /// Returns `Ok(false)` when the line is not ours. An error means the line
    /// matched but could not be parsed; nothing was appended.
    pub fn analyze_line(&self, line: &str) -> Result<bool, ExtractError> {
        if !self.matches(line) {
            return Ok(false);
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let first = tokens.first().copied().unwrap_or("");
        let walltime = clocktime::parse(first).map_err(|source| ExtractError::Walltime {
            extractor: self.name().to_string(),
            token: first.to_string(),
            source,
        })?;
        let source = match self.definition.source_token {
            Some(index) => TokenRef::at(index).resolve(&tokens).map(element_name),
            None => None,
        };
        self.process(&tokens, walltime, source)?;
        Ok(true)
    }

    /// Parse the tokens of a matched line and append the record.
    ///
    /// `Ok(None)` means the line was dropped on purpose (an unknown time on a
    /// field declared with [`UnknownTime::Skip`]).
    pub fn process(
        &self,
        tokens: &[&str],
        walltime: f64,
        source: Option<&str>,
    ) -> Result<Option<EventRecord>, ExtractError> {
        let mut record = EventRecord::new(walltime, source);
        for (name, spec) in &self.definition.fields {
            match self.parse_field(name, &spec.parse, tokens, &record)? {
                Parsed::Value(value) => record.insert(name, value),
                Parsed::SkipLine => return Ok(None),
            }
        }
        self.store.borrow_mut().append(record.clone());
        Ok(Some(record))
    }

    fn parse_field(
        &self,
        name: &str,
        parse: &FieldParse,
        tokens: &[&str],
        record: &EventRecord,
    ) -> Result<Parsed, ExtractError> {
        let value = match parse {
            FieldParse::Integer { token, scale } => {
                let text = self.token(name, token, tokens)?;
                let n: i64 = text
                    .parse()
                    .map_err(|e: std::num::ParseIntError| self.parse_failure(name, text, e))?;
                match scale {
                    Some(scale) => Value::Float(n as f64 * scale),
                    None => Value::Integer(n),
                }
            }
            FieldParse::Float { token, scale } => {
                let text = self.token(name, token, tokens)?;
                let f: f64 = text
                    .parse()
                    .map_err(|e: std::num::ParseFloatError| self.parse_failure(name, text, e))?;
                Value::Float(f * scale.unwrap_or(1.0))
            }
            FieldParse::Text { token } => Value::Text(self.token(name, token, tokens)?.to_string()),
            FieldParse::ClockTime { token, unknown } => {
                let text = self.token(name, token, tokens)?;
                let parsed = match unknown {
                    UnknownTime::Fail => clocktime::parse(text),
                    UnknownTime::Default(default) => clocktime::parse_or(text, *default),
                    UnknownTime::Skip if clocktime::is_unknown(text) => {
                        return Ok(Parsed::SkipLine)
                    }
                    UnknownTime::Skip => clocktime::parse(text),
                    UnknownTime::Fallback(other) if clocktime::is_unknown(text) => {
                        let fallback = record.get(other).and_then(Value::as_f64);
                        fallback.ok_or(ClockTimeError::TimeUnknown)
                    }
                    UnknownTime::Fallback(_) => clocktime::parse(text),
                };
                Value::Time(parsed.map_err(|e| self.time_failure(name, e))?)
            }
            FieldParse::PtsOrDts {
                pts,
                dts,
                default,
                take,
            } => {
                let pts = self.token(name, pts, tokens)?;
                let dts = self.token(name, dts, tokens)?;
                let (pts, dts) = clocktime::pts_or_dts(pts, dts, *default)
                    .map_err(|e| self.time_failure(name, e))?;
                Value::Time(match take {
                    TimestampRole::Pts => pts,
                    TimestampRole::Dts => dts,
                })
            }
            FieldParse::Difference {
                minuend,
                subtrahend,
            } => {
                let a = record.get(minuend);
                let b = record.get(subtrahend);
                match (a, b) {
                    (Some(Value::Time(a)), Some(Value::Time(b))) => Value::Time(a - b),
                    (Some(a), Some(b)) => match (a.as_f64(), b.as_f64()) {
                        (Some(a), Some(b)) => Value::Float(a - b),
                        _ => {
                            return Err(self.parse_failure(name, "", "operands are not numeric"))
                        }
                    },
                    _ => return Err(self.parse_failure(name, "", "operands are missing")),
                }
            }
        };
        Ok(Parsed::Value(value))
    }

    fn token<'a>(
        &self,
        field: &str,
        token: &TokenRef,
        tokens: &[&'a str],
    ) -> Result<&'a str, ExtractError> {
        token.resolve(tokens).ok_or_else(|| {
            self.parse_failure(
                field,
                "",
                format!("line has {} tokens, no token at {}", tokens.len(), token.index),
            )
        })
    }

    fn parse_failure(&self, field: &str, token: &str, reason: impl ToString) -> ExtractError {
        ExtractError::FieldParseFailure {
            extractor: self.name().to_string(),
            field: field.to_string(),
            token: token.to_string(),
            reason: reason.to_string(),
        }
    }

    fn time_failure(&self, field: &str, source: ClockTimeError) -> ExtractError {
        ExtractError::Time {
            extractor: self.name().to_string(),
            field: field.to_string(),
            source,
        }
    }
}

fn validate(definition: &ExtractorDefinition) -> Result<(), ExtractError> {
    let misconfigured = |reason: String| ExtractError::ExtractorMisconfigured {
        extractor: definition.name.clone(),
        reason,
    };

    if definition.match_include.is_empty() && definition.match_exclude.is_empty() {
        return Err(misconfigured(
            "no include or exclude strings to match lines with".to_string(),
        ));
    }
    if let Some(name) = definition.duplicate_fields().first() {
        return Err(misconfigured(format!("field '{}' is declared twice", name)));
    }
    if definition.fields.is_empty() {
        return Err(misconfigured("no fields declared".to_string()));
    }
    for (position, (name, spec)) in definition.fields.iter().enumerate() {
        if name == WALLTIME || name == SOURCE {
            return Err(misconfigured(format!("field name '{}' is reserved", name)));
        }
        for reference in spec.parse.references() {
            let earlier = definition
                .fields
                .get_index_of(reference)
                .map_or(false, |i| i < position);
            if !earlier {
                return Err(misconfigured(format!(
                    "field '{}' refers to '{}' which is not declared before it",
                    name, reference
                )));
            }
        }
    }
    Ok(())
}

/// Peel the element name out of a GStreamer location token.
///
/// `gstqueue2.c:1050:update_time_level:<queue2-0>` yields `queue2-0`, as does
/// a bare `<queue2-0>`.
pub fn element_name(token: &str) -> &str {
    let tail = match token.rfind(":<") {
        Some(i) => &token[i + 2..],
        None => token.strip_prefix('<').unwrap_or(token),
    };
    tail.split('>').next().unwrap_or(tail)
}
