use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Configuration of one extractor: which lines it owns and how to parse them.
///
/// Built once per extractor instance and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractorDefinition {
    #[serde(default)]
    pub name: String,
    /// Substrings that must all be present
    #[serde(default)]
    pub match_include: Vec<String>,
    /// Substrings that must all be absent
    #[serde(default)]
    pub match_exclude: Vec<String>,
    /// Token holding the `file:line:function:<element>` location
    #[serde(default)]
    pub source_token: Option<isize>,
    pub fields: IndexMap<String, FieldSpec>,
    /// Field names given more than once through [`ExtractorDefinition::field`]
    #[serde(skip)]
    duplicates: Vec<String>,
}

impl ExtractorDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        ExtractorDefinition {
            name: name.into(),
            match_include: Vec::new(),
            match_exclude: Vec::new(),
            source_token: None,
            fields: IndexMap::new(),
            duplicates: Vec::new(),
        }
    }

    pub fn include<I, S>(mut self, strings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.match_include.extend(strings.into_iter().map(Into::into));
        self
    }

    pub fn exclude<I, S>(mut self, strings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.match_exclude.extend(strings.into_iter().map(Into::into));
        self
    }

    pub fn source_token(mut self, index: isize) -> Self {
        self.source_token = Some(index);
        self
    }

    pub fn field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        let name = name.into();
        if self.fields.contains_key(&name) {
            self.duplicates.push(name);
        } else {
            self.fields.insert(name, spec);
        }
        self
    }

    pub(crate) fn duplicate_fields(&self) -> &[String] {
        &self.duplicates
    }
}

/// Schema entry of one extracted field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldSpec {
    pub description: String,
    #[serde(default)]
    pub marker: String,
    #[serde(default = "default_linestyle")]
    pub linestyle: String,
    #[serde(default)]
    pub unit: Option<String>,
    pub parse: FieldParse,
}

fn default_linestyle() -> String {
    "-".to_string()
}

impl FieldSpec {
    pub fn new(description: impl Into<String>, parse: FieldParse) -> Self {
        FieldSpec {
            description: description.into(),
            marker: String::new(),
            linestyle: default_linestyle(),
            unit: None,
            parse,
        }
    }

    pub fn marker(mut self, marker: &str) -> Self {
        self.marker = marker.to_string();
        self
    }

    pub fn linestyle(mut self, linestyle: &str) -> Self {
        self.linestyle = linestyle.to_string();
        self
    }

    pub fn unit(mut self, unit: &str) -> Self {
        self.unit = Some(unit.to_string());
        self
    }
}

/// How a field's value is obtained from the line tokens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldParse {
    Integer {
        token: TokenRef,
        #[serde(default)]
        scale: Option<f64>,
    },
    Float {
        token: TokenRef,
        #[serde(default)]
        scale: Option<f64>,
    },
    Text {
        token: TokenRef,
    },
    ClockTime {
        token: TokenRef,
        #[serde(default)]
        unknown: UnknownTime,
    },
    /// One side of a PTS/DTS pair resolved with `clocktime::pts_or_dts`
    PtsOrDts {
        pts: TokenRef,
        dts: TokenRef,
        #[serde(default)]
        default: f64,
        take: TimestampRole,
    },
    /// `minuend - subtrahend`, both fields defined earlier in the schema
    Difference { minuend: String, subtrahend: String },
}

impl FieldParse {
    pub fn integer(token: TokenRef) -> Self {
        FieldParse::Integer { token, scale: None }
    }

    pub fn float(token: TokenRef) -> Self {
        FieldParse::Float { token, scale: None }
    }

    pub fn clock_time(token: TokenRef, unknown: UnknownTime) -> Self {
        FieldParse::ClockTime { token, unknown }
    }

    /// Earlier fields this one reads from
    pub fn references(&self) -> Vec<&str> {
        match self {
            FieldParse::Difference {
                minuend,
                subtrahend,
            } => vec![minuend.as_str(), subtrahend.as_str()],
            FieldParse::ClockTime {
                unknown: UnknownTime::Fallback(field),
                ..
            } => vec![field.as_str()],
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampRole {
    Pts,
    Dts,
}

/// What a clock time field does with `GST_CLOCK_TIME_NONE`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "UnknownRepr", into = "UnknownRepr")]
pub enum UnknownTime {
    /// The line is malformed
    #[default]
    Fail,
    /// Drop the whole line silently
    Skip,
    /// Substitute a constant
    Default(f64),
    /// Substitute the value of an earlier field
    Fallback(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum UnknownRepr {
    Keyword(UnknownKeyword),
    Default { default: f64 },
    Fallback { fallback: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum UnknownKeyword {
    Fail,
    Skip,
}

impl From<UnknownRepr> for UnknownTime {
    fn from(repr: UnknownRepr) -> Self {
        match repr {
            UnknownRepr::Keyword(UnknownKeyword::Fail) => UnknownTime::Fail,
            UnknownRepr::Keyword(UnknownKeyword::Skip) => UnknownTime::Skip,
            UnknownRepr::Default { default } => UnknownTime::Default(default),
            UnknownRepr::Fallback { fallback } => UnknownTime::Fallback(fallback),
        }
    }
}

impl From<UnknownTime> for UnknownRepr {
    fn from(unknown: UnknownTime) -> Self {
        match unknown {
            UnknownTime::Fail => UnknownRepr::Keyword(UnknownKeyword::Fail),
            UnknownTime::Skip => UnknownRepr::Keyword(UnknownKeyword::Skip),
            UnknownTime::Default(default) => UnknownRepr::Default { default },
            UnknownTime::Fallback(fallback) => UnknownRepr::Fallback { fallback },
        }
    }
}

/// Position of a token on the line plus the trimming applied to it.
///
/// Negative indices count from the end (`-1` is the last token), which is
/// stable across log lines whose prefix varies. Trimming happens in order:
/// `split_after` keeps the text after the last delimiter, then
/// `strip_prefix`/`strip_suffix` drop that many characters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "TokenRepr")]
pub struct TokenRef {
    pub index: isize,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub strip_prefix: usize,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub strip_suffix: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split_after: Option<String>,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

// A bare integer is shorthand for an untrimmed token
#[derive(Deserialize)]
#[serde(untagged)]
enum TokenRepr {
    Index(isize),
    Full(TokenFields),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TokenFields {
    index: isize,
    #[serde(default)]
    strip_prefix: usize,
    #[serde(default)]
    strip_suffix: usize,
    #[serde(default)]
    split_after: Option<String>,
}

impl From<TokenRepr> for TokenRef {
    fn from(repr: TokenRepr) -> Self {
        match repr {
            TokenRepr::Index(index) => TokenRef::at(index),
            TokenRepr::Full(TokenFields {
                index,
                strip_prefix,
                strip_suffix,
                split_after,
            }) => TokenRef {
                index,
                strip_prefix,
                strip_suffix,
                split_after,
            },
        }
    }
}

impl TokenRef {
    pub fn at(index: isize) -> Self {
        TokenRef {
            index,
            strip_prefix: 0,
            strip_suffix: 0,
            split_after: None,
        }
    }

    pub fn strip_prefix(mut self, chars: usize) -> Self {
        self.strip_prefix = chars;
        self
    }

    pub fn strip_suffix(mut self, chars: usize) -> Self {
        self.strip_suffix = chars;
        self
    }

    pub fn split_after(mut self, delimiter: &str) -> Self {
        self.split_after = Some(delimiter.to_string());
        self
    }

    /// Locate and trim the token, `None` when the line is too short
    pub fn resolve<'a>(&self, tokens: &[&'a str]) -> Option<&'a str> {
        let raw = if self.index < 0 {
            let back = self.index.unsigned_abs();
            if back > tokens.len() {
                return None;
            }
            tokens[tokens.len() - back]
        } else {
            *tokens.get(self.index as usize)?
        };

        let mut text = raw;
        if let Some(delimiter) = &self.split_after {
            text = text.rsplit(delimiter.as_str()).next().unwrap_or(text);
        }
        if self.strip_prefix > 0 {
            text = match text.char_indices().nth(self.strip_prefix) {
                Some((i, _)) => &text[i..],
                None => "",
            };
        }
        if self.strip_suffix > 0 {
            text = match text.char_indices().nth_back(self.strip_suffix - 1) {
                Some((i, _)) => &text[..i],
                None => "",
            };
        }
        Some(text)
    }
}
