use crate::metadata::GroupedTags;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static SANE_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_]+:[A-Za-z0-9_]+$").expect("tag name regex is valid")
});

/// The Rust type a generated field gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    String,
    Integer,
    Float,
    Bool,
    ExifDate,
    ExifTime,
    ExifDateTime,
    /// Values of mixed or structured shape, kept as `serde_json::Value`.
    Json,
}

impl ValueType {
    /// Types implied by the tag name alone, regardless of the sampled values.
    fn from_name(name: &str) -> Option<Self> {
        if name == "DateStampMode" {
            Some(Self::String)
        } else if name.contains("DateStamp") {
            Some(Self::ExifDate)
        } else if name.contains("TimeStamp") {
            Some(Self::ExifTime)
        } else if name.contains("Date") {
            Some(Self::ExifDateTime)
        } else {
            None
        }
    }

    fn of(value: &Value) -> Self {
        match value {
            Value::String(_) => Self::String,
            Value::Number(n) if n.is_i64() || n.is_u64() => Self::Integer,
            Value::Number(_) => Self::Float,
            Value::Bool(_) => Self::Bool,
            Value::Null | Value::Array(_) | Value::Object(_) => Self::Json,
        }
    }

    fn unify(self, other: Self) -> Self {
        match (self, other) {
            (a, b) if a == b => a,
            (Self::Integer, Self::Float) | (Self::Float, Self::Integer) => Self::Float,
            _ => Self::Json,
        }
    }

    pub fn rust_type(self) -> &'static str {
        match self {
            Self::String => "String",
            Self::Integer => "i64",
            Self::Float => "f64",
            Self::Bool => "bool",
            Self::ExifDate => "ExifDate",
            Self::ExifTime => "ExifTime",
            Self::ExifDateTime => "ExifDateTime",
            Self::Json => "serde_json::Value",
        }
    }

    /// The `crate::de` helper the field is deserialized with, if it needs one.
    pub(crate) fn deserializer(self) -> Option<&'static str> {
        match self {
            Self::String => Some("crate::de::string"),
            Self::Integer => Some("crate::de::integer"),
            Self::Float => Some("crate::de::float"),
            Self::ExifDate | Self::ExifTime | Self::ExifDateTime => Some("crate::de::lenient"),
            Self::Bool | Self::Json => None,
        }
    }
}

/// A `Group:Tag` seen while sampling files.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservedTag {
    tag: String,
    samples: usize,
    example: Value,
    observed: ValueType,
}

impl ObservedTag {
    fn new(tag: &str, value: &Value) -> Self {
        Self {
            tag: tag.to_string(),
            samples: 0,
            example: value.clone(),
            observed: ValueType::of(value),
        }
    }

    /// `Group:Tag`
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn group(&self) -> &str {
        self.tag.split_once(':').map_or("", |(group, _)| group)
    }

    /// The tag without its group.
    pub fn name(&self) -> &str {
        self.tag.split_once(':').map_or(&self.tag, |(_, name)| name)
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    /// The first value seen for this tag.
    pub fn example(&self) -> &Value {
        &self.example
    }

    pub fn value_type(&self) -> ValueType {
        ValueType::from_name(self.name()).unwrap_or(self.observed)
    }
}

/// Aggregates the tags found across many files.
#[derive(Debug, Default, Clone)]
pub struct TagCollector {
    tags: BTreeMap<String, ObservedTag>,
}

impl TagCollector {
    /// Records one value. Keys that aren't a plain `Group:Tag` are ignored;
    /// returns whether the value was kept.
    pub fn add(&mut self, tag: &str, value: &Value) -> bool {
        if !SANE_TAG.is_match(tag) {
            log::debug!("Skipping tag {tag:?}");
            return false;
        }
        let observed = self
            .tags
            .entry(tag.to_string())
            .or_insert_with(|| ObservedTag::new(tag, value));
        if observed.samples > 0 {
            observed.observed = observed.observed.unify(ValueType::of(value));
        }
        observed.samples += 1;
        true
    }

    pub fn add_grouped(&mut self, grouped: &GroupedTags) {
        for (tag, value) in grouped.qualified() {
            self.add(&tag, value);
        }
    }

    /// Number of unique tags seen.
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Tags seen more than `min_values` times, sorted by `Group:Tag`.
    pub fn tags(&self, min_values: usize) -> impl Iterator<Item = &ObservedTag> {
        self.tags
            .values()
            .filter(move |observed| observed.samples > min_values)
    }

    /// [`TagCollector::tags`] keyed by group name.
    pub fn grouped_tags(&self, min_values: usize) -> BTreeMap<&str, Vec<&ObservedTag>> {
        let mut groups: BTreeMap<&str, Vec<&ObservedTag>> = BTreeMap::new();
        for observed in self.tags(min_values) {
            groups.entry(observed.group()).or_default().push(observed);
        }
        groups
    }
}
