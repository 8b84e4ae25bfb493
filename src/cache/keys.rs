//! Cache Key Module
//!
//! Resource type tags, parameter bags and deterministic key construction.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::CacheError;

// == Resource Type ==
/// Class of cached data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Course,
    Courses,
    Module,
    Lesson,
    User,
    Enrollment,
    Analytics,
    Search,
    Forum,
    Version,
    Categories,
    Settings,
}

impl ResourceType {
    /// Every resource type, in declaration order.
    pub const ALL: [ResourceType; 12] = [
        ResourceType::Course,
        ResourceType::Courses,
        ResourceType::Module,
        ResourceType::Lesson,
        ResourceType::User,
        ResourceType::Enrollment,
        ResourceType::Analytics,
        ResourceType::Search,
        ResourceType::Forum,
        ResourceType::Version,
        ResourceType::Categories,
        ResourceType::Settings,
    ];

    /// Tag used inside cache keys.
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceType::Course => "course",
            ResourceType::Courses => "courses",
            ResourceType::Module => "module",
            ResourceType::Lesson => "lesson",
            ResourceType::User => "user",
            ResourceType::Enrollment => "enrollment",
            ResourceType::Analytics => "analytics",
            ResourceType::Search => "search",
            ResourceType::Forum => "forum",
            ResourceType::Version => "version",
            ResourceType::Categories => "categories",
            ResourceType::Settings => "settings",
        }
    }

    /// Position in [`ResourceType::ALL`], used to index per-type counters.
    pub(crate) fn index(self) -> usize {
        self as usize
    }

    /// Default rate-limiter identifier for misses of this type.
    pub fn rate_limit_identifier(self) -> String {
        format!("rate-limit:{}", self.as_str())
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_ascii_lowercase();
        ResourceType::ALL
            .into_iter()
            .find(|rtype| rtype.as_str() == tag)
            .ok_or_else(|| CacheError::InvalidRequest(format!("Unknown resource type: {}", s)))
    }
}

// == Param Value ==
/// JSON-compatible parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Array(Vec<ParamValue>),
    Object(BTreeMap<String, ParamValue>),
}

impl ParamValue {
    /// Serializes the value as compact JSON with object keys in sorted order.
    ///
    /// Non-finite floats have no JSON form and are written as `null`.
    pub fn canonical_json(&self) -> String {
        let mut out = String::new();
        self.write_canonical(&mut out);
        out
    }

    fn write_canonical(&self, out: &mut String) {
        match self {
            ParamValue::Null => out.push_str("null"),
            ParamValue::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            ParamValue::Int(n) => out.push_str(&n.to_string()),
            ParamValue::Float(f) => match serde_json::Number::from_f64(*f) {
                Some(n) => out.push_str(&n.to_string()),
                None => out.push_str("null"),
            },
            ParamValue::Str(s) => write_json_string(s, out),
            ParamValue::Array(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    item.write_canonical(out);
                }
                out.push(']');
            }
            ParamValue::Object(map) => write_object(map, out),
        }
    }
}

fn write_json_string(s: &str, out: &mut String) {
    out.push_str(&serde_json::Value::String(s.to_string()).to_string());
}

fn write_object(map: &BTreeMap<String, ParamValue>, out: &mut String) {
    out.push('{');
    for (i, (key, value)) in map.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_json_string(key, out);
        out.push(':');
        value.write_canonical(out);
    }
    out.push('}');
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Int(i64::from(value))
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::Int(i64::from(value))
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Str(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Str(value)
    }
}

impl<T: Into<ParamValue>> From<Vec<T>> for ParamValue {
    fn from(values: Vec<T>) -> Self {
        ParamValue::Array(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(ParamValue::Null, Into::into)
    }
}

// == Param Bag ==
/// Query parameters that disambiguate cached results (pagination, filters, sort).
///
/// Keys are held sorted, so insertion order never reaches the cache key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamBag {
    params: BTreeMap<String, ParamValue>,
}

impl ParamBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter, builder style.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Adds or replaces a parameter.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.params.insert(name.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Compact JSON object with keys in lexicographic order.
    pub fn canonical_json(&self) -> String {
        let mut out = String::new();
        write_object(&self.params, &mut out);
        out
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for ParamBag {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut bag = ParamBag::new();
        for (name, value) in iter {
            bag.insert(name, value);
        }
        bag
    }
}

// == Cache Key ==
/// Opaque key under which an entry is stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// == Key Builder ==
/// Builds namespaced cache keys of the form `<ns>:<type>[:<id>][:<params>]`.
#[derive(Debug, Clone)]
pub struct KeyBuilder {
    namespace: String,
}

impl KeyBuilder {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Builds the key for a resource lookup.
    ///
    /// # Arguments
    /// * `resource` - Resource type tag
    /// * `id` - Optional resource identifier, percent-encoded so it can never
    ///   contain the `:` separator or open a parameter segment
    /// * `params` - Optional parameters; an empty bag adds nothing to the key
    pub fn build(
        &self,
        resource: ResourceType,
        id: Option<&str>,
        params: Option<&ParamBag>,
    ) -> CacheKey {
        let mut key = self.type_prefix(resource);
        if let Some(id) = id {
            key.push(':');
            key.push_str(&urlencoding::encode(id));
        }
        if let Some(params) = params.filter(|p| !p.is_empty()) {
            key.push(':');
            key.push_str(&params.canonical_json());
        }
        CacheKey(key)
    }

    /// `<ns>:<type>`, the key of a type-level entry and the root of its keyspace.
    pub fn type_prefix(&self, resource: ResourceType) -> String {
        format!("{}:{}", self.namespace, resource.as_str())
    }
}
