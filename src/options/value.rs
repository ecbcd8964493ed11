//! Typed option values and the per-module parameter store.

use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};

use super::error::LookupError;
use super::schema::TypeTag;

// ---------------------------------------------------------------------------
// OptionValue – a single typed parameter value
// ---------------------------------------------------------------------------

/// A coerced parameter value. The variant always matches the [`TypeTag`]
/// declared for its key.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// Nested list/tuple literal; elements may be any variant.
    Sequence(Vec<OptionValue>),
}

impl OptionValue {
    /// The schema type this value satisfies.
    pub fn type_tag(&self) -> TypeTag {
        match self {
            OptionValue::Bool(_) => TypeTag::Bool,
            OptionValue::Int(_) => TypeTag::Int,
            OptionValue::Float(_) => TypeTag::Float,
            OptionValue::Text(_) => TypeTag::String,
            OptionValue::Sequence(_) => TypeTag::Array,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            OptionValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view; integers are widened.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            OptionValue::Float(v) => Some(*v),
            OptionValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[OptionValue]> {
        match self {
            OptionValue::Sequence(items) => Some(items),
            _ => None,
        }
    }

    fn fmt_nested(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Text(s) => write!(f, "{s:?}"),
            other => write!(f, "{other}"),
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(b) => write!(f, "{b}"),
            OptionValue::Int(i) => write!(f, "{i}"),
            OptionValue::Float(v) => write!(f, "{v:?}"),
            OptionValue::Text(s) => write!(f, "{s}"),
            OptionValue::Sequence(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    item.fmt_nested(f)?;
                }
                f.write_str("]")
            }
        }
    }
}

impl Serialize for OptionValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            OptionValue::Bool(b) => serializer.serialize_bool(*b),
            OptionValue::Int(i) => serializer.serialize_i64(*i),
            OptionValue::Float(v) => serializer.serialize_f64(*v),
            OptionValue::Text(s) => serializer.serialize_str(s),
            OptionValue::Sequence(items) => items.serialize(serializer),
        }
    }
}

// ---------------------------------------------------------------------------
// ModuleOptions – the parameters of one module
// ---------------------------------------------------------------------------

/// Parameters of a single module, in definition order.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleOptions {
    name: String,
    entries: Vec<(String, OptionValue)>,
}

impl ModuleOptions {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: Vec::new(),
        }
    }

    /// An options view with no parameters, for modules absent from the file.
    pub fn empty(name: &str) -> Self {
        Self::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, parameter: &str) -> Option<&OptionValue> {
        self.entries
            .iter()
            .find(|(name, _)| name == parameter)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, parameter: &str) -> bool {
        self.get(parameter).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn require(&self, parameter: &str) -> Result<&OptionValue, LookupError> {
        self.get(parameter).ok_or_else(|| LookupError::Missing {
            module: self.name.clone(),
            parameter: parameter.to_string(),
        })
    }

    fn wrong_type(&self, parameter: &str, expected: TypeTag, found: &OptionValue) -> LookupError {
        LookupError::WrongType {
            module: self.name.clone(),
            parameter: parameter.to_string(),
            expected,
            found: found.type_tag(),
        }
    }

    pub fn require_f64(&self, parameter: &str) -> Result<f64, LookupError> {
        let value = self.require(parameter)?;
        value
            .as_f64()
            .ok_or_else(|| self.wrong_type(parameter, TypeTag::Float, value))
    }

    pub fn require_i64(&self, parameter: &str) -> Result<i64, LookupError> {
        let value = self.require(parameter)?;
        value
            .as_i64()
            .ok_or_else(|| self.wrong_type(parameter, TypeTag::Int, value))
    }

    pub fn require_str(&self, parameter: &str) -> Result<&str, LookupError> {
        let value = self.require(parameter)?;
        value
            .as_str()
            .ok_or_else(|| self.wrong_type(parameter, TypeTag::String, value))
    }

    pub fn require_sequence(&self, parameter: &str) -> Result<&[OptionValue], LookupError> {
        let value = self.require(parameter)?;
        value
            .as_sequence()
            .ok_or_else(|| self.wrong_type(parameter, TypeTag::Array, value))
    }

    /// Boolean parameter, falling back to `default` when absent.
    pub fn bool_or(&self, parameter: &str, default: bool) -> Result<bool, LookupError> {
        match self.get(parameter) {
            None => Ok(default),
            Some(value) => value
                .as_bool()
                .ok_or_else(|| self.wrong_type(parameter, TypeTag::Bool, value)),
        }
    }

    /// String parameter, falling back to `default` when absent.
    pub fn str_or<'a>(&'a self, parameter: &str, default: &'a str) -> Result<&'a str, LookupError> {
        match self.get(parameter) {
            None => Ok(default),
            Some(value) => value
                .as_str()
                .ok_or_else(|| self.wrong_type(parameter, TypeTag::String, value)),
        }
    }
}

impl Serialize for ModuleOptions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

// ---------------------------------------------------------------------------
// ParameterStore – module → parameter → value
// ---------------------------------------------------------------------------

/// Validated two-level parameter namespace.
///
/// Modules and parameters keep the order in which they were first defined.
/// Only the parser inserts; everything downstream reads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterStore {
    modules: Vec<ModuleOptions>,
}

impl ParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn module(&self, name: &str) -> Option<&ModuleOptions> {
        self.modules.iter().find(|m| m.name == name)
    }

    /// Options of `name`, or an empty view if the module was never defined.
    pub fn module_or_empty(&self, name: &str) -> ModuleOptions {
        self.module(name)
            .cloned()
            .unwrap_or_else(|| ModuleOptions::empty(name))
    }

    pub fn get(&self, module: &str, parameter: &str) -> Option<&OptionValue> {
        self.module(module).and_then(|m| m.get(parameter))
    }

    pub fn contains(&self, module: &str, parameter: &str) -> bool {
        self.get(module, parameter).is_some()
    }

    pub fn modules(&self) -> impl Iterator<Item = &ModuleOptions> {
        self.modules.iter()
    }

    /// Total number of stored parameters across all modules.
    pub fn len(&self) -> usize {
        self.modules.iter().map(ModuleOptions::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert a value unless the key already exists. Returns `false` (and
    /// leaves the first value in place) for a duplicate.
    pub(crate) fn insert(&mut self, module: &str, parameter: &str, value: OptionValue) -> bool {
        if self.contains(module, parameter) {
            return false;
        }
        let idx = match self.modules.iter().position(|m| m.name == module) {
            Some(idx) => idx,
            None => {
                self.modules.push(ModuleOptions::new(module));
                self.modules.len() - 1
            }
        };
        self.modules[idx]
            .entries
            .push((parameter.to_string(), value));
        true
    }
}

impl Serialize for ParameterStore {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.modules.len()))?;
        for module in &self.modules {
            map.serialize_entry(&module.name, module)?;
        }
        map.end()
    }
}
