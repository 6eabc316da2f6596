// Copyright 2026 BadCompany
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Type registry.
//!
//! A type supplies a validator and a value transform for the mapping engine.
//! A field whose type has no registered validator falls back to matching its
//! stringified value against the regular-expression set named like the type.

use crate::engine_core::errors::KernelError;
use crate::engine_core::models::{FieldSchema, ValidFn, ValueFn};
use crate::engine_core::policy::OverridePolicy;
use crate::engine_core::value::{Map, Value};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use parking_lot::RwLock;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone)]
pub struct TypeDef {
    pub name: String,
    pub aliases: Vec<String>,
    pub valid: Option<ValidFn>,
    pub value: Option<ValueFn>,
}

impl TypeDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            valid: None,
            value: None,
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn valid<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value, &FieldSchema) -> bool + Send + Sync + 'static,
    {
        self.valid = Some(Arc::new(f));
        self
    }

    pub fn value<F>(mut self, f: F) -> Self
    where
        F: Fn(Value, &FieldSchema) -> Value + Send + Sync + 'static,
    {
        self.value = Some(Arc::new(f));
        self
    }
}

pub struct TypeRegistry {
    types: RwLock<HashMap<String, Arc<TypeDef>>>,
    regulars: RwLock<HashMap<String, Vec<Regex>>>,
    policy: Arc<OverridePolicy>,
}

impl TypeRegistry {
    pub fn new(policy: Arc<OverridePolicy>) -> Self {
        Self {
            types: RwLock::new(HashMap::new()),
            regulars: RwLock::new(HashMap::new()),
            policy,
        }
    }

    /// Registry with the built-in scalar, list, time and enum types.
    pub fn with_builtins(policy: Arc<OverridePolicy>) -> Result<Self, KernelError> {
        let registry = Self::new(policy);
        builtin_types(&registry);
        for (name, patterns) in BUILTIN_REGULARS {
            registry.regular(name, patterns)?;
        }
        Ok(registry)
    }

    pub fn register(&self, def: TypeDef) {
        let def = Arc::new(def);
        let mut types = self.types.write();
        for key in std::iter::once(&def.name).chain(def.aliases.iter()) {
            if self.policy.admit("type", key, types.contains_key(key)) {
                types.insert(key.clone(), Arc::clone(&def));
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<TypeDef>> {
        self.types.read().get(name).cloned()
    }

    /// Register a named set of regular expressions.
    pub fn regular(&self, name: &str, patterns: &[&str]) -> Result<(), KernelError> {
        let compiled = patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| KernelError::ConfigurationError(format!("regular '{}': {}", name, e)))?;
        let mut regulars = self.regulars.write();
        if self.policy.admit("regular", name, regulars.contains_key(name)) {
            regulars.insert(name.to_string(), compiled);
        }
        Ok(())
    }

    /// True when any expression of the set matches. Unknown sets never match.
    pub fn matches(&self, name: &str, text: &str) -> bool {
        self.regulars
            .read()
            .get(name)
            .map(|set| set.iter().any(|re| re.is_match(text)))
            .unwrap_or(false)
    }

    /// Field override first, then the type's validator, then the regular set.
    pub fn validate(&self, field: &FieldSchema, value: &Value) -> bool {
        if let Some(valid) = &field.valid {
            return valid(value, field);
        }
        match self.get(&field.type_name).and_then(|t| t.valid.clone()) {
            Some(valid) => valid(value, field),
            None => self.matches(&field.type_name, &value.to_string()),
        }
    }

    /// Field override first, then the type's transform, else stringify.
    pub fn transform(&self, field: &FieldSchema, value: Value) -> Value {
        if let Some(transform) = &field.value {
            return transform(value, field);
        }
        match self.get(&field.type_name).and_then(|t| t.value.clone()) {
            Some(transform) => transform(value, field),
            None => Value::Str(value.to_string()),
        }
    }
}

const BUILTIN_REGULARS: &[(&str, &[&str])] = &[
    ("email", &[r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)+$"]),
    ("mobile", &[r"^\+?[1-9]\d{6,14}$"]),
    ("url", &[r"^https?://\S+$"]),
    ("digits", &[r"^\d+$"]),
    ("alpha", &[r"^[A-Za-z]+$"]),
    ("key", &[r"^[A-Za-z0-9_\-]+$"]),
];

/// Parse a timestamp from a time, unix seconds or common text forms.
pub fn parse_time(value: &Value) -> Option<DateTime<FixedOffset>> {
    match value {
        Value::Time(t) => Some(*t),
        Value::Int(_) | Value::UInt(_) => value
            .as_i64()
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .map(|t| t.fixed_offset()),
        Value::Str(s) => {
            let s = s.trim();
            DateTime::parse_from_rfc3339(s)
                .ok()
                .or_else(|| {
                    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                        .ok()
                        .map(|n| n.and_utc().fixed_offset())
                })
                .or_else(|| {
                    NaiveDate::parse_from_str(s, "%Y-%m-%d")
                        .ok()
                        .and_then(|d| d.and_hms_opt(0, 0, 0))
                        .map(|n| n.and_utc().fixed_offset())
                })
        }
        _ => None,
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Null | Value::List(_) | Value::Map(_))
}

/// Elements of a list value, or of a comma separated string.
fn elements(value: &Value) -> Option<Vec<Value>> {
    match value {
        Value::List(items) => Some(items.clone()),
        Value::Str(s) if s.trim().is_empty() => Some(Vec::new()),
        Value::Str(s) => Some(s.split(',').map(|p| Value::from(p.trim())).collect()),
        _ => None,
    }
}

fn parse_record(value: &Value) -> Option<Map> {
    match value {
        Value::Map(m) => Some(m.clone()),
        Value::Str(s) => serde_json::from_str::<serde_json::Value>(s)
            .ok()
            .and_then(|j| Value::from_json(j).into_map()),
        _ => None,
    }
}

fn parse_records(value: &Value) -> Option<Vec<Value>> {
    match value {
        Value::List(items) => items
            .iter()
            .map(|v| parse_record(v).map(Value::Map))
            .collect(),
        Value::Map(m) => Some(vec![Value::Map(m.clone())]),
        Value::Str(s) => match serde_json::from_str::<serde_json::Value>(s).ok()? {
            serde_json::Value::Array(items) => items
                .into_iter()
                .map(|j| Value::from_json(j).into_map().map(Value::Map))
                .collect(),
            serde_json::Value::Object(_) => parse_record(value).map(|m| vec![Value::Map(m)]),
            _ => None,
        },
        _ => None,
    }
}

fn list_of<F>(value: &Value, each: F) -> Option<Vec<Value>>
where
    F: Fn(&Value) -> Option<Value>,
{
    elements(value)?.iter().map(each).collect()
}

fn builtin_types(registry: &TypeRegistry) {
    registry.register(TypeDef::new("any").valid(|_, _| true).value(|v, _| v));

    registry.register(
        TypeDef::new("string")
            .alias("str")
            .valid(|v, _| is_scalar(v))
            .value(|v, _| match v {
                Value::Str(_) => v,
                other => Value::Str(other.to_string()),
            }),
    );

    registry.register(
        TypeDef::new("int")
            .alias("integer")
            .valid(|v, _| v.as_i64().is_some())
            .value(|v, _| v.as_i64().map(Value::Int).unwrap_or(v)),
    );

    registry.register(
        TypeDef::new("uint")
            .valid(|v, _| v.as_u64().is_some())
            .value(|v, _| v.as_u64().map(Value::UInt).unwrap_or(v)),
    );

    registry.register(
        TypeDef::new("float")
            .alias("number")
            .valid(|v, _| v.as_f64().is_some())
            .value(|v, _| v.as_f64().map(Value::Float).unwrap_or(v)),
    );

    registry.register(
        TypeDef::new("bool")
            .alias("boolean")
            .valid(|v, _| v.as_bool().is_some())
            .value(|v, _| v.as_bool().map(Value::Bool).unwrap_or(v)),
    );

    registry.register(
        TypeDef::new("json")
            .alias("map")
            .valid(|v, _| parse_record(v).is_some())
            .value(|v, _| parse_record(&v).map(Value::Map).unwrap_or(v)),
    );

    registry.register(
        TypeDef::new("[json]")
            .alias("[map]")
            .valid(|v, _| parse_records(v).is_some())
            .value(|v, _| parse_records(&v).map(Value::List).unwrap_or(v)),
    );

    registry.register(
        TypeDef::new("[string]")
            .alias("[str]")
            .valid(|v, _| list_of(v, |e| is_scalar(e).then(|| Value::Str(e.to_string()))).is_some())
            .value(|v, _| {
                list_of(&v, |e| is_scalar(e).then(|| Value::Str(e.to_string())))
                    .map(Value::List)
                    .unwrap_or(v)
            }),
    );

    registry.register(
        TypeDef::new("[int]")
            .alias("[integer]")
            .valid(|v, _| list_of(v, |e| e.as_i64().map(Value::Int)).is_some())
            .value(|v, _| {
                list_of(&v, |e| e.as_i64().map(Value::Int))
                    .map(Value::List)
                    .unwrap_or(v)
            }),
    );

    registry.register(
        TypeDef::new("[float]")
            .alias("[number]")
            .valid(|v, _| list_of(v, |e| e.as_f64().map(Value::Float)).is_some())
            .value(|v, _| {
                list_of(&v, |e| e.as_f64().map(Value::Float))
                    .map(Value::List)
                    .unwrap_or(v)
            }),
    );

    registry.register(
        TypeDef::new("datetime")
            .alias("timestamp")
            .alias("date")
            .valid(|v, _| parse_time(v).is_some())
            .value(|v, _| parse_time(&v).map(Value::Time).unwrap_or(v)),
    );

    registry.register(
        TypeDef::new("[datetime]")
            .alias("[timestamp]")
            .valid(|v, _| list_of(v, |e| parse_time(e).map(Value::Time)).is_some())
            .value(|v, _| {
                list_of(&v, |e| parse_time(e).map(Value::Time))
                    .map(Value::List)
                    .unwrap_or(v)
            }),
    );

    registry.register(
        TypeDef::new("enum")
            .valid(|v, field| is_scalar(v) && field.options.contains_key(&v.to_string()))
            .value(|v, _| Value::Str(v.to_string())),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> TypeRegistry {
        TypeRegistry::with_builtins(Arc::new(OverridePolicy::default())).unwrap()
    }

    fn check(registry: &TypeRegistry, type_name: &str, value: Value) -> Option<Value> {
        let field = FieldSchema::new(type_name);
        registry
            .validate(&field, &value)
            .then(|| registry.transform(&field, value))
    }

    #[test]
    fn test_scalar_types() {
        let reg = registry();
        assert_eq!(check(&reg, "int", Value::from("12")), Some(Value::Int(12)));
        assert_eq!(check(&reg, "int", Value::from("x")), None);
        assert_eq!(check(&reg, "integer", Value::Float(4.0)), Some(Value::Int(4)));
        assert_eq!(check(&reg, "float", Value::Int(2)), Some(Value::Float(2.0)));
        assert_eq!(check(&reg, "bool", Value::from("no")), Some(Value::Bool(false)));
        assert_eq!(check(&reg, "string", Value::Int(5)), Some(Value::from("5")));
        assert_eq!(check(&reg, "string", Value::list([1])), None);
        assert_eq!(check(&reg, "uint", Value::Int(-3)), None);
    }

    #[test]
    fn test_list_types() {
        let reg = registry();
        assert_eq!(
            check(&reg, "[int]", Value::from("1, 2,3")),
            Some(Value::list([1i64, 2, 3]))
        );
        assert_eq!(check(&reg, "[int]", Value::list(["1", "x"])), None);
        let records = check(&reg, "[json]", Value::from(r#"[{"a":1}]"#)).unwrap();
        assert_eq!(records.as_list().map(|l| l.len()), Some(1));
        assert_eq!(check(&reg, "[json]", Value::list([1])), None);
    }

    #[test]
    fn test_datetime_forms() {
        let reg = registry();
        for raw in ["2024-02-03T04:05:06Z", "2024-02-03 04:05:06"] {
            let t = check(&reg, "datetime", Value::from(raw)).unwrap();
            assert_eq!(t.as_time().map(|t| t.timestamp()), Some(1_706_933_106));
        }
        assert!(check(&reg, "date", Value::from("2024-02-03")).is_some());
        assert!(check(&reg, "datetime", Value::from("yesterday")).is_none());
    }

    #[test]
    fn test_enum_uses_field_options() {
        let reg = registry();
        let field = FieldSchema::new("enum").option("red", "Red").option("blue", "Blue");
        assert!(reg.validate(&field, &Value::from("red")));
        assert!(!reg.validate(&field, &Value::from("green")));
    }

    #[test]
    fn test_unknown_type_falls_back_to_regulars() {
        let reg = registry();
        let field = FieldSchema::new("email");
        assert!(reg.validate(&field, &Value::from("ada@example.com")));
        assert!(!reg.validate(&field, &Value::from("not-an-email")));
        assert_eq!(reg.transform(&field, Value::Int(1)), Value::from("1"));
        assert!(!reg.validate(&FieldSchema::new("mystery"), &Value::from("x")));
    }

    #[test]
    fn test_field_override_wins() {
        let reg = registry();
        let field = FieldSchema::new("int")
            .validator(|v, _| v.as_i64().map(|n| n % 2 == 0).unwrap_or(false))
            .transform(|v, _| Value::Int(v.as_i64().unwrap_or(0) * 10));
        assert!(!reg.validate(&field, &Value::Int(3)));
        assert!(reg.validate(&field, &Value::Int(4)));
        assert_eq!(reg.transform(&field, Value::Int(4)), Value::Int(40));
    }

    #[test]
    fn test_strict_types_keep_first() {
        let reg = TypeRegistry::with_builtins(Arc::new(OverridePolicy::new(false))).unwrap();
        reg.register(TypeDef::new("int").valid(|_, _| false));
        assert!(reg.validate(&FieldSchema::new("int"), &Value::Int(1)));
    }

    #[test]
    fn test_bad_regular_is_configuration_error() {
        let reg = registry();
        assert!(matches!(
            reg.regular("broken", &["("]),
            Err(KernelError::ConfigurationError(_))
        ));
    }
}
