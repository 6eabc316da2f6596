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

//! Core data model: field schemas, handler results and wire metadata.

use crate::engine_core::constants::dispatch;
use crate::engine_core::outcome::Outcome;
use crate::engine_core::value::{Map, Value};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Custom validator: `(value, field) -> accepted`.
pub type ValidFn = Arc<dyn Fn(&Value, &FieldSchema) -> bool + Send + Sync>;
/// Custom value transform applied after validation.
pub type ValueFn = Arc<dyn Fn(Value, &FieldSchema) -> Value + Send + Sync>;

/// Default for an absent field.
#[derive(Clone)]
pub enum DefaultValue {
    Value(Value),
    Factory(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl DefaultValue {
    pub fn materialize(&self) -> Value {
        match self {
            DefaultValue::Value(v) => v.clone(),
            DefaultValue::Factory(f) => f(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Value(v) => f.debug_tuple("Value").field(v).finish(),
            DefaultValue::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

/// Declaration of one field.
#[derive(Clone, Default)]
pub struct FieldSchema {
    pub type_name: String,
    pub required: bool,
    pub nullable: bool,
    pub default: Option<DefaultValue>,
    pub children: Option<Schema>,
    /// Allowed values for `enum` fields, keyed by value with a label.
    pub options: Map,
    pub encode: Option<String>,
    pub decode: Option<String>,
    pub empty: Option<Outcome>,
    pub error: Option<Outcome>,
    pub valid: Option<ValidFn>,
    pub value: Option<ValueFn>,
    pub settings: Map,
    pub name: String,
    pub text: String,
}

impl FieldSchema {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            ..Default::default()
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultValue::Value(value.into()));
        self
    }

    pub fn default_with<F, T>(mut self, factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
        T: Into<Value>,
    {
        self.default = Some(DefaultValue::Factory(Arc::new(move || factory().into())));
        self
    }

    pub fn children(mut self, schema: Schema) -> Self {
        self.children = Some(schema);
        self
    }

    pub fn option(mut self, key: impl Into<String>, label: impl Into<Value>) -> Self {
        self.options.insert(key.into(), label.into());
        self
    }

    pub fn encode(mut self, codec: impl Into<String>) -> Self {
        self.encode = Some(codec.into());
        self
    }

    pub fn decode(mut self, codec: impl Into<String>) -> Self {
        self.decode = Some(codec.into());
        self
    }

    pub fn on_empty(mut self, outcome: Outcome) -> Self {
        self.empty = Some(outcome);
        self
    }

    pub fn on_error(mut self, outcome: Outcome) -> Self {
        self.error = Some(outcome);
        self
    }

    pub fn validator<F>(mut self, valid: F) -> Self
    where
        F: Fn(&Value, &FieldSchema) -> bool + Send + Sync + 'static,
    {
        self.valid = Some(Arc::new(valid));
        self
    }

    pub fn transform<F>(mut self, value: F) -> Self
    where
        F: Fn(Value, &FieldSchema) -> Value + Send + Sync + 'static,
    {
        self.value = Some(Arc::new(value));
        self
    }

    pub fn setting(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    pub fn label(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn describe(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Introspection view used for external documentation.
    pub fn to_json(&self) -> serde_json::Value {
        let mut doc = serde_json::json!({
            "type": self.type_name,
            "required": self.required,
            "nullable": self.nullable,
        });
        if let Some(obj) = doc.as_object_mut() {
            if !self.name.is_empty() {
                obj.insert("name".into(), self.name.clone().into());
            }
            if !self.text.is_empty() {
                obj.insert("text".into(), self.text.clone().into());
            }
            if let Some(DefaultValue::Value(v)) = &self.default {
                obj.insert("default".into(), v.to_json());
            }
            if !self.options.is_empty() {
                obj.insert("options".into(), Value::Map(self.options.clone()).to_json());
            }
            if let Some(children) = &self.children {
                obj.insert("children".into(), children.to_json());
            }
        }
        doc
    }
}

impl fmt::Debug for FieldSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSchema")
            .field("type_name", &self.type_name)
            .field("required", &self.required)
            .field("nullable", &self.nullable)
            .field("default", &self.default)
            .field("children", &self.children)
            .field("encode", &self.encode)
            .field("decode", &self.decode)
            .finish_non_exhaustive()
    }
}

/// Named field declarations, kept in registration order.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<(String, FieldSchema)>,
}

/// Schema edits: `Some` adds or replaces a field, `None` removes it.
pub type SchemaPatch = Vec<(String, Option<FieldSchema>)>;

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, field: FieldSchema) -> Self {
        self.insert(name, field);
        self
    }

    /// Insert or replace; names stay unique.
    pub fn insert(&mut self, name: impl Into<String>, field: FieldSchema) {
        let name = name.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = field,
            None => self.fields.push((name, field)),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldSchema> {
        let idx = self.fields.iter().position(|(n, _)| n == name)?;
        Some(self.fields.remove(idx).1)
    }

    pub fn get(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, f)| f)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldSchema)> {
        self.fields.iter().map(|(n, f)| (n.as_str(), f))
    }

    pub fn names(&self) -> Vec<&str> {
        self.fields.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn apply(&mut self, patch: &SchemaPatch) {
        for (name, field) in patch {
            match field {
                Some(field) => self.insert(name.clone(), field.clone()),
                None => {
                    self.remove(name);
                }
            }
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.fields
                .iter()
                .map(|(n, f)| (n.clone(), f.to_json()))
                .collect(),
        )
    }
}

/// Discriminator for normalised handler output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeTag {
    #[default]
    Plain,
    List,
    Count,
    Paged,
    Dual,
}

impl ShapeTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShapeTag::Plain => dispatch::SHAPE_PLAIN,
            ShapeTag::List => dispatch::SHAPE_LIST,
            ShapeTag::Count => dispatch::SHAPE_COUNT,
            ShapeTag::Paged => dispatch::SHAPE_PAGED,
            ShapeTag::Dual => dispatch::SHAPE_DUAL,
        }
    }

    pub fn parse_safe(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "list" => ShapeTag::List,
            "count" => ShapeTag::Count,
            "paged" => ShapeTag::Paged,
            "dual" => ShapeTag::Dual,
            _ => ShapeTag::Plain,
        }
    }
}

impl fmt::Display for ShapeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a handler produced.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerResult {
    Empty,
    Record(Map),
    List(Vec<Map>),
    Count(f64),
    Paged { count: i64, items: Vec<Map> },
    Dual { item: Map, items: Vec<Map> },
}

impl HandlerResult {
    /// Canonical `(data, shape)` form.
    pub fn normalize(self) -> (Map, ShapeTag) {
        let mut data = Map::new();
        let shape = match self {
            HandlerResult::Empty => ShapeTag::Plain,
            HandlerResult::Record(record) => {
                data = record;
                ShapeTag::Plain
            }
            HandlerResult::List(items) => {
                data.insert(dispatch::KEY_ITEMS.into(), items.into());
                ShapeTag::List
            }
            HandlerResult::Count(n) => {
                data.insert(dispatch::KEY_COUNT.into(), Value::Float(n));
                ShapeTag::Count
            }
            HandlerResult::Paged { count, items } => {
                data.insert(dispatch::KEY_COUNT.into(), Value::Int(count));
                data.insert(dispatch::KEY_ITEMS.into(), items.into());
                ShapeTag::Paged
            }
            HandlerResult::Dual { item, items } => {
                data.insert(dispatch::KEY_ITEM.into(), Value::Map(item));
                data.insert(dispatch::KEY_ITEMS.into(), items.into());
                ShapeTag::Dual
            }
        };
        (data, shape)
    }
}

/// A handler's answer: a result shape plus an outcome (ok unless set).
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub result: HandlerResult,
    pub outcome: Outcome,
}

impl Reply {
    pub fn ok() -> Self {
        Self {
            result: HandlerResult::Empty,
            outcome: Outcome::OK,
        }
    }

    pub fn with_outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = outcome;
        self
    }
}

impl From<HandlerResult> for Reply {
    fn from(result: HandlerResult) -> Self {
        Self {
            result,
            outcome: Outcome::OK,
        }
    }
}

impl From<Outcome> for Reply {
    fn from(outcome: Outcome) -> Self {
        Self {
            result: HandlerResult::Empty,
            outcome,
        }
    }
}

impl From<()> for Reply {
    fn from(_: ()) -> Self {
        Reply::ok()
    }
}

impl From<bool> for Reply {
    fn from(ok: bool) -> Self {
        if ok {
            Reply::ok()
        } else {
            Outcome::FAIL.into()
        }
    }
}

impl From<Map> for Reply {
    fn from(record: Map) -> Self {
        HandlerResult::Record(record).into()
    }
}

impl From<Vec<Map>> for Reply {
    fn from(items: Vec<Map>) -> Self {
        HandlerResult::List(items).into()
    }
}

impl From<i64> for Reply {
    fn from(count: i64) -> Self {
        HandlerResult::Count(count as f64).into()
    }
}

impl From<f64> for Reply {
    fn from(count: f64) -> Self {
        HandlerResult::Count(count).into()
    }
}

impl From<(Vec<Map>, i64)> for Reply {
    fn from((items, count): (Vec<Map>, i64)) -> Self {
        HandlerResult::Paged { count, items }.into()
    }
}

impl From<(i64, Vec<Map>)> for Reply {
    fn from((count, items): (i64, Vec<Map>)) -> Self {
        HandlerResult::Paged { count, items }.into()
    }
}

impl From<(Map, Vec<Map>)> for Reply {
    fn from((item, items): (Map, Vec<Map>)) -> Self {
        HandlerResult::Dual { item, items }.into()
    }
}

macro_rules! reply_with_outcome {
    ($($t:ty),* $(,)?) => {
        $(impl From<($t, Outcome)> for Reply {
            fn from((result, outcome): ($t, Outcome)) -> Self {
                Reply::from(result).with_outcome(outcome)
            }
        })*
    };
}

reply_with_outcome!(HandlerResult, Map, Vec<Map>, i64, f64, (Map, Vec<Map>));

impl From<(Vec<Map>, i64, Outcome)> for Reply {
    fn from((items, count, outcome): (Vec<Map>, i64, Outcome)) -> Self {
        Reply::from((items, count)).with_outcome(outcome)
    }
}

impl From<(i64, Vec<Map>, Outcome)> for Reply {
    fn from((count, items, outcome): (i64, Vec<Map>, Outcome)) -> Self {
        Reply::from((count, items)).with_outcome(outcome)
    }
}

impl From<(Map, Vec<Map>, Outcome)> for Reply {
    fn from((item, items, outcome): (Map, Vec<Map>, Outcome)) -> Self {
        Reply::from((item, items)).with_outcome(outcome)
    }
}

/// Call metadata carried to a remote node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub name: String,
    #[serde(default)]
    pub payload: Map,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default, rename = "final")]
    pub final_attempt: bool,
    #[serde(default)]
    pub locale: String,
    /// Offset from UTC in seconds; 0 means the node's local zone
    #[serde(default)]
    pub timezone: i32,
    #[serde(default)]
    pub token: String,
}

/// A remote node's answer.
#[derive(Debug, Clone, Default)]
pub struct Echo {
    pub code: i32,
    pub text: String,
    /// Output schema for the items of list shaped data
    pub schema: Option<Schema>,
    pub raw: Vec<u8>,
    pub shape: ShapeTag,
    pub data: Option<Map>,
}

impl Echo {
    pub fn new(outcome: &Outcome, shape: ShapeTag, data: Map) -> Self {
        Self {
            code: outcome.code(),
            text: outcome.state().to_string(),
            shape,
            data: Some(data),
            ..Default::default()
        }
    }

    pub fn outcome(&self) -> Outcome {
        Outcome::new(self.code, self.text.clone())
    }
}

/// Log levels understood by a [`LogSink`](crate::engine_core::traits::LogSink).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Console,
    Trace,
    Debug,
    Info,
    Notice,
    Warning,
    Error,
    Panic,
    Fatal,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64) -> Map {
        let mut m = Map::new();
        m.insert("id".into(), id.into());
        m
    }

    #[test]
    fn test_paged_order_is_irrelevant() {
        let a: Reply = (vec![record(1)], 10i64).into();
        let b: Reply = (10i64, vec![record(1)]).into();
        assert_eq!(a.clone().result.normalize(), b.result.normalize());
        let (data, shape) = a.result.normalize();
        assert_eq!(shape, ShapeTag::Paged);
        assert_eq!(data["count"], Value::Int(10));
    }

    #[test]
    fn test_every_shape_takes_an_outcome() {
        let reply: Reply = (record(1), Outcome::RETRY).into();
        assert_eq!(reply.outcome, Outcome::RETRY);
        assert_eq!(reply.result, HandlerResult::Record(record(1)));

        let reply: Reply = (vec![record(1)], Outcome::FAIL).into();
        assert_eq!(reply.result.normalize().1, ShapeTag::List);
        assert_eq!(reply.outcome, Outcome::FAIL);

        let a: Reply = (vec![record(1)], 4i64, Outcome::NOTHING).into();
        let b: Reply = (4i64, vec![record(1)], Outcome::NOTHING).into();
        assert_eq!(a, b);
        assert_eq!(a.result.normalize().1, ShapeTag::Paged);

        let reply: Reply = (record(1), vec![record(2)], Outcome::INVALID).into();
        assert_eq!(reply.result.normalize().1, ShapeTag::Dual);
        assert!(reply.outcome.is(&Outcome::INVALID));

        let reply: Reply = (3i64, Outcome::OK).into();
        assert_eq!(reply.result, HandlerResult::Count(3.0));
    }

    #[test]
    fn test_normalize_shapes() {
        assert_eq!(HandlerResult::Empty.normalize(), (Map::new(), ShapeTag::Plain));
        let (data, shape) = HandlerResult::Count(3.0).normalize();
        assert_eq!(shape, ShapeTag::Count);
        assert_eq!(data["count"], Value::Float(3.0));
        let (data, shape) = HandlerResult::Dual {
            item: record(1),
            items: vec![record(2)],
        }
        .normalize();
        assert_eq!(shape, ShapeTag::Dual);
        assert!(data["item"].as_map().is_some());
        assert_eq!(data["items"].as_list().map(|l| l.len()), Some(1));
    }

    #[test]
    fn test_schema_insert_replaces_in_place() {
        let mut schema = Schema::new()
            .field("a", FieldSchema::new("int"))
            .field("b", FieldSchema::new("string"));
        schema.insert("a", FieldSchema::new("float"));
        assert_eq!(schema.names(), vec!["a", "b"]);
        assert_eq!(schema.get("a").map(|f| f.type_name.as_str()), Some("float"));

        schema.apply(&vec![("b".to_string(), None), ("c".to_string(), Some(FieldSchema::new("bool")))]);
        assert_eq!(schema.names(), vec!["a", "c"]);
    }

    #[test]
    fn test_bool_reply() {
        assert_eq!(Reply::from(false).outcome, Outcome::FAIL);
        assert!(Reply::from(true).outcome.is_ok());
    }
}
