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

//! Field mapping and validation.
//!
//! [`Mapper::bind`] walks a schema in declaration order and produces a
//! validated, coerced record. It is fail-fast: the first offending field
//! decides the outcome and nothing is returned alongside a failure. Tolerant
//! mode drops offending fields instead of failing.

use crate::codec::registry::CodecRegistry;
use crate::engine::types::TypeRegistry;
use crate::engine_core::models::{FieldSchema, Schema};
use crate::engine_core::outcome::Outcome;
use crate::engine_core::value::{Map, Value};
use chrono::{FixedOffset, Offset, Utc};
use std::sync::Arc;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy)]
pub struct BindOptions {
    /// Input is a partial update: no emptiness checks, no defaults, and a
    /// present-but-empty key binds to an explicit null.
    pub partial: bool,
    /// Drop offending fields instead of failing.
    pub tolerant: bool,
    /// Zone timestamps are normalised into.
    pub timezone: FixedOffset,
}

impl Default for BindOptions {
    fn default() -> Self {
        Self {
            partial: false,
            tolerant: false,
            timezone: Utc.fix(),
        }
    }
}

impl BindOptions {
    pub fn partial(mut self, partial: bool) -> Self {
        self.partial = partial;
        self
    }

    pub fn tolerant(mut self, tolerant: bool) -> Self {
        self.tolerant = tolerant;
        self
    }

    pub fn timezone(mut self, timezone: FixedOffset) -> Self {
        self.timezone = timezone;
        self
    }
}

/// Where a field's value came from before the shared tail of the pipeline.
enum Source {
    /// Validated (or defaulted) value, possibly decoded
    Bound { value: Value, decoded: bool },
    /// Required structure with no input: empty record, children not visited
    EmptyRecord,
}

pub struct Mapper {
    types: Arc<TypeRegistry>,
    codecs: Arc<CodecRegistry>,
}

impl Mapper {
    pub fn new(types: Arc<TypeRegistry>, codecs: Arc<CodecRegistry>) -> Self {
        Self { types, codecs }
    }

    pub fn types(&self) -> &Arc<TypeRegistry> {
        &self.types
    }

    pub fn codecs(&self) -> &Arc<CodecRegistry> {
        &self.codecs
    }

    pub fn bind(&self, schema: &Schema, input: &Map, options: &BindOptions) -> Result<Map, Outcome> {
        let mut output = Map::new();
        for (name, field) in schema.iter() {
            if let Some(value) = self.bind_field(name, field, input, options)? {
                output.insert(name.to_string(), value);
            }
        }
        Ok(output)
    }

    fn bind_field(
        &self,
        name: &str,
        field: &FieldSchema,
        input: &Map,
        options: &BindOptions,
    ) -> Result<Option<Value>, Outcome> {
        let present = input.contains_key(name);
        let raw = input
            .get(name)
            .filter(|v| !v.is_blank() && (field.required || !v.is_empty_map()));

        let source = match raw {
            Some(raw) => match self.accept(name, field, raw.clone(), options)? {
                Some(source) => source,
                None => return Ok(None),
            },
            None => {
                if field.required
                    && !field.nullable
                    && field.default.is_none()
                    && field.children.is_none()
                    && !options.partial
                {
                    if options.tolerant {
                        trace!("Dropping empty field '{}'", name);
                        return Ok(None);
                    }
                    return Err(field
                        .empty
                        .clone()
                        .unwrap_or_else(|| Outcome::VAR_EMPTY.with([label(name, field)])));
                }
                match (&field.default, options.partial) {
                    (Some(default), false) => {
                        let value = default.materialize();
                        let value = if field.type_name.is_empty() {
                            value
                        } else {
                            self.types.transform(field, value)
                        };
                        Source::Bound {
                            value,
                            decoded: false,
                        }
                    }
                    _ if options.partial && present => return Ok(Some(Value::Null)),
                    _ if field.nullable || options.partial => return Ok(None),
                    _ if field.required => Source::EmptyRecord,
                    _ => return Ok(Some(Value::Null)),
                }
            }
        };

        let (mut value, decoded) = match source {
            Source::EmptyRecord => (Value::Map(Map::new()), false),
            Source::Bound { value, decoded } => {
                let value = match &field.children {
                    Some(children) if !value.is_null() => {
                        match self.bind_children(name, field, children, value, options)? {
                            Some(value) => value,
                            None => return Ok(None),
                        }
                    }
                    _ => value,
                };
                (value, decoded)
            }
        };

        if let Some(codec) = &field.encode {
            if !decoded && !value.is_null() {
                match self.codecs.encrypt(codec, &value) {
                    Ok(text) => value = Value::Str(text),
                    Err(e) => debug!("Field '{}' not encoded with '{}': {}", name, codec, e),
                }
            }
        }
        Ok(Some(value))
    }

    /// Decode, validate and transform a present value. `None` means the
    /// field was dropped in tolerant mode.
    fn accept(
        &self,
        name: &str,
        field: &FieldSchema,
        mut value: Value,
        options: &BindOptions,
    ) -> Result<Option<Source>, Outcome> {
        let mut decoded = false;
        if let Some(codec) = &field.decode {
            match self.codecs.decrypt(codec, &value.to_string()) {
                Ok(plain) => {
                    value = plain;
                    decoded = true;
                }
                // Left as-is; a misconfigured codec pairing passes through.
                Err(e) => debug!("Field '{}' not decoded with '{}': {}", name, codec, e),
            }
        }

        if !field.type_name.is_empty() {
            if !self.types.validate(field, &value) {
                if options.tolerant {
                    trace!("Dropping invalid field '{}'", name);
                    return Ok(None);
                }
                return Err(field
                    .error
                    .clone()
                    .unwrap_or_else(|| Outcome::VAR_ERROR.with([label(name, field)])));
            }
            let localized = localize(value, options.timezone);
            value = localize(self.types.transform(field, localized), options.timezone);
        }
        Ok(Some(Source::Bound { value, decoded }))
    }

    fn bind_children(
        &self,
        name: &str,
        field: &FieldSchema,
        children: &Schema,
        value: Value,
        options: &BindOptions,
    ) -> Result<Option<Value>, Outcome> {
        match value {
            Value::Map(record) => Ok(Some(Value::Map(self.bind(children, &record, options)?))),
            Value::List(items) => {
                let mut bound = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::Map(record) => bound.push(Value::Map(self.bind(children, &record, options)?)),
                        _ if options.tolerant => {
                            trace!("Dropping field '{}' with a non-record element", name);
                            return Ok(None);
                        }
                        _ => {
                            return Err(field
                                .error
                                .clone()
                                .unwrap_or_else(|| Outcome::VAR_ERROR.with([label(name, field)])))
                        }
                    }
                }
                Ok(Some(Value::List(bound)))
            }
            _ => Ok(Some(Value::Map(Map::new()))),
        }
    }
}

fn label<'a>(name: &'a str, field: &'a FieldSchema) -> &'a str {
    if field.name.is_empty() {
        name
    } else {
        &field.name
    }
}

/// Move timestamps (or lists of them) into `tz`.
fn localize(value: Value, tz: FixedOffset) -> Value {
    match value {
        Value::Time(t) => Value::Time(t.with_timezone(&tz)),
        Value::List(items) if items.iter().any(|v| matches!(v, Value::Time(_))) => Value::List(
            items
                .into_iter()
                .map(|v| match v {
                    Value::Time(t) => Value::Time(t.with_timezone(&tz)),
                    other => other,
                })
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CodecConfig;
    use crate::engine_core::policy::OverridePolicy;
    use serde_json::json;

    fn mapper() -> Mapper {
        let policy = Arc::new(OverridePolicy::default());
        Mapper::new(
            Arc::new(TypeRegistry::with_builtins(policy.clone()).unwrap()),
            Arc::new(CodecRegistry::with_builtins(&CodecConfig::default(), 1, policy).unwrap()),
        )
    }

    fn input(v: serde_json::Value) -> Map {
        crate::engine_core::value::map_from_json(v)
    }

    #[test]
    fn test_required_missing_fails() {
        let schema = Schema::new().field("age", FieldSchema::new("int").required());
        let err = mapper().bind(&schema, &Map::new(), &BindOptions::default()).unwrap_err();
        assert!(err.is(&Outcome::VAR_EMPTY));
        assert_eq!(err.args(), &[Value::from("age")]);
    }

    #[test]
    fn test_required_with_default() {
        let schema =
            Schema::new().field("age", FieldSchema::new("int").required().default_value(18));
        let out = mapper().bind(&schema, &Map::new(), &BindOptions::default()).unwrap();
        assert_eq!(out["age"], Value::Int(18));
    }

    #[test]
    fn test_default_factory_is_transformed() {
        let schema = Schema::new().field("ratio", FieldSchema::new("float").default_with(|| 3u8));
        let out = mapper().bind(&schema, &Map::new(), &BindOptions::default()).unwrap();
        assert_eq!(out["ratio"], Value::Float(3.0));
    }

    #[test]
    fn test_tolerant_drops_offenders() {
        let schema = Schema::new()
            .field("age", FieldSchema::new("int").required())
            .field("score", FieldSchema::new("float").required())
            .field("name", FieldSchema::new("string"));
        let out = mapper()
            .bind(
                &schema,
                &input(json!({"score": "abc", "name": "ada"})),
                &BindOptions::default().tolerant(true),
            )
            .unwrap();
        assert!(!out.contains_key("age"));
        assert!(!out.contains_key("score"));
        assert_eq!(out["name"], Value::from("ada"));
    }

    #[test]
    fn test_tolerant_drops_non_record_elements() {
        let schema = Schema::new()
            .field(
                "items",
                FieldSchema::new("any")
                    .children(Schema::new().field("id", FieldSchema::new("int").required())),
            )
            .field("name", FieldSchema::new("string"));
        let raw = input(json!({"items": [{"id": 1}, 2], "name": "ada"}));

        let out = mapper()
            .bind(&schema, &raw, &BindOptions::default().tolerant(true))
            .unwrap();
        assert!(!out.contains_key("items"));
        assert_eq!(out["name"], Value::from("ada"));

        let err = mapper().bind(&schema, &raw, &BindOptions::default()).unwrap_err();
        assert!(err.is(&Outcome::VAR_ERROR));
    }

    #[test]
    fn test_custom_outcomes() {
        let missing = Outcome::new(2001, "user.age.missing");
        let wrong = Outcome::new(2002, "user.age.wrong");
        let schema = Schema::new().field(
            "age",
            FieldSchema::new("int")
                .required()
                .on_empty(missing.clone())
                .on_error(wrong.clone()),
        );
        let m = mapper();
        assert_eq!(m.bind(&schema, &Map::new(), &BindOptions::default()), Err(missing));
        assert_eq!(
            m.bind(&schema, &input(json!({"age": "x"})), &BindOptions::default()),
            Err(wrong)
        );
    }

    #[test]
    fn test_optional_absent_binds_null_nullable_skips() {
        let schema = Schema::new()
            .field("nick", FieldSchema::new("string"))
            .field("bio", FieldSchema::new("string").nullable());
        let out = mapper().bind(&schema, &Map::new(), &BindOptions::default()).unwrap();
        assert_eq!(out.get("nick"), Some(&Value::Null));
        assert!(!out.contains_key("bio"));
    }

    #[test]
    fn test_partial_mode() {
        let schema = Schema::new()
            .field("age", FieldSchema::new("int").required().default_value(1))
            .field("name", FieldSchema::new("string").required())
            .field("bio", FieldSchema::new("string"));
        let out = mapper()
            .bind(
                &schema,
                &input(json!({"name": "", "bio": "hi"})),
                &BindOptions::default().partial(true),
            )
            .unwrap();
        assert!(!out.contains_key("age"));
        assert_eq!(out["name"], Value::Null);
        assert_eq!(out["bio"], Value::from("hi"));
    }

    #[test]
    fn test_nested_list_fails_on_bad_element() {
        let children = Schema::new().field("id", FieldSchema::new("int").required());
        let schema = Schema::new().field("items", FieldSchema::new("[json]").children(children));
        let m = mapper();

        let ok = m
            .bind(&schema, &input(json!({"items": [{"id": 1}, {"id": "2"}]})), &BindOptions::default())
            .unwrap();
        let items = ok["items"].as_list().unwrap();
        assert_eq!(items[1].as_map().unwrap()["id"], Value::Int(2));

        let err = m
            .bind(&schema, &input(json!({"items": [{"id": 1}, {}]})), &BindOptions::default())
            .unwrap_err();
        assert!(err.is(&Outcome::VAR_EMPTY));
    }

    #[test]
    fn test_required_structure() {
        let children = Schema::new().field("city", FieldSchema::new("string").required());
        let schema =
            Schema::new().field("address", FieldSchema::new("json").required().children(children));
        let m = mapper();

        let out = m.bind(&schema, &Map::new(), &BindOptions::default()).unwrap();
        assert_eq!(out["address"], Value::Map(Map::new()));

        let err = m
            .bind(&schema, &input(json!({"address": {}})), &BindOptions::default())
            .unwrap_err();
        assert!(err.is(&Outcome::VAR_EMPTY));
        assert_eq!(err.args(), &[Value::from("city")]);
    }

    #[test]
    fn test_encode_and_decode() {
        let m = mapper();
        let secret = m.codecs().encrypt_text("hidden").unwrap();
        let schema = Schema::new()
            .field("plain", FieldSchema::new("string").decode("text"))
            .field("sealed", FieldSchema::new("string").encode("text"))
            .field("both", FieldSchema::new("string").decode("text").encode("text"))
            .field("raw", FieldSchema::new("string").decode("digit"));
        let out = m
            .bind(
                &schema,
                &input(json!({"plain": secret, "sealed": "open", "both": secret, "raw": "not-a-code"})),
                &BindOptions::default(),
            )
            .unwrap();
        assert_eq!(out["plain"], Value::from("hidden"));
        assert_eq!(m.codecs().decrypt_text(out["sealed"].as_str().unwrap()).unwrap(), "open");
        assert_eq!(out["both"], Value::from("hidden"));
        assert_eq!(out["raw"], Value::from("not-a-code"));
    }

    #[test]
    fn test_timestamps_follow_timezone() {
        let tz = FixedOffset::east_opt(8 * 3600).unwrap();
        let schema = Schema::new().field("at", FieldSchema::new("datetime").required());
        let out = mapper()
            .bind(
                &schema,
                &input(json!({"at": "2024-01-01T00:00:00Z"})),
                &BindOptions::default().timezone(tz),
            )
            .unwrap();
        let at = out["at"].as_time().unwrap();
        assert_eq!(at.offset(), &tz);
        assert_eq!(at.timestamp(), 1_704_067_200);
    }

    #[test]
    fn test_failure_returns_no_partial_output() {
        let schema = Schema::new()
            .field("a", FieldSchema::new("int").required())
            .field("b", FieldSchema::new("int").required());
        let result = mapper().bind(&schema, &input(json!({"a": 1, "b": "x"})), &BindOptions::default());
        assert!(result.is_err());
    }
}
