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

//! Method registry and invocation dispatcher.
//!
//! [`Engine::call`] is the single entry point: bind the payload through the
//! declaration's input schema, run the handler, normalise its result shape
//! and bind the output. Names the local registry does not know are forwarded
//! to the attached [`RemoteTransport`] under a fixed timeout.

use crate::codec::token::TokenCodec;
use crate::engine::context::CallContext;
use crate::engine::mapping::{BindOptions, Mapper};
use crate::engine::method::{Invocation, MethodDeclaration};
use crate::engine_core::constants::dispatch;
use crate::engine_core::errors::KernelError;
use crate::engine_core::models::{Echo, FieldSchema, Schema, SchemaPatch, ShapeTag};
use crate::engine_core::outcome::Outcome;
use crate::engine_core::policy::OverridePolicy;
use crate::engine_core::traits::RemoteTransport;
use crate::engine_core::value::{Map, Value};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct Engine {
    methods: RwLock<HashMap<String, Arc<MethodDeclaration>>>,
    policy: Arc<OverridePolicy>,
    mapper: Arc<Mapper>,
    transport: RwLock<Option<Arc<dyn RemoteTransport>>>,
    tokens: Option<Arc<TokenCodec>>,
    remote_timeout: Duration,
}

impl Engine {
    pub fn new(mapper: Arc<Mapper>, policy: Arc<OverridePolicy>) -> Self {
        Self {
            methods: RwLock::new(HashMap::new()),
            policy,
            mapper,
            transport: RwLock::new(None),
            tokens: None,
            remote_timeout: dispatch::REMOTE_TIMEOUT,
        }
    }

    pub fn with_tokens(mut self, tokens: Arc<TokenCodec>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    pub fn with_remote_timeout(mut self, timeout: Duration) -> Self {
        self.remote_timeout = timeout;
        self
    }

    pub fn mapper(&self) -> &Arc<Mapper> {
        &self.mapper
    }

    pub fn tokens(&self) -> Option<&Arc<TokenCodec>> {
        self.tokens.as_ref()
    }

    /// Store `declaration` under `name` and each alias.
    ///
    /// Any key already taken is a configuration error and nothing is stored.
    pub fn register(&self, name: &str, declaration: MethodDeclaration) -> Result<(), KernelError> {
        let mut methods = self.methods.write();
        if let Some(taken) = declaration.keys(name).find(|k| methods.contains_key(*k)) {
            return Err(KernelError::DuplicateRegistration(taken.to_string()));
        }
        let declaration = Arc::new(declaration);
        for key in declaration.keys(name) {
            methods.insert(key.to_string(), Arc::clone(&declaration));
        }
        info!("Registered method '{}'", name);
        Ok(())
    }

    /// Store `declaration`, replacing or keeping existing keys per the
    /// override flag.
    pub fn define(&self, name: &str, declaration: MethodDeclaration) {
        let declaration = Arc::new(declaration);
        let mut methods = self.methods.write();
        for key in declaration.keys(name) {
            if self.policy.admit("method", key, methods.contains_key(key)) {
                methods.insert(key.to_string(), Arc::clone(&declaration));
            }
        }
    }

    pub fn declaration(&self, name: &str) -> Option<Arc<MethodDeclaration>> {
        self.methods.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.read().contains_key(name)
    }

    /// Registered keys, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.methods.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn set_transport(&self, transport: Arc<dyn RemoteTransport>) {
        *self.transport.write() = Some(transport);
    }

    pub fn clear_transport(&self) {
        *self.transport.write() = None;
    }

    pub async fn call(
        &self,
        ctx: &mut CallContext,
        name: &str,
        payload: Map,
        settings: Option<&Map>,
    ) -> (Map, Outcome, ShapeTag) {
        match self.declaration(name) {
            Some(declaration) => self.call_local(ctx, name, &declaration, payload, settings).await,
            None => self.call_remote(ctx, name, payload).await,
        }
    }

    /// Local-only call with a context of its own, closed on return.
    pub async fn execute(self: &Arc<Self>, name: &str, payload: Map) -> (Map, Outcome) {
        let Some(declaration) = self.declaration(name) else {
            return (Map::new(), Outcome::NOTHING);
        };
        let mut ctx = CallContext::new(Arc::clone(self), name, payload.clone());
        let (data, outcome, _) = self.call_local(&mut ctx, name, &declaration, payload, None).await;
        ctx.close();
        (data, outcome)
    }

    async fn call_local(
        &self,
        ctx: &mut CallContext,
        name: &str,
        declaration: &MethodDeclaration,
        payload: Map,
        settings: Option<&Map>,
    ) -> (Map, Outcome, ShapeTag) {
        if declaration.sign && !ctx.signed(None) {
            return (Map::new(), Outcome::UNSIGNED, ShapeTag::Plain);
        }
        if declaration.auth && !ctx.authed(None) {
            return (Map::new(), Outcome::UNAUTHED, ShapeTag::Plain);
        }

        let mut merged = declaration.settings.clone();
        if let Some(settings) = settings {
            merged.extend(settings.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        let options = BindOptions::default()
            .partial(declaration.nullable)
            .timezone(ctx.timezone());
        let args = match &declaration.args {
            Some(schema) => match self.mapper.bind(schema, &payload, &options) {
                Ok(args) => args,
                Err(outcome) => {
                    debug!("Arguments of '{}' rejected: {}", name, outcome);
                    return (Map::new(), outcome, ShapeTag::Plain);
                }
            },
            None => Map::new(),
        };

        let mut invocation = Invocation {
            name: name.to_string(),
            settings: merged,
            value: payload,
            args,
            context: ctx,
        };
        let reply = declaration.handler.handle(&mut invocation).await;
        let (data, shape) = reply.result.normalize();

        let data = match &declaration.data {
            Some(schema) => {
                let options = BindOptions::default().timezone(ctx.timezone());
                match self.mapper.bind(schema, &data, &options) {
                    Ok(bound) => bound,
                    Err(outcome) => {
                        debug!("Output of '{}' left unbound: {}", name, outcome);
                        data
                    }
                }
            }
            None => data,
        };
        (data, reply.outcome, shape)
    }

    async fn call_remote(&self, ctx: &mut CallContext, name: &str, payload: Map) -> (Map, Outcome, ShapeTag) {
        let transport = self.transport.read().clone();
        let Some(transport) = transport else {
            debug!("No local method '{}' and no transport attached", name);
            return (Map::new(), Outcome::NOTHING, ShapeTag::Plain);
        };

        let mut metadata = ctx.metadata();
        metadata.name = name.to_string();
        metadata.payload = payload;

        let echo = match tokio::time::timeout(
            self.remote_timeout,
            transport.request(metadata, self.remote_timeout),
        )
        .await
        {
            Ok(Ok(echo)) => echo,
            Ok(Err(e)) => {
                warn!("Remote call '{}' failed: {}", name, e);
                return (Map::new(), Outcome::from_error(e), ShapeTag::Plain);
            }
            Err(_) => {
                warn!("Remote call '{}' timed out", name);
                let err = KernelError::RemoteTimeout(self.remote_timeout);
                return (Map::new(), Outcome::from_error(err), ShapeTag::Plain);
            }
        };

        let outcome = echo.outcome();
        let shape = echo.shape;
        let data = self.rebind_echo(ctx, echo);
        (data, outcome, shape)
    }

    /// Re-bind a remote answer through the canonical schema of its shape.
    fn rebind_echo(&self, ctx: &CallContext, echo: Echo) -> Map {
        let Echo { data, schema, shape, .. } = echo;
        let Some(data) = data else {
            return Map::new();
        };
        let Some(items) = schema else {
            return data;
        };
        let canonical = match shape {
            ShapeTag::List => Schema::new().field(dispatch::KEY_ITEMS, records_field(items)),
            ShapeTag::Paged => Schema::new()
                .field(dispatch::KEY_COUNT, FieldSchema::new("int").required().default_value(0i64))
                .field(dispatch::KEY_ITEMS, records_field(items)),
            ShapeTag::Count => Schema::new().field(
                dispatch::KEY_COUNT,
                FieldSchema::new("float").required().default_value(0.0),
            ),
            ShapeTag::Dual => Schema::new()
                .field(dispatch::KEY_ITEM, FieldSchema::new("json").required())
                .field(dispatch::KEY_ITEMS, FieldSchema::new("[json]").required()),
            ShapeTag::Plain => return data,
        };
        let options = BindOptions::default().timezone(ctx.timezone());
        match self.mapper.bind(&canonical, &data, &options) {
            Ok(bound) => bound,
            Err(outcome) => {
                debug!("Remote {} data kept as sent: {}", shape, outcome);
                data
            }
        }
    }

    /// Call and unwrap a single record; a list answer yields its first item.
    pub async fn invoke(
        &self,
        ctx: &mut CallContext,
        name: &str,
        payload: Map,
        settings: Option<&Map>,
    ) -> (Map, Outcome) {
        let (mut data, outcome, shape) = self.call(ctx, name, payload, settings).await;
        if shape == ShapeTag::List {
            if let Some(first) = take_records(&mut data, dispatch::KEY_ITEMS)
                .and_then(|items| items.into_iter().next())
            {
                return (first, outcome);
            }
        }
        (data, outcome)
    }

    /// Call and unwrap a list; a non-empty record becomes a one item list.
    pub async fn invoke_many(
        &self,
        ctx: &mut CallContext,
        name: &str,
        payload: Map,
        settings: Option<&Map>,
    ) -> (Vec<Map>, Outcome) {
        let (mut data, outcome, _) = self.call(ctx, name, payload, settings).await;
        if let Some(items) = take_records(&mut data, dispatch::KEY_ITEMS) {
            return (items, outcome);
        }
        if data.is_empty() {
            (Vec::new(), outcome)
        } else {
            (vec![data], outcome)
        }
    }

    pub async fn invoke_exists(
        &self,
        ctx: &mut CallContext,
        name: &str,
        payload: Map,
        settings: Option<&Map>,
    ) -> (bool, Outcome) {
        let (_, outcome, _) = self.call(ctx, name, payload, settings).await;
        (outcome.is_ok(), outcome)
    }

    /// Call with `offset`/`limit` set and unwrap `(count, items)`.
    pub async fn invoke_paged(
        &self,
        ctx: &mut CallContext,
        name: &str,
        offset: i64,
        limit: i64,
        mut payload: Map,
        settings: Option<&Map>,
    ) -> (i64, Vec<Map>, Outcome) {
        payload.insert(dispatch::KEY_OFFSET.into(), Value::Int(offset));
        payload.insert(dispatch::KEY_LIMIT.into(), Value::Int(limit));
        let (mut data, outcome, _) = self.call(ctx, name, payload, settings).await;
        if outcome.is_fail() {
            return (0, Vec::new(), outcome);
        }
        let count = data.get(dispatch::KEY_COUNT).and_then(Value::as_i64);
        match (count, take_records(&mut data, dispatch::KEY_ITEMS)) {
            (Some(count), Some(items)) => (count, items, outcome),
            _ => (0, Vec::new(), outcome),
        }
    }

    /// Call and unwrap `(item, items)`.
    pub async fn invoke_related(
        &self,
        ctx: &mut CallContext,
        name: &str,
        payload: Map,
        settings: Option<&Map>,
    ) -> (Map, Vec<Map>, Outcome) {
        let (mut data, outcome, _) = self.call(ctx, name, payload, settings).await;
        if outcome.is_fail() {
            return (Map::new(), Vec::new(), outcome);
        }
        let item = data.remove(dispatch::KEY_ITEM).and_then(Value::into_map);
        match (item, take_records(&mut data, dispatch::KEY_ITEMS)) {
            (Some(item), Some(items)) => (item, items, outcome),
            _ => (Map::new(), Vec::new(), outcome),
        }
    }

    pub async fn invoke_count(
        &self,
        ctx: &mut CallContext,
        name: &str,
        payload: Map,
        settings: Option<&Map>,
    ) -> (f64, Outcome) {
        let (data, outcome, _) = self.call(ctx, name, payload, settings).await;
        if outcome.is_fail() {
            return (0.0, outcome);
        }
        let count = data.get(dispatch::KEY_COUNT).and_then(Value::as_f64).unwrap_or(0.0);
        (count, outcome)
    }

    /// Declared input schema of `name`, with `extends` applied on top.
    /// Unknown methods start from an empty schema.
    pub fn arguments(&self, name: &str, extends: Option<&SchemaPatch>) -> Schema {
        let mut schema = self
            .declaration(name)
            .and_then(|d| d.args.clone())
            .unwrap_or_default();
        if let Some(patch) = extends {
            schema.apply(patch);
        }
        schema
    }
}

fn records_field(children: Schema) -> FieldSchema {
    FieldSchema::new("[json]").required().children(children)
}

fn take_records(data: &mut Map, key: &str) -> Option<Vec<Map>> {
    match data.remove(key) {
        Some(value @ Value::List(_)) => value.into_records(),
        Some(other) => {
            data.insert(key.to_string(), other);
            None
        }
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CodecConfig;
    use crate::codec::registry::CodecRegistry;
    use crate::engine::types::TypeRegistry;
    use crate::engine_core::models::HandlerResult;

    fn engine() -> Arc<Engine> {
        let policy = Arc::new(OverridePolicy::default());
        let mapper = Mapper::new(
            Arc::new(TypeRegistry::with_builtins(policy.clone()).unwrap()),
            Arc::new(CodecRegistry::with_builtins(&CodecConfig::default(), 1, policy.clone()).unwrap()),
        );
        Arc::new(Engine::new(Arc::new(mapper), policy))
    }

    fn record(key: &str, value: impl Into<Value>) -> Map {
        let mut map = Map::new();
        map.insert(key.to_string(), value.into());
        map
    }

    #[test]
    fn test_register_rejects_any_taken_key() {
        let engine = engine();
        engine
            .register("user.get", MethodDeclaration::new(|_| ()).alias("user.fetch"))
            .unwrap();
        let err = engine
            .register("user.load", MethodDeclaration::new(|_| ()).alias("user.fetch"))
            .unwrap_err();
        assert!(matches!(err, KernelError::DuplicateRegistration(ref k) if k == "user.fetch"));
        assert!(!engine.contains("user.load"));
        assert_eq!(engine.names(), vec!["user.fetch", "user.get"]);
    }

    #[test]
    fn test_define_honours_override_flag() {
        let engine = engine();
        engine.define("ping", MethodDeclaration::new(|_| ()).label("first"));
        engine.define("ping", MethodDeclaration::new(|_| ()).label("second"));
        assert_eq!(engine.declaration("ping").unwrap().name, "second");

        engine.policy.set(false);
        engine.define("ping", MethodDeclaration::new(|_| ()).label("third"));
        assert_eq!(engine.declaration("ping").unwrap().name, "second");
    }

    #[tokio::test]
    async fn test_handler_shapes_normalise() {
        let engine = engine();
        engine.define("one", MethodDeclaration::new(|_| record("id", 1)));
        engine.define("many", MethodDeclaration::new(|_| vec![record("id", 1), record("id", 2)]));
        engine.define("count", MethodDeclaration::new(|_| 3i64));
        engine.define("paged", MethodDeclaration::new(|_| (7i64, vec![record("id", 1)])));
        engine.define("dual", MethodDeclaration::new(|_| (record("id", 1), vec![record("id", 2)])));
        engine.define("none", MethodDeclaration::new(|_| HandlerResult::Empty));

        let mut ctx = CallContext::new(Arc::clone(&engine), "test", Map::new());
        let (data, _, shape) = engine.call(&mut ctx, "many", Map::new(), None).await;
        assert_eq!(shape, ShapeTag::List);
        assert_eq!(data["items"].as_list().map(|l| l.len()), Some(2));

        let (data, _, shape) = engine.call(&mut ctx, "count", Map::new(), None).await;
        assert_eq!((shape, data["count"].clone()), (ShapeTag::Count, Value::Float(3.0)));

        let (data, _, shape) = engine.call(&mut ctx, "paged", Map::new(), None).await;
        assert_eq!((shape, data["count"].clone()), (ShapeTag::Paged, Value::Int(7)));

        let (data, _, shape) = engine.call(&mut ctx, "dual", Map::new(), None).await;
        assert_eq!(shape, ShapeTag::Dual);
        assert!(data.contains_key("item") && data.contains_key("items"));

        let (data, outcome, shape) = engine.call(&mut ctx, "none", Map::new(), None).await;
        assert!(data.is_empty() && outcome.is_ok());
        assert_eq!(shape, ShapeTag::Plain);

        let (data, _) = engine.invoke(&mut ctx, "one", Map::new(), None).await;
        assert_eq!(data, record("id", 1));
    }

    #[tokio::test]
    async fn test_unknown_without_transport_is_nothing() {
        let engine = engine();
        let mut ctx = CallContext::new(Arc::clone(&engine), "test", Map::new());
        let (data, outcome, _) = engine.call(&mut ctx, "missing", Map::new(), None).await;
        assert!(data.is_empty());
        assert!(outcome.is(&Outcome::NOTHING));
        assert!(engine.execute("missing", Map::new()).await.1.is(&Outcome::NOTHING));
    }

    #[test]
    fn test_arguments_patch() {
        let engine = engine();
        engine.define(
            "user.create",
            MethodDeclaration::new(|_| ()).args(
                Schema::new()
                    .field("name", FieldSchema::new("string").required())
                    .field("age", FieldSchema::new("int")),
            ),
        );
        let patch: SchemaPatch = vec![
            ("age".into(), None),
            ("email".into(), Some(FieldSchema::new("email").required())),
        ];
        let schema = engine.arguments("user.create", Some(&patch));
        assert_eq!(schema.names(), vec!["name", "email"]);
        assert!(engine.arguments("nope", None).is_empty());
    }
}
