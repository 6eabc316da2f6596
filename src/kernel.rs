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

//! The kernel instance.
//!
//! [`Kernel`] owns every registry (codecs, types, outcomes, methods) and
//! hands them out by reference. There is no process-wide state: two kernels
//! in one process are fully independent.

use crate::codec::registry::CodecRegistry;
use crate::codec::token::TokenCodec;
use crate::config::Config;
use crate::engine::context::CallContext;
use crate::engine::dispatcher::Engine;
use crate::engine::mapping::{BindOptions, Mapper};
use crate::engine::method::MethodDeclaration;
use crate::engine::trigger::Triggers;
use crate::engine::types::TypeRegistry;
use crate::engine_core::bridge::LogBridge;
use crate::engine_core::errors::KernelError;
use crate::engine_core::models::{Schema, ShapeTag};
use crate::engine_core::outcome::{LocaleTable, Outcome, OutcomeGroup, OutcomeRegistry};
use crate::engine_core::policy::OverridePolicy;
use crate::engine_core::traits::{LogSink, RemoteTransport};
use crate::engine_core::value::Map;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::info;

pub struct Kernel {
    config: Config,
    policy: Arc<OverridePolicy>,
    outcomes: Arc<OutcomeRegistry>,
    codecs: Arc<CodecRegistry>,
    types: Arc<TypeRegistry>,
    tokens: Arc<TokenCodec>,
    engine: Arc<Engine>,
    triggers: Triggers,
    logs: LogBridge,
}

impl Kernel {
    pub fn new(config: Config) -> Result<Self, KernelError> {
        let policy = Arc::new(OverridePolicy::new(config.override_existing));
        let strings = Arc::new(LocaleTable::new(&config.locale));
        let outcomes = Arc::new(OutcomeRegistry::new(strings, Arc::clone(&policy)));

        let node = config.node_id();
        let codecs = Arc::new(CodecRegistry::with_builtins(&config.codec, node, Arc::clone(&policy))?);
        let types = Arc::new(TypeRegistry::with_builtins(Arc::clone(&policy))?);

        if !codecs.contains(&config.token.codec) {
            return Err(KernelError::ConfigurationError(format!(
                "unknown token payload codec '{}'",
                config.token.codec
            )));
        }
        let tokens = Arc::new(
            TokenCodec::new(config.token_secret(), Arc::clone(&codecs))
                .with_payload_codec(config.token.codec.clone())
                .with_default_ttl(config.token.expire.map(Duration::from_secs)),
        );

        let mapper = Arc::new(Mapper::new(Arc::clone(&types), Arc::clone(&codecs)));
        let engine = Arc::new(Engine::new(mapper, Arc::clone(&policy)).with_tokens(Arc::clone(&tokens)));
        let triggers = Triggers::new(Arc::clone(&engine));

        info!(
            "Kernel '{}' ready (node {}, mode {:?}, override {})",
            config.name, node, config.mode, config.override_existing
        );

        Ok(Self {
            config,
            policy,
            outcomes,
            codecs,
            types,
            tokens,
            engine,
            triggers,
            logs: LogBridge::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn codecs(&self) -> &Arc<CodecRegistry> {
        &self.codecs
    }

    pub fn types(&self) -> &Arc<TypeRegistry> {
        &self.types
    }

    pub fn outcomes(&self) -> &Arc<OutcomeRegistry> {
        &self.outcomes
    }

    pub fn tokens(&self) -> &Arc<TokenCodec> {
        &self.tokens
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    pub fn logs(&self) -> &LogBridge {
        &self.logs
    }

    /// Switch between replace (true) and keep-first (false) registration.
    pub fn set_override(&self, enabled: bool) {
        self.policy.set(enabled);
    }

    pub fn register(&self, name: &str, declaration: MethodDeclaration) -> Result<(), KernelError> {
        self.engine.register(name, declaration)
    }

    pub fn define(&self, name: &str, declaration: MethodDeclaration) {
        self.engine.define(name, declaration)
    }

    /// Methods and outcomes namespaced under `name`.
    pub fn group(&self, name: &str) -> Group {
        Group {
            prefix: name.to_string(),
            engine: Arc::clone(&self.engine),
            outcomes: self.outcomes.group(name),
        }
    }

    pub fn trigger(&self, event: &str, hook: MethodDeclaration) -> String {
        self.triggers.register(event, hook)
    }

    /// Fire the "start" hooks; they run detached.
    pub fn launch(&self) -> Vec<JoinHandle<Outcome>> {
        self.logs.info(&format!("{} launching", self.config.name));
        self.triggers.start()
    }

    /// Run the "stop" hooks to completion.
    pub async fn terminate(&self) -> Vec<Outcome> {
        let outcomes = self.triggers.stop().await;
        self.logs.info(&format!("{} terminated", self.config.name));
        outcomes
    }

    pub fn context(&self, name: &str, payload: Map) -> CallContext {
        let mut ctx = CallContext::new(Arc::clone(&self.engine), name, payload);
        ctx.set_locale(self.outcomes.strings().default_locale());
        ctx
    }

    /// Dispatch `name` with a fresh context that is closed on return.
    pub async fn call(&self, name: &str, payload: Map) -> (Map, Outcome, ShapeTag) {
        let mut ctx = self.context(name, payload.clone());
        let result = self.engine.call(&mut ctx, name, payload, None).await;
        ctx.close();
        result
    }

    pub fn attach_transport(&self, transport: Arc<dyn RemoteTransport>) {
        self.engine.set_transport(transport);
    }

    pub fn attach_log_sink(&self, sink: Arc<dyn LogSink>) {
        self.logs.attach(sink);
    }

    pub fn bind(&self, schema: &Schema, input: &Map, options: &BindOptions) -> Result<Map, Outcome> {
        self.engine.mapper().bind(schema, input, options)
    }

    /// Render `outcome` in `locale`.
    pub fn text(&self, outcome: &Outcome, locale: &str) -> String {
        outcome.text(self.outcomes.strings().as_ref(), locale)
    }

    pub fn generate(&self, prefix: &str) -> String {
        self.codecs.generate(prefix)
    }
}

/// A named module: methods registered as `"<group>.<name>"` and outcomes
/// as `"<group>.<state>"`.
pub struct Group {
    prefix: String,
    engine: Arc<Engine>,
    outcomes: OutcomeGroup,
}

impl Group {
    pub fn name(&self) -> &str {
        &self.prefix
    }

    fn naming(&self, name: &str) -> String {
        format!("{}.{}", self.prefix, name)
    }

    pub fn register(&self, name: &str, declaration: MethodDeclaration) -> Result<(), KernelError> {
        self.engine.register(&self.naming(name), declaration)
    }

    pub fn define(&self, name: &str, declaration: MethodDeclaration) {
        self.engine.define(&self.naming(name), declaration)
    }

    pub fn fail(&self, state: &str, text: &str) -> Outcome {
        self.outcomes.fail(state, text)
    }

    pub fn success(&self, state: &str, text: &str) -> Outcome {
        self.outcomes.success(state, text)
    }
}
