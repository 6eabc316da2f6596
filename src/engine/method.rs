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

//! Method declarations and handlers.

use crate::engine::context::CallContext;
use crate::engine_core::models::{Reply, Schema};
use crate::engine_core::value::{Map, Value};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// What a handler sees: the bound arguments, the raw payload, merged
/// settings and the owning call context.
pub struct Invocation<'a> {
    pub name: String,
    pub settings: Map,
    /// Raw payload as received
    pub value: Map,
    /// Payload bound through the declaration's input schema
    pub args: Map,
    pub context: &'a mut CallContext,
}

impl Invocation<'_> {
    pub fn arg(&self, key: &str) -> Option<&Value> {
        self.args.get(key)
    }

    pub fn setting(&self, key: &str) -> Option<&Value> {
        self.settings.get(key)
    }
}

#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, call: &mut Invocation<'_>) -> Reply;
}

/// Adapts a plain closure returning anything convertible into a [`Reply`].
pub struct FnHandler<F>(pub F);

#[async_trait]
impl<F, R> Handler for FnHandler<F>
where
    F: Fn(&mut Invocation<'_>) -> R + Send + Sync,
    R: Into<Reply> + Send,
{
    async fn handle(&self, call: &mut Invocation<'_>) -> Reply {
        (self.0)(call).into()
    }
}

/// A named operation: input schema, output schema, handler and flags.
#[derive(Clone)]
pub struct MethodDeclaration {
    /// Human readable label
    pub name: String,
    pub text: String,
    pub aliases: Vec<String>,
    /// Bind input in partial mode
    pub nullable: bool,
    pub args: Option<Schema>,
    pub data: Option<Schema>,
    pub settings: Map,
    pub handler: Arc<dyn Handler>,
    /// Caller must carry a verified token
    pub sign: bool,
    /// Caller must carry an authorized token
    pub auth: bool,
    pub kind: String,
}

impl MethodDeclaration {
    pub fn new<F, R>(handler: F) -> Self
    where
        F: Fn(&mut Invocation<'_>) -> R + Send + Sync + 'static,
        R: Into<Reply> + Send + 'static,
    {
        Self::from_handler(FnHandler(handler))
    }

    pub fn from_handler(handler: impl Handler + 'static) -> Self {
        Self {
            name: String::new(),
            text: String::new(),
            aliases: Vec::new(),
            nullable: false,
            args: None,
            data: None,
            settings: Map::new(),
            handler: Arc::new(handler),
            sign: false,
            auth: false,
            kind: String::new(),
        }
    }

    pub fn label(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn describe(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn args(mut self, schema: Schema) -> Self {
        self.args = Some(schema);
        self
    }

    pub fn data(mut self, schema: Schema) -> Self {
        self.data = Some(schema);
        self
    }

    pub fn setting(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    pub fn signed(mut self) -> Self {
        self.sign = true;
        self
    }

    pub fn authed(mut self) -> Self {
        self.auth = true;
        self
    }

    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    /// Every key this declaration answers to.
    pub fn keys<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> {
        std::iter::once(name).chain(self.aliases.iter().map(String::as_str))
    }
}

impl fmt::Debug for MethodDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDeclaration")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("nullable", &self.nullable)
            .field("args", &self.args)
            .field("data", &self.data)
            .field("sign", &self.sign)
            .field("auth", &self.auth)
            .finish_non_exhaustive()
    }
}
