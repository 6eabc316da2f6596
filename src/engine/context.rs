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

//! Per-call context.
//!
//! A [`CallContext`] lives for exactly one inbound call. It carries the call
//! metadata, the verified token, the last outcome of nested invocations and
//! any temp files or directories created on the call's behalf. Temp
//! resources are released once, on [`close`](CallContext::close) or drop.

use crate::codec::token::{Token, TokenCodec};
use crate::engine::dispatcher::Engine;
use crate::engine_core::constants::locale;
use crate::engine_core::errors::{KernelError, TokenError};
use crate::engine_core::models::{Metadata, ShapeTag};
use crate::engine_core::outcome::Outcome;
use crate::engine_core::value::Map;
use chrono::{DateTime, FixedOffset, Local, Offset, TimeZone, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::{NamedTempFile, TempDir};
use tracing::{debug, warn};

pub struct CallContext {
    engine: Arc<Engine>,
    name: String,
    payload: Map,
    attempts: u32,
    final_attempt: bool,
    locale: String,
    /// Seconds east of UTC; 0 means the local zone
    timezone: i32,
    token: Option<Token>,
    token_text: String,
    outcome: Option<Outcome>,
    temp_files: Vec<NamedTempFile>,
    temp_dirs: Vec<TempDir>,
    closed: bool,
}

impl CallContext {
    pub fn new(engine: Arc<Engine>, name: impl Into<String>, payload: Map) -> Self {
        Self {
            engine,
            name: name.into(),
            payload,
            attempts: 0,
            final_attempt: false,
            locale: locale::DEFAULT.to_string(),
            timezone: 0,
            token: None,
            token_text: String::new(),
            outcome: None,
            temp_files: Vec::new(),
            temp_dirs: Vec::new(),
            closed: false,
        }
    }

    /// Rebuild a context from wire metadata. An attached token that fails
    /// verification leaves the context unsigned.
    pub fn from_metadata(engine: Arc<Engine>, metadata: Metadata) -> Self {
        let mut ctx = Self::new(engine, metadata.name, metadata.payload);
        ctx.attempts = metadata.attempts;
        ctx.final_attempt = metadata.final_attempt;
        ctx.timezone = metadata.timezone;
        if !metadata.locale.is_empty() {
            ctx.locale = metadata.locale;
        }
        if !metadata.token.is_empty() {
            if let Err(e) = ctx.verify(&metadata.token) {
                warn!("Call '{}' carried an invalid token: {}", ctx.name, e);
            }
        }
        ctx
    }

    pub fn metadata(&self) -> Metadata {
        Metadata {
            name: self.name.clone(),
            payload: self.payload.clone(),
            attempts: self.attempts,
            final_attempt: self.final_attempt,
            locale: self.locale.clone(),
            timezone: self.timezone,
            token: self.token_text.clone(),
        }
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn payload(&self) -> &Map {
        &self.payload
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn set_attempts(&mut self, attempts: u32) {
        self.attempts = attempts;
    }

    pub fn is_final(&self) -> bool {
        self.final_attempt
    }

    pub fn set_final(&mut self, final_attempt: bool) {
        self.final_attempt = final_attempt;
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn set_locale(&mut self, locale: impl Into<String>) {
        self.locale = locale.into();
    }

    /// Zone used for binding timestamps.
    pub fn timezone(&self) -> FixedOffset {
        if self.timezone == 0 {
            return Local::now().offset().fix();
        }
        FixedOffset::east_opt(self.timezone).unwrap_or_else(|| Utc.fix())
    }

    pub fn set_timezone(&mut self, seconds_east: i32) {
        self.timezone = seconds_east;
    }

    /// Take the last recorded outcome; ok when none was recorded.
    pub fn result(&mut self) -> Outcome {
        self.outcome.take().unwrap_or(Outcome::OK)
    }

    pub fn set_result(&mut self, outcome: Outcome) {
        self.outcome = Some(outcome);
    }

    // Token

    pub fn token(&self) -> Option<&Token> {
        self.token.as_ref()
    }

    pub fn token_text(&self) -> &str {
        &self.token_text
    }

    pub fn id(&self) -> Option<&str> {
        self.token
            .as_ref()
            .map(|t| t.header.id.as_str())
            .filter(|id| !id.is_empty())
    }

    /// A verified token is attached, optionally with the given role.
    pub fn signed(&self, role: Option<&str>) -> bool {
        self.token
            .as_ref()
            .is_some_and(|t| role.map_or(true, |r| t.header.role == r))
    }

    /// An authorized token is attached, optionally with the given role.
    pub fn authed(&self, role: Option<&str>) -> bool {
        self.signed(role) && self.token.as_ref().is_some_and(|t| t.header.authorized)
    }

    pub fn claims(&self) -> Option<&Map> {
        self.token.as_ref().map(|t| &t.payload)
    }

    pub fn expires(&self) -> Option<DateTime<Utc>> {
        let expires = self.token.as_ref()?.header.expires;
        if expires == 0 {
            return None;
        }
        Utc.timestamp_opt(expires, 0).single()
    }

    /// Sign a token for this caller, keeping the current identity if any.
    pub fn sign(
        &mut self,
        authorized: bool,
        claims: Map,
        ttl: Option<Duration>,
        role: &str,
    ) -> Result<String, TokenError> {
        let id = match self.id() {
            Some(id) => id.to_string(),
            None => self.codec()?.new_id(),
        };
        self.mint(id, authorized, claims, ttl, role)
    }

    /// Sign a token under a fresh identity.
    pub fn new_sign(
        &mut self,
        authorized: bool,
        claims: Map,
        ttl: Option<Duration>,
        role: &str,
    ) -> Result<String, TokenError> {
        let id = self.codec()?.new_id();
        self.mint(id, authorized, claims, ttl, role)
    }

    fn codec(&self) -> Result<Arc<TokenCodec>, TokenError> {
        self.engine.tokens().cloned().ok_or(TokenError::Unconfigured)
    }

    fn mint(
        &mut self,
        id: String,
        authorized: bool,
        claims: Map,
        ttl: Option<Duration>,
        role: &str,
    ) -> Result<String, TokenError> {
        let codec = self.codec()?;
        let mut token = Token::new(claims).with_id(id).authorized(authorized).role(role);
        if let Some(ttl) = ttl.or(codec.default_ttl()) {
            token = token.expires_in(ttl);
        }
        let text = codec.sign(&token)?;
        self.token = Some(token);
        self.token_text = text.clone();
        Ok(text)
    }

    /// Verify `text` and attach it. On failure the context is left unsigned.
    pub fn verify(&mut self, text: &str) -> Result<(), TokenError> {
        let verified = self.codec().and_then(|codec| codec.verify(text));
        match verified {
            Ok(token) => {
                self.token = Some(token);
                self.token_text = text.to_string();
                Ok(())
            }
            Err(e) => {
                self.token = None;
                self.token_text.clear();
                Err(e)
            }
        }
    }

    // Temp resources

    /// Create a temp file owned by this call and return its path.
    pub fn temp_file(&mut self, prefix: &str) -> Result<PathBuf, KernelError> {
        let file = tempfile::Builder::new().prefix(prefix).tempfile()?;
        let path = file.path().to_path_buf();
        self.temp_files.push(file);
        Ok(path)
    }

    /// Create a temp directory owned by this call and return its path.
    pub fn temp_dir(&mut self, prefix: &str) -> Result<PathBuf, KernelError> {
        let dir = tempfile::Builder::new().prefix(prefix).tempdir()?;
        let path = dir.path().to_path_buf();
        self.temp_dirs.push(dir);
        Ok(path)
    }

    /// Release temp resources. Later calls are no-ops.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let released = self.temp_files.len() + self.temp_dirs.len();
        self.temp_files.clear();
        self.temp_dirs.clear();
        if released > 0 {
            debug!("Call '{}' released {} temp resources", self.name, released);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    // Invocation shortcuts; each records its outcome for `result()`.

    pub async fn call(&mut self, name: &str, payload: Map) -> (Map, ShapeTag) {
        let engine = Arc::clone(&self.engine);
        let (data, outcome, shape) = engine.call(self, name, payload, None).await;
        self.outcome = Some(outcome);
        (data, shape)
    }

    pub async fn invoke(&mut self, name: &str, payload: Map) -> Map {
        let engine = Arc::clone(&self.engine);
        let (data, outcome) = engine.invoke(self, name, payload, None).await;
        self.outcome = Some(outcome);
        data
    }

    pub async fn invoke_many(&mut self, name: &str, payload: Map) -> Vec<Map> {
        let engine = Arc::clone(&self.engine);
        let (items, outcome) = engine.invoke_many(self, name, payload, None).await;
        self.outcome = Some(outcome);
        items
    }

    pub async fn invoke_exists(&mut self, name: &str, payload: Map) -> bool {
        let engine = Arc::clone(&self.engine);
        let (exists, outcome) = engine.invoke_exists(self, name, payload, None).await;
        self.outcome = Some(outcome);
        exists
    }

    pub async fn invoke_paged(
        &mut self,
        name: &str,
        offset: i64,
        limit: i64,
        payload: Map,
    ) -> (i64, Vec<Map>) {
        let engine = Arc::clone(&self.engine);
        let (count, items, outcome) = engine
            .invoke_paged(self, name, offset, limit, payload, None)
            .await;
        self.outcome = Some(outcome);
        (count, items)
    }

    pub async fn invoke_related(&mut self, name: &str, payload: Map) -> (Map, Vec<Map>) {
        let engine = Arc::clone(&self.engine);
        let (item, items, outcome) = engine.invoke_related(self, name, payload, None).await;
        self.outcome = Some(outcome);
        (item, items)
    }

    pub async fn invoke_count(&mut self, name: &str, payload: Map) -> f64 {
        let engine = Arc::clone(&self.engine);
        let (count, outcome) = engine.invoke_count(self, name, payload, None).await;
        self.outcome = Some(outcome);
        count
    }

    /// Handle on the methods under `"<name>."`, sharing this context.
    pub fn library(&mut self, name: &str, settings: Map) -> Library<'_> {
        Library {
            context: self,
            prefix: name.to_string(),
            settings,
        }
    }
}

impl Drop for CallContext {
    fn drop(&mut self) {
        self.close();
    }
}

/// Methods grouped under a name prefix, invoked with shared default settings.
pub struct Library<'a> {
    context: &'a mut CallContext,
    prefix: String,
    settings: Map,
}

impl Library<'_> {
    pub fn name(&self) -> &str {
        &self.prefix
    }

    fn naming(&self, name: &str) -> String {
        format!("{}.{}", self.prefix, name)
    }

    pub fn result(&mut self) -> Outcome {
        self.context.result()
    }

    pub async fn invoke(&mut self, name: &str, payload: Map) -> Map {
        let name = self.naming(name);
        let engine = Arc::clone(&self.context.engine);
        let (data, outcome) = engine
            .invoke(self.context, &name, payload, Some(&self.settings))
            .await;
        self.context.outcome = Some(outcome);
        data
    }

    pub async fn invoke_many(&mut self, name: &str, payload: Map) -> Vec<Map> {
        let name = self.naming(name);
        let engine = Arc::clone(&self.context.engine);
        let (items, outcome) = engine
            .invoke_many(self.context, &name, payload, Some(&self.settings))
            .await;
        self.context.outcome = Some(outcome);
        items
    }

    pub async fn invoke_exists(&mut self, name: &str, payload: Map) -> bool {
        let name = self.naming(name);
        let engine = Arc::clone(&self.context.engine);
        let (exists, outcome) = engine
            .invoke_exists(self.context, &name, payload, Some(&self.settings))
            .await;
        self.context.outcome = Some(outcome);
        exists
    }

    pub async fn invoke_paged(
        &mut self,
        name: &str,
        offset: i64,
        limit: i64,
        payload: Map,
    ) -> (i64, Vec<Map>) {
        let name = self.naming(name);
        let engine = Arc::clone(&self.context.engine);
        let (count, items, outcome) = engine
            .invoke_paged(self.context, &name, offset, limit, payload, Some(&self.settings))
            .await;
        self.context.outcome = Some(outcome);
        (count, items)
    }

    pub async fn invoke_related(&mut self, name: &str, payload: Map) -> (Map, Vec<Map>) {
        let name = self.naming(name);
        let engine = Arc::clone(&self.context.engine);
        let (item, items, outcome) = engine
            .invoke_related(self.context, &name, payload, Some(&self.settings))
            .await;
        self.context.outcome = Some(outcome);
        (item, items)
    }

    pub async fn invoke_count(&mut self, name: &str, payload: Map) -> f64 {
        let name = self.naming(name);
        let engine = Arc::clone(&self.context.engine);
        let (count, outcome) = engine
            .invoke_count(self.context, &name, payload, Some(&self.settings))
            .await;
        self.context.outcome = Some(outcome);
        count
    }
}
