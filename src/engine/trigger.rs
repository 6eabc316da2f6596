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

//! Lifecycle hooks.
//!
//! Hooks are ordinary methods registered under generated names. "start"
//! hooks are spawned as independent tasks; "stop" hooks run one after
//! another and are awaited, so shutdown knows they have finished.

use crate::engine::dispatcher::Engine;
use crate::engine::method::MethodDeclaration;
use crate::engine_core::constants::trigger;
use crate::engine_core::outcome::Outcome;
use crate::engine_core::value::Map;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub struct Triggers {
    engine: Arc<Engine>,
    hooks: RwLock<HashMap<String, Vec<String>>>,
    counter: AtomicUsize,
}

impl Triggers {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self {
            engine,
            hooks: RwLock::new(HashMap::new()),
            counter: AtomicUsize::new(0),
        }
    }

    /// Register `hook` for `event` and return the method name it runs under.
    pub fn register(&self, event: &str, hook: MethodDeclaration) -> String {
        let seq = self.counter.fetch_add(1, Ordering::SeqCst);
        let name = format!("{}.trigger.{}", event, seq);
        self.engine.define(&name, hook);
        self.hooks
            .write()
            .entry(event.to_string())
            .or_default()
            .push(name.clone());
        name
    }

    /// Method names registered for `event`, in registration order.
    pub fn hooks(&self, event: &str) -> Vec<String> {
        self.hooks.read().get(event).cloned().unwrap_or_default()
    }

    /// Spawn every hook of `event` without waiting for any of them.
    pub fn fire(&self, event: &str) -> Vec<JoinHandle<Outcome>> {
        let hooks = self.hooks(event);
        debug!("Firing {} '{}' hooks", hooks.len(), event);
        hooks
            .into_iter()
            .map(|name| {
                let engine = Arc::clone(&self.engine);
                tokio::spawn(async move {
                    let (_, outcome) = engine.execute(&name, Map::new()).await;
                    if outcome.is_fail() {
                        warn!("Hook '{}' failed: {}", name, outcome);
                    }
                    outcome
                })
            })
            .collect()
    }

    /// Run every hook of `event` in order, each to completion.
    pub async fn fire_sequential(&self, event: &str) -> Vec<Outcome> {
        let mut outcomes = Vec::new();
        for name in self.hooks(event) {
            let (_, outcome) = self.engine.execute(&name, Map::new()).await;
            if outcome.is_fail() {
                warn!("Hook '{}' failed: {}", name, outcome);
            }
            outcomes.push(outcome);
        }
        outcomes
    }

    pub fn start(&self) -> Vec<JoinHandle<Outcome>> {
        self.fire(trigger::START)
    }

    pub async fn stop(&self) -> Vec<Outcome> {
        self.fire_sequential(trigger::STOP).await
    }
}
