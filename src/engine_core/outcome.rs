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

//! Outcome catalogue.
//!
//! An [`Outcome`] is an immutable `(code, state, args)` value. Code 0 is the
//! only success code. Message text is never stored on the outcome; it is
//! resolved on demand through a [`StringLookup`], normally the kernel's
//! [`LocaleTable`].

use crate::engine_core::constants::{locale, outcome as codes};
use crate::engine_core::policy::OverridePolicy;
use crate::engine_core::traits::StringLookup;
use crate::engine_core::value::Value;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    code: i32,
    state: Cow<'static, str>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    args: Vec<Value>,
}

impl Outcome {
    pub const OK: Outcome = Outcome::builtin(codes::OK, "ok");
    pub const FAIL: Outcome = Outcome::builtin(codes::FAIL, "fail");
    pub const RETRY: Outcome = Outcome::builtin(codes::RETRY, "retry");
    pub const INVALID: Outcome = Outcome::builtin(codes::INVALID, "invalid");
    pub const NOTHING: Outcome = Outcome::builtin(codes::NOTHING, "nothing");
    pub const UNSIGNED: Outcome = Outcome::builtin(codes::UNSIGNED, "unsigned");
    pub const UNAUTHED: Outcome = Outcome::builtin(codes::UNAUTHED, "unauthed");
    pub const VAR_EMPTY: Outcome = Outcome::builtin(codes::VAR_EMPTY, "varempty");
    pub const VAR_ERROR: Outcome = Outcome::builtin(codes::VAR_ERROR, "varerror");

    const fn builtin(code: i32, state: &'static str) -> Self {
        Self {
            code,
            state: Cow::Borrowed(state),
            args: Vec::new(),
        }
    }

    pub fn new(code: i32, state: impl Into<String>) -> Self {
        Self {
            code,
            state: Cow::Owned(state.into()),
            args: Vec::new(),
        }
    }

    /// Wrap a raw error; the error text becomes the state key.
    pub fn from_error(err: impl fmt::Display) -> Self {
        Self::new(codes::ERROR, err.to_string())
    }

    pub fn code(&self) -> i32 {
        self.code
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn is_ok(&self) -> bool {
        self.code == codes::OK
    }

    pub fn is_fail(&self) -> bool {
        !self.is_ok()
    }

    /// Same code and state, ignoring arguments.
    pub fn is(&self, other: &Outcome) -> bool {
        self.code == other.code && self.state == other.state
    }

    /// A new outcome carrying `args`; the receiver is left untouched.
    pub fn with<I, T>(&self, args: I) -> Outcome
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        Outcome {
            code: self.code,
            state: self.state.clone(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Render the message in `locale`.
    pub fn text(&self, strings: &dyn StringLookup, locale: &str) -> String {
        strings.lookup(locale, &self.state, &self.args)
    }
}

impl Default for Outcome {
    fn default() -> Self {
        Outcome::OK
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.state)?;
        if !self.args.is_empty() {
            let args: Vec<String> = self.args.iter().map(|a| a.to_string()).collect();
            write!(f, " ({})", args.join(", "))?;
        }
        Ok(())
    }
}

impl std::error::Error for Outcome {}

/// Registered state codes plus their default-locale templates.
pub struct OutcomeRegistry {
    codes: RwLock<HashMap<String, i32>>,
    strings: Arc<LocaleTable>,
    policy: Arc<OverridePolicy>,
}

impl OutcomeRegistry {
    pub fn new(strings: Arc<LocaleTable>, policy: Arc<OverridePolicy>) -> Self {
        let registry = Self {
            codes: RwLock::new(HashMap::new()),
            strings,
            policy,
        };
        for (outcome, text) in [
            (Outcome::OK, "Success"),
            (Outcome::FAIL, "Failed"),
            (Outcome::RETRY, "Please retry"),
            (Outcome::INVALID, "Invalid request"),
            (Outcome::NOTHING, "Nothing found"),
            (Outcome::UNSIGNED, "Signature required"),
            (Outcome::UNAUTHED, "Authorization required"),
            (Outcome::VAR_EMPTY, "%s must not be empty"),
            (Outcome::VAR_ERROR, "%s is invalid"),
        ] {
            registry.define(outcome.code(), outcome.state(), text);
        }
        registry
    }

    /// Register `state` with `code` and its default text.
    ///
    /// With override disabled an existing state keeps its first code and the
    /// returned outcome reflects that code.
    pub fn define(&self, code: i32, state: &str, text: &str) -> Outcome {
        let mut table = self.codes.write();
        let exists = table.contains_key(state);
        if self.policy.admit("outcome", state, exists) {
            table.insert(state.to_string(), code);
            self.strings.insert(self.strings.default_locale(), state, text);
            Outcome::new(code, state)
        } else {
            let kept = table.get(state).copied().unwrap_or(code);
            Outcome::new(kept, state)
        }
    }

    pub fn code_of(&self, state: &str, default: i32) -> i32 {
        self.codes.read().get(state).copied().unwrap_or(default)
    }

    pub fn get(&self, state: &str) -> Option<Outcome> {
        self.codes
            .read()
            .get(state)
            .map(|code| Outcome::new(*code, state))
    }

    /// Every registered state rendered in `locale`.
    pub fn catalogue(&self, locale: &str) -> BTreeMap<String, String> {
        let states: Vec<String> = self.codes.read().keys().cloned().collect();
        states
            .into_iter()
            .map(|state| {
                let text = self.strings.lookup(locale, &state, &[]);
                (state, text)
            })
            .collect()
    }

    pub fn strings(&self) -> &Arc<LocaleTable> {
        &self.strings
    }

    /// Outcomes scoped to a domain, with failure codes starting at 1000.
    pub fn group(self: &Arc<Self>, name: &str) -> OutcomeGroup {
        OutcomeGroup {
            name: name.to_string(),
            next: Mutex::new(codes::GROUP_BASE),
            registry: Arc::clone(self),
        }
    }
}

/// Per-domain outcome namespace.
pub struct OutcomeGroup {
    name: String,
    next: Mutex<i32>,
    registry: Arc<OutcomeRegistry>,
}

impl OutcomeGroup {
    pub fn with_base(self, base: i32) -> Self {
        *self.next.lock() = base.max(1);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn key(&self, state: &str) -> String {
        format!("{}.{}", self.name, state)
    }

    /// Register a failing outcome with the next free code.
    pub fn fail(&self, state: &str, text: &str) -> Outcome {
        let code = {
            let mut next = self.next.lock();
            let code = *next;
            *next += 1;
            code
        };
        self.registry.define(code, &self.key(state), text)
    }

    pub fn success(&self, state: &str, text: &str) -> Outcome {
        self.registry.define(codes::OK, &self.key(state), text)
    }
}

/// One language's strings.
#[derive(Debug, Clone, Default)]
pub struct Language {
    pub name: String,
    pub accepts: Vec<String>,
    pub strings: HashMap<String, String>,
}

/// In-memory string table keyed by locale.
pub struct LocaleTable {
    default_locale: String,
    languages: RwLock<HashMap<String, Language>>,
}

impl LocaleTable {
    pub fn new(default_locale: &str) -> Self {
        let default_locale = if default_locale.is_empty() {
            locale::DEFAULT.to_string()
        } else {
            default_locale.to_string()
        };
        let mut languages = HashMap::new();
        languages.insert(
            default_locale.clone(),
            Language {
                name: default_locale.clone(),
                ..Default::default()
            },
        );
        Self {
            default_locale,
            languages: RwLock::new(languages),
        }
    }

    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }

    /// Declare a language and the locale tags it answers to.
    pub fn language(&self, name: &str, accepts: &[&str]) {
        let mut languages = self.languages.write();
        let entry = languages.entry(name.to_string()).or_insert_with(|| Language {
            name: name.to_string(),
            ..Default::default()
        });
        entry.accepts = accepts.iter().map(|a| a.to_lowercase()).collect();
    }

    pub fn insert(&self, locale: &str, key: &str, text: &str) {
        let mut languages = self.languages.write();
        let entry = languages
            .entry(locale.to_string())
            .or_insert_with(|| Language {
                name: locale.to_string(),
                ..Default::default()
            });
        entry.strings.insert(normalize_key(key), text.to_string());
    }

    fn resolve(&self, locale: &str, key: &str) -> Option<String> {
        let languages = self.languages.read();
        let key = normalize_key(key);
        if let Some(text) = languages.get(locale).and_then(|l| l.strings.get(&key)) {
            return Some(text.clone());
        }
        let wanted = locale.to_lowercase();
        languages
            .values()
            .filter(|l| l.accepts.iter().any(|a| *a == wanted))
            .find_map(|l| l.strings.get(&key).cloned())
    }
}

impl StringLookup for LocaleTable {
    fn lookup(&self, locale: &str, key: &str, args: &[Value]) -> String {
        let template = self
            .resolve(locale, key)
            .or_else(|| self.resolve(&self.default_locale, key))
            .unwrap_or_else(|| key.to_string());
        format_template(&template, args)
    }
}

fn normalize_key(key: &str) -> String {
    key.replace('.', "_")
}

enum Piece<'a> {
    Literal(&'a str),
    Percent,
    Verb(char),
}

fn parse_template(template: &str) -> Vec<Piece<'_>> {
    let mut pieces = Vec::new();
    let bytes = template.as_bytes();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'%' {
            i += 1;
            continue;
        }
        if start < i {
            pieces.push(Piece::Literal(&template[start..i]));
        }
        let mut j = i + 1;
        if j < bytes.len() && bytes[j] == b'%' {
            pieces.push(Piece::Percent);
            i = j + 1;
            start = i;
            continue;
        }
        while j < bytes.len() && matches!(bytes[j], b'-' | b'+' | b'#' | b' ' | b'.' | b'0'..=b'9')
        {
            j += 1;
        }
        if j < bytes.len() && bytes[j].is_ascii_alphabetic() {
            pieces.push(Piece::Verb(bytes[j] as char));
            i = j + 1;
        } else {
            pieces.push(Piece::Literal(&template[i..j]));
            i = j;
        }
        start = i;
    }
    if start < bytes.len() {
        pieces.push(Piece::Literal(&template[start..]));
    }
    pieces
}

/// Substitute `%`-style placeholders when their count matches `args`.
///
/// A mismatch (including no args) leaves the template untouched.
pub fn format_template(template: &str, args: &[Value]) -> String {
    if args.is_empty() {
        return template.to_string();
    }
    let pieces = parse_template(template);
    let verbs = pieces.iter().filter(|p| matches!(p, Piece::Verb(_))).count();
    if verbs != args.len() {
        return template.to_string();
    }
    let mut out = String::with_capacity(template.len());
    let mut args = args.iter();
    for piece in pieces {
        match piece {
            Piece::Literal(s) => out.push_str(s),
            Piece::Percent => out.push('%'),
            Piece::Verb('q') => {
                if let Some(arg) = args.next() {
                    out.push_str(&format!("{:?}", arg.to_string()));
                }
            }
            Piece::Verb(_) => {
                if let Some(arg) = args.next() {
                    out.push_str(&arg.to_string());
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Arc<OutcomeRegistry> {
        Arc::new(OutcomeRegistry::new(
            Arc::new(LocaleTable::new("default")),
            Arc::new(OverridePolicy::default()),
        ))
    }

    #[test]
    fn test_with_does_not_mutate() {
        let base = Outcome::VAR_EMPTY;
        let filled = base.with(["age"]);
        assert!(base.args().is_empty());
        assert_eq!(filled.args(), &[Value::from("age")]);
        assert!(filled.is(&Outcome::VAR_EMPTY));
    }

    #[test]
    fn test_only_ok_is_success() {
        assert!(Outcome::OK.is_ok());
        for o in [Outcome::FAIL, Outcome::NOTHING, Outcome::VAR_ERROR] {
            assert!(o.is_fail());
        }
        assert_eq!(Outcome::from_error("boom").code(), -1);
    }

    #[test]
    fn test_builtin_text_renders() {
        let registry = registry();
        let text = Outcome::VAR_EMPTY
            .with(["age"])
            .text(registry.strings().as_ref(), "default");
        assert_eq!(text, "age must not be empty");
    }

    #[test]
    fn test_group_codes_are_sequential() {
        let registry = registry();
        let group = registry.group("user");
        let a = group.fail("missing", "User missing");
        let b = group.fail("locked", "User locked");
        let c = group.success("created", "User created");
        assert_eq!(a.code(), 1000);
        assert_eq!(b.code(), 1001);
        assert_eq!(c.code(), 0);
        assert_eq!(a.state(), "user.missing");
        assert_eq!(registry.code_of("user.locked", -5), 1001);
    }

    #[test]
    fn test_strict_once_keeps_first_code() {
        let strings = Arc::new(LocaleTable::new("default"));
        let policy = Arc::new(OverridePolicy::new(false));
        let registry = OutcomeRegistry::new(strings, policy);
        registry.define(42, "custom", "first");
        let again = registry.define(43, "custom", "second");
        assert_eq!(again.code(), 42);
        assert_eq!(registry.catalogue("default")["custom"], "first");
    }

    #[test]
    fn test_locale_fallbacks() {
        let table = LocaleTable::new("default");
        table.insert("default", "user.missing", "User %s missing");
        table.insert("zh-CN", "user.missing", "用户%s不存在");
        table.language("zh-CN", &["zh", "zh-cn", "zh-hans"]);

        let args = [Value::from("bob")];
        assert_eq!(table.lookup("zh-CN", "user.missing", &args), "用户bob不存在");
        assert_eq!(table.lookup("zh-Hans", "user.missing", &args), "用户bob不存在");
        assert_eq!(table.lookup("fr", "user.missing", &args), "User bob missing");
        assert_eq!(table.lookup("fr", "not.there", &[]), "not.there");
    }

    #[test]
    fn test_placeholder_count_must_match() {
        let args = [Value::from(1), Value::from(2)];
        assert_eq!(format_template("%d of %d", &args), "1 of 2");
        assert_eq!(format_template("%d only", &args), "%d only");
        assert_eq!(format_template("100%% of %v and %s", &args), "100% of 1 and 2");
        assert_eq!(format_template("%s", &[]), "%s");
    }
}
