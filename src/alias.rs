//! Short-name → fully-qualified-name resolution.
//!
//! Type names recovered from doc comments are written the way the declaring
//! file spells them: bare, partially qualified, or absolute. Resolution
//! needs the declaring location's import table, which is parsed from its
//! raw `use` lines. Tables are a pure function of the location, so they are
//! built lazily and cached for the process lifetime with an
//! insert-if-absent discipline; losing a race just recomputes an identical
//! table.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

use crate::descriptor::SourceLocation;

static USE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*use\s+(?P<path>(?:\w+::)*)(?P<name>\w+)(?:\s+as\s+(?P<alias>\w+))?\s*;")
        .expect("use-line regex")
});

static TABLES: Lazy<RwLock<HashMap<SourceLocation, Arc<AliasTable>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Import table of one source location: alias (or terminal name) → FQN.
#[derive(Debug, Default)]
pub struct AliasTable {
    imports: HashMap<String, String>,
}

impl AliasTable {
    fn build(imports: &str) -> Self {
        let mut table = HashMap::new();
        for line in imports.lines() {
            let Some(caps) = USE_LINE.captures(line) else {
                continue;
            };
            let name = &caps["name"];
            let full = format!("{}{}", &caps["path"], name);
            let key = caps
                .name("alias")
                .map_or(name, |m| m.as_str())
                .to_owned();
            table.insert(key, full);
        }
        Self { imports: table }
    }

    pub fn lookup(&self, alias: &str) -> Option<&str> {
        self.imports.get(alias).map(String::as_str)
    }
}

/// The (cached) alias table for a location.
pub fn table_for(location: &SourceLocation) -> Arc<AliasTable> {
    if let Ok(tables) = TABLES.read() {
        if let Some(table) = tables.get(location) {
            return Arc::clone(table);
        }
    }
    trace!(module = location.module, "building alias table");
    let built = Arc::new(AliasTable::build(location.imports));
    match TABLES.write() {
        Ok(mut tables) => Arc::clone(tables.entry(*location).or_insert(built)),
        // A poisoned cache only costs us the memoization.
        Err(_) => built,
    }
}

/// Resolve a type name as written in a doc comment at `location` to a
/// fully-qualified name.
///
/// `::`-prefixed names are absolute and pass through (prefix stripped);
/// names containing a separator are rooted at the declaring module; bare
/// names go through the import table, falling back to the declaring module.
pub fn resolve(name: &str, location: &SourceLocation) -> String {
    if let Some(absolute) = name.strip_prefix("::") {
        return absolute.to_owned();
    }
    if name.contains("::") {
        return format!("{}::{}", location.module, name);
    }
    if let Some(full) = table_for(location).lookup(name) {
        return full.to_owned();
    }
    format!("{}::{}", location.module, name)
}
