//! Container element-type recovery from structured doc comments.
//!
//! Descriptors erase the element type of container parameters (`Declared::
//! Container` says nothing about what the items are), so the engine
//! recovers it from the constructor's doc comment: an `@param` tag of the
//! form `@param list<T> $name ...` or `@param map<K, V> $name ...`, where
//! the type expression may be wrapped in a `| null` alternative and may
//! span multiple physical lines. This is a best-effort textual parse of
//! advisory documentation; each failure mode surfaces as its own decode
//! error rather than a silent guess.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::alias;
use crate::descriptor::SourceLocation;

static TAG_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^@(\w+)(?:\s+(.*))?$").expect("tag-line regex"));

static PARAM_BODY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<ty>.+)\s+\$(?P<name>\S+)").expect("param-body regex"));

static NULLABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:null\s*\|\s*)?(?P<ty>.+?)(?:\s*\|\s*null)?$").expect("nullable regex")
});

static LIST_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^list<\s*(?P<ty>.+?)\s*>$").expect("list-shape regex"));

static MAP_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^map<.+,\s*(?P<ty>.+?)\s*>$").expect("map-shape regex"));

/// Outcome of recovering a container's element/value type.
#[derive(Debug, PartialEq, Eq)]
pub enum Recovered {
    /// No doc comment, or no matching `@param` tag.
    Missing,
    /// A tag was found but its type expression has the wrong shape;
    /// carries the offending expression.
    Malformed(String),
    /// The fully-qualified element/value type.
    Type(String),
}

/// Split a doc comment into `(tag, body)` pairs. A line starting with
/// `@word` opens a tag; subsequent non-tag lines are appended to its body,
/// which is how multi-line type expressions survive. Docblock framing
/// (`* ` prefixes, a trailing `*/`) is tolerated and stripped.
pub fn parse_doc_tags(doc: &str) -> Vec<(String, String)> {
    let mut tags = Vec::new();
    let mut current: Option<(String, String)> = None;
    for line in doc.lines() {
        let mut line = line.trim();
        if let Some(rest) = line.strip_prefix("* ") {
            line = rest;
        } else if line == "*" {
            line = "";
        }
        if line == "*/" {
            break;
        }
        if let Some(caps) = TAG_LINE.captures(line) {
            if let Some(done) = current.take() {
                tags.push(done);
            }
            current = Some((
                caps[1].to_owned(),
                caps.get(2).map_or("", |m| m.as_str()).to_owned(),
            ));
            continue;
        }
        if let Some((_, body)) = current.as_mut() {
            body.push_str(line);
        }
    }
    if let Some(done) = current {
        tags.push(done);
    }
    tags
}

/// The declared type expression of a `@param` tag whose trailing `$name`
/// matches `param`. First match wins; tags whose body does not end in a
/// parameter sigil are skipped, never errors.
pub fn param_type(tags: &[(String, String)], param: &str) -> Option<String> {
    for (tag, body) in tags {
        if tag != "param" {
            continue;
        }
        let Some(caps) = PARAM_BODY.captures(body) else {
            continue;
        };
        if &caps["name"] != param {
            continue;
        }
        return Some(caps["ty"].to_owned());
    }
    None
}

/// Strip a leading or trailing `| null` alternative. Nullability is
/// informational only at this layer.
pub fn strip_nullable(expr: &str) -> String {
    match NULLABLE.captures(expr) {
        Some(caps) => caps["ty"].to_owned(),
        None => expr.to_owned(),
    }
}

fn list_item(expr: &str) -> Option<String> {
    LIST_SHAPE.captures(expr).map(|caps| caps["ty"].to_owned())
}

fn map_value(expr: &str) -> Option<String> {
    MAP_SHAPE.captures(expr).map(|caps| caps["ty"].to_owned())
}

/// Recover the item type of a list-typed constructor parameter. A present
/// tag that is not `list<T>` is `Malformed`; the decoder turns that into a
/// dedicated error, because silently guessing would corrupt data.
pub fn recover_list_item(
    doc: Option<&str>,
    param: &str,
    location: &SourceLocation,
) -> Recovered {
    recover(doc, param, location, list_item, true)
}

/// Recover the value type of a map-typed constructor parameter. Here a
/// non-matching tag counts as absent: the map side has no dedicated
/// malformed-tag error.
pub fn recover_map_value(
    doc: Option<&str>,
    param: &str,
    location: &SourceLocation,
) -> Recovered {
    recover(doc, param, location, map_value, false)
}

fn recover(
    doc: Option<&str>,
    param: &str,
    location: &SourceLocation,
    extract: fn(&str) -> Option<String>,
    malformed_is_error: bool,
) -> Recovered {
    let Some(doc) = doc else {
        return Recovered::Missing;
    };
    let Some(expr) = param_type(&parse_doc_tags(doc), param) else {
        return Recovered::Missing;
    };
    let stripped = strip_nullable(&expr);
    match extract(&stripped) {
        Some(inner) => Recovered::Type(alias::resolve(&inner, location)),
        None if malformed_is_error => Recovered::Malformed(stripped),
        None => Recovered::Missing,
    }
}
