//! Expansion of internal `$ref` pointers.
//!
//! Only document-local references (`#/definitions/Name`) are supported. An
//! object carrying a `$ref` is replaced by the resolved target with the
//! object's other keys laid on top of it.

use serde_json::{Map, Value};
use std::fmt;

/// Maximum number of nested reference expansions along one chain.
pub const MAX_REF_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    /// The reference is already being expanded further up the chain.
    Cycle(String),
    /// The chain of nested references exceeded [`MAX_REF_DEPTH`].
    TooDeep(String),
    /// The pointer does not lead anywhere in the document.
    Unresolved(String),
}

impl fmt::Display for ReferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceError::Cycle(r) => write!(f, "Cycle swagger reference in schema: {r}"),
            ReferenceError::TooDeep(r) => {
                write!(f, "Swagger reference nesting deeper than {MAX_REF_DEPTH} levels at: {r}")
            }
            ReferenceError::Unresolved(r) => write!(f, "Unresolvable swagger reference: {r}"),
        }
    }
}

impl std::error::Error for ReferenceError {}

/// Return a copy of `node` with every `$ref` expanded against `document`.
///
/// # Errors
///
/// Fails on cycles, on chains deeper than [`MAX_REF_DEPTH`], and on pointers
/// that do not resolve.
pub fn dereference(document: &Value, node: &Value) -> Result<Value, ReferenceError> {
    let mut chain = Vec::new();
    resolve(document, node, &mut chain)
}

fn resolve(document: &Value, node: &Value, chain: &mut Vec<String>) -> Result<Value, ReferenceError> {
    match node {
        Value::Object(map) => {
            let mut out = Map::new();
            let reference = map.get("$ref").and_then(Value::as_str);
            if let Some(reference) = reference {
                if chain.iter().any(|r| r == reference) {
                    return Err(ReferenceError::Cycle(reference.to_string()));
                }
                if chain.len() >= MAX_REF_DEPTH {
                    return Err(ReferenceError::TooDeep(reference.to_string()));
                }
                let target = lookup(document, reference)?;
                chain.push(reference.to_string());
                let resolved = resolve(document, target, chain);
                chain.pop();
                match resolved? {
                    Value::Object(fields) => out.extend(fields),
                    other if map.len() == 1 => return Ok(other),
                    _ => {
                        return Err(ReferenceError::Unresolved(format!(
                            "{reference} (target is not an object but has sibling keys)"
                        )))
                    }
                }
            }
            for (key, value) in map {
                if key == "$ref" && reference.is_some() {
                    continue;
                }
                out.insert(key.clone(), resolve(document, value, chain)?);
            }
            Ok(Value::Object(out))
        }
        Value::Array(items) => items
            .iter()
            .map(|item| resolve(document, item, chain))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        other => Ok(other.clone()),
    }
}

/// Follow a `#/a/b/c` pointer through the document.
fn lookup<'a>(document: &'a Value, reference: &str) -> Result<&'a Value, ReferenceError> {
    let unresolved = || ReferenceError::Unresolved(reference.to_string());
    let pointer = reference.strip_prefix('#').ok_or_else(unresolved)?;
    let mut current = document;
    for raw in pointer.split('/').filter(|s| !s.is_empty()) {
        let segment = raw.replace("~1", "/").replace("~0", "~");
        current = match current {
            Value::Object(map) => map.get(&segment).ok_or_else(unresolved)?,
            Value::Array(items) => segment
                .parse::<usize>()
                .ok()
                .and_then(|i| items.get(i))
                .ok_or_else(unresolved)?,
            _ => return Err(unresolved()),
        };
    }
    Ok(current)
}
