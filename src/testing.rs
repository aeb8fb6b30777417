//! Handlers shared by unit tests. Each tag handler appends its letter to the
//! array it receives, so a chain's execution order shows up in its result.

use serde_json::Value;

use crate::handler::{BoxFuture, HandlerResult};

fn push(prev: Value, tag: &str) -> Value {
    let mut seen = match prev {
        Value::Array(items) => items,
        _ => Vec::new(),
    };
    seen.push(Value::String(tag.to_string()));
    Value::Array(seen)
}

pub fn tags(result: &Value) -> Vec<&str> {
    result
        .as_array()
        .map(|items| items.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

pub fn tag_a<C>(_ctx: &C, prev: Value) -> BoxFuture<'_, HandlerResult> {
    Box::pin(async move { Ok(push(prev, "a")) })
}

pub fn tag_b<C>(_ctx: &C, prev: Value) -> BoxFuture<'_, HandlerResult> {
    Box::pin(async move { Ok(push(prev, "b")) })
}

pub fn tag_c<C>(_ctx: &C, prev: Value) -> BoxFuture<'_, HandlerResult> {
    Box::pin(async move { Ok(push(prev, "c")) })
}
