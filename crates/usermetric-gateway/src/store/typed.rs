//! Typed entity access on top of [`Datastore`].
//!
//! Decoding is lenient: a stored property that no longer exists in the current
//! shape, or whose value no longer fits it, is skipped and reported as
//! `ReadError::FieldMismatch` together with everything that did decode.

use serde_json::{Map, Value};

use usermetric_core::error::{FieldMismatch, ReadError, ReadResult};
use usermetric_core::key::EntityKey;
use usermetric_core::model::Entity;
use usermetric_core::StoreError;

use crate::context::RequestCtx;

use super::document::{Document, Query};
use super::Datastore;

pub async fn get_entity<T: Entity>(
    store: &dyn Datastore,
    ctx: &RequestCtx,
    key: &EntityKey,
) -> ReadResult<T> {
    let doc = ctx.run(store.get(ctx, key)).await?;
    decode(&doc)
}

pub async fn put_entity<T: Entity + Sync>(
    store: &dyn Datastore,
    ctx: &RequestCtx,
    key: &EntityKey,
    entity: &T,
) -> Result<EntityKey, StoreError> {
    let doc = Document::from_entity(entity)?;
    ctx.run(store.put(ctx, key, doc)).await
}

/// Decode every row; the first mismatch is reported after all rows are read.
pub async fn query_entities<T: Entity>(
    store: &dyn Datastore,
    ctx: &RequestCtx,
    q: &Query,
) -> ReadResult<Vec<(EntityKey, T)>> {
    let rows = ctx.run(store.query(ctx, q)).await?;

    let mut out = Vec::with_capacity(rows.len());
    let mut first: Option<FieldMismatch> = None;
    for (key, doc) in rows {
        match decode::<T>(&doc) {
            Ok(v) => out.push((key, v)),
            Err(ReadError::FieldMismatch { decoded, mismatch }) => {
                first.get_or_insert(mismatch);
                out.push((key, decoded));
            }
            Err(ReadError::Store(e)) => return Err(e.into()),
        }
    }

    match first {
        None => Ok(out),
        Some(mismatch) => Err(ReadError::FieldMismatch { decoded: out, mismatch }),
    }
}

pub async fn count_entities(
    store: &dyn Datastore,
    ctx: &RequestCtx,
    q: &Query,
) -> Result<usize, StoreError> {
    ctx.run(store.count(ctx, q)).await
}

/// Lenient document -> entity decode.
pub fn decode<T: Entity>(doc: &Document) -> ReadResult<T> {
    let template = serde_json::to_value(T::default())
        .map_err(|e| StoreError::Backend(format!("encode default {}: {e}", T::KIND)))?;

    let mut leaves = Vec::new();
    flatten(&doc.properties, &template, "", &mut leaves);

    let mut merged = template;
    let mut first: Option<FieldMismatch> = None;
    for (pointer, value) in leaves {
        let Some(slot) = merged.pointer_mut(&pointer) else {
            first.get_or_insert_with(|| mismatch::<T>(&pointer, "no such struct field".into()));
            continue;
        };
        let previous = std::mem::replace(slot, value.clone());
        if let Err(e) = serde_json::from_value::<T>(merged.clone()) {
            if let Some(slot) = merged.pointer_mut(&pointer) {
                *slot = previous;
            }
            first.get_or_insert_with(|| mismatch::<T>(&pointer, e.to_string()));
        }
    }

    let decoded: T = serde_json::from_value(merged)
        .map_err(|e| StoreError::Backend(format!("decode {}: {e}", T::KIND)))?;

    match first {
        None => Ok(decoded),
        Some(mismatch) => Err(ReadError::FieldMismatch { decoded, mismatch }),
    }
}

/// Collect `(json pointer, value)` for every stored leaf, descending only where
/// the current shape also has a nested struct.
fn flatten<'a>(stored: &'a Map<String, Value>, template: &Value, prefix: &str, out: &mut Vec<(String, &'a Value)>) {
    for (name, value) in stored {
        let pointer = format!("{prefix}/{name}");
        match (value, template.get(name)) {
            (Value::Object(inner), Some(t @ Value::Object(_))) => flatten(inner, t, &pointer, out),
            _ => out.push((pointer, value)),
        }
    }
}

fn mismatch<T: Entity>(pointer: &str, reason: String) -> FieldMismatch {
    FieldMismatch {
        kind: T::KIND.to_string(),
        field: pointer.trim_start_matches('/').replace('/', "."),
        reason,
    }
}
