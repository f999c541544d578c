//! Reading per-resource timestamps out of output records.

use agentflow_core::{ActionKind, Error, Renderer, Result, WaitError};
use serde_json::Value;
use std::path::Path;

/// Current timestamp of `id` in `kind`'s output record.
///
/// The record is evaluated to JSON by the renderer. Timestamps may appear as
/// integers, floats, numeric strings or `{ "value": n }` duration objects, and
/// are compared at full precision.
pub async fn current_timestamp(
    renderer: &dyn Renderer,
    record: &Path,
    kind: ActionKind,
    id: &str,
) -> Result<f64> {
    let value = renderer.evaluate_json(record).await?;

    let entry = value
        .get(kind.record_block())
        .and_then(|block| block.get(id))
        .filter(|entry| !entry.is_null())
        .ok_or_else(|| WaitError::ResourceMissing {
            id: id.to_string(),
            record: record.to_path_buf(),
        })?;

    entry
        .get("timestamp")
        .and_then(timestamp_value)
        .ok_or_else(|| {
            WaitError::TimestampUnset {
                id: id.to_string(),
                record: record.to_path_buf(),
            }
            .into()
        })
}

/// Timestamp before a resource runs.
///
/// A record that does not exist yet, or one without a stamped entry for `id`,
/// counts as 0. Renderer failures and unreadable records are returned.
pub async fn timestamp_or_zero(
    renderer: &dyn Renderer,
    record: &Path,
    kind: ActionKind,
    id: &str,
) -> Result<f64> {
    let exists = tokio::fs::try_exists(record)
        .await
        .map_err(|e| Error::io(record, e))?;
    if !exists {
        return Ok(0.0);
    }
    match current_timestamp(renderer, record, kind, id).await {
        Ok(ts) => Ok(ts),
        Err(Error::Wait(
            WaitError::ResourceMissing { .. } | WaitError::TimestampUnset { .. },
        )) => Ok(0.0),
        Err(e) => Err(e),
    }
}

fn timestamp_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Object(map) => map.get("value").and_then(timestamp_value),
        _ => None,
    }
    .filter(|ts| ts.is_finite() && *ts >= 0.0)
}
