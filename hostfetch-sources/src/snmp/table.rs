//! Table retrieval.
//!
//! Each column of a tree is walked separately (once per context) and the
//! columns are joined on their OID index suffix.

use std::collections::{HashMap, HashSet};

use hostfetch_core::{OidEncoding, SnmpRowInfo, SnmpTable, SnmpTree, SnmpValue};
use hostfetch_fetch::FetchFailure;
use hostfetch_store::{WalkCache, WalkCacheKey, context_hash};
use tracing::{instrument, trace};

use super::backend::SnmpBackend;

/// Walks `fetchoid` in every context, consulting the walk cache first.
async fn walk_column(
    fetchoid: &str,
    persist: bool,
    contexts: &[String],
    walk_cache: &mut WalkCache,
    backend: &mut dyn SnmpBackend,
) -> Result<SnmpRowInfo, FetchFailure> {
    let mut rows = SnmpRowInfo::new();
    for context in contexts {
        let key = WalkCacheKey::new(fetchoid, context_hash(context), persist);
        if let Some(cached) = walk_cache.get(&key) {
            trace!(oid = %fetchoid, context = %context, "Walk cache hit");
            rows.extend(cached.iter().cloned());
            continue;
        }
        let walked = backend.walk(fetchoid, context).await?;
        rows.extend(walked.iter().cloned());
        walk_cache.insert(key, walked);
    }
    Ok(rows)
}

/// Index suffix of `oid` below `fetchoid` (empty for the column itself).
fn index_of<'a>(oid: &'a str, fetchoid: &str) -> &'a str {
    oid.strip_prefix(fetchoid)
        .map_or(oid, |rest| rest.trim_start_matches('.'))
}

/// Fetches one tree as a table of rows.
///
/// Rows appear in the order their index is first seen across the
/// columns. Cells a column does not have are empty text.
#[instrument(skip_all, fields(base = %tree.base, columns = tree.oids.len()))]
pub async fn get_snmp_table(
    tree: &SnmpTree,
    contexts: &[String],
    walk_cache: &mut WalkCache,
    backend: &mut dyn SnmpBackend,
) -> Result<SnmpTable, FetchFailure> {
    let mut row_order: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut columns: Vec<HashMap<String, SnmpValue>> = Vec::with_capacity(tree.oids.len());

    for spec in &tree.oids {
        let fetchoid = tree.fetch_oid(spec);
        let rows = walk_column(&fetchoid, spec.save_to_cache, contexts, walk_cache, backend).await?;

        let mut column = HashMap::with_capacity(rows.len());
        for (oid, value) in rows {
            let index = index_of(&oid, &fetchoid).to_string();
            if !column.contains_key(&index) {
                if seen.insert(index.clone()) {
                    row_order.push(index.clone());
                }
                let value = match spec.encoding {
                    OidEncoding::Binary => value.into_binary(),
                    OidEncoding::String => value,
                };
                column.insert(index, value);
            }
        }
        columns.push(column);
    }

    let table = row_order
        .iter()
        .map(|index| {
            columns
                .iter()
                .map(|column| {
                    column
                        .get(index)
                        .cloned()
                        .unwrap_or_else(|| SnmpValue::text(""))
                })
                .collect()
        })
        .collect();
    Ok(table)
}

// ============================================================================
// Tests
// ============================================================================
