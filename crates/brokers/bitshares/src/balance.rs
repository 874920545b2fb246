//! Balance payload normalization.
//!
//! The bridge hands back balances in whatever shape the underlying BitShares
//! library produced. The payload is classified once into a [`BalancePayload`]
//! and each variant has its own normalizer; all of them funnel per-asset
//! quantities through [`Quantities::resolve`].

use dexbridge_core::Balances;
use serde_json::{Map, Value};

const ASSET_KEYS: &[&str] = &["symbol", "asset", "currency", "name"];
const TOTAL_KEYS: &[&str] = &["total", "amount", "balance", "value"];
const FREE_KEYS: &[&str] = &["free", "available"];
const USED_KEYS: &[&str] = &["used", "locked", "hold"];
/// Top-level keys of a flat mapping that are never asset codes.
const RESERVED_KEYS: &[&str] = &["info", "success", "status"];

/// Shape of a raw balance payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BalancePayload<'a> {
    /// Already `{free, used, total}` partitioned.
    AlreadyUnified(&'a Map<String, Value>),
    /// A list of per-asset records.
    RecordList(&'a [Value]),
    /// Asset code to total amount.
    FlatMapping(&'a Map<String, Value>),
    Unknown,
}

impl<'a> BalancePayload<'a> {
    pub fn classify(raw: &'a Value) -> Self {
        match raw {
            Value::Object(map) if map.contains_key("free") || map.contains_key("total") => {
                BalancePayload::AlreadyUnified(map)
            }
            Value::Array(items) => BalancePayload::RecordList(items),
            Value::Object(map) => BalancePayload::FlatMapping(map),
            _ => BalancePayload::Unknown,
        }
    }
}

/// Whatever is known about one asset before gaps are filled.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Quantities {
    pub total: Option<f64>,
    pub free: Option<f64>,
    pub used: Option<f64>,
}

impl Quantities {
    pub fn total_only(total: f64) -> Self {
        Self {
            total: Some(total),
            ..Default::default()
        }
    }

    /// Fill missing quantities so that `total = free + used`.
    ///
    /// Returns `(free, used, total)`, or `None` when nothing is known.
    pub fn resolve(self) -> Option<(f64, f64, f64)> {
        match (self.total, self.free, self.used) {
            (_, Some(free), Some(used)) => Some((free, used, free + used)),
            (Some(total), None, Some(used)) => Some((total - used, used, total)),
            (Some(total), Some(free), None) => Some((free, total - free, total)),
            (Some(total), None, None) => Some((total, 0.0, total)),
            (None, Some(free), None) => Some((free, 0.0, free)),
            (None, None, Some(used)) => Some((0.0, used, used)),
            (None, None, None) => None,
        }
    }
}

/// Normalize any recognized balance payload into [`Balances`].
pub fn unify_balance(raw: Value) -> Balances {
    let mut out = Balances::default();
    match BalancePayload::classify(&raw) {
        BalancePayload::AlreadyUnified(map) => {
            unify_partitioned(map, &mut out);
            out.info = map.get("info").cloned().unwrap_or_else(|| raw.clone());
            return out;
        }
        BalancePayload::RecordList(items) => unify_records(items, &mut out),
        BalancePayload::FlatMapping(map) => unify_flat(map, &mut out),
        BalancePayload::Unknown => {}
    }
    out.info = raw;
    out
}

fn unify_partitioned(map: &Map<String, Value>, out: &mut Balances) {
    let mut assets: std::collections::BTreeMap<String, Quantities> = Default::default();
    for (part, slot) in [
        ("free", Partition::Free),
        ("used", Partition::Used),
        ("total", Partition::Total),
    ] {
        let Some(Value::Object(entries)) = map.get(part) else {
            continue;
        };
        for (asset, value) in entries {
            if let Some(amount) = coerce(value) {
                slot.set(assets.entry(asset.clone()).or_default(), amount);
            }
        }
    }
    for (asset, quantities) in assets {
        add(out, asset, quantities);
    }
}

fn unify_records(items: &[Value], out: &mut Balances) {
    for item in items {
        let Value::Object(record) = item else {
            continue;
        };
        let Some(asset) = ASSET_KEYS
            .iter()
            .find_map(|k| record.get(*k).and_then(asset_code))
        else {
            continue;
        };
        let quantities = Quantities {
            total: first_amount(record, TOTAL_KEYS),
            free: first_amount(record, FREE_KEYS),
            used: first_amount(record, USED_KEYS),
        };
        add(out, asset, quantities);
    }
}

fn unify_flat(map: &Map<String, Value>, out: &mut Balances) {
    for (asset, value) in map {
        if RESERVED_KEYS.contains(&asset.as_str()) {
            continue;
        }
        if let Some(total) = coerce(value) {
            add(out, asset.clone(), Quantities::total_only(total));
        }
    }
}

fn add(out: &mut Balances, asset: String, quantities: Quantities) {
    if let Some((free, used, total)) = quantities.resolve() {
        out.insert(asset, free, used, total);
    }
}

#[derive(Clone, Copy)]
enum Partition {
    Free,
    Used,
    Total,
}

impl Partition {
    fn set(self, q: &mut Quantities, amount: f64) {
        match self {
            Partition::Free => q.free = Some(amount),
            Partition::Used => q.used = Some(amount),
            Partition::Total => q.total = Some(amount),
        }
    }
}

/// Value of the first alias key that is present and not null, coerced.
fn first_amount(record: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .find_map(|k| record.get(*k).filter(|v| !v.is_null()))
        .and_then(coerce)
}

fn asset_code(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Numbers and numeric strings become `f64`; anything else is dropped.
fn coerce(value: &Value) -> Option<f64> {
    let amount = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    amount.is_finite().then_some(amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn test_classify() {
        assert!(matches!(
            BalancePayload::classify(&json!({"total": {}})),
            BalancePayload::AlreadyUnified(_)
        ));
        assert!(matches!(
            BalancePayload::classify(&json!({"free": {}})),
            BalancePayload::AlreadyUnified(_)
        ));
        assert!(matches!(
            BalancePayload::classify(&json!([])),
            BalancePayload::RecordList(_)
        ));
        assert!(matches!(
            BalancePayload::classify(&json!({"BTS": 1})),
            BalancePayload::FlatMapping(_)
        ));
        assert_eq!(BalancePayload::classify(&json!("oops")), BalancePayload::Unknown);
        assert_eq!(BalancePayload::classify(&Value::Null), BalancePayload::Unknown);
    }

    #[test]
    fn test_resolve_rules() {
        let q = |total, free, used| Quantities { total, free, used };
        assert_eq!(q(Some(10.0), Some(6.0), None).resolve(), Some((6.0, 4.0, 10.0)));
        assert_eq!(q(Some(10.0), None, None).resolve(), Some((10.0, 0.0, 10.0)));
        assert_eq!(q(Some(10.0), None, Some(3.0)).resolve(), Some((7.0, 3.0, 10.0)));
        assert_eq!(q(None, Some(2.0), Some(3.0)).resolve(), Some((2.0, 3.0, 5.0)));
        assert_eq!(q(None, Some(2.0), None).resolve(), Some((2.0, 0.0, 2.0)));
        assert_eq!(q(None, None, Some(3.0)).resolve(), Some((0.0, 3.0, 3.0)));
        assert_eq!(q(None, None, None).resolve(), None);
    }

    #[test]
    fn test_unified_payload_is_consistent() {
        let raw = json!({
            "free": {"BTS": "6.5", "USD": 1, "BAD": "n/a"},
            "used": {"BTS": 3.5},
            "total": {"BTS": 10, "CNY": 4},
            "info": {"source": "bridge"}
        });
        let b = unify_balance(raw);
        assert_eq!(b.info, json!({"source": "bridge"}));
        for asset in b.assets() {
            assert_close(b.total[asset], b.free[asset] + b.used[asset]);
        }
        assert_close(b.free["BTS"], 6.5);
        assert_close(b.used["BTS"], 3.5);
        assert_close(b.total["BTS"], 10.0);
        assert_close(b.free["CNY"], 4.0);
        assert_close(b.used["CNY"], 0.0);
        assert_close(b.total["USD"], 1.0);
        assert!(!b.total.contains_key("BAD"));
    }

    #[test]
    fn test_unified_payload_without_info_keeps_raw() {
        let raw = json!({"total": {"BTS": 2}});
        let b = unify_balance(raw.clone());
        assert_eq!(b.info, raw);
        assert_close(b.free["BTS"], 2.0);
    }

    #[test]
    fn test_unified_ignores_non_mapping_partition() {
        let b = unify_balance(json!({"total": {"BTS": 2}, "used": [1, 2]}));
        assert_close(b.used["BTS"], 0.0);
    }

    #[test]
    fn test_records_derive_used() {
        let b = unify_balance(json!([{"symbol": "BTS", "total": 10, "free": 6}]));
        assert_close(b.used["BTS"], 4.0);
        assert_close(b.free["BTS"], 6.0);
        assert_close(b.total["BTS"], 10.0);
    }

    #[test]
    fn test_records_total_only() {
        let b = unify_balance(json!([{"asset": "BTS", "amount": "10"}]));
        assert_close(b.total["BTS"], 10.0);
        assert_close(b.free["BTS"], 10.0);
        assert_close(b.used["BTS"], 0.0);
    }

    #[test]
    fn test_records_aliases_and_skips() {
        let raw = json!([
            {"currency": "USD", "balance": 5, "locked": 2},
            {"name": "CNY", "value": 8, "available": 8},
            {"amount": 3},
            "garbage",
            {"symbol": "EUR", "total": null, "amount": 7}
        ]);
        let b = unify_balance(raw.clone());
        assert_eq!(b.assets(), vec!["CNY", "EUR", "USD"]);
        assert_close(b.free["USD"], 3.0);
        assert_close(b.used["USD"], 2.0);
        assert_close(b.used["CNY"], 0.0);
        assert_close(b.total["EUR"], 7.0);
        assert_eq!(b.info, raw);
    }

    #[test]
    fn test_record_with_no_quantities_is_skipped() {
        let b = unify_balance(json!([{"symbol": "BTS", "amount": "lots"}]));
        assert!(b.is_empty());
    }

    #[test]
    fn test_flat_mapping() {
        let b = unify_balance(json!({"BTS": 5, "info": "ignore"}));
        assert_close(b.total["BTS"], 5.0);
        assert_close(b.free["BTS"], 5.0);
        assert_close(b.used["BTS"], 0.0);
        assert!(!b.total.contains_key("info"));
        assert!(!b.free.contains_key("info"));
    }

    #[test]
    fn test_flat_mapping_skips_reserved_and_junk() {
        let b = unify_balance(json!({"success": true, "status": "ok", "USD": "2.5", "X": {}}));
        assert_eq!(b.assets(), vec!["USD"]);
        assert_close(b.total["USD"], 2.5);
    }

    #[test]
    fn test_unknown_shape() {
        let b = unify_balance(json!(42));
        assert!(b.is_empty());
        assert_eq!(b.info, json!(42));
    }
}
