// [libs/core/admission/src/fair.rs]
use std::collections::BTreeMap;

/// Distributes a scalar `total` across `requested` keys proportionally to
/// what each key asked for.
///
/// Every requester gets at most what it asked for. If `Σ requested <=
/// total`, everyone gets exactly their request. Otherwise `total` is split
/// proportionally using the largest-remainder method: each key's exact
/// floating-point share is floored, and the leftover units (there are at
/// most `len(requested) - 1` of them) go one each to the keys with the
/// largest fractional remainder. Ties in the remainder are broken by the
/// key's natural order, so the result is deterministic for identical
/// inputs.
pub fn distribute_fairly<K: Ord + Clone>(total: u64, requested: &BTreeMap<K, u64>) -> BTreeMap<K, u64> {
    let sum_requested: u64 = requested.values().sum();
    if sum_requested <= total {
        return requested.clone();
    }

    let mut output: BTreeMap<K, u64> = BTreeMap::new();
    let mut remainders: Vec<(K, f64, u64)> = Vec::with_capacity(requested.len());

    for (key, &amount) in requested {
        let exact = (total as f64) * (amount as f64) / (sum_requested as f64);
        let floor_share = exact.floor() as u64;
        let remainder = exact - floor_share as f64;
        output.insert(key.clone(), floor_share);
        remainders.push((key.clone(), remainder, amount));
    }

    let distributed: u64 = output.values().sum();
    let mut remaining = total.saturating_sub(distributed);

    // Largest remainder first; ties broken by key order (stable sort
    // preserves the BTreeMap's ascending iteration order for equal keys).
    remainders.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    for (key, _, requested_amount) in remainders {
        if remaining == 0 {
            break;
        }
        let share = output.get_mut(&key).expect("key inserted above");
        if *share < requested_amount {
            *share += 1;
            remaining -= 1;
        }
    }

    output
}
