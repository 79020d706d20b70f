//! Conversion of raw cgroup file values into the domain a metrics provider reports in.
//!
//! Every limit-like value uses `-1` for "unlimited" (or "unset"), whatever encoding the
//! kernel chose for the hierarchy version.

use std::collections::BTreeSet;

/// Normalized "no limit" / "default" value.
pub const UNLIMITED: i64 = -1;

/// Smallest v1 value treated as "no limit". The kernel reports `PAGE_COUNTER_MAX` scaled
/// to bytes, which lands just below `i64::MAX` and varies with the page size.
pub const V1_UNLIMITED_MINIMUM: i64 = 0x7FFF_FFFF_FF00_0000;

/// The v1 default (and per-CPU unit) of `cpu.shares`.
pub const PER_CPU_SHARES: i64 = 1024;

/// The v2 default of `cpu.weight`.
pub const DEFAULT_CPU_WEIGHT: i64 = 100;

const MAX_CPU_WEIGHT: i64 = 10_000;

/// Shares at which the OCI mapping reaches [`MAX_CPU_WEIGHT`].
const MAX_CPU_SHARES: i64 = 262_144;

/// Largest CPU or memory node id accepted in a range list (`NR_CPUS` tops out at 8192).
pub const MAX_RANGE_LIST_ID: u32 = 8191;

/// Collapses v1's near-`i64::MAX` limit encoding to [`UNLIMITED`].
///
/// # Example
///
/// ```
/// use cgroup_metrics_validator::cgroup::normalize::{limit_v1, V1_UNLIMITED_MINIMUM};
///
/// assert_eq!(limit_v1(9223372036854771712), -1);
/// assert_eq!(limit_v1(V1_UNLIMITED_MINIMUM - 1), V1_UNLIMITED_MINIMUM - 1);
/// ```
pub fn limit_v1(raw: i64) -> i64 {
    if raw >= V1_UNLIMITED_MINIMUM {
        UNLIMITED
    } else {
        raw
    }
}

/// Converts a v2 limit token: `max` is [`UNLIMITED`], numbers pass through and anything
/// unparseable (including an empty value) is also treated as [`UNLIMITED`].
pub fn limit_v2(raw: &str) -> i64 {
    match raw.trim() {
        "max" => UNLIMITED,
        value => value.parse::<i64>().unwrap_or(UNLIMITED),
    }
}

/// Parses a v1 integer file value.
///
/// Values that overflow `i64` (some v1 counters are unsigned) saturate to `i64::MAX`;
/// anything that is not a number at all yields 0.
pub fn parse_long(raw: &str) -> i64 {
    let value = raw.trim();
    match value.parse::<i64>() {
        Ok(parsed) => parsed,
        Err(_) if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) => i64::MAX,
        Err(_) => {
            log::debug!("Treating non-numeric value `{value}` as 0");
            0
        }
    }
}

/// Parses whitespace-separated integers, e.g. `cpuacct.usage_percpu`.
pub fn parse_longs(raw: &str) -> Vec<i64> {
    raw.split_whitespace().map(parse_long).collect()
}

/// Normalizes v1 `cpu.shares`: the kernel default 1024 (and 0) mean "not configured".
pub fn shares_v1(raw: i64) -> i64 {
    if raw == 0 || raw == PER_CPU_SHARES {
        UNLIMITED
    } else {
        raw
    }
}

/// Converts a v2 `cpu.weight` back into v1-style shares.
///
/// Inverts the OCI runtime mapping `weight = 1 + ((shares - 2) * 9999) / 262142`, then
/// snaps the result to a multiple of [`PER_CPU_SHARES`] (ties go to the lower multiple)
/// with a floor of [`PER_CPU_SHARES`]. Weight 0 and the v2 default 100 mean "not
/// configured" and normalize to [`UNLIMITED`], as does any weight outside `[1, 10000]`.
///
/// # Example
///
/// ```
/// use cgroup_metrics_validator::cgroup::normalize::weight_to_shares;
///
/// assert_eq!(weight_to_shares(100), -1);
/// assert_eq!(weight_to_shares(1), 1024);
/// assert_eq!(weight_to_shares(79), 2048);
/// ```
pub fn weight_to_shares(weight: i64) -> i64 {
    if weight == 0 || weight == DEFAULT_CPU_WEIGHT {
        return UNLIMITED;
    }
    if !(1..=MAX_CPU_WEIGHT).contains(&weight) {
        log::warn!("Ignoring out of range cpu weight {weight}");
        return UNLIMITED;
    }

    let x = (262_142 * weight - 1) / 9999 + 2;
    if x <= PER_CPU_SHARES {
        return PER_CPU_SHARES;
    }

    let lower = x / PER_CPU_SHARES * PER_CPU_SHARES;
    let upper = lower + PER_CPU_SHARES;
    if x - lower <= upper - x { lower } else { upper }
}

/// Maps v1-style shares onto a v2 weight in `[1, 10000]`.
///
/// Non-positive shares (unset) map to the default weight. Shares beyond the kernel
/// maximum clamp to the maximum weight.
pub fn shares_to_weight(shares: i64) -> i64 {
    if shares <= 0 {
        return DEFAULT_CPU_WEIGHT;
    }
    let shares = shares.min(MAX_CPU_SHARES);
    (1 + ((shares - 2) * 9999) / 262_142).clamp(1, MAX_CPU_WEIGHT)
}

/// Converts an unsigned kernel counter into the provider's signed domain, saturating at
/// `i64::MAX`.
pub fn counter(raw: u64) -> i64 {
    i64::try_from(raw).unwrap_or(i64::MAX)
}

/// Expands a cpulist such as `0-3,8,10-11` into its members.
///
/// Items are single integers or inclusive `lo-hi` ranges separated by commas. Empty
/// input yields an empty set. Items that do not parse, reversed ranges and ids above
/// [`MAX_RANGE_LIST_ID`] are dropped with a warning.
///
/// # Example
///
/// ```
/// use cgroup_metrics_validator::cgroup::normalize::expand_range_list;
///
/// let cpus: Vec<u32> = expand_range_list("1,2-6,7").into_iter().collect();
/// assert_eq!(cpus, vec![1, 2, 3, 4, 5, 6, 7]);
/// ```
pub fn expand_range_list(raw: &str) -> BTreeSet<u32> {
    let mut items = BTreeSet::new();
    for part in raw.trim().split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let parsed = match part.split_once('-') {
            Some((lo, hi)) => lo
                .trim()
                .parse::<u32>()
                .and_then(|lo| Ok((lo, hi.trim().parse::<u32>()?))),
            None => part.parse::<u32>().map(|single| (single, single)),
        };

        match parsed {
            Ok((lo, hi)) if lo > hi => {
                log::warn!("Ignoring reversed range list item `{part}`");
            }
            Ok((_, hi)) if hi > MAX_RANGE_LIST_ID => {
                log::warn!("Ignoring range list item `{part}` above {MAX_RANGE_LIST_ID}");
            }
            Ok((lo, hi)) => items.extend(lo..=hi),
            Err(err) => log::warn!("Ignoring malformed range list item `{part}`: {err}"),
        }
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_v1_boundary() {
        assert_eq!(limit_v1(V1_UNLIMITED_MINIMUM), UNLIMITED);
        assert_eq!(limit_v1(V1_UNLIMITED_MINIMUM - 1), V1_UNLIMITED_MINIMUM - 1);
        assert_eq!(limit_v1(i64::MAX), UNLIMITED);
        assert_eq!(limit_v1(536_870_912), 536_870_912);
        assert_eq!(limit_v1(-1), -1);
    }

    #[test]
    fn test_limit_v2() {
        assert_eq!(limit_v2("max"), UNLIMITED);
        assert_eq!(limit_v2("max\n"), UNLIMITED);
        assert_eq!(limit_v2("12345"), 12345);
        assert_eq!(limit_v2(""), UNLIMITED);
        assert_eq!(limit_v2("garbage"), UNLIMITED);
    }

    #[test]
    fn test_counter_saturates() {
        assert_eq!(counter(42), 42);
        assert_eq!(counter(u64::MAX), i64::MAX);
    }

    #[test]
    fn test_parse_long() {
        assert_eq!(parse_long("4096\n"), 4096);
        assert_eq!(parse_long("-1"), -1);
        assert_eq!(parse_long("18446744073709551615"), i64::MAX);
        assert_eq!(parse_long(""), 0);
        assert_eq!(parse_long("abc"), 0);
    }

    #[test]
    fn test_parse_longs() {
        assert_eq!(parse_longs("10 20 30 \n"), vec![10, 20, 30]);
        assert!(parse_longs("").is_empty());
    }

    #[test]
    fn test_shares_v1() {
        assert_eq!(shares_v1(1024), UNLIMITED);
        assert_eq!(shares_v1(0), UNLIMITED);
        assert_eq!(shares_v1(2048), 2048);
        assert_eq!(shares_v1(512), 512);
    }

    #[test]
    fn test_weight_to_shares_defaults() {
        assert_eq!(weight_to_shares(100), UNLIMITED);
        assert_eq!(weight_to_shares(0), UNLIMITED);
    }

    #[test]
    fn test_weight_to_shares_out_of_range() {
        assert_eq!(weight_to_shares(i64::MAX), UNLIMITED);
        assert_eq!(weight_to_shares(parse_long("99999999999999999999")), UNLIMITED);
        assert_eq!(weight_to_shares(10_001), UNLIMITED);
        assert_eq!(weight_to_shares(-5), UNLIMITED);
        assert_eq!(weight_to_shares(i64::MIN), UNLIMITED);
    }

    #[test]
    fn test_weight_to_shares_floor() {
        // x = (262142 - 1) / 9999 + 2 = 28
        assert_eq!(weight_to_shares(1), PER_CPU_SHARES);
        // x = (262142 * 39 - 1) / 9999 + 2 = 1024
        assert_eq!(weight_to_shares(39), PER_CPU_SHARES);
    }

    #[test]
    fn test_weight_to_shares_snaps_to_nearest_multiple() {
        // x = 1050 -> 1024
        assert_eq!(weight_to_shares(40), 1024);
        // x = 1548 is 524 above 1024 and 500 below 2048
        assert_eq!(weight_to_shares(59), 2048);
        // x = 2073 -> 2048
        assert_eq!(weight_to_shares(79), 2048);
        // x = 262170 -> 256 * 1024
        assert_eq!(weight_to_shares(10_000), 262_144);
    }

    #[test]
    fn test_weight_to_shares_tie_goes_low() {
        // x = (262142 * 371 - 1) / 9999 + 2 = 9728, halfway between 9216 and 10240
        assert_eq!((262_142 * 371 - 1) / 9999 + 2, 9728);
        assert_eq!(weight_to_shares(371), 9216);
    }

    #[test]
    fn test_weight_to_shares_is_multiple_of_1024() {
        for weight in (1..=10_000).filter(|&w| w != DEFAULT_CPU_WEIGHT) {
            let shares = weight_to_shares(weight);
            assert!(shares >= PER_CPU_SHARES);
            assert_eq!(shares % PER_CPU_SHARES, 0, "weight {weight}");
        }
    }

    #[test]
    fn test_shares_to_weight() {
        assert_eq!(shares_to_weight(-1), DEFAULT_CPU_WEIGHT);
        assert_eq!(shares_to_weight(2), 1);
        assert_eq!(shares_to_weight(1024), 39);
        assert_eq!(shares_to_weight(262_144), MAX_CPU_WEIGHT);
        assert_eq!(shares_to_weight(1_000_000), MAX_CPU_WEIGHT);
        assert_eq!(shares_to_weight(i64::MAX), MAX_CPU_WEIGHT);
    }

    #[test]
    fn test_expand_range_list() {
        let expected: BTreeSet<u32> = (1..=7).collect();
        assert_eq!(expand_range_list("1,2-6,7"), expected);
        assert_eq!(expand_range_list("1,2-6,7\n"), expected);
        assert!(expand_range_list("").is_empty());
        assert!(expand_range_list("\n").is_empty());
    }

    #[test]
    fn test_expand_range_list_unsorted_and_overlapping() {
        let set = expand_range_list("8-9,0-2,1");
        assert_eq!(set.into_iter().collect::<Vec<_>>(), vec![0, 1, 2, 8, 9]);
    }

    #[test]
    fn test_expand_range_list_skips_malformed_items() {
        let set = expand_range_list("0,x,2-y,4");
        assert_eq!(set.into_iter().collect::<Vec<_>>(), vec![0, 4]);
    }

    #[test]
    fn test_expand_range_list_skips_reversed_ranges() {
        let set = expand_range_list("5-2,7");
        assert_eq!(set.into_iter().collect::<Vec<_>>(), vec![7]);
    }

    #[test]
    fn test_expand_range_list_bounds_ids() {
        let set = expand_range_list("0-4000000000,1,4000000000");
        assert_eq!(set.into_iter().collect::<Vec<_>>(), vec![1]);

        let set = expand_range_list("8190-8191");
        assert_eq!(set.into_iter().collect::<Vec<_>>(), vec![8190, 8191]);
    }
}
