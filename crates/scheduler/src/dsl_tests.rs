// SPDX-License-Identifier: MIT

use super::*;
use proptest::prelude::*;
use yare::parameterized;

#[parameterized(
    bare_day = { "every day", 1, None, Unit::Day },
    plural_minutes = { "every 5 minutes", 5, None, Unit::Minute },
    plural_hours = { "every 2 hours", 2, None, Unit::Hour },
    singular_second = { "every second", 1, None, Unit::Second },
    bare_week = { "every week", 1, None, Unit::Week },
)]
fn accepts_basic_intervals(spec: &str, every: u32, range_to: Option<u32>, unit: Unit) {
    let parsed = parse(spec).unwrap();
    assert_eq!(parsed.every, every);
    assert_eq!(parsed.range_to, range_to);
    assert_eq!(parsed.unit, unit);
    assert_eq!(parsed.weekday, None);
    assert_eq!(parsed.at, None);
}

#[test]
fn accepts_ranged_interval() {
    let parsed = parse("every 5 to 10 minutes").unwrap();
    assert_eq!(parsed.every, 5);
    assert_eq!(parsed.range_to, Some(10));
    assert_eq!(parsed.unit, Unit::Minute);
}

#[test]
fn accepts_weekday() {
    let parsed = parse("every monday").unwrap();
    assert_eq!(parsed.weekday, Some(Weekday::Monday));
    assert_eq!(parsed.every, 1);
}

#[test]
fn accepts_weekday_with_at_clause() {
    let parsed = parse("every friday at 09:30").unwrap();
    assert_eq!(parsed.weekday, Some(Weekday::Friday));
    assert_eq!(parsed.at, Some((9, 30)));
}

#[test]
fn accepts_interval_with_at_clause() {
    let parsed = parse("every day at 23:59").unwrap();
    assert_eq!(parsed.at, Some((23, 59)));
}

#[parameterized(
    empty_string = { "" },
    missing_every = { "5 minutes" },
    missing_unit_after_number = { "every 5" },
    non_integer_to = { "every 5 to x minutes" },
    non_hhmm_at = { "every day at noon" },
    singular_after_multi = { "every 2 day" },
    unknown_directive = { "every blorp" },
    trailing_garbage = { "every day at 09:00 and also tuesdays" },
    range_end_before_start = { "every 10 to 5 minutes" },
    zero_interval = { "every 0 minutes" },
    unknown_unit_in_range = { "every 5 to 10 fortnights" },
    singular_unit_in_range = { "every 5 to 10 minute" },
)]
fn rejects_malformed_specs(spec: &str) {
    assert!(parse(spec).is_err());
}

#[test]
fn error_leaves_no_partial_state() {
    // parse() never mutates anything external; a failed parse simply
    // returns an error value. Calling it repeatedly is side-effect free.
    assert!(parse("every 2 day").is_err());
    assert!(parse("every 2 day").is_err());
}

proptest! {
    #[test]
    fn ranged_interval_accepts_any_ordered_pair(n in 1u32..500, extra in 0u32..500) {
        let m = n + extra;
        let spec = format!("every {n} to {m} minutes");
        let parsed = parse(&spec).unwrap();
        prop_assert_eq!(parsed.every, n);
        prop_assert_eq!(parsed.range_to, Some(m));
    }

    #[test]
    fn ranged_interval_rejects_decreasing_pair(n in 2u32..500) {
        let m = n - 1;
        let spec = format!("every {n} to {m} minutes");
        prop_assert!(parse(&spec).is_err());
    }
}
