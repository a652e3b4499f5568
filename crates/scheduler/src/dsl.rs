// SPDX-License-Identifier: MIT

//! Recurrence DSL: parses strings like `"every 5 to 10 minutes"` or
//! `"every monday at 09:00"` into a [`RecurrenceSpec`] data record.
//!
//! No reflective dispatch: the parsed spec is a plain struct the
//! [`crate::trigger::Scheduler`] consumes directly.

use crate::error::{Result, SchedulerError};
use std::iter::Peekable;
use std::str::SplitWhitespace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
}

impl Unit {
    pub fn milliseconds(self) -> i64 {
        match self {
            Unit::Second => 1_000,
            Unit::Minute => 60_000,
            Unit::Hour => 3_600_000,
            Unit::Day => 86_400_000,
            Unit::Week => 604_800_000,
        }
    }

    fn parse_token(tok: &str) -> Option<(Unit, bool)> {
        Some(match tok {
            "second" => (Unit::Second, false),
            "seconds" => (Unit::Second, true),
            "minute" => (Unit::Minute, false),
            "minutes" => (Unit::Minute, true),
            "hour" => (Unit::Hour, false),
            "hours" => (Unit::Hour, true),
            "day" => (Unit::Day, false),
            "days" => (Unit::Day, true),
            "week" => (Unit::Week, false),
            "weeks" => (Unit::Week, true),
            _ => return None,
        })
    }

    fn parse_with_plurality(tok: &str, n: u32) -> Result<Unit> {
        let (unit, plural) = Self::parse_token(tok)
            .ok_or_else(|| SchedulerError::value(format!("unknown unit '{tok}'")))?;
        let expected_plural = n != 1;
        if plural != expected_plural {
            return Err(SchedulerError::value(format!(
                "unit '{tok}' does not agree with interval {n}"
            )));
        }
        Ok(unit)
    }

    fn parse_plural(tok: &str) -> Result<Unit> {
        let (unit, plural) = Self::parse_token(tok)
            .ok_or_else(|| SchedulerError::value(format!("unknown unit '{tok}'")))?;
        if !plural {
            return Err(SchedulerError::value(format!(
                "a ranged interval requires a plural unit, got '{tok}'"
            )));
        }
        Ok(unit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    fn parse(tok: &str) -> Option<Self> {
        Some(match tok {
            "monday" => Weekday::Monday,
            "tuesday" => Weekday::Tuesday,
            "wednesday" => Weekday::Wednesday,
            "thursday" => Weekday::Thursday,
            "friday" => Weekday::Friday,
            "saturday" => Weekday::Saturday,
            "sunday" => Weekday::Sunday,
            _ => return None,
        })
    }

    pub fn to_chrono(self) -> chrono::Weekday {
        match self {
            Weekday::Monday => chrono::Weekday::Mon,
            Weekday::Tuesday => chrono::Weekday::Tue,
            Weekday::Wednesday => chrono::Weekday::Wed,
            Weekday::Thursday => chrono::Weekday::Thu,
            Weekday::Friday => chrono::Weekday::Fri,
            Weekday::Saturday => chrono::Weekday::Sat,
            Weekday::Sunday => chrono::Weekday::Sun,
        }
    }
}

/// A parsed recurrence. Carries everything [`crate::trigger::next_fire_after`]
/// needs to compute the next firing time; never interpreted reflectively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceSpec {
    pub every: u32,
    pub range_to: Option<u32>,
    pub unit: Unit,
    pub weekday: Option<Weekday>,
    pub at: Option<(u8, u8)>,
}

type Tokens<'a> = Peekable<SplitWhitespace<'a>>;

fn parse_hhmm(tok: &str) -> Result<(u8, u8)> {
    let (h, m) = tok
        .split_once(':')
        .ok_or_else(|| SchedulerError::value(format!("expected HH:MM after 'at', got '{tok}'")))?;
    let h: u8 = h
        .parse()
        .map_err(|_| SchedulerError::value(format!("expected HH:MM after 'at', got '{tok}'")))?;
    let m: u8 = m
        .parse()
        .map_err(|_| SchedulerError::value(format!("expected HH:MM after 'at', got '{tok}'")))?;
    if h >= 24 || m >= 60 {
        return Err(SchedulerError::value(format!("time out of range: '{tok}'")));
    }
    Ok((h, m))
}

fn parse_optional_at(tokens: &mut Tokens) -> Result<Option<(u8, u8)>> {
    if tokens.peek() != Some(&"at") {
        return Ok(None);
    }
    tokens.next();
    let hhmm = tokens
        .next()
        .ok_or_else(|| SchedulerError::value("missing HH:MM after 'at'"))?;
    Ok(Some(parse_hhmm(hhmm)?))
}

fn ensure_exhausted(tokens: &mut Tokens) -> Result<()> {
    if let Some(extra) = tokens.next() {
        return Err(SchedulerError::value(format!("unexpected token '{extra}'")));
    }
    Ok(())
}

/// Parses a recurrence spec string. On any grammar or range error, returns
/// a [`SchedulerError::ValueError`] and has no side effects.
pub fn parse(spec: &str) -> Result<RecurrenceSpec> {
    let mut tokens: Tokens = spec.split_whitespace().peekable();

    let first = tokens
        .next()
        .ok_or_else(|| SchedulerError::value("empty recurrence spec"))?;
    if first != "every" {
        return Err(SchedulerError::value("recurrence spec must start with 'every'"));
    }

    let next = tokens
        .next()
        .ok_or_else(|| SchedulerError::value("missing unit after 'every'"))?;

    if let Ok(n) = next.parse::<u32>() {
        if n == 0 {
            return Err(SchedulerError::value("interval must be positive"));
        }
        let after = tokens
            .next()
            .ok_or_else(|| SchedulerError::value("missing unit after number"))?;

        if after == "to" {
            let m_tok = tokens
                .next()
                .ok_or_else(|| SchedulerError::value("missing value after 'to'"))?;
            let m: u32 = m_tok
                .parse()
                .map_err(|_| SchedulerError::value(format!("expected integer after 'to', got '{m_tok}'")))?;
            if m < n {
                return Err(SchedulerError::value("range end must be >= range start"));
            }
            let unit_tok = tokens
                .next()
                .ok_or_else(|| SchedulerError::value("missing unit after range"))?;
            let unit = Unit::parse_plural(unit_tok)?;
            let at = parse_optional_at(&mut tokens)?;
            ensure_exhausted(&mut tokens)?;
            return Ok(RecurrenceSpec {
                every: n,
                range_to: Some(m),
                unit,
                weekday: None,
                at,
            });
        }

        let unit = Unit::parse_with_plurality(after, n)?;
        let at = parse_optional_at(&mut tokens)?;
        ensure_exhausted(&mut tokens)?;
        return Ok(RecurrenceSpec {
            every: n,
            range_to: None,
            unit,
            weekday: None,
            at,
        });
    }

    if let Some(weekday) = Weekday::parse(next) {
        let at = parse_optional_at(&mut tokens)?;
        ensure_exhausted(&mut tokens)?;
        return Ok(RecurrenceSpec {
            every: 1,
            range_to: None,
            unit: Unit::Day,
            weekday: Some(weekday),
            at,
        });
    }

    let unit = Unit::parse_with_plurality(next, 1)?;
    let at = parse_optional_at(&mut tokens)?;
    ensure_exhausted(&mut tokens)?;
    Ok(RecurrenceSpec {
        every: 1,
        range_to: None,
        unit,
        weekday: None,
        at,
    })
}

#[cfg(test)]
#[path = "dsl_tests.rs"]
mod tests;
