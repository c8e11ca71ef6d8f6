//! Assertion time-validity checks.
//!
//! An assertion is valid at `now` when
//! `not_before - skew <= now < not_on_or_after + skew`. An assertion without
//! conditions is treated as not expired. A window with a lower bound but no
//! upper bound is malformed and fails closed.

use chrono::{DateTime, Duration, Utc};
use tracing::warn;

use crate::error::{SamlError, SamlResult};
use crate::types::{Assertion, Conditions};

/// Returns `time` shifted forward by `millis`.
#[must_use]
pub fn add(time: DateTime<Utc>, millis: u64) -> DateTime<Utc> {
    time + Duration::milliseconds(clamp_millis(millis))
}

/// Returns `time` shifted back by `millis`.
#[must_use]
pub fn subtract(time: DateTime<Utc>, millis: u64) -> DateTime<Utc> {
    time - Duration::milliseconds(clamp_millis(millis))
}

fn clamp_millis(millis: u64) -> i64 {
    // Larger skews are meaningless; keep the arithmetic in range
    i64::try_from(millis).unwrap_or(i64::MAX).min(i64::from(i32::MAX))
}

/// Checks `conditions` at `now`, widening both bounds by `skew_millis`.
///
/// # Errors
///
/// Returns [`SamlError::Assertion`] if `NotBefore` is present without
/// `NotOnOrAfter`.
pub fn is_valid(
    conditions: Option<&Conditions>,
    now: DateTime<Utc>,
    skew_millis: u64,
) -> SamlResult<bool> {
    let Some(conditions) = conditions else {
        return Ok(true);
    };

    let not_on_or_after = match (conditions.not_before, conditions.not_on_or_after) {
        (_, Some(noa)) => noa,
        (Some(_), None) => {
            return Err(SamlError::Assertion(
                "missing bound: NotOnOrAfter is required with NotBefore".to_string(),
            ))
        }
        (None, None) => return Ok(true),
    };

    if let Some(not_before) = conditions.not_before {
        if not_before > not_on_or_after {
            warn!(
                not_before = %not_before,
                not_on_or_after = %not_on_or_after,
                "assertion conditions describe an empty window"
            );
            return Ok(false);
        }
        if now < subtract(not_before, skew_millis) {
            return Ok(false);
        }
    }

    Ok(now < add(not_on_or_after, skew_millis))
}

/// Returns the instant the conditions stop being valid.
#[must_use]
pub fn expires_at(conditions: &Conditions) -> Option<DateTime<Utc>> {
    conditions.not_on_or_after
}

/// Returns true if `assertion` is outside its skewed validity window.
///
/// # Errors
///
/// See [`is_valid`].
pub fn has_expired(assertion: &Assertion, now: DateTime<Utc>, skew_millis: u64) -> SamlResult<bool> {
    is_valid(assertion.conditions.as_ref(), now, skew_millis).map(|valid| !valid)
}
