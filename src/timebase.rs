//! Stream timebase resolution.

use crate::types::{Rational, Time};

/// Timebase used when neither the stream nor its decoder declares one.
pub const DEFAULT_TIMEBASE: Rational = Rational::new(1, 40_000);

/// Pick the first present timebase among `candidates`, in priority order,
/// falling back to `fallback`.
///
/// The result is the tick duration as a fixed-point [`Time`]: value is the
/// numerator and timescale the denominator. Absent rationals (those with a
/// zero component) are skipped, and an absent `fallback` is replaced by
/// [`DEFAULT_TIMEBASE`].
pub fn resolve_timebase(candidates: impl IntoIterator<Item = Rational>, fallback: Rational) -> Time {
    let chosen = candidates
        .into_iter()
        .find(|r| !r.is_absent())
        .unwrap_or(if fallback.is_absent() {
            DEFAULT_TIMEBASE
        } else {
            fallback
        });

    // A negative timescale is not meaningful; keep the sign on the value.
    if chosen.denominator < 0 {
        Time::new(-(chosen.numerator as i64), chosen.denominator.saturating_neg())
    } else {
        Time::new(chosen.numerator as i64, chosen.denominator)
    }
}
