//! Bounded busy-wait polling.
//!
//! Every wait in this driver is a busy loop with an explicit millisecond
//! budget; nothing blocks indefinitely. This combinator makes the loops
//! testable with a scripted bus and a no-op delay provider.

use embedded_hal::delay::DelayNs;

/// Outcome of a bounded poll.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Poll<T> {
    /// The predicate produced a value before the budget ran out.
    Signaled(T),
    /// The budget elapsed without the predicate producing a value.
    TimedOut,
}

impl<T> Poll<T> {
    pub fn signaled(self) -> Option<T> {
        match self {
            Poll::Signaled(value) => Some(value),
            Poll::TimedOut => None,
        }
    }
}

/// Run `f` every `interval_ms` until it produces a value or `budget_ms`
/// elapses. The delay runs before the first check, matching the chip's
/// settle-then-poll handshakes.
pub fn poll<D, F, T, E>(
    delay: &mut D,
    interval_ms: u32,
    budget_ms: u32,
    mut f: F,
) -> Result<Poll<T>, E>
where
    D: DelayNs,
    F: FnMut() -> Result<Option<T>, E>,
{
    let mut elapsed = 0;
    loop {
        delay.delay_ms(interval_ms);
        elapsed += interval_ms;

        if let Some(value) = f()? {
            return Ok(Poll::Signaled(value));
        }
        if elapsed >= budget_ms {
            return Ok(Poll::TimedOut);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embedded_hal_mocks::delay::NoopDelay;

    #[test]
    fn signals_on_first_hit() {
        let mut calls = 0;
        let result: Result<_, Infallible> = poll(&mut NoopDelay, 2, 100, || {
            calls += 1;
            Ok((calls == 3).then_some(calls))
        });
        assert_eq!(Ok(Poll::Signaled(3)), result);
        assert_eq!(3, calls);
    }

    #[test]
    fn times_out_after_budget() {
        let mut calls = 0;
        let result: Result<Poll<()>, Infallible> = poll(&mut NoopDelay, 2, 100, || {
            calls += 1;
            Ok(None)
        });
        assert_eq!(Ok(Poll::TimedOut), result);
        assert_eq!(50, calls);
    }

    #[test]
    fn delay_runs_before_each_check() {
        let mut delay = embedded_hal_mocks::delay::MockDelay::new();
        delay.expect_delay_ms().with(mockall::predicate::eq(5)).times(1).return_const(());
        let result: Result<_, Infallible> = poll(&mut delay, 5, 350, || Ok(Some(())));
        assert_eq!(Ok(Poll::Signaled(())), result);
    }
}
