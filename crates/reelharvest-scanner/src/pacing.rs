//! Randomized pauses between page actions.

use crate::error::Result;
use rand::Rng;
use reelharvest_browser::BrowserSession;
use reelharvest_core::DelayRange;
use std::time::Duration;

/// Pick a duration uniformly from the range.
#[must_use]
pub fn sample(range: DelayRange) -> Duration {
    let (lo, hi) = (range.min_ms.min(range.max_ms), range.min_ms.max(range.max_ms));
    Duration::from_millis(rand::thread_rng().gen_range(lo..=hi))
}

/// Pick a scroll distance uniformly from `[min, max]`.
#[must_use]
pub fn pixels(min: i64, max: i64) -> i64 {
    rand::thread_rng().gen_range(min..=max)
}

/// Wait a random time through the session.
pub async fn pause<S>(session: &S, range: DelayRange) -> Result<()>
where
    S: BrowserSession + ?Sized,
{
    let delay = sample(range);
    session.wait(delay).await?;
    Ok(())
}
