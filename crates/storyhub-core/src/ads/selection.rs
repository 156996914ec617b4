use chrono::{DateTime, Utc};
use rand::Rng;

use crate::models::Advertisement;

/// Pick one ad from `ads` by weighted random draw.
///
/// Only ads that are active and inside their serving window at `now` take
/// part. Each takes `max(1, weight)` shares of the draw. Returns `None` when
/// nothing is eligible.
pub fn pick_weighted_ad<'a, R: Rng + ?Sized>(
    ads: &'a [Advertisement],
    now: DateTime<Utc>,
    rng: &mut R,
) -> Option<&'a Advertisement> {
    let eligible: Vec<&Advertisement> = ads.iter().filter(|ad| ad.is_eligible(now)).collect();
    let last = *eligible.last()?;

    // Summed as f64 so backend weights near i64::MAX cannot overflow
    let total_weight: f64 = eligible.iter().map(|ad| ad.effective_weight() as f64).sum();
    let mut r = rng.gen::<f64>() * total_weight;

    for ad in &eligible {
        r -= ad.effective_weight() as f64;
        if r <= 0.0 {
            return Some(*ad);
        }
    }

    // Rounding can leave a sliver of r after the walk
    Some(last)
}

/// [`pick_weighted_ad`] with the thread-local RNG and the current time.
pub fn pick_ad(ads: &[Advertisement]) -> Option<&Advertisement> {
    pick_weighted_ad(ads, Utc::now(), &mut rand::thread_rng())
}
