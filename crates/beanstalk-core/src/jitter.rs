//! Randomized pacing delays and the sleeping capability that honours them.

use crate::config::JitterProfile;
use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::Rng;
use std::time::Duration;

/// Draws delays from a [`JitterProfile`].
///
/// Every draw goes through `rand::thread_rng()`, a thread-local generator
/// seeded from the OS, so concurrent callers never share a sequence.
#[derive(Debug, Clone, Copy, Default)]
pub struct JitterSource;

impl JitterSource {
    pub fn new() -> Self {
        Self
    }

    /// Delay in seconds: 0 when the profile is disabled, otherwise uniform
    /// over `[min_secs, max_secs]` inclusive.
    pub fn sample(&self, profile: &JitterProfile) -> u64 {
        if !profile.enabled {
            return 0;
        }
        if profile.min_secs >= profile.max_secs {
            return profile.min_secs;
        }
        rand::thread_rng().gen_range(profile.min_secs..=profile.max_secs)
    }

    /// Uniform choice over the whole slice.
    pub fn pick<'a, T>(&self, items: &'a [T]) -> Option<&'a T> {
        items.choose(&mut rand::thread_rng())
    }
}

/// Suspends the current control flow for a number of seconds.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, secs: u64);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, secs: u64) {
        if secs > 0 {
            tokio::time::sleep(Duration::from_secs(secs)).await;
        }
    }
}
