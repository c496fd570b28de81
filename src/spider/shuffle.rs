//! Ordering of discovered tag categories
//!
//! Categories are crawled in a random order on every run so consecutive runs
//! do not hit the site in the same pattern.

use rand::seq::SliceRandom;
use url::Url;

/// Reorders the category URLs found on the tag index
pub trait Shuffler: Send {
    fn shuffle(&mut self, urls: &mut [Url]);
}

/// Uniform random shuffle from the thread-local generator (unseeded)
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomShuffler;

impl Shuffler for RandomShuffler {
    fn shuffle(&mut self, urls: &mut [Url]) {
        urls.shuffle(&mut rand::rng());
    }
}

/// Keeps document order
#[derive(Debug, Default, Clone, Copy)]
pub struct NoShuffle;

impl Shuffler for NoShuffle {
    fn shuffle(&mut self, _urls: &mut [Url]) {}
}
