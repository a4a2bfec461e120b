//! Diversified shuffling.
//!
//! Camera-roll exports share long filename prefixes (`IMG_1001.jpg`,
//! `IMG_1002.jpg`, ...) and tend to look alike. Items are grouped by name
//! prefix, each group is shuffled, and groups are interleaved round-robin so
//! that lookalikes are spread apart.

use std::collections::HashMap;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Characters of the name that form the grouping key.
pub const PREFIX_LEN: usize = 5;

/// Shared random source for one selector. The lock is only held while
/// shuffling, never across an await.
pub struct Shuffler {
    rng: Mutex<StdRng>,
}

impl Shuffler {
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Restart the random sequence from `seed`.
    pub fn reseed(&self, seed: u64) {
        *self.rng.lock() = StdRng::seed_from_u64(seed);
    }

    pub fn diversify<T, F>(&self, items: Vec<T>, name: F) -> Vec<T>
    where
        F: Fn(&T) -> &str,
    {
        let mut rng = self.rng.lock();
        diversify(items, name, &mut *rng)
    }
}

impl Default for Shuffler {
    fn default() -> Self {
        Self::from_entropy()
    }
}

/// First `PREFIX_LEN` characters of `name` (the whole name when shorter).
pub fn name_prefix(name: &str) -> &str {
    match name.char_indices().nth(PREFIX_LEN) {
        Some((idx, _)) => &name[..idx],
        None => name,
    }
}

/// Permute `items` so that consecutive items avoid sharing a name prefix
/// while any other group still has items left.
pub fn diversify<T, F, R>(items: Vec<T>, name: F, rng: &mut R) -> Vec<T>
where
    F: Fn(&T) -> &str,
    R: Rng + ?Sized,
{
    let total = items.len();
    let mut groups: Vec<Vec<T>> = Vec::new();
    let mut by_prefix: HashMap<String, usize> = HashMap::new();

    for item in items {
        let prefix = name_prefix(name(&item)).to_string();
        let idx = *by_prefix.entry(prefix).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[idx].push(item);
    }

    for group in groups.iter_mut() {
        group.shuffle(rng);
    }
    groups.shuffle(rng);

    let mut queues: Vec<std::vec::IntoIter<T>> = groups.into_iter().map(Vec::into_iter).collect();
    let mut out = Vec::with_capacity(total);
    while !queues.is_empty() {
        queues.retain_mut(|queue| match queue.next() {
            Some(item) => {
                out.push(item);
                true
            }
            None => false,
        });
    }
    out
}
