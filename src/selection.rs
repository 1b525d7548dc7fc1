//! Active/reserve partition of extracted color pairs.
//!
//! [`SelectionState`] is the single owner of everything the palette view shows:
//! the active pairs (leftmost swatch first), the reserve pairs kept around for
//! shuffling, the desired active count and the manually picked colors. Every
//! mutation is all-or-nothing, so `active.len() + reserve.len()` always equals
//! the number of pairs last ingested.

use std::collections::VecDeque;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::color::Color;
use crate::region::{pair_up, Pair, Region};

pub const MIN_COLORS: usize = 1;
pub const MAX_COLORS: usize = 20;
pub const DEFAULT_COLORS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("{block} color at index {index} is not an RGB triple")]
    MalformedColor { block: &'static str, index: usize },
}

/// Source of swap indices for the Fisher–Yates shuffle.
///
/// `pick(upper)` must return an index in `[0, upper]`; the shuffle is unbiased
/// when every index in that range is equally likely.
pub trait SwapSource {
    fn pick(&mut self, upper: usize) -> usize;
}

/// Uniform swaps drawn from any `rand` generator.
pub struct RandomSwaps<R>(pub R);

impl<R: Rng> SwapSource for RandomSwaps<R> {
    fn pick(&mut self, upper: usize) -> usize {
        self.0.gen_range(0..=upper)
    }
}

/// Never swaps; shuffling with it only re-splits the pool.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentitySwaps;

impl SwapSource for IdentitySwaps {
    fn pick(&mut self, upper: usize) -> usize {
        upper
    }
}

/// Replays a fixed list of swap indices, then behaves like [`IdentitySwaps`].
#[derive(Debug, Default, Clone)]
pub struct ScriptedSwaps {
    picks: VecDeque<usize>,
}

impl ScriptedSwaps {
    pub fn new(picks: impl IntoIterator<Item = usize>) -> Self {
        Self {
            picks: picks.into_iter().collect(),
        }
    }
}

impl SwapSource for ScriptedSwaps {
    fn pick(&mut self, upper: usize) -> usize {
        self.picks.pop_front().map_or(upper, |j| j.min(upper))
    }
}

/// Flat persisted form: four parallel arrays, the way extraction results arrive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionSnapshot {
    #[serde(default = "default_num_colors")]
    pub num_colors: usize,
    pub colors: Vec<Vec<i64>>,
    #[serde(default)]
    pub regions: Vec<Region>,
    #[serde(default)]
    pub reserve_colors: Vec<Vec<i64>>,
    #[serde(default)]
    pub reserve_regions: Vec<Region>,
    #[serde(default)]
    pub picked_colors: Vec<Vec<i64>>,
}

fn default_num_colors() -> usize {
    DEFAULT_COLORS
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectionState {
    active: Vec<Pair>,
    reserve: Vec<Pair>,
    picked: Vec<Color>,
    target: usize,
}

impl Default for SelectionState {
    fn default() -> Self {
        Self::new(DEFAULT_COLORS)
    }
}

impl SelectionState {
    pub fn new(target: usize) -> Self {
        Self {
            active: Vec::new(),
            reserve: Vec::new(),
            picked: Vec::new(),
            target: clamp_count(target),
        }
    }

    pub fn active(&self) -> &[Pair] {
        &self.active
    }

    pub fn reserve(&self) -> &[Pair] {
        &self.reserve
    }

    pub fn picked(&self) -> &[Color] {
        &self.picked
    }

    /// Desired active length, in [1, 20].
    pub fn target(&self) -> usize {
        self.target
    }

    /// Number of pairs across both sequences.
    pub fn pool_len(&self) -> usize {
        self.active.len() + self.reserve.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool_len() == 0
    }

    pub fn active_colors(&self) -> Vec<Color> {
        self.active.iter().map(|p| p.color).collect()
    }

    /// Replace both sequences with a fresh extraction result.
    ///
    /// Colors are zipped with their block's regions; missing regions become the
    /// center point. If any color is not a valid triple nothing changes.
    /// Returns the number of pairs now held.
    pub fn ingest<C: AsRef<[i64]>>(
        &mut self,
        colors: &[C],
        regions: &[Region],
        reserve_colors: &[C],
        reserve_regions: &[Region],
    ) -> Result<usize, SelectionError> {
        let active = parse_block("active", colors)?;
        let reserve = parse_block("reserve", reserve_colors)?;

        self.active = pair_up(&active, regions, &[]);
        self.reserve = pair_up(&reserve, reserve_regions, &[]);
        debug!(
            active = self.active.len(),
            reserve = self.reserve.len(),
            synthesized = active.len().saturating_sub(regions.len())
                + reserve.len().saturating_sub(reserve_regions.len()),
            "ingested extraction result"
        );
        Ok(self.pool_len())
    }

    /// Set the desired active length, clamped to [1, 20]. Moves no pairs.
    pub fn resize(&mut self, count: usize) -> usize {
        self.target = clamp_count(count);
        self.target
    }

    /// Re-split the pool at the desired length without reordering it.
    pub fn reslice(&mut self) {
        let pool = self.take_pool();
        self.split(pool);
    }

    /// Shuffle with the thread-local generator.
    pub fn shuffle(&mut self) {
        self.shuffle_with(&mut RandomSwaps(rand::thread_rng()));
    }

    /// Fisher–Yates over the combined pool, then re-split at the desired length.
    pub fn shuffle_with<S: SwapSource + ?Sized>(&mut self, swaps: &mut S) {
        if self.is_empty() {
            return;
        }
        let mut pool = self.take_pool();
        for i in (1..pool.len()).rev() {
            let j = swaps.pick(i).min(i);
            pool.swap(i, j);
        }
        self.split(pool);
    }

    pub fn pick_color(&mut self, color: Color) {
        self.picked.push(color);
    }

    /// Drop all pairs and picked colors. The desired length is kept.
    pub fn reset(&mut self) {
        self.active.clear();
        self.reserve.clear();
        self.picked.clear();
    }

    pub fn snapshot(&self) -> SelectionSnapshot {
        fn raw(c: &Color) -> Vec<i64> {
            vec![c.r.into(), c.g.into(), c.b.into()]
        }
        SelectionSnapshot {
            num_colors: self.target,
            colors: self.active.iter().map(|p| raw(&p.color)).collect(),
            regions: self.active.iter().map(|p| p.region).collect(),
            reserve_colors: self.reserve.iter().map(|p| raw(&p.color)).collect(),
            reserve_regions: self.reserve.iter().map(|p| p.region).collect(),
            picked_colors: self.picked.iter().map(raw).collect(),
        }
    }

    /// Load a flat snapshot. The combined color sequence is paired through the
    /// three-tier fallback: `regions`, then `reserve_regions`, then the center.
    pub fn restore(&mut self, snapshot: &SelectionSnapshot) -> Result<(), SelectionError> {
        let active = parse_block("active", &snapshot.colors)?;
        let reserve = parse_block("reserve", &snapshot.reserve_colors)?;
        let picked = parse_block("picked", &snapshot.picked_colors)?;

        let all: Vec<Color> = active.iter().chain(reserve.iter()).copied().collect();
        let mut pairs = pair_up(&all, &snapshot.regions, &snapshot.reserve_regions);
        self.reserve = pairs.split_off(active.len());
        self.active = pairs;
        self.picked = picked;
        self.target = clamp_count(snapshot.num_colors);
        Ok(())
    }

    fn take_pool(&mut self) -> Vec<Pair> {
        let mut pool = std::mem::take(&mut self.active);
        pool.append(&mut self.reserve);
        pool
    }

    fn split(&mut self, mut pool: Vec<Pair>) {
        let boundary = self.target.min(pool.len());
        self.reserve = pool.split_off(boundary);
        self.active = pool;
    }
}

fn clamp_count(count: usize) -> usize {
    count.clamp(MIN_COLORS, MAX_COLORS)
}

fn parse_block<C: AsRef<[i64]>>(
    block: &'static str,
    raw: &[C],
) -> Result<Vec<Color>, SelectionError> {
    raw.iter()
        .enumerate()
        .map(|(index, channels)| {
            Color::from_channels(channels.as_ref())
                .ok_or(SelectionError::MalformedColor { block, index })
        })
        .collect()
}
