//! One loaded asset at a time, and the bookkeeping that keeps late backend
//! responses from landing on the wrong asset.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::backend::{ExtractRequest, ExtractionResult};
use crate::media::MediaAsset;
use crate::selection::{SelectionError, SelectionState};
use crate::trim::TrimWindow;

/// What a change of the desired color count does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResizePolicy {
    /// Re-split the pool already on hand.
    #[default]
    Reslice,
    /// Re-split locally, then ask the backend again once the count settles.
    Refetch,
}

/// Identity of an extraction request: the asset it was issued for and its
/// place in the order requests went out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestToken {
    generation: u64,
    seq: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The result was ingested; the pool now holds this many pairs.
    Applied(usize),
    /// The asset changed or a newer request went out; the result was dropped.
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeEffect {
    Resliced,
    /// The pool was re-split and a fresh extraction should follow.
    RefetchNeeded,
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    asset: Option<MediaAsset>,
    generation: u64,
    latest_request: u64,
    selection: SelectionState,
    trim: TrimWindow,
    policy: ResizePolicy,
}

impl Session {
    pub fn new(target: usize, policy: ResizePolicy) -> Self {
        Self {
            selection: SelectionState::new(target),
            policy,
            ..Self::default()
        }
    }

    /// Start over with a new asset. Pending responses for the old one become stale.
    pub fn load_asset(&mut self, asset: MediaAsset) {
        self.generation += 1;
        info!(path = %asset.path.display(), generation = self.generation, "loaded asset");
        self.asset = Some(asset);
        self.selection.reset();
        self.trim = TrimWindow::new();
    }

    pub fn asset(&self) -> Option<&MediaAsset> {
        self.asset.as_ref()
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut SelectionState {
        &mut self.selection
    }

    pub fn trim(&self) -> &TrimWindow {
        &self.trim
    }

    pub fn trim_mut(&mut self) -> &mut TrimWindow {
        &mut self.trim
    }

    pub fn policy(&self) -> ResizePolicy {
        self.policy
    }

    /// True only for the most recent request issued for the current asset.
    pub fn is_latest(&self, token: RequestToken) -> bool {
        token.generation == self.generation && token.seq == self.latest_request
    }

    /// The extraction request for the current asset. Issuing it supersedes
    /// every earlier request.
    pub fn extract_request(&mut self) -> (RequestToken, ExtractRequest) {
        self.latest_request += 1;
        let token = RequestToken {
            generation: self.generation,
            seq: self.latest_request,
        };
        let is_video = self.asset.as_ref().is_some_and(MediaAsset::is_video);
        let request = ExtractRequest {
            num_colors: self.selection.target(),
            trim: if is_video { self.trim.confirm() } else { None },
        };
        (token, request)
    }

    /// Ingest `result` if it answers the latest request.
    pub fn apply_extraction(
        &mut self,
        token: RequestToken,
        result: &ExtractionResult,
    ) -> Result<ApplyOutcome, SelectionError> {
        if !self.is_latest(token) {
            debug!(
                generation = token.generation,
                seq = token.seq,
                latest = self.latest_request,
                "dropping stale extraction result"
            );
            return Ok(ApplyOutcome::Stale);
        }
        let (regions, reserve_regions) = result.effective_regions();
        let pairs = self.selection.ingest(
            &result.colors,
            regions,
            &result.reserve_colors,
            reserve_regions,
        )?;
        Ok(ApplyOutcome::Applied(pairs))
    }

    pub fn resize(&mut self, count: usize) -> ResizeEffect {
        self.selection.resize(count);
        self.selection.reslice();
        match self.policy {
            ResizePolicy::Refetch if self.asset.is_some() => ResizeEffect::RefetchNeeded,
            _ => ResizeEffect::Resliced,
        }
    }
}

/// Fires once after `delay` has passed since the most recent trigger.
#[derive(Debug, Clone)]
pub struct Debounce {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debounce {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn trigger(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// True exactly once, on the first poll at or after the deadline.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
