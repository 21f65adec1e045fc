use snafu::{Snafu, ensure};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

/// Small positive integer addressing one backend resource. `0` is never handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(u32);

impl HandleId {
    pub const INVALID: HandleId = HandleId(0);

    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u32 {
        self.0
    }

    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl Display for HandleId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(context(suffix(Err)))]
pub enum AllocatorError {
    #[snafu(display("All {limit} handle ids are in use"))]
    Exhausted { limit: u32 },

    #[snafu(display("Handle id 0 is reserved and can't be freed"))]
    InvalidId,

    #[snafu(display("Handle id {id} was never issued"))]
    NeverIssued { id: HandleId },

    #[snafu(display("Handle id {id} was already freed"))]
    DoubleFree { id: HandleId },
}

type Result<T, E = AllocatorError> = std::result::Result<T, E>;

/// Mints and reclaims [`HandleId`]s, always reusing the smallest freed id first.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    free: BTreeSet<u32>,
    high_water: u32,
    limit: u32,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::with_limit(u32::MAX)
    }

    /// Restricts the namespace to `1..=limit`.
    pub fn with_limit(limit: u32) -> Self {
        Self {
            free: BTreeSet::new(),
            high_water: 0,
            limit,
        }
    }

    pub fn next(&mut self) -> Result<HandleId> {
        if let Some(id) = self.free.pop_first() {
            return Ok(HandleId(id));
        }

        let id = self
            .high_water
            .checked_add(1)
            .filter(|id| *id <= self.limit)
            .ok_or_else(|| ExhaustedErr { limit: self.limit }.build())?;

        self.high_water = id;
        Ok(HandleId(id))
    }

    pub fn free(&mut self, id: HandleId) -> Result<()> {
        ensure!(id.is_valid(), InvalidIdErr);
        ensure!(id.0 <= self.high_water, NeverIssuedErr { id });
        ensure!(self.free.insert(id.0), DoubleFreeErr { id });

        Ok(())
    }

    pub fn is_live(&self, id: HandleId) -> bool {
        id.is_valid() && id.0 <= self.high_water && !self.free.contains(&id.0)
    }

    pub fn live_count(&self) -> usize {
        self.high_water as usize - self.free.len()
    }

    /// Largest id ever issued.
    pub fn high_water(&self) -> u32 {
        self.high_water
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }
}
