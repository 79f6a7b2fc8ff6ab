//! State threaded through one building design.

use std::collections::HashMap;

use rand::{Rng, RngCore};

use super::metadata::Metadata;
use super::scripts::ScriptLibrary;
use super::values::ValueId;

/// Everything a selector, algorithm or reference needs while one design is
/// in flight. Each concurrent design needs its own context, rng and metadata.
pub struct DesignContext<'a> {
    pub rng: &'a mut dyn RngCore,
    pub metadata: &'a mut Metadata,
    pub scripts: &'a dyn ScriptLibrary,
    /// Memoised draws of `vary = false` value generators.
    memo: HashMap<ValueId, f32>,
}

impl<'a> DesignContext<'a> {
    pub fn new(
        rng: &'a mut dyn RngCore,
        metadata: &'a mut Metadata,
        scripts: &'a dyn ScriptLibrary,
    ) -> Self {
        Self {
            rng,
            metadata,
            scripts,
            memo: HashMap::new(),
        }
    }

    /// Next uniform sample in `[0, 1)`.
    pub fn random(&mut self) -> f32 {
        self.rng.gen::<f32>()
    }

    pub(crate) fn memoized(&self, id: ValueId) -> Option<f32> {
        self.memo.get(&id).copied()
    }

    pub(crate) fn memoize(&mut self, id: ValueId, value: f32) {
        self.memo.insert(id, value);
    }
}
