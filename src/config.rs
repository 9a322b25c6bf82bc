/// Pending holes an archetype may accumulate before the next write into it compacts the archetype.
pub const DEFAULT_HOLE_THRESHOLD: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct EngineConfig {
    /// Compaction runs once an archetype has at least this many holes. Large values reduce how
    /// often writes stall on a repack, at the cost of stale rows lingering in the columns.
    pub hole_threshold: usize,

    /// Initial capacity of every newly created lookup list
    pub lookup_capacity: usize,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hole_threshold(mut self, hole_threshold: usize) -> Self {
        self.hole_threshold = hole_threshold;
        self
    }

    pub fn with_lookup_capacity(mut self, lookup_capacity: usize) -> Self {
        self.lookup_capacity = lookup_capacity;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            hole_threshold: DEFAULT_HOLE_THRESHOLD,
            lookup_capacity: 8,
        }
    }
}
