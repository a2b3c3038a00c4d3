use std::collections::HashMap;

use crate::store::{
    entry::EntryKey,
    retention::RetentionPolicy,
    selector::{ReadMode, Selector},
};

pub type ReaderId = u32;

/// How a read end selects values and how much history it asks to keep.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReaderConfig {
    pub selector: Selector,
    pub mode: ReadMode,
    pub retention: RetentionPolicy,
}

impl ReaderConfig {
    /// Reads every value in arrival order, whatever its time.
    pub fn sequential() -> Self {
        Self {
            selector: Selector::IntervalStartOrEarlier,
            mode: ReadMode::Sequential,
            retention: RetentionPolicy::default(),
        }
    }

    pub fn with_selector(mut self, selector: Selector) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_mode(mut self, mode: ReadMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            selector: Selector::IntervalStartOrEarlier,
            mode: ReadMode::Latest,
            retention: RetentionPolicy::default(),
        }
    }
}

pub(crate) struct ReaderState {
    config: ReaderConfig,
    cursors: HashMap<EntryKey, u64>,
}

impl ReaderState {
    pub(crate) fn new(config: ReaderConfig) -> Self {
        Self {
            config,
            cursors: HashMap::new(),
        }
    }

    pub(crate) fn config(&self) -> &ReaderConfig {
        &self.config
    }

    pub(crate) fn is_sequential(&self) -> bool {
        self.config.mode == ReadMode::Sequential
    }

    /// Every value with a sequence number below the cursor has been consumed.
    pub(crate) fn cursor(&self, key: &EntryKey) -> u64 {
        self.cursors.get(key).copied().unwrap_or(0)
    }

    pub(crate) fn advance(&mut self, key: EntryKey, cursor: u64) {
        let current = self.cursors.entry(key).or_insert(0);
        if cursor > *current {
            *current = cursor;
        }
    }

    pub(crate) fn forget(&mut self, key: &EntryKey) {
        self.cursors.remove(key);
    }
}
