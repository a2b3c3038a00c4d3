use crate::types::Tick;

/// How much history a read end asks its entries to keep.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetentionPolicy {
    /// Keep every value whose window ends no earlier than `newest - span`.
    Span(Tick),
    /// Keep the newest `n` values regardless of their age.
    Slots(usize),
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        RetentionPolicy::Slots(1)
    }
}

/// The effective retention of one entry: the maximum requested by any
/// attached reader. The newest value is always kept.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Retention {
    pub span: Option<Tick>,
    pub slots: usize,
}

impl Retention {
    pub fn new() -> Self {
        Self {
            span: None,
            slots: 1,
        }
    }

    pub fn absorb(&mut self, policy: RetentionPolicy) {
        match policy {
            RetentionPolicy::Span(span) => {
                self.span = Some(self.span.map_or(span, |current| current.max(span)));
            }
            RetentionPolicy::Slots(slots) => {
                self.slots = self.slots.max(slots);
            }
        }
    }
}

impl Default for Retention {
    fn default() -> Self {
        Self::new()
    }
}
