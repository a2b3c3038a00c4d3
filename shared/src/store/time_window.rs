use chanmesh_serde::{BitReader, BitWrite, Serde, SerdeErr};

use crate::{error::AccessError, store::entry_descriptor::TimeAspect, types::Tick};

/// Validity of a value: `[start, end)` for Stream data, a single tick
/// (`start == end`) for Event data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimeWindow {
    pub start: Tick,
    pub end: Tick,
}

impl TimeWindow {
    pub fn stream(start: Tick, end: Tick) -> Self {
        Self { start, end }
    }

    pub fn event(tick: Tick) -> Self {
        Self {
            start: tick,
            end: tick,
        }
    }

    pub fn is_event(&self) -> bool {
        self.start == self.end
    }

    /// `start <= t < end`.
    pub fn contains(&self, t: Tick) -> bool {
        self.start <= t && t < self.end
    }

    /// Whether the window ends at or before `t`.
    pub fn is_older_than(&self, aspect: TimeAspect, t: Tick) -> bool {
        match aspect {
            TimeAspect::Stream => self.end <= t,
            TimeAspect::Event => self.start < t,
        }
    }

    pub fn validate(&self, aspect: TimeAspect) -> Result<(), AccessError> {
        let valid = match aspect {
            TimeAspect::Stream => self.start < self.end,
            TimeAspect::Event => self.start == self.end,
        };
        if valid {
            Ok(())
        } else {
            Err(AccessError::InvalidWindow {
                aspect,
                start: self.start,
                end: self.end,
            })
        }
    }
}

impl Serde for TimeWindow {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.start.ser(writer);
        let event = self.is_event();
        event.ser(writer);
        if !event {
            self.end.ser(writer);
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let start = Tick::de(reader)?;
        if bool::de(reader)? {
            return Ok(Self::event(start));
        }
        let end = Tick::de(reader)?;
        Ok(Self { start, end })
    }
}
