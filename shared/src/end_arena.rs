use crate::types::ObjectIndex;

/// A slot index paired with the generation it was issued under. A handle
/// outlives the value it names safely: once the slot is freed and reused, the
/// generation no longer matches and lookups return `None`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EndHandle {
    object: ObjectIndex,
    generation: u32,
}

impl EndHandle {
    pub fn object(&self) -> ObjectIndex {
        self.object
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

pub struct EndArena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<ObjectIndex>,
    len: usize,
}

impl<T> EndArena<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    /// The object index the next `insert` will use.
    pub fn next_object(&self) -> ObjectIndex {
        match self.free.last() {
            Some(object) => *object,
            None => self.slots.len() as ObjectIndex,
        }
    }

    /// Stores `value`, reusing the most recently freed slot if there is one.
    pub fn insert(&mut self, value: T) -> EndHandle {
        self.len += 1;

        if let Some(object) = self.free.pop() {
            let slot = &mut self.slots[object as usize];
            slot.value = Some(value);
            return EndHandle {
                object,
                generation: slot.generation,
            };
        }

        let object = self.slots.len() as ObjectIndex;
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        EndHandle {
            object,
            generation: 0,
        }
    }

    pub fn get(&self, handle: &EndHandle) -> Option<&T> {
        let slot = self.slots.get(handle.object as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.value.as_ref()
    }

    pub fn get_mut(&mut self, handle: &EndHandle) -> Option<&mut T> {
        let slot = self.slots.get_mut(handle.object as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.value.as_mut()
    }

    /// Resolves the live handle for an object index, if that slot is occupied.
    pub fn handle_of(&self, object: ObjectIndex) -> Option<EndHandle> {
        let slot = self.slots.get(object as usize)?;
        slot.value.as_ref()?;
        Some(EndHandle {
            object,
            generation: slot.generation,
        })
    }

    pub fn remove(&mut self, handle: &EndHandle) -> Option<T> {
        let slot = self.slots.get_mut(handle.object as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.object);
        self.len -= 1;
        Some(value)
    }

    pub fn contains(&self, handle: &EndHandle) -> bool {
        self.get(handle).is_some()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (EndHandle, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value.as_ref().map(|value| {
                (
                    EndHandle {
                        object: index as ObjectIndex,
                        generation: slot.generation,
                    },
                    value,
                )
            })
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EndHandle, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(index, slot)| {
                let generation = slot.generation;
                slot.value.as_mut().map(|value| {
                    (
                        EndHandle {
                            object: index as ObjectIndex,
                            generation,
                        },
                        value,
                    )
                })
            })
    }
}

impl<T> Default for EndArena<T> {
    fn default() -> Self {
        Self::new()
    }
}
