use std::collections::HashMap;

use colonia_protocol::ObjectId;

use crate::GameError;

/// Generational handle into a [`Registry`]. Never leaves the server.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId {
    pub index: u32,
    pub generation: u32,
}

impl EntityId {
    #[inline]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }
}

#[derive(Clone, Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<(ObjectId, T)>,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self {
            generation: 0,
            value: None,
        }
    }
}

/// Deterministic, generational storage for game objects, addressable by
/// their public `ObjectId`.
///
/// - Stable iteration order: ascending slot index.
/// - Removing an object retires its id: later lookups miss.
#[derive(Clone, Debug)]
pub struct Registry<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    by_id: HashMap<ObjectId, EntityId>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            by_id: HashMap::new(),
        }
    }
}

impl<T> Registry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn insert(&mut self, id: ObjectId, value: T) -> Result<EntityId, GameError> {
        if self.by_id.contains_key(&id) {
            return Err(GameError::DuplicateId(id));
        }
        let handle = if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            debug_assert!(slot.value.is_none());
            slot.value = Some((id.clone(), value));
            EntityId::new(index, slot.generation)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                value: Some((id.clone(), value)),
            });
            EntityId::new(index, 0)
        };
        self.by_id.insert(id, handle);
        Ok(handle)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn handle(&self, id: &str) -> Option<EntityId> {
        self.by_id.get(id).copied()
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.get_by_handle(self.handle(id)?)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut T> {
        let handle = self.handle(id)?;
        self.get_by_handle_mut(handle)
    }

    pub fn get_by_handle(&self, handle: EntityId) -> Option<&T> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation == handle.generation {
            slot.value.as_ref().map(|(_, v)| v)
        } else {
            None
        }
    }

    pub fn get_by_handle_mut(&mut self, handle: EntityId) -> Option<&mut T> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation == handle.generation {
            slot.value.as_mut().map(|(_, v)| v)
        } else {
            None
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<T> {
        let handle = self.by_id.remove(id)?;
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let (_, value) = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        Some(value)
    }

    pub fn iter_ordered(&self) -> impl Iterator<Item = (&ObjectId, &T)> {
        self.slots
            .iter()
            .filter_map(|slot| slot.value.as_ref().map(|(id, v)| (id, v)))
    }

    pub fn iter_ordered_mut(&mut self) -> impl Iterator<Item = (&ObjectId, &mut T)> {
        self.slots
            .iter_mut()
            .filter_map(|slot| slot.value.as_mut().map(|(id, v)| (&*id, v)))
    }
}
