use std::collections::BTreeSet;
use std::fmt;

use tracing::debug;

use crate::cursor::ResultCursor;
use crate::error::CatalogSqlError;

/// Small integer handle for a cursor in a [`CursorRegistry`].
///
/// The slot index is what callers see; the generation makes a handle to a freed
/// slot detectably stale even after the slot is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CursorHandle {
    index: usize,
    generation: u32,
}

impl CursorHandle {
    #[must_use]
    pub fn index(self) -> usize {
        self.index
    }
}

impl fmt::Display for CursorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.index, self.generation)
    }
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    cursor: Option<ResultCursor>,
}

/// Arena of live cursors addressed by [`CursorHandle`].
///
/// Freed slots are reused lowest index first, so the table stays as small as the
/// peak number of cursors open at once.
#[derive(Debug, Default)]
pub struct CursorRegistry {
    slots: Vec<Slot>,
    free: BTreeSet<usize>,
}

impl CursorRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of `cursor` and return its handle.
    pub fn allocate(&mut self, cursor: ResultCursor) -> CursorHandle {
        let index = match self.free.pop_first() {
            Some(index) => index,
            None => {
                self.slots.push(Slot::default());
                self.slots.len() - 1
            }
        };
        let slot = &mut self.slots[index];
        slot.cursor = Some(cursor);
        let handle = CursorHandle {
            index,
            generation: slot.generation,
        };
        debug!(%handle, "cursor allocated");
        handle
    }

    /// Drop the cursor behind `handle`, releasing any result it still holds.
    ///
    /// # Errors
    /// Returns [`CatalogSqlError::InvalidCursorHandle`] for a handle that was never
    /// issued or was already freed.
    pub fn free(&mut self, handle: CursorHandle) -> Result<(), CatalogSqlError> {
        let slot = self.live_slot(handle)?;
        slot.cursor = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.insert(handle.index);
        debug!(%handle, "cursor freed");
        Ok(())
    }

    /// # Errors
    /// Returns [`CatalogSqlError::InvalidCursorHandle`] for a stale or unknown handle.
    pub fn get(&self, handle: CursorHandle) -> Result<&ResultCursor, CatalogSqlError> {
        self.slots
            .get(handle.index)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.cursor.as_ref())
            .ok_or(CatalogSqlError::InvalidCursorHandle(handle))
    }

    /// # Errors
    /// Returns [`CatalogSqlError::InvalidCursorHandle`] for a stale or unknown handle.
    pub fn get_mut(&mut self, handle: CursorHandle) -> Result<&mut ResultCursor, CatalogSqlError> {
        self.live_slot(handle)?
            .cursor
            .as_mut()
            .ok_or(CatalogSqlError::InvalidCursorHandle(handle))
    }

    fn live_slot(&mut self, handle: CursorHandle) -> Result<&mut Slot, CatalogSqlError> {
        self.slots
            .get_mut(handle.index)
            .filter(|slot| slot.generation == handle.generation && slot.cursor.is_some())
            .ok_or(CatalogSqlError::InvalidCursorHandle(handle))
    }

    /// Number of cursors currently allocated.
    #[must_use]
    pub fn live(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Number of slots ever created, live or free.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }
}
