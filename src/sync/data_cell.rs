use core::cell::Cell;

use embassy_sync::blocking_mutex::{raw::CriticalSectionRawMutex, Mutex};

/// A small thread-safe cell for sharing `Copy` snapshots between tasks.
///
/// Reads and writes are whole-value and go through a blocking mutex, so a
/// reader never observes a torn value.
pub struct DataCell<T: Copy> {
    storage: Mutex<CriticalSectionRawMutex, Cell<T>>,
}

impl<T: Copy> DataCell<T> {
    pub const fn new(init: T) -> Self {
        Self {
            storage: Mutex::new(Cell::new(init)),
        }
    }

    pub fn write(&self, data: T) {
        self.storage.lock(|cell| cell.set(data));
    }

    pub fn read(&self) -> T {
        self.storage.lock(|cell| cell.get())
    }

    /// Read-modify-write under a single lock.
    pub fn modify(&self, f: impl FnOnce(&mut T)) {
        self.storage.lock(|cell| {
            let mut value = cell.get();
            f(&mut value);
            cell.set(value);
        });
    }
}

impl<T: Copy + Default> Default for DataCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
