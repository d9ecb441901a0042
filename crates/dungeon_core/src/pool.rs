//! Fixed-capacity arena of reusable slots.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotHandle(u32);

impl SlotHandle {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SlotHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot#{}", self.0)
    }
}

/// Every slot is allocated up front; `acquire` hands out the lowest
/// inactive slot and `release` returns it.
#[derive(Debug, Clone)]
pub struct Pool<T> {
    slots: Vec<T>,
    active: Vec<bool>,
}

impl<T> Pool<T> {
    pub fn from_fn(capacity: usize, mut make: impl FnMut(usize) -> T) -> Self {
        Self {
            slots: (0..capacity).map(&mut make).collect(),
            active: vec![false; capacity],
        }
    }

    /// `None` when every slot is in use.
    pub fn acquire(&mut self) -> Option<(SlotHandle, &mut T)> {
        let idx = self.active.iter().position(|active| !active)?;
        self.active[idx] = true;
        Some((SlotHandle(idx as u32), &mut self.slots[idx]))
    }

    /// Returns false for an unknown or already released handle.
    pub fn release(&mut self, handle: SlotHandle) -> bool {
        match self.active.get_mut(handle.index()) {
            Some(active) if *active => {
                *active = false;
                true
            }
            _ => false,
        }
    }

    pub fn is_active(&self, handle: SlotHandle) -> bool {
        self.active.get(handle.index()).copied().unwrap_or(false)
    }

    pub fn get(&self, handle: SlotHandle) -> Option<&T> {
        self.slots.get(handle.index())
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn active_count(&self) -> usize {
        self.active.iter().filter(|active| **active).count()
    }

    pub fn iter_active(&self) -> impl Iterator<Item = (SlotHandle, &T)> {
        self.slots
            .iter()
            .zip(&self.active)
            .enumerate()
            .filter(|(_, (_, active))| **active)
            .map(|(idx, (value, _))| (SlotHandle(idx as u32), value))
    }
}

impl<T: PartialEq> Pool<T> {
    pub fn handle_of(&self, value: &T) -> Option<SlotHandle> {
        self.slots
            .iter()
            .position(|slot| slot == value)
            .map(|idx| SlotHandle(idx as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_reuses_released_slots() {
        let mut pool = Pool::from_fn(2, |idx| idx * 10);
        let (a, value) = pool.acquire().unwrap();
        assert_eq!(*value, 0);
        let (b, _) = pool.acquire().unwrap();
        assert!(pool.acquire().is_none());
        assert_eq!(pool.active_count(), 2);

        assert!(pool.release(a));
        assert!(!pool.release(a), "double release is rejected");
        let (again, _) = pool.acquire().unwrap();
        assert_eq!(again, a);
        assert!(pool.is_active(b));
    }

    #[test]
    fn lookup_by_value() {
        let mut pool = Pool::from_fn(3, |idx| format!("knife-{idx}"));
        let handle = pool.handle_of(&"knife-2".to_string()).unwrap();
        assert_eq!(handle.index(), 2);
        assert!(!pool.is_active(handle));
        pool.acquire();
        let active: Vec<_> = pool.iter_active().map(|(h, v)| (h.index(), v.clone())).collect();
        assert_eq!(active, vec![(0, "knife-0".to_string())]);
        assert_eq!(pool.get(handle).map(String::as_str), Some("knife-2"));
    }
}
