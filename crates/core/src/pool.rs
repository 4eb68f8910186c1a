//! MIDI CC number pool.
//!
//! Buttons turned into MIDI triggers each need their own CC number so the
//! console emits a distinct control change per button. The pool hands out the
//! lowest free number first and never gives out a number that is still owned.

use crate::error::MixerError;
use crate::mapping::LogicalButtonId;

/// Number of MIDI CC slots.
pub const CC_SLOTS: usize = 128;

/// A CC number together with the button that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CcAllocation {
    pub cc: u8,
    pub owner: LogicalButtonId,
}

pub struct CcPool {
    slots: [Option<LogicalButtonId>; CC_SLOTS],
}

impl CcPool {
    pub fn new() -> Self {
        Self {
            slots: [None; CC_SLOTS],
        }
    }

    /// Claim the lowest free CC number for `owner`.
    pub fn allocate(&mut self, owner: LogicalButtonId) -> Result<u8, MixerError> {
        let cc = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(MixerError::PoolExhausted)?;
        self.slots[cc] = Some(owner);
        log::debug!("Allocated CC {} to button {}", cc, owner);
        Ok(cc as u8)
    }

    /// Free a CC number. Unknown or already free numbers are ignored.
    pub fn release(&mut self, cc: u8) -> Option<LogicalButtonId> {
        let owner = self.slots.get_mut(usize::from(cc)).and_then(Option::take);
        if let Some(owner) = owner {
            log::debug!("Released CC {} from button {}", cc, owner);
        }
        owner
    }

    /// Hand `cc` to `owner` if it is free or already theirs.
    ///
    /// Used when a caller re-configures a button with a CC it got earlier.
    pub fn claim(&mut self, cc: u8, owner: LogicalButtonId) -> bool {
        match self.slots.get_mut(usize::from(cc)) {
            Some(slot @ None) => {
                *slot = Some(owner);
                true
            }
            Some(Some(current)) => *current == owner,
            None => false,
        }
    }

    pub fn owner_of(&self, cc: u8) -> Option<LogicalButtonId> {
        self.slots.get(usize::from(cc)).copied().flatten()
    }

    /// Lowest CC currently owned by `owner`.
    pub fn cc_owned_by(&self, owner: LogicalButtonId) -> Option<u8> {
        self.slots
            .iter()
            .position(|slot| *slot == Some(owner))
            .map(|cc| cc as u8)
    }

    /// Free every CC owned by `owner` and return them.
    pub fn release_owner(&mut self, owner: LogicalButtonId) -> Vec<u8> {
        let mut released = Vec::new();
        for (cc, slot) in self.slots.iter_mut().enumerate() {
            if *slot == Some(owner) {
                *slot = None;
                released.push(cc as u8);
            }
        }
        if !released.is_empty() {
            log::debug!("Released CCs {:?} from button {}", released, owner);
        }
        released
    }

    /// All live allocations, in CC order.
    pub fn allocations(&self) -> Vec<CcAllocation> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(cc, owner)| owner.map(|owner| CcAllocation { cc: cc as u8, owner }))
            .collect()
    }

    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Free every slot.
    pub fn reset(&mut self) {
        self.slots = [None; CC_SLOTS];
    }
}

impl Default for CcPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUTTON: LogicalButtonId = LogicalButtonId::compact(1, 1);

    #[test]
    fn test_exhaustion_after_128() {
        let mut pool = CcPool::new();
        let mut seen = Vec::new();
        for expected in 0..CC_SLOTS {
            let cc = pool.allocate(BUTTON).unwrap();
            assert_eq!(usize::from(cc), expected);
            seen.push(cc);
        }
        seen.dedup();
        assert_eq!(seen.len(), CC_SLOTS);
        assert!(seen.iter().all(|cc| *cc <= 127));
        assert!(matches!(pool.allocate(BUTTON), Err(MixerError::PoolExhausted)));
    }

    #[test]
    fn test_release_makes_slot_reusable() {
        let mut pool = CcPool::new();
        for _ in 0..CC_SLOTS {
            pool.allocate(BUTTON).unwrap();
        }
        assert_eq!(pool.release(42), Some(BUTTON));
        assert_eq!(pool.allocate(LogicalButtonId::compact(2, 2)).unwrap(), 42);
        assert_eq!(pool.owner_of(42), Some(LogicalButtonId::compact(2, 2)));
    }

    #[test]
    fn test_release_unknown_is_noop() {
        let mut pool = CcPool::new();
        assert_eq!(pool.release(7), None);
        assert_eq!(pool.release(200), None);

        let cc = pool.allocate(BUTTON).unwrap();
        assert_eq!(pool.release(cc), Some(BUTTON));
        assert_eq!(pool.release(cc), None);
        assert_eq!(pool.live_count(), 0);
    }

    #[test]
    fn test_claim_respects_other_owners() {
        let mut pool = CcPool::new();
        let other = LogicalButtonId::compact(3, 4);
        assert!(pool.claim(10, BUTTON));
        assert!(pool.claim(10, BUTTON));
        assert!(!pool.claim(10, other));
        assert!(!pool.claim(128, other));
        // Lowest free slot skips the claimed one
        assert_eq!(pool.allocate(other).unwrap(), 0);
        assert_eq!(pool.allocations().len(), 2);
    }

    #[test]
    fn test_lookup_and_release_by_owner() {
        let mut pool = CcPool::new();
        let other = LogicalButtonId::compact(2, 1);
        assert_eq!(pool.cc_owned_by(BUTTON), None);

        pool.allocate(other).unwrap();
        assert!(pool.claim(5, BUTTON));
        assert!(pool.claim(9, BUTTON));
        assert_eq!(pool.cc_owned_by(BUTTON), Some(5));

        assert_eq!(pool.release_owner(BUTTON), vec![5, 9]);
        assert_eq!(pool.cc_owned_by(BUTTON), None);
        assert_eq!(pool.release_owner(BUTTON), Vec::<u8>::new());
        assert_eq!(pool.owner_of(0), Some(other));
    }

    #[test]
    fn test_reset_frees_everything() {
        let mut pool = CcPool::new();
        for _ in 0..5 {
            pool.allocate(BUTTON).unwrap();
        }
        pool.reset();
        assert_eq!(pool.live_count(), 0);
        assert_eq!(pool.allocate(BUTTON).unwrap(), 0);
    }
}
