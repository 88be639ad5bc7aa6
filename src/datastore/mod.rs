use core::sync::atomic::{AtomicU32, Ordering};

use crate::{protocol::serial::gnss::out::NavigationSolution, sync::ReadSpinLock};

/// Last committed navigation solution.
///
/// Freshness is kept as the version last handed out by `get_and_clear`,
/// so an update racing with a reader is never lost.
pub struct NavigationStore {
    solution: ReadSpinLock<NavigationSolution>,
    consumed: AtomicU32,
}

impl Default for NavigationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NavigationStore {
    pub const fn new() -> Self {
        Self { solution: ReadSpinLock::new(NavigationSolution::EMPTY), consumed: AtomicU32::new(0) }
    }

    pub fn update(&self, candidate: NavigationSolution) {
        if self.solution.write(candidate).is_err() {
            error!("Navigation solution write conflict")
        }
    }

    pub fn get_and_clear(&self) -> NavigationSolution {
        let (mut solution, version) = self.solution.read_versioned();
        solution.fresh = self.consumed.swap(version, Ordering::AcqRel) != version;
        solution
    }

    /// Same as `get_and_clear` without consuming freshness
    pub fn peek(&self) -> NavigationSolution {
        let (mut solution, version) = self.solution.read_versioned();
        solution.fresh = self.consumed.load(Ordering::Acquire) != version;
        solution
    }

    pub fn has_fix(&self) -> bool {
        self.solution.read().has_fix()
    }

    pub fn updates(&self) -> u32 {
        self.solution.version()
    }
}

mod test {
    #[cfg(test)]
    use crate::protocol::serial::gnss::out::{FixStatus, NavigationSolution};

    #[cfg(test)]
    fn solution(latitude: f64, fix: FixStatus) -> NavigationSolution {
        NavigationSolution { latitude, longitude: 11.5, fix, ..NavigationSolution::EMPTY }
    }

    #[test]
    fn test_get_and_clear() {
        use super::NavigationStore;

        let store = NavigationStore::new();
        assert_eq!(store.get_and_clear().fresh, false);

        store.update(solution(48.1, FixStatus::Fix3D));
        let first = store.get_and_clear();
        assert_eq!(first.fresh, true);
        assert_eq!(first.latitude, 48.1);
        let second = store.get_and_clear();
        assert_eq!(second.fresh, false);
        assert_eq!(second.latitude, 48.1);

        store.update(solution(48.2, FixStatus::Fix3D));
        assert_eq!(store.peek().fresh, true);
        let third = store.get_and_clear();
        assert_eq!(third.fresh, true);
        assert_eq!(third.latitude, 48.2);
        assert_eq!(store.updates(), 2);
    }

    #[test]
    fn test_has_fix() {
        use super::NavigationStore;

        let store = NavigationStore::new();
        assert_eq!(store.has_fix(), false);
        store.update(solution(48.1, FixStatus::DeadReckoning));
        assert_eq!(store.has_fix(), false);
        store.update(solution(48.1, FixStatus::Fix2D));
        assert_eq!(store.has_fix(), true);
        store.update(solution(48.1, FixStatus::Fix3D));
        assert_eq!(store.has_fix(), true);
        store.update(solution(48.1, FixStatus::NoFix));
        assert_eq!(store.has_fix(), false);
    }
}
