use core::{
    cell::UnsafeCell,
    ptr,
    sync::atomic::{fence, AtomicBool, AtomicU32, Ordering},
};

/// Single writer, multiple readers. Writers never wait, readers retry
/// until they copied a version that was not being written meanwhile.
/// Odd version means a write is in progress.
pub struct ReadSpinLock<T> {
    write_lock: AtomicBool,
    version: AtomicU32,
    data: UnsafeCell<T>,
}

impl<T: Default> Default for ReadSpinLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> ReadSpinLock<T> {
    pub const fn new(data: T) -> Self {
        let data = UnsafeCell::new(data);
        Self { write_lock: AtomicBool::new(false), version: AtomicU32::new(0), data }
    }

    /// Number of completed writes
    pub fn version(&self) -> u32 {
        self.version.load(Ordering::Acquire) / 2
    }
}

impl<T: Copy> ReadSpinLock<T> {
    /// Fails with `Err(true)` if another writer holds the lock
    pub fn write(&self, data: T) -> Result<(), bool> {
        let relaxed = Ordering::Relaxed;
        self.write_lock.compare_exchange(false, true, Ordering::Acquire, relaxed)?;
        self.version.fetch_add(1, relaxed);
        fence(Ordering::Release);
        unsafe { ptr::write_volatile(self.data.get(), data) };
        self.version.fetch_add(1, Ordering::Release);
        self.write_lock.store(false, Ordering::Release);
        Ok(())
    }

    /// Returns the data together with the number of writes it reflects
    pub fn read_versioned(&self) -> (T, u32) {
        loop {
            let version = self.version.load(Ordering::Acquire);
            if version & 1 == 1 {
                core::hint::spin_loop();
                continue;
            }
            let data = unsafe { ptr::read_volatile(self.data.get()) };
            fence(Ordering::Acquire);
            if version == self.version.load(Ordering::Relaxed) {
                return (data, version / 2);
            }
        }
    }

    pub fn read(&self) -> T {
        self.read_versioned().0
    }
}

unsafe impl<T: Send> Sync for ReadSpinLock<T> {}
unsafe impl<T: Send> Send for ReadSpinLock<T> {}

mod test {
    #[test]
    fn test_read_spin_lock() {
        use super::ReadSpinLock;

        let lock = ReadSpinLock::new((0u32, 0u32));
        assert_eq!(lock.read_versioned(), ((0, 0), 0));
        assert_eq!(lock.write((1, 1)), Ok(()));
        assert_eq!(lock.write((2, 2)), Ok(()));
        assert_eq!(lock.read_versioned(), ((2, 2), 2));
        assert_eq!(lock.version(), 2);
    }

    #[test]
    fn test_concurrent_read_never_torn() {
        use std::sync::Arc;
        use std::thread;

        use super::ReadSpinLock;

        let lock = Arc::new(ReadSpinLock::new([0u64; 8]));
        let writer = {
            let lock = lock.clone();
            thread::spawn(move || {
                for i in 1..=10000u64 {
                    lock.write([i; 8]).ok();
                }
            })
        };
        for _ in 0..10000 {
            let data = lock.read();
            assert!(data.iter().all(|&v| v == data[0]));
        }
        writer.join().ok();
        assert_eq!(lock.read(), [10000u64; 8]);
    }
}
