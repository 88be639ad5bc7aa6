use core::time;

#[cfg(all(not(test), not(feature = "std")))]
extern "Rust" {
    fn get_jiffies() -> time::Duration;
}

#[cfg(all(not(test), not(feature = "std")))]
pub fn get() -> time::Duration {
    unsafe { get_jiffies() }
}

#[cfg(all(not(test), feature = "std"))]
pub fn get() -> time::Duration {
    use std::{sync::OnceLock, time::Instant};

    static EPOCH: OnceLock<Instant> = OnceLock::new();
    EPOCH.get_or_init(Instant::now).elapsed()
}

#[cfg(test)]
static MILLIS: core::sync::atomic::AtomicU64 = core::sync::atomic::AtomicU64::new(1000);

#[cfg(test)]
pub fn get() -> time::Duration {
    time::Duration::from_millis(MILLIS.load(core::sync::atomic::Ordering::Relaxed))
}

#[cfg(test)]
pub fn set(jiffies: time::Duration) {
    MILLIS.store(jiffies.as_millis() as u64, core::sync::atomic::Ordering::Relaxed)
}

#[cfg(test)]
pub fn advance(delta: time::Duration) {
    MILLIS.fetch_add(delta.as_millis() as u64, core::sync::atomic::Ordering::Relaxed);
}
