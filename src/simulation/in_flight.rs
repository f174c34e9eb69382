//! In-flight frame limiter
//!
//! Bounds how many frames of GPU work may be outstanding at once. A frame
//! holds a [`FrameSlot`] from the moment it starts issuing until the device
//! reports its submission complete; dropping the slot frees it.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// How long a blocked acquire sleeps before pumping completions again
const PUMP_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Default)]
struct LimiterState {
    in_flight: usize,
    high_water: usize,
}

#[derive(Debug)]
struct LimiterShared {
    capacity: usize,
    state: Mutex<LimiterState>,
    freed: Condvar,
}

impl LimiterShared {
    fn lock(&self) -> MutexGuard<'_, LimiterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release(&self) {
        let mut state = self.lock();
        debug_assert!(state.in_flight > 0, "released more slots than acquired");
        state.in_flight = state.in_flight.saturating_sub(1);
        drop(state);
        self.freed.notify_one();
    }
}

/// Counting gate over outstanding frames
#[derive(Debug, Clone)]
pub struct InFlightLimiter {
    shared: Arc<LimiterShared>,
    stall_warning: Duration,
}

/// Permission for one frame to be in flight
///
/// Move it into the device's completion callback; when dropped the slot
/// returns to the limiter and a blocked [`InFlightLimiter::acquire`] wakes.
#[derive(Debug)]
#[must_use = "dropping a FrameSlot releases it immediately"]
pub struct FrameSlot {
    shared: Arc<LimiterShared>,
}

impl Drop for FrameSlot {
    fn drop(&mut self) {
        self.shared.release();
    }
}

impl InFlightLimiter {
    /// # Panics
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize, stall_warning: Duration) -> Self {
        assert!(capacity > 0, "in-flight capacity must be at least 1");
        Self {
            shared: Arc::new(LimiterShared {
                capacity,
                state: Mutex::new(LimiterState::default()),
                freed: Condvar::new(),
            }),
            stall_warning,
        }
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Frames currently holding a slot
    pub fn in_flight(&self) -> usize {
        self.shared.lock().in_flight
    }

    /// Largest number of slots ever held at once
    pub fn high_water_mark(&self) -> usize {
        self.shared.lock().high_water
    }

    /// Takes a slot if one is free, without blocking
    pub fn try_acquire(&self) -> Option<FrameSlot> {
        let mut state = self.shared.lock();
        self.take(&mut state)
    }

    /// Blocks until a slot is free
    ///
    /// `pump` runs between short waits with the lock released; the engine
    /// passes a non-blocking device poll so completion callbacks (which drop
    /// slots) can fire on this thread. The wait is unbounded: a long stall is
    /// logged once, never abandoned.
    pub fn acquire<F: FnMut()>(&self, mut pump: F) -> FrameSlot {
        let started = Instant::now();
        let mut warned = false;
        loop {
            let in_flight = {
                let mut state = self.shared.lock();
                if let Some(slot) = self.take(&mut state) {
                    return slot;
                }
                let (mut state, _) = self
                    .shared
                    .freed
                    .wait_timeout(state, PUMP_INTERVAL)
                    .unwrap_or_else(PoisonError::into_inner);
                if let Some(slot) = self.take(&mut state) {
                    return slot;
                }
                state.in_flight
            };

            pump();

            let waited = started.elapsed();
            if !warned && waited >= self.stall_warning {
                log::warn!("{}", stall_message(waited, in_flight, self.shared.capacity));
                warned = true;
            }
        }
    }

    fn take(&self, state: &mut LimiterState) -> Option<FrameSlot> {
        if state.in_flight >= self.shared.capacity {
            return None;
        }
        state.in_flight += 1;
        state.high_water = state.high_water.max(state.in_flight);
        Some(FrameSlot {
            shared: Arc::clone(&self.shared),
        })
    }
}

fn stall_message(waited: Duration, in_flight: usize, capacity: usize) -> String {
    format!(
        "Frame acquire stalled for {:.1} ms with {} of {} frames in flight",
        waited.as_secs_f64() * 1000.0,
        in_flight,
        capacity
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;

    #[test]
    fn test_slots_are_bounded_and_released_on_drop() {
        let limiter = InFlightLimiter::new(3, Duration::from_secs(1));
        let a = limiter.try_acquire().unwrap();
        let _b = limiter.try_acquire().unwrap();
        let _c = limiter.try_acquire().unwrap();
        assert!(limiter.try_acquire().is_none());
        assert_eq!(limiter.in_flight(), 3);

        drop(a);
        assert_eq!(limiter.in_flight(), 2);
        assert!(limiter.try_acquire().is_some());
        assert_eq!(limiter.high_water_mark(), 3);
    }

    #[test]
    fn test_fourth_acquire_blocks_until_completion() {
        let limiter = InFlightLimiter::new(3, Duration::from_secs(10));
        let mut held: Vec<FrameSlot> = (0..3).map(|_| limiter.acquire(|| {})).collect();

        let (tx, rx) = mpsc::channel();
        let waiter = {
            let limiter = limiter.clone();
            thread::spawn(move || {
                let slot = limiter.acquire(|| {});
                tx.send(()).unwrap();
                drop(slot);
            })
        };

        assert!(
            rx.recv_timeout(Duration::from_millis(100)).is_err(),
            "fourth frame must wait for a free slot"
        );

        drop(held.remove(0));
        rx.recv_timeout(Duration::from_secs(5))
            .expect("fourth frame should proceed once a slot is released");
        waiter.join().unwrap();
        assert_eq!(limiter.high_water_mark(), 3);
    }

    #[test]
    fn test_pump_can_complete_work_on_the_waiting_thread() {
        let limiter = InFlightLimiter::new(1, Duration::from_secs(10));
        let mut pending = Some(limiter.acquire(|| {}));
        let mut pumps = 0;

        // The completion "callback" only runs when pumped, as with a
        // non-blocking device poll.
        let slot = limiter.acquire(|| {
            pumps += 1;
            drop(pending.take());
        });
        assert!(pumps >= 1);
        drop(slot);
        assert_eq!(limiter.in_flight(), 0);
    }

    #[test]
    fn test_stall_message_reports_observed_count() {
        assert_eq!(
            stall_message(Duration::from_millis(250), 2, 3),
            "Frame acquire stalled for 250.0 ms with 2 of 3 frames in flight"
        );
    }

    #[test]
    fn test_stalled_acquire_still_completes() {
        // Zero threshold: the warning fires on the first wait
        let limiter = InFlightLimiter::new(1, Duration::ZERO);
        let mut pending = Some(limiter.try_acquire().unwrap());
        let mut pumps = 0;
        let slot = limiter.acquire(|| {
            pumps += 1;
            if pumps == 3 {
                drop(pending.take());
            }
        });
        assert_eq!(pumps, 3);
        drop(slot);
        assert_eq!(limiter.in_flight(), 0);
    }

    #[test]
    fn test_burst_never_exceeds_capacity() {
        let limiter = InFlightLimiter::new(3, Duration::from_secs(10));
        let (tx, rx) = mpsc::channel::<FrameSlot>();

        let completer = thread::spawn(move || {
            for slot in rx {
                thread::sleep(Duration::from_micros(50));
                drop(slot);
            }
        });

        let producers: Vec<_> = (0..4)
            .map(|_| {
                let limiter = limiter.clone();
                let tx = tx.clone();
                thread::spawn(move || {
                    for _ in 0..250 {
                        let slot = limiter.acquire(thread::yield_now);
                        assert!(limiter.in_flight() <= 3);
                        tx.send(slot).unwrap();
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.join().unwrap();
        }
        drop(tx);
        completer.join().unwrap();

        assert!(limiter.high_water_mark() <= 3);
        assert_eq!(limiter.in_flight(), 0);
    }
}
