//! High-resolution timebase and callout scheduler
//!
//! Wraps a free-running hardware counter into a monotonic, wrap-safe,
//! microsecond clock and dispatches deadline-ordered callouts from the
//! timer interrupt. This is the timing primitive every other subsystem
//! builds on: drivers arm one-shot timeouts, the control loops run as
//! periodic callouts.
//!
//! All shared state sits behind a critical section (interrupt masking, not
//! a blocking lock); the only operations performed with the section held
//! are timebase read-modify-write and queue manipulation. Callbacks run at
//! dispatch level and must be short and non-blocking — that is a caller
//! contract, not something the core enforces.
//!
//! Timing anomalies never propagate as errors: fidelity is observable
//! through the latency histogram, the self-test flag and the log, and a
//! missed compare match recovers on the next overflow or compare interrupt.

pub mod callout;
pub mod config;
pub mod latency;
pub mod timebase;

mod queue;

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, Ordering};

use critical_section::Mutex;

use crate::platform::{CounterInterface, PlatformError, Result};

pub use callout::{CalloutFn, CalloutHandle, MAX_CALLOUTS};
pub use config::HrtConfig;
pub use latency::{LATENCY_BUCKETS, LATENCY_BUCKET_COUNT};

use callout::CalloutSlot;
use latency::LatencyHistogram;
use queue::CalloutQueue;
use timebase::Timebase;

/// Lead time of the startup self-test compare event, in microseconds
const SELFTEST_DELAY_US: u64 = 200;

/// How long the self-test waits for its compare interrupt, in microseconds
const SELFTEST_TIMEOUT_US: u64 = 2_000;

/// Iteration bound of the self-test poll loop; a counter that never
/// advances must not hang initialization.
const SELFTEST_POLL_LIMIT: u32 = 100_000;

/// Scheduler state shared between task context and the interrupt handler
struct Inner<C: CounterInterface> {
    counter: C,
    timebase: Timebase,
    slots: [CalloutSlot; MAX_CALLOUTS],
    queue: CalloutQueue,
    min_interval_us: u64,
    max_interval_us: u64,
    /// Compare value most recently armed, for latency accounting
    latency_baseline: u32,
    selftest_expected: bool,
    selftest_done: bool,
}

/// High-resolution timer and callout scheduler
///
/// One instance per system, generic over the counter backend. Create it
/// with [`Hrt::new`], call [`Hrt::initialize`] once during bring-up, and
/// route the timer interrupt to [`Hrt::on_timer_interrupt`].
pub struct Hrt<C: CounterInterface> {
    inner: Mutex<RefCell<Inner<C>>>,
    latency: LatencyHistogram,
    ready: AtomicBool,
    self_test_passed: AtomicBool,
    config_valid: AtomicBool,
}

impl<C: CounterInterface> Hrt<C> {
    /// Create a scheduler over the given counter
    ///
    /// An invalid configuration is replaced by [`HrtConfig::default`],
    /// logged, and latched in [`Hrt::config_valid`] — the system keeps a
    /// running clock with mistrusted scaling rather than refusing to boot.
    pub fn new(counter: C, config: HrtConfig) -> Self {
        let (config, config_valid) = match config.validate() {
            Ok(()) => (config, true),
            Err(_) => {
                crate::log_error!("hrt: invalid timer configuration, falling back to defaults");
                (HrtConfig::default(), false)
            }
        };

        Self {
            inner: Mutex::new(RefCell::new(Inner {
                counter,
                timebase: Timebase::new(&config),
                slots: [CalloutSlot::idle(); MAX_CALLOUTS],
                queue: CalloutQueue::new(),
                min_interval_us: config.min_interval_us,
                max_interval_us: config.max_interval_us,
                latency_baseline: 0,
                selftest_expected: false,
                selftest_done: false,
            })),
            latency: LatencyHistogram::new(),
            ready: AtomicBool::new(false),
            self_test_passed: AtomicBool::new(false),
            config_valid: AtomicBool::new(config_valid),
        }
    }

    /// Start the counter and verify the interrupt pipeline
    ///
    /// Runs once at the end of timer bring-up, after the board has attached
    /// the timer interrupt to [`Hrt::on_timer_interrupt`]. Failures are
    /// logged and latched, never propagated: callers that depend on
    /// verified scheduling fidelity poll [`Hrt::self_test_passed`].
    pub fn initialize(&self) {
        let started = critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            let result = inner.counter.start();

            if result.is_ok() {
                let count = inner.counter.read();
                inner.timebase.update(count);
                inner.counter.enable_overflow_interrupt();
            }

            result
        });

        if started.is_err() {
            crate::log_error!("hrt: counter failed to start");
            self.config_valid.store(false, Ordering::Relaxed);
            self.ready.store(true, Ordering::Release);
            return;
        }

        let passed = self.run_self_test();
        self.self_test_passed.store(passed, Ordering::Relaxed);

        if passed {
            crate::log_info!("hrt: self-test passed");
        } else {
            crate::log_error!("hrt: self-test failed (no compare interrupt)");
        }

        self.ready.store(true, Ordering::Release);
    }

    /// Current monotonic time in microseconds
    ///
    /// Never wraps in practice; measured from an arbitrary epoch shortly
    /// after system start.
    pub fn absolute_time(&self) -> u64 {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).absolute_time_locked())
    }

    /// Interrupt-safe snapshot of the current time into `slot`
    pub fn store_absolute_time(&self, slot: &mut u64) {
        critical_section::with(|cs| {
            *slot = self.inner.borrow_ref_mut(cs).absolute_time_locked();
        });
    }

    /// Microseconds elapsed since `since` (saturating)
    pub fn elapsed_time(&self, since: u64) -> u64 {
        self.absolute_time().saturating_sub(since)
    }

    /// Claim a callout slot from the pool
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::ResourceUnavailable` when all
    /// [`MAX_CALLOUTS`] slots are claimed.
    pub fn callout_alloc(&self) -> Result<CalloutHandle> {
        critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);

            for (index, slot) in inner.slots.iter_mut().enumerate() {
                if !slot.in_use {
                    *slot = CalloutSlot::idle();
                    slot.in_use = true;
                    return Ok(CalloutHandle { index: index as u8 });
                }
            }

            Err(PlatformError::ResourceUnavailable)
        })
    }

    /// Cancel the callout and return its slot to the pool
    pub fn callout_release(&self, handle: CalloutHandle) {
        critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            inner.queue.remove(handle.index);
            inner.slots[handle.index()] = CalloutSlot::idle();
        });
    }

    /// Invoke `callback(arg)` once, `delay_us` from now
    pub fn schedule_after(
        &self,
        handle: &CalloutHandle,
        delay_us: u64,
        callback: Option<CalloutFn>,
        arg: usize,
    ) {
        critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            let deadline = inner.absolute_time_locked() + delay_us;
            inner.arm(handle.index, deadline, 0, callback, arg);
        });
    }

    /// Invoke `callback(arg)` once at absolute time `deadline_us`
    ///
    /// A deadline already in the past fires as soon as practicable.
    pub fn schedule_at(
        &self,
        handle: &CalloutHandle,
        deadline_us: u64,
        callback: Option<CalloutFn>,
        arg: usize,
    ) {
        critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            inner.arm(handle.index, deadline_us, 0, callback, arg);
        });
    }

    /// Invoke `callback(arg)` after `first_delay_us`, then every `period_us`
    ///
    /// A zero period degrades to a one-shot. Successive deadlines advance
    /// by exactly one period from the previous deadline, so dispatch jitter
    /// does not accumulate into drift.
    pub fn schedule_every(
        &self,
        handle: &CalloutHandle,
        first_delay_us: u64,
        period_us: u64,
        callback: Option<CalloutFn>,
        arg: usize,
    ) {
        critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            let deadline = inner.absolute_time_locked() + first_delay_us;
            inner.arm(handle.index, deadline, period_us, callback, arg);
        });
    }

    /// Remove the callout from the queue
    ///
    /// Idempotent: canceling an unqueued or already-fired callout is a
    /// no-op. Effective immediately — once this returns the callout will
    /// not fire, even if it was the next dispatch target.
    pub fn cancel(&self, handle: &CalloutHandle) {
        critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            inner.queue.remove(handle.index);

            let slot = &mut inner.slots[handle.index()];
            slot.deadline = 0;
            // Also stop a periodic callout canceled from within its own
            // callback from being re-entered when the callback returns.
            slot.period = 0;
        });
    }

    /// True once a one-shot callout has fired and been removed
    ///
    /// Always false for a queued callout; always false for periodic
    /// callouts while they keep being re-armed.
    pub fn is_fired(&self, handle: &CalloutHandle) -> bool {
        critical_section::with(|cs| {
            self.inner.borrow_ref_mut(cs).slots[handle.index()].deadline == 0
        })
    }

    /// Push the next firing of a periodic callout to `delay_us` from now
    ///
    /// Intended to be called from within the callout's own callback; the
    /// dispatcher honors the adjusted deadline instead of advancing by one
    /// period.
    pub fn delay_next(&self, handle: &CalloutHandle, delay_us: u64) {
        critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            let now = inner.absolute_time_locked();
            inner.slots[handle.index()].deadline = now + delay_us;
        });
    }

    /// Armed deadline of the callout in microseconds, 0 when idle (diagnostic)
    pub fn deadline(&self, handle: &CalloutHandle) -> u64 {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).slots[handle.index()].deadline)
    }

    /// Number of callouts currently queued (diagnostic)
    pub fn pending_callouts(&self) -> usize {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).queue.len())
    }

    /// Number of counter wraps observed so far (diagnostic)
    pub fn wrap_count(&self) -> u32 {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).timebase.wrap_count())
    }

    /// Latency histogram bucket counts, overflow bucket last
    pub fn latency_counts(&self) -> [u32; LATENCY_BUCKET_COUNT + 1] {
        self.latency.counts()
    }

    /// Upper bounds of the latency buckets, in ticks
    pub fn latency_buckets(&self) -> [u32; LATENCY_BUCKET_COUNT] {
        LATENCY_BUCKETS
    }

    /// True once [`Hrt::initialize`] has completed
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// True if the startup self-test saw its compare interrupt
    pub fn self_test_passed(&self) -> bool {
        self.self_test_passed.load(Ordering::Relaxed)
    }

    /// False if the configuration was rejected or the counter failed to start
    ///
    /// Callers needing trustworthy absolute timing should check this flag
    /// once after initialization.
    pub fn config_valid(&self) -> bool {
        self.config_valid.load(Ordering::Relaxed)
    }

    /// Timer interrupt entry point
    ///
    /// Call from the timer ISR. Rolls the timebase on overflow, dispatches
    /// due callouts on compare match and reprograms the compare unit for
    /// the next deadline. A single compare interrupt may dispatch several
    /// callouts if multiple deadlines have elapsed.
    pub fn on_timer_interrupt(&self) {
        let events = critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            let events = inner.counter.take_events();

            if events.overflow {
                // Roll the timebase forward over the wrap, independent of
                // whether any callout is pending.
                let _ = inner.absolute_ticks_locked();
            }

            if events.compare {
                let observed = inner.counter.read();
                inner.counter.disable_compare_interrupt();

                if inner.selftest_expected {
                    inner.selftest_done = true;
                }

                let armed = inner.latency_baseline;
                let mask = inner.timebase.mask();
                self.latency.record(observed.wrapping_sub(armed) & mask);
            }

            events
        });

        if events.compare {
            self.invoke_due();
        }

        if events.any() {
            critical_section::with(|cs| {
                self.inner.borrow_ref_mut(cs).reschedule_locked();
            });
        }
    }

    /// Service pending timer events by polling
    ///
    /// For environments without asynchronous interrupt delivery (mock
    /// counter, simulation); the startup self-test also polls through here.
    pub fn poll(&self) {
        self.on_timer_interrupt();
    }

    /// Direct access to the counter backend
    ///
    /// Intended for simulation and host tests driving a mock counter.
    #[cfg(any(test, feature = "mock"))]
    pub fn with_counter<R>(&self, f: impl FnOnce(&mut C) -> R) -> R {
        critical_section::with(|cs| f(&mut self.inner.borrow_ref_mut(cs).counter))
    }

    /// Pop and invoke every queue head whose deadline has elapsed
    ///
    /// The due entry is removed and zeroed under the lock, then its
    /// callback runs outside of it, so the callback is free to reschedule
    /// or cancel callouts — including the one being dispatched.
    fn invoke_due(&self) {
        loop {
            let due = critical_section::with(|cs| {
                let mut inner = self.inner.borrow_ref_mut(cs);
                let now = inner.absolute_time_locked();

                let head = match inner.queue.peek() {
                    Some(index) => index,
                    None => return None,
                };

                let slot = inner.slots[usize::from(head)];
                if slot.deadline > now {
                    return None;
                }

                inner.queue.pop();
                inner.slots[usize::from(head)].deadline = 0;
                Some((head, slot, now))
            });

            let (index, slot, now) = match due {
                Some(due) => due,
                None => break,
            };

            if let Some(callback) = slot.callback {
                callback(slot.arg);
            }

            if slot.period != 0 {
                critical_section::with(|cs| {
                    self.inner
                        .borrow_ref_mut(cs)
                        .reenter_periodic(index, slot.deadline, now);
                });
            }
        }
    }

    /// Arm a near-term compare event and wait for the interrupt path to
    /// acknowledge it
    ///
    /// Availability over strictness: a failure leaves the subsystem running
    /// with unverified scheduling fidelity instead of halting boot.
    fn run_self_test(&self) -> bool {
        critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            inner.selftest_expected = true;
            inner.selftest_done = false;

            let delay_ticks = inner.timebase.usec_to_ticks(SELFTEST_DELAY_US) as u32;
            let count = inner.counter.read();
            let mask = inner.timebase.mask();
            let compare = count.wrapping_add(delay_ticks) & mask;

            inner.latency_baseline = compare;
            inner.counter.set_compare(compare);
            inner.counter.enable_compare_interrupt();
        });

        let start = self.absolute_time();
        let mut polls: u32 = 0;

        let done = loop {
            self.poll();

            if critical_section::with(|cs| self.inner.borrow_ref(cs).selftest_done) {
                break true;
            }

            if self.elapsed_time(start) >= SELFTEST_TIMEOUT_US {
                break false;
            }

            polls += 1;
            if polls >= SELFTEST_POLL_LIMIT {
                break false;
            }

            core::hint::spin_loop();
        };

        critical_section::with(|cs| {
            let mut inner = self.inner.borrow_ref_mut(cs);
            if inner.queue.is_empty() {
                inner.counter.disable_compare_interrupt();
            }
            inner.selftest_expected = false;
        });

        done
    }
}

impl<C: CounterInterface> Inner<C> {
    /// Read the counter and fold it into the 64-bit timebase
    fn absolute_ticks_locked(&mut self) -> u64 {
        let count = self.counter.read();
        self.timebase.update(count)
    }

    fn absolute_time_locked(&mut self) -> u64 {
        let ticks = self.absolute_ticks_locked();
        self.timebase.ticks_to_usec(ticks)
    }

    /// Set up a callout slot and queue it
    ///
    /// Re-arming an already-queued callout removes and reinserts it.
    fn arm(&mut self, index: u8, deadline: u64, period: u64, callback: Option<CalloutFn>, arg: usize) {
        let idx = usize::from(index);

        if self.slots[idx].deadline != 0 {
            self.queue.remove(index);
        }

        // 0 is the idle sentinel; a boot-instant deadline lands on tick 1
        self.slots[idx].deadline = deadline.max(1);
        self.slots[idx].period = period;
        self.slots[idx].callback = callback;
        self.slots[idx].arg = arg;

        if self.queue.insert(index, &self.slots) {
            // New earliest deadline, retarget the compare unit
            self.reschedule_locked();
        }
    }

    /// Re-queue a periodic callout after its callback ran
    fn reenter_periodic(&mut self, index: u8, fired_deadline: u64, now: u64) {
        if self.queue.contains(index) {
            // The callback already re-armed this callout itself
            return;
        }

        let idx = usize::from(index);

        if self.slots[idx].period == 0 {
            // Canceled from within its own callback
            return;
        }

        if self.slots[idx].deadline <= now {
            // Advance from the intended deadline, not from "now": dispatch
            // jitter must not accumulate into the period. A deadline the
            // callback moved itself (delay_next) is left alone.
            self.slots[idx].deadline = fired_deadline + self.slots[idx].period;
        }

        if self.queue.insert(index, &self.slots) {
            self.reschedule_locked();
        }
    }

    /// Reprogram the compare unit against the earliest pending deadline
    ///
    /// Must run with the critical section held. With an empty queue the
    /// compare interrupt is disabled; the overflow interrupt alone keeps
    /// the timebase rolling.
    fn reschedule_locked(&mut self) {
        let head = match self.queue.peek() {
            Some(index) => index,
            None => {
                self.counter.disable_compare_interrupt();
                return;
            }
        };

        let count = self.counter.read();
        let now_ticks = self.timebase.update(count);
        let now = self.timebase.ticks_to_usec(now_ticks);
        let head_deadline = self.slots[usize::from(head)].deadline;

        // The counter resolves targets only within one period, and a target
        // too close to "now" risks missing the compare match entirely. An
        // overdue deadline is forced to the minimum lead time so it fires
        // as soon as practicable instead of wrapping to a stale match.
        let mut target = now + self.max_interval_us;
        if head_deadline <= now + self.min_interval_us {
            target = now + self.min_interval_us;
        } else if head_deadline < target {
            target = head_deadline;
        }

        let mut delta_ticks = self.timebase.usec_to_ticks(target - now);
        if delta_ticks == 0 {
            delta_ticks = 1;
        }

        let compare = count.wrapping_add(delta_ticks as u32) & self.timebase.mask();
        self.latency_baseline = compare;
        self.counter.set_compare(compare);
        self.counter.enable_compare_interrupt();
    }
}
