//! Turn timers
//!
//! Every live fight is ticked by a periodic timer. The timer is started when
//! the fight starts and cancelled exactly once, when it ends.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, Thread};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::scheduler::TurnScheduler;

/// Starts periodic ticks for a fight
pub trait TurnTimer: Send + Sync {
    /// Tick `fight` every `interval` time units until the guard is cancelled
    /// or the fight is gone.
    fn start(&self, fight: Weak<TurnScheduler>, interval: u32) -> Box<dyn TimerGuard>;
}

/// Handle to a running timer
pub trait TimerGuard: Send {
    /// Start the current period over, so the next tick is a full interval
    /// away. Must not block.
    fn restart(&self);

    fn cancel(self: Box<Self>);
}

// ============================================================================
// Real-time timer
// ============================================================================

/// One background thread per fight, sleeping between ticks
#[derive(Debug, Clone, Copy)]
pub struct ThreadTimer {
    /// Real duration of one time unit
    time_unit: Duration,
}

impl ThreadTimer {
    pub fn new(time_unit: Duration) -> Self {
        Self { time_unit }
    }
}

impl Default for ThreadTimer {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

/// Flags shared between a guard and its timer thread
#[derive(Default)]
struct Signals {
    stop: AtomicBool,
    restart: AtomicBool,
}

struct ThreadTimerGuard {
    signals: Arc<Signals>,
    thread: Option<Thread>,
}

impl TimerGuard for ThreadTimerGuard {
    fn restart(&self) {
        self.signals.restart.store(true, Ordering::Release);
        if let Some(thread) = &self.thread {
            thread.unpark();
        }
    }

    fn cancel(self: Box<Self>) {
        self.signals.stop.store(true, Ordering::Release);
        // Never join: the timer thread may be the one ending the fight
        if let Some(thread) = &self.thread {
            thread.unpark();
        }
    }
}

impl TurnTimer for ThreadTimer {
    fn start(&self, fight: Weak<TurnScheduler>, interval: u32) -> Box<dyn TimerGuard> {
        let signals = Arc::new(Signals::default());
        let period = self.time_unit * interval.max(1);
        let shared = Arc::clone(&signals);

        let spawned = thread::Builder::new()
            .name("turn-timer".to_string())
            .spawn(move || {
                let mut deadline = Instant::now() + period;
                loop {
                    loop {
                        if shared.stop.load(Ordering::Acquire) {
                            return;
                        }
                        if shared.restart.swap(false, Ordering::AcqRel) {
                            deadline = Instant::now() + period;
                        }
                        let now = Instant::now();
                        if now >= deadline {
                            break;
                        }
                        thread::park_timeout(deadline - now);
                    }

                    let Some(fight) = fight.upgrade() else {
                        return;
                    };
                    if let Err(e) = fight.tick() {
                        log::debug!("Turn timer stopping: {}", e);
                        return;
                    }
                    // A tick that rotated the turn asked for a restart;
                    // the swap above then moves the deadline again.
                    deadline += period;
                }
            });

        let thread = match spawned {
            Ok(handle) => Some(handle.thread().clone()),
            Err(e) => {
                log::error!("Failed to spawn turn timer: {}", e);
                None
            }
        };

        Box::new(ThreadTimerGuard { signals, thread })
    }
}

// ============================================================================
// Manual timer
// ============================================================================

/// Timer that only ticks when told to. Counts starts and cancellations.
#[derive(Default)]
pub struct ManualTimer {
    started: AtomicUsize,
    cancelled: Arc<AtomicUsize>,
    restarts: Arc<AtomicUsize>,
    fights: Mutex<Vec<(Weak<TurnScheduler>, Arc<AtomicBool>)>>,
}

struct ManualTimerGuard {
    active: Arc<AtomicBool>,
    cancelled: Arc<AtomicUsize>,
    restarts: Arc<AtomicUsize>,
}

impl TimerGuard for ManualTimerGuard {
    fn restart(&self) {
        self.restarts.fetch_add(1, Ordering::AcqRel);
    }

    fn cancel(self: Box<Self>) {
        self.active.store(false, Ordering::Release);
        self.cancelled.fetch_add(1, Ordering::AcqRel);
    }
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timers started so far
    pub fn started(&self) -> usize {
        self.started.load(Ordering::Acquire)
    }

    /// Timers cancelled so far
    pub fn cancelled(&self) -> usize {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Periods started over so far
    pub fn restarts(&self) -> usize {
        self.restarts.load(Ordering::Acquire)
    }

    /// Tick every fight whose timer is still running. Returns how many ticked.
    pub fn fire(&self) -> usize {
        let live: Vec<Arc<TurnScheduler>> = {
            let mut fights = self.fights.lock();
            fights.retain(|(fight, active)| {
                active.load(Ordering::Acquire) && fight.strong_count() > 0
            });
            fights.iter().filter_map(|(fight, _)| fight.upgrade()).collect()
        };

        live.iter().filter(|fight| fight.tick().is_ok()).count()
    }
}

impl TurnTimer for ManualTimer {
    fn start(&self, fight: Weak<TurnScheduler>, _interval: u32) -> Box<dyn TimerGuard> {
        self.started.fetch_add(1, Ordering::AcqRel);
        let active = Arc::new(AtomicBool::new(true));
        self.fights.lock().push((fight, Arc::clone(&active)));
        Box::new(ManualTimerGuard {
            active,
            cancelled: Arc::clone(&self.cancelled),
            restarts: Arc::clone(&self.restarts),
        })
    }
}
