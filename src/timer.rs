// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Timers behind an explicit interface, so session orchestration can run on
//! tokio in production and on a manually advanced clock in tests.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::time::Instant;
use tokio::time::MissedTickBehavior;
use tokio::time::interval_at;
use tokio::time::sleep;

pub type Task = Box<dyn FnOnce() + Send + 'static>;
pub type RepeatingTask = Box<dyn FnMut() + Send + 'static>;

/// Cancels a scheduled timer. Cancelling twice is harmless.
#[derive(Clone, Debug)]
pub struct TimerHandle {
    cancelled: Arc<AtomicBool>,
}

impl TimerHandle {
    fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

pub trait Scheduler: Send + Sync {
    /// Runs `task` once after `delay`, unless cancelled first.
    fn schedule(&self, delay: Duration, task: Task) -> TimerHandle;

    /// Runs `task` every `period`, starting one period from now, until
    /// cancelled.
    fn schedule_repeating(&self, period: Duration, task: RepeatingTask) -> TimerHandle;
}

pub struct TokioScheduler {
    runtime: Handle,
}

impl TokioScheduler {
    /// Must be called from within a tokio runtime.
    pub fn new() -> Self {
        Self {
            runtime: Handle::current(),
        }
    }
}

impl Default for TokioScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: Task) -> TimerHandle {
        let handle = TimerHandle::new();
        let timer = handle.clone();
        self.runtime.spawn(async move {
            sleep(delay).await;
            if !timer.is_cancelled() {
                task();
            }
        });
        handle
    }

    fn schedule_repeating(&self, period: Duration, mut task: RepeatingTask) -> TimerHandle {
        // tokio intervals panic on a zero period.
        let period = period.max(Duration::from_millis(1));
        let handle = TimerHandle::new();
        let timer = handle.clone();
        self.runtime.spawn(async move {
            let mut ticks = interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticks.tick().await;
                if timer.is_cancelled() {
                    break;
                }
                task();
            }
        });
        handle
    }
}

#[cfg(test)]
pub use manual::ManualScheduler;

#[cfg(test)]
mod manual {
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::time::Duration;

    use super::RepeatingTask;
    use super::Scheduler;
    use super::Task;
    use super::TimerHandle;
    use crate::clock::Clock;
    use crate::clock::FakeClock;
    use crate::types::timestamp::Timestamp;

    enum Job {
        Once(Task),
        Repeating(Duration, RepeatingTask),
    }

    struct Timer {
        due: Timestamp,
        seq: u64,
        job: Job,
        handle: TimerHandle,
    }

    #[derive(Default)]
    struct Timers {
        pending: Vec<Timer>,
        next_seq: u64,
    }

    impl Timers {
        fn push(&mut self, due: Timestamp, job: Job, handle: TimerHandle) {
            let seq = self.next_seq;
            self.next_seq += 1;
            self.pending.push(Timer {
                due,
                seq,
                job,
                handle,
            });
        }

        /// Removes the earliest live timer due at or before `target`.
        fn pop_due(&mut self, target: Timestamp) -> Option<Timer> {
            self.pending.retain(|t| !t.handle.is_cancelled());
            let index = self
                .pending
                .iter()
                .enumerate()
                .filter(|(_, t)| t.due <= target)
                .min_by_key(|(_, t)| (t.due, t.seq))
                .map(|(i, _)| i)?;
            Some(self.pending.remove(index))
        }
    }

    /// Runs timers when the test advances the fake clock. Tasks run on the
    /// caller's thread, with the timer list unlocked.
    pub struct ManualScheduler {
        clock: Arc<FakeClock>,
        timers: Mutex<Timers>,
    }

    impl ManualScheduler {
        pub fn new(clock: Arc<FakeClock>) -> Self {
            Self {
                clock,
                timers: Mutex::new(Timers::default()),
            }
        }

        pub fn advance(&self, by: Duration) {
            let target = self.clock.now().plus(by);
            loop {
                let next = self.timers.lock().unwrap().pop_due(target);
                let Some(timer) = next else {
                    break;
                };
                self.clock.set(timer.due);
                match timer.job {
                    Job::Once(task) => task(),
                    Job::Repeating(period, mut task) => {
                        task();
                        if !timer.handle.is_cancelled() {
                            let due = timer.due.plus(period);
                            self.timers.lock().unwrap().push(
                                due,
                                Job::Repeating(period, task),
                                timer.handle,
                            );
                        }
                    }
                }
            }
            self.clock.set(target);
        }

        /// The number of timers that are scheduled and not cancelled.
        pub fn active(&self) -> usize {
            self.timers
                .lock()
                .unwrap()
                .pending
                .iter()
                .filter(|t| !t.handle.is_cancelled())
                .count()
        }
    }

    impl Scheduler for ManualScheduler {
        fn schedule(&self, delay: Duration, task: Task) -> TimerHandle {
            let handle = TimerHandle::new();
            let due = self.clock.now().plus(delay);
            self.timers
                .lock()
                .unwrap()
                .push(due, Job::Once(task), handle.clone());
            handle
        }

        fn schedule_repeating(&self, period: Duration, task: RepeatingTask) -> TimerHandle {
            let period = period.max(Duration::from_millis(1));
            let handle = TimerHandle::new();
            let due = self.clock.now().plus(period);
            self.timers
                .lock()
                .unwrap()
                .push(due, Job::Repeating(period, task), handle.clone());
            handle
        }
    }
}
