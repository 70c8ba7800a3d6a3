//
// Copyright 2025 Jeff Bush
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
//

use crate::error::Error;
use crate::timer;
use std::sync::{Arc, Condvar, Mutex};

//
// Bounded wait for a condition that some outside agent (link negotiation,
// a DHCP server) makes true eventually, or never. The calling thread really
// blocks between polls; the wakeup comes from a one-shot timer callback
// signalling a condvar, so one timer fire means exactly one more poll.
//

/// One answer from a readiness predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStatus {
    /// The condition holds; the wait is over.
    Ready,
    /// Not there yet; burn a retry cycle and poll again.
    Pending,
    /// The query itself failed. This aborts the wait immediately instead of
    /// consuming budget: a faulted driver does not come right by polling it.
    Failed(Error),
}

/// How long wait_until keeps trying: up to max_cycles polls, suspending
/// sleep_interval_ms between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    pub max_cycles: u32,
    pub sleep_interval_ms: u32,
}

impl RetryBudget {
    pub const fn new(max_cycles: u32, sleep_interval_ms: u32) -> RetryBudget {
        RetryBudget {
            max_cycles,
            sleep_interval_ms,
        }
    }
}

impl Default for RetryBudget {
    /// Ten cycles of a second each, the policy both bring-up waits use.
    fn default() -> RetryBudget {
        RetryBudget::new(10, 1000)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitError {
    /// Every retry cycle was spent without the predicate reporting ready.
    Exhausted,
    /// The predicate reported a failure; the wait stopped at that poll.
    Aborted(Error),
}

/// Polls the predicate until it reports ready, suspending the calling
/// thread between polls. Returns as soon as the predicate is ready (no
/// sleep after a successful poll) or fails, and gives up once max_cycles
/// cycles have been spent. A zero-cycle budget fails without polling.
pub fn wait_until<F>(budget: &RetryBudget, mut poll: F) -> Result<(), WaitError>
where
    F: FnMut() -> PollStatus,
{
    let wakeup = Arc::new((Mutex::new(false), Condvar::new()));

    for _ in 0..budget.max_cycles {
        match poll() {
            PollStatus::Ready => return Ok(()),
            PollStatus::Pending => {}
            PollStatus::Failed(err) => return Err(WaitError::Aborted(err)),
        }

        // Rearm before scheduling: the callback may run before this thread
        // gets back to the condvar, and its notification must not be lost.
        let (fired, cond) = &*wakeup;
        *fired.lock().unwrap() = false;

        let wakeup_timer = Arc::clone(&wakeup);
        timer::set_timer(budget.sleep_interval_ms, move || {
            let (fired, cond) = &*wakeup_timer;
            *fired.lock().unwrap() = true;
            cond.notify_one();
        });

        // The flag guards against spurious condvar wakeups; only the timer
        // firing releases this loop.
        let mut guard = fired.lock().unwrap();
        while !*guard {
            guard = cond.wait(guard).unwrap();
        }
    }

    Err(WaitError::Exhausted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    const FAST: RetryBudget = RetryBudget::new(10, 1);

    #[test]
    fn test_ready_on_first_poll() {
        let mut polls = 0;
        let result = wait_until(&FAST, || {
            polls += 1;
            PollStatus::Ready
        });

        assert_eq!(result, Ok(()));
        assert_eq!(polls, 1);
    }

    #[test]
    fn test_ready_on_nth_poll() {
        let mut polls = 0;
        let result = wait_until(&FAST, || {
            polls += 1;
            if polls == 3 {
                PollStatus::Ready
            } else {
                PollStatus::Pending
            }
        });

        assert_eq!(result, Ok(()));
        assert_eq!(polls, 3);
    }

    #[test]
    fn test_budget_exhausted() {
        let mut polls = 0;
        let result = wait_until(&FAST, || {
            polls += 1;
            PollStatus::Pending
        });

        assert_eq!(result, Err(WaitError::Exhausted));
        assert_eq!(polls, 10);
    }

    #[test]
    fn test_predicate_failure_aborts() {
        let err = Error::Driver {
            op: "link_state",
            code: -2,
        };
        let mut polls = 0;
        let result = wait_until(&FAST, || {
            polls += 1;
            if polls == 2 {
                PollStatus::Failed(err)
            } else {
                PollStatus::Pending
            }
        });

        assert_eq!(result, Err(WaitError::Aborted(err)));
        assert_eq!(polls, 2);
    }

    #[test]
    fn test_zero_cycle_budget() {
        let mut polls = 0;
        let result = wait_until(&RetryBudget::new(0, 1), || {
            polls += 1;
            PollStatus::Ready
        });

        assert_eq!(result, Err(WaitError::Exhausted));
        assert_eq!(polls, 0);
    }

    #[test]
    fn test_suspends_between_polls() {
        let start = Instant::now();
        let result = wait_until(&RetryBudget::new(3, 30), || PollStatus::Pending);

        assert_eq!(result, Err(WaitError::Exhausted));
        // Three pending cycles mean three real suspensions of (almost)
        // a full interval each.
        assert!(start.elapsed() >= Duration::from_millis(85));
    }
}
