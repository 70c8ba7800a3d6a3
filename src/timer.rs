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

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{LazyLock, Mutex, Once};
use std::thread::sleep;
use std::time::{Duration, Instant};

//
// One-shot alarm facility.
// Bring-up arms a single alarm per retry cycle and apps add at most a few
// more, so the pending list is a plain vector scanned once per tick. Sorted
// structures only pay off with enough concurrent timers to make that scan
// hurt, and nothing here ever creates more than a handful.
//

// Expiry granularity. An alarm can take up to one extra tick to fire, so
// poll intervals should be comfortably larger than this.
const TICK: Duration = Duration::from_millis(10);

struct Timer {
    absolute_timeout_ms: u64,
    closure: Option<Box<dyn FnOnce() + Send + Sync>>,
    id: i32,
}

static PENDING_TIMERS: LazyLock<Mutex<Vec<Timer>>> = LazyLock::new(|| Mutex::new(Vec::new()));

static NEXT_TIMER_ID: AtomicU32 = AtomicU32::new(1);

static START_TICK_THREAD: Once = Once::new();

// Monotonic time base: wall clock adjustments must neither fire alarms
// early nor hold them back.
static EPOCH: LazyLock<Instant> = LazyLock::new(Instant::now);

fn current_time_ms() -> u64 {
    EPOCH.elapsed().as_millis() as u64
}

/// Arms a one-shot timer and returns its ID, which can be passed to
/// cancel_timer to disable it. Valid timer IDs are always positive (this
/// allows callers to use -1 to indicate no timer is pending). The timeout
/// is relative to the current time; the closure runs on the tick thread.
pub fn set_timer<F>(timeout_ms: u32, closure: F) -> i32
where
    F: FnOnce() + Send + Sync + 'static,
{
    START_TICK_THREAD.call_once(|| {
        std::thread::spawn(tick_loop);
    });

    let mut list = PENDING_TIMERS.lock().unwrap();
    let id = (NEXT_TIMER_ID.fetch_add(1, Ordering::Relaxed) & 0x7fffffff) as i32;
    list.push(Timer {
        absolute_timeout_ms: current_time_ms() + timeout_ms as u64,
        closure: Some(Box::new(closure)),
        id,
    });

    id
}

/// Returns true if the timer was still pending, false if it had already
/// expired (or never existed).
pub fn cancel_timer(timer_id: i32) -> bool {
    let mut list = PENDING_TIMERS.lock().unwrap();
    for i in 0..list.len() {
        if list[i].id == timer_id {
            list.swap_remove(i);
            return true;
        }
    }

    false
}

fn tick_loop() {
    loop {
        sleep(TICK);
        let mut list = PENDING_TIMERS.lock().unwrap();
        let now = current_time_ms();
        let mut i = 0;
        while i < list.len() {
            if now >= list[i].absolute_timeout_ms {
                let timer = list.remove(i);
                let closure = timer.closure;

                // Run the closure with the lock released. Expired callbacks
                // often arm a follow-up timer, which would deadlock here
                // otherwise.
                drop(list);
                (closure.unwrap())();

                // Reacquire the lock before continuing to scan the list.
                list = PENDING_TIMERS.lock().unwrap();
            } else {
                i += 1;
            }
        }
    }
}
