// GPSR: Greedy Perimeter Stateless Routing for Wireless Ad-Hoc Networks
// Copyright (C) 2021  Tibor Schneider
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! Discrete-event scheduler with virtual time.

use crate::routing::event::{Event, TimerHandle};
use crate::routing::stack::Scheduler;
use crate::routing::types::Time;
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};

/// One scheduled event. Ordering is by fire time, with the insertion sequence number breaking
/// ties, so that events scheduled for the same instant fire in FIFO order.
#[derive(Debug)]
struct ScheduledEvent {
    time: Time,
    seq: u64,
    handle: TimerHandle,
    event: Event,
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.seq == other.seq
    }
}

impl Eq for ScheduledEvent {}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time.cmp(&other.time).then(self.seq.cmp(&other.seq))
    }
}

/// A binary-heap discrete-event scheduler. Every node of a simulation shares one instance; the
/// harness pops events in time order and dispatches them to the owning node.
#[derive(Debug, Default)]
pub struct VirtualScheduler {
    now: Time,
    seq: u64,
    next_handle: u64,
    heap: BinaryHeap<Reverse<ScheduledEvent>>,
    cancelled: HashSet<TimerHandle>,
}

impl VirtualScheduler {
    /// Create a scheduler at time zero with an empty event queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return the next pending event, advancing the virtual clock to its fire time.
    /// Cancelled events are skipped.
    pub fn pop(&mut self) -> Option<(Time, Event)> {
        while let Some(Reverse(scheduled)) = self.heap.pop() {
            if self.cancelled.remove(&scheduled.handle) {
                continue;
            }
            self.now = scheduled.time;
            return Some((scheduled.time, scheduled.event));
        }
        None
    }

    /// The fire time of the next pending (non-cancelled) event.
    pub fn peek_time(&mut self) -> Option<Time> {
        loop {
            let (time, is_cancelled) = match self.heap.peek() {
                Some(Reverse(scheduled)) => {
                    (scheduled.time, self.cancelled.contains(&scheduled.handle))
                }
                None => return None,
            };
            if is_cancelled {
                if let Some(Reverse(scheduled)) = self.heap.pop() {
                    self.cancelled.remove(&scheduled.handle);
                }
                continue;
            }
            return Some(time);
        }
    }

    /// Advance the clock to `t` without processing events. Used to finish a run at a defined
    /// instant; `t` must not lie before the current time (earlier values are ignored).
    pub fn advance_to(&mut self, t: Time) {
        if t > self.now {
            self.now = t;
        }
    }

    /// Number of pending events, including cancelled ones not yet skipped.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Returns true if no events are pending.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

impl Scheduler for VirtualScheduler {
    fn now(&self) -> Time {
        self.now
    }

    fn schedule(&mut self, delay: Time, event: Event) -> TimerHandle {
        let handle = TimerHandle(self.next_handle);
        self.next_handle += 1;
        let seq = self.seq;
        self.seq += 1;
        self.heap.push(Reverse(ScheduledEvent { time: self.now + delay, seq, handle, event }));
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        if handle.0 < self.next_handle {
            self.cancelled.insert(handle);
        }
    }
}
