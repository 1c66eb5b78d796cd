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

//! # Deferred packet queue
//!
//! A bounded FIFO of data packets that have no usable next hop yet, typically because the
//! destination position is still unknown or no neighbor makes greedy progress. Each entry keeps
//! the callbacks the network stack handed over, so a queued packet can later be transmitted
//! (forward callback) or terminally dropped (error callback) without the stack's involvement.
//!
//! Entries expire `max_queue_time` after insertion; expired entries are purged with their error
//! callback before any read that could return them. When the queue is full, the oldest entry is
//! evicted the same way.

use crate::routing::types::{ErrorCallback, ForwardCallback, Ipv4Header, RouteError, Time};
use crate::routing::packet::Packet;
use log::*;
use std::net::Ipv4Addr;

/// A queued packet together with the callbacks needed to complete or abort its delivery.
pub struct QueueEntry {
    packet: Packet,
    header: Ipv4Header,
    forward_cb: ForwardCallback,
    error_cb: ErrorCallback,
    expire: Time,
}

impl QueueEntry {
    /// Create an entry. The expiry deadline is stamped when the entry is enqueued.
    pub fn new(
        packet: Packet,
        header: Ipv4Header,
        forward_cb: ForwardCallback,
        error_cb: ErrorCallback,
    ) -> Self {
        Self { packet, header, forward_cb, error_cb, expire: Time::ZERO }
    }

    /// The queued packet.
    pub fn packet(&self) -> &Packet {
        &self.packet
    }

    /// The IP header of the queued packet.
    pub fn header(&self) -> &Ipv4Header {
        &self.header
    }

    /// The virtual time at which this entry expires.
    pub fn expire_time(&self) -> Time {
        self.expire
    }

    /// Consume the entry for transmission or dropping.
    pub fn into_parts(self) -> (Packet, Ipv4Header, ForwardCallback, ErrorCallback) {
        (self.packet, self.header, self.forward_cb, self.error_cb)
    }

    /// Consume the entry by invoking its error callback once, logging the reason.
    fn drop_with(self, reason: &str) {
        debug!(
            "Dropping queued packet {} for {}: {}",
            self.packet.uid(),
            self.header.destination,
            reason
        );
        (self.error_cb)(&self.packet, &self.header, RouteError::NoRouteToHost);
    }
}

impl std::fmt::Debug for QueueEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueEntry")
            .field("packet", &self.packet)
            .field("header", &self.header)
            .field("expire", &self.expire)
            .finish()
    }
}

/// The bounded deferred packet queue.
#[derive(Debug)]
pub struct RequestQueue {
    max_len: usize,
    queue_timeout: Time,
    queue: Vec<QueueEntry>,
}

impl RequestQueue {
    /// Create an empty queue holding at most `max_len` entries for at most `queue_timeout` each.
    pub fn new(max_len: usize, queue_timeout: Time) -> Self {
        Self { max_len, queue_timeout, queue: Vec::new() }
    }

    /// The queue capacity.
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// The per-entry timeout.
    pub fn queue_timeout(&self) -> Time {
        self.queue_timeout
    }

    /// Number of entries currently queued, including ones the next purge would drop.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns true if no entries are queued.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Enqueue an entry, stamping its deadline with `now + queue_timeout`.
    ///
    /// An entry matching an already queued `(packet uid, destination)` pair is rejected and the
    /// call is a no-op (returns false). If the queue is at capacity, the oldest entry is evicted
    /// through its error callback before the new one is appended.
    pub fn enqueue(&mut self, mut entry: QueueEntry, now: Time) -> bool {
        self.purge(now);

        if self.queue.iter().any(|e| {
            e.packet.uid() == entry.packet.uid()
                && e.header.destination == entry.header.destination
        }) {
            debug!("Packet {} already queued for {}", entry.packet.uid(), entry.header.destination);
            return false;
        }

        entry.expire = now + self.queue_timeout;

        if self.queue.len() == self.max_len {
            self.queue.remove(0).drop_with("Drop the most aged packet");
        }

        self.queue.push(entry);
        true
    }

    /// Purge expired entries, then remove and return the first entry destined to `dst`.
    pub fn dequeue_for(&mut self, dst: Ipv4Addr, now: Time) -> Option<QueueEntry> {
        self.purge(now);
        let idx = self.queue.iter().position(|e| e.header.destination == dst)?;
        Some(self.queue.remove(idx))
    }

    /// Returns true if any entry is destined to `dst`. Does not purge.
    pub fn find(&self, dst: Ipv4Addr) -> bool {
        self.queue.iter().any(|e| e.header.destination == dst)
    }

    /// Drop every entry destined to `dst`, invoking each error callback once.
    pub fn drop_all_for(&mut self, dst: Ipv4Addr, now: Time) {
        self.purge(now);
        let mut i = 0;
        while i < self.queue.len() {
            if self.queue[i].header.destination == dst {
                self.queue.remove(i).drop_with("No route to destination");
            } else {
                i += 1;
            }
        }
    }

    /// Drop all entries whose deadline has passed, invoking each error callback once.
    pub fn purge(&mut self, now: Time) {
        let mut i = 0;
        while i < self.queue.len() {
            if self.queue[i].expire < now {
                self.queue.remove(i).drop_with("Drop outdated packet");
            } else {
                i += 1;
            }
        }
    }
}
