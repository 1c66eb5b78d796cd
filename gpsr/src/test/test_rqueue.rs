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

//! Test the deferred packet queue: dedup, bounded capacity, expiry and drain semantics.

use crate::routing::packet::Packet;
use crate::routing::rqueue::{QueueEntry, RequestQueue};
use crate::routing::types::{ErrorCallback, ForwardCallback, Ipv4Header, RouteError, Time};
use std::cell::RefCell;
use std::net::Ipv4Addr;
use std::rc::Rc;

const TIMEOUT: Time = Time::from_secs(30);

fn header_to(dst: Ipv4Addr) -> Ipv4Header {
    Ipv4Header { source: Ipv4Addr::new(10, 1, 1, 1), destination: dst, protocol: 17 }
}

/// Build a queue entry whose error callback counts its invocations in `drops`.
fn entry(uid: u64, dst: Ipv4Addr, drops: &Rc<RefCell<Vec<(u64, RouteError)>>>) -> QueueEntry {
    let forward: ForwardCallback = Box::new(|_route, _packet, _header| {});
    let error: ErrorCallback = Box::new({
        let drops = Rc::clone(drops);
        move |packet, _header, error| drops.borrow_mut().push((packet.uid(), error))
    });
    QueueEntry::new(Packet::new(uid, vec![0; 8]), header_to(dst), forward, error)
}

#[test]
fn test_enqueue_and_dequeue() {
    let drops = Rc::new(RefCell::new(Vec::new()));
    let dst = Ipv4Addr::new(10, 1, 1, 9);
    let mut queue = RequestQueue::new(64, TIMEOUT);

    assert!(queue.is_empty());
    assert!(queue.enqueue(entry(1, dst, &drops), Time::ZERO));
    assert_eq!(queue.len(), 1);
    assert!(queue.find(dst));

    let taken = queue.dequeue_for(dst, Time::from_secs(1)).unwrap();
    assert_eq!(taken.packet().uid(), 1);
    assert_eq!(taken.expire_time(), Time::ZERO + TIMEOUT);
    assert!(queue.is_empty());

    // every entry is drained at most once
    assert!(queue.dequeue_for(dst, Time::from_secs(1)).is_none());
    assert!(drops.borrow().is_empty());
}

#[test]
fn test_duplicate_rejected() {
    let drops = Rc::new(RefCell::new(Vec::new()));
    let dst = Ipv4Addr::new(10, 1, 1, 9);
    let mut queue = RequestQueue::new(64, TIMEOUT);

    assert!(queue.enqueue(entry(1, dst, &drops), Time::ZERO));
    // same packet uid and destination: a no-op
    assert!(!queue.enqueue(entry(1, dst, &drops), Time::ZERO));
    assert_eq!(queue.len(), 1);

    // same uid towards another destination is a different pair
    assert!(queue.enqueue(entry(1, Ipv4Addr::new(10, 1, 1, 10), &drops), Time::ZERO));
    assert_eq!(queue.len(), 2);
    assert!(drops.borrow().is_empty());
}

#[test]
fn test_queue_full_evicts_oldest() {
    let drops = Rc::new(RefCell::new(Vec::new()));
    let dst = Ipv4Addr::new(10, 1, 1, 9);
    let mut queue = RequestQueue::new(2, TIMEOUT);

    assert!(queue.enqueue(entry(1, dst, &drops), Time::ZERO));
    assert!(queue.enqueue(entry(2, dst, &drops), Time::ZERO));
    assert!(queue.enqueue(entry(3, dst, &drops), Time::ZERO));

    // exactly one eviction: the oldest entry, reported as no-route-to-host
    assert_eq!(queue.len(), 2);
    assert_eq!(*drops.borrow(), vec![(1, RouteError::NoRouteToHost)]);

    // the two younger entries survive, in order
    assert_eq!(queue.dequeue_for(dst, Time::ZERO).unwrap().packet().uid(), 2);
    assert_eq!(queue.dequeue_for(dst, Time::ZERO).unwrap().packet().uid(), 3);
}

#[test]
fn test_purge_on_timeout() {
    let drops = Rc::new(RefCell::new(Vec::new()));
    let dst = Ipv4Addr::new(10, 1, 1, 9);
    let mut queue = RequestQueue::new(64, TIMEOUT);

    queue.enqueue(entry(1, dst, &drops), Time::ZERO);

    // at exactly the deadline the entry still exists
    queue.purge(TIMEOUT);
    assert_eq!(queue.len(), 1);

    // past the deadline it is dropped through its error callback
    queue.purge(TIMEOUT + Time::from_nanos(1));
    assert!(queue.is_empty());
    assert_eq!(*drops.borrow(), vec![(1, RouteError::NoRouteToHost)]);
}

#[test]
fn test_dequeue_purges_first() {
    let drops = Rc::new(RefCell::new(Vec::new()));
    let dst = Ipv4Addr::new(10, 1, 1, 9);
    let mut queue = RequestQueue::new(64, TIMEOUT);

    queue.enqueue(entry(1, dst, &drops), Time::ZERO);
    queue.enqueue(entry(2, dst, &drops), Time::from_secs(10));

    // the first entry has expired by now and must not be returned
    let taken = queue.dequeue_for(dst, TIMEOUT + Time::from_secs(1)).unwrap();
    assert_eq!(taken.packet().uid(), 2);
    assert_eq!(*drops.borrow(), vec![(1, RouteError::NoRouteToHost)]);
}

#[test]
fn test_dequeue_matches_destination() {
    let drops = Rc::new(RefCell::new(Vec::new()));
    let dst_a = Ipv4Addr::new(10, 1, 1, 9);
    let dst_b = Ipv4Addr::new(10, 1, 1, 10);
    let mut queue = RequestQueue::new(64, TIMEOUT);

    queue.enqueue(entry(1, dst_a, &drops), Time::ZERO);
    queue.enqueue(entry(2, dst_b, &drops), Time::ZERO);

    assert_eq!(queue.dequeue_for(dst_b, Time::ZERO).unwrap().packet().uid(), 2);
    assert!(!queue.find(dst_b));
    assert!(queue.find(dst_a));
}

#[test]
fn test_drop_all_for_destination() {
    let drops = Rc::new(RefCell::new(Vec::new()));
    let dst_a = Ipv4Addr::new(10, 1, 1, 9);
    let dst_b = Ipv4Addr::new(10, 1, 1, 10);
    let mut queue = RequestQueue::new(64, TIMEOUT);

    queue.enqueue(entry(1, dst_a, &drops), Time::ZERO);
    queue.enqueue(entry(2, dst_a, &drops), Time::ZERO);
    queue.enqueue(entry(3, dst_b, &drops), Time::ZERO);

    queue.drop_all_for(dst_a, Time::ZERO);
    assert_eq!(queue.len(), 1);
    assert_eq!(
        *drops.borrow(),
        vec![(1, RouteError::NoRouteToHost), (2, RouteError::NoRouteToHost)]
    );
    assert!(queue.find(dst_b));
}
