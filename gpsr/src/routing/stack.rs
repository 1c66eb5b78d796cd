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

//! # Collaborator interfaces
//!
//! The abstract interfaces through which the router consumes its environment: virtual time and
//! timers ([`Scheduler`]), interface and address queries ([`Ipv4View`]), the node's own position
//! ([`Mobility`]), the destination-position oracle ([`Locator`]) and the datagram sockets of the
//! control plane ([`SocketLayer`]).
//!
//! All of them are passed explicitly into every router upcall through a [`NodeContext`]; no
//! component reaches for global state. The router borrows the context only for the duration of
//! one scheduler callback.

use crate::routing::event::{Event, TimerHandle};
use crate::routing::types::{InterfaceAddress, Position, Time};
use std::net::Ipv4Addr;

/// The discrete-event scheduler, as seen by a node. Scheduling is relative to the current virtual
/// time; cancellation is idempotent.
pub trait Scheduler {
    /// The current virtual time.
    fn now(&self) -> Time;
    /// Schedule `event` to fire `delay` after the current virtual time.
    fn schedule(&mut self, delay: Time, event: Event) -> TimerHandle;
    /// Cancel a scheduled event. Cancelling an already fired or cancelled event is a no-op.
    fn cancel(&mut self, handle: TimerHandle);
}

/// Read-only view of the node's IPv4 stack.
pub trait Ipv4View {
    /// The `index`-th address of `interface`, if it exists.
    fn address(&self, interface: u32, index: u32) -> Option<InterfaceAddress>;
    /// Returns true if `addr` is one of this node's addresses, as seen from input interface `iif`.
    fn is_destination(&self, addr: Ipv4Addr, iif: u32) -> bool;
    /// The local interface that owns (i.e. whose subnet contains) `addr`.
    fn interface_for_address(&self, addr: Ipv4Addr) -> Option<u32>;
    /// Returns true if `interface` is administratively up.
    fn is_up(&self, interface: u32) -> bool;
}

/// The node's own mobility model.
pub trait Mobility {
    /// The node's current position, or `None` if no mobility information is available.
    fn position(&self) -> Option<Position>;
}

/// The destination-position oracle. The reference environment implements this by global node
/// enumeration; a deployment would substitute a location service.
pub trait Locator {
    /// The current position of the node owning `addr`, if known.
    fn position_of(&self, addr: Ipv4Addr) -> Option<Position>;
}

/// Identifier of an open control socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SocketId(pub u64);

/// Broadcast-capable datagram sockets, one per interface. Opening a socket binds it to the wildcard
/// address on the given port with broadcast enabled and the given TTL; received datagrams are
/// delivered back to the router as [`Event::ControlDelivery`] events.
pub trait SocketLayer {
    /// Open a socket on `interface`, bound to `0.0.0.0:port`, broadcast enabled, with `ttl`.
    fn open(&mut self, interface: u32, port: u16, ttl: u8) -> SocketId;
    /// Close a socket.
    fn close(&mut self, socket: SocketId);
    /// Send a datagram to `dest:port` through `socket`.
    fn send_to(&mut self, socket: SocketId, payload: Vec<u8>, dest: Ipv4Addr, port: u16);
}

/// Bundle of all collaborator interfaces, valid for one router upcall.
pub struct NodeContext<'a> {
    /// the discrete-event scheduler
    pub scheduler: &'a mut dyn Scheduler,
    /// the IPv4 stack view
    pub ipv4: &'a dyn Ipv4View,
    /// the node's mobility model
    pub mobility: &'a dyn Mobility,
    /// the destination-position oracle
    pub locator: &'a dyn Locator,
    /// the control-plane sockets
    pub sockets: &'a mut dyn SocketLayer,
}
