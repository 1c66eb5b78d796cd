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

//! Module for defining events

use crate::routing::packet::Packet;
use crate::routing::types::{Ipv4Header, NodeId};
use std::net::Ipv4Addr;

/// Event to handle. Every event targets exactly one node; timers carry the id of their owning
/// node rather than any reference into it.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The hello beacon timer of node `#0` expired.
    HelloTimer(NodeId),
    /// The deferred-queue drain timer of node `#0` expired.
    QueueTimer(NodeId),
    /// A control datagram arrives at a node's control socket.
    ControlDelivery {
        /// receiving node
        to: NodeId,
        /// sender address
        from: Ipv4Addr,
        /// raw datagram bytes
        payload: Vec<u8>,
    },
    /// A data packet arrives at a node, either over the radio or through the loopback device.
    DataDelivery {
        /// receiving node
        to: NodeId,
        /// the packet
        packet: Packet,
        /// its IP header
        header: Ipv4Header,
    },
    /// A locally generated packet is presented to the node's router.
    Originate {
        /// originating node
        node: NodeId,
        /// the packet
        packet: Packet,
        /// its IP header
        header: Ipv4Header,
    },
}

impl Event {
    /// The node this event targets.
    pub fn node(&self) -> NodeId {
        match self {
            Event::HelloTimer(node) => *node,
            Event::QueueTimer(node) => *node,
            Event::ControlDelivery { to, .. } => *to,
            Event::DataDelivery { to, .. } => *to,
            Event::Originate { node, .. } => *node,
        }
    }
}

/// Opaque handle to a scheduled event, used for idempotent cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerHandle(pub u64);
