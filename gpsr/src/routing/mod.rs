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

//! # The GPSR routing core
//!
//! Greedy Perimeter Stateless Routing forwards IP datagrams towards a destination identified by
//! its geographic coordinates, consulting only a table of one-hop neighbor positions learned from
//! periodic hello beacons. When no neighbor makes greedy progress, the packet traverses the
//! perimeter of the void using the right-hand rule until greedy progress resumes.
//!
//! The module is organized as follows:
//!
//! - [`packet`]: the on-wire header formats (hello beacons and per-packet position annotations),
//! - [`ptable`]: the neighbor position table with lifetime-based eviction,
//! - [`rqueue`]: the bounded queue of packets awaiting a usable next hop,
//! - [`router`]: the per-node protocol engine binding the pieces to the network stack,
//! - [`stack`]: the abstract collaborator interfaces (scheduler, IPv4 stack, mobility, locator,
//!   sockets) the engine consumes,
//! - [`event`]: the event vocabulary exchanged with the scheduler,
//! - [`config`]: the recognized configuration options,
//! - [`types`]: shared type definitions.
//!
//! Everything is driven by a discrete-event scheduler passed in explicitly; within one node all
//! callbacks are serialized and run to completion, so no state needs locking.

pub mod config;
pub mod event;
pub mod packet;
pub mod ptable;
pub mod rqueue;
pub mod router;
pub mod stack;
pub mod types;

pub use config::ProtocolConfig;
pub use event::{Event, TimerHandle};
pub use ptable::PositionTable;
pub use router::{InputHandlers, Router};
pub use rqueue::{QueueEntry, RequestQueue};
pub use types::{
    ConfigError, InterfaceAddress, Ipv4Header, NodeId, Position, Route, RouteError, Time,
};
