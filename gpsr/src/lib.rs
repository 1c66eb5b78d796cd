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

#![deny(missing_docs)]

//! # GPSR: Greedy Perimeter Stateless Routing
//!
//! This is a library implementing the GPSR routing protocol for wireless ad-hoc networks, along
//! with a discrete-event simulation harness to run it in.
//!
//! Each node forwards IP datagrams towards a destination identified by geographic coordinates,
//! consulting a local table of neighbor positions (learned from periodic hello beacons) rather
//! than precomputed routes. When no neighbor is closer to the destination than the node itself,
//! the packet switches to perimeter-traversal recovery and follows the right-hand rule around
//! the void until greedy progress becomes possible again.
//!
//! ## Structure
//!
//! - **[`routing`]**: the protocol core — wire headers, the neighbor
//!   [position table](routing::PositionTable), the deferred
//!   [packet queue](routing::RequestQueue), and the per-node [`Router`](routing::Router) engine.
//!   The core consumes its environment exclusively through the abstract interfaces in
//!   [`routing::stack`].
//!
//! - **[`simulator`]**: a concrete environment — a virtual-time event
//!   [scheduler](simulator::VirtualScheduler) and a [`Network`](simulator::Network) of static
//!   nodes with a unit-disk radio model, used by the tests and the command line runner.
//!
//! ## Usage
//!
//! ```
//! use gpsr::routing::{ProtocolConfig, Time, Position};
//! use gpsr::simulator::Network;
//!
//! fn main() -> Result<(), gpsr::Error> {
//!     let mut net = Network::new(ProtocolConfig::default(), 120.0, Time::from_millis(1))?;
//!     let a = net.add_node(Position::new(0.0, 0.0));
//!     let b = net.add_node(Position::new(75.0, 0.0));
//!     net.start();
//!
//!     // let the nodes discover each other, then send a packet
//!     net.send(a, b, vec![0xab; 64], Time::from_secs(3)).unwrap();
//!     net.run_until(Time::from_secs(5));
//!
//!     assert_eq!(net.delivered().len(), 1);
//!     assert_eq!(net.delivered()[0].hops, 1);
//!     Ok(())
//! }
//! ```

// test modules
mod test;

mod error;
pub mod routing;
pub mod simulator;

pub use error::Error;
