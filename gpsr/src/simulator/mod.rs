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

//! # Simulation harness
//!
//! A single-process discrete-event environment for running GPSR networks: a virtual-time
//! [`scheduler`](VirtualScheduler), and a [`Network`] of static nodes connected by a unit-disk
//! radio model. The harness implements all collaborator interfaces of the routing core and is
//! used by the end-to-end tests and the command line runner.

pub mod network;
pub mod scheduler;

pub use network::{DeliveryRecord, DropRecord, Network};
pub use scheduler::VirtualScheduler;
