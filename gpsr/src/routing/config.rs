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

//! Protocol configuration

use crate::routing::types::{ConfigError, Time};

/// UDP port reserved for hello and position control traffic.
pub const DEFAULT_CONTROL_PORT: u16 = 666;

/// Per-node protocol configuration. All options have spec defaults; construct with
/// [`ProtocolConfig::default`] and overwrite individual fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolConfig {
    /// Mean time between hello broadcasts (actual emissions are jittered).
    pub hello_interval: Time,
    /// Time after the last received hello until a neighbor entry is expired.
    pub entry_lifetime: Time,
    /// Capacity of the deferred packet queue.
    pub max_queue_len: usize,
    /// Time a packet may wait in the deferred queue before it is dropped.
    pub max_queue_time: Time,
    /// Enables perimeter-mode recovery. When disabled, greedy failures drop immediately.
    pub perimeter_mode: bool,
    /// UDP port for hello and position control traffic.
    pub control_port: u16,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            hello_interval: Time::from_secs(1),
            entry_lifetime: Time::from_secs(3),
            max_queue_len: 64,
            max_queue_time: Time::from_secs(30),
            perimeter_mode: true,
            control_port: DEFAULT_CONTROL_PORT,
        }
    }
}

impl ProtocolConfig {
    /// Check the configuration for consistency. The hello interval must be strictly positive, and
    /// the entry lifetime must cover at least two hello intervals.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hello_interval == Time::ZERO {
            return Err(ConfigError::ZeroHelloInterval);
        }
        if self.entry_lifetime < self.hello_interval + self.hello_interval {
            return Err(ConfigError::EntryLifetimeTooShort(
                self.entry_lifetime,
                self.hello_interval,
            ));
        }
        Ok(())
    }
}
