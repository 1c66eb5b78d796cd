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

//! # Position Table
//!
//! The per-node neighbor table, mapping the address of every neighbor heard from recently to its
//! last announced position. Entries expire `entry_lifetime` after the last hello; expired entries
//! are purged lazily before every query, so a query can never return a stale neighbor.
//!
//! The table implements both forwarding decisions: the greedy pick ([`PositionTable::best_neighbor`])
//! and the right-hand-rule pick ([`PositionTable::best_angle`]). Table operations never fail
//! visibly; they return the zero address or the invalid position sentinel instead.

use crate::routing::types::{Position, Time};
use log::*;
use std::collections::BTreeMap;
use std::net::Ipv4Addr;

/// Neighbor position table with lifetime-based eviction.
///
/// All queries take the current virtual time explicitly; the table itself has no scheduler
/// dependency. Entries are kept in address order, which makes distance tie-breaks deterministic
/// (the first entry encountered at the minimum wins).
#[derive(Debug, Clone)]
pub struct PositionTable {
    entry_lifetime: Time,
    table: BTreeMap<Ipv4Addr, (Position, Time)>,
}

impl PositionTable {
    /// Create an empty table whose entries live for `entry_lifetime` after the last update.
    pub fn new(entry_lifetime: Time) -> Self {
        Self { entry_lifetime, table: BTreeMap::new() }
    }

    /// The configured entry lifetime.
    pub fn entry_lifetime(&self) -> Time {
        self.entry_lifetime
    }

    /// Insert or replace the entry for `id`, stamping it with `now`.
    pub fn add_entry(&mut self, id: Ipv4Addr, position: Position, now: Time) {
        self.table.insert(id, (position, now));
        debug!("Added neighbor {} at {}, table size: {}", id, position, self.table.len());
    }

    /// Remove the entry for `id` if present.
    pub fn delete_entry(&mut self, id: Ipv4Addr) {
        self.table.remove(&id);
    }

    /// The time the entry for `id` was last updated, or `Time::ZERO` for the zero address and for
    /// unknown neighbors.
    pub fn entry_update_time(&self, id: Ipv4Addr) -> Time {
        if id == Ipv4Addr::UNSPECIFIED {
            return Time::ZERO;
        }
        self.table.get(&id).map(|(_, t)| *t).unwrap_or(Time::ZERO)
    }

    /// Look up the position of `id` after purging expired entries. Returns the invalid sentinel
    /// if the neighbor is unknown or expired.
    pub fn get_position(&mut self, id: Ipv4Addr, now: Time) -> Position {
        self.purge(now);
        match self.table.get(&id) {
            Some((position, _)) => *position,
            None => {
                debug!("No position known for {}", id);
                Position::INVALID
            }
        }
    }

    /// Membership predicate. Does not purge, so an expired-but-unpurged entry still counts.
    pub fn is_neighbor(&self, id: Ipv4Addr) -> bool {
        self.table.contains_key(&id)
    }

    /// Remove all entries whose last update is more than `entry_lifetime` in the past. An entry
    /// updated at `t` survives any query up to and including `t + entry_lifetime`.
    pub fn purge(&mut self, now: Time) {
        if self.table.is_empty() {
            return;
        }
        let lifetime = self.entry_lifetime;
        let before = self.table.len();
        self.table.retain(|_, (_, last_seen)| *last_seen + lifetime >= now);
        let removed = before - self.table.len();
        if removed > 0 {
            debug!("Purged {} expired neighbors, table size now: {}", removed, self.table.len());
        }
    }

    /// Remove all entries.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Number of entries, including ones that would be purged by the next query.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns true if the table holds no entries.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// The greedy pick: the neighbor closest to `dst_pos`, provided it is strictly closer than
    /// this node itself. Returns the zero address when no neighbor makes progress, which is the
    /// trigger for recovery mode.
    pub fn best_neighbor(&mut self, dst_pos: Position, my_pos: Position, now: Time) -> Ipv4Addr {
        self.purge(now);

        let initial_distance = my_pos.distance_to(dst_pos);

        let mut iter = self.table.iter();
        let (mut best_id, mut best_distance) = match iter.next() {
            Some((id, (position, _))) => (*id, position.distance_to(dst_pos)),
            None => {
                debug!("best_neighbor: table is empty, no neighbors discovered yet");
                return Ipv4Addr::UNSPECIFIED;
            }
        };
        for (id, (position, _)) in iter {
            let distance = position.distance_to(dst_pos);
            if best_distance > distance {
                best_id = *id;
                best_distance = distance;
            }
        }

        if initial_distance > best_distance {
            trace!("best_neighbor: {} at distance {} to {}", best_id, best_distance, dst_pos);
            best_id
        } else {
            debug!("best_neighbor: no neighbor is closer to {} than myself", dst_pos);
            Ipv4Addr::UNSPECIFIED
        }
    }

    /// The right-hand-rule pick: the neighbor forming the smallest counter-clockwise angle from
    /// the incoming perimeter edge `my_pos -> prev_pos`. Neighbors located exactly at `prev_pos`
    /// are excluded, so a perimeter walk never bounces straight back. Returns the zero address if
    /// `prev_pos` is the invalid sentinel or no neighbor qualifies.
    pub fn best_angle(
        &mut self,
        dst_pos: Position,
        rec_pos: Position,
        my_pos: Position,
        prev_pos: Position,
        now: Time,
    ) -> Ipv4Addr {
        self.purge(now);
        trace!(
            "best_angle: dst: {} rec: {} my: {} prev: {}",
            dst_pos,
            rec_pos,
            my_pos,
            prev_pos
        );

        if prev_pos.is_invalid() {
            warn!("best_angle: previous hop position is invalid, cannot apply right-hand rule");
            return Ipv4Addr::UNSPECIFIED;
        }

        let mut best_id = Ipv4Addr::UNSPECIFIED;
        let mut smallest_angle = 361.0;

        for (id, (position, _)) in self.table.iter() {
            if *position == prev_pos {
                trace!("best_angle: skipping neighbor {} at previous hop position", id);
                continue;
            }
            let angle = Self::angle(my_pos, prev_pos, *position);
            if angle < smallest_angle {
                smallest_angle = angle;
                best_id = *id;
            }
        }

        if best_id == Ipv4Addr::UNSPECIFIED {
            debug!("best_angle: no suitable neighbor according to the right-hand rule");
        } else {
            debug!("best_angle: selected {} with angle {}", best_id, smallest_angle);
        }
        best_id
    }

    /// The counter-clockwise angle in degrees `[0, 360)` from the vector `center -> ref_pos` to
    /// the vector `center -> node_pos`. An angle of exactly zero between non-identical vectors is
    /// rewritten to 360 so that it is never selected as the minimum unless it is the only option.
    pub(crate) fn angle(center: Position, ref_pos: Position, node_pos: Position) -> f64 {
        let ref_x = ref_pos.x - center.x;
        let ref_y = ref_pos.y - center.y;
        let node_x = node_pos.x - center.x;
        let node_y = node_pos.y - center.y;

        let mut angle = (node_y.atan2(node_x) - ref_y.atan2(ref_x)).to_degrees();
        if angle < 0.0 {
            angle += 360.0;
        }

        if angle == 0.0 && (ref_x != node_x || ref_y != node_y) {
            return 360.0;
        }
        angle
    }
}
