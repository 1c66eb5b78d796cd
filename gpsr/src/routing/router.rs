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

//! # The GPSR router
//!
//! One [`Router`] instance per node binds the protocol together: it beacons the node's own
//! position, maintains the neighbor [`PositionTable`], answers the routing hooks of the network
//! stack ([`Router::route_output`] and [`Router::route_input`]), and drains the deferred packet
//! queue. All activity is driven by scheduler callbacks; no call ever blocks.
//!
//! ## Forwarding state machine
//!
//! A packet is forwarded greedily as long as some neighbor is strictly closer to the destination
//! than the current node. When greedy progress is impossible and perimeter mode is enabled, the
//! packet enters recovery: it is annotated with a [`PositionHeader`] recording the destination,
//! the recovery point and the previous perimeter hop, and forwarded along the right-hand rule.
//! Recovery ends as soon as a node is strictly closer to the destination than the recovery point,
//! or terminally when no perimeter neighbor remains.

use crate::routing::config::ProtocolConfig;
use crate::routing::event::{Event, TimerHandle};
use crate::routing::packet::{HelloHeader, MessageType, Packet, PositionHeader, TypeHeader, WireHeader};
use crate::routing::ptable::PositionTable;
use crate::routing::rqueue::{QueueEntry, RequestQueue};
use crate::routing::stack::{NodeContext, SocketId};
use crate::routing::types::{
    ConfigError, ErrorCallback, ForwardCallback, InterfaceAddress, Ipv4Header,
    LocalDeliverCallback, NodeId, Position, Route, RouteError, Time,
};
use log::*;
use rand::prelude::*;
use rand::rngs::StdRng;
use std::collections::BTreeMap;
use std::net::Ipv4Addr;

/// Interval between two attempts to drain the deferred packet queue.
const QUEUE_CHECK_DELAY: Time = Time::from_millis(500);

/// The callbacks the network stack hands to [`Router::route_input`] for one packet. Each callback
/// is invoked at most once; exactly one of them is invoked for every handled packet.
pub struct InputHandlers {
    /// Transmit the packet to the gateway of the given route.
    pub unicast: ForwardCallback,
    /// Forward a multicast packet. Present for routing-hook parity; GPSR never multicasts data,
    /// so this callback is never invoked.
    pub multicast: ForwardCallback,
    /// Deliver the packet to the local node.
    pub local: LocalDeliverCallback,
    /// Report a terminal drop.
    pub error: ErrorCallback,
}

/// Per-node GPSR routing protocol instance.
pub struct Router {
    node_id: NodeId,
    config: ProtocolConfig,
    neighbors: PositionTable,
    queue: RequestQueue,
    /// destinations with at least one queued packet, in arrival order
    queued_destinations: Vec<Ipv4Addr>,
    /// one control socket per non-loopback interface
    sockets: BTreeMap<SocketId, InterfaceAddress>,
    hello_timer: Option<TimerHandle>,
    queue_timer: Option<TimerHandle>,
    rng: StdRng,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("node_id", &self.node_id)
            .field("neighbors", &self.neighbors)
            .field("queued_destinations", &self.queued_destinations)
            .field("sockets", &self.sockets)
            .finish()
    }
}

impl Router {
    /// Create a router for the given node. The configuration is validated; the jitter stream is
    /// seeded deterministically from the node id so that runs are reproducible.
    pub fn new(node_id: NodeId, config: ProtocolConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            node_id,
            neighbors: PositionTable::new(config.entry_lifetime),
            queue: RequestQueue::new(config.max_queue_len, config.max_queue_time),
            queued_destinations: Vec::new(),
            sockets: BTreeMap::new(),
            hello_timer: None,
            queue_timer: None,
            rng: StdRng::seed_from_u64(node_id.0 as u64),
            config,
        })
    }

    /// The id of the owning node.
    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    /// The active configuration.
    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    /// The neighbor position table.
    pub fn neighbors(&self) -> &PositionTable {
        &self.neighbors
    }

    /// Mutable access to the neighbor table, for tests that seed it directly.
    #[cfg(test)]
    pub(crate) fn neighbors_mut(&mut self) -> &mut PositionTable {
        &mut self.neighbors
    }

    /// The deferred packet queue.
    pub fn queue(&self) -> &RequestQueue {
        &self.queue
    }

    /// Reset the protocol state and schedule the first hello beacon, drawn uniformly from
    /// `[0, hello_interval / 2)` to desynchronize nodes that boot at the same instant.
    pub fn start(&mut self, ctx: &mut NodeContext) {
        self.queued_destinations.clear();
        self.neighbors.clear();
        let half = self.config.hello_interval.as_secs_f64() / 2.0;
        let delay = Time::from_secs_f64(self.rng.gen_range(0.0, half));
        self.hello_timer = Some(ctx.scheduler.schedule(delay, Event::HelloTimer(self.node_id)));
    }

    /// Routing hook for locally originated packets: resolve a next hop for `header.destination`.
    ///
    /// Returns `None` if the packet cannot be routed at all (broadcast destination, or no
    /// interface participates in GPSR). A resolvable destination yields a unicast route and
    /// leaves the packet untouched. When no usable next hop exists yet (unknown destination
    /// position, greedy failure, or no interface towards the next hop), the packet is tagged for
    /// self-deferral and the loopback placeholder route is returned: the stack re-presents the
    /// packet through [`Router::route_input`], where the tag routes it into the deferred queue.
    ///
    /// A `None` packet is a protocol-generated datagram; it is answered with the loopback route
    /// without touching any state.
    pub fn route_output(
        &mut self,
        ctx: &mut NodeContext,
        packet: Option<&mut Packet>,
        header: &Ipv4Header,
        oif: Option<u32>,
    ) -> Option<Route> {
        let packet = match packet {
            Some(p) => p,
            None => return Some(self.loopback_route(header, oif)),
        };

        if self.sockets.is_empty() {
            debug!("route_output: no GPSR interfaces");
            return None;
        }
        if header.is_broadcast() {
            debug!("route_output: ignoring broadcast packet");
            return None;
        }

        let dst = header.destination;
        let dst_pos = match ctx.locator.position_of(dst) {
            Some(p) => p,
            None => {
                debug!("route_output: position of {} unknown, deferring packet {}", dst, packet.uid());
                packet.mark_deferred();
                return Some(self.loopback_route(header, oif));
            }
        };
        let my_pos = match ctx.mobility.position() {
            Some(p) => p,
            None => {
                warn!("route_output: node has no position information");
                return Some(self.loopback_route(header, oif));
            }
        };

        // purge before the neighbor shortcut, so a silent neighbor is never picked as next hop
        let now = ctx.scheduler.now();
        self.neighbors.purge(now);
        let next_hop = if self.neighbors.is_neighbor(dst) {
            dst
        } else {
            self.neighbors.best_neighbor(dst_pos, my_pos, now)
        };

        if next_hop != Ipv4Addr::UNSPECIFIED {
            match ctx.ipv4.interface_for_address(next_hop) {
                Some(interface) => {
                    trace!("route_output: {} via {} on interface {}", dst, next_hop, interface);
                    Some(Route {
                        destination: dst,
                        source: header.source,
                        gateway: next_hop,
                        output_interface: interface,
                    })
                }
                None => {
                    warn!("route_output: no interface towards next hop {}, deferring", next_hop);
                    packet.mark_deferred();
                    Some(self.loopback_route(header, oif))
                }
            }
        } else {
            debug!("route_output: no greedy route to {}, deferring", dst);
            packet.mark_deferred();
            Some(self.loopback_route(header, oif))
        }
    }

    /// Routing hook for inbound packets.
    ///
    /// Returns false if the packet is not handled by GPSR (broadcast destination, or no interface
    /// participates), so that another subsystem may act on it. In every other case the packet is
    /// consumed — delivered locally, forwarded, enqueued, or dropped through the error callback —
    /// and the hook returns true.
    pub fn route_input(
        &mut self,
        ctx: &mut NodeContext,
        packet: &Packet,
        header: &Ipv4Header,
        iif: u32,
        handlers: InputHandlers,
    ) -> bool {
        trace!(
            "route_input: packet {} for {} on interface {}",
            packet.uid(),
            header.destination,
            iif
        );

        if self.sockets.is_empty() {
            debug!("route_input: no GPSR interfaces");
            return false;
        }
        if header.is_broadcast() {
            debug!("route_input: ignoring broadcast packet");
            return false;
        }

        let InputHandlers { unicast, multicast: _, local, error } = handlers;

        // a packet we sent to the loopback device comes back for deferred routing
        if packet.is_deferred() && self.is_own_address(header.source) {
            let mut retry = packet.clone();
            retry.clear_deferred();
            self.deferred_route_output(ctx, retry, header, unicast, error);
            return true;
        }

        if ctx.ipv4.is_destination(header.destination, iif) {
            trace!("route_input: local delivery to {}", header.destination);
            let mut delivered = packet.clone();
            delivered.remove_position_header();
            local(&delivered, header, iif);
            return true;
        }

        self.forwarding_greedy(ctx, packet, header, unicast, error);
        true
    }

    /// Create a control socket for a newly activated interface. The loopback device is ignored,
    /// since hellos never leave one hop anyway.
    pub fn notify_interface_up(&mut self, ctx: &mut NodeContext, interface: u32) {
        let iface = match ctx.ipv4.address(interface, 0) {
            Some(i) => i,
            None => return,
        };
        if iface.local.is_loopback() {
            return;
        }
        if self.find_socket_for_interface(interface).is_some() {
            return;
        }
        let socket = ctx.sockets.open(interface, self.config.control_port, 1);
        debug!("Opened control socket on interface {} ({})", interface, iface.local);
        self.sockets.insert(socket, iface);
    }

    /// Close the control socket of a deactivated interface. When the last socket disappears, the
    /// neighbor table is cleared: without beaconing, its contents can only go stale.
    pub fn notify_interface_down(&mut self, ctx: &mut NodeContext, interface: u32) {
        if let Some(socket) = self.find_socket_for_interface(interface) {
            ctx.sockets.close(socket);
            self.sockets.remove(&socket);
            debug!("Closed control socket on interface {}", interface);
        }
        if self.sockets.is_empty() {
            debug!("No GPSR interfaces left, clearing the neighbor table");
            self.neighbors.clear();
        }
    }

    /// A new address appeared on an interface; mirror [`Router::notify_interface_up`].
    pub fn notify_add_address(
        &mut self,
        ctx: &mut NodeContext,
        interface: u32,
        _address: InterfaceAddress,
    ) {
        if !ctx.ipv4.is_up(interface) {
            return;
        }
        self.notify_interface_up(ctx, interface);
    }

    /// An address disappeared from an interface: drop its socket and rebind to the interface's
    /// remaining primary address, if any.
    pub fn notify_remove_address(
        &mut self,
        ctx: &mut NodeContext,
        interface: u32,
        address: InterfaceAddress,
    ) {
        if let Some(socket) = self.find_socket_for_address(address.local) {
            ctx.sockets.close(socket);
            self.sockets.remove(&socket);
            if let Some(iface) = ctx.ipv4.address(interface, 0) {
                if !iface.local.is_loopback() {
                    let socket = ctx.sockets.open(interface, self.config.control_port, 1);
                    self.sockets.insert(socket, iface);
                }
            }
            if self.sockets.is_empty() {
                debug!("No GPSR interfaces left, clearing the neighbor table");
                self.neighbors.clear();
            }
        }
    }

    /// Hello beacon timer callback: broadcast the node's position on every control socket, then
    /// reschedule with a jitter of `± hello_interval / 2` so that neighboring beacons do not
    /// synchronize. A missing position skips the emission but never the rescheduling.
    pub fn send_hello(&mut self, ctx: &mut NodeContext) {
        self.hello_timer = None;

        match ctx.mobility.position() {
            Some(my_pos) => {
                let mut payload = Vec::with_capacity(1 + HelloHeader::SIZE);
                TypeHeader::new(MessageType::Hello).serialize(&mut payload);
                HelloHeader::new(my_pos.x, my_pos.y).serialize(&mut payload);
                for (socket, iface) in self.sockets.iter() {
                    trace!("Sending hello from {} to {}", iface.local, iface.broadcast);
                    ctx.sockets.send_to(
                        *socket,
                        payload.clone(),
                        iface.broadcast,
                        self.config.control_port,
                    );
                }
            }
            None => warn!("send_hello: no position available, skipping this beacon"),
        }

        let interval = self.config.hello_interval.as_secs_f64();
        let jitter = self.rng.gen_range(-interval / 2.0, interval / 2.0);
        let delay = Time::from_secs_f64(interval + jitter);
        self.hello_timer = Some(ctx.scheduler.schedule(delay, Event::HelloTimer(self.node_id)));
    }

    /// Receive callback of the control sockets: demultiplex on the type header and update the
    /// neighbor table on hellos. Malformed datagrams are dropped silently; they are
    /// indistinguishable from background noise.
    pub fn recv_control(&mut self, ctx: &mut NodeContext, sender: Ipv4Addr, payload: &[u8]) {
        let (type_header, consumed) = match TypeHeader::deserialize(payload) {
            Some(x) => x,
            None => {
                debug!("Received empty control datagram from {}", sender);
                return;
            }
        };
        if !type_header.is_valid() {
            debug!("Received malformed control packet from {}", sender);
            return;
        }

        match type_header.kind() {
            MessageType::Hello => match HelloHeader::deserialize(&payload[consumed..]) {
                Some((hello, _)) => {
                    let position = Position::new(hello.position_x, hello.position_y);
                    trace!("Received hello from {} at {}", sender, position);
                    self.neighbors.add_entry(sender, position, ctx.scheduler.now());
                }
                None => debug!("Received truncated hello from {}", sender),
            },
            MessageType::Position => {
                debug!("Unexpected position header on the control port from {}", sender)
            }
        }
    }

    /// Queue drain timer callback: purge expired entries, then attempt one delivery per distinct
    /// destination. The timer re-arms itself as long as packets remain queued.
    pub fn check_queue(&mut self, ctx: &mut NodeContext) {
        self.queue_timer = None;

        let now = ctx.scheduler.now();
        self.queue.purge(now);

        let destinations = self.queued_destinations.clone();
        let mut sent = 0;
        for dst in destinations {
            if self.send_packet_from_queue(ctx, dst) {
                sent += 1;
            }
        }
        if sent > 0 {
            debug!("check_queue: processed {} queued destinations", sent);
        }

        let queue = &self.queue;
        self.queued_destinations.retain(|dst| queue.find(*dst));

        if !self.queued_destinations.is_empty() {
            self.queue_timer =
                Some(ctx.scheduler.schedule(QUEUE_CHECK_DELAY, Event::QueueTimer(self.node_id)));
        }
    }

    /// Enqueue a packet that has no usable next hop yet, arming the drain timer if the queue was
    /// empty. Duplicate `(packet uid, destination)` pairs are rejected by the queue.
    fn deferred_route_output(
        &mut self,
        ctx: &mut NodeContext,
        packet: Packet,
        header: &Ipv4Header,
        forward_cb: ForwardCallback,
        error_cb: ErrorCallback,
    ) {
        let now = ctx.scheduler.now();

        if self.queue.is_empty() {
            if let Some(handle) = self.queue_timer.take() {
                ctx.scheduler.cancel(handle);
            }
            self.queue_timer =
                Some(ctx.scheduler.schedule(QUEUE_CHECK_DELAY, Event::QueueTimer(self.node_id)));
        }

        let uid = packet.uid();
        let dst = header.destination;
        let entry = QueueEntry::new(packet, header.clone(), forward_cb, error_cb);
        if self.queue.enqueue(entry, now) {
            if !self.queued_destinations.contains(&dst) {
                self.queued_destinations.push(dst);
            }
            debug!("Added packet {} for {} to the queue", uid, dst);
        }
    }

    /// Attempt to deliver one queued packet for `dst`. Returns true if a packet was taken off the
    /// queue (forwarded, recovered or dropped). An unknown destination position leaves the queue
    /// untouched: the condition is transient, and the entries expire by deadline if it persists.
    fn send_packet_from_queue(&mut self, ctx: &mut NodeContext, dst: Ipv4Addr) -> bool {
        let now = ctx.scheduler.now();
        self.neighbors.purge(now);

        let dst_pos = match ctx.locator.position_of(dst) {
            Some(p) => p,
            None => {
                debug!("send_packet_from_queue: position of {} still unknown", dst);
                return false;
            }
        };

        let entry = match self.queue.dequeue_for(dst, now) {
            Some(e) => e,
            None => return false,
        };
        let (packet, header, forward_cb, error_cb) = entry.into_parts();

        let my_pos = match ctx.mobility.position() {
            Some(p) => p,
            None => {
                warn!("send_packet_from_queue: node has no position, dropping packets for {}", dst);
                error_cb(&packet, &header, RouteError::NoRouteToHost);
                self.queue.drop_all_for(dst, now);
                return false;
            }
        };

        let next_hop = self.neighbors.best_neighbor(dst_pos, my_pos, now);
        if next_hop == Ipv4Addr::UNSPECIFIED {
            if self.config.perimeter_mode {
                debug!("send_packet_from_queue: entering recovery for packet {}", packet.uid());
                let mut copy = packet;
                copy.remove_position_header();
                copy.add_position_header(&PositionHeader {
                    dst_x: dst_pos.x,
                    dst_y: dst_pos.y,
                    rec_x: my_pos.x,
                    rec_y: my_pos.y,
                    prev_x: my_pos.x,
                    prev_y: my_pos.y,
                    updated: 0,
                    recovery_flag: true,
                });
                self.recovery_mode(ctx, dst, copy, forward_cb, &header, error_cb);
            } else {
                debug!("send_packet_from_queue: greedy failed, recovery disabled, dropping");
                error_cb(&packet, &header, RouteError::NoRouteToHost);
            }
            return true;
        }

        match ctx.ipv4.interface_for_address(next_hop) {
            Some(interface) => {
                trace!("send_packet_from_queue: {} via {}", dst, next_hop);
                let route = Route {
                    destination: dst,
                    source: header.source,
                    gateway: next_hop,
                    output_interface: interface,
                };
                forward_cb(&route, &packet, &header);
                true
            }
            None => {
                warn!("send_packet_from_queue: no interface towards next hop {}", next_hop);
                error_cb(&packet, &header, RouteError::NoRouteToHost);
                false
            }
        }
    }

    /// Greedy forwarding of a transit packet. The destination position comes from the packet's
    /// position header if present, otherwise from the locator. On greedy failure the packet
    /// either enters recovery (perimeter mode) or is dropped.
    fn forwarding_greedy(
        &mut self,
        ctx: &mut NodeContext,
        packet: &Packet,
        header: &Ipv4Header,
        forward_cb: ForwardCallback,
        error_cb: ErrorCallback,
    ) {
        let dst = header.destination;

        let my_pos = match ctx.mobility.position() {
            Some(p) => p,
            None => {
                warn!("forwarding_greedy: node has no position information");
                error_cb(packet, header, RouteError::NoRouteToHost);
                return;
            }
        };

        let position_header = packet.peek_position_header();
        let dst_pos = match &position_header {
            Some(ph) => Position::new(ph.dst_x, ph.dst_y),
            None => match ctx.locator.position_of(dst) {
                Some(p) => p,
                None => {
                    warn!("forwarding_greedy: no position known for {}, dropping", dst);
                    error_cb(packet, header, RouteError::NoRouteToHost);
                    return;
                }
            },
        };

        let now = ctx.scheduler.now();
        let next_hop = self.neighbors.best_neighbor(dst_pos, my_pos, now);

        if next_hop != Ipv4Addr::UNSPECIFIED {
            match ctx.ipv4.interface_for_address(next_hop) {
                Some(interface) => {
                    trace!("forwarding_greedy: {} via {}", dst, next_hop);
                    let route = Route {
                        destination: dst,
                        source: header.source,
                        gateway: next_hop,
                        output_interface: interface,
                    };
                    forward_cb(&route, packet, header);
                }
                None => {
                    warn!("forwarding_greedy: no interface towards next hop {}", next_hop);
                    error_cb(packet, header, RouteError::NoRouteToHost);
                }
            }
            return;
        }

        if !self.config.perimeter_mode {
            debug!("forwarding_greedy: no closer neighbor for {} and recovery disabled", dst);
            error_cb(packet, header, RouteError::NoRouteToHost);
            return;
        }

        let already_in_recovery = position_header.map(|h| h.recovery_flag).unwrap_or(false);
        if already_in_recovery {
            self.recovery_mode(ctx, dst, packet.clone(), forward_cb, header, error_cb);
        } else {
            debug!("forwarding_greedy: initiating recovery for packet {}", packet.uid());
            let mut copy = packet.clone();
            // drop any stale annotation before writing the fresh recovery state
            copy.remove_position_header();
            copy.add_position_header(&PositionHeader {
                dst_x: dst_pos.x,
                dst_y: dst_pos.y,
                rec_x: my_pos.x,
                rec_y: my_pos.y,
                prev_x: my_pos.x,
                prev_y: my_pos.y,
                updated: 0,
                recovery_flag: true,
            });
            self.recovery_mode(ctx, dst, copy, forward_cb, header, error_cb);
        }
    }

    /// Perimeter traversal of a packet in recovery.
    ///
    /// If this node is strictly closer to the destination than the recovery point, the recovery
    /// flag is cleared and greedy forwarding restarts. Otherwise the right-hand rule picks the
    /// next hop, the packet's `prev` position is rewritten to this node, and the packet is
    /// forwarded; if no perimeter neighbor exists, the packet is dropped.
    fn recovery_mode(
        &mut self,
        ctx: &mut NodeContext,
        dst: Ipv4Addr,
        packet: Packet,
        forward_cb: ForwardCallback,
        header: &Ipv4Header,
        error_cb: ErrorCallback,
    ) {
        let my_pos = match ctx.mobility.position() {
            Some(p) => p,
            None => {
                warn!("recovery_mode: node has no position information");
                error_cb(&packet, header, RouteError::NoRouteToHost);
                return;
            }
        };

        let ph = match packet.peek_position_header() {
            Some(ph) => ph,
            None => {
                error!("recovery_mode: packet {} is missing its position header", packet.uid());
                error_cb(&packet, header, RouteError::NoRouteToHost);
                return;
            }
        };
        let dst_pos = Position::new(ph.dst_x, ph.dst_y);
        let rec_pos = Position::new(ph.rec_x, ph.rec_y);
        let prev_pos = Position::new(ph.prev_x, ph.prev_y);

        if ph.recovery_flag && my_pos.distance_to(dst_pos) < rec_pos.distance_to(dst_pos) {
            debug!(
                "recovery_mode: {} is closer to {} than the recovery point {}, resuming greedy",
                my_pos, dst_pos, rec_pos
            );
            let mut resumed = packet;
            if let Some(mut h) = resumed.remove_position_header() {
                h.recovery_flag = false;
                resumed.add_position_header(&h);
            }
            self.forwarding_greedy(ctx, &resumed, header, forward_cb, error_cb);
            return;
        }

        let now = ctx.scheduler.now();
        let next_hop = self.neighbors.best_angle(dst_pos, rec_pos, my_pos, prev_pos, now);
        if next_hop == Ipv4Addr::UNSPECIFIED {
            warn!("recovery_mode: no next hop by the right-hand rule for {}, dropping", dst);
            error_cb(&packet, header, RouteError::NoRouteToHost);
            return;
        }

        // this node becomes the previous perimeter hop for the downstream node
        let mut copy = packet;
        if let Some(mut h) = copy.remove_position_header() {
            h.prev_x = my_pos.x;
            h.prev_y = my_pos.y;
            copy.add_position_header(&h);
        }

        match ctx.ipv4.interface_for_address(next_hop) {
            Some(interface) => {
                trace!("recovery_mode: {} via {}", dst, next_hop);
                let route = Route {
                    destination: dst,
                    source: header.source,
                    gateway: next_hop,
                    output_interface: interface,
                };
                forward_cb(&route, &copy, header);
            }
            None => {
                warn!("recovery_mode: no interface towards next hop {}", next_hop);
                error_cb(&copy, header, RouteError::NoRouteToHost);
            }
        }
    }

    /// The loopback placeholder route. Its source is the address of the requested output
    /// interface (or the first control socket), its gateway the loopback address, so the stack
    /// re-presents the packet to this router.
    fn loopback_route(&self, header: &Ipv4Header, oif: Option<u32>) -> Route {
        let mut source = Ipv4Addr::UNSPECIFIED;
        match oif {
            Some(interface) => {
                for iface in self.sockets.values() {
                    if iface.interface == interface {
                        source = iface.local;
                        break;
                    }
                }
            }
            None => {
                if let Some(iface) = self.sockets.values().next() {
                    source = iface.local;
                }
            }
        }
        if source == Ipv4Addr::UNSPECIFIED {
            warn!("loopback_route: no available GPSR interface address");
        }
        Route {
            destination: header.destination,
            source,
            gateway: Ipv4Addr::LOCALHOST,
            output_interface: 0,
        }
    }

    fn find_socket_for_interface(&self, interface: u32) -> Option<SocketId> {
        self.sockets.iter().find(|(_, i)| i.interface == interface).map(|(s, _)| *s)
    }

    fn find_socket_for_address(&self, address: Ipv4Addr) -> Option<SocketId> {
        self.sockets.iter().find(|(_, i)| i.local == address).map(|(s, _)| *s)
    }

    fn is_own_address(&self, addr: Ipv4Addr) -> bool {
        self.sockets.values().any(|i| i.local == addr)
    }
}
