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

//! # Simulated wireless network
//!
//! The [`Network`] owns all simulated nodes and dispatches scheduler events to their routers. It
//! implements every collaborator interface of the routing core: a unit-disk radio (all up nodes
//! within `radio_range` of a transmitter receive its frames after `link_delay`), a static
//! mobility model, a global-directory locator, and per-node control sockets. Addresses are
//! assigned from `10.1.1.0/24`, one per node, so a network holds at most 254 nodes.

use crate::routing::event::Event;
use crate::routing::packet::Packet;
use crate::routing::router::{InputHandlers, Router};
use crate::routing::stack::{
    Ipv4View, Locator, Mobility, NodeContext, Scheduler, SocketId, SocketLayer,
};
use crate::routing::types::{
    ConfigError, ErrorCallback, ForwardCallback, InterfaceAddress, Ipv4Header,
    LocalDeliverCallback, NodeId, Position, Route, RouteError, Time,
};
use crate::routing::ProtocolConfig;
use crate::simulator::scheduler::VirtualScheduler;
use log::*;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::net::Ipv4Addr;
use std::rc::Rc;

/// Index of the single wireless interface of every simulated node (0 is the loopback device).
const WIRELESS_INTERFACE: u32 = 1;
/// L4 protocol number stamped into generated traffic.
const UDP_PROTOCOL: u8 = 17;

/// A successfully delivered packet, as recorded by the harness.
#[derive(Debug, Clone)]
pub struct DeliveryRecord {
    /// the node the packet was delivered to
    pub node: NodeId,
    /// the virtual time of delivery
    pub time: Time,
    /// number of radio transmissions the packet took
    pub hops: u32,
    /// the packet as delivered (position annotation already stripped)
    pub packet: Packet,
    /// its IP header
    pub header: Ipv4Header,
}

/// A terminally dropped packet, as recorded by the harness.
#[derive(Debug, Clone)]
pub struct DropRecord {
    /// the node that dropped the packet
    pub node: NodeId,
    /// the virtual time of the drop
    pub time: Time,
    /// the reported error
    pub error: RouteError,
    /// the packet at the moment of the drop (annotations included)
    pub packet: Packet,
    /// its IP header
    pub header: Ipv4Header,
}

/// One simulated node.
#[derive(Debug)]
struct Node {
    address: Ipv4Addr,
    position: Position,
    up: bool,
    router: Router,
}

#[derive(Debug, Clone, Copy)]
struct DirectoryEntry {
    node: NodeId,
    position: Position,
    up: bool,
}

/// Result of a router upcall, pushed by the callbacks and drained by the harness afterwards.
#[derive(Debug)]
enum Outcome {
    Forwarded { node: NodeId, route: Route, packet: Packet, header: Ipv4Header },
    Delivered { node: NodeId, packet: Packet, header: Ipv4Header },
    Dropped { node: NodeId, packet: Packet, header: Ipv4Header, error: RouteError },
}

#[derive(Debug, Default)]
struct SocketTable {
    next: u64,
    sockets: BTreeMap<SocketId, (NodeId, u32)>,
}

/// A control datagram handed to the socket layer, not yet put on the air.
#[derive(Debug)]
struct ControlSend {
    from: NodeId,
    payload: Vec<u8>,
    dest: Ipv4Addr,
}

/// The per-upcall view of a node's environment: IPv4 stack, mobility and locator in one.
struct StackView<'a> {
    address: Ipv4Addr,
    position: Position,
    directory: &'a BTreeMap<Ipv4Addr, DirectoryEntry>,
}

fn same_subnet(a: Ipv4Addr, b: Ipv4Addr) -> bool {
    a.octets()[..3] == b.octets()[..3]
}

fn subnet_broadcast(addr: Ipv4Addr) -> Ipv4Addr {
    let o = addr.octets();
    Ipv4Addr::new(o[0], o[1], o[2], 255)
}

impl<'a> Ipv4View for StackView<'a> {
    fn address(&self, interface: u32, index: u32) -> Option<InterfaceAddress> {
        match (interface, index) {
            (0, 0) => Some(InterfaceAddress {
                interface: 0,
                local: Ipv4Addr::LOCALHOST,
                broadcast: Ipv4Addr::new(127, 255, 255, 255),
            }),
            (WIRELESS_INTERFACE, 0) => Some(InterfaceAddress {
                interface: WIRELESS_INTERFACE,
                local: self.address,
                broadcast: subnet_broadcast(self.address),
            }),
            _ => None,
        }
    }

    fn is_destination(&self, addr: Ipv4Addr, _iif: u32) -> bool {
        addr == self.address
    }

    fn interface_for_address(&self, addr: Ipv4Addr) -> Option<u32> {
        if same_subnet(addr, self.address) {
            Some(WIRELESS_INTERFACE)
        } else {
            None
        }
    }

    fn is_up(&self, _interface: u32) -> bool {
        true
    }
}

impl<'a> Mobility for StackView<'a> {
    fn position(&self) -> Option<Position> {
        Some(self.position)
    }
}

impl<'a> Locator for StackView<'a> {
    fn position_of(&self, addr: Ipv4Addr) -> Option<Position> {
        self.directory.get(&addr).map(|e| e.position)
    }
}

/// The socket layer of one node, valid for one upcall. Sends are collected and put on the air by
/// the harness after the upcall returns.
struct HarnessSockets<'a> {
    node: NodeId,
    table: &'a mut SocketTable,
    outbox: &'a mut Vec<ControlSend>,
}

impl<'a> SocketLayer for HarnessSockets<'a> {
    fn open(&mut self, interface: u32, _port: u16, _ttl: u8) -> SocketId {
        let id = SocketId(self.table.next);
        self.table.next += 1;
        self.table.sockets.insert(id, (self.node, interface));
        id
    }

    fn close(&mut self, socket: SocketId) {
        self.table.sockets.remove(&socket);
    }

    fn send_to(&mut self, socket: SocketId, payload: Vec<u8>, dest: Ipv4Addr, _port: u16) {
        if !self.table.sockets.contains_key(&socket) {
            debug!("send_to on a closed socket of {}", self.node);
            return;
        }
        self.outbox.push(ControlSend { from: self.node, payload, dest });
    }
}

/// A simulated multi-node wireless network running GPSR on every node.
#[derive(Debug)]
pub struct Network {
    scheduler: VirtualScheduler,
    nodes: BTreeMap<NodeId, Node>,
    directory: BTreeMap<Ipv4Addr, DirectoryEntry>,
    socket_table: SocketTable,
    radio_range: f64,
    link_delay: Time,
    config: ProtocolConfig,
    next_node: u32,
    next_uid: u64,
    outcomes: Rc<RefCell<Vec<Outcome>>>,
    delivered: Vec<DeliveryRecord>,
    dropped: Vec<DropRecord>,
    hops: HashMap<u64, u32>,
}

impl Network {
    /// Create an empty network. All nodes added later share the given protocol configuration,
    /// which is validated here once.
    pub fn new(
        config: ProtocolConfig,
        radio_range: f64,
        link_delay: Time,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            scheduler: VirtualScheduler::new(),
            nodes: BTreeMap::new(),
            directory: BTreeMap::new(),
            socket_table: SocketTable::default(),
            radio_range,
            link_delay,
            config,
            next_node: 0,
            next_uid: 0,
            outcomes: Rc::new(RefCell::new(Vec::new())),
            delivered: Vec::new(),
            dropped: Vec::new(),
            hops: HashMap::new(),
        })
    }

    /// Add a node at the given position. Addresses are assigned in order from `10.1.1.1`.
    pub fn add_node(&mut self, position: Position) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        let address = Ipv4Addr::new(10, 1, 1, (id.0 + 1) as u8);
        let router = match Router::new(id, self.config.clone()) {
            Ok(r) => r,
            Err(_) => unreachable!("the configuration was validated when the network was built"),
        };
        self.nodes.insert(id, Node { address, position, up: true, router });
        self.directory.insert(address, DirectoryEntry { node: id, position, up: true });
        info!("Added {} at {} with address {}", id, position, address);
        id
    }

    /// Add `n` nodes in a row-first grid with the given spacing, `per_row` nodes per row.
    pub fn add_grid(&mut self, n: usize, spacing: f64, per_row: usize) -> Vec<NodeId> {
        (0..n)
            .map(|i| {
                let x = (i % per_row) as f64 * spacing;
                let y = (i / per_row) as f64 * spacing;
                self.add_node(Position::new(x, y))
            })
            .collect()
    }

    /// The address of a node.
    pub fn node_address(&self, id: NodeId) -> Option<Ipv4Addr> {
        self.nodes.get(&id).map(|n| n.address)
    }

    /// The position of a node.
    pub fn node_position(&self, id: NodeId) -> Option<Position> {
        self.nodes.get(&id).map(|n| n.position)
    }

    /// Move a node to a new position.
    pub fn set_position(&mut self, id: NodeId, position: Position) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.position = position;
            if let Some(entry) = self.directory.get_mut(&node.address) {
                entry.position = position;
            }
        }
    }

    /// Mark a node up or down. A down node neither transmits nor receives anything; its timers
    /// keep running so that it resumes beaconing when it comes back up.
    pub fn set_node_up(&mut self, id: NodeId, up: bool) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.up = up;
            if let Some(entry) = self.directory.get_mut(&node.address) {
                entry.up = up;
            }
        }
    }

    /// Read access to a node's router, mainly for inspecting its neighbor table in tests.
    pub fn router(&self, id: NodeId) -> Option<&Router> {
        self.nodes.get(&id).map(|n| &n.router)
    }

    /// Bring up the wireless interface of every node and start its protocol instance. Call once,
    /// before [`Network::run_until`].
    pub fn start(&mut self) {
        let ids: Vec<NodeId> = self.nodes.keys().copied().collect();
        for id in ids {
            self.upcall(id, |router, ctx| {
                router.notify_interface_up(ctx, WIRELESS_INTERFACE);
                router.start(ctx);
            });
        }
    }

    /// Schedule a data packet from `from` to `to` at virtual time `at` (clamped to the present).
    /// Returns the packet uid.
    pub fn send(&mut self, from: NodeId, to: NodeId, payload: Vec<u8>, at: Time) -> Option<u64> {
        let destination = self.node_address(to)?;
        self.send_to_address(from, destination, payload, at)
    }

    /// Schedule a data packet towards an arbitrary destination address, which may not belong to
    /// any node (the destination position is then unknown to the locator).
    pub fn send_to_address(
        &mut self,
        from: NodeId,
        destination: Ipv4Addr,
        payload: Vec<u8>,
        at: Time,
    ) -> Option<u64> {
        let source = self.node_address(from)?;
        let uid = self.next_uid;
        self.next_uid += 1;
        let packet = Packet::new(uid, payload);
        let header = Ipv4Header { source, destination, protocol: UDP_PROTOCOL };
        let delay = at - self.scheduler.now();
        self.scheduler.schedule(delay, Event::Originate { node: from, packet, header });
        Some(uid)
    }

    /// Process all events up to and including virtual time `t`, then advance the clock to `t`.
    pub fn run_until(&mut self, t: Time) {
        while let Some(fire_time) = self.scheduler.peek_time() {
            if fire_time > t {
                break;
            }
            if let Some((_, event)) = self.scheduler.pop() {
                self.dispatch(event);
            }
        }
        self.scheduler.advance_to(t);
    }

    /// The current virtual time.
    pub fn now(&self) -> Time {
        self.scheduler.now()
    }

    /// All packets delivered so far.
    pub fn delivered(&self) -> &[DeliveryRecord] {
        &self.delivered
    }

    /// All packets terminally dropped so far.
    pub fn dropped(&self) -> &[DropRecord] {
        &self.dropped
    }

    fn node_up(&self, id: NodeId) -> bool {
        self.nodes.get(&id).map(|n| n.up).unwrap_or(false)
    }

    /// Run one router upcall with a fully populated [`NodeContext`], then put the produced
    /// control sends on the air and process the forwarding outcomes.
    fn upcall<F>(&mut self, id: NodeId, f: F)
    where
        F: FnOnce(&mut Router, &mut NodeContext),
    {
        let (address, position) = match self.nodes.get(&id) {
            Some(n) => (n.address, n.position),
            None => return,
        };
        let mut outbox: Vec<ControlSend> = Vec::new();
        {
            let view = StackView { address, position, directory: &self.directory };
            let mut sockets =
                HarnessSockets { node: id, table: &mut self.socket_table, outbox: &mut outbox };
            let node = match self.nodes.get_mut(&id) {
                Some(n) => n,
                None => return,
            };
            let mut ctx = NodeContext {
                scheduler: &mut self.scheduler,
                ipv4: &view,
                mobility: &view,
                locator: &view,
                sockets: &mut sockets,
            };
            f(&mut node.router, &mut ctx);
        }
        self.flush_control(outbox);
        self.flush_outcomes();
    }

    /// Put collected control datagrams on the air: every up node within radio range of an up
    /// transmitter receives a broadcast after `link_delay`.
    fn flush_control(&mut self, outbox: Vec<ControlSend>) {
        for send in outbox {
            let (from_addr, from_pos, from_up) = match self.nodes.get(&send.from) {
                Some(n) => (n.address, n.position, n.up),
                None => continue,
            };
            if !from_up {
                debug!("{} is down, control datagram lost", send.from);
                continue;
            }
            if send.dest == Ipv4Addr::BROADCAST || send.dest == subnet_broadcast(from_addr) {
                for entry in self.directory.values() {
                    if entry.node == send.from || !entry.up {
                        continue;
                    }
                    if from_pos.distance_to(entry.position) <= self.radio_range {
                        self.scheduler.schedule(
                            self.link_delay,
                            Event::ControlDelivery {
                                to: entry.node,
                                from: from_addr,
                                payload: send.payload.clone(),
                            },
                        );
                    }
                }
            } else if let Some(entry) = self.directory.get(&send.dest).copied() {
                if entry.up && from_pos.distance_to(entry.position) <= self.radio_range {
                    self.scheduler.schedule(
                        self.link_delay,
                        Event::ControlDelivery {
                            to: entry.node,
                            from: from_addr,
                            payload: send.payload,
                        },
                    );
                }
            }
        }
    }

    /// Process the outcomes of the last upcall: transmit forwarded packets, record deliveries and
    /// drops.
    fn flush_outcomes(&mut self) {
        let outcomes: Vec<Outcome> = self.outcomes.borrow_mut().drain(..).collect();
        for outcome in outcomes {
            match outcome {
                Outcome::Forwarded { node, route, packet, header } => {
                    if route.is_loopback() {
                        self.scheduler.schedule(
                            self.link_delay,
                            Event::DataDelivery { to: node, packet, header },
                        );
                    } else {
                        self.transmit_data(node, &route, packet, header);
                    }
                }
                Outcome::Delivered { node, packet, header } => {
                    let hops = self.hops.get(&packet.uid()).copied().unwrap_or(0);
                    debug!("Packet {} delivered to {} after {} hops", packet.uid(), node, hops);
                    self.delivered.push(DeliveryRecord {
                        node,
                        time: self.scheduler.now(),
                        hops,
                        packet,
                        header,
                    });
                }
                Outcome::Dropped { node, packet, header, error } => {
                    debug!("Packet {} dropped at {}: {}", packet.uid(), node, error);
                    self.dropped.push(DropRecord {
                        node,
                        time: self.scheduler.now(),
                        error,
                        packet,
                        header,
                    });
                }
            }
        }
    }

    /// Transmit a data packet to the gateway of `route` over the radio. Out-of-range and down
    /// receivers lose the packet silently.
    fn transmit_data(&mut self, from: NodeId, route: &Route, packet: Packet, header: Ipv4Header) {
        let (from_pos, from_up) = match self.nodes.get(&from) {
            Some(n) => (n.position, n.up),
            None => return,
        };
        if !from_up {
            debug!("{} is down, data packet {} lost", from, packet.uid());
            return;
        }
        let (gw_node, gw_pos, gw_up) = match self.directory.get(&route.gateway) {
            Some(e) => (e.node, e.position, e.up),
            None => {
                debug!("No node owns next hop address {}, packet {} lost", route.gateway, packet.uid());
                return;
            }
        };
        if !gw_up || from_pos.distance_to(gw_pos) > self.radio_range {
            debug!("Radio loss from {} towards {}", from, route.gateway);
            return;
        }
        *self.hops.entry(packet.uid()).or_insert(0) += 1;
        self.scheduler.schedule(
            self.link_delay,
            Event::DataDelivery { to: gw_node, packet, header },
        );
    }

    /// Build the routing-hook callbacks for one inbound packet at `node`. Every callback records
    /// its outcome in the shared sink, which the harness drains after the upcall.
    fn make_handlers(&self, node: NodeId) -> InputHandlers {
        let unicast: ForwardCallback = Box::new({
            let sink = Rc::clone(&self.outcomes);
            move |route, packet, header| {
                sink.borrow_mut().push(Outcome::Forwarded {
                    node,
                    route: route.clone(),
                    packet: packet.clone(),
                    header: header.clone(),
                })
            }
        });
        let multicast: ForwardCallback =
            Box::new(|_route, packet, _header| warn!("multicast forward of packet {}", packet.uid()));
        let local: LocalDeliverCallback = Box::new({
            let sink = Rc::clone(&self.outcomes);
            move |packet, header, _iif| {
                sink.borrow_mut().push(Outcome::Delivered {
                    node,
                    packet: packet.clone(),
                    header: header.clone(),
                })
            }
        });
        let error: ErrorCallback = Box::new({
            let sink = Rc::clone(&self.outcomes);
            move |packet, header, error| {
                sink.borrow_mut().push(Outcome::Dropped {
                    node,
                    packet: packet.clone(),
                    header: header.clone(),
                    error,
                })
            }
        });
        InputHandlers { unicast, multicast, local, error }
    }

    /// Dispatch one scheduler event to the owning node.
    fn dispatch(&mut self, event: Event) {
        match event {
            Event::HelloTimer(node) => self.upcall(node, |router, ctx| router.send_hello(ctx)),
            Event::QueueTimer(node) => self.upcall(node, |router, ctx| router.check_queue(ctx)),
            Event::ControlDelivery { to, from, payload } => {
                if !self.node_up(to) {
                    return;
                }
                self.upcall(to, |router, ctx| router.recv_control(ctx, from, &payload));
            }
            Event::DataDelivery { to, packet, header } => {
                if !self.node_up(to) {
                    debug!("{} is down, inbound packet {} lost", to, packet.uid());
                    return;
                }
                let handlers = self.make_handlers(to);
                let mut handled = false;
                self.upcall(to, |router, ctx| {
                    handled = router.route_input(ctx, &packet, &header, WIRELESS_INTERFACE, handlers);
                });
                if !handled {
                    debug!("Packet {} not handled by {}", packet.uid(), to);
                }
            }
            Event::Originate { node, packet, header } => {
                if !self.node_up(node) {
                    return;
                }
                let mut packet = packet;
                let mut route = None;
                self.upcall(node, |router, ctx| {
                    route = router.route_output(ctx, Some(&mut packet), &header, None);
                });
                match route {
                    Some(route) => {
                        if route.is_loopback() {
                            self.scheduler.schedule(
                                self.link_delay,
                                Event::DataDelivery { to: node, packet, header },
                            );
                        } else {
                            self.transmit_data(node, &route, packet, header);
                        }
                    }
                    None => {
                        debug!("Packet {} is unroutable at {}", packet.uid(), node);
                        self.dropped.push(DropRecord {
                            node,
                            time: self.scheduler.now(),
                            error: RouteError::NoRouteToHost,
                            packet,
                            header,
                        });
                    }
                }
            }
        }
    }
}
