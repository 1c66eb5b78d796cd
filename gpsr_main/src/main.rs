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

//! Command line runner: simulate GPSR on a static grid and print delivery metrics.

use clap::Parser;
use gpsr::routing::{ProtocolConfig, Time};
use gpsr::simulator::Network;
use log::*;
use std::error::Error;

#[derive(Parser, Debug)]
#[clap(name = "gpsr_main", about = "Run a GPSR simulation on a static grid of nodes")]
struct Args {
    /// Number of nodes in the grid
    #[clap(short, long, default_value = "9")]
    nodes: usize,
    /// Number of nodes per grid row
    #[clap(long, default_value = "3")]
    grid_width: usize,
    /// Grid spacing in meters
    #[clap(long, default_value = "100.0")]
    spacing: f64,
    /// Radio range in meters
    #[clap(short, long, default_value = "150.0")]
    range: f64,
    /// Link delay in milliseconds
    #[clap(long, default_value = "1")]
    link_delay: u64,
    /// Total simulation time in seconds
    #[clap(short, long, default_value = "30.0")]
    time: f64,
    /// Hello interval in seconds (the entry lifetime is three times this value)
    #[clap(long, default_value = "1.0")]
    hello_interval: f64,
    /// Seconds between two data packets of a flow
    #[clap(long, default_value = "1.0")]
    packet_interval: f64,
    /// Payload size of generated packets in bytes
    #[clap(long, default_value = "1024")]
    packet_size: usize,
    /// Disable perimeter-mode recovery (greedy failures drop immediately)
    #[clap(long)]
    no_recovery: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    pretty_env_logger::init();
    let args = Args::parse();

    let hello_interval = Time::from_secs_f64(args.hello_interval);
    let config = ProtocolConfig {
        hello_interval,
        entry_lifetime: Time::from_secs_f64(3.0 * args.hello_interval),
        perimeter_mode: !args.no_recovery,
        ..ProtocolConfig::default()
    };

    let mut net = Network::new(config, args.range, Time::from_millis(args.link_delay))?;
    let ids = net.add_grid(args.nodes, args.spacing, args.grid_width);
    if ids.is_empty() {
        return Err("the grid needs at least one node".into());
    }
    net.start();

    let first = ids[0];
    let last = ids[ids.len() - 1];
    info!(
        "Grid of {} nodes, flows {} <-> {}, simulating {} seconds",
        args.nodes, first, last, args.time
    );

    // two constant-rate flows between the grid corners, starting after the first beacon
    // exchange and stopping one second before the end
    let mut t = 2.0;
    let mut sent = 0usize;
    while t < args.time - 1.0 {
        if net.send(first, last, vec![0xab; args.packet_size], Time::from_secs_f64(t)).is_some() {
            sent += 1;
        }
        if net
            .send(last, first, vec![0xcd; args.packet_size], Time::from_secs_f64(t + 0.1))
            .is_some()
        {
            sent += 1;
        }
        t += args.packet_interval;
    }

    net.run_until(Time::from_secs_f64(args.time));

    let delivered = net.delivered().len();
    let dropped = net.dropped().len();
    let total_hops: u32 = net.delivered().iter().map(|d| d.hops).sum();

    println!("sent:      {}", sent);
    println!("delivered: {}", delivered);
    println!("dropped:   {}", dropped);
    if delivered > 0 {
        println!("ratio:     {:.1}%", 100.0 * delivered as f64 / sent as f64);
        println!("avg hops:  {:.2}", total_hops as f64 / delivered as f64);
    }

    Ok(())
}
