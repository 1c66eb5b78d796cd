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

//! # Wire formats
//!
//! On-wire headers of the protocol, and the [`Packet`] buffer they are attached to. Two headers
//! compose with a leading one-byte [`TypeHeader`]:
//!
//! - `type = 0`: [`HelloHeader`] (16 bytes), the periodic position beacon,
//! - `type = 1`: [`PositionHeader`] (53 bytes), the per-packet routing state annotation.
//!
//! All doubles are encoded as little-endian IEEE-754; the `updated` counter is big-endian
//! (network byte order). Deserialization never fails on an unknown type byte; it consumes the
//! byte and reports `valid == false`, so that receivers can drop the datagram as background
//! noise without invoking any error path.

use std::convert::TryInto;

/// Serialization contract shared by all wire headers.
pub trait WireHeader: Sized {
    /// Number of bytes `serialize` appends.
    fn serialized_size(&self) -> usize;

    /// Append the on-wire encoding to `buf`.
    fn serialize(&self, buf: &mut Vec<u8>);

    /// Decode a header from the front of `bytes`. Returns the header and the number of bytes
    /// consumed, or `None` if the buffer is too short.
    fn deserialize(bytes: &[u8]) -> Option<(Self, usize)>;
}

/// Discriminator for control messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    /// Periodic one-hop position beacon.
    Hello,
    /// Position annotation prepended to data packets.
    Position,
}

/// The one-byte type header leading every control message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeHeader {
    kind: MessageType,
    valid: bool,
}

impl TypeHeader {
    /// Create a valid type header of the given kind.
    pub fn new(kind: MessageType) -> Self {
        Self { kind, valid: true }
    }

    /// The message type. Only meaningful when [`TypeHeader::is_valid`] returns true.
    pub fn kind(&self) -> MessageType {
        self.kind
    }

    /// False if the decoded type byte was outside the known set.
    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

impl WireHeader for TypeHeader {
    fn serialized_size(&self) -> usize {
        1
    }

    fn serialize(&self, buf: &mut Vec<u8>) {
        buf.push(match self.kind {
            MessageType::Hello => 0,
            MessageType::Position => 1,
        });
    }

    fn deserialize(bytes: &[u8]) -> Option<(Self, usize)> {
        let byte = *bytes.first()?;
        let header = match byte {
            0 => Self { kind: MessageType::Hello, valid: true },
            1 => Self { kind: MessageType::Position, valid: true },
            _ => Self { kind: MessageType::Hello, valid: false },
        };
        Some((header, 1))
    }
}

/// The hello beacon payload: the emitter's position as two little-endian doubles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HelloHeader {
    /// x coordinate of the emitter
    pub position_x: f64,
    /// y coordinate of the emitter
    pub position_y: f64,
}

impl HelloHeader {
    /// Exact on-wire size in bytes.
    pub const SIZE: usize = 16;

    /// Create a new hello header.
    pub fn new(position_x: f64, position_y: f64) -> Self {
        Self { position_x, position_y }
    }
}

impl WireHeader for HelloHeader {
    fn serialized_size(&self) -> usize {
        Self::SIZE
    }

    fn serialize(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.position_x.to_le_bytes());
        buf.extend_from_slice(&self.position_y.to_le_bytes());
    }

    fn deserialize(bytes: &[u8]) -> Option<(Self, usize)> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        let position_x = f64::from_le_bytes(bytes[0..8].try_into().ok()?);
        let position_y = f64::from_le_bytes(bytes[8..16].try_into().ok()?);
        Some((Self { position_x, position_y }, Self::SIZE))
    }
}

/// The per-packet routing state annotation: destination coordinates, the recovery point, the
/// previous perimeter hop, an opaque `updated` counter and the recovery flag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionHeader {
    /// x coordinate of the destination
    pub dst_x: f64,
    /// y coordinate of the destination
    pub dst_y: f64,
    /// x coordinate of the position where recovery was entered
    pub rec_x: f64,
    /// y coordinate of the position where recovery was entered
    pub rec_y: f64,
    /// x coordinate of the previous hop on the perimeter walk
    pub prev_x: f64,
    /// y coordinate of the previous hop on the perimeter walk
    pub prev_y: f64,
    /// opaque monotonic counter, reserved for staleness checks
    pub updated: u32,
    /// true while the packet traverses a perimeter
    pub recovery_flag: bool,
}

impl PositionHeader {
    /// Exact on-wire size in bytes: six doubles, one u32, one flag byte.
    pub const SIZE: usize = 53;
}

impl WireHeader for PositionHeader {
    fn serialized_size(&self) -> usize {
        Self::SIZE
    }

    fn serialize(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.dst_x.to_le_bytes());
        buf.extend_from_slice(&self.dst_y.to_le_bytes());
        buf.extend_from_slice(&self.rec_x.to_le_bytes());
        buf.extend_from_slice(&self.rec_y.to_le_bytes());
        buf.extend_from_slice(&self.prev_x.to_le_bytes());
        buf.extend_from_slice(&self.prev_y.to_le_bytes());
        buf.extend_from_slice(&self.updated.to_be_bytes());
        buf.push(self.recovery_flag as u8);
    }

    fn deserialize(bytes: &[u8]) -> Option<(Self, usize)> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        let mut doubles = [0.0f64; 6];
        for (i, d) in doubles.iter_mut().enumerate() {
            *d = f64::from_le_bytes(bytes[i * 8..i * 8 + 8].try_into().ok()?);
        }
        let updated = u32::from_be_bytes(bytes[48..52].try_into().ok()?);
        let recovery_flag = bytes[52] != 0;
        Some((
            Self {
                dst_x: doubles[0],
                dst_y: doubles[1],
                rec_x: doubles[2],
                rec_y: doubles[3],
                prev_x: doubles[4],
                prev_y: doubles[5],
                updated,
                recovery_flag,
            },
            Self::SIZE,
        ))
    }
}

/// A data packet as the router sees it: a unique id, the raw bytes (with an optional leading
/// position annotation), and two out-of-band markers.
///
/// The deferral tag is the equivalent of a packet tag in a full network stack: it marks a packet
/// that was sent to the loopback device so that the router recognizes its own retry. The
/// annotation marker records whether a position annotation is present, the way typed headers do
/// in a full stack; without it, a payload whose first byte happens to equal the position type
/// byte would be misread as an annotation. Neither marker is ever serialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    uid: u64,
    deferred: bool,
    annotated: bool,
    buf: Vec<u8>,
}

impl Packet {
    /// Create a packet with the given payload.
    pub fn new(uid: u64, payload: Vec<u8>) -> Self {
        Self { uid, deferred: false, annotated: false, buf: payload }
    }

    /// The stack-assigned unique id of this packet.
    pub fn uid(&self) -> u64 {
        self.uid
    }

    /// The raw packet bytes, including any position annotation.
    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Total length in bytes.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns true if the packet carries no bytes.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Returns true if the self-deferral tag is set.
    pub fn is_deferred(&self) -> bool {
        self.deferred
    }

    /// Set the self-deferral tag.
    pub fn mark_deferred(&mut self) {
        self.deferred = true;
    }

    /// Clear the self-deferral tag.
    pub fn clear_deferred(&mut self) {
        self.deferred = false;
    }

    /// Prepend a position annotation (`[TypeHeader(Position) | PositionHeader]`) to the packet.
    pub fn add_position_header(&mut self, header: &PositionHeader) {
        let mut front = Vec::with_capacity(1 + PositionHeader::SIZE + self.buf.len());
        TypeHeader::new(MessageType::Position).serialize(&mut front);
        header.serialize(&mut front);
        front.extend_from_slice(&self.buf);
        self.buf = front;
        self.annotated = true;
    }

    /// Decode the position annotation without removing it, if the packet carries one. The payload
    /// of an unannotated packet is never inspected.
    pub fn peek_position_header(&self) -> Option<PositionHeader> {
        if !self.annotated {
            return None;
        }
        let (type_header, consumed) = TypeHeader::deserialize(&self.buf)?;
        if !type_header.is_valid() || type_header.kind() != MessageType::Position {
            return None;
        }
        PositionHeader::deserialize(&self.buf[consumed..]).map(|(h, _)| h)
    }

    /// Remove and return the position annotation, if the packet carries one.
    pub fn remove_position_header(&mut self) -> Option<PositionHeader> {
        let header = self.peek_position_header()?;
        self.buf.drain(..1 + PositionHeader::SIZE);
        self.annotated = false;
        Some(header)
    }
}
