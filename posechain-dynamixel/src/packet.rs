//! Dynamixel Protocol 2.0 framing.
//!
//! ```text
//! FF FF FD 00 | ID | LEN_L LEN_H | INST | PARAM... | CRC_L CRC_H
//! ```
//!
//! `LEN` counts the instruction, the (stuffed) parameters and the CRC.

use std::io::{self, Read};

use posechain::{ChannelFault, CommFault};

pub const HEADER: [u8; 4] = [0xFF, 0xFF, 0xFD, 0x00];
pub const BROADCAST_ID: u8 = 0xFE;
/// Instruction byte of every status packet.
pub const STATUS: u8 = 0x55;

// Bytes of garbage tolerated before a status header.
const MAX_SYNC_BYTES: usize = 256;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    Ping = 0x01,
    Read = 0x02,
    Write = 0x03,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusPacket {
    pub id: u8,
    pub error: u8,
    pub params: Vec<u8>,
}

impl StatusPacket {
    /// Maps a non-zero error byte to a device fault.
    pub fn check_error(&self) -> Result<(), ChannelFault> {
        if self.error == 0 {
            Ok(())
        } else {
            Err(ChannelFault::Device {
                code: self.error,
                reason: describe_error(self.error),
            })
        }
    }
}

/// CRC-16 with polynomial 0x8005, initial value 0, no reflection.
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for &b in data {
        crc ^= u16::from(b) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x8005
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// Inserts `FD` after every `FF FF FD` so the payload never looks like a
/// header.
pub fn stuff(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 2);
    for &b in payload {
        out.push(b);
        if out.ends_with(&HEADER[..3]) {
            out.push(0xFD);
        }
    }
    out
}

/// Reverses [`stuff`].
pub fn unstuff(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len());
    let mut i = 0;
    while i < payload.len() {
        out.push(payload[i]);
        if out.ends_with(&HEADER[..3]) && payload.get(i + 1) == Some(&0xFD) {
            i += 1;
        }
        i += 1;
    }
    out
}

fn frame(id: u8, first: u8, params: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(params.len() + 1);
    body.push(first);
    body.extend_from_slice(params);
    let body = stuff(&body);
    let length = (body.len() + 2) as u16;

    let mut packet = Vec::with_capacity(HEADER.len() + 3 + body.len() + 2);
    packet.extend_from_slice(&HEADER);
    packet.push(id);
    packet.extend_from_slice(&length.to_le_bytes());
    packet.extend_from_slice(&body);
    let crc = crc16(&packet);
    packet.extend_from_slice(&crc.to_le_bytes());
    packet
}

pub fn encode_instruction(id: u8, instruction: Instruction, params: &[u8]) -> Vec<u8> {
    frame(id, instruction as u8, params)
}

pub fn encode_status(id: u8, error: u8, params: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(params.len() + 1);
    body.push(error);
    body.extend_from_slice(params);
    frame(id, STATUS, &body)
}

pub fn read_params(address: u16, length: u16) -> Vec<u8> {
    let mut params = address.to_le_bytes().to_vec();
    params.extend_from_slice(&length.to_le_bytes());
    params
}

pub fn write_params(address: u16, data: &[u8]) -> Vec<u8> {
    let mut params = address.to_le_bytes().to_vec();
    params.extend_from_slice(data);
    params
}

/// Reads one status packet, skipping any bytes before its header.
pub fn read_status<R>(reader: &mut R) -> Result<StatusPacket, CommFault>
where
    R: Read + ?Sized,
{
    let mut packet = Vec::with_capacity(16);
    let mut skipped = 0;
    let mut byte = [0u8; 1];
    while !packet.ends_with(&HEADER) {
        read_exact(reader, &mut byte)?;
        packet.push(byte[0]);
        if packet.len() > HEADER.len() {
            packet.remove(0);
            skipped += 1;
            if skipped > MAX_SYNC_BYTES {
                return Err(CommFault::RxCorrupt("no header found".into()));
            }
        }
    }

    let mut head = [0u8; 3];
    read_exact(reader, &mut head)?;
    packet.extend_from_slice(&head);
    let id = head[0];
    let length = usize::from(u16::from_le_bytes([head[1], head[2]]));
    // instruction + error + crc
    if length < 4 {
        return Err(CommFault::RxCorrupt(format!("length {length} too short")));
    }

    let mut rest = vec![0u8; length];
    read_exact(reader, &mut rest)?;
    packet.extend_from_slice(&rest);

    let (data, crc) = packet.split_at(packet.len() - 2);
    let expected = crc16(data);
    let actual = u16::from_le_bytes([crc[0], crc[1]]);
    if expected != actual {
        return Err(CommFault::RxCorrupt(format!(
            "crc mismatch: expected 0x{expected:04X}, got 0x{actual:04X}"
        )));
    }

    let body = unstuff(&rest[..length - 2]);
    if body[0] != STATUS {
        return Err(CommFault::RxCorrupt(format!(
            "instruction 0x{:02X} is not a status",
            body[0]
        )));
    }
    Ok(StatusPacket {
        id,
        error: body[1],
        params: body[2..].to_vec(),
    })
}

fn read_exact<R>(reader: &mut R, buf: &mut [u8]) -> Result<(), CommFault>
where
    R: Read + ?Sized,
{
    reader.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::UnexpectedEof => {
            CommFault::RxTimeout
        }
        _ => CommFault::RxCorrupt(e.to_string()),
    })
}

/// Human readable form of a status error byte.
pub fn describe_error(error: u8) -> String {
    let reason = match error & 0x7F {
        0 => None,
        1 => Some("result fail: failed to process the instruction packet"),
        2 => Some("instruction error: undefined instruction or action without reg write"),
        3 => Some("CRC error: CRC of the instruction packet does not match"),
        4 => Some("data range error: data to be written is out of range"),
        5 => Some("data length error: data is shorter than the required length"),
        6 => Some("data limit error: data exceeds the limit value"),
        7 => Some("access error: wrong address or read/write only register"),
        _ => Some("unknown error"),
    };
    let alert = error & 0x80 != 0;
    match (reason, alert) {
        (Some(reason), true) => format!("{reason}; hardware error status is set"),
        (Some(reason), false) => reason.to_owned(),
        (None, _) => "hardware error occurred, check hardware error status".to_owned(),
    }
}
