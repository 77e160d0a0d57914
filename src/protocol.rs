//! Register bus wire protocol.
//!
//! The SoC exposes its AHB bus through a bridge that speaks a small binary
//! request/response protocol over a byte stream. All multi-byte fields are
//! big-endian.
//!
//! | request | bytes                                 | response            |
//! |---------|---------------------------------------|---------------------|
//! | write   | `'W'` (0x57), address (4), data (4)   | `'K'` (0x4B)        |
//! | read    | `'R'` (0x52), address (4)             | data (4)            |
//!
//! [`RequestCodec`] frames requests. The host uses it as an encoder and the
//! simulated SoC as a decoder.

use bytes::{Buf, BufMut, BytesMut};
use std::io;
use tokio_util::codec::{Decoder, Encoder};

/// Opcode of a write request.
pub const OPCODE_WRITE: u8 = b'W';
/// Opcode of a read request.
pub const OPCODE_READ: u8 = b'R';
/// Acknowledgment of a write request.
pub const ACK: u8 = b'K';

/// Length of a write request frame.
pub const WRITE_LEN: usize = 9;
/// Length of a read request frame.
pub const READ_LEN: usize = 5;
/// Length of a read response.
pub const READ_RESPONSE_LEN: usize = 4;

/// Bus request.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Request {
    /// Write `data` to `addr`.
    Write {
        /// Bus address.
        addr: u32,
        /// Data word.
        data: u32,
    },
    /// Read from `addr`.
    Read {
        /// Bus address.
        addr: u32,
    },
}

impl Request {
    /// Returns the bus address of the request.
    pub fn addr(&self) -> u32 {
        match self {
            Request::Write { addr, .. } | Request::Read { addr } => *addr,
        }
    }

    /// Returns the length of the response that the bridge sends.
    pub fn response_len(&self) -> usize {
        match self {
            Request::Write { .. } => 1,
            Request::Read { .. } => READ_RESPONSE_LEN,
        }
    }
}

/// Request framing codec.
#[derive(Debug, Default, Copy, Clone)]
pub struct RequestCodec;

impl Encoder<Request> for RequestCodec {
    type Error = io::Error;

    fn encode(&mut self, item: Request, dst: &mut BytesMut) -> Result<(), io::Error> {
        match item {
            Request::Write { addr, data } => {
                dst.reserve(WRITE_LEN);
                dst.put_u8(OPCODE_WRITE);
                dst.put_u32(addr);
                dst.put_u32(data);
            }
            Request::Read { addr } => {
                dst.reserve(READ_LEN);
                dst.put_u8(OPCODE_READ);
                dst.put_u32(addr);
            }
        }
        Ok(())
    }
}

impl Decoder for RequestCodec {
    type Item = Request;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Request>, io::Error> {
        loop {
            let Some(&opcode) = src.first() else {
                return Ok(None);
            };
            let len = match opcode {
                OPCODE_WRITE => WRITE_LEN,
                OPCODE_READ => READ_LEN,
                _ => {
                    // the bridge ignores bytes that do not start a request
                    tracing::warn!("discarding unknown opcode {opcode:#04x}");
                    src.advance(1);
                    continue;
                }
            };
            if src.len() < len {
                src.reserve(len - src.len());
                return Ok(None);
            }
            src.advance(1);
            let addr = src.get_u32();
            return Ok(Some(if opcode == OPCODE_WRITE {
                Request::Write {
                    addr,
                    data: src.get_u32(),
                }
            } else {
                Request::Read { addr }
            }));
        }
    }
}
