//! AHB register bus transport.
//!
//! This module contains [`AhbBus`], which performs register reads and writes
//! on the SoC bus by exchanging [`Request`]s and their responses with the bus
//! bridge over a byte stream.

use crate::protocol::{Request, RequestCodec, ACK};
use anyhow::{Context, Result};
use bytes::BytesMut;
use futures::FutureExt;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::Instant;
use tokio_util::codec::Encoder;

/// Byte stream connecting the host to the bus bridge.
///
/// This is implemented by every bidirectional async stream, and it exists so
/// that the bench can hold any kind of link as a `Box<dyn Link>`.
pub trait Link: AsyncRead + AsyncWrite + Unpin + Send + std::fmt::Debug {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send + std::fmt::Debug> Link for T {}

/// Transaction counters of an [`AhbBus`].
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash)]
pub struct BusStats {
    /// Successful writes.
    pub writes: u64,
    /// Successful reads.
    pub reads: u64,
    /// Transactions that failed.
    pub errors: u64,
}

/// AHB register bus.
///
/// Each transaction sends one request and waits for its response for at most
/// the response timeout. A wrong acknowledgment, a short or missing response,
/// or a closed link make the transaction fail. Failed transactions are not
/// retried.
#[derive(Debug)]
pub struct AhbBus<S> {
    stream: S,
    timeout: Duration,
    buffer: BytesMut,
    stats: BusStats,
    // set after a failed transaction, since a late response may still arrive
    stale: bool,
}

impl<S: AsyncRead + AsyncWrite + Unpin> AhbBus<S> {
    /// Creates a bus over a byte stream.
    pub fn new(stream: S, timeout: Duration) -> AhbBus<S> {
        AhbBus {
            stream,
            timeout,
            buffer: BytesMut::with_capacity(16),
            stats: BusStats::default(),
            stale: false,
        }
    }

    /// Returns the transaction counters.
    pub fn stats(&self) -> BusStats {
        self.stats
    }

    /// Writes a word to a bus address.
    pub async fn write(&mut self, addr: u32, data: u32) -> Result<()> {
        let mut ack = [0; 1];
        self.transact(Request::Write { addr, data }, &mut ack).await?;
        if ack[0] != ACK {
            // whatever the device sent instead may still be in flight
            self.stats.errors += 1;
            self.stale = true;
            anyhow::bail!(
                "write to {addr:#010x}: expected ack {ACK:#04x}, got {:#04x}",
                ack[0]
            );
        }
        self.stats.writes += 1;
        tracing::trace!("write {addr:#010x} <- {data:#010x}");
        Ok(())
    }

    /// Reads a word from a bus address.
    pub async fn read(&mut self, addr: u32) -> Result<u32> {
        let mut data = [0; 4];
        self.transact(Request::Read { addr }, &mut data).await?;
        let data = u32::from_be_bytes(data);
        self.stats.reads += 1;
        tracing::trace!("read {addr:#010x} -> {data:#010x}");
        Ok(data)
    }

    async fn transact(&mut self, request: Request, response: &mut [u8]) -> Result<()> {
        let result = self.try_transact(request, response).await;
        if result.is_err() {
            self.stats.errors += 1;
            self.stale = true;
        }
        result
    }

    async fn try_transact(&mut self, request: Request, response: &mut [u8]) -> Result<()> {
        if self.stale {
            self.discard_pending();
        }
        self.buffer.clear();
        RequestCodec.encode(request, &mut self.buffer)?;
        self.stream
            .write_all(&self.buffer)
            .await
            .context("failed to send request")?;
        self.stream
            .flush()
            .await
            .context("failed to send request")?;

        let addr = request.addr();
        let deadline = Instant::now() + self.timeout;
        let mut filled = 0;
        while filled < response.len() {
            match tokio::time::timeout_at(deadline, self.stream.read(&mut response[filled..]))
                .await
            {
                Ok(Ok(0)) => anyhow::bail!("link closed while waiting for {addr:#010x}"),
                Ok(Ok(n)) => filled += n,
                Ok(Err(err)) => {
                    return Err(err)
                        .with_context(|| format!("failed to receive response for {addr:#010x}"))
                }
                Err(_) if filled == 0 => anyhow::bail!(
                    "no response for {addr:#010x} after {} ms",
                    self.timeout.as_millis()
                ),
                Err(_) => anyhow::bail!(
                    "short response for {addr:#010x}: got {filled} of {} bytes",
                    response.len()
                ),
            }
        }
        Ok(())
    }

    // Drops any bytes that are already waiting in the stream.
    fn discard_pending(&mut self) {
        let mut scratch = [0; 64];
        let mut discarded = 0;
        while let Some(Ok(n)) = self.stream.read(&mut scratch).now_or_never() {
            if n == 0 {
                break;
            }
            discarded += n;
        }
        if discarded > 0 {
            tracing::debug!("discarded {discarded} stale bytes");
        }
        self.stale = false;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tokio::io::{duplex, DuplexStream};

    const TIMEOUT: Duration = Duration::from_millis(100);

    fn bus() -> (AhbBus<DuplexStream>, DuplexStream) {
        let (host, device) = duplex(64);
        (AhbBus::new(host, TIMEOUT), device)
    }

    #[tokio::test]
    async fn write_acked() {
        let (mut bus, mut device) = bus();
        let responder = tokio::spawn(async move {
            let mut request = [0; 9];
            device.read_exact(&mut request).await.unwrap();
            device.write_all(b"K").await.unwrap();
            request
        });
        bus.write(0x1000_0000, 0xcafe_babe).await.unwrap();
        assert_eq!(
            &responder.await.unwrap(),
            b"W\x10\x00\x00\x00\xca\xfe\xba\xbe"
        );
        assert_eq!(
            bus.stats(),
            BusStats {
                writes: 1,
                reads: 0,
                errors: 0
            }
        );
    }

    #[tokio::test]
    async fn read_big_endian() {
        let (mut bus, mut device) = bus();
        tokio::spawn(async move {
            let mut request = [0; 5];
            device.read_exact(&mut request).await.unwrap();
            assert_eq!(request, [b'R', 0x40, 0, 0, 0x2c]);
            // deliver the response in two pieces
            device.write_all(&[0x00, 0x00]).await.unwrap();
            device.write_all(&[0x0f, 0xd2]).await.unwrap();
            device
        });
        assert_eq!(bus.read(0x4000_002c).await.unwrap(), 0xfd2);
        assert_eq!(bus.stats().reads, 1);
    }

    #[tokio::test]
    async fn wrong_ack() {
        let (mut bus, mut device) = bus();
        tokio::spawn(async move {
            let mut request = [0; 9];
            device.read_exact(&mut request).await.unwrap();
            device.write_all(b"N").await.unwrap();
            device
        });
        let err = bus.write(0, 1).await.unwrap_err();
        assert!(err.to_string().contains("expected ack"));
        assert_eq!(bus.stats().errors, 1);
        assert_eq!(bus.stats().writes, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout() {
        let (mut bus, mut device) = bus();
        let silent = tokio::spawn(async move {
            let mut request = [0; 5];
            device.read_exact(&mut request).await.unwrap();
            device
        });
        let err = bus.read(0x5000_0030).await.unwrap_err();
        assert!(err.to_string().contains("no response"));
        assert_eq!(bus.stats().errors, 1);
        drop(silent);
    }

    #[tokio::test(start_paused = true)]
    async fn short_response() {
        let (mut bus, mut device) = bus();
        let _device = tokio::spawn(async move {
            let mut request = [0; 5];
            device.read_exact(&mut request).await.unwrap();
            device.write_all(&[0x12, 0x34]).await.unwrap();
            device
        });
        let err = bus.read(0).await.unwrap_err();
        assert!(err.to_string().contains("short response"));
    }

    #[tokio::test]
    async fn closed_link() {
        let (mut bus, device) = bus();
        drop(device);
        assert!(bus.read(0).await.is_err());
        assert_eq!(bus.stats().errors, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn late_response_is_discarded() {
        let (mut bus, mut device) = bus();
        let (late_tx, late_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            let mut request = [0; 5];
            device.read_exact(&mut request).await.unwrap();
            // answer only after the host has given up
            late_rx.await.unwrap();
            device.write_all(&[0xde, 0xad, 0xbe, 0xef]).await.unwrap();
            device.read_exact(&mut request).await.unwrap();
            device.write_all(&[0, 0, 0, 7]).await.unwrap();
            device
        });
        assert!(bus.read(0).await.is_err());
        late_tx.send(()).unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(bus.read(4).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn bytes_after_wrong_ack_are_discarded() {
        let (mut bus, mut device) = bus();
        tokio::spawn(async move {
            let mut request = [0; 9];
            device.read_exact(&mut request).await.unwrap();
            device
                .write_all(&[0xde, 0xad, 0xbe, 0xef, ACK])
                .await
                .unwrap();
            let mut request = [0; 5];
            device.read_exact(&mut request).await.unwrap();
            assert_eq!(request, [b'R', 0, 0, 0, 4]);
            device.write_all(&[0, 0, 0, 7]).await.unwrap();
            device
        });
        assert!(bus.write(0, 1).await.is_err());
        assert_eq!(bus.read(4).await.unwrap(), 7);
        assert_eq!(
            bus.stats(),
            BusStats {
                writes: 0,
                reads: 1,
                errors: 1
            }
        );
    }
}
