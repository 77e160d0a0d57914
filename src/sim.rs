//! Simulated SoC.
//!
//! This module contains a software model of the SoC as seen through its bus
//! bridge. It serves the register bus protocol over an in-memory stream, so
//! that the bench can be exercised without hardware. The filter chain slave is
//! backed by its own [`FilterChainModel`], and a few hardware defects can be
//! injected to check that the bench detects them.

use crate::protocol::{Request, RequestCodec, ACK};
use crate::regmap::{aes, filter, sys, AddressMap};
use anyhow::Result;
use futures::StreamExt;
use rxchain_model::fixed::mask;
use rxchain_model::{ChainConfig, FilterChainModel, StageOutputs};
use std::collections::{HashMap, HashSet, VecDeque};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, DuplexStream};
use tokio_util::codec::FramedRead;

/// Size of the address window decoded for each slave.
pub const SLAVE_WINDOW: u32 = 0x1000_0000;
/// Depth of the filter input and output FIFOs.
pub const FIFO_DEPTH: usize = 16;

const DUPLEX_BUFFER: usize = 4096;

/// Simulated hardware defect.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum SimDefect {
    /// The filter output register is not driven and always reads zero.
    UndrivenOutput,
    /// The filter chain is bypassed regardless of the control register.
    Bypass,
    /// Reads of the filter data register are never answered.
    SilentOutput,
}

impl std::str::FromStr for SimDefect {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<SimDefect> {
        Ok(match s {
            "undriven_output" => SimDefect::UndrivenOutput,
            "bypass" => SimDefect::Bypass,
            "silent_output" => SimDefect::SilentOutput,
            _ => anyhow::bail!("unknown defect {s}"),
        })
    }
}

impl std::fmt::Display for SimDefect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        f.write_str(match self {
            SimDefect::UndrivenOutput => "undriven_output",
            SimDefect::Bypass => "bypass",
            SimDefect::SilentOutput => "silent_output",
        })
    }
}

/// Simulated SoC options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimOptions {
    /// Address map decoded by the simulated bus.
    pub map: AddressMap,
    /// Configuration of the filter chain model.
    pub chain: ChainConfig,
    /// Filter output register is not driven.
    pub undriven_output: bool,
    /// Filter chain is stuck in bypass.
    pub stuck_bypass: bool,
    /// Addresses whose reads are never answered.
    pub silent_reads: HashSet<u32>,
}

impl SimOptions {
    /// Injects a defect.
    pub fn with_defect(mut self, defect: SimDefect) -> SimOptions {
        match defect {
            SimDefect::UndrivenOutput => self.undriven_output = true,
            SimDefect::Bypass => self.stuck_bypass = true,
            SimDefect::SilentOutput => {
                self.silent_reads.insert(self.map.filter + filter::DATA);
            }
        }
        self
    }
}

/// Simulated SoC.
#[derive(Debug)]
pub struct SimulatedSoc {
    map: AddressMap,
    silent_reads: HashSet<u32>,
    ram: HashMap<u32, u32>,
    filter: SimFilter,
    aes: SimAes,
    clock_gating: u32,
}

#[derive(Debug)]
struct SimFilter {
    model: FilterChainModel,
    control: u32,
    input: VecDeque<u32>,
    output: VecDeque<u32>,
    taps: StageOutputs<u32>,
    undriven_output: bool,
    stuck_bypass: bool,
}

// XOR cipher: the FPGA core only models the AES register interface.
#[derive(Debug, Default)]
struct SimAes {
    key: [u32; 4],
    input: [u32; 4],
    output: [u32; 4],
}

impl SimulatedSoc {
    /// Creates a simulated SoC in its reset state.
    pub fn new(options: SimOptions) -> SimulatedSoc {
        SimulatedSoc {
            map: options.map,
            silent_reads: options.silent_reads,
            ram: HashMap::new(),
            filter: SimFilter::new(
                options.chain,
                options.undriven_output,
                options.stuck_bypass,
            ),
            aes: SimAes::default(),
            clock_gating: 0,
        }
    }

    /// Returns the value of the clock gating register.
    pub fn clock_gating(&self) -> u32 {
        self.clock_gating
    }

    /// Executes a bus request.
    ///
    /// Returns the bytes that the bridge sends back, or `None` if the request
    /// is not answered.
    pub fn handle(&mut self, request: Request) -> Option<Vec<u8>> {
        if let Request::Read { addr } = request {
            if self.silent_reads.contains(&addr) {
                tracing::debug!("not answering read from {addr:#010x}");
                return None;
            }
        }
        Some(match request {
            Request::Write { addr, data } => {
                self.write(addr, data);
                vec![ACK]
            }
            Request::Read { addr } => self.read(addr).to_be_bytes().to_vec(),
        })
    }

    // Returns the slave decoded for an address and the offset inside it.
    fn decode(&self, addr: u32) -> Option<(Slave, u32)> {
        let slaves = [
            (Slave::Ram, self.map.ram1),
            (Slave::Ram, self.map.ram2),
            (Slave::Filter, self.map.filter),
            (Slave::Aes, self.map.aes),
            (Slave::Sys, self.map.sys),
        ];
        slaves.into_iter().find_map(|(slave, base)| {
            addr.checked_sub(base)
                .filter(|&offset| offset < SLAVE_WINDOW)
                .map(|offset| (slave, offset))
        })
    }

    fn write(&mut self, addr: u32, data: u32) {
        match self.decode(addr) {
            Some((Slave::Ram, _)) => {
                self.ram.insert(addr, data);
            }
            Some((Slave::Filter, offset)) => self.filter.write(offset, data),
            Some((Slave::Aes, offset)) => self.aes.write(offset, data),
            Some((Slave::Sys, sys::CLOCK_GATING)) => self.clock_gating = data & 1,
            _ => tracing::debug!("write to unmapped address {addr:#010x}"),
        }
    }

    fn read(&mut self, addr: u32) -> u32 {
        match self.decode(addr) {
            Some((Slave::Ram, _)) => self.ram.get(&addr).copied().unwrap_or(0),
            Some((Slave::Filter, offset)) => self.filter.read(offset),
            Some((Slave::Aes, offset)) => self.aes.read(offset),
            Some((Slave::Sys, sys::CLOCK_GATING)) => self.clock_gating,
            _ => {
                tracing::debug!("read from unmapped address {addr:#010x}");
                0
            }
        }
    }

    /// Serves the bus protocol over a byte stream.
    ///
    /// Returns when the host closes the stream.
    pub async fn serve<S: AsyncRead + AsyncWrite>(mut self, stream: S) -> Result<()> {
        let (reader, mut writer) = tokio::io::split(stream);
        let mut requests = FramedRead::new(reader, RequestCodec);
        while let Some(request) = requests.next().await {
            let request = request?;
            tracing::trace!("simulated SoC received {request:?}");
            if let Some(response) = self.handle(request) {
                writer.write_all(&response).await?;
            }
        }
        tracing::debug!("simulated SoC link closed");
        Ok(())
    }
}

/// Spawns a simulated SoC in a Tokio task.
///
/// Returns the host end of the stream connected to the simulated bus bridge.
pub fn spawn(options: SimOptions) -> DuplexStream {
    let (host, device) = tokio::io::duplex(DUPLEX_BUFFER);
    let soc = SimulatedSoc::new(options);
    tokio::spawn(async move {
        if let Err(err) = soc.serve(device).await {
            tracing::error!("simulated SoC failed: {err:#}");
        }
    });
    host
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Slave {
    Ram,
    Filter,
    Aes,
    Sys,
}

impl SimFilter {
    fn new(chain: ChainConfig, undriven_output: bool, stuck_bypass: bool) -> SimFilter {
        SimFilter {
            model: FilterChainModel::new(chain),
            control: filter::CONTROL_ENABLE,
            input: VecDeque::with_capacity(FIFO_DEPTH),
            output: VecDeque::with_capacity(FIFO_DEPTH),
            taps: StageOutputs::default(),
            undriven_output,
            stuck_bypass,
        }
    }

    fn enabled(&self) -> bool {
        self.control & filter::CONTROL_ENABLE != 0
    }

    fn bypassed(&self) -> bool {
        self.stuck_bypass || self.control & filter::CONTROL_BYPASS != 0
    }

    fn write(&mut self, offset: u32, data: u32) {
        match offset {
            filter::DATA => {
                if self.input.len() == FIFO_DEPTH {
                    tracing::warn!("filter input FIFO overflow, sample {data:#x} dropped");
                } else {
                    self.input
                        .push_back(data & mask(self.model.config().sample_bits));
                    self.process();
                }
            }
            filter::CONTROL => {
                self.control = data & (filter::CONTROL_ENABLE | filter::CONTROL_BYPASS);
                if !self.enabled() {
                    // disabled chain is held in reset
                    self.model.reset();
                    self.input.clear();
                    self.output.clear();
                    self.taps = StageOutputs::default();
                }
                self.process();
            }
            _ => tracing::debug!("write to read-only filter offset {offset:#x}"),
        }
    }

    fn read(&mut self, offset: u32) -> u32 {
        match offset {
            filter::DATA => {
                let value = self.output.pop_front().unwrap_or(0);
                if self.undriven_output {
                    0
                } else {
                    value
                }
            }
            filter::CONTROL => self.control,
            filter::STATUS => {
                ((self.input.len() as u32) << filter::STATUS_IN_COUNT_SHIFT)
                    | ((self.output.len() as u32) << filter::STATUS_OUT_COUNT_SHIFT)
            }
            filter::CTLE_OUT => self.taps.ctle,
            filter::DC_OFFSET_OUT => self.taps.dc_offset,
            filter::FIR_EQ_OUT => self.taps.fir_eq,
            filter::DFE_OUT => self.taps.dfe,
            filter::GLITCH_OUT => self.taps.glitch,
            filter::LPF_OUT => self.taps.lpf,
            _ => 0,
        }
    }

    // Moves samples from the input FIFO through the chain while there is room
    // in the output FIFO. Each sample is held until the chain settles.
    fn process(&mut self) {
        if !self.enabled() {
            return;
        }
        while self.output.len() < FIFO_DEPTH {
            let Some(sample) = self.input.pop_front() else {
                break;
            };
            let output = if self.bypassed() {
                sample
            } else {
                self.taps = self.model.settle_traced(sample);
                self.taps.fec
            };
            self.output.push_back(output);
        }
    }
}

impl SimAes {
    fn write(&mut self, offset: u32, data: u32) {
        if let Some(n) = block_word(aes::KEY, offset) {
            self.key[n] = data;
        } else if let Some(n) = block_word(aes::PLAINTEXT, offset) {
            self.input[n] = data;
        } else if offset == aes::CONTROL && data & aes::CONTROL_START != 0 {
            for ((out, input), key) in self.output.iter_mut().zip(self.input).zip(self.key) {
                *out = input ^ key;
            }
        }
    }

    fn read(&self, offset: u32) -> u32 {
        block_word(aes::CIPHERTEXT, offset).map_or(0, |n| self.output[n])
    }
}

// Index of the word of the block starting at `base` that `offset` falls in.
fn block_word(base: u32, offset: u32) -> Option<usize> {
    let n = offset.checked_sub(base)? as usize / 4;
    (n < aes::BLOCK_WORDS).then_some(n)
}
