//! Fixed-point PDM to PCM decimation.
//!
//! A 1-bit pulse density stream is decimated through a CIC, half-band and FIR chain into
//! signed PCM samples, which wait in a bounded output queue for the consumer. Everything is
//! driven one clock at a time through [`pipeline::Pipeline::tick`].

pub mod buffer;
pub mod cic;
pub mod coefficients;
pub mod config;
pub mod error;
pub mod fir;
pub mod generation;
pub mod halfband;
pub mod pdm_processing;
pub mod pipeline;

pub use buffer::{OutputQueue, QueueStatus};
pub use coefficients::FirCoefficients;
pub use config::{BackpressurePolicy, ChainKind, DecimatorConfig, StageWidths};
pub use error::{ConfigError, Result};
pub use pdm_processing::PdmProcessor;
pub use pipeline::{Pipeline, State, TickInput, TickOutput};

/// Simple ones-counting decimator. Sums `decimation` bits into one value, the single-stage
/// stand-in for the full filter chain.
#[derive(Clone, Copy, Debug)]
pub struct BoxcarDecimator {
    accum: i64,
    pos: u32,
    decimation: u32,
}

impl BoxcarDecimator {
    pub const fn new(decimation: u32) -> Self {
        Self { accum: 0, pos: 0, decimation }
    }

    /// Count one bit. Returns true when the frame is complete and `take` is due.
    pub fn integrate(&mut self, bit: bool) -> bool {
        self.accum += bit as i64;
        self.pos += 1;
        if self.pos == self.decimation {
            self.pos = 0;
            true
        } else {
            false
        }
    }

    /// Return the finished frame and start a new one
    pub fn take(&mut self) -> i64 {
        core::mem::take(&mut self.accum)
    }

    pub fn process_bit<F>(&mut self, bit: bool, mut output: F)
    where
        F: FnMut(i64),
    {
        if self.integrate(bit) {
            output(self.take());
        }
    }

    pub fn reset(&mut self) {
        self.accum = 0;
        self.pos = 0;
    }
}

/// Bit order of packed PDM bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BitOrder {
    /// Bit 0 is the earliest sample
    #[default]
    LsbFirst,
    MsbFirst,
}

/// Iterate the bits of a packed single-channel PDM buffer in time order
pub fn unpack_bits(pdm: &[u8], order: BitOrder) -> impl Iterator<Item = bool> + '_ {
    pdm.iter().flat_map(move |&word| {
        (0..8).map(move |bit| {
            let shift = match order {
                BitOrder::LsbFirst => bit,
                BitOrder::MsbFirst => 7 - bit,
            };
            (word & (1 << shift)) != 0
        })
    })
}
