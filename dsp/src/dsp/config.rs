use crate::buffer::MAX_FIFO_DEPTH;
use crate::error::{ConfigError, Result};

pub const MIN_DATA_WIDTH: u32 = 8;
pub const MAX_DATA_WIDTH: u32 = 32;
pub const MIN_DECIMATION_RATIO: u32 = 2;
pub const MAX_DECIMATION_RATIO: u32 = 48;
pub const MIN_FIFO_DEPTH: usize = 4;
pub const MAX_CIC_STAGES: u32 = 8;
pub const MAX_FIR_TAPS: usize = 256;

/// Guard bits carried by the half-band delay line on top of the CIC register width
pub const HALFBAND_GUARD_BITS: u32 = 2;
/// Guard bits carried by the FIR delay line on top of the half-band width
pub const FIR_GUARD_BITS: u32 = 8;

/// Which filter chain sits between the bit input and the output queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize), serde(rename_all = "snake_case"))]
pub enum ChainKind {
    /// CIC, half-band and FIR stages
    #[default]
    Full,
    /// A single ones-counting decimator over the whole decimation ratio
    Boxcar,
}

/// What the input handshake does when the output queue is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize), serde(rename_all = "snake_case"))]
pub enum BackpressurePolicy {
    /// Deassert input-ready while the queue is full. Nothing is ever dropped.
    #[default]
    Stall,
    /// Keep accepting bits (a free-running microphone cannot be paused). Samples finished while
    /// the queue is full are dropped and flagged as overflow.
    Drop,
}

/// Construction-time parameters of the decimation pipeline. The default is the reference
/// configuration: 16-bit output, decimation by 16 (CIC 8 x half-band 2), 4 CIC stages,
/// 64 FIR taps and a 16-entry output queue.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize), serde(default))]
pub struct DecimatorConfig {
    pub data_width: u32,
    pub decimation_ratio: u32,
    pub cic_stages: u32,
    pub cic_decimation: u32,
    pub halfband_decimation: u32,
    pub fir_taps: usize,
    pub fifo_depth: usize,
    pub chain: ChainKind,
    pub backpressure: BackpressurePolicy,
}

impl Default for DecimatorConfig {
    fn default() -> Self {
        Self {
            data_width: 16,
            decimation_ratio: 16,
            cic_stages: 4,
            cic_decimation: 8,
            halfband_decimation: 2,
            fir_taps: 64,
            fifo_depth: 16,
            chain: ChainKind::Full,
            backpressure: BackpressurePolicy::Stall,
        }
    }
}

/// Register widths derived from a validated configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageWidths {
    /// CIC integrator and comb registers; integrators wrap at this width
    pub cic: u32,
    /// Half-band delay line
    pub halfband: u32,
    /// FIR delay line
    pub fir: u32,
    /// Magnitude bits of the normalized filter output at full scale. PCM centering shifts by
    /// `magnitude - data_width`.
    pub magnitude: u32,
}

impl DecimatorConfig {
    pub fn with_data_width(mut self, data_width: u32) -> Self {
        self.data_width = data_width;
        self
    }

    pub fn with_decimation(mut self, cic_decimation: u32, halfband_decimation: u32) -> Self {
        self.cic_decimation = cic_decimation;
        self.halfband_decimation = halfband_decimation;
        self.decimation_ratio = cic_decimation.saturating_mul(halfband_decimation);
        self
    }

    pub fn with_decimation_ratio(mut self, decimation_ratio: u32) -> Self {
        self.decimation_ratio = decimation_ratio;
        self
    }

    pub fn with_cic_stages(mut self, cic_stages: u32) -> Self {
        self.cic_stages = cic_stages;
        self
    }

    pub fn with_fir_taps(mut self, fir_taps: usize) -> Self {
        self.fir_taps = fir_taps;
        self
    }

    pub fn with_fifo_depth(mut self, fifo_depth: usize) -> Self {
        self.fifo_depth = fifo_depth;
        self
    }

    pub fn with_chain(mut self, chain: ChainKind) -> Self {
        self.chain = chain;
        self
    }

    pub fn with_backpressure(mut self, backpressure: BackpressurePolicy) -> Self {
        self.backpressure = backpressure;
        self
    }

    /// Check every parameter and parameter combination, returning the derived register widths
    pub fn validate(&self) -> Result<StageWidths> {
        if !(MIN_DATA_WIDTH..=MAX_DATA_WIDTH).contains(&self.data_width) {
            return Err(ConfigError::DataWidth(self.data_width));
        }
        if !(MIN_DECIMATION_RATIO..=MAX_DECIMATION_RATIO).contains(&self.decimation_ratio) {
            return Err(ConfigError::DecimationRatio(self.decimation_ratio));
        }
        if !(MIN_FIFO_DEPTH..=MAX_FIFO_DEPTH).contains(&self.fifo_depth) {
            return Err(ConfigError::FifoDepth(self.fifo_depth));
        }

        let widths = match self.chain {
            ChainKind::Full => self.validate_full()?,
            ChainKind::Boxcar => {
                if !self.decimation_ratio.is_power_of_two() {
                    return Err(ConfigError::BoxcarRatio(self.decimation_ratio));
                }
                let magnitude = self.decimation_ratio.trailing_zeros();
                let cic = self.data_width + magnitude;
                StageWidths { cic, halfband: cic, fir: cic, magnitude }
            }
        };
        Ok(widths)
    }

    fn validate_full(&self) -> Result<StageWidths> {
        if self.cic_stages == 0 || self.cic_stages > MAX_CIC_STAGES {
            return Err(ConfigError::CicStages(self.cic_stages));
        }
        if !self.cic_decimation.is_power_of_two() {
            return Err(ConfigError::CicDecimation(self.cic_decimation));
        }
        if self.halfband_decimation != 2 {
            return Err(ConfigError::HalfbandDecimation(self.halfband_decimation));
        }
        if self.cic_decimation.checked_mul(self.halfband_decimation) != Some(self.decimation_ratio) {
            return Err(ConfigError::RatioMismatch {
                ratio: self.decimation_ratio,
                cic: self.cic_decimation,
                halfband: self.halfband_decimation,
            });
        }
        if self.fir_taps == 0 || self.fir_taps > MAX_FIR_TAPS {
            return Err(ConfigError::FirTaps(self.fir_taps));
        }

        // Bit growth of an N stage CIC is N * log2(R)
        let growth = self.cic_stages * self.cic_decimation.trailing_zeros();
        let cic = self.data_width + growth;
        let halfband = cic + HALFBAND_GUARD_BITS;
        let fir = halfband + FIR_GUARD_BITS;
        if fir > 64 {
            return Err(ConfigError::RegisterWidth { stage: "FIR", bits: fir });
        }
        Ok(StageWidths { cic, halfband, fir, magnitude: growth })
    }

    /// Input bits consumed per output sample
    pub fn bits_per_sample(&self) -> u32 {
        self.decimation_ratio
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_widths() {
        let widths = DecimatorConfig::default().validate().unwrap();
        assert_eq!(widths, StageWidths { cic: 28, halfband: 30, fir: 38, magnitude: 12 });
    }

    #[test]
    fn rejects_ratio_mismatch() {
        let config = DecimatorConfig::default().with_decimation_ratio(32);
        assert_eq!(
            config.validate(),
            Err(ConfigError::RatioMismatch { ratio: 32, cic: 8, halfband: 2 })
        );
    }

    #[test]
    fn rejects_out_of_range_parameters() {
        let base = DecimatorConfig::default();
        assert_eq!(base.clone().with_data_width(7).validate(), Err(ConfigError::DataWidth(7)));
        assert_eq!(base.clone().with_data_width(33).validate(), Err(ConfigError::DataWidth(33)));
        assert_eq!(base.clone().with_fifo_depth(0).validate(), Err(ConfigError::FifoDepth(0)));
        assert_eq!(base.clone().with_fifo_depth(65).validate(), Err(ConfigError::FifoDepth(65)));
        assert_eq!(base.clone().with_cic_stages(0).validate(), Err(ConfigError::CicStages(0)));
        assert_eq!(base.clone().with_fir_taps(0).validate(), Err(ConfigError::FirTaps(0)));
        assert_eq!(
            base.clone().with_decimation(3, 2).validate(),
            Err(ConfigError::CicDecimation(3))
        );
        assert_eq!(
            base.clone().with_decimation(8, 4).validate(),
            Err(ConfigError::HalfbandDecimation(4))
        );
        assert_eq!(
            base.with_decimation(64, 2).validate(),
            Err(ConfigError::DecimationRatio(128))
        );
    }

    #[test]
    fn rejects_registers_wider_than_accumulator() {
        let config = DecimatorConfig::default()
            .with_data_width(32)
            .with_cic_stages(8)
            .with_decimation(16, 2);
        assert_eq!(
            config.validate(),
            Err(ConfigError::RegisterWidth { stage: "FIR", bits: 74 })
        );
    }

    #[test]
    fn huge_decimation_is_rejected_not_overflowed() {
        let config = DecimatorConfig::default().with_decimation(1 << 31, 4);
        assert_eq!(config.decimation_ratio, u32::MAX);
        assert_eq!(config.validate(), Err(ConfigError::DecimationRatio(u32::MAX)));
    }

    #[test]
    fn boxcar_widths() {
        let config = DecimatorConfig::default().with_chain(ChainKind::Boxcar);
        let widths = config.validate().unwrap();
        assert_eq!(widths.magnitude, 4);
        assert_eq!(widths.cic, 20);

        let config = config.with_decimation_ratio(24);
        assert_eq!(config.validate(), Err(ConfigError::BoxcarRatio(24)));
    }
}
