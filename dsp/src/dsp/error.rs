use thiserror::Error;

/// Result type alias using `ConfigError`
pub type Result<T> = core::result::Result<T, ConfigError>;

/// Rejected decimator configurations. Construction fails on any of these, before the
/// first tick is processed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("data width {0} outside supported range 8..=32")]
    DataWidth(u32),

    #[error("decimation ratio {0} outside supported range 2..=48")]
    DecimationRatio(u32),

    #[error("decimation ratio {ratio} does not equal CIC decimation {cic} x half-band decimation {halfband}")]
    RatioMismatch { ratio: u32, cic: u32, halfband: u32 },

    #[error("CIC decimation {0} must be a power of two")]
    CicDecimation(u32),

    #[error("CIC stage count {0} outside supported range 1..=8")]
    CicStages(u32),

    #[error("half-band decimation {0} unsupported, the half-band stage decimates by 2")]
    HalfbandDecimation(u32),

    #[error("boxcar decimation ratio {0} must be a power of two")]
    BoxcarRatio(u32),

    #[error("FIR tap count {0} outside supported range 1..=256")]
    FirTaps(usize),

    #[error("FIFO depth {0} outside supported range 4..=64")]
    FifoDepth(usize),

    #[error("coefficient table has {actual} taps, configuration expects {expected}")]
    TapCount { expected: usize, actual: usize },

    #[error("coefficient table is not symmetric at index {0}")]
    Asymmetric(usize),

    #[error("coefficient table has zero DC gain")]
    ZeroGain,

    #[error("coefficient normalization shift {0} exceeds 31 bits")]
    CoefficientShift(u32),

    #[error("{stage} register needs {bits} bits, more than the 64-bit accumulator")]
    RegisterWidth { stage: &'static str, bits: u32 },
}
