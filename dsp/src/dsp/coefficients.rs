use log::warn;

use crate::error::{ConfigError, Result};

/// Normalization shift of the reference table: its taps sum to `1 << FIR_SHIFT`
pub const FIR_SHIFT: u32 = 16;

/// 64 tap low-pass, Kaiser prototype (cut-off 0.225 fs, beta 11.5) with the quantized taps then
/// searched for the deepest stopband. Passband ripple is below 0.02 dB up to 0.15 fs and the
/// stopband is at least 107 dB down from 0.3 fs.
///
/// The taps sum to 65538, not 65536. At fs/3 the response of an integer table is a nonzero
/// integer over `1 << FIR_SHIFT` unless the sum is divisible by 3, which caps attenuation there
/// at 96.3 dB. The +2 excess is a 0.0003 dB gain error; at DC the normalization shift truncates
/// it away for any input below 2^15.
#[rustfmt::skip]
pub const LOWPASS_COEFFS: [i32; 64] = [
         0,      0,      0,      1,      2,     -2,     -9,     -2,
        19,     11,    -39,    -38,     72,    118,    -75,   -244,
        23,    415,    123,   -627,   -446,    805,   1002,   -854,
     -1878,    589,   3199,    334,  -5409,  -3085,  11708,  27056,
     27056,  11708,  -3085,  -5409,    334,   3199,    589,  -1878,
      -854,   1002,    805,   -446,   -627,    123,    415,     23,
      -244,    -75,    118,     72,    -38,    -39,     11,     19,
        -2,     -9,     -2,      2,      1,      0,      0,      0,
];

/// Immutable, symmetric FIR coefficient table with its normalization shift
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirCoefficients {
    taps: Vec<i32>,
    shift: u32,
}

impl FirCoefficients {
    /// Validate a table. It must be non-empty, symmetric and have non-zero DC gain. A DC gain
    /// more than 1/4096 away from `1 << shift` is accepted with a warning, the output will no
    /// longer reach full scale exactly.
    pub fn new(taps: Vec<i32>, shift: u32) -> Result<Self> {
        if taps.is_empty() || taps.len() > crate::config::MAX_FIR_TAPS {
            return Err(ConfigError::FirTaps(taps.len()));
        }
        if shift > 31 {
            return Err(ConfigError::CoefficientShift(shift));
        }
        let n = taps.len();
        if let Some(i) = (0..n / 2).find(|&i| taps[i] != taps[n - 1 - i]) {
            return Err(ConfigError::Asymmetric(i));
        }

        let table = Self { taps, shift };
        let gain = table.dc_gain();
        if gain == 0 {
            return Err(ConfigError::ZeroGain);
        }
        let unity = 1i64 << shift;
        if (gain - unity).abs() * 4096 > unity {
            warn!("FIR table DC gain {} is not unity (expected {})", gain, unity);
        }
        Ok(table)
    }

    pub fn reference() -> Self {
        Self { taps: LOWPASS_COEFFS.to_vec(), shift: FIR_SHIFT }
    }

    pub fn taps(&self) -> &[i32] {
        &self.taps
    }

    pub fn len(&self) -> usize {
        self.taps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taps.is_empty()
    }

    pub fn shift(&self) -> u32 {
        self.shift
    }

    /// Sum of all taps
    pub fn dc_gain(&self) -> i64 {
        self.taps.iter().map(|&c| c as i64).sum()
    }

    /// Signed width needed to accumulate the table against samples of at most `input_bits`
    /// magnitude bits without overflow
    pub fn accumulator_bits(&self, input_bits: u32) -> u32 {
        let sum_abs: u64 = self.taps.iter().map(|&c| c.unsigned_abs() as u64).sum();
        (u64::BITS - sum_abs.leading_zeros()) + input_bits + 1
    }

    /// Magnitude response in dB relative to unity gain, at `freq` in cycles per sample
    pub fn magnitude_db(&self, freq: f64) -> f64 {
        let w = 2.0 * core::f64::consts::PI * freq;
        let (mut re, mut im) = (0.0, 0.0);
        for (k, &c) in self.taps.iter().enumerate() {
            re += c as f64 * libm::cos(w * k as f64);
            im -= c as f64 * libm::sin(w * k as f64);
        }
        let mag = libm::hypot(re, im) / (1u64 << self.shift) as f64;
        20.0 * libm::log10(mag.max(1e-15))
    }
}

impl Default for FirCoefficients {
    fn default() -> Self {
        Self::reference()
    }
}
