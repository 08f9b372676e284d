use num_integer::Integer;

/// Symmetric 7 tap half-band response. Only 4 distinct delays are needed, the outer taps
/// reuse the stored history by symmetry.
pub const HALFBAND_COEFFS: [i64; 7] = [1, 0, 3, 4, 3, 0, 1];

/// Which history entry each coefficient multiplies
const TAP_INDEX: [usize; 7] = [0, 1, 2, 3, 2, 1, 0];

/// Sum of the coefficients. Dividing by it gives unity DC gain.
pub const HALFBAND_GAIN: i64 = 12;

/// 2:1 decimating half-band filter fed by the CIC stage
#[derive(Clone, Debug, Default)]
pub struct HalfbandFilter {
    /// Most recent inputs, index 0 is the newest
    history: [i64; 4],
    pos: u32,
}

impl HalfbandFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shift a CIC output into the delay line. Every second input produces an output.
    pub fn push(&mut self, sample: i64) -> Option<i64> {
        self.history.rotate_right(1);
        self.history[0] = sample;

        self.pos += 1;
        if self.pos < 2 {
            return None;
        }
        self.pos = 0;

        let acc: i64 = HALFBAND_COEFFS
            .iter()
            .zip(TAP_INDEX.iter())
            .map(|(c, &i)| c * self.history[i])
            .sum();
        Some(acc.div_floor(&HALFBAND_GAIN))
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
