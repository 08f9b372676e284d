use crate::coefficients::FirCoefficients;

/// Integer FIR filter over a circular delay line of half-band outputs.
///
/// The delay line starts zeroed, so the window is always fully populated and every input
/// produces an output.
#[derive(Clone, Debug)]
pub struct FirFilter {
    coeffs: FirCoefficients,
    samples: Vec<i64>,
    /// Tap index counter, the slot the next sample is written to
    pos: usize,
}

impl FirFilter {
    pub fn new(coeffs: FirCoefficients) -> Self {
        let taps = coeffs.len();
        Self { coeffs, samples: vec![0; taps], pos: 0 }
    }

    pub fn push(&mut self, sample: i64) -> i64 {
        let taps = self.samples.len();
        // Copy new sample, replacing oldest sample in buffer
        self.samples[self.pos] = sample;
        self.pos = (self.pos + 1) % taps;

        // Oldest sample is now at pos. The table is symmetric, so pair up taps i and
        // taps-1-i and multiply once.
        let c = self.coeffs.taps();
        let mut total = 0i64;
        for i in 0..taps / 2 {
            let a = self.samples[(self.pos + i) % taps];
            let b = self.samples[(self.pos + taps - 1 - i) % taps];
            total += c[i] as i64 * (a + b);
        }
        if taps % 2 == 1 {
            total += c[taps / 2] as i64 * self.samples[(self.pos + taps / 2) % taps];
        }

        total >> self.coeffs.shift()
    }

    pub fn tap_index(&self) -> usize {
        self.pos
    }

    pub fn coefficients(&self) -> &FirCoefficients {
        &self.coeffs
    }

    pub fn reset(&mut self) {
        self.samples.iter_mut().for_each(|x| *x = 0);
        self.pos = 0;
    }
}

/// Convert a filter output with `magnitude_bits` of full-scale range into a signed, zero
/// centred PCM sample of `data_width` bits:
/// `(value >> (magnitude_bits - data_width)) - 2^(data_width - 1)`.
///
/// A negative shift is a left shift. Full-scale input lands one past the top of the range and
/// saturates to `2^(data_width - 1) - 1`.
pub fn center_pcm(value: i64, magnitude_bits: u32, data_width: u32) -> i32 {
    let shift = magnitude_bits as i32 - data_width as i32;
    let scaled = if shift >= 0 {
        value >> shift
    } else {
        value << -shift
    };
    let half = 1i64 << (data_width - 1);
    (scaled - half).clamp(-half, half - 1) as i32
}
