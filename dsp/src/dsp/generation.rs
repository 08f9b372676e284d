use rand::{rngs::StdRng, Rng, SeedableRng};

/// First order sigma-delta modulator, turning a level in [-1.0, 1.0] into a PDM bitstream
/// whose density of ones is `(level + 1) / 2`
#[derive(Clone, Debug, Default)]
pub struct SigmaDelta {
    integrator: f64,
}

impl SigmaDelta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, level: f64) -> bool {
        let level = level.clamp(-1.0, 1.0);
        let bit = self.integrator >= 0.0;
        let feedback = if bit { 1.0 } else { -1.0 };
        self.integrator += level - feedback;
        bit
    }
}

/// `count` bits of a constant level
pub fn dc_bits(level: f64, count: usize) -> Vec<bool> {
    let mut modulator = SigmaDelta::new();
    (0..count).map(|_| modulator.push(level)).collect()
}

/// `count` bits of a sine tone. `freq` is in cycles per input bit.
pub fn tone_bits(amplitude: f64, freq: f64, count: usize) -> Vec<bool> {
    let mut modulator = SigmaDelta::new();
    (0..count)
        .map(|i| {
            let phase = 2.0 * core::f64::consts::PI * freq * i as f64;
            modulator.push(amplitude * libm::sin(phase))
        })
        .collect()
}

/// 0, 1, 0, 1, ...
pub fn alternating_bits(count: usize) -> Vec<bool> {
    (0..count).map(|i| i % 2 == 1).collect()
}

/// Reproducible random bitstream
pub fn random_bits(seed: u64, count: usize) -> Vec<bool> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count).map(|_| rng.gen::<bool>()).collect()
}

/// Pack bits LSB first, padding the last byte with zeros
pub fn pack_bits(bits: &[bool]) -> Vec<u8> {
    bits.chunks(8)
        .map(|chunk| {
            chunk
                .iter()
                .enumerate()
                .fold(0u8, |word, (i, &b)| word | ((b as u8) << i))
        })
        .collect()
}
