use crate::{
    pipeline::{Pipeline, State, TickInput},
    unpack_bits, BitOrder,
};

/// Batch conversion of PDM into PCM
pub trait PdmProcessor {
    /// Convert bits in time order, appending finished samples to `out`. Returns the number of
    /// samples appended.
    fn process_bits(&mut self, bits: &mut dyn Iterator<Item = bool>, out: &mut Vec<i32>) -> usize;

    /// Convert a packed single-channel PDM buffer
    fn process_pdm(&mut self, pdm: &[u8], order: BitOrder, out: &mut Vec<i32>) -> usize {
        self.process_bits(&mut unpack_bits(pdm, order), out)
    }
}

impl Pipeline {
    /// One tick with the consumer taking a sample whenever one is offered
    fn step(&mut self, bit: Option<bool>, out: &mut Vec<i32>) -> bool {
        let input = TickInput {
            enable: true,
            reset: false,
            pdm_bit: bit.unwrap_or(false),
            pdm_valid: bit.is_some(),
            pcm_ready: self.pcm_valid(),
        };
        let result = self.tick(&input);
        if result.pcm_valid && input.pcm_ready {
            out.push(result.pcm_data);
        }
        result.pdm_ready && input.pdm_valid
    }
}

impl PdmProcessor for Pipeline {
    fn process_bits(&mut self, bits: &mut dyn Iterator<Item = bool>, out: &mut Vec<i32>) -> usize {
        let start = out.len();
        for bit in bits {
            // Hold the bit on the input until the pipeline takes it
            while !self.step(Some(bit), out) {}
        }
        // Let the last frame finish travelling through the stages and drain the queue
        while self.state() != State::CicIntegrate || !self.queue().is_empty() {
            self.step(None, out);
        }
        out.len() - start
    }
}

/// Return the RMS level of a PCM buffer in dBFS, and its mean. A full-scale sine is 0 dBFS.
pub fn compute_level(pcm: &[i32], data_width: u32) -> (f32, f32) {
    if pcm.is_empty() {
        return (f32::NEG_INFINITY, 0.0);
    }
    let full_scale = (1u64 << (data_width - 1)) as f64;
    let length = pcm.len() as f64;
    let mean = pcm.iter().map(|&x| x as f64).sum::<f64>() / length;
    let mut rms = 0.0f64;
    for &sample in pcm {
        let x = (sample as f64 - mean) / full_scale;
        rms += x * x;
    }
    let rms = libm::sqrt(rms / length) as f32;
    // i.e. 20 * log10(rms * sqrt(2)). Note: 20*log10(sqrt(2)) ~= 3.0103
    let db_fs = 20.0 * libm::log10f(rms) + 3.0103;
    (db_fs, (mean / full_scale) as f32)
}
