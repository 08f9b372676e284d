#![allow(dead_code)]

use pdm_decimator::{DecimatorConfig, PdmProcessor, Pipeline, TickInput, TickOutput};

pub fn reference() -> Pipeline {
    Pipeline::new(DecimatorConfig::default()).unwrap()
}

/// Convert bits with a consumer that takes every sample offered
pub fn convert(pipeline: &mut Pipeline, bits: &[bool]) -> Vec<i32> {
    let mut out = Vec::new();
    pipeline.process_bits(&mut bits.iter().copied(), &mut out);
    out
}

pub fn offer(bit: bool, pcm_ready: bool) -> TickInput {
    TickInput {
        enable: true,
        reset: false,
        pdm_bit: bit,
        pdm_valid: true,
        pcm_ready,
    }
}

/// Tick until `bits` have all been accepted, with the consumer held at `pcm_ready`. Returns the
/// outputs of every tick.
pub fn feed(pipeline: &mut Pipeline, bits: &[bool], pcm_ready: bool, max_ticks: usize) -> Vec<TickOutput> {
    let mut outputs = Vec::new();
    let mut next = 0;
    while next < bits.len() && outputs.len() < max_ticks {
        let out = pipeline.tick(&offer(bits[next], pcm_ready));
        if out.pdm_ready {
            next += 1;
        }
        outputs.push(out);
    }
    outputs
}
