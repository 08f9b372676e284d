/// Sign-extend the low `width` bits of `x`, emulating a `width`-bit two's complement register
pub(crate) fn wrap_to_width(x: i64, width: u32) -> i64 {
    if width >= 64 {
        x
    } else {
        let shift = 64 - width;
        (x << shift) >> shift
    }
}

/// Cascaded integrator-comb decimator for a single PDM bitstream.
///
/// Integrators run once per input bit and are allowed to overflow: every register wraps at
/// `width` bits, and the comb cascade at the decimated rate removes the wrap again. The output
/// for a constant stream of ones settles at `decimation ^ stages`.
#[derive(Clone, Debug)]
pub struct CicFilter {
    integrator: Vec<i64>,
    comb: Vec<i64>,
    decimation: u32,
    width: u32,
    pos: u32,
}

impl CicFilter {
    pub fn new(stages: usize, decimation: u32, width: u32) -> Self {
        Self {
            integrator: vec![0; stages],
            comb: vec![0; stages],
            decimation,
            width,
            pos: 0,
        }
    }

    /// Run one bit through the integrators. Returns true when this bit completes a decimation
    /// frame, i.e. the comb cascade is due.
    pub fn integrate(&mut self, bit: bool) -> bool {
        // Each stage sums the value its predecessor held before this bit, so walk backwards
        for stage in (1..self.integrator.len()).rev() {
            let x = self.integrator[stage].wrapping_add(self.integrator[stage - 1]);
            self.integrator[stage] = wrap_to_width(x, self.width);
        }
        if let Some(first) = self.integrator.first_mut() {
            *first = wrap_to_width(first.wrapping_add(bit as i64), self.width);
        }

        self.pos += 1;
        if self.pos == self.decimation {
            self.pos = 0;
            true
        } else {
            false
        }
    }

    /// Run the comb cascade at the decimated rate
    pub fn comb(&mut self) -> i64 {
        // Input is latest output of last integrator stage
        let mut x = self.integrator.last().copied().unwrap_or(0);
        for prev in self.comb.iter_mut() {
            let y = wrap_to_width(x.wrapping_sub(*prev), self.width);
            *prev = x;
            x = y;
        }
        x
    }

    pub fn push_bit(&mut self, bit: bool) -> Option<i64> {
        if self.integrate(bit) {
            Some(self.comb())
        } else {
            None
        }
    }

    /// Push 8 packed PDM bits, LSB first
    pub fn push_byte(&mut self, pdm: u8, mut rx: impl FnMut(i64)) {
        for i in 0..8 {
            if let Some(x) = self.push_bit(pdm & (1 << i) != 0) {
                rx(x);
            }
        }
    }

    /// Output value for a constant stream of ones
    pub fn gain(&self) -> i64 {
        (self.decimation as i64).pow(self.integrator.len() as u32)
    }

    /// Bits accepted since the last decimation boundary
    pub fn phase(&self) -> u32 {
        self.pos
    }

    pub fn reset(&mut self) {
        self.integrator.iter_mut().for_each(|x| *x = 0);
        self.comb.iter_mut().for_each(|x| *x = 0);
        self.pos = 0;
    }
}
