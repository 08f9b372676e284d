use log::{debug, trace};

use crate::{
    buffer::{OutputQueue, QueueStatus},
    cic::CicFilter,
    coefficients::FirCoefficients,
    config::{BackpressurePolicy, ChainKind, DecimatorConfig, StageWidths},
    error::{ConfigError, Result},
    fir::{center_pcm, FirFilter},
    halfband::HalfbandFilter,
    BoxcarDecimator,
};

/// Controller states. One state is occupied per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    CicIntegrate,
    CicComb,
    Halfband,
    Fir,
    Output,
}

/// Signals sampled by the pipeline on one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickInput {
    pub enable: bool,
    pub reset: bool,
    pub pdm_bit: bool,
    pub pdm_valid: bool,
    /// Consumer is ready to take a PCM sample
    pub pcm_ready: bool,
}

/// Signals presented by the pipeline during one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutput {
    /// The bit offered this tick was taken if `pdm_valid` was also set
    pub pdm_ready: bool,
    /// Head of the queue while `pcm_valid`, otherwise the last sample handed out
    pub pcm_data: i32,
    pub pcm_valid: bool,
    pub busy: bool,
    /// A finished sample was dropped this tick
    pub overflow: bool,
    /// The consumer tried to read an empty queue this tick
    pub underflow: bool,
}

enum Chain {
    Full {
        cic: CicFilter,
        halfband: HalfbandFilter,
        fir: FirFilter,
    },
    Boxcar(BoxcarDecimator),
}

impl Chain {
    fn integrate(&mut self, bit: bool) -> bool {
        match self {
            Chain::Full { cic, .. } => cic.integrate(bit),
            Chain::Boxcar(boxcar) => boxcar.integrate(bit),
        }
    }

    fn reset(&mut self) {
        match self {
            Chain::Full { cic, halfband, fir } => {
                cic.reset();
                halfband.reset();
                fir.reset();
            }
            Chain::Boxcar(boxcar) => boxcar.reset(),
        }
    }
}

/// Decimation pipeline: the filter chain, the output queue and the state machine sequencing
/// them. Advances one clock per call to [`Pipeline::tick`].
pub struct Pipeline {
    config: DecimatorConfig,
    widths: StageWidths,
    chain: Chain,
    queue: OutputQueue,
    state: State,
    /// Where to pick up when enable returns. A frame interrupted by a disable resumes in the
    /// stage it was in, so no comb boundary or in-flight sample is skipped.
    resume: State,
    /// Value travelling between stages
    pending: i64,
    /// Output data register
    pcm_data: i32,
}

impl Pipeline {
    /// Build a pipeline using the reference low-pass table
    pub fn new(config: DecimatorConfig) -> Result<Self> {
        Self::with_coefficients(config, FirCoefficients::reference())
    }

    pub fn with_coefficients(config: DecimatorConfig, coeffs: FirCoefficients) -> Result<Self> {
        let widths = config.validate()?;

        let chain = match config.chain {
            ChainKind::Full => {
                if coeffs.len() != config.fir_taps {
                    return Err(ConfigError::TapCount {
                        expected: config.fir_taps,
                        actual: coeffs.len(),
                    });
                }
                let bits = coeffs.accumulator_bits(widths.magnitude);
                if bits > 64 {
                    return Err(ConfigError::RegisterWidth { stage: "FIR accumulator", bits });
                }
                Chain::Full {
                    cic: CicFilter::new(config.cic_stages as usize, config.cic_decimation, widths.cic),
                    halfband: HalfbandFilter::new(),
                    fir: FirFilter::new(coeffs),
                }
            }
            ChainKind::Boxcar => Chain::Boxcar(BoxcarDecimator::new(config.decimation_ratio)),
        };
        let queue = OutputQueue::new(config.fifo_depth)?;

        debug!(
            "{:?} chain, decimation {}, {} bit output, register widths {:?}, queue depth {}",
            config.chain, config.decimation_ratio, config.data_width, widths, config.fifo_depth
        );

        Ok(Self {
            config,
            widths,
            chain,
            queue,
            state: State::Idle,
            resume: State::CicIntegrate,
            pending: 0,
            pcm_data: 0,
        })
    }

    /// Advance one clock
    pub fn tick(&mut self, input: &TickInput) -> TickOutput {
        if input.reset {
            self.reset();
            return self.idle_output();
        }
        if !input.enable {
            if self.state != State::Idle {
                self.resume = self.state;
            }
            self.transition(State::Idle);
            return self.idle_output();
        }

        // Handshake signals come from the state at the start of the tick
        let busy = self.busy();
        let pdm_ready = self.pdm_ready();
        let pcm_valid = self.pcm_valid();
        let pcm_data = self.queue.front().filter(|_| pcm_valid).unwrap_or(self.pcm_data);

        let mut write = None;
        let next = match self.state {
            State::Idle => core::mem::replace(&mut self.resume, State::CicIntegrate),
            State::CicIntegrate => {
                if input.pdm_valid && pdm_ready && self.chain.integrate(input.pdm_bit) {
                    State::CicComb
                } else {
                    State::CicIntegrate
                }
            }
            State::CicComb => match &mut self.chain {
                Chain::Full { cic, halfband, .. } => match halfband.push(cic.comb()) {
                    Some(y) => {
                        self.pending = y;
                        State::Halfband
                    }
                    // Half-band needs another CIC sample
                    None => State::CicIntegrate,
                },
                Chain::Boxcar(boxcar) => {
                    self.pending = boxcar.take();
                    State::Fir
                }
            },
            State::Halfband => {
                if let Chain::Full { fir, .. } = &mut self.chain {
                    self.pending = fir.push(self.pending);
                }
                State::Fir
            }
            State::Fir => {
                write = Some(center_pcm(self.pending, self.widths.magnitude, self.config.data_width));
                State::Output
            }
            State::Output => State::CicIntegrate,
        };

        let (taken, status) = self.queue.clock(write, busy && input.pcm_ready);
        if let Some(sample) = taken {
            self.pcm_data = sample;
        }
        self.transition(next);

        TickOutput {
            pdm_ready,
            pcm_data,
            pcm_valid,
            busy,
            overflow: status.overflow,
            underflow: status.underflow,
        }
    }

    fn transition(&mut self, next: State) {
        if next != self.state {
            trace!("{:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }

    fn idle_output(&self) -> TickOutput {
        TickOutput {
            pcm_data: self.pcm_data,
            ..TickOutput::default()
        }
    }

    /// Zero every accumulator, delay line, counter and queue pointer and return to `Idle`
    pub fn reset(&mut self) {
        debug!("pipeline reset");
        self.chain.reset();
        self.queue.reset();
        self.state = State::Idle;
        self.resume = State::CicIntegrate;
        self.pending = 0;
        self.pcm_data = 0;
    }

    /// Input-ready for the next tick
    pub fn pdm_ready(&self) -> bool {
        self.state == State::CicIntegrate
            && (self.config.backpressure == BackpressurePolicy::Drop || !self.queue.is_full())
    }

    /// Output-valid for the next tick
    pub fn pcm_valid(&self) -> bool {
        self.busy() && !self.queue.is_empty()
    }

    pub fn busy(&self) -> bool {
        self.state != State::Idle
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn config(&self) -> &DecimatorConfig {
        &self.config
    }

    pub fn widths(&self) -> StageWidths {
        self.widths
    }

    pub fn queue(&self) -> &OutputQueue {
        &self.queue
    }

    /// Flags latched since the last `clear_status` or reset
    pub fn status(&self) -> QueueStatus {
        self.queue.status()
    }

    pub fn clear_status(&mut self) {
        self.queue.clear_status();
    }
}
