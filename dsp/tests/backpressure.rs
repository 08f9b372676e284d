mod common;

use common::{convert, feed, reference};
use pdm_decimator::{
    generation::{alternating_bits, random_bits},
    BackpressurePolicy, DecimatorConfig, PdmProcessor, Pipeline, State, TickInput,
};

const DEPTH: usize = 16;
const RATIO: usize = 16;

/// Tick with no input and an eager consumer until nothing is in flight
fn drain(p: &mut Pipeline) -> Vec<i32> {
    let mut out = Vec::new();
    while p.state() != State::CicIntegrate || !p.queue().is_empty() {
        let ready = p.pcm_valid();
        let o = p.tick(&TickInput { enable: true, pcm_ready: ready, ..TickInput::default() });
        if o.pcm_valid && ready {
            out.push(o.pcm_data);
        }
    }
    out
}

#[test]
fn stalled_consumer_stalls_input_without_loss() {
    let bits = random_bits(11, DEPTH * RATIO * 3);
    let mut p = reference();

    let outputs = feed(&mut p, &bits, false, 2000);
    let accepted = outputs.iter().filter(|o| o.pdm_ready).count();
    assert_eq!(accepted, DEPTH * RATIO);
    assert!(outputs.iter().all(|o| !o.overflow));
    assert!(p.queue().is_full());
    assert!(!p.pdm_ready());
    assert!(outputs.last().map_or(false, |o| o.pcm_valid && !o.pdm_ready));

    // Release the consumer and finish the stream
    let mut out = Vec::new();
    p.process_bits(&mut bits[accepted..].iter().copied(), &mut out);
    assert_eq!(out, convert(&mut reference(), &bits));
    assert_eq!(p.queue().overflow_count(), 0);
}

#[test]
fn free_running_source_overflows_and_keeps_queued_samples() {
    let bits = random_bits(5, DEPTH * RATIO * 3);
    let config = DecimatorConfig::default().with_backpressure(BackpressurePolicy::Drop);
    let mut p = Pipeline::new(config).unwrap();

    let outputs = feed(&mut p, &bits, false, 100_000);
    let first_overflow = outputs
        .iter()
        .position(|o| o.overflow)
        .expect("no overflow raised");
    let accepted_before = outputs[..first_overflow].iter().filter(|o| o.pdm_ready).count();
    assert!(accepted_before >= DEPTH * RATIO);
    assert!(p.status().overflow);
    assert!(p.queue().overflow_count() > 0);
    assert!(p.queue().len() <= DEPTH);

    let drained = drain(&mut p);
    let expected = convert(&mut reference(), &bits);
    assert_eq!(&drained[..DEPTH], &expected[..DEPTH]);
}

#[test]
fn overflow_is_a_single_tick_pulse() {
    let config = DecimatorConfig::default().with_backpressure(BackpressurePolicy::Drop);
    let mut p = Pipeline::new(config).unwrap();
    let mut outputs = feed(&mut p, &vec![true; DEPTH * RATIO * 4], false, 100_000);
    // Let the final frame reach the queue
    while p.state() != State::CicIntegrate {
        outputs.push(p.tick(&TickInput { enable: true, ..TickInput::default() }));
    }

    for pair in outputs.windows(2) {
        assert!(!(pair[0].overflow && pair[1].overflow));
    }
    let pulses = outputs.iter().filter(|o| o.overflow).count() as u64;
    assert_eq!(pulses, p.queue().overflow_count());
    // 64 samples produced, 16 kept
    assert_eq!(pulses, 48);
}

#[test]
fn consumer_pull_on_empty_queue_underflows() {
    let mut p = reference();
    let ready = TickInput { enable: true, pcm_ready: true, ..TickInput::default() };
    p.tick(&ready);
    for _ in 0..5 {
        let o = p.tick(&ready);
        assert!(o.underflow);
        assert!(!o.pcm_valid);
        assert!(o.busy);
    }
    assert_eq!(p.queue().underflow_count(), 5);

    // A consumer that waits for valid never underflows
    let mut p = reference();
    let out = convert(&mut p, &random_bits(2, RATIO * 10));
    assert_eq!(out.len(), 10);
    assert_eq!(p.queue().underflow_count(), 0);
}

#[test]
fn reset_mid_stream_restores_initial_behaviour() {
    let bits = random_bits(9, RATIO * 30);
    let mut p = reference();
    feed(&mut p, &bits[..RATIO * 20 + 5], false, 10_000);
    p.tick(&TickInput { reset: true, ..TickInput::default() });
    assert_eq!(p.state(), State::Idle);
    assert!(p.queue().is_empty());
    assert_eq!(convert(&mut p, &bits), convert(&mut reference(), &bits));
}

/// Convert `bits` with an eager consumer, disabling the pipeline for a few ticks the first
/// time it is in `pause_in` after `after` accepted bits
fn convert_with_pause(bits: &[bool], pause_in: State, after: usize) -> Vec<i32> {
    let mut p = reference();
    let mut out = Vec::new();
    let mut next = 0;
    let mut paused = false;
    p.tick(&TickInput { enable: true, ..TickInput::default() });

    while next < bits.len() {
        if !paused && next >= after && p.state() == pause_in {
            for _ in 0..3 {
                let o = p.tick(&TickInput { pdm_bit: true, pdm_valid: true, ..TickInput::default() });
                assert!(!o.busy && !o.pdm_ready && !o.pcm_valid);
            }
            assert_eq!(p.state(), State::Idle);
            paused = true;
        }
        let input = TickInput {
            enable: true,
            reset: false,
            pdm_bit: bits[next],
            pdm_valid: true,
            pcm_ready: p.pcm_valid(),
        };
        let o = p.tick(&input);
        if o.pcm_valid && input.pcm_ready {
            out.push(o.pcm_data);
        }
        if o.pdm_ready {
            next += 1;
        }
    }
    assert!(paused, "never paused in {:?}", pause_in);
    out.extend(drain(&mut p));
    out
}

#[test]
fn disable_in_any_state_loses_nothing() {
    let bits = random_bits(21, RATIO * 300);
    let expected = convert(&mut reference(), &bits);
    for state in [State::CicIntegrate, State::CicComb, State::Halfband, State::Fir, State::Output] {
        assert_eq!(convert_with_pause(&bits, state, RATIO * 100), expected, "paused in {:?}", state);
    }

    // Alternating bits settle to mid-scale and stay there across the pause
    let bits = alternating_bits(RATIO * 300);
    for state in [State::CicComb, State::Halfband, State::Fir] {
        let out = convert_with_pause(&bits, state, RATIO * 200);
        assert!(out[80..].iter().all(|&x| x == 0), "paused in {:?}", state);
    }
}
