/** Convert a PDM capture into a mono WAV file.

The input is either a raw stream of packed PDM bytes, or a packet capture where each packet is a
little-endian u32 length followed by that many bytes: interleaved PDM bytes (one per channel)
and a two byte footer holding a sequence number and an error flags byte.
*/
use std::fs::File;
use std::io::{BufReader, BufWriter, Read};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{debug, info, warn};
use pdm_decimator::{
    pdm_processing::compute_level, unpack_bits, BackpressurePolicy, BitOrder, ChainKind,
    DecimatorConfig, PdmProcessor, Pipeline,
};

#[path = "../logger.rs"]
mod logger;

/// Trailing sequence and flags bytes of a captured packet
const FOOTER_LEN: usize = 2;

#[derive(Parser, Debug)]
#[command(version, about = "Decimate a PDM capture into a PCM WAV file")]
struct Args {
    /// Raw PDM bytes, or a packet capture with --packets
    input: PathBuf,

    /// Output WAV file
    #[arg(default_value = "out.wav")]
    output: PathBuf,

    /// TOML file with decimator settings. Flags below take precedence.
    #[arg(short, long, env = "PDM_DECIMATOR_CONFIG")]
    config: Option<PathBuf>,

    /// Input is a length-prefixed packet capture
    #[arg(long)]
    packets: bool,

    /// Number of interleaved channels in the packet payload
    #[arg(long, default_value_t = 1)]
    channels: usize,

    /// Channel to extract from the packet payload
    #[arg(long, default_value_t = 0)]
    channel: usize,

    /// The first sample of each byte is in bit 7
    #[arg(long)]
    msb_first: bool,

    /// PDM bit clock in Hz
    #[arg(long, default_value_t = 3_072_000)]
    pdm_rate: u32,

    /// Output sample width in bits
    #[arg(long)]
    data_width: Option<u32>,

    /// Overall decimation ratio
    #[arg(long)]
    decimation: Option<u32>,

    /// Output queue depth
    #[arg(long)]
    fifo_depth: Option<usize>,

    /// Use the single-stage ones-counting decimator
    #[arg(long)]
    boxcar: bool,

    /// Only print errors
    #[arg(short, long)]
    quiet: bool,

    /// More output, repeat for trace
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

struct PacketFileReader<R: Read> {
    reader: R,
}

impl<R: Read> PacketFileReader<R> {
    fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: Read> Iterator for PacketFileReader<R> {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut buf = [0u8; 4];
        self.reader.read_exact(&mut buf).ok()?;
        let len = u32::from_le_bytes(buf) as usize;
        let mut data = vec![0; len];
        match self.reader.read_exact(&mut data) {
            Ok(()) => Some(data),
            Err(_) => {
                warn!("Truncated packet of {} bytes at end of capture", len);
                None
            }
        }
    }
}

/// Settings from the optional TOML file, then the command line overrides
fn load_config(args: &Args) -> Result<DecimatorConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => DecimatorConfig::default(),
    };

    if let Some(width) = args.data_width {
        config = config.with_data_width(width);
    }
    if let Some(depth) = args.fifo_depth {
        config = config.with_fifo_depth(depth);
    }
    if args.boxcar {
        config = config.with_chain(ChainKind::Boxcar);
    }
    if let Some(ratio) = args.decimation {
        config = match config.chain {
            ChainKind::Full => config.with_decimation(ratio / 2, 2),
            ChainKind::Boxcar => config.with_decimation_ratio(ratio),
        };
    }
    // A file cannot be paused, every bit must come out the other end
    config = config.with_backpressure(BackpressurePolicy::Stall);
    Ok(config)
}

/// Smallest WAV container holding `data_width` bits
fn container_bits(data_width: u32) -> u16 {
    match data_width {
        0..=8 => 8,
        9..=16 => 16,
        17..=24 => 24,
        _ => 32,
    }
}

fn read_packets(path: &Path, args: &Args, pipeline: &mut Pipeline, order: BitOrder) -> Result<Vec<i32>> {
    if args.channel >= args.channels {
        bail!("channel {} out of range for {} channels", args.channel, args.channels);
    }
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut pcm = Vec::new();
    let mut last_seq: Option<u8> = None;
    let mut packets = 0usize;

    for packet in PacketFileReader::new(BufReader::new(file)) {
        if packet.len() < FOOTER_LEN {
            warn!("Skipping runt packet of {} bytes", packet.len());
            continue;
        }
        let (payload, footer) = packet.split_at(packet.len() - FOOTER_LEN);
        let (seq, flags) = (footer[0], footer[1]);
        if let Some(last) = last_seq {
            if seq != last.wrapping_add(1) {
                warn!("Missed sequence {} -> {}", last, seq);
            }
        }
        last_seq = Some(seq);
        if flags != 0 {
            warn!("Packet {} flagged 0x{:02x} by the capture device", seq, flags);
        }

        let mono: Vec<u8> = payload
            .iter()
            .skip(args.channel)
            .step_by(args.channels)
            .copied()
            .collect();
        pipeline.process_bits(&mut unpack_bits(&mono, order), &mut pcm);
        packets += 1;
    }
    debug!("Read {} packets", packets);
    Ok(pcm)
}

fn read_raw(path: &Path, pipeline: &mut Pipeline, order: BitOrder) -> Result<Vec<i32>> {
    let pdm = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let mut pcm = Vec::with_capacity(pdm.len() * 8 / pipeline.config().bits_per_sample() as usize);
    pipeline.process_pdm(&pdm, order, &mut pcm);
    Ok(pcm)
}

fn write_wav(path: &Path, pcm: &[i32], data_width: u32, sample_rate: u32) -> Result<()> {
    let bits = container_bits(data_width);
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: bits,
        sample_format: hound::SampleFormat::Int,
    };
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = hound::WavWriter::new(BufWriter::new(file), spec)?;
    // Left align the samples in the container
    let shift = bits as u32 - data_width;
    for &sample in pcm {
        writer.write_sample(sample << shift)?;
    }
    writer.finalize()?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    logger::init(args.quiet, args.verbose)?;

    let config = load_config(&args)?;
    let mut pipeline = Pipeline::new(config.clone()).context("invalid decimator configuration")?;
    let order = if args.msb_first { BitOrder::MsbFirst } else { BitOrder::LsbFirst };
    let sample_rate = args.pdm_rate / config.bits_per_sample();
    info!(
        "{:?} chain, decimation {}, {} bit output at {} Hz",
        config.chain, config.decimation_ratio, config.data_width, sample_rate
    );

    let pcm = if args.packets {
        read_packets(&args.input, &args, &mut pipeline, order)?
    } else {
        read_raw(&args.input, &mut pipeline, order)?
    };

    let (db_fs, mean) = compute_level(&pcm, config.data_width);
    info!("{} samples, level {:.1} dBFS, mean {:.4}", pcm.len(), db_fs, mean);
    let queue = pipeline.queue();
    if queue.overflow_count() > 0 || queue.underflow_count() > 0 {
        warn!(
            "Output queue overflowed {} times, underflowed {} times",
            queue.overflow_count(),
            queue.underflow_count()
        );
    }

    write_wav(&args.output, &pcm, config.data_width, sample_rate)?;
    info!("Wrote {}", args.output.display());
    Ok(())
}
