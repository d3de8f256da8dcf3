use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use mp4index::{
    ByteSource, Mp4Reader, ReaderOptions, SampleIndexEntry, SeekSource, Track, util::hex_dump,
};
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "mp4samples",
    version,
    about = "Print the sample index of MP4 tracks and fetch individual samples"
)]
struct Args {
    /// Input MP4 file
    input: PathBuf,

    /// Filter by track-id (default: all tracks)
    #[arg(long)]
    track_id: Option<u32>,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,

    /// Limit number of samples printed per track
    #[arg(long)]
    limit: Option<usize>,

    /// Only list keyframes
    #[arg(long)]
    keyframes: bool,

    /// Show the sample displayed at this time (seconds)
    #[arg(long, conflicts_with = "sample")]
    at: Option<f64>,

    /// Show this sample (0-based)
    #[arg(long)]
    sample: Option<u32>,

    /// With --at or --sample, also hex dump the sample bytes
    #[arg(long)]
    hex: bool,

    /// MiB of the file to read when looking for metadata
    #[arg(long, default_value_t = 10)]
    prefix_mib: u64,

    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "mp4index=debug,mp4samples=debug"
    } else {
        "mp4index=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let file = std::fs::File::open(&args.input)
        .with_context(|| format!("opening {}", args.input.display()))?;
    let source = SeekSource::new(file)?;
    let options = ReaderOptions {
        metadata_prefix: args.prefix_mib.saturating_mul(1024 * 1024),
    };
    let reader = Mp4Reader::open_with(source, options)
        .with_context(|| format!("reading {}", args.input.display()))?;

    if args.at.is_some() || args.sample.is_some() {
        return print_sample(&reader, &args);
    }

    let tracks: Vec<&Track> = reader
        .tracks()
        .filter(|t| args.track_id.is_none_or(|tid| t.id() == tid))
        .collect();

    if args.json {
        print_json(&reader, &tracks, &args)
    } else {
        print_text(&reader, &tracks, &args);
        Ok(())
    }
}

fn selected_entries<'a>(track: &'a Track, args: &Args) -> Vec<&'a SampleIndexEntry> {
    let entries: Box<dyn Iterator<Item = &'a SampleIndexEntry> + 'a> = if args.keyframes {
        Box::new(track.index.keyframes())
    } else {
        Box::new(track.index.iter())
    };
    entries.take(args.limit.unwrap_or(usize::MAX)).collect()
}

fn seconds(ticks: u64, timescale: u32) -> f64 {
    if timescale == 0 {
        0.0
    } else {
        ticks as f64 / timescale as f64
    }
}

fn codec_label(reader: &Mp4Reader<impl ByteSource>, track: &Track) -> String {
    reader
        .decoder_config(track.id())
        .map(|c| c.codec)
        .unwrap_or_else(|_| "unknown".to_string())
}

fn print_json(reader: &Mp4Reader<impl ByteSource>, tracks: &[&Track], args: &Args) -> Result<()> {
    let value = json!({
        "mdat_offset": reader.mdat_offset(),
        "mdat_size": reader.mdat_size(),
        "tracks": tracks.iter().map(|t| {
            json!({
                "track": t,
                "codec_string": codec_label(reader, t),
                "sample_count": t.sample_count(),
                "keyframe_count": t.index.keyframes().count(),
                "samples": selected_entries(t, args),
            })
        }).collect::<Vec<_>>(),
    });

    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn print_text(reader: &Mp4Reader<impl ByteSource>, tracks: &[&Track], args: &Args) {
    if let (Some(offset), Some(size)) = (reader.mdat_offset(), reader.mdat_size()) {
        println!("mdat offset={} size={}", offset, size);
    }

    for t in tracks {
        let r = &t.record;
        print!(
            "Track {} ({}) codec={} timescale={} duration={:.3}s samples={}",
            r.id,
            r.media_type.as_str(),
            codec_label(reader, t),
            r.timescale,
            r.duration_secs(),
            t.sample_count(),
        );
        if let (Some(w), Some(h)) = (r.width, r.height) {
            print!(" {}x{}", w, h);
        }
        println!();

        println!("idx    start(s)   dur(ts)  size   offset      sync");
        println!("----------------------------------------------------");
        for s in selected_entries(t, args) {
            println!("{}", format_entry(s, r.timescale));
        }
        println!();
    }
}

fn format_entry(s: &SampleIndexEntry, timescale: u32) -> String {
    format!(
        "{:5} {:10.4} {:8} {:6} {:10} {}",
        s.index,
        seconds(s.decode_time, timescale),
        s.duration,
        s.size,
        s.byte_offset,
        if s.is_keyframe { "*" } else { "" },
    )
}

fn print_sample(reader: &Mp4Reader<SeekSource<std::fs::File>>, args: &Args) -> Result<()> {
    let track_id = match args.track_id {
        Some(id) => id,
        None => reader
            .video_track()
            .or_else(|| reader.tracks().next())
            .map(|t| t.id())
            .context("file has no indexed tracks")?,
    };

    let sample = match args.at {
        Some(secs) => reader.get_sample_at_time(track_id, secs)?,
        None => reader.get_sample(track_id, args.sample.unwrap_or(0))?,
    };
    let keyframe = reader.find_keyframe_before(track_id, sample.entry.index)?;

    if args.json {
        let encoded = reader.encoded_sample(track_id, sample.entry.index)?;
        let value = json!({
            "track_id": track_id,
            "entry": sample.entry,
            "keyframe_before": keyframe,
            "decoder": encoded,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        let timescale = reader.track(track_id)?.record.timescale;
        println!("Track {} sample {}", track_id, sample.entry.index);
        println!("{}", format_entry(&sample.entry, timescale));
        println!("decode from keyframe {}", keyframe);
    }

    if args.hex {
        print!("{}", hex_dump(&sample.data, sample.entry.byte_offset));
    }
    Ok(())
}
