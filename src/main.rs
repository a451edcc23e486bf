use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use log::{info, LevelFilter};

use gif_frames::Gif;

mod ppm_writer;

/// Decodes a GIF file and prints what it contains.
#[derive(Parser, Debug)]
#[clap(version, about)]
struct Args {
    /// GIF file to decode
    file: PathBuf,

    /// Log verbosity, repeat for per-code lzw logs
    #[clap(short, long, parse(from_occurrences))]
    verbose: u8,

    /// Write every frame as frame_<n>.ppm into this directory
    #[clap(long, value_name = "DIR")]
    dump: Option<PathBuf>,

    /// Treat every frame as interlaced when dumping
    #[clap(long)]
    force_interlace: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_module("gif_frames", level)
        .parse_default_env()
        .init();

    let gif = gif_frames::decode_file(&args.file)
        .with_context(|| format!("failed to decode {}", args.file.display()))?;

    print_summary(&args, &gif);

    if let Some(dir) = &args.dump {
        dump_frames(dir, &gif, args.force_interlace)?;
    }

    Ok(())
}

fn print_summary(args: &Args, gif: &Gif) {
    let screen = &gif.screen;
    println!(
        "{}: GIF{}, {}x{} px, {} bpp, {} global color table entries, sorted: {}, background index: {}",
        args.file.display(),
        gif.version,
        screen.screen_width,
        screen.screen_height,
        (u32::from(screen.color_resolution) + 1) * 3,
        gif.global_color_table.len(),
        screen.sort_flag,
        screen.background_color_index,
    );

    println!("Frame Info:");
    for (i, frame) in gif.frames.iter().enumerate() {
        println!("Frame {i}:");
        println!("\tTime on Screen: {}ms", frame.delay_ms);
        println!("\tClear Screen: {}", frame.clear_to_background);
        println!("\tWidth: {} Height: {}", frame.width, frame.height);
        println!("\tLeft: {} Top: {}", frame.left, frame.top);
        println!("\tInterlaced: {}", frame.interlaced);
        if frame.local_color_table.is_some() {
            println!("\tLocal color table present (not used for colors)");
        }
    }
}

fn dump_frames(dir: &Path, gif: &Gif, force_interlace: bool) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;

    for (i, frame) in gif.frames.iter().enumerate() {
        let indices = frame.display_indices_as(frame.interlaced || force_interlace);
        let pixels = indices
            .iter()
            .map(|&index| gif.global_color_table.get(index))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| anyhow!("frame {i} uses an index outside the global color table"))?;

        let path = dir.join(format!("frame_{i}.ppm"));
        ppm_writer::save_ppm(&path, frame.width, frame.height, &pixels)?;
        info!("wrote {}", path.display());
    }

    Ok(())
}
