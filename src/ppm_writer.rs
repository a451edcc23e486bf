use std::fs::File;
use std::io::{prelude::*, BufWriter};
use std::path::Path;

use anyhow::{ensure, Context, Result};
use gif_frames::Rgb;

const MAGIC_NUMBER: &[u8] = b"P3";

/// Writes `pixels` (row-major, top to bottom) as a plain text PPM.
pub fn write_ppm<W: Write>(writer: &mut W, width: u16, height: u16, pixels: &[Rgb]) -> Result<()> {
    let width = usize::from(width);
    ensure!(
        pixels.len() == width * usize::from(height),
        "expected {} pixels for a {width}x{height} image, got {}",
        width * usize::from(height),
        pixels.len()
    );

    writer.write_all(MAGIC_NUMBER)?;
    writer.write_all(b"\n")?;
    writer.write_all(format!("{} {}", width, height).as_bytes())?;
    writer.write_all(b" 255")?;
    writer.write_all(b"\n")?;

    if width == 0 {
        return Ok(());
    }

    for pixel_row in pixels.chunks(width) {
        let line = pixel_row
            .iter()
            .map(|Rgb { r, g, b }| format!("{: >3} {: >3} {: >3}", r, g, b))
            .collect::<Vec<_>>()
            .join(" ");
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
    }

    Ok(())
}

pub fn save_ppm(path: &Path, width: u16, height: u16, pixels: &[Rgb]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    write_ppm(&mut writer, width, height, pixels)?;
    writer.flush()?;
    Ok(())
}
