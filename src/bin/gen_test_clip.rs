//! Writes a deterministic headerless RGBA clip for `--video` playback:
//! a bright bar sweeping over a gray ramp, one sweep per loop.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "gen_test_clip", version, about = "Generate a raw RGBA test clip")]
struct Args {
    #[arg(long, default_value = "test_clip.rgba")]
    out: PathBuf,

    #[arg(long, default_value_t = 160)]
    width: usize,

    #[arg(long, default_value_t = 120)]
    height: usize,

    #[arg(long, default_value_t = 90)]
    frames: usize,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let (w, h) = (args.width.max(1), args.height.max(1));
    let frames = args.frames.max(1);

    let mut data = Vec::with_capacity(frames * w * h * 4);
    for f in 0..frames {
        let bar_x = (f * w) / frames;
        let bar_half = (w / 12).max(1);
        for y in 0..h {
            for x in 0..w {
                let ramp = (y * 160 / h.max(1)) as u8;
                let dist = x.abs_diff(bar_x);
                let bar = if dist < bar_half {
                    (220 - (dist * 220 / bar_half)) as u8
                } else {
                    0
                };
                let v = ramp.saturating_add(bar);
                data.extend_from_slice(&[v, v, v.saturating_add(10), 255]);
            }
        }
    }

    std::fs::write(&args.out, &data)
        .with_context(|| format!("write clip {}", args.out.display()))?;
    println!(
        "wrote {} ({} frames, {}x{}, {} bytes)",
        args.out.display(),
        frames,
        w,
        h,
        data.len()
    );
    Ok(())
}
