use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "pointwave",
    version,
    about = "Audio-reactive camera point-cloud visualizer for the terminal"
)]
pub struct Config {
    #[arg(long, value_enum, default_value_t = RendererMode::HalfBlock)]
    pub renderer: RendererMode,

    #[arg(long, default_value_t = 60)]
    pub fps: u32,

    /// Pick the audio input device by case-insensitive substring.
    #[arg(long)]
    pub device: Option<String>,

    #[arg(long, default_value_t = false)]
    pub list_devices: bool,

    /// Headerless RGBA clip to play instead of the built-in test pattern.
    #[arg(long)]
    pub video: Option<PathBuf>,

    #[arg(long, default_value_t = 160)]
    pub video_width: usize,

    #[arg(long, default_value_t = 120)]
    pub video_height: usize,

    /// Depth-modulate every Nth particle; the rest park on the far plane.
    #[arg(long, default_value_t = 2)]
    pub density: usize,

    /// Grayscale far-clip threshold. Values above 255 leave the clip branch
    /// idle, which matches the inherited behavior.
    #[arg(long, default_value_t = 300.0)]
    pub threshold: f32,

    /// Far sentinel depth (camera far-plane distance).
    #[arg(long, default_value_t = 10_000.0)]
    pub far: f32,

    #[arg(long, default_value_t = 5.0)]
    pub depth_gain: f32,

    /// Transform window; the spectrum holds fft_size / 2 byte magnitudes.
    #[arg(long, default_value_t = crate::spectrum::DEFAULT_FFT_SIZE)]
    pub fft_size: usize,

    /// Mirror frames horizontally, like a front camera.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub mirror: bool,

    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub sync_updates: bool,

    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub auto_probe: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RendererMode {
    #[value(alias = "ansi", alias = "text")]
    Ascii,
    #[value(name = "half-block", alias = "halfblock", alias = "half_block", alias = "hb")]
    HalfBlock,
    #[value(alias = "hires", alias = "dots")]
    Braille,
    Kitty,
}
