use crate::audio::AudioSystem;
use crate::capability::probe_runtime;
use crate::config::{Config, RendererMode};
use crate::field::{DepthParams, DepthSurface, ParticleField, map_depths};
use crate::render::{
    AsciiRenderer, BrailleRenderer, Frame, HalfBlockRenderer, KittyRenderer, Renderer,
};
use crate::scene::PointProjector;
use crate::spectrum::BandEnergies;
use crate::terminal::TerminalGuard;
use crate::video::{FrameCache, FrameSource, RawClipSource, TestPatternSource};
use anyhow::Context;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use std::io::BufWriter;
use std::time::{Duration, Instant};

pub fn run(cfg: Config) -> anyhow::Result<()> {
    let probe = probe_runtime(cfg.renderer, cfg.auto_probe);
    let renderer_mode = probe.renderer;

    let mut source: Box<dyn FrameSource> = match &cfg.video {
        Some(path) => Box::new(
            RawClipSource::open(path, cfg.video_width, cfg.video_height)
                .with_context(|| format!("open video clip {}", path.display()))?,
        ),
        None => Box::new(TestPatternSource::new(cfg.video_width, cfg.video_height)),
    };
    let video_label = match &cfg.video {
        Some(path) => format!("{}", path.display()),
        None => "test-pattern".to_string(),
    };

    let audio = AudioSystem::new(cfg.fft_size, cfg.device.as_deref())
        .context("start audio capture")?;
    let sample_rate_hz = audio.sample_rate_hz;
    let shared_spectrum = audio.spectrum();

    let _term = TerminalGuard::new()?;
    let mut out = BufWriter::new(TerminalGuard::stdout());

    let mut renderer: Box<dyn Renderer> = match renderer_mode {
        RendererMode::Ascii => Box::new(AsciiRenderer::new()),
        RendererMode::HalfBlock => Box::new(HalfBlockRenderer::new()),
        RendererMode::Braille => Box::new(BrailleRenderer::new()),
        RendererMode::Kitty => Box::new(KittyRenderer::new()),
    };
    let (px_w_mul, px_h_mul) = match renderer_mode {
        RendererMode::Ascii => (1usize, 1usize),
        RendererMode::HalfBlock => (1, 2),
        // 2x4 pixels per cell; materially sharper than half-block.
        RendererMode::Braille | RendererMode::Kitty => (2, 4),
    };

    let mut last_size = crossterm::terminal::size().context("get terminal size")?;
    if last_size.1 < 2 || last_size.0 < 4 {
        return Err(anyhow::anyhow!(
            "terminal too small (need at least 4x2, got {}x{})",
            last_size.0,
            last_size.1
        ));
    }

    let mut params = DepthParams {
        density: cfg.density.max(1),
        threshold: cfg.threshold,
        far_z: cfg.far,
        gain: cfg.depth_gain,
    };

    let mut cache = FrameCache::new(&*source, cfg.mirror);
    // Created from the first frame's dimensions, then fixed for the session.
    let mut field: Option<ParticleField> = None;

    let mut projector = PointProjector::new(0, 0);
    let mut spectrum = Vec::new();

    let mut show_hud = true;
    let mut show_help = false;
    let mut muted = false;
    let mut frozen = false;

    let mut fps = FpsCounter::new();
    let mut tick = 0u64;

    loop {
        let now = Instant::now();

        // Drain input events (non-blocking).
        while event::poll(Duration::from_millis(0))? {
            match event::read()? {
                Event::Key(k) if k.kind != KeyEventKind::Release => {
                    if handle_key(
                        k.code,
                        k.modifiers,
                        &mut params,
                        &mut show_hud,
                        &mut show_help,
                        &mut muted,
                        &mut frozen,
                    ) {
                        return Ok(());
                    }
                }
                Event::Resize(c, r) => {
                    last_size = (c, r);
                }
                _ => {}
            }
        }

        // Resize events can be missed in some terminals.
        let sz = crossterm::terminal::size()?;
        if sz != last_size {
            last_size = sz;
        }

        let mut bands = BandEnergies::default();
        if !muted {
            shared_spectrum.load_into(&mut spectrum);
            bands = BandEnergies::sample(&spectrum, sample_rate_hz);
        }

        let frame_px = if frozen && cache.primed() {
            cache.cached()
        } else {
            cache.frame(&mut *source, tick)?
        };
        let field = field
            .get_or_insert_with(|| ParticleField::from_frame_size(frame_px.width, frame_px.height));

        map_depths(field, frame_px, bands, &params);

        let (term_cols, term_rows) = last_size;
        let hud = if show_hud {
            build_hud(
                term_cols as usize,
                bands,
                &params,
                field.particle_count(),
                fps.fps(),
                shared_spectrum.age_ms(),
                muted,
                frozen,
                &video_label,
                renderer.name(),
                probe.status_label().as_str(),
            )
        } else {
            String::new()
        };
        let hud_rows = hud_rows_for_text(term_rows, show_hud, &hud);
        let visual_rows = term_rows.saturating_sub(hud_rows).max(1);
        let w = (term_cols as usize).saturating_mul(px_w_mul);
        let h = (visual_rows as usize).saturating_mul(px_h_mul);
        if projector.size() != (w, h) {
            projector.resize(w, h);
        }

        let pixels = projector.project(field);
        field.take_dirty();

        let frame = Frame {
            term_cols,
            term_rows,
            visual_rows,
            pixel_width: w,
            pixel_height: h,
            pixels_rgba: pixels,
            hud: &hud,
            hud_rows,
            overlay: show_help.then(help_popup_text),
            sync_updates: cfg.sync_updates,
        };
        renderer.render(&frame, &mut out)?;

        fps.tick();
        tick = tick.wrapping_add(1);

        // Frame pacing.
        let target = Duration::from_secs_f32(1.0 / cfg.fps.max(1) as f32);
        let elapsed = now.elapsed();
        if elapsed < target {
            std::thread::sleep(target - elapsed);
        }
    }
}

fn handle_key(
    code: KeyCode,
    mods: KeyModifiers,
    params: &mut DepthParams,
    show_hud: &mut bool,
    show_help: &mut bool,
    muted: &mut bool,
    frozen: &mut bool,
) -> bool {
    if mods.contains(KeyModifiers::CONTROL) && matches!(code, KeyCode::Char('c')) {
        return true;
    }

    match code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => true,
        KeyCode::Up => {
            params.density = params.density.saturating_sub(1).max(1);
            false
        }
        KeyCode::Down => {
            params.density = (params.density + 1).min(16);
            false
        }
        KeyCode::Char('[') => {
            params.threshold = (params.threshold - 25.0).max(25.0);
            false
        }
        KeyCode::Char(']') => {
            params.threshold = (params.threshold + 25.0).min(600.0);
            false
        }
        KeyCode::Char('m') | KeyCode::Char('M') => {
            *muted = !*muted;
            false
        }
        KeyCode::Char(' ') => {
            *frozen = !*frozen;
            false
        }
        KeyCode::Char('i') | KeyCode::Char('I') => {
            *show_hud = !*show_hud;
            false
        }
        KeyCode::Char('?') | KeyCode::Char('/') | KeyCode::Char('h') | KeyCode::Char('H')
        | KeyCode::F(1) | KeyCode::Tab => {
            *show_help = !*show_help;
            false
        }
        _ => false,
    }
}

#[allow(clippy::too_many_arguments)]
fn build_hud(
    cols: usize,
    bands: BandEnergies,
    params: &DepthParams,
    particles: usize,
    fps: f32,
    audio_age_ms: f32,
    muted: bool,
    frozen: bool,
    video_label: &str,
    renderer_name: &str,
    probe_label: &str,
) -> String {
    let lines = vec![
        format!(
            "Bass: {:>4.2} | Mid: {:>4.2} | Treb: {:>4.2} | Density: {} | Thresh: {:>3.0} | Particles: {} | FPS: {:>4.1}",
            bands.bass, bands.mid, bands.treble, params.density, params.threshold, particles, fps,
        ),
        format!(
            "Audio: {}age {:>4.0}ms | Video: {}{} | Renderer: {} | Probe: {}",
            if muted { "muted, " } else { "" },
            audio_age_ms,
            video_label,
            if frozen { " (frozen)" } else { "" },
            renderer_name,
            probe_label,
        ),
        "Keys: up/down density | [/] threshold | m mute | space freeze | i HUD | ?/h help | q quit"
            .to_string(),
    ];

    let width = cols.max(1);
    let mut out = Vec::new();
    for line in &lines {
        out.extend(hard_wrap_line(line, width));
    }
    out.join("\n")
}

fn hard_wrap_line(line: &str, width: usize) -> Vec<String> {
    if line.is_empty() {
        return vec![String::new()];
    }

    let mut out = Vec::new();
    let mut cur = String::new();
    let mut cur_len = 0usize;
    for ch in line.chars() {
        cur.push(ch);
        cur_len += 1;
        if cur_len >= width {
            out.push(cur);
            cur = String::new();
            cur_len = 0;
        }
    }
    if !cur.is_empty() {
        out.push(cur);
    }
    if out.is_empty() {
        out.push(String::new());
    }
    out
}

fn hud_rows_for_text(term_rows: u16, show_hud: bool, hud: &str) -> u16 {
    if !show_hud {
        return 0;
    }
    let max_rows = term_rows.saturating_sub(1);
    let wanted = hud.lines().count() as u16;
    wanted.min(max_rows).min(4)
}

fn help_popup_text() -> &'static str {
    "pointwave hotkeys\n\
up/down  depth-map more/fewer particles (density stride)\n\
[ / ]  lower/raise the grayscale far-clip threshold\n\
m  mute audio (band energies drop to zero)\n\
space  freeze the video frame\n\
i  show/hide HUD\n\
? or / or h or F1 or tab  toggle this help\n\
q or esc  quit"
}

struct FpsCounter {
    last: Instant,
    frames: u32,
    fps: f32,
}

impl FpsCounter {
    fn new() -> Self {
        Self {
            last: Instant::now(),
            frames: 0,
            fps: 0.0,
        }
    }

    fn tick(&mut self) {
        self.frames += 1;
        let now = Instant::now();
        let dt = now.duration_since(self.last).as_secs_f32();
        if dt >= 0.5 {
            self.fps = (self.frames as f32) / dt;
            self.frames = 0;
            self.last = now;
        }
    }

    fn fps(&self) -> f32 {
        self.fps
    }
}
