use crate::render::{Frame, Renderer, draw_overlay_popup};
use anyhow::Context;
use base64::Engine;
use std::fs;
use std::io::Write;

const CHUNK: usize = 4096;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum KittyTransport {
    File,
    Direct,
}

/// Kitty graphics-protocol renderer: ships the RGBA buffer either through a
/// temp file (same machine, fewer escape bytes) or inline base64 chunks.
pub struct KittyRenderer {
    image_id: u32,
    transport: KittyTransport,
    temp_path: String,
    temp_payload_b64: String,
    b64_buf: String,
    overlay_visible_last: bool,
}

impl KittyRenderer {
    pub fn new() -> Self {
        let pid = std::process::id();
        let temp_path = format!("/tmp/pw-{pid}.rgba");
        let temp_payload_b64 =
            base64::engine::general_purpose::STANDARD.encode(temp_path.as_bytes());

        Self {
            image_id: 1,
            transport: pick_transport(),
            temp_path,
            temp_payload_b64,
            b64_buf: String::new(),
            overlay_visible_last: false,
        }
    }
}

fn pick_transport() -> KittyTransport {
    // Remote sessions cannot read our temp file; fall back to inline chunks.
    if std::env::var_os("SSH_CONNECTION").is_some() || std::env::var_os("SSH_TTY").is_some() {
        KittyTransport::Direct
    } else {
        KittyTransport::File
    }
}

impl Renderer for KittyRenderer {
    fn name(&self) -> &'static str {
        "kitty"
    }

    fn render(&mut self, frame: &Frame<'_>, out: &mut dyn Write) -> anyhow::Result<()> {
        let cols = frame.term_cols as usize;
        let visual_rows = frame.visual_rows as usize;
        let w = frame.pixel_width;
        let h = frame.pixel_height;
        if cols == 0 || visual_rows == 0 || w == 0 || h == 0 {
            return Ok(());
        }
        if frame.pixels_rgba.len() < w * h * 4 {
            return Ok(());
        }

        if frame.sync_updates {
            out.write_all(b"\x1b[?2026h")?;
        }
        out.write_all(b"\x1b[H\x1b[0m")?;

        // Alternate image ids so the replaced placement never flickers.
        self.image_id = if self.image_id == 1 { 2 } else { 1 };
        let id = self.image_id;

        match self.transport {
            KittyTransport::File => {
                fs::write(self.temp_path.as_str(), frame.pixels_rgba)
                    .with_context(|| format!("write kitty temp file {}", self.temp_path))?;
                write!(
                    out,
                    "\x1b_Ga=T,f=32,s={w},v={h},t=f,i={id},p=1,c={cols},r={visual_rows},C=1,q=2;{}\x1b\\",
                    self.temp_payload_b64
                )?;
            }
            KittyTransport::Direct => {
                self.b64_buf.clear();
                base64::engine::general_purpose::STANDARD
                    .encode_string(frame.pixels_rgba, &mut self.b64_buf);
                let payload = self.b64_buf.as_bytes();
                let mut first = true;
                let mut rest = payload;
                while !rest.is_empty() {
                    let take = rest.len().min(CHUNK);
                    let (chunk, tail) = rest.split_at(take);
                    let more = if tail.is_empty() { 0 } else { 1 };
                    if first {
                        write!(
                            out,
                            "\x1b_Ga=T,f=32,s={w},v={h},i={id},p=1,c={cols},r={visual_rows},C=1,q=2,m={more};"
                        )?;
                        first = false;
                    } else {
                        write!(out, "\x1b_Gm={more};")?;
                    }
                    out.write_all(chunk)?;
                    out.write_all(b"\x1b\\")?;
                }
            }
        }

        // Drop the previous frame's image after the new placement exists.
        let old = if id == 1 { 2 } else { 1 };
        write!(out, "\x1b_Ga=d,d=I,i={old},q=2;\x1b\\")?;

        let mut hud_lines = frame.hud.lines();
        for i in 0..(frame.hud_rows as usize) {
            write!(out, "\x1b[{};1H\x1b[0m\x1b[2K", visual_rows + i + 1)?;
            if let Some(mut line) = hud_lines.next() {
                if line.len() > cols {
                    line = &line[..cols];
                }
                write!(out, "{line}")?;
            }
        }

        let overlay_visible = frame.overlay.is_some();
        if let Some(text) = frame.overlay {
            draw_overlay_popup(out, frame.term_cols, frame.term_rows, text)?;
        } else if self.overlay_visible_last {
            // The popup painted over the image region; force a clean repaint.
            out.write_all(b"\x1b[2J")?;
        }
        self.overlay_visible_last = overlay_visible;

        if frame.sync_updates {
            out.write_all(b"\x1b[?2026l")?;
        }
        out.flush()?;
        Ok(())
    }
}

impl Drop for KittyRenderer {
    fn drop(&mut self) {
        let _ = fs::remove_file(self.temp_path.as_str());
    }
}
