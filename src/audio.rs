use anyhow::{Context, anyhow};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Sample, SampleFormat};
use ringbuf::HeapRb;
use ringbuf::traits::{Consumer as _, Producer as _, Split as _};
use rustfft::FftPlanner;
use rustfft::num_complex::Complex;
use std::f32::consts::PI;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

// Analyser-style magnitude-to-byte mapping: smoothed magnitudes are taken to
// dB and scaled so [-100, -30] dB covers the byte range.
const MIN_DECIBELS: f32 = -100.0;
const MAX_DECIBELS: f32 = -30.0;
const SMOOTHING: f32 = 0.8;

struct SpectrumInner {
    bytes: Vec<u8>,
    updated_ms: u64,
}

/// Latest byte spectrum snapshot, shared between the analyzer thread and the
/// render loop. One writer, one reader; a frame-sized copy under a mutex is
/// cheap at render cadence.
pub struct SharedSpectrum {
    inner: Mutex<SpectrumInner>,
}

impl SharedSpectrum {
    pub fn new(len: usize) -> Self {
        Self {
            inner: Mutex::new(SpectrumInner {
                bytes: vec![0; len],
                updated_ms: 0,
            }),
        }
    }

    pub fn store(&self, bytes: &[u8]) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.bytes.clear();
        inner.bytes.extend_from_slice(bytes);
        inner.updated_ms = now_ms();
    }

    /// Copy the snapshot into `out`, resizing it to the spectrum length.
    pub fn load_into(&self, out: &mut Vec<u8>) {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        out.clear();
        out.extend_from_slice(&inner.bytes);
    }

    pub fn age_ms(&self) -> f32 {
        let t = self
            .inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .updated_ms;
        if t == 0 {
            return 0.0;
        }
        now_ms().saturating_sub(t) as f32
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_millis(0))
        .as_millis() as u64
}

pub fn list_input_devices() -> anyhow::Result<()> {
    let host = cpal::default_host();
    let devices = host.input_devices().context("enumerate input devices")?;

    let mut out = io::stdout();
    writeln!(out, "Input devices:")?;
    for dev in devices {
        let name = dev.name().unwrap_or_else(|_| "<unknown>".to_string());
        writeln!(out, "  - {}", name)?;
    }
    Ok(())
}

pub struct AudioSystem {
    _stream: cpal::Stream,
    stop: Arc<AtomicBool>,
    analyzer_handle: Option<thread::JoinHandle<()>>,
    spectrum: Arc<SharedSpectrum>,
    pub sample_rate_hz: u32,
}

impl AudioSystem {
    pub fn new(fft_size: usize, device_query: Option<&str>) -> anyhow::Result<Self> {
        if !fft_size.is_power_of_two() || !(32..=32_768).contains(&fft_size) {
            return Err(anyhow!(
                "fft size must be a power of two in 32..=32768, got {fft_size}"
            ));
        }

        let host = cpal::default_host();
        let device = select_input_device(&host, device_query)?;
        let supported = device
            .default_input_config()
            .context("get default input config")?;
        let sample_rate_hz = supported.sample_rate().0;
        let channels = supported.channels() as usize;
        let config: cpal::StreamConfig = supported.clone().into();

        let rb_capacity = (sample_rate_hz as usize).saturating_mul(4);
        let rb = HeapRb::<f32>::new(rb_capacity);
        let (mut prod, mut cons) = rb.split();

        let stop = Arc::new(AtomicBool::new(false));
        let spectrum = Arc::new(SharedSpectrum::new(fft_size / 2));
        let spectrum_for_thread = Arc::clone(&spectrum);
        let stop_for_thread = Arc::clone(&stop);

        let err_fn = |err| eprintln!("audio stream error: {err}");

        let stream = match supported.sample_format() {
            SampleFormat::F32 => device.build_input_stream(
                &config,
                move |data: &[f32], _| push_interleaved(data, channels, &mut prod),
                err_fn,
                None,
            )?,
            SampleFormat::I16 => device.build_input_stream(
                &config,
                move |data: &[i16], _| push_interleaved(data, channels, &mut prod),
                err_fn,
                None,
            )?,
            SampleFormat::U16 => device.build_input_stream(
                &config,
                move |data: &[u16], _| push_interleaved(data, channels, &mut prod),
                err_fn,
                None,
            )?,
            fmt => return Err(anyhow!("unsupported sample format: {fmt:?}")),
        };

        stream.play().context("start input stream")?;

        let analyzer_handle = thread::spawn(move || {
            analyze_loop(&mut cons, fft_size, &stop_for_thread, &spectrum_for_thread)
        });

        Ok(Self {
            _stream: stream,
            stop,
            analyzer_handle: Some(analyzer_handle),
            spectrum,
            sample_rate_hz,
        })
    }

    pub fn spectrum(&self) -> Arc<SharedSpectrum> {
        Arc::clone(&self.spectrum)
    }
}

impl Drop for AudioSystem {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(h) = self.analyzer_handle.take() {
            let _ = h.join();
        }
    }
}

fn select_input_device(
    host: &cpal::Host,
    device_query: Option<&str>,
) -> anyhow::Result<cpal::Device> {
    let devices = host
        .input_devices()
        .context("enumerate input devices")?
        .collect::<Vec<_>>();

    let want = device_query.map(|s| s.to_lowercase());
    if let Some(want) = want.as_deref() {
        if let Some(dev) = devices.iter().find(|d| {
            d.name()
                .map(|n| n.to_lowercase().contains(want))
                .unwrap_or(false)
        }) {
            return Ok(dev.clone());
        }
        return Err(anyhow!("no input device matching: {want}"));
    }

    host.default_input_device()
        .ok_or_else(|| anyhow!("no default input device found"))
}

fn push_interleaved<T: Sample<Float = f32> + Copy>(
    data: &[T],
    channels: usize,
    prod: &mut ringbuf::HeapProd<f32>,
) {
    for frame in data.chunks(channels) {
        let mut acc = 0.0f32;
        for s in frame {
            acc += (*s).to_float_sample();
        }
        let mono = acc / channels as f32;
        let _ = prod.try_push(mono);
    }
}

fn analyze_loop(
    cons: &mut ringbuf::HeapCons<f32>,
    fft_size: usize,
    stop: &AtomicBool,
    spectrum: &SharedSpectrum,
) {
    let n = fft_size;
    let hop = n / 4;

    let mut scratch = vec![0.0f32; n];
    let mut write_pos = 0usize;
    let mut filled = 0usize;
    let mut since_last = 0usize;

    let hann = (0..n)
        .map(|i| 0.5 - 0.5 * ((2.0 * PI * i as f32) / (n as f32)).cos())
        .collect::<Vec<_>>();

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(n);
    let mut fft_buf = vec![Complex { re: 0.0, im: 0.0 }; n];
    let mut smoothed = vec![0.0f32; n / 2];
    let mut bytes = vec![0u8; n / 2];

    while !stop.load(Ordering::Relaxed) {
        let mut got_any = false;
        while let Some(s) = cons.try_pop() {
            got_any = true;
            scratch[write_pos] = s;
            write_pos = (write_pos + 1) % n;
            if filled < n {
                filled += 1;
            }
            since_last += 1;
            if filled == n && since_last >= hop {
                since_last = 0;
                analyze_window(&scratch, write_pos, &hann, &fft, &mut fft_buf, &mut smoothed);
                quantize_spectrum(&smoothed, &mut bytes);
                spectrum.store(&bytes);
            }
        }

        if !got_any {
            thread::sleep(Duration::from_millis(1));
        }
    }
}

fn analyze_window(
    scratch: &[f32],
    write_pos: usize,
    hann: &[f32],
    fft: &std::sync::Arc<dyn rustfft::Fft<f32>>,
    fft_buf: &mut [Complex<f32>],
    smoothed: &mut [f32],
) {
    let n = fft_buf.len();

    for i in 0..n {
        let s = scratch[(write_pos + i) % n];
        fft_buf[i].re = s * hann[i];
        fft_buf[i].im = 0.0;
    }

    fft.process(fft_buf);

    // Smooth normalized magnitudes across windows before the dB conversion
    // so the byte spectrum holds still at render cadence.
    for (i, c) in fft_buf.iter().take(smoothed.len()).enumerate() {
        let mag = (c.re * c.re + c.im * c.im).sqrt() / n as f32;
        smoothed[i] = smoothed[i] * SMOOTHING + mag * (1.0 - SMOOTHING);
    }
}

pub(crate) fn quantize_spectrum(smoothed: &[f32], bytes: &mut [u8]) {
    let span = MAX_DECIBELS - MIN_DECIBELS;
    for (b, &m) in bytes.iter_mut().zip(smoothed) {
        let db = 20.0 * m.max(1e-12).log10();
        let v = (db - MIN_DECIBELS) / span * 255.0;
        *b = v.clamp(0.0, 255.0) as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::quantize_spectrum;

    #[test]
    fn quantize_is_monotone_and_clamped() {
        let mags = [0.0f32, 1e-6, 1e-4, 1e-2, 0.5, 10.0];
        let mut bytes = vec![0u8; mags.len()];
        quantize_spectrum(&mags, &mut bytes);
        for pair in bytes.windows(2) {
            assert!(pair[0] <= pair[1], "quantization must be monotone: {bytes:?}");
        }
        assert_eq!(bytes[0], 0, "silence maps to 0");
        assert_eq!(bytes[5], 255, "loud magnitudes clamp to 255");
    }
}
