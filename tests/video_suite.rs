use pointwave::video::{
    FrameCache, FrameSource, PixelFrame, RawClipSource, TestPatternSource, mirror_horizontal,
};
use std::path::PathBuf;

/// Source that stamps every pixel with its capture ordinal.
struct CountingSource {
    captures: u8,
}

impl FrameSource for CountingSource {
    fn size(&self) -> (usize, usize) {
        (2, 2)
    }

    fn capture_into(&mut self, frame: &mut PixelFrame) -> anyhow::Result<()> {
        if frame.width != 2 || frame.height != 2 {
            *frame = PixelFrame::new(2, 2);
        }
        self.captures += 1;
        frame.rgba.fill(self.captures);
        Ok(())
    }
}

fn temp_clip_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("pointwave-{}-{}", std::process::id(), name))
}

#[test]
fn cache_refreshes_on_even_ticks_and_reuses_on_odd() {
    let mut source = CountingSource { captures: 0 };
    let mut cache = FrameCache::new(&source, false);

    assert_eq!(cache.frame(&mut source, 0).unwrap().rgba[0], 1);
    assert_eq!(cache.frame(&mut source, 1).unwrap().rgba[0], 1, "odd tick reuses");
    assert_eq!(cache.frame(&mut source, 2).unwrap().rgba[0], 2, "even tick refreshes");
    assert_eq!(cache.frame(&mut source, 3).unwrap().rgba[0], 2);
    assert_eq!(source.captures, 2);
}

#[test]
fn cache_always_captures_the_first_request() {
    let mut source = CountingSource { captures: 0 };
    let mut cache = FrameCache::new(&source, false);
    assert!(!cache.primed());

    // First request lands on an odd tick; consumers must still get real data.
    assert_eq!(cache.frame(&mut source, 7).unwrap().rgba[0], 1);
    assert!(cache.primed());
}

#[test]
fn mirroring_reverses_each_row() {
    let mut frame = PixelFrame::new(3, 2);
    #[rustfmt::skip]
    frame.rgba.copy_from_slice(&[
        1, 1, 1, 255,  2, 2, 2, 255,  3, 3, 3, 255,
        4, 4, 4, 255,  5, 5, 5, 255,  6, 6, 6, 255,
    ]);
    mirror_horizontal(&mut frame);
    assert_eq!(frame.rgba[0], 3);
    assert_eq!(frame.rgba[4], 2);
    assert_eq!(frame.rgba[8], 1);
    assert_eq!(frame.rgba[12], 6);
    assert_eq!(frame.rgba[20], 4);
}

#[test]
fn test_pattern_produces_full_frames_that_change_over_time() {
    let mut source = TestPatternSource::new(24, 16);
    assert_eq!(source.size(), (24, 16));

    let mut a = PixelFrame::new(24, 16);
    let mut b = PixelFrame::new(24, 16);
    source.capture_into(&mut a).unwrap();
    source.capture_into(&mut b).unwrap();

    assert_eq!(a.pixel_count(), 24 * 16);
    assert_eq!(a.rgba.len(), 24 * 16 * 4);
    assert!(a.rgba.chunks_exact(4).all(|px| px[3] == 255));
    assert_ne!(a.rgba, b.rgba, "consecutive frames should differ");
}

#[test]
fn raw_clip_cycles_through_frames() {
    let path = temp_clip_path("cycle.rgba");
    let mut data = Vec::new();
    for v in [10u8, 20, 30] {
        data.extend(std::iter::repeat_n(v, 2 * 1 * 4));
    }
    std::fs::write(&path, &data).unwrap();

    let mut clip = RawClipSource::open(&path, 2, 1).unwrap();
    assert_eq!(clip.frame_count(), 3);

    let mut frame = PixelFrame::new(2, 1);
    for expected in [10u8, 20, 30, 10, 20] {
        clip.capture_into(&mut frame).unwrap();
        assert_eq!(frame.rgba[0], expected);
    }

    std::fs::remove_file(&path).ok();
}

#[test]
fn raw_clip_rejects_partial_frames() {
    let path = temp_clip_path("partial.rgba");
    std::fs::write(&path, vec![0u8; 2 * 1 * 4 + 3]).unwrap();
    assert!(RawClipSource::open(&path, 2, 1).is_err());

    std::fs::write(&path, Vec::<u8>::new()).unwrap();
    assert!(RawClipSource::open(&path, 2, 1).is_err(), "empty clip");
    assert!(RawClipSource::open(&path, 0, 1).is_err(), "zero dims");

    std::fs::remove_file(&path).ok();
}

#[test]
fn cache_applies_mirroring_at_capture_time() {
    struct Gradient;
    impl FrameSource for Gradient {
        fn size(&self) -> (usize, usize) {
            (3, 1)
        }
        fn capture_into(&mut self, frame: &mut PixelFrame) -> anyhow::Result<()> {
            if frame.width != 3 || frame.height != 1 {
                *frame = PixelFrame::new(3, 1);
            }
            for (x, px) in frame.rgba.chunks_exact_mut(4).enumerate() {
                px[0] = x as u8;
                px[3] = 255;
            }
            Ok(())
        }
    }

    let mut source = Gradient;
    let mut cache = FrameCache::new(&source, true);
    let frame = cache.frame(&mut source, 0).unwrap();
    assert_eq!(frame.rgba[0], 2, "mirrored row starts with the last pixel");
    assert_eq!(frame.rgba[8], 0);
}
