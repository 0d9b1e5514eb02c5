// Per-frame presentation tests
//
// Stage order, stage-tagged failures and pixel-exact output through the
// software renderer.

mod common;

use common::{Call, Faults, RecordingBackend};
use crt_pipeline::display::pipeline::{resource, stage};
use crt_pipeline::display::{Color, Palette, Pipeline, RenderBackend, Resolution, SoftwareBackend};
use crt_pipeline::{VideoConfig, VideoError};

fn gray(level: u8) -> u32 {
    Color::rgb(level, level, level).to_argb()
}

#[test]
fn test_stage_order() {
    let (backend, log) = RecordingBackend::new(Resolution::new(1920, 1080));
    let mut pipeline = Pipeline::init(backend, &VideoConfig::default()).unwrap();
    log.borrow_mut().clear();

    pipeline.present_frame().unwrap();

    assert_eq!(
        *log.borrow(),
        vec![
            Call::Update(resource::INTERMEDIATE),
            Call::SetTarget(Some(resource::CRT)),
            Call::Clear,
            Call::Copy(resource::INTERMEDIATE),
            Call::SetTarget(Some(resource::SCREEN)),
            Call::Clear,
            Call::Copy(resource::CRT),
            Call::SetTarget(None),
            Call::Clear,
            Call::Copy(resource::SCREEN),
            Call::Present,
        ]
    );
    assert_eq!(pipeline.backend().inner().frames_presented(), 1);
}

#[test]
fn test_failures_name_their_stage() {
    let cases: [(Faults, &str); 5] = [
        (
            Faults {
                update: true,
                ..Faults::default()
            },
            stage::UPLOAD,
        ),
        (
            Faults {
                copy_from: Some(resource::INTERMEDIATE),
                ..Faults::default()
            },
            stage::ASPECT,
        ),
        (
            Faults {
                copy_from: Some(resource::CRT),
                ..Faults::default()
            },
            stage::UPSCALE,
        ),
        (
            Faults {
                copy_from: Some(resource::SCREEN),
                ..Faults::default()
            },
            stage::OUTPUT,
        ),
        (
            Faults {
                present: true,
                ..Faults::default()
            },
            stage::PRESENT,
        ),
    ];

    for (faults, expected_stage) in cases {
        let (backend, _log) = RecordingBackend::new(Resolution::new(1920, 1080));
        let mut pipeline =
            Pipeline::init(backend.with_faults(faults), &VideoConfig::default()).unwrap();

        match pipeline.present_frame() {
            Err(VideoError::FrameRender { stage, source }) => {
                assert_eq!(stage, expected_stage);
                assert!(source.to_string().contains("injected"));
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(()) => panic!("frame should fail during {expected_stage}"),
        }
    }
}

#[test]
fn test_grayscale_identity_round_trip() {
    let backend = SoftwareBackend::new(Resolution::new(640, 480));
    let mut pipeline = Pipeline::init(backend, &VideoConfig::default()).unwrap();
    pipeline.set_palette(Palette::grayscale().colors());

    for level in [0u8, 1, 127, 200, 255] {
        pipeline.logical_mut().clear(level);
        pipeline.present_frame().unwrap();

        assert!(pipeline
            .direct_color()
            .pixels()
            .iter()
            .all(|&p| p == gray(level)));
        assert!(pipeline
            .backend()
            .output_pixels()
            .iter()
            .all(|&p| p == gray(level)));
    }
}

#[test]
fn test_palette_change_takes_effect_next_frame() {
    let backend = SoftwareBackend::new(Resolution::new(640, 480));
    let mut pipeline = Pipeline::init(backend, &VideoConfig::default()).unwrap();
    pipeline.logical_mut().clear(7);

    pipeline.present_frame().unwrap();
    assert_eq!(pipeline.backend().output_pixel(320, 240), 0xFFFF_FFFF);

    let mut colors = [Color::BLACK; 256];
    colors[7] = Color::rgb(0x12, 0x34, 0x56);
    pipeline.set_palette(&colors);
    pipeline.present_frame().unwrap();
    assert_eq!(pipeline.backend().output_pixel(320, 240), 0xFF12_3456);
}

#[test]
fn test_full_hd_output_has_no_seams() {
    let backend = SoftwareBackend::new(Resolution::new(1920, 1080));
    let mut pipeline = Pipeline::init(backend, &VideoConfig::default()).unwrap();
    pipeline.set_palette(Palette::grayscale().colors());

    let logical = pipeline.logical_mut();
    for y in 0..400 {
        for x in 0..640 {
            logical.set_pixel(x, y, ((x + 3 * y) % 256) as u8);
        }
    }
    pipeline.present_frame().unwrap();
    assert_eq!(pipeline.screen_resolution(), Resolution::new(1920, 1440));

    let backend = pipeline.backend();
    let crt = backend
        .texture_pixels(pipeline.crt_texture().unwrap())
        .unwrap();
    let screen = backend
        .texture_pixels(pipeline.screen_texture().unwrap())
        .unwrap();

    // CRT: every logical row shows up once or twice, in order, full width
    let direct = pipeline.direct_color();
    let mut logical_row = 0usize;
    for crt_row in crt.chunks_exact(640) {
        let current = &direct.pixels()[logical_row * 640..(logical_row + 1) * 640];
        if crt_row != current {
            logical_row += 1;
            assert_eq!(
                crt_row,
                &direct.pixels()[logical_row * 640..(logical_row + 1) * 640]
            );
        }
    }
    assert_eq!(logical_row, 399);

    // Screen: exact 3x3 replication of the CRT texture
    for y in 0..1440usize {
        for x in 0..1920usize {
            assert_eq!(screen[y * 1920 + x], crt[(y / 3) * 640 + x / 3], "at {x},{y}");
        }
    }

    // Output: widths match, so each screen column lands on exactly one output column
    let first_row: Vec<u32> = (0..1920).map(|x| backend.output_pixel(x, 0)).collect();
    assert_eq!(first_row.as_slice(), &screen[..1920]);
}

#[test]
fn test_output_smaller_than_screen_is_filtered() {
    // 1920x1440 screen texture shown on a 1920x1080 output
    let backend = SoftwareBackend::new(Resolution::new(1920, 1080));
    let mut pipeline = Pipeline::init(backend, &VideoConfig::default()).unwrap();
    pipeline.set_palette(Palette::grayscale().colors());

    let logical = pipeline.logical_mut();
    for y in 0..400 {
        for x in 0..640 {
            logical.set_pixel(x, y, (y * 255 / 399) as u8);
        }
    }
    pipeline.present_frame().unwrap();

    let backend = pipeline.backend();
    let column: Vec<u32> = (0..1080).map(|y| backend.output_pixel(960, y)).collect();
    assert_eq!(column[0], gray(0));
    assert_eq!(column[1079], gray(255));
    // A vertical gradient stays monotonic through every stage
    assert!(column.windows(2).all(|w| (w[0] & 0xFF) <= (w[1] & 0xFF)));
    assert_eq!(backend.output_size(), Resolution::new(1920, 1080));
}
