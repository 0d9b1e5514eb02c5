// Pipeline lifecycle tests
//
// Creation order, teardown on partial failure, idempotent destroy and
// screen texture recreation on resize.

mod common;

use common::{created, destroyed, Call, Faults, RecordingBackend};
use crt_pipeline::display::pipeline::resource;
use crt_pipeline::display::{Pipeline, Resolution, SoftwareBackend, TextureLimits, UpscaleFactor};
use crt_pipeline::{VideoConfig, VideoError};

const FULL_HD: Resolution = Resolution::new(1920, 1080);

#[test]
fn test_textures_created_in_order() {
    let (backend, log) = RecordingBackend::new(FULL_HD);
    let _pipeline = Pipeline::init(backend, &VideoConfig::default()).unwrap();

    let creates: Vec<Call> = log
        .borrow()
        .iter()
        .filter(|call| matches!(call, Call::Create { .. }))
        .cloned()
        .collect();
    assert_eq!(
        creates,
        vec![
            Call::Create {
                label: resource::INTERMEDIATE,
                size: Resolution::new(640, 400),
            },
            Call::Create {
                label: resource::CRT,
                size: Resolution::new(640, 480),
            },
            Call::Create {
                label: resource::SCREEN,
                size: Resolution::new(1920, 1440),
            },
        ]
    );
}

#[test]
fn test_drop_releases_in_reverse_order() {
    let (backend, log) = RecordingBackend::new(FULL_HD);
    let pipeline = Pipeline::init(backend, &VideoConfig::default()).unwrap();
    drop(pipeline);

    assert_eq!(
        destroyed(&log),
        vec![resource::SCREEN, resource::CRT, resource::INTERMEDIATE]
    );
}

#[test]
fn test_destroy_twice_releases_once() {
    let (backend, log) = RecordingBackend::new(FULL_HD);
    let mut pipeline = Pipeline::init(backend, &VideoConfig::default()).unwrap();

    pipeline.destroy();
    pipeline.destroy();
    assert_eq!(pipeline.backend().inner().live_textures(), 0);
    drop(pipeline);

    assert_eq!(destroyed(&log).len(), 3);
}

#[test]
fn test_failed_init_releases_created_textures() {
    let cases = [
        (resource::INTERMEDIATE, vec![]),
        (resource::CRT, vec![resource::INTERMEDIATE]),
        (resource::SCREEN, vec![resource::CRT, resource::INTERMEDIATE]),
    ];

    for (failing, expected_destroyed) in cases {
        let (backend, log) = RecordingBackend::new(FULL_HD);
        let backend = backend.with_faults(Faults {
            create: Some(failing),
            ..Faults::default()
        });

        let err = Pipeline::init(backend, &VideoConfig::default())
            .err()
            .expect("init should fail");
        match err {
            VideoError::ResourceCreation { resource, .. } => assert_eq!(resource, failing),
            other => panic!("unexpected error: {other}"),
        }

        assert_eq!(destroyed(&log), expected_destroyed, "failing {failing}");
        assert_eq!(created(&log).len(), expected_destroyed.len());
    }
}

#[test]
fn test_hardware_smaller_than_crt_is_unsatisfiable() {
    // Wide enough for the logical buffer, too short for the 480-line CRT
    let software =
        SoftwareBackend::new(FULL_HD).with_texture_limits(TextureLimits::new(4096, 450));
    let (backend, log) = RecordingBackend::wrap(software);

    let err = Pipeline::init(backend, &VideoConfig::default())
        .err()
        .expect("init should fail");
    assert!(matches!(
        err,
        VideoError::UnsatisfiableUpscale {
            max_width: 4096,
            max_height: 450,
            crt_width: 640,
            crt_height: 480,
        }
    ));
    assert!(err.to_string().contains("4096x450"));
    assert!(created(&log).is_empty());
}

#[test]
fn test_hardware_limits_clamp_screen_texture() {
    let software = SoftwareBackend::new(Resolution::new(3840, 2160))
        .with_texture_limits(TextureLimits::new(2048, 2048));
    let (backend, _log) = RecordingBackend::wrap(software);
    let config = VideoConfig::default().with_pixel_budget(u64::MAX);

    let pipeline = Pipeline::init(backend, &config).unwrap();
    assert_eq!(pipeline.upscale_factor(), UpscaleFactor::new(3, 4));
    assert_eq!(pipeline.screen_resolution(), Resolution::new(1920, 1920));
}

#[test]
fn test_resize_recreates_only_screen_texture() {
    let (backend, log) = RecordingBackend::new(Resolution::new(640, 480));
    let mut pipeline = Pipeline::init(backend, &VideoConfig::default()).unwrap();
    assert_eq!(pipeline.upscale_factor(), UpscaleFactor::ONE);
    log.borrow_mut().clear();

    assert!(pipeline.handle_resize(FULL_HD).unwrap());
    assert_eq!(pipeline.upscale_factor(), UpscaleFactor::new(3, 3));
    assert_eq!(
        *log.borrow(),
        vec![
            Call::ResizeOutput(FULL_HD),
            Call::Destroy(resource::SCREEN),
            Call::Create {
                label: resource::SCREEN,
                size: Resolution::new(1920, 1440),
            },
        ]
    );
    assert_eq!(pipeline.backend().inner().live_textures(), 3);
}

#[test]
fn test_resize_with_same_factor_keeps_screen_texture() {
    let (backend, log) = RecordingBackend::new(FULL_HD);
    let mut pipeline = Pipeline::init(backend, &VideoConfig::default()).unwrap();
    log.borrow_mut().clear();

    // Still rounds up to 3x3
    assert!(!pipeline.handle_resize(Resolution::new(1900, 1070)).unwrap());
    assert_eq!(*log.borrow(), vec![Call::ResizeOutput(Resolution::new(1900, 1070))]);
}

#[test]
fn test_pixel_budget_limits_screen_texture() {
    let (backend, _log) = RecordingBackend::new(Resolution::new(3840, 2160));
    let pipeline = Pipeline::init(backend, &VideoConfig::default()).unwrap();

    let screen = pipeline.screen_resolution();
    assert!(screen.pixels() <= VideoConfig::default().pixel_budget);
    assert_eq!(screen.width % 640, 0);
    assert_eq!(screen.height % 480, 0);
}

#[test]
fn test_fullscreen_toggle_goes_through_resize() {
    let software = SoftwareBackend::new(Resolution::new(1280, 960))
        .with_display_size(Resolution::new(2560, 1440));
    let (backend, log) = RecordingBackend::wrap(software);
    let mut pipeline = Pipeline::init(backend, &VideoConfig::default()).unwrap();
    assert_eq!(pipeline.upscale_factor(), UpscaleFactor::new(2, 2));
    log.borrow_mut().clear();

    pipeline.set_fullscreen(true).unwrap();
    assert_eq!(pipeline.upscale_factor(), UpscaleFactor::new(3, 3));
    assert_eq!(log.borrow()[0], Call::SetFullscreen(true));
    assert_eq!(destroyed(&log), vec![resource::SCREEN]);

    // Already fullscreen: nothing to do
    log.borrow_mut().clear();
    pipeline.set_fullscreen(true).unwrap();
    assert!(log.borrow().is_empty());
}
