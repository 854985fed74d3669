//! Video random-access behavior over the synthetic container and codec.

use frameserve_codec::synthetic::{video_luma, FailurePlan, SyntheticDecoderFactory};
use frameserve_core::error::Error;
use frameserve_demux::synthetic::{
    SyntheticContainer, SyntheticVideoConfig, SyntheticVideoTrackSpec,
};
use frameserve_engine::{SeekSafety, TrackOptions, TrackSelector, TrackSession};
use std::sync::Arc;

fn open_video(
    container: SyntheticContainer,
    factory: SyntheticDecoderFactory,
    options: TrackOptions,
) -> TrackSession {
    TrackSession::open(
        Box::new(container),
        Arc::new(factory),
        TrackSelector::FirstVideo,
        options,
    )
    .unwrap()
}

fn hundred_frames() -> SyntheticContainer {
    // 100 frames, RAPs at 1, 31, 61, 91.
    SyntheticContainer::builder()
        .video(SyntheticVideoTrackSpec::simple(1, 100, 30))
        .build()
}

#[test]
fn random_access_seeks_to_rap_and_decodes_forward() {
    let factory = SyntheticDecoderFactory::new();
    let counters = factory.counters();
    let mut session = open_video(hundred_frames(), factory, TrackOptions::default());

    let before = counters.video_decodes();
    let frame = session.get_video_frame(45).unwrap();
    assert!(!frame.is_blank());
    assert!(frame.plane(0).unwrap().iter().all(|&b| b == video_luma(45)));

    // RAP 31 to frame 45: 15 decode calls, one seek.
    assert_eq!(counters.video_decodes() - before, 15);
    assert_eq!(session.stats().seeks, 1);

    // Sequential continuation: one decode call, no new seek.
    let before = counters.video_decodes();
    let frame = session.get_video_frame(46).unwrap();
    assert!(frame.plane(0).unwrap().iter().all(|&b| b == video_luma(46)));
    assert_eq!(counters.video_decodes() - before, 1);
    assert_eq!(session.stats().seeks, 1);
    assert_eq!(session.stats().fast_path_hits, 1);
}

#[test]
fn near_sequential_access_stays_on_fast_path() {
    let factory = SyntheticDecoderFactory::new();
    let counters = factory.counters();
    let mut session = open_video(hundred_frames(), factory, TrackOptions::default());

    session.get_video_frame(40).unwrap();
    let seeks = session.stats().seeks;
    let before = counters.video_decodes();
    // Five frames ahead, inside the forward threshold: decode forward.
    let frame = session.get_video_frame(45).unwrap();
    assert!(frame.plane(0).unwrap().iter().all(|&b| b == video_luma(45)));
    assert_eq!(session.stats().seeks, seeks);
    assert_eq!(counters.video_decodes() - before, 5);
}

#[test]
fn backward_access_reseeks() {
    let mut session = open_video(
        hundred_frames(),
        SyntheticDecoderFactory::new(),
        TrackOptions::default(),
    );
    session.get_video_frame(45).unwrap();
    let frame = session.get_video_frame(10).unwrap();
    assert!(frame.plane(0).unwrap().iter().all(|&b| b == video_luma(10)));
    assert_eq!(session.stats().seeks, 2);
}

#[test]
fn sequential_fast_path_matches_direct_access() {
    // Fast-path content must be identical to a cold random access.
    let mut warm = open_video(
        hundred_frames(),
        SyntheticDecoderFactory::new(),
        TrackOptions::default(),
    );
    warm.get_video_frame(44).unwrap();
    let via_fast_path = warm.get_video_frame(45).unwrap();

    let mut cold = open_video(
        hundred_frames(),
        SyntheticDecoderFactory::new(),
        TrackOptions::default(),
    );
    let direct = cold.get_video_frame(45).unwrap();

    assert_eq!(via_fast_path.plane(0).unwrap(), direct.plane(0).unwrap());
    assert_eq!(via_fast_path.plane(1).unwrap(), direct.plane(1).unwrap());
}

#[test]
fn random_access_matches_sequential_decode_from_start() {
    // Seeking must never change decoded content, only access cost.
    let reordered = SyntheticVideoTrackSpec {
        reorder_delay: 2,
        rap_interval: 10,
        ..SyntheticVideoTrackSpec::simple(1, 60, 10)
    };

    for target in [1u32, 7, 23, 38, 59] {
        let mut sequential = open_video(
            SyntheticContainer::builder().video(reordered.clone()).build(),
            SyntheticDecoderFactory::new().with_reorder_latency(2),
            TrackOptions::default(),
        );
        let mut last = None;
        for n in 1..=target {
            last = Some(sequential.get_video_frame(n).unwrap());
        }

        let mut random = open_video(
            SyntheticContainer::builder().video(reordered.clone()).build(),
            SyntheticDecoderFactory::new().with_reorder_latency(2),
            TrackOptions::default(),
        );
        let direct = random.get_video_frame(target).unwrap();

        let last = last.unwrap();
        assert_eq!(
            last.plane(0).unwrap(),
            direct.plane(0).unwrap(),
            "frame {} differs between access patterns",
            target
        );
    }
}

#[test]
fn reordered_track_with_leading_samples_decodes_correctly() {
    let spec = SyntheticVideoTrackSpec {
        reorder_delay: 2,
        rap_interval: 3,
        ..SyntheticVideoTrackSpec::simple(1, 32, 3)
    };
    let mut session = open_video(
        SyntheticContainer::builder().video(spec).build(),
        SyntheticDecoderFactory::new().with_reorder_latency(2),
        TrackOptions::default(),
    );
    // Leading samples (presentation before their following RAP) must
    // decode like any other frame.
    for n in [2u32, 3, 5, 6, 17, 30] {
        let frame = session.get_video_frame(n).unwrap();
        assert!(
            frame.plane(0).unwrap().iter().all(|&b| b == video_luma(n)),
            "frame {} content mismatch",
            n
        );
    }
}

#[test]
fn configuration_change_is_transparent_and_reversible() {
    let spec = SyntheticVideoTrackSpec {
        configs: vec![
            SyntheticVideoConfig { first_frame: 1, width: 320, height: 240 },
            SyntheticVideoConfig { first_frame: 61, width: 640, height: 480 },
        ],
        ..SyntheticVideoTrackSpec::simple(1, 100, 30)
    };
    let mut session = open_video(
        SyntheticContainer::builder().video(spec).build(),
        SyntheticDecoderFactory::new(),
        TrackOptions::default(),
    );

    // Either side of the boundary reports its own entry's dimensions.
    let frame = session.get_video_frame(60).unwrap();
    assert_eq!((frame.width(), frame.height()), (320, 240));
    let frame = session.get_video_frame(61).unwrap();
    assert_eq!((frame.width(), frame.height()), (640, 480));

    // Decode well past the boundary, then request an old-configuration
    // frame: the engine must reconfigure back, not serve stale dimensions.
    session.get_video_frame(66).unwrap();
    let frame = session.get_video_frame(60).unwrap();
    assert_eq!((frame.width(), frame.height()), (320, 240));
    assert!(session.stats().reconfigurations >= 2);
}

#[test]
fn undecodable_frame_returns_blank_within_bounded_attempts() {
    // Every sample except the first fails: retries walk back to RAP 1,
    // escalate once, then substitute the blank frame.
    let factory = SyntheticDecoderFactory::new().with_failures(FailurePlan {
        fail_samples: (2..=100).collect(),
        ..Default::default()
    });
    let mut session = open_video(hundred_frames(), factory, TrackOptions::default());

    let frame = session.get_video_frame(95).unwrap();
    assert!(frame.is_blank());
    let stats = session.stats();
    assert_eq!(stats.retries, 3);
    assert_eq!(stats.aggressive_passes, 1);
    assert_eq!(stats.blank_frames, 1);
    // 1 initial + 3 RAP retries + 1 aggressive pass.
    assert_eq!(stats.seeks, 5);

    // The track remains usable: frame 1 still decodes.
    let frame = session.get_video_frame(1).unwrap();
    assert!(!frame.is_blank());
    assert!(frame.plane(0).unwrap().iter().all(|&b| b == video_luma(1)));
}

#[test]
fn unsafe_mode_skips_the_aggressive_pass() {
    let factory = SyntheticDecoderFactory::new().with_failures(FailurePlan {
        fail_samples: (2..=100).collect(),
        ..Default::default()
    });
    let options = TrackOptions {
        seek_safety: SeekSafety::Unsafe,
        ..TrackOptions::default()
    };
    let mut session = open_video(hundred_frames(), factory, options);

    let frame = session.get_video_frame(95).unwrap();
    assert!(frame.is_blank());
    assert_eq!(session.stats().aggressive_passes, 0);
}

#[test]
fn byte_offset_seek_fallback_works() {
    let container = SyntheticContainer::builder()
        .video(SyntheticVideoTrackSpec::simple(1, 100, 30))
        .without_dts_seek()
        .build();
    let mut session = open_video(
        container,
        SyntheticDecoderFactory::new(),
        TrackOptions::default(),
    );
    let frame = session.get_video_frame(45).unwrap();
    assert!(frame.plane(0).unwrap().iter().all(|&b| b == video_luma(45)));
}

#[test]
fn imprecise_seek_landing_early_is_absorbed() {
    let container = SyntheticContainer::builder()
        .video(SyntheticVideoTrackSpec::simple(1, 100, 30))
        .seek_slack(3)
        .build();
    let mut session = open_video(
        container,
        SyntheticDecoderFactory::new(),
        TrackOptions::default(),
    );
    let frame = session.get_video_frame(45).unwrap();
    assert!(frame.plane(0).unwrap().iter().all(|&b| b == video_luma(45)));
}

#[test]
fn failed_midstream_reconfiguration_poisons_the_track() {
    let spec = SyntheticVideoTrackSpec {
        configs: vec![
            SyntheticVideoConfig { first_frame: 1, width: 320, height: 240 },
            SyntheticVideoConfig { first_frame: 61, width: 640, height: 480 },
        ],
        ..SyntheticVideoTrackSpec::simple(1, 100, 30)
    };
    // Samples of the second configuration never decode, so its probe
    // cannot discover parameters.
    let factory = SyntheticDecoderFactory::new().with_failures(FailurePlan {
        fail_samples: (61..=100).collect(),
        ..Default::default()
    });
    let mut session = open_video(
        SyntheticContainer::builder().video(spec).build(),
        factory,
        TrackOptions::default(),
    );

    session.get_video_frame(10).unwrap();
    let err = session.get_video_frame(70).unwrap_err();
    assert!(err.poisons_track());
    assert!(session.is_poisoned());

    // Every subsequent request fails until the track is reopened.
    assert!(matches!(
        session.get_video_frame(1),
        Err(Error::TrackPoisoned)
    ));
}

#[test]
fn out_of_range_requests_are_rejected() {
    let mut session = open_video(
        hundred_frames(),
        SyntheticDecoderFactory::new(),
        TrackOptions::default(),
    );
    assert!(session.get_video_frame(0).is_err());
    assert!(session.get_video_frame(101).is_err());
}
