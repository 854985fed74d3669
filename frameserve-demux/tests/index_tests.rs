//! Sample index and PCM timeline construction over the synthetic container.

use frameserve_core::error::{Error, IndexError};
use frameserve_demux::synthetic::{
    SyntheticAudioConfig, SyntheticAudioTrackSpec, SyntheticContainer,
    SyntheticVideoTrackSpec,
};
use frameserve_demux::{PcmTimeline, SampleIndex};

#[test]
fn index_build_simple_video() {
    let mut container = SyntheticContainer::builder()
        .video(SyntheticVideoTrackSpec::simple(1, 100, 30))
        .build();
    let index = SampleIndex::build(&mut container, 1).unwrap();

    assert_eq!(index.sample_count(), 100);
    assert_eq!(index.rap_at_or_before(45), Some(31));
    assert_eq!(index.prev_rap_before(31), Some(1));
    assert_eq!(index.decode_number_for_presentation(45), Some(45));
    assert_eq!(index.config_records().len(), 1);
}

#[test]
fn index_build_reordered_video_has_converters() {
    let spec = SyntheticVideoTrackSpec {
        reorder_delay: 2,
        rap_interval: 3,
        ..SyntheticVideoTrackSpec::simple(1, 32, 3)
    };
    let mut container = SyntheticContainer::builder().video(spec).build();
    let index = SampleIndex::build(&mut container, 1).unwrap();

    // Every presentation number maps to a decode number and back.
    for p in 1..=32 {
        let d = index.decode_number_for_presentation(p).unwrap();
        assert_eq!(index.presentation_number_for_decode(d), Some(p));
    }
    // Composition timestamps are monotone in presentation order.
    let mut prev = i64::MIN;
    for p in 1..=32 {
        let cts = index.cts_of_presentation(p).unwrap();
        assert!(cts > prev);
        prev = cts;
    }
}

#[test]
fn index_build_fails_when_timeline_cannot_be_constructed() {
    let mut container = SyntheticContainer::builder()
        .video(SyntheticVideoTrackSpec::simple(1, 10, 0))
        .failing_timeline(1)
        .build();
    let err = SampleIndex::build(&mut container, 1).unwrap_err();
    assert!(matches!(
        err,
        Error::Index(IndexError::TimelineConstruction { track_id: 1, .. })
    ));
}

#[test]
fn index_frame_at_time_lookup() {
    let mut container = SyntheticContainer::builder()
        .video(SyntheticVideoTrackSpec::simple(1, 100, 30))
        .build();
    let index = SampleIndex::build(&mut container, 1).unwrap();
    let tb = index.time_base();

    use frameserve_core::Timestamp;
    assert_eq!(index.frame_at_time(Timestamp::new(0, tb)), Some(1));
    assert_eq!(index.frame_at_time(Timestamp::new(44, tb)), Some(45));
    // Between two frames: nearest at or before.
    assert_eq!(index.frame_at_time(Timestamp::new(1000, tb)), Some(100));
}

#[test]
fn pcm_timeline_from_index_with_rate_change() {
    let spec = SyntheticAudioTrackSpec {
        priming_samples: 448,
        configs: vec![
            SyntheticAudioConfig { first_frame: 1, sample_rate: 48000, channels: 2, frame_length: 1024 },
            SyntheticAudioConfig { first_frame: 11, sample_rate: 24000, channels: 2, frame_length: 512 },
        ],
        ..SyntheticAudioTrackSpec::simple(2, 20, 48000, 1024)
    };
    let mut container = SyntheticContainer::builder().audio(spec).build();
    let index = SampleIndex::build(&mut container, 2).unwrap();
    let timeline = PcmTimeline::from_index(&index).unwrap();

    assert_eq!(timeline.runs().len(), 2);
    assert_eq!(timeline.runs()[0].frame_length, 1024);
    assert_eq!(timeline.runs()[1].sample_rate, 24000);

    // 10 frames of 1024 at 48k (minus priming) plus 10 frames of 512 at
    // 24k, all expressed at 48k.
    let expected = (10 * 1024 - 448) + 10 * 512 * 2;
    assert_eq!(timeline.total_samples(48000), expected as u64);
}

#[test]
fn pcm_timeline_rejects_video_tracks() {
    let mut container = SyntheticContainer::builder()
        .video(SyntheticVideoTrackSpec::simple(1, 10, 0))
        .build();
    let index = SampleIndex::build(&mut container, 1).unwrap();
    assert!(PcmTimeline::from_index(&index).is_err());
}
