//! Audio PCM timeline behavior over the synthetic container and codec.

use frameserve_codec::synthetic::{audio_sample_value, SyntheticDecoderFactory};
use frameserve_demux::synthetic::{
    SyntheticAudioConfig, SyntheticAudioTrackSpec, SyntheticContainer,
};
use frameserve_engine::{TrackOptions, TrackSelector, TrackSession};
use std::sync::Arc;

fn open_audio(
    container: SyntheticContainer,
    factory: SyntheticDecoderFactory,
    options: TrackOptions,
) -> TrackSession {
    TrackSession::open(
        Box::new(container),
        Arc::new(factory),
        TrackSelector::FirstAudio,
        options,
    )
    .unwrap()
}

fn simple_track(frames: u32) -> SyntheticContainer {
    SyntheticContainer::builder()
        .audio(SyntheticAudioTrackSpec::simple(2, frames, 48000, 1024))
        .build()
}

/// Interleaved f32 values out of a delivered buffer.
fn values(sample: &frameserve_core::Sample) -> Vec<f32> {
    sample
        .data()
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes(b.try_into().unwrap()))
        .collect()
}

/// Expected value at linear source position `pos` for a constant
/// 1024-sample frame grid.
fn expected_at(pos: u64) -> f32 {
    let frame = (pos / 1024) as u32 + 1;
    let offset = (pos % 1024) as u32;
    audio_sample_value(frame, offset)
}

#[test]
fn sequential_reads_cover_the_whole_stream() {
    let mut session = open_audio(
        simple_track(20),
        SyntheticDecoderFactory::new(),
        TrackOptions::default(),
    );
    let total = session.count_overall_pcm_samples(48000).unwrap();
    assert_eq!(total, 20 * 1024);

    let mut position = 0u64;
    while position < total {
        let len = 1000usize.min((total - position) as usize);
        let buffer = session.get_audio_samples(position as i64, len).unwrap();
        let data = values(&buffer);
        assert_eq!(data.len(), len * 2);
        // Spot-check both channels of the first frame of the chunk.
        assert_eq!(data[0], expected_at(position));
        assert_eq!(data[1], expected_at(position));
        position += len as u64;
    }
    assert!(session.stats().fast_path_hits > 0);
}

#[test]
fn random_access_matches_sequential_content() {
    let mut sequential = open_audio(
        simple_track(20),
        SyntheticDecoderFactory::new(),
        TrackOptions::default(),
    );
    sequential.get_audio_samples(0, 5000).unwrap();
    let continued = sequential.get_audio_samples(5000, 1000).unwrap();

    let mut random = open_audio(
        simple_track(20),
        SyntheticDecoderFactory::new(),
        TrackOptions::default(),
    );
    let direct = random.get_audio_samples(5000, 1000).unwrap();

    assert_eq!(values(&continued), values(&direct));
    // The random path really did seek mid-stream.
    assert_eq!(direct.num_samples(), 1000);
}

#[test]
fn count_matches_obtainable_samples() {
    // count_overall_pcm_samples must equal what get_audio_samples can
    // actually produce: the sample at N-1 is decoded content, everything
    // from N on is silence.
    let spec = SyntheticAudioTrackSpec {
        priming_samples: 448,
        ..SyntheticAudioTrackSpec::simple(2, 20, 48000, 1024)
    };
    let mut session = open_audio(
        SyntheticContainer::builder().audio(spec).build(),
        SyntheticDecoderFactory::new(),
        TrackOptions::default(),
    );
    let total = session.count_overall_pcm_samples(48000).unwrap();
    assert_eq!(total, 20 * 1024 - 448);

    let tail = session.get_audio_samples(total as i64 - 4, 8).unwrap();
    let data = values(&tail);
    // Last four in-range samples are real content...
    for frame in 0..4 {
        assert!(data[frame * 2] != 0.0, "sample {} should be content", frame);
    }
    // ...and the out-of-range remainder is silence.
    for frame in 4..8 {
        assert_eq!(data[frame * 2], 0.0, "sample {} should be silence", frame);
    }
}

#[test]
fn priming_shifts_the_source_grid() {
    let spec = SyntheticAudioTrackSpec {
        priming_samples: 448,
        ..SyntheticAudioTrackSpec::simple(2, 20, 48000, 1024)
    };
    let mut session = open_audio(
        SyntheticContainer::builder().audio(spec).build(),
        SyntheticDecoderFactory::new(),
        TrackOptions::default(),
    );
    // PCM position 0 is source position 448.
    let buffer = session.get_audio_samples(0, 4).unwrap();
    let data = values(&buffer);
    assert_eq!(data[0], expected_at(448));
    assert_eq!(data[2], expected_at(449));
}

#[test]
fn negative_start_prepends_exact_silence() {
    let mut session = open_audio(
        simple_track(10),
        SyntheticDecoderFactory::new(),
        TrackOptions::default(),
    );
    let buffer = session.get_audio_samples(-5, 20).unwrap();
    let data = values(&buffer);
    assert_eq!(data.len(), 40);
    // Exactly five silence frames...
    for frame in 0..5 {
        assert_eq!(data[frame * 2], 0.0);
        assert_eq!(data[frame * 2 + 1], 0.0);
    }
    // ...then real samples from PCM position 0.
    for frame in 5..20 {
        let expected = expected_at((frame - 5) as u64);
        assert_eq!(data[frame * 2], expected);
    }

    // length <= silence: all silence.
    let buffer = session.get_audio_samples(-50, 30).unwrap();
    assert!(values(&buffer).iter().all(|&v| v == 0.0));
}

#[test]
fn leading_silence_gap_is_prepended() {
    let spec = SyntheticAudioTrackSpec {
        leading_silence: 96,
        ..SyntheticAudioTrackSpec::simple(2, 10, 48000, 1024)
    };
    let mut session = open_audio(
        SyntheticContainer::builder().audio(spec).build(),
        SyntheticDecoderFactory::new(),
        TrackOptions::default(),
    );
    assert_eq!(
        session.count_overall_pcm_samples(48000).unwrap(),
        10 * 1024 + 96
    );

    let buffer = session.get_audio_samples(0, 100).unwrap();
    let data = values(&buffer);
    for frame in 0..96 {
        assert_eq!(data[frame * 2], 0.0, "gap sample {} should be silence", frame);
    }
    assert_eq!(data[96 * 2], expected_at(0));
}

#[test]
fn resampled_output_counts_follow_ceiling_accounting() {
    let mut session = open_audio(
        simple_track(20),
        SyntheticDecoderFactory::new(),
        TrackOptions {
            output_sample_rate: Some(44100),
            ..TrackOptions::default()
        },
    );
    let total = session.count_overall_pcm_samples(44100).unwrap();
    // ceil(20 * 1024 * 44100 / 48000)
    let expected = (20u64 * 1024 * 44100 - 1) / 48000 + 1;
    assert_eq!(total, expected);

    // The stream yields content right up to the computed total.
    let tail = session.get_audio_samples(total as i64 - 2, 4).unwrap();
    let data = values(&tail);
    assert!(data[0] != 0.0);
    assert!(data[2] != 0.0);
    assert_eq!(data[4], 0.0);
}

#[test]
fn resampled_random_access_matches_sequential() {
    let options = TrackOptions {
        output_sample_rate: Some(44100),
        ..TrackOptions::default()
    };
    let mut sequential = open_audio(
        simple_track(20),
        SyntheticDecoderFactory::new(),
        options.clone(),
    );
    sequential.get_audio_samples(0, 7000).unwrap();
    let continued = sequential.get_audio_samples(7000, 500).unwrap();

    let mut random = open_audio(simple_track(20), SyntheticDecoderFactory::new(), options);
    let direct = random.get_audio_samples(7000, 500).unwrap();

    assert_eq!(values(&continued), values(&direct));
}

#[test]
fn sample_rate_change_mid_stream_is_resampled_per_run() {
    let spec = SyntheticAudioTrackSpec {
        configs: vec![
            SyntheticAudioConfig { first_frame: 1, sample_rate: 48000, channels: 2, frame_length: 1024 },
            SyntheticAudioConfig { first_frame: 11, sample_rate: 24000, channels: 2, frame_length: 512 },
        ],
        ..SyntheticAudioTrackSpec::simple(2, 20, 48000, 1024)
    };
    let mut session = open_audio(
        SyntheticContainer::builder().audio(spec).build(),
        SyntheticDecoderFactory::new(),
        TrackOptions::default(),
    );
    // Run one passes through at 48 kHz; run two upsamples 2x.
    let total = session.count_overall_pcm_samples(48000).unwrap();
    assert_eq!(total, 10 * 1024 + 10 * 512 * 2);

    let buffer = session.get_audio_samples(0, total as usize).unwrap();
    let data = values(&buffer);
    assert_eq!(data.len(), total as usize * 2);
    // First run is bit-exact.
    assert_eq!(data[0], expected_at(0));
    assert_eq!(data[2 * 10239], expected_at(10239));
    // Second run content is interpolated but never silence.
    assert!(data[2 * 10240] != 0.0);
    assert!(data[data.len() - 2] != 0.0);
}

#[test]
fn imprecise_audio_seek_is_verified_and_absorbed() {
    let container = SyntheticContainer::builder()
        .audio(SyntheticAudioTrackSpec::simple(2, 40, 48000, 1024))
        .seek_slack(4)
        .build();
    let mut session = open_audio(
        container,
        SyntheticDecoderFactory::new(),
        TrackOptions::default(),
    );
    let buffer = session.get_audio_samples(20000, 10).unwrap();
    let data = values(&buffer);
    for frame in 0..10 {
        assert_eq!(data[frame * 2], expected_at(20000 + frame as u64));
    }
}

#[test]
fn wildly_imprecise_seek_exhausts_retries_into_silence() {
    // Slack beyond the verification scan range: every attempt fails and
    // the request is satisfied with silence, without looping forever.
    let container = SyntheticContainer::builder()
        .audio(SyntheticAudioTrackSpec::simple(2, 40, 48000, 1024))
        .seek_slack(40)
        .build();
    let mut session = open_audio(
        container,
        SyntheticDecoderFactory::new(),
        TrackOptions::default(),
    );
    let buffer = session.get_audio_samples(30000, 16).unwrap();
    assert!(values(&buffer).iter().all(|&v| v == 0.0));
    assert!(session.stats().retries >= 3);
}

#[test]
fn decoder_delay_is_drained() {
    let mut session = open_audio(
        simple_track(10),
        SyntheticDecoderFactory::new().with_audio_delay(2),
        TrackOptions::default(),
    );
    let total = session.count_overall_pcm_samples(48000).unwrap();
    let buffer = session.get_audio_samples(0, total as usize).unwrap();
    let data = values(&buffer);
    // The delayed tail frames must still arrive via the drain path.
    assert_eq!(data[(total as usize - 1) * 2], expected_at(total - 1));
}

#[test]
fn preroll_distance_steps_back_without_changing_output() {
    let spec = SyntheticAudioTrackSpec {
        preroll_distance: 2,
        ..SyntheticAudioTrackSpec::simple(2, 20, 48000, 1024)
    };
    let mut session = open_audio(
        SyntheticContainer::builder().audio(spec).build(),
        SyntheticDecoderFactory::new(),
        TrackOptions::default(),
    );
    // Mid-stream access decodes pre-roll frames and discards them; the
    // delivered samples are position-exact.
    let buffer = session.get_audio_samples(10000, 8).unwrap();
    let data = values(&buffer);
    for frame in 0..8 {
        assert_eq!(data[frame * 2], expected_at(10000 + frame as u64));
    }
}
