use mpeg_audio_decoder::{
    Channels, Decoder, DecoderConfig, DownSample, Error, Layer, PcmBuffer, Resolution,
};
use rodio::Source;

use std::io::Cursor;
use std::time::Duration;

/// MPEG-1 Layer III, 128 kbit/s, 44100 Hz, joint stereo.
const LAYER3: u32 = 0xfffb_9064;
const LAYER3_BODY: usize = 413;
const LAYER3_SAMPLES: usize = 2304;

/// MPEG-1 Layer I, 384 kbit/s, 44100 Hz, stereo.
const LAYER1: u32 = 0xffff_c000;
const LAYER1_BODY: usize = 412;

/// MPEG-1 Layer II, 160 kbit/s, 44100 Hz, joint stereo.
const LAYER2: u32 = 0xfffd_9044;
const LAYER2_BODY: usize = 518;

fn frame(header: u32, body: usize) -> Vec<u8> {
    let mut data = header.to_be_bytes().to_vec();
    data.resize(4 + body, 0);
    data
}

fn silent(header: u32, body: usize, frames: usize) -> Vec<u8> {
    (0..frames).flat_map(|_| frame(header, body)).collect()
}

fn xing_frame(frames: u32) -> Vec<u8> {
    let mut data = LAYER3.to_be_bytes().to_vec();
    data.resize(4 + 32, 0);
    data.extend_from_slice(b"Xing");
    data.extend_from_slice(&1u32.to_be_bytes());
    data.extend_from_slice(&frames.to_be_bytes());
    data.resize(4 + LAYER3_BODY, 0);
    data
}

fn decoder(data: Vec<u8>) -> Decoder<Cursor<Vec<u8>>> {
    Decoder::new(Cursor::new(data)).unwrap()
}

#[test]
fn layer3_silence() {
    let samples: Vec<i16> = decoder(silent(LAYER3, LAYER3_BODY, 5)).collect();

    assert_eq!(samples.len(), 5 * LAYER3_SAMPLES);
    assert!(samples.iter().all(|&s| s == 0));
}

#[test]
fn layer1_and_layer2_silence() {
    let samples: Vec<i16> = decoder(silent(LAYER1, LAYER1_BODY, 3)).collect();
    assert_eq!(samples.len(), 3 * 384 * 2);
    assert!(samples.iter().all(|&s| s == 0));

    let samples: Vec<i16> = decoder(silent(LAYER2, LAYER2_BODY, 3)).collect();
    assert_eq!(samples.len(), 3 * 1152 * 2);
    assert!(samples.iter().all(|&s| s == 0));
}

#[test]
fn tags_and_junk_are_skipped() {
    // ID3v2 with a 20 byte body
    let mut data = b"ID3\x03\x00\x00\x00\x00\x00\x14".to_vec();
    data.resize(data.len() + 20, 0xaa);
    data.extend(silent(LAYER3, LAYER3_BODY, 2));
    data.extend_from_slice(&[0, 1, 2, 3, 4, 5, 6]);
    data.extend(silent(LAYER3, LAYER3_BODY, 2));
    data.extend_from_slice(b"TAG");
    data.resize(data.len() + 125, b'x');

    let mut decoder = decoder(data);
    let samples: Vec<i16> = decoder.by_ref().collect();

    assert_eq!(samples.len(), 4 * LAYER3_SAMPLES);
    assert_eq!(decoder.frame_number(), 4);
}

#[test]
fn truncated_last_frame_is_padded() {
    let mut data = silent(LAYER3, LAYER3_BODY, 3);
    data.truncate(data.len() - 200);

    let samples: Vec<i16> = decoder(data).collect();
    assert_eq!(samples.len(), 3 * LAYER3_SAMPLES);
}

#[test]
fn xing_frame_is_not_decoded() {
    let mut data = xing_frame(4);
    data.extend(silent(LAYER3, LAYER3_BODY, 4));

    let mut decoder = decoder(data);
    let info = decoder.stream_info();
    assert_eq!(info.layer, Layer::Three);
    assert_eq!(info.sample_rate, 44100);
    assert_eq!(info.bitrate, 128);
    assert_eq!(info.frames, 4);
    assert_eq!(info.xing.map(|xing| xing.frames), Some(4));

    let expected = Duration::from_secs_f64(4.0 * 1152.0 / 44100.0);
    assert!((decoder.total_duration().as_secs_f64() - expected.as_secs_f64()).abs() < 1e-6);

    assert_eq!(decoder.by_ref().count(), 4 * LAYER3_SAMPLES);
}

#[test]
fn failed_frame_is_dropped_and_followers_muted() {
    let mut data = silent(LAYER3, LAYER3_BODY, 5);
    // main_data_begin of 100 bytes with nothing before the first frame
    data[4] = 50;

    let mut decoder = decoder(data);
    match decoder.next_frame() {
        Err(Error::ReservoirUnderflow { needed, available }) => {
            assert_eq!(needed, 100);
            assert_eq!(available, 0);
        }
        _ => panic!("expected a reservoir underflow"),
    }

    let mut frames = 0;
    while let Ok(pcm) = decoder.next_frame() {
        assert_eq!(pcm.len(), LAYER3_SAMPLES);
        frames += 1;
    }
    assert_eq!(frames, 4);
}

#[test]
fn iterator_skips_failed_frames() {
    let mut data = silent(LAYER3, LAYER3_BODY, 5);
    data[4] = 50;

    assert_eq!(decoder(data).count(), 4 * LAYER3_SAMPLES);
}

#[test]
fn jump_to_frame_refills_reservoir() {
    let mut decoder = decoder(silent(LAYER3, LAYER3_BODY, 5));

    decoder.jump_to_frame(2).unwrap();
    assert_eq!(decoder.frame_number(), 2);

    // frame 2 only fills the reservoir
    assert_eq!(decoder.by_ref().count(), 2 * LAYER3_SAMPLES);
    assert_eq!(decoder.frame_number(), 4);
}

#[test]
fn seek_by_time() {
    let mut decoder = decoder(silent(LAYER3, LAYER3_BODY, 5));

    decoder
        .seek(Duration::from_secs_f64(2.5 * 1152.0 / 44100.0))
        .unwrap();
    assert_eq!(decoder.count(), 2 * LAYER3_SAMPLES);
}

#[test]
fn frame_arithmetic() {
    let decoder = decoder(silent(LAYER3, LAYER3_BODY, 10));

    assert!((decoder.compute_bpf() - 128.0 * 144_000.0 / 44100.0).abs() < 1e-9);
    assert!((decoder.compute_tpf() - 1152.0 / 44100.0).abs() < 1e-9);
    // 4170 bytes at 417.96 bytes per frame
    assert_eq!(decoder.calc_numframes(), 9);
    assert_eq!(decoder.relative_pos(), 0.0);
    assert_eq!(decoder.clip_count(), 0);
    assert_eq!(decoder.header(), None);
}

#[test]
fn mono_and_down_sampled_output() {
    let config = DecoderConfig::default()
        .with_channels(Channels::Mix)
        .with_down_sample(DownSample::Half);
    let decoder =
        Decoder::with_config(Cursor::new(silent(LAYER3, LAYER3_BODY, 3)), config).unwrap();

    assert_eq!(decoder.channels(), 1);
    assert_eq!(decoder.sample_rate(), 22050);
    assert_eq!(decoder.count(), 3 * 576);

    let config = DecoderConfig::default().with_channels(Channels::Right);
    let decoder =
        Decoder::with_config(Cursor::new(silent(LAYER2, LAYER2_BODY, 2)), config).unwrap();
    assert_eq!(decoder.count(), 2 * 1152);
}

#[test]
fn eight_bit_output() {
    let config = DecoderConfig::default().with_resolution(Resolution::Bits8);
    let mut decoder =
        Decoder::with_config(Cursor::new(silent(LAYER1, LAYER1_BODY, 2)), config).unwrap();

    match decoder.next_frame().unwrap() {
        PcmBuffer::U8(samples) => {
            assert_eq!(samples.len(), 768);
            assert!(samples.iter().all(|&s| s == 128));
        }
        PcmBuffer::S16(_) => panic!("expected 8 bit samples"),
    }
}

#[test]
fn rodio_source() {
    let mut decoder = decoder(silent(LAYER3, LAYER3_BODY, 2));

    assert_eq!(decoder.channels(), 2);
    assert_eq!(decoder.sample_rate(), 44100);
    assert_eq!(decoder.current_frame_len(), Some(LAYER3_SAMPLES));

    decoder.next();
    assert_eq!(decoder.current_frame_len(), Some(LAYER3_SAMPLES - 1));
    assert_eq!(decoder.header().map(|h| h.bitrate()), Some(128));

    // at the boundary the next frame's length is reported
    assert_eq!(decoder.by_ref().take(LAYER3_SAMPLES - 1).count(), LAYER3_SAMPLES - 1);
    assert_eq!(decoder.current_frame_len(), Some(LAYER3_SAMPLES));
}

#[test]
fn rodio_frame_len_follows_the_output_config() {
    let config = DecoderConfig::default()
        .with_channels(Channels::Mix)
        .with_down_sample(DownSample::from_factor(2).unwrap());
    let data = silent(LAYER3, LAYER3_BODY, 2);
    let decoder = Decoder::with_config(Cursor::new(data), config).unwrap();

    assert_eq!(decoder.channels(), 1);
    assert_eq!(decoder.current_frame_len(), Some(LAYER3_SAMPLES / 4));
}
