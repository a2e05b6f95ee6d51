use pretty_assertions::assert_eq;
use rstest::rstest;

use knob_link::{Event, FRAME_DELIMITER, FrameCodec, FrameDecoder, MAX_PAYLOAD_LEN, MetaKind};

#[rstest]
#[case::empty(Vec::new())]
#[case::zero_bytes(vec![0x00, 0x00, 0x00])]
#[case::text(b"Paranoid Android".to_vec())]
#[case::max_len((0..=254u8).collect::<Vec<_>>())]
fn decoder_recovers_encoded_payloads(#[case] payload: Vec<u8>) {
    let wire = FrameCodec::encode(0x22, &payload).expect("payload should encode");
    let mut decoder = FrameDecoder::new();

    let frames = decoder.feed_slice(&wire);

    assert_eq!(1, frames.len());
    assert_eq!(0x22, frames[0].frame_type());
    assert_eq!(payload.as_slice(), frames[0].payload());
}

#[test]
fn encoded_frames_contain_a_single_trailing_delimiter() {
    let wire = FrameCodec::encode(0x22, &[0x00; MAX_PAYLOAD_LEN]).expect("payload should encode");

    assert_eq!(Some(&FRAME_DELIMITER), wire.last());
    assert_eq!(
        1,
        wire.iter().filter(|byte| **byte == FRAME_DELIMITER).count()
    );
}

#[test]
fn single_bit_flips_are_rejected() {
    let wire = FrameCodec::encode(0x22, b"\x02Muse").expect("metadata should encode");
    let raw = cobs::decode_vec(&wire[..wire.len() - 1]).expect("wire should be valid COBS");

    for index in 0..raw.len() {
        for bit in 0..8 {
            let mut corrupted = raw.clone();
            corrupted[index] ^= 1 << bit;

            let result = FrameCodec::decode(&cobs::encode_vec(&corrupted));

            assert!(
                result.is_err(),
                "flip of bit {bit} at byte {index} was accepted: {result:?}"
            );
        }
    }
}

#[test]
fn decoder_resynchronises_after_garbage() {
    let mut stream = vec![0x13, 0x37, 0xFF, 0x00, 0x05, 0x05, 0x00];
    stream.extend(Event::Volume(70).encode().expect("volume should encode"));
    stream.extend(
        Event::Metadata {
            kind: MetaKind::Title,
            text: "Airbag".to_string(),
        }
        .encode()
        .expect("metadata should encode"),
    );
    let mut decoder = FrameDecoder::new();

    let frames = decoder.feed_slice(&stream);

    assert_eq!(
        vec![(0x24, vec![70]), (0x22, b"\x01Airbag".to_vec())],
        frames
            .into_iter()
            .map(|frame| frame.into_parts())
            .collect::<Vec<_>>()
    );
    assert_eq!(2, decoder.stats().frames());
    assert_eq!(2, decoder.stats().discarded());
}

#[test]
fn oversized_input_is_dropped_until_the_next_delimiter() {
    let mut stream = vec![0x01; 600];
    stream.push(FRAME_DELIMITER);
    stream.extend(FrameCodec::encode(0xF1, &[]).expect("pong should encode"));
    let mut decoder = FrameDecoder::new();

    let frames = decoder.feed_slice(&stream);

    assert_eq!(1, frames.len());
    assert_eq!(0xF1, frames[0].frame_type());
    assert_eq!(false, decoder.is_overflowed());
}

#[test]
fn frames_split_across_reads_are_reassembled() {
    let wire = Event::Position(1500).encode().expect("position should encode");
    let (head, tail) = wire.split_at(3);
    let mut decoder = FrameDecoder::new();

    assert!(decoder.feed_slice(head).is_empty());
    let frames = decoder.feed_slice(tail);

    assert_eq!(1, frames.len());
    assert_eq!(1500u32.to_le_bytes().as_slice(), frames[0].payload());
}
