//! Frame codec properties: round trips, partial reads, buffer draining.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use greenroom_core::protocol::{
    encode_frame, ChannelTarget, Command, FrameDecoder, Response,
};
use greenroom_core::{ClientError, ErrorKind};
use serde_json::json;

fn all_commands() -> Vec<Command> {
    vec![
        Command::StartActor {
            manifest: "actors/chat.toml".into(),
            initial_state: serde_json::to_vec(&json!({"title": "X"})).unwrap(),
            parent: false,
            subscribe: false,
        },
        Command::RequestActorMessage {
            id: "actor-1".into(),
            data: serde_json::to_vec(&json!({"type": "GetChatStateActorId"})).unwrap(),
        },
        Command::OpenChannel {
            actor_id: ChannelTarget::Actor("actor-2".into()),
            initial_message: vec![],
        },
        Command::ListActors {},
        Command::GetActorStatus { id: "actor-1".into() },
        Command::StopActor { id: "actor-1".into() },
    ]
}

fn decode_all(raw: &[u8]) -> Vec<bytes::Bytes> {
    let mut dec = FrameDecoder::new();
    dec.push(raw);
    let mut out = Vec::new();
    while let Some(p) = dec.next_payload().expect("decode must succeed") {
        out.push(p);
    }
    out
}

#[test]
fn command_round_trip() {
    for cmd in all_commands() {
        let frame = encode_frame(&cmd.to_payload().unwrap()).unwrap();
        let payloads = decode_all(&frame);
        assert_eq!(payloads.len(), 1, "one frame in, one payload out");
        let back = Command::from_payload(&payloads[0]).unwrap();
        assert_eq!(back, cmd);
    }
}

#[test]
fn response_round_trip_keeps_error_payload_verbatim() {
    let resp = Response::Error(json!({
        "code": "ACTOR_PANICKED",
        "detail": {"actor": "actor-7", "trap": "unreachable"}
    }));
    let frame = encode_frame(&resp.to_payload().unwrap()).unwrap();
    let payloads = decode_all(&frame);
    let back = Response::from_payload(&payloads[0]).unwrap();
    assert_eq!(back, resp);
}

#[test]
fn zero_length_payload_round_trip() {
    let frame = encode_frame(&[]).unwrap();
    let payloads = decode_all(&frame);
    assert_eq!(payloads.len(), 1);
    assert!(payloads[0].is_empty());
}

#[test]
fn split_at_every_boundary_yields_exactly_one_frame() {
    let resp = Response::ActorStarted { id: "actor-1".into() };
    let frame = encode_frame(&resp.to_payload().unwrap()).unwrap();

    for cut in 1..frame.len() {
        let mut dec = FrameDecoder::new();
        dec.push(&frame[..cut]);
        assert!(
            dec.next_payload().unwrap().is_none(),
            "cut={cut}: partial frame must wait, not decode"
        );
        dec.push(&frame[cut..]);
        let payload = dec
            .next_payload()
            .unwrap()
            .unwrap_or_else(|| panic!("cut={cut}: frame must complete"));
        assert_eq!(Response::from_payload(&payload).unwrap(), resp);
        assert!(dec.next_payload().unwrap().is_none());
        assert_eq!(dec.buffered(), 0, "cut={cut}: nothing may linger");
    }
}

#[test]
fn partial_first_frame_never_corrupts_the_next() {
    let first = Response::ChannelOpened { channel_id: "ch-1".into() };
    let second = Response::ChannelClosed {};
    let f1 = encode_frame(&first.to_payload().unwrap()).unwrap();
    let f2 = encode_frame(&second.to_payload().unwrap()).unwrap();

    // Feed all of frame 1 except its last byte, then the rest plus frame 2.
    let mut dec = FrameDecoder::new();
    dec.push(&f1[..f1.len() - 1]);
    assert!(dec.next_payload().unwrap().is_none());
    let mut rest = f1[f1.len() - 1..].to_vec();
    rest.extend_from_slice(&f2);
    dec.push(&rest);

    let p1 = dec.next_payload().unwrap().unwrap();
    let p2 = dec.next_payload().unwrap().unwrap();
    assert_eq!(Response::from_payload(&p1).unwrap(), first);
    assert_eq!(Response::from_payload(&p2).unwrap(), second);
    assert!(dec.next_payload().unwrap().is_none());
}

#[test]
fn multiple_frames_in_one_buffer_all_drain_in_order() {
    let mut raw = Vec::new();
    let mut want = Vec::new();
    for i in 0..5 {
        let resp = Response::ChannelMessage {
            sender_id: "actor-3".into(),
            message: format!("msg-{i}").into_bytes(),
        };
        raw.extend_from_slice(&encode_frame(&resp.to_payload().unwrap()).unwrap());
        want.push(resp);
    }

    let payloads = decode_all(&raw);
    assert_eq!(payloads.len(), want.len());
    for (p, w) in payloads.iter().zip(&want) {
        assert_eq!(&Response::from_payload(p).unwrap(), w);
    }
}

#[test]
fn large_payload_survives_many_small_reads() {
    let big = "x".repeat(256 * 1024);
    let resp = Response::ChannelMessage {
        sender_id: "actor-3".into(),
        message: big.clone().into_bytes(),
    };
    let frame = encode_frame(&resp.to_payload().unwrap()).unwrap();

    let mut dec = FrameDecoder::new();
    let mut got = None;
    for chunk in frame.chunks(1501) {
        dec.push(chunk);
        if let Some(p) = dec.next_payload().unwrap() {
            assert!(got.is_none(), "must decode exactly once");
            got = Some(p);
        }
    }
    let payload = got.expect("frame must complete after the final chunk");
    match Response::from_payload(&payload).unwrap() {
        Response::ChannelMessage { message, .. } => {
            assert_eq!(message.len(), big.len());
        }
        other => panic!("unexpected variant {}", other.name()),
    }
}

#[test]
fn oversized_declared_length_is_a_codec_error() {
    let mut dec = FrameDecoder::new();
    dec.push(&u32::MAX.to_be_bytes());
    let err = dec.next_payload().expect_err("must refuse to buffer forever");
    assert_eq!(err.kind(), ErrorKind::Protocol);
    assert!(matches!(err, ClientError::Codec(_)));
}

#[test]
fn envelope_tag_casing_matters() {
    // "complete" (lowercase) is not the Complete envelope.
    let body = br#"{"complete":[1,2,3]}"#;
    let mut raw = (body.len() as u32).to_be_bytes().to_vec();
    raw.extend_from_slice(body);

    let mut dec = FrameDecoder::new();
    dec.push(&raw);
    let err = dec.next_payload().expect_err("lowercase tag must fail");
    assert!(matches!(err, ClientError::UnknownFrame));
}
