use std::io::Read;

use msgpipe_frame::{await_ready, FrameConfig, FrameReader};
use tracing::debug;

use crate::cmd::{CodecArg, InspectArgs};
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{print_frame, InspectedFrame, OutputFormat};

pub fn run(args: InspectArgs, format: OutputFormat) -> CliResult<i32> {
    let stdin = std::io::stdin().lock();
    let count = inspect_stream(stdin, &args, |frame| print_frame(&frame, format))?;
    debug!(count, "inspected frames");
    Ok(SUCCESS)
}

/// Read frames until a clean close or `--count`, handing each to `each`.
///
/// Returns the number of frames read.
fn inspect_stream<R, F>(inbound: R, args: &InspectArgs, mut each: F) -> CliResult<usize>
where
    R: Read,
    F: FnMut(InspectedFrame),
{
    let config = FrameConfig {
        max_payload_size: args.max_payload,
    };
    let mut reader = FrameReader::with_config(inbound, config);

    if args.expect_ready {
        await_ready(&mut reader).map_err(|err| frame_error("missing ready byte", err))?;
    }

    let mut index = 0usize;
    while args.count.is_none_or(|limit| index < limit) {
        let payload = match reader.read_frame() {
            Ok(payload) => payload,
            Err(err) if err.is_clean_close() => break,
            Err(err) => return Err(frame_error(&format!("failed reading frame {index}"), err)),
        };

        let decoded = args.codec.decode(&payload).map_err(|err| err.to_string());
        each(InspectedFrame {
            index,
            payload: payload.to_vec(),
            decoded,
        });
        index += 1;
    }

    Ok(index)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::BytesMut;
    use msgpipe_frame::{encode_frame, READY_BYTE};
    use serde_json::json;

    use super::*;
    use crate::exit::{DATA_INVALID, PROTOCOL_VIOLATION, TRANSPORT_ERROR};

    fn inspect_args(codec: CodecArg) -> InspectArgs {
        InspectArgs {
            expect_ready: false,
            count: None,
            codec,
            max_payload: None,
        }
    }

    fn json_stream(ready: bool, payloads: &[&str]) -> Cursor<Vec<u8>> {
        let mut wire = BytesMut::new();
        if ready {
            wire.extend_from_slice(&[READY_BYTE]);
        }
        for payload in payloads {
            encode_frame(payload.as_bytes(), &mut wire).unwrap();
        }
        Cursor::new(wire.to_vec())
    }

    fn collect(stream: Cursor<Vec<u8>>, args: &InspectArgs) -> CliResult<Vec<InspectedFrame>> {
        let mut frames = Vec::new();
        inspect_stream(stream, args, |frame| frames.push(frame))?;
        Ok(frames)
    }

    #[test]
    fn reads_until_clean_close() {
        let stream = json_stream(false, &[r#"{"$type":"Ping"}"#, r#"{"pong":true}"#]);
        let frames = collect(stream, &inspect_args(CodecArg::Json)).unwrap();

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].tag(), Some("Ping"));
        assert_eq!(frames[1].decoded.as_ref().unwrap(), &json!({"pong": true}));
        assert_eq!(frames[1].index, 1);
    }

    #[test]
    fn honours_count() {
        let stream = json_stream(false, &["1", "2", "3"]);
        let mut args = inspect_args(CodecArg::Json);
        args.count = Some(2);

        assert_eq!(collect(stream, &args).unwrap().len(), 2);
    }

    #[test]
    fn expect_ready() {
        let mut args = inspect_args(CodecArg::Json);
        args.expect_ready = true;

        let frames = collect(json_stream(true, &["{}"]), &args).unwrap();
        assert_eq!(frames.len(), 1);

        let err = collect(json_stream(false, &["{}"]), &args).unwrap_err();
        assert_eq!(err.code, PROTOCOL_VIOLATION);
    }

    #[test]
    fn undecodable_payload_is_reported_not_fatal() {
        let stream = json_stream(false, &["not json", "{}"]);
        let frames = collect(stream, &inspect_args(CodecArg::Json)).unwrap();

        assert!(frames[0].decoded.is_err());
        assert!(frames[1].decoded.is_ok());
    }

    #[test]
    fn msgpack_binary_is_shown_as_bytes() {
        // {"data": bin8 [1, 2, 3]}
        let payload = [0x81, 0xA4, b'd', b'a', b't', b'a', 0xC4, 0x03, 1, 2, 3];
        let mut wire = BytesMut::new();
        encode_frame(&payload, &mut wire).unwrap();

        let frames = collect(Cursor::new(wire.to_vec()), &inspect_args(CodecArg::Msgpack)).unwrap();
        assert_eq!(frames[0].decoded.as_ref().unwrap(), &json!({"data": [1, 2, 3]}));
    }

    #[test]
    fn truncated_frame_fails() {
        let stream = Cursor::new(b"\x08\x00\x00\x00abc".to_vec());
        let err = collect(stream, &inspect_args(CodecArg::Json)).unwrap_err();
        assert_eq!(err.code, TRANSPORT_ERROR);
    }

    #[test]
    fn oversized_frame_fails() {
        let stream = json_stream(false, &[r#"{"value":"0123456789"}"#]);
        let mut args = inspect_args(CodecArg::Json);
        args.max_payload = Some(8);

        let err = collect(stream, &args).unwrap_err();
        assert_eq!(err.code, DATA_INVALID);
    }
}
