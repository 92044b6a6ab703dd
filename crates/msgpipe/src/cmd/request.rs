use bytes::BytesMut;
use msgpipe_dispatch::TYPE_KEY;
use msgpipe_frame::{encode_frame, READY_BYTE};
use serde_json::Value;

use crate::cmd::{CodecArg, RequestArgs};
use crate::exit::{frame_error, io_error, CliError, CliResult, DATA_INVALID, SUCCESS, USAGE};
use crate::output::{json_kind, write_raw};

pub fn run(args: RequestArgs) -> CliResult<i32> {
    let wire = build_request(&args)?;
    write_raw(&wire).map_err(|err| io_error("failed writing request", err))?;
    Ok(SUCCESS)
}

/// Encode the request as it would appear on a child's inbound stream.
fn build_request(args: &RequestArgs) -> CliResult<Vec<u8>> {
    let fields: Value = serde_json::from_str(&args.json)
        .map_err(|err| CliError::new(USAGE, format!("--json is not valid JSON: {err}")))?;

    let mut fields = match fields {
        Value::Object(fields) => fields,
        other => {
            return Err(CliError::new(
                USAGE,
                format!("--json must be an object, got {}", json_kind(&other)),
            ))
        }
    };
    if fields.contains_key(TYPE_KEY) {
        return Err(CliError::new(
            USAGE,
            format!("--json must not contain {TYPE_KEY}; use --type"),
        ));
    }
    fields.insert(TYPE_KEY.to_string(), Value::String(args.tag.clone()));

    let payload = args
        .codec
        .encode(&Value::Object(fields))
        .map_err(|err| CliError::new(DATA_INVALID, format!("failed to encode request: {err}")))?;

    let mut wire = BytesMut::new();
    if args.with_ready {
        wire.extend_from_slice(&[READY_BYTE]);
    }
    encode_frame(&payload, &mut wire).map_err(|err| frame_error("failed to frame request", err))?;
    Ok(wire.to_vec())
}
