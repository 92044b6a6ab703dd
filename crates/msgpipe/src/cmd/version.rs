use msgpipe_frame::{HEADER_SIZE, READY_BYTE};
use msgpipe_transport::{DEFAULT_READ_FD, DEFAULT_WRITE_FD};

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    println!("msgpipe {}", env!("CARGO_PKG_VERSION"));
    if !args.extended {
        return Ok(SUCCESS);
    }

    println!(
        "target: {}",
        option_env!("MSGPIPE_BUILD_TARGET").unwrap_or("unknown")
    );
    println!(
        "profile: {}",
        option_env!("MSGPIPE_BUILD_PROFILE").unwrap_or("unknown")
    );
    println!("ready_byte: 0x{READY_BYTE:02X}");
    println!("frame_header: {HEADER_SIZE} bytes, u32 little-endian");
    println!("default_fds: read={DEFAULT_READ_FD} write={DEFAULT_WRITE_FD}");
    println!("codecs: msgpack (default), json");

    Ok(SUCCESS)
}
