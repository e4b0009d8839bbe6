use natnet_wire::{AssetFilter, ProtocolVersion};

use crate::cmd::{connect, BitstreamArgs};
use crate::exit::{session_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_bitstream, OutputFormat};

pub fn run(args: BitstreamArgs, format: OutputFormat) -> CliResult<i32> {
    let version: ProtocolVersion = args
        .version
        .parse()
        .map_err(|err| CliError::new(USAGE, format!("{err}")))?;
    let (mut session, _events) = connect(&args.connect, AssetFilter::none())?;

    let result = session.set_bitstream_version(version);
    let negotiated = session.requested_version();
    let _ = session.shutdown();
    result.map_err(|err| session_error("bitstream change failed", err))?;

    print_bitstream(negotiated, format);
    Ok(SUCCESS)
}
