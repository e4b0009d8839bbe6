use natnet_session::SessionEvent;
use natnet_wire::AssetFilter;

use crate::cmd::{connect, wait_for_event, InfoArgs};
use crate::exit::{CliError, CliResult, SUCCESS, TIMEOUT};
use crate::output::{print_server_info, OutputFormat};

pub fn run(args: InfoArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = args.connect.timeout()?;
    let (mut session, events) = connect(&args.connect, AssetFilter::none())?;

    let info = wait_for_event(&events, timeout, |event| match event {
        SessionEvent::ServerInfo(info) => Some(info),
        _ => None,
    });
    let _ = session.shutdown();

    match info {
        Some(info) => {
            print_server_info(&info, format);
            Ok(SUCCESS)
        }
        None => Err(CliError::new(
            TIMEOUT,
            format!("no server info after {timeout:?}"),
        )),
    }
}
