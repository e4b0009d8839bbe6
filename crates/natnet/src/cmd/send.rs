use natnet_session::SessionEvent;
use natnet_wire::AssetFilter;

use crate::cmd::{connect, wait_for_event, SendArgs};
use crate::exit::{session_error, CliError, CliResult, SUCCESS, TIMEOUT, USAGE};
use crate::output::{print_response, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let command = args.command.trim();
    if command.is_empty() {
        return Err(CliError::new(USAGE, "command must not be empty"));
    }
    let timeout = args.connect.timeout()?;
    let (mut session, events) = connect(&args.connect, AssetFilter::none())?;

    // Drop anything that arrived during the handshake.
    while events.try_recv().is_ok() {}

    session
        .send_command(command)
        .map_err(|err| session_error("send failed", err))?;

    if args.no_wait {
        let _ = session.shutdown();
        return Ok(SUCCESS);
    }

    let response = wait_for_event(&events, timeout, |event| match event {
        SessionEvent::Response(response) => Some(response),
        _ => None,
    });
    let _ = session.shutdown();

    match response {
        Some(response) => {
            print_response(command, &response, format);
            Ok(SUCCESS)
        }
        None => Err(CliError::new(
            TIMEOUT,
            format!("no response to {command:?} after {timeout:?}"),
        )),
    }
}
