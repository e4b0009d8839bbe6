use natnet_session::SessionEvent;
use natnet_wire::{AssetFilter, ModelDefinitions};

use crate::cmd::{connect, wait_for_event, DescribeArgs};
use crate::exit::{session_error, CliError, CliResult, SUCCESS, TIMEOUT};
use crate::output::{print_definitions, OutputFormat};

fn pick(event: SessionEvent) -> Option<ModelDefinitions> {
    match event {
        SessionEvent::Description(definitions) => Some(definitions),
        _ => None,
    }
}

pub fn run(args: DescribeArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = args.connect.timeout()?;
    let (mut session, events) = connect(&args.connect, AssetFilter::all())?;

    // Startup already requested the definitions; ask once more if the
    // first half of the timeout passes without them.
    let mut definitions = wait_for_event(&events, timeout / 2, pick);
    if definitions.is_none() {
        session
            .request_model_definitions()
            .map_err(|err| session_error("request failed", err))?;
        definitions = wait_for_event(&events, timeout / 2, pick);
    }
    let _ = session.shutdown();

    match definitions {
        Some(definitions) => {
            print_definitions(&definitions, format);
            Ok(SUCCESS)
        }
        None => Err(CliError::new(
            TIMEOUT,
            format!("no model definitions after {timeout:?}"),
        )),
    }
}
