use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::time::Duration;

use natnet_session::SessionEvent;
use natnet_wire::{AssetFilter, AssetKind};

use crate::cmd::{connect, StreamArgs};
use crate::exit::{session_error, CliError, CliResult, INTERNAL, SUCCESS, TRANSPORT_ERROR};
use crate::output::{print_frame, OutputFormat};

const POLL: Duration = Duration::from_millis(200);

pub fn run(args: StreamArgs, format: OutputFormat) -> CliResult<i32> {
    let filter = match &args.kinds {
        Some(kinds) => AssetFilter::only(kinds)
            .with(AssetKind::Prefix)
            .with(AssetKind::Suffix),
        None => AssetFilter::all(),
    };
    let (mut session, events) = connect(&args.connect, filter)?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut printed = 0usize;
    while running.load(Ordering::SeqCst) {
        let event = match events.recv_timeout(POLL) {
            Ok(event) => event,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        match event {
            SessionEvent::Frame(frame) => {
                print_frame(&frame, format);
                printed = printed.saturating_add(1);
                if args.count.is_some_and(|count| printed >= count) {
                    break;
                }
            }
            SessionEvent::LoopExit {
                role,
                error: Some(error),
            } => {
                let _ = session.shutdown();
                return Err(CliError::new(
                    TRANSPORT_ERROR,
                    format!("{role} loop failed: {error}"),
                ));
            }
            _ => {}
        }
    }

    session
        .shutdown()
        .map_err(|err| session_error("shutdown failed", err))?;
    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
