use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("natnet {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: natnet");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("NATNET_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "protocol: NatNet {}",
        natnet_wire::ProtocolVersion::DEFAULT_CONNECT
    );
    println!(
        "features: session={}, serde={}, cli=true",
        cfg!(feature = "session"),
        cfg!(feature = "serde")
    );

    Ok(SUCCESS)
}
