use std::io::IsTerminal;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use natnet_wire::{
    AssetKind, CommandResponse, FrameOfData, ModelDefinitions, ProtocolVersion, ServerInfo,
};
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    event: &'static str,
    timestamp: String,
    #[serde(flatten)]
    body: &'a T,
}

fn print_json<T: Serialize>(event: &'static str, body: &T) {
    let out = Envelope {
        event,
        timestamp: now_unix_seconds(),
        body,
    };
    println!(
        "{}",
        serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
    );
}

fn counts_table(header: &str, rows: Vec<(AssetKind, usize)>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![header, "COUNT"]);
    for (kind, count) in rows {
        table.add_row(vec![kind.name().to_string(), count.to_string()]);
    }
    table
}

fn frame_counts(frame: &FrameOfData) -> Vec<(AssetKind, usize)> {
    frame
        .kinds()
        .into_iter()
        .filter(|kind| !matches!(kind, AssetKind::Prefix | AssetKind::Suffix))
        .filter_map(|kind| frame.record_count(kind).map(|count| (kind, count)))
        .collect()
}

pub fn print_frame(frame: &FrameOfData, format: OutputFormat) {
    let number = frame
        .frame_number()
        .map_or_else(|| "?".to_string(), |n| n.to_string());
    match format {
        OutputFormat::Json => print_json("frame", frame),
        OutputFormat::Table => {
            println!("frame {number}");
            println!("{}", counts_table("KIND", frame_counts(frame)));
        }
        OutputFormat::Pretty => {
            let counts = frame_counts(frame)
                .into_iter()
                .map(|(kind, count)| format!("{kind}={count}"))
                .collect::<Vec<_>>()
                .join(" ");
            let timestamp = frame
                .suffix
                .as_ref()
                .map(|s| format!(" t={:.3}", s.timestamp))
                .unwrap_or_default();
            println!("frame={number}{timestamp} {counts}");
            for body in frame.rigid_bodies.iter().flatten() {
                println!(
                    "  rigid_body id={} pos=({:.4}, {:.4}, {:.4}) valid={}",
                    body.id,
                    body.position.x,
                    body.position.y,
                    body.position.z,
                    body.tracking_valid()
                );
            }
        }
        OutputFormat::Raw => println!("{frame:?}"),
    }
}

pub fn print_definitions(definitions: &ModelDefinitions, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json("model_definitions", definitions),
        OutputFormat::Table => {
            let rows = definitions
                .kinds()
                .into_iter()
                .filter_map(|kind| definitions.record_count(kind).map(|count| (kind, count)))
                .collect();
            println!("{}", counts_table("DESCRIPTION", rows));
            if !definitions.skipped.is_empty() {
                println!("skipped datasets: {}", definitions.skipped.len());
            }
        }
        OutputFormat::Pretty => {
            for set in &definitions.marker_sets {
                println!("marker_set {:?} markers={}", set.name, set.marker_names.len());
            }
            for body in &definitions.rigid_bodies {
                println!(
                    "rigid_body {:?} id={} parent={} markers={}",
                    body.name,
                    body.id,
                    body.parent_id,
                    body.markers.len()
                );
            }
            for skeleton in &definitions.skeletons {
                println!(
                    "skeleton {:?} id={} bones={}",
                    skeleton.name,
                    skeleton.id,
                    skeleton.rigid_bodies.len()
                );
            }
            for asset in &definitions.assets {
                println!(
                    "asset {:?} id={} rigid_bodies={} markers={}",
                    asset.name,
                    asset.id,
                    asset.rigid_bodies.len(),
                    asset.marker_names.len()
                );
            }
            for plate in &definitions.force_plates {
                println!("force_plate {:?} id={}", plate.serial, plate.id);
            }
            for device in &definitions.devices {
                println!("device {:?} id={}", device.name, device.id);
            }
            for camera in &definitions.cameras {
                println!("camera {:?}", camera.name);
            }
            for skipped in &definitions.skipped {
                println!(
                    "skipped tag={} size={} reason={:?}",
                    skipped.tag, skipped.size, skipped.reason
                );
            }
        }
        OutputFormat::Raw => println!("{definitions:?}"),
    }
}

pub fn print_server_info(info: &ServerInfo, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json("server_info", info),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("Server Info:");
            println!("  Application:      {}", info.application_name);
            println!("  Server version:   {}", info.server_version);
            println!("  Stream version:   {}", info.stream_version);
            match &info.connection {
                Some(c) => {
                    println!(
                        "  Data:             port {} ({})",
                        c.data_port,
                        if c.is_multicast {
                            format!("multicast {}", c.multicast_address)
                        } else {
                            "unicast".to_string()
                        }
                    );
                    println!(
                        "  Clock frequency:  {} Hz",
                        c.high_resolution_clock_frequency
                    );
                }
                None => println!("  Data:             unavailable"),
            }
        }
        OutputFormat::Raw => println!("{}", info.application_name),
    }
}

#[derive(Serialize)]
struct ResponseOutput<'a> {
    command: &'a str,
    response: &'a CommandResponse,
}

pub fn print_response(command: &str, response: &CommandResponse, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json("response", &ResponseOutput { command, response }),
        OutputFormat::Table | OutputFormat::Pretty | OutputFormat::Raw => match response {
            CommandResponse::Code(code) => println!("{command}: code {code}"),
            CommandResponse::Text(text) => println!("{command}: {text}"),
        },
    }
}

#[derive(Serialize)]
struct BitstreamOutput {
    version: ProtocolVersion,
}

pub fn print_bitstream(version: ProtocolVersion, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json("bitstream", &BitstreamOutput { version }),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("bitstream {}.{} accepted", version.major, version.minor)
        }
        OutputFormat::Raw => println!("{version}"),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
