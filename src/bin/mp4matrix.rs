use anyhow::Context;
use clap::{ArgAction, Parser};
use mp4rotate::{
    parser::parse_tree,
    rotation::{MATRIX_LEN, from_fixed_16_16},
    tkhd::{Track, select_track, track_headers},
    util::hex_dump,
    BoxRef, NodeKind,
    known_boxes::KnownBox,
};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Show track header matrices of an MP4/MOV file")]
struct Args {
    /// MP4/ISOBMFF file path
    path: PathBuf,

    /// Output as JSON instead of human-readable text
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,

    /// Hex-dump the raw matrix bytes of every track
    #[arg(long, action = ArgAction::SetTrue)]
    hex: bool,

    /// Also print the box tree down to each tkhd
    #[arg(long, action = ArgAction::SetTrue)]
    tree: bool,
}

#[derive(Debug, Serialize)]
struct TrackInfo {
    #[serde(flatten)]
    track: Track,
    /// Rotation the player will apply, when the matrix is canonical
    #[serde(skip_serializing_if = "Option::is_none")]
    rotation: Option<i32>,
    /// Whether `mp4rotate` would patch this track
    selected: bool,
    matrix_hex: String,
}

#[derive(Debug, Serialize)]
struct MatrixInfo {
    file: String,
    tracks: Vec<TrackInfo>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let buf = std::fs::read(&args.path)
        .with_context(|| format!("reading {}", args.path.display()))?;

    let selected = select_track(&buf).ok().map(|t| t.index);
    let tracks: Vec<TrackInfo> = track_headers(&buf)
        .with_context(|| format!("walking {}", args.path.display()))?
        .into_iter()
        .map(|track| {
            let at = track.header.matrix_offset as usize;
            TrackInfo {
                rotation: track.header.rotation().map(|a| a.degrees()),
                selected: selected == Some(track.index),
                matrix_hex: hex::encode(&buf[at..at + MATRIX_LEN]),
                track,
            }
        })
        .collect();
    let info = MatrixInfo { file: args.path.display().to_string(), tracks };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    if args.tree {
        for b in &parse_tree(&buf)? {
            print_box(b, 0);
        }
        println!();
    }

    println!("File: {}", info.file);
    if info.tracks.is_empty() {
        println!("Tracks: (none)");
        return Ok(());
    }
    println!("Tracks:");
    for t in &info.tracks {
        let h = &t.track.header;
        println!("  Track {}{}:", t.track.index, if t.selected { " (selected)" } else { "" });
        println!("    id: {}", h.track_id);
        if let Some(handler) = &t.track.handler {
            println!("    handler: {}", handler);
        }
        println!(
            "    tkhd: version {} at {:#x}, matrix at {:#x}",
            h.version, h.offset, h.matrix_offset
        );
        println!("    size: {}x{}", h.width, h.height);
        let m = h.matrix.0;
        println!("    matrix:");
        for row in m.chunks(3) {
            println!(
                "      [{:>10.4} {:>10.4} {:#010x}]",
                from_fixed_16_16(row[0]),
                from_fixed_16_16(row[1]),
                row[2]
            );
        }
        match t.rotation {
            Some(deg) => println!("    rotation: {} degrees", deg),
            None => println!("    rotation: (not canonical)"),
        }
        if args.hex {
            let at = h.matrix_offset as usize;
            print!("{}", hex_dump(&buf[at..at + MATRIX_LEN], h.matrix_offset));
        }
    }

    Ok(())
}

fn print_box(b: &BoxRef, depth: usize) {
    let indent = "  ".repeat(depth);
    let hdr = &b.hdr;
    let name = KnownBox::from(hdr.typ).full_name();
    match &b.kind {
        NodeKind::FullBox { version, flags } => {
            println!(
                "{indent}{:>6} {:>10} {} [{name}] (ver={}, flags=0x{:06x})",
                format!("{:#x}", hdr.start),
                hdr.size,
                hdr.typ,
                version,
                flags
            );
        }
        NodeKind::Leaf => {
            println!(
                "{indent}{:>6} {:>10} {} [{name}]",
                format!("{:#x}", hdr.start),
                hdr.size,
                hdr.typ
            );
        }
        NodeKind::Container(children) => {
            println!(
                "{indent}{:>6} {:>10} {} [{name}] (container)",
                format!("{:#x}", hdr.start),
                hdr.size,
                hdr.typ
            );
            for c in children {
                print_box(c, depth + 1);
            }
        }
    }
}
