pub mod batch;
pub mod boxes;
pub mod engine;
pub mod error;
pub mod job;
pub mod known_boxes;
pub mod parser;
pub mod rotation;
pub mod strategy;
pub mod tkhd;
pub mod util;

pub use batch::{BatchConfig, BatchReport, run_batch};
pub use boxes::{BoxHeader, BoxRef, FourCC, NodeKind};
pub use engine::{EncodeEngine, EncodeSettings, FilterSpec, Ffmpeg};
pub use error::{Error, Result};
pub use job::{JobReport, Outcome, RotationJob};
pub use parser::{boxes_in, children, find_child, parse_tree, read_box_header, top_level};
pub use rotation::{Matrix, RotationAngle};
pub use strategy::{Backend, ContainerFamily, select_backend};
pub use tkhd::{PatchOptions, PatchReport, TrackHeader, patch_rotation, read_matrix, track_headers};
