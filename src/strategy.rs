use crate::rotation::RotationAngle;
use serde::Serialize;
use std::fmt;
use std::path::Path;

/// Extensions whose track matrix can be patched in place.
pub const PATCHABLE_EXTENSIONS: &[&str] = &["mp4", "mov", "m4v"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ContainerFamily {
    /// ISO-BMFF / QuickTime with a `tkhd` matrix
    MatrixPatchable,
    Other,
}

impl ContainerFamily {
    pub fn of(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext {
            Some(e) if PATCHABLE_EXTENSIONS.contains(&e.as_str()) => {
                ContainerFamily::MatrixPatchable
            }
            _ => ContainerFamily::Other,
        }
    }
}

/// How a file gets rotated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Backend {
    /// Rewrite the track header matrix, no re-encode
    ContainerPatch,
    /// Re-encode pixels through the external engine
    PixelTranspose,
    /// Copy the file unrotated
    PassthroughCopy,
}

impl Backend {
    pub fn rotates(self) -> bool {
        !matches!(self, Backend::PassthroughCopy)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Backend::ContainerPatch => "container-patch",
            Backend::PixelTranspose => "pixel-transpose",
            Backend::PassthroughCopy => "passthrough-copy",
        })
    }
}

/// Pick a backend before any byte is touched.
///
/// Pure function of its inputs. An available engine always wins, regardless
/// of container family.
pub fn select_backend(engine_available: bool, family: ContainerFamily, degrees: i32) -> Backend {
    if engine_available {
        return Backend::PixelTranspose;
    }
    let canonical = RotationAngle::from_degrees(degrees).is_ok();
    if family == ContainerFamily::MatrixPatchable && canonical {
        Backend::ContainerPatch
    } else {
        Backend::PassthroughCopy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_ignores_case() {
        assert_eq!(ContainerFamily::of(Path::new("a/B.MOV")), ContainerFamily::MatrixPatchable);
        assert_eq!(ContainerFamily::of(Path::new("clip.m4v")), ContainerFamily::MatrixPatchable);
        assert_eq!(ContainerFamily::of(Path::new("clip.mkv")), ContainerFamily::Other);
        assert_eq!(ContainerFamily::of(Path::new("noext")), ContainerFamily::Other);
    }

    #[test]
    fn engine_always_wins() {
        for family in [ContainerFamily::MatrixPatchable, ContainerFamily::Other] {
            for deg in [0, 90, 45] {
                assert_eq!(select_backend(true, family, deg), Backend::PixelTranspose);
            }
        }
    }

    #[test]
    fn patch_without_engine() {
        assert_eq!(
            select_backend(false, ContainerFamily::MatrixPatchable, 90),
            Backend::ContainerPatch
        );
    }

    #[test]
    fn copy_when_nothing_fits() {
        assert_eq!(select_backend(false, ContainerFamily::Other, 90), Backend::PassthroughCopy);
        assert_eq!(
            select_backend(false, ContainerFamily::MatrixPatchable, 45),
            Backend::PassthroughCopy
        );
    }
}
