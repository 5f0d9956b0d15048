//! Per-slice position and orientation
//!
//! The direction matrix is built from the slice normal in three steps: a tilt
//! about X by the whole-degree angle between normal and Z, a turn about Z that
//! brings the tilted Z axis over the normal's transverse projection, and the
//! in-plane rotation about the unrounded normal.

use crate::twix::RawValueStore;
use nalgebra::{Rotation3, Unit, Vector3};
use std::fmt;

const SLICE_ARRAY: &str = "mrprot.sSliceArray";
const DISTANCE_FACTOR: &str = "mrprot.sGroupArray.asGroup[0].dDistFact";

/// Values below this render as zero
const ZERO_EPSILON: f64 = 5e-5;

/// Acquisition class from `MRAcquisitionType`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionClass {
    /// 2D multi-slice, one slice-array entry per slice
    MultiSlice,
    /// 3D slab, partitioned into the output slices
    Slab,
}

impl AcquisitionClass {
    pub fn from_raw(raw: &RawValueStore) -> Self {
        if raw
            .value("MRAcquisitionType")
            .trim()
            .eq_ignore_ascii_case("3D")
        {
            AcquisitionClass::Slab
        } else {
            AcquisitionClass::MultiSlice
        }
    }
}

impl fmt::Display for AcquisitionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcquisitionClass::MultiSlice => write!(f, "2D"),
            AcquisitionClass::Slab => write!(f, "3D"),
        }
    }
}

/// Rendered geometry of one output slice
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct SliceGeometry {
    pub image_position: String,
    pub image_orientation: String,
    pub slice_location: String,
    pub slice_thickness: String,
    pub slice_spacing: String,
}

/// Geometry fields of one slice-array entry
#[derive(Debug, Clone, PartialEq)]
struct SliceEntry {
    center: Vector3<f64>,
    normal: Vector3<f64>,
    thickness: f64,
    phase_fov: f64,
    readout_fov: f64,
    in_plane_rotation: f64,
}

impl SliceEntry {
    fn read(raw: &RawValueStore, index: usize) -> Self {
        let prefix = format!("{}.asSlice[{}]", SLICE_ARRAY, index);
        let field = |name: &str| raw.get_f64(&format!("{}.{}", prefix, name)).unwrap_or(0.0);
        let vector = |name: &str| {
            Vector3::new(
                field(&format!("{}.dSag", name)),
                field(&format!("{}.dCor", name)),
                field(&format!("{}.dTra", name)),
            )
        };

        Self {
            center: vector("sPosition"),
            normal: vector("sNormal"),
            thickness: field("dThickness"),
            phase_fov: field("dPhaseFOV"),
            readout_fov: field("dReadoutFOV"),
            in_plane_rotation: field("dInPlaneRot"),
        }
    }
}

/// Computes slice geometry from the protocol's slice array
#[derive(Debug, Clone)]
pub struct SliceGeometryCalculator<'a> {
    raw: &'a RawValueStore,
    class: AcquisitionClass,
    array_size: usize,
}

impl<'a> SliceGeometryCalculator<'a> {
    pub fn new(raw: &'a RawValueStore) -> Self {
        let array_size = raw
            .get_i64(&format!("{}.lSize", SLICE_ARRAY))
            .filter(|&n| n > 0)
            .map(|n| n as usize)
            .unwrap_or(1);

        Self {
            raw,
            class: AcquisitionClass::from_raw(raw),
            array_size,
        }
    }

    pub fn acquisition_class(&self) -> AcquisitionClass {
        self.class
    }

    pub fn array_size(&self) -> usize {
        self.array_size
    }

    /// Geometry for the 0-based `slice` out of `slice_count` output slices
    pub fn calculate(&self, slice: usize, slice_count: usize) -> SliceGeometry {
        let slice_count = slice_count.max(1);

        let (entry, center, thickness, spacing) = match self.class {
            AcquisitionClass::Slab => {
                // Multi-slab protocols are read from the first slab only
                let entry = SliceEntry::read(self.raw, 0);
                let normal = unit_normal(&entry.normal);
                let thickness = entry.thickness / slice_count as f64;
                let shift = thickness * (slice as f64 - (slice_count as f64 - 1.0) / 2.0);
                let center = entry.center + normal.into_inner() * shift;
                (entry, center, thickness, 0.0)
            }
            AcquisitionClass::MultiSlice => {
                let entry = SliceEntry::read(self.raw, slice.min(self.array_size - 1));
                let distance = self.raw.get_f64(DISTANCE_FACTOR).unwrap_or(0.0);
                let (center, thickness) = (entry.center, entry.thickness);
                (entry, center, thickness, thickness * (1.0 + distance))
            }
        };

        let normal = unit_normal(&entry.normal);
        let rotation = direction_matrix(&normal, entry.in_plane_rotation);
        let row = rotation * Vector3::x();
        let column = rotation * Vector3::y();

        let position = center - row * (entry.phase_fov / 2.0) - column * (entry.readout_fov / 2.0);

        SliceGeometry {
            image_position: join_values(position.iter().map(|v| format_fixed(*v))),
            image_orientation: join_values(
                row.iter()
                    .chain(column.iter())
                    .map(|v| (v.round() as i64).to_string()),
            ),
            slice_location: format_number(center.dot(&normal)),
            slice_thickness: format_number(thickness),
            slice_spacing: format_number(spacing),
        }
    }
}

/// Normalizes the slice normal, falling back to the transverse direction
fn unit_normal(normal: &Vector3<f64>) -> Unit<Vector3<f64>> {
    Unit::try_new(*normal, f64::EPSILON).unwrap_or_else(Vector3::z_axis)
}

/// Builds `Rip * Rz * Rx` for a unit normal and in-plane rotation (radians)
fn direction_matrix(normal: &Unit<Vector3<f64>>, in_plane_rotation: f64) -> Rotation3<f64> {
    let beta = normal
        .dot(&Vector3::z())
        .clamp(-1.0, 1.0)
        .acos()
        .to_degrees()
        .round();
    let rx = Rotation3::from_axis_angle(&Vector3::x_axis(), -beta.to_radians());

    let tilted = rx * Vector3::z();
    let alpha = match (transverse(normal), transverse(&tilted)) {
        (Some(n), Some(t)) => -n.dot(&t).clamp(-1.0, 1.0).acos(),
        _ => 0.0,
    };
    let rz = Rotation3::from_axis_angle(&Vector3::z_axis(), alpha);
    let rip = Rotation3::from_axis_angle(normal, in_plane_rotation);

    rip * rz * rx
}

/// Unit projection onto the transverse plane, if not degenerate
fn transverse(v: &Vector3<f64>) -> Option<Vector3<f64>> {
    let projected = Vector3::new(v.x, v.y, 0.0);
    let norm = projected.norm();
    (norm > 1e-9).then(|| projected / norm)
}

fn join_values<I: Iterator<Item = String>>(values: I) -> String {
    values.collect::<Vec<_>>().join("\\")
}

fn clamp_zero(value: f64) -> f64 {
    if value.abs() < ZERO_EPSILON {
        0.0
    } else {
        value
    }
}

/// Fixed-point rendering with four fractional digits
fn format_fixed(value: f64) -> String {
    format!("{:.4}", clamp_zero(value))
}

/// Fixed-point rendering without trailing zeros
fn format_number(value: f64) -> String {
    let text = format_fixed(value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    text.to_string()
}
