use crate::colortable::Colortable;
use crate::error::{RendererError, Result};

use glam::{DMat4, DVec3, DVec4};
use ndarray::Array3;
use ndarray::ArrayView2;
use ndarray::Axis;
use ndarray::s;
use rayon::prelude::*;
use uuid::Uuid;

/// Identity of a slice's pixel content. A new id is issued whenever the
/// content of a slice changes, so caches keyed on it never go stale.
pub type SliceId = Uuid;

/// Placement of the voxel grid in world (RAS) space.
///
/// Directions are unit vectors along which `i`, `j` and `k` increase. Only
/// axis-aligned directions are supported, though each may point either way.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeGeometry {
    pub spacing: DVec3,
    pub origin: DVec3,
    pub directions: [DVec3; 3],
}

impl VolumeGeometry {
    pub fn new(spacing: (f32, f32, f32)) -> Self {
        Self {
            spacing: DVec3::new(spacing.0 as f64, spacing.1 as f64, spacing.2 as f64),
            origin: DVec3::ZERO,
            directions: [DVec3::X, DVec3::Y, DVec3::Z],
        }
    }

    pub fn with_origin(mut self, origin: DVec3) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_directions(mut self, directions: [DVec3; 3]) -> Self {
        self.directions = directions;
        self
    }

    /// Continuous index (i, j, k) to world transform
    pub fn ijk_to_ras(&self) -> DMat4 {
        let [di, dj, dk] = self.directions;
        DMat4::from_cols(
            (di * self.spacing.x).extend(0.0),
            (dj * self.spacing.y).extend(0.0),
            (dk * self.spacing.z).extend(0.0),
            self.origin.extend(1.0),
        )
    }

    /// World axis a data axis runs along
    fn world_axis(&self, axis: usize) -> usize {
        let d = self.directions[axis].abs();
        if d.x >= d.y && d.x >= d.z {
            0
        } else if d.y >= d.z {
            1
        } else {
            2
        }
    }

    /// Whether a data axis is sampled against its world axis
    fn is_reversed(&self, axis: usize) -> bool {
        self.directions[axis][self.world_axis(axis)] < 0.0
    }

    fn validate(&self) -> Result<()> {
        if !self.spacing.is_finite() || self.spacing.min_element() <= 0.0 {
            return Err(RendererError::InvalidVolume(format!(
                "spacing must be positive, got {}",
                self.spacing
            )));
        }
        let axes = [self.world_axis(0), self.world_axis(1), self.world_axis(2)];
        if axes[0] == axes[1] || axes[1] == axes[2] || axes[0] == axes[2] {
            return Err(RendererError::InvalidVolume(
                "sample directions must run along three distinct axes".to_string(),
            ));
        }
        Ok(())
    }
}

/// Sampling of one axis: where its slices sit in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StackInfo {
    /// Unit vector along which the slice index increases
    pub normal: DVec3,
    /// Offset making `normal . p + origin_d` the distance from slice 0
    pub origin_d: f64,
    pub spacing: f64,
    pub count: usize,
}

impl StackInfo {
    /// Nearest slice index to a world point, clamped to the stack
    pub fn index_of(&self, ras: DVec3) -> usize {
        let distance = self.normal.dot(ras) + self.origin_d;
        let index = (distance / self.spacing).round();
        index.clamp(0.0, (self.count - 1) as f64) as usize
    }

    /// Sample direction relative to the world axis the stack runs along
    pub fn is_increasing(&self) -> bool {
        self.normal.x + self.normal.y + self.normal.z > 0.0
    }
}

/// One 2D cross-section. Pixels are RGBA, rows run along the second in-plane
/// axis and columns along the first. Both are stored in order of increasing
/// world coordinate, whatever the sample direction of the data axis.
///
/// The slice's "XY" frame holds world coordinates re-ordered into
/// (column axis, row axis, normal axis); `xy_bbox` is the slice extent in
/// that frame as `[xmin, xmax, ymin, ymax, zmin, zmax]`.
#[derive(Debug, Clone)]
pub struct Slice {
    id: SliceId,
    width: usize,
    height: usize,
    width_spacing: f64,
    height_spacing: f64,
    xy_bbox: [f64; 6],
    xy_to_ras: DMat4,
    xy_to_ijk: DMat4,
    pixels: Vec<u8>,
    labels: Option<Vec<u8>>,
}

impl Slice {
    /// Standalone slice with unit spacing whose XY frame equals its pixel grid
    pub fn new(width: usize, height: usize, pixels: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(RendererError::InvalidSlice(format!(
                "empty slice {width}x{height}"
            )));
        }
        if pixels.len() != width * height * 4 {
            return Err(RendererError::InvalidSlice(format!(
                "expected {} RGBA bytes for {width}x{height}, got {}",
                width * height * 4,
                pixels.len()
            )));
        }
        let mut slice = Self {
            id: Uuid::new_v4(),
            width,
            height,
            width_spacing: 1.0,
            height_spacing: 1.0,
            xy_bbox: [0.0; 6],
            xy_to_ras: DMat4::IDENTITY,
            xy_to_ijk: DMat4::IDENTITY,
            pixels,
            labels: None,
        };
        slice.reset_frame();
        Ok(slice)
    }

    pub fn with_spacing(mut self, width_spacing: f64, height_spacing: f64) -> Self {
        self.width_spacing = width_spacing;
        self.height_spacing = height_spacing;
        self.reset_frame();
        self
    }

    /// Attach a label buffer. A buffer whose size does not match the slice
    /// is kept but contributes nothing when composited.
    pub fn with_labels(mut self, labels: Vec<u8>) -> Self {
        self.labels = Some(labels);
        self.id = Uuid::new_v4();
        self
    }

    fn reset_frame(&mut self) {
        self.xy_bbox = [
            0.0,
            (self.width - 1) as f64 * self.width_spacing,
            0.0,
            (self.height - 1) as f64 * self.height_spacing,
            0.0,
            0.0,
        ];
        self.xy_to_ras = DMat4::IDENTITY;
        self.xy_to_ijk = DMat4::from_scale(DVec3::new(
            1.0 / self.width_spacing,
            1.0 / self.height_spacing,
            1.0,
        ));
    }

    pub fn id(&self) -> SliceId {
        self.id
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width_spacing(&self) -> f64 {
        self.width_spacing
    }

    pub fn height_spacing(&self) -> f64 {
        self.height_spacing
    }

    pub fn xy_bbox(&self) -> &[f64; 6] {
        &self.xy_bbox
    }

    pub fn xy_to_ras(&self) -> &DMat4 {
        &self.xy_to_ras
    }

    pub fn xy_to_ijk(&self) -> &DMat4 {
        &self.xy_to_ijk
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn labels(&self) -> Option<&[u8]> {
        self.labels.as_deref()
    }
}

#[derive(Debug, Clone)]
pub struct SliceStack {
    info: StackInfo,
    slices: Vec<Slice>,
}

impl SliceStack {
    pub fn info(&self) -> &StackInfo {
        &self.info
    }

    pub fn get(&self, index: usize) -> Option<&Slice> {
        self.slices.get(index)
    }

    pub fn len(&self) -> usize {
        self.slices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }
}

/// Which label colors are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LabelFilter {
    #[default]
    ShowAll,
    ShowOnly([u8; 4]),
}

impl LabelFilter {
    /// Alpha value of a raw show-only color that means "show every label"
    pub const SHOW_ALL_ALPHA: i32 = -255;

    pub fn from_raw(rgba: [i32; 4]) -> Self {
        if rgba[3] == Self::SHOW_ALL_ALPHA {
            return LabelFilter::ShowAll;
        }
        LabelFilter::ShowOnly(rgba.map(|c| c.clamp(0, 255) as u8))
    }

    pub fn to_raw(&self) -> [i32; 4] {
        match self {
            LabelFilter::ShowAll => [Self::SHOW_ALL_ALPHA; 4],
            LabelFilter::ShowOnly(rgba) => rgba.map(i32::from),
        }
    }

    #[inline]
    pub fn accepts(&self, label: [u8; 4]) -> bool {
        match self {
            LabelFilter::ShowAll => true,
            LabelFilter::ShowOnly(rgba) => *rgba == label,
        }
    }
}

/// Display settings of a volume's label overlay
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelMap {
    pub visible: bool,
    pub opacity: f64,
    pub show_only: LabelFilter,
}

impl Default for LabelMap {
    fn default() -> Self {
        Self {
            visible: true,
            opacity: 1.0,
            show_only: LabelFilter::ShowAll,
        }
    }
}

/// Copy of every volume setting a frame depends on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeSnapshot {
    pub volume_id: Uuid,
    pub index: [usize; 3],
    pub min: f64,
    pub max: f64,
    pub lower_threshold: f64,
    pub upper_threshold: f64,
    pub window_low: f64,
    pub window_high: f64,
    pub label: Option<LabelMap>,
    pub stacks: [StackInfo; 3],
}

/// A scalar volume resliced into three perpendicular stacks.
///
/// Dimensions and indices are ordered (x, y, z); the source array is
/// (depth, height, width) as produced by the loader.
#[derive(Debug, Clone)]
pub struct Volume {
    id: Uuid,
    dimensions: [usize; 3],
    geometry: VolumeGeometry,
    stacks: [SliceStack; 3],
    index: [usize; 3],
    min: f64,
    max: f64,
    lower_threshold: f64,
    upper_threshold: f64,
    window_low: f64,
    window_high: f64,
    label: Option<LabelMap>,
}

impl Volume {
    pub fn new(data: Array3<u16>, spacing: (f32, f32, f32)) -> Result<Self> {
        Self::with_geometry(data, VolumeGeometry::new(spacing))
    }

    pub fn with_geometry(data: Array3<u16>, geometry: VolumeGeometry) -> Result<Self> {
        let (depth, height, width) = data.dim();
        if depth == 0 || height == 0 || width == 0 {
            return Err(RendererError::InvalidVolume(format!(
                "empty volume {width}x{height}x{depth}"
            )));
        }
        geometry.validate()?;

        let (min, max) = data
            .iter()
            .fold((u16::MAX, u16::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        let (min, max) = (min as f64, max as f64);
        let dimensions = [width, height, depth];

        let stacks = [0, 1, 2].map(|axis| {
            Self::build_stack(&data, axis, dimensions, &geometry, |view| {
                Self::slice_to_rgba(view, max)
            })
        });

        Ok(Self {
            id: Uuid::new_v4(),
            dimensions,
            geometry,
            stacks,
            index: dimensions.map(|n| n / 2),
            min,
            max,
            lower_threshold: min,
            upper_threshold: max,
            window_low: min,
            window_high: max,
            label: None,
        })
    }

    /// Color every voxel of `labels` through `colortable` and overlay the
    /// result on each slice.
    pub fn attach_label_map(&mut self, labels: &Array3<u16>, colortable: &Colortable) -> Result<()> {
        let (depth, height, width) = labels.dim();
        if [width, height, depth] != self.dimensions {
            return Err(RendererError::InvalidVolume(format!(
                "label map is {width}x{height}x{depth}, volume is {}x{}x{}",
                self.dimensions[0], self.dimensions[1], self.dimensions[2]
            )));
        }

        let geometry = &self.geometry;
        for (axis, stack) in self.stacks.iter_mut().enumerate() {
            stack
                .slices
                .par_iter_mut()
                .enumerate()
                .for_each(|(index, slice)| {
                    let view = Self::world_ordered_slice(labels, axis, index, geometry);
                    let rgba = view
                        .iter()
                        .flat_map(|&v| colortable.lookup(v as i64))
                        .collect();
                    slice.labels = Some(rgba);
                    slice.id = Uuid::new_v4();
                });
        }
        self.label.get_or_insert_with(LabelMap::default);
        Ok(())
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Get the dimensions of the volume (x, y, z)
    pub fn dimensions(&self) -> [usize; 3] {
        self.dimensions
    }

    pub fn geometry(&self) -> &VolumeGeometry {
        &self.geometry
    }

    pub fn stack(&self, axis: usize) -> &SliceStack {
        &self.stacks[axis]
    }

    pub fn index(&self, axis: usize) -> usize {
        self.index[axis]
    }

    /// Set the current slice of an axis, clamped to the stack. Returns the
    /// index actually applied.
    pub fn set_index(&mut self, axis: usize, index: usize) -> usize {
        let clamped = index.min(self.stacks[axis].len() - 1);
        self.index[axis] = clamped;
        clamped
    }

    pub fn current_slice(&self, axis: usize) -> &Slice {
        &self.stacks[axis].slices[self.index[axis]]
    }

    pub fn scalar_range(&self) -> (f64, f64) {
        (self.min, self.max)
    }

    pub fn threshold(&self) -> (f64, f64) {
        (self.lower_threshold, self.upper_threshold)
    }

    pub fn set_threshold(&mut self, lower: f64, upper: f64) {
        self.lower_threshold = lower.min(upper);
        self.upper_threshold = lower.max(upper);
    }

    pub fn window(&self) -> (f64, f64) {
        (self.window_low, self.window_high)
    }

    /// Set the display range. A range that is empty or inverted is refused.
    pub fn set_window(&mut self, low: f64, high: f64) -> bool {
        if !(high > low) {
            return false;
        }
        self.window_low = low;
        self.window_high = high;
        true
    }

    pub fn reset_window(&mut self) {
        self.window_low = self.min;
        self.window_high = self.max;
    }

    pub fn label_map(&self) -> Option<&LabelMap> {
        self.label.as_ref()
    }

    pub fn label_map_mut(&mut self) -> Option<&mut LabelMap> {
        self.label.as_mut()
    }

    pub fn snapshot(&self) -> VolumeSnapshot {
        VolumeSnapshot {
            volume_id: self.id,
            index: self.index,
            min: self.min,
            max: self.max,
            lower_threshold: self.lower_threshold,
            upper_threshold: self.upper_threshold,
            window_low: self.window_low,
            window_high: self.window_high,
            label: self.label,
            stacks: [0, 1, 2].map(|axis| self.stacks[axis].info),
        }
    }

    /// Data axes spanning the columns and rows of a slice on `axis`
    pub(crate) fn in_plane_axes(axis: usize) -> (usize, usize) {
        match axis {
            0 => (1, 2),
            1 => (0, 2),
            _ => (0, 1),
        }
    }

    fn get_slice_from_axis(data: &Array3<u16>, axis: usize, index: usize) -> ArrayView2<'_, u16> {
        match axis {
            0 => data.slice(s![.., .., index]),
            1 => data.slice(s![.., index, ..]),
            _ => data.slice(s![index, .., ..]),
        }
    }

    /// Slice `index` of `axis` with columns and rows running towards
    /// increasing world coordinates
    fn world_ordered_slice<'a>(
        data: &'a Array3<u16>,
        axis: usize,
        index: usize,
        geometry: &VolumeGeometry,
    ) -> ArrayView2<'a, u16> {
        let (u, v) = Self::in_plane_axes(axis);
        let mut view = Self::get_slice_from_axis(data, axis, index);
        if geometry.is_reversed(u) {
            view.invert_axis(Axis(1));
        }
        if geometry.is_reversed(v) {
            view.invert_axis(Axis(0));
        }
        view
    }

    #[inline]
    fn normalize_to_u8(value: u16, max: f64) -> u8 {
        if max <= 0.0 {
            return 0;
        }
        ((value as f64 / max) * 255.0).clamp(0.0, 255.0) as u8
    }

    fn slice_to_rgba(slice: &ArrayView2<'_, u16>, max: f64) -> Vec<u8> {
        slice
            .iter()
            .flat_map(|&v| {
                let gray = Self::normalize_to_u8(v, max);
                [gray, gray, gray, 255]
            })
            .collect()
    }

    fn build_stack<F>(
        data: &Array3<u16>,
        axis: usize,
        dimensions: [usize; 3],
        geometry: &VolumeGeometry,
        to_rgba: F,
    ) -> SliceStack
    where
        F: Fn(&ArrayView2<'_, u16>) -> Vec<u8> + Sync,
    {
        let (u, v) = Self::in_plane_axes(axis);
        let ijk_to_ras = geometry.ijk_to_ras();
        let ras_to_ijk = ijk_to_ras.inverse();

        let unit = |world_axis: usize| {
            let mut column = DVec4::ZERO;
            column[world_axis] = 1.0;
            column
        };
        let xy_to_ras = DMat4::from_cols(
            unit(geometry.world_axis(u)),
            unit(geometry.world_axis(v)),
            unit(geometry.world_axis(axis)),
            DVec4::W,
        );
        let ras_to_xy = xy_to_ras.inverse();
        let xy_to_ijk = ras_to_ijk * xy_to_ras;

        let (width, height) = (dimensions[u], dimensions[v]);
        let slices = (0..dimensions[axis])
            .into_par_iter()
            .map(|index| {
                let mut xy_bbox = [
                    f64::INFINITY,
                    f64::NEG_INFINITY,
                    f64::INFINITY,
                    f64::NEG_INFINITY,
                    f64::INFINITY,
                    f64::NEG_INFINITY,
                ];
                for (cu, cv) in [(0, 0), (width - 1, 0), (0, height - 1), (width - 1, height - 1)] {
                    let mut corner = DVec3::ZERO;
                    corner[u] = cu as f64;
                    corner[v] = cv as f64;
                    corner[axis] = index as f64;
                    let xy = ras_to_xy.transform_point3(ijk_to_ras.transform_point3(corner));
                    for c in 0..3 {
                        xy_bbox[2 * c] = xy_bbox[2 * c].min(xy[c]);
                        xy_bbox[2 * c + 1] = xy_bbox[2 * c + 1].max(xy[c]);
                    }
                }

                let view = Self::world_ordered_slice(data, axis, index, geometry);
                Slice {
                    id: Uuid::new_v4(),
                    width,
                    height,
                    width_spacing: geometry.spacing[u],
                    height_spacing: geometry.spacing[v],
                    xy_bbox,
                    xy_to_ras,
                    xy_to_ijk,
                    pixels: to_rgba(&view),
                    labels: None,
                }
            })
            .collect();

        let normal = geometry.directions[axis].normalize();
        SliceStack {
            info: StackInfo {
                normal,
                origin_d: -normal.dot(geometry.origin),
                spacing: geometry.spacing[axis],
                count: dimensions[axis],
            },
            slices,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_volume() -> Volume {
        // (depth, height, width) = (2, 3, 4)
        let data = Array3::from_shape_fn((2, 3, 4), |(z, y, x)| (100 * z + 10 * y + x) as u16);
        Volume::new(data, (1.0, 2.0, 3.0)).unwrap()
    }

    #[test]
    fn test_stack_dimensions_per_axis() {
        let volume = ramp_volume();
        assert_eq!(volume.dimensions(), [4, 3, 2]);

        let sagittal = volume.stack(0).get(0).unwrap();
        assert_eq!((sagittal.width(), sagittal.height()), (3, 2));
        assert_eq!((sagittal.width_spacing(), sagittal.height_spacing()), (2.0, 3.0));

        let coronal = volume.stack(1).get(0).unwrap();
        assert_eq!((coronal.width(), coronal.height()), (4, 2));

        let axial = volume.stack(2).get(1).unwrap();
        assert_eq!((axial.width(), axial.height()), (4, 3));
        assert_eq!(volume.stack(2).len(), 2);
    }

    #[test]
    fn test_scalar_range_and_defaults() {
        let volume = ramp_volume();
        assert_eq!(volume.scalar_range(), (0.0, 123.0));
        assert_eq!(volume.threshold(), (0.0, 123.0));
        assert_eq!(volume.window(), (0.0, 123.0));
        assert_eq!(volume.index(0), 2);
        assert_eq!(volume.index(2), 1);
    }

    #[test]
    fn test_slice_pixels_are_grayscale_rgba() {
        let volume = ramp_volume();
        let axial = volume.stack(2).get(1).unwrap();
        // voxel (x=3, y=2, z=1) = 123 = max
        let last = &axial.pixels()[axial.pixels().len() - 4..];
        assert_eq!(last, &[255, 255, 255, 255]);
        // voxel (x=0, y=0, z=1) = 100
        let gray = (100.0 / 123.0 * 255.0) as u8;
        assert_eq!(&axial.pixels()[0..4], &[gray, gray, gray, 255]);
    }

    #[test]
    fn test_set_index_clamps() {
        let mut volume = ramp_volume();
        assert_eq!(volume.set_index(2, 10), 1);
        assert_eq!(volume.index(2), 1);
        assert_eq!(volume.set_index(0, 0), 0);
    }

    #[test]
    fn test_stack_info_projects_world_points() {
        let volume = ramp_volume();
        let info = volume.stack(0).info();
        assert_eq!(info.count, 4);
        assert_eq!(info.index_of(DVec3::new(2.2, 0.0, 0.0)), 2);
        assert_eq!(info.index_of(DVec3::new(-5.0, 0.0, 0.0)), 0);
        assert_eq!(info.index_of(DVec3::new(50.0, 0.0, 0.0)), 3);
        assert!(info.is_increasing());
    }

    #[test]
    fn test_flipped_direction_keeps_index_projection() {
        let data = Array3::<u16>::zeros((3, 3, 3));
        let geometry = VolumeGeometry::new((1.0, 1.0, 2.0))
            .with_origin(DVec3::new(0.0, 0.0, 10.0))
            .with_directions([DVec3::X, DVec3::Y, DVec3::NEG_Z]);
        let volume = Volume::with_geometry(data, geometry).unwrap();
        let info = volume.stack(2).info();
        assert!(!info.is_increasing());
        assert_eq!(info.index_of(DVec3::new(0.0, 0.0, 6.0)), 2);
        assert_eq!(info.index_of(DVec3::new(0.0, 0.0, 10.0)), 0);
    }

    #[test]
    fn test_slice_frame_maps_to_index_space() {
        let volume = ramp_volume();
        let axial = volume.stack(2).get(1).unwrap();
        assert_eq!(axial.xy_bbox(), &[0.0, 3.0, 0.0, 4.0, 3.0, 3.0]);
        let ijk = axial.xy_to_ijk().transform_point3(DVec3::new(3.0, 4.0, 3.0));
        assert!((ijk - DVec3::new(3.0, 2.0, 1.0)).length() < 1e-9);
    }

    #[test]
    fn test_reversed_axes_are_stored_in_world_order() {
        let data = Array3::from_shape_fn((2, 3, 4), |(z, y, x)| (100 * z + 10 * y + x) as u16);
        let geometry = VolumeGeometry::new((1.0, 1.0, 1.0))
            .with_directions([DVec3::NEG_X, DVec3::Y, DVec3::NEG_Z]);
        let volume = Volume::with_geometry(data, geometry).unwrap();
        let gray = |value: f64| (value / 123.0 * 255.0) as u8;

        // axial slice z=1: first stored column is x=3, rows unchanged
        let axial = volume.stack(2).get(1).unwrap();
        assert_eq!(axial.pixels()[0], gray(103.0));
        assert_eq!(axial.pixels()[4 * 4], gray(113.0));

        // coronal slice y=0: columns run x=3..0, rows z=1..0
        let coronal = volume.stack(1).get(0).unwrap();
        assert_eq!(coronal.pixels()[0], gray(103.0));
        assert_eq!(coronal.pixels()[4 * 4], gray(3.0));
    }

    #[test]
    fn test_rejects_empty_and_degenerate_volumes() {
        assert!(Volume::new(Array3::zeros((0, 2, 2)), (1.0, 1.0, 1.0)).is_err());
        assert!(Volume::new(Array3::zeros((2, 2, 2)), (0.0, 1.0, 1.0)).is_err());
        let geometry = VolumeGeometry::new((1.0, 1.0, 1.0)).with_directions([DVec3::X, DVec3::X, DVec3::Z]);
        assert!(Volume::with_geometry(Array3::zeros((2, 2, 2)), geometry).is_err());
    }

    #[test]
    fn test_attach_label_map_colors_and_reissues_ids() {
        let mut volume = ramp_volume();
        let before = volume.stack(2).get(0).unwrap().id();
        let labels = Array3::from_shape_fn((2, 3, 4), |(_, _, x)| (x % 2) as u16);
        volume.attach_label_map(&labels, &Colortable::categorical()).unwrap();

        let axial = volume.stack(2).get(0).unwrap();
        assert_ne!(axial.id(), before);
        let label_rgba = axial.labels().unwrap();
        assert_eq!(&label_rgba[0..4], &[0, 0, 0, 0]);
        assert_eq!(&label_rgba[4..8], &[100, 100, 130, 255]);
        assert_eq!(volume.label_map(), Some(&LabelMap::default()));

        let wrong = Array3::<u16>::zeros((1, 1, 1));
        assert!(volume.attach_label_map(&wrong, &Colortable::categorical()).is_err());
    }

    #[test]
    fn test_label_filter_sentinel() {
        assert_eq!(LabelFilter::from_raw([-255; 4]), LabelFilter::ShowAll);
        assert_eq!(LabelFilter::from_raw([1, 2, 3, 255]), LabelFilter::ShowOnly([1, 2, 3, 255]));
        assert!(LabelFilter::ShowAll.accepts([9, 9, 9, 9]));
        assert!(!LabelFilter::ShowOnly([1, 2, 3, 255]).accepts([1, 2, 3, 0]));
        assert_eq!(LabelFilter::ShowAll.to_raw()[3], LabelFilter::SHOW_ALL_ALPHA);
    }

    #[test]
    fn test_window_refuses_empty_range() {
        let mut volume = ramp_volume();
        assert!(!volume.set_window(50.0, 50.0));
        assert!(volume.set_window(10.0, 60.0));
        assert_eq!(volume.window(), (10.0, 60.0));
        volume.reset_window();
        assert_eq!(volume.window(), (0.0, 123.0));
    }

    #[test]
    fn test_standalone_slice_validation() {
        assert!(Slice::new(2, 2, vec![0; 16]).is_ok());
        assert!(Slice::new(2, 2, vec![0; 15]).is_err());
        assert!(Slice::new(0, 2, vec![]).is_err());
    }
}
