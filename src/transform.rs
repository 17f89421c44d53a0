//! Mapping between device pixels and volume index/world space.
//!
//! Three frames are involved:
//!  - device: viewport pixels, origin top-left
//!  - display: slice pixels as laid out on screen, before pan/zoom
//!  - slice: pixel grid of the stored slice buffer, with pixel `c` covering
//!    `[c, c + 1)` so that voxel centres sit at half-integer coordinates
//!
//! Each orientation flips display against slice differently because every
//! anatomical plane has its own handedness relative to the device. For the
//! sagittal plane the displayed image is also rotated by 90 degrees, so
//! width and height swap roles.

use glam::{DVec2, DVec3};

use crate::enums::Orientation;
use crate::view::ViewState;
use crate::volume::{Slice, StackInfo, Volume};

/// Result of mapping a device point into the volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pick {
    /// Nearest voxel, clamped to the volume
    pub index: [usize; 3],
    /// Continuous index-space position
    pub ijk: DVec3,
    /// World position
    pub ras: DVec3,
}

/// Slice dimensions and spacing in display order
fn display_dims(orientation: Orientation, slice: &Slice) -> (DVec2, DVec2) {
    match orientation {
        Orientation::Sagittal => (
            DVec2::new(slice.height() as f64, slice.width() as f64),
            DVec2::new(slice.height_spacing(), slice.width_spacing()),
        ),
        Orientation::Coronal | Orientation::Axial => (
            DVec2::new(slice.width() as f64, slice.height() as f64),
            DVec2::new(slice.width_spacing(), slice.height_spacing()),
        ),
    }
}

/// Physical width and height a slice covers on screen at unit zoom.
pub fn display_extent(orientation: Orientation, slice: &Slice) -> DVec2 {
    let (dims, spacing) = display_dims(orientation, slice);
    dims * spacing
}

/// Scaled, panned rectangle the slice occupies in device space.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Footprint {
    origin: DVec2,
    size: DVec2,
    /// Slice dimensions in display order
    dims: DVec2,
}

#[derive(Debug, Clone, Copy)]
pub struct SliceTransform<'a> {
    orientation: Orientation,
    slice: &'a Slice,
    stacks: [StackInfo; 3],
    footprint: Footprint,
}

impl<'a> SliceTransform<'a> {
    /// `min_scale` floors the view zoom for this mapping.
    pub fn new(
        orientation: Orientation,
        slice: &'a Slice,
        stacks: [StackInfo; 3],
        view: &ViewState,
        min_scale: f64,
    ) -> Self {
        let (dims, spacing) = display_dims(orientation, slice);
        let scale = view.zoom().max(min_scale);
        let size = dims * spacing * scale;
        // view pan has y up
        let pan = DVec2::new(view.pan().x, -view.pan().y);
        let origin = view.center() - size / 2.0 + pan * scale;

        Self {
            orientation,
            slice,
            stacks,
            footprint: Footprint { origin, size, dims },
        }
    }

    /// Transform for the volume's current slice along the orientation axis.
    pub fn for_volume(
        orientation: Orientation,
        volume: &'a Volume,
        view: &ViewState,
        min_scale: f64,
    ) -> Self {
        let slice = volume.current_slice(orientation.axis_index());
        let stacks = [0, 1, 2].map(|axis| *volume.stack(axis).info());
        Self::new(orientation, slice, stacks, view, min_scale)
    }

    pub fn slice(&self) -> &'a Slice {
        self.slice
    }

    /// Device-space rectangle of the slice as (top-left, size)
    pub fn footprint(&self) -> (DVec2, DVec2) {
        (self.footprint.origin, self.footprint.size)
    }

    /// Hit test against the open footprint rectangle
    pub fn contains(&self, device: DVec2) -> bool {
        let Footprint { origin, size, .. } = self.footprint;
        device.x > origin.x
            && device.x < origin.x + size.x
            && device.y > origin.y
            && device.y < origin.y + size.y
    }

    /// Map a device point to the volume. `None` when it misses the slice.
    pub fn device_to_index(&self, x: f64, y: f64) -> Option<Pick> {
        let device = DVec2::new(x, y);
        if !self.contains(device) {
            return None;
        }

        let normalized = (device - self.footprint.origin) / self.footprint.size;
        let local = self.display_to_slice(normalized * self.footprint.dims);

        let xy = self.slice_to_xy(local);
        let ijk = self.slice.xy_to_ijk().transform_point3(xy);
        let ras = self.slice.xy_to_ras().transform_point3(xy);
        let index = self.stacks.map(|stack| stack.index_of(ras));

        Some(Pick { index, ijk, ras })
    }

    /// Map a continuous index-space point back to device space. Exact
    /// inverse of [`device_to_index`](Self::device_to_index) for the `ijk`
    /// it returns.
    pub fn index_to_device(&self, ijk: DVec3) -> DVec2 {
        let xy = self.slice.xy_to_ijk().inverse().transform_point3(ijk);
        let bbox = self.slice.xy_bbox();
        let local = DVec2::new(
            (xy.x - bbox[0]) / self.slice.width_spacing() + 0.5,
            (xy.y - bbox[2]) / self.slice.height_spacing() + 0.5,
        );
        self.display_to_device(self.slice_to_display(local))
    }

    /// Map an in-plane voxel position (`i` along the column axis, `j` along
    /// the row axis of the slice) to device space.
    ///
    /// Stored columns and rows run with world coordinates, so an axis
    /// sampled against its world direction is read back to front.
    pub fn slice_ij_to_device(&self, i: f64, j: f64) -> DVec2 {
        let (u, v) = Volume::in_plane_axes(self.orientation.axis_index());
        let last_col = (self.slice.width() - 1) as f64;
        let last_row = (self.slice.height() - 1) as f64;
        let col = if self.stacks[u].is_increasing() { i } else { last_col - i };
        let row = if self.stacks[v].is_increasing() { j } else { last_row - j };

        let local = DVec2::new(col, row) + 0.5;
        self.display_to_device(self.slice_to_display(local))
    }

    fn display_to_device(&self, display: DVec2) -> DVec2 {
        self.footprint.origin + display / self.footprint.dims * self.footprint.size
    }

    fn slice_to_xy(&self, local: DVec2) -> DVec3 {
        let bbox = self.slice.xy_bbox();
        DVec3::new(
            bbox[0] + (local.x - 0.5) * self.slice.width_spacing(),
            bbox[2] + (local.y - 0.5) * self.slice.height_spacing(),
            bbox[4],
        )
    }

    fn display_to_slice(&self, display: DVec2) -> DVec2 {
        let DVec2 { x: width, y: height } = self.footprint.dims;
        match self.orientation {
            // invert then swap to undo the +90 degree rotation
            Orientation::Sagittal => DVec2::new(display.y, width - display.x),
            Orientation::Coronal => DVec2::new(width - display.x, display.y),
            Orientation::Axial => DVec2::new(width - display.x, height - display.y),
        }
    }

    fn slice_to_display(&self, local: DVec2) -> DVec2 {
        let DVec2 { x: width, y: height } = self.footprint.dims;
        match self.orientation {
            // swap first, then invert
            Orientation::Sagittal => {
                let swapped = DVec2::new(local.y, local.x);
                DVec2::new(width - swapped.x, swapped.y)
            }
            Orientation::Coronal => DVec2::new(width - local.x, local.y),
            Orientation::Axial => DVec2::new(width - local.x, height - local.y),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::VolumeGeometry;
    use ndarray::Array3;

    fn volume() -> Volume {
        // x=8, y=6, z=4
        Volume::new(Array3::<u16>::zeros((4, 6, 8)), (1.0, 1.0, 2.0)).unwrap()
    }

    #[test]
    fn test_footprint_is_centered_and_scaled() {
        let volume = volume();
        let view = ViewState::new(100.0, 100.0);
        let transform = SliceTransform::for_volume(Orientation::Axial, &volume, &view, 0.6);
        let (origin, size) = transform.footprint();
        assert_eq!(size, DVec2::new(8.0, 6.0));
        assert_eq!(origin, DVec2::new(46.0, 47.0));
    }

    #[test]
    fn test_zoom_is_floored_for_picking() {
        let volume = volume();
        let mut view = ViewState::new(100.0, 100.0);
        view.set_zoom(0.1);
        let transform = SliceTransform::for_volume(Orientation::Axial, &volume, &view, 0.6);
        let (_, size) = transform.footprint();
        assert!((size - DVec2::new(4.8, 3.6)).length() < 1e-12);
    }

    #[test]
    fn test_pan_moves_footprint_with_flipped_y() {
        let volume = volume();
        let mut view = ViewState::new(100.0, 100.0);
        view.set_zoom(2.0);
        view.set_pan(DVec2::new(5.0, 5.0));
        let transform = SliceTransform::for_volume(Orientation::Axial, &volume, &view, 0.6);
        let (origin, size) = transform.footprint();
        assert_eq!(size, DVec2::new(16.0, 12.0));
        assert_eq!(origin, DVec2::new(50.0 - 8.0 + 10.0, 50.0 - 6.0 - 10.0));
    }

    #[test]
    fn test_sagittal_swaps_footprint() {
        let volume = volume();
        let view = ViewState::new(100.0, 100.0);
        let transform = SliceTransform::for_volume(Orientation::Sagittal, &volume, &view, 0.6);
        // stored sagittal slice is y=6 wide and z=4 (spacing 2) high
        let (_, size) = transform.footprint();
        assert_eq!(size, DVec2::new(8.0, 6.0));
    }

    #[test]
    fn test_points_outside_footprint_are_rejected() {
        let volume = volume();
        let view = ViewState::new(100.0, 100.0);
        let transform = SliceTransform::for_volume(Orientation::Axial, &volume, &view, 0.6);
        assert!(transform.device_to_index(10.0, 10.0).is_none());
        // edges are outside
        assert!(transform.device_to_index(46.0, 50.0).is_none());
        assert!(transform.device_to_index(54.0, 50.0).is_none());
        assert!(transform.device_to_index(50.0, 50.0).is_some());
    }

    #[test]
    fn test_axial_pick_inverts_both_axes() {
        let volume = volume();
        let view = ViewState::new(100.0, 100.0);
        let transform = SliceTransform::for_volume(Orientation::Axial, &volume, &view, 0.6);
        // near the top-left corner of the footprint
        let pick = transform.device_to_index(46.2, 47.2).unwrap();
        assert_eq!(pick.index[0], 7);
        assert_eq!(pick.index[1], 6 - 1);
        assert_eq!(pick.index[2], volume.index(2));
        assert!((pick.ijk.x - 7.3).abs() < 1e-9);
        assert!((pick.ijk.y - 5.3).abs() < 1e-9);
        assert!((pick.ras.z - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_slice_ij_matches_index_mapping_for_default_directions() {
        let volume = volume();
        let mut view = ViewState::new(120.0, 90.0);
        view.set_zoom(3.0);
        view.set_pan(DVec2::new(-2.0, 1.5));
        for orientation in [Orientation::Sagittal, Orientation::Coronal, Orientation::Axial] {
            let transform = SliceTransform::for_volume(orientation, &volume, &view, 0.6);
            let n = volume.index(orientation.axis_index()) as f64;
            let (i, j) = (2.0, 1.0);
            let ijk = match orientation {
                Orientation::Sagittal => DVec3::new(n, i, j),
                Orientation::Coronal => DVec3::new(i, n, j),
                Orientation::Axial => DVec3::new(i, j, n),
            };
            let a = transform.slice_ij_to_device(i, j);
            let b = transform.index_to_device(ijk);
            assert!((a - b).length() < 1e-9, "{orientation}: {a} vs {b}");
        }
    }

    #[test]
    fn test_slice_ij_follows_reversed_sample_direction() {
        let geometry = VolumeGeometry::new((1.0, 1.0, 1.0))
            .with_directions([DVec3::NEG_X, DVec3::Y, DVec3::Z]);
        let flipped = Volume::with_geometry(Array3::<u16>::zeros((4, 6, 8)), geometry).unwrap();
        let straight = Volume::new(Array3::<u16>::zeros((4, 6, 8)), (1.0, 1.0, 1.0)).unwrap();
        let view = ViewState::new(100.0, 100.0);

        let a = SliceTransform::for_volume(Orientation::Axial, &straight, &view, 0.6)
            .slice_ij_to_device(1.0, 2.0);
        let b = SliceTransform::for_volume(Orientation::Axial, &flipped, &view, 0.6)
            .slice_ij_to_device(1.0, 2.0);
        // column mirrored, row unchanged
        assert_eq!(a.y, b.y);
        assert!((a.x + b.x - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_pixel_centre_picks_its_own_voxel() {
        let volume = volume();
        let view = ViewState::new(100.0, 100.0);
        let transform = SliceTransform::for_volume(Orientation::Axial, &volume, &view, 0.6);
        // display cell (0, 0) holds the last column and row
        let pick = transform.device_to_index(46.5, 47.5).unwrap();
        assert_eq!(&pick.index[..2], &[7, 5]);
        assert!((pick.ijk - DVec3::new(7.0, 5.0, 2.0)).length() < 1e-9);
        let corner = transform.device_to_index(53.99, 52.99).unwrap();
        assert_eq!(&corner.index[..2], &[0, 0]);
    }
}
