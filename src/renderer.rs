//! Frame orchestration for a single 2D slice view.
//!
//! A [`Renderer2D`] owns the view state and compositor of one viewing
//! plane. The volume and its loader stay with the caller and are passed in
//! per call; every frame works from a [`VolumeSnapshot`] taken at its start.

use std::f64::consts::FRAC_PI_2;

use glam::{DAffine2, DVec2, DVec3};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::colortable::Colortable;
use crate::compositor::{Composite, SliceCompositor};
use crate::config::RendererConfig;
use crate::enums::{AnnotationColor, ColortableId, Orientation};
use crate::error::{NotReady, Result};
use crate::surface::Surface;
use crate::transform::{Pick, SliceTransform, display_extent};
use crate::view::ViewState;
use crate::volume::{Slice, SliceId, Volume, VolumeSnapshot};
use crate::volume_loader::LoadProgress;

/// Outcome of [`Renderer2D::render`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// Both layers were blitted. `redrawn` is false when the compositor
    /// reused its buffers.
    Drawn { redrawn: bool },
    /// Nothing was drawn
    NotReady(NotReady),
}

/// Geometry of the slice last drawn
#[derive(Debug, Clone, Copy, PartialEq)]
struct SliceGeometry {
    slice_id: SliceId,
    width: usize,
    height: usize,
    width_spacing: f64,
    height_spacing: f64,
}

impl SliceGeometry {
    fn of(slice: &Slice) -> Self {
        Self {
            slice_id: slice.id(),
            width: slice.width(),
            height: slice.height(),
            width_spacing: slice.width_spacing(),
            height_spacing: slice.height_spacing(),
        }
    }

    /// Unrotated physical size of the stored slice
    fn size(&self) -> DVec2 {
        DVec2::new(
            self.width as f64 * self.width_spacing,
            self.height as f64 * self.height_spacing,
        )
    }
}

#[derive(Debug, Clone)]
pub struct Renderer2D {
    config: RendererConfig,
    orientation: Orientation,
    view: ViewState,
    compositor: SliceCompositor,
    geometry: Option<SliceGeometry>,
    volume_id: Option<Uuid>,
    not_ready: Option<NotReady>,
    radiological: bool,
}

impl Renderer2D {
    /// Create a renderer for the plane named by `orientation`.
    ///
    /// # Errors
    ///
    /// `InvalidOrientation` when the name is not an axis letter or plane name.
    pub fn new(config: RendererConfig, orientation: &str) -> Result<Self> {
        let orientation: Orientation = orientation.parse()?;
        let compositor = SliceCompositor::new(Colortable::builtin(config.colortable));
        Ok(Self {
            config,
            orientation,
            view: ViewState::default(),
            compositor,
            geometry: None,
            volume_id: None,
            not_ready: None,
            radiological: true,
        })
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Switch the viewing plane. On error the current plane is kept.
    pub fn set_orientation(&mut self, name: &str) -> Result<()> {
        let orientation: Orientation = name.parse()?;
        if orientation != self.orientation {
            debug!(from = %self.orientation, to = %orientation, "Orientation changed");
            self.orientation = orientation;
            self.invalidate();
        }
        Ok(())
    }

    /// Whether the caller treats the view in radiological convention
    /// (patient left on screen right). Frames are laid out the same either way.
    pub fn radiological(&self) -> bool {
        self.radiological
    }

    pub fn set_radiological(&mut self, radiological: bool) {
        self.radiological = radiological;
    }

    pub fn orientation_colors(&self) -> [AnnotationColor; 2] {
        self.orientation.annotation_colors()
    }

    /// Install built-in colortable `id`. Unknown ids leave the current
    /// table in place.
    pub fn set_colortable(&mut self, id: u8) -> Result<()> {
        let id = ColortableId::try_from(id)?;
        info!(colortable = ?id, "Colortable selected");
        self.compositor.set_colortable(Colortable::builtin(id));
        Ok(())
    }

    pub fn set_custom_colortable(&mut self, colortable: Colortable) {
        info!("Custom colortable installed");
        self.compositor.set_colortable(colortable);
    }

    pub fn compositor(&self) -> &SliceCompositor {
        &self.compositor
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut ViewState {
        &mut self.view
    }

    /// Resize the viewport and fit the last drawn slice into it.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.view.set_viewport(width as f64, height as f64);
        if let Some(geometry) = self.geometry {
            self.view.auto_scale(self.display_size(geometry));
        }
    }

    /// Drop cached geometry and buffers so the next frame starts over.
    pub fn invalidate(&mut self) {
        self.geometry = None;
        self.volume_id = None;
        self.compositor.invalidate();
    }

    /// Centre and fit the current slice and restore the full window.
    pub fn reset_view(&mut self, volume: &mut Volume) {
        self.view.reset();
        let slice = volume.current_slice(self.orientation.axis_index());
        self.view.auto_scale(display_extent(self.orientation, slice));
        volume.reset_window();
    }

    /// Step the slice index of this plane by one. Returns the index applied.
    pub fn on_scroll(&self, volume: &mut Volume, up: bool) -> usize {
        let axis = self.orientation.axis_index();
        let current = volume.index(axis);
        let next = if up {
            current.saturating_add(1)
        } else {
            current.saturating_sub(1)
        };
        volume.set_index(axis, next)
    }

    /// Apply a window/level drag. `window` widens or narrows the display
    /// range, `level` shifts it. Returns whether the window changed.
    pub fn on_window_level(&self, volume: &mut Volume, window: f64, level: f64) -> bool {
        let steps = self.config.window_level_steps;
        let (low, high) = volume.window();
        let (min, max) = volume.scalar_range();

        let old_window = high - low;
        let old_level = old_window / 2.0;
        let mut new_window = (old_window + (old_window / steps) * -window).trunc();
        let mut new_level = (old_level + (old_level / steps) * level).trunc();
        // a drag always moves the window
        if new_window == old_window {
            new_window += 1.0;
        }
        if new_level == old_level {
            new_level += 1.0;
        }

        let level_delta = (old_level - new_level).trunc();
        let window_delta = (old_window - new_window).trunc();
        let new_low = (low - level_delta - window_delta).max(min);
        let new_high = (high - level_delta + window_delta).min(max);

        if !volume.set_window(new_low, new_high) {
            debug!(low = new_low, high = new_high, "Window/level would collapse the window");
            return false;
        }
        volume.window() != (low, high)
    }

    /// Map a device point to the volume; `None` outside the slice.
    pub fn pick(&self, volume: &Volume, x: f64, y: f64) -> Option<Pick> {
        self.transform(volume).device_to_index(x, y)
    }

    pub fn index_to_device(&self, volume: &Volume, ijk: DVec3) -> DVec2 {
        self.transform(volume).index_to_device(ijk)
    }

    pub fn slice_ij_to_device(&self, volume: &Volume, i: f64, j: f64) -> DVec2 {
        self.transform(volume).slice_ij_to_device(i, j)
    }

    fn transform<'a>(&self, volume: &'a Volume) -> SliceTransform<'a> {
        SliceTransform::for_volume(
            self.orientation,
            volume,
            &self.view,
            self.config.pick_min_scale,
        )
    }

    fn display_size(&self, geometry: SliceGeometry) -> DVec2 {
        let size = geometry.size();
        match self.orientation {
            Orientation::Sagittal => DVec2::new(size.y, size.x),
            Orientation::Coronal | Orientation::Axial => size,
        }
    }

    /// Draw one frame of `volume` onto `surface`.
    ///
    /// Missing input is not an error: the frame is skipped and the reason
    /// returned, and the caller simply tries again on the next frame.
    pub fn render(
        &mut self,
        volume: Option<&Volume>,
        loader: Option<&dyn LoadProgress>,
        surface: &mut dyn Surface,
    ) -> FrameStatus {
        let Some(volume) = volume else {
            return self.skip(NotReady::NoVolume);
        };
        let Some(loader) = loader else {
            return self.skip(NotReady::NoLoader);
        };
        if !loader.completed() {
            return self.skip(NotReady::LoaderPending);
        }
        if let Some(reason) = self.not_ready.take() {
            info!(after = %reason, "Rendering resumed");
        }

        let snapshot = volume.snapshot();
        let axis = self.orientation.axis_index();
        let slice = volume.current_slice(axis);

        if self.volume_id != Some(snapshot.volume_id) {
            debug!(volume = %snapshot.volume_id, "New volume attached");
            self.invalidate();
            self.volume_id = Some(snapshot.volume_id);
            self.view.auto_scale(display_extent(self.orientation, slice));
        }
        let geometry = self.sync_geometry(slice);

        let outcome = self.compositor.composite(self.orientation, slice, &snapshot);
        self.blit(surface, geometry, &snapshot);

        FrameStatus::Drawn {
            redrawn: matches!(outcome, Composite::Redrawn { .. }),
        }
    }

    fn sync_geometry(&mut self, slice: &Slice) -> SliceGeometry {
        let geometry = SliceGeometry::of(slice);
        if self.geometry.map(|g| g.slice_id) != Some(geometry.slice_id) {
            debug!(
                width = geometry.width,
                height = geometry.height,
                "Slice geometry updated"
            );
            self.geometry = Some(geometry);
        }
        geometry
    }

    fn blit(&self, surface: &mut dyn Surface, geometry: SliceGeometry, snapshot: &VolumeSnapshot) {
        surface.clear();

        let scale = self.view.zoom().max(self.config.render_min_scale);
        let mut transform = DAffine2::from_scale(DVec2::splat(scale))
            * DAffine2::from_translation(self.view.center() / scale);
        // device y points down
        let mut pan = DVec2::new(self.view.pan().x, -self.view.pan().y);
        if self.orientation == Orientation::Sagittal {
            transform = transform * DAffine2::from_angle(FRAC_PI_2);
            pan = DVec2::new(pan.y, -pan.x);
        }
        surface.set_transform(transform);

        let size = geometry.size();
        let offset = -size / 2.0 + pan;
        surface.blit(self.compositor.image(), offset, size, 1.0);

        if let Some(label) = snapshot.label {
            if label.visible && self.compositor.has_labels() {
                surface.blit(self.compositor.label(), offset, size, label.opacity);
            }
        }
    }

    fn skip(&mut self, reason: NotReady) -> FrameStatus {
        if self.not_ready == Some(reason) {
            debug!(%reason, "Frame skipped");
        } else {
            warn!(%reason, orientation = %self.orientation, "Frame skipped");
            self.not_ready = Some(reason);
        }
        FrameStatus::NotReady(reason)
    }
}
