use glam::DVec2;

/// Pan, zoom and viewport size of a 2D view.
///
/// Pan is in view units with y pointing up; it is scaled by the zoom when
/// applied to device space. The state knows nothing about the slice shown.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    pan: DVec2,
    zoom: f64,
    viewport: DVec2,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            pan: DVec2::ZERO,
            zoom: 1.0,
            viewport: DVec2::ZERO,
        }
    }
}

impl ViewState {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            viewport: DVec2::new(width, height),
            ..Default::default()
        }
    }

    pub fn pan(&self) -> DVec2 {
        self.pan
    }

    pub fn set_pan(&mut self, pan: DVec2) {
        self.pan = pan;
    }

    pub fn pan_by(&mut self, delta: DVec2) {
        self.pan += delta;
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Non-positive and non-finite zoom values are ignored
    pub fn set_zoom(&mut self, zoom: f64) {
        if zoom.is_finite() && zoom > 0.0 {
            self.zoom = zoom;
        }
    }

    pub fn zoom_by(&mut self, factor: f64) {
        self.set_zoom(self.zoom * factor);
    }

    pub fn viewport(&self) -> DVec2 {
        self.viewport
    }

    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.viewport = DVec2::new(width, height);
    }

    pub fn center(&self) -> DVec2 {
        self.viewport / 2.0
    }

    /// Zoom so a footprint of the given physical size fits the viewport.
    pub fn auto_scale(&mut self, footprint: DVec2) {
        if footprint.x <= 0.0 || footprint.y <= 0.0 {
            return;
        }
        let scale = self.viewport / footprint;
        self.set_zoom(scale.x.min(scale.y));
    }

    /// Back to no pan and unit zoom; the viewport is kept.
    pub fn reset(&mut self) {
        self.pan = DVec2::ZERO;
        self.zoom = 1.0;
    }
}
