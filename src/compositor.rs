//! Per-pixel remapping of a slice into an image layer and a label layer.
//!
//! The remap runs only when something that affects pixel color changed since
//! the last pass; otherwise the existing buffers are reused as they are.

use image::RgbaImage;
use tracing::debug;

use crate::colortable::Colortable;
use crate::enums::Orientation;
use crate::volume::{LabelFilter, Slice, SliceId, VolumeSnapshot};

const TRANSPARENT: [u8; 4] = [0, 0, 0, 0];

/// RGBA8 pixel buffer, row-major with the origin at the top-left.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl PixelBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height * 4],
        }
    }

    /// Buffer holding `pixels` row by row. `None` when the count does not
    /// match the dimensions.
    pub fn from_pixels(width: usize, height: usize, pixels: &[[u8; 4]]) -> Option<Self> {
        if pixels.len() != width * height {
            return None;
        }
        Some(Self {
            width,
            height,
            data: bytemuck::cast_slice(pixels).to_vec(),
        })
    }

    /// Reallocate to new dimensions. Contents are cleared only when the
    /// size actually changes.
    pub fn resize(&mut self, width: usize, height: usize) -> bool {
        if self.width == width && self.height == height {
            return false;
        }
        *self = Self::new(width, height);
        true
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn pixels(&self) -> &[[u8; 4]] {
        bytemuck::cast_slice(&self.data)
    }

    fn pixels_mut(&mut self) -> &mut [[u8; 4]] {
        bytemuck::cast_slice_mut(&mut self.data)
    }

    pub fn pixel(&self, x: usize, y: usize) -> [u8; 4] {
        self.pixels()[y * self.width + x]
    }

    pub fn to_image(&self) -> Option<RgbaImage> {
        RgbaImage::from_raw(self.width as u32, self.height as u32, self.data.clone())
    }
}

/// Settings the buffers were last drawn with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderCache {
    pub slice_id: SliceId,
    pub slice_index: usize,
    pub lower_threshold: f64,
    pub upper_threshold: f64,
    /// Window bounds normalized by the scalar maximum
    pub window_low: f64,
    pub window_high: f64,
    /// `None` when the volume has no label map
    pub show_only: Option<LabelFilter>,
}

impl RenderCache {
    fn live(orientation: Orientation, slice: &Slice, snapshot: &VolumeSnapshot) -> Self {
        let scale = if snapshot.max > 0.0 { snapshot.max } else { 1.0 };
        Self {
            slice_id: slice.id(),
            slice_index: snapshot.index[orientation.axis_index()],
            lower_threshold: snapshot.lower_threshold,
            upper_threshold: snapshot.upper_threshold,
            window_low: snapshot.window_low / scale,
            window_high: snapshot.window_high / scale,
            show_only: snapshot.label.map(|label| label.show_only),
        }
    }

    /// Whether buffers drawn with `self` are stale for `live`. The show-only
    /// color only matters while a label map exists.
    fn is_stale_for(&self, live: &RenderCache) -> bool {
        self.slice_id != live.slice_id
            || self.slice_index != live.slice_index
            || self.lower_threshold != live.lower_threshold
            || self.upper_threshold != live.upper_threshold
            || self.window_low != live.window_low
            || self.window_high != live.window_high
            || (live.show_only.is_some() && self.show_only != live.show_only)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Composite {
    /// Buffers were recomputed; `pixels` per layer were written
    Redrawn { pixels: usize },
    /// Nothing changed, buffers reused
    Cached,
}

/// Maps a source pixel index to its destination index: `(index, width, len)`
type Permutation = fn(usize, usize, usize) -> usize;

fn straight(index: usize, _width: usize, _len: usize) -> usize {
    index
}

fn mirror_columns(index: usize, width: usize, _len: usize) -> usize {
    let row = index / width;
    let col = index % width;
    row * width + (width - 1 - col)
}

fn mirror_all(index: usize, _width: usize, len: usize) -> usize {
    len - 1 - index
}

fn permutation_for(orientation: Orientation) -> Permutation {
    match orientation {
        Orientation::Sagittal => straight,
        Orientation::Coronal => mirror_columns,
        Orientation::Axial => mirror_all,
    }
}

#[derive(Debug, Clone)]
pub struct SliceCompositor {
    image: PixelBuffer,
    label: PixelBuffer,
    colortable: Colortable,
    colortable_changed: bool,
    cache: Option<RenderCache>,
    has_labels: bool,
}

impl SliceCompositor {
    pub fn new(colortable: Colortable) -> Self {
        Self {
            image: PixelBuffer::default(),
            label: PixelBuffer::default(),
            colortable,
            colortable_changed: false,
            cache: None,
            has_labels: false,
        }
    }

    pub fn image(&self) -> &PixelBuffer {
        &self.image
    }

    pub fn label(&self) -> &PixelBuffer {
        &self.label
    }

    /// Whether the label layer holds overlay content from the last pass
    pub fn has_labels(&self) -> bool {
        self.has_labels
    }

    pub fn colortable(&self) -> &Colortable {
        &self.colortable
    }

    pub fn set_colortable(&mut self, colortable: Colortable) {
        self.colortable = colortable;
        self.colortable_changed = true;
    }

    pub fn cache(&self) -> Option<&RenderCache> {
        self.cache.as_ref()
    }

    /// Forget the drawn state so the next pass remaps unconditionally
    pub fn invalidate(&mut self) {
        self.cache = None;
    }

    /// True when the buffers match the given live settings
    pub fn is_clean(
        &self,
        orientation: Orientation,
        slice: &Slice,
        snapshot: &VolumeSnapshot,
    ) -> bool {
        let live = RenderCache::live(orientation, slice, snapshot);
        !self.needs_redraw(&live)
    }

    fn needs_redraw(&self, live: &RenderCache) -> bool {
        match &self.cache {
            None => true,
            Some(cache) => self.colortable_changed || cache.is_stale_for(live),
        }
    }

    /// Bring both layers up to date with `slice` and the volume settings.
    pub fn composite(
        &mut self,
        orientation: Orientation,
        slice: &Slice,
        snapshot: &VolumeSnapshot,
    ) -> Composite {
        let live = RenderCache::live(orientation, slice, snapshot);
        if !self.needs_redraw(&live) {
            return Composite::Cached;
        }

        debug!(
            orientation = %orientation,
            slice = live.slice_index,
            "Redraw required"
        );

        let (width, height) = (slice.width(), slice.height());
        self.image.resize(width, height);
        self.label.resize(width, height);

        let source: &[[u8; 4]] = bytemuck::cast_slice(slice.pixels());
        let len = source.len();
        let labels: Option<&[[u8; 4]]> = slice
            .labels()
            .and_then(|labels| bytemuck::try_cast_slice(labels).ok())
            .filter(|labels: &&[[u8; 4]]| labels.len() == len);
        if labels.is_none() && slice.labels().is_some() {
            debug!(slice = live.slice_index, "Ignoring label buffer of wrong size");
        }
        let filter = live.show_only.unwrap_or_default();

        let permute = permutation_for(orientation);
        let colortable = &self.colortable;
        let (lower, upper) = (live.lower_threshold, live.upper_threshold);
        // a flat volume has an empty window
        let window_low = live.window_low;
        let window_range = (live.window_high - live.window_low).max(f64::EPSILON);
        let max = snapshot.max;
        let remap = |channel: u8| -> i64 {
            (((channel as f64 / 255.0 - window_low) / window_range) * 255.0).floor() as i64
        };

        let image = self.image.pixels_mut();
        let label = self.label.pixels_mut();
        for (index, pixel) in source.iter().enumerate() {
            let target = permute(index, width, len);
            let intensity = pixel[0] as f64 / 255.0 * max;
            // labels are only drawn where the image is
            if intensity < lower || intensity > upper {
                image[target] = TRANSPARENT;
                label[target] = TRANSPARENT;
                continue;
            }
            image[target] = [
                colortable.lookup(remap(pixel[0]))[0],
                colortable.lookup(remap(pixel[1]))[1],
                colortable.lookup(remap(pixel[2]))[2],
                255,
            ];
            label[target] = match labels {
                Some(labels) if filter.accepts(labels[index]) => labels[index],
                _ => TRANSPARENT,
            };
        }

        self.has_labels = labels.is_some();
        self.cache = Some(live);
        self.colortable_changed = false;
        Composite::Redrawn { pixels: len }
    }
}
