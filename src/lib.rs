//! # Slice renderer
//!
//! This crate renders a single axis-aligned slice of a volumetric scan into
//! a 2D pixel surface and maps between device pixels and the volume.

//!
//! A [`Volume`] is resliced into three perpendicular stacks, one per
//! medical plane:
//!  - Sagittal (looks down X)
//!  - Coronal (looks down Y)
//!  - Axial (looks down Z)
//!
//! A [`Renderer2D`] shows one of those planes with pan and zoom. On every
//! frame it remaps the current slice through the volume's threshold and
//! window/level into a [`Colortable`], overlays an optional label map and
//! blits the result onto a [`Surface`]. The per-pixel remap is only run when
//! something that affects pixel color changed since the last frame.
//!
//! Picking goes the other way: a device point is mapped to the voxel under
//! it, and voxel or slice pixel positions are mapped back to the device for
//! annotations.
//!
//! Volumes can be built from any `Array3<u16>` or loaded from a directory of
//! DICOM files with [`DicomLoader`].
//!
//! # Examples
//!
//! ## Rendering the axial slice at the center of a DICOM series
//!
//! ```no_run
//! # use slice_renderer::{DicomLoader, Loader, RasterSurface, Renderer2D, RendererConfig, SortBy};
//! # use std::path::Path;
//! let mut loader = DicomLoader::new(SortBy::InstanceNumber);
//! let volume = loader
//!     .load(Path::new("dicom"))
//!     .expect("should have loaded files from directory");
//!
//! let mut renderer = Renderer2D::new(RendererConfig::default(), "axial")
//!     .expect("axial is a valid orientation");
//! renderer.resize(512, 512);
//!
//! let mut surface = RasterSurface::new(512, 512);
//! renderer.render(Some(&volume), Some(&loader), &mut surface);
//! surface.image().save("result.png").expect("should have written image");
//! ```

pub mod colortable;
pub mod compositor;
pub mod config;
pub mod enums;
pub mod error;
pub mod logging;
pub mod renderer;
pub mod surface;
pub mod transform;
pub mod view;
pub mod volume;
pub mod volume_loader;

pub use colortable::Colortable;
pub use compositor::{Composite, PixelBuffer, SliceCompositor};
pub use config::RendererConfig;
pub use enums::{AnnotationColor, ColortableId, Orientation, SortBy};
pub use error::{NotReady, RendererError, Result};
pub use renderer::{FrameStatus, Renderer2D};
pub use surface::{RasterSurface, Surface};
pub use transform::{Pick, SliceTransform};
pub use view::ViewState;
pub use volume::{LabelFilter, LabelMap, Slice, Volume, VolumeGeometry, VolumeSnapshot};
pub use volume_loader::{DicomLoader, LoadProgress, Loader, Preloaded, VolumeLoader, VolumeLoaderError};
