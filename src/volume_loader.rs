use crate::{enums::SortBy, error::RendererError, volume::Volume, volume::VolumeGeometry};

use dicom::{
    object::{FileDicomObject, InMemDicomObject, open_file},
    pixeldata::{ConvertOptions, PixelDecoder, VoiLutOption},
};
use dicom_dictionary_std::tags;
use glam::DVec3;
use ndarray::{Array2, Array3, s};
use std::{fs, path::Path};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum VolumeLoaderError {
    #[error("No valid DICOM images found")]
    NoValidImages,

    #[error("Inconsistent image dimensions")]
    InconsistentDimensions,

    #[error("Missing spacing information")]
    MissingSpacing,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("DICOM error: {0}")]
    Dicom(#[from] dicom::object::ReadError),

    #[error(transparent)]
    Volume(#[from] RendererError),
}

/// Completion signal the renderer polls before drawing a frame.
pub trait LoadProgress {
    fn completed(&self) -> bool;
}

/// Turns an external resource into a [`Volume`].
pub trait Loader: LoadProgress {
    type Resource: ?Sized;
    type Error;

    fn load(&mut self, resource: &Self::Resource) -> Result<Volume, Self::Error>;
}

/// Progress of a volume built in memory, which is complete from the start.
#[derive(Debug, Clone, Copy, Default)]
pub struct Preloaded;

impl LoadProgress for Preloaded {
    fn completed(&self) -> bool {
        true
    }
}

/// Loads a directory of `.dcm` files and reports completion once it has.
#[derive(Debug, Clone, Default)]
pub struct DicomLoader {
    sort_by: SortBy,
    completed: bool,
}

impl DicomLoader {
    pub fn new(sort_by: SortBy) -> Self {
        Self {
            sort_by,
            completed: false,
        }
    }
}

impl LoadProgress for DicomLoader {
    fn completed(&self) -> bool {
        self.completed
    }
}

impl Loader for DicomLoader {
    type Resource = Path;
    type Error = VolumeLoaderError;

    fn load(&mut self, resource: &Path) -> Result<Volume, VolumeLoaderError> {
        self.completed = false;
        info!(path = %resource.display(), sort_by = ?self.sort_by, "Loading DICOM directory");
        let volume = VolumeLoader::load_from_directory(resource, self.sort_by)?;
        let [x, y, z] = volume.dimensions();
        info!(x, y, z, "Volume loaded");
        self.completed = true;
        Ok(volume)
    }
}

pub struct VolumeLoader;

type OrderedImage = (Option<f32>, Option<DVec3>, Array2<u16>);

impl VolumeLoader {
    /// Load a volume from DICOM objects
    ///
    /// # Arguments
    ///
    /// * `dicom_objects` - Slice of DICOM file objects
    /// * `sort_by` - Method to sort the slices
    ///
    /// # Errors
    ///
    /// Returns error if no valid images found or dimensions are inconsistent
    pub fn load_from_dicom_objects(
        dicom_objects: &[FileDicomObject<InMemDicomObject>],
        sort_by: SortBy,
    ) -> Result<Volume, VolumeLoaderError> {
        let mut images_with_order: Vec<_> = dicom_objects
            .iter()
            .filter_map(|dicom_object| Self::extract_image_with_order(dicom_object, &sort_by))
            .collect();

        if images_with_order.is_empty() {
            return Err(VolumeLoaderError::NoValidImages);
        }
        debug!(
            decoded = images_with_order.len(),
            skipped = dicom_objects.len() - images_with_order.len(),
            "Decoded DICOM images"
        );

        Self::sort_images(&mut images_with_order, sort_by);
        let first = images_with_order[0].1;
        let last = images_with_order[images_with_order.len() - 1].1;
        let origin = first.unwrap_or(DVec3::ZERO);
        let stacking = Self::stacking_direction(first, last);

        let images: Vec<_> = images_with_order
            .into_iter()
            .map(|(_, _, image)| image)
            .collect();

        Self::validate_dimensions(&images)?;

        let volume_array = Self::build_volume_array(&images);
        let spacing = Self::get_spacing(dicom_objects).ok_or(VolumeLoaderError::MissingSpacing)?;
        let geometry = VolumeGeometry::new(spacing)
            .with_origin(origin)
            .with_directions([DVec3::X, DVec3::Y, stacking]);

        Ok(Volume::with_geometry(volume_array, geometry)?)
    }

    /// Load a volume from file paths
    pub fn load_from_file_paths(
        paths: &[impl AsRef<Path>],
        sort_by: SortBy,
    ) -> Result<Volume, VolumeLoaderError> {
        let objects: Result<Vec<_>, _> =
            paths.iter().map(|path| open_file(path.as_ref())).collect();

        Self::load_from_dicom_objects(&objects?, sort_by)
    }

    /// Load a volume from a directory containing .dcm files
    pub fn load_from_directory(
        path: impl AsRef<Path>,
        sort_by: SortBy,
    ) -> Result<Volume, VolumeLoaderError> {
        let paths = Self::dicom_paths(path.as_ref())?;
        if paths.is_empty() {
            return Err(VolumeLoaderError::NoValidImages);
        }

        Self::load_from_file_paths(&paths, sort_by)
    }

    fn dicom_paths(dir: &Path) -> Result<Vec<std::path::PathBuf>, VolumeLoaderError> {
        Ok(fs::read_dir(dir)?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .and_then(|s| s.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("dcm"))
            })
            .collect())
    }

    fn extract_image_with_order(
        dicom_object: &FileDicomObject<InMemDicomObject>,
        sort_by: &SortBy,
    ) -> Option<OrderedImage> {
        let order = Self::get_sort_order(dicom_object, sort_by)?;
        let image_2d = Self::decode_image(dicom_object)?;
        Some((order, Self::get_position(dicom_object), image_2d))
    }

    fn get_position(dicom_object: &FileDicomObject<InMemDicomObject>) -> Option<DVec3> {
        let pos = dicom_object
            .element(tags::IMAGE_POSITION_PATIENT)
            .ok()?
            .to_multi_float64()
            .ok()?;
        match pos.as_slice() {
            [x, y, z, ..] => Some(DVec3::new(*x, *y, *z)),
            _ => None,
        }
    }

    fn get_sort_order(
        dicom_object: &FileDicomObject<InMemDicomObject>,
        sort_by: &SortBy,
    ) -> Option<Option<f32>> {
        match sort_by {
            SortBy::ImagePositionPatient => {
                let pos = dicom_object
                    .element(tags::IMAGE_POSITION_PATIENT)
                    .ok()?
                    .to_multi_float32()
                    .ok()?;
                Some(pos.get(2).copied())
            }
            SortBy::TablePosition => {
                let pos = dicom_object
                    .element(tags::TABLE_POSITION)
                    .ok()?
                    .to_float32()
                    .ok();
                Some(pos)
            }
            SortBy::InstanceNumber => {
                let num = dicom_object
                    .element(tags::INSTANCE_NUMBER)
                    .ok()?
                    .to_int::<i32>()
                    .ok()
                    .map(|n| n as f32);
                Some(num)
            }
            SortBy::None => Some(Some(0.0)),
        }
    }

    fn decode_image(dicom_object: &FileDicomObject<InMemDicomObject>) -> Option<Array2<u16>> {
        let pixel_data = dicom_object.decode_pixel_data().ok()?;
        let options = ConvertOptions::new().with_voi_lut(VoiLutOption::First);
        pixel_data
            .to_ndarray_with_options::<u16>(&options)
            .ok()
            .map(|arr| arr.slice_move(s![0, .., .., 0]))
    }

    fn sort_images(images_with_order: &mut [OrderedImage], sort_by: SortBy) {
        if !matches!(sort_by, SortBy::None) {
            images_with_order
                .sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        }

        if matches!(sort_by, SortBy::ImagePositionPatient) {
            images_with_order.reverse();
        }
    }

    /// World direction in which the sorted images advance, from the
    /// positions of the first and last one
    fn stacking_direction(first: Option<DVec3>, last: Option<DVec3>) -> DVec3 {
        match (first, last) {
            (Some(first), Some(last)) if last.z < first.z => DVec3::NEG_Z,
            _ => DVec3::Z,
        }
    }

    fn validate_dimensions(images: &[Array2<u16>]) -> Result<(), VolumeLoaderError> {
        let first_dim = images[0].dim();
        if images.iter().any(|img| img.dim() != first_dim) {
            return Err(VolumeLoaderError::InconsistentDimensions);
        }
        Ok(())
    }

    fn build_volume_array(images: &[Array2<u16>]) -> Array3<u16> {
        let (height, width) = images[0].dim();
        let depth = images.len();
        let mut volume = Array3::<u16>::zeros((depth, height, width));

        for (i, image) in images.iter().enumerate() {
            volume.slice_mut(s![i, .., ..]).assign(image);
        }

        volume
    }

    fn get_spacing(dicom_objects: &[FileDicomObject<InMemDicomObject>]) -> Option<(f32, f32, f32)> {
        dicom_objects.iter().find_map(|dicom_object| {
            let pixel_spacing = dicom_object
                .element(tags::PIXEL_SPACING)
                .ok()?
                .to_multi_float32()
                .ok()?;

            let slice_thickness = dicom_object
                .element(tags::SLICE_THICKNESS)
                .ok()?
                .to_float32()
                .ok()?;

            Some((pixel_spacing[0], pixel_spacing[1], slice_thickness))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_directory_is_io_error() {
        let mut loader = DicomLoader::new(SortBy::InstanceNumber);
        let result = loader.load(Path::new("/nonexistent/slice-renderer/dicom"));
        assert!(matches!(result, Err(VolumeLoaderError::Io(_))));
        assert!(!loader.completed());
    }

    #[test]
    fn test_directory_without_dicom_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), "not an image").unwrap();
        let mut loader = DicomLoader::default();
        assert!(matches!(
            loader.load(dir.path()),
            Err(VolumeLoaderError::NoValidImages)
        ));
        assert!(!loader.completed());
    }

    #[test]
    fn test_build_volume_array_stacks_images_in_order() {
        let images = vec![Array2::from_elem((2, 3), 1u16), Array2::from_elem((2, 3), 2u16)];
        let volume = VolumeLoader::build_volume_array(&images);
        assert_eq!(volume.dim(), (2, 2, 3));
        assert_eq!(volume[[0, 1, 2]], 1);
        assert_eq!(volume[[1, 0, 0]], 2);
    }

    #[test]
    fn test_validate_dimensions_rejects_mixed_sizes() {
        let images = vec![Array2::<u16>::zeros((2, 2)), Array2::<u16>::zeros((2, 3))];
        assert!(matches!(
            VolumeLoader::validate_dimensions(&images),
            Err(VolumeLoaderError::InconsistentDimensions)
        ));
    }

    #[test]
    fn test_sort_by_position_descends() {
        let image = || Array2::<u16>::zeros((1, 1));
        let mut images = vec![
            (Some(1.0), None, image()),
            (Some(3.0), None, image()),
            (Some(2.0), None, image()),
        ];
        VolumeLoader::sort_images(&mut images, SortBy::ImagePositionPatient);
        let order: Vec<_> = images.iter().map(|(o, _, _)| *o).collect();
        assert_eq!(order, vec![Some(3.0), Some(2.0), Some(1.0)]);
    }

    #[test]
    fn test_descending_series_stacks_towards_negative_z() {
        let image = || Array2::<u16>::zeros((2, 2));
        let at = |z: f64| Some(DVec3::new(0.0, 0.0, z));
        let mut images = vec![
            (Some(10.0), at(10.0), image()),
            (Some(16.0), at(16.0), image()),
            (Some(13.0), at(13.0), image()),
        ];
        VolumeLoader::sort_images(&mut images, SortBy::ImagePositionPatient);
        let (first, last) = (images[0].1, images[2].1);
        assert_eq!(VolumeLoader::stacking_direction(first, last), DVec3::NEG_Z);
        assert_eq!(VolumeLoader::stacking_direction(last, first), DVec3::Z);
        assert_eq!(VolumeLoader::stacking_direction(None, last), DVec3::Z);

        let geometry = VolumeGeometry::new((1.0, 1.0, 3.0))
            .with_origin(first.unwrap())
            .with_directions([DVec3::X, DVec3::Y, VolumeLoader::stacking_direction(first, last)]);
        let volume = Volume::with_geometry(Array3::zeros((3, 2, 2)), geometry).unwrap();
        let stack = volume.stack(2).info();
        assert_eq!(stack.index_of(DVec3::new(0.0, 0.0, 16.0)), 0);
        assert_eq!(stack.index_of(DVec3::new(0.0, 0.0, 10.0)), 2);
    }

    #[test]
    fn test_preloaded_is_complete() {
        assert!(Preloaded.completed());
    }
}
