//! 256-entry RGBA lookup tables used for pseudocoloring and label maps

use tracing::debug;

use crate::enums::ColortableId;
use crate::error::{RendererError, Result};

pub const TABLE_SIZE: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Colortable {
    entries: [[u8; 4]; TABLE_SIZE],
}

impl Default for Colortable {
    fn default() -> Self {
        Self::grayscale()
    }
}

impl Colortable {
    pub fn from_entries(entries: [[u8; 4]; TABLE_SIZE]) -> Self {
        Self { entries }
    }

    pub fn builtin(id: ColortableId) -> Self {
        match id {
            ColortableId::Grayscale => Self::grayscale(),
            ColortableId::Categorical => Self::categorical(),
            ColortableId::Heat => Self::heat(),
        }
    }

    /// Identity ramp: entry `i` is `(i, i, i, 255)`.
    pub fn grayscale() -> Self {
        let mut entries = [[0u8; 4]; TABLE_SIZE];
        for (i, entry) in entries.iter_mut().enumerate() {
            let v = i as u8;
            *entry = [v, v, v, 255];
        }
        Self { entries }
    }

    /// Palette for label maps. Entry 0 is transparent background.
    pub fn categorical() -> Self {
        Self {
            entries: CATEGORICAL,
        }
    }

    /// Blue to red "jet" gradient in 64 steps of four entries each, with a
    /// transparent entry 0.
    pub fn heat() -> Self {
        let mut entries = [[0u8; 4]; TABLE_SIZE];
        for (i, entry) in entries.iter_mut().enumerate().skip(1) {
            // channel values in sixteenths of full intensity
            let step = (i / 4) as i32;
            let r = (step - 23).clamp(0, 16) - (step - 55).max(0);
            let g = (step - 7).clamp(0, 16) - (step - 39).clamp(0, 16);
            let b = (step + 9).min(16) - (step - 23).clamp(0, 16);
            let scale = |v: i32| (v as f64 * 255.0 / 16.0).round() as u8;
            *entry = [scale(r), scale(g), scale(b), 255];
        }
        Self { entries }
    }

    /// Entry at `index`, clamped to the valid range of the table.
    #[inline]
    pub fn lookup(&self, index: i64) -> [u8; 4] {
        self.entries[index.clamp(0, TABLE_SIZE as i64 - 1) as usize]
    }

    pub fn entries(&self) -> &[[u8; 4]; TABLE_SIZE] {
        &self.entries
    }

    /// Parse a lookup table in the `index name r g b a` text layout.
    ///
    /// Blank lines and `#` comments are skipped, a missing alpha column means
    /// opaque, and indices past the end of the table are ignored. Entries
    /// not listed stay transparent black.
    pub fn parse_lut(text: &str) -> Result<Self> {
        let mut entries = [[0u8; 4]; TABLE_SIZE];

        for (line_index, raw_line) in text.lines().enumerate() {
            let line_number = line_index + 1;
            let line = raw_line.split('#').next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }

            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 5 {
                return Err(RendererError::ColortableParse {
                    line: line_number,
                    reason: format!("expected at least 5 columns, found {}", fields.len()),
                });
            }

            let index = parse_field::<usize>(fields[0], line_number, "index")?;
            let r = parse_field::<u8>(fields[2], line_number, "red")?;
            let g = parse_field::<u8>(fields[3], line_number, "green")?;
            let b = parse_field::<u8>(fields[4], line_number, "blue")?;
            let a = match fields.get(5) {
                Some(field) => parse_field::<u8>(field, line_number, "alpha")?,
                None => 255,
            };

            if index >= TABLE_SIZE {
                debug!(index, line = line_number, "Skipping colortable entry past table end");
                continue;
            }
            entries[index] = [r, g, b, a];
        }

        Ok(Self { entries })
    }
}

fn parse_field<T: std::str::FromStr>(field: &str, line: usize, name: &str) -> Result<T> {
    field.parse().map_err(|_| RendererError::ColortableParse {
        line,
        reason: format!("invalid {name} value {field:?}"),
    })
}

#[rustfmt::skip]
const CATEGORICAL: [[u8; 4]; 256] = [
    [0, 0, 0, 0], [100, 100, 130, 255], [200, 200, 235, 255], [250, 250, 210, 255],
    [244, 214, 49, 255], [0, 151, 206, 255], [216, 101, 79, 255], [183, 156, 220, 255],
    [183, 214, 211, 255], [152, 189, 207, 255], [111, 184, 210, 255], [178, 212, 242, 255],
    [192, 104, 88, 255], [177, 122, 101, 255], [241, 214, 145, 255], [68, 172, 100, 255],
    [111, 197, 131, 255], [216, 101, 79, 255], [85, 188, 255, 255], [0, 145, 30, 255],
    [214, 230, 130, 255], [78, 63, 0, 255], [218, 255, 255, 255], [170, 250, 250, 255],
    [144, 238, 144, 255], [140, 224, 228, 255], [188, 65, 28, 255], [216, 191, 216, 255],
    [145, 60, 66, 255], [150, 98, 83, 255], [177, 122, 101, 255], [244, 214, 49, 255],
    [250, 250, 225, 255], [200, 200, 215, 255], [68, 131, 98, 255], [128, 174, 128, 255],
    [83, 146, 164, 255], [83, 146, 164, 255], [162, 115, 105, 255], [162, 115, 105, 255],
    [141, 93, 137, 255], [141, 93, 137, 255], [182, 166, 110, 255], [182, 166, 110, 255],
    [188, 135, 166, 255], [188, 135, 166, 255], [154, 150, 201, 255], [154, 150, 201, 255],
    [177, 140, 190, 255], [177, 140, 190, 255], [30, 111, 85, 255], [30, 111, 85, 255],
    [210, 157, 166, 255], [210, 157, 166, 255], [48, 129, 126, 255], [48, 129, 126, 255],
    [98, 153, 112, 255], [98, 153, 112, 255], [69, 110, 53, 255], [166, 113, 137, 255],
    [122, 101, 38, 255], [122, 101, 38, 255], [253, 135, 192, 255], [145, 92, 109, 255],
    [46, 101, 131, 255], [0, 108, 112, 255], [0, 108, 112, 255], [250, 250, 225, 255],
    [127, 150, 88, 255], [127, 150, 88, 255], [159, 116, 163, 255], [159, 116, 163, 255],
    [125, 102, 154, 255], [125, 102, 154, 255], [106, 174, 155, 255], [106, 174, 155, 255],
    [154, 146, 83, 255], [154, 146, 83, 255], [126, 126, 55, 255], [201, 160, 133, 255],
    [201, 160, 133, 255], [78, 152, 141, 255], [78, 152, 141, 255], [174, 140, 103, 255],
    [174, 140, 103, 255], [139, 126, 177, 255], [139, 126, 177, 255], [148, 120, 72, 255],
    [148, 120, 72, 255], [186, 135, 135, 255], [186, 135, 135, 255], [99, 106, 24, 255],
    [156, 171, 108, 255], [156, 171, 108, 255], [64, 123, 147, 255], [64, 123, 147, 255],
    [138, 95, 74, 255], [97, 113, 158, 255], [126, 161, 197, 255], [194, 195, 164, 255],
    [85, 188, 255, 255], [88, 106, 215, 255], [88, 106, 215, 255], [88, 106, 215, 255],
    [88, 106, 215, 255], [88, 106, 215, 255], [88, 106, 215, 255], [88, 106, 215, 255],
    [88, 106, 215, 255], [244, 214, 49, 255], [200, 200, 215, 255], [250, 250, 225, 255],
    [82, 174, 128, 255], [57, 157, 110, 255], [60, 143, 83, 255], [92, 162, 109, 255],
    [255, 244, 209, 255], [255, 244, 209, 255], [255, 244, 209, 255], [255, 244, 209, 255],
    [201, 121, 77, 255], [70, 163, 117, 255], [188, 91, 95, 255], [177, 122, 101, 255],
    [166, 84, 94, 255], [182, 105, 107, 255], [229, 147, 118, 255], [229, 147, 118, 255],
    [174, 122, 90, 255], [174, 122, 90, 255], [201, 112, 73, 255], [201, 112, 73, 255],
    [194, 142, 0, 255], [194, 142, 0, 255], [241, 213, 144, 255], [203, 179, 77, 255],
    [203, 179, 77, 255], [229, 204, 109, 255], [229, 204, 109, 255], [255, 243, 152, 255],
    [255, 243, 152, 255], [209, 185, 85, 255], [209, 185, 85, 255], [248, 223, 131, 255],
    [248, 223, 131, 255], [255, 230, 138, 255], [196, 172, 68, 255], [255, 255, 167, 255],
    [255, 250, 160, 255], [255, 237, 145, 255], [242, 217, 123, 255], [242, 217, 123, 255],
    [222, 198, 101, 255], [255, 250, 220, 255], [177, 122, 101, 255], [213, 124, 109, 255],
    [184, 105, 108, 255], [150, 208, 243, 255], [62, 162, 114, 255], [62, 162, 114, 255],
    [62, 162, 114, 255], [242, 206, 142, 255], [250, 210, 139, 255], [255, 255, 207, 255],
    [177, 122, 101, 255], [182, 228, 255, 255], [175, 216, 244, 255], [197, 165, 145, 255],
    [197, 165, 145, 255], [172, 138, 115, 255], [172, 138, 115, 255], [202, 164, 140, 255],
    [224, 186, 162, 255], [224, 186, 162, 255], [255, 245, 217, 255], [206, 110, 84, 255],
    [210, 115, 89, 255], [203, 108, 81, 255], [233, 138, 112, 255], [195, 100, 73, 255],
    [181, 85, 57, 255], [152, 55, 13, 255], [159, 63, 27, 255], [166, 70, 38, 255],
    [218, 123, 97, 255], [225, 130, 104, 255], [224, 97, 76, 255], [255, 244, 209, 255],
    [184, 122, 154, 255], [211, 171, 143, 255], [47, 150, 103, 255], [255, 244, 209, 255],
    [173, 121, 88, 255], [188, 95, 76, 255], [255, 239, 172, 255], [226, 202, 134, 255],
    [253, 232, 158, 255], [244, 217, 154, 255], [205, 179, 108, 255], [205, 179, 108, 255],
    [186, 124, 161, 255], [177, 122, 101, 255], [255, 255, 220, 255], [234, 234, 194, 255],
    [204, 142, 178, 255], [180, 119, 153, 255], [216, 132, 105, 255], [255, 253, 229, 255],
    [205, 167, 142, 255], [204, 168, 143, 255], [255, 224, 199, 255], [221, 130, 101, 255],
    [0, 145, 30, 255], [139, 150, 98, 255], [249, 180, 111, 255], [157, 108, 162, 255],
    [203, 136, 116, 255], [185, 102, 83, 255], [185, 102, 83, 255], [247, 182, 164, 255],
    [247, 182, 164, 255], [222, 154, 132, 255], [124, 186, 223, 255], [249, 186, 150, 255],
    [249, 186, 150, 255], [244, 170, 147, 255], [255, 181, 158, 255], [255, 190, 165, 255],
    [227, 153, 130, 255], [213, 141, 113, 255], [213, 141, 113, 255], [193, 123, 103, 255],
    [216, 146, 127, 255], [230, 158, 140, 255], [245, 172, 147, 255], [245, 172, 147, 255],
    [241, 172, 151, 255], [241, 172, 151, 255], [177, 124, 92, 255], [171, 85, 68, 255],
    [217, 198, 131, 255], [212, 188, 102, 255], [185, 135, 134, 255], [185, 135, 134, 255],
    [198, 175, 125, 255], [194, 98, 79, 255], [177, 122, 101, 255], [177, 122, 101, 255],
    [177, 122, 101, 255], [177, 122, 101, 255], [177, 122, 101, 255], [177, 122, 101, 255],
    [177, 122, 101, 255], [177, 122, 101, 255], [177, 122, 101, 255], [177, 122, 101, 255],
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grayscale_is_identity() {
        let table = Colortable::grayscale();
        assert_eq!(table.lookup(0), [0, 0, 0, 255]);
        assert_eq!(table.lookup(128), [128, 128, 128, 255]);
        assert_eq!(table.lookup(255), [255, 255, 255, 255]);
    }

    #[test]
    fn test_lookup_clamps_out_of_range_indices() {
        let table = Colortable::heat();
        assert_eq!(table.lookup(255), table.lookup(256));
        assert_eq!(table.lookup(255), table.lookup(i64::MAX));
        assert_eq!(table.lookup(0), table.lookup(-40));
    }

    #[test]
    fn test_heat_gradient_landmarks() {
        let table = Colortable::heat();
        assert_eq!(table.lookup(0), [0, 0, 0, 0]);
        assert_eq!(table.lookup(1), [0, 0, 143, 255]);
        assert_eq!(table.lookup(4), [0, 0, 159, 255]);
        assert_eq!(table.lookup(28), [0, 0, 255, 255]);
        assert_eq!(table.lookup(32), [0, 16, 255, 255]);
        assert_eq!(table.lookup(92), [0, 255, 255, 255]);
        assert_eq!(table.lookup(156), [255, 255, 0, 255]);
        assert_eq!(table.lookup(220), [255, 0, 0, 255]);
        assert_eq!(table.lookup(255), [128, 0, 0, 255]);
    }

    #[test]
    fn test_categorical_background_is_transparent() {
        let table = Colortable::categorical();
        assert_eq!(table.lookup(0)[3], 0);
        assert_eq!(table.lookup(1), [100, 100, 130, 255]);
    }

    #[test]
    fn test_builtin_selection() {
        assert_eq!(Colortable::builtin(ColortableId::Heat), Colortable::heat());
        assert_eq!(Colortable::builtin(ColortableId::Grayscale), Colortable::default());
    }

    #[test]
    fn test_parse_lut() {
        let text = "\
# id name r g b a
0 Unknown 0 0 0 0
1 Left-Cortex 70 130 180 255
2 Right-Cortex 245 245 245

1000 ctx-lh-unknown 25 5 25 0
";
        let table = Colortable::parse_lut(text).unwrap();
        assert_eq!(table.lookup(1), [70, 130, 180, 255]);
        assert_eq!(table.lookup(2), [245, 245, 245, 255]);
        assert_eq!(table.lookup(3), [0, 0, 0, 0]);
    }

    #[test]
    fn test_parse_lut_reports_line_numbers() {
        let result = Colortable::parse_lut("0 a 0 0 0 0\n1 b 300 0 0 0\n");
        match result {
            Err(RendererError::ColortableParse { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(Colortable::parse_lut("7 short 1 2").is_err());
    }
}
