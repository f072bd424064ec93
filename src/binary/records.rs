use binrw::{binrw, BinRead};

/// A binrw record with a fixed on-disk size.
///
/// The size is checked against the buffer before binrw parses the record, so
/// a short buffer is reported as truncation rather than as an I/O error.
pub trait FixedRecord: for<'a> BinRead<Args<'a> = ()> {
    const SIZE: usize;
}

// Polygon flag bits
pub const POLYGON_FLAG_TWO_SIDED: u8 = 0x01;
pub const POLYGON_FLAG_ALPHA_TESTED: u8 = 0x02;
pub const POLYGON_FLAG_TRANSLUCENT: u8 = 0x04 | 0x08;

/// One triangle or quad face, shared by O3 and CAR geometry sections.
///
/// A fourth vertex index at or past the mesh vertex count marks a triangle.
#[binrw]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[brw(little)]
pub struct PolygonRecord {
    pub vertex_indices: [u16; 4],
    pub uv: [[u16; 2]; 4],
    pub unknown: [u8; 4],
    // body part for monsters (body, hands, head...)
    pub group_id: u8,
    pub flags: u8,
    pub v_offset: u16,
}

impl FixedRecord for PolygonRecord {
    const SIZE: usize = 32;
}

/// Raw animated position, fixed-point.
#[binrw]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[brw(little)]
pub struct VertexRecord {
    pub xyz: [i16; 3],
}

impl FixedRecord for VertexRecord {
    const SIZE: usize = 6;
}

pub const CAR_MAIN_ANIMATION_SLOTS: usize = 20;
pub const CAR_SUBMODEL_COUNT: usize = 3;
pub const CAR_SUBMODEL_ANIMATION_SLOTS: usize = 2;
pub const CAR_SOUND_COUNT: usize = 7;

/// Fixed CAR header. All lengths are in bytes.
#[binrw]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[brw(little)]
pub struct CarHeader {
    pub animations: [u16; CAR_MAIN_ANIMATION_SLOTS],
    pub submodel_animations: [[u16; CAR_SUBMODEL_ANIMATION_SLOTS]; CAR_SUBMODEL_COUNT],
    // 6, 7, 8 look like gib types
    pub unknown0: [u16; 9],
    pub sounds: [u16; CAR_SOUND_COUNT],
    pub unknown1: [u16; 9],
}

impl FixedRecord for CarHeader {
    const SIZE: usize = 0x66;
}

impl CarHeader {
    /// Total declared animation bytes for one submodel.
    pub fn submodel_animation_bytes(&self, submodel: usize) -> usize {
        self.submodel_animations[submodel]
            .iter()
            .map(|&len| len as usize)
            .sum()
    }
}
