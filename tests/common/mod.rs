// Common test utilities: synthetic O3 and CAR assets
#![allow(dead_code)]

pub const O3_BASE_POSE_OFFSET: usize = 0x3200;
pub const O3_COUNTS_OFFSET: usize = 0x4800;
pub const O3_TEXTURE_OFFSET: usize = 0x4806;

pub const CAR_POLYGONS_OFFSET: usize = 0x66;
pub const CAR_COUNTS_OFFSET: usize = 0x4866;
pub const CAR_SUBMODEL_FRAMES_OFFSET: usize = 0x4806;
const POLYGON_AREA: usize = 0x4800;

pub fn push_u16(buf: &mut Vec<u8>, v: u16) {
    buf.extend_from_slice(&v.to_le_bytes());
}

pub fn push_i16(buf: &mut Vec<u8>, v: i16) {
    buf.extend_from_slice(&v.to_le_bytes());
}

pub fn put_u16(buf: &mut [u8], offset: usize, v: u16) {
    buf[offset..offset + 2].copy_from_slice(&v.to_le_bytes());
}

/// Raw polygon record fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct Polygon {
    pub indices: [u16; 4],
    pub uv: [[u16; 2]; 4],
    pub group_id: u8,
    pub flags: u8,
    pub v_offset: u16,
}

impl Polygon {
    pub fn triangle(a: u16, b: u16, c: u16) -> Self {
        Self {
            indices: [a, b, c, u16::MAX],
            ..Default::default()
        }
    }

    pub fn quad(a: u16, b: u16, c: u16, d: u16) -> Self {
        Self {
            indices: [a, b, c, d],
            ..Default::default()
        }
    }

    pub fn with_uv(mut self, uv: [[u16; 2]; 4]) -> Self {
        self.uv = uv;
        self
    }

    pub fn with_flags(mut self, flags: u8) -> Self {
        self.flags = flags;
        self
    }

    pub fn write(&self, buf: &mut Vec<u8>) {
        for &i in &self.indices {
            push_u16(buf, i);
        }
        for uv in &self.uv {
            push_u16(buf, uv[0]);
            push_u16(buf, uv[1]);
        }
        buf.extend_from_slice(&[0; 4]);
        buf.push(self.group_id);
        buf.push(self.flags);
        push_u16(buf, self.v_offset);
    }
}

pub type Frame = Vec<[i16; 3]>;

fn write_frames(buf: &mut Vec<u8>, frames: &[Frame]) {
    for frame in frames {
        for xyz in frame {
            for &c in xyz {
                push_i16(buf, c);
            }
        }
    }
}

fn frames_len(frames: &[Frame]) -> u16 {
    frames.iter().map(|f| f.len() * 6).sum::<usize>() as u16
}

fn write_polygon_area(buf: &mut Vec<u8>, polygons: &[Polygon]) {
    let start = buf.len();
    for p in polygons {
        p.write(buf);
    }
    buf.resize(start + POLYGON_AREA, 0);
}

/// O3 model buffer with a `64 × (height_field & 1023)` texture of a byte ramp.
pub fn o3_model(base_pose: &[[i16; 3]], polygons: &[Polygon], height_field: u16) -> Vec<u8> {
    let mut buf = Vec::new();
    for p in polygons {
        p.write(&mut buf);
    }
    buf.resize(O3_BASE_POSE_OFFSET, 0);
    write_frames(&mut buf, &[base_pose.to_vec()]);
    buf.resize(O3_COUNTS_OFFSET, 0);

    push_u16(&mut buf, base_pose.len() as u16);
    push_u16(&mut buf, polygons.len() as u16);
    push_u16(&mut buf, height_field);

    let height = (height_field & 1023) as usize;
    buf.extend((0..64 * height).map(|i| (i % 251) as u8));
    buf
}

/// One O3 animation stream: vertex count header then the frames.
pub fn o3_animation(vertex_count: u16, frames: &[Frame]) -> Vec<u8> {
    let mut buf = Vec::new();
    push_u16(&mut buf, vertex_count);
    write_frames(&mut buf, frames);
    buf
}

/// Axis-aligned cube of half-size 1024; every quad faces outward.
pub fn cube() -> (Vec<[i16; 3]>, Vec<Polygon>) {
    let s = 1024;
    let corners = vec![
        [-s, -s, -s],
        [s, -s, -s],
        [s, s, -s],
        [-s, s, -s],
        [-s, -s, s],
        [s, -s, s],
        [s, s, s],
        [-s, s, s],
    ];
    let faces = vec![
        Polygon::quad(0, 1, 2, 3),
        Polygon::quad(4, 7, 6, 5),
        Polygon::quad(0, 4, 5, 1),
        Polygon::quad(1, 5, 6, 2),
        Polygon::quad(2, 6, 7, 3),
        Polygon::quad(3, 7, 4, 0),
    ];
    (corners, faces)
}

/// A mesh block of a CAR model: polygons plus frames per animation slot.
#[derive(Debug, Clone, Default)]
pub struct CarMesh {
    pub vertex_count: u16,
    pub polygons: Vec<Polygon>,
    pub slots: Vec<Vec<Frame>>,
}

impl CarMesh {
    fn slot_len(&self, slot: usize) -> u16 {
        self.slots.get(slot).map(|f| frames_len(f)).unwrap_or(0)
    }

    fn write_frames(&self, buf: &mut Vec<u8>) {
        for frames in &self.slots {
            write_frames(buf, frames);
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CarBuilder {
    pub texture_height: usize,
    /// Up to 20 animation slots
    pub main: CarMesh,
    /// Up to 3 submodels with up to 2 slots each
    pub submodels: Vec<CarMesh>,
    /// Up to 7 clips
    pub sounds: Vec<Vec<u8>>,
}

impl CarBuilder {
    pub fn build(&self) -> Vec<u8> {
        let mut buf = Vec::new();

        // header
        for slot in 0..20 {
            push_u16(&mut buf, self.main.slot_len(slot));
        }
        for i in 0..3 {
            for slot in 0..2 {
                let len = self.submodels.get(i).map(|s| s.slot_len(slot)).unwrap_or(0);
                push_u16(&mut buf, len);
            }
        }
        buf.resize(buf.len() + 9 * 2, 0);
        for i in 0..7 {
            push_u16(&mut buf, self.sounds.get(i).map(|s| s.len()).unwrap_or(0) as u16);
        }
        buf.resize(buf.len() + 9 * 2, 0);
        assert_eq!(buf.len(), CAR_POLYGONS_OFFSET);

        write_polygon_area(&mut buf, &self.main.polygons);
        assert_eq!(buf.len(), CAR_COUNTS_OFFSET);

        let texels = 64 * self.texture_height;
        push_u16(&mut buf, self.main.vertex_count);
        push_u16(&mut buf, self.main.polygons.len() as u16);
        push_u16(&mut buf, texels as u16);
        buf.extend((0..texels).map(|i| (i % 253) as u8));
        self.main.write_frames(&mut buf);

        for submodel in &self.submodels {
            if submodel.slot_len(0) as usize + submodel.slot_len(1) as usize == 0 {
                continue;
            }
            write_polygon_area(&mut buf, &submodel.polygons);
            push_u16(&mut buf, submodel.vertex_count);
            push_u16(&mut buf, submodel.polygons.len() as u16);
            push_u16(&mut buf, 0);
            submodel.write_frames(&mut buf);
        }

        for sound in &self.sounds {
            buf.extend_from_slice(sound);
        }
        buf
    }
}

/// Frame of `n` positions, each offset by `shift` along x.
pub fn shifted_frame(base: &[[i16; 3]], shift: i16) -> Frame {
    base.iter().map(|p| [p[0] + shift, p[1], p[2]]).collect()
}
