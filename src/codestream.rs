//! Compressed codestream container.

/// A JPEG 2000 codestream held in memory together with the image size it
/// describes and the discard level callers want it decoded at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Codestream {
    data: Vec<u8>,
    width: u32,
    height: u32,
    components: usize,
    raw_discard_level: u32,
}

impl Codestream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self {
            data,
            ..Self::default()
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_size(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Replaces the buffer with `size` zeroed bytes.
    pub fn allocate_data(&mut self, size: usize) -> &mut [u8] {
        self.data.clear();
        self.data.resize(size, 0);
        &mut self.data
    }

    /// Grows or shrinks the buffer to `size`, preserving the common prefix.
    pub fn reallocate_data(&mut self, size: usize) -> &mut [u8] {
        self.data.resize(size, 0);
        &mut self.data
    }

    pub(crate) fn buffer_mut(&mut self) -> &mut Vec<u8> {
        &mut self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn components(&self) -> usize {
        self.components
    }

    /// Records the full-resolution image size the codestream describes.
    pub fn set_size(&mut self, width: u32, height: u32, components: usize) {
        self.width = width;
        self.height = height;
        self.components = components;
    }

    /// Resolution reduction requested for the next decode; 0 is full size.
    pub fn raw_discard_level(&self) -> u32 {
        self.raw_discard_level
    }

    pub fn set_raw_discard_level(&mut self, discard_level: u32) {
        self.raw_discard_level = discard_level;
    }
}
