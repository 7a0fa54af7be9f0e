//! Interleaved 8-bit raster buffer.

/// Pixel samples stored pixel-major, channel-minor: the sample for channel
/// `c` of pixel `(col, row)` lives at `(row * width + col) * components + c`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    components: usize,
    data: Vec<u8>,
}

impl Raster {
    /// A zero-filled raster.
    pub fn new(width: u32, height: u32, components: usize) -> Self {
        let mut raster = Self::default();
        raster.resize(width, height, components);
        raster
    }

    pub fn from_data(width: u32, height: u32, components: usize, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            components,
            data,
        }
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

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn data_size(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Replaces the buffer with `size` zeroed bytes, keeping the dimensions.
    pub fn allocate_data(&mut self, size: usize) -> &mut [u8] {
        self.data.clear();
        self.data.resize(size, 0);
        &mut self.data
    }

    /// Sets new dimensions and a zeroed buffer sized to match.
    pub fn resize(&mut self, width: u32, height: u32, components: usize) {
        self.width = width;
        self.height = height;
        self.components = components;
        let size = width as usize * height as usize * components;
        self.allocate_data(size);
    }

    /// Number of bytes the dimensions call for.
    pub fn expected_size(&self) -> usize {
        self.width as usize * self.height as usize * self.components
    }

    /// One channel as a plane of `width * height` bytes.
    pub fn channel(&self, channel: usize) -> Vec<u8> {
        if channel >= self.components {
            return Vec::new();
        }
        self.data
            .iter()
            .skip(channel)
            .step_by(self.components)
            .copied()
            .collect()
    }
}
