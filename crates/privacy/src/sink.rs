use image::RgbImage;

/// Receives finished crops together with their output index.
///
/// The n-th person of an image (counting from one) arrives with index
/// `start_index + n`; naming and persistence are up to the implementation.
pub trait OutputSink {
    fn accept(&mut self, index: usize, crop: &RgbImage) -> anyhow::Result<()>;
}

/// Keeps crops in memory in the order they were produced.
#[derive(Default)]
pub struct MemorySink {
    pub crops: Vec<(usize, RgbImage)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn indices(&self) -> Vec<usize> {
        self.crops.iter().map(|(index, _)| *index).collect()
    }
}

impl OutputSink for MemorySink {
    fn accept(&mut self, index: usize, crop: &RgbImage) -> anyhow::Result<()> {
        self.crops.push((index, crop.clone()));
        Ok(())
    }
}
