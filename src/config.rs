//! Decoder configuration

/// Sample width of the bitmap handed to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputDepth {
    /// 8-bit sources produce 8-bit output, deeper sources 16-bit
    #[default]
    Auto,
    /// Always 8 bits per channel
    Eight,
    /// Always 16 bits per channel
    Sixteen,
}

/// Configuration for AVIF decoding
#[derive(Debug, Clone, Default)]
pub struct DecoderConfig {
    /// Number of threads to use for decoding (0 = auto)
    pub(crate) threads: u32,
    /// Bitmap sample width
    pub(crate) output_depth: OutputDepth,
    /// Maximum frame size limit in pixels (0 = no limit)
    pub(crate) frame_size_limit: u32,
}

impl DecoderConfig {
    /// Create a new decoder configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of threads for decoding
    ///
    /// Forwarded to the AV1 decoder; 0 means automatic.
    pub fn threads(mut self, threads: u32) -> Self {
        self.threads = threads;
        self
    }

    /// Choose the bitmap sample width
    pub fn output_depth(mut self, depth: OutputDepth) -> Self {
        self.output_depth = depth;
        self
    }

    /// Set maximum frame size limit in total pixels
    ///
    /// If width * height exceeds this limit, decoding will fail.
    /// 0 means no limit.
    pub fn frame_size_limit(mut self, limit: u32) -> Self {
        self.frame_size_limit = limit;
        self
    }

    /// True if the image fits within the frame size limit
    pub(crate) fn allows(&self, width: u32, height: u32) -> bool {
        self.frame_size_limit == 0
            || u64::from(width) * u64::from(height) <= u64::from(self.frame_size_limit)
    }
}
