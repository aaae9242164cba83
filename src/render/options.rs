//! Rendering options and configuration.

/// How zip entries are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    /// Deflate every entry
    #[default]
    Deflate,
    /// Store entries uncompressed
    Stored,
}

/// Options for writing the DOCX package.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    /// Font written into the default run properties
    pub default_font: String,

    /// Write `docProps/core.xml` and `docProps/app.xml`
    pub include_core_properties: bool,

    /// Zip entry compression
    pub compression: Compression,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            default_font: "Calibri".to_string(),
            include_core_properties: true,
            compression: Compression::Deflate,
        }
    }
}

impl RenderOptions {
    /// Create new render options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default font name.
    pub fn with_default_font(mut self, font: impl Into<String>) -> Self {
        self.default_font = font.into();
        self
    }

    /// Include or omit the document property parts.
    pub fn with_core_properties(mut self, include: bool) -> Self {
        self.include_core_properties = include;
        self
    }

    /// Set the zip compression.
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = RenderOptions::default();
        assert_eq!(options.default_font, "Calibri");
        assert!(options.include_core_properties);
        assert_eq!(options.compression, Compression::Deflate);
    }

    #[test]
    fn test_builder() {
        let options = RenderOptions::new()
            .with_default_font("Arial")
            .with_core_properties(false)
            .with_compression(Compression::Stored);
        assert_eq!(options.default_font, "Arial");
        assert!(!options.include_core_properties);
        assert_eq!(options.compression, Compression::Stored);
    }
}
