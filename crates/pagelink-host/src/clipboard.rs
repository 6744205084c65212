//! Clipboard backends.

use crate::error::HostError;

/// Text clipboard the host reads and writes on request.
pub trait ClipboardBackend: Send {
    fn read_text(&mut self) -> Result<String, HostError>;
    fn write_text(&mut self, text: &str) -> Result<(), HostError>;
}

/// Process-local clipboard.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    text: String,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClipboardBackend for MemoryClipboard {
    fn read_text(&mut self) -> Result<String, HostError> {
        Ok(self.text.clone())
    }

    fn write_text(&mut self, text: &str) -> Result<(), HostError> {
        self.text = text.to_string();
        Ok(())
    }
}

/// The operating system clipboard.
#[cfg(feature = "system-clipboard")]
pub struct SystemClipboard {
    clipboard: arboard::Clipboard,
}

#[cfg(feature = "system-clipboard")]
impl SystemClipboard {
    pub fn new() -> Result<Self, HostError> {
        let clipboard =
            arboard::Clipboard::new().map_err(|e| HostError::Clipboard(e.to_string()))?;
        Ok(Self { clipboard })
    }
}

#[cfg(feature = "system-clipboard")]
impl ClipboardBackend for SystemClipboard {
    fn read_text(&mut self) -> Result<String, HostError> {
        self.clipboard
            .get_text()
            .map_err(|e| HostError::Clipboard(e.to_string()))
    }

    fn write_text(&mut self, text: &str) -> Result<(), HostError> {
        self.clipboard
            .set_text(text)
            .map_err(|e| HostError::Clipboard(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_clipboard() {
        let mut clipboard = MemoryClipboard::new();
        assert_eq!(clipboard.read_text().unwrap(), "");
        clipboard.write_text("order #1234").unwrap();
        assert_eq!(clipboard.read_text().unwrap(), "order #1234");
    }
}
