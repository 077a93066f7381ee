//! Output sink for dry-run manifests
//!
//! Each emitted manifest is written as one `---`-prefixed document under a
//! mutex, so concurrent dry runs sharing a sink never interleave.

use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;

use tkgs_capi::RenderedManifest;
use tkgs_common::Result;

/// Destination for rendered manifests
pub struct OutputSink {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl OutputSink {
    /// Wrap any writer
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
        }
    }

    /// Process stdout
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }

    /// An in-memory sink plus a handle to read back what was written
    pub fn buffer() -> (Self, SharedBuffer) {
        let buffer = SharedBuffer::default();
        (Self::new(buffer.clone()), buffer)
    }

    /// Write one manifest as a single document
    pub fn emit(&self, manifest: RenderedManifest) -> Result<()> {
        let (_, yaml) = manifest.into_parts();
        let mut document = String::with_capacity(yaml.len() + 5);
        document.push_str("---\n");
        document.push_str(&yaml);
        if !document.ends_with('\n') {
            document.push('\n');
        }

        let mut writer = self.writer.lock();
        writer.write_all(document.as_bytes())?;
        writer.flush()?;
        Ok(())
    }
}

impl std::fmt::Debug for OutputSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputSink").finish_non_exhaustive()
    }
}

/// Cloneable in-memory writer
#[derive(Clone, Debug, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    /// Everything written so far
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
