use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

/// A readable, named, closable input handed to the loader.
///
/// The loader reads the header and the count table through the same
/// handle, so the table phase continues exactly where the header scan
/// stopped.
pub trait SpectrumSource: BufRead {
    /// Display name used in logs and error messages.
    fn name(&self) -> &str;

    fn is_closed(&self) -> bool;

    /// Release the underlying handle. Closing twice is a no-op.
    fn close(&mut self) -> io::Result<()>;
}

/// Any buffered reader paired with a display name.
#[derive(Debug)]
pub struct NamedSource<R> {
    name: String,
    inner: Option<R>,
}

impl<R: BufRead> NamedSource<R> {
    pub fn new(name: impl Into<String>, reader: R) -> Self {
        NamedSource {
            name: name.into(),
            inner: Some(reader),
        }
    }
}

impl NamedSource<BufReader<File>> {
    /// Open a spectrum file from disk.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        Ok(NamedSource::new(
            path.display().to_string(),
            BufReader::new(file),
        ))
    }
}

impl<R: BufRead> Read for NamedSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.inner.as_mut() {
            Some(reader) => reader.read(buf),
            None => Ok(0),
        }
    }
}

impl<R: BufRead> BufRead for NamedSource<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        match self.inner.as_mut() {
            Some(reader) => reader.fill_buf(),
            None => Ok(&[]),
        }
    }

    fn consume(&mut self, amt: usize) {
        if let Some(reader) = self.inner.as_mut() {
            reader.consume(amt);
        }
    }
}

impl<R: BufRead> SpectrumSource for NamedSource<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_closed(&self) -> bool {
        self.inner.is_none()
    }

    fn close(&mut self) -> io::Result<()> {
        self.inner = None;
        Ok(())
    }
}
