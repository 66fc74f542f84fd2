//! Random-access byte sources for documents
//!
//! A source is either an owned in-memory copy of the caller's buffer or an
//! open file read with positional reads, so the file cursor is never shared
//! state. Engines take the whole document as one buffer through `read_all`;
//! a file source is read in full, in blocks, when its document is opened.

use std::fs::File;
use std::io;
use std::sync::Arc;

/// Where document bytes come from
#[derive(Debug, Clone)]
pub enum DocumentSource {
    /// Owned copy of a caller buffer
    Memory(Arc<[u8]>),
    /// Open file read at arbitrary offsets
    File { file: Arc<File>, len: u64 },
}

impl DocumentSource {
    /// Copy `bytes`; later changes to the caller's buffer are not observed
    pub fn from_slice(bytes: &[u8]) -> Self {
        DocumentSource::Memory(Arc::from(bytes))
    }

    /// Wrap an open file; the length comes from its metadata
    pub fn from_file(file: File) -> io::Result<Self> {
        let len = file.metadata()?.len();
        Ok(DocumentSource::File {
            file: Arc::new(file),
            len,
        })
    }

    /// Total size in bytes
    pub fn len(&self) -> u64 {
        match self {
            DocumentSource::Memory(bytes) => bytes.len() as u64,
            DocumentSource::File { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fill `buf` with the bytes starting at `offset`
    ///
    /// Returns false when the block cannot be read in full.
    pub fn read_block(&self, offset: u64, buf: &mut [u8]) -> bool {
        let end = match offset.checked_add(buf.len() as u64) {
            Some(end) if end <= self.len() => end,
            _ => return false,
        };

        match self {
            DocumentSource::Memory(bytes) => {
                buf.copy_from_slice(&bytes[offset as usize..end as usize]);
                true
            }
            DocumentSource::File { file, .. } => match read_exact_at(file, buf, offset) {
                Ok(()) => true,
                Err(e) => {
                    tracing::error!("Cannot read from file descriptor: {}", e);
                    false
                }
            },
        }
    }

    /// The whole source as one buffer
    pub fn read_all(&self) -> io::Result<Arc<[u8]>> {
        match self {
            DocumentSource::Memory(bytes) => Ok(Arc::clone(bytes)),
            DocumentSource::File { len, .. } => {
                let mut buf = vec![0u8; *len as usize];
                if !self.read_block(0, &mut buf) {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "short read from document source",
                    ));
                }
                Ok(Arc::from(buf))
            }
        }
    }
}

#[cfg(unix)]
fn read_exact_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, offset)
}

#[cfg(windows)]
fn read_exact_at(file: &File, mut buf: &mut [u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_read(buf, offset)? {
            0 => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "failed to fill whole buffer",
                ))
            }
            n => {
                buf = &mut buf[n..];
                offset += n as u64;
            }
        }
    }
    Ok(())
}
