use crate::error::TriggerError;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Digital output driving the recording amplifier's marker input.
pub trait TriggerLine {
    /// Puts `code` on the line; `0` releases it.
    fn set(&mut self, code: u8) -> io::Result<()>;

    /// `false` when emissions are logged without a physical pulse.
    fn is_connected(&self) -> bool {
        true
    }
}

/// Log-only line used when hardware signalling is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLine;

impl TriggerLine for NullLine {
    fn set(&mut self, _code: u8) -> io::Result<()> {
        Ok(())
    }

    fn is_connected(&self) -> bool {
        false
    }
}

/// Trigger box exposed as a character device (serial trigger interface or
/// parallel-port bridge); each write of one byte sets the output lines.
#[derive(Debug)]
pub struct PortLine {
    path: PathBuf,
    file: File,
}

impl PortLine {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TriggerError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .write(true)
            .open(&path)
            .map_err(|source| TriggerError::Open {
                path: path.clone(),
                source,
            })?;
        let mut line = Self { path, file };
        line.set(0).map_err(|source| TriggerError::Open {
            path: line.path.clone(),
            source,
        })?;
        Ok(line)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TriggerLine for PortLine {
    fn set(&mut self, code: u8) -> io::Result<()> {
        self.file.write_all(&[code])?;
        self.file.flush()
    }
}
