//! Output formats and the output stream.

use std::fmt;
use std::io::{self, Write};

use crate::codegen::CodegenFileType;

/// What the backend writes once the pipelines have run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputFormat {
    /// Target assembly (`.s`).
    Assembly,
    /// Relocatable object file (`.o`).
    #[default]
    Object,
    /// Textual IR (`.ll`).
    IrText,
    /// Serialized binary IR (`.bc`).
    Binary,
    /// Run the pipelines, write nothing.
    None,
}

impl OutputFormat {
    /// Get the file extension for this format.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Assembly => "s",
            Self::Object => "o",
            Self::IrText => "ll",
            Self::Binary => "bc",
            Self::None => "",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Assembly => "assembly",
            Self::Object => "object file",
            Self::IrText => "IR text",
            Self::Binary => "binary IR",
            Self::None => "no output",
        }
    }

    /// `true` for formats produced by the target's codegen pipeline.
    pub fn needs_codegen(self) -> bool {
        self.file_type().is_some()
    }

    /// Codegen file type for assembly and object output.
    pub fn file_type(self) -> Option<CodegenFileType> {
        match self {
            Self::Assembly => Some(CodegenFileType::Assembly),
            Self::Object => Some(CodegenFileType::Object),
            Self::IrText | Self::Binary | Self::None => None,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Byte-counting wrapper around the driver's output.
pub struct OutputStream<'a> {
    inner: &'a mut dyn Write,
    bytes_written: u64,
    flushes: u32,
}

impl<'a> OutputStream<'a> {
    pub fn new(inner: &'a mut dyn Write) -> Self {
        Self {
            inner,
            bytes_written: 0,
            flushes: 0,
        }
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn flushes(&self) -> u32 {
        self.flushes
    }
}

impl Write for OutputStream<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.bytes_written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()?;
        self.flushes += 1;
        Ok(())
    }
}

impl fmt::Debug for OutputStream<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputStream")
            .field("bytes_written", &self.bytes_written)
            .field("flushes", &self.flushes)
            .finish_non_exhaustive()
    }
}
