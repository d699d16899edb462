//! Serialized-binary module encoding.
//!
//! Layout: the 4-byte magic `SLBC`, a little-endian `u32` format version,
//! then the `bincode` encoding of the [`Module`].

use std::io::{self, Read, Write};

use crate::Module;

/// File magic of the serialized-binary format.
pub const MAGIC: [u8; 4] = *b"SLBC";

/// Current format version.
pub const FORMAT_VERSION: u32 = 1;

/// Error reading or writing a serialized module.
#[derive(Debug, thiserror::Error)]
pub enum BinaryError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("not a serialized module (bad magic {0:02x?})")]
    BadMagic([u8; 4]),
    #[error("unsupported module format version {found} (expected {})", FORMAT_VERSION)]
    UnsupportedVersion { found: u32 },
    #[error("malformed module encoding: {0}")]
    Encoding(#[from] bincode::Error),
}

/// Write `module` to `out` in the serialized-binary format.
pub fn write_module(module: &Module, out: &mut impl Write) -> Result<(), BinaryError> {
    out.write_all(&MAGIC)?;
    out.write_all(&FORMAT_VERSION.to_le_bytes())?;
    bincode::serialize_into(out, module)?;
    Ok(())
}

/// Read a module previously written by [`write_module`].
pub fn read_module(input: &mut impl Read) -> Result<Module, BinaryError> {
    let mut magic = [0u8; 4];
    input.read_exact(&mut magic)?;
    if magic != MAGIC {
        return Err(BinaryError::BadMagic(magic));
    }

    let mut version = [0u8; 4];
    input.read_exact(&mut version)?;
    let found = u32::from_le_bytes(version);
    if found != FORMAT_VERSION {
        return Err(BinaryError::UnsupportedVersion { found });
    }

    Ok(bincode::deserialize_from(input)?)
}

/// Encode `module` into a byte vector.
pub fn module_to_bytes(module: &Module) -> Result<Vec<u8>, BinaryError> {
    let mut bytes = Vec::new();
    write_module(module, &mut bytes)?;
    Ok(bytes)
}
