//! Target data layout.
//!
//! Parses LLVM-style data-layout strings into a read-only [`TargetData`]
//! descriptor. Layout strings are `-`-separated specifications:
//!
//! | Spec | Meaning |
//! |------|---------|
//! | `e` / `E` | little / big endian |
//! | `p[n]:size:abi[:pref]` | pointer size and alignment (address space `n`) |
//! | `i`, `f`, `v` `<size>:abi[:pref]` | integer, float, vector alignment |
//! | `a[size]:abi[:pref]` | aggregate alignment |
//! | `n<w>[:<w>...]` | native integer widths |
//! | `S<align>` | natural stack alignment |
//! | `m:<c>` | symbol mangling style |
//!
//! Other upper-case specs are accepted and ignored. All sizes are in bits.

use std::fmt;
use std::str::FromStr;

use smallvec::SmallVec;

/// Data layout used when the driver does not supply one.
pub const DEFAULT_TARGET_DESCRIPTION: &str = "e-p:32:32:32-i1:8:8-i8:8:8-i16:16:16-i32:32:32-\
i64:64:64-f32:32:32-f64:64:64-v64:64:64-v128:128:128-a0:0:64-n32";

/// Error parsing a data-layout string.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DataLayoutError {
    #[error("empty data layout specification")]
    Empty,
    #[error("unknown data layout specification '{0}'")]
    UnknownSpec(String),
    #[error("invalid number '{value}' in data layout specification '{spec}'")]
    InvalidNumber { spec: String, value: String },
    #[error("missing alignment in data layout specification '{0}'")]
    MissingAlignment(String),
    #[error("pointer size must be non-zero in '{0}'")]
    ZeroPointerSize(String),
}

/// Byte order of the target.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum Endianness {
    #[default]
    Little,
    Big,
}

/// Kind of value an alignment rule applies to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AlignKind {
    Integer,
    Float,
    Vector,
    Aggregate,
}

/// ABI and preferred alignment, in bits.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct AlignSpec {
    pub abi: u32,
    pub preferred: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct AlignEntry {
    kind: AlignKind,
    bit_width: u32,
    align: AlignSpec,
}

/// Parsed target data layout.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TargetData {
    description: String,
    endianness: Endianness,
    pointer_size: u32,
    pointer_align: AlignSpec,
    alignments: Vec<AlignEntry>,
    native_integer_widths: SmallVec<[u32; 4]>,
    stack_alignment: Option<u32>,
    mangling: Option<char>,
}

impl TargetData {
    /// Parse a data-layout string.
    pub fn parse(description: &str) -> Result<Self, DataLayoutError> {
        if description.trim().is_empty() {
            return Err(DataLayoutError::Empty);
        }

        let mut data = TargetData {
            description: description.to_string(),
            endianness: Endianness::Little,
            pointer_size: 64,
            pointer_align: AlignSpec {
                abi: 64,
                preferred: 64,
            },
            alignments: Vec::new(),
            native_integer_widths: SmallVec::new(),
            stack_alignment: None,
            mangling: None,
        };

        for spec in description.split('-') {
            data.apply_spec(spec)?;
        }
        Ok(data)
    }

    fn apply_spec(&mut self, spec: &str) -> Result<(), DataLayoutError> {
        let mut chars = spec.chars();
        let Some(head) = chars.next() else {
            return Err(DataLayoutError::UnknownSpec(spec.to_string()));
        };
        let rest = chars.as_str();

        match head {
            'e' if rest.is_empty() => self.endianness = Endianness::Little,
            'E' if rest.is_empty() => self.endianness = Endianness::Big,
            'p' => {
                // Only the default address space affects pointer width.
                let mut fields = rest.split(':');
                let addr_space = fields.next().unwrap_or_default();
                let size = parse_field(spec, fields.next())?;
                if size == 0 {
                    return Err(DataLayoutError::ZeroPointerSize(spec.to_string()));
                }
                let align = parse_align(spec, &mut fields)?;
                if addr_space.is_empty() || addr_space == "0" {
                    self.pointer_size = size;
                    self.pointer_align = align;
                }
            }
            'i' | 'f' | 'v' | 'a' => {
                let kind = match head {
                    'i' => AlignKind::Integer,
                    'f' => AlignKind::Float,
                    'v' => AlignKind::Vector,
                    _ => AlignKind::Aggregate,
                };
                let mut fields = rest.split(':');
                let width = match fields.next() {
                    Some("") if kind == AlignKind::Aggregate => 0,
                    width => parse_field(spec, width)?,
                };
                let align = parse_align(spec, &mut fields)?;
                self.set_alignment(kind, width, align);
            }
            'n' => {
                self.native_integer_widths = rest
                    .split(':')
                    .map(|w| parse_field(spec, Some(w)))
                    .collect::<Result<_, _>>()?;
            }
            'S' => self.stack_alignment = Some(parse_field(spec, Some(rest))?),
            'm' => {
                let mut style = rest.strip_prefix(':').unwrap_or_default().chars();
                match (style.next(), style.next()) {
                    (Some(c), None) => self.mangling = Some(c),
                    _ => return Err(DataLayoutError::UnknownSpec(spec.to_string())),
                }
            }
            // Function-pointer alignment and address-space specs (`F`, `A`,
            // `G`, `P`) do not affect anything the backend reads.
            c if c.is_ascii_uppercase() => {}
            _ => return Err(DataLayoutError::UnknownSpec(spec.to_string())),
        }
        Ok(())
    }

    fn set_alignment(&mut self, kind: AlignKind, bit_width: u32, align: AlignSpec) {
        if let Some(entry) = self
            .alignments
            .iter_mut()
            .find(|e| e.kind == kind && e.bit_width == bit_width)
        {
            entry.align = align;
        } else {
            self.alignments.push(AlignEntry {
                kind,
                bit_width,
                align,
            });
        }
    }

    /// The layout string this descriptor was parsed from.
    pub fn as_str(&self) -> &str {
        &self.description
    }

    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    pub fn is_little_endian(&self) -> bool {
        self.endianness == Endianness::Little
    }

    /// Pointer width of the default address space, in bits.
    pub fn pointer_size_in_bits(&self) -> u32 {
        self.pointer_size
    }

    pub fn pointer_size_in_bytes(&self) -> u32 {
        self.pointer_size / 8
    }

    pub fn pointer_alignment(&self) -> AlignSpec {
        self.pointer_align
    }

    /// Alignment rule for `kind` at exactly `bit_width`, if one was given.
    pub fn alignment(&self, kind: AlignKind, bit_width: u32) -> Option<AlignSpec> {
        self.alignments
            .iter()
            .find(|e| e.kind == kind && e.bit_width == bit_width)
            .map(|e| e.align)
    }

    /// Native integer widths, in declaration order.
    pub fn native_integer_widths(&self) -> &[u32] {
        &self.native_integer_widths
    }

    pub fn is_legal_integer(&self, bit_width: u32) -> bool {
        self.native_integer_widths.contains(&bit_width)
    }

    pub fn stack_alignment(&self) -> Option<u32> {
        self.stack_alignment
    }

    pub fn mangling(&self) -> Option<char> {
        self.mangling
    }
}

impl FromStr for TargetData {
    type Err = DataLayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TargetData::parse(s)
    }
}

impl fmt::Display for TargetData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

fn parse_field(spec: &str, field: Option<&str>) -> Result<u32, DataLayoutError> {
    let value = field.ok_or_else(|| DataLayoutError::MissingAlignment(spec.to_string()))?;
    value.parse().map_err(|_| DataLayoutError::InvalidNumber {
        spec: spec.to_string(),
        value: value.to_string(),
    })
}

/// Parse `abi[:pref]`; the preferred alignment defaults to the ABI one.
fn parse_align<'a>(
    spec: &str,
    fields: &mut impl Iterator<Item = &'a str>,
) -> Result<AlignSpec, DataLayoutError> {
    let abi = parse_field(spec, fields.next())?;
    let preferred = match fields.next() {
        Some(pref) => parse_field(spec, Some(pref))?,
        None => abi,
    };
    Ok(AlignSpec { abi, preferred })
}
