//! Composite document identifier codec.
//!
//! # Responsibility
//! - Pack a collection tag and a local record id into one daemon document id.
//! - Decode daemon document ids back into `(local_id, tag)` pairs.
//!
//! # Invariants
//! - Document ids are 32 bits wide: the low `shift` bits hold the local id,
//!   the remaining high bits hold the collection tag.
//! - The shift must match the one used when the daemon index was generated.
//!   A mismatch silently corrupts decoded pairs and cannot be detected here.
//! - `unpack(pack(tag, id)) == (id, tag)` for every in-range pair.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Default number of low bits reserved for the local record id.
pub const DEFAULT_DOCUMENT_ID_SHIFT: u32 = 24;

/// Total width of a packed document id.
pub const DOCUMENT_ID_BITS: u32 = 32;

/// Small integer identifying the record type a document came from.
pub type CollectionTag = u32;

/// Primary key of a record in the application's own storage.
pub type LocalId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    InvalidShift(u32),
    LocalIdOutOfRange { local_id: LocalId, max: LocalId },
    TagOutOfRange { tag: CollectionTag, max: CollectionTag },
}

impl Display for CodecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidShift(shift) => write!(
                f,
                "document id shift {shift} is invalid; expected 1..={}",
                DOCUMENT_ID_BITS - 1
            ),
            Self::LocalIdOutOfRange { local_id, max } => {
                write!(f, "local id {local_id} exceeds the maximum {max}")
            }
            Self::TagOutOfRange { tag, max } => {
                write!(f, "collection tag {tag} exceeds the maximum {max}")
            }
        }
    }
}

impl Error for CodecError {}

/// Packs and unpacks composite document ids for a fixed shift width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentIdCodec {
    shift: u32,
}

impl Default for DocumentIdCodec {
    fn default() -> Self {
        Self {
            shift: DEFAULT_DOCUMENT_ID_SHIFT,
        }
    }
}

impl DocumentIdCodec {
    pub fn new(shift: u32) -> Result<Self, CodecError> {
        if shift == 0 || shift >= DOCUMENT_ID_BITS {
            return Err(CodecError::InvalidShift(shift));
        }
        Ok(Self { shift })
    }

    pub fn shift(&self) -> u32 {
        self.shift
    }

    /// Largest local id representable under this shift.
    pub fn max_local_id(&self) -> LocalId {
        (1u64 << self.shift) - 1
    }

    /// Largest collection tag representable in the remaining high bits.
    pub fn max_tag(&self) -> CollectionTag {
        ((1u64 << (DOCUMENT_ID_BITS - self.shift)) - 1) as CollectionTag
    }

    /// Packs `(tag, local_id)` into a single document id.
    ///
    /// # Errors
    /// - `LocalIdOutOfRange` when `local_id` needs more than `shift` bits.
    /// - `TagOutOfRange` when `tag` does not fit the remaining high bits.
    pub fn pack(&self, tag: CollectionTag, local_id: LocalId) -> Result<u64, CodecError> {
        if local_id > self.max_local_id() {
            return Err(CodecError::LocalIdOutOfRange {
                local_id,
                max: self.max_local_id(),
            });
        }
        if tag > self.max_tag() {
            return Err(CodecError::TagOutOfRange {
                tag,
                max: self.max_tag(),
            });
        }
        Ok((u64::from(tag) << self.shift) | local_id)
    }

    /// Splits a document id into `(local_id, tag)`.
    ///
    /// Bits above the 32-bit document width are ignored.
    pub fn unpack(&self, document_id: u64) -> (LocalId, CollectionTag) {
        let local_id = document_id & self.max_local_id();
        let tag = (document_id >> self.shift) & u64::from(self.max_tag());
        (local_id, tag as CollectionTag)
    }
}

#[cfg(test)]
mod tests {
    use super::{CodecError, DocumentIdCodec};

    #[test]
    fn default_codec_uses_eight_tag_bits() {
        let codec = DocumentIdCodec::default();
        assert_eq!(codec.shift(), 24);
        assert_eq!(codec.max_local_id(), 0x00FF_FFFF);
        assert_eq!(codec.max_tag(), 255);
    }

    #[test]
    fn pack_places_tag_in_high_bits() {
        let codec = DocumentIdCodec::default();
        assert_eq!(codec.pack(1, 42).unwrap(), (1 << 24) | 42);
        assert_eq!(codec.unpack((2 << 24) | 7), (7, 2));
    }

    #[test]
    fn pack_rejects_out_of_range_parts() {
        let codec = DocumentIdCodec::default();
        assert_eq!(
            codec.pack(0, 1 << 24),
            Err(CodecError::LocalIdOutOfRange {
                local_id: 1 << 24,
                max: 0x00FF_FFFF,
            })
        );
        assert_eq!(
            codec.pack(256, 1),
            Err(CodecError::TagOutOfRange { tag: 256, max: 255 })
        );
    }

    #[test]
    fn new_rejects_degenerate_shift() {
        assert_eq!(DocumentIdCodec::new(0), Err(CodecError::InvalidShift(0)));
        assert_eq!(DocumentIdCodec::new(32), Err(CodecError::InvalidShift(32)));
        assert!(DocumentIdCodec::new(20).is_ok());
    }
}
