// src/id.rs
//! Synthetic identifier scheme.
//!
//! A synthetic XID is a real XID with the tag bits OR-ed in. The server never hands
//! out XIDs with those bits set, so the tag is disjoint from every real identifier.

use crate::error::{Result, SplitError};
use x11::xlib::XID;

pub const DEFAULT_TAG: XID = 0xf0_0000;

/// An XID seen at the API boundary, decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Identifier {
    Real(XID),
    /// The virtual right half of the real entity it wraps.
    Synthetic(XID),
}

impl Identifier {
    /// The real XID behind this identifier. This is the only value that may cross
    /// into the underlying library.
    pub fn real(self) -> XID {
        match self {
            Identifier::Real(xid) | Identifier::Synthetic(xid) => xid,
        }
    }

    pub fn is_synthetic(self) -> bool {
        matches!(self, Identifier::Synthetic(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdSpace {
    tag: XID,
}

impl Default for IdSpace {
    fn default() -> Self {
        Self::new(DEFAULT_TAG)
    }
}

impl IdSpace {
    pub fn new(tag: XID) -> Self {
        debug_assert!(tag != 0, "split tag must have at least one bit set");
        Self { tag }
    }

    pub fn tag_bits(&self) -> XID {
        self.tag
    }

    /// Produce the synthetic twin of `real`.
    ///
    /// Panics if `real` already carries tag bits: that is a programming error, not a
    /// runtime condition. Use [`IdSpace::try_tag`] on untrusted input.
    pub fn tag(&self, real: XID) -> XID {
        assert!(
            real & self.tag == 0,
            "xid {:#x} already carries split tag {:#x}",
            real,
            self.tag
        );
        real | self.tag
    }

    pub fn try_tag(&self, real: XID) -> Result<XID> {
        if real & self.tag != 0 {
            return Err(SplitError::TagCollision {
                xid: real,
                tag: self.tag,
            });
        }
        Ok(real | self.tag)
    }

    /// Clear the tag bits. Idempotent, safe on real and synthetic ids alike.
    pub fn untag(&self, any: XID) -> XID {
        any & !self.tag
    }

    pub fn is_synthetic(&self, any: XID) -> bool {
        any & self.tag != 0
    }

    pub fn decode(&self, raw: XID) -> Identifier {
        if self.is_synthetic(raw) {
            Identifier::Synthetic(self.untag(raw))
        } else {
            Identifier::Real(raw)
        }
    }

    pub fn encode(&self, id: Identifier) -> XID {
        match id {
            Identifier::Real(xid) => xid,
            Identifier::Synthetic(xid) => self.tag(xid),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let ids = IdSpace::default();
        for real in [1, 0x3f, 0x42, 0x0e_ffff, 0x1000_0000] {
            let fake = ids.tag(real);
            assert_eq!(ids.untag(fake), real);
            assert_eq!(ids.tag(ids.untag(fake)), fake);
            assert!(ids.is_synthetic(fake));
            assert!(!ids.is_synthetic(real));
        }
    }

    #[test]
    fn test_untag_is_idempotent() {
        let ids = IdSpace::default();
        assert_eq!(ids.untag(0x63), 0x63);
        assert_eq!(ids.untag(ids.untag(0xf0_0063)), 0x63);
    }

    #[test]
    fn test_partial_tag_counts_as_synthetic() {
        let ids = IdSpace::default();
        assert!(ids.is_synthetic(0x10_0001));
        assert_eq!(ids.untag(0x10_0001), 1);
    }

    #[test]
    #[should_panic(expected = "already carries split tag")]
    fn test_tag_collision_panics() {
        IdSpace::default().tag(0xf0_0001);
    }

    #[test]
    fn test_try_tag_reports_collision() {
        let ids = IdSpace::new(0x8000);
        assert!(matches!(
            ids.try_tag(0x8001),
            Err(SplitError::TagCollision { xid: 0x8001, tag: 0x8000 })
        ));
        assert_eq!(ids.try_tag(1).unwrap(), 0x8001);
    }

    #[test]
    fn test_decode_encode() {
        let ids = IdSpace::default();
        assert_eq!(ids.decode(0x55), Identifier::Real(0x55));
        assert_eq!(ids.decode(0xf0_0055), Identifier::Synthetic(0x55));
        assert_eq!(ids.encode(Identifier::Synthetic(0x55)), 0xf0_0055);
        assert_eq!(Identifier::Synthetic(0x55).real(), 0x55);
        assert!(!Identifier::Real(0x55).is_synthetic());
    }
}
