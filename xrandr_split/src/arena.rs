// src/arena.rs
//! Fixed-capacity scratch storage for lists that gained a synthetic entry.
//!
//! libXrandr allocates a record and its id arrays as one block, so a list cannot grow
//! in place. An augmented list is copied into one of the buffers here and the record
//! is repointed at it; freeing the record still frees only the original block. Each
//! buffer is allocated once and reused: a list handed out from a buffer stays valid
//! until the next augmentation through the same slot.

use crate::error::{Result, SplitError};
use crate::id::IdSpace;
use log::debug;
use std::os::raw::c_int;
use std::ptr;
use x11::xlib::XID;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// `XRRScreenResources::crtcs`
    ResourceCrtcs,
    /// `XRRScreenResources::outputs`
    ResourceOutputs,
    /// `XRROutputInfo::crtcs` of a virtual output. Kept apart from `ResourceCrtcs`
    /// so querying a virtual output never rewrites a snapshot's CRTC list.
    OutputCrtcs,
}

#[derive(Debug)]
pub struct FakeArena {
    capacity: usize,
    resource_crtcs: Box<[XID]>,
    resource_outputs: Box<[XID]>,
    output_crtcs: Box<[XID]>,
}

impl FakeArena {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            resource_crtcs: vec![0; capacity].into_boxed_slice(),
            resource_outputs: vec![0; capacity].into_boxed_slice(),
            output_crtcs: vec![0; capacity].into_boxed_slice(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn buffer(&self, slot: Slot) -> &[XID] {
        match slot {
            Slot::ResourceCrtcs => &self.resource_crtcs,
            Slot::ResourceOutputs => &self.resource_outputs,
            Slot::OutputCrtcs => &self.output_crtcs,
        }
    }

    fn buffer_mut(&mut self, slot: Slot) -> &mut [XID] {
        match slot {
            Slot::ResourceCrtcs => &mut self.resource_crtcs,
            Slot::ResourceOutputs => &mut self.resource_outputs,
            Slot::OutputCrtcs => &mut self.output_crtcs,
        }
    }

    /// Append the synthetic twin of `real` to the list `(*list, *count)`.
    ///
    /// On success `*list` points into this arena and `*count` is one larger. When the
    /// slot is full nothing is touched and `CapacityExceeded` is returned.
    ///
    /// # Safety
    ///
    /// `*list` must be null or valid for reads of `*count` ids.
    pub unsafe fn append_fake(
        &mut self,
        slot: Slot,
        ids: &IdSpace,
        count: &mut c_int,
        list: &mut *mut XID,
        real: XID,
    ) -> Result<()> {
        let fake = ids.tag(real);
        let len = if list.is_null() {
            0
        } else {
            usize::try_from(*count).unwrap_or(0)
        };
        let capacity = self.capacity;
        if len + 1 > capacity {
            return Err(SplitError::CapacityExceeded { capacity });
        }

        let buffer = self.buffer_mut(slot);
        let dst = buffer.as_mut_ptr();
        // 同一个 buffer 再次追加时不需要拷贝
        if len > 0 && *list != dst {
            ptr::copy(*list as *const XID, dst, len);
        }
        buffer[len] = fake;

        *list = dst;
        *count = (len + 1) as c_int;
        debug!("[arena] {:?}: appended {:#x}, {} entries", slot, fake, len + 1);
        Ok(())
    }

    /// # Safety
    ///
    /// See [`FakeArena::append_fake`].
    pub unsafe fn append_fake_crtc(
        &mut self,
        ids: &IdSpace,
        count: &mut c_int,
        crtcs: &mut *mut XID,
        real_crtc: XID,
    ) -> Result<()> {
        self.append_fake(Slot::ResourceCrtcs, ids, count, crtcs, real_crtc)
    }

    /// # Safety
    ///
    /// See [`FakeArena::append_fake`].
    pub unsafe fn append_fake_output(
        &mut self,
        ids: &IdSpace,
        count: &mut c_int,
        outputs: &mut *mut XID,
        real_output: XID,
    ) -> Result<()> {
        self.append_fake(Slot::ResourceOutputs, ids, count, outputs, real_output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_copies_and_tags() {
        let ids = IdSpace::default();
        let mut arena = FakeArena::new(8);
        let mut original = vec![0x40, 0x41, 0x42];
        let mut list = original.as_mut_ptr();
        let mut count = 3;

        unsafe { arena.append_fake_crtc(&ids, &mut count, &mut list, 0x41) }.unwrap();

        assert_eq!(count, 4);
        assert_eq!(list, arena.buffer(Slot::ResourceCrtcs).as_ptr() as *mut XID);
        let appended = unsafe { std::slice::from_raw_parts(list, 4) };
        assert_eq!(appended, &[0x40, 0x41, 0x42, 0xf0_0041]);
        // 原数组不变
        assert_eq!(original, vec![0x40, 0x41, 0x42]);
    }

    #[test]
    fn test_slots_do_not_alias() {
        let ids = IdSpace::default();
        let mut arena = FakeArena::new(4);
        let mut crtcs = vec![0x10];
        let mut outputs = vec![0x20];
        let (mut crtc_list, mut crtc_count) = (crtcs.as_mut_ptr(), 1);
        let (mut output_list, mut output_count) = (outputs.as_mut_ptr(), 1);

        unsafe {
            arena
                .append_fake_crtc(&ids, &mut crtc_count, &mut crtc_list, 0x10)
                .unwrap();
            arena
                .append_fake_output(&ids, &mut output_count, &mut output_list, 0x20)
                .unwrap();
            let mut info_crtcs = vec![0x10, 0x11];
            let (mut info_list, mut info_count) = (info_crtcs.as_mut_ptr(), 2);
            arena
                .append_fake(Slot::OutputCrtcs, &ids, &mut info_count, &mut info_list, 0x10)
                .unwrap();
        }

        assert_eq!(&arena.buffer(Slot::ResourceCrtcs)[..2], &[0x10, 0xf0_0010]);
        assert_eq!(&arena.buffer(Slot::ResourceOutputs)[..2], &[0x20, 0xf0_0020]);
        assert_eq!(
            &arena.buffer(Slot::OutputCrtcs)[..3],
            &[0x10, 0x11, 0xf0_0010]
        );
    }

    #[test]
    fn test_capacity_exceeded_leaves_list_alone() {
        let ids = IdSpace::default();
        let mut arena = FakeArena::new(2);
        let mut original = vec![1, 2];
        let mut list = original.as_mut_ptr();
        let mut count = 2;

        let err = unsafe { arena.append_fake_output(&ids, &mut count, &mut list, 1) }.unwrap_err();

        assert!(matches!(err, SplitError::CapacityExceeded { capacity: 2 }));
        assert_eq!(count, 2);
        assert_eq!(list, original.as_mut_ptr());
    }

    #[test]
    fn test_reappend_in_place() {
        let ids = IdSpace::default();
        let mut arena = FakeArena::new(4);
        let mut original = vec![7];
        let mut list = original.as_mut_ptr();
        let mut count = 1;

        unsafe {
            arena.append_fake_crtc(&ids, &mut count, &mut list, 7).unwrap();
            arena.append_fake_crtc(&ids, &mut count, &mut list, 8).unwrap();
        }

        assert_eq!(count, 3);
        assert_eq!(&arena.buffer(Slot::ResourceCrtcs)[..3], &[7, 0xf0_0007, 0xf0_0008]);
    }

    #[test]
    fn test_null_list_starts_empty() {
        let ids = IdSpace::default();
        let mut arena = FakeArena::new(1);
        let mut list: *mut XID = ptr::null_mut();
        let mut count = 5;

        unsafe { arena.append_fake_crtc(&ids, &mut count, &mut list, 3) }.unwrap();

        assert_eq!(count, 1);
        assert_eq!(unsafe { *list }, 0xf0_0003);
    }
}
