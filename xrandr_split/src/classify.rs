// src/classify.rs
//! Split-candidate classification.
//!
//! Nothing is cached: a display can be reconfigured between two calls, so every
//! answer comes from a fresh query of the real entity.

use crate::config::SplitSignature;
use crate::id::IdSpace;
use crate::provider::RandrProvider;
use x11::xlib::Display;
use x11::xrandr::{RRCrtc, RROutput, XRRCrtcInfo, XRROutputInfo, XRRScreenResources};

pub struct Classifier<'a, P: ?Sized> {
    provider: &'a P,
    ids: IdSpace,
    signature: SplitSignature,
}

impl<'a, P: RandrProvider + ?Sized> Classifier<'a, P> {
    pub fn new(provider: &'a P, ids: IdSpace, signature: SplitSignature) -> Self {
        Self {
            provider,
            ids,
            signature,
        }
    }

    /// Query the real CRTC behind `crtc` and compare its size with the signature.
    /// A CRTC the library no longer knows is not split-worthy.
    ///
    /// # Safety
    ///
    /// `dpy` and `resources` must satisfy the provider's contract.
    pub unsafe fn crtc_is_split_worthy(
        &self,
        dpy: *mut Display,
        resources: *mut XRRScreenResources,
        crtc: RRCrtc,
    ) -> bool {
        let info = self.provider.crtc_info(dpy, resources, self.ids.untag(crtc));
        let Some(record) = info.as_ref() else {
            return false;
        };
        let worthy = self.crtc_record_is_split_worthy(record);
        self.provider.free_crtc_info(info);
        worthy
    }

    /// Query the real output behind `output`; it is split-worthy when its current CRTC
    /// is. An output without a CRTC never is.
    ///
    /// # Safety
    ///
    /// `dpy` and `resources` must satisfy the provider's contract.
    pub unsafe fn output_is_split_worthy(
        &self,
        dpy: *mut Display,
        resources: *mut XRRScreenResources,
        output: RROutput,
    ) -> bool {
        let info = self.provider.output_info(dpy, resources, self.ids.untag(output));
        let Some(record) = info.as_ref() else {
            return false;
        };
        let worthy = self.output_record_is_split_worthy(dpy, resources, record);
        self.provider.free_output_info(info);
        worthy
    }

    pub fn crtc_record_is_split_worthy(&self, info: &XRRCrtcInfo) -> bool {
        self.signature.matches(info.width, info.height)
    }

    /// Same as [`Classifier::output_is_split_worthy`] for a record already fetched.
    ///
    /// # Safety
    ///
    /// `dpy` and `resources` must satisfy the provider's contract.
    pub unsafe fn output_record_is_split_worthy(
        &self,
        dpy: *mut Display,
        resources: *mut XRRScreenResources,
        info: &XRROutputInfo,
    ) -> bool {
        info.crtc != 0 && self.crtc_is_split_worthy(dpy, resources, info.crtc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{FakeCrtc, FakeOutput, FakeRandr};
    use std::ptr;

    fn provider() -> FakeRandr {
        FakeRandr::new()
            .with_crtc(FakeCrtc::new(0x40, 0, 0, 3840, 1080))
            .with_crtc(FakeCrtc::new(0x41, 3840, 0, 1920, 1080))
            .with_output(FakeOutput::new(0x50, "DP-1", 0x40, 700, 200))
            .with_output(FakeOutput::new(0x51, "HDMI-1", 0x41, 530, 300))
            .with_output(FakeOutput::new(0x52, "DP-2", 0, 700, 200))
    }

    #[test]
    fn test_crtc_signature() {
        let fake = provider();
        let classifier = Classifier::new(&fake, IdSpace::default(), SplitSignature::new(3840, 1080));
        let dpy = ptr::null_mut();
        let res = ptr::null_mut();
        unsafe {
            assert!(classifier.crtc_is_split_worthy(dpy, res, 0x40));
            assert!(classifier.crtc_is_split_worthy(dpy, res, 0xf0_0040));
            assert!(!classifier.crtc_is_split_worthy(dpy, res, 0x41));
            assert!(!classifier.crtc_is_split_worthy(dpy, res, 0x99));
        }
        assert!(fake.seen_ids().iter().all(|id| id & 0xf0_0000 == 0));
        assert_eq!(fake.live_records(), 0);
    }

    #[test]
    fn test_output_follows_its_crtc() {
        let fake = provider();
        let classifier = Classifier::new(&fake, IdSpace::default(), SplitSignature::new(3840, 1080));
        let dpy = ptr::null_mut();
        let res = ptr::null_mut();
        unsafe {
            assert!(classifier.output_is_split_worthy(dpy, res, 0x50));
            assert!(classifier.output_is_split_worthy(dpy, res, 0xf0_0050));
            assert!(!classifier.output_is_split_worthy(dpy, res, 0x51));
            // no CRTC, same physical size as DP-1
            assert!(!classifier.output_is_split_worthy(dpy, res, 0x52));
            assert!(!classifier.output_is_split_worthy(dpy, res, 0x99));
        }
        assert_eq!(fake.live_records(), 0);
    }

    #[test]
    fn test_reclassifies_after_mode_change() {
        let fake = provider();
        let classifier = Classifier::new(&fake, IdSpace::default(), SplitSignature::new(3840, 1080));
        unsafe {
            assert!(classifier.crtc_is_split_worthy(ptr::null_mut(), ptr::null_mut(), 0x40));
            fake.set_crtc_geometry(0x40, 0, 0, 2560, 1080);
            assert!(!classifier.crtc_is_split_worthy(ptr::null_mut(), ptr::null_mut(), 0x40));
        }
    }
}
