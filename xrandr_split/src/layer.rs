// src/layer.rs
//! The split layer: query interceptors and the configuration guard.
//!
//! Each entry point strips the tag, forwards to the provider, then rewrites the
//! returned record according to split status and which half was asked for. Records
//! are returned under libXrandr's ownership rules; the caller frees them as usual.

use crate::arena::{FakeArena, Slot};
use crate::classify::Classifier;
use crate::config::{SplitConfig, SplitSignature};
use crate::id::{IdSpace, Identifier};
use crate::provider::{RandrProvider, SET_CONFIG_FAILED};
use log::{debug, warn};
use std::os::raw::{c_char, c_int, c_long, c_uchar, c_ulong};
use std::sync::{Mutex, MutexGuard, PoisonError};
use x11::xlib::{Atom, Bool, Display, Status, Time, Window, XID};
use x11::xrandr::{
    RRCrtc, RRMode, RROutput, Rotation, XRRCrtcGamma, XRRCrtcInfo, XRRCrtcTransformAttributes,
    XRROutputInfo, XRRPanning, XRRPropertyInfo, XRRScreenResources,
};
use x11::xrender::{XFixed, XTransform};

/// Replaces the last character of a virtual output's name, e.g. `DP-1` -> `DP-_`.
pub const VIRTUAL_NAME_MARKER: u8 = b'_';

pub struct SplitLayer<P> {
    provider: P,
    ids: IdSpace,
    signature: SplitSignature,
    // 所有调用共享的 scratch 空间
    arena: Mutex<FakeArena>,
}

impl<P: RandrProvider> SplitLayer<P> {
    pub fn new(provider: P, config: &SplitConfig) -> Self {
        Self::with_parts(
            provider,
            IdSpace::new(config.tag),
            config.signature,
            config.max_entities,
        )
    }

    pub fn with_parts(
        provider: P,
        ids: IdSpace,
        signature: SplitSignature,
        capacity: usize,
    ) -> Self {
        Self {
            provider,
            ids,
            signature,
            arena: Mutex::new(FakeArena::new(capacity)),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn ids(&self) -> IdSpace {
        self.ids
    }

    pub fn signature(&self) -> SplitSignature {
        self.signature
    }

    pub fn classifier(&self) -> Classifier<'_, P> {
        Classifier::new(&self.provider, self.ids, self.signature)
    }

    fn arena(&self) -> MutexGuard<'_, FakeArena> {
        self.arena.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// `XRRGetScreenResources`
    ///
    /// # Safety
    ///
    /// Same contract as libXrandr's `XRRGetScreenResources`.
    pub unsafe fn get_screen_resources(
        &self,
        dpy: *mut Display,
        window: Window,
    ) -> *mut XRRScreenResources {
        let resources = self.provider.screen_resources(dpy, window);
        self.augment_resources(dpy, resources)
    }

    /// `XRRGetScreenResourcesCurrent`
    ///
    /// # Safety
    ///
    /// Same contract as libXrandr's `XRRGetScreenResourcesCurrent`.
    pub unsafe fn get_screen_resources_current(
        &self,
        dpy: *mut Display,
        window: Window,
    ) -> *mut XRRScreenResources {
        let resources = self.provider.screen_resources_current(dpy, window);
        self.augment_resources(dpy, resources)
    }

    /// Append the synthetic twin of the first split-worthy CRTC and, independently,
    /// of the first split-worthy output. Only one split per snapshot is supported,
    /// so each scan stops at its first match.
    unsafe fn augment_resources(
        &self,
        dpy: *mut Display,
        resources: *mut XRRScreenResources,
    ) -> *mut XRRScreenResources {
        if resources.is_null() {
            return resources;
        }
        let classifier = self.classifier();

        let crtc = self.first_match(
            (*resources).crtcs,
            (*resources).ncrtc,
            |crtc| classifier.crtc_is_split_worthy(dpy, resources, crtc),
        );
        if let Some(crtc) = crtc {
            let res = &mut *resources;
            match self
                .arena()
                .append_fake_crtc(&self.ids, &mut res.ncrtc, &mut res.crtcs, crtc)
            {
                Ok(()) => debug!(
                    "[augment] crtc {:#x} split, virtual {:#x}",
                    crtc,
                    self.ids.tag(crtc)
                ),
                Err(e) => warn!("[augment] crtc {:#x} not split: {}", crtc, e),
            }
        }

        let output = self.first_match(
            (*resources).outputs,
            (*resources).noutput,
            |output| classifier.output_is_split_worthy(dpy, resources, output),
        );
        if let Some(output) = output {
            let res = &mut *resources;
            match self
                .arena()
                .append_fake_output(&self.ids, &mut res.noutput, &mut res.outputs, output)
            {
                Ok(()) => debug!(
                    "[augment] output {:#x} split, virtual {:#x}",
                    output,
                    self.ids.tag(output)
                ),
                Err(e) => warn!("[augment] output {:#x} not split: {}", output, e),
            }
        }

        resources
    }

    /// First real id in the list accepted by `worthy`. Synthetic entries are skipped.
    unsafe fn first_match<F>(&self, list: *const XID, count: c_int, mut worthy: F) -> Option<XID>
    where
        F: FnMut(XID) -> bool,
    {
        if list.is_null() || count <= 0 {
            return None;
        }
        (0..count as usize)
            .map(|i| *list.add(i))
            .filter(|&id| !self.ids.is_synthetic(id))
            .find(|&id| worthy(id))
    }

    /// `XRRGetOutputInfo`
    ///
    /// Both halves of a split output report half the physical width. The virtual half
    /// additionally gets a marked name and the virtual CRTC as its current CRTC.
    ///
    /// # Safety
    ///
    /// Same contract as libXrandr's `XRRGetOutputInfo`.
    pub unsafe fn get_output_info(
        &self,
        dpy: *mut Display,
        resources: *mut XRRScreenResources,
        output: RROutput,
    ) -> *mut XRROutputInfo {
        let requested = self.ids.decode(output);
        let info = self.provider.output_info(dpy, resources, requested.real());
        let Some(record) = info.as_mut() else {
            return info;
        };
        if !self
            .classifier()
            .output_record_is_split_worthy(dpy, resources, record)
        {
            return info;
        }

        record.mm_width /= 2;
        if requested.is_synthetic() {
            mark_virtual_name(record);
            let real_crtc = record.crtc;
            if let Err(e) = self.arena().append_fake(
                Slot::OutputCrtcs,
                &self.ids,
                &mut record.ncrtc,
                &mut record.crtcs,
                real_crtc,
            ) {
                warn!("[output_info] {:#x}: crtc list not extended: {}", output, e);
            }
            record.crtc = self.ids.tag(real_crtc);
            debug!(
                "[output_info] virtual output {:#x} on crtc {:#x}",
                output, record.crtc
            );
        }
        info
    }

    /// `XRRGetCrtcInfo`
    ///
    /// A split CRTC reports half its width; the virtual half sits directly to the
    /// right of the real one.
    ///
    /// # Safety
    ///
    /// Same contract as libXrandr's `XRRGetCrtcInfo`.
    pub unsafe fn get_crtc_info(
        &self,
        dpy: *mut Display,
        resources: *mut XRRScreenResources,
        crtc: RRCrtc,
    ) -> *mut XRRCrtcInfo {
        let requested = self.ids.decode(crtc);
        let info = self.provider.crtc_info(dpy, resources, requested.real());
        let Some(record) = info.as_mut() else {
            return info;
        };
        if !self.classifier().crtc_record_is_split_worthy(record) {
            return info;
        }

        record.width /= 2;
        if let Identifier::Synthetic(_) = requested {
            record.x += record.width as c_int;
        }
        debug!(
            "[crtc_info] {:#x}: {}x{}+{}+{}",
            crtc, record.width, record.height, record.x, record.y
        );
        info
    }

    /// `XRRSetCrtcConfig`
    ///
    /// The virtual half has no CRTC of its own, so any request naming a synthetic CRTC
    /// or output fails without reaching the server.
    ///
    /// # Safety
    ///
    /// Same contract as libXrandr's `XRRSetCrtcConfig`.
    #[allow(clippy::too_many_arguments)]
    pub unsafe fn set_crtc_config(
        &self,
        dpy: *mut Display,
        resources: *mut XRRScreenResources,
        crtc: RRCrtc,
        timestamp: Time,
        x: c_int,
        y: c_int,
        mode: RRMode,
        rotation: Rotation,
        outputs: *mut RROutput,
        noutputs: c_int,
    ) -> c_int {
        if self.ids.is_synthetic(crtc) {
            debug!("[set_crtc_config] rejected virtual crtc {:#x}", crtc);
            return SET_CONFIG_FAILED;
        }
        if !outputs.is_null() && noutputs > 0 {
            let requested = std::slice::from_raw_parts(outputs, noutputs as usize);
            if let Some(&output) = requested.iter().find(|&&o| self.ids.is_synthetic(o)) {
                debug!(
                    "[set_crtc_config] rejected crtc {:#x}: virtual output {:#x}",
                    crtc, output
                );
                return SET_CONFIG_FAILED;
            }
        }
        self.provider.set_crtc_config(
            dpy, resources, crtc, timestamp, x, y, mode, rotation, outputs, noutputs,
        )
    }

    /// # Safety
    ///
    /// Same contract as libXrandr's `XRRGetCrtcGammaSize`.
    pub unsafe fn get_crtc_gamma_size(&self, dpy: *mut Display, crtc: RRCrtc) -> c_int {
        self.provider.crtc_gamma_size(dpy, self.ids.untag(crtc))
    }

    /// # Safety
    ///
    /// Same contract as libXrandr's `XRRGetCrtcGamma`.
    pub unsafe fn get_crtc_gamma(&self, dpy: *mut Display, crtc: RRCrtc) -> *mut XRRCrtcGamma {
        self.provider.crtc_gamma(dpy, self.ids.untag(crtc))
    }

    /// # Safety
    ///
    /// Same contract as libXrandr's `XRRGetPanning`.
    pub unsafe fn get_panning(
        &self,
        dpy: *mut Display,
        resources: *mut XRRScreenResources,
        crtc: RRCrtc,
    ) -> *mut XRRPanning {
        self.provider.panning(dpy, resources, self.ids.untag(crtc))
    }

    /// # Safety
    ///
    /// Same contract as libXrandr's `XRRListOutputProperties`.
    pub unsafe fn list_output_properties(
        &self,
        dpy: *mut Display,
        output: RROutput,
        nprop: *mut c_int,
    ) -> *mut Atom {
        self.provider
            .list_output_properties(dpy, self.ids.untag(output), nprop)
    }

    /// Both halves share the real output's properties (EDID included).
    ///
    /// # Safety
    ///
    /// Same contract as libXrandr's `XRRGetOutputProperty`.
    #[allow(clippy::too_many_arguments)]
    pub unsafe fn get_output_property(
        &self,
        dpy: *mut Display,
        output: RROutput,
        property: Atom,
        offset: c_long,
        length: c_long,
        delete: Bool,
        pending: Bool,
        req_type: Atom,
        actual_type: *mut Atom,
        actual_format: *mut c_int,
        nitems: *mut c_ulong,
        bytes_after: *mut c_ulong,
        prop: *mut *mut c_uchar,
    ) -> c_int {
        self.provider.output_property(
            dpy,
            self.ids.untag(output),
            property,
            offset,
            length,
            delete,
            pending,
            req_type,
            actual_type,
            actual_format,
            nitems,
            bytes_after,
            prop,
        )
    }

    /// Making the virtual half primary makes the real output primary.
    ///
    /// # Safety
    ///
    /// Same contract as libXrandr's `XRRSetOutputPrimary`.
    pub unsafe fn set_output_primary(&self, dpy: *mut Display, window: Window, output: RROutput) {
        self.provider
            .set_output_primary(dpy, window, self.ids.untag(output))
    }

    /// A ramp set on the virtual half applies to the whole monitor.
    ///
    /// # Safety
    ///
    /// Same contract as libXrandr's `XRRSetCrtcGamma`.
    pub unsafe fn set_crtc_gamma(&self, dpy: *mut Display, crtc: RRCrtc, gamma: *mut XRRCrtcGamma) {
        self.provider.set_crtc_gamma(dpy, self.ids.untag(crtc), gamma)
    }

    /// # Safety
    ///
    /// Same contract as libXrandr's `XRRGetCrtcTransform`.
    pub unsafe fn get_crtc_transform(
        &self,
        dpy: *mut Display,
        crtc: RRCrtc,
        attributes: *mut *mut XRRCrtcTransformAttributes,
    ) -> Status {
        self.provider
            .crtc_transform(dpy, self.ids.untag(crtc), attributes)
    }

    /// # Safety
    ///
    /// Same contract as libXrandr's `XRRSetCrtcTransform`.
    pub unsafe fn set_crtc_transform(
        &self,
        dpy: *mut Display,
        crtc: RRCrtc,
        transform: *mut XTransform,
        filter: *const c_char,
        params: *mut XFixed,
        nparams: c_int,
    ) {
        self.provider.set_crtc_transform(
            dpy,
            self.ids.untag(crtc),
            transform,
            filter,
            params,
            nparams,
        )
    }

    /// # Safety
    ///
    /// Same contract as libXrandr's `XRRSetPanning`.
    pub unsafe fn set_panning(
        &self,
        dpy: *mut Display,
        resources: *mut XRRScreenResources,
        crtc: RRCrtc,
        panning: *mut XRRPanning,
    ) -> Status {
        self.provider
            .set_panning(dpy, resources, self.ids.untag(crtc), panning)
    }

    /// # Safety
    ///
    /// Same contract as libXrandr's `XRRQueryOutputProperty`.
    pub unsafe fn query_output_property(
        &self,
        dpy: *mut Display,
        output: RROutput,
        property: Atom,
    ) -> *mut XRRPropertyInfo {
        self.provider
            .query_output_property(dpy, self.ids.untag(output), property)
    }

    /// # Safety
    ///
    /// Same contract as libXrandr's `XRRConfigureOutputProperty`.
    #[allow(clippy::too_many_arguments)]
    pub unsafe fn configure_output_property(
        &self,
        dpy: *mut Display,
        output: RROutput,
        property: Atom,
        pending: Bool,
        range: Bool,
        num_values: c_int,
        values: *mut c_long,
    ) {
        self.provider.configure_output_property(
            dpy,
            self.ids.untag(output),
            property,
            pending,
            range,
            num_values,
            values,
        )
    }

    /// # Safety
    ///
    /// Same contract as libXrandr's `XRRChangeOutputProperty`.
    #[allow(clippy::too_many_arguments)]
    pub unsafe fn change_output_property(
        &self,
        dpy: *mut Display,
        output: RROutput,
        property: Atom,
        type_: Atom,
        format: c_int,
        mode: c_int,
        data: *const c_uchar,
        nelements: c_int,
    ) {
        self.provider.change_output_property(
            dpy,
            self.ids.untag(output),
            property,
            type_,
            format,
            mode,
            data,
            nelements,
        )
    }

    /// # Safety
    ///
    /// Same contract as libXrandr's `XRRDeleteOutputProperty`.
    pub unsafe fn delete_output_property(&self, dpy: *mut Display, output: RROutput, property: Atom) {
        self.provider
            .delete_output_property(dpy, self.ids.untag(output), property)
    }

    /// # Safety
    ///
    /// Same contract as libXrandr's `XRRAddOutputMode`.
    pub unsafe fn add_output_mode(&self, dpy: *mut Display, output: RROutput, mode: RRMode) {
        self.provider
            .add_output_mode(dpy, self.ids.untag(output), mode)
    }

    /// # Safety
    ///
    /// Same contract as libXrandr's `XRRDeleteOutputMode`.
    pub unsafe fn delete_output_mode(&self, dpy: *mut Display, output: RROutput, mode: RRMode) {
        self.provider
            .delete_output_mode(dpy, self.ids.untag(output), mode)
    }
}

unsafe fn mark_virtual_name(info: &mut XRROutputInfo) {
    if info.name.is_null() || info.nameLen <= 0 {
        return;
    }
    *info.name.add(info.nameLen as usize - 1) = VIRTUAL_NAME_MARKER as c_char;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{crtc_list, output_list, FakeCrtc, FakeOutput, FakeRandr};
    use std::ptr;

    fn layer(capacity: usize) -> SplitLayer<FakeRandr> {
        let fake = FakeRandr::new()
            .with_crtc(FakeCrtc::new(0x40, 0, 0, 3840, 1080))
            .with_output(FakeOutput::new(0x50, "DP-1", 0x40, 700, 200));
        SplitLayer::with_parts(
            fake,
            IdSpace::default(),
            SplitSignature::new(3840, 1080),
            capacity,
        )
    }

    #[test]
    fn test_full_arena_returns_snapshot_unaugmented() {
        let layer = layer(1);
        unsafe {
            let res = layer.get_screen_resources(ptr::null_mut(), 1);
            assert_eq!(crtc_list(res), vec![0x40]);
            assert_eq!(output_list(res), vec![0x50]);
            layer.provider().free_screen_resources(res);
        }
        assert_eq!(layer.provider().live_records(), 0);
    }

    #[test]
    fn test_empty_name_is_left_alone() {
        let mut info: XRROutputInfo = unsafe { std::mem::zeroed() };
        unsafe { mark_virtual_name(&mut info) };
        assert!(info.name.is_null());

        let mut name = *b"eDP\0";
        info.name = name.as_mut_ptr() as *mut c_char;
        info.nameLen = 3;
        unsafe { mark_virtual_name(&mut info) };
        assert_eq!(&name, b"eD_\0");
    }

    #[test]
    fn test_null_resources_pass_through() {
        let layer = layer(8);
        unsafe {
            assert!(layer
                .augment_resources(ptr::null_mut(), ptr::null_mut())
                .is_null());
        }
    }
}
