// src/fake.rs
//! In-memory RandR provider for tests and benches.
//!
//! Records are laid out like libXrandr's: one heap block per record with the id
//! arrays owned by the same block, so repointing a list field (as the split layer
//! does) never changes what gets freed. Every identifier handed to the provider is
//! recorded and can be checked with [`FakeRandr::seen_ids`].

use crate::provider::{RandrProvider, SET_CONFIG_SUCCESS};
use std::os::raw::{c_char, c_int, c_long, c_uchar, c_uint, c_ulong};
use std::ptr;
use std::sync::atomic::{AtomicIsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use x11::xlib::{Atom, Bool, Display, Status, Time, Window, XID};
use x11::xrandr::{
    RRCrtc, RRMode, RROutput, Rotation, XRRCrtcGamma, XRRCrtcInfo, XRRCrtcTransformAttributes,
    XRROutputInfo, XRRPanning, XRRPropertyInfo, XRRScreenResources,
};
use x11::xrender::{XFixed, XTransform};

const ROTATE_0: Rotation = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeCrtc {
    pub id: RRCrtc,
    pub x: c_int,
    pub y: c_int,
    pub width: c_uint,
    pub height: c_uint,
    pub outputs: Vec<RROutput>,
}

impl FakeCrtc {
    pub fn new(id: RRCrtc, x: c_int, y: c_int, width: c_uint, height: c_uint) -> Self {
        Self {
            id,
            x,
            y,
            width,
            height,
            outputs: Vec::new(),
        }
    }

    pub fn with_outputs(mut self, outputs: &[RROutput]) -> Self {
        self.outputs = outputs.to_vec();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeOutput {
    pub id: RROutput,
    pub name: String,
    pub crtc: RRCrtc,
    pub mm_width: c_ulong,
    pub mm_height: c_ulong,
    /// Possible CRTCs. Defaults to the current one.
    pub crtcs: Vec<RRCrtc>,
}

impl FakeOutput {
    pub fn new(id: RROutput, name: &str, crtc: RRCrtc, mm_width: c_ulong, mm_height: c_ulong) -> Self {
        Self {
            id,
            name: name.to_string(),
            crtc,
            mm_width,
            mm_height,
            crtcs: if crtc != 0 { vec![crtc] } else { Vec::new() },
        }
    }

    pub fn with_crtcs(mut self, crtcs: &[RRCrtc]) -> Self {
        self.crtcs = crtcs.to_vec();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCrtcConfigCall {
    pub crtc: RRCrtc,
    pub x: c_int,
    pub y: c_int,
    pub mode: RRMode,
    pub rotation: Rotation,
    pub outputs: Vec<RROutput>,
}

#[derive(Debug, Default)]
struct FakeState {
    crtcs: Vec<FakeCrtc>,
    outputs: Vec<FakeOutput>,
    seen: Vec<XID>,
    set_config_calls: Vec<SetCrtcConfigCall>,
    primary: Option<RROutput>,
    output_modes: Vec<(RROutput, RRMode)>,
    properties: Vec<(RROutput, Atom)>,
}

#[repr(C)]
struct ResourcesBlock {
    record: XRRScreenResources,
    crtcs: Vec<RRCrtc>,
    outputs: Vec<RROutput>,
}

#[repr(C)]
struct OutputBlock {
    record: XRROutputInfo,
    name: Vec<c_char>,
    crtcs: Vec<RRCrtc>,
}

#[repr(C)]
struct CrtcBlock {
    record: XRRCrtcInfo,
    outputs: Vec<RROutput>,
    possible: Vec<RROutput>,
}

#[derive(Debug, Default)]
pub struct FakeRandr {
    state: Mutex<FakeState>,
    live: AtomicIsize,
}

impl FakeRandr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_crtc(self, crtc: FakeCrtc) -> Self {
        self.state().crtcs.push(crtc);
        self
    }

    pub fn with_output(self, output: FakeOutput) -> Self {
        self.state().outputs.push(output);
        self
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn seen(&self, id: XID) {
        self.state().seen.push(id);
    }

    /// Simulate a mode change between two queries.
    pub fn set_crtc_geometry(&self, id: RRCrtc, x: c_int, y: c_int, width: c_uint, height: c_uint) {
        if let Some(crtc) = self.state().crtcs.iter_mut().find(|c| c.id == id) {
            crtc.x = x;
            crtc.y = y;
            crtc.width = width;
            crtc.height = height;
        }
    }

    /// Every identifier passed to the provider so far, in call order.
    pub fn seen_ids(&self) -> Vec<XID> {
        self.state().seen.clone()
    }

    pub fn set_config_calls(&self) -> Vec<SetCrtcConfigCall> {
        self.state().set_config_calls.clone()
    }

    pub fn primary(&self) -> Option<RROutput> {
        self.state().primary
    }

    /// Modes added to outputs and not deleted since.
    pub fn output_modes(&self) -> Vec<(RROutput, RRMode)> {
        self.state().output_modes.clone()
    }

    /// Output properties changed and not deleted since.
    pub fn properties(&self) -> Vec<(RROutput, Atom)> {
        self.state().properties.clone()
    }

    /// Records handed out and not yet freed.
    pub fn live_records(&self) -> isize {
        self.live.load(Ordering::SeqCst)
    }

    fn make_resources(&self) -> *mut XRRScreenResources {
        let state = self.state();
        let mut crtcs: Vec<RRCrtc> = state.crtcs.iter().map(|c| c.id).collect();
        let mut outputs: Vec<RROutput> = state.outputs.iter().map(|o| o.id).collect();
        let record = XRRScreenResources {
            timestamp: 0,
            configTimestamp: 0,
            ncrtc: crtcs.len() as c_int,
            crtcs: crtcs.as_mut_ptr(),
            noutput: outputs.len() as c_int,
            outputs: outputs.as_mut_ptr(),
            nmode: 0,
            modes: ptr::null_mut(),
        };
        self.live.fetch_add(1, Ordering::SeqCst);
        Box::into_raw(Box::new(ResourcesBlock {
            record,
            crtcs,
            outputs,
        })) as *mut XRRScreenResources
    }

    /// # Safety
    ///
    /// `resources` must come from this provider and not have been freed.
    pub unsafe fn free_screen_resources(&self, resources: *mut XRRScreenResources) {
        if resources.is_null() {
            return;
        }
        drop(Box::from_raw(resources as *mut ResourcesBlock));
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

impl RandrProvider for FakeRandr {
    unsafe fn screen_resources(
        &self,
        _dpy: *mut Display,
        _window: Window,
    ) -> *mut XRRScreenResources {
        self.make_resources()
    }

    unsafe fn screen_resources_current(
        &self,
        _dpy: *mut Display,
        _window: Window,
    ) -> *mut XRRScreenResources {
        self.make_resources()
    }

    unsafe fn output_info(
        &self,
        _dpy: *mut Display,
        _resources: *mut XRRScreenResources,
        output: RROutput,
    ) -> *mut XRROutputInfo {
        self.seen(output);
        let Some(found) = self.state().outputs.iter().find(|o| o.id == output).cloned() else {
            return ptr::null_mut();
        };

        let mut name: Vec<c_char> = found.name.bytes().map(|b| b as c_char).collect();
        let name_len = name.len() as c_int;
        name.push(0);
        let mut crtcs = found.crtcs;
        let record = XRROutputInfo {
            timestamp: 0,
            crtc: found.crtc,
            name: name.as_mut_ptr(),
            nameLen: name_len,
            mm_width: found.mm_width,
            mm_height: found.mm_height,
            connection: 0,
            subpixel_order: 0,
            ncrtc: crtcs.len() as c_int,
            crtcs: crtcs.as_mut_ptr(),
            nclone: 0,
            clones: ptr::null_mut(),
            nmode: 0,
            npreferred: 0,
            modes: ptr::null_mut(),
        };
        self.live.fetch_add(1, Ordering::SeqCst);
        Box::into_raw(Box::new(OutputBlock {
            record,
            name,
            crtcs,
        })) as *mut XRROutputInfo
    }

    unsafe fn crtc_info(
        &self,
        _dpy: *mut Display,
        _resources: *mut XRRScreenResources,
        crtc: RRCrtc,
    ) -> *mut XRRCrtcInfo {
        self.seen(crtc);
        let Some(found) = self.state().crtcs.iter().find(|c| c.id == crtc).cloned() else {
            return ptr::null_mut();
        };

        let mut outputs = found.outputs;
        let mut possible = outputs.clone();
        let record = XRRCrtcInfo {
            timestamp: 0,
            x: found.x,
            y: found.y,
            width: found.width,
            height: found.height,
            mode: 0,
            rotation: ROTATE_0,
            noutput: outputs.len() as c_int,
            outputs: outputs.as_mut_ptr(),
            rotations: ROTATE_0,
            npossible: possible.len() as c_int,
            possible: possible.as_mut_ptr(),
        };
        self.live.fetch_add(1, Ordering::SeqCst);
        Box::into_raw(Box::new(CrtcBlock {
            record,
            outputs,
            possible,
        })) as *mut XRRCrtcInfo
    }

    unsafe fn set_crtc_config(
        &self,
        _dpy: *mut Display,
        _resources: *mut XRRScreenResources,
        crtc: RRCrtc,
        _timestamp: Time,
        x: c_int,
        y: c_int,
        mode: RRMode,
        rotation: Rotation,
        outputs: *mut RROutput,
        noutputs: c_int,
    ) -> c_int {
        let outputs = id_list(outputs, noutputs);
        let mut state = self.state();
        state.seen.push(crtc);
        state.seen.extend_from_slice(&outputs);
        state.set_config_calls.push(SetCrtcConfigCall {
            crtc,
            x,
            y,
            mode,
            rotation,
            outputs,
        });
        SET_CONFIG_SUCCESS
    }

    unsafe fn free_output_info(&self, info: *mut XRROutputInfo) {
        if info.is_null() {
            return;
        }
        drop(Box::from_raw(info as *mut OutputBlock));
        self.live.fetch_sub(1, Ordering::SeqCst);
    }

    unsafe fn free_crtc_info(&self, info: *mut XRRCrtcInfo) {
        if info.is_null() {
            return;
        }
        drop(Box::from_raw(info as *mut CrtcBlock));
        self.live.fetch_sub(1, Ordering::SeqCst);
    }

    unsafe fn crtc_gamma_size(&self, _dpy: *mut Display, crtc: RRCrtc) -> c_int {
        self.seen(crtc);
        if self.state().crtcs.iter().any(|c| c.id == crtc) {
            256
        } else {
            0
        }
    }

    /// Gamma ramps are not modelled.
    unsafe fn crtc_gamma(&self, _dpy: *mut Display, crtc: RRCrtc) -> *mut XRRCrtcGamma {
        self.seen(crtc);
        ptr::null_mut()
    }

    /// Panning is not modelled.
    unsafe fn panning(
        &self,
        _dpy: *mut Display,
        _resources: *mut XRRScreenResources,
        crtc: RRCrtc,
    ) -> *mut XRRPanning {
        self.seen(crtc);
        ptr::null_mut()
    }

    unsafe fn list_output_properties(
        &self,
        _dpy: *mut Display,
        output: RROutput,
        nprop: *mut c_int,
    ) -> *mut Atom {
        self.seen(output);
        if !nprop.is_null() {
            *nprop = 0;
        }
        ptr::null_mut()
    }

    unsafe fn output_property(
        &self,
        _dpy: *mut Display,
        output: RROutput,
        _property: Atom,
        _offset: c_long,
        _length: c_long,
        _delete: Bool,
        _pending: Bool,
        _req_type: Atom,
        actual_type: *mut Atom,
        actual_format: *mut c_int,
        nitems: *mut c_ulong,
        bytes_after: *mut c_ulong,
        prop: *mut *mut c_uchar,
    ) -> c_int {
        self.seen(output);
        if !actual_type.is_null() {
            *actual_type = 0;
        }
        if !actual_format.is_null() {
            *actual_format = 0;
        }
        if !nitems.is_null() {
            *nitems = 0;
        }
        if !bytes_after.is_null() {
            *bytes_after = 0;
        }
        if !prop.is_null() {
            *prop = ptr::null_mut();
        }
        0
    }

    unsafe fn set_output_primary(&self, _dpy: *mut Display, _window: Window, output: RROutput) {
        let mut state = self.state();
        state.seen.push(output);
        state.primary = Some(output);
    }

    unsafe fn set_crtc_gamma(&self, _dpy: *mut Display, crtc: RRCrtc, _gamma: *mut XRRCrtcGamma) {
        self.seen(crtc);
    }

    /// Transforms are not modelled: reports failure with no attributes.
    unsafe fn crtc_transform(
        &self,
        _dpy: *mut Display,
        crtc: RRCrtc,
        attributes: *mut *mut XRRCrtcTransformAttributes,
    ) -> Status {
        self.seen(crtc);
        if !attributes.is_null() {
            *attributes = ptr::null_mut();
        }
        0
    }

    unsafe fn set_crtc_transform(
        &self,
        _dpy: *mut Display,
        crtc: RRCrtc,
        _transform: *mut XTransform,
        _filter: *const c_char,
        _params: *mut XFixed,
        _nparams: c_int,
    ) {
        self.seen(crtc);
    }

    unsafe fn set_panning(
        &self,
        _dpy: *mut Display,
        _resources: *mut XRRScreenResources,
        crtc: RRCrtc,
        _panning: *mut XRRPanning,
    ) -> Status {
        self.seen(crtc);
        SET_CONFIG_SUCCESS
    }

    unsafe fn query_output_property(
        &self,
        _dpy: *mut Display,
        output: RROutput,
        _property: Atom,
    ) -> *mut XRRPropertyInfo {
        self.seen(output);
        ptr::null_mut()
    }

    unsafe fn configure_output_property(
        &self,
        _dpy: *mut Display,
        output: RROutput,
        _property: Atom,
        _pending: Bool,
        _range: Bool,
        _num_values: c_int,
        _values: *mut c_long,
    ) {
        self.seen(output);
    }

    unsafe fn change_output_property(
        &self,
        _dpy: *mut Display,
        output: RROutput,
        property: Atom,
        _type: Atom,
        _format: c_int,
        _mode: c_int,
        _data: *const c_uchar,
        _nelements: c_int,
    ) {
        let mut state = self.state();
        state.seen.push(output);
        if !state.properties.contains(&(output, property)) {
            state.properties.push((output, property));
        }
    }

    unsafe fn delete_output_property(&self, _dpy: *mut Display, output: RROutput, property: Atom) {
        let mut state = self.state();
        state.seen.push(output);
        state.properties.retain(|&entry| entry != (output, property));
    }

    unsafe fn add_output_mode(&self, _dpy: *mut Display, output: RROutput, mode: RRMode) {
        let mut state = self.state();
        state.seen.push(output);
        state.output_modes.push((output, mode));
    }

    unsafe fn delete_output_mode(&self, _dpy: *mut Display, output: RROutput, mode: RRMode) {
        let mut state = self.state();
        state.seen.push(output);
        state.output_modes.retain(|&entry| entry != (output, mode));
    }
}

/// Copy a C id array into a `Vec`. Null or non-positive counts read as empty.
///
/// # Safety
///
/// `list` must be null or valid for reads of `count` ids.
pub unsafe fn id_list(list: *const XID, count: c_int) -> Vec<XID> {
    if list.is_null() || count <= 0 {
        return Vec::new();
    }
    std::slice::from_raw_parts(list, count as usize).to_vec()
}

/// # Safety
///
/// `resources` must be a valid, live record.
pub unsafe fn crtc_list(resources: *const XRRScreenResources) -> Vec<RRCrtc> {
    id_list((*resources).crtcs, (*resources).ncrtc)
}

/// # Safety
///
/// `resources` must be a valid, live record.
pub unsafe fn output_list(resources: *const XRRScreenResources) -> Vec<RROutput> {
    id_list((*resources).outputs, (*resources).noutput)
}

/// # Safety
///
/// `info` must be a valid, live record.
pub unsafe fn output_name(info: *const XRROutputInfo) -> String {
    let info = &*info;
    if info.name.is_null() || info.nameLen <= 0 {
        return String::new();
    }
    let bytes = std::slice::from_raw_parts(info.name as *const u8, info.nameLen as usize);
    String::from_utf8_lossy(bytes).into_owned()
}
