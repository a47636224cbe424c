// src/provider.rs
//! The underlying display-configuration library, as seen by the split layer.
//!
//! Every method mirrors one libXrandr entry point and must only ever be given real
//! (untagged) identifiers. Returned records follow libXrandr ownership: the caller
//! releases them with the matching free call.

use std::os::raw::{c_char, c_int, c_long, c_uchar, c_ulong};
use x11::xlib::{Atom, Bool, Display, Status, Time, Window};
use x11::xrandr::{
    RRCrtc, RRMode, RROutput, Rotation, XRRCrtcGamma, XRRCrtcInfo, XRRCrtcTransformAttributes,
    XRROutputInfo, XRRPanning, XRRPropertyInfo, XRRScreenResources,
};
use x11::xrender::{XFixed, XTransform};

/// `RRSetConfigSuccess` from randr.h.
pub const SET_CONFIG_SUCCESS: c_int = 0;
/// `RRSetConfigFailed` from randr.h.
pub const SET_CONFIG_FAILED: c_int = 3;

/// # Safety
///
/// Pointer arguments are passed straight to (or mimic) libXrandr. Callers uphold the
/// libXrandr contract: `dpy` is an open display, `resources` came from this provider or
/// is null, and out-pointers are valid for writes.
#[allow(clippy::too_many_arguments)]
pub trait RandrProvider: Send + Sync {
    unsafe fn screen_resources(&self, dpy: *mut Display, window: Window)
        -> *mut XRRScreenResources;

    unsafe fn screen_resources_current(
        &self,
        dpy: *mut Display,
        window: Window,
    ) -> *mut XRRScreenResources;

    unsafe fn output_info(
        &self,
        dpy: *mut Display,
        resources: *mut XRRScreenResources,
        output: RROutput,
    ) -> *mut XRROutputInfo;

    unsafe fn crtc_info(
        &self,
        dpy: *mut Display,
        resources: *mut XRRScreenResources,
        crtc: RRCrtc,
    ) -> *mut XRRCrtcInfo;

    unsafe fn set_crtc_config(
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
    ) -> c_int;

    unsafe fn free_output_info(&self, info: *mut XRROutputInfo);

    unsafe fn free_crtc_info(&self, info: *mut XRRCrtcInfo);

    unsafe fn crtc_gamma_size(&self, dpy: *mut Display, crtc: RRCrtc) -> c_int;

    unsafe fn crtc_gamma(&self, dpy: *mut Display, crtc: RRCrtc) -> *mut XRRCrtcGamma;

    unsafe fn panning(
        &self,
        dpy: *mut Display,
        resources: *mut XRRScreenResources,
        crtc: RRCrtc,
    ) -> *mut XRRPanning;

    unsafe fn list_output_properties(
        &self,
        dpy: *mut Display,
        output: RROutput,
        nprop: *mut c_int,
    ) -> *mut Atom;

    unsafe fn output_property(
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
    ) -> c_int;

    unsafe fn set_output_primary(&self, dpy: *mut Display, window: Window, output: RROutput);

    unsafe fn set_crtc_gamma(&self, dpy: *mut Display, crtc: RRCrtc, gamma: *mut XRRCrtcGamma);

    unsafe fn crtc_transform(
        &self,
        dpy: *mut Display,
        crtc: RRCrtc,
        attributes: *mut *mut XRRCrtcTransformAttributes,
    ) -> Status;

    unsafe fn set_crtc_transform(
        &self,
        dpy: *mut Display,
        crtc: RRCrtc,
        transform: *mut XTransform,
        filter: *const c_char,
        params: *mut XFixed,
        nparams: c_int,
    );

    unsafe fn set_panning(
        &self,
        dpy: *mut Display,
        resources: *mut XRRScreenResources,
        crtc: RRCrtc,
        panning: *mut XRRPanning,
    ) -> Status;

    unsafe fn query_output_property(
        &self,
        dpy: *mut Display,
        output: RROutput,
        property: Atom,
    ) -> *mut XRRPropertyInfo;

    unsafe fn configure_output_property(
        &self,
        dpy: *mut Display,
        output: RROutput,
        property: Atom,
        pending: Bool,
        range: Bool,
        num_values: c_int,
        values: *mut c_long,
    );

    unsafe fn change_output_property(
        &self,
        dpy: *mut Display,
        output: RROutput,
        property: Atom,
        type_: Atom,
        format: c_int,
        mode: c_int,
        data: *const c_uchar,
        nelements: c_int,
    );

    unsafe fn delete_output_property(&self, dpy: *mut Display, output: RROutput, property: Atom);

    unsafe fn add_output_mode(&self, dpy: *mut Display, output: RROutput, mode: RRMode);

    unsafe fn delete_output_mode(&self, dpy: *mut Display, output: RROutput, mode: RRMode);
}
