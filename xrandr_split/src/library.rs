// src/library.rs
//! The real libXrandr, resolved at runtime.
//!
//! Symbols are looked up on the handle returned by `dlopen`, never through
//! `RTLD_DEFAULT`: the default scope resolves `XRRGetCrtcInfo` and friends back into
//! this shim.

use crate::error::{Result, SplitError};
use crate::provider::RandrProvider;
use libc::{c_void, dlerror, dlopen, dlsym, RTLD_GLOBAL, RTLD_LAZY};
use log::info;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int, c_long, c_uchar, c_ulong};
use x11::xlib::{Atom, Bool, Display, Status, Time, Window};
use x11::xrandr::{
    RRCrtc, RRMode, RROutput, Rotation, XRRCrtcGamma, XRRCrtcInfo, XRRCrtcTransformAttributes,
    XRROutputInfo, XRRPanning, XRRPropertyInfo, XRRScreenResources,
};
use x11::xrender::{XFixed, XTransform};

type GetScreenResourcesFn = unsafe extern "C" fn(*mut Display, Window) -> *mut XRRScreenResources;
type GetOutputInfoFn =
    unsafe extern "C" fn(*mut Display, *mut XRRScreenResources, RROutput) -> *mut XRROutputInfo;
type GetCrtcInfoFn =
    unsafe extern "C" fn(*mut Display, *mut XRRScreenResources, RRCrtc) -> *mut XRRCrtcInfo;
type SetCrtcConfigFn = unsafe extern "C" fn(
    *mut Display,
    *mut XRRScreenResources,
    RRCrtc,
    Time,
    c_int,
    c_int,
    RRMode,
    Rotation,
    *mut RROutput,
    c_int,
) -> c_int;
type FreeOutputInfoFn = unsafe extern "C" fn(*mut XRROutputInfo);
type FreeCrtcInfoFn = unsafe extern "C" fn(*mut XRRCrtcInfo);
type GetCrtcGammaSizeFn = unsafe extern "C" fn(*mut Display, RRCrtc) -> c_int;
type GetCrtcGammaFn = unsafe extern "C" fn(*mut Display, RRCrtc) -> *mut XRRCrtcGamma;
type GetPanningFn =
    unsafe extern "C" fn(*mut Display, *mut XRRScreenResources, RRCrtc) -> *mut XRRPanning;
type ListOutputPropertiesFn = unsafe extern "C" fn(*mut Display, RROutput, *mut c_int) -> *mut Atom;
type GetOutputPropertyFn = unsafe extern "C" fn(
    *mut Display,
    RROutput,
    Atom,
    c_long,
    c_long,
    Bool,
    Bool,
    Atom,
    *mut Atom,
    *mut c_int,
    *mut c_ulong,
    *mut c_ulong,
    *mut *mut c_uchar,
) -> c_int;
type SetOutputPrimaryFn = unsafe extern "C" fn(*mut Display, Window, RROutput);
type SetCrtcGammaFn = unsafe extern "C" fn(*mut Display, RRCrtc, *mut XRRCrtcGamma);
type GetCrtcTransformFn =
    unsafe extern "C" fn(*mut Display, RRCrtc, *mut *mut XRRCrtcTransformAttributes) -> Status;
type SetCrtcTransformFn =
    unsafe extern "C" fn(*mut Display, RRCrtc, *mut XTransform, *const c_char, *mut XFixed, c_int);
type SetPanningFn =
    unsafe extern "C" fn(*mut Display, *mut XRRScreenResources, RRCrtc, *mut XRRPanning) -> Status;
type QueryOutputPropertyFn =
    unsafe extern "C" fn(*mut Display, RROutput, Atom) -> *mut XRRPropertyInfo;
type ConfigureOutputPropertyFn =
    unsafe extern "C" fn(*mut Display, RROutput, Atom, Bool, Bool, c_int, *mut c_long);
type ChangeOutputPropertyFn = unsafe extern "C" fn(
    *mut Display,
    RROutput,
    Atom,
    Atom,
    c_int,
    c_int,
    *const c_uchar,
    c_int,
);
type DeleteOutputPropertyFn = unsafe extern "C" fn(*mut Display, RROutput, Atom);
// XRRAddOutputMode / XRRDeleteOutputMode
type OutputModeFn = unsafe extern "C" fn(*mut Display, RROutput, RRMode);

pub struct XrandrLibrary {
    path: String,
    get_screen_resources: GetScreenResourcesFn,
    get_screen_resources_current: GetScreenResourcesFn,
    get_output_info: GetOutputInfoFn,
    get_crtc_info: GetCrtcInfoFn,
    set_crtc_config: SetCrtcConfigFn,
    free_output_info: FreeOutputInfoFn,
    free_crtc_info: FreeCrtcInfoFn,
    get_crtc_gamma_size: GetCrtcGammaSizeFn,
    get_crtc_gamma: GetCrtcGammaFn,
    get_panning: GetPanningFn,
    list_output_properties: ListOutputPropertiesFn,
    get_output_property: GetOutputPropertyFn,
    set_output_primary: SetOutputPrimaryFn,
    set_crtc_gamma: SetCrtcGammaFn,
    get_crtc_transform: GetCrtcTransformFn,
    set_crtc_transform: SetCrtcTransformFn,
    set_panning: SetPanningFn,
    query_output_property: QueryOutputPropertyFn,
    configure_output_property: ConfigureOutputPropertyFn,
    change_output_property: ChangeOutputPropertyFn,
    delete_output_property: DeleteOutputPropertyFn,
    add_output_mode: OutputModeFn,
    delete_output_mode: OutputModeFn,
}

impl XrandrLibrary {
    /// `dlopen` the real library and resolve every entry point the shim forwards to.
    /// The handle is never closed: the library stays mapped for the life of the process.
    pub fn open(path: &str) -> Result<Self> {
        let c_path = CString::new(path)
            .map_err(|_| SplitError::library_load(path, "path contains a NUL byte"))?;
        let handle = unsafe { dlopen(c_path.as_ptr(), RTLD_LAZY | RTLD_GLOBAL) };
        if handle.is_null() {
            return Err(SplitError::library_load(path, last_dl_error()));
        }

        let library = unsafe {
            Self {
                path: path.to_string(),
                get_screen_resources: symbol(handle, "XRRGetScreenResources")?,
                get_screen_resources_current: symbol(handle, "XRRGetScreenResourcesCurrent")?,
                get_output_info: symbol(handle, "XRRGetOutputInfo")?,
                get_crtc_info: symbol(handle, "XRRGetCrtcInfo")?,
                set_crtc_config: symbol(handle, "XRRSetCrtcConfig")?,
                free_output_info: symbol(handle, "XRRFreeOutputInfo")?,
                free_crtc_info: symbol(handle, "XRRFreeCrtcInfo")?,
                get_crtc_gamma_size: symbol(handle, "XRRGetCrtcGammaSize")?,
                get_crtc_gamma: symbol(handle, "XRRGetCrtcGamma")?,
                get_panning: symbol(handle, "XRRGetPanning")?,
                list_output_properties: symbol(handle, "XRRListOutputProperties")?,
                get_output_property: symbol(handle, "XRRGetOutputProperty")?,
                set_output_primary: symbol(handle, "XRRSetOutputPrimary")?,
                set_crtc_gamma: symbol(handle, "XRRSetCrtcGamma")?,
                get_crtc_transform: symbol(handle, "XRRGetCrtcTransform")?,
                set_crtc_transform: symbol(handle, "XRRSetCrtcTransform")?,
                set_panning: symbol(handle, "XRRSetPanning")?,
                query_output_property: symbol(handle, "XRRQueryOutputProperty")?,
                configure_output_property: symbol(handle, "XRRConfigureOutputProperty")?,
                change_output_property: symbol(handle, "XRRChangeOutputProperty")?,
                delete_output_property: symbol(handle, "XRRDeleteOutputProperty")?,
                add_output_mode: symbol(handle, "XRRAddOutputMode")?,
                delete_output_mode: symbol(handle, "XRRDeleteOutputMode")?,
            }
        };
        info!("[library] resolved real Xrandr from {}", path);
        Ok(library)
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Resolve `name` on `handle` as a function pointer of type `F`.
///
/// # Safety
///
/// `F` must be an `extern "C"` function pointer type matching the symbol's C signature.
unsafe fn symbol<F: Copy>(handle: *mut c_void, name: &'static str) -> Result<F> {
    let c_name = CString::new(name).map_err(|_| SplitError::MissingSymbol { name })?;
    let ptr = dlsym(handle, c_name.as_ptr());
    if ptr.is_null() {
        return Err(SplitError::MissingSymbol { name });
    }
    debug_assert_eq!(std::mem::size_of::<F>(), std::mem::size_of::<*mut c_void>());
    Ok(std::mem::transmute_copy::<*mut c_void, F>(&ptr))
}

fn last_dl_error() -> String {
    let err = unsafe { dlerror() };
    if err.is_null() {
        "unknown dlopen error".to_string()
    } else {
        unsafe { CStr::from_ptr(err) }.to_string_lossy().into_owned()
    }
}

impl RandrProvider for XrandrLibrary {
    unsafe fn screen_resources(
        &self,
        dpy: *mut Display,
        window: Window,
    ) -> *mut XRRScreenResources {
        (self.get_screen_resources)(dpy, window)
    }

    unsafe fn screen_resources_current(
        &self,
        dpy: *mut Display,
        window: Window,
    ) -> *mut XRRScreenResources {
        (self.get_screen_resources_current)(dpy, window)
    }

    unsafe fn output_info(
        &self,
        dpy: *mut Display,
        resources: *mut XRRScreenResources,
        output: RROutput,
    ) -> *mut XRROutputInfo {
        (self.get_output_info)(dpy, resources, output)
    }

    unsafe fn crtc_info(
        &self,
        dpy: *mut Display,
        resources: *mut XRRScreenResources,
        crtc: RRCrtc,
    ) -> *mut XRRCrtcInfo {
        (self.get_crtc_info)(dpy, resources, crtc)
    }

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
    ) -> c_int {
        (self.set_crtc_config)(
            dpy, resources, crtc, timestamp, x, y, mode, rotation, outputs, noutputs,
        )
    }

    unsafe fn free_output_info(&self, info: *mut XRROutputInfo) {
        (self.free_output_info)(info)
    }

    unsafe fn free_crtc_info(&self, info: *mut XRRCrtcInfo) {
        (self.free_crtc_info)(info)
    }

    unsafe fn crtc_gamma_size(&self, dpy: *mut Display, crtc: RRCrtc) -> c_int {
        (self.get_crtc_gamma_size)(dpy, crtc)
    }

    unsafe fn crtc_gamma(&self, dpy: *mut Display, crtc: RRCrtc) -> *mut XRRCrtcGamma {
        (self.get_crtc_gamma)(dpy, crtc)
    }

    unsafe fn panning(
        &self,
        dpy: *mut Display,
        resources: *mut XRRScreenResources,
        crtc: RRCrtc,
    ) -> *mut XRRPanning {
        (self.get_panning)(dpy, resources, crtc)
    }

    unsafe fn list_output_properties(
        &self,
        dpy: *mut Display,
        output: RROutput,
        nprop: *mut c_int,
    ) -> *mut Atom {
        (self.list_output_properties)(dpy, output, nprop)
    }

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
    ) -> c_int {
        (self.get_output_property)(
            dpy,
            output,
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

    unsafe fn set_output_primary(&self, dpy: *mut Display, window: Window, output: RROutput) {
        (self.set_output_primary)(dpy, window, output)
    }

    unsafe fn set_crtc_gamma(&self, dpy: *mut Display, crtc: RRCrtc, gamma: *mut XRRCrtcGamma) {
        (self.set_crtc_gamma)(dpy, crtc, gamma)
    }

    unsafe fn crtc_transform(
        &self,
        dpy: *mut Display,
        crtc: RRCrtc,
        attributes: *mut *mut XRRCrtcTransformAttributes,
    ) -> Status {
        (self.get_crtc_transform)(dpy, crtc, attributes)
    }

    unsafe fn set_crtc_transform(
        &self,
        dpy: *mut Display,
        crtc: RRCrtc,
        transform: *mut XTransform,
        filter: *const c_char,
        params: *mut XFixed,
        nparams: c_int,
    ) {
        (self.set_crtc_transform)(dpy, crtc, transform, filter, params, nparams)
    }

    unsafe fn set_panning(
        &self,
        dpy: *mut Display,
        resources: *mut XRRScreenResources,
        crtc: RRCrtc,
        panning: *mut XRRPanning,
    ) -> Status {
        (self.set_panning)(dpy, resources, crtc, panning)
    }

    unsafe fn query_output_property(
        &self,
        dpy: *mut Display,
        output: RROutput,
        property: Atom,
    ) -> *mut XRRPropertyInfo {
        (self.query_output_property)(dpy, output, property)
    }

    unsafe fn configure_output_property(
        &self,
        dpy: *mut Display,
        output: RROutput,
        property: Atom,
        pending: Bool,
        range: Bool,
        num_values: c_int,
        values: *mut c_long,
    ) {
        (self.configure_output_property)(dpy, output, property, pending, range, num_values, values)
    }

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
    ) {
        (self.change_output_property)(dpy, output, property, type_, format, mode, data, nelements)
    }

    unsafe fn delete_output_property(&self, dpy: *mut Display, output: RROutput, property: Atom) {
        (self.delete_output_property)(dpy, output, property)
    }

    unsafe fn add_output_mode(&self, dpy: *mut Display, output: RROutput, mode: RRMode) {
        (self.add_output_mode)(dpy, output, mode)
    }

    unsafe fn delete_output_mode(&self, dpy: *mut Display, output: RROutput, mode: RRMode) {
        (self.delete_output_mode)(dpy, output, mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_library_is_load_error() {
        match XrandrLibrary::open("/nonexistent/libXrandr-missing.so") {
            Err(SplitError::LibraryLoad { path, reason }) => {
                assert_eq!(path, "/nonexistent/libXrandr-missing.so");
                assert!(!reason.is_empty());
            }
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("loaded a library that does not exist"),
        }
    }

    #[test]
    fn test_nul_in_path_is_rejected() {
        assert!(matches!(
            XrandrLibrary::open("libX\0randr.so"),
            Err(SplitError::LibraryLoad { .. })
        ));
    }
}
