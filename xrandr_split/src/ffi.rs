// src/ffi.rs
//! Exported drop-ins for the libXrandr entry points the shim rewrites.
//!
//! Preload the cdylib (`LD_PRELOAD=libxrandr_split.so`) and these definitions take
//! precedence over the real library's. Everything not exported here resolves to the
//! real library as usual.
#![allow(non_snake_case)]
#![allow(clippy::missing_safety_doc)]
#![allow(clippy::too_many_arguments)]

use crate::config::SplitConfig;
use crate::layer::SplitLayer;
use crate::library::XrandrLibrary;
use crate::logging;
use crate::provider::SET_CONFIG_FAILED;
use log::{error, info, warn};
use once_cell::sync::OnceCell;
use std::os::raw::{c_char, c_int, c_long, c_uchar, c_ulong};
use std::ptr;
use x11::xlib::{Atom, Bool, Display, Status, Time, Window};
use x11::xrandr::{
    RRCrtc, RRMode, RROutput, Rotation, XRRCrtcGamma, XRRCrtcInfo, XRRCrtcTransformAttributes,
    XRROutputInfo, XRRPanning, XRRPropertyInfo, XRRScreenResources,
};
use x11::xrender::{XFixed, XTransform};

/// `BadImplementation`: what an Xlib request returns when there is nothing to ask.
pub const BAD_IMPLEMENTATION: c_int = 17;

static LAYER: OnceCell<Option<SplitLayer<XrandrLibrary>>> = OnceCell::new();

/// The process-wide layer, built on first use. `None` when the real library could
/// not be loaded; every export then degrades to a failure return.
fn layer() -> Option<&'static SplitLayer<XrandrLibrary>> {
    LAYER.get_or_init(init_layer).as_ref()
}

fn init_layer() -> Option<SplitLayer<XrandrLibrary>> {
    let (config, config_error) = match SplitConfig::load() {
        Ok(config) => (config, None),
        Err(e) => (SplitConfig::default(), Some(e)),
    };
    if let Err(e) = logging::init(&config.logging) {
        eprintln!("xrandr_split: {}", e);
    }
    if let Some(e) = config_error {
        warn!("[init] bad configuration, using defaults: {}", e);
    }

    match XrandrLibrary::open(&config.real_library) {
        Ok(library) => {
            info!(
                "[init] splitting {}x{} via {}, tag {:#x}",
                config.signature.width,
                config.signature.height,
                library.path(),
                config.tag
            );
            Some(SplitLayer::new(library, &config))
        }
        Err(e) => {
            error!("[init] {}", e);
            None
        }
    }
}

#[no_mangle]
pub unsafe extern "C" fn XRRGetScreenResources(
    dpy: *mut Display,
    window: Window,
) -> *mut XRRScreenResources {
    match layer() {
        Some(layer) => layer.get_screen_resources(dpy, window),
        None => ptr::null_mut(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn XRRGetScreenResourcesCurrent(
    dpy: *mut Display,
    window: Window,
) -> *mut XRRScreenResources {
    match layer() {
        Some(layer) => layer.get_screen_resources_current(dpy, window),
        None => ptr::null_mut(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn XRRGetOutputInfo(
    dpy: *mut Display,
    resources: *mut XRRScreenResources,
    output: RROutput,
) -> *mut XRROutputInfo {
    match layer() {
        Some(layer) => layer.get_output_info(dpy, resources, output),
        None => ptr::null_mut(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn XRRGetCrtcInfo(
    dpy: *mut Display,
    resources: *mut XRRScreenResources,
    crtc: RRCrtc,
) -> *mut XRRCrtcInfo {
    match layer() {
        Some(layer) => layer.get_crtc_info(dpy, resources, crtc),
        None => ptr::null_mut(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn XRRSetCrtcConfig(
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
    match layer() {
        Some(layer) => layer.set_crtc_config(
            dpy, resources, crtc, timestamp, x, y, mode, rotation, outputs, noutputs,
        ),
        None => SET_CONFIG_FAILED,
    }
}

#[no_mangle]
pub unsafe extern "C" fn XRRGetCrtcGammaSize(dpy: *mut Display, crtc: RRCrtc) -> c_int {
    match layer() {
        Some(layer) => layer.get_crtc_gamma_size(dpy, crtc),
        None => 0,
    }
}

#[no_mangle]
pub unsafe extern "C" fn XRRGetCrtcGamma(dpy: *mut Display, crtc: RRCrtc) -> *mut XRRCrtcGamma {
    match layer() {
        Some(layer) => layer.get_crtc_gamma(dpy, crtc),
        None => ptr::null_mut(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn XRRGetPanning(
    dpy: *mut Display,
    resources: *mut XRRScreenResources,
    crtc: RRCrtc,
) -> *mut XRRPanning {
    match layer() {
        Some(layer) => layer.get_panning(dpy, resources, crtc),
        None => ptr::null_mut(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn XRRListOutputProperties(
    dpy: *mut Display,
    output: RROutput,
    nprop: *mut c_int,
) -> *mut Atom {
    match layer() {
        Some(layer) => layer.list_output_properties(dpy, output, nprop),
        None => {
            if !nprop.is_null() {
                *nprop = 0;
            }
            ptr::null_mut()
        }
    }
}

#[no_mangle]
pub unsafe extern "C" fn XRRGetOutputProperty(
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
    match layer() {
        Some(layer) => layer.get_output_property(
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
        ),
        None => BAD_IMPLEMENTATION,
    }
}

#[no_mangle]
pub unsafe extern "C" fn XRRSetOutputPrimary(dpy: *mut Display, window: Window, output: RROutput) {
    if let Some(layer) = layer() {
        layer.set_output_primary(dpy, window, output);
    }
}

#[no_mangle]
pub unsafe extern "C" fn XRRSetCrtcGamma(
    dpy: *mut Display,
    crtc: RRCrtc,
    gamma: *mut XRRCrtcGamma,
) {
    if let Some(layer) = layer() {
        layer.set_crtc_gamma(dpy, crtc, gamma);
    }
}

#[no_mangle]
pub unsafe extern "C" fn XRRGetCrtcTransform(
    dpy: *mut Display,
    crtc: RRCrtc,
    attributes: *mut *mut XRRCrtcTransformAttributes,
) -> Status {
    match layer() {
        Some(layer) => layer.get_crtc_transform(dpy, crtc, attributes),
        None => {
            if !attributes.is_null() {
                *attributes = ptr::null_mut();
            }
            0
        }
    }
}

#[no_mangle]
pub unsafe extern "C" fn XRRSetCrtcTransform(
    dpy: *mut Display,
    crtc: RRCrtc,
    transform: *mut XTransform,
    filter: *const c_char,
    params: *mut XFixed,
    nparams: c_int,
) {
    if let Some(layer) = layer() {
        layer.set_crtc_transform(dpy, crtc, transform, filter, params, nparams);
    }
}

#[no_mangle]
pub unsafe extern "C" fn XRRSetPanning(
    dpy: *mut Display,
    resources: *mut XRRScreenResources,
    crtc: RRCrtc,
    panning: *mut XRRPanning,
) -> Status {
    match layer() {
        Some(layer) => layer.set_panning(dpy, resources, crtc, panning),
        None => SET_CONFIG_FAILED,
    }
}

#[no_mangle]
pub unsafe extern "C" fn XRRQueryOutputProperty(
    dpy: *mut Display,
    output: RROutput,
    property: Atom,
) -> *mut XRRPropertyInfo {
    match layer() {
        Some(layer) => layer.query_output_property(dpy, output, property),
        None => ptr::null_mut(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn XRRConfigureOutputProperty(
    dpy: *mut Display,
    output: RROutput,
    property: Atom,
    pending: Bool,
    range: Bool,
    num_values: c_int,
    values: *mut c_long,
) {
    if let Some(layer) = layer() {
        layer.configure_output_property(dpy, output, property, pending, range, num_values, values);
    }
}

#[no_mangle]
pub unsafe extern "C" fn XRRChangeOutputProperty(
    dpy: *mut Display,
    output: RROutput,
    property: Atom,
    type_: Atom,
    format: c_int,
    mode: c_int,
    data: *const c_uchar,
    nelements: c_int,
) {
    if let Some(layer) = layer() {
        layer.change_output_property(dpy, output, property, type_, format, mode, data, nelements);
    }
}

#[no_mangle]
pub unsafe extern "C" fn XRRDeleteOutputProperty(
    dpy: *mut Display,
    output: RROutput,
    property: Atom,
) {
    if let Some(layer) = layer() {
        layer.delete_output_property(dpy, output, property);
    }
}

#[no_mangle]
pub unsafe extern "C" fn XRRAddOutputMode(dpy: *mut Display, output: RROutput, mode: RRMode) {
    if let Some(layer) = layer() {
        layer.add_output_mode(dpy, output, mode);
    }
}

#[no_mangle]
pub unsafe extern "C" fn XRRDeleteOutputMode(dpy: *mut Display, output: RROutput, mode: RRMode) {
    if let Some(layer) = layer() {
        layer.delete_output_mode(dpy, output, mode);
    }
}
