// 独立的测试二进制：ffi 层是进程级单例，只能在这里初始化一次
use std::os::raw::{c_int, c_uchar, c_ulong};
use std::ptr;
use x11::xlib::Atom;
use x11::xrandr::{RROutput, XRRCrtcTransformAttributes};
use xrandr_split::config::{CONFIG_ENV, LOG_ENV, REAL_LIB_ENV};
use xrandr_split::ffi;
use xrandr_split::provider::SET_CONFIG_FAILED;
use xrandr_split::{SplitConfig, SplitSignature};

const MISSING_LIBRARY: &str = "/nonexistent/libXrandr-split-test.so";

#[test]
fn test_exports_degrade_without_real_library() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        "tag = 0x800000\n\
         real_library = \"/nonexistent/from-file.so\"\n\
         [signature]\nwidth = 5120\nheight = 1440\n\
         [logging]\nlevel = \"off\"\n",
    )
    .unwrap();
    std::env::set_var(CONFIG_ENV, &path);
    std::env::set_var(REAL_LIB_ENV, MISSING_LIBRARY);
    std::env::set_var(LOG_ENV, "off");

    // 文件 -> 环境变量 的覆盖顺序
    let config = SplitConfig::load().unwrap();
    assert_eq!(config.signature, SplitSignature::new(5120, 1440));
    assert_eq!(config.tag, 0x80_0000);
    assert_eq!(config.real_library, MISSING_LIBRARY);
    assert!(!config.logging.is_enabled());

    unsafe {
        assert!(ffi::XRRGetScreenResources(ptr::null_mut(), 1).is_null());
        assert!(ffi::XRRGetScreenResourcesCurrent(ptr::null_mut(), 1).is_null());
        assert!(ffi::XRRGetOutputInfo(ptr::null_mut(), ptr::null_mut(), 0x50).is_null());
        assert!(ffi::XRRGetCrtcInfo(ptr::null_mut(), ptr::null_mut(), 0x40).is_null());

        let mut outputs: Vec<RROutput> = vec![0x50];
        let status = ffi::XRRSetCrtcConfig(
            ptr::null_mut(),
            ptr::null_mut(),
            0x40,
            0,
            0,
            0,
            0x90,
            1,
            outputs.as_mut_ptr(),
            outputs.len() as c_int,
        );
        assert_eq!(status, SET_CONFIG_FAILED);
        assert_eq!(
            ffi::XRRSetPanning(ptr::null_mut(), ptr::null_mut(), 0x40, ptr::null_mut()),
            SET_CONFIG_FAILED
        );

        let mut nprop: c_int = -1;
        assert!(ffi::XRRListOutputProperties(ptr::null_mut(), 0x50, &mut nprop).is_null());
        assert_eq!(nprop, 0);

        let mut actual_type: Atom = 0;
        let mut actual_format: c_int = 0;
        let mut nitems: c_ulong = 0;
        let mut bytes_after: c_ulong = 0;
        let mut prop: *mut c_uchar = ptr::null_mut();
        let status = ffi::XRRGetOutputProperty(
            ptr::null_mut(),
            0x50,
            0x7f,
            0,
            128,
            0,
            0,
            0,
            &mut actual_type,
            &mut actual_format,
            &mut nitems,
            &mut bytes_after,
            &mut prop,
        );
        assert_eq!(status, ffi::BAD_IMPLEMENTATION);

        let mut attributes = ptr::NonNull::<XRRCrtcTransformAttributes>::dangling().as_ptr();
        assert_eq!(ffi::XRRGetCrtcTransform(ptr::null_mut(), 0x40, &mut attributes), 0);
        assert!(attributes.is_null());

        assert_eq!(ffi::XRRGetCrtcGammaSize(ptr::null_mut(), 0x40), 0);
        assert!(ffi::XRRGetCrtcGamma(ptr::null_mut(), 0x40).is_null());
        assert!(ffi::XRRQueryOutputProperty(ptr::null_mut(), 0x50, 0x7f).is_null());

        // 无返回值的请求直接丢弃
        ffi::XRRSetCrtcGamma(ptr::null_mut(), 0x40, ptr::null_mut());
        ffi::XRRDeleteOutputProperty(ptr::null_mut(), 0x50, 0x7f);
        ffi::XRRAddOutputMode(ptr::null_mut(), 0x50, 0x90);
        ffi::XRRSetOutputPrimary(ptr::null_mut(), 1, 0x50);
    }
}
