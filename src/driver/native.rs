//! Native vendor library binding
//!
//! Loads `usb_relay_device` with `libloading`, runs its init entry point and
//! resolves the fixed export table into typed function pointers.

use crate::driver::{DeviceHandle, RelayDriver};
use crate::error::{RelayPanelError, Result, StringError};
use libloading::Library;
use parking_lot::Mutex;
use std::ffi::{CStr, CString, c_char, c_int, c_uint, c_void};
use std::path::Path;
use tracing::{debug, error, info, warn};

type EnumerateFn = unsafe extern "C" fn() -> *mut c_void;
type CloseFn = unsafe extern "C" fn(*mut c_void) -> c_int;
type OpenWithSerialFn = unsafe extern "C" fn(*const c_char, c_uint) -> *mut c_void;
type NumRelaysFn = unsafe extern "C" fn(*mut c_void) -> c_int;
type IdStringFn = unsafe extern "C" fn(*mut c_void) -> *const c_char;
type NextDevFn = unsafe extern "C" fn(*mut c_void) -> *mut c_void;
type StatusBitmapFn = unsafe extern "C" fn(*mut c_void) -> c_int;
type ChannelFn = unsafe extern "C" fn(*mut c_void, c_int) -> c_int;
type CloseAllFn = unsafe extern "C" fn(*mut c_void) -> c_int;
type LibVersionFn = unsafe extern "C" fn() -> c_int;
type LifecycleFn = unsafe extern "C" fn() -> c_int;

/// Shared library file name for the host platform
pub const fn library_file_name() -> &'static str {
    if cfg!(windows) {
        "usb_relay_device.dll"
    } else if cfg!(target_os = "macos") {
        "usb_relay_device.dylib"
    } else {
        "usb_relay_device.so"
    }
}

/// Resolved export table
struct Exports {
    enumerate: EnumerateFn,
    close: CloseFn,
    open_with_serial_number: OpenWithSerialFn,
    get_num_relays: NumRelaysFn,
    get_id_string: IdStringFn,
    next_dev: NextDevFn,
    get_status_bitmap: StatusBitmapFn,
    open_one_relay_channel: ChannelFn,
    close_one_relay_channel: ChannelFn,
    close_all_relay_channel: CloseAllFn,
}

/// Relay driver backed by the vendor shared library
pub struct NativeDriver {
    exports: Exports,
    exit: LifecycleFn,
    /// The vendor library makes no thread-safety promise; every call goes through this lock.
    calls: Mutex<()>,
    // Must outlive every function pointer above
    _library: Library,
}

impl NativeDriver {
    /// Load the library from `library_dir`, initialize it and resolve all exports
    ///
    /// # Safety
    ///
    /// Loading runs the library's initializers. The library is the vendor's
    /// `usb_relay_device` build; each resolved symbol is cast to the signature
    /// documented in its `usb_relay_device.h`.
    #[expect(
        unsafe_code,
        reason = "FFI: loading the vendor library and calling its init/version entry points"
    )]
    pub fn load(library_dir: &Path) -> Result<Self> {
        let path = library_dir.join(library_file_name());
        info!("Loading relay library: {}", path.display());

        if !path.exists() {
            error!("Relay library not found at {}", path.display());
            return Err(RelayPanelError::LibraryLoadFailed {
                path,
                source: StringError::new("file not found"),
            });
        }

        let library = unsafe { Library::new(&path) }.map_err(|e| {
            error!("Failed to load relay library: {e}");
            RelayPanelError::LibraryLoadFailed {
                path: path.clone(),
                source: Box::new(e),
            }
        })?;

        let lib_version: LibVersionFn = resolve(&library, "usb_relay_device_lib_version")?;
        let init: LifecycleFn = resolve(&library, "usb_relay_init")?;
        let exit: LifecycleFn = resolve(&library, "usb_relay_exit")?;

        let version = unsafe { lib_version() };
        info!("{} version: {:#X}", library_file_name(), version);

        let ret = unsafe { init() };
        if ret != 0 {
            error!("usb_relay_init failed with code {ret}");
            return Err(RelayPanelError::LibraryInitFailed(ret));
        }

        let exports = match resolve_exports(&library) {
            Ok(exports) => exports,
            Err(e) => {
                unsafe { exit() };
                return Err(e);
            }
        };

        info!("Relay library loaded and initialized");
        Ok(Self {
            exports,
            exit,
            calls: Mutex::new(()),
            _library: library,
        })
    }
}

fn resolve_exports(library: &Library) -> Result<Exports> {
    Ok(Exports {
        enumerate: resolve(library, "usb_relay_device_enumerate")?,
        close: resolve(library, "usb_relay_device_close")?,
        open_with_serial_number: resolve(library, "usb_relay_device_open_with_serial_number")?,
        get_num_relays: resolve(library, "usb_relay_device_get_num_relays")?,
        get_id_string: resolve(library, "usb_relay_device_get_id_string")?,
        next_dev: resolve(library, "usb_relay_device_next_dev")?,
        get_status_bitmap: resolve(library, "usb_relay_device_get_status_bitmap")?,
        open_one_relay_channel: resolve(library, "usb_relay_device_open_one_relay_channel")?,
        close_one_relay_channel: resolve(library, "usb_relay_device_close_one_relay_channel")?,
        close_all_relay_channel: resolve(library, "usb_relay_device_close_all_relay_channel")?,
    })
}

/// Resolve one export as a copied function pointer
#[expect(
    unsafe_code,
    reason = "FFI: the caller picks T to match the export's C signature"
)]
fn resolve<T: Copy>(library: &Library, name: &'static str) -> Result<T> {
    match unsafe { library.get::<T>(name.as_bytes()) } {
        Ok(symbol) => {
            debug!("Resolved export {}", name);
            Ok(*symbol)
        }
        Err(e) => {
            error!("Missing lib export {name}: {e}");
            Err(RelayPanelError::MissingExport(name))
        }
    }
}

fn raw(handle: DeviceHandle) -> *mut c_void {
    handle.as_raw() as *mut c_void
}

#[expect(
    unsafe_code,
    reason = "FFI: calls into the vendor library with handles it issued"
)]
impl RelayDriver for NativeDriver {
    fn enumerate_ids(&self) -> Vec<String> {
        let _calls = self.calls.lock();
        let mut ids = Vec::new();

        let mut node = unsafe { (self.exports.enumerate)() };
        while !node.is_null() {
            let id_ptr = unsafe { (self.exports.get_id_string)(node) };
            if id_ptr.is_null() {
                warn!("Enumeration node without an id string, skipping");
            } else {
                let id = unsafe { CStr::from_ptr(id_ptr) }
                    .to_string_lossy()
                    .into_owned();
                debug!("Enumerated device id {}", id);
                ids.push(id);
            }
            node = unsafe { (self.exports.next_dev)(node) };
        }

        ids
    }

    fn open_device(&self, serial: &str) -> Option<DeviceHandle> {
        let Ok(serial_c) = CString::new(serial) else {
            warn!("Serial {:?} contains a NUL byte", serial);
            return None;
        };
        let len = c_uint::try_from(serial.len()).ok()?;

        let _calls = self.calls.lock();
        let handle = unsafe { (self.exports.open_with_serial_number)(serial_c.as_ptr(), len) };
        if handle.is_null() {
            None
        } else {
            Some(DeviceHandle::from_raw(handle as usize))
        }
    }

    fn close_device(&self, handle: DeviceHandle) {
        let _calls = self.calls.lock();
        let ret = unsafe { (self.exports.close)(raw(handle)) };
        if ret != 0 {
            warn!("usb_relay_device_close returned {ret}");
        }
    }

    fn num_relays(&self, handle: DeviceHandle) -> i32 {
        let _calls = self.calls.lock();
        unsafe { (self.exports.get_num_relays)(raw(handle)) }
    }

    fn status_bitmap(&self, handle: DeviceHandle) -> i32 {
        let _calls = self.calls.lock();
        unsafe { (self.exports.get_status_bitmap)(raw(handle)) }
    }

    fn open_channel(&self, handle: DeviceHandle, channel: u8) -> i32 {
        let _calls = self.calls.lock();
        unsafe { (self.exports.open_one_relay_channel)(raw(handle), c_int::from(channel)) }
    }

    fn close_channel(&self, handle: DeviceHandle, channel: u8) -> i32 {
        let _calls = self.calls.lock();
        unsafe { (self.exports.close_one_relay_channel)(raw(handle), c_int::from(channel)) }
    }

    fn close_all_channels(&self, handle: DeviceHandle) -> i32 {
        let _calls = self.calls.lock();
        unsafe { (self.exports.close_all_relay_channel)(raw(handle)) }
    }
}

impl Drop for NativeDriver {
    #[expect(unsafe_code, reason = "FFI: usb_relay_exit before the library is unloaded")]
    fn drop(&mut self) {
        let _calls = self.calls.lock();
        let ret = unsafe { (self.exit)() };
        if ret != 0 {
            warn!("usb_relay_exit returned {ret}");
        }
        info!("Relay library closed");
    }
}
