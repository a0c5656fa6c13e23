//! CCDCOM2 vendor library bindings.
//!
//! The library is loaded at runtime; nothing links against it at build
//! time. All calls are serialized by the owning [`crate::Session`].

#![allow(unsafe_code)]

use super::symbols::{self, SymbolTable};
use super::{Driver, DriverAllocation, DriverError, WideChar};
use crate::acquisition::AcquisitionRequest;
use serde::{Deserialize, Serialize};
use std::ffi::{c_double, c_float, c_int};
use std::path::{Path, PathBuf};
use std::ptr::{self, NonNull};

type InitFn = unsafe extern "C" fn(c_int) -> c_int;
type ReleaseFn = unsafe extern "C" fn();
type InfoAvailableFn = unsafe extern "C" fn() -> bool;
type NameFn = unsafe extern "C" fn(*mut WideChar, c_int) -> bool;
type DimensionsFn = unsafe extern "C" fn(*mut c_int, *mut c_int) -> bool;
type CountFn = unsafe extern "C" fn() -> c_int;
type ScriptFn = unsafe extern "C" fn(*const WideChar) -> c_int;
type AcquireIntFn = unsafe extern "C" fn(
    c_int,
    c_int,
    c_int,
    c_int,
    *mut c_int,
    *mut c_int,
    *mut c_int,
    c_int,
    c_double,
    bool,
) -> c_int;
type AcquireFloatFn = unsafe extern "C" fn(
    c_int,
    c_int,
    c_int,
    c_int,
    c_int,
    c_double,
    bool,
    *mut *mut c_float,
    *mut c_int,
    *mut c_int,
) -> c_int;
type FreeFloatFn = unsafe extern "C" fn(*mut c_float);

/// Which CCDCOM2 library build to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VendorLibrary {
    /// Production library connected to the Gatan camera software.
    Gatan,
    /// The vendor's own simulation library.
    Simulation,
}

impl VendorLibrary {
    /// Returns the library file name for the current architecture.
    pub fn file_name(self) -> &'static str {
        match (self, cfg!(target_pointer_width = "64")) {
            (Self::Gatan, true) => "CCDCOM2_x64_gatan.dll",
            (Self::Gatan, false) => "CCDCOM2_x86_gatan.dll",
            (Self::Simulation, true) => "CCDCOM2_x64_simulation.dll",
            (Self::Simulation, false) => "CCDCOM2_x86_simulation.dll",
        }
    }

    fn symbols(self) -> SymbolTable {
        match self {
            Self::Gatan => symbols::production(),
            Self::Simulation => symbols::simulation(),
        }
    }
}

/// Resolved entry points of a loaded library.
struct Entry {
    init: InitFn,
    release: ReleaseFn,
    is_camera_info_available: InfoAvailableFn,
    camera_name: NameFn,
    camera_dimensions: DimensionsFn,
    camera_count: Option<CountFn>,
    exec_script: Option<ScriptFn>,
    acquire_int: AcquireIntFn,
    acquire_float: AcquireFloatFn,
    free_float: FreeFloatFn,
}

/// Resolves a required symbol.
///
/// # Safety
///
/// `T` must match the signature of the exported function.
unsafe fn required<T: Copy>(library: &libloading::Library, name: &str) -> Result<T, DriverError> {
    library
        .get::<T>(name.as_bytes())
        .map(|symbol| *symbol)
        .map_err(|_| DriverError::MissingSymbol(name.to_string()))
}

/// Resolves an export that some library builds lack.
///
/// # Safety
///
/// `T` must match the signature of the exported function.
unsafe fn optional<T: Copy>(library: &libloading::Library, name: Option<&str>) -> Option<T> {
    let name = name?;
    match library.get::<T>(name.as_bytes()) {
        Ok(symbol) => Some(*symbol),
        Err(_) => {
            tracing::debug!(symbol = name, "optional driver export not found");
            None
        }
    }
}

/// Float pixels allocated inside the vendor library.
pub struct VendorAllocation {
    data: NonNull<c_float>,
    width: u32,
    height: u32,
}

// SAFETY: the allocation is plain heap memory owned by the library. It is
// only read through `&self` and freed once, through the session's release
// gate, which holds exclusive access to the driver.
unsafe impl Send for VendorAllocation {}

impl DriverAllocation for VendorAllocation {
    fn pixels(&self) -> &[f32] {
        let len = self.width as usize * self.height as usize;
        // SAFETY: the library allocated `width * height` floats at `data`
        // and they stay valid until the buffer is released.
        unsafe { std::slice::from_raw_parts(self.data.as_ptr(), len) }
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}

impl std::fmt::Debug for VendorAllocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VendorAllocation")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

/// Driver backed by a CCDCOM2 dynamic library.
pub struct VendorDriver {
    entry: Entry,
    kind: VendorLibrary,
    path: PathBuf,
    // Declared last so the entry points are dropped before the library.
    _library: libloading::Library,
}

impl VendorDriver {
    /// Loads the library of the given kind from `dir`.
    pub fn load(kind: VendorLibrary, dir: impl AsRef<Path>) -> Result<Self, DriverError> {
        let path = dir.as_ref().join(kind.file_name());
        let names = kind.symbols();

        // SAFETY: loading runs the library's initialisers; the CCDCOM2
        // libraries have no initialisation requirements beyond being
        // loaded once per process.
        let library = unsafe { libloading::Library::new(&path) }.map_err(|e| {
            DriverError::LibraryLoad {
                path: path.clone(),
                reason: e.to_string(),
            }
        })?;

        // SAFETY: the function types above match the vendor header.
        let entry = unsafe {
            Entry {
                init: required(&library, names.init)?,
                release: required(&library, names.release)?,
                is_camera_info_available: required(&library, names.is_camera_info_available)?,
                camera_name: required(&library, names.camera_name)?,
                camera_dimensions: required(&library, names.camera_dimensions)?,
                camera_count: optional(&library, names.camera_count),
                exec_script: optional(&library, names.exec_script),
                acquire_int: required(&library, names.acquire_int)?,
                acquire_float: required(&library, names.acquire_float)?,
                free_float: required(&library, names.free_float)?,
            }
        };

        tracing::info!(path = %path.display(), ?kind, "loaded camera driver library");

        Ok(Self {
            entry,
            kind,
            path,
            _library: library,
        })
    }

    /// Returns the path the library was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns which library build is loaded.
    pub fn kind(&self) -> VendorLibrary {
        self.kind
    }
}

fn capacity(len: usize) -> c_int {
    c_int::try_from(len).unwrap_or(c_int::MAX)
}

impl Driver for VendorDriver {
    type Allocation = VendorAllocation;

    fn label(&self) -> &str {
        match self.kind {
            VendorLibrary::Gatan => "gatan",
            VendorLibrary::Simulation => "simulate_dll",
        }
    }

    fn open(&mut self, magic: i32) -> Result<(), DriverError> {
        // SAFETY: plain value argument.
        let result = unsafe { (self.entry.init)(magic) };
        tracing::trace!(result, "initCCDCOM");
        if result == 1 {
            Ok(())
        } else {
            Err(DriverError::status("initCCDCOM", result))
        }
    }

    fn close(&mut self) {
        // SAFETY: no arguments; the session only calls this once per open.
        unsafe { (self.entry.release)() };
        tracing::trace!("releaseCCDCOM");
    }

    fn is_camera_info_available(&self) -> bool {
        // SAFETY: no arguments.
        unsafe { (self.entry.is_camera_info_available)() }
    }

    fn camera_name(&self, buf: &mut [WideChar]) -> bool {
        if buf.is_empty() {
            return false;
        }
        // SAFETY: the library writes at most `capacity` code units.
        unsafe { (self.entry.camera_name)(buf.as_mut_ptr(), capacity(buf.len())) }
    }

    fn camera_dimensions(&self) -> Option<(i32, i32)> {
        let mut width: c_int = 0;
        let mut height: c_int = 0;
        // SAFETY: both pointers refer to live stack integers.
        let ok = unsafe { (self.entry.camera_dimensions)(&mut width, &mut height) };
        ok.then_some((width, height))
    }

    fn camera_count(&self) -> Result<i32, DriverError> {
        let count = self
            .entry
            .camera_count
            .ok_or(DriverError::Unsupported("cameraCount"))?;
        // SAFETY: no arguments.
        Ok(unsafe { count() })
    }

    fn execute_script(&mut self, script: &[WideChar]) -> Result<i32, DriverError> {
        let exec = self
            .entry
            .exec_script
            .ok_or(DriverError::Unsupported("execScript"))?;
        if script.last() != Some(&0) {
            return Err(DriverError::status("execScript", -1));
        }
        // SAFETY: `script` is null-terminated and outlives the call.
        Ok(unsafe { exec(script.as_ptr()) })
    }

    fn acquire_int(
        &mut self,
        request: &AcquisitionRequest,
        out: &mut [i32],
    ) -> Result<(i32, i32), DriverError> {
        let roi = request.roi;
        let mut width: c_int = 0;
        let mut height: c_int = 0;
        // SAFETY: the session checked that `out` holds the binned output
        // of this request, which is what the library writes.
        let status = unsafe {
            (self.entry.acquire_int)(
                roi.top,
                roi.left,
                roi.bottom,
                roi.right,
                out.as_mut_ptr(),
                &mut width,
                &mut height,
                request.binning as c_int,
                request.exposure,
                request.display,
            )
        };
        tracing::trace!(status, width, height, "acquireImageNewInt");
        if width <= 0 || height <= 0 {
            return Err(DriverError::status("acquireImageNewInt", status));
        }
        Ok((width, height))
    }

    fn acquire_float(&mut self, request: &AcquisitionRequest) -> Result<Self::Allocation, DriverError> {
        let roi = request.roi;
        let mut data: *mut c_float = ptr::null_mut();
        let mut width: c_int = 0;
        let mut height: c_int = 0;
        // SAFETY: all out-pointers refer to live locals.
        let status = unsafe {
            (self.entry.acquire_float)(
                roi.top,
                roi.left,
                roi.bottom,
                roi.right,
                request.binning as c_int,
                request.exposure,
                request.display,
                &mut data,
                &mut width,
                &mut height,
            )
        };
        tracing::trace!(status, width, height, "acquireImageNewFloat");

        let Some(data) = NonNull::new(data) else {
            return Err(DriverError::status("acquireImageNewFloat", status));
        };
        if width <= 0 || height <= 0 {
            // SAFETY: the pointer came from this library and is not used again.
            unsafe { (self.entry.free_float)(data.as_ptr()) };
            return Err(DriverError::status("acquireImageNewFloat", status));
        }

        Ok(VendorAllocation {
            data,
            width: width as u32,
            height: height as u32,
        })
    }

    fn release_float(&mut self, allocation: Self::Allocation) {
        // SAFETY: every allocation is released exactly once; the release
        // gate consumes it.
        unsafe { (self.entry.free_float)(allocation.data.as_ptr()) };
    }
}
