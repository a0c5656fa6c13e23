//! Exported symbol names of the CCDCOM2 libraries.
//!
//! The libraries are built as C++ and export decorated names. The 32-bit
//! production library is the exception and exports plain names.

/// Symbol names for one library build.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SymbolTable {
    pub init: &'static str,
    pub release: &'static str,
    pub is_camera_info_available: &'static str,
    pub camera_name: &'static str,
    pub camera_dimensions: &'static str,
    pub camera_count: Option<&'static str>,
    pub exec_script: Option<&'static str>,
    pub acquire_int: &'static str,
    pub acquire_float: &'static str,
    pub free_float: &'static str,
}

#[cfg(target_pointer_width = "64")]
const DECORATED: SymbolTable = SymbolTable {
    init: "?initCCDCOM@@YAHH@Z",
    release: "?releaseCCDCOM@@YAXXZ",
    is_camera_info_available: "?isCameraInfoAvailable@@YA_NXZ",
    camera_name: "?cameraName@@YA_NPEA_WH@Z",
    camera_dimensions: "?cameraDimensions@@YA_NPEAH0@Z",
    camera_count: Some("?cameraCount@@YAHXZ"),
    exec_script: Some("?execScript@@YAHPEB_W@Z"),
    acquire_int: "?acquireImageNewInt@@YAHHHHHPEAH00HN_N@Z",
    acquire_float: "?acquireImageNewFloat@@YAHHHHHHN_NPEAPEAMPEAH2@Z",
    free_float: "?CCDCOM2_release@@YAXPEAM@Z",
};

#[cfg(not(target_pointer_width = "64"))]
const DECORATED: SymbolTable = SymbolTable {
    init: "?initCCDCOM@@YAHH@Z",
    release: "?releaseCCDCOM@@YAXXZ",
    is_camera_info_available: "?isCameraInfoAvailable@@YA_NXZ",
    camera_name: "?cameraName@@YA_NPA_WH@Z",
    camera_dimensions: "?cameraDimensions@@YA_NPAH0@Z",
    camera_count: Some("?cameraCount@@YAHXZ"),
    exec_script: Some("?execScript@@YAHPB_W@Z"),
    acquire_int: "?acquireImageNewInt@@YAHHHHHPAH00HN_N@Z",
    acquire_float: "?acquireImageNewFloat@@YAHHHHHHN_NPAPAMPAH2@Z",
    free_float: "?CCDCOM2_release@@YAXPAM@Z",
};

#[cfg(not(target_pointer_width = "64"))]
const PLAIN: SymbolTable = SymbolTable {
    init: "initCCDCOM",
    release: "releaseCCDCOM",
    is_camera_info_available: "isCameraInfoAvailable",
    camera_name: "cameraName",
    camera_dimensions: "cameraDimensions",
    camera_count: None,
    exec_script: Some("execScript"),
    acquire_int: "acquireImageNewInt",
    acquire_float: "acquireImageNewFloat",
    free_float: "CCDCOM2_release",
};

/// Symbols exported by the production (Gatan) library.
pub(crate) fn production() -> SymbolTable {
    #[cfg(target_pointer_width = "64")]
    {
        DECORATED
    }
    #[cfg(not(target_pointer_width = "64"))]
    {
        PLAIN
    }
}

/// Symbols exported by the vendor's simulation library.
pub(crate) fn simulation() -> SymbolTable {
    DECORATED
}
