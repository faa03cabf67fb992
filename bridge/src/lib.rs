//! `pgisam-bridge`: the `extern "C"` ISAM-facing API (component E, spec
//! §4.E/§6). A thin adapter over [`pgisam_core::Engine`]: every entry point
//! resolves its handle argument, delegates to the engine, and collapses the
//! result into the legacy `iserrno`/`-1` contract (spec §4.F/§7) — the
//! engine itself never touches the C ABI.
//!
//! The whole surface runs behind one process-global mutex, matching the
//! single-threaded concurrency model spec §5 describes ("if a
//! target-language implementation needs thread safety it wraps the entire
//! API in a single mutex at the boundary").

use constants::MAX_KEY_PARTS;
use lazy_static::lazy_static;
use pgisam_core::context::KeyPart;
use pgisam_core::engine::Engine;
use pgisam_core::err::IsamError;
use std::ffi::{c_char, c_int, c_long, CStr, CString};
use std::sync::Mutex;

/// The legacy `keypart`: one `(kp_start, kp_leng, kp_type)` slot of a
/// `keydesc` (field names per `isamtest.c`/`issum.c`'s usage; `isam.h`
/// itself isn't shipped in `original_source/`).
#[repr(C)]
#[derive(Clone, Copy)]
pub struct Keypart {
    pub kp_start: i16,
    pub kp_leng: i16,
    pub kp_type: i16,
}

/// The legacy `keydesc`: `k_flags` (ISDUPS/ISNODUPS), `k_nparts`, `k_part`,
/// `k_len` (field names per `issum.c`'s `isindexinfo` usage).
#[repr(C)]
pub struct Keydesc {
    pub k_flags: i16,
    pub k_nparts: i16,
    pub k_part: [Keypart; MAX_KEY_PARTS],
    pub k_len: i16,
}

fn keydesc_parts(keydesc: &Keydesc) -> Vec<KeyPart> {
    let nparts = usize::try_from(keydesc.k_nparts.max(0)).unwrap_or(0).min(MAX_KEY_PARTS);
    keydesc.k_part[..nparts]
        .iter()
        .map(|p| KeyPart {
            start: usize::try_from(p.kp_start.max(0)).unwrap_or(0),
            length: usize::try_from(p.kp_leng.max(0)).unwrap_or(0),
        })
        .collect()
}

/// The process-global last error, separate from the engine itself (spec
/// §10.3: "the `pgisam-bridge` FFI layer is the single place that
/// collapses `Result` into `iserrno`").
#[derive(Default)]
struct LastError {
    isamerrno: c_int,
    suppress_display: bool,
}

impl LastError {
    fn record(&mut self, error: &IsamError) {
        self.isamerrno = error.isamerrno();
        if !self.suppress_display {
            log::error!(
                "iserrno {} (code {}): {}",
                self.isamerrno,
                error.code(),
                error.description()
            );
        }
    }
}

lazy_static! {
    static ref ENGINE: Mutex<Option<Engine>> = Mutex::new(None);
    static ref LAST_ERROR: Mutex<LastError> = Mutex::new(LastError::default());
}

/// Run `body` with the global engine, recording any [`IsamError`] it
/// returns into the global last-error slot and collapsing the result into
/// `ok` or `-1`, the legacy "-1 on failure, set last error" contract
/// (spec §4.F/§7). A panic inside `body` is caught and mapped to the same
/// `999` sentinel `IsamError::Backend` uses, instead of unwinding across
/// the FFI boundary.
fn dispatch<T>(ok: impl FnOnce(T) -> c_int, body: impl FnOnce(&mut Engine) -> pgisam_core::Result<T> + std::panic::UnwindSafe) -> c_int {
    let result = std::panic::catch_unwind(|| {
        let mut guard = ENGINE.lock().unwrap();
        match guard.as_mut() {
            Some(engine) => body(engine),
            None => Err(IsamError::FileNotOpen),
        }
    });

    match result {
        Ok(Ok(value)) => ok(value),
        Ok(Err(error)) => {
            LAST_ERROR.lock().unwrap().record(&error);
            -1
        }
        Err(_) => {
            LAST_ERROR
                .lock()
                .unwrap()
                .record(&IsamError::Backend("panic".to_string()));
            -1
        }
    }
}

unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(str::to_string)
}

unsafe fn record_slice<'a>(ptr: *const u8, engine: &Engine, handle: c_int) -> Option<&'a [u8]> {
    if ptr.is_null() {
        return None;
    }
    let reclen = engine.reclen_for(usize_handle(handle)?).ok()?;
    Some(std::slice::from_raw_parts(ptr, reclen))
}

unsafe fn record_slice_mut<'a>(ptr: *mut u8, engine: &Engine, handle: c_int) -> Option<&'a mut [u8]> {
    if ptr.is_null() {
        return None;
    }
    let reclen = engine.reclen_for(usize_handle(handle)?).ok()?;
    Some(std::slice::from_raw_parts_mut(ptr, reclen))
}

fn usize_handle(handle: c_int) -> Option<usize> {
    usize::try_from(handle).ok()
}

// ---------------------------------------------------------------------
// Process lifecycle (isbridge.h init_program/shutdown_program/get_EDATA/
// get_BRIDGE; spec §11 "get_last_sql/get_EDATA/get_BRIDGE accessors")
// ---------------------------------------------------------------------

/// Connect using `BRIDGE`/`EDATA` and install the global engine. Returns
/// `true` on success, matching the original's `bool init_program(void)`.
#[no_mangle]
pub extern "C" fn init_program() -> bool {
    let result = std::panic::catch_unwind(Engine::from_env);
    match result {
        Ok(Ok(engine)) => {
            *ENGINE.lock().unwrap() = Some(engine);
            true
        }
        _ => false,
    }
}

#[no_mangle]
pub extern "C" fn shutdown_program() -> bool {
    *ENGINE.lock().unwrap() = None;
    true
}

/// Caller-owned: free with the platform's `free()`, matching the
/// original's plain `char *` return.
#[no_mangle]
pub extern "C" fn get_EDATA() -> *mut c_char {
    let guard = ENGINE.lock().unwrap();
    match guard.as_ref() {
        Some(engine) => CString::new(engine.edata()).map(CString::into_raw).unwrap_or(std::ptr::null_mut()),
        None => std::ptr::null_mut(),
    }
}

#[no_mangle]
pub extern "C" fn get_BRIDGE() -> *mut c_char {
    let guard = ENGINE.lock().unwrap();
    match guard.as_ref() {
        Some(engine) => CString::new(engine.bridge_dir())
            .map(CString::into_raw)
            .unwrap_or(std::ptr::null_mut()),
        None => std::ptr::null_mut(),
    }
}

// ---------------------------------------------------------------------
// File/handle lifecycle
// ---------------------------------------------------------------------

#[no_mangle]
pub extern "C" fn x_isopen(filename: *const c_char, _mode: c_int) -> c_int {
    let Some(name) = (unsafe { cstr_to_string(filename) }) else {
        LAST_ERROR.lock().unwrap().record(&IsamError::IllegalArgument);
        return -1;
    };
    dispatch(
        |handle| c_int::try_from(handle).unwrap_or(-1),
        move |engine| engine.open(&name),
    )
}

#[no_mangle]
pub extern "C" fn x_isbuild(
    filename: *const c_char,
    _reclen: c_int,
    _keydesc: *const Keydesc,
    _mode: c_int,
) -> c_int {
    let Some(name) = (unsafe { cstr_to_string(filename) }) else {
        LAST_ERROR.lock().unwrap().record(&IsamError::IllegalArgument);
        return -1;
    };
    dispatch(
        |handle| c_int::try_from(handle).unwrap_or(-1),
        move |engine| engine.build(&name),
    )
}

#[no_mangle]
pub extern "C" fn x_isclose(isfd: c_int) -> c_int {
    dispatch(|_| 0, move |engine| {
        let handle = usize_handle(isfd).ok_or(IsamError::FileNotOpen)?;
        engine.close(handle)
    })
}

#[no_mangle]
pub extern "C" fn x_iserase(filename: *const c_char) -> c_int {
    let Some(name) = (unsafe { cstr_to_string(filename) }) else {
        LAST_ERROR.lock().unwrap().record(&IsamError::IllegalArgument);
        return -1;
    };
    dispatch(|_| 0, move |engine| engine.erase(&name))
}

// ---------------------------------------------------------------------
// Positioning and reading
// ---------------------------------------------------------------------

#[no_mangle]
pub extern "C" fn x_isstart(
    isfd: c_int,
    keydesc: *const Keydesc,
    _length: c_int,
    record: *const c_char,
    mode: c_int,
) -> c_int {
    if keydesc.is_null() {
        LAST_ERROR.lock().unwrap().record(&IsamError::IllegalKeyDescriptor);
        return -1;
    }
    let parts = keydesc_parts(unsafe { &*keydesc });
    dispatch(|_| 0, move |engine| {
        let handle = usize_handle(isfd).ok_or(IsamError::FileNotOpen)?;
        let reclen = engine.reclen_for(handle)?;
        let slice = unsafe { record_slice(record.cast::<u8>(), engine, isfd) }
            .filter(|_| reclen > 0)
            .unwrap_or(&[]);
        engine.start(handle, &parts, slice, mode)
    })
}

#[no_mangle]
pub extern "C" fn x_isread(isfd: c_int, record: *mut c_char, mode: c_int) -> c_int {
    dispatch(|_| 0, move |engine| {
        let handle = usize_handle(isfd).ok_or(IsamError::FileNotOpen)?;
        let slice =
            unsafe { record_slice_mut(record.cast::<u8>(), engine, isfd) }.ok_or(IsamError::IllegalArgument)?;
        engine.read(handle, slice, mode)
    })
}

// ---------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------

#[no_mangle]
pub extern "C" fn x_iswrite(isfd: c_int, record: *const c_char) -> c_int {
    write_like(isfd, record, Engine::write)
}

#[no_mangle]
pub extern "C" fn x_iswrcurr(isfd: c_int, record: *const c_char) -> c_int {
    write_like(isfd, record, Engine::write)
}

fn write_like(
    isfd: c_int,
    record: *const c_char,
    op: fn(&mut Engine, usize, &[u8]) -> pgisam_core::Result<()>,
) -> c_int {
    dispatch(|_| 0, move |engine| {
        let handle = usize_handle(isfd).ok_or(IsamError::FileNotOpen)?;
        let slice = unsafe { record_slice(record.cast::<u8>(), engine, isfd) }.ok_or(IsamError::IllegalArgument)?;
        op(engine, handle, slice)
    })
}

/// `isrewrite` behaves as rewrite-current here, per spec §6.
#[no_mangle]
pub extern "C" fn x_isrewrite(isfd: c_int, record: *const c_char) -> c_int {
    rewrite_like(isfd, record)
}

#[no_mangle]
pub extern "C" fn x_isrewcurr(isfd: c_int, record: *const c_char) -> c_int {
    rewrite_like(isfd, record)
}

fn rewrite_like(isfd: c_int, record: *const c_char) -> c_int {
    dispatch(|_| 0, move |engine| {
        let handle = usize_handle(isfd).ok_or(IsamError::FileNotOpen)?;
        let slice = unsafe { record_slice(record.cast::<u8>(), engine, isfd) }.ok_or(IsamError::IllegalArgument)?;
        engine.rewrite_current(handle, slice)
    })
}

/// Stub (spec §6): accepts a record-number rewrite and reports success
/// without touching the backend.
#[no_mangle]
pub extern "C" fn x_isrewrec(_isfd: c_int, _recnum: c_long, _record: *const c_char) -> c_int {
    0
}

// ---------------------------------------------------------------------
// Deleting
// ---------------------------------------------------------------------

#[no_mangle]
pub extern "C" fn x_isdelete(isfd: c_int, record: *const c_char) -> c_int {
    dispatch(|_| 0, move |engine| {
        let handle = usize_handle(isfd).ok_or(IsamError::FileNotOpen)?;
        let slice = unsafe { record_slice(record.cast::<u8>(), engine, isfd) }.ok_or(IsamError::IllegalArgument)?;
        engine.delete(handle, slice)
    })
}

#[no_mangle]
pub extern "C" fn x_isdelcurr(isfd: c_int) -> c_int {
    dispatch(|_| 0, move |engine| {
        let handle = usize_handle(isfd).ok_or(IsamError::FileNotOpen)?;
        engine.delete_current(handle)
    })
}

/// Stub (spec §6): accepts a record-number delete and reports success.
#[no_mangle]
pub extern "C" fn x_isdelrec(_isfd: c_int, _recnum: c_long) -> c_int {
    0
}

// ---------------------------------------------------------------------
// Index maintenance stubs (spec §6: "stubs in the bridge; the clone tool
// uses the legacy engine's versions")
// ---------------------------------------------------------------------

#[no_mangle]
pub extern "C" fn x_isaddindex(_isfd: c_int, _keydesc: *const Keydesc) -> c_int {
    0
}

#[no_mangle]
pub extern "C" fn x_isdelindex(_isfd: c_int, _keydesc: *const Keydesc) -> c_int {
    0
}

#[no_mangle]
pub extern "C" fn x_isindexinfo(_isfd: c_int, _buffer: *mut Keydesc, _number: c_int) -> c_int {
    0
}

/// Stub (spec §11, `pgbridge.c`).
#[no_mangle]
pub extern "C" fn x_isrelease(_isfd: c_int) -> c_int {
    0
}

// ---------------------------------------------------------------------
// Cursor/context lifecycle and transactions
// ---------------------------------------------------------------------

#[no_mangle]
pub extern "C" fn x_isfinish(isfd: c_int) -> c_int {
    dispatch(|_| 0, move |engine| {
        let handle = usize_handle(isfd).ok_or(IsamError::FileNotOpen)?;
        engine.finish(handle)
    })
}

#[no_mangle]
pub extern "C" fn x_isbegin() -> c_int {
    dispatch(|_| 0, Engine::begin)
}

#[no_mangle]
pub extern "C" fn x_iscommit() -> c_int {
    dispatch(|_| 0, Engine::commit)
}

#[no_mangle]
pub extern "C" fn x_isrollback() -> c_int {
    dispatch(|_| 0, Engine::rollback)
}

/// No open handles or cached schemas survive a process restart anyway;
/// `iscleanup` just tears down the global engine.
#[no_mangle]
pub extern "C" fn x_iscleanup() -> c_int {
    *ENGINE.lock().unwrap() = None;
    0
}

// ---------------------------------------------------------------------
// Logging stubs (spec §6: "islogopen/islogclose (stubs)")
// ---------------------------------------------------------------------

#[no_mangle]
pub extern "C" fn x_islogopen(_logname: *const c_char) -> c_int {
    0
}

#[no_mangle]
pub extern "C" fn x_islogclose() -> c_int {
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keydesc_parts_clamps_to_declared_nparts() {
        let mut parts = [Keypart {
            kp_start: 0,
            kp_leng: 0,
            kp_type: 0,
        }; MAX_KEY_PARTS];
        parts[0] = Keypart {
            kp_start: 0,
            kp_leng: 5,
            kp_type: 0,
        };
        let keydesc = Keydesc {
            k_flags: 0,
            k_nparts: 1,
            k_part: parts,
            k_len: 5,
        };
        let result = keydesc_parts(&keydesc);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].length, 5);
    }

    #[test]
    fn keydesc_parts_ignores_negative_nparts() {
        let keydesc = Keydesc {
            k_flags: 0,
            k_nparts: -1,
            k_part: [Keypart {
                kp_start: 0,
                kp_leng: 0,
                kp_type: 0,
            }; MAX_KEY_PARTS],
            k_len: 0,
        };
        assert!(keydesc_parts(&keydesc).is_empty());
    }
}
