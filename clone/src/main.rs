//! `pgisam-clone`: the one-shot driver that copies every table named in
//! `clonelist.def` from the real ISAM engine into the Postgres backend
//! (spec §6 "legacy ISAM file engine ... for a one-time clone tool the
//! legacy engine is consumed read-only").
//!
//! Reads each table by its first index in legacy file order (the same
//! walk `issum.c` does: `isindexinfo` for the key, `isstart(ISFIRST)`,
//! then `isread(ISNEXT)` until exhausted) and writes each record straight
//! through [`pgisam_core::Engine::write`].

use constants::{ISEXCLLOCK, ISFIRST, ISINPUT, ISNEXT, MAX_KEY_PARTS};
use pgisam_bridge::{Keydesc, Keypart};
use pgisam_core::Engine;
use std::ffi::{c_char, c_int, CString};
use std::process::ExitCode;

/// `struct dictinfo` (pgisam.h): only the fields `issum.c` reads —
/// key count and record size, `isindexinfo(isfd, ..., 0)`'s output.
#[repr(C)]
struct DictInfo {
    di_nkeys: i16,
    di_recsize: i16,
    di_idxsize: i32,
    di_nrecords: i32,
}

extern "C" {
    static mut iserrno: c_int;

    fn isopen(filename: *const c_char, mode: c_int) -> c_int;
    fn isclose(isfd: c_int) -> c_int;
    fn isindexinfo(isfd: c_int, buffer: *mut Keydesc, number: c_int) -> c_int;
    fn isstart(isfd: c_int, keydesc: *const Keydesc, length: c_int, record: *const c_char, mode: c_int) -> c_int;
    fn isread(isfd: c_int, record: *mut c_char, mode: c_int) -> c_int;
}

/// A read-only handle onto a table in the real ISAM engine.
struct LegacySource {
    isfd: c_int,
    reclen: usize,
}

impl LegacySource {
    fn open(filename: &str) -> Result<LegacySource, String> {
        let cfilename = CString::new(filename).map_err(|e| e.to_string())?;
        let isfd = unsafe { isopen(cfilename.as_ptr(), ISINPUT | ISEXCLLOCK) };
        if isfd < 0 {
            return Err(format!("isopen({filename}) failed, iserrno={}", unsafe { iserrno }));
        }

        let mut info = DictInfo {
            di_nkeys: 0,
            di_recsize: 0,
            di_idxsize: 0,
            di_nrecords: 0,
        };
        if unsafe { isindexinfo(isfd, std::ptr::addr_of_mut!(info).cast::<Keydesc>(), 0) } < 0 {
            unsafe { isclose(isfd) };
            return Err(format!("isindexinfo(dictinfo) failed for {filename}"));
        }

        Ok(LegacySource {
            isfd,
            reclen: usize::try_from(info.di_recsize.max(0)).unwrap_or(0),
        })
    }

    fn first_key(&self) -> Result<Keydesc, String> {
        let mut key = Keydesc {
            k_flags: 0,
            k_nparts: 0,
            k_part: [Keypart {
                kp_start: 0,
                kp_leng: 0,
                kp_type: 0,
            }; MAX_KEY_PARTS],
            k_len: 0,
        };
        if unsafe { isindexinfo(self.isfd, std::ptr::addr_of_mut!(key), 1) } < 0 {
            return Err("isindexinfo(key #1) failed".to_string());
        }
        Ok(key)
    }

    /// Iterate every record in key-#1 order, handing each one to `sink`.
    fn for_each_record(&self, sink: &mut impl FnMut(&[u8]) -> Result<(), String>) -> Result<usize, String> {
        let key = self.first_key()?;
        let mut buffer = vec![0u8; self.reclen];

        let start = unsafe {
            isstart(
                self.isfd,
                std::ptr::addr_of!(key),
                1,
                buffer.as_ptr().cast::<c_char>(),
                ISFIRST,
            )
        };
        if start < 0 {
            return Err(format!("isstart failed, iserrno={}", unsafe { iserrno }));
        }

        let mut count = 0;
        loop {
            let io = unsafe { isread(self.isfd, buffer.as_mut_ptr().cast::<c_char>(), ISNEXT) };
            if io < 0 {
                break;
            }
            sink(&buffer)?;
            count += 1;
        }
        Ok(count)
    }
}

impl Drop for LegacySource {
    fn drop(&mut self) {
        unsafe {
            isclose(self.isfd);
        }
    }
}

fn read_clonelist(bridge_dir: &str) -> Result<Vec<String>, String> {
    let path = format!("{bridge_dir}/clonelist.def");
    let text = std::fs::read_to_string(&path).map_err(|e| format!("{path}: {e}"))?;
    Ok(pgisam_clone::parse_name_list(&text))
}

fn clone_table(engine: &mut Engine, name: &str) -> Result<usize, String> {
    let handle = engine.build(name).map_err(|e| e.to_string())?;
    let reclen = engine.reclen_for(handle).map_err(|e| e.to_string())?;

    let source = LegacySource::open(name)?;
    if source.reclen != reclen {
        log::warn!(
            "{name}: legacy record size {} does not match schema record size {reclen}",
            source.reclen
        );
    }

    let result = source.for_each_record(&mut |record| {
        engine.write(handle, record).map_err(|e| e.to_string())
    });

    engine.close(handle).map_err(|e| e.to_string())?;
    result
}

fn run() -> Result<(), String> {
    let dry_run = std::env::args().any(|a| a == "--dry-run");
    let mut engine = Engine::from_env().map_err(|e| e.to_string())?;
    if dry_run {
        engine.set_print_only(true).map_err(|e| e.to_string())?;
    }

    let tables: Vec<String> = std::env::args().skip(1).filter(|a| !a.starts_with("--")).collect();
    let tables = if tables.is_empty() {
        read_clonelist(engine.bridge_dir())?
    } else {
        tables
    };

    let mut failures = 0;
    for name in &tables {
        match clone_table(&mut engine, name) {
            Ok(count) => log::info!("{name}: cloned {count} records"),
            Err(error) => {
                log::error!("{name}: {error}");
                failures += 1;
            }
        }
    }

    if failures > 0 {
        Err(format!("{failures} table(s) failed to clone"))
    } else {
        Ok(())
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("pgisam-clone: {error}");
            ExitCode::FAILURE
        }
    }
}
