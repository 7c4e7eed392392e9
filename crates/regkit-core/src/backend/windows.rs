//! Live Windows registry backend. All UTF-16 conversion and REG_*
//! payload encoding happens here; the engine above deals only in
//! typed payloads and raw codes.

use std::iter::once;

use regkit_domain::{RootKey, ValueData, ValueType};
use windows_sys::Win32::Foundation::{ERROR_MORE_DATA, ERROR_SUCCESS};
use windows_sys::Win32::System::Registry::{
    RegCloseKey, RegCreateKeyExW, RegDeleteKeyW, RegDeleteValueW, RegEnumKeyExW, RegEnumValueW,
    RegOpenKeyExW, RegQueryValueExW, RegSetValueExW, HKEY, HKEY_CLASSES_ROOT, HKEY_CURRENT_CONFIG,
    HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE, HKEY_USERS, KEY_READ, KEY_WRITE,
    REG_OPTION_NON_VOLATILE,
};

use super::{Access, OsCode, RawHandle, StoreBackend};

// Key names are capped at 255 characters by the store; value names at
// 16383.
const MAX_KEY_NAME: usize = 256;
const MAX_VALUE_NAME: usize = 16384;

/// Stateless backend over the Win32 registry API.
pub struct WindowsBackend;

fn root_handle(root: RootKey) -> HKEY {
    match root {
        RootKey::ClassesRoot => HKEY_CLASSES_ROOT,
        RootKey::CurrentConfig => HKEY_CURRENT_CONFIG,
        RootKey::CurrentUser => HKEY_CURRENT_USER,
        RootKey::LocalMachine => HKEY_LOCAL_MACHINE,
        RootKey::Users => HKEY_USERS,
    }
}

fn raw(handle: HKEY) -> RawHandle {
    RawHandle(handle as usize as u64)
}

fn hkey(handle: RawHandle) -> HKEY {
    handle.0 as usize as HKEY
}

fn check(status: u32) -> Result<(), OsCode> {
    if status == ERROR_SUCCESS {
        Ok(())
    } else {
        Err(OsCode(status as i32))
    }
}

fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(once(0)).collect()
}

fn utf16_bytes(s: &str) -> Vec<u8> {
    s.encode_utf16()
        .chain(once(0))
        .flat_map(u16::to_le_bytes)
        .collect()
}

fn utf16_string(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    // Stored strings usually carry a trailing null; stop at the first.
    let text = units.split(|&unit| unit == 0).next().unwrap_or(&[]);
    String::from_utf16_lossy(text)
}

fn encode(data: &ValueData) -> (u32, Vec<u8>) {
    match data {
        ValueData::String(s) => (ValueType::String.as_raw(), utf16_bytes(s)),
        ValueData::ExpandingString(s) => (ValueType::ExpandingString.as_raw(), utf16_bytes(s)),
        ValueData::Binary(bytes) => (ValueType::Binary.as_raw(), bytes.clone()),
        ValueData::Dword(word) => (ValueType::Dword.as_raw(), word.to_le_bytes().to_vec()),
        ValueData::Unknown { kind, bytes } => (*kind, bytes.clone()),
    }
}

fn decode(kind: u32, bytes: Vec<u8>) -> ValueData {
    match ValueType::from_raw(kind) {
        Some(ValueType::String) => ValueData::String(utf16_string(&bytes)),
        Some(ValueType::ExpandingString) => ValueData::ExpandingString(utf16_string(&bytes)),
        Some(ValueType::Binary) => ValueData::Binary(bytes),
        Some(ValueType::Dword) => {
            let mut word = [0u8; 4];
            for (slot, byte) in word.iter_mut().zip(bytes.iter()) {
                *slot = *byte;
            }
            ValueData::Dword(u32::from_le_bytes(word))
        }
        None => ValueData::Unknown { kind, bytes },
    }
}

fn sam(access: Access) -> u32 {
    match access {
        Access::Read => KEY_READ,
        Access::Write => KEY_READ | KEY_WRITE,
    }
}

impl StoreBackend for WindowsBackend {
    fn open(&self, root: RootKey, path: &str, access: Access) -> Result<RawHandle, OsCode> {
        let subkey = to_wide(path);
        let mut handle: HKEY = std::ptr::null_mut();
        let status = unsafe {
            RegOpenKeyExW(
                root_handle(root),
                subkey.as_ptr(),
                0,
                sam(access),
                &mut handle,
            )
        };
        check(status)?;
        Ok(raw(handle))
    }

    fn create(&self, root: RootKey, path: &str) -> Result<RawHandle, OsCode> {
        let subkey = to_wide(path);
        let mut handle: HKEY = std::ptr::null_mut();
        let status = unsafe {
            RegCreateKeyExW(
                root_handle(root),
                subkey.as_ptr(),
                0,
                std::ptr::null(),
                REG_OPTION_NON_VOLATILE,
                KEY_READ | KEY_WRITE,
                std::ptr::null(),
                &mut handle,
                std::ptr::null_mut(),
            )
        };
        check(status)?;
        Ok(raw(handle))
    }

    fn close(&self, handle: RawHandle) {
        // Nothing sensible to do with a failed close.
        let _ = unsafe { RegCloseKey(hkey(handle)) };
    }

    fn delete_key(&self, parent: RawHandle, name: &str) -> Result<(), OsCode> {
        let name = to_wide(name);
        check(unsafe { RegDeleteKeyW(hkey(parent), name.as_ptr()) })
    }

    fn enum_key_at(&self, handle: RawHandle, index: u32) -> Result<String, OsCode> {
        let mut name = vec![0u16; MAX_KEY_NAME];
        let mut len = name.len() as u32;
        let status = unsafe {
            RegEnumKeyExW(
                hkey(handle),
                index,
                name.as_mut_ptr(),
                &mut len,
                std::ptr::null_mut(),
                std::ptr::null_mut(),
                std::ptr::null_mut(),
                std::ptr::null_mut(),
            )
        };
        check(status)?;
        Ok(String::from_utf16_lossy(&name[..len as usize]))
    }

    fn enum_value_at(&self, handle: RawHandle, index: u32) -> Result<(String, ValueData), OsCode> {
        let mut data = vec![0u8; 256];
        loop {
            let mut name = vec![0u16; MAX_VALUE_NAME];
            let mut name_len = name.len() as u32;
            let mut kind = 0u32;
            let mut data_len = data.len() as u32;
            let status = unsafe {
                RegEnumValueW(
                    hkey(handle),
                    index,
                    name.as_mut_ptr(),
                    &mut name_len,
                    std::ptr::null_mut(),
                    &mut kind,
                    data.as_mut_ptr(),
                    &mut data_len,
                )
            };
            if status == ERROR_MORE_DATA {
                data.resize(data_len as usize, 0);
                continue;
            }
            check(status)?;
            data.truncate(data_len as usize);
            let name = String::from_utf16_lossy(&name[..name_len as usize]);
            return Ok((name, decode(kind, data)));
        }
    }

    fn query_value(&self, handle: RawHandle, name: &str) -> Result<ValueData, OsCode> {
        let name = to_wide(name);
        let mut data = Vec::new();
        loop {
            let mut kind = 0u32;
            let mut data_len = data.len() as u32;
            let status = unsafe {
                RegQueryValueExW(
                    hkey(handle),
                    name.as_ptr(),
                    std::ptr::null_mut(),
                    &mut kind,
                    if data.is_empty() {
                        std::ptr::null_mut()
                    } else {
                        data.as_mut_ptr()
                    },
                    &mut data_len,
                )
            };
            // First pass sizes the buffer; a concurrent writer can
            // grow the value between passes, hence the loop.
            if status == ERROR_MORE_DATA || (status == ERROR_SUCCESS && data.is_empty() && data_len > 0)
            {
                data = vec![0u8; data_len as usize];
                continue;
            }
            check(status)?;
            data.truncate(data_len as usize);
            return Ok(decode(kind, data));
        }
    }

    fn set_value(&self, handle: RawHandle, name: &str, data: &ValueData) -> Result<(), OsCode> {
        let name = to_wide(name);
        let (kind, bytes) = encode(data);
        let status = unsafe {
            RegSetValueExW(
                hkey(handle),
                name.as_ptr(),
                0,
                kind,
                bytes.as_ptr(),
                bytes.len() as u32,
            )
        };
        check(status)
    }

    fn delete_value(&self, handle: RawHandle, name: &str) -> Result<(), OsCode> {
        let name = to_wide(name);
        check(unsafe { RegDeleteValueW(hkey(handle), name.as_ptr()) })
    }
}
