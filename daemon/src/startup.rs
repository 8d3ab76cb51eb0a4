/// Launch-at-login registration via the `HKCU\...\Run` registry key.
///
/// `--register-startup` writes the daemon's own path under the `AutoHdr`
/// value so Windows starts it on user login; `--unregister-startup` removes
/// the value again. Both are idempotent.
///
/// On non-Windows platforms both functions compile and succeed as no-ops.
use anyhow::Result;

#[cfg(windows)]
mod imp {
    use anyhow::{bail, Result};
    use windows::core::PCWSTR;
    use windows::Win32::Foundation::ERROR_SUCCESS;
    use windows::Win32::System::Registry::{
        RegCloseKey, RegCreateKeyExW, RegDeleteValueW, RegOpenKeyExW, RegSetValueExW, HKEY,
        HKEY_CURRENT_USER, KEY_SET_VALUE, REG_OPTION_NON_VOLATILE, REG_SZ,
    };

    const RUN_KEY: &str = r"Software\Microsoft\Windows\CurrentVersion\Run";
    const VALUE_NAME: &str = "AutoHdr";
    const ERROR_FILE_NOT_FOUND_CODE: u32 = 2;

    fn wide(s: &str) -> Vec<u16> {
        s.encode_utf16().chain(std::iter::once(0)).collect()
    }

    /// Writes `exe_path` as the `AutoHdr` value under the Run key, creating
    /// the key if it does not exist yet.
    pub fn write_run_value(exe_path: &str) -> Result<()> {
        let key_w = wide(RUN_KEY);
        let value_w = wide(VALUE_NAME);
        let data_w = wide(exe_path);

        let mut hkey = HKEY::default();
        let opened = unsafe {
            RegCreateKeyExW(
                HKEY_CURRENT_USER,
                PCWSTR::from_raw(key_w.as_ptr()),
                0,
                PCWSTR::null(),
                REG_OPTION_NON_VOLATILE,
                KEY_SET_VALUE,
                None,
                &mut hkey,
                None,
            )
        };
        if opened != ERROR_SUCCESS {
            bail!("Opening the Run key failed: {opened:?}");
        }

        // REG_SZ data is the UTF-16 buffer including its null terminator.
        let data: &[u8] = unsafe {
            std::slice::from_raw_parts(data_w.as_ptr() as *const u8, data_w.len() * 2)
        };
        let written = unsafe {
            RegSetValueExW(hkey, PCWSTR::from_raw(value_w.as_ptr()), 0, REG_SZ, Some(data))
        };
        unsafe {
            let _ = RegCloseKey(hkey);
        }

        if written != ERROR_SUCCESS {
            bail!("Writing the {VALUE_NAME} run value failed: {written:?}");
        }
        Ok(())
    }

    /// Deletes the `AutoHdr` value. A missing key or value counts as success.
    pub fn delete_run_value() -> Result<()> {
        let key_w = wide(RUN_KEY);
        let value_w = wide(VALUE_NAME);

        let mut hkey = HKEY::default();
        let opened = unsafe {
            RegOpenKeyExW(
                HKEY_CURRENT_USER,
                PCWSTR::from_raw(key_w.as_ptr()),
                0,
                KEY_SET_VALUE,
                &mut hkey,
            )
        };
        if opened != ERROR_SUCCESS {
            return Ok(());
        }

        let deleted = unsafe { RegDeleteValueW(hkey, PCWSTR::from_raw(value_w.as_ptr())) };
        unsafe {
            let _ = RegCloseKey(hkey);
        }

        if deleted != ERROR_SUCCESS && deleted.0 != ERROR_FILE_NOT_FOUND_CODE {
            bail!("Deleting the {VALUE_NAME} run value failed: {deleted:?}");
        }
        Ok(())
    }
}

/// Registers the running daemon binary to launch automatically at user login.
pub fn register_startup() -> Result<()> {
    #[cfg(windows)]
    {
        let exe = std::env::current_exe()
            .map_err(|e| anyhow::anyhow!("Failed to locate daemon executable: {e}"))?;
        let exe_str = exe.to_string_lossy();
        imp::write_run_value(&exe_str)?;
        println!("[startup] Registered in Windows startup: {exe_str}");
    }
    Ok(())
}

/// Removes the daemon from the Windows startup registry.
pub fn unregister_startup() -> Result<()> {
    #[cfg(windows)]
    {
        imp::delete_run_value()?;
        println!("[startup] Removed from Windows startup registry");
    }
    Ok(())
}
