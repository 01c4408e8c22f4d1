// Copyright 2026 BadCompany
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::ffi::c_void;
use std::mem::size_of;

use tracing::{debug, warn};
use windows::core::{HRESULT, PCWSTR};
use windows::Win32::Foundation::HANDLE;
use windows::Win32::Security::{
    AllocateAndInitializeSid, DuplicateTokenEx, FreeSid, GetLengthSid, GetTokenInformation,
    IsValidSid, LogonUserW, SecurityImpersonation, SetTokenInformation, TokenIntegrityLevel,
    TokenPrimary, TokenPrimaryGroup, TokenUser, LOGON32_LOGON_INTERACTIVE,
    LOGON32_PROVIDER_DEFAULT, PSID, SID_AND_ATTRIBUTES, SID_IDENTIFIER_AUTHORITY,
    TOKEN_ALL_ACCESS, TOKEN_DUPLICATE, TOKEN_INFORMATION_CLASS, TOKEN_MANDATORY_LABEL,
    TOKEN_PRIMARY_GROUP, TOKEN_QUERY, TOKEN_USER,
};
use windows::Win32::System::Threading::{GetCurrentProcess, OpenProcessToken};

use super::handle::Handle;
use crate::engine_core::constants::{integrity, win32};
use crate::engine_core::errors::{Result, WincError};
use crate::engine_core::types::IntegrityLevel;

fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

fn logon_error(call: &'static str) -> impl FnOnce(windows::core::Error) -> WincError {
    move |e| {
        if e.code() == HRESULT::from_win32(win32::ERROR_PRIVILEGE_NOT_HELD) {
            warn!("{} requires a privilege the caller does not hold", call);
            WincError::PrivilegeNotHeld(format!("{} failed: {}", call, e))
        } else {
            WincError::Logon(format!("{} failed: {}", call, e))
        }
    }
}

/// Mandatory label SID S-1-16-RID, freed on drop.
struct LabelSid(PSID);

impl LabelSid {
    fn new(level: IntegrityLevel) -> Result<Self> {
        let authority = SID_IDENTIFIER_AUTHORITY {
            Value: integrity::LABEL_AUTHORITY,
        };
        let mut sid = PSID::default();
        unsafe {
            AllocateAndInitializeSid(&authority, 1, level.rid(), 0, 0, 0, 0, 0, 0, 0, &mut sid)
        }
        .map_err(logon_error("AllocateAndInitializeSid"))?;
        Ok(Self(sid))
    }
}

impl Drop for LabelSid {
    fn drop(&mut self) {
        if !self.0.is_invalid() {
            unsafe {
                let _ = FreeSid(self.0);
            }
        }
    }
}

/// Primary access token.
pub struct TokenHandle {
    handle: Handle,
}

impl TokenHandle {
    /// Duplicate of the calling process's token at `level`.
    pub fn current(level: IntegrityLevel) -> Result<Self> {
        let process_token = open_process_token(TOKEN_DUPLICATE | TOKEN_QUERY)
            .map_err(logon_error("OpenProcessToken"))?;

        let mut duplicate = HANDLE::default();
        unsafe {
            DuplicateTokenEx(
                process_token.get(),
                TOKEN_ALL_ACCESS,
                None,
                SecurityImpersonation,
                TokenPrimary,
                &mut duplicate,
            )
        }
        .map_err(logon_error("DuplicateTokenEx"))?;

        let token = Self {
            handle: Handle::new(duplicate),
        };
        token.set_integrity(level)?;
        debug!("Duplicated process token at {} integrity", level);
        Ok(token)
    }

    /// Interactive logon for `username` (`user`, `DOMAIN\user` or `user@domain`).
    pub fn user(username: &str, password: &str, level: IntegrityLevel) -> Result<Self> {
        let (domain, account) = match username.split_once('\\') {
            Some((domain, account)) => (Some(domain), account),
            None if username.contains('@') => (None, username),
            None => (Some("."), username),
        };
        let account_w = wide(account);
        let domain_w = domain.map(wide);
        let password_w = wide(password);

        let mut token = HANDLE::default();
        unsafe {
            LogonUserW(
                PCWSTR(account_w.as_ptr()),
                domain_w
                    .as_ref()
                    .map_or(PCWSTR::null(), |d| PCWSTR(d.as_ptr())),
                PCWSTR(password_w.as_ptr()),
                LOGON32_LOGON_INTERACTIVE,
                LOGON32_PROVIDER_DEFAULT,
                &mut token,
            )
        }
        .map_err(logon_error("LogonUserW"))?;

        let token = Self {
            handle: Handle::new(token),
        };
        token.set_integrity(level)?;
        debug!("Logged on '{}' at {} integrity", account, level);
        Ok(token)
    }

    pub fn as_raw(&self) -> isize {
        self.handle.as_raw()
    }

    pub fn user_sid(&self) -> Result<Vec<u8>> {
        token_user_sid(self.handle.get())
    }

    pub fn group_sid(&self) -> Result<Vec<u8>> {
        let buffer = query_token(self.handle.get(), TokenPrimaryGroup)?;
        let info = buffer.as_ptr() as *const TOKEN_PRIMARY_GROUP;
        // SAFETY: the host filled `buffer` with a TOKEN_PRIMARY_GROUP whose SID points inside it.
        copy_sid(unsafe { (*info).PrimaryGroup })
    }

    fn set_integrity(&self, level: IntegrityLevel) -> Result<()> {
        let label = LabelSid::new(level)?;
        let mandatory = TOKEN_MANDATORY_LABEL {
            Label: SID_AND_ATTRIBUTES {
                Sid: label.0,
                Attributes: integrity::SE_GROUP_INTEGRITY,
            },
        };
        let size = size_of::<TOKEN_MANDATORY_LABEL>() as u32 + unsafe { GetLengthSid(label.0) };
        unsafe {
            SetTokenInformation(
                self.handle.get(),
                TokenIntegrityLevel,
                &mandatory as *const TOKEN_MANDATORY_LABEL as *const c_void,
                size,
            )
        }
        .map_err(logon_error("SetTokenInformation(integrity)"))
    }
}

/// Primary user SID of the calling process, without duplicating its token.
pub fn process_user_sid() -> Result<Vec<u8>> {
    let token = open_process_token(TOKEN_QUERY)
        .map_err(|e| WincError::Sid(format!("OpenProcessToken failed: {}", e)))?;
    token_user_sid(token.get())
}

/// Mandatory label SID (S-1-16-RID) of the calling process's token.
pub fn process_integrity_sid() -> Result<Vec<u8>> {
    let token = open_process_token(TOKEN_QUERY)
        .map_err(|e| WincError::Sid(format!("OpenProcessToken failed: {}", e)))?;
    let buffer = query_token(token.get(), TokenIntegrityLevel)?;
    let info = buffer.as_ptr() as *const TOKEN_MANDATORY_LABEL;
    // SAFETY: the host filled `buffer` with a TOKEN_MANDATORY_LABEL whose SID points inside it.
    copy_sid(unsafe { (*info).Label.Sid })
}

fn open_process_token(
    access: windows::Win32::Security::TOKEN_ACCESS_MASK,
) -> windows::core::Result<Handle> {
    let mut token = HANDLE::default();
    unsafe { OpenProcessToken(GetCurrentProcess(), access, &mut token) }?;
    Ok(Handle::new(token))
}

fn token_user_sid(token: HANDLE) -> Result<Vec<u8>> {
    let buffer = query_token(token, TokenUser)?;
    let info = buffer.as_ptr() as *const TOKEN_USER;
    // SAFETY: the host filled `buffer` with a TOKEN_USER whose SID points inside it.
    copy_sid(unsafe { (*info).User.Sid })
}

/// Variable-length token information in a pointer-aligned buffer.
fn query_token(token: HANDLE, class: TOKEN_INFORMATION_CLASS) -> Result<Vec<u64>> {
    let mut needed = 0u32;
    // The sizing call always fails with ERROR_INSUFFICIENT_BUFFER.
    let _ = unsafe { GetTokenInformation(token, class, None, 0, &mut needed) };
    if needed == 0 {
        return Err(WincError::Sid(
            "GetTokenInformation returned no size".to_string(),
        ));
    }

    let mut buffer = vec![0u64; (needed as usize).div_ceil(size_of::<u64>())];
    unsafe {
        GetTokenInformation(
            token,
            class,
            Some(buffer.as_mut_ptr() as *mut c_void),
            needed,
            &mut needed,
        )
    }
    .map_err(|e| WincError::Sid(format!("GetTokenInformation failed: {}", e)))?;
    Ok(buffer)
}

fn copy_sid(sid: PSID) -> Result<Vec<u8>> {
    if sid.is_invalid() || !unsafe { IsValidSid(sid) }.as_bool() {
        return Err(WincError::Sid("token returned an invalid SID".to_string()));
    }
    let len = unsafe { GetLengthSid(sid) } as usize;
    // SAFETY: a valid SID spans exactly GetLengthSid bytes.
    let bytes = unsafe { std::slice::from_raw_parts(sid.0 as *const u8, len) };
    Ok(bytes.to_vec())
}
