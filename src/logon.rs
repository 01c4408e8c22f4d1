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

//! Restricted identities.
//!
//! A [`Logon`] is built as one of two variants, the caller's own identity
//! or a freshly authenticated user, and then initialized exactly once at a
//! requested integrity level. Until `init` succeeds every query fails with
//! a usage error; a failed `init` is terminal.

use crate::engine_core::errors::{Result, WincError};
use crate::engine_core::types::IntegrityLevel;
use crate::sys::{self, TokenHandle};
use std::fmt;
use std::sync::OnceLock;
use tracing::warn;

const SID_HEADER_LEN: usize = 8;
const SID_REVISION: u8 = 1;

/// Owned copy of a security identifier.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Sid {
    bytes: Vec<u8>,
}

impl Sid {
    /// Copy and validate the binary SID layout: revision, sub-authority
    /// count, 6-byte authority, then 4 bytes per sub-authority.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < SID_HEADER_LEN {
            return Err(WincError::Sid(format!("SID too short: {} bytes", bytes.len())));
        }
        if bytes[0] != SID_REVISION {
            return Err(WincError::Sid(format!("unsupported SID revision {}", bytes[0])));
        }
        let expected = SID_HEADER_LEN + 4 * bytes[1] as usize;
        if bytes.len() != expected {
            return Err(WincError::Sid(format!(
                "SID length {} does not match {} sub-authorities",
                bytes.len(),
                bytes[1]
            )));
        }
        Ok(Self {
            bytes: bytes.to_vec(),
        })
    }

    /// Primary user SID of the calling process.
    pub fn current_process_user() -> Result<Self> {
        Self::from_bytes(&sys::process_user_sid()?)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn identifier_authority(&self) -> [u8; 6] {
        let mut authority = [0u8; 6];
        authority.copy_from_slice(&self.bytes[2..SID_HEADER_LEN]);
        authority
    }

    pub fn sub_authorities(&self) -> Vec<u32> {
        self.bytes[SID_HEADER_LEN..]
            .chunks_exact(4)
            .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }
}

impl fmt::Debug for Sid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Sid").field(&self.to_hex()).finish()
    }
}

/// Integrity level the calling process currently runs at, read from the
/// RID of its mandatory label.
pub fn process_integrity_level() -> Result<IntegrityLevel> {
    let label = Sid::from_bytes(&sys::process_integrity_sid()?)?;
    label
        .sub_authorities()
        .last()
        .copied()
        .map(IntegrityLevel::from_rid)
        .ok_or_else(|| WincError::Sid("mandatory label has no RID".to_string()))
}

/// Which principal a [`Logon`] produces.
pub enum LogonKind {
    /// The calling process's own token.
    Current,
    /// An interactive logon with the given credentials.
    User { username: String, password: String },
}

impl fmt::Debug for LogonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogonKind::Current => f.write_str("Current"),
            LogonKind::User { username, .. } => f
                .debug_struct("User")
                .field("username", username)
                .finish_non_exhaustive(),
        }
    }
}

struct Established {
    token: TokenHandle,
    level: IntegrityLevel,
    user_sid: OnceLock<Sid>,
    group_sid: OnceLock<Sid>,
}

enum State {
    Uninitialized,
    Initialized(Established),
    Failed,
}

pub struct Logon {
    kind: LogonKind,
    state: State,
}

impl Logon {
    pub fn current() -> Self {
        Self {
            kind: LogonKind::Current,
            state: State::Uninitialized,
        }
    }

    pub fn user(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            kind: LogonKind::User {
                username: username.into(),
                password: password.into(),
            },
            state: State::Uninitialized,
        }
    }

    pub fn kind(&self) -> &LogonKind {
        &self.kind
    }

    /// Acquire the token and lower it to `level`. Callable once.
    pub fn init(&mut self, level: IntegrityLevel) -> Result<()> {
        if !matches!(self.state, State::Uninitialized) {
            return Err(WincError::AlreadyInitialized);
        }

        let token = match &mut self.kind {
            LogonKind::Current => TokenHandle::current(level),
            LogonKind::User { username, password } => {
                let token = TokenHandle::user(username.as_str(), password.as_str(), level);
                // Credentials are not needed past this point.
                password.clear();
                token
            }
        };

        match token {
            Ok(token) => {
                self.state = State::Initialized(Established {
                    token,
                    level,
                    user_sid: OnceLock::new(),
                    group_sid: OnceLock::new(),
                });
                Ok(())
            }
            Err(e) => {
                warn!("Logon {:?} failed: {}", self.kind, e);
                self.state = State::Failed;
                Err(e)
            }
        }
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.state, State::Initialized(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.state, State::Failed)
    }

    pub fn integrity_level(&self) -> Result<IntegrityLevel> {
        Ok(self.established()?.level)
    }

    /// Opaque token handle for the spawner. Remains owned by this logon.
    pub fn token_handle(&self) -> Result<isize> {
        Ok(self.established()?.token.as_raw())
    }

    pub fn user_sid(&self) -> Result<&Sid> {
        let established = self.established()?;
        if let Some(sid) = established.user_sid.get() {
            return Ok(sid);
        }
        let sid = Sid::from_bytes(&established.token.user_sid()?)?;
        Ok(established.user_sid.get_or_init(|| sid))
    }

    pub fn group_sid(&self) -> Result<&Sid> {
        let established = self.established()?;
        if let Some(sid) = established.group_sid.get() {
            return Ok(sid);
        }
        let sid = Sid::from_bytes(&established.token.group_sid()?)?;
        Ok(established.group_sid.get_or_init(|| sid))
    }

    fn established(&self) -> Result<&Established> {
        match &self.state {
            State::Initialized(established) => Ok(established),
            State::Uninitialized | State::Failed => Err(WincError::Uninitialized),
        }
    }
}
