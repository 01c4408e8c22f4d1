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

use crate::engine_core::constants::config::{
    DEFAULT_LOG_FORMAT, DEFAULT_LOG_LEVEL, ENV_INTEGRITY_LEVEL, ENV_LOG_FORMAT, ENV_LOG_LEVEL,
    ENV_PROFILE_PATH,
};
use crate::engine_core::errors::WincError;
use crate::engine_core::types::IntegrityLevel;
use crate::job::limits::{ExtendedLimits, UiRestrictions};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub log_level: String,
    pub log_format: String, // "json" or "text"
    pub integrity_level: IntegrityLevel,
    pub profile_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self, WincError> {
        let integrity_level = match env::var(ENV_INTEGRITY_LEVEL) {
            Ok(raw) => raw.parse()?,
            Err(_) => IntegrityLevel::default(),
        };
        Ok(Self {
            log_level: env::var(ENV_LOG_LEVEL).unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string()),
            log_format: env::var(ENV_LOG_FORMAT)
                .unwrap_or_else(|_| DEFAULT_LOG_FORMAT.to_string()),
            integrity_level,
            profile_path: env::var(ENV_PROFILE_PATH).ok().map(PathBuf::from),
        })
    }

    /// Profile from `profile_path`, or the empty profile when unset.
    pub fn load_profile(&self) -> Result<GroupProfile, WincError> {
        match &self.profile_path {
            Some(path) => GroupProfile::load(path),
            None => Ok(GroupProfile::default()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_format: DEFAULT_LOG_FORMAT.to_string(),
            integrity_level: IntegrityLevel::default(),
            profile_path: None,
        }
    }
}

/// Limits and UI restrictions applied to a job object as one unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GroupProfile {
    pub limits: ExtendedLimits,
    pub ui_restrictions: UiRestrictions,
}

impl GroupProfile {
    pub fn from_yaml_str(content: &str) -> Result<Self, WincError> {
        serde_yaml_ng::from_str(content)
            .map_err(|e| WincError::Config(format!("invalid group profile: {}", e)))
    }

    pub fn load(path: &Path) -> Result<Self, WincError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            WincError::Config(format!("cannot read profile {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&content)
    }
}
