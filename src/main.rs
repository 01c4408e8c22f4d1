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

// Diagnostic entry point for the winc containment engine
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use winc::config::{Config, GroupProfile};
use winc::{IntegrityLevel, Logon, ProcessId, ResourceGroup, Target};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Initialize an identity and print its SIDs as hex.
    Whoami {
        /// Integrity level to lower the token to (e.g. "low", "medium", "0x1000")
        #[arg(long)]
        integrity: Option<IntegrityLevel>,

        /// Log on as this user instead of using the current identity
        #[arg(long, requires = "password")]
        user: Option<String>,

        #[arg(long)]
        password: Option<String>,
    },

    /// Print the effective job profile as JSON.
    Profile {
        /// Path to a profile YAML file
        #[arg(long)]
        path: Option<PathBuf>,
    },

    /// Create a job with the profile, subscribe to its events and print accounting.
    Probe {
        /// Path to a profile YAML file
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

struct LoggingTarget;

impl Target for LoggingTarget {
    fn on_active_process_limit(&self) {
        info!("job event: active process limit");
    }
    fn on_exit_all(&self) {
        info!("job event: all processes exited");
    }
    fn on_new_process(&self, pid: ProcessId) {
        info!("job event: new process {}", pid);
    }
    fn on_exit_process(&self, pid: ProcessId) {
        info!("job event: process {} exited", pid);
    }
    fn on_memory_limit(&self, pid: ProcessId) {
        info!("job event: memory limit hit by {}", pid);
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::from_env().unwrap_or_else(|e| {
        eprintln!(
            "Warning: Failed to load config from env, using defaults: {}",
            e
        );
        Config::default()
    });
    init_tracing(&config);
    install_panic_hook();

    match cli.command {
        Command::Whoami {
            integrity,
            user,
            password,
        } => {
            let level = integrity.unwrap_or(config.integrity_level);
            let mut logon = match user {
                Some(user) => Logon::user(user, password.unwrap_or_default()),
                None => Logon::current(),
            };
            logon.init(level).context("logon failed")?;
            println!("integrity: {}", level);
            println!("user_sid:  {}", logon.user_sid()?.to_hex());
            println!("group_sid: {}", logon.group_sid()?.to_hex());
        }
        Command::Profile { path } => {
            let profile = resolve_profile(&config, path)?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
        Command::Probe { path } => {
            let profile = resolve_profile(&config, path)?;
            let group = ResourceGroup::with_profile(&profile).context("job setup failed")?;
            let target: Arc<dyn Target> = Arc::new(LoggingTarget);
            group
                .associate_notifications(&target)
                .context("event subscription failed")?;
            info!("Probing job {}", group.completion_key());
            println!("{}", serde_json::to_string_pretty(&group.accounting()?)?);
            group.deassociate_notifications();
        }
    }

    Ok(())
}

fn resolve_profile(config: &Config, path: Option<PathBuf>) -> anyhow::Result<GroupProfile> {
    let profile = match path {
        Some(path) => GroupProfile::load(&path)?,
        None => config.load_profile()?,
    };
    Ok(profile)
}

// Target callbacks run on the listener thread where panics are caught; record them in the log.
fn install_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        let location = panic_info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let message = panic_info
            .payload()
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| panic_info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        let thread = std::thread::current();
        error!(
            "panic in thread '{}': {} at {}",
            thread.name().unwrap_or("unnamed"),
            message,
            location
        );
    }));
}

fn init_tracing(config: &Config) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("winc=debug,info"));

    let subscriber = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr);

    if config.log_format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
