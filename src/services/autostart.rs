//! 登录时自动启动（XDG autostart / macOS LaunchAgent）

use crate::error::AutostartError;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[cfg(target_os = "macos")]
const LAUNCH_AGENT_ID: &str = "com.cpuwatchdog";

pub struct Autostart {
    entry_path: PathBuf,
    executable: PathBuf,
}

impl Autostart {
    pub fn new(entry_path: impl Into<PathBuf>, executable: impl Into<PathBuf>) -> Self {
        Self {
            entry_path: entry_path.into(),
            executable: executable.into(),
        }
    }

    /// 当前用户、当前可执行文件
    pub fn for_current_user() -> Result<Self, AutostartError> {
        let dirs = directories::BaseDirs::new().ok_or(AutostartError::NoHome)?;
        let executable = std::env::current_exe().map_err(AutostartError::Executable)?;
        Ok(Self::new(default_entry_path(&dirs), executable))
    }

    pub fn entry_path(&self) -> &Path {
        &self.entry_path
    }

    pub fn is_enabled(&self) -> bool {
        self.entry_path.exists()
    }

    pub fn set_launch_on_login(&self, enabled: bool) -> Result<(), AutostartError> {
        if enabled {
            self.enable()
        } else {
            self.disable()
        }
    }

    fn enable(&self) -> Result<(), AutostartError> {
        let io_err = |source| AutostartError::Io {
            path: self.entry_path.clone(),
            source,
        };
        if let Some(parent) = self.entry_path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(&self.entry_path, entry_contents(&self.executable)).map_err(io_err)?;
        log::info!("Launch on login enabled: {}", self.entry_path.display());
        Ok(())
    }

    fn disable(&self) -> Result<(), AutostartError> {
        match fs::remove_file(&self.entry_path) {
            Ok(()) => {
                log::info!("Launch on login disabled: {}", self.entry_path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(AutostartError::Io {
                path: self.entry_path.clone(),
                source,
            }),
        }
    }
}

#[cfg(target_os = "macos")]
fn default_entry_path(dirs: &directories::BaseDirs) -> PathBuf {
    dirs.home_dir()
        .join("Library/LaunchAgents")
        .join(format!("{}.plist", LAUNCH_AGENT_ID))
}

#[cfg(not(target_os = "macos"))]
fn default_entry_path(dirs: &directories::BaseDirs) -> PathBuf {
    dirs.config_dir().join("autostart").join("cpu-watchdog.desktop")
}

#[cfg(target_os = "macos")]
fn entry_contents(executable: &Path) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>Label</key>
    <string>{}</string>
    <key>ProgramArguments</key>
    <array>
        <string>{}</string>
    </array>
    <key>RunAtLoad</key>
    <true/>
    <key>KeepAlive</key>
    <false/>
</dict>
</plist>
"#,
        LAUNCH_AGENT_ID,
        xml_escape(&executable.display().to_string())
    )
}

#[cfg(target_os = "macos")]
fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(not(target_os = "macos"))]
fn entry_contents(executable: &Path) -> String {
    format!(
        "[Desktop Entry]\n\
         Type=Application\n\
         Name=CPU Watchdog\n\
         Comment=Monitor CPU usage and warn about runaway processes\n\
         Exec=\"{}\"\n\
         Icon=utilities-system-monitor\n\
         Terminal=false\n\
         Categories=System;Monitor;\n\
         StartupNotify=false\n",
        executable.display()
    )
}
