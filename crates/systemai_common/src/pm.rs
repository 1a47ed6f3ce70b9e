//! Package manager kinds and host detection
//!
//! Detection is a static probe-and-lookup table: the first package manager
//! found on PATH wins, and the distro family comes from /etc/os-release.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::process::{Command, Stdio};
use std::str::FromStr;

/// Supported package managers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManagerKind {
    /// No supported package manager; package actions are skipped
    Manual,
    Apt,
    Pacman,
    Dnf,
    Zypper,
    Emerge,
}

impl Default for PackageManagerKind {
    fn default() -> Self {
        Self::Manual
    }
}

/// Probe order used by `detect`
const PROBE_ORDER: &[PackageManagerKind] = &[
    PackageManagerKind::Apt,
    PackageManagerKind::Pacman,
    PackageManagerKind::Dnf,
    PackageManagerKind::Zypper,
    PackageManagerKind::Emerge,
];

impl PackageManagerKind {
    pub const ALL: &'static [PackageManagerKind] = &[
        PackageManagerKind::Manual,
        PackageManagerKind::Apt,
        PackageManagerKind::Pacman,
        PackageManagerKind::Dnf,
        PackageManagerKind::Zypper,
        PackageManagerKind::Emerge,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Apt => "apt",
            Self::Pacman => "pacman",
            Self::Dnf => "dnf",
            Self::Zypper => "zypper",
            Self::Emerge => "emerge",
        }
    }

    /// Binary probed on PATH for this manager
    fn binary(&self) -> Option<&'static str> {
        match self {
            Self::Manual => None,
            other => Some(other.as_str()),
        }
    }

    /// Detect the host's package manager
    pub fn detect() -> Self {
        Self::detect_with(check_command_exists)
    }

    /// Detection against an arbitrary probe
    pub fn detect_with<F>(mut has_command: F) -> Self
    where
        F: FnMut(&str) -> bool,
    {
        PROBE_ORDER
            .iter()
            .copied()
            .find(|pm| pm.binary().map(&mut has_command).unwrap_or(false))
            .unwrap_or(Self::Manual)
    }
}

impl fmt::Display for PackageManagerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PackageManagerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|pm| pm.as_str() == wanted)
            .ok_or_else(|| {
                format!(
                    "unknown package manager '{}' (expected one of: manual, apt, pacman, dnf, zypper, emerge)",
                    s.trim()
                )
            })
    }
}

/// Check if a command exists on PATH
fn check_command_exists(cmd: &str) -> bool {
    Command::new("which")
        .arg(cmd)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Detect the distro family from /etc/os-release
pub fn detect_distro_family() -> String {
    std::fs::read_to_string("/etc/os-release")
        .map(|text| distro_family_from_os_release(&text).to_string())
        .unwrap_or_else(|_| "other".to_string())
}

/// Map os-release text to a distro family.
///
/// `ID_LIKE` wins over `ID` so derivatives land in their parent family.
pub fn distro_family_from_os_release(text: &str) -> &'static str {
    let field = |key: &str| -> Option<String> {
        text.lines()
            .filter_map(|line| line.split_once('='))
            .find(|(k, _)| k.trim() == key)
            .map(|(_, v)| v.trim().trim_matches('"').to_lowercase())
    };

    let candidates = field("ID_LIKE")
        .into_iter()
        .flat_map(|v| v.split_whitespace().map(str::to_string).collect::<Vec<_>>())
        .chain(field("ID"));

    for id in candidates {
        let family = match id.as_str() {
            "debian" | "ubuntu" => "debian",
            "arch" | "archlinux" => "arch",
            "fedora" | "rhel" | "centos" => "fedora",
            "suse" | "opensuse" | "opensuse-leap" | "opensuse-tumbleweed" => "suse",
            "gentoo" => "gentoo",
            _ => continue,
        };
        return family;
    }

    "other"
}
