//! Command Resolver
//!
//! Maps abstract package actions onto concrete, sudo-prefixed command lines per
//! package manager. Pure lookup; nothing here runs a process.

use crate::action::Action;
use crate::pm::PackageManagerKind;

/// Prefix on every synthesized package-manager command.
/// `-k` drops cached credentials so each run asks for the password again.
const SUDO: [&str; 2] = ["sudo", "-k"];

fn sudo_line(parts: &[&str], package: Option<&str>) -> Vec<String> {
    SUDO.iter()
        .chain(parts.iter())
        .copied()
        .chain(package)
        .map(str::to_string)
        .collect()
}

/// Install command for a package, `None` for unsupported managers
pub fn install_command(manager: PackageManagerKind, package: &str) -> Option<Vec<String>> {
    let parts: &[&str] = match manager {
        PackageManagerKind::Apt => &["apt", "install", "-y"],
        PackageManagerKind::Pacman => &["pacman", "-S", "--noconfirm"],
        PackageManagerKind::Dnf => &["dnf", "install", "-y"],
        PackageManagerKind::Zypper => &["zypper", "install", "-y"],
        PackageManagerKind::Emerge => &["emerge", "--ask"],
        PackageManagerKind::Manual => return None,
    };
    Some(sudo_line(parts, Some(package)))
}

/// Remove command for a package, `None` for unsupported managers
pub fn remove_command(manager: PackageManagerKind, package: &str) -> Option<Vec<String>> {
    let parts: &[&str] = match manager {
        PackageManagerKind::Apt => &["apt", "remove", "-y"],
        PackageManagerKind::Pacman => &["pacman", "-R", "--noconfirm"],
        PackageManagerKind::Dnf => &["dnf", "remove", "-y"],
        PackageManagerKind::Zypper => &["zypper", "remove", "-y"],
        PackageManagerKind::Emerge => &["emerge", "--ask", "--depclean"],
        PackageManagerKind::Manual => return None,
    };
    Some(sudo_line(parts, Some(package)))
}

/// Full system update as an ordered list of separate commands.
///
/// Each entry runs on its own; later entries assume earlier ones succeeded
/// (index sync before upgrade). Empty for unsupported managers.
pub fn update_commands(manager: PackageManagerKind) -> Vec<Vec<String>> {
    let steps: &[&[&str]] = match manager {
        PackageManagerKind::Apt => &[&["apt", "update"], &["apt", "upgrade", "-y"]],
        PackageManagerKind::Pacman => &[&["pacman", "-Syu"]],
        PackageManagerKind::Dnf => &[&["dnf", "upgrade", "-y"]],
        PackageManagerKind::Zypper => &[&["zypper", "update", "-y"]],
        PackageManagerKind::Emerge => &[
            &["emaint", "sync", "-a"],
            &["emerge", "--ask", "--update", "--deep", "--newuse", "@world"],
        ],
        PackageManagerKind::Manual => &[],
    };
    steps.iter().map(|parts| sudo_line(parts, None)).collect()
}

/// Resolve a package action to its command line.
///
/// Only install/remove go through the table; every other action kind yields
/// `None` (run_command tokens are already concrete).
pub fn resolve(manager: PackageManagerKind, action: &Action) -> Option<Vec<String>> {
    match action {
        Action::InstallPackage { package, .. } => install_command(manager, package),
        Action::RemovePackage { package, .. } => remove_command(manager, package),
        Action::ReadFile { .. }
        | Action::EditFile { .. }
        | Action::CreateFile { .. }
        | Action::RunCommand { .. }
        | Action::Unknown { .. } => None,
    }
}

/// Whether a command line already runs through sudo
pub fn is_elevated(command: &[String]) -> bool {
    command.first().map(|c| c == "sudo").unwrap_or(false)
}

/// Root-wrapped form of an arbitrary command, `None` if it is already elevated
pub fn elevate(command: &[String]) -> Option<Vec<String>> {
    if command.is_empty() || is_elevated(command) {
        return None;
    }
    Some(sudo_line(&[], None).into_iter().chain(command.iter().cloned()).collect())
}
