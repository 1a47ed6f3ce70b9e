//! First-run setup wizard
//!
//! Asks for the host details the planner needs, offering detected values as
//! defaults, and returns a config ready to be saved.

use crate::approval_ui::prompt_yes_no;
use std::io::{self, BufRead, Write};
use systemai_common::pm::detect_distro_family;
use systemai_common::{ConfigError, PackageManagerKind, SystemAiConfig};

/// Detected values offered as defaults
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WizardDefaults {
    pub distro_family: String,
    pub package_manager: PackageManagerKind,
    pub shell: String,
    pub editor: String,
}

impl WizardDefaults {
    /// Probe the host
    pub fn detect() -> Self {
        let shell = std::env::var("SHELL")
            .ok()
            .and_then(|s| s.rsplit('/').next().map(str::to_string))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "bash".to_string());
        let editor = std::env::var("EDITOR")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "nano".to_string());

        Self {
            distro_family: detect_distro_family(),
            package_manager: PackageManagerKind::detect(),
            shell,
            editor,
        }
    }
}

/// Read a line, falling back to `default` on empty input or EOF
fn ask<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    question: &str,
    default: &str,
) -> io::Result<String> {
    write!(out, "{} [{}]: ", question, default)?;
    out.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    let answer = line.trim();
    Ok(if answer.is_empty() {
        default.to_string()
    } else {
        answer.to_string()
    })
}

/// Starting values for a re-run of the wizard.
/// An unreadable config is reported and replaced by the defaults, since the
/// wizard is about to overwrite it anyway.
pub fn setup_base(loaded: Result<Option<SystemAiConfig>, ConfigError>) -> SystemAiConfig {
    match loaded {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(error = %e, "existing configuration unusable, starting from defaults");
            SystemAiConfig::default()
        }
    }
}

/// Run the wizard over arbitrary input and output
pub fn run_wizard<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    defaults: &WizardDefaults,
    base: SystemAiConfig,
) -> io::Result<SystemAiConfig> {
    writeln!(out, "🧠 SystemAI first-run setup")?;
    writeln!(out, "Press Enter to accept the value in brackets.\n")?;

    let distro_family = ask(
        input,
        out,
        "Distro family (debian/arch/fedora/suse/gentoo/other)",
        &defaults.distro_family,
    )?;

    let package_manager = loop {
        let answer = ask(
            input,
            out,
            "Package manager (apt/pacman/dnf/zypper/emerge/manual)",
            defaults.package_manager.as_str(),
        )?;
        match answer.parse::<PackageManagerKind>() {
            Ok(pm) => break pm,
            Err(e) => writeln!(out, "  {}", e)?,
        }
    };

    let shell = ask(input, out, "Shell (bash/zsh/fish/other)", &defaults.shell)?;
    let editor = ask(input, out, "Editor (nano/vim/micro/other)", &defaults.editor)?;
    let allow_root_suggest = prompt_yes_no(input, out, "Allow root suggestions?")?;
    let allow_root_execute = prompt_yes_no(input, out, "Allow root execution?")?;

    tracing::info!(%package_manager, %distro_family, "wizard completed");

    Ok(SystemAiConfig {
        distro_family,
        package_manager,
        shell,
        editor,
        allow_root_suggest,
        allow_root_execute,
        ..base
    })
}
