//! TOML-backed `DefenseProvider`.
//!
//! Instructions are returned with a header naming their stance, and vaccine
//! messages carry `source = "vaccine"` and `stance` metadata, so anything
//! reading an agent's prompt or memory can tell which measures it was given.

use std::path::Path;

use tracing::{debug, warn};

use outbreak_contracts::{
    defense::{DefenseMode, Stance},
    error::{OutbreakError, OutbreakResult},
    message::{Message, META_SOURCE},
};
use outbreak_core::traits::DefenseProvider;

use crate::config::DefenseConfig;

/// Heading placed above every defense instruction.
pub const INSTRUCTION_HEADER: &str = "## Safety protocol";

/// `source` metadata value on vaccine messages.
pub const VACCINE_SOURCE: &str = "vaccine";

/// Metadata key holding the stance of a vaccine message.
pub const META_STANCE: &str = "stance";

const BUILTIN: &str = include_str!("../defenses/builtin.toml");

/// A `DefenseProvider` that reads its measures from a TOML document.
///
/// ```rust,ignore
/// let provider = TomlDefenseProvider::from_file(Path::new("defenses/custom.toml"))?;
/// ```
#[derive(Debug, Clone)]
pub struct TomlDefenseProvider {
    config: DefenseConfig,
}

impl TomlDefenseProvider {
    /// Parse `s` as TOML defense configuration.
    pub fn from_toml_str(s: &str) -> OutbreakResult<Self> {
        let config: DefenseConfig = toml::from_str(s).map_err(|e| OutbreakError::ConfigError {
            reason: format!("failed to parse defense TOML: {}", e),
        })?;
        Ok(Self { config })
    }

    pub fn from_file(path: &Path) -> OutbreakResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| OutbreakError::ConfigError {
            reason: format!("failed to read defense file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// The measures shipped with the simulator.
    pub fn builtin() -> OutbreakResult<Self> {
        Self::from_toml_str(BUILTIN)
    }

    pub fn config(&self) -> &DefenseConfig {
        &self.config
    }
}

impl DefenseProvider for TomlDefenseProvider {
    fn instruction(&self, mode: DefenseMode) -> OutbreakResult<Option<String>> {
        let Some(stance) = mode.instruction() else {
            return Ok(None);
        };
        let text = self
            .config
            .instruction
            .for_stance(stance)
            .ok_or_else(|| OutbreakError::ConfigError {
                reason: format!("defense mode '{}' needs a {} instruction, none configured", mode, stance),
            })?;
        debug!(%mode, %stance, "instruction defense selected");
        Ok(Some(format!("{} ({})\n{}", INSTRUCTION_HEADER, stance, text.trim())))
    }

    fn vaccine(&self, mode: DefenseMode) -> OutbreakResult<Vec<Message>> {
        let Some(stance) = mode.vaccine() else {
            return Ok(Vec::new());
        };
        let entries = self.config.vaccine.for_stance(stance);
        if entries.is_empty() {
            warn!(%mode, %stance, "vaccine defense selected but no examples configured");
        }
        Ok(entries
            .iter()
            .map(|entry| {
                Message::new(entry.role, entry.content.clone(), 0)
                    .with_metadata(META_SOURCE, VACCINE_SOURCE)
                    .with_metadata(META_STANCE, stance.to_string())
            })
            .collect())
    }
}

/// The strongest defense stance visible to an agent, from its system prompt
/// and remembered messages.
pub fn observed_stance(system_prompt: &str, history: &[Message]) -> Option<Stance> {
    let from_prompt = if system_prompt.contains(&format!("{} (active)", INSTRUCTION_HEADER)) {
        Some(Stance::Active)
    } else if system_prompt.contains(&format!("{} (passive)", INSTRUCTION_HEADER)) {
        Some(Stance::Passive)
    } else {
        None
    };

    let from_memory = history
        .iter()
        .filter(|m| m.source() == Some(VACCINE_SOURCE))
        .filter_map(|m| m.metadata.get(META_STANCE).and_then(|v| v.as_str()))
        .map(|s| if s == "active" { Stance::Active } else { Stance::Passive })
        .max_by_key(|s| matches!(s, Stance::Active));

    match (from_prompt, from_memory) {
        (Some(Stance::Active), _) | (_, Some(Stance::Active)) => Some(Stance::Active),
        (Some(s), _) | (None, Some(s)) => Some(s),
        (None, None) => None,
    }
}
