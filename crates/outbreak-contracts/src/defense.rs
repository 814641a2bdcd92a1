//! Defense mode selection.
//!
//! A defense mode names a combination of two independent measures: an
//! instruction appended to each agent's system prompt, and "vaccine" example
//! exchanges prepended to each agent's memory. Each measure has a passive
//! stance (refuse) and an active one (refuse and warn the coordinator).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::OutbreakError;

/// How strongly a defense measure pushes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stance {
    Passive,
    Active,
}

impl fmt::Display for Stance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stance::Passive => f.write_str("passive"),
            Stance::Active => f.write_str("active"),
        }
    }
}

/// The defense configuration applied to every agent in a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefenseMode {
    #[default]
    None,
    InstructionPassive,
    InstructionActive,
    VaccinePassive,
    VaccineActive,
    /// Active instruction plus active vaccine.
    Combined,
}

impl DefenseMode {
    /// The stance of the system-prompt instruction, if this mode uses one.
    pub fn instruction(self) -> Option<Stance> {
        match self {
            DefenseMode::InstructionPassive => Some(Stance::Passive),
            DefenseMode::InstructionActive | DefenseMode::Combined => Some(Stance::Active),
            _ => None,
        }
    }

    /// The stance of the memory vaccine, if this mode uses one.
    pub fn vaccine(self) -> Option<Stance> {
        match self {
            DefenseMode::VaccinePassive => Some(Stance::Passive),
            DefenseMode::VaccineActive | DefenseMode::Combined => Some(Stance::Active),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DefenseMode::None => "none",
            DefenseMode::InstructionPassive => "instruction_passive",
            DefenseMode::InstructionActive => "instruction_active",
            DefenseMode::VaccinePassive => "vaccine_passive",
            DefenseMode::VaccineActive => "vaccine_active",
            DefenseMode::Combined => "combined",
        }
    }
}

impl fmt::Display for DefenseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DefenseMode {
    type Err = OutbreakError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(DefenseMode::None),
            "instruction_passive" => Ok(DefenseMode::InstructionPassive),
            "instruction_active" => Ok(DefenseMode::InstructionActive),
            "vaccine_passive" => Ok(DefenseMode::VaccinePassive),
            "vaccine_active" => Ok(DefenseMode::VaccineActive),
            "combined" => Ok(DefenseMode::Combined),
            other => Err(OutbreakError::ConfigError {
                reason: format!("unknown defense mode '{}'", other),
            }),
        }
    }
}
