//! # outbreak-defense
//!
//! Defense measures against prompt injection, loaded from TOML.
//!
//! Two independent measures are supported, each with a passive and an
//! active stance:
//!
//! - **instruction**: text appended to every agent's system prompt
//! - **vaccine**: worked refusal examples prepended to every agent's memory
//!
//! [`TomlDefenseProvider`] implements
//! [`DefenseProvider`](outbreak_core::traits::DefenseProvider). The built-in
//! measures are embedded at compile time; custom ones can be loaded from a
//! file.
//!
//! ```rust,ignore
//! use outbreak_defense::TomlDefenseProvider;
//!
//! let provider = TomlDefenseProvider::builtin()?;
//! ```

pub mod config;
pub mod provider;

pub use config::{DefenseConfig, InstructionTexts, VaccineEntry, VaccineSets};
pub use provider::{observed_stance, TomlDefenseProvider, INSTRUCTION_HEADER, VACCINE_SOURCE};

// ── Tests ─────────────────────────────────────────────────────────────────────
