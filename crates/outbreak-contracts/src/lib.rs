//! # outbreak-contracts
//!
//! Shared types, configuration, and error contracts for the Outbreak
//! multi-agent injection simulator.
//!
//! All crates in the workspace import from here. No orchestration logic lives
//! in this crate, only data definitions, configuration parsing, and errors.

pub mod agent;
pub mod config;
pub mod defense;
pub mod error;
pub mod event;
pub mod message;
pub mod outcome;
pub mod tool;

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use agent::{AgentId, AgentRole, RunId};
    use config::SimConfig;
    use defense::{DefenseMode, Stance};
    use error::OutbreakError;
    use message::{Message, MessageRole, META_IS_ATTACK, META_PROMPT_ID};
    use outcome::{InjectionState, Outcome, TerminationReason};

    // ── Roles ────────────────────────────────────────────────────────────────

    #[test]
    fn only_executors_run_code() {
        assert!(AgentRole::Executor.can_run_code());
        assert!(!AgentRole::Coordinator.can_run_code());
        assert!(!AgentRole::Specialist.can_run_code());
    }

    #[test]
    fn default_protected_roles_exclude_specialists() {
        let protected = AgentRole::default_protected();
        assert!(protected.contains(&AgentRole::Coordinator));
        assert!(protected.contains(&AgentRole::Executor));
        assert!(!protected.contains(&AgentRole::Specialist));
    }

    #[test]
    fn run_id_new_produces_unique_values() {
        let ids: std::collections::HashSet<String> =
            (0..50).map(|_| RunId::new().to_string()).collect();
        assert_eq!(ids.len(), 50);
    }

    // ── Message metadata ─────────────────────────────────────────────────────

    #[test]
    fn attack_metadata_is_readable() {
        let msg = Message::new(MessageRole::User, "do something bad", 3)
            .from_sender(AgentId::adversary())
            .to_receiver(AgentId::new("Bohr"))
            .with_metadata(META_IS_ATTACK, true)
            .with_metadata(META_PROMPT_ID, 7);

        assert!(msg.is_attack());
        assert_eq!(msg.prompt_id(), Some(7));
        assert_eq!(msg.sender.as_ref().map(AgentId::as_str), Some("[ADVERSARY]"));
    }

    #[test]
    fn plain_message_is_not_an_attack() {
        let msg = Message::new(MessageRole::User, "hello", 0);
        assert!(!msg.is_attack());
        assert_eq!(msg.prompt_id(), None);
        assert_eq!(msg.source(), None);
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        let msg = Message::new(MessageRole::User, "héllo wörld", 0);
        assert_eq!(msg.preview(5), "héllo...");
        assert_eq!(msg.preview(100), "héllo wörld");
    }

    #[test]
    fn message_serializes_role_in_snake_case() {
        let msg = Message::new(MessageRole::Assistant, "ok", 1);
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["step"], 1);
    }

    // ── Defense modes ────────────────────────────────────────────────────────

    #[test]
    fn defense_mode_stances() {
        assert_eq!(DefenseMode::None.instruction(), None);
        assert_eq!(DefenseMode::None.vaccine(), None);
        assert_eq!(DefenseMode::InstructionPassive.instruction(), Some(Stance::Passive));
        assert_eq!(DefenseMode::VaccineActive.vaccine(), Some(Stance::Active));
        assert_eq!(DefenseMode::VaccineActive.instruction(), None);
        assert_eq!(DefenseMode::Combined.instruction(), Some(Stance::Active));
        assert_eq!(DefenseMode::Combined.vaccine(), Some(Stance::Active));
    }

    #[test]
    fn defense_mode_parses_from_str() {
        assert_eq!("vaccine_passive".parse::<DefenseMode>().unwrap(), DefenseMode::VaccinePassive);
        match "shields_up".parse::<DefenseMode>() {
            Err(OutbreakError::ConfigError { reason }) => assert!(reason.contains("shields_up")),
            other => panic!("expected ConfigError, got {:?}", other),
        }
    }

    // ── Outcome ──────────────────────────────────────────────────────────────

    #[test]
    fn outcome_success_is_derived_from_reason() {
        let boom = Outcome::new(
            TerminationReason::Explosion,
            10,
            4,
            None,
            1.0,
            InjectionState::default(),
            serde_json::Value::Null,
        );
        assert!(!boom.success);

        let quiet = Outcome::new(
            TerminationReason::Deadlock,
            10,
            4,
            None,
            1.0,
            InjectionState::default(),
            serde_json::Value::Null,
        );
        assert!(quiet.success);
    }

    #[test]
    fn termination_reason_display_matches_serde() {
        for reason in [
            TerminationReason::Explosion,
            TerminationReason::MessageLimit,
            TerminationReason::TimeLimit,
            TerminationReason::Deadlock,
            TerminationReason::ManualStop,
            TerminationReason::Completed,
        ] {
            let json = serde_json::to_value(reason).unwrap();
            assert_eq!(json, serde_json::Value::String(reason.to_string()));
        }
    }

    // ── Config ───────────────────────────────────────────────────────────────

    #[test]
    fn empty_toml_yields_defaults() {
        let config = SimConfig::from_toml_str("").unwrap();
        assert_eq!(config, SimConfig::default());
        assert_eq!(config.inject_after_messages, 2);
        assert_eq!(config.seed, 42);
    }

    #[test]
    fn toml_overrides_are_applied() {
        let config = SimConfig::from_toml_str(
            r#"
            max_messages = 50
            deadlock_timeout_s = 2.5
            protected_roles = ["coordinator"]
            defense_mode = "combined"
            attack_prompt_id = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.max_messages, 50);
        assert_eq!(config.deadlock_timeout_s, 2.5);
        assert_eq!(config.protected_roles, vec![AgentRole::Coordinator]);
        assert_eq!(config.defense_mode, DefenseMode::Combined);
        assert_eq!(config.attack_prompt_id, Some(3));
    }

    #[test]
    fn invalid_thresholds_are_rejected() {
        let err = SimConfig::from_toml_str("max_messages = 0").unwrap_err();
        assert!(err.to_string().contains("max_messages"));

        let err = SimConfig::from_toml_str("deadlock_timeout_s = -1.0").unwrap_err();
        assert!(err.to_string().contains("deadlock_timeout_s"));

        let err = SimConfig::from_toml_str("tick_interval_ms = 0").unwrap_err();
        assert!(err.to_string().contains("tick_interval_ms"));
    }

    #[test]
    fn oversized_durations_are_rejected() {
        for doc in ["max_time_s = 1e30", "deadlock_timeout_s = 1e300", "shutdown_grace_s = inf"] {
            assert!(
                matches!(SimConfig::from_toml_str(doc), Err(OutbreakError::ConfigError { .. })),
                "{} should be rejected",
                doc
            );
        }

        let err = SimConfig::from_toml_str("idle_poll_ms = 9223372036854775807").unwrap_err();
        assert!(err.to_string().contains("idle_poll_ms"));
        let err = SimConfig::from_toml_str("tick_interval_ms = 86400001").unwrap_err();
        assert!(err.to_string().contains("tick_interval_ms"));

        assert!(SimConfig::from_toml_str("max_time_s = 86400.0").is_ok());
    }

    #[test]
    fn duration_helpers_never_panic() {
        let config = SimConfig {
            max_time_s: 1e30,
            deadlock_timeout_s: f64::NAN,
            shutdown_grace_s: -3.0,
            idle_poll_ms: u64::MAX,
            ..SimConfig::default()
        };
        assert_eq!(config.max_time(), Duration::from_secs(86_400));
        assert_eq!(config.deadlock_timeout(), Duration::ZERO);
        assert_eq!(config.shutdown_grace(), Duration::ZERO);
        assert_eq!(config.idle_poll(), Duration::from_secs(86_400));
    }

    #[test]
    fn unknown_keys_are_config_errors() {
        match SimConfig::from_toml_str("max_mesages = 10") {
            Err(OutbreakError::ConfigError { reason }) => {
                assert!(reason.contains("failed to parse simulation TOML"));
            }
            other => panic!("expected ConfigError, got {:?}", other),
        }
    }

    #[test]
    fn missing_config_file_is_config_error() {
        let result = SimConfig::from_file(std::path::Path::new("/nonexistent/outbreak.toml"));
        assert!(matches!(result, Err(OutbreakError::ConfigError { .. })));
    }

    // ── Error display ────────────────────────────────────────────────────────

    #[test]
    fn error_no_eligible_target_display() {
        let err = OutbreakError::NoEligibleTarget {
            candidates: 2,
            reason: "all agents are protected".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("no eligible attack target"));
        assert!(msg.contains("all agents are protected"));
    }

    #[test]
    fn error_unknown_prompt_display() {
        let err = OutbreakError::UnknownPrompt { prompt_id: 99 };
        assert!(err.to_string().contains("99"));
    }
}
