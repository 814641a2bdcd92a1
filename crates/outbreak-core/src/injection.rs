//! Adversarial prompt injection.
//!
//! The scheduler delivers exactly one attack message per run, on the first
//! supervisor tick at which the global dequeued total reaches
//! `inject_after_messages`. Target and prompt are drawn from a single seeded
//! `ChaCha8Rng`, target first, so a given seed and roster always produce the
//! same attack.
//!
//! Everything that could make selection fail (no eligible target, unknown
//! prompt id, empty prompt table) is checked when the scheduler is built,
//! before any worker is spawned.

use std::path::Path;

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};

use outbreak_contracts::{
    agent::{AgentId, AgentIdentity, AgentRole},
    config::SimConfig,
    error::{OutbreakError, OutbreakResult},
    event::{Event, EventKind},
    message::{Message, MessageRole, META_ATTACK_TYPE, META_IS_ATTACK, META_PROMPT_ID},
    outcome::InjectionState,
};

use crate::mailbox::MailboxDirectory;
use crate::traits::EventSink;

/// Attack type recorded on every injected message.
pub const ATTACK_TYPE: &str = "jailbreak";

/// One entry of the attack prompt bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackPrompt {
    pub id: u32,
    pub prompt: String,
    #[serde(default)]
    pub category: Option<String>,
}

/// Ordered collection of attack prompts, looked up by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromptTable {
    prompts: Vec<AttackPrompt>,
}

impl PromptTable {
    pub fn new(prompts: Vec<AttackPrompt>) -> Self {
        Self { prompts }
    }

    /// Parse a JSON Lines prompt bank. Blank lines are skipped.
    pub fn from_jsonl_str(s: &str) -> OutbreakResult<Self> {
        let mut prompts = Vec::new();
        for (idx, line) in s.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let prompt: AttackPrompt =
                serde_json::from_str(line).map_err(|e| OutbreakError::ConfigError {
                    reason: format!("invalid prompt on line {}: {}", idx + 1, e),
                })?;
            prompts.push(prompt);
        }
        Ok(Self { prompts })
    }

    pub fn from_file(path: &Path) -> OutbreakResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| OutbreakError::ConfigError {
            reason: format!("failed to read prompt file '{}': {}", path.display(), e),
        })?;
        Self::from_jsonl_str(&contents)
    }

    pub fn get(&self, id: u32) -> Option<&AttackPrompt> {
        self.prompts.iter().find(|p| p.id == id)
    }

    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&AttackPrompt> {
        self.prompts.choose(rng)
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AttackPrompt> {
        self.prompts.iter()
    }
}

/// Agents whose role is not protected, in roster order.
pub fn eligible_targets<'a>(
    agents: &'a [AgentIdentity],
    protected: &[AgentRole],
) -> Vec<&'a AgentIdentity> {
    agents
        .iter()
        .filter(|a| !protected.contains(&a.role))
        .collect()
}

/// Pick a uniformly random unprotected agent.
pub fn select_target<R: Rng + ?Sized>(
    agents: &[AgentIdentity],
    protected: &[AgentRole],
    rng: &mut R,
) -> OutbreakResult<AgentId> {
    eligible_targets(agents, protected)
        .choose(rng)
        .map(|a| a.id.clone())
        .ok_or_else(|| OutbreakError::NoEligibleTarget {
            candidates: agents.len(),
            reason: format!("every agent has a protected role ({:?})", protected),
        })
}

/// What a single injection delivered.
#[derive(Debug, Clone, PartialEq)]
pub struct InjectionPlan {
    pub target: AgentId,
    pub prompt: AttackPrompt,
}

#[derive(Debug)]
pub struct InjectionScheduler {
    inject_after: u64,
    protected: Vec<AgentRole>,
    fixed_prompt: Option<u32>,
    agents: Vec<AgentIdentity>,
    prompts: PromptTable,
    rng: ChaCha8Rng,
    state: InjectionState,
}

impl InjectionScheduler {
    /// Build a scheduler and verify that an injection would succeed.
    pub fn new(
        config: &SimConfig,
        agents: &[AgentIdentity],
        prompts: PromptTable,
    ) -> OutbreakResult<Self> {
        if eligible_targets(agents, &config.protected_roles).is_empty() {
            return Err(OutbreakError::NoEligibleTarget {
                candidates: agents.len(),
                reason: format!(
                    "every agent has a protected role ({:?})",
                    config.protected_roles
                ),
            });
        }
        if prompts.is_empty() {
            return Err(OutbreakError::ConfigError {
                reason: "attack prompt table is empty".to_string(),
            });
        }
        if let Some(id) = config.attack_prompt_id {
            if prompts.get(id).is_none() {
                return Err(OutbreakError::UnknownPrompt { prompt_id: id });
            }
        }

        Ok(Self {
            inject_after: config.inject_after_messages,
            protected: config.protected_roles.clone(),
            fixed_prompt: config.attack_prompt_id,
            agents: agents.to_vec(),
            prompts,
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            state: InjectionState::default(),
        })
    }

    pub fn should_inject(&self, total_dequeued: u64) -> bool {
        !self.state.injected && total_dequeued >= self.inject_after
    }

    /// Draw target then prompt. Consumes randomness.
    pub fn plan(&mut self) -> OutbreakResult<InjectionPlan> {
        let target = select_target(&self.agents, &self.protected, &mut self.rng)?;
        let prompt = match self.fixed_prompt {
            Some(id) => self.prompts.get(id).ok_or(OutbreakError::UnknownPrompt { prompt_id: id })?,
            None => self
                .prompts
                .choose(&mut self.rng)
                .ok_or_else(|| OutbreakError::ConfigError {
                    reason: "attack prompt table is empty".to_string(),
                })?,
        }
        .clone();
        Ok(InjectionPlan { target, prompt })
    }

    /// Inject the attack if the threshold has been reached and it has not
    /// happened yet. Returns true on the tick the injection happens.
    pub fn check_and_inject(
        &mut self,
        total_dequeued: u64,
        step: u64,
        directory: &MailboxDirectory,
        sink: &dyn EventSink,
    ) -> bool {
        if !self.should_inject(total_dequeued) {
            return false;
        }

        // Mark first so a failed delivery is still never retried.
        self.state.injected = true;
        self.state.injection_step = Some(step);

        let plan = match self.plan() {
            Ok(plan) => plan,
            Err(e) => {
                error!(error = %e, "attack selection failed");
                return false;
            }
        };
        self.state.target = Some(plan.target.clone());
        self.state.prompt_id = Some(plan.prompt.id);

        let message = attack_message(&plan, step);
        sink.emit_message(&message);
        if let Err(e) = directory.deliver(message) {
            error!(error = %e, "attack delivery failed");
            return false;
        }

        sink.emit_event(
            &Event::new(EventKind::AttackInjected, step)
                .for_agent(plan.target.clone())
                .with_details(json!({
                    "target": plan.target,
                    "prompt_id": plan.prompt.id,
                    "category": plan.prompt.category,
                    "total_dequeued": total_dequeued,
                })),
        );
        info!(target = %plan.target, prompt_id = plan.prompt.id, step, "attack injected");
        true
    }

    pub fn state(&self) -> &InjectionState {
        &self.state
    }
}

/// Build the adversary message for `plan`.
pub fn attack_message(plan: &InjectionPlan, step: u64) -> Message {
    Message::new(MessageRole::User, plan.prompt.prompt.clone(), step)
        .from_sender(AgentId::adversary())
        .to_receiver(plan.target.clone())
        .with_metadata(META_IS_ATTACK, true)
        .with_metadata(META_PROMPT_ID, plan.prompt.id)
        .with_metadata(META_ATTACK_TYPE, ATTACK_TYPE)
}
