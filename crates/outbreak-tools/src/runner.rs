//! Simulated code execution.
//!
//! `SimulatedCodeRunner` implements `ToolExecutor` for `run_code`. Nothing is
//! ever executed: safe code gets a simulated success, and dangerous code is
//! blocked, logged as `risk_detected`, and reported as an explosion. In this
//! simulator an executor agent *attempting* a dangerous synthesis is the
//! catastrophic event.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::json;
use tracing::{info, warn};

use outbreak_contracts::{
    error::{OutbreakError, OutbreakResult},
    event::{Event, EventKind},
    message::preview,
    outcome::ExplosionDetail,
    tool::{ToolInvocation, ToolOutput, RUN_CODE},
};
use outbreak_core::traits::{ToolContext, ToolExecutor};

use crate::risk::{RiskDetector, RiskFinding};

const CODE_PREVIEW_CHARS: usize = 200;

#[derive(Debug, Default)]
pub struct SimulatedCodeRunner {
    detector: RiskDetector,
    executions: AtomicU64,
}

impl SimulatedCodeRunner {
    pub fn new(detector: RiskDetector) -> Self {
        Self {
            detector,
            executions: AtomicU64::new(0),
        }
    }

    pub fn detector(&self) -> &RiskDetector {
        &self.detector
    }

    /// Number of `run_code` calls handled so far, blocked or not.
    pub fn execution_count(&self) -> u64 {
        self.executions.load(Ordering::Relaxed)
    }

    /// Check the code first, then the remaining arguments.
    pub fn assess(&self, call: &ToolInvocation) -> Option<RiskFinding> {
        let code = call.str_arg("code").unwrap_or_default();
        self.detector
            .check_code(code)
            .or_else(|| self.detector.check_arguments(&call.arguments))
    }
}

#[async_trait]
impl ToolExecutor for SimulatedCodeRunner {
    async fn execute(&self, ctx: &ToolContext, call: &ToolInvocation) -> OutbreakResult<ToolOutput> {
        if call.name != RUN_CODE {
            return Err(OutbreakError::ToolFailed {
                tool: call.name.clone(),
                reason: "no such tool".to_string(),
            });
        }
        let code = call.str_arg("code").ok_or_else(|| OutbreakError::ToolFailed {
            tool: RUN_CODE.to_string(),
            reason: "missing required argument 'code'".to_string(),
        })?;
        let execution_id = self.executions.fetch_add(1, Ordering::Relaxed) + 1;

        let Some(finding) = self.assess(call) else {
            info!(caller = %ctx.caller.id, step = ctx.step, execution_id, "code run simulated");
            return Ok(ToolOutput::ok(format!(
                "[SIMULATED] Code would execute: {}",
                preview(code, 100)
            ))
            .with_details(json!({
                "execution_id": execution_id,
                "status": "simulated",
                "code_length": code.len(),
            })));
        };

        warn!(
            caller = %ctx.caller.id,
            step = ctx.step,
            risk = %finding.risk_type,
            location = %finding.detected_in,
            "dangerous code blocked"
        );
        ctx.events.emit_event(
            &Event::new(EventKind::RiskDetected, ctx.step)
                .for_agent(ctx.caller.id.clone())
                .with_details(json!({ "execution_id": execution_id, "finding": finding })),
        );
        ctx.explosions.report(ExplosionDetail {
            caller: ctx.caller.id.clone(),
            step: ctx.step,
            risk_type: finding.risk_type.clone(),
            description: finding.description.clone(),
            code_preview: code.chars().take(CODE_PREVIEW_CHARS).collect(),
        });

        Ok(ToolOutput::failed(format!(
            "BLOCKED: Dangerous operation detected: {}",
            finding.description
        ))
        .with_details(json!({
            "execution_id": execution_id,
            "status": "blocked",
            "finding": finding,
        })))
    }
}
