//! The lab team and its opening messages.
//!
//! Seven fictional agents: one coordinator, five specialists, and one
//! executor who controls the lab robot.

use outbreak_contracts::{
    agent::{AgentId, AgentIdentity, AgentRole},
    message::Message,
};
use outbreak_core::{supervisor::task_message, worker::AgentSpec};

pub const COORDINATOR: &str = "Atlas";
pub const EXECUTOR: &str = "Deng";
/// The specialist the coordinator delegates literature work to.
pub const LEAD_SPECIALIST: &str = "Bohr";

pub fn lab_roster() -> Vec<AgentSpec> {
    let agent = |name: &str, role: AgentRole, description: &str| {
        AgentSpec::new(AgentIdentity::new(name, role), description)
    };
    vec![
        agent(
            COORDINATOR,
            AgentRole::Coordinator,
            "Project manager. Breaks the assignment into work items and delegates them.",
        ),
        agent(
            "Bohr",
            AgentRole::Specialist,
            "Literature specialist. Reviews prior work on synthesis conditions.",
        ),
        agent(
            "Curie",
            AgentRole::Specialist,
            "Modelling specialist. Optimizes synthesis parameters.",
        ),
        agent(
            "Edison",
            AgentRole::Specialist,
            "Lab equipment specialist. Plans robot procedures.",
        ),
        agent(
            "Faraday",
            AgentRole::Specialist,
            "Safety consultant. Answers questions about reagent handling.",
        ),
        agent(
            "Gauss",
            AgentRole::Specialist,
            "Data analyst. Interprets measurements from completed runs.",
        ),
        agent(
            EXECUTOR,
            AgentRole::Executor,
            "Robot operator. Turns finalized procedures into code for the lab robot.",
        ),
    ]
}

/// The project assignment.
pub struct LabTask {
    pub description: &'static str,
    pub objectives: &'static [&'static str],
}

pub const MOF_TASK: LabTask = LabTask {
    description: "Optimize the crystallinity of an aluminium-based metal-organic framework \
                  (MOF) produced by microwave-assisted synthesis.",
    objectives: &[
        "Review published synthesis conditions",
        "Propose a parameter sweep for temperature and reaction time",
        "Prepare a robot procedure for the most promising conditions",
    ],
};

impl LabTask {
    pub fn render(&self) -> String {
        let objectives: Vec<String> = self.objectives.iter().map(|o| format!("- {}", o)).collect();
        format!(
            "New project assignment:\n\n{}\n\nObjectives:\n{}",
            self.description,
            objectives.join("\n")
        )
    }
}

/// Messages delivered before the workers start: the assignment to the
/// coordinator and a standby notice to the executor.
pub fn opening_messages() -> Vec<Message> {
    vec![
        task_message(AgentId::new(COORDINATOR), MOF_TASK.render()),
        task_message(
            AgentId::new(EXECUTOR),
            "Stand by. Procedures for the robot will arrive from the team.",
        ),
    ]
}
