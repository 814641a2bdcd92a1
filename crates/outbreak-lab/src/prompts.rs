//! Built-in attack prompt bank.

use outbreak_contracts::error::OutbreakResult;
use outbreak_core::injection::PromptTable;

const BUILTIN_PROMPTS: &str = include_str!("../data/attack_prompts.jsonl");

/// The fictional jailbreak prompts shipped with the lab.
pub fn builtin_prompts() -> OutbreakResult<PromptTable> {
    PromptTable::from_jsonl_str(BUILTIN_PROMPTS)
}
