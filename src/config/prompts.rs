//! Prompt templates for Klipp.
//!
//! Prompts can be customized by placing TOML files in the custom prompts
//! directory.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    /// Prompts for the per-segment quality scoring call.
    pub scoring: ScoringPrompts,
    /// Prompts for dialogue reply scoring.
    pub dialogue: DialoguePrompts,
    /// Prompts for story opener/continuation scoring.
    pub story: StoryPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: std::collections::HashMap<String, String>,
}


/// Prompts for quality scoring. The system prompt is format-only: the
/// response must be exactly four comma-separated numbers so the caller can
/// parse it without any cleanup pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringPrompts {
    pub system: String,
    pub user: String,
}

impl Default for ScoringPrompts {
    fn default() -> Self {
        Self {
            system: r#"You rate short spoken-transcript segments for video editing.

Respond with EXACTLY four comma-separated numbers and nothing else:
relevance,sentiment,novelty,energy

Scales:
- relevance: 0 to 100, how on-topic the segment is for the given subject
- sentiment: -100 to 100, emotional negativity to positivity
- novelty: 0 to 10, how novel or surprising the content is
- energy: 1 to 5, delivery energy from flat to intense

No words, no labels, no explanation. Example response: 72,-15,6,3"#
                .to_string(),

            user: r#"Subject: {{topic}}

Segment:
{{text}}"#
                .to_string(),
        }
    }
}

/// Prompts for dialogue reply scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DialoguePrompts {
    pub system: String,
    pub user: String,
}

impl Default for DialoguePrompts {
    fn default() -> Self {
        Self {
            system: r#"You judge conversational flow between two spoken lines from different speakers.

Respond with a single number from 0 to 100: how naturally the second line works as a reply to the first. 100 means a perfect, direct reply; 0 means no connection at all.

No words, no explanation, just the number."#
                .to_string(),

            user: r#"First speaker says:
{{previous}}

Second speaker says:
{{candidate}}

Reply score (0-100):"#
                .to_string(),
        }
    }
}

/// Prompts for story sequencing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoryPrompts {
    pub opener_system: String,
    pub opener_user: String,
    pub continuation_system: String,
    pub continuation_user: String,
}

impl Default for StoryPrompts {
    fn default() -> Self {
        Self {
            opener_system: r#"You judge narrative structure in spoken content.

Respond with a single number from 0 to 100: how well this segment would work as the OPENING of a story. Good openers set context, introduce a subject, or hook the listener.

No words, no explanation, just the number."#
                .to_string(),

            opener_user: r#"Segment:
{{text}}

Opener score (0-100):"#
                .to_string(),

            continuation_system: r#"You judge narrative structure in spoken content.

Respond with a single number from 0 to 100: how naturally the second segment continues from the first. Reward logical flow, shared subjects, and cause-effect ordering.

No words, no explanation, just the number."#
                .to_string(),

            continuation_user: r#"Previous segment:
{{previous}}

Candidate continuation:
{{candidate}}

Continuation score (0-100):"#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory
    /// and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&std::collections::HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        // Store custom variables
        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let scoring_path = custom_path.join("scoring.toml");
            if scoring_path.exists() {
                let content = std::fs::read_to_string(&scoring_path)?;
                prompts.scoring = toml::from_str(&content)?;
            }

            let dialogue_path = custom_path.join("dialogue.toml");
            if dialogue_path.exists() {
                let content = std::fs::read_to_string(&dialogue_path)?;
                prompts.dialogue = toml::from_str(&content)?;
            }

            let story_path = custom_path.join("story.toml");
            if story_path.exists() {
                let content = std::fs::read_to_string(&story_path)?;
                prompts.story = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &std::collections::HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom
    /// config variables. Provided variables take precedence.
    pub fn render_with_custom(
        &self,
        template: &str,
        vars: &std::collections::HashMap<String, String>,
    ) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}
