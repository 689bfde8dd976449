//! Configuration module for Klipp.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{DialoguePrompts, Prompts, ScoringPrompts, StoryPrompts};
pub use settings::{
    GeneralSettings, PromptSettings, RankingSettings, ScoringSettings, Settings,
};
