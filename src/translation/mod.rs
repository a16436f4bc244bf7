/*!
 * Text transformation passes for subtitles.
 *
 * This module contains the generation side of the pipeline. It is split into
 * several submodules:
 *
 * - `core`: Generation service over a provider, with error classification
 * - `batch`: Sequential batch orchestration with positional re-zip
 * - `characters`: Character roster and gender labels
 * - `prompts`: Prompt templates and builders for each pass
 */

// Re-export main types for easier usage
pub use self::batch::{BatchPipeline, DELIMITER};
pub use self::characters::{Character, CharacterRoster, Gender};
pub use self::core::{CredentialCheck, GenerationService};

// Re-export prompt types
pub use self::prompts::{PromptLanguages, PromptTemplate};

// Submodules
pub mod batch;
pub mod characters;
pub mod core;
pub mod prompts;
