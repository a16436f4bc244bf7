/*!
 * Prompt construction for the subtitle passes.
 *
 * This module provides:
 * - Instruction templates for normalize / translate / analyze / fix
 * - Pure builder functions that embed batch text verbatim
 */

pub mod templates;

// Re-export main types
pub use templates::{
    character_analysis_prompt, extract_embedded_text, gender_fix_prompt, normalization_prompt,
    translation_prompt, PromptLanguages, PromptTemplate,
};
