/*!
 * Prompt templates for the subtitle passes.
 *
 * Batch templates carry the `---` segment separator contract; the
 * analysis template asks for a JSON roster. Subtitle text is always
 * embedded last, between `<subtitles>` tags, and is never altered.
 */

use crate::language_utils;

/// Opening tag around embedded subtitle text
pub const TEXT_OPEN_TAG: &str = "<subtitles>\n";

/// Closing tag around embedded subtitle text
pub const TEXT_CLOSE_TAG: &str = "\n</subtitles>";

/// Instruction template with `{name}` placeholders.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    /// The template string with placeholders
    template: &'static str,
}

impl PromptTemplate {
    /// Source-language cleanup, one output segment per input segment.
    pub const NORMALIZE: &'static str = r#"You are an experienced {source_language} subtitle editor.

## Task
Normalize each subtitle segment below into clean, standard written {source_language}:
- Fix typos, homophone mistakes and speech-recognition errors
- Use standard punctuation for {source_language}
- Do not translate, summarize or add content

## Output Requirements
- Segments are separated by a line containing only ---
- Return exactly the same number of segments, in the same order, separated the same way
- Return only the segments, with no commentary

<subtitles>
{text}
</subtitles>"#;

    /// Translation, one output segment per input segment.
    pub const TRANSLATE: &'static str = r#"You are a professional subtitle translator from {source_language} to {target_language}.

## Task
Translate each subtitle segment below into natural, spoken {target_language}:
- Keep translations concise; subtitles have limited display time
- Keep character names consistent across segments
- Preserve line breaks inside a segment

## Output Requirements
- Segments are separated by a line containing only ---
- Return exactly the same number of segments, in the same order, separated the same way
- Return only the translated segments, with no commentary

<subtitles>
{text}
</subtitles>"#;

    /// Whole-document character extraction.
    pub const ANALYZE_CHARACTERS: &'static str = r#"You are analyzing the dialogue of a film subtitled in {target_language} (translated from {source_language}).

## Task
List every named character who speaks or is spoken to. For each character, infer their gender from context such as forms of address, pronouns and relationships.

## Output Requirements
Answer with JSON only, no commentary, in exactly this shape:
{"characters": [{"name": "character name", "gender": "Male"}]}
The gender must be one of "Male", "Female" or "Unknown". List each name once.

<subtitles>
{text}
</subtitles>"#;

    /// Pronoun and form-of-address correction against a confirmed roster.
    pub const FIX_GENDER: &'static str = r#"You are proofreading {target_language} subtitles translated from {source_language}.

## Task
Correct pronouns and forms of address so they match each character's gender, using this confirmed character list:
{characters}

- Change only words that depend on a character's gender
- Leave characters marked "Unknown" as they are
- Keep everything else exactly as written

## Output Requirements
- Segments are separated by a line containing only ---
- Return exactly the same number of segments, in the same order, separated the same way
- Return only the segments, with no commentary

<subtitles>
{text}
</subtitles>"#;

    /// Create a new prompt template.
    pub const fn new(template: &'static str) -> Self {
        Self { template }
    }

    /// Render the template in a single pass.
    ///
    /// Placeholder-like text inside substituted values is left untouched.
    pub fn render(&self, values: &[(&str, &str)]) -> String {
        let mut output = String::with_capacity(self.template.len());
        let mut rest = self.template;

        'scan: while let Some(start) = rest.find('{') {
            output.push_str(&rest[..start]);
            let candidate = &rest[start..];

            for (key, value) in values {
                let placeholder = format!("{{{}}}", key);
                if candidate.starts_with(&placeholder) {
                    output.push_str(value);
                    rest = &candidate[placeholder.len()..];
                    continue 'scan;
                }
            }

            output.push('{');
            rest = &candidate[1..];
        }

        output.push_str(rest);
        output
    }
}

/// Language pair rendered into every prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptLanguages {
    /// Source language display name
    pub source: String,
    /// Target language display name
    pub target: String,
}

impl PromptLanguages {
    /// Resolve ISO codes to display names
    pub fn from_codes(source_code: &str, target_code: &str) -> Self {
        Self {
            source: language_utils::display_name(source_code),
            target: language_utils::display_name(target_code),
        }
    }
}

impl Default for PromptLanguages {
    fn default() -> Self {
        Self::from_codes("zh", "vi")
    }
}

fn render_with_languages(template: &'static str, languages: &PromptLanguages, extra: &[(&str, &str)]) -> String {
    let mut values = vec![
        ("source_language", languages.source.as_str()),
        ("target_language", languages.target.as_str()),
    ];
    values.extend_from_slice(extra);
    PromptTemplate::new(template).render(&values)
}

/// Prompt normalizing a delimiter-joined batch of source text
pub fn normalization_prompt(batch_text: &str, languages: &PromptLanguages) -> String {
    render_with_languages(PromptTemplate::NORMALIZE, languages, &[("text", batch_text)])
}

/// Prompt translating a delimiter-joined batch
pub fn translation_prompt(batch_text: &str, languages: &PromptLanguages) -> String {
    render_with_languages(PromptTemplate::TRANSLATE, languages, &[("text", batch_text)])
}

/// Prompt extracting the character roster from the whole document
pub fn character_analysis_prompt(full_text: &str, languages: &PromptLanguages) -> String {
    render_with_languages(PromptTemplate::ANALYZE_CHARACTERS, languages, &[("text", full_text)])
}

/// Prompt fixing gendered words in a batch against a serialized roster
pub fn gender_fix_prompt(batch_text: &str, roster_json: &str, languages: &PromptLanguages) -> String {
    render_with_languages(
        PromptTemplate::FIX_GENDER,
        languages,
        &[("characters", roster_json), ("text", batch_text)],
    )
}

/// The subtitle text embedded in a prompt built by this module
pub fn extract_embedded_text(prompt: &str) -> Option<&str> {
    let start = prompt.find(TEXT_OPEN_TAG)? + TEXT_OPEN_TAG.len();
    let end = prompt.rfind(TEXT_CLOSE_TAG)?;
    if end < start {
        return None;
    }
    Some(&prompt[start..end])
}
