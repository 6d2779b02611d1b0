/*!
 * Prompt templates for subtitle translation.
 *
 * The system instruction is fixed: the core relies on the model keeping the
 * segment delimiter, so only the target language and an optional context
 * line derived from the filename vary between requests.
 */

use std::path::Path;

use crate::app_config::TargetLanguage;
use crate::subtitle_processor::SEGMENT_DELIMITER;

/// System instruction template for batch subtitle translation.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    /// The template string with placeholders
    template: String,
}

impl PromptTemplate {
    /// The default instruction. `{delimiter}` and `{target_language}` are substituted.
    pub const SUBTITLE_TRANSLATOR: &'static str = r#"You are a professional subtitle translator. Translate the subtitle texts you receive into {target_language}.

Rules:
- The input is a list of subtitle texts separated by the character "{delimiter}". Answer with exactly the same number of texts, in the same order, separated by "{delimiter}".
- Do not merge, split, skip or reorder texts.
- Preserve inline markup such as <i>, </i>, <b> and {\an8} exactly where it appears.
- Keep proper nouns, character names and brand names untranslated.
- Dialogue lines that start with a hyphen stay on their own lines, each with its hyphen.
- Keep line breaks inside a text.
- Output only the translated texts. No explanations, no numbering, no quotes."#;

    /// Render the instruction, appending the context line when present
    pub fn render(&self, target_language: TargetLanguage, context: Option<&str>) -> String {
        let mut prompt = self
            .template
            .replace("{target_language}", target_language.display_name())
            .replace("{delimiter}", &SEGMENT_DELIMITER.to_string());

        if let Some(context) = context.map(str::trim).filter(|c| !c.is_empty()) {
            prompt.push_str("\n\nContext: these subtitles belong to \"");
            prompt.push_str(context);
            prompt.push_str("\". Use it to pick consistent names and terminology.");
        }
        prompt
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            template: Self::SUBTITLE_TRANSLATOR.to_string(),
        }
    }
}

/// Human readable title from a subtitle filename
///
/// `Some.Show.S01E02.srt` becomes `Some Show S01E02`. Returns `None` when
/// nothing usable is left.
pub fn context_from_filename<P: AsRef<Path>>(path: P) -> Option<String> {
    let stem = path.as_ref().file_stem()?.to_string_lossy();
    let title = stem
        .split(['.', '_'])
        .filter(|part| !part.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    let title = title.trim();
    (!title.is_empty()).then(|| title.to_string())
}
