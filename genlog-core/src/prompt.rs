//! Prompt decoration.
//!
//! Prompts may end with an aspect-ratio directive such as `--ar 16:9`. When
//! the brighten option is on, a lighting phrase is inserted in front of that
//! directive so the directive stays last; without a directive the phrase is
//! appended.

use crate::models::AspectRatio;

/// Aspect-ratio directive token. Matched case-sensitively.
pub const ASPECT_DIRECTIVE: &str = "--ar";

/// Phrase added when brightening.
pub const LIGHTING_PHRASE: &str = "bright, soft natural lighting, high-key exposure";

/// Decorates a prompt.
///
/// Only the first occurrence of [`ASPECT_DIRECTIVE`] is considered; later
/// occurrences and differently-cased variants (`--AR`) are left untouched.
pub fn decorate(prompt: &str, brighten: bool) -> String {
    if !brighten {
        return prompt.to_string();
    }

    match prompt.find(ASPECT_DIRECTIVE) {
        Some(index) => {
            let head = prompt[..index].trim_end();
            let tail = &prompt[index..];
            if head.is_empty() {
                format!("{LIGHTING_PHRASE} {tail}")
            } else {
                format!("{head}, {LIGHTING_PHRASE} {tail}")
            }
        }
        None => {
            let head = prompt.trim_end();
            if head.is_empty() {
                LIGHTING_PHRASE.to_string()
            } else {
                format!("{head}, {LIGHTING_PHRASE}")
            }
        }
    }
}

/// Reads the ratio following the first aspect-ratio directive.
///
/// Returns `None` if there is no directive or its value is not a supported
/// ratio.
pub fn aspect_directive(prompt: &str) -> Option<AspectRatio> {
    let index = prompt.find(ASPECT_DIRECTIVE)?;
    let value = prompt[index + ASPECT_DIRECTIVE.len()..].split_whitespace().next()?;
    value.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_brighten_is_identity() {
        assert_eq!(decorate("a cat --ar 16:9", false), "a cat --ar 16:9");
        assert_eq!(decorate("", false), "");
    }

    #[test]
    fn test_appends_without_directive() {
        assert_eq!(
            decorate("a cat on a sofa  ", true),
            format!("a cat on a sofa, {LIGHTING_PHRASE}")
        );
    }

    #[test]
    fn test_blank_prompt() {
        assert_eq!(decorate("   ", true), LIGHTING_PHRASE);
    }

    #[test]
    fn test_inserts_before_directive() {
        assert_eq!(
            decorate("a cat --ar 16:9", true),
            format!("a cat, {LIGHTING_PHRASE} --ar 16:9")
        );
    }

    #[test]
    fn test_directive_only() {
        assert_eq!(decorate("--ar 1:1", true), format!("{LIGHTING_PHRASE} --ar 1:1"));
    }

    #[test]
    fn test_only_first_directive_modified() {
        assert_eq!(
            decorate("a --ar 1:1 b --ar 16:9", true),
            format!("a, {LIGHTING_PHRASE} --ar 1:1 b --ar 16:9")
        );
    }

    #[test]
    fn test_directive_case_sensitive() {
        assert_eq!(
            decorate("a cat --AR 16:9", true),
            format!("a cat --AR 16:9, {LIGHTING_PHRASE}")
        );
    }

    #[test]
    fn test_deterministic() {
        let prompt = "city at night --ar 9:16";
        assert_eq!(decorate(prompt, true), decorate(prompt, true));
    }

    #[test]
    fn test_aspect_directive() {
        assert_eq!(aspect_directive("a cat --ar 16:9"), Some(AspectRatio::Landscape));
        assert_eq!(aspect_directive("a --ar 9:16 --ar 1:1"), Some(AspectRatio::Portrait));
        assert_eq!(aspect_directive("a cat --ar 2:1"), None);
        assert_eq!(aspect_directive("a cat"), None);
        assert_eq!(aspect_directive("a cat --AR 16:9"), None);
    }
}
