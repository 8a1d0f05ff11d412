//! Prompt assembly: turns story metadata, characters, and a panel into the
//! single instruction text sent to the image model.
//!
//! Pure and deterministic. Callers validate input first (see `comic::validation`).

use crate::comic::prompts::{PAGE_PROMPT_TEMPLATE, PLOT_SECTION_TEMPLATE};
use crate::models::{Character, Panel, StoryContext};

/// Renders the page generation prompt.
pub fn assemble(story: &StoryContext, characters: &[Character], panel: &Panel) -> String {
    let plot_section = story
        .plot_text()
        .map(|plot| fill_template(PLOT_SECTION_TEMPLATE, &[("plot", plot)]))
        .unwrap_or_default();

    let characters_block = render_characters(characters);

    fill_template(
        PAGE_PROMPT_TEMPLATE,
        &[
            ("story_header", story.header.trim()),
            ("theme", story.theme.trim()),
            ("background", story.background.trim()),
            ("style", story.style.trim()),
            ("characters", &characters_block),
            ("panel_description", panel.description.trim()),
            ("plot_section", &plot_section),
        ],
    )
}

/// One line per character, in collection order:
/// `- Name: <name>[, Age: ..][, Height: ..][, Skin Tone: ..][, Key traits: ..]`
pub fn render_characters(characters: &[Character]) -> String {
    characters
        .iter()
        .map(render_character_line)
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_character_line(character: &Character) -> String {
    let mut parts = vec![format!("Name: {}", character.name.trim())];
    parts.extend(
        character
            .populated_attributes()
            .into_iter()
            .map(|(label, value)| format!("{label}: {value}")),
    );
    format!("- {}", parts.join(", "))
}

/// Substitutes `{key}` placeholders in one left-to-right pass, so braces inside
/// user-supplied values are never re-expanded. Unknown placeholders stay literal.
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len() + 256);
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after_open = &rest[open + 1..];

        let replacement = after_open.find('}').and_then(|close| {
            let key = &after_open[..close];
            values
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v, close))
        });

        match replacement {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after_open[close + 1..];
            }
            None => {
                out.push('{');
                rest = after_open;
            }
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn story() -> StoryContext {
        StoryContext {
            header: "The Lost Key".to_string(),
            theme: "Adventure".to_string(),
            background: "A misty forest village".to_string(),
            style: "Manga".to_string(),
            plot: None,
        }
    }

    fn panel() -> Panel {
        Panel {
            description: "Mira finds a rusty key under a rock".to_string(),
        }
    }

    fn character_lines(prompt: &str) -> Vec<&str> {
        prompt.lines().filter(|l| l.starts_with("- Name: ")).collect()
    }

    #[test]
    fn test_lost_key_scenario() {
        let characters = vec![
            Character {
                name: "Mira".to_string(),
                age: Some("12".to_string()),
                ..Character::default()
            },
            Character::named("Tobi"),
        ];

        let prompt = assemble(&story(), &characters, &panel());

        assert_eq!(
            character_lines(&prompt),
            vec!["- Name: Mira, Age: 12", "- Name: Tobi"]
        );
        assert!(prompt.contains("Mira finds a rusty key under a rock"));
        assert!(prompt.contains("[Story Header]: \"The Lost Key\""));
        assert!(prompt.contains("[Theme]: Adventure"));
    }

    #[test]
    fn test_one_line_per_character_in_input_order() {
        let characters: Vec<Character> = ["Zed", "Ada", "Zed", "Bo"]
            .iter()
            .map(|n| Character::named(*n))
            .collect();

        let prompt = assemble(&story(), &characters, &panel());

        assert_eq!(
            character_lines(&prompt),
            vec!["- Name: Zed", "- Name: Ada", "- Name: Zed", "- Name: Bo"]
        );
    }

    #[test]
    fn test_field_appears_iff_non_empty() {
        let character = Character {
            name: "Ren".to_string(),
            age: Some(String::new()),
            height: Some("tall".to_string()),
            skin_tone: Some("  ".to_string()),
            traits: Some("scar over left eye".to_string()),
        };

        let prompt = assemble(&story(), &[character], &panel());
        let lines = character_lines(&prompt);

        assert_eq!(
            lines,
            vec!["- Name: Ren, Height: tall, Key traits: scar over left eye"]
        );
        assert!(!lines[0].contains("Age"));
        assert!(!lines[0].contains("Skin Tone"));
    }

    #[test]
    fn test_assembly_is_deterministic() {
        let characters = vec![Character::named("Mira"), Character::named("Tobi")];
        let a = assemble(&story(), &characters, &panel());
        let b = assemble(&story(), &characters, &panel());
        assert_eq!(a, b);
    }

    #[test]
    fn test_absent_plot_omits_section() {
        let prompt = assemble(&story(), &[], &panel());
        assert!(!prompt.contains("[Plot]"));
        assert!(!prompt.contains("None"));
    }

    #[test]
    fn test_present_plot_is_rendered() {
        let mut story = story();
        story.plot = Some("Two kids chase a legend.".to_string());
        let prompt = assemble(&story, &[], &panel());
        assert!(prompt.contains("[Plot]:\nTwo kids chase a legend."));
    }

    #[test]
    fn test_constant_instructions_are_present() {
        let prompt = assemble(&story(), &[], &panel());
        assert!(prompt.contains("4-6 comic panels"));
        assert!(prompt.contains("chosen comic style"));
        assert!(prompt.contains("match their description across all panels"));
        assert!(prompt.contains("proportions consistent"));
        assert!(prompt.contains("this specific panel"));
        assert!(prompt.contains("panel framing"));
    }

    #[test]
    fn test_braces_in_user_text_are_not_expanded() {
        let mut story = story();
        story.header = "{panel_description}".to_string();
        let prompt = assemble(&story, &[], &panel());
        assert!(prompt.contains("[Story Header]: \"{panel_description}\""));
    }

    #[test]
    fn test_fill_template_keeps_unknown_placeholders() {
        let filled = fill_template("a {x} b {y} c {", &[("x", "1")]);
        assert_eq!(filled, "a 1 b {y} c {");
    }
}
