// Prompt constants for comic page generation.
// Placeholders are filled by `comic::assembler` in a single pass.

/// Page generation prompt template.
/// Placeholders: {story_header}, {theme}, {background}, {style},
///               {characters}, {panel_description}, {plot_section}
pub const PAGE_PROMPT_TEMPLATE: &str = r#"You are generating a multi-panel comic page. The image should contain about 4-6 comic panels.

[Story Header]: "{story_header}"

[Theme]: {theme}
[Background Setting]: {background}
[Comic Style]: {style}

[Characters]:
{characters}

[Panel Description]:
{panel_description}
{plot_section}
Instructions:
- Draw in the chosen comic style.
- Ensure all recurring characters match their description across all panels.
- Keep proportions consistent between panels.
- Focus only on what happens in this specific panel.
- Maintain a comic layout look (panel framing, speech bubbles optional).
"#;

/// Plot block, only rendered when the story carries a plot. Placeholder: {plot}
pub const PLOT_SECTION_TEMPLATE: &str = "\n[Plot]:\n{plot}\n";
