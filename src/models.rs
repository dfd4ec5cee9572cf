use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{FAILED_LABEL_SUFFIX, PANEL_COUNT, PLACEHOLDER_PANEL_PROMPT};

/// Opaque API key. Never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Trimmed credential, or `None` when the input is blank
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Credential(trimmed.to_string()))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential(***)")
    }
}

/// One comic panel: what the artist draws and the text printed on it
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Panel {
    pub prompt: String,
    #[serde(default)]
    pub description: String,
}

impl Panel {
    pub fn new(prompt: impl Into<String>, description: impl Into<String>) -> Self {
        Panel {
            prompt: prompt.into(),
            description: description.into(),
        }
    }

    /// Panel used to pad storyboards that came back short
    pub fn placeholder() -> Self {
        Panel::new(PLACEHOLDER_PANEL_PROMPT, "")
    }
}

/// The structured script that fully determines which images are requested
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Storyboard {
    pub title: String,
    pub front_cover_prompt: String,
    pub back_cover_prompt: String,
    pub panels: Vec<Panel>,
}

impl Storyboard {
    /// Pad or truncate the panel list to exactly six entries.
    ///
    /// Returns true when the list had to be adjusted.
    pub fn normalize(&mut self) -> bool {
        if self.panels.len() == PANEL_COUNT {
            return false;
        }
        self.panels.truncate(PANEL_COUNT);
        while self.panels.len() < PANEL_COUNT {
            self.panels.push(Panel::placeholder());
        }
        true
    }

    /// The eight slots of this comic in generation order
    pub fn slots(&self) -> Vec<Slot> {
        SlotId::all()
            .into_iter()
            .map(|id| Slot {
                prompt: self.prompt_for(id).unwrap_or_default().to_string(),
                label: id.label(),
                id,
            })
            .collect()
    }

    pub fn prompt_for(&self, id: SlotId) -> Option<&str> {
        match id {
            SlotId::FrontCover => Some(&self.front_cover_prompt),
            SlotId::BackCover => Some(&self.back_cover_prompt),
            SlotId::Panel(n) => n
                .checked_sub(1)
                .and_then(|i| self.panels.get(i))
                .map(|p| p.prompt.as_str()),
        }
    }

    pub fn prompt_for_mut(&mut self, id: SlotId) -> Option<&mut String> {
        match id {
            SlotId::FrontCover => Some(&mut self.front_cover_prompt),
            SlotId::BackCover => Some(&mut self.back_cover_prompt),
            SlotId::Panel(n) => n
                .checked_sub(1)
                .and_then(|i| self.panels.get_mut(i))
                .map(|p| &mut p.prompt),
        }
    }

    /// Narration of a panel slot; covers have none
    pub fn description_for(&self, id: SlotId) -> Option<&str> {
        match id {
            SlotId::Panel(n) => n
                .checked_sub(1)
                .and_then(|i| self.panels.get(i))
                .map(|p| p.description.as_str()),
            _ => None,
        }
    }

    pub fn description_for_mut(&mut self, id: SlotId) -> Option<&mut String> {
        match id {
            SlotId::Panel(n) => n
                .checked_sub(1)
                .and_then(|i| self.panels.get_mut(i))
                .map(|p| &mut p.description),
            _ => None,
        }
    }
}

/// Stable identifier of an image position in the comic
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlotId {
    FrontCover,
    /// Panel number, 1-based
    Panel(usize),
    BackCover,
}

impl SlotId {
    /// All slots in generation order
    pub fn all() -> Vec<SlotId> {
        let mut ids = Vec::with_capacity(PANEL_COUNT + 2);
        ids.push(SlotId::FrontCover);
        ids.extend((1..=PANEL_COUNT).map(SlotId::Panel));
        ids.push(SlotId::BackCover);
        ids
    }

    /// Position of this slot in generation order
    pub fn index(&self) -> usize {
        match self {
            SlotId::FrontCover => 0,
            SlotId::Panel(n) => *n,
            SlotId::BackCover => PANEL_COUNT + 1,
        }
    }

    pub fn label(&self) -> String {
        match self {
            SlotId::FrontCover => String::from("Front Cover"),
            SlotId::Panel(n) => format!("Panel {}", n),
            SlotId::BackCover => String::from("Back Cover"),
        }
    }

    pub fn next(&self) -> SlotId {
        let all = SlotId::all();
        all[(self.index() + 1) % all.len()]
    }

    pub fn prev(&self) -> SlotId {
        let all = SlotId::all();
        all[(self.index() + all.len() - 1) % all.len()]
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotId::FrontCover => write!(f, "front-cover"),
            SlotId::Panel(n) => write!(f, "panel-{}", n),
            SlotId::BackCover => write!(f, "back-cover"),
        }
    }
}

/// An image position together with the prompt it will be drawn from
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Slot {
    pub id: SlotId,
    pub prompt: String,
    pub label: String,
}

/// Result of generating one slot.
///
/// An empty `base64` marks a failed slot; `error` keeps the reason.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedImage {
    pub id: SlotId,
    pub prompt: String,
    pub base64: String,
    pub label: String,
    pub error: Option<String>,
}

impl GeneratedImage {
    pub fn succeeded(slot: &Slot, base64: String) -> Self {
        GeneratedImage {
            id: slot.id,
            prompt: slot.prompt.clone(),
            base64,
            label: slot.label.clone(),
            error: None,
        }
    }

    pub fn failed(slot: &Slot, reason: impl Into<String>) -> Self {
        GeneratedImage {
            id: slot.id,
            prompt: slot.prompt.clone(),
            base64: String::new(),
            label: format!("{}{}", slot.label, FAILED_LABEL_SUFFIX),
            error: Some(reason.into()),
        }
    }

    pub fn is_ready(&self) -> bool {
        !self.base64.is_empty()
    }
}

/// Kinds of brainstorming help offered on the ideation screen
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SuggestionKind {
    Villain,
    Sidekick,
    PlotTwist,
    MagicalItem,
    UnexpectedLocation,
}

impl SuggestionKind {
    pub const ALL: [SuggestionKind; 5] = [
        SuggestionKind::Villain,
        SuggestionKind::Sidekick,
        SuggestionKind::PlotTwist,
        SuggestionKind::MagicalItem,
        SuggestionKind::UnexpectedLocation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionKind::Villain => "A Villain",
            SuggestionKind::Sidekick => "A Sidekick",
            SuggestionKind::PlotTwist => "A Plot Twist",
            SuggestionKind::MagicalItem => "A Magical Item",
            SuggestionKind::UnexpectedLocation => "An Unexpected Location",
        }
    }

    /// Bare noun used inside the suggestion prompt
    pub fn noun(&self) -> &'static str {
        match self {
            SuggestionKind::Villain => "villain",
            SuggestionKind::Sidekick => "sidekick",
            SuggestionKind::PlotTwist => "plot twist",
            SuggestionKind::MagicalItem => "magical item",
            SuggestionKind::UnexpectedLocation => "unexpected location",
        }
    }
}

/// Visual style applied to every prompt of a storyboard
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ArtStyle {
    #[default]
    ClassicComic,
    MangaAnime,
    FilmNoir,
    SciFiConcept,
    Custom,
}

impl ArtStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtStyle::ClassicComic => "Classic Comic",
            ArtStyle::MangaAnime => "Manga / Anime",
            ArtStyle::FilmNoir => "Film Noir",
            ArtStyle::SciFiConcept => "Sci-Fi Concept",
            ArtStyle::Custom => "Custom",
        }
    }

    /// Style text sent to the model; `None` for the custom style
    pub fn preset(&self) -> Option<&'static str> {
        match self {
            ArtStyle::ClassicComic => Some("Vibrant colors, bold black outlines, dynamic action poses, classic American comic book art style."),
            ArtStyle::MangaAnime => Some("Monochromatic tones with screentones for shading, expressive characters with large eyes, dynamic panel layouts, Japanese manga art style."),
            ArtStyle::FilmNoir => Some("High-contrast black and white, dramatic shadows, gritty urban setting, mysterious atmosphere, film noir cinematic style."),
            ArtStyle::SciFiConcept => Some("Futuristic technology, sleek metallic surfaces, neon glowing lights, detailed spacecraft and cityscapes, science fiction concept art style."),
            ArtStyle::Custom => None,
        }
    }

    pub fn next(&self) -> ArtStyle {
        match self {
            ArtStyle::ClassicComic => ArtStyle::MangaAnime,
            ArtStyle::MangaAnime => ArtStyle::FilmNoir,
            ArtStyle::FilmNoir => ArtStyle::SciFiConcept,
            ArtStyle::SciFiConcept => ArtStyle::Custom,
            ArtStyle::Custom => ArtStyle::ClassicComic,
        }
    }

    /// Final style text, falling back to `custom` for the custom style
    pub fn resolve(&self, custom: &str) -> String {
        match self.preset() {
            Some(text) => text.to_string(),
            None => custom.trim().to_string(),
        }
    }
}

/// Everything the storyboard request needs from the ideation screen
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoryboardRequest {
    pub story_idea: String,
    pub art_style: String,
    pub character_descriptions: String,
}

/// Scale of the exported raster
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ExportQuality {
    #[default]
    Standard,
    High,
}

impl ExportQuality {
    pub fn scale(&self) -> u32 {
        match self {
            ExportQuality::Standard => 2,
            ExportQuality::High => 4,
        }
    }

    pub fn toggle(&self) -> ExportQuality {
        match self {
            ExportQuality::Standard => ExportQuality::High,
            ExportQuality::High => ExportQuality::Standard,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExportQuality::Standard => "High (x2)",
            ExportQuality::High => "Ultra (x4)",
        }
    }
}

/// Output format of an export
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Pdf,
    Png,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Png => "png",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storyboard_with(panels: usize) -> Storyboard {
        Storyboard {
            title: "Test".into(),
            front_cover_prompt: "front".into(),
            back_cover_prompt: "back".into(),
            panels: (0..panels).map(|i| Panel::new(format!("p{}", i), "")).collect(),
        }
    }

    #[test]
    fn test_normalize_always_yields_six_panels() {
        for count in [0, 3, 6, 9] {
            let mut sb = storyboard_with(count);
            let adjusted = sb.normalize();
            assert_eq!(sb.panels.len(), PANEL_COUNT);
            assert_eq!(adjusted, count != PANEL_COUNT);
        }
    }

    #[test]
    fn test_normalize_pads_with_placeholder_and_keeps_order() {
        let mut sb = storyboard_with(3);
        sb.normalize();
        assert_eq!(sb.panels[2].prompt, "p2");
        assert_eq!(sb.panels[3], Panel::placeholder());
        assert_eq!(sb.panels[5].description, "");

        let mut long = storyboard_with(9);
        long.normalize();
        assert_eq!(long.panels.last().unwrap().prompt, "p5");
    }

    #[test]
    fn test_slots_are_in_fixed_order() {
        let sb = storyboard_with(6);
        let ids: Vec<String> = sb.slots().iter().map(|s| s.id.to_string()).collect();
        assert_eq!(
            ids,
            vec![
                "front-cover", "panel-1", "panel-2", "panel-3",
                "panel-4", "panel-5", "panel-6", "back-cover"
            ]
        );
        assert_eq!(sb.slots()[1].prompt, "p0");
        assert_eq!(sb.slots()[7].label, "Back Cover");
    }

    #[test]
    fn test_storyboard_uses_camel_case_on_the_wire() {
        let json = r#"{"title":"T","frontCoverPrompt":"f","backCoverPrompt":"b","panels":[{"prompt":"x","description":"y"}]}"#;
        let sb: Storyboard = serde_json::from_str(json).unwrap();
        assert_eq!(sb.front_cover_prompt, "f");
        assert_eq!(sb.panels[0].description, "y");
    }

    #[test]
    fn test_failed_image_marks_label() {
        let slot = storyboard_with(6).slots().remove(0);
        let img = GeneratedImage::failed(&slot, "boom");
        assert!(!img.is_ready());
        assert_eq!(img.label, "Front Cover (Failed)");
    }

    #[test]
    fn test_slot_navigation_wraps() {
        assert_eq!(SlotId::BackCover.next(), SlotId::FrontCover);
        assert_eq!(SlotId::FrontCover.prev(), SlotId::BackCover);
        assert_eq!(SlotId::Panel(6).next(), SlotId::BackCover);
    }

    #[test]
    fn test_custom_style_uses_user_text() {
        assert_eq!(ArtStyle::Custom.resolve("  watercolor  "), "watercolor");
        assert!(ArtStyle::FilmNoir.resolve("ignored").contains("film noir"));
    }
}
