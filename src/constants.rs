//! Application constants
//!
//! Centralized location for magic strings and configuration defaults.

/// Key of the single persisted credential entry
pub const CREDENTIAL_STORAGE_KEY: &str = "comic-crafter-api-key";

/// Default base URL of the generative API
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Model used for idea suggestions and storyboards
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";

/// Model used for panel and cover art
pub const DEFAULT_IMAGE_MODEL: &str = "imagen-4.0-generate-001";

/// Number of panels in every storyboard
pub const PANEL_COUNT: usize = 6;

/// Number of image slots in a comic (front cover, panels, back cover)
pub const SLOT_COUNT: usize = PANEL_COUNT + 2;

/// Prompt used to pad storyboards that came back short
pub const PLACEHOLDER_PANEL_PROMPT: &str = "A blank panel.";

/// Text appended to the idea buffer when brainstorming fails
pub const BRAINSTORM_FAILED: &str = "An error occurred while brainstorming. Please try again.";

/// Notice raised when the custom art style is left blank
pub const ART_STYLE_REQUIRED: &str = "Please select or define an art style.";

/// Status shown before the first slot of a run starts
pub const STATUS_WARMING_UP: &str = "Warming up the AI artists...";

/// Status shown once every slot of a run has been attempted
pub const STATUS_READY: &str = "Your comic is ready!";

/// Suffix added to the label of a slot whose image failed
pub const FAILED_LABEL_SUFFIX: &str = " (Failed)";

/// Prefix turning a visual prompt into a cheap preview request
pub const PREVIEW_PROMPT_PREFIX: &str =
    "A detailed comic book panel preview sketch in black and white line art with basic shading, depicting: ";

/// Starting story idea shown on the ideation screen
pub const DEFAULT_STORY_IDEA: &str = "A detective cat who solves mysteries in a city of robots.";

/// Starting character sheet shown on the ideation screen
pub const DEFAULT_CHARACTERS: &str = "Detective Mittens: A sleek black cat wearing a tiny trench coat and fedora. Officer Bot: A friendly, chrome-plated police robot with a single blue optic sensor.";

/// Prefix of every exported file name
pub const EXPORT_FILE_PREFIX: &str = "comic-crafter-";

/// Application name
pub const APP_NAME: &str = "Comic Crafter";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
