//! Constants used throughout the critique core crate.
//!
//! Wire key names, placeholder text and storage file names live here so the normalizer, the
//! renderer and the store agree on them.

/// Text substituted for any field the normalizer cannot recover.
pub const PLACEHOLDER: &str = "Analysis pending...";

/// Explanation attached to code examples that arrived without one.
pub const GENERIC_CODE_EXPLANATION: &str = "Suggested code improvement";

/// Request text stored alongside the report of an analysis.
pub const ANALYZE_REQUEST_TEXT: &str = "Analyze the code";

/// Backend response keys.
pub const KEY_PURPOSE: &str = "proje_amaci";
pub const KEY_SUMMARY: &str = "proje_ozeti";
pub const KEY_TECHNOLOGIES: &str = "kullanilan_teknolojiler";
pub const KEY_OVERALL_ASSESSMENT: &str = "genel_degerlendirme";
pub const KEY_STRENGTHS: &str = "guclu_yonler";
pub const KEY_IMPROVEMENT_AREAS: &str = "iyilestirme_alanlari";
pub const KEY_CODE_EXAMPLES: &str = "kod_ornekleri";
pub const KEY_SECURITY: &str = "guvenlik_onerileri";
pub const KEY_PERFORMANCE: &str = "performans_onerileri";

/// Code example sub-keys.
pub const KEY_EXPLANATION: &str = "aciklama";
pub const KEY_CODE: &str = "kod";

/// The three scalar fields, in report order.
pub const SCALAR_KEYS: [&str; 3] = [KEY_PURPOSE, KEY_SUMMARY, KEY_OVERALL_ASSESSMENT];

/// The five plain list fields, in report order.
pub const LIST_KEYS: [&str; 5] = [
    KEY_TECHNOLOGIES,
    KEY_STRENGTHS,
    KEY_IMPROVEMENT_AREAS,
    KEY_SECURITY,
    KEY_PERFORMANCE,
];

/// Default directory for conversation storage when none is configured.
pub const DEFAULT_DATA_DIR: &str = "conversation_data";

/// Directory name for conversation threads below the data directory.
pub const CONVERSATIONS_DIR_NAME: &str = "conversations";

/// Filename for thread metadata.
pub const THREAD_META_FILENAME: &str = "thread.yaml";

/// Filename for the append-only thread message log.
pub const THREAD_MESSAGES_FILENAME: &str = "messages.md";

/// Default OpenAI chat model.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Default Gemini model.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-pro";

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 60;
