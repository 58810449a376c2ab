//! Configuration management
//!
//! Loaded once at startup from YAML. Every weight, threshold and cap used by
//! the engine lives here; [`Config::validate`] rejects inconsistent settings
//! before any query runs.

use crate::error::{MenuSiftError, Result};
use crate::schema::{default_catalog_specs, AttributeSchema, AttributeSpec, AttributeType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Default corpus file (CSV or JSON)
    #[serde(default)]
    pub corpus_path: Option<PathBuf>,

    /// Attribute schema in label order
    #[serde(default = "default_catalog_specs")]
    pub schema: Vec<AttributeSpec>,

    #[serde(default)]
    pub scoring: ScoringConfig,

    #[serde(default)]
    pub fallback: FallbackConfig,

    #[serde(default)]
    pub selection: SelectionConfig,

    /// LLM service configuration
    #[serde(default)]
    pub llm_service: LLMServiceConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            corpus_path: None,
            schema: default_catalog_specs(),
            scoring: ScoringConfig::default(),
            fallback: FallbackConfig::default(),
            selection: SelectionConfig::default(),
            llm_service: LLMServiceConfig::default(),
        }
    }
}

/// Decay applied to numeric partial credit as a function of normalised distance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecayKind {
    /// `max(0, 1 - d)`
    #[default]
    Linear,
    /// `exp(-d)`
    Exponential,
    /// `exp(-d²)`
    Gaussian,
}

/// Bonus for a boolean constraint proportional to a numeric attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradedBonus {
    /// Numeric attribute the bonus is read from
    pub attribute: String,
    pub divisor: f64,
    pub cap: f64,
}

/// Fallback scorer weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Reward for a satisfied boolean constraint
    #[serde(default = "default_one")]
    pub boolean_reward: f64,

    /// Penalty for a violated boolean constraint
    #[serde(default = "default_boolean_penalty")]
    pub boolean_penalty: f64,

    /// Per-attribute penalties replacing `boolean_penalty`
    #[serde(default = "default_penalty_overrides")]
    pub boolean_penalty_overrides: BTreeMap<String, f64>,

    /// Reward for a satisfied numeric constraint
    #[serde(default = "default_one")]
    pub numeric_reward: f64,

    #[serde(default)]
    pub decay: DecayKind,

    /// Upper bound on the decayed credit of a violated numeric constraint, as a
    /// fraction of `numeric_reward`. Must be below 1 so a value sitting on a
    /// strict boundary ranks under one that satisfies it.
    #[serde(default = "default_near_miss_cap")]
    pub near_miss_cap: f64,

    /// Normalisation range per numeric attribute
    #[serde(default)]
    pub numeric_scales: BTreeMap<String, f64>,

    /// Normalisation range for attributes without an entry; when unset the
    /// corpus's observed range for the attribute is used
    #[serde(default)]
    pub default_numeric_scale: Option<f64>,

    /// Reward per matching categorical value
    #[serde(default = "default_one")]
    pub categorical_reward: f64,

    /// Extra credit for boolean constraints requiring `true`
    #[serde(default = "default_graded_booleans")]
    pub graded_booleans: BTreeMap<String, GradedBonus>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            boolean_reward: 1.0,
            boolean_penalty: default_boolean_penalty(),
            boolean_penalty_overrides: default_penalty_overrides(),
            numeric_reward: 1.0,
            decay: DecayKind::default(),
            near_miss_cap: default_near_miss_cap(),
            numeric_scales: BTreeMap::new(),
            default_numeric_scale: None,
            categorical_reward: 1.0,
            graded_booleans: default_graded_booleans(),
        }
    }
}

impl ScoringConfig {
    /// Penalty applied when a boolean constraint on `attribute` is violated
    pub fn penalty_for(&self, attribute: &str) -> f64 {
        self.boolean_penalty_overrides
            .get(attribute)
            .copied()
            .unwrap_or(self.boolean_penalty)
    }
}

fn default_one() -> f64 {
    1.0
}

fn default_near_miss_cap() -> f64 {
    0.99
}

fn default_boolean_penalty() -> f64 {
    0.5
}

fn default_penalty_overrides() -> BTreeMap<String, f64> {
    BTreeMap::from([
        ("is_vegano".to_string(), 5.0),
        ("is_vegetariano".to_string(), 5.0),
    ])
}

fn default_graded_booleans() -> BTreeMap<String, GradedBonus> {
    BTreeMap::from([(
        "alto_proteina".to_string(),
        GradedBonus {
            attribute: "proteinas".to_string(),
            divisor: 5.0,
            cap: 2.5,
        },
    )])
}

/// When the fallback scorer runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackConfig {
    /// Minimum exact matches before fallback scoring is skipped
    #[serde(default = "default_base_threshold")]
    pub base_threshold: usize,

    /// Minimum used when the query asks for variety
    #[serde(default = "default_extended_threshold")]
    pub extended_threshold: usize,

    /// Words signalling a request for variety (weekly plans, several options)
    #[serde(default = "default_variety_keywords")]
    pub variety_keywords: Vec<String>,

    /// Append best fallback items to a short exact result
    #[serde(default)]
    pub top_up_exact: bool,

    /// Maximum number of items appended by `top_up_exact`
    #[serde(default = "default_top_up_limit")]
    pub top_up_limit: usize,

    /// Items must score above this to be used for a top-up
    #[serde(default)]
    pub min_fallback_score: f64,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            base_threshold: default_base_threshold(),
            extended_threshold: default_extended_threshold(),
            variety_keywords: default_variety_keywords(),
            top_up_exact: false,
            top_up_limit: default_top_up_limit(),
            min_fallback_score: 0.0,
        }
    }
}

fn default_base_threshold() -> usize {
    3
}

fn default_extended_threshold() -> usize {
    5
}

fn default_top_up_limit() -> usize {
    10
}

fn default_variety_keywords() -> Vec<String> {
    [
        "semana",
        "semanas",
        "plan",
        "planificar",
        "almuerzos",
        "platos",
        "comidas",
        "días",
        "repetir",
        "menú",
        "distintos",
        "opciones",
        "tuppers",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Result size caps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Items handed to response generation
    #[serde(default = "default_context_cap")]
    pub context_cap: usize,

    /// Items ultimately suggested to the user
    #[serde(default = "default_presentation_cap")]
    pub presentation_cap: usize,

    /// Break equal scores by semantic rank
    #[serde(default = "default_true")]
    pub semantic_tie_break: bool,

    /// Order by semantic rank when the query carries no constraints
    #[serde(default)]
    pub semantic_when_unconstrained: bool,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            context_cap: default_context_cap(),
            presentation_cap: default_presentation_cap(),
            semantic_tie_break: true,
            semantic_when_unconstrained: false,
        }
    }
}

fn default_context_cap() -> usize {
    50
}

fn default_presentation_cap() -> usize {
    5
}

fn default_true() -> bool {
    true
}

/// LLM service configuration for external inference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMServiceConfig {
    /// Base URL of an OpenAI-compatible service
    #[serde(default = "default_service_url")]
    pub url: String,

    /// Model name for chat completions (extraction and answers)
    #[serde(default = "default_chat_model")]
    pub model: String,

    /// Base URL for embeddings service (can be different from LLM URL)
    #[serde(default)]
    pub embedding_url: Option<String>,

    /// Model name for embeddings
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// API key (optional, for authenticated services)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_extraction_temperature")]
    pub extraction_temperature: f32,

    #[serde(default)]
    pub generation_temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl LLMServiceConfig {
    /// Get the embeddings URL (falls back to main URL if not specified)
    pub fn embeddings_url(&self) -> &str {
        self.embedding_url.as_deref().unwrap_or(&self.url)
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}

impl Default for LLMServiceConfig {
    fn default() -> Self {
        Self {
            url: default_service_url(),
            model: default_chat_model(),
            embedding_url: std::env::var("MENUSIFT_EMBEDDING_URL").ok(),
            embedding_model: default_embedding_model(),
            api_key: std::env::var("MENUSIFT_LLM_API_KEY").ok(),
            timeout_secs: default_timeout(),
            extraction_temperature: default_extraction_temperature(),
            generation_temperature: 0.0,
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_service_url() -> String {
    std::env::var("MENUSIFT_LLM_URL").unwrap_or_else(|_| "https://openrouter.ai/api".to_string())
}

fn default_chat_model() -> String {
    std::env::var("MENUSIFT_LLM_MODEL").unwrap_or_else(|_| "openai/gpt-4o-mini".to_string())
}

fn default_embedding_model() -> String {
    std::env::var("MENUSIFT_EMBEDDING_MODEL")
        .unwrap_or_else(|_| "sentence-transformers/all-MiniLM-L6-v2".to_string())
}

fn default_timeout() -> u64 {
    30
}

fn default_extraction_temperature() -> f32 {
    0.1
}

fn default_max_tokens() -> u32 {
    512
}

impl Config {
    /// Load config from an explicit path, `MENUSIFT_CONFIG`, or the default path.
    /// A missing default file yields the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var("MENUSIFT_CONFIG").ok().map(PathBuf::from));

        match explicit {
            Some(path) => Self::from_file(&path),
            None => {
                let path = Self::default_path();
                if path.exists() {
                    Self::from_file(&path)
                } else {
                    Ok(Config::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::CONFIG_DIR_NAME)
            .join("config.yml")
    }

    /// Build the attribute schema declared by this configuration
    pub fn attribute_schema(&self) -> Result<AttributeSchema> {
        AttributeSchema::new(self.schema.clone())
    }

    /// Check weights, caps and schema references. Returns the schema on success.
    pub fn validate(&self) -> Result<AttributeSchema> {
        let schema = self.attribute_schema()?;
        let s = &self.scoring;

        for (name, weight) in [
            ("boolean_reward", s.boolean_reward),
            ("boolean_penalty", s.boolean_penalty),
            ("numeric_reward", s.numeric_reward),
            ("categorical_reward", s.categorical_reward),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(invalid(format!(
                    "{} must be a finite non-negative number, got {}",
                    name, weight
                )));
            }
        }

        if !(0.0..1.0).contains(&s.near_miss_cap) {
            return Err(invalid(format!(
                "near_miss_cap must be in [0, 1), got {}",
                s.near_miss_cap
            )));
        }

        let builtin_penalties = default_penalty_overrides();
        for (attr, penalty) in &s.boolean_penalty_overrides {
            if !schema.contains(attr) && builtin_penalties.get(attr) == Some(penalty) {
                tracing::debug!("Skipping built-in penalty for undeclared '{}'", attr);
                continue;
            }
            expect_type(&schema, attr, AttributeType::Boolean, "boolean_penalty_overrides")?;
            if !penalty.is_finite() || *penalty < 0.0 {
                return Err(invalid(format!(
                    "penalty for '{}' must be a finite non-negative number",
                    attr
                )));
            }
        }

        for (attr, scale) in &s.numeric_scales {
            expect_type(&schema, attr, AttributeType::Number, "numeric_scales")?;
            if !scale.is_finite() || *scale <= 0.0 {
                return Err(invalid(format!("scale for '{}' must be positive", attr)));
            }
        }

        if let Some(scale) = s.default_numeric_scale {
            if !scale.is_finite() || scale <= 0.0 {
                return Err(invalid("default_numeric_scale must be positive".to_string()));
            }
        }

        let builtin_bonuses = default_graded_booleans();
        for (attr, bonus) in &s.graded_booleans {
            let undeclared = !schema.contains(attr) || !schema.contains(&bonus.attribute);
            if undeclared && builtin_bonuses.get(attr) == Some(bonus) {
                tracing::debug!("Skipping built-in bonus for undeclared '{}'", attr);
                continue;
            }
            expect_type(&schema, attr, AttributeType::Boolean, "graded_booleans")?;
            expect_type(
                &schema,
                &bonus.attribute,
                AttributeType::Number,
                "graded_booleans",
            )?;
            if !bonus.divisor.is_finite() || bonus.divisor <= 0.0 {
                return Err(invalid(format!("divisor for '{}' must be positive", attr)));
            }
            if !bonus.cap.is_finite() || bonus.cap < 0.0 {
                return Err(invalid(format!("cap for '{}' must be non-negative", attr)));
            }
        }

        let f = &self.fallback;
        if !f.min_fallback_score.is_finite() {
            return Err(invalid("min_fallback_score must be finite".to_string()));
        }
        if f.extended_threshold < f.base_threshold {
            return Err(invalid(format!(
                "extended_threshold ({}) is below base_threshold ({})",
                f.extended_threshold, f.base_threshold
            )));
        }

        let sel = &self.selection;
        if sel.presentation_cap == 0 {
            return Err(invalid("presentation_cap must be at least 1".to_string()));
        }
        if sel.presentation_cap > sel.context_cap {
            return Err(invalid(format!(
                "presentation_cap ({}) exceeds context_cap ({})",
                sel.presentation_cap, sel.context_cap
            )));
        }

        Ok(schema)
    }
}

fn invalid(message: String) -> MenuSiftError {
    MenuSiftError::InvalidConfiguration(message)
}

fn expect_type(
    schema: &AttributeSchema,
    attr: &str,
    expected: AttributeType,
    section: &str,
) -> Result<()> {
    match schema.type_of(attr) {
        Some(kind) if kind == expected => Ok(()),
        Some(kind) => Err(invalid(format!(
            "{}: '{}' is declared {} but must be {}",
            section, attr, kind, expected
        ))),
        None => Err(invalid(format!(
            "{}: '{}' is not in the attribute schema",
            section, attr
        ))),
    }
}
