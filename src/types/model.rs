use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A model identifier.
///
/// This can be one of the well-known models or a custom string value for
/// fine-tunes, newer models, or models served by compatible endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Model {
    /// Known model versions
    Known(KnownModel),

    /// Custom model identifier
    Custom(String),
}

/// Well-known model names.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KnownModel {
    /// GPT-3.5 Turbo (latest)
    #[serde(rename = "gpt-3.5-turbo")]
    Gpt35Turbo,

    /// GPT-3.5 Turbo (2023-03-01 snapshot)
    #[serde(rename = "gpt-3.5-turbo-0301")]
    Gpt35Turbo0301,

    /// GPT-4 (latest)
    #[serde(rename = "gpt-4")]
    Gpt4,

    /// GPT-4 (2023-03-14 snapshot)
    #[serde(rename = "gpt-4-0314")]
    Gpt40314,

    /// GPT-4 with a 32k context window
    #[serde(rename = "gpt-4-32k")]
    Gpt432k,

    /// GPT-4o
    #[serde(rename = "gpt-4o")]
    Gpt4o,

    /// GPT-4o mini
    #[serde(rename = "gpt-4o-mini")]
    Gpt4oMini,

    /// Davinci text completion model
    #[serde(rename = "text-davinci-003")]
    TextDavinci003,

    /// Davinci text edit model
    #[serde(rename = "text-davinci-edit-001")]
    TextDavinciEdit001,

    /// Davinci code edit model
    #[serde(rename = "code-davinci-edit-001")]
    CodeDavinciEdit001,
}

impl KnownModel {
    /// Every known model, in declaration order.
    pub const ALL: [KnownModel; 10] = [
        KnownModel::Gpt35Turbo,
        KnownModel::Gpt35Turbo0301,
        KnownModel::Gpt4,
        KnownModel::Gpt40314,
        KnownModel::Gpt432k,
        KnownModel::Gpt4o,
        KnownModel::Gpt4oMini,
        KnownModel::TextDavinci003,
        KnownModel::TextDavinciEdit001,
        KnownModel::CodeDavinciEdit001,
    ];

    /// The wire name of the model.
    pub fn as_str(&self) -> &'static str {
        match self {
            KnownModel::Gpt35Turbo => "gpt-3.5-turbo",
            KnownModel::Gpt35Turbo0301 => "gpt-3.5-turbo-0301",
            KnownModel::Gpt4 => "gpt-4",
            KnownModel::Gpt40314 => "gpt-4-0314",
            KnownModel::Gpt432k => "gpt-4-32k",
            KnownModel::Gpt4o => "gpt-4o",
            KnownModel::Gpt4oMini => "gpt-4o-mini",
            KnownModel::TextDavinci003 => "text-davinci-003",
            KnownModel::TextDavinciEdit001 => "text-davinci-edit-001",
            KnownModel::CodeDavinciEdit001 => "code-davinci-edit-001",
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Model::Known(known_model) => write!(f, "{known_model}"),
            Model::Custom(custom) => write!(f, "{custom}"),
        }
    }
}

impl fmt::Display for KnownModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KnownModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KnownModel::ALL
            .iter()
            .find(|known| known.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown model: {s}"))
    }
}

impl FromStr for Model {
    type Err = std::convert::Infallible;

    /// Never fails: names that are not known become `Model::Custom`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.parse::<KnownModel>() {
            Ok(known) => Model::Known(known),
            Err(_) => Model::Custom(s.to_string()),
        })
    }
}

impl Default for Model {
    fn default() -> Self {
        Model::Known(KnownModel::Gpt35Turbo)
    }
}

impl From<KnownModel> for Model {
    fn from(model: KnownModel) -> Self {
        Model::Known(model)
    }
}

impl From<String> for Model {
    fn from(model: String) -> Self {
        model.parse().unwrap_or(Model::Custom(model))
    }
}

impl From<&str> for Model {
    fn from(model: &str) -> Self {
        Model::from(model.to_string())
    }
}
