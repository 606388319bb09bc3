use std::{collections::HashMap, error::Error, fs, future::Future, io, path::Path, time::Duration};

use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;
use url::Url;

pub type ProviderError = Box<dyn Error + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    English,
    Russian,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Russian => "ru",
        }
    }
}

pub trait TranslationProvider: Send + Sync + 'static {
    fn translate(
        &self,
        text: &str,
        source: Language,
        target: Language,
    ) -> impl Future<Output = Result<String, ProviderError>> + Send;
}

/// The public Google Translate endpoint.
pub struct GoogleTranslate {
    client: reqwest::Client,
    endpoint: Url,
}

impl GoogleTranslate {
    pub const ENDPOINT: &'static str = "https://translate.googleapis.com/translate_a/single";

    pub fn new(timeout: Duration) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: Url::parse(Self::ENDPOINT)?,
        })
    }
}

impl TranslationProvider for GoogleTranslate {
    async fn translate(
        &self,
        text: &str,
        source: Language,
        target: Language,
    ) -> Result<String, ProviderError> {
        let response: Value = self
            .client
            .get(self.endpoint.clone())
            .query(&[
                ("client", "gtx"),
                ("sl", source.code()),
                ("tl", target.code()),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        parse_google_response(&response).ok_or_else(|| "unexpected translation response".into())
    }
}

/// Joins the translated segments of a `translate_a/single` response:
/// `[[["кошка","cat",...], ...], ...]`.
fn parse_google_response(response: &Value) -> Option<String> {
    let text: String = response
        .get(0)?
        .as_array()?
        .iter()
        .filter_map(|segment| segment.get(0)?.as_str())
        .collect();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_owned())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DictionaryEntry {
    One(String),
    Many(Vec<String>),
}

pub fn parse_dictionary(json: &str) -> Result<HashMap<String, String>, serde_json::Error> {
    let entries: HashMap<String, DictionaryEntry> = serde_json::from_str(json)?;
    Ok(entries
        .into_iter()
        .map(|(word, entry)| {
            let translation = match entry {
                DictionaryEntry::One(translation) => translation,
                DictionaryEntry::Many(translations) => translations.join(", "),
            };
            (word.trim().to_lowercase(), translation)
        })
        .collect())
}

/// Reads the local English dictionary. A missing or broken file leaves the
/// bot with an empty one.
pub fn load_dictionary(path: &Path) -> HashMap<String, String> {
    let json = match fs::read_to_string(path) {
        Ok(json) => json,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::warn!("Dictionary file {} not found, using empty dictionary", path.display());
            return HashMap::new();
        }
        Err(e) => {
            tracing::error!("Error reading dictionary {}: {}", path.display(), e);
            return HashMap::new();
        }
    };

    match parse_dictionary(&json) {
        Ok(dictionary) => {
            tracing::info!("Loaded {} words from dictionary", dictionary.len());
            dictionary
        }
        Err(e) => {
            tracing::error!("Error parsing dictionary {}: {}", path.display(), e);
            HashMap::new()
        }
    }
}

fn is_cyrillic(word: &str) -> bool {
    !word.is_empty()
        && word
            .chars()
            .all(|c| matches!(c, 'а'..='я' | 'А'..='Я' | 'ё' | 'Ё'))
}

pub struct Translator<P> {
    provider: P,
    dictionary: HashMap<String, String>,
}

impl<P: TranslationProvider> Translator<P> {
    pub fn new(provider: P, dictionary: HashMap<String, String>) -> Self {
        Self {
            provider,
            dictionary,
        }
    }

    pub fn dictionary_size(&self) -> usize {
        self.dictionary.len()
    }

    /// Translates Cyrillic words to English and everything else to Russian.
    /// English words fall back to the local dictionary when the provider
    /// fails or returns the word unchanged.
    #[instrument(level = "debug", skip(self))]
    pub async fn translate(&self, word: &str) -> Option<String> {
        let original = word.trim();
        let word = original.to_lowercase();

        if word.chars().count() < 2 || !word.chars().all(char::is_alphabetic) {
            return None;
        }

        let (source, target) = if is_cyrillic(&word) {
            (Language::Russian, Language::English)
        } else {
            (Language::English, Language::Russian)
        };

        match self.provider.translate(original, source, target).await {
            Ok(translation) if translation.to_lowercase() != word => {
                tracing::info!(
                    "Translation ({} → {}): '{}' -> '{}'",
                    source.code(),
                    target.code(),
                    original,
                    translation
                );
                return Some(translation);
            }
            Ok(_) => tracing::debug!("Provider returned '{}' unchanged", original),
            Err(e) => tracing::warn!("Translation provider failed for '{}': {}", original, e),
        }

        if source == Language::English {
            if let Some(translation) = self.dictionary.get(&word) {
                tracing::info!("Local dictionary: '{}' -> '{}'", original, translation);
                return Some(translation.clone());
            }
        }

        None
    }
}
