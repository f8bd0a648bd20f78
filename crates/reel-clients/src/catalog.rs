//! Story topics and their upload metadata.

use std::path::Path;

use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use reel_models::story::MAX_TITLE_CHARS;
use reel_models::{PrivacyStatus, UploadMetadata};

use crate::error::{ClientError, ClientResult};

/// A story category with the metadata its uploads carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    /// Name substituted into the story prompt
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playlist_id: Option<String>,
}

impl Topic {
    fn builtin(name: &str, tags: &[&str], description: &str) -> Self {
        Self {
            name: name.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            description: description.to_string(),
            playlist_id: None,
        }
    }

    /// Upload metadata for a video about this topic.
    pub fn metadata(&self, title: &str, privacy: PrivacyStatus) -> UploadMetadata {
        UploadMetadata {
            description: self.description.clone(),
            tags: self.tags.clone(),
            privacy,
            playlist_id: self.playlist_id.clone(),
            ..UploadMetadata::new(upload_title(title))
        }
    }
}

/// `<title> #<n>` with `n` in `0..=999`, trimmed to fit the title limit.
///
/// The suffix keeps repeated titles distinct on the channel.
pub fn upload_title(title: &str) -> String {
    let suffix = format!(" #{}", rand::rng().random_range(0..=999));
    let room = MAX_TITLE_CHARS.saturating_sub(suffix.chars().count());
    let base: String = title.trim().chars().take(room).collect();
    format!("{}{}", base.trim_end(), suffix)
}

/// The set of topics a run picks from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicCatalog {
    pub topics: Vec<Topic>,
}

impl Default for TopicCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl TopicCatalog {
    /// The built-in story categories.
    pub fn builtin() -> Self {
        let topics = vec![
            Topic::builtin(
                "unsolved mysteries",
                &["mystery", "unsolved mysteries", "creepy", "paranormal", "true crime", "conspiracy", "unexplained", "spooky", "intrigue", "cold case"],
                "Explore the unknown and the eerie with gripping tales of unsolved cases and bizarre events that defy explanation. From mysterious disappearances to paranormal encounters, dive into the world of the unexplained. #mystery #unsolvedmysteries #creepy #paranormal #truecrime #conspiracy #unexplained #spooky #intrigue #coldcase",
            ),
            Topic::builtin(
                "true crime",
                &["true crime", "crime", "murder", "investigation", "serial killer", "mystery", "forensic", "crime documentary", "justice", "criminal"],
                "Delve into real-life criminal cases that shock and captivate. From infamous murders to chilling investigations, uncover the dark details behind the headlines. #truecrime #crime #murder #investigation #serialkiller #mystery #forensic #crimedocumentary #justice #criminal",
            ),
            Topic::builtin(
                "scary stories",
                &["scary stories", "horror", "creepy", "ghost stories", "paranormal", "spooky", "terrifying", "haunted", "supernatural", "chilling"],
                "Get ready for spine-chilling tales that will keep you up at night. From ghostly encounters to supernatural horrors, these stories are guaranteed to send shivers down your spine. #scarystories #horror #creepy #ghoststories #paranormal #spooky #terrifying #haunted #supernatural #chilling",
            ),
            Topic::builtin(
                "reddit stories",
                &["reddit stories", "reddit", "storytime", "tales", "rslash", "askreddit", "funny stories", "drama", "anecdotes", "social media"],
                "Discover intriguing stories from Reddit that range from hilarious to heartwarming to downright bizarre. Join us as we dive into the best tales from the internet’s most vibrant communities. #redditstories #reddit #storytime #tales #rslash #askreddit #funnystories #drama #anecdotes #socialmedia",
            ),
            Topic::builtin(
                "karma stories",
                &["karma stories", "karma", "wholesome", "feel good", "justice served", "payback", "revenge stories", "uplifting", "satisfying", "life lessons"],
                "Enjoy uplifting tales of justice where good deeds are rewarded and wrongdoers get their comeuppance. These satisfying stories of karma will leave you feeling inspired. #karmastories #karma #wholesome #feelgood #justiceserved #payback #revengestories #uplifting #satisfying #lifelessons",
            ),
            Topic::builtin(
                "today I fucked up",
                &["TIFU", "funny fails", "oops", "embarrassing", "funny stories", "reddit TIFU", "mistakes", "hilarious", "cringe", "comedy"],
                "Laugh at relatable fails and oops moments that make you glad it wasn’t you. From embarrassing blunders to hilarious mishaps, these stories are pure comedy gold. #TIFU #funnyfails #oops #embarrassing #funnystories #redditTIFU #mistakes #hilarious #cringe #comedy",
            ),
            Topic::builtin(
                "am I the asshole",
                &["AITA", "am I the asshole", "relationships", "judgment", "reddit AITA", "drama", "morality", "ethics", "social dilemmas", "conflict"],
                "Engage in moral dilemmas and judgments with stories that spark debate. Are they in the wrong, or is it someone else? Dive into the drama and decide for yourself. #AITA #amItheasshole #relationships #judgment #redditAITA #drama #morality #ethics #socialdilemmas #conflict",
            ),
        ];
        Self { topics }
    }

    /// Load a catalog from a JSON file: `{"topics": [...]}`.
    pub fn from_file(path: &Path) -> ClientResult<Self> {
        let raw = std::fs::read(path)?;
        let catalog: Self = serde_json::from_slice(&raw)?;
        if catalog.topics.is_empty() {
            return Err(ClientError::config(format!(
                "topic catalog {} has no topics",
                path.display()
            )));
        }
        Ok(catalog)
    }

    /// `REEL_CATALOG_PATH` when set, the built-in catalog otherwise.
    pub fn from_env() -> ClientResult<Self> {
        match std::env::var("REEL_CATALOG_PATH") {
            Ok(path) if !path.trim().is_empty() => {
                let catalog = Self::from_file(Path::new(&path))?;
                info!(path = %path, topics = catalog.topics.len(), "Loaded topic catalog");
                Ok(catalog)
            }
            _ => Ok(Self::builtin()),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Topic> {
        self.topics.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Pick a topic uniformly at random.
    pub fn choose(&self) -> Option<&Topic> {
        self.topics.choose(&mut rand::rng())
    }
}
