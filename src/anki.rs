//! AnkiConnect client: push generated cards straight into a running Anki.
//!
//! AnkiConnect is an Anki add-on that serves a JSON-RPC-ish API on
//! `http://localhost:8765`. Every call is a `POST` of
//! `{"action": …, "version": 6, "params": …}` and every answer is
//! `{"result": …, "error": …}`; a non-null `error` means the action failed
//! even though the HTTP status is 200.
//!
//! Only the three actions the CLI needs are wrapped: `deckNames`,
//! `createDeck` and `addNotes`. Notes use the stock "Basic" note type and
//! are sent in one batch.

use crate::error::FlashcardError;
use crate::output::FlashcardSet;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Where AnkiConnect listens by default.
pub const DEFAULT_ANKICONNECT_HOST: &str = "http://localhost:8765";

/// AnkiConnect API version spoken by this client.
pub const ANKICONNECT_VERSION: u8 = 6;

/// Note type every card is created with.
pub const NOTE_MODEL: &str = "Basic";

#[derive(Debug, Serialize)]
struct Request<'a, P: Serialize> {
    action: &'a str,
    version: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<P>,
}

#[derive(Debug, Deserialize)]
struct Response<T> {
    result: Option<T>,
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateDeckParams<'a> {
    deck: &'a str,
}

#[derive(Debug, Serialize)]
struct AddNotesParams<'a> {
    notes: Vec<Note<'a>>,
}

/// One `addNotes` entry.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Note<'a> {
    deck_name: &'a str,
    model_name: &'a str,
    fields: NoteFields<'a>,
    options: NoteOptions,
    tags: &'a [String],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct NoteFields<'a> {
    front: &'a str,
    back: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NoteOptions {
    allow_duplicate: bool,
}

/// Outcome of one `addNotes` batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddNotesSummary {
    /// Notes Anki created.
    pub added: usize,
    /// Notes Anki refused, usually because an identical note already exists.
    pub rejected: usize,
}

/// Client for one AnkiConnect endpoint.
#[derive(Debug, Clone)]
pub struct AnkiConnectClient {
    client: Client,
    host: String,
}

impl AnkiConnectClient {
    /// `host` is the full base URL, e.g. [`DEFAULT_ANKICONNECT_HOST`].
    pub fn new(host: impl Into<String>) -> Result<Self, FlashcardError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| FlashcardError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            host: host.into(),
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Names of every deck in the open collection.
    pub async fn deck_names(&self) -> Result<Vec<String>, FlashcardError> {
        self.invoke::<(), _>("deckNames", None).await
    }

    /// Create `deck` if it does not exist; returns its id.
    pub async fn create_deck(&self, deck: &str) -> Result<i64, FlashcardError> {
        let deck = require_deck_name(deck)?;
        self.invoke("createDeck", Some(CreateDeckParams { deck }))
            .await
    }

    /// Add every card in `cards` to `deck` as a Basic note.
    ///
    /// Duplicates of notes already in the collection are rejected by Anki
    /// and counted in [`AddNotesSummary::rejected`]; they do not fail the
    /// batch. An empty set sends nothing.
    pub async fn add_notes(
        &self,
        deck: &str,
        cards: &FlashcardSet,
        tags: &[String],
    ) -> Result<AddNotesSummary, FlashcardError> {
        let deck = require_deck_name(deck)?;
        if cards.is_empty() {
            return Ok(AddNotesSummary::default());
        }

        let params = AddNotesParams {
            notes: notes_for(deck, cards, tags),
        };
        let ids: Vec<Option<i64>> = self.invoke("addNotes", Some(params)).await?;
        let summary = summarise(&ids);
        if summary.rejected > 0 {
            warn!(
                "Anki rejected {} of {} notes (duplicates?)",
                summary.rejected,
                ids.len()
            );
        }
        info!("Added {} notes to deck '{}'", summary.added, deck);
        Ok(summary)
    }

    async fn invoke<P: Serialize, T: DeserializeOwned>(
        &self,
        action: &str,
        params: Option<P>,
    ) -> Result<T, FlashcardError> {
        let body = Request {
            action,
            version: ANKICONNECT_VERSION,
            params,
        };
        debug!("AnkiConnect {} → {}", action, self.host);

        let response = self
            .client
            .post(&self.host)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                FlashcardError::AnkiConnect(format!(
                    "could not reach {} ({e}); is Anki running with AnkiConnect installed?",
                    self.host
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FlashcardError::AnkiConnect(format!(
                "{action}: HTTP {status}"
            )));
        }

        let decoded: Response<T> = response
            .json()
            .await
            .map_err(|e| FlashcardError::AnkiConnect(format!("{action}: bad response: {e}")))?;
        into_result(action, decoded)
    }
}

fn require_deck_name(deck: &str) -> Result<&str, FlashcardError> {
    let deck = deck.trim();
    if deck.is_empty() {
        return Err(FlashcardError::AnkiConnect("deck name is required".into()));
    }
    Ok(deck)
}

fn notes_for<'a>(deck: &'a str, cards: &'a FlashcardSet, tags: &'a [String]) -> Vec<Note<'a>> {
    cards
        .iter()
        .map(|card| Note {
            deck_name: deck,
            model_name: NOTE_MODEL,
            fields: NoteFields {
                front: card.front(),
                back: card.back(),
            },
            options: NoteOptions {
                allow_duplicate: false,
            },
            tags,
        })
        .collect()
}

fn into_result<T>(action: &str, response: Response<T>) -> Result<T, FlashcardError> {
    if let Some(error) = response.error {
        return Err(FlashcardError::AnkiConnect(format!("{action}: {error}")));
    }
    response
        .result
        .ok_or_else(|| FlashcardError::AnkiConnect(format!("{action}: response had no result")))
}

fn summarise(ids: &[Option<i64>]) -> AddNotesSummary {
    let added = ids.iter().filter(|id| id.is_some()).count();
    AddNotesSummary {
        added,
        rejected: ids.len() - added,
    }
}
