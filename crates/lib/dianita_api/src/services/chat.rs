//! Conversation assembly — the append-turn flow.
//!
//! Appending a turn is a fixed sequence: validate the utterance, prove chat
//! ownership, persist the user message, rebuild the bounded history window,
//! call the completion provider, and persist the assistant reply with its
//! deduplicated citations. If the provider fails, the already-persisted
//! user message stays and no assistant message is written.

use sqlx::PgPool;
use uuid::Uuid;

use dianita_core::chats::{self, ChatSessionRow};
use dianita_core::provider::sources::dedupe_sources;
use dianita_core::provider::{
    ChatTurn, CompletionProvider, CompletionRequest, Source, TurnRole,
};

use crate::error::{AppError, AppResult};

/// How many stored messages are sent to the provider per turn. Applies
/// uniformly to fresh and resumed chats; older context simply falls away.
const HISTORY_WINDOW: i64 = 20;

/// Reply used when the provider returns no usable text.
const FALLBACK_REPLY: &str = "I couldn't extract a text answer from the API.";

/// The fixed persona/language instruction, with search guidance attached
/// only when the search capability is actually on.
fn build_system_prompt(web_search: bool) -> String {
    let mut prompt = String::from("You are Dianita. Answer in English, clear and friendly.");
    if web_search {
        prompt.push_str(" If web search is active, use it when necessary and add the sources used too.");
    }
    prompt
}

/// Choose the reply text, substituting the fallback for missing/blank text.
fn pick_reply(text: Option<String>) -> String {
    text.map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| FALLBACK_REPLY.to_string())
}

/// Resolve chat ownership or fail with the uniform not-found error.
async fn resolve_owned_chat(
    pool: &PgPool,
    user_id: &Uuid,
    chat_id: &Uuid,
) -> AppResult<ChatSessionRow> {
    chats::get_owned_chat(pool, user_id, chat_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Chat not found".into()))
}

/// Append one user turn and produce the assistant reply.
pub async fn append_turn(
    pool: &PgPool,
    provider: &dyn CompletionProvider,
    user_id: &Uuid,
    chat_id: &Uuid,
    utterance: &str,
    web_search: bool,
) -> AppResult<(String, Vec<Source>)> {
    let text = utterance.trim();
    if text.is_empty() {
        return Err(AppError::Validation("Send a valid message.".into()));
    }

    // Never auto-create on the append path; only POST /chats makes chats.
    let chat = resolve_owned_chat(pool, user_id, chat_id).await?;

    chats::append_message(pool, &chat.id, TurnRole::User.as_str(), text, None).await?;
    chats::touch_chat(pool, &chat.id).await?;

    let turns: Vec<ChatTurn> = chats::recent_turns(pool, &chat.id, HISTORY_WINDOW)
        .await?
        .into_iter()
        .map(|row| ChatTurn {
            role: TurnRole::from_db(&row.role),
            text: row.text,
        })
        .collect();

    let completion = provider
        .complete(CompletionRequest {
            system_prompt: build_system_prompt(web_search),
            turns,
            web_search,
        })
        .await?;

    let reply = pick_reply(completion.text);
    let sources = if web_search {
        dedupe_sources(completion.sources)
    } else {
        Vec::new()
    };

    let sources_json = if sources.is_empty() {
        None
    } else {
        Some(
            serde_json::to_value(&sources)
                .map_err(|e| AppError::Internal(format!("encode sources: {e}")))?,
        )
    };

    chats::append_message(
        pool,
        &chat.id,
        TurnRole::Assistant.as_str(),
        &reply,
        sources_json.as_ref(),
    )
    .await?;
    chats::touch_chat(pool, &chat.id).await?;

    Ok((reply, sources))
}

/// Full ordered history of an owned chat.
pub async fn get_history(
    pool: &PgPool,
    user_id: &Uuid,
    chat_id: &Uuid,
) -> AppResult<Vec<chats::ChatMessageRow>> {
    let chat = resolve_owned_chat(pool, user_id, chat_id).await?;
    Ok(chats::list_messages(pool, &chat.id).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_mentions_search_only_when_enabled() {
        let plain = build_system_prompt(false);
        assert!(plain.starts_with("You are Dianita."));
        assert!(!plain.contains("web search"));

        let searching = build_system_prompt(true);
        assert!(searching.contains("web search"));
        assert!(searching.contains("sources"));
    }

    #[test]
    fn blank_replies_fall_back_to_fixed_text() {
        assert_eq!(pick_reply(None), FALLBACK_REPLY);
        assert_eq!(pick_reply(Some("   ".into())), FALLBACK_REPLY);
        assert_eq!(pick_reply(Some(" hi ".into())), "hi");
    }
}
