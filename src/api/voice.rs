//! Telephony webhook
//!
//! Each request carries one recognized utterance. It gets a fresh session
//! with no history, exactly one round, and a TwiML reply that reads the
//! answer aloud and listens for the next utterance.

use super::{AppState, VoiceForm};
use crate::session::Session;
use crate::system_prompt::voice_prompt;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::Form;
use quick_xml::escape::escape;

/// Where the provider posts the next utterance
const GATHER_ACTION: &str = "/voice";

pub async fn voice_webhook(
    State(state): State<AppState>,
    Form(form): Form<VoiceForm>,
) -> impl IntoResponse {
    let mut session = Session::new(voice_prompt());
    let cancel = state.shutdown.child_token();

    let reply = match state
        .dispatcher
        .round(&mut session, form.speech_result, &cancel)
        .await
    {
        Ok(reply) => reply,
        Err(e) => {
            tracing::error!(session_id = %session.id(), error = %e, "Voice round failed");
            e.fallback_reply().to_string()
        }
    };

    (
        [(header::CONTENT_TYPE, "application/xml")],
        render_twiml(&reply),
    )
}

/// Say the reply, then gather one more spoken utterance
pub fn render_twiml(reply: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8"?>"#,
            "<Response>",
            "<Say>{say}</Say>",
            r#"<Gather input="speech" action="{action}" method="POST" speechTimeout="auto"/>"#,
            "</Response>"
        ),
        say = escape(reply),
        action = GATHER_ACTION,
    )
}
