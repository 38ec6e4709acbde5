// description -> musical analysis -> one line of pattern code.
//
// two requests in a row. the analysis grounds the code request; if the model's analysis
// isn't valid json we keep its raw text as the character and carry on. only the service
// failing can fail a generation, never what the model said.

mod client;
pub mod prompts;

pub use client::{CommandGenerator, CompletionRequest, TextGenerator};

use thiserror::Error;
use tracing::{debug, info};

use crate::pipeline::session::Analysis;
use prompts::{ANALYSIS_INSTRUCTION, ANALYSIS_MAX_TOKENS, CODE_MAX_TOKENS, code_instruction};

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation service failed: {0}")]
    Service(String),
    #[error("could not launch generator `{command}`: {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("generator i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not encode request: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Analyzing,
    Generating,
}

impl Phase {
    pub fn label(self) -> &'static str {
        match self {
            Phase::Analyzing => "Analyzing style…",
            Phase::Generating => "Generating pattern…",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Generated {
    pub program: String,
    pub analysis: Analysis,
}

/// Runs both steps. `on_phase` only observes; it cannot change what happens.
pub fn generate(
    generator: &dyn TextGenerator,
    description: &str,
    mut on_phase: Option<&mut dyn FnMut(Phase)>,
) -> Result<Generated, GenerationError> {
    let mut report = |phase: Phase| {
        debug!(phase = phase.label(), "generation phase");
        if let Some(observer) = on_phase.as_mut() {
            observer(phase);
        }
    };

    report(Phase::Analyzing);
    let raw = generator.complete(&CompletionRequest {
        system: ANALYSIS_INSTRUCTION,
        user: description,
        max_tokens: ANALYSIS_MAX_TOKENS,
    })?;
    let analysis = parse_analysis(&raw);

    report(Phase::Generating);
    let instruction = code_instruction();
    let user = code_request(description, &analysis);
    let program = generator
        .complete(&CompletionRequest {
            system: &instruction,
            user: &user,
            max_tokens: CODE_MAX_TOKENS,
        })?
        .trim()
        .to_string();

    info!(chars = program.len(), "pattern generated");
    Ok(Generated { program, analysis })
}

/// Parses the analysis reply, falling back to `{character: <raw text>}`.
pub fn parse_analysis(raw: &str) -> Analysis {
    match serde_json::from_str::<Analysis>(strip_code_fence(raw)) {
        Ok(analysis) => analysis,
        Err(e) => {
            debug!("analysis reply is not a json object ({e}), keeping it as text");
            Analysis::from_raw_text(raw)
        }
    }
}

// drops a leading ``` (plus optional language tag and newline) and a trailing ```
fn strip_code_fence(text: &str) -> &str {
    let mut body = text.trim();
    if let Some(rest) = body.strip_prefix("```") {
        let tag_len = rest
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(rest.len());
        body = &rest[tag_len..];
        body = body.strip_prefix('\n').unwrap_or(body);
    }
    body = body.strip_suffix("```").unwrap_or(body);
    body.trim()
}

/// The user message for the code step: the description plus every analysis field.
pub fn code_request(description: &str, analysis: &Analysis) -> String {
    let field = |name: &str| analysis.field(name).unwrap_or_else(|| "not specified".to_string());
    format!(
        "Description: {description}\n\
         \n\
         Musical analysis:\n\
         - Key/Scale: {}\n\
         - Notes: {}\n\
         - Rhythm: {}\n\
         - Character: {}\n\
         - Structure: {}\n\
         \n\
         Write one line of Strudel code that captures this.",
        field("key"),
        field("notes"),
        field("rhythm"),
        field("character"),
        field("structure"),
    )
}
