//! The inference session protocol of a model canister.
//!
//! A prompt is turned into a [`SerializedPromptSession`] by the canister. The
//! prompt is then consumed in chunks (`begin_start`/`forward`/`end_start`)
//! and tokens are generated one at a time (`begin_step`/`forward`/`end_step`).
//! Each `forward` call runs a batch of layers, so only the key/value caches
//! of those layers are sent along with it.

mod backend;

#[cfg(test)]
mod tests;

pub use backend::Backend;

use crate::error::{Error, Result};
use candid::CandidType;
use log::debug;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(CandidType, Clone, Debug, Deserialize, PartialEq)]
pub enum TensorData {
    F32(Vec<f32>),
    U8(Vec<u8>),
}

#[derive(CandidType, Clone, Debug, Deserialize, PartialEq)]
pub struct SerializedTensor {
    pub data: TensorData,
    pub shape: Vec<usize>,
}

#[derive(CandidType, Clone, Debug, Deserialize, PartialEq)]
pub enum Sampling {
    ArgMax,
    All { temperature: f64 },
    TopK { k: usize, temperature: f64 },
    TopP { p: f64, temperature: f64 },
    TopKThenTopP { k: usize, p: f64, temperature: f64 },
}

#[derive(CandidType, Clone, Debug, Deserialize, PartialEq)]
pub struct SerializedLogitProcessor {
    pub rng: String,
    pub sampling: Sampling,
}

#[derive(CandidType, Clone, Debug, Deserialize, PartialEq)]
pub struct SerializedTokenOutputStream {
    pub tokens: Vec<u32>,
    pub prev_index: usize,
    pub current_index: usize,
    pub prompt_index: usize,
    pub prompt: Vec<u32>,
}

/// Per-layer key and value tensors.
pub type KvCaches = HashMap<usize, (SerializedTensor, SerializedTensor)>;

#[derive(CandidType, Clone, Debug, Deserialize, PartialEq)]
pub struct SerializedPromptSession {
    pub serialized_logit_processor: SerializedLogitProcessor,
    pub tos: SerializedTokenOutputStream,
    pub k_v_caches: KvCaches,
}

#[derive(CandidType, Clone, Debug, Deserialize, Eq, PartialEq)]
pub enum ModelRunState {
    Steps(usize),
    Finish,
    Finished,
}

#[derive(CandidType, Clone, Debug, Deserialize, PartialEq)]
pub struct SerializedModelRun {
    pub index_pos: usize,
    pub layer_in: SerializedTensor,
    pub mask: Option<SerializedTensor>,
    pub seq_len: usize,
    pub state: ModelRunState,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Options {
    /// Layers per `forward` call while the prompt is consumed.
    pub start_batch: u8,
    /// Layers per `forward` call while tokens are generated.
    pub step_batch: u8,
    /// Upper bound on generated tokens.
    pub max_steps: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            start_batch: 10,
            step_batch: 5,
            max_steps: 50,
        }
    }
}

/// A copy of `session` without any caches.
pub fn simple_session(session: &SerializedPromptSession) -> SerializedPromptSession {
    SerializedPromptSession {
        serialized_logit_processor: session.serialized_logit_processor.clone(),
        tos: session.tos.clone(),
        k_v_caches: HashMap::new(),
    }
}

/// A copy of `session` holding only the caches of the `steps` layers `run`
/// is about to execute. Runs past their last layer get no caches.
pub fn reduced_session(
    session: &SerializedPromptSession,
    run: &SerializedModelRun,
    steps: usize,
) -> SerializedPromptSession {
    let mut reduced = simple_session(session);

    if let ModelRunState::Steps(current_step) = run.state {
        reduced.k_v_caches = session
            .k_v_caches
            .iter()
            .filter(|(layer, _)| **layer >= current_step && **layer < current_step + steps)
            .map(|(layer, caches)| (*layer, caches.clone()))
            .collect();
    }

    reduced
}

/// Merges the caches of `update` into `base`; `update` wins per layer.
pub fn update_session(
    mut base: SerializedPromptSession,
    update: SerializedPromptSession,
) -> SerializedPromptSession {
    base.k_v_caches.extend(update.k_v_caches);
    base
}

/// Calls `forward` until the canister reports the run as finished.
pub async fn forward<B>(
    backend: &B,
    mut session: SerializedPromptSession,
    mut run: SerializedModelRun,
    steps: u8,
) -> Result<(SerializedPromptSession, SerializedModelRun)>
where
    B: Backend + ?Sized,
{
    // A zero batch never advances the run.
    if steps == 0 {
        return Err(Error::InvalidArgument("batch size must be at least 1".to_string()));
    }

    loop {
        let reduced = reduced_session(&session, &run, steps as usize);
        let (finished, next_run, update) = backend.forward(steps, &run, &reduced).await?;

        run = next_run;
        session = update_session(session, update);

        if finished {
            break Ok((session, run));
        }
    }
}

/// Feeds the prompt through the model until the canister produces the first
/// text. An exhausted prompt yields empty text.
pub async fn start_iterative<B>(
    backend: &B,
    mut session: SerializedPromptSession,
    steps: u8,
) -> Result<(String, SerializedPromptSession)>
where
    B: Backend + ?Sized,
{
    loop {
        let (run, next) = backend.begin_start(&session, true).await?;
        session = next;

        let run = match run {
            Some(run) => run,
            None => {
                debug!("begin_start returned no run");
                return Ok((String::new(), session));
            }
        };

        let (forwarded, run) = forward(backend, session, run, steps).await?;
        let (text, next) = backend.end_start(&run, &forwarded).await?;
        session = next;

        debug!(
            "prompt {} of {}",
            session.tos.prompt_index,
            session.tos.prompt.len()
        );

        if let Some(text) = text {
            break Ok((text, session));
        }
    }
}

/// Generates a single token. Returns its text, if any, and whether the
/// end of the sequence was reached.
pub async fn step<B>(
    backend: &B,
    session: SerializedPromptSession,
    steps: u8,
) -> Result<(Option<String>, bool, SerializedPromptSession)>
where
    B: Backend + ?Sized,
{
    let run = backend.begin_step(&simple_session(&session)).await?;
    let (session, run) = forward(backend, session, run, steps).await?;
    let (text, eos, returned) = backend.end_step(&run, &simple_session(&session)).await?;

    Ok((text, eos, update_session(returned, session)))
}

/// Runs `prompt` to completion, passing every text fragment to `on_text` as
/// it arrives. Returns the concatenated text.
pub async fn generate<B, F>(
    backend: &B,
    prompt: &str,
    options: Options,
    mut on_text: F,
) -> Result<String>
where
    B: Backend + ?Sized,
    F: FnMut(&str),
{
    let session = backend.start_prompt(prompt).await?;
    let (text, mut session) = start_iterative(backend, session, options.start_batch).await?;

    let mut result = String::new();
    if !text.is_empty() {
        on_text(&text);
        result.push_str(&text);
    }

    for index in 0..options.max_steps {
        let (text, eos, next) = step(backend, session, options.step_batch).await?;
        session = next;

        if let Some(text) = text {
            on_text(&text);
            result.push_str(&text);
        }

        if eos {
            debug!("end of sequence after {} step(s)", index + 1);
            break;
        }
    }

    Ok(result)
}
