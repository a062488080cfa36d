use super::{SerializedModelRun, SerializedPromptSession};
use crate::connection::{CallKind, Canister};
use crate::error::Result;
use async_trait::async_trait;
use candid::{Decode, Encode};

/// The canister methods driving an inference session.
#[async_trait(?Send)]
pub trait Backend {
    async fn start_prompt(&self, prompt: &str) -> Result<SerializedPromptSession>;

    async fn begin_start(
        &self,
        session: &SerializedPromptSession,
        iterative: bool,
    ) -> Result<(Option<SerializedModelRun>, SerializedPromptSession)>;

    async fn forward(
        &self,
        steps: u8,
        run: &SerializedModelRun,
        session: &SerializedPromptSession,
    ) -> Result<(bool, SerializedModelRun, SerializedPromptSession)>;

    async fn end_start(
        &self,
        run: &SerializedModelRun,
        session: &SerializedPromptSession,
    ) -> Result<(Option<String>, SerializedPromptSession)>;

    async fn begin_step(&self, session: &SerializedPromptSession) -> Result<SerializedModelRun>;

    async fn end_step(
        &self,
        run: &SerializedModelRun,
        session: &SerializedPromptSession,
    ) -> Result<(Option<String>, bool, SerializedPromptSession)>;
}

// Query methods may also be called as updates, so every method goes through
// consensus regardless of how the canister declares it.
#[async_trait(?Send)]
impl<C: Canister> Backend for C {
    async fn start_prompt(&self, prompt: &str) -> Result<SerializedPromptSession> {
        let arg = Encode!(&prompt.to_string())?;
        let response = self.call_raw("start_prompt", CallKind::Update, arg).await?;
        Ok(Decode!(&response, SerializedPromptSession)?)
    }

    async fn begin_start(
        &self,
        session: &SerializedPromptSession,
        iterative: bool,
    ) -> Result<(Option<SerializedModelRun>, SerializedPromptSession)> {
        let arg = Encode!(session, &iterative)?;
        let response = self.call_raw("begin_start", CallKind::Update, arg).await?;
        Ok(Decode!(
            &response,
            Option<SerializedModelRun>,
            SerializedPromptSession
        )?)
    }

    async fn forward(
        &self,
        steps: u8,
        run: &SerializedModelRun,
        session: &SerializedPromptSession,
    ) -> Result<(bool, SerializedModelRun, SerializedPromptSession)> {
        let arg = Encode!(&steps, run, session)?;
        let response = self.call_raw("forward", CallKind::Update, arg).await?;
        Ok(Decode!(
            &response,
            bool,
            SerializedModelRun,
            SerializedPromptSession
        )?)
    }

    async fn end_start(
        &self,
        run: &SerializedModelRun,
        session: &SerializedPromptSession,
    ) -> Result<(Option<String>, SerializedPromptSession)> {
        let arg = Encode!(run, session)?;
        let response = self.call_raw("end_start", CallKind::Update, arg).await?;
        Ok(Decode!(&response, Option<String>, SerializedPromptSession)?)
    }

    async fn begin_step(&self, session: &SerializedPromptSession) -> Result<SerializedModelRun> {
        let arg = Encode!(session)?;
        let response = self.call_raw("begin_step", CallKind::Update, arg).await?;
        Ok(Decode!(&response, SerializedModelRun)?)
    }

    async fn end_step(
        &self,
        run: &SerializedModelRun,
        session: &SerializedPromptSession,
    ) -> Result<(Option<String>, bool, SerializedPromptSession)> {
        let arg = Encode!(run, session)?;
        let response = self.call_raw("end_step", CallKind::Update, arg).await?;
        Ok(Decode!(
            &response,
            Option<String>,
            bool,
            SerializedPromptSession
        )?)
    }
}
