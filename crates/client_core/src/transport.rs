use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    domain::ScopePath,
    protocol::{
        CommandDescription, HelpRequest, HelpResponse, Invocation, RunCommandResponse,
        SetVariableRequest, SetVariableResponse, VariableDescription,
    },
};
use tracing::debug;
use url::Url;

use crate::{error::PanelError, RemoteTree};

const API_ROOT: &str = "oaisoftmodem";
const HELP_DIR: &str = "helpfiles";
const COMMANDS_LEAF: &str = "commands";
const VARIABLES_LEAF: &str = "variables";

fn transport_error(err: reqwest::Error) -> PanelError {
    PanelError::Transport(err.to_string())
}

/// [`RemoteTree`] over the softmodem's HTTP/JSON interface.
pub struct HttpRemoteTree {
    http: Client,
    base: Url,
}

impl HttpRemoteTree {
    pub fn new(backend_url: &str, timeout: Duration) -> Result<Self, PanelError> {
        let base = Url::parse(backend_url).map_err(|err| PanelError::InvalidBackendUrl {
            url: backend_url.to_string(),
            reason: err.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(PanelError::InvalidBackendUrl {
                url: backend_url.to_string(),
                reason: "url cannot carry a path".to_string(),
            });
        }
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(transport_error)?;
        Ok(Self { http, base })
    }

    fn url_with(&self, segments: &[&str]) -> Result<Url, PanelError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| PanelError::InvalidBackendUrl {
                url: self.base.to_string(),
                reason: "url cannot carry a path".to_string(),
            })?
            .pop_if_empty()
            .push(API_ROOT)
            .extend(segments);
        Ok(url)
    }

    /// `<base>/oaisoftmodem/<scope...>/<leaf>/`
    fn endpoint(&self, scope: &ScopePath, leaf: &str) -> Result<Url, PanelError> {
        let mut segments: Vec<&str> = scope.segments().iter().map(String::as_str).collect();
        segments.push(leaf);
        segments.push("");
        self.url_with(&segments)
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, PanelError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = match body.trim() {
                "" => status.to_string(),
                text => text.to_string(),
            };
            return Err(PanelError::RemoteRejected { message });
        }
        response
            .json::<T>()
            .await
            .map_err(|err| PanelError::Transport(format!("malformed response: {err}")))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, PanelError> {
        debug!(%url, "GET");
        let response = self.http.get(url).send().await.map_err(transport_error)?;
        Self::read_json(response).await
    }

    async fn post_json<B, T>(&self, url: Url, body: &B) -> Result<T, PanelError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        debug!(%url, "POST");
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;
        Self::read_json(response).await
    }

    /// Help text for one component/module/object triple.
    pub async fn fetch_help(&self, request: &HelpRequest) -> Result<String, PanelError> {
        let file_name = request.file_name();
        let url = self.url_with(&[HELP_DIR, file_name.as_str()])?;
        let response: HelpResponse = self.get_json(url).await?;
        Ok(response.text)
    }
}

#[async_trait]
impl RemoteTree for HttpRemoteTree {
    async fn list_commands(
        &self,
        scope: &ScopePath,
    ) -> Result<Vec<CommandDescription>, PanelError> {
        self.get_json(self.endpoint(scope, COMMANDS_LEAF)?).await
    }

    async fn list_variables(
        &self,
        scope: &ScopePath,
    ) -> Result<Vec<VariableDescription>, PanelError> {
        self.get_json(self.endpoint(scope, VARIABLES_LEAF)?).await
    }

    async fn set_variable(
        &self,
        request: &SetVariableRequest,
        scope: &ScopePath,
    ) -> Result<SetVariableResponse, PanelError> {
        self.post_json(self.endpoint(scope, VARIABLES_LEAF)?, request)
            .await
    }

    async fn run_command(
        &self,
        invocation: &Invocation,
        scope: &ScopePath,
    ) -> Result<RunCommandResponse, PanelError> {
        self.post_json(self.endpoint(scope, COMMANDS_LEAF)?, invocation)
            .await
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
