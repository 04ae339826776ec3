use crate::config::{Endpoint, SynthesisConfig};
use crate::tts::{GenerateRequest, Synthesizer, TtsError};
use crate::voice::VoiceCatalog;
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;

const LOG_TARGET: &str = "tts::remote";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/139.0.0.0 Safari/537.36";

#[derive(Clone)]
pub struct RemoteTtsClient {
    client: Client,
    endpoint: Endpoint,
    catalog: Arc<VoiceCatalog>,
}

impl RemoteTtsClient {
    pub fn new(config: &SynthesisConfig, catalog: Arc<VoiceCatalog>) -> Result<Self, TtsError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            catalog,
        })
    }

}

#[derive(Serialize)]
struct SynthesisPayload<'a> {
    text: &'a str,
    voice: &'a str,
    pitch: i32,
    rate: i32,
}

impl Synthesizer for RemoteTtsClient {
    fn generate(&self, request: GenerateRequest) -> BoxFuture<'_, Result<(), TtsError>> {
        async move {
            let voice = self
                .catalog
                .find_by_name(&request.voice_name)
                .map_err(|_| TtsError::VoiceNotFound(request.voice_name.clone()))?;

            let payload = SynthesisPayload {
                text: &request.text,
                voice: &voice.id,
                pitch: 0,
                rate: 0,
            };

            tracing::debug!(
                target: LOG_TARGET,
                voice = %voice.name,
                voice_id = %voice.id,
                chars = request.text.chars().count(),
                "sending synthesis request"
            );

            let origin = self.endpoint.origin();
            let response = self
                .client
                .post(self.endpoint.url().clone())
                .header("accept", "*/*")
                .header("accept-language", "en-US,en;q=0.9")
                .header("content-type", "application/json")
                .header("origin", &origin)
                .header("referer", format!("{origin}/"))
                .header("user-agent", USER_AGENT)
                .json(&payload)
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "<unreadable body>".to_owned());
                return Err(TtsError::HttpStatus(status.as_u16(), body));
            }

            let audio = response.bytes().await?;

            tokio::fs::write(&request.out_path, &audio)
                .await
                .map_err(|source| TtsError::FileIo {
                    path: request.out_path.clone(),
                    source,
                })?;

            tracing::info!(
                target: LOG_TARGET,
                path = %request.out_path.display(),
                bytes = audio.len(),
                "saved synthesized audio"
            );
            Ok(())
        }
        .boxed()
    }
}
