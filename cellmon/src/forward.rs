//! Delivery of decoded cell info to its consumer.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    cell::CellInfo,
    error::{Error, Result},
};

/// Default SORACOM Harvest Data endpoint, reachable from SORACOM Air SIMs.
pub const HARVEST_URL: &str = "http://uni.soracom.io";

#[async_trait]
pub trait Forwarder: 'static + Send + Sync {
    async fn forward(&self, cell_info: &CellInfo) -> Result<()>;
}

/// Which [`Forwarder`] the poller hands cell info to.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ForwarderKind {
    #[default]
    Harvest,
    Stdout,
}

impl ForwarderKind {
    pub fn build(self, harvest_url: &str) -> Result<Box<dyn Forwarder>> {
        Ok(match self {
            ForwarderKind::Harvest => Box::new(HarvestForwarder::new(harvest_url)?),
            ForwarderKind::Stdout => Box::new(StdoutForwarder),
        })
    }
}

/// The flat JSON object sent downstream.
pub fn payload(cell_info: &CellInfo) -> Result<String> {
    serde_json::to_string(cell_info)
        .map_err(|e| Error::Forward(format!("failed to serialize cell info: {e}")))
}

/// POSTs each payload to SORACOM Harvest Data.
#[derive(Debug, Clone)]
pub struct HarvestForwarder {
    client: Client,
    url: Url,
}

impl HarvestForwarder {
    pub fn new(url: &str) -> Result<Self> {
        let url = Url::parse(url)
            .map_err(|e| Error::Forward(format!("invalid harvest url {url:?}: {e}")))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent("orb-cellmon")
            .build()
            .map_err(|e| Error::Forward(format!("failed to build http client: {e}")))?;

        Ok(Self { client, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl Forwarder for HarvestForwarder {
    async fn forward(&self, cell_info: &CellInfo) -> Result<()> {
        let body = payload(cell_info)?;
        debug!(url = %self.url, %body, "posting cell info to harvest");

        let response = self
            .client
            .post(self.url.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| Error::Forward(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Forward(format!(
                "harvest responded with {status}: {text}"
            )));
        }

        Ok(())
    }
}

/// Prints each payload on its own line.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutForwarder;

#[async_trait]
impl Forwarder for StdoutForwarder {
    async fn forward(&self, cell_info: &CellInfo) -> Result<()> {
        println!("{}", payload(cell_info)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{Rat, ServingCellState, WcdmaCellInfo};

    fn wcdma() -> CellInfo {
        CellInfo::Wcdma(WcdmaCellInfo {
            time: 1,
            rat: Rat::Wcdma,
            state: ServingCellState::Connect,
            mcc: 440,
            mnc: 20,
            lac: String::new(),
            cell_id: "ABCDEFF".into(),
            uarfcn: 0,
            psc: 0,
            rac: 0,
            rscp: 0,
            ecio: 0,
            phych: 0,
            sf: 0,
            slot: 0,
            speech_code: 0,
            commod: 0,
        })
    }

    #[test]
    fn payload_is_the_flat_record() {
        assert_eq!(
            payload(&wcdma()).unwrap(),
            r#"{"time":1,"rat":"WCDMA","state":"CONNECT","mcc":440,"mnc":20,"cellid":"ABCDEFF"}"#
        );
    }

    #[test]
    fn kind_uses_lowercase_names() {
        assert_eq!(
            serde_json::from_str::<ForwarderKind>(r#""stdout""#).unwrap(),
            ForwarderKind::Stdout
        );
        assert_eq!(ForwarderKind::default(), ForwarderKind::Harvest);
    }

    #[test]
    fn harvest_rejects_invalid_url() {
        assert!(matches!(
            HarvestForwarder::new("uni.soracom.io"),
            Err(Error::Forward(_))
        ));
        let forwarder = HarvestForwarder::new(HARVEST_URL).unwrap();
        assert_eq!(forwarder.url().host_str(), Some("uni.soracom.io"));
    }

    #[tokio::test]
    async fn stdout_forwarder_accepts_payload() {
        StdoutForwarder.forward(&wcdma()).await.unwrap();
    }
}
