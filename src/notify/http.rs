use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{ChangeNotifier, ResourceChanged, notification_error};
use crate::error::Result;
use crate::model::CompanyProfile;

pub const API_KEY_HEADER: &str = "x-api-key";
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Posts [`ResourceChanged`] bodies to a downstream HTTP endpoint.
#[derive(Debug, Clone)]
pub struct HttpChangeNotifier {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpChangeNotifier {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
        })
    }

    async fn post(&self, body: &ResourceChanged) -> Result<()> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header(REQUEST_ID_HEADER, &body.context_id)
            .json(body);
        if let Some(api_key) = &self.api_key {
            request = request.header(API_KEY_HEADER, api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|err| notification_error(&body.resource_id, err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(notification_error(
                &body.resource_id,
                format!("endpoint responded with {status}"),
            ));
        }

        debug!(
            company_number = %body.resource_id,
            event = ?body.event.event_type,
            "resource changed notification sent"
        );
        Ok(())
    }
}

#[async_trait]
impl ChangeNotifier for HttpChangeNotifier {
    async fn notify_changed(&self, context_id: &str, company_number: &str) -> Result<()> {
        self.post(&ResourceChanged::changed(context_id, company_number))
            .await
    }

    async fn notify_deleted(
        &self,
        context_id: &str,
        company_number: &str,
        last_known: &CompanyProfile,
    ) -> Result<()> {
        self.post(&ResourceChanged::deleted(
            context_id,
            company_number,
            last_known,
        ))
        .await
    }
}
