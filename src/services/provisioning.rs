use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use crate::domain::{Package, ProvisionResult};
use crate::ports::{Provisioner, ProvisioningError};

/// Logs the delivery and reports success. Used when no gateway is configured.
#[derive(Debug, Clone, Default)]
pub struct SimulatedProvisioner;

#[async_trait]
impl Provisioner for SimulatedProvisioner {
    async fn provision(
        &self,
        phone: &str,
        package: &Package,
    ) -> Result<ProvisionResult, ProvisioningError> {
        tracing::info!(package_id = %package.id, "Provisioning {} to {} (simulated)", package.name, phone);
        Ok(ProvisionResult {
            success: true,
            message: "Provisioned (simulated)".to_string(),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProvisionRequest<'a> {
    phone: &'a str,
    package_id: &'a str,
    package_name: &'a str,
    validity: &'a str,
}

/// Posts deliveries to an HTTP provisioning gateway that answers with
/// `{"success": bool, "message": string}`. A request that outlives the
/// client timeout is reported as a provisioning error.
#[derive(Clone)]
pub struct HttpProvisioner {
    client: Client,
    url: String,
}

impl HttpProvisioner {
    pub fn new(url: String, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();

        Self { client, url }
    }
}

#[async_trait]
impl Provisioner for HttpProvisioner {
    async fn provision(
        &self,
        phone: &str,
        package: &Package,
    ) -> Result<ProvisionResult, ProvisioningError> {
        let response = self
            .client
            .post(&self.url)
            .json(&ProvisionRequest {
                phone,
                package_id: &package.id,
                package_name: &package.name,
                validity: &package.validity,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProvisioningError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<ProvisionResult>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package() -> Package {
        Package::new("p_sh19", "Sh19 - 1GB (1hr)", 19, "1hr", false)
    }

    #[tokio::test]
    async fn simulated_provisioner_succeeds() {
        let result = SimulatedProvisioner
            .provision("254712345678", &package())
            .await
            .unwrap();
        assert!(result.success);
    }

    #[tokio::test]
    async fn http_provisioner_posts_delivery() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/provision")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "phone": "254712345678",
                "packageId": "p_sh19"
            })))
            .with_status(200)
            .with_body(r#"{"success":true,"message":"delivered"}"#)
            .create_async()
            .await;

        let provisioner = HttpProvisioner::new(format!("{}/provision", server.url()), 5);
        let result = provisioner
            .provision("254712345678", &package())
            .await
            .unwrap();

        assert_eq!(result.message, "delivered");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn http_provisioner_reports_rejection() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/provision")
            .with_status(503)
            .with_body("maintenance")
            .create_async()
            .await;

        let provisioner = HttpProvisioner::new(format!("{}/provision", server.url()), 5);
        let result = provisioner.provision("254712345678", &package()).await;

        assert!(matches!(
            result,
            Err(ProvisioningError::Rejected { status: 503, .. })
        ));
    }
}
