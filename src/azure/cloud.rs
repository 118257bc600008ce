//! Azure cloud environments (public, China, US Government).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Endpoints for one sovereign cloud.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudEnvironment {
    pub name: String,
    /// Resource Manager base URL.
    pub resource_manager: String,
    /// Microsoft Entra authority host.
    pub active_directory: String,
    /// Token audience for management-plane calls.
    pub token_audience: String,
}

impl CloudEnvironment {
    pub fn azure_public() -> Self {
        Self {
            name: "AzureCloud".to_string(),
            resource_manager: "https://management.azure.com".to_string(),
            active_directory: "https://login.microsoftonline.com".to_string(),
            token_audience: "https://management.azure.com/".to_string(),
        }
    }

    pub fn azure_china() -> Self {
        Self {
            name: "AzureChinaCloud".to_string(),
            resource_manager: "https://management.chinacloudapi.cn".to_string(),
            active_directory: "https://login.chinacloudapi.cn".to_string(),
            token_audience: "https://management.chinacloudapi.cn/".to_string(),
        }
    }

    pub fn azure_us_government() -> Self {
        Self {
            name: "AzureUSGovernment".to_string(),
            resource_manager: "https://management.usgovcloudapi.net".to_string(),
            active_directory: "https://login.microsoftonline.us".to_string(),
            token_audience: "https://management.usgovcloudapi.net/".to_string(),
        }
    }

    /// OAuth2 scope derived from the token audience.
    pub fn scope(&self) -> String {
        format!("{}.default", self.token_audience)
    }
}

impl Default for CloudEnvironment {
    fn default() -> Self {
        Self::azure_public()
    }
}

impl fmt::Display for CloudEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl FromStr for CloudEnvironment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "azurecloud" | "azure_public" | "public" => Ok(Self::azure_public()),
            "azurechinacloud" | "china" => Ok(Self::azure_china()),
            "azureusgovernment" | "usgov" | "azure_us_government" => {
                Ok(Self::azure_us_government())
            }
            _ => Err(format!(
                "Unknown cloud environment '{}'. Valid values: AzureCloud, AzureChinaCloud, AzureUSGovernment",
                s
            )),
        }
    }
}
