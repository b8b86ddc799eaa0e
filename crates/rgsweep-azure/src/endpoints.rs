//! Endpoints per cloud instance

use rgsweep_api::CloudInstance;

/// Management and login endpoints for one sovereign cloud
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AzureEndpoints {
    /// Resource Manager base URL
    pub resource_manager: &'static str,
    /// Entra ID authority host
    pub authority: &'static str,
    /// Token audience for the management plane
    pub audience: &'static str,
}

impl AzureEndpoints {
    pub const PUBLIC: AzureEndpoints = AzureEndpoints {
        resource_manager: "https://management.azure.com",
        authority: "https://login.microsoftonline.com",
        audience: "https://management.core.windows.net/",
    };

    pub const US_GOVERNMENT: AzureEndpoints = AzureEndpoints {
        resource_manager: "https://management.usgovcloudapi.net",
        authority: "https://login.microsoftonline.us",
        audience: "https://management.core.usgovcloudapi.net",
    };

    pub const CHINA: AzureEndpoints = AzureEndpoints {
        resource_manager: "https://management.chinacloudapi.cn",
        authority: "https://login.chinacloudapi.cn",
        audience: "https://management.core.chinacloudapi.cn",
    };

    pub fn for_instance(instance: CloudInstance) -> Self {
        match instance {
            CloudInstance::Public => Self::PUBLIC,
            CloudInstance::UsGovernment => Self::US_GOVERNMENT,
            CloudInstance::China => Self::CHINA,
        }
    }

    /// OAuth scope requesting the management audience's default permissions
    pub fn scope(&self) -> String {
        format!("{}/.default", self.audience.trim_end_matches('/'))
    }

    /// Token endpoint for a tenant
    pub fn token_url(&self, tenant_id: &str) -> String {
        format!("{}/{}/oauth2/v2.0/token", self.authority, tenant_id)
    }
}
