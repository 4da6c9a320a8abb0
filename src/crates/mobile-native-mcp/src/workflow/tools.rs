//! Tools the workflow asks the caller to invoke, with their inputs and expected results

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const ENVIRONMENT_VALIDATION_TOOL: &str = "sfmobile-native-environment-validation";
pub const PROJECT_PROPERTIES_TOOL: &str = "sfmobile-native-project-properties";
pub const TEMPLATE_DISCOVERY_TOOL: &str = "sfmobile-native-template-discovery";
pub const PROJECT_GENERATION_TOOL: &str = "sfmobile-native-project-generation";
pub const BUILD_TOOL: &str = "sfmobile-native-build";
pub const DEPLOYMENT_TOOL: &str = "sfmobile-native-deployment";

/// Environment variables a generated app needs to connect to its org
pub const REQUIRED_ENVIRONMENT_VARIABLES: &[&str] =
    &["CONNECTED_APP_CONSUMER_KEY", "CONNECTED_APP_CALLBACK_URL"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Platform {
    #[serde(rename = "iOS", alias = "ios", alias = "IOS")]
    Ios,
    #[serde(rename = "Android", alias = "android")]
    Android,
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::Ios => write!(f, "iOS"),
            Platform::Android => write!(f, "Android"),
        }
    }
}

// Inputs

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentValidationInput {
    /// Environment variables that must be set
    pub required_variables: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPropertiesInput {
    /// The user's original request, used to infer the project properties
    pub user_request: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDiscoveryInput {
    /// Target platform of the app
    pub platform: Platform,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectGenerationInput {
    /// Template chosen during template discovery
    pub template_name: String,
    pub project_name: String,
    /// Reverse-DNS package or bundle identifier
    pub package_name: String,
    pub organization: String,
    pub platform: Platform,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BuildInput {
    /// Directory of the generated project
    pub project_path: String,
    pub platform: Platform,
    /// 1-based build attempt number
    pub attempt: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentInput {
    pub project_path: String,
    pub platform: Platform,
}

// Results reported back through `userInput`

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentValidationResult {
    pub valid: bool,
    #[serde(default)]
    pub missing_variables: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectProperties {
    pub platform: Platform,
    pub project_name: String,
    pub package_name: String,
    pub organization: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDiscoveryResult {
    pub template_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectGenerationResult {
    pub project_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildResult {
    pub build_successful: bool,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentResult {
    #[serde(default = "default_true")]
    pub deployment_complete: bool,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_platform_accepts_common_spellings() {
        for (text, platform) in [("iOS", Platform::Ios), ("ios", Platform::Ios), ("android", Platform::Android)] {
            assert_eq!(serde_json::from_value::<Platform>(json!(text)).unwrap(), platform);
        }
        assert_eq!(serde_json::to_value(Platform::Ios).unwrap(), json!("iOS"));
        assert!(serde_json::from_value::<Platform>(json!("windows")).is_err());
    }

    #[test]
    fn test_deployment_result_defaults_to_complete() {
        let result: DeploymentResult = serde_json::from_value(json!({})).unwrap();
        assert!(result.deployment_complete);
    }
}
