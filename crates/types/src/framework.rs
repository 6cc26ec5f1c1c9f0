use serde::{Deserialize, Serialize};

#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Framework {
    #[default]
    Hardhat,
}

/// Node.js major versions the deployment containers are built for.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, strum::Display)]
pub enum NodeVersion {
    #[strum(serialize = "16")]
    V16,
    #[strum(serialize = "18")]
    V18,
    #[default]
    #[strum(serialize = "20")]
    V20,
}

impl NodeVersion {
    /// Picks the major version out of an `engines.node` requirement such as
    /// `">=18.12"`. Anything unrecognised maps to the default.
    pub fn from_requirement(requirement: &str) -> Self {
        let major: String = requirement
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(|c| c.is_ascii_digit())
            .collect();

        match major.as_str() {
            "16" => Self::V16,
            "18" => Self::V18,
            "20" => Self::V20,
            _ => Self::default(),
        }
    }

    pub fn container_image(self) -> String {
        format!("anyflow-node-{self}")
    }
}
