//! Host-supplied runtime information.

use serde::{Deserialize, Serialize};

/// The two package fields a registry cannot be configured with: the host
/// decides the package name and version at run time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeInformation {
    pub package_name: String,
    pub version: String,
}

impl RuntimeInformation {
    pub fn new(package_name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            package_name: package_name.into(),
            version: version.into(),
        }
    }
}

/// Read-only accessor implemented by whatever host drives schema requests.
pub trait RuntimeContext {
    fn runtime_information(&self) -> RuntimeInformation;
}

impl RuntimeContext for RuntimeInformation {
    fn runtime_information(&self) -> RuntimeInformation {
        self.clone()
    }
}
