//! Audio backend selection
//!
//! The system default host covers WASAPI, CoreAudio, and ALSA; JACK is
//! available behind a feature for pro-audio routing setups.

use serde::{Deserialize, Serialize};

use crate::error::Result;
#[cfg(feature = "jack")]
use crate::error::OutputError;

/// Audio backend / driver selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioBackend {
    /// System default backend (WASAPI on Windows, CoreAudio on macOS,
    /// ALSA on Linux)
    #[default]
    Default,

    /// JACK Audio Connection Kit
    #[cfg(feature = "jack")]
    Jack,
}

impl AudioBackend {
    /// Human-readable name of the backend
    pub fn name(&self) -> &'static str {
        match self {
            Self::Default => {
                #[cfg(target_os = "windows")]
                return "WASAPI";

                #[cfg(target_os = "macos")]
                return "CoreAudio";

                #[cfg(target_os = "linux")]
                return "ALSA";

                #[cfg(not(any(
                    target_os = "windows",
                    target_os = "macos",
                    target_os = "linux"
                )))]
                return "Default";
            }

            #[cfg(feature = "jack")]
            Self::Jack => "JACK",
        }
    }

    /// Resolve to a cpal host
    pub fn to_cpal_host(&self) -> Result<cpal::Host> {
        match self {
            Self::Default => Ok(cpal::default_host()),

            #[cfg(feature = "jack")]
            Self::Jack => {
                let id = cpal::available_hosts()
                    .into_iter()
                    .find(|id| id.name().eq_ignore_ascii_case("jack"))
                    .ok_or_else(|| OutputError::DeviceError("JACK host unavailable".into()))?;
                cpal::host_from_id(id).map_err(|e| OutputError::DeviceError(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_backend_has_a_name() {
        assert!(!AudioBackend::Default.name().is_empty());
    }

    #[test]
    fn default_backend_resolves() {
        assert!(AudioBackend::Default.to_cpal_host().is_ok());
    }
}
