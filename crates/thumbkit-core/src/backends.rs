use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Deployment mode of the node generating thumbnails.
///
/// A master node reads the thumbnail size from live-tunable settings; a slave
/// node uses its statically configured maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentMode {
    #[default]
    Master,
    Slave,
}

impl FromStr for DeploymentMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "master" => Ok(DeploymentMode::Master),
            "slave" => Ok(DeploymentMode::Slave),
            _ => Err(anyhow::anyhow!("Invalid deployment mode: {}", s)),
        }
    }
}

impl Display for DeploymentMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            DeploymentMode::Master => write!(f, "master"),
            DeploymentMode::Slave => write!(f, "slave"),
        }
    }
}

/// Which PDF strategy is registered. Only one is active per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PdfBackend {
    /// First page rasterized by `pdftoppm`
    #[default]
    Raster,
    /// Two-step ImageMagick conversion
    Convert,
}

impl FromStr for PdfBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "raster" => Ok(PdfBackend::Raster),
            "convert" => Ok(PdfBackend::Convert),
            _ => Err(anyhow::anyhow!("Invalid PDF backend: {}", s)),
        }
    }
}

impl Display for PdfBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            PdfBackend::Raster => write!(f, "raster"),
            PdfBackend::Convert => write!(f, "convert"),
        }
    }
}

/// Which office-document strategy is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentBackend {
    /// Local `soffice` conversion
    #[default]
    Local,
    /// Third-party document viewer scraped over HTTP
    Remote,
    Disabled,
}

impl FromStr for DocumentBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(DocumentBackend::Local),
            "remote" => Ok(DocumentBackend::Remote),
            "disabled" | "none" => Ok(DocumentBackend::Disabled),
            _ => Err(anyhow::anyhow!("Invalid document backend: {}", s)),
        }
    }
}

impl Display for DocumentBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            DocumentBackend::Local => write!(f, "local"),
            DocumentBackend::Remote => write!(f, "remote"),
            DocumentBackend::Disabled => write!(f, "disabled"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("MASTER".parse::<DeploymentMode>().unwrap(), DeploymentMode::Master);
        assert_eq!("Convert".parse::<PdfBackend>().unwrap(), PdfBackend::Convert);
        assert_eq!("none".parse::<DocumentBackend>().unwrap(), DocumentBackend::Disabled);
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert!("central".parse::<DeploymentMode>().is_err());
        assert!("mupdf".parse::<PdfBackend>().is_err());
        assert!("cloud".parse::<DocumentBackend>().is_err());
    }

    #[test]
    fn test_display_round_trips() {
        for mode in [DeploymentMode::Master, DeploymentMode::Slave] {
            assert_eq!(mode.to_string().parse::<DeploymentMode>().unwrap(), mode);
        }
    }
}
