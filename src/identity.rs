//! Content-addressed file identity.
//!
//! A file's identity is the SHA-256 of its download URL, so the same
//! remote file resolves to the same [`FileId`] no matter which repository
//! view it was discovered through. The hash is of the location, not the
//! file bytes; no network or persistence access happens here.

use sha2::{Digest, Sha256};

use crate::error::EngineError;
use crate::models::FileId;

/// Derive the stable identifier for a remote file from its download URL.
///
/// Pure and deterministic: equal inputs yield equal ids within and across
/// processes.
///
/// # Errors
///
/// `EngineError::InvalidInput` when the URL is empty, carries no `http://`
/// or `https://` scheme, or has an empty host or file path.
pub fn identify(download_url: &str) -> Result<FileId, EngineError> {
    let url = download_url.trim();
    if url.is_empty() {
        return Err(invalid(url, "empty download URL"));
    }

    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .ok_or_else(|| invalid(url, "missing http(s) scheme"))?;

    let (host, path) = rest.split_once('/').unwrap_or((rest, ""));
    if host.is_empty() {
        return Err(invalid(url, "empty host"));
    }
    if path.is_empty() {
        return Err(invalid(url, "missing file path"));
    }

    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

fn invalid(url: &str, reason: &str) -> EngineError {
    EngineError::InvalidInput(format!("download URL {:?}: {}", url, reason))
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://raw.githubusercontent.com/octocat/hello/main/index.js";

    #[test]
    fn test_deterministic() {
        assert_eq!(identify(URL).unwrap(), identify(URL).unwrap());
    }

    #[test]
    fn test_distinct_urls_distinct_ids() {
        let other = "https://raw.githubusercontent.com/octocat/hello/main/util.js";
        assert_ne!(identify(URL).unwrap(), identify(other).unwrap());
    }

    #[test]
    fn test_leading_whitespace_ignored() {
        let padded = format!("  {}", URL);
        assert_eq!(identify(&padded).unwrap(), identify(URL).unwrap());
    }

    #[test]
    fn test_rejects_empty() {
        assert!(matches!(identify(""), Err(EngineError::InvalidInput(_))));
        assert!(matches!(identify("   "), Err(EngineError::InvalidInput(_))));
    }

    #[test]
    fn test_rejects_missing_scheme() {
        assert!(identify("raw.githubusercontent.com/a/b/c.js").is_err());
        assert!(identify("ftp://host/a.js").is_err());
    }

    #[test]
    fn test_rejects_missing_path() {
        assert!(identify("https://raw.githubusercontent.com").is_err());
        assert!(identify("https:///a/b.js").is_err());
    }
}
