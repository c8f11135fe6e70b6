//! TLS configuration for passui.
//!
//! Resolves a certificate pair for the mail domain and builds a rustls server
//! config. The front-end runs on hosts where certbot may or may not have
//! issued anything yet, so discovery is best effort:
//!
//! 1) Explicit `SSL_CERT`/`SSL_KEY` paths win.
//! 2) `/etc/letsencrypt/live/<domain>/{fullchain,privkey}.pem`.
//! 3) Any other directory under `/etc/letsencrypt/live/` with a readable pair
//!    (the `README` certbot drops there is skipped).
//! 4) `/certs/{fullchain,privkey}.pem`.
//!
//! Without a readable pair the service falls back to plain HTTP.

use anyhow::{Context, Result, anyhow};
use rustls::{
    ServerConfig,
    pki_types::{CertificateDer, PrivateKeyDer},
};
use rustls_pemfile::{certs, ec_private_keys, pkcs8_private_keys, rsa_private_keys};
use std::{
    fs::{self, File},
    io::BufReader,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

const FULLCHAIN: &str = "fullchain.pem";
const PRIVKEY: &str = "privkey.pem";

/// Filesystem roots searched during certificate discovery.
///
/// Production uses the certbot defaults; tests point these at temp dirs.
#[derive(Debug, Clone)]
pub struct DiscoveryRoots {
    pub letsencrypt_live: PathBuf,
    pub certs_dir: PathBuf,
}

impl Default for DiscoveryRoots {
    fn default() -> Self {
        Self {
            letsencrypt_live: PathBuf::from("/etc/letsencrypt/live"),
            certs_dir: PathBuf::from("/certs"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertPaths {
    cert: PathBuf,
    key: PathBuf,
}

impl CertPaths {
    #[must_use]
    pub fn new(cert: PathBuf, key: PathBuf) -> Self {
        Self { cert, key }
    }

    #[must_use]
    pub fn cert_path(&self) -> &Path {
        &self.cert
    }

    #[must_use]
    pub fn key_path(&self) -> &Path {
        &self.key
    }

    fn readable(&self) -> bool {
        file_readable(&self.cert) && file_readable(&self.key)
    }
}

// certbot paths are symlinks into ../../archive; an open() probe follows them.
fn file_readable(path: &Path) -> bool {
    File::open(path).is_ok()
}

/// Resolve the certificate pair to serve with, if any.
#[must_use]
pub fn discover(
    domain: &str,
    explicit: Option<CertPaths>,
    roots: &DiscoveryRoots,
) -> Option<CertPaths> {
    if let Some(paths) = explicit {
        if paths.readable() {
            return Some(paths);
        }
        debug!(
            "Configured certificate pair is not readable: {} / {}",
            paths.cert_path().display(),
            paths.key_path().display()
        );
        return None;
    }

    info!("Searching for SSL certificates for domain: {domain}");

    let domain_dir = roots.letsencrypt_live.join(domain);
    let candidate = CertPaths::new(domain_dir.join(FULLCHAIN), domain_dir.join(PRIVKEY));
    if candidate.readable() {
        info!("Found certificates for domain: {domain}");
        return Some(candidate);
    }
    debug!("Certificates not found for {domain}");

    if let Some(paths) = scan_live_dir(&roots.letsencrypt_live) {
        return Some(paths);
    }

    let fallback = CertPaths::new(
        roots.certs_dir.join(FULLCHAIN),
        roots.certs_dir.join(PRIVKEY),
    );
    if fallback.readable() {
        info!("Using certificates from {}", roots.certs_dir.display());
        return Some(fallback);
    }

    None
}

/// Pick the first directory under the letsencrypt live root with a readable pair.
fn scan_live_dir(live: &Path) -> Option<CertPaths> {
    let entries = match fs::read_dir(live) {
        Ok(entries) => entries,
        Err(err) => {
            debug!("Cannot scan {}: {}", live.display(), err);
            return None;
        }
    };

    let mut domains: Vec<PathBuf> = entries
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.file_name().is_none_or(|name| name != "README"))
        .collect();
    // Deterministic pick: read_dir order is filesystem dependent.
    domains.sort();

    for dir in domains {
        let candidate = CertPaths::new(dir.join(FULLCHAIN), dir.join(PRIVKEY));
        if candidate.readable() {
            info!("Auto-detected certificates from: {}", dir.display());
            return Some(candidate);
        }
    }

    None
}

/// Build the rustls server configuration from a discovered certificate pair.
///
/// # Errors
/// Returns an error if certificate or key cannot be read or parsed.
pub fn load_server_config(paths: &CertPaths) -> Result<ServerConfig> {
    let cert_chain = load_cert_chain(paths.cert_path())?;
    let key = load_private_key(paths.key_path())?;

    let mut config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(cert_chain, key)
        .context("Failed to build TLS server config")?;
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];
    Ok(config)
}

fn load_cert_chain(path: &Path) -> Result<Vec<CertificateDer<'static>>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open TLS certificate: {}", path.display()))?;
    let mut reader = BufReader::new(file);
    let certs = certs(&mut reader)
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("Failed to read TLS certificate: {}", path.display()))?;
    if certs.is_empty() {
        return Err(anyhow!("TLS certificate is empty: {}", path.display()));
    }
    Ok(certs)
}

fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open TLS key: {}", path.display()))?;
    let mut reader = BufReader::new(file);
    let mut keys = pkcs8_private_keys(&mut reader)
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("Failed to read PKCS#8 TLS key: {}", path.display()))?;
    if let Some(key) = keys.pop() {
        return Ok(PrivateKeyDer::Pkcs8(key));
    }

    let file =
        File::open(path).with_context(|| format!("Failed to open TLS key: {}", path.display()))?;
    let mut reader = BufReader::new(file);
    let mut keys = ec_private_keys(&mut reader)
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("Failed to read SEC1 TLS key: {}", path.display()))?;
    if let Some(key) = keys.pop() {
        return Ok(PrivateKeyDer::Sec1(key));
    }

    // Older certbot deployments still carry RSA keys in PKCS#1 form.
    let file =
        File::open(path).with_context(|| format!("Failed to open TLS key: {}", path.display()))?;
    let mut reader = BufReader::new(file);
    let mut keys = rsa_private_keys(&mut reader)
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("Failed to read PKCS#1 TLS key: {}", path.display()))?;
    if let Some(key) = keys.pop() {
        return Ok(PrivateKeyDer::Pkcs1(key));
    }

    Err(anyhow!("TLS private key not found: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use uuid::Uuid;

    fn temp_dir(label: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("passui-tls-test-{label}-{}", Uuid::new_v4()));
        fs::create_dir_all(&dir).expect("Failed to create temp dir");
        dir
    }

    fn write_pair(dir: &Path, san: &str) {
        let cert = rcgen::generate_simple_self_signed(vec![san.to_string()])
            .expect("Failed to generate certificate");
        fs::write(dir.join(FULLCHAIN), cert.cert.pem()).expect("write cert");
        fs::write(dir.join(PRIVKEY), cert.key_pair.serialize_pem()).expect("write key");
    }

    fn roots(live: &Path, certs_dir: &Path) -> DiscoveryRoots {
        DiscoveryRoots {
            letsencrypt_live: live.to_path_buf(),
            certs_dir: certs_dir.to_path_buf(),
        }
    }

    #[test]
    fn load_private_key_missing_fails() {
        let path = std::env::temp_dir().join(format!("passui-tls-test-key-{}", Uuid::new_v4()));
        assert!(load_private_key(&path).is_err());
    }

    #[test]
    fn explicit_pair_wins_over_domain_dir() {
        let live = temp_dir("explicit-live");
        let explicit_dir = temp_dir("explicit-pair");
        let domain_dir = live.join("example.com");
        fs::create_dir_all(&domain_dir).expect("domain dir");
        write_pair(&domain_dir, "example.com");
        write_pair(&explicit_dir, "explicit.example.com");

        let explicit = CertPaths::new(
            explicit_dir.join(FULLCHAIN),
            explicit_dir.join(PRIVKEY),
        );
        let found = discover(
            "example.com",
            Some(explicit.clone()),
            &roots(&live, &temp_dir("explicit-certs")),
        );
        assert_eq!(found, Some(explicit));
    }

    #[test]
    fn unreadable_explicit_pair_disables_tls() {
        let live = temp_dir("unreadable-live");
        let explicit = CertPaths::new(
            PathBuf::from("/nonexistent/fullchain.pem"),
            PathBuf::from("/nonexistent/privkey.pem"),
        );
        let found = discover(
            "example.com",
            Some(explicit),
            &roots(&live, &temp_dir("unreadable-certs")),
        );
        assert_eq!(found, None);
    }

    #[test]
    fn domain_dir_is_preferred() {
        let live = temp_dir("domain-live");
        for name in ["aaa.example.net", "example.com"] {
            let dir = live.join(name);
            fs::create_dir_all(&dir).expect("dir");
            write_pair(&dir, name);
        }

        let found = discover("example.com", None, &roots(&live, &temp_dir("domain-certs")))
            .expect("pair expected");
        assert_eq!(
            found.cert_path(),
            live.join("example.com").join(FULLCHAIN).as_path()
        );
    }

    #[test]
    fn scan_skips_readme_and_incomplete_dirs() {
        let live = temp_dir("scan-live");
        fs::write(live.join("README"), "certbot docs").expect("readme");

        // Incomplete pair: certificate only.
        let broken = live.join("broken.example.com");
        fs::create_dir_all(&broken).expect("dir");
        fs::write(broken.join(FULLCHAIN), "not a key pair").expect("cert only");

        let valid = live.join("valid.example.com");
        fs::create_dir_all(&valid).expect("dir");
        write_pair(&valid, "valid.example.com");

        let found = discover("missing.example.com", None, &roots(&live, &temp_dir("scan-certs")))
            .expect("pair expected");
        assert_eq!(found.cert_path(), valid.join(FULLCHAIN).as_path());
    }

    #[test]
    fn certs_dir_is_last_resort() {
        let live = temp_dir("fallback-live");
        let certs_dir = temp_dir("fallback-certs");
        write_pair(&certs_dir, "fallback.example.com");

        let found = discover("example.com", None, &roots(&live, &certs_dir))
            .expect("pair expected");
        assert_eq!(found.cert_path(), certs_dir.join(FULLCHAIN).as_path());
    }

    #[test]
    fn nothing_found_yields_none() {
        let live = temp_dir("none-live");
        let certs_dir = temp_dir("none-certs");
        assert_eq!(discover("example.com", None, &roots(&live, &certs_dir)), None);
    }

    #[test]
    fn test_load_valid_cert_config() {
        let dir = temp_dir("valid-config");
        write_pair(&dir, "localhost");

        let paths = CertPaths::new(dir.join(FULLCHAIN), dir.join(PRIVKEY));
        let config = load_server_config(&paths);
        assert!(
            config.is_ok(),
            "Failed to load valid server config: {:?}",
            config.err()
        );
        let config = config.unwrap_or_else(|_| unreachable!());
        assert!(config.alpn_protocols.contains(&b"h2".to_vec()));
        assert!(config.alpn_protocols.contains(&b"http/1.1".to_vec()));
    }

    #[test]
    fn garbage_certificate_fails() {
        let dir = temp_dir("garbage");
        fs::write(dir.join(FULLCHAIN), "not pem").expect("write");
        fs::write(dir.join(PRIVKEY), "not pem").expect("write");

        let paths = CertPaths::new(dir.join(FULLCHAIN), dir.join(PRIVKEY));
        assert!(load_server_config(&paths).is_err());
    }
}
