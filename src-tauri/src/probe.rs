//! Reachability check run before the embedded surface loads the remote
//! origin. The webview host does not report failed loads, so DNS and TCP
//! failures are detected here and reported with Chromium net error codes.

use std::io;
use std::time::Duration;
use tokio::net::{lookup_host, TcpStream};
use url::Url;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadFailure {
    pub url: String,
    pub code: i32,
    pub description: String,
}

impl LoadFailure {
    pub fn new(url: &Url, code: i32, description: &str) -> Self {
        Self {
            url: url.to_string(),
            code,
            description: description.to_string(),
        }
    }

    /// Body of the error dialog
    pub fn message(&self) -> String {
        format!(
            "Failed to load PiKVM interface.\n\nError code: {}\nDescription: {}\nURL: {}\n\nPlease check the PiKVM URL in settings.",
            self.code, self.description, self.url
        )
    }
}

impl std::fmt::Display for LoadFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}) loading {}", self.description, self.code, self.url)
    }
}

fn connect_error_code(error: &io::Error) -> (i32, &'static str) {
    match error.kind() {
        io::ErrorKind::ConnectionRefused => (-102, "CONNECTION_REFUSED"),
        io::ErrorKind::ConnectionReset => (-101, "CONNECTION_RESET"),
        io::ErrorKind::ConnectionAborted => (-103, "CONNECTION_ABORTED"),
        io::ErrorKind::TimedOut => (-118, "CONNECTION_TIMED_OUT"),
        io::ErrorKind::AddrNotAvailable => (-108, "ADDRESS_INVALID"),
        _ => (-109, "ADDRESS_UNREACHABLE"),
    }
}

/// Resolve the host and open one TCP connection to it
pub async fn probe(url: &Url) -> Result<(), LoadFailure> {
    let (Some(host), Some(port)) = (url.host_str(), url.port_or_known_default()) else {
        return Err(LoadFailure::new(url, -300, "INVALID_URL"));
    };
    let host = host.trim_start_matches('[').trim_end_matches(']');

    let addrs: Vec<_> = match lookup_host((host, port)).await {
        Ok(addrs) => addrs.collect(),
        Err(e) => {
            log::debug!("[Probe] Resolving {} failed: {}", host, e);
            return Err(LoadFailure::new(url, -105, "NAME_NOT_RESOLVED"));
        }
    };
    if addrs.is_empty() {
        return Err(LoadFailure::new(url, -105, "NAME_NOT_RESOLVED"));
    }

    let mut last_error = None;
    for addr in addrs {
        match tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(addr)).await {
            Ok(Ok(_)) => return Ok(()),
            Ok(Err(e)) => {
                log::debug!("[Probe] Connecting to {} failed: {}", addr, e);
                last_error = Some(connect_error_code(&e));
            }
            Err(_) => last_error = Some((-118, "CONNECTION_TIMED_OUT")),
        }
    }

    let (code, description) = last_error.unwrap_or((-2, "FAILED"));
    Err(LoadFailure::new(url, code, description))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_names_code_description_and_url() {
        let failure = LoadFailure::new(
            &Url::parse("https://bad-host/kvm").unwrap(),
            -105,
            "NAME_NOT_RESOLVED",
        );
        let message = failure.message();
        assert!(message.contains("Error code: -105"));
        assert!(message.contains("Description: NAME_NOT_RESOLVED"));
        assert!(message.contains("URL: https://bad-host/kvm"));
    }

    #[test]
    fn maps_io_errors_to_net_codes() {
        let refused = io::Error::from(io::ErrorKind::ConnectionRefused);
        assert_eq!(connect_error_code(&refused), (-102, "CONNECTION_REFUSED"));
        let timed_out = io::Error::from(io::ErrorKind::TimedOut);
        assert_eq!(connect_error_code(&timed_out).0, -118);
    }

    #[tokio::test]
    async fn reachable_listener_passes() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let url = Url::parse(&format!("http://127.0.0.1:{port}/kvm")).unwrap();
        assert_eq!(probe(&url).await, Ok(()));
    }

    #[tokio::test]
    async fn unresolvable_host_is_name_not_resolved() {
        let url = Url::parse("https://bad-host.invalid/kvm").unwrap();
        let failure = probe(&url).await.unwrap_err();
        assert_eq!(failure.code, -105);
        assert_eq!(failure.description, "NAME_NOT_RESOLVED");
        assert_eq!(failure.url, "https://bad-host.invalid/kvm");
    }

    #[tokio::test]
    async fn closed_port_is_refused() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let url = Url::parse(&format!("http://127.0.0.1:{port}/kvm")).unwrap();
        let failure = probe(&url).await.unwrap_err();
        assert_eq!(failure.code, -102);
        assert_eq!(failure.url, url.to_string());
    }
}
