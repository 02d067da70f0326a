//! Proxy and URL list parsing.
//!
//! Both lists are plain text, one entry per line. Blank lines and lines
//! starting with `#` are ignored. A malformed proxy line is logged and
//! skipped; only a file with no usable entry at all is an error.

use crate::error::{ConfigError, ConfigResult};
use crate::types::ProxyEndpoint;
use std::path::Path;
use tracing::{debug, info, warn};

/// Parse one `ADDRESS:PORT:USERNAME:PASSWORD` line.
pub fn parse_proxy_line(line: &str) -> ConfigResult<ProxyEndpoint> {
    let parts: Vec<&str> = line.trim().split(':').collect();

    let [address, port, username, password] = parts.as_slice() else {
        return Err(ConfigError::InvalidValue {
            field: "proxy".to_string(),
            reason: format!("expected ADDRESS:PORT:USERNAME:PASSWORD, got {} fields", parts.len()),
        });
    };

    if address.is_empty() || address.chars().any(char::is_whitespace) {
        return Err(ConfigError::InvalidValue {
            field: "proxy.address".to_string(),
            reason: format!("invalid address '{address}'"),
        });
    }

    let port: u16 = match port.parse() {
        Ok(p) if p > 0 => p,
        _ => {
            return Err(ConfigError::InvalidValue {
                field: "proxy.port".to_string(),
                reason: format!("port must be between 1 and 65535, got '{port}'"),
            })
        }
    };

    if username.is_empty() {
        return Err(ConfigError::InvalidValue {
            field: "proxy.username".to_string(),
            reason: "username cannot be empty".to_string(),
        });
    }
    if password.is_empty() {
        return Err(ConfigError::InvalidValue {
            field: "proxy.password".to_string(),
            reason: "password cannot be empty".to_string(),
        });
    }

    Ok(ProxyEndpoint::new(*address, port, *username, *password))
}

/// Parse a proxy list, skipping comments, blank lines and malformed entries.
#[must_use]
pub fn parse_proxy_list(contents: &str) -> Vec<ProxyEndpoint> {
    content_lines(contents)
        .filter_map(|(line_num, line)| match parse_proxy_line(line) {
            Ok(proxy) => Some(proxy),
            Err(e) => {
                warn!(line = line_num, error = %e, "skipping malformed proxy");
                None
            }
        })
        .collect()
}

/// Parse a URL list, skipping comments and blank lines.
#[must_use]
pub fn parse_url_list(contents: &str) -> Vec<String> {
    content_lines(contents)
        .map(|(_, line)| line.to_string())
        .collect()
}

/// Load proxies from a file.
///
/// # Errors
/// `NotFound` if the file is missing, `Empty` if no line parsed.
pub fn load_proxies(path: &Path) -> ConfigResult<Vec<ProxyEndpoint>> {
    let contents = read_input(path)?;
    let proxies = parse_proxy_list(&contents);

    if proxies.is_empty() {
        return Err(ConfigError::Empty {
            path: path.display().to_string(),
        });
    }

    info!(count = proxies.len(), path = %path.display(), "loaded proxies");
    Ok(proxies)
}

/// Load target URLs from a file.
///
/// # Errors
/// `NotFound` if the file is missing, `Empty` if it holds no URL.
pub fn load_urls(path: &Path) -> ConfigResult<Vec<String>> {
    let contents = read_input(path)?;
    let urls = parse_url_list(&contents);

    if urls.is_empty() {
        return Err(ConfigError::Empty {
            path: path.display().to_string(),
        });
    }

    info!(count = urls.len(), path = %path.display(), "loaded URLs");
    Ok(urls)
}

/// Report every URL that is not an absolute http(s) URL.
///
/// Returns one message per problem; an empty vector means the list is usable.
#[must_use]
pub fn validate_urls(urls: &[String]) -> Vec<String> {
    let mut errors = Vec::new();

    if urls.is_empty() {
        errors.push("no URLs provided".to_string());
    }

    for (i, url) in urls.iter().enumerate() {
        let url = url.trim();
        if url.is_empty() {
            errors.push(format!("empty URL at index {i}"));
        } else if !(url.starts_with("http://") || url.starts_with("https://")) {
            errors.push(format!("invalid URL format at index {i}: {url}"));
        }
    }

    errors
}

fn read_input(path: &Path) -> ConfigResult<String> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.display().to_string(),
        });
    }
    debug!(path = %path.display(), "reading input list");
    Ok(std::fs::read_to_string(path)?)
}

/// Non-comment, non-blank lines with their 1-based line numbers.
fn content_lines(contents: &str) -> impl Iterator<Item = (usize, &str)> {
    contents
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
}
