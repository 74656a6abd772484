use std::net::SocketAddr;
use std::{fs, path::PathBuf};

use crate::args::game_file::{GameFile, load_game_file};

/// Every `;`-separated path must be a readable file.
///
/// # Errors
///
/// Will return `Err` if any of the files is not readable
pub fn check_readable_file(file: &str) -> Result<String, String> {
    for part in file.split(';').map(str::trim).filter(|p| !p.is_empty()) {
        let path = PathBuf::from(part);
        if !path.is_file() || fs::metadata(&path).is_err() {
            return Err(format!("The sql startup script '{part}' is not readable."));
        }
    }
    Ok(file.to_string())
}

/// # Errors
///
/// Will return `Err` if the file is not readable, is not valid toml, or one
/// of its games is misconfigured
pub fn check_game_file(file: &str) -> Result<GameFile, String> {
    load_game_file(&PathBuf::from(file)).map_err(|e| format!("{e:#}"))
}

/// # Errors
///
/// Will return `Err` if the value is not `host:port`
pub fn check_bind_addr(value: &str) -> Result<String, String> {
    value
        .parse::<SocketAddr>()
        .map(|_| value.to_string())
        .map_err(|e| format!("'{value}' is not a bind address: {e}"))
}

/// # Errors
///
/// Will return `Err` if the url is not http(s)
pub fn check_rating_url(value: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Ok(trimmed.to_string())
    } else {
        Err(format!("rating url '{value}' must start with http:// or https://"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_and_url_checks() {
        assert!(check_bind_addr("0.0.0.0:5201").is_ok());
        assert!(check_bind_addr("localhost").is_err());
        assert_eq!(
            check_rating_url(" https://ratings.example/api ").unwrap(),
            "https://ratings.example/api"
        );
        assert!(check_rating_url("ftp://nope").is_err());
        assert!(check_readable_file("/definitely/not/here.sql").is_err());
    }
}
