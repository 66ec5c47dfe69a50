use std::{net::SocketAddr, path::PathBuf};

use anyhow::Context;

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub database_url: String,
    pub database_max_connections: u32,
    pub media_root: PathBuf,
    pub media_url: String,
    pub admin_site_title: String,
    pub admin_site_header: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 =
            std::env::var("PORT").unwrap_or_else(|_| "3000".to_string()).parse().context("PORT")?;

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://movies.db?mode=rwc".to_string());

        let database_max_connections: u32 = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        let media_root =
            PathBuf::from(std::env::var("MEDIA_ROOT").unwrap_or_else(|_| "media".to_string()));
        let media_url = normalize_media_url(
            &std::env::var("MEDIA_URL").unwrap_or_else(|_| "/media".to_string()),
        );

        let admin_site_title =
            std::env::var("ADMIN_SITE_TITLE").unwrap_or_else(|_| "Movies".to_string());
        let admin_site_header =
            std::env::var("ADMIN_SITE_HEADER").unwrap_or_else(|_| "Movies".to_string());

        Ok(Self {
            addr: format!("{host}:{port}").parse().context("HOST/PORT")?,
            database_url,
            database_max_connections,
            media_root,
            media_url,
            admin_site_title,
            admin_site_header,
        })
    }

    /// Public URL for a stored image path.
    pub fn media_src(&self, path: &str) -> String {
        format!("{}/{}", self.media_url, path.trim_start_matches('/'))
    }
}

/// Leading slash, no trailing slash: `media/` -> `/media`. The root is not a valid prefix.
fn normalize_media_url(raw: &str) -> String {
    match raw.trim().trim_matches('/') {
        "" => "/media".to_string(),
        trimmed => format!("/{trimmed}"),
    }
}

#[cfg(test)]
pub fn test_config() -> Config {
    Config {
        addr: "127.0.0.1:0".parse().expect("addr"),
        database_url: "sqlite::memory:".to_string(),
        database_max_connections: 1,
        media_root: PathBuf::from("media"),
        media_url: "/media".to_string(),
        admin_site_title: "Movies".to_string(),
        admin_site_header: "Movies".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_url_is_normalized() {
        assert_eq!(normalize_media_url("media/"), "/media");
        assert_eq!(normalize_media_url("/static/media"), "/static/media");
        assert_eq!(normalize_media_url("/"), "/media");
    }

    #[test]
    fn media_src_joins_paths() {
        let config = test_config();
        assert_eq!(config.media_src("movies/poster.jpg"), "/media/movies/poster.jpg");
        assert_eq!(config.media_src("/actors/a.png"), "/media/actors/a.png");
    }
}
