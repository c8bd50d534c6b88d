use std::fs;
use std::io;
use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "config.toml";
pub const DEFAULT_PORT: u16 = 443;

/// Site section of the config file. All entries are optional, command line
/// flags take precedence over every one of them.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    pub siteurl: Option<String>,

    pub port: Option<u16>,

    pub scheme: Option<Scheme>,

    pub tokenfile: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

/// Site connection flags. Each one overrides the matching config file entry.
#[derive(Args, Debug, Default, Clone)]
pub struct SiteArgs {
    /// Path to the config file.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Mattermost site URL. Must be present either in config file or on
    /// command line.
    #[arg(long, value_name = "URL")]
    pub siteurl: Option<String>,

    /// Port on which Mattermost is running [default: 443].
    #[arg(long)]
    pub port: Option<u16>,

    /// The HTTP scheme to be used [default: https].
    #[arg(long, value_enum)]
    pub scheme: Option<Scheme>,

    /// A text file containing a valid Mattermost personal access token from
    /// an account with System Admin access.
    #[arg(long, value_name = "PATH")]
    pub tokenfile: Option<String>,
}

/// The effective connection configuration after merging flags, config file
/// and hard defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Site {
    pub host: String,
    pub port: u16,
    pub scheme: Scheme,
    pub token_path: String,
}

impl ConfigFile {
    /// Load the config file. An explicitly requested path must exist; a
    /// missing default file simply means everything comes from flags.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(path) => (expandenv("config", path)?, true),
            None => (String::from(DEFAULT_CONFIG_FILE), false),
        };

        match fs::read_to_string(Path::new(&path)) {
            Ok(data) => {
                let cfg: ConfigFile = toml::from_str(&data)
                    .with_context(|| format!("parse config file '{path}'"))?;
                Ok(cfg)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound && !explicit => {
                Ok(Self::default())
            }
            Err(err) => Err(err).with_context(|| format!("read config file '{path}'")),
        }
    }
}

impl Site {
    /// Pure merge of command line flags over config file entries. For each
    /// setting: flag if present, else file entry, else hard default; siteurl
    /// and tokenfile have no default and missing both sources is an error.
    pub fn resolve(args: &SiteArgs, file: &ConfigFile) -> Result<Self> {
        let host = match args.siteurl.as_ref().or(file.siteurl.as_ref()) {
            // The site URL is a bare host; a pasted URL loses its scheme
            // prefix, the --scheme flag decides that.
            Some(url) if !url.trim().is_empty() => url
                .trim()
                .trim_start_matches("https://")
                .trim_start_matches("http://")
                .trim_end_matches('/')
                .to_string(),
            _ => bail!("site URL must be set in the config file or with --siteurl"),
        };

        let token_path = match args.tokenfile.as_ref().or(file.tokenfile.as_ref()) {
            Some(path) if !path.trim().is_empty() => path.trim().to_string(),
            _ => bail!("token file must be set in the config file or with --tokenfile"),
        };

        Ok(Site {
            host,
            port: args.port.or(file.port).unwrap_or(DEFAULT_PORT),
            scheme: args.scheme.or(file.scheme).unwrap_or(Scheme::Https),
            token_path,
        })
    }

    pub fn base_url(&self) -> String {
        format!(
            "{}://{}:{}/api/v4",
            self.scheme.as_str(),
            self.host,
            self.port
        )
    }

    /// Read the personal access token: first line of the token file,
    /// surrounding whitespace stripped.
    pub fn read_token(&self) -> Result<String> {
        let path = expandenv("tokenfile", &self.token_path)?;
        let data = fs::read_to_string(&path)
            .with_context(|| format!("read token file '{path}'"))?;

        let token = data.lines().next().unwrap_or_default().trim();
        if token.is_empty() {
            bail!("token file '{path}' is empty");
        }
        Ok(token.to_string())
    }
}

/// See: [`shellexpand::full`].
fn expandenv(name: &str, s: &str) -> Result<String> {
    let s = shellexpand::full(s).with_context(|| format!("expand env value for '{name}'"))?;
    Ok(s.to_string())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn file_all_set() -> ConfigFile {
        ConfigFile {
            siteurl: Some(String::from("chat.example.com")),
            port: Some(8065),
            scheme: Some(Scheme::Http),
            tokenfile: Some(String::from("/etc/mmuser/token")),
        }
    }

    #[test]
    fn test_resolve_flags_win() {
        let args = SiteArgs {
            siteurl: Some(String::from("mm.example.org")),
            port: Some(8443),
            scheme: Some(Scheme::Https),
            tokenfile: Some(String::from("/tmp/token")),
            ..Default::default()
        };
        let site = Site::resolve(&args, &file_all_set()).unwrap();
        assert_eq!(
            site,
            Site {
                host: String::from("mm.example.org"),
                port: 8443,
                scheme: Scheme::Https,
                token_path: String::from("/tmp/token"),
            }
        );
    }

    #[test]
    fn test_resolve_file_fallback() {
        let site = Site::resolve(&SiteArgs::default(), &file_all_set()).unwrap();
        assert_eq!(site.host, "chat.example.com");
        assert_eq!(site.port, 8065);
        assert_eq!(site.scheme, Scheme::Http);
        assert_eq!(site.token_path, "/etc/mmuser/token");
    }

    #[test]
    fn test_resolve_hard_defaults() {
        let file = ConfigFile {
            siteurl: Some(String::from("chat.example.com")),
            tokenfile: Some(String::from("/etc/mmuser/token")),
            ..Default::default()
        };
        let site = Site::resolve(&SiteArgs::default(), &file).unwrap();
        assert_eq!(site.port, DEFAULT_PORT);
        assert_eq!(site.scheme, Scheme::Https);
        assert_eq!(site.base_url(), "https://chat.example.com:443/api/v4");
    }

    #[test]
    fn test_resolve_strips_scheme_prefix() {
        let args = SiteArgs {
            siteurl: Some(String::from("https://chat.example.com/")),
            tokenfile: Some(String::from("/tmp/token")),
            ..Default::default()
        };
        let site = Site::resolve(&args, &ConfigFile::default()).unwrap();
        assert_eq!(site.host, "chat.example.com");
    }

    #[test]
    fn test_resolve_missing_siteurl() {
        let file = ConfigFile {
            tokenfile: Some(String::from("/etc/mmuser/token")),
            ..Default::default()
        };
        let err = Site::resolve(&SiteArgs::default(), &file).unwrap_err();
        assert!(err.to_string().contains("site URL"));
    }

    #[test]
    fn test_resolve_missing_tokenfile() {
        let file = ConfigFile {
            siteurl: Some(String::from("chat.example.com")),
            ..Default::default()
        };
        let err = Site::resolve(&SiteArgs::default(), &file).unwrap_err();
        assert!(err.to_string().contains("token file"));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site.toml");
        let mut f = fs::File::create(&path).unwrap();
        writeln!(f, "siteurl = \"chat.example.com\"").unwrap();
        writeln!(f, "port = 8065").unwrap();
        writeln!(f, "scheme = \"http\"").unwrap();

        let cfg = ConfigFile::load(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(cfg.siteurl.as_deref(), Some("chat.example.com"));
        assert_eq!(cfg.port, Some(8065));
        assert_eq!(cfg.scheme, Some(Scheme::Http));
        assert_eq!(cfg.tokenfile, None);
    }

    #[test]
    fn test_load_explicit_file_missing() {
        let err = ConfigFile::load(Some("/no/such/config.toml")).unwrap_err();
        assert!(format!("{err:#}").contains("read config file"));
    }

    #[test]
    fn test_read_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token");
        fs::write(&path, "abcd1234efgh5678\n").unwrap();

        let site = Site {
            host: String::from("chat.example.com"),
            port: DEFAULT_PORT,
            scheme: Scheme::Https,
            token_path: path.to_str().unwrap().to_string(),
        };
        assert_eq!(site.read_token().unwrap(), "abcd1234efgh5678");
    }

    #[test]
    fn test_read_token_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token");
        fs::write(&path, "\n").unwrap();

        let site = Site {
            host: String::from("chat.example.com"),
            port: DEFAULT_PORT,
            scheme: Scheme::Https,
            token_path: path.to_str().unwrap().to_string(),
        };
        assert!(site.read_token().is_err());
    }
}
