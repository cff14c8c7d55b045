use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use toml;

/// The caller's role, as the proxy reports it. The proxy is the
/// authority on authorization; the role here only controls what the
/// tool displays and which privileged fetches it attempts.
#[derive(
    Deserialize, Serialize, Default, Clone, Copy, Debug, PartialEq, Eq, strum_macros::Display,
)]
pub(crate) enum UserRole {
    #[default]
    #[serde(rename = "Admin")]
    #[strum(serialize = "Admin")]
    Admin,
    #[serde(rename = "Admin Viewer")]
    #[strum(serialize = "Admin Viewer")]
    AdminViewer,
    #[serde(rename = "App Owner")]
    #[strum(serialize = "App Owner")]
    AppOwner,
    #[serde(rename = "App User")]
    #[strum(serialize = "App User")]
    AppUser,
}

#[derive(Deserialize, Serialize, Default, Debug)]
pub(crate) struct Proxy {
    pub api_base: Option<String>,
    pub access_token: Option<String>,
    pub user_id: Option<String>,
    pub user_role: Option<UserRole>,
}

#[derive(Deserialize, Serialize, Default, Debug)]
pub(crate) struct Config {
    #[serde(default)]
    pub proxy: Proxy,
}

fn get_config_path() -> Option<PathBuf> {
    let home = std::env::var_os("HOME");

    if let Some(home) = home {
        let home = PathBuf::from(home);

        const USER_PATHS: [&str; 2] = [".config/modelctl/config.toml", ".modelctl.toml"];

        for &path in USER_PATHS.iter() {
            let fullpath = home.join(path);

            if fullpath.exists() {
                return Some(fullpath);
            }
        }
    }

    let system_config = PathBuf::from("/etc/modelctl.toml");

    if system_config.exists() {
        Some(system_config)
    } else {
        None
    }
}

fn parse_config_or_die<S: serde::de::DeserializeOwned>(config: &str) -> S {
    let r: Result<S, toml::de::Error> = toml::de::from_str(config);

    match r {
        Ok(s) => s,
        Err(err) => die::die!("failed to parse config: {}", err),
    }
}

fn warn_on_extra_fields_helper<'a>(
    path: &mut Vec<&'a String>,
    user_config: &'a toml::Table,
    config: &'a toml::Table,
) {
    for (user_key, user_value) in user_config {
        path.push(user_key);

        if let Some(config_value) = config.get(user_key) {
            match (user_value, config_value) {
                (toml::Value::Table(user_value), toml::Value::Table(config_value)) => {
                    warn_on_extra_fields_helper(path, user_value, config_value)
                }
                _ => {}
            }
        } else {
            let path: Vec<&str> = path.iter().map(|&s| s.as_str()).collect();

            crate::warn!("config contains extraneous key \"{}\", ignoring", path.join("."));
        }

        path.pop();
    }
}

fn warn_on_extra_fields(config: &Config, raw_config: &str) {
    let user_config: toml::Table = parse_config_or_die(raw_config);

    let config: toml::Table = {
        let seralized_config = toml::ser::to_string(&config).expect("failed to reserialize config");

        parse_config_or_die(&seralized_config)
    };

    let mut path = Vec::new();

    warn_on_extra_fields_helper(&mut path, &user_config, &config);
}

pub(crate) fn read_config(config: Option<PathBuf>) -> Config {
    let config_path = config.or_else(get_config_path);

    if let Some(path) = config_path {
        let raw_config = match std::fs::read_to_string(&path) {
            Ok(raw_config) => raw_config,
            Err(err) => die::die!("failed to read config {}: {}", path.display(), err),
        };

        let config: Config = parse_config_or_die(&raw_config);

        warn_on_extra_fields(&config, &raw_config);

        config
    } else {
        Config::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proxy_section_parses() {
        let config: Config = toml::de::from_str(
            r#"
            [proxy]
            api_base = "http://localhost:4000"
            access_token = "sk-admin"
            user_id = "admin"
            user_role = "Admin Viewer"
            "#,
        )
        .unwrap();

        assert_eq!(config.proxy.api_base.as_deref(), Some("http://localhost:4000"));
        assert_eq!(config.proxy.user_role, Some(UserRole::AdminViewer));
    }

    #[test]
    fn empty_config_defaults() {
        let config: Config = toml::de::from_str("").unwrap();

        assert!(config.proxy.api_base.is_none());
        assert!(config.proxy.user_role.is_none());
    }
}
