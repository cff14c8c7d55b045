use std::env::VarError;
use std::io::{self, IsTerminal};

use crate::config::{Config, UserRole};
use crate::gateway::proxy::ProxyGateway;
use crate::{die, RequestedColorMode};

pub(crate) mod add;
pub(crate) mod delete;
pub(crate) mod health;
pub(crate) mod list;

#[derive(Clone, Copy, strum_macros::Display)]
pub(crate) enum ColorMode {
    On,
    Off,
}

impl ColorMode {
    /// Returns whether ANSI color should be used
    /// If the user has specified a preference, this is honored. This preference
    /// can be specified through the command line or the "NO_COLOR" environment
    /// variable If the user hasn't stated a preference, color is enabled if the
    /// output is a terminal.
    pub(crate) fn resolve_auto(cm: RequestedColorMode) -> ColorMode {
        match cm {
            RequestedColorMode::Auto => {
                let disable_color =
                    std::env::var_os("NO_COLOR").is_some() || !io::stdout().is_terminal();

                if disable_color {
                    ColorMode::Off
                } else {
                    ColorMode::On
                }
            }
            RequestedColorMode::On => ColorMode::On,
            RequestedColorMode::Off => ColorMode::Off,
        }
    }
}

const ACCESS_TOKEN_ENV_VAR: &str = "MODELCTL_ACCESS_TOKEN";

fn env_access_token() -> Option<String> {
    match std::env::var(ACCESS_TOKEN_ENV_VAR) {
        Ok(token) => Some(token),
        Err(err) => match err {
            VarError::NotUnicode(_) => die!("failed to parse {}", ACCESS_TOKEN_ENV_VAR),
            VarError::NotPresent => None,
        },
    }
}

/// Builds the gateway from the config, with the access token optionally
/// supplied through the environment. Dies if the caller identity is
/// incomplete.
pub(crate) fn connect(config: &Config) -> (ProxyGateway, UserRole) {
    let proxy = &config.proxy;

    let env_token = env_access_token();

    let access_token = match proxy.access_token.as_ref().or(env_token.as_ref()) {
        Some(token) => token,
        None => die!(
            "no access token configured, add it to the config or define {}",
            ACCESS_TOKEN_ENV_VAR
        ),
    };

    let user_id = match &proxy.user_id {
        Some(user_id) => user_id,
        None => die!("no user id configured, add \"user_id\" to the [proxy] config section"),
    };

    let role = proxy.user_role.unwrap_or_default();

    let gateway = match &proxy.api_base {
        Some(api_base) => {
            match ProxyGateway::new(api_base, access_token, user_id, &role.to_string()) {
                Ok(gateway) => gateway,
                Err(err) => die!("proxy API base failed to parse: {}", err),
            }
        }
        None => ProxyGateway::with_access_token(access_token, user_id, &role.to_string()),
    };

    (gateway, role)
}
