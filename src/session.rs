//! The VPN engine seam. Everything the runner and the controller need from a
//! connection attempt goes through [`VpnSession`]; [`SessionFactory`] builds
//! one per attempt from a stored profile.

use crate::{
    bridge::{EventSender, NetworkInfo},
    control::CommandSender,
    error::{Error, Result},
    settings::ServerProfile,
    system::proxy::{self, SystemProxy},
};

/// How credentials are supplied to [`VpnSession::connect`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Attempt {
    /// Stored credentials only; the engine must not ask for anything.
    Batch,
    /// Credentials were just entered by the user.
    Interactive,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Gateway {
    pub host: String,
    pub port: Option<u16>,
    pub path: String,
}

impl Gateway {
    /// Accepts `host`, `host:port`, `[v6]:port` and `https://` URLs with an optional path.
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = || Error::Setup(format!("Failed to parse server URL '{input}'"));

        let trimmed = input.trim();
        let rest = match trimmed.split_once("://") {
            Some((scheme, rest)) if scheme.eq_ignore_ascii_case("https") => rest,
            Some(_) => return Err(invalid()),
            None => trimmed,
        };

        let (authority, path) = match rest.find('/') {
            Some(index) => (&rest[..index], &rest[index..]),
            None => (rest, ""),
        };
        let authority = authority.rsplit_once('@').map_or(authority, |(_, host)| host);

        let (host, port) = if let Some(bracketed) = authority.strip_prefix('[') {
            let (host, tail) = bracketed.split_once(']').ok_or_else(invalid)?;
            let port = match tail.strip_prefix(':') {
                Some(port) => Some(port),
                None if tail.is_empty() => None,
                None => return Err(invalid()),
            };
            (host, port)
        } else {
            match authority.split_once(':') {
                Some((host, port)) => (host, Some(port)),
                None => (authority, None),
            }
        };

        if host.is_empty() || host.chars().any(char::is_whitespace) {
            return Err(invalid());
        }
        let port = match port {
            Some(port) => match port.parse::<u16>() {
                Ok(0) | Err(_) => return Err(invalid()),
                Ok(port) => Some(port),
            },
            None => None,
        };

        Ok(Self {
            host: host.to_string(),
            port,
            path: path.trim_end_matches('/').to_string(),
        })
    }

    pub fn url(&self) -> String {
        let host = if self.host.contains(':') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        match self.port {
            Some(port) => format!("https://{host}:{port}{}", self.path),
            None => format!("https://{host}{}", self.path),
        }
    }
}

/// One connection attempt. Blocking calls (`connect`, `dtls_connect`,
/// `mainloop`) only run on the session thread.
pub trait VpnSession {
    fn parse_url(&mut self, url: &str) -> Result<()>;

    fn gateway(&self) -> Option<&Gateway>;

    fn set_proxy(&mut self, proxy_url: &str) -> Result<()>;

    /// Creates the control channel; the session keeps the receiving end.
    fn command_channel(&mut self) -> Result<CommandSender>;

    fn profile(&self) -> &ServerProfile;

    fn profile_mut(&mut self) -> &mut ServerProfile;

    fn connect(&mut self, attempt: Attempt) -> Result<()>;

    fn dtls_connect(&mut self) -> Result<()>;

    fn info(&self) -> NetworkInfo;

    /// Runs until the tunnel ends: remote disconnect, a cancel or detach
    /// command, or a fatal error.
    fn mainloop(&mut self) -> Result<()>;

    fn last_error(&self) -> String;

    /// Drops any half-open connection so `connect` can run again.
    fn reset(&mut self);
}

pub trait SessionFactory {
    fn create(
        &self,
        profile: ServerProfile,
        events: EventSender,
    ) -> Result<Box<dyn VpnSession + Send>>;

    fn system_proxy(&self, target_host: &str) -> Option<SystemProxy> {
        proxy::resolve(target_host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_host_and_port() {
        let gateway = Gateway::parse("vpn.example.com:443").unwrap();
        assert_eq!(gateway.host, "vpn.example.com");
        assert_eq!(gateway.port, Some(443));
        assert_eq!(gateway.url(), "https://vpn.example.com:443");
    }

    #[test]
    fn test_parse_bare_host() {
        let gateway = Gateway::parse("  vpn.example.com ").unwrap();
        assert_eq!(gateway.port, None);
        assert_eq!(gateway.url(), "https://vpn.example.com");
    }

    #[test]
    fn test_parse_url_with_path() {
        let gateway = Gateway::parse("https://gw.example.org:8443/staff/").unwrap();
        assert_eq!(gateway.host, "gw.example.org");
        assert_eq!(gateway.port, Some(8443));
        assert_eq!(gateway.path, "/staff");
        assert_eq!(gateway.url(), "https://gw.example.org:8443/staff");
    }

    #[test]
    fn test_parse_ipv6() {
        let gateway = Gateway::parse("[2001:db8::1]:443").unwrap();
        assert_eq!(gateway.host, "2001:db8::1");
        assert_eq!(gateway.url(), "https://[2001:db8::1]:443");
    }

    #[test]
    fn test_rejects_garbage() {
        for input in ["", "http://gw", "gw:notaport", "gw:0", "gw:70000", "bad host", "[::1"] {
            assert!(Gateway::parse(input).is_err(), "{input:?} should be rejected");
        }
    }
}
