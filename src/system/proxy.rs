//! Discovery of the desktop's configured proxy for the VPN gateway.

#[cfg(target_os = "linux")]
use super::run_silent_with_output;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProxyKind {
    Http,
    Socks5,
}

impl ProxyKind {
    pub fn scheme(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Socks5 => "socks5",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SystemProxy {
    pub kind: ProxyKind,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

impl SystemProxy {
    /// Value for openconnect's `--proxy`.
    pub fn url(&self) -> String {
        let mut url = format!("{}://", self.kind.scheme());
        if !self.user.is_empty() {
            url.push_str(&self.user);
            if !self.password.is_empty() {
                url.push(':');
                url.push_str(&self.password);
            }
            url.push('@');
        }
        url.push_str(&self.host);
        if self.port != 0 {
            url.push_str(&format!(":{}", self.port));
        }
        url
    }

    /// Same as [`SystemProxy::url`] with the password masked, for logs.
    pub fn display(&self) -> String {
        let masked = Self {
            password: if self.password.is_empty() {
                String::new()
            } else {
                "****".into()
            },
            ..self.clone()
        };
        masked.url()
    }
}

pub trait ProxySource {
    fn name(&self) -> &str;
    fn lookup(&self, target_host: &str) -> Option<SystemProxy>;
}

pub fn sources() -> Vec<Box<dyn ProxySource>> {
    let mut sources: Vec<Box<dyn ProxySource>> = vec![Box::new(EnvironmentProxy)];

    #[cfg(target_os = "linux")]
    {
        if GnomeProxy::is_available() {
            sources.push(Box::new(GnomeProxy));
        }
        if KdeProxy::is_available() {
            sources.push(Box::new(KdeProxy));
        }
    }

    #[cfg(target_os = "windows")]
    sources.push(Box::new(RegistryProxy));

    sources
}

pub fn resolve(target_host: &str) -> Option<SystemProxy> {
    for source in sources() {
        if let Some(proxy) = source.lookup(target_host) {
            log::info!(
                "[proxy] {} proxy for {target_host}: {}",
                source.name(),
                proxy.display()
            );
            return Some(proxy);
        }
    }
    log::debug!("[proxy] no system proxy for {target_host}");
    None
}

pub fn parse_proxy_url(value: &str) -> Option<SystemProxy> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let (kind, rest) = match value.split_once("://") {
        Some((scheme, rest)) => {
            let kind = match scheme.to_ascii_lowercase().as_str() {
                "http" | "https" => ProxyKind::Http,
                "socks" | "socks5" | "socks5h" => ProxyKind::Socks5,
                _ => return None,
            };
            (kind, rest)
        }
        None => (ProxyKind::Http, value),
    };

    let rest = rest.trim_end_matches('/');
    let (credentials, address) = match rest.rsplit_once('@') {
        Some((credentials, address)) => (Some(credentials), address),
        None => (None, rest),
    };
    let (user, password) = match credentials {
        Some(credentials) => match credentials.split_once(':') {
            Some((user, password)) => (user.to_string(), password.to_string()),
            None => (credentials.to_string(), String::new()),
        },
        None => (String::new(), String::new()),
    };

    let (host, port) = split_host_port(address)?;
    Some(SystemProxy {
        kind,
        host,
        port,
        user,
        password,
    })
}

fn split_host_port(address: &str) -> Option<(String, u16)> {
    if let Some(stripped) = address.strip_prefix('[') {
        let (host, rest) = stripped.split_once(']')?;
        let port = rest
            .strip_prefix(':')
            .and_then(|port| port.parse().ok())
            .unwrap_or(0);
        return Some((host.to_string(), port));
    }
    match address.rsplit_once(':') {
        Some((host, port)) if !host.contains(':') => {
            Some((host.to_string(), port.parse().ok()?))
        }
        _ if address.is_empty() => None,
        _ => Some((address.to_string(), 0)),
    }
}

/// Whether `host` is excluded by a `no_proxy`-style list.
pub fn bypassed(no_proxy: &str, host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    no_proxy
        .split([',', ';', ' '])
        .map(|entry| entry.trim().to_ascii_lowercase())
        .filter(|entry| !entry.is_empty())
        .any(|entry| {
            if entry == "*" {
                return true;
            }
            let entry = entry.trim_start_matches('*').trim_start_matches('.');
            !entry.is_empty() && (host == entry || host.ends_with(&format!(".{entry}")))
        })
}

pub struct EnvironmentProxy;

impl ProxySource for EnvironmentProxy {
    fn name(&self) -> &str {
        "environment"
    }

    fn lookup(&self, target_host: &str) -> Option<SystemProxy> {
        let read = |name: &str| {
            std::env::var(name)
                .or_else(|_| std::env::var(name.to_uppercase()))
                .ok()
                .filter(|value| !value.trim().is_empty())
        };

        if let Some(no_proxy) = read("no_proxy")
            && bypassed(&no_proxy, target_host)
        {
            log::debug!("[proxy] {target_host} bypassed by no_proxy");
            return None;
        }

        ["https_proxy", "all_proxy", "http_proxy"]
            .into_iter()
            .find_map(|name| read(name).and_then(|value| parse_proxy_url(&value)))
    }
}

#[cfg(target_os = "linux")]
pub struct GnomeProxy;

#[cfg(target_os = "linux")]
impl GnomeProxy {
    pub fn is_available() -> bool {
        let desktop = std::env::var("XDG_CURRENT_DESKTOP").unwrap_or_default();
        desktop.split(':').any(|d| {
            matches!(
                d,
                "GNOME" | "Unity" | "Cinnamon" | "X-Cinnamon" | "MATE" | "Budgie" | "Pantheon"
            )
        })
    }

    fn get(schema: &str, key: &str) -> Option<String> {
        let (success, stdout) = run_silent_with_output("gsettings", &["get", schema, key]);
        if !success {
            return None;
        }
        Some(stdout.trim().trim_matches('\'').to_string())
    }

    fn endpoint(schema: &str, kind: ProxyKind) -> Option<SystemProxy> {
        let host = Self::get(schema, "host").filter(|host| !host.is_empty())?;
        let port = Self::get(schema, "port")
            .and_then(|port| port.parse().ok())
            .unwrap_or(0);
        Some(SystemProxy {
            kind,
            host,
            port,
            user: String::new(),
            password: String::new(),
        })
    }
}

#[cfg(target_os = "linux")]
impl ProxySource for GnomeProxy {
    fn name(&self) -> &str {
        "GSettings"
    }

    fn lookup(&self, target_host: &str) -> Option<SystemProxy> {
        if Self::get("org.gnome.system.proxy", "mode").as_deref() != Some("manual") {
            return None;
        }
        if let Some(ignored) = Self::get("org.gnome.system.proxy", "ignore-hosts") {
            let list = ignored.trim_matches(['[', ']']).replace('\'', "");
            if bypassed(&list, target_host) {
                return None;
            }
        }

        if let Some(mut proxy) = Self::endpoint("org.gnome.system.proxy.https", ProxyKind::Http)
            .or_else(|| Self::endpoint("org.gnome.system.proxy.http", ProxyKind::Http))
        {
            if Self::get("org.gnome.system.proxy.http", "use-authentication").as_deref()
                == Some("true")
            {
                proxy.user =
                    Self::get("org.gnome.system.proxy.http", "authentication-user")
                        .unwrap_or_default();
                proxy.password =
                    Self::get("org.gnome.system.proxy.http", "authentication-password")
                        .unwrap_or_default();
            }
            return Some(proxy);
        }

        Self::endpoint("org.gnome.system.proxy.socks", ProxyKind::Socks5)
    }
}

#[cfg(target_os = "linux")]
pub struct KdeProxy;

#[cfg(target_os = "linux")]
impl KdeProxy {
    pub fn is_available() -> bool {
        let desktop = std::env::var("XDG_CURRENT_DESKTOP").unwrap_or_default();
        desktop.split(':').any(|d| d == "KDE")
    }

    fn read_command() -> &'static str {
        match std::env::var("KDE_SESSION_VERSION")
            .unwrap_or_default()
            .as_str()
        {
            "5" => "kreadconfig5",
            _ => "kreadconfig6",
        }
    }

    fn get(key: &str) -> Option<String> {
        let (success, stdout) = run_silent_with_output(
            Self::read_command(),
            &["--file", "kioslaverc", "--group", "Proxy Settings", "--key", key],
        );
        let value = stdout.trim().to_string();
        (success && !value.is_empty()).then_some(value)
    }
}

/// KDE stores proxies as "scheme://host port".
pub fn parse_kde_proxy_value(value: &str) -> Option<SystemProxy> {
    let value = value.trim();
    match value.rsplit_once(' ') {
        Some((address, port)) if port.parse::<u16>().is_ok() => {
            parse_proxy_url(&format!("{}:{port}", address.trim()))
        }
        _ => parse_proxy_url(value),
    }
}

#[cfg(target_os = "linux")]
impl ProxySource for KdeProxy {
    fn name(&self) -> &str {
        "KDE KIO"
    }

    fn lookup(&self, target_host: &str) -> Option<SystemProxy> {
        if Self::get("ProxyType").as_deref() != Some("1") {
            return None;
        }
        if let Some(ignored) = Self::get("NoProxyFor")
            && bypassed(&ignored, target_host)
        {
            return None;
        }
        Self::get("httpsProxy")
            .and_then(|value| parse_kde_proxy_value(&value))
            .or_else(|| Self::get("httpProxy").and_then(|value| parse_kde_proxy_value(&value)))
            .or_else(|| {
                Self::get("socksProxy").and_then(|value| {
                    parse_kde_proxy_value(&value).map(|proxy| SystemProxy {
                        kind: ProxyKind::Socks5,
                        ..proxy
                    })
                })
            })
    }
}

/// Parses the registry `ProxyServer` value, either "host:port" or
/// "http=host:port;https=host:port;socks=host:port".
pub fn parse_windows_proxy_server(value: &str) -> Option<SystemProxy> {
    if !value.contains('=') {
        return parse_proxy_url(value);
    }
    let entries: Vec<(&str, &str)> = value
        .split(';')
        .filter_map(|entry| entry.split_once('='))
        .map(|(scheme, address)| (scheme.trim(), address.trim()))
        .collect();
    let find = |wanted: &str| {
        entries
            .iter()
            .find(|(scheme, _)| scheme.eq_ignore_ascii_case(wanted))
            .map(|(_, address)| *address)
    };

    if let Some(address) = find("https").or_else(|| find("http")) {
        return parse_proxy_url(address);
    }
    find("socks").and_then(|address| parse_proxy_url(&format!("socks5://{address}")))
}

#[cfg(target_os = "windows")]
pub struct RegistryProxy;

#[cfg(target_os = "windows")]
const INTERNET_SETTINGS_KEY: &str = r"Software\Microsoft\Windows\CurrentVersion\Internet Settings";

#[cfg(target_os = "windows")]
impl ProxySource for RegistryProxy {
    fn name(&self) -> &str {
        "Windows Registry"
    }

    fn lookup(&self, target_host: &str) -> Option<SystemProxy> {
        let key = windows_registry::CURRENT_USER
            .open(INTERNET_SETTINGS_KEY)
            .map_err(|error| log::debug!("[proxy] failed to open registry key: {error}"))
            .ok()?;
        if key.get_u32("ProxyEnable").unwrap_or(0) == 0 {
            return None;
        }
        let overrides = key.get_string("ProxyOverride").unwrap_or_default();
        if bypassed(&overrides, target_host) {
            return None;
        }
        let server = key.get_string("ProxyServer").ok()?;
        parse_windows_proxy_server(&server)
    }
}
