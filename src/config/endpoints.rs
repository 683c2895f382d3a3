//! Benchmark site endpoints of a shared WebArena deployment.
//!
//! All sites are served from one host on fixed ports. The driver reads them
//! from environment variables named after each site.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the WebArena benchmark sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Site {
    Shopping,
    ShoppingAdmin,
    Reddit,
    Gitlab,
    Map,
    Wikipedia,
    Homepage,
}

impl Site {
    /// Export order used by `env` and when injecting into sessions.
    pub const ALL: [Site; 7] = [
        Site::Shopping,
        Site::ShoppingAdmin,
        Site::Reddit,
        Site::Gitlab,
        Site::Map,
        Site::Wikipedia,
        Site::Homepage,
    ];

    /// Environment variable consumed by the driver.
    pub fn env_name(&self) -> &'static str {
        match self {
            Site::Shopping => "SHOPPING",
            Site::ShoppingAdmin => "SHOPPING_ADMIN",
            Site::Reddit => "REDDIT",
            Site::Gitlab => "GITLAB",
            Site::Map => "MAP",
            Site::Wikipedia => "WIKIPEDIA",
            Site::Homepage => "HOMEPAGE",
        }
    }

    /// Port and path appended to the deployment host.
    pub fn default_suffix(&self) -> &'static str {
        match self {
            Site::Shopping => ":7770",
            Site::ShoppingAdmin => ":7780/admin",
            Site::Reddit => ":9999",
            Site::Gitlab => ":8023",
            Site::Map => ":3000",
            Site::Wikipedia => {
                ":8888/wikipedia_en_all_maxi_2022-05/A/User:The_other_Kiwix_guy/Landing"
            }
            Site::Homepage => ":4399",
        }
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.env_name())
    }
}

/// Endpoint settings as they appear in the fleet YAML.
///
/// `host` derives every site URL; per-site fields override the derived value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub host: Option<String>,
    pub shopping: Option<String>,
    pub shopping_admin: Option<String>,
    pub reddit: Option<String>,
    pub gitlab: Option<String>,
    pub map: Option<String>,
    pub wikipedia: Option<String>,
    pub homepage: Option<String>,
}

/// A resolved site URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Endpoint {
    pub name: &'static str,
    pub url: String,
}

impl EndpointConfig {
    /// Config pointing every site at `host`.
    pub fn from_host(host: impl Into<String>) -> Self {
        Self {
            host: Some(host.into()),
            ..Self::default()
        }
    }

    fn override_for(&self, site: Site) -> Option<&String> {
        match site {
            Site::Shopping => self.shopping.as_ref(),
            Site::ShoppingAdmin => self.shopping_admin.as_ref(),
            Site::Reddit => self.reddit.as_ref(),
            Site::Gitlab => self.gitlab.as_ref(),
            Site::Map => self.map.as_ref(),
            Site::Wikipedia => self.wikipedia.as_ref(),
            Site::Homepage => self.homepage.as_ref(),
        }
    }

    /// URL for one site, if either an override or a host is configured.
    pub fn url(&self, site: Site) -> Option<String> {
        if let Some(url) = self.override_for(site) {
            return Some(url.clone());
        }
        self.host
            .as_deref()
            .map(|host| format!("{}{}", host.trim_end_matches('/'), site.default_suffix()))
    }

    /// All sites that resolve, in [`Site::ALL`] order.
    pub fn resolve(&self) -> Vec<Endpoint> {
        Site::ALL
            .iter()
            .filter_map(|site| {
                self.url(*site).map(|url| Endpoint {
                    name: site.env_name(),
                    url,
                })
            })
            .collect()
    }

    pub fn is_configured(&self) -> bool {
        Site::ALL.iter().any(|site| self.url(*site).is_some())
    }
}

/// Renders `export NAME="URL"` lines for sourcing from a shell.
pub fn render_exports(endpoints: &[Endpoint]) -> String {
    endpoints
        .iter()
        .map(|e| format!("export {}=\"{}\"", e.name, e.url))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOST: &str = "http://ec2-3-149-78-74.us-east-2.compute.amazonaws.com";

    #[test]
    fn test_host_derives_all_sites() {
        let endpoints = EndpointConfig::from_host(HOST).resolve();
        assert_eq!(endpoints.len(), 7);
        assert_eq!(endpoints[0].name, "SHOPPING");
        assert_eq!(endpoints[0].url, format!("{}:7770", HOST));
        assert_eq!(endpoints[1].url, format!("{}:7780/admin", HOST));
        assert_eq!(endpoints[6].name, "HOMEPAGE");
        assert_eq!(endpoints[6].url, format!("{}:4399", HOST));
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let config = EndpointConfig::from_host(format!("{}/", HOST));
        assert_eq!(
            config.url(Site::Reddit),
            Some(format!("{}:9999", HOST))
        );
    }

    #[test]
    fn test_override_wins() {
        let config = EndpointConfig {
            map: Some("http://tiles.internal:8080".to_string()),
            ..EndpointConfig::from_host(HOST)
        };
        assert_eq!(
            config.url(Site::Map),
            Some("http://tiles.internal:8080".to_string())
        );
        assert_eq!(config.url(Site::Gitlab), Some(format!("{}:8023", HOST)));
    }

    #[test]
    fn test_unconfigured_resolves_nothing() {
        let config = EndpointConfig::default();
        assert!(!config.is_configured());
        assert!(config.resolve().is_empty());

        let partial = EndpointConfig {
            wikipedia: Some("http://wiki:8888".to_string()),
            ..EndpointConfig::default()
        };
        assert!(partial.is_configured());
        assert_eq!(partial.resolve().len(), 1);
    }

    #[test]
    fn test_render_exports() {
        let endpoints = vec![
            Endpoint {
                name: "SHOPPING",
                url: "http://h:7770".to_string(),
            },
            Endpoint {
                name: "MAP",
                url: "http://h:3000".to_string(),
            },
        ];
        assert_eq!(
            render_exports(&endpoints),
            "export SHOPPING=\"http://h:7770\"\nexport MAP=\"http://h:3000\""
        );
    }
}
