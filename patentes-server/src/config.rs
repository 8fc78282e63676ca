//! Runtime configuration and strategy selection.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use patentes_core::{LookupStrategy, SetupError, Source};
use patentes_provider_apps_script as apps_script;
use patentes_provider_boostr as boostr;
use patentes_provider_mtt as mtt;
use reqwest::Client;

/// Runtime settings, read from flags or the environment.
#[derive(Debug, Clone, Parser)]
#[command(name = "patentes-server", version)]
#[command(about = "Checks whether a plate belongs to a registered public-transport vehicle")]
pub(crate) struct Config {
    /// Address to listen on.
    #[arg(long, env = "HOST", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,

    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Backend answering lookups: html-fetch, google-apps-script or boostr-api.
    #[arg(long, env = "LOOKUP_STRATEGY", default_value_t = Source::HtmlFetch)]
    pub strategy: Source,

    /// Deadline for a single outbound lookup, in milliseconds.
    #[arg(long, env = "LOOKUP_TIMEOUT_MS", default_value_t = 10_000)]
    pub timeout_ms: u64,

    /// Override for the MTT query page.
    #[arg(long, env = "MTT_URL")]
    pub mtt_url: Option<String>,

    /// Deployed Apps Script URL. Required for google-apps-script.
    #[arg(long, env = "APPS_SCRIPT_URL")]
    pub apps_script_url: Option<String>,

    /// Boostr API key. Required for boostr-api.
    #[arg(long, env = "BOOSTR_API_KEY", hide_env_values = true)]
    pub boostr_api_key: Option<String>,

    /// Override for the Boostr transport endpoint.
    #[arg(long, env = "BOOSTR_URL")]
    pub boostr_url: Option<String>,
}

impl Config {
    pub(crate) fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Build the single strategy this deployment answers with.
    pub(crate) fn build_strategy(
        &self,
        client: Client,
    ) -> Result<Arc<dyn LookupStrategy>, SetupError> {
        match self.strategy {
            Source::HtmlFetch => Ok(mtt::strategy(client, self.mtt_url.clone())),
            Source::GoogleAppsScript => apps_script::strategy(client, self.apps_script_url.clone()),
            Source::BoostrApi => {
                boostr::strategy(client, self.boostr_api_key.clone(), self.boostr_url.clone())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::iter;

    use clap::CommandFactory;

    use super::*;

    fn parse(args: &[&str]) -> Config {
        Config::try_parse_from(iter::once("patentes-server").chain(args.iter().copied()))
            .expect("valid arguments")
    }

    fn declared_default(name: &str) -> String {
        let command = Config::command();
        let arg = command
            .get_arguments()
            .find(|arg| arg.get_id() == name)
            .expect("declared argument");
        arg.get_default_values()
            .iter()
            .map(|value| value.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn defaults_to_html_fetch_on_port_3000() {
        // Read the declared defaults, not a parse, so a PORT or
        // LOOKUP_STRATEGY in the test environment cannot leak in.
        assert_eq!(declared_default("port"), "3000");
        assert_eq!(declared_default("strategy"), "html-fetch");
        assert_eq!(declared_default("timeout_ms"), "10000");
    }

    #[test]
    fn timeout_is_read_in_milliseconds() {
        let config = parse(&["--timeout-ms", "10000"]);
        assert_eq!(config.lookup_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn rejects_unknown_strategy() {
        let parsed = Config::try_parse_from(["patentes-server", "--strategy", "fax"]);
        assert!(parsed.is_err(), "unknown strategy must not parse");
    }

    #[test]
    fn boostr_without_key_cannot_start() {
        let mut config = parse(&["--strategy", "boostr-api"]);
        config.boostr_api_key = None;

        let err = config
            .build_strategy(Client::new())
            .err()
            .expect("missing key must fail");

        assert_eq!(err, SetupError::MissingSetting(boostr::API_KEY_SETTING));
    }

    #[test]
    fn apps_script_without_url_cannot_start() {
        let mut config = parse(&["--strategy", "google-apps-script"]);
        config.apps_script_url = None;

        let err = config
            .build_strategy(Client::new())
            .err()
            .expect("missing url must fail");

        assert_eq!(err, SetupError::MissingSetting(apps_script::ENDPOINT_SETTING));
    }

    #[test]
    fn builds_the_selected_strategy() {
        let config = parse(&["--strategy", "boostr-api", "--boostr-api-key", "k"]);
        let strategy = config.build_strategy(Client::new()).expect("strategy");
        assert_eq!(strategy.source(), Source::BoostrApi);

        let config = parse(&[
            "--strategy",
            "html-fetch",
            "--mtt-url",
            "http://127.0.0.1:9/consulta",
        ]);
        let strategy = config.build_strategy(Client::new()).expect("strategy");
        assert_eq!(strategy.source(), Source::HtmlFetch);
    }

    #[tokio::test]
    async fn boostr_url_override_reaches_the_strategy() {
        // Nothing listens on a dropped listener's port, so the lookup must be
        // refused there instead of going to the public endpoint.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        drop(listener);

        let url = format!("http://{addr}/transport");
        let config = parse(&[
            "--strategy",
            "boostr-api",
            "--boostr-api-key",
            "k",
            "--boostr-url",
            url.as_str(),
        ]);
        let strategy = config.build_strategy(Client::new()).expect("strategy");

        let plate = patentes_core::normalize("ABCD12").expect("valid plate");
        let err = strategy.verify(&plate).await.expect_err("nothing listens");
        assert_eq!(err.kind(), patentes_core::FailureKind::Network);
    }
}
