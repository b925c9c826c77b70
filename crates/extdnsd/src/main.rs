// # extdnsd - ExtDNS Daemon
//
// This is a THIN integration layer: it turns environment variables into an
// `ExtDnsConfig`, wires a source, a provider and the controller together, and
// waits for a shutdown signal. All reconciliation logic lives in extdns-core
// and the provider crates.
//
// The daemon is responsible for:
// 1. Reading configuration from environment variables (the only place they are read)
// 2. Initializing tracing and the runtime
// 3. Registering providers
// 4. Running the reconciliation controller
//
// ## Configuration
//
// ### Provider
// - `EXTDNS_PROVIDER`: Provider type (cloudflare)
// - `CF_API_TOKEN`: Cloudflare API token, or
// - `CF_API_KEY` + `CF_API_EMAIL`: Cloudflare global API key and account email
// - `EXTDNS_DOMAIN_FILTER`: Only manage zones and hostnames under this suffix
// - `EXTDNS_CLOUDFLARE_PROXIED`: Route records through the Cloudflare edge (true/false)
// - `EXTDNS_ZONE_CONCURRENCY`: Zones written concurrently (default 4)
// - `EXTDNS_MODE`: `live` (default) or `dry-run`
//
// ### Desired endpoints
// - `EXTDNS_ENDPOINTS`: Comma-separated `name=target` entries; an explicit
//   record type is given as `name:TYPE=target`
//
// ### Controller
// - `EXTDNS_INTERVAL_SECS`: Seconds between reconciliation passes (default 60)
// - `EXTDNS_POLICY`: sync, upsert-only (default) or create-only
// - `EXTDNS_ONCE`: Run a single pass and exit (true/false)
// - `EXTDNS_LOG_LEVEL`: trace, debug, info (default), warn, error
//
// ## Example
//
// ```bash
// export CF_API_TOKEN=your_token
// export EXTDNS_DOMAIN_FILTER=example.com
// export EXTDNS_ENDPOINTS=www.example.com=198.51.100.4,api.example.com=lb.example.net
// export EXTDNS_POLICY=sync
//
// extdnsd
// ```

use anyhow::{Result, bail};
use extdns_core::{
    CloudflareAuth, Controller, ControllerConfig, ControllerEvent, DomainFilter, EndpointConfig,
    ExtDnsConfig, Policy, ProviderConfig, ProviderRegistry, RecordType, SourceConfig,
    StaticSource,
};
use std::env;
use std::fmt::Display;
use std::process::ExitCode;
use std::str::FromStr;
use tokio::sync::oneshot;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum ExtDnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<ExtDnsExitCode> for ExitCode {
    fn from(code: ExtDnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    extdns: ExtDnsConfig,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key/value lookup
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let provider_type = var("EXTDNS_PROVIDER").unwrap_or_else(|| "cloudflare".to_string());
        if provider_type != "cloudflare" {
            bail!(
                "EXTDNS_PROVIDER '{}' is not supported. \
                Supported providers: cloudflare",
                provider_type
            );
        }

        let auth = match (var("CF_API_TOKEN"), var("CF_API_KEY"), var("CF_API_EMAIL")) {
            (Some(_), Some(_), _) => bail!(
                "Set either CF_API_TOKEN or CF_API_KEY/CF_API_EMAIL, not both"
            ),
            (Some(token), None, _) => CloudflareAuth::api_token(token),
            (None, Some(key), Some(email)) => CloudflareAuth::api_key(key, email),
            (None, Some(_), None) => bail!(
                "CF_API_EMAIL is required together with CF_API_KEY"
            ),
            (None, None, _) => bail!(
                "Cloudflare credentials are required. \
                Set them via: export CF_API_TOKEN=your_token"
            ),
        };

        let mut provider = ProviderConfig::cloudflare(auth);
        if let ProviderConfig::Cloudflare {
            domain_filter,
            proxied,
            dry_run,
            zone_concurrency,
            ..
        } = &mut provider
        {
            *domain_filter = DomainFilter::new(var("EXTDNS_DOMAIN_FILTER").unwrap_or_default());
            *proxied = parse_bool("EXTDNS_CLOUDFLARE_PROXIED", var("EXTDNS_CLOUDFLARE_PROXIED"))?;
            *dry_run = match var("EXTDNS_MODE").as_deref() {
                None | Some("live") => false,
                Some("dry-run") => true,
                Some(other) => bail!(
                    "EXTDNS_MODE '{}' is not valid. Valid modes: live, dry-run",
                    other
                ),
            };
            if let Some(concurrency) =
                parse_number("EXTDNS_ZONE_CONCURRENCY", var("EXTDNS_ZONE_CONCURRENCY"))?
            {
                *zone_concurrency = concurrency;
            }
        }

        let endpoints = parse_endpoints(&var("EXTDNS_ENDPOINTS").unwrap_or_default())?;

        let mut controller = ControllerConfig::default();
        if let Some(interval) = parse_number("EXTDNS_INTERVAL_SECS", var("EXTDNS_INTERVAL_SECS"))? {
            controller.interval_secs = interval;
        }
        if let Some(policy) = var("EXTDNS_POLICY") {
            controller.policy = policy.parse::<Policy>()?;
        }
        controller.once = parse_bool("EXTDNS_ONCE", var("EXTDNS_ONCE"))?;

        Ok(Self {
            extdns: ExtDnsConfig {
                provider,
                source: SourceConfig::Static { endpoints },
                controller,
            },
            log_level: var("EXTDNS_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    ///
    /// On top of the structural checks of `ExtDnsConfig` this catches
    /// placeholder credentials, malformed hostnames and unusable intervals.
    fn validate(&self) -> Result<()> {
        self.extdns.validate()?;

        if let ProviderConfig::Cloudflare {
            auth,
            domain_filter,
            ..
        } = &self.extdns.provider
        {
            let secret = match auth {
                CloudflareAuth::ApiToken { token } => token,
                CloudflareAuth::ApiKey { key, .. } => key,
            };

            // Check for obvious placeholder credentials (common mistake)
            let secret_lower = secret.to_lowercase();
            if secret_lower.contains("your_token")
                || secret_lower.contains("replace_me")
                || secret_lower.contains("example")
                || secret_lower == "token"
            {
                bail!(
                    "Cloudflare credentials appear to be a placeholder. \
                    Use an actual API token or key."
                );
            }

            if !domain_filter.is_empty() {
                validate_domain_name(domain_filter.as_str())?;
            }
        }

        let SourceConfig::Static { endpoints } = &self.extdns.source;
        if endpoints.is_empty() {
            bail!(
                "EXTDNS_ENDPOINTS must contain at least one endpoint. \
                Set it via: export EXTDNS_ENDPOINTS=www.example.com=198.51.100.4"
            );
        }
        for endpoint in endpoints {
            validate_domain_name(&endpoint.dns_name)?;
        }

        let interval = self.extdns.controller.interval_secs;
        if !(10..=86400).contains(&interval) {
            bail!(
                "EXTDNS_INTERVAL_SECS must be between 10 and 86400 seconds. Got: {}",
                interval
            );
        }

        // Validate log level
        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => bail!(
                "EXTDNS_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    fn endpoint_count(&self) -> usize {
        match &self.extdns.source {
            SourceConfig::Static { endpoints } => endpoints.len(),
        }
    }
}

fn parse_bool(key: &str, value: Option<String>) -> Result<bool> {
    match value.as_deref().map(str::to_lowercase).as_deref() {
        None | Some("false") | Some("0") | Some("no") => Ok(false),
        Some("true") | Some("1") | Some("yes") => Ok(true),
        Some(other) => bail!("{} must be true or false. Got: {}", key, other),
    }
}

fn parse_number<T>(key: &str, value: Option<String>) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .map(|v| {
            v.parse::<T>()
                .map_err(|e| anyhow::anyhow!("{} must be a number. Got: {} ({})", key, v, e))
        })
        .transpose()
}

/// Parse `name=target` entries, with `name:TYPE=target` for an explicit type
fn parse_endpoints(raw: &str) -> Result<Vec<EndpointConfig>> {
    let mut endpoints = Vec::new();

    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let Some((name, target)) = entry.split_once('=') else {
            bail!(
                "EXTDNS_ENDPOINTS entry '{}' must have the form name=target",
                entry
            );
        };

        let endpoint = match name.split_once(':') {
            Some((name, record_type)) => EndpointConfig::new(name.trim(), target.trim())
                .with_record_type(record_type.parse::<RecordType>()?),
            None => EndpointConfig::new(name.trim(), target.trim()),
        };
        endpoints.push(endpoint);
    }

    Ok(endpoints)
}

/// Validate that a string is a valid domain name
///
/// This implements basic DNS domain name validation per RFC 1035, relaxed
/// for the underscore labels of TXT records and a leading wildcard.
fn validate_domain_name(domain: &str) -> Result<()> {
    let domain = domain.strip_suffix('.').unwrap_or(domain);
    if domain.is_empty() {
        bail!("Domain name cannot be empty");
    }

    // Total length limit (RFC 1035: 253 chars max)
    if domain.len() > 253 {
        bail!(
            "Domain name too long: {} chars (max 253). Got: {}",
            domain.len(),
            domain
        );
    }

    for (i, label) in domain.split('.').enumerate() {
        if label.is_empty() {
            bail!("Domain name has empty label: '{}'", domain);
        }

        if i == 0 && label == "*" {
            continue;
        }

        if label.len() > 63 {
            bail!(
                "Domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            );
        }

        if !label
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
        {
            bail!(
                "Domain label contains invalid characters. Label: '{}'. \
                Valid: alphanumeric, hyphen and underscore only.",
                label
            );
        }

        // Label cannot start or end with hyphen
        if label.starts_with('-') || label.ends_with('-') {
            bail!(
                "Domain label cannot start or end with hyphen. Label: '{}'",
                label
            );
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExtDnsExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return ExtDnsExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return ExtDnsExitCode::ConfigError.into();
    }

    info!("Starting extdnsd daemon");
    info!(
        "Configuration loaded: {} endpoint(s), provider {}, policy {:?}",
        config.endpoint_count(),
        config.extdns.provider.type_name(),
        config.extdns.controller.policy
    );

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return ExtDnsExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(config).await {
            error!("Daemon error: {}", e);
            ExtDnsExitCode::RuntimeError
        } else {
            ExtDnsExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Run the daemon
async fn run_daemon(config: Config) -> Result<()> {
    let registry = ProviderRegistry::new();

    #[cfg(feature = "cloudflare")]
    {
        info!("Registering Cloudflare provider");
        extdns_provider_cloudflare::register(&registry);
    }

    let ExtDnsConfig {
        provider,
        source,
        controller: controller_config,
    } = config.extdns;

    let provider = registry.create_provider(&provider).await?;
    let source = match &source {
        SourceConfig::Static { endpoints } => StaticSource::from_config(endpoints)?,
    };

    let (controller, mut events) =
        Controller::new(Box::new(source), provider, &controller_config)?;

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            log_event(&event);
        }
    });

    if controller_config.once {
        let changes = controller.run_once().await?;
        info!(
            creates = changes.create.len(),
            updates = changes.update_count(),
            deletes = changes.delete.len(),
            "Single reconciliation pass complete"
        );
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(async move {
        match wait_for_shutdown().await {
            Ok(signal) => info!("Received shutdown signal: {}", signal),
            Err(e) => error!("Shutdown error: {}", e),
        }
        let _ = shutdown_tx.send(());
    });

    controller.run_with_shutdown(Some(shutdown_rx)).await?;
    info!("Shutting down daemon");

    Ok(())
}

fn log_event(event: &ControllerEvent) {
    match event {
        ControllerEvent::Started { interval_secs } => {
            info!(interval_secs, "Controller started");
        }
        ControllerEvent::PassSucceeded {
            pass,
            creates,
            updates,
            deletes,
            finished_at,
        } => {
            debug!(pass, creates, updates, deletes, %finished_at, "Pass succeeded");
        }
        ControllerEvent::PassFailed { pass, error } => {
            warn!(pass, error = %error, "Pass failed, retrying on next interval");
        }
        ControllerEvent::Stopped { reason } => {
            info!(reason = %reason, "Controller stopped");
        }
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    let signal = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    Ok(signal)
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
