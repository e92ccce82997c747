//! `adsb-relay health` — check the health of a running instance.
//!
//! Sends a `GET /health` request to the status endpoint and displays
//! the response as formatted text or raw JSON.

use std::time::Duration;

use http_body_util::BodyExt;

use crate::cli::HealthArgs;
use crate::error::RelayError;
use crate::health::HealthResponse;
use crate::server;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn execute(args: HealthArgs) -> Result<(), RelayError> {
    let url = format!("{}/health", args.url.trim_end_matches('/'));
    let uri = url
        .parse::<hyper::Uri>()
        .map_err(|e| RelayError::UriParse { source: Box::new(e) })?;

    let client = server::build_http_client();
    let fetch = async {
        let response = client.get(uri).await.map_err(request_failed)?;
        let status = response.status();
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(request_failed)?
            .to_bytes();
        Ok::<_, RelayError>((status, body))
    };
    let (status, body) = tokio::time::timeout(REQUEST_TIMEOUT, fetch)
        .await
        .map_err(|_| RelayError::HttpRequest {
            source: format!("no response from {url} within {}s", REQUEST_TIMEOUT.as_secs()).into(),
        })??;

    if !status.is_success() {
        return Err(RelayError::HealthCheckFailed(status));
    }

    if args.json {
        println!("{}", String::from_utf8_lossy(&body));
        return Ok(());
    }

    match serde_json::from_slice::<HealthResponse>(&body) {
        Ok(health) => print_health(&args.url, &health),
        Err(e) => {
            eprintln!("Unexpected health response: {e}");
            println!("{}", String::from_utf8_lossy(&body));
        }
    }

    Ok(())
}

fn request_failed(e: impl std::error::Error + Send + Sync + 'static) -> RelayError {
    RelayError::HttpRequest { source: Box::new(e) }
}

fn print_health(url: &str, health: &HealthResponse) {
    let source = if health.source_connected {
        "connected"
    } else {
        "disconnected"
    };
    println!("\u{2713} adsb-relay is healthy ({url})");
    println!("  uptime:         {}", format_uptime(health.uptime_seconds));
    println!("  output:         {} (decoder {source})", health.output);
    println!(
        "  config version: {} (loaded {}s ago, {} warnings)",
        health.config.version, health.config.loaded_ago_seconds, health.config.warnings
    );
    println!(
        "  records:        {} received, {} forwarded, {} filtered",
        health.stats.received, health.stats.forwarded, health.stats.filtered
    );
    println!(
        "  delivery:       {} send failures, {} dropped, {} reconnects",
        health.stats.send_failures, health.stats.dropped, health.stats.reconnects
    );
    let connected = health.endpoints.iter().filter(|e| e.connected).count();
    println!(
        "  endpoints:      {connected}/{} connected",
        health.endpoints.len()
    );
    for endpoint in &health.endpoints {
        let mark = if endpoint.connected { "\u{2713}" } else { "\u{2717}" };
        println!("    {mark} {} ({})", endpoint.name, endpoint.address);
    }
}

fn format_uptime(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m {secs}s")
    } else if minutes > 0 {
        format!("{minutes}m {secs}s")
    } else {
        format!("{secs}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uptime_formatting() {
        assert_eq!(format_uptime(59), "59s");
        assert_eq!(format_uptime(61), "1m 1s");
        assert_eq!(format_uptime(3723), "1h 2m 3s");
    }

    #[tokio::test]
    async fn unreachable_instance_is_a_request_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let args = HealthArgs {
            url: format!("http://{addr}"),
            json: true,
        };
        assert!(matches!(
            execute(args).await,
            Err(RelayError::HttpRequest { .. })
        ));
    }

    #[tokio::test]
    async fn malformed_url_is_rejected() {
        let args = HealthArgs {
            url: "http://bad host".to_string(),
            json: false,
        };
        assert!(matches!(
            execute(args).await,
            Err(RelayError::UriParse { .. })
        ));
    }
}
