use crate::config::{self, AppConfig};
use crate::proxy::{self, ProxyDecision, ProxyEnv, HTTPS_PROXY_KEY, HTTP_PROXY_KEY};
use anyhow::{anyhow, Context, Result};
use colored::Colorize;
use reqwest::Url;
use std::path::Path;

struct DoctorSummary {
    lines: Vec<String>,
    healthy: bool,
}

pub fn run(config_file: &Path) -> Result<()> {
    let summary = evaluate(config_file, &ProxyEnv::from_process());

    for line in &summary.lines {
        println!("{line}");
    }

    if summary.healthy {
        Ok(())
    } else {
        Err(anyhow!("doctor checks failed"))
    }
}

fn evaluate(config_file: &Path, env: &ProxyEnv) -> DoctorSummary {
    let mut lines = Vec::new();
    let mut healthy = true;

    let loaded = config::load_config_from(config_file)
        .with_context(|| format!("loading configuration from {}", config_file.display()));

    match loaded {
        Ok(cfg) => {
            lines.push(format!(
                "Config: OK - configuration at {} parsed successfully",
                config_file.display()
            ));
            match check_provider_urls(&cfg, env) {
                Ok(message) => lines.push(format!("Providers: OK - {message}")),
                Err(err) => {
                    lines.push(format!("Providers: ERR - {err}"));
                    healthy = false;
                }
            }
        }
        Err(err) => {
            lines.push(format!("Config: ERR - {err:#}"));
            healthy = false;
        }
    }

    match check_proxy_env(env) {
        Ok(message) => lines.push(format!("Proxy: OK - {message}")),
        Err(err) => {
            lines.push(format!("Proxy: ERR - {err}"));
            healthy = false;
        }
    }

    if healthy {
        lines.push("Doctor summary: all checks passed".to_string());
    } else {
        lines.push("Doctor summary: issues detected".to_string());
    }

    DoctorSummary { lines, healthy }
}

pub fn check_provider_urls(config: &AppConfig, env: &ProxyEnv) -> Result<String> {
    let urls = [
        ("gemini_base_url", &config.providers.gemini_base_url),
        ("openai_base_url", &config.providers.openai_base_url),
    ];

    let mut hosts = Vec::new();
    for (key, value) in urls {
        let url = Url::parse(value).with_context(|| format!("{key} '{value}' is not a URL"))?;
        let host = proxy::target_host(&url)
            .ok_or_else(|| anyhow!("{key} '{value}' has no host"))?;
        hosts.push(format!("{host} via {}", describe(&proxy::resolve(env, host))));
    }

    Ok(hosts.join(", "))
}

pub fn check_proxy_env(env: &ProxyEnv) -> Result<String> {
    let chosen = env.chosen_proxy();
    if chosen.is_empty() {
        return Ok("no HTTPS_PROXY/HTTP_PROXY set, platform default applies".to_string());
    }

    let key = if env.https_proxy.is_empty() {
        HTTP_PROXY_KEY
    } else {
        HTTPS_PROXY_KEY
    };
    Url::parse(chosen).with_context(|| format!("{key} '{chosen}' is not a valid URL"))?;

    let bypass = proxy::parse_no_proxy(&env.no_proxy);
    Ok(format!("{key} = {chosen}, {} bypass pattern(s)", bypass.len()))
}

/// Human-readable form of a decision, as printed by the CLI.
pub fn describe(decision: &ProxyDecision) -> String {
    match decision {
        ProxyDecision::Proxy(url) => format!("proxy {url}"),
        ProxyDecision::Direct => "direct".to_string(),
        ProxyDecision::PlatformDefault => "platform default".to_string(),
    }
}

pub fn print_config(config_file: &Path) -> Result<()> {
    let current = config::load_config_from(config_file)?;

    let rendered = toml::to_string_pretty(&current)?;
    println!("{}", "Configuration".bold());
    println!("{}", format!("# {}", config_file.display()).bright_black());
    for line in rendered.lines() {
        if line.starts_with('[') {
            println!("{}", line.blue().bold());
        } else if let Some((key, value)) = line.split_once('=') {
            println!("{}={}", key.bold(), value.normal());
        } else {
            println!("{line}");
        }
    }

    Ok(())
}
