//! Prints the hosted UI login URL for the configured user pool.
//!
//! Usage: `cognito-authorize-url [FULL_HOST] [SCRIPT_NAME]`
use std::error::Error;

use cognito::{Config, HttpRequestContext, Strategy};
use dotenv::dotenv;
use setup::{LogFormat, init_tracing};
use tracing::info;

const DEFAULT_FULL_HOST: &str = "http://localhost:3000";

fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();
    init_tracing(LogFormat::from_env())?;

    let mut args = std::env::args().skip(1);
    let full_host = args.next().unwrap_or_else(|| DEFAULT_FULL_HOST.to_string());
    let script_name = args.next().unwrap_or_default();

    let config = Config::from_env()?;
    let strategy = Strategy::from_config(config)?;

    let (mut parts, ()) = http::Request::builder()
        .uri(full_host.as_str())
        .body(())?
        .into_parts();
    let mut ctx = HttpRequestContext::new(&mut parts).with_script_name(script_name);

    let redirect = strategy.request_phase(&mut ctx)?;
    let callback_url = strategy.callback_url(&ctx);
    info!(%callback_url, "generated authorization url");

    println!("{}", redirect.url);
    println!("state: {}", redirect.state);
    println!("callback url: {callback_url}");
    for cookie in ctx.response_cookies() {
        println!("Set-Cookie: {cookie}");
    }
    Ok(())
}
