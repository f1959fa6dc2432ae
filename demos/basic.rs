use json_retry_http::{Request, RequestOptions};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
struct ShortLink {
    #[serde(rename = "shortLink")]
    short_link: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: serde_json::Value,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let url = std::env::var("SHORT_LINK_URL")?;
    let options = RequestOptions::from_env().map_err(anyhow::Error::msg)?;

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(15))
        .build()?;

    let response = Request::new(client)
        .with_options(options)
        .set_body(json!({
            "dynamicLinkInfo": {
                "link": "https://example.com/invited?eventId=42",
            }
        }))
        .set_result::<ShortLink>()
        .set_reason::<ApiError>()
        .post(&url)
        .await?;

    if response.is_error() {
        let reason = response.reason().map(|reason| &reason.error);
        println!("request failed with {}: {:?}", response.status(), reason);
        return Ok(());
    }

    println!("{}", response.into_result()?.short_link);
    Ok(())
}
