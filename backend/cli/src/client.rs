//! Client subcommands talking to a running heartlog server.

use anyhow::{bail, Context, Result};
use reqwest::{redirect::Policy, Client, Response};
use tokio::io::AsyncReadExt;

pub struct ServerClient {
    base: String,
    http: Client,
}

impl ServerClient {
    pub fn new(base: &str) -> Result<Self> {
        // `/.clear` answers 303; the redirect target is a page, not a result.
        let http = Client::builder()
            .redirect(Policy::none())
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            base: base.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub async fn status(&self) -> Result<()> {
        match self.http.get(self.url("/api/health")).send().await {
            Ok(resp) => {
                let body: serde_json::Value = checked(resp).await?.json().await?;
                println!("{}", serde_json::to_string_pretty(&body)?);
            }
            Err(_) => {
                println!("heartlog is not running at {}", self.base);
            }
        }
        Ok(())
    }

    pub async fn log(&self, origin: &str, message: Option<String>) -> Result<()> {
        let body = match message {
            Some(message) => message,
            None => {
                let mut buf = String::new();
                tokio::io::stdin()
                    .read_to_string(&mut buf)
                    .await
                    .context("Failed to read message from stdin")?;
                buf
            }
        };

        let resp = self
            .http
            .post(self.url("/.log"))
            .query(&[("origin", origin)])
            .body(body)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", self.base))?;
        checked(resp).await?;
        Ok(())
    }

    pub async fn ping(&self, origin: &str) -> Result<()> {
        let resp = self
            .http
            .post(self.url("/.monitor"))
            .query(&[("origin", origin)])
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", self.base))?;
        checked(resp).await?;
        Ok(())
    }

    pub async fn clear(&self) -> Result<()> {
        let resp = self
            .http
            .post(self.url("/.clear"))
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", self.base))?;
        checked(resp).await?;
        println!("All events cleared");
        Ok(())
    }
}

async fn checked(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() || status.is_redirection() {
        return Ok(resp);
    }
    let text = resp.text().await.unwrap_or_default();
    bail!("server answered {status}: {}", text.trim())
}
