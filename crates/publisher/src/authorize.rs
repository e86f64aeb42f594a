//! Out-of-band PIN authorization for obtaining an access key pair.

use suncast_common::config::PublishConfig;
use suncast_common::error::{SuncastError, SuncastResult};

use crate::credentials::ConsumerKeys;
use crate::oauth::{encode, OAuthSigner};

/// Temporary token issued at the start of the PIN flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestToken {
    pub token: String,
    pub secret: String,
    /// Page the account owner visits to get a PIN.
    pub authorize_url: String,
}

/// Long-lived access pair, to be stored in the keyfile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub key: String,
    pub secret: String,
    pub screen_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TwitterAuthorizer {
    client: reqwest::Client,
    consumer: ConsumerKeys,
    api_base: String,
}

impl TwitterAuthorizer {
    pub fn new(consumer: ConsumerKeys, config: &PublishConfig) -> SuncastResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("suncast/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SuncastError::config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            consumer,
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    fn signer(&self) -> OAuthSigner {
        OAuthSigner::new(&self.consumer.consumer_key, &self.consumer.consumer_secret)
    }

    pub async fn request_token(&self) -> SuncastResult<RequestToken> {
        let url = format!("{}/oauth/request_token", self.api_base);
        let auth = self
            .signer()
            .authorization("POST", &url, &[], &[("oauth_callback", "oob")])?;
        let body = self.post(&url, auth, "request token").await?;
        parse_request_token(&body, &self.api_base)
    }

    /// Exchange the PIN the account owner was shown for an access pair.
    pub async fn access_token(&self, request: &RequestToken, pin: &str) -> SuncastResult<AccessToken> {
        let pin = pin.trim();
        if pin.is_empty() {
            return Err(SuncastError::credentials("an authorization PIN is required"));
        }
        let url = format!("{}/oauth/access_token", self.api_base);
        let auth = self
            .signer()
            .with_token(&request.token, &request.secret)
            .authorization("POST", &url, &[], &[("oauth_verifier", pin)])?;
        let body = self.post(&url, auth, "access token").await?;
        parse_access_token(&body)
    }

    async fn post(&self, url: &str, auth: String, what: &str) -> SuncastResult<String> {
        let resp = self
            .client
            .post(url)
            .header(reqwest::header::AUTHORIZATION, auth)
            .send()
            .await
            .map_err(|e| SuncastError::credentials(format!("{what} request failed: {e}")))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| SuncastError::credentials(format!("{what} response unreadable: {e}")))?;
        if !status.is_success() {
            return Err(SuncastError::credentials(format!(
                "{what} returned {status}: {}",
                body.chars().take(500).collect::<String>()
            )));
        }
        Ok(body)
    }
}

fn form_value(pairs: &[(String, String)], key: &str) -> Option<String> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.clone())
}

fn required(pairs: &[(String, String)], key: &str) -> SuncastResult<String> {
    form_value(pairs, key)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| SuncastError::credentials(format!("response is missing {key}")))
}

fn parse_form(body: &str) -> Vec<(String, String)> {
    url::form_urlencoded::parse(body.trim().as_bytes())
        .into_owned()
        .collect()
}

pub(crate) fn parse_request_token(body: &str, api_base: &str) -> SuncastResult<RequestToken> {
    let pairs = parse_form(body);
    if form_value(&pairs, "oauth_callback_confirmed").as_deref() == Some("false") {
        return Err(SuncastError::credentials("callback was not confirmed"));
    }
    let token = required(&pairs, "oauth_token")?;
    let secret = required(&pairs, "oauth_token_secret")?;
    let authorize_url = format!(
        "{}/oauth/authorize?oauth_token={}",
        api_base.trim_end_matches('/'),
        encode(&token)
    );
    Ok(RequestToken {
        token,
        secret,
        authorize_url,
    })
}

pub(crate) fn parse_access_token(body: &str) -> SuncastResult<AccessToken> {
    let pairs = parse_form(body);
    Ok(AccessToken {
        key: required(&pairs, "oauth_token")?,
        secret: required(&pairs, "oauth_token_secret")?,
        screen_name: form_value(&pairs, "screen_name"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_request_token() {
        let token = parse_request_token(
            "oauth_token=Z6eEdO8MOmk394WozF5oKyuAv855l4Mlqo7hhlSLik&oauth_token_secret=Kd75W4OQfb2oJTV0vzGzeXftVAwgMnEK9MumzYcM&oauth_callback_confirmed=true",
            "https://api.twitter.com/",
        )
        .unwrap();
        assert_eq!(token.token, "Z6eEdO8MOmk394WozF5oKyuAv855l4Mlqo7hhlSLik");
        assert_eq!(token.secret, "Kd75W4OQfb2oJTV0vzGzeXftVAwgMnEK9MumzYcM");
        assert_eq!(
            token.authorize_url,
            "https://api.twitter.com/oauth/authorize?oauth_token=Z6eEdO8MOmk394WozF5oKyuAv855l4Mlqo7hhlSLik"
        );
    }

    #[test]
    fn test_unconfirmed_callback_is_rejected() {
        let err = parse_request_token(
            "oauth_token=a&oauth_token_secret=b&oauth_callback_confirmed=false",
            "https://api.twitter.com",
        )
        .unwrap_err();
        assert!(matches!(err, SuncastError::Credentials { .. }));
    }

    #[test]
    fn test_parse_access_token() {
        let token = parse_access_token(
            "oauth_token=6253282-eWudHldSbIaelX7swmsiHImEL4KinwaGloHANdrY&oauth_token_secret=2EEfA6BG3ly3sR3RjE0IBSnlQu4ZrUzPiYKmrkVU&user_id=6253282&screen_name=sunbot\n",
        )
        .unwrap();
        assert_eq!(token.key, "6253282-eWudHldSbIaelX7swmsiHImEL4KinwaGloHANdrY");
        assert_eq!(token.secret, "2EEfA6BG3ly3sR3RjE0IBSnlQu4ZrUzPiYKmrkVU");
        assert_eq!(token.screen_name.as_deref(), Some("sunbot"));
    }

    #[test]
    fn test_missing_secret_is_an_error() {
        let err = parse_access_token("oauth_token=abc").unwrap_err();
        assert!(err.to_string().contains("oauth_token_secret"));
    }
}
