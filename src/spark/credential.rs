//! Browser session credential formatting
//!
//! Spark authenticates the web client through an `ssoSessionId` cookie. The
//! bridge presents itself as a desktop browser: a fixed header set plus a
//! cookie jar in which only the session id is real.

use rand::Rng;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, COOKIE};
use sha2::{Digest, Sha256};

use crate::error::{AppError, AppResult};

/// Challenge token the web client posts with every chat message
pub const GT_TOKEN: &str = "RzAwAGPhPKm+/9ZXJiBczVs0AJi32oPNZVXQxtWEjWBIP9R/jABbXLN0ESmMLCIj91w3ZeXT4J1ZA4CGcf14DgMDKWSDHLHnQIkotlkRhVEYSb/o58dKgu3LjYLC3Dy+76/agYQkhpiOdVc7s68bfGYLvibLdyrIJyX42a0GErTall8JYmiq6IO5K1w4je2QeYheEpKKqyttEjWnOBUAKrXx2kLYetnIebNyFOKr8o1A7jvKdNA6YfdpoJg0tHA3SQc72eiL0lO4/3kP1FWhonscdvH/88j5KRX76bO0u3+Fqt7FyFkHfLIcrZGN5HAc5GUuZrCUkf/OpePeNtPQ9gOC5pI8BlFnZQX9s2xFUv+R8Ijj6N5FNHBBhSJL/B5MYtMxMAmxOvs1rv/EACslRc2NJQb1Vu1BSFye//ATQZYTA6+Ox+BqTFcAy/yDEYRZE53ML1DZ4gG9QwmejVWLbW5N+dWPnbscua2/ZM20oIABd5NK6tp+6aQ71oen2mq/ADf17ekoH7zn/fe0U6pBGOVnl/+hDotMPbXbhzd6QBj3RIIaDBRFJdBI7AWkfe6DZvss+bURUcxy+B4wbkBc9E7791LYFKAHjh0poIT9L+Yz+rDihSIJLTBe0zcjOLRefFXyxB4zwfmIJhCNcrHWzL3+BhsZuGrd3LovOOGMObOOloAD2FYeizATyourGcz8U10POOF/ZnaAJOH7vMijGD9UhcPtPUgDzSWX6TZc+QUCM4XcGfbPcNIx9Y47OLEtsgsrrBNPPUXZLVV4ywR5mM0YU5i8Xzcba8QPuEnwI8GY09MIKCqwS+SYphKHdWn06Xm4mAT5wQtUXB1FVB6vmdnimhSdp8YF3y85xu1I7pTbAHU6y8MvX5WUS9KBMu5YSu02S4RGaXZgbsGSVMqtMyVunpNZ/uozjFbQZLF09R2hX94iFCiEfJ9F4EuEZWXFpiRrlNPjkVNWk7fyy4b8cTIN1myIeKbCRVGBj8pgoUbxkOjxZuVVpAXvKHyo0UuuXIpggLKx+rUZTg9GcJO7bowuRHvxF6wqayZsrT4NkLHiKgH9PP8wWCG/IBjCksmpB8AXmMMq6c5yyrXrXSg865OgLjM40+GyjzLsyLtOSLagbmCv9PsWEm5nlrUq+5J+kFEHRvvhybuuJ9cdsz9c/J2A+9i6xOePi2cEGKCmQrnbuGuS2UINZvc0L2F2RiPN3quzJ0yvUpSEt+Do37lj+sKY5vowdtP0BWka0NtHEYF8fpwNBj4DzELhZFZg/cnFgaf1EySk4/bCQtaZumrra3skfYrlWPP9IPRbDUNS5piqEg0IbKSGVIVMuShJzsiWvgEuWHIVzZEurIXR8UJ3h/XB4ciaFdDCjdo///Y7yRH00luqDLF9rnB9BRFfSOCxnH6fC0ZpW5qLpq3fFA3OuFgsGUENUaOBSYc1V5sZmGrpqHv+cSNvfyPXRuR3gHHbY4k0wFWWWXsCKdT+GQM9lD2eXzRrw5mRckGr+578Xa3Evf8tHAVSRo1HJTI2BmZQYhHxRia+LO/xCFdnLr7nwFqJ5cUWbqlCGmKNykPVZcuCJMr3qaVK2ED/GLB/6JB+0xXmtLJjm3qltNuu0Hv7cIdctXBQMcUP/NgxL2e1FPO6TbJjlwFBMcTjWmS9IjAb/irqZd/xEO/0Ak6rZo8twB6vIIhh8IVnPkOH037nbb27yc8XfT0CwZKX20nkKNtCpngghbAic7a8i9t3EulTvoJ1F37LnQ2F7OZ4JjSOKMgh6pw8GPp+mN0RZ/pfQIYc/HDhhLKN5cSdUaRjFdtxHuTd7B9nx/DA/fScgTOo7BA8lkxYp66bnvdoEfEzt8SM6Wm92JRYnARSVJpndJJCdFoRHVWFqHYzqlQaHYysiMo/vz6/fg==";

const BROWSER_HEADERS: &[(&str, &str)] = &[
    ("accept", "application/json, text/plain, */*"),
    ("accept-encoding", "gzip, deflate, br, zstd"),
    ("accept-language", "zh-CN,zh;q=0.9"),
    ("cache-control", "no-cache"),
    ("origin", "https://xinghuo.xfyun.cn"),
    ("pragma", "no-cache"),
    (
        "sec-ch-ua",
        "\"Chromium\";v=\"122\", \"Not(A:Brand\";v=\"24\", \"Google Chrome\";v=\"122\"",
    ),
    ("sec-ch-ua-mobile", "?0"),
    ("sec-ch-ua-platform", "\"Windows\""),
    ("sec-fetch-dest", "empty"),
    ("sec-fetch-mode", "cors"),
    ("sec-fetch-site", "same-site"),
    ("referer", "https://xinghuo.xfyun.cn/"),
    (
        "user-agent",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36",
    ),
];

/// Extra headers sent on JSON (XHR-style) calls
const XHR_HEADERS: &[(&str, &str)] = &[
    ("clienttype", "1"),
    ("lang-code", "zh"),
    ("x-requested-with", "XMLHttpRequest"),
];

/// Extra headers sent with the chat form post
const CHAT_HEADERS: &[(&str, &str)] = &[
    ("botweb", "0"),
    ("challenge", "undefined"),
    ("seccode", ""),
    ("validate", "undefined"),
];

/// A pre-obtained Spark web session token
#[derive(Clone)]
pub struct SparkCredential {
    sso_session_id: String,
}

impl std::fmt::Debug for SparkCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SparkCredential")
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}

impl SparkCredential {
    pub fn new(sso_session_id: impl Into<String>) -> Self {
        Self {
            sso_session_id: sso_session_id.into(),
        }
    }

    /// Pick one token from a comma-separated list, at random
    ///
    /// Returns `None` when the list holds no non-empty token.
    pub fn pick(tokens: &str) -> Option<Self> {
        let candidates: Vec<&str> = tokens
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect();
        if candidates.is_empty() {
            return None;
        }
        let index = rand::rng().random_range(0..candidates.len());
        Some(Self::new(candidates[index]))
    }

    /// Raw session token
    pub fn token(&self) -> &str {
        &self.sso_session_id
    }

    /// SHA-256 fingerprint of the token, safe to log
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.sso_session_id.as_bytes());
        hex::encode(hasher.finalize())[..16].to_string()
    }

    /// Cookie string carrying the session token and synthetic browser cookies
    pub fn cookie(&self) -> String {
        [
            "JSESSIONID=A66730ECFCD6E33D0FD7E3F0D190437A".to_string(),
            format!("di_c_mti={}", uuid::Uuid::new_v4()),
            "d_d_app_ver=1.4.0".to_string(),
            "daas_st=%7B%22sdk_ver%22%3A%221.3.9%22%2C%22status%22%3A%220%22%7D".to_string(),
            "appid=150b4dfebe".to_string(),
            format!("d_d_ci={}", uuid::Uuid::new_v4()),
            format!("ssoSessionId={}", self.sso_session_id),
            format!("account_id=18{}", random_digits(9)),
        ]
        .join("; ")
    }

    /// Browser headers plus the session cookie
    pub fn browser_headers(&self) -> AppResult<HeaderMap> {
        let mut headers = static_headers(BROWSER_HEADERS);
        let cookie = HeaderValue::from_str(&self.cookie()).map_err(|_| AppError::InvalidToken)?;
        headers.insert(COOKIE, cookie);
        Ok(headers)
    }

    /// Headers for JSON calls against the conversation and file APIs
    pub fn xhr_headers(&self) -> AppResult<HeaderMap> {
        let mut headers = self.browser_headers()?;
        headers.extend(static_headers(XHR_HEADERS));
        Ok(headers)
    }

    /// Headers for the chat form post
    pub fn chat_headers(&self) -> AppResult<HeaderMap> {
        let mut headers = self.browser_headers()?;
        headers.extend(static_headers(CHAT_HEADERS));
        Ok(headers)
    }
}

/// Browser headers without a session cookie (object storage pushes, probes)
pub fn anonymous_browser_headers() -> HeaderMap {
    static_headers(BROWSER_HEADERS)
}

/// String of `len` random decimal digits
pub fn random_digits(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}

fn static_headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(pairs.len());
    for (name, value) in pairs {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }
    headers
}
