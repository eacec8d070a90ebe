use serde::Deserialize;

/// Query string of `GET /auth/login`
#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    #[serde(rename = "callbackUrl")]
    pub callback_url: Option<String>,
    /// Set after a rejected sign-in attempt
    pub error: Option<String>,
}

/// Form body of `POST /auth/login`
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    #[serde(rename = "callbackUrl", default)]
    pub callback_url: Option<String>,
}
