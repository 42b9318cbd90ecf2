//! Rendering seam for the login challenge.

use super::capture::Challenge;

pub trait ChallengeRenderer: Send + Sync {
    /// Render the login page for `challenge` as HTML.
    fn render(&self, challenge: &Challenge) -> String;
}

/// Minimal built-in login page.
#[derive(Clone, Debug, Default)]
pub struct LoginPage;

impl ChallengeRenderer for LoginPage {
    fn render(&self, challenge: &Challenge) -> String {
        format!(
            r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>Login</title></head>
<body>
<form method="post" action="{action}" enctype="application/x-www-form-urlencoded">
<input type="hidden" name="loginaction" value="login">
<input type="hidden" name="loginmethod" value="{method}">
<input type="hidden" name="loginheaders" value="{headers}">
<input type="hidden" name="loginbody" value="{body}">
<input type="text" name="username" autocomplete="username" required>
<input type="password" name="password" autocomplete="current-password" required>
<button type="submit">Login</button>
</form>
</body>
</html>
"#,
            action = escape_attr(&challenge.action),
            method = escape_attr(&challenge.method),
            headers = escape_attr(&challenge.headers),
            body = escape_attr(&challenge.body),
        )
    }
}

fn escape_attr(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
