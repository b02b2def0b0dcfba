// SPDX-FileCopyrightText: 2026 Licensor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTML body of the "your serial number" email.

use licensor_core::SnIssuedNotice;

/// A rendered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn render_sn_issued(notice: &SnIssuedNotice) -> RenderedEmail {
    let product = escape_html(&notice.product_name);
    let sn = escape_html(&notice.sn);
    let expires = escape_html(&notice.expires_at);
    let days = notice.days_left;

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="UTF-8"></head>
<body style="font-family: -apple-system, 'Segoe UI', Roboto, sans-serif; color: #333; background: #f0f0f0; margin: 0;">
  <div style="max-width: 520px; margin: 15px auto; background: #fff; border-radius: 8px;">
    <div style="background: #4f5bd5; color: #fff; padding: 20px; text-align: center; border-radius: 8px 8px 0 0;">
      <h1 style="margin: 0; font-size: 22px;">{product} - Your Serial Number</h1>
    </div>
    <div style="padding: 20px;">
      <p style="font-size: 12px; color: #856404; background: #fff3cd; padding: 8px 12px;">This is an automated message. Please do not reply.</p>
      <p>Thank you for requesting a {product} serial number:</p>
      <div style="border: 2px dashed #4f5bd5; padding: 15px; text-align: center; font-family: 'Courier New', monospace; font-size: 22px; font-weight: bold; letter-spacing: 2px;">{sn}</div>
      <p><strong>Valid until:</strong> {expires} ({days} days)</p>
      <p><strong>How to use:</strong> open {product}, enter the serial number, and activate.</p>
    </div>
  </div>
</body>
</html>
"#
    );

    RenderedEmail {
        subject: format!("{} - Your Serial Number", notice.product_name),
        html,
    }
}
