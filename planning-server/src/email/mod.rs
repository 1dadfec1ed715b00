//! Outgoing email through AWS SES v2
//!
//! Plain messages use the simple content API. Messages with attachments
//! (the monthly report) are sent as raw MIME.

use aws_sdk_sesv2::Client as SesClient;
use aws_sdk_sesv2::primitives::Blob;
use aws_sdk_sesv2::types::{Body, Content, Destination, EmailContent, Message, RawMessage};
use base64::Engine;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// File attached to a raw MIME message
#[derive(Debug, Clone)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

#[derive(Clone)]
pub struct EmailService {
    ses: SesClient,
    from_address: Option<String>,
    from_name: String,
}

impl EmailService {
    pub fn new(ses: SesClient, from_address: Option<String>, from_name: String) -> Self {
        Self {
            ses,
            from_address,
            from_name,
        }
    }

    /// Email is only sent when a sender address is configured
    pub fn is_configured(&self) -> bool {
        self.from_address.is_some()
    }

    fn from_header(&self) -> Result<String, BoxError> {
        let address = self
            .from_address
            .as_deref()
            .ok_or("EMAIL_FROM_ADDRESS is not configured")?;
        Ok(format!("{} <{address}>", encode_header(&self.from_name)))
    }

    pub async fn send_text(&self, to: &str, subject: &str, text: &str) -> Result<(), BoxError> {
        let from = self.from_header()?;
        let subject = Content::builder().data(subject).charset("UTF-8").build()?;
        let body = Body::builder()
            .text(Content::builder().data(text).charset("UTF-8").build()?)
            .build();
        let message = Message::builder().subject(subject).body(body).build();

        self.ses
            .send_email()
            .from_email_address(from)
            .destination(Destination::builder().to_addresses(to).build())
            .content(EmailContent::builder().simple(message).build())
            .send()
            .await?;

        tracing::info!(to = to, "Email sent");
        Ok(())
    }

    /// One message to all recipients, with a single attachment
    pub async fn send_with_attachment(
        &self,
        to: &[String],
        subject: &str,
        text: &str,
        attachment: &Attachment,
    ) -> Result<(), BoxError> {
        if to.is_empty() {
            return Err("no recipients".into());
        }
        let from = self.from_header()?;
        let boundary = format!("----=_Part_{}", uuid::Uuid::new_v4().simple());
        let mime = build_mime(&from, to, subject, text, attachment, &boundary);

        let raw = RawMessage::builder().data(Blob::new(mime.into_bytes())).build()?;
        let mut destination = Destination::builder();
        for address in to {
            destination = destination.to_addresses(address);
        }

        self.ses
            .send_email()
            .destination(destination.build())
            .content(EmailContent::builder().raw(raw).build())
            .send()
            .await?;

        tracing::info!(
            recipients = to.len(),
            attachment = %attachment.filename,
            "Email with attachment sent"
        );
        Ok(())
    }

    pub async fn send_password_reset(&self, to: &str, link: &str) -> Result<(), BoxError> {
        let text = format!(
            "Beste,\n\n\
             Er werd een nieuw wachtwoord aangevraagd voor je account.\n\
             Klik op de volgende link om een nieuw wachtwoord in te stellen:\n\n\
             {link}\n\n\
             Deze link is 1 uur geldig. Heb je dit niet aangevraagd, dan mag je deze e-mail negeren.\n"
        );
        self.send_text(to, "Wachtwoord herstellen", &text).await
    }

    pub async fn send_test(&self, to: &str) -> Result<(), BoxError> {
        self.send_text(
            to,
            "Test e-mail Planning",
            "Dit is een test e-mail. De e-mailconfiguratie werkt correct.",
        )
        .await
    }
}

/// RFC 2047 encode a header value when it is not plain ASCII
fn encode_header(value: &str) -> String {
    if value.is_ascii() {
        value.to_string()
    } else {
        let encoded = base64::engine::general_purpose::STANDARD.encode(value.as_bytes());
        format!("=?UTF-8?B?{encoded}?=")
    }
}

/// Wrap base64 at 76 columns as MIME requires
fn wrap_base64(data: &[u8]) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(data);
    let mut out = String::with_capacity(encoded.len() + encoded.len() / 76 * 2 + 2);
    for chunk in encoded.as_bytes().chunks(76) {
        // base64 output is ASCII
        out.push_str(std::str::from_utf8(chunk).unwrap_or_default());
        out.push_str("\r\n");
    }
    out
}

/// multipart/mixed message: a UTF-8 text part and one base64 attachment
pub fn build_mime(
    from: &str,
    to: &[String],
    subject: &str,
    text: &str,
    attachment: &Attachment,
    boundary: &str,
) -> String {
    let mut mime = String::new();
    mime.push_str(&format!("From: {from}\r\n"));
    mime.push_str(&format!("To: {}\r\n", to.join(", ")));
    mime.push_str(&format!("Subject: {}\r\n", encode_header(subject)));
    mime.push_str("MIME-Version: 1.0\r\n");
    mime.push_str(&format!(
        "Content-Type: multipart/mixed; boundary=\"{boundary}\"\r\n\r\n"
    ));

    mime.push_str(&format!("--{boundary}\r\n"));
    mime.push_str("Content-Type: text/plain; charset=UTF-8\r\n");
    mime.push_str("Content-Transfer-Encoding: base64\r\n\r\n");
    mime.push_str(&wrap_base64(text.as_bytes()));

    mime.push_str(&format!("--{boundary}\r\n"));
    mime.push_str(&format!(
        "Content-Type: {}; name=\"{}\"\r\n",
        attachment.content_type, attachment.filename
    ));
    mime.push_str(&format!(
        "Content-Disposition: attachment; filename=\"{}\"\r\n",
        attachment.filename
    ));
    mime.push_str("Content-Transfer-Encoding: base64\r\n\r\n");
    mime.push_str(&wrap_base64(&attachment.data));

    mime.push_str(&format!("--{boundary}--\r\n"));
    mime
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attachment() -> Attachment {
        Attachment {
            filename: "Shift_Rapportage_Maart_2025.xlsx".into(),
            content_type: crate::report::REPORT_CONTENT_TYPE.into(),
            data: vec![0x50, 0x4b, 0x03, 0x04, 0xff],
        }
    }

    #[test]
    fn test_build_mime_structure() {
        let to = vec!["a@example.org".to_string(), "b@example.org".to_string()];
        let mime = build_mime(
            "Planning <noreply@example.org>",
            &to,
            "Rapport Maart 2025",
            "Beste,\nIn bijlage.",
            &attachment(),
            "BOUNDARY",
        );

        assert!(mime.starts_with("From: Planning <noreply@example.org>\r\n"));
        assert!(mime.contains("To: a@example.org, b@example.org\r\n"));
        assert!(mime.contains("Subject: Rapport Maart 2025\r\n"));
        assert!(mime.contains("Content-Type: multipart/mixed; boundary=\"BOUNDARY\"\r\n"));
        assert_eq!(mime.matches("--BOUNDARY\r\n").count(), 2);
        assert!(mime.ends_with("--BOUNDARY--\r\n"));
        assert!(mime.contains("filename=\"Shift_Rapportage_Maart_2025.xlsx\""));
        // xlsx is a zip container, hence the PK signature
        assert!(mime.contains("UEsDBP8=\r\n"));
    }

    #[test]
    fn test_encode_header_non_ascii() {
        assert_eq!(encode_header("Planning"), "Planning");
        let encoded = encode_header("Overuren é");
        assert!(encoded.starts_with("=?UTF-8?B?"));
        assert!(encoded.ends_with("?="));
    }

    #[test]
    fn test_wrap_base64_line_length() {
        let data = vec![7u8; 200];
        let wrapped = wrap_base64(&data);
        for line in wrapped.split("\r\n").filter(|l| !l.is_empty()) {
            assert!(line.len() <= 76);
        }
        let joined: String = wrapped.split("\r\n").collect();
        let decoded = base64::engine::general_purpose::STANDARD.decode(joined).unwrap();
        assert_eq!(decoded, data);
    }
}
