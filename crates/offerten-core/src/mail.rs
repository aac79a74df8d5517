//! # Mail Module
//!
//! Composes the message that accompanies a document. Sending is someone
//! else's job; this only produces recipient, subject and body.
//!
//! ```text
//! Document ──► DocumentMail::compose() ──► dispatcher (SMTP, API, …)
//!                                               │ ok
//!                                               ▼
//!                                     caller marks document sent
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreResult, ValidationError};
use crate::types::{Document, DocumentType};
use crate::validation;

/// Sender details printed in the signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CompanyProfile {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    /// Base address of the public site, e.g. `https://umzug-meier.ch`.
    pub public_base_url: String,
}

/// One outgoing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DocumentMail {
    pub to: String,
    pub reply_to: String,
    pub subject: String,
    pub body: String,
    /// Response page link, quotes only.
    pub response_link: Option<String>,
}

/// Link to the page where a customer accepts or rejects a quote.
///
/// ## Example
/// ```rust
/// use offerten_core::mail::response_link;
///
/// assert_eq!(
///     response_link("https://umzug-meier.ch/", "abc123"),
///     "https://umzug-meier.ch/offerte/abc123"
/// );
/// ```
pub fn response_link(public_base_url: &str, token: &str) -> String {
    format!("{}/offerte/{}", public_base_url.trim_end_matches('/'), token)
}

impl DocumentMail {
    /// Builds the mail for `document`.
    ///
    /// ## Errors
    /// `Validation` when the customer has no usable email address.
    pub fn compose(document: &Document, company: &CompanyProfile) -> CoreResult<Self> {
        let to = document
            .customer
            .email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
            .ok_or_else(|| ValidationError::Required {
                field: "customer email".to_string(),
            })?;
        validation::validate_email(to)?;

        let label = document.document_type.label();
        let subject = format!("Ihre {} Nr. {}", label, document.document_number);

        let total_line = if document.tax_enabled {
            format!(
                "Total: {} (inkl. {} MWST)",
                document.total, document.tax_rate
            )
        } else {
            format!("Total: {}", document.total)
        };

        let link = (document.document_type == DocumentType::Quote)
            .then(|| response_link(&company.public_base_url, &document.public_token));

        let mut body = format!(
            "Guten Tag {}\n\nIm Anhang erhalten Sie Ihre {} Nr. {}.\n\n{}\n",
            document.customer.name.trim(),
            label,
            document.document_number,
            total_line
        );

        if let Some(link) = &link {
            body.push_str(
                "\nUnter folgendem Link können Sie die Offerte annehmen oder ablehnen:\n",
            );
            body.push_str(link);
            body.push('\n');
        }

        body.push_str(&format!("\nFreundliche Grüsse\n{}\n", company.name));
        if let Some(phone) = &company.phone {
            body.push_str(&format!("Tel. {}\n", phone));
        }

        Ok(DocumentMail {
            to: to.to_string(),
            reply_to: company.email.clone(),
            subject,
            body,
            response_link: link,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
