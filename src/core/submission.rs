use crate::core::cart::{cart_total, CartStore};
use crate::domain::model::{CartItem, ContactForm, ContactInquiry};
use crate::domain::ports::ContactApi;
use crate::utils::error::{EstimatorError, Result};
use crate::utils::format::format_inr;
use std::fmt::Write;
use std::sync::Arc;
use tracing::{info, warn};

pub const SUBMIT_SUCCESS: &str =
    "Thank you! Your estimation request has been sent. We'll contact you soon.";
pub const MISSING_FIELDS: &str = "Please fill in all required fields.";
pub const SUBMIT_FAILED: &str = "Failed to send request. Please try again.";

/// Plain-text message body summarising the cart.
pub fn render_summary(items: &[CartItem], user_message: &str) -> String {
    let mut summary = String::from("Requested Estimation:\n\n");
    for (i, item) in items.iter().enumerate() {
        let _ = writeln!(summary, "{}. {}: {}", i + 1, item.title, format_inr(item.amount));
    }
    let _ = write!(
        summary,
        "\nTotal Estimated Cost: {}\n\nUser Message: {}",
        format_inr(cart_total(items)),
        user_message
    );
    summary
}

/// Sends the cart as a contact inquiry and clears it on success.
#[derive(Clone)]
pub struct CartSubmission {
    contact: Arc<dyn ContactApi>,
    cart: CartStore,
}

impl CartSubmission {
    pub fn new(contact: Arc<dyn ContactApi>, cart: CartStore) -> Self {
        Self { contact, cart }
    }

    /// On failure neither the cart nor `form` is touched.
    pub async fn submit(&self, items: &[CartItem], form: &mut ContactForm) -> Result<()> {
        validate_contact(form)?;
        if items.is_empty() {
            return Err(EstimatorError::validation("cart", "the cart is empty"));
        }

        let inquiry = ContactInquiry {
            name: form.name.trim().to_string(),
            email: form.email.trim().to_string(),
            phone: form.phone.trim().to_string(),
            message: render_summary(items, &form.message),
        };

        self.contact.submit_contact(&inquiry).await?;
        info!("📨 Estimation request with {} item(s) sent", items.len());

        // 詢問已送出，清除失敗不可回報為送出失敗
        if let Err(e) = self.cart.clear_cart() {
            warn!("⚠️ Request sent but the cart could not be cleared: {}", e);
        }
        form.reset();
        Ok(())
    }
}

fn validate_contact(form: &ContactForm) -> Result<()> {
    for (field, value) in [
        ("name", &form.name),
        ("email", &form.email),
        ("phone", &form.phone),
    ] {
        if value.trim().is_empty() {
            return Err(EstimatorError::validation(field, MISSING_FIELDS));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitNotice {
    Success(String),
    Failure(String),
}

impl SubmitNotice {
    pub fn from_outcome(outcome: &Result<()>) -> Self {
        match outcome {
            Ok(()) => Self::Success(SUBMIT_SUCCESS.to_string()),
            Err(EstimatorError::ValidationError { field, message }) if field == "cart" => {
                Self::Failure(format!("Nothing to send: {}.", message))
            }
            Err(EstimatorError::ValidationError { .. }) => Self::Failure(MISSING_FIELDS.to_string()),
            Err(e) => Self::Failure(
                e.server_reason()
                    .map(str::to_string)
                    .unwrap_or_else(|| SUBMIT_FAILED.to_string()),
            ),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Success(message) | Self::Failure(message) => message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::MemoryStorage;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingContact {
        sent: Mutex<Vec<ContactInquiry>>,
        reject_with: Option<u16>,
    }

    #[async_trait]
    impl ContactApi for RecordingContact {
        async fn submit_contact(&self, inquiry: &ContactInquiry) -> Result<()> {
            if let Some(status) = self.reject_with {
                return Err(EstimatorError::HttpStatus {
                    status,
                    message: None,
                });
            }
            self.sent.lock().unwrap().push(inquiry.clone());
            Ok(())
        }
    }

    fn web_design(amount: f64) -> CartItem {
        CartItem {
            id: "web-designing".to_string(),
            title: "Web Design".to_string(),
            amount,
            quantity: 1,
            slug: "web-design".to_string(),
        }
    }

    fn filled_form() -> ContactForm {
        ContactForm {
            name: "Asha".to_string(),
            email: "asha@example.com".to_string(),
            phone: "9876543210".to_string(),
            message: "Need it by March".to_string(),
        }
    }

    fn setup(contact: RecordingContact) -> (Arc<RecordingContact>, CartStore, CartSubmission) {
        let contact = Arc::new(contact);
        let cart = CartStore::with_default_key(Arc::new(MemoryStorage::new()));
        let submission = CartSubmission::new(contact.clone(), cart.clone());
        (contact, cart, submission)
    }

    #[test]
    fn test_render_summary_layout() {
        let items = vec![
            web_design(15000.0),
            CartItem {
                title: "Hosting".to_string(),
                ..web_design(150000.0)
            },
        ];
        let summary = render_summary(&items, "Call after 5pm");
        assert_eq!(
            summary,
            "Requested Estimation:\n\n1. Web Design: ₹15,000\n2. Hosting: ₹1,50,000\n\nTotal Estimated Cost: ₹1,65,000\n\nUser Message: Call after 5pm"
        );
    }

    #[tokio::test]
    async fn test_successful_submit_clears_cart_and_form() {
        let (contact, cart, submission) = setup(RecordingContact::default());
        cart.add_to_cart(web_design(15000.0)).unwrap();
        let mut form = filled_form();

        let items = cart.get_cart();
        submission.submit(&items, &mut form).await.unwrap();

        let sent = contact.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].message.contains("1. Web Design: ₹15,000"));
        assert!(sent[0].message.contains("Total Estimated Cost: ₹15,000"));
        assert!(sent[0].message.ends_with("User Message: Need it by March"));
        assert!(cart.get_cart().is_empty());
        assert_eq!(form, ContactForm::default());
    }

    #[tokio::test]
    async fn test_rejected_submit_keeps_cart_and_form() {
        let (_, cart, submission) = setup(RecordingContact {
            reject_with: Some(500),
            ..Default::default()
        });
        cart.add_to_cart(web_design(15000.0)).unwrap();
        let mut form = filled_form();

        let outcome = submission.submit(&cart.get_cart(), &mut form).await;
        assert!(outcome.is_err());
        assert_eq!(cart.get_cart().len(), 1);
        assert_eq!(form, filled_form());
        assert_eq!(
            SubmitNotice::from_outcome(&outcome),
            SubmitNotice::Failure(SUBMIT_FAILED.to_string())
        );
    }

    #[tokio::test]
    async fn test_blank_fields_make_no_remote_call() {
        let (contact, cart, submission) = setup(RecordingContact::default());
        cart.add_to_cart(web_design(15000.0)).unwrap();
        let mut form = ContactForm {
            phone: "   ".to_string(),
            ..filled_form()
        };

        let outcome = submission.submit(&cart.get_cart(), &mut form).await;
        assert!(matches!(
            outcome,
            Err(EstimatorError::ValidationError { ref field, .. }) if field == "phone"
        ));
        assert_eq!(
            SubmitNotice::from_outcome(&outcome).message(),
            MISSING_FIELDS
        );
        assert!(contact.sent.lock().unwrap().is_empty());
        assert_eq!(cart.get_cart().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_cart_is_not_sent() {
        let (contact, _, submission) = setup(RecordingContact::default());
        let mut form = filled_form();

        let outcome = submission.submit(&[], &mut form).await;
        assert!(outcome.is_err());
        assert!(!SubmitNotice::from_outcome(&outcome).is_success());
        assert!(contact.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_notice_prefers_server_reason() {
        let outcome: Result<()> = Err(EstimatorError::HttpStatus {
            status: 400,
            message: Some("email: Enter a valid email address.".to_string()),
        });
        assert_eq!(
            SubmitNotice::from_outcome(&outcome).message(),
            "email: Enter a valid email address."
        );
        assert!(SubmitNotice::from_outcome(&Ok(())).is_success());
    }
}
