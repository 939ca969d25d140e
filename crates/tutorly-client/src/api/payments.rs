// Payments and enrollment
//
// Card handling belongs to the payment provider. The client only forwards
// the price, hands the returned client secret to a PaymentGateway for
// confirmation and records the resulting transaction.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use tutorly_core::models::{ClassRecord, Payment};
use tutorly_core::{Identity, Result};

use crate::client::{segment, ApiClient};

#[derive(Debug, Serialize)]
struct IntentRequest {
    price: f64,
}

#[derive(Debug, Deserialize)]
struct IntentResponse {
    #[serde(alias = "clientSecret")]
    client_secret: String,
}

// ============================================================================
// PaymentGateway - External payment provider
// ============================================================================

/// Confirms a payment intent with the payment provider
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Confirm the intent behind `client_secret`, returning the transaction id
    async fn confirm(&self, client_secret: &str, amount: f64) -> Result<String>;
}

// ============================================================================
// PaymentsApi
// ============================================================================

#[derive(Clone)]
pub struct PaymentsApi {
    client: ApiClient,
}

impl PaymentsApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Create a payment intent and return its client secret
    pub async fn create_intent(&self, price: f64) -> Result<String> {
        let response: IntentResponse = self
            .client
            .post("/create-payment-intent", &IntentRequest { price })
            .await?;
        Ok(response.client_secret)
    }

    pub async fn record(&self, payment: &Payment) -> Result<Payment> {
        self.client.post("/payments", payment).await
    }

    /// Payments made by a student, one per enrolled class
    pub async fn enrollments(&self, email: &str) -> Result<Vec<Payment>> {
        self.client
            .get(&format!("/students/{}/enrollments", segment(email)))
            .await
    }
}

/// Pay for a class and record the enrollment
pub struct EnrollmentFlow {
    payments: PaymentsApi,
    gateway: Arc<dyn PaymentGateway>,
}

impl EnrollmentFlow {
    pub fn new(payments: PaymentsApi, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { payments, gateway }
    }

    pub async fn enroll(&self, class: &ClassRecord, student: &Identity) -> Result<Payment> {
        let client_secret = self.payments.create_intent(class.price).await?;
        let transaction_id = self.gateway.confirm(&client_secret, class.price).await?;
        tracing::info!(
            class_id = %class.id,
            email = %student.email,
            transaction_id = %transaction_id,
            "Payment confirmed"
        );

        let payment = Payment {
            id: String::new(),
            class_id: class.id.clone(),
            student_email: student.email.clone(),
            price: class.price,
            transaction_id,
            paid_at: Utc::now(),
        };
        self.payments.record(&payment).await
    }
}
