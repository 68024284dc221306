use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Queryable)]
#[diesel(table_name = crate::schema::users)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub phone: Option<String>,
    pub total_bookings: i32,
    pub total_spent: BigDecimal,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::users)]
pub struct NewUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub phone: Option<String>,
    pub total_bookings: i32,
    pub total_spent: BigDecimal,
}

#[derive(Debug, Clone, Queryable, Serialize)]
#[diesel(table_name = crate::schema::providers)]
pub struct Provider {
    pub id: Uuid,
    pub user_id: Uuid,
    pub performance_tier: String,
    pub approved: bool,
    pub completed_bookings: i32,
    pub total_earnings: BigDecimal,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::providers)]
pub struct NewProvider {
    pub id: Uuid,
    pub user_id: Uuid,
    pub performance_tier: String,
    pub approved: bool,
    pub completed_bookings: i32,
    pub total_earnings: BigDecimal,
}

#[derive(Debug, Clone, Queryable, Serialize)]
#[diesel(table_name = crate::schema::services)]
pub struct Service {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category: String,
    pub base_price: BigDecimal,
    pub active: bool,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::services)]
pub struct NewService {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category: String,
    pub base_price: BigDecimal,
    pub active: bool,
}

#[derive(Debug, Clone, Queryable, Serialize)]
#[diesel(table_name = crate::schema::bookings)]
pub struct Booking {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub provider_id: Option<Uuid>,
    pub scheduled_for: DateTime<Utc>,
    pub address: String,
    pub status: String,
    pub payment_status: String,
    pub coupon_id: Option<Uuid>,
    pub subtotal: BigDecimal,
    pub discount_amount: BigDecimal,
    pub total_amount: BigDecimal,
    pub invoice_id: Option<Uuid>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::bookings)]
pub struct NewBooking {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub scheduled_for: DateTime<Utc>,
    pub address: String,
    pub status: String,
    pub payment_status: String,
    pub coupon_id: Option<Uuid>,
    pub subtotal: BigDecimal,
    pub discount_amount: BigDecimal,
    pub total_amount: BigDecimal,
}

#[derive(Debug, Clone, Queryable, Serialize)]
#[diesel(table_name = crate::schema::booking_items)]
pub struct BookingItem {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub service_id: Uuid,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub discount: BigDecimal,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::booking_items)]
pub struct NewBookingItem {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub service_id: Uuid,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub discount: BigDecimal,
}

#[derive(Debug, Clone, Queryable, Serialize)]
#[diesel(table_name = crate::schema::invoices)]
pub struct Invoice {
    pub id: Uuid,
    pub invoice_number: String,
    pub booking_id: Uuid,
    pub provider_id: Uuid,
    pub total_amount: BigDecimal,
    pub commission_basis: String,
    pub commission_value: BigDecimal,
    pub commission_amount: BigDecimal,
    pub net_amount: BigDecimal,
    pub payment_status: String,
    pub payment_reference: Option<String>,
    pub issued_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::invoices)]
pub struct NewInvoice {
    pub id: Uuid,
    pub invoice_number: String,
    pub booking_id: Uuid,
    pub provider_id: Uuid,
    pub total_amount: BigDecimal,
    pub commission_basis: String,
    pub commission_value: BigDecimal,
    pub commission_amount: BigDecimal,
    pub net_amount: BigDecimal,
    pub payment_status: String,
}

#[derive(Debug, Clone, Queryable, Serialize)]
#[diesel(table_name = crate::schema::commission_rules)]
pub struct CommissionRule {
    pub id: Uuid,
    pub name: String,
    pub basis: String,
    pub value: BigDecimal,
    pub performance_tier: Option<String>,
    pub provider_id: Option<Uuid>,
    pub active: bool,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::commission_rules)]
pub struct NewCommissionRule {
    pub id: Uuid,
    pub name: String,
    pub basis: String,
    pub value: BigDecimal,
    pub performance_tier: Option<String>,
    pub provider_id: Option<Uuid>,
    pub active: bool,
}

#[derive(Debug, Clone, Queryable, Serialize)]
#[diesel(table_name = crate::schema::coupons)]
pub struct Coupon {
    pub id: Uuid,
    pub code: String,
    pub discount_type: String,
    pub value: BigDecimal,
    pub min_booking_amount: Option<BigDecimal>,
    pub usage_limit: Option<i32>,
    pub expires_at: Option<DateTime<Utc>>,
    pub first_booking_only: bool,
    pub assigned_user_id: Option<Uuid>,
    pub active: bool,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::coupons)]
pub struct NewCoupon {
    pub id: Uuid,
    pub code: String,
    pub discount_type: String,
    pub value: BigDecimal,
    pub min_booking_amount: Option<BigDecimal>,
    pub usage_limit: Option<i32>,
    pub expires_at: Option<DateTime<Utc>>,
    pub first_booking_only: bool,
    pub assigned_user_id: Option<Uuid>,
    pub active: bool,
}

#[derive(Debug, Clone, Queryable, Serialize)]
#[diesel(table_name = crate::schema::coupon_redemptions)]
pub struct CouponRedemption {
    pub id: Uuid,
    pub coupon_id: Uuid,
    pub user_id: Uuid,
    pub booking_id: Uuid,
    pub redeemed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::coupon_redemptions)]
pub struct NewCouponRedemption {
    pub id: Uuid,
    pub coupon_id: Uuid,
    pub user_id: Uuid,
    pub booking_id: Uuid,
}

#[derive(Debug, Clone, Queryable, Serialize)]
#[diesel(table_name = crate::schema::provider_earnings)]
pub struct ProviderEarning {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub booking_id: Uuid,
    pub invoice_id: Uuid,
    pub amount: BigDecimal,
    pub status: String,
    pub created_at: Option<DateTime<Utc>>,
    pub settled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::provider_earnings)]
pub struct NewProviderEarning {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub booking_id: Uuid,
    pub invoice_id: Uuid,
    pub amount: BigDecimal,
    pub status: String,
}

#[derive(Debug, Clone, Queryable, Serialize)]
#[diesel(table_name = crate::schema::transactions)]
pub struct Transaction {
    pub id: Uuid,
    pub kind: String,
    pub booking_id: Option<Uuid>,
    pub provider_id: Option<Uuid>,
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub amount: BigDecimal,
    pub currency: String,
    pub status: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::transactions)]
pub struct NewTransaction {
    pub id: Uuid,
    pub kind: String,
    pub booking_id: Option<Uuid>,
    pub provider_id: Option<Uuid>,
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub amount: BigDecimal,
    pub currency: String,
    pub status: String,
}

#[derive(Debug, Clone, Queryable, Serialize)]
#[diesel(table_name = crate::schema::feedback)]
pub struct Feedback {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub customer_id: Uuid,
    pub provider_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::feedback)]
pub struct NewFeedback {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub customer_id: Uuid,
    pub provider_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Queryable, Serialize)]
#[diesel(table_name = crate::schema::complaints)]
pub struct Complaint {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub customer_id: Uuid,
    pub subject: String,
    pub description: String,
    pub status: String,
    pub resolution: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::complaints)]
pub struct NewComplaint {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub customer_id: Uuid,
    pub subject: String,
    pub description: String,
    pub status: String,
}

#[derive(Debug, Clone, Queryable)]
#[diesel(table_name = crate::schema::test_questions)]
pub struct TestQuestion {
    pub id: Uuid,
    pub category: String,
    pub prompt: String,
    pub options: serde_json::Value,
    pub correct_index: i32,
    pub active: bool,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::test_questions)]
pub struct NewTestQuestion {
    pub id: Uuid,
    pub category: String,
    pub prompt: String,
    pub options: serde_json::Value,
    pub correct_index: i32,
    pub active: bool,
}

#[derive(Debug, Clone, Queryable, Serialize)]
#[diesel(table_name = crate::schema::test_attempts)]
pub struct TestAttempt {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub category: String,
    pub question_ids: serde_json::Value,
    pub correct: Option<i32>,
    pub total: i32,
    pub passed: Option<bool>,
    pub started_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::test_attempts)]
pub struct NewTestAttempt {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub category: String,
    pub question_ids: serde_json::Value,
    pub total: i32,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::outbox_events)]
pub struct DbOutboxEvent {
    pub id: Uuid,
    pub aggregate_id: Uuid,
    pub event_type: String,
    pub event_data: serde_json::Value,
    pub processed: Option<bool>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::outbox_events)]
pub struct NewOutboxEvent {
    pub id: Uuid,
    pub aggregate_id: Uuid,
    pub event_type: String,
    pub event_data: serde_json::Value,
}

#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = crate::schema::processed_webhooks)]
pub struct ProcessedWebhook {
    pub event_key: String,
    pub received_at: Option<DateTime<Utc>>,
}
