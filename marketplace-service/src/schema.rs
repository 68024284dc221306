diesel::table! {
    users (id) {
        id -> Uuid,
        name -> Varchar,
        email -> Varchar,
        password_hash -> Varchar,
        role -> Varchar,
        phone -> Nullable<Varchar>,
        total_bookings -> Int4,
        total_spent -> Numeric,
        created_at -> Nullable<Timestamptz>,
        updated_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    providers (id) {
        id -> Uuid,
        user_id -> Uuid,
        performance_tier -> Varchar,
        approved -> Bool,
        completed_bookings -> Int4,
        total_earnings -> Numeric,
        created_at -> Nullable<Timestamptz>,
        updated_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    services (id) {
        id -> Uuid,
        name -> Varchar,
        description -> Text,
        category -> Varchar,
        base_price -> Numeric,
        active -> Bool,
        created_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    bookings (id) {
        id -> Uuid,
        customer_id -> Uuid,
        provider_id -> Nullable<Uuid>,
        scheduled_for -> Timestamptz,
        address -> Text,
        status -> Varchar,
        payment_status -> Varchar,
        coupon_id -> Nullable<Uuid>,
        subtotal -> Numeric,
        discount_amount -> Numeric,
        total_amount -> Numeric,
        invoice_id -> Nullable<Uuid>,
        created_at -> Nullable<Timestamptz>,
        updated_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    booking_items (id) {
        id -> Uuid,
        booking_id -> Uuid,
        service_id -> Uuid,
        quantity -> Int4,
        unit_price -> Numeric,
        discount -> Numeric,
    }
}

diesel::table! {
    invoices (id) {
        id -> Uuid,
        invoice_number -> Varchar,
        booking_id -> Uuid,
        provider_id -> Uuid,
        total_amount -> Numeric,
        commission_basis -> Varchar,
        commission_value -> Numeric,
        commission_amount -> Numeric,
        net_amount -> Numeric,
        payment_status -> Varchar,
        payment_reference -> Nullable<Varchar>,
        issued_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    commission_rules (id) {
        id -> Uuid,
        name -> Varchar,
        basis -> Varchar,
        value -> Numeric,
        performance_tier -> Nullable<Varchar>,
        provider_id -> Nullable<Uuid>,
        active -> Bool,
        created_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    coupons (id) {
        id -> Uuid,
        code -> Varchar,
        discount_type -> Varchar,
        value -> Numeric,
        min_booking_amount -> Nullable<Numeric>,
        usage_limit -> Nullable<Int4>,
        expires_at -> Nullable<Timestamptz>,
        first_booking_only -> Bool,
        assigned_user_id -> Nullable<Uuid>,
        active -> Bool,
        created_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    coupon_redemptions (id) {
        id -> Uuid,
        coupon_id -> Uuid,
        user_id -> Uuid,
        booking_id -> Uuid,
        redeemed_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    provider_earnings (id) {
        id -> Uuid,
        provider_id -> Uuid,
        booking_id -> Uuid,
        invoice_id -> Uuid,
        amount -> Numeric,
        status -> Varchar,
        created_at -> Nullable<Timestamptz>,
        settled_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    transactions (id) {
        id -> Uuid,
        kind -> Varchar,
        booking_id -> Nullable<Uuid>,
        provider_id -> Nullable<Uuid>,
        gateway_order_id -> Nullable<Varchar>,
        gateway_payment_id -> Nullable<Varchar>,
        amount -> Numeric,
        currency -> Varchar,
        status -> Varchar,
        created_at -> Nullable<Timestamptz>,
        updated_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    feedback (id) {
        id -> Uuid,
        booking_id -> Uuid,
        customer_id -> Uuid,
        provider_id -> Uuid,
        rating -> Int4,
        comment -> Nullable<Text>,
        created_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    complaints (id) {
        id -> Uuid,
        booking_id -> Uuid,
        customer_id -> Uuid,
        subject -> Varchar,
        description -> Text,
        status -> Varchar,
        resolution -> Nullable<Text>,
        created_at -> Nullable<Timestamptz>,
        resolved_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    test_questions (id) {
        id -> Uuid,
        category -> Varchar,
        prompt -> Text,
        options -> Jsonb,
        correct_index -> Int4,
        active -> Bool,
    }
}

diesel::table! {
    test_attempts (id) {
        id -> Uuid,
        provider_id -> Uuid,
        category -> Varchar,
        question_ids -> Jsonb,
        correct -> Nullable<Int4>,
        total -> Int4,
        passed -> Nullable<Bool>,
        started_at -> Timestamptz,
        submitted_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    outbox_events (id) {
        id -> Uuid,
        aggregate_id -> Uuid,
        event_type -> Varchar,
        event_data -> Jsonb,
        processed -> Nullable<Bool>,
        created_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    processed_webhooks (event_key) {
        event_key -> Varchar,
        received_at -> Nullable<Timestamptz>,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    users,
    providers,
    services,
    bookings,
    booking_items,
    invoices,
    commission_rules,
    coupons,
    coupon_redemptions,
    provider_earnings,
    transactions,
    feedback,
    complaints,
    test_questions,
    test_attempts,
    outbox_events,
    processed_webhooks,
);
