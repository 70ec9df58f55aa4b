//! Profile inputs and outcomes.

use chrono::{DateTime, Utc};

use crate::models::{Customer, Order};

/// How Payment and Order-Status pick their customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomerSelector {
    Id(u32),
    /// Median of the customers sharing this last name.
    LastName(String),
}

impl CustomerSelector {
    /// Harness-style selection: a non-zero id wins, otherwise the last
    /// name is used.
    pub fn new(customer_id: u32, last_name: &str) -> Self {
        if customer_id > 0 {
            CustomerSelector::Id(customer_id)
        } else {
            CustomerSelector::LastName(last_name.to_string())
        }
    }
}

/// One requested line of a New-Order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderItem {
    pub item_id: u32,
    pub supply_warehouse_id: u32,
    pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct NewOrderParams {
    pub warehouse_id: u32,
    pub district_id: u32,
    pub customer_id: u32,
    pub entry_date: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

impl NewOrderParams {
    /// Every line is supplied by the home warehouse.
    pub fn is_all_local(&self) -> bool {
        self.items
            .iter()
            .all(|item| item.supply_warehouse_id == self.warehouse_id)
    }
}

#[derive(Debug, Clone)]
pub struct NewOrderOutcome {
    /// The stored order with its lines.
    pub order: Order,
    /// Line total after customer discount and warehouse and district tax.
    pub total_amount: f64,
}

#[derive(Debug, Clone)]
pub struct PaymentParams {
    /// Warehouse and district receiving the payment.
    pub warehouse_id: u32,
    pub district_id: u32,
    /// Home of the paying customer.
    pub customer_warehouse_id: u32,
    pub customer_district_id: u32,
    pub customer: CustomerSelector,
    pub amount: f64,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct PaymentOutcome {
    /// The resolved customer with the payment applied.
    pub customer: Customer,
}

#[derive(Debug, Clone)]
pub struct OrderStatusParams {
    pub warehouse_id: u32,
    pub district_id: u32,
    pub customer: CustomerSelector,
}

#[derive(Debug, Clone)]
pub struct OrderStatusOutcome {
    pub customer: Customer,
    /// The customer's most recent order, lines included.
    pub order: Order,
}

#[derive(Debug, Clone)]
pub struct DeliveryParams {
    pub warehouse_id: u32,
    pub carrier_id: u32,
    pub delivery_date: DateTime<Utc>,
}

/// One district's delivered order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeliveredOrder {
    pub district_id: u32,
    pub order_id: u32,
    pub customer_id: u32,
    pub amount: f64,
}

#[derive(Debug, Clone, Default)]
pub struct DeliveryOutcome {
    pub delivered: Vec<DeliveredOrder>,
    /// Districts whose queue was empty.
    pub skipped: Vec<u32>,
}

#[derive(Debug, Clone, Copy)]
pub struct StockLevelParams {
    pub warehouse_id: u32,
    pub district_id: u32,
    pub threshold: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockLevelOutcome {
    /// Distinct recently ordered items below the threshold.
    pub low_stock: u64,
}
